use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context, Result};
use clap::Parser;

use procsim::sweep::sweep_to_csv;
use procsim::{
    load_workload_file, sweep_cores, JsonTraceWriter, NullSink, SimConfig, SimulationSummary,
    Simulator, StatsFormat, TextTraceWriter, TieBreak, Timer, TraceFormat, Workload,
};

/// Discrete-event simulator of process scheduling over cores, an SSD and a TTY.
#[derive(Debug, Parser)]
#[command(name = "procsim", version)]
struct Opts {
    /// Workload file: the NCORES/START/PID text format, or a YAML/JSON
    /// configuration with an embedded workload.
    input: PathBuf,

    /// Write the trace and summary here instead of stdout.
    #[clap(short, long)]
    output: Option<PathBuf>,

    /// YAML/JSON configuration file with run parameters.
    #[clap(short, long)]
    config: Option<PathBuf>,

    /// Step trace format.
    #[clap(long, value_enum)]
    trace: Option<TraceFormat>,

    /// Summary format.
    #[clap(long, value_enum)]
    stats: Option<StatsFormat>,

    /// Ordering of processes due at the same simulated time.
    #[clap(long, value_enum)]
    tie_break: Option<TieBreak>,

    /// Log level (trace, debug, info, warn, error). RUST_LOG takes precedence.
    #[clap(long)]
    log_level: Option<String>,

    /// Instead of a single run, run the workload with 1..=N cores and print
    /// one summary per core count.
    #[clap(long, value_name = "N")]
    sweep_cores: Option<usize>,
}

fn is_config_file(path: &Path) -> bool {
    matches!(
        path.extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .as_deref(),
        Some("yaml" | "yml" | "json")
    )
}

fn load_input(opts: &Opts) -> Result<(SimConfig, Workload)> {
    let mut config = match &opts.config {
        Some(path) => SimConfig::from_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => SimConfig::new(),
    };

    let workload = if is_config_file(&opts.input) {
        let input = SimConfig::from_file(&opts.input)
            .with_context(|| format!("Failed to load workload {}", opts.input.display()))?;
        if opts.config.is_none() {
            config.simulation = input.simulation;
        }
        input
            .workload
            .ok_or_else(|| anyhow!("{} has no workload section", opts.input.display()))?
    } else {
        load_workload_file(&opts.input)
            .with_context(|| format!("Failed to load workload {}", opts.input.display()))?
    };

    if let Some(trace) = opts.trace {
        config.simulation.trace_format = trace;
    }
    if let Some(stats) = opts.stats {
        config.simulation.stats_format = stats;
    }
    if let Some(tie_break) = opts.tie_break {
        config.simulation.tie_break = tie_break;
    }
    if let Some(level) = &opts.log_level {
        config.simulation.log_level = level.clone();
    }
    config.validate().context("Invalid configuration")?;

    Ok((config, workload))
}

fn write_summary(
    out: &mut dyn Write,
    summary: &SimulationSummary,
    format: StatsFormat,
) -> Result<()> {
    match format {
        StatsFormat::Text => summary.write_summary(&mut *out)?,
        StatsFormat::Json => writeln!(out, "{}", summary.to_json()?)?,
        StatsFormat::Csv => write!(out, "{}", summary.to_csv())?,
    }
    Ok(())
}

fn run_sweep(
    out: &mut dyn Write,
    workload: &Workload,
    config: &SimConfig,
    max: usize,
) -> Result<()> {
    if max == 0 {
        bail!("--sweep-cores needs at least one core");
    }
    let counts: Vec<usize> = (1..=max).collect();
    let points = sweep_cores(workload, &counts, config.simulation.tie_break)?;

    match config.simulation.stats_format {
        StatsFormat::Csv => write!(out, "{}", sweep_to_csv(&points))?,
        StatsFormat::Json => writeln!(out, "{}", serde_json::to_string_pretty(&points)?)?,
        StatsFormat::Text => {
            for point in &points {
                writeln!(out, "Cores: {}", point.cores)?;
                point.summary.write_summary(&mut *out)?;
                writeln!(out)?;
            }
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    let opts = Opts::parse();
    let (config, workload) = load_input(&opts)?;
    procsim::init_logging(&config.simulation.log_level);

    let mut out: Box<dyn Write> = match &opts.output {
        Some(path) => Box::new(BufWriter::new(
            File::create(path).with_context(|| format!("Failed to create {}", path.display()))?,
        )),
        None => Box::new(BufWriter::new(io::stdout().lock())),
    };

    if let Some(max) = opts.sweep_cores {
        run_sweep(&mut out, &workload, &config, max)?;
        out.flush()?;
        return Ok(());
    }

    let timer = Timer::start();
    let mut sim = Simulator::with_tie_break(&workload, config.simulation.tie_break)?;
    let summary = match config.simulation.trace_format {
        TraceFormat::Text => {
            let mut sink = TextTraceWriter::new(&mut out).with_summary(false);
            sim.run_with(&mut sink)?
        }
        TraceFormat::Json => {
            let mut sink = JsonTraceWriter::new(&mut out).with_summary(false);
            sim.run_with(&mut sink)?
        }
        TraceFormat::None => sim.run_with(&mut NullSink)?,
    };
    write_summary(&mut out, &summary, config.simulation.stats_format)?;
    out.flush()?;

    tracing::info!(
        wall_time_ms = timer.elapsed_ms(),
        steps = summary.steps,
        "run complete"
    );
    Ok(())
}
