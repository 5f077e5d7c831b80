//! Tests for loading workloads from files and writing traces and summaries.

use std::io::Write;

use procsim::{
    load_workload_file, parse_workload, sweep_cores, Event, JsonTraceWriter, LoadError,
    SimConfig, SimConfigBuilder, Simulator, StepTrace, TextTraceWriter, TieBreak, TraceFormat,
};

const RULE: &str = "==========================================================";
const LINK: &str = "                       |                       ";

fn run_text(input: &str) -> String {
    let workload = parse_workload(input).unwrap();
    let mut sim = Simulator::new(&workload).unwrap();
    let mut writer = TextTraceWriter::new(Vec::new());
    sim.run_with(&mut writer).unwrap();
    String::from_utf8(writer.into_inner()).unwrap()
}

// ============================================================================
// Text trace
// ============================================================================

#[test]
fn test_text_trace_single_process() {
    let text = run_text("NCORES 1\nSTART 0\nPID 1\nCORE 10\nEND\n");
    let lines: Vec<&str> = text.lines().collect();

    let expected = vec![
        RULE,
        "ARRIVAL event for process 1 at time 0 ms.",
        "Process Table:",
        "There are no active processes.",
        "",
        "Process 1 requests a core at time 0 ms for 10 ms.",
        "Process 1 will release a core at time 10 ms.",
        RULE,
        LINK,
        LINK,
        RULE,
        "CORE completion event for process 1 at time 10 ms.",
        "Process 1 terminates at time 10 ms.",
        "Process Table:",
        "Process 1 is TERMINATED.",
        "",
        "================SUMMARY================",
        "Total elapsed time: 10 ms",
        "Number of completed processes: 1",
        "Total number of SSD accesses: 0",
        "Average number of busy cores: 1.000000",
        "SSD utilization: 0.000000",
    ];
    assert_eq!(lines, expected);
}

#[test]
fn test_text_trace_reports_queueing() {
    let text = run_text("NCORES 1\nSTART 0\nPID 1\nSSD 4\nSTART 0\nPID 2\nSSD 4\n");

    assert!(text.contains("Process 2 must wait for SSD access.\n"));
    assert!(text.contains("SSD Queue now contains 1 process(es) waiting for SSD access.\n"));
    assert!(text.contains("SSD completion event for process 1 at time 4 ms.\n"));
    assert!(text.contains("Process 2 will release the SSD at time 8 ms.\n"));
    assert!(text.contains("Total number of SSD accesses: 2\n"));
}

#[test]
fn test_terminated_process_listed_once() {
    let text = run_text("NCORES 2\nSTART 0\nPID 1\nCORE 1\nSTART 0\nPID 2\nCORE 5\nSTART 3\nPID 3\nCORE 1\n");

    assert_eq!(text.matches("Process 1 is TERMINATED.").count(), 1);
    assert_eq!(text.matches("Process 2 is TERMINATED.").count(), 1);
}

// ============================================================================
// JSON trace
// ============================================================================

#[test]
fn test_json_trace_lines() {
    let workload = parse_workload("NCORES 1\nSTART 0\nPID 7\nTTY 2\nCORE 3\n").unwrap();
    let mut sim = Simulator::new(&workload).unwrap();
    let mut writer = JsonTraceWriter::new(Vec::new());
    let summary = sim.run_with(&mut writer).unwrap();

    let output = String::from_utf8(writer.into_inner()).unwrap();
    let lines: Vec<&str> = output.lines().collect();
    assert_eq!(lines.len() as u64, summary.steps + 1);

    let first: StepTrace = serde_json::from_str(lines[0]).unwrap();
    assert_eq!(first.pid, 7);
    assert_eq!(first.step, 1);

    let tail: serde_json::Value = serde_json::from_str(lines[lines.len() - 1]).unwrap();
    assert_eq!(tail["summary"]["makespan"], 5);
    assert_eq!(tail["summary"]["interactions"], 1);

    assert!(output.contains("\"type\":\"interaction_completed\""));
}

// ============================================================================
// Files
// ============================================================================

#[test]
fn test_load_workload_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "NCORES 2").unwrap();
    writeln!(file, "START 5").unwrap();
    writeln!(file, "PID 1").unwrap();
    writeln!(file, "CORE 10").unwrap();
    writeln!(file, "SSD 1").unwrap();
    writeln!(file, "END").unwrap();
    file.flush().unwrap();

    let workload = load_workload_file(file.path()).unwrap();
    assert_eq!(workload.cores, 2);
    assert_eq!(workload.processes[0].start, 5);
    assert_eq!(workload.processes[0].events, vec![Event::core(10), Event::storage(1)]);

    let summary = Simulator::new(&workload).unwrap().run();
    assert_eq!(summary.makespan, 16);
}

#[test]
fn test_missing_workload_file() {
    let dir = tempfile::tempdir().unwrap();
    let result = load_workload_file(dir.path().join("absent.txt"));
    assert!(matches!(result, Err(LoadError::Io(_))));
}

#[test]
fn test_config_file_roundtrip() {
    let dir = tempfile::tempdir().unwrap();
    let config = SimConfigBuilder::new()
        .tie_break(TieBreak::Pid)
        .trace_format(TraceFormat::Json)
        .cores(2)
        .add_process(4, 0, vec![Event::core(3)])
        .add_process(2, 0, vec![Event::core(3), Event::interact(1)])
        .build()
        .unwrap();

    let yaml_path = dir.path().join("run.yaml");
    config.to_yaml_file(&yaml_path).unwrap();
    let json_path = dir.path().join("run.json");
    config.to_json_file(&json_path).unwrap();

    let from_yaml = SimConfig::from_file(&yaml_path).unwrap();
    let from_json = SimConfig::from_file(&json_path).unwrap();
    assert_eq!(from_yaml, config);
    assert_eq!(from_json, config);

    let workload = from_yaml.workload.unwrap();
    let mut sim = Simulator::with_tie_break(&workload, from_yaml.simulation.tie_break).unwrap();
    assert_eq!(sim.step().unwrap().pid, 2);
}

#[test]
fn test_summary_exports() {
    let dir = tempfile::tempdir().unwrap();
    let workload = parse_workload("NCORES 1\nSTART 0\nPID 1\nCORE 4\nSSD 4\n").unwrap();
    let summary = Simulator::new(&workload).unwrap().run();

    let json_path = dir.path().join("summary.json");
    summary.to_json_file(&json_path).unwrap();
    let restored: procsim::SimulationSummary =
        serde_json::from_str(&std::fs::read_to_string(&json_path).unwrap()).unwrap();
    assert_eq!(restored, summary);

    let csv_path = dir.path().join("summary.csv");
    summary.to_csv_file(&csv_path).unwrap();
    let csv = std::fs::read_to_string(&csv_path).unwrap();
    assert!(csv.contains("makespan,8\n"));
    assert!(csv.contains("average_busy_cores,0.500000\n"));
    assert!(csv.contains("storage_utilization,0.500000\n"));
}

#[test]
fn test_sweep_matches_single_runs() {
    let workload = parse_workload(
        "NCORES 1\nSTART 0\nPID 1\nCORE 6\nSTART 0\nPID 2\nCORE 6\nSTART 0\nPID 3\nCORE 6\n",
    )
    .unwrap();

    let points = sweep_cores(&workload, &[1, 2, 3], TieBreak::Fifo).unwrap();
    for point in &points {
        let single = Simulator::new(&workload.with_cores(point.cores)).unwrap().run();
        assert_eq!(point.summary, single);
    }
    assert_eq!(points[2].summary.makespan, 6);
}
