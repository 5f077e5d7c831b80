//! Trace sinks: turning step traces into output.
//!
//! A [`TraceSink`] receives every [`StepTrace`] of a run and finally the
//! [`SimulationSummary`]. Three sinks are provided:
//!
//! - [`TextTraceWriter`] - the classic human-readable trace with step
//!   separators and the summary block
//! - [`JsonTraceWriter`] - one JSON object per line and step, then the summary
//! - [`TraceLog`] - keeps everything in memory, mostly for tests
//!
//! [`NullSink`] discards everything.

use std::io::Write;

use crate::process::ProcessTableSnapshot;
use crate::stats::SimulationSummary;
use crate::trace::{StepTrace, TraceRecord};

const STEP_RULE: &str = "==========================================================";
const STEP_LINK: &str = "                       |                       ";

/// Consumer of a simulation trace.
pub trait TraceSink {
    /// Handles the trace of one driver step.
    fn on_step(&mut self, step: &StepTrace) -> std::io::Result<()>;

    /// Called once after the last step.
    fn finish(&mut self, _summary: &SimulationSummary) -> std::io::Result<()> {
        Ok(())
    }
}

/// Discards the trace.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl TraceSink for NullSink {
    fn on_step(&mut self, _step: &StepTrace) -> std::io::Result<()> {
        Ok(())
    }
}

/// Collects steps and the summary in memory.
#[derive(Debug, Default, Clone)]
pub struct TraceLog {
    /// Steps in execution order
    pub steps: Vec<StepTrace>,
    /// Summary, once the run has finished
    pub summary: Option<SimulationSummary>,
}

impl TraceLog {
    /// Creates an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// All records of all steps, in order.
    pub fn records(&self) -> impl Iterator<Item = &TraceRecord> {
        self.steps.iter().flat_map(|s| s.records.iter())
    }

    /// Renders the collected steps as classic text.
    pub fn to_text(&self) -> String {
        self.steps.iter().map(render_step).collect()
    }
}

impl TraceSink for TraceLog {
    fn on_step(&mut self, step: &StepTrace) -> std::io::Result<()> {
        self.steps.push(step.clone());
        Ok(())
    }

    fn finish(&mut self, summary: &SimulationSummary) -> std::io::Result<()> {
        self.summary = Some(summary.clone());
        Ok(())
    }
}

/// Writes the classic text trace.
#[derive(Debug)]
pub struct TextTraceWriter<W: Write> {
    out: W,
    include_summary: bool,
}

impl<W: Write> TextTraceWriter<W> {
    /// Creates a writer that also writes the summary block at the end.
    pub fn new(out: W) -> Self {
        Self {
            out,
            include_summary: true,
        }
    }

    /// Sets whether the summary block is written by [`TraceSink::finish`].
    pub fn with_summary(mut self, include: bool) -> Self {
        self.include_summary = include;
        self
    }

    /// Returns the underlying writer.
    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> TraceSink for TextTraceWriter<W> {
    fn on_step(&mut self, step: &StepTrace) -> std::io::Result<()> {
        write_step(&mut self.out, step)
    }

    fn finish(&mut self, summary: &SimulationSummary) -> std::io::Result<()> {
        if self.include_summary {
            summary.write_summary(&mut self.out)?;
        }
        self.out.flush()
    }
}

/// Writes one JSON object per step.
#[derive(Debug)]
pub struct JsonTraceWriter<W: Write> {
    out: W,
    include_summary: bool,
}

impl<W: Write> JsonTraceWriter<W> {
    /// Creates a writer that also writes a `{"summary": ...}` line at the end.
    pub fn new(out: W) -> Self {
        Self {
            out,
            include_summary: true,
        }
    }

    /// Sets whether the summary line is written by [`TraceSink::finish`].
    pub fn with_summary(mut self, include: bool) -> Self {
        self.include_summary = include;
        self
    }

    /// Returns the underlying writer.
    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> TraceSink for JsonTraceWriter<W> {
    fn on_step(&mut self, step: &StepTrace) -> std::io::Result<()> {
        serde_json::to_writer(&mut self.out, step)?;
        writeln!(self.out)
    }

    fn finish(&mut self, summary: &SimulationSummary) -> std::io::Result<()> {
        if self.include_summary {
            serde_json::to_writer(&mut self.out, &serde_json::json!({ "summary": summary }))?;
            writeln!(self.out)?;
        }
        self.out.flush()
    }
}

/// Renders one step as classic text.
pub fn render_step(step: &StepTrace) -> String {
    let mut text = String::new();

    text.push_str(STEP_RULE);
    text.push('\n');
    for record in &step.records {
        text.push_str(&render_record(record));
    }

    if step.terminated && step.timeline_drained {
        text.push('\n');
    } else {
        text.push_str(&format!("{}\n{}\n{}\n", STEP_RULE, STEP_LINK, STEP_LINK));
    }

    text
}

fn write_step<W: Write>(w: &mut W, step: &StepTrace) -> std::io::Result<()> {
    w.write_all(render_step(step).as_bytes())
}

/// Writes the text lines of one record.
pub fn write_record<W: Write>(w: &mut W, record: &TraceRecord) -> std::io::Result<()> {
    w.write_all(render_record(record).as_bytes())
}

/// Renders the text lines of one record.
pub fn render_record(record: &TraceRecord) -> String {
    match record {
        TraceRecord::CoreRequested {
            pid,
            time,
            duration,
        } => format!(
            "Process {} requests a core at time {} ms for {} ms.\n",
            pid, time, duration
        ),
        TraceRecord::CoreGranted { pid, release_at } => format!(
            "Process {} will release a core at time {} ms.\n",
            pid, release_at
        ),
        TraceRecord::CoreDeferred { pid, class, depth } => format!(
            "Process {} must wait for a core.\n\
             {} Queue now contains {} process(es) waiting for a core.\n",
            pid, class, depth
        ),
        TraceRecord::CoreReleased { pid, time } => format!(
            "CORE completion event for process {} at time {} ms.\n",
            pid, time
        ),
        TraceRecord::StorageRequested {
            pid,
            time,
            duration,
        } => format!(
            "Process {} requests SSD access at time {} ms for {} ms.\n",
            pid, time, duration
        ),
        TraceRecord::StorageGranted { pid, release_at } => format!(
            "Process {} will release the SSD at time {} ms.\n",
            pid, release_at
        ),
        TraceRecord::StorageDeferred { pid, depth } => format!(
            "Process {} must wait for SSD access.\n\
             SSD Queue now contains {} process(es) waiting for SSD access.\n",
            pid, depth
        ),
        TraceRecord::StorageReleased { pid, time } => format!(
            "SSD completion event for process {} at time {} ms.\n",
            pid, time
        ),
        TraceRecord::InteractionStarted {
            pid,
            time,
            completes_at,
        } => format!(
            "Process {} will interact with a user at time {} ms for {} ms.\n\
             Process {} will complete the interaction at time {} ms.\n",
            pid,
            time,
            completes_at - time,
            pid,
            completes_at
        ),
        TraceRecord::InteractionCompleted { pid, time } => format!(
            "TTY completion event for process {} at time {} ms.\n",
            pid, time
        ),
        TraceRecord::Arrival { pid, time, table } => format!(
            "ARRIVAL event for process {} at time {} ms.\n{}\n",
            pid,
            time,
            render_table(table)
        ),
        TraceRecord::Termination { pid, time, table } => format!(
            "Process {} terminates at time {} ms.\n{}",
            pid,
            time,
            render_table(table)
        ),
    }
}

fn render_table(table: &ProcessTableSnapshot) -> String {
    let mut text = String::from("Process Table:\n");
    if table.is_empty() {
        text.push_str("There are no active processes.\n");
    }
    for entry in &table.entries {
        text.push_str(&format!("Process {} is {}.\n", entry.pid, entry.state));
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::{LifecycleState, ProcessStatus};
    use crate::resources::QueueClass;

    fn step(records: Vec<TraceRecord>, terminated: bool, drained: bool) -> StepTrace {
        StepTrace {
            step: 1,
            pid: 1,
            time: 0,
            records,
            terminated,
            timeline_drained: drained,
        }
    }

    #[test]
    fn test_render_request_step() {
        let text = render_step(&step(
            vec![
                TraceRecord::CoreRequested { pid: 1, time: 0, duration: 5 },
                TraceRecord::CoreDeferred {
                    pid: 1,
                    class: QueueClass::NonInteractive,
                    depth: 2,
                },
            ],
            false,
            false,
        ));

        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], STEP_RULE);
        assert_eq!(lines[1], "Process 1 requests a core at time 0 ms for 5 ms.");
        assert_eq!(lines[2], "Process 1 must wait for a core.");
        assert_eq!(lines[3], "NI Queue now contains 2 process(es) waiting for a core.");
        assert_eq!(lines[4], STEP_RULE);
        assert_eq!(lines.len(), 7);
    }

    #[test]
    fn test_render_last_termination() {
        let table = ProcessTableSnapshot {
            entries: vec![ProcessStatus { pid: 1, state: LifecycleState::Terminated }],
        };
        let text = render_step(&step(
            vec![TraceRecord::Termination { pid: 1, time: 10, table }],
            true,
            true,
        ));

        assert_eq!(
            text,
            format!(
                "{}\nProcess 1 terminates at time 10 ms.\nProcess Table:\nProcess 1 is TERMINATED.\n\n",
                STEP_RULE
            )
        );
    }

    #[test]
    fn test_render_empty_table() {
        let mut buf = Vec::new();
        write_record(
            &mut buf,
            &TraceRecord::Arrival {
                pid: 2,
                time: 0,
                table: ProcessTableSnapshot::default(),
            },
        )
        .unwrap();

        let text = String::from_utf8(buf).unwrap();
        assert!(text.contains("ARRIVAL event for process 2 at time 0 ms."));
        assert!(text.contains("There are no active processes."));
    }

    #[test]
    fn test_render_record_text() {
        assert_eq!(
            render_record(&TraceRecord::StorageDeferred { pid: 4, depth: 3 }),
            "Process 4 must wait for SSD access.\n\
             SSD Queue now contains 3 process(es) waiting for SSD access.\n"
        );
        assert_eq!(
            render_record(&TraceRecord::CoreReleased { pid: 2, time: 9 }),
            "CORE completion event for process 2 at time 9 ms.\n"
        );

        let mut buf = Vec::new();
        let record = TraceRecord::CoreGranted { pid: 1, release_at: 5 };
        write_record(&mut buf, &record).unwrap();
        assert_eq!(String::from_utf8(buf).unwrap(), render_record(&record));
    }

    #[test]
    fn test_render_interaction() {
        let mut buf = Vec::new();
        write_record(
            &mut buf,
            &TraceRecord::InteractionStarted { pid: 3, time: 4, completes_at: 7 },
        )
        .unwrap();

        let text = String::from_utf8(buf).unwrap();
        assert!(text.contains("Process 3 will interact with a user at time 4 ms for 3 ms."));
        assert!(text.contains("Process 3 will complete the interaction at time 7 ms."));
    }

    #[test]
    fn test_json_writer_lines() {
        let mut writer = JsonTraceWriter::new(Vec::new());
        writer
            .on_step(&step(vec![TraceRecord::CoreReleased { pid: 1, time: 5 }], false, false))
            .unwrap();
        writer.finish(&SimulationSummary::default()).unwrap();

        let out = String::from_utf8(writer.into_inner()).unwrap();
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 2);

        let first: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first["records"][0]["type"], "core_released");
        let last: serde_json::Value = serde_json::from_str(lines[1]).unwrap();
        assert!(last["summary"].is_object());
    }

    #[test]
    fn test_text_writer_without_summary() {
        let mut writer = TextTraceWriter::new(Vec::new()).with_summary(false);
        writer.finish(&SimulationSummary::default()).unwrap();
        assert!(writer.into_inner().is_empty());
    }
}
