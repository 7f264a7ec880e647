use std::io::Write;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessStatus {
    /// Ran to the end of its trace.
    Completed,
    /// Halted by a write that needed more pages than its quota.
    QuotaExceeded,
}

/// Final state of one process after a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessSummary {
    pub id: u32,
    pub trace: String,
    pub lines_executed: usize,
    pub allocated_pages: u32,
    pub quota: u32,
    pub status: ProcessStatus,
}

/// Write `summaries` as pretty JSON followed by a newline.
pub fn write_json<W: Write>(mut writer: W, summaries: &[ProcessSummary]) -> anyhow::Result<()> {
    serde_json::to_writer_pretty(&mut writer, summaries)?;
    writeln!(writer)?;
    writer.flush()?;
    Ok(())
}
