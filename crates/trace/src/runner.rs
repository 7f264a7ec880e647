use std::io::{BufRead, Write};
use std::path::Path;

use kernel::{KernelError, Machine, Process, WriteOutcome};
use log::{debug, info};
use vm::Fault;

use crate::command::{Command, parse_command};
use crate::error::TraceError;
use crate::reader::TraceReader;
use crate::report::{ProcessStatus, ProcessSummary};

const PAGE_FAULT: &str = "PageFaultException";
const READ_FAULT: &str = "PageFaultException on read";
const WRITE_FAULT: &str = "WritePermissionFaultException";

/// Dump output wraps after this many bytes.
const DUMP_BYTES_PER_LINE: usize = 16;

enum Flow {
    Continue,
    Halt,
}

/// One process: its trace and its demand-paged address space.
pub struct TraceProcess {
    reader: TraceReader<Box<dyn BufRead>>,
    process: Process,
    lines_executed: usize,
    status: Option<ProcessStatus>,
}

impl TraceProcess {
    /// Open the trace at `path` and create process `id` on `machine`.
    pub fn open(path: &Path, id: u32, machine: &mut Machine, quota: u32) -> Result<Self, TraceError> {
        let reader = TraceReader::open(path)?.boxed();
        Self::with_reader(reader, id, machine, quota)
    }

    pub fn from_reader(
        input: Box<dyn BufRead>,
        name: impl Into<String>,
        id: u32,
        machine: &mut Machine,
        quota: u32,
    ) -> Result<Self, TraceError> {
        Self::with_reader(TraceReader::new(input, name), id, machine, quota)
    }

    fn with_reader(
        reader: TraceReader<Box<dyn BufRead>>,
        id: u32,
        machine: &mut Machine,
        quota: u32,
    ) -> Result<Self, TraceError> {
        let process =
            Process::new(id, machine, quota).map_err(|source| TraceError::Kernel { id, source })?;
        Ok(Self {
            reader,
            process,
            lines_executed: 0,
            status: None,
        })
    }

    pub fn id(&self) -> u32 {
        self.process.id()
    }

    pub fn process(&self) -> &Process {
        &self.process
    }

    /// Terminal status, once the process has stopped.
    pub fn status(&self) -> Option<ProcessStatus> {
        self.status
    }

    pub fn summary(&self) -> ProcessSummary {
        ProcessSummary {
            id: self.id(),
            trace: self.reader.name().to_string(),
            lines_executed: self.lines_executed,
            allocated_pages: self.process.allocated_pages(),
            quota: self.process.quota(),
            status: self.status.unwrap_or(ProcessStatus::Completed),
        }
    }

    /// Run up to `num_lines` trace lines, writing echoes and diagnostics to
    /// `out`. Returns the lines run; fewer than requested means the process
    /// has finished.
    pub fn execute(
        &mut self,
        machine: &mut Machine,
        out: &mut dyn Write,
        num_lines: usize,
    ) -> Result<usize, TraceError> {
        if self.status.is_some() {
            return Ok(0);
        }
        for i in 0..num_lines {
            let Some((line, text)) = self.reader.next_line()? else {
                info!("process {} reached end of {}", self.id(), self.reader.name());
                self.status = Some(ProcessStatus::Completed);
                self.lines_executed += i;
                return Ok(i);
            };
            writeln!(out, "{}:{}:{}", line, self.id(), text)?;

            let Some(command) = parse_command(line, &text)? else {
                continue;
            };
            if let Flow::Halt = self.run_command(machine, out, line, command)? {
                self.status = Some(ProcessStatus::QuotaExceeded);
                self.lines_executed += i;
                return Ok(i);
            }
        }
        self.lines_executed += num_lines;
        Ok(num_lines)
    }

    fn run_command(
        &mut self,
        machine: &mut Machine,
        out: &mut dyn Write,
        line: usize,
        command: Command,
    ) -> Result<Flow, TraceError> {
        debug!("process {} line {}: {}", self.id(), line, command.name());
        let id = self.id();
        let fatal = |source: KernelError| TraceError::Kernel { id, source };

        let written = match command {
            Command::Quota(quota) => {
                self.process.set_quota(quota);
                return Ok(Flow::Continue);
            }
            Command::Put { addr, bytes } => self.process.put(machine, addr, &bytes),
            Command::Fill { addr, count, value } => self.process.fill(machine, addr, count, value),
            Command::Copy { dst, src, count } => {
                let outcome = self.process.copy(machine, dst, src, count).map_err(fatal)?;
                if let Some(fault) = outcome.read_fault {
                    exception(out, READ_FAULT, line, &fault)?;
                }
                outcome.write
            }
            Command::Compare { addr, expected } => {
                let report = self.process.compare(machine, addr, &expected).map_err(fatal)?;
                for m in &report.mismatches {
                    writeln!(
                        out,
                        "compare error at address {:x}, expected {:x}, actual is {:x}",
                        m.address, m.expected, m.actual
                    )?;
                }
                if let Some(fault) = report.fault {
                    exception(out, PAGE_FAULT, line, &fault)?;
                }
                return Ok(Flow::Continue);
            }
            Command::Dump { addr, count } => {
                let report = self.process.dump(machine, addr, count).map_err(fatal)?;
                write!(out, "{:x}", report.address)?;
                for i in 0..count as usize {
                    if i % DUMP_BYTES_PER_LINE == 0 {
                        writeln!(out)?;
                    }
                    match report.bytes.get(i) {
                        Some(byte) => write!(out, " {:02x}", byte)?,
                        None => break,
                    }
                }
                writeln!(out)?;
                if let Some(fault) = report.fault {
                    exception(out, PAGE_FAULT, line, &fault)?;
                }
                return Ok(Flow::Continue);
            }
            Command::Writable {
                addr,
                count,
                writable,
            } => {
                self.process
                    .set_writable(machine, addr, count, writable)
                    .map_err(fatal)?;
                return Ok(Flow::Continue);
            }
        };

        match written {
            Ok(WriteOutcome::Complete { .. }) => Ok(Flow::Continue),
            Ok(WriteOutcome::PermissionDenied { fault, .. }) => {
                exception(out, WRITE_FAULT, line, &fault)?;
                Ok(Flow::Continue)
            }
            Err(KernelError::QuotaExceeded { quota, .. }) => {
                writeln!(out, "ERROR: memory quota {:x} exceeded", quota)?;
                Ok(Flow::Halt)
            }
            Err(source) => Err(fatal(source)),
        }
    }
}

fn exception(out: &mut dyn Write, kind: &str, line: usize, fault: &Fault) -> Result<(), TraceError> {
    writeln!(
        out,
        "Exception type {} occurred at input line {} at virtual address 0x{:08x}: {}",
        kind, line, fault.address, fault
    )?;
    Ok(())
}
