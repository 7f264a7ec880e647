use std::io::{BufRead, Write};
use std::path::Path;

use kernel::Machine;
use log::{debug, info};

use crate::config::SimConfig;
use crate::error::TraceError;
use crate::report::ProcessSummary;
use crate::runner::TraceProcess;

/// Round-robin driver over every trace sharing one machine.
pub struct Scheduler {
    machine: Machine,
    processes: Vec<TraceProcess>,
    quantum: usize,
    default_quota: u32,
}

impl Scheduler {
    pub fn new(config: &SimConfig) -> Result<Self, TraceError> {
        config.validate()?;
        Ok(Self {
            machine: Machine::new(config.machine()),
            processes: Vec::new(),
            quantum: config.quantum,
            default_quota: config.default_quota,
        })
    }

    fn next_id(&self) -> u32 {
        self.processes.len() as u32 + 1
    }

    /// Open the trace at `path` as the next process. Returns its id.
    pub fn open_trace(&mut self, path: &Path) -> Result<u32, TraceError> {
        let id = self.next_id();
        let process = TraceProcess::open(path, id, &mut self.machine, self.default_quota)?;
        self.processes.push(process);
        Ok(id)
    }

    /// Add an in-memory trace as the next process. Returns its id.
    pub fn add_trace(&mut self, input: Box<dyn BufRead>, name: &str) -> Result<u32, TraceError> {
        let id = self.next_id();
        let process = TraceProcess::from_reader(input, name, id, &mut self.machine, self.default_quota)?;
        self.processes.push(process);
        Ok(id)
    }

    pub fn machine(&self) -> &Machine {
        &self.machine
    }

    /// Run every process a quantum at a time until all have stopped.
    pub fn run(&mut self, out: &mut dyn Write) -> Result<Vec<ProcessSummary>, TraceError> {
        let mut active: Vec<usize> = (0..self.processes.len()).collect();
        let mut round = 0;
        while !active.is_empty() {
            round += 1;
            debug!("round {}: {} active process(es)", round, active.len());
            let mut still_active = Vec::with_capacity(active.len());
            for index in active {
                let process = &mut self.processes[index];
                let ran = process.execute(&mut self.machine, out, self.quantum)?;
                if ran == self.quantum {
                    still_active.push(index);
                } else {
                    info!(
                        "process {} stopped after {} line(s)",
                        process.id(),
                        process.summary().lines_executed
                    );
                }
            }
            active = still_active;
        }
        info!(
            "{} frame(s) used of {}",
            self.machine.allocator().allocated(),
            self.machine.mmu().memory().frame_count()
        );
        Ok(self.processes.iter().map(TraceProcess::summary).collect())
    }
}
