pub mod command;
pub use command::{Command, parse_command, parse_hex};

pub mod config;
pub use config::SimConfig;

pub mod error;
pub use error::TraceError;

pub mod reader;
pub use reader::TraceReader;

pub mod report;
pub use report::{ProcessStatus, ProcessSummary};

pub mod runner;
pub use runner::TraceProcess;

pub mod scheduler;
pub use scheduler::Scheduler;
