pub mod error;
pub use error::KernelError;

pub mod frame_allocator;
pub use frame_allocator::PageFrameAllocator;

pub mod paging;

pub mod machine;
pub use machine::{Machine, MachineConfig};

pub mod process;
pub use process::{CompareReport, CopyOutcome, DumpReport, Mismatch, Process, WriteOutcome};
