use thiserror::Error;
use vm::{Fault, MemoryError, MmuError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum KernelError {
    /// The process needed another page but already holds `quota` pages.
    /// `transferred` bytes of the operation were written before it stopped.
    #[error("memory quota {quota:x} exceeded")]
    QuotaExceeded { quota: u32, transferred: u32 },
    #[error("out of physical frames: requested {requested}, available {available}")]
    OutOfFrames { requested: u32, available: u32 },
    #[error("duplicate allocation at vaddr = 0x{vaddr:x}")]
    DuplicateMapping { vaddr: u32 },
    #[error("unexpected fault while editing page tables: {0}")]
    UnexpectedFault(Fault),
    #[error(transparent)]
    Memory(#[from] MemoryError),
}

impl KernelError {
    /// Fatal errors abort the whole run; the rest only end one process.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, KernelError::QuotaExceeded { .. })
    }
}

impl From<MmuError> for KernelError {
    fn from(err: MmuError) -> Self {
        match err {
            MmuError::Fault(fault) => KernelError::UnexpectedFault(fault),
            MmuError::Memory(err) => KernelError::Memory(err),
        }
    }
}
