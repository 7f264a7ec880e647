use core::fmt;

use thiserror::Error;

use crate::memory::MemoryError;

/// Identifies the type of access a translated call performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessKind {
    Read,
    Write,
}

/// Why translation stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultKind {
    /// No present L1 or L2 entry covers the address. Resolvable by mapping a page.
    PageFault,
    /// The page is mapped but its L2 entry is not writable. Never resolved by mapping.
    WritePermission,
}

impl fmt::Display for FaultKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FaultKind::PageFault => f.write_str("page fault"),
            FaultKind::WritePermission => f.write_str("write permission fault"),
        }
    }
}

/// A translated call stopped at `address` after moving `transferred` bytes.
///
/// Every byte strictly below `address` in the call was transferred; nothing
/// at or above it was.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("{kind} at virtual address 0x{address:08x}")]
pub struct Fault {
    pub kind: FaultKind,
    pub address: u32,
    pub transferred: usize,
}

impl Fault {
    pub fn is_page_fault(&self) -> bool {
        self.kind == FaultKind::PageFault
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum MmuError {
    #[error(transparent)]
    Fault(#[from] Fault),
    #[error(transparent)]
    Memory(#[from] MemoryError),
}

impl MmuError {
    /// The recoverable fault, if this is one.
    pub fn fault(&self) -> Option<Fault> {
        match self {
            MmuError::Fault(fault) => Some(*fault),
            MmuError::Memory(_) => None,
        }
    }
}
