pub mod fault;
pub mod memory;
pub mod mmu;
pub mod mode;

pub use fault::{AccessKind, Fault, FaultKind, MmuError};
pub use memory::{MemoryError, PhysicalMemory};
pub use mmu::Mmu;
pub use mode::{AddressingMode, ModeBlock, OperationState};
