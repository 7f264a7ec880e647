#![no_std]

pub mod address;
pub use address::{PageRange, VirtualAddress, pages_spanned};

// Page-table geometry and PTE encoding
pub mod mmu;
pub use mmu::*;
