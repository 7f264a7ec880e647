/// Whether accesses are translated through a page table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AddressingMode {
    #[default]
    Physical,
    Virtual,
}

/// Kind of transfer the current translated call is performing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OperationState {
    #[default]
    None,
    Reading,
    Writing,
}

/// Addressing-mode control block for one address space.
///
/// Exactly one block is installed in the [`Mmu`](crate::Mmu) at a time.
/// Switching address spaces, or between physical and virtual access, means
/// installing a different block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ModeBlock {
    pub mode: AddressingMode,
    /// Physical base of the root (L1) page table. Unused in physical mode.
    pub page_table_base: u32,
    pub operation_state: OperationState,
    /// Address following the last byte transferred by the latest translated
    /// call: the faulting address if it faulted, `start + len` otherwise.
    pub next_vaddress: u32,
}

impl ModeBlock {
    /// Block for direct physical access.
    pub const fn physical() -> Self {
        Self {
            mode: AddressingMode::Physical,
            page_table_base: 0,
            operation_state: OperationState::None,
            next_vaddress: 0,
        }
    }

    /// Block translating through the L1 table at `page_table_base`.
    pub const fn translated(page_table_base: u32) -> Self {
        Self {
            mode: AddressingMode::Virtual,
            page_table_base,
            operation_state: OperationState::None,
            next_vaddress: 0,
        }
    }

    pub fn is_virtual(&self) -> bool {
        self.mode == AddressingMode::Virtual
    }

    pub fn clear_operation(&mut self) {
        self.operation_state = OperationState::None;
    }
}
