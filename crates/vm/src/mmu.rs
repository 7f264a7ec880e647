use log::trace;
use types::{Pte, VirtualAddress, pte_addr};

use crate::fault::{AccessKind, Fault, FaultKind, MmuError};
use crate::memory::PhysicalMemory;
use crate::mode::{ModeBlock, OperationState};

/// Software MMU backed by a contiguous physical store.
///
/// Design at a glance:
/// - Physical memory is a single owned byte arena; frames are 4 KiB slices into it.
/// - All accesses go through the installed [`ModeBlock`]. In physical mode
///   addresses index the arena directly. In virtual mode each page is resolved
///   by walking the two-level table rooted at `page_table_base` (L1 index →
///   L2 index → frame).
/// - Page tables live in the arena itself as little-endian [`Pte`]s, so the
///   owner of the tables edits them by installing a physical block and
///   writing bytes.
/// - A translated call that cannot proceed stops at the first faulting byte
///   and returns a [`Fault`]. Everything before it has been transferred.
///   The installed block mirrors the outcome in `next_vaddress` and
///   `operation_state`.
///
/// Limitations:
/// - No TLB; every page crossing re-walks the table.
/// - No read permission bit; only stores are checked against `WRITABLE`.
#[derive(Debug)]
pub struct Mmu {
    memory: PhysicalMemory,
    pmcb: ModeBlock,
}

impl Mmu {
    /// MMU over `frame_count` zeroed frames, starting in physical mode.
    pub fn new(frame_count: u32) -> Self {
        Self::with_memory(PhysicalMemory::new(frame_count))
    }

    pub fn with_memory(memory: PhysicalMemory) -> Self {
        Self {
            memory,
            pmcb: ModeBlock::physical(),
        }
    }

    pub fn memory(&self) -> &PhysicalMemory {
        &self.memory
    }

    pub fn memory_mut(&mut self) -> &mut PhysicalMemory {
        &mut self.memory
    }

    /// Install `pmcb` as the active mode block.
    pub fn set_mode_block(&mut self, pmcb: ModeBlock) {
        self.pmcb = pmcb;
    }

    /// Copy of the active mode block, including fault-reporting fields.
    pub fn mode_block(&self) -> ModeBlock {
        self.pmcb
    }

    pub fn get_byte(&mut self, addr: u32) -> Result<u8, MmuError> {
        let mut buf = [0u8; 1];
        self.get_bytes(addr, &mut buf)?;
        Ok(buf[0])
    }

    pub fn put_byte(&mut self, addr: u32, value: u8) -> Result<(), MmuError> {
        self.put_bytes(addr, &[value])
    }

    /// Read `buf.len()` bytes starting at `addr`.
    pub fn get_bytes(&mut self, addr: u32, buf: &mut [u8]) -> Result<(), MmuError> {
        if !self.pmcb.is_virtual() {
            self.memory.read(addr, buf)?;
            return Ok(());
        }

        self.pmcb.operation_state = OperationState::Reading;
        let mut done = 0usize;
        while done < buf.len() {
            let va = VirtualAddress(addr).wrapping_add(done as u32);
            let pa = self.translate_or_fault(va, AccessKind::Read, done)?;
            let chunk = va.bytes_to_page_end().min(buf.len() - done);
            self.memory.read(pa, &mut buf[done..done + chunk])?;
            done += chunk;
        }
        self.finish(addr, done);
        Ok(())
    }

    /// Write `data` starting at `addr`.
    pub fn put_bytes(&mut self, addr: u32, data: &[u8]) -> Result<(), MmuError> {
        if !self.pmcb.is_virtual() {
            self.memory.write(addr, data)?;
            return Ok(());
        }

        self.pmcb.operation_state = OperationState::Writing;
        let mut done = 0usize;
        while done < data.len() {
            let va = VirtualAddress(addr).wrapping_add(done as u32);
            let pa = self.translate_or_fault(va, AccessKind::Write, done)?;
            let chunk = va.bytes_to_page_end().min(data.len() - done);
            self.memory.write(pa, &data[done..done + chunk])?;
            done += chunk;
        }
        self.finish(addr, done);
        Ok(())
    }

    /// Translate `va` through the installed block, checking `access` against
    /// the leaf entry. Physical mode maps addresses to themselves.
    ///
    /// Faults returned from here report `transferred: 0`.
    pub fn translate(&self, va: VirtualAddress, access: AccessKind) -> Result<u32, MmuError> {
        if !self.pmcb.is_virtual() {
            return Ok(va.as_u32());
        }
        let fault = |kind| {
            MmuError::Fault(Fault {
                kind,
                address: va.as_u32(),
                transferred: 0,
            })
        };

        let l1 = self
            .memory
            .load_pte(pte_addr(self.pmcb.page_table_base, va.l1_index()))?;
        if !l1.is_present() {
            return Err(fault(FaultKind::PageFault));
        }

        let l2: Pte = self
            .memory
            .load_pte(pte_addr(l1.frame_base(), va.l2_index()))?;
        if !l2.is_present() {
            return Err(fault(FaultKind::PageFault));
        }
        if access == AccessKind::Write && !l2.is_writable() {
            return Err(fault(FaultKind::WritePermission));
        }

        Ok(l2.frame_base() + va.offset())
    }

    fn translate_or_fault(
        &mut self,
        va: VirtualAddress,
        access: AccessKind,
        done: usize,
    ) -> Result<u32, MmuError> {
        match self.translate(va, access) {
            Ok(pa) => Ok(pa),
            Err(MmuError::Fault(mut fault)) => {
                fault.transferred = done;
                self.pmcb.next_vaddress = fault.address;
                trace!(
                    "{} after {} bytes (root 0x{:08x})",
                    fault, done, self.pmcb.page_table_base
                );
                Err(MmuError::Fault(fault))
            }
            Err(err) => Err(err),
        }
    }

    fn finish(&mut self, addr: u32, done: usize) {
        self.pmcb.next_vaddress = addr.wrapping_add(done as u32);
        self.pmcb.operation_state = OperationState::None;
    }
}
