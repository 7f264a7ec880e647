//! Page-table maintenance.
//!
//! Every helper here edits tables through the MMU and expects a physical
//! mode block to be installed. A fault while one is installed means the
//! caller forgot to switch, and surfaces as [`KernelError::UnexpectedFault`].

use log::debug;
use types::{PTE_SIZE, Pte, VirtualAddress, pte_addr};
use vm::Mmu;

use crate::error::KernelError;
use crate::machine::Machine;

fn read_pte(mmu: &mut Mmu, addr: u32) -> Result<Pte, KernelError> {
    let mut raw = [0u8; PTE_SIZE];
    mmu.get_bytes(addr, &mut raw)?;
    Ok(Pte::from_le_bytes(raw))
}

fn write_pte(mmu: &mut Mmu, addr: u32, pte: Pte) -> Result<(), KernelError> {
    mmu.put_bytes(addr, &pte.to_le_bytes())?;
    Ok(())
}

/// Allocate one frame and clear it.
pub fn alloc_zeroed_frame(machine: &mut Machine) -> Result<u32, KernelError> {
    let base = machine.allocator_mut().allocate_one()?;
    machine.mmu_mut().memory_mut().zero_frame(base)?;
    Ok(base)
}

/// Allocate and zero a fresh L1 root page table.
pub fn alloc_root(machine: &mut Machine) -> Result<u32, KernelError> {
    let root = alloc_zeroed_frame(machine)?;
    debug!("root page table at 0x{:08x}", root);
    Ok(root)
}

/// Physical address of the L2 entry for `vaddr`, or None when its L1 entry
/// is absent.
fn l2_entry_addr(mmu: &mut Mmu, root: u32, va: VirtualAddress) -> Result<Option<u32>, KernelError> {
    let l1 = read_pte(mmu, pte_addr(root, va.l1_index()))?;
    if !l1.is_present() {
        return Ok(None);
    }
    Ok(Some(pte_addr(l1.frame_base(), va.l2_index())))
}

/// Map the page holding `vaddr` to a fresh zeroed frame, creating the L2
/// table on the way if needed. Returns the data frame's base.
///
/// Mapping an already present page is an internal error.
pub fn map_page(machine: &mut Machine, root: u32, vaddr: u32) -> Result<u32, KernelError> {
    let va = VirtualAddress(vaddr).page_base();
    let l1_addr = pte_addr(root, va.l1_index());

    let mut l1 = read_pte(machine.mmu_mut(), l1_addr)?;
    if !l1.is_present() {
        let table = alloc_zeroed_frame(machine)?;
        l1 = Pte::present_writable(table);
        write_pte(machine.mmu_mut(), l1_addr, l1)?;
        debug!("L2 table for {} at 0x{:08x}", va, table);
    }

    let l2_addr = pte_addr(l1.frame_base(), va.l2_index());
    if read_pte(machine.mmu_mut(), l2_addr)?.is_present() {
        return Err(KernelError::DuplicateMapping { vaddr: va.as_u32() });
    }

    let frame = alloc_zeroed_frame(machine)?;
    write_pte(machine.mmu_mut(), l2_addr, Pte::present_writable(frame))?;
    debug!("mapped {} -> 0x{:08x}", va, frame);
    Ok(frame)
}

/// Rewrite the writable bit of the page holding `vaddr`.
///
/// Returns false, changing nothing, when the page is not mapped.
pub fn set_writable(
    machine: &mut Machine,
    root: u32,
    vaddr: u32,
    writable: bool,
) -> Result<bool, KernelError> {
    let va = VirtualAddress(vaddr);
    let mmu = machine.mmu_mut();
    let Some(l2_addr) = l2_entry_addr(mmu, root, va)? else {
        return Ok(false);
    };
    let l2 = read_pte(mmu, l2_addr)?;
    if !l2.is_present() {
        return Ok(false);
    }
    write_pte(mmu, l2_addr, l2.with_writable(writable))?;
    Ok(true)
}

/// Leaf entry for `vaddr`, if both levels are present.
pub fn lookup(machine: &mut Machine, root: u32, vaddr: u32) -> Result<Option<Pte>, KernelError> {
    let mmu = machine.mmu_mut();
    let Some(l2_addr) = l2_entry_addr(mmu, root, VirtualAddress(vaddr))? else {
        return Ok(None);
    };
    let l2 = read_pte(mmu, l2_addr)?;
    Ok(l2.is_present().then_some(l2))
}
