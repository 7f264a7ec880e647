//! Per-process demand-paging controller.
//!
//! A [`Process`] owns one address space. Writes run in virtual mode; each
//! page fault below the quota maps the faulting page and re-issues the whole
//! transfer, so the number of attempts equals the pages newly mapped plus one.

use log::{debug, trace, warn};
use types::{PAGE_SIZE, VirtualAddress, align_down, pages_spanned};
use vm::{Fault, FaultKind, Mmu, MmuError, ModeBlock};

use crate::error::KernelError;
use crate::machine::Machine;
use crate::paging;

/// Terminal result of a put, fill or copy that did not exceed the quota.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    Complete { pages_mapped: u32 },
    /// A read-only page stopped the write. Bytes below `fault.address` were
    /// written.
    PermissionDenied { fault: Fault, pages_mapped: u32 },
}

impl WriteOutcome {
    pub fn pages_mapped(&self) -> u32 {
        match self {
            WriteOutcome::Complete { pages_mapped }
            | WriteOutcome::PermissionDenied { pages_mapped, .. } => *pages_mapped,
        }
    }

    pub fn permission_fault(&self) -> Option<Fault> {
        match self {
            WriteOutcome::Complete { .. } => None,
            WriteOutcome::PermissionDenied { fault, .. } => Some(*fault),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CopyOutcome {
    pub bytes_read: u32,
    /// Fault that cut the source read short, if any.
    pub read_fault: Option<Fault>,
    /// Result of writing the bytes read. Only a quota error is carried here;
    /// fatal errors fail the whole copy.
    pub write: Result<WriteOutcome, KernelError>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mismatch {
    pub address: u32,
    pub expected: u32,
    pub actual: u8,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompareReport {
    pub mismatches: Vec<Mismatch>,
    pub fault: Option<Fault>,
}

impl CompareReport {
    pub fn is_match(&self) -> bool {
        self.mismatches.is_empty() && self.fault.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DumpReport {
    pub address: u32,
    pub bytes: Vec<u8>,
    pub fault: Option<Fault>,
}

#[derive(Debug, Clone)]
pub struct Process {
    id: u32,
    virtual_block: ModeBlock,
    physical_block: ModeBlock,
    allocated_pages: u32,
    quota: u32,
}

impl Process {
    /// Create a process with an empty address space. The root table frame
    /// is allocated here and is not charged to `quota`.
    pub fn new(id: u32, machine: &mut Machine, quota: u32) -> Result<Self, KernelError> {
        let physical_block = ModeBlock::physical();
        machine.mmu_mut().set_mode_block(physical_block);
        let root = paging::alloc_root(machine)?;
        let virtual_block = ModeBlock::translated(root);
        machine.mmu_mut().set_mode_block(virtual_block);
        debug!("process {} root 0x{:08x} quota {:#x}", id, root, quota);
        Ok(Self {
            id,
            virtual_block,
            physical_block,
            allocated_pages: 0,
            quota,
        })
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn quota(&self) -> u32 {
        self.quota
    }

    pub fn set_quota(&mut self, quota: u32) {
        debug!("process {} quota {:#x} -> {:#x}", self.id, self.quota, quota);
        self.quota = quota;
    }

    /// Data pages mapped so far. Page tables are not counted.
    pub fn allocated_pages(&self) -> u32 {
        self.allocated_pages
    }

    pub fn page_table_root(&self) -> u32 {
        self.virtual_block.page_table_base
    }

    /// The virtual mode block as of the last operation.
    pub fn mode_block(&self) -> ModeBlock {
        self.virtual_block
    }

    /// Install this process's address space with a cleared operation state.
    fn enter(&mut self, machine: &mut Machine) {
        self.virtual_block.clear_operation();
        machine.mmu_mut().set_mode_block(self.virtual_block);
    }

    /// Pick up the fault-reporting fields the MMU left in the installed block.
    fn sync(&mut self, machine: &Machine) {
        self.virtual_block = machine.mmu().mode_block();
    }

    /// Run `attempt` until it covers `[start, start + len)`, mapping one page
    /// per page fault while the quota allows.
    fn write_with_paging<F>(
        &mut self,
        machine: &mut Machine,
        start: u32,
        len: u32,
        mut attempt: F,
    ) -> Result<WriteOutcome, KernelError>
    where
        F: FnMut(&mut Mmu) -> Result<(), MmuError>,
    {
        let mut pages_mapped = 0;
        loop {
            self.enter(machine);
            let result = attempt(machine.mmu_mut());
            self.sync(machine);

            let fault = match result {
                Ok(()) => return Ok(WriteOutcome::Complete { pages_mapped }),
                Err(MmuError::Memory(err)) => return Err(err.into()),
                Err(MmuError::Fault(fault)) => fault,
            };

            if fault.kind == FaultKind::WritePermission {
                warn!("process {}: {}", self.id, fault);
                return Ok(WriteOutcome::PermissionDenied {
                    fault,
                    pages_mapped,
                });
            }

            let done = fault.address.wrapping_sub(start);
            if done >= len {
                return Ok(WriteOutcome::Complete { pages_mapped });
            }
            if self.allocated_pages >= self.quota {
                warn!(
                    "process {}: quota {:#x} exhausted at {}",
                    self.id,
                    self.quota,
                    VirtualAddress(fault.address)
                );
                return Err(KernelError::QuotaExceeded {
                    quota: self.quota,
                    transferred: done,
                });
            }

            machine.mmu_mut().set_mode_block(self.physical_block);
            paging::map_page(machine, self.page_table_root(), align_down(fault.address))?;
            self.allocated_pages += 1;
            pages_mapped += 1;
            trace!(
                "process {}: retrying write at 0x{:08x} after {} bytes",
                self.id, start, done
            );
        }
    }

    /// Write `data` at `addr`, mapping pages on demand.
    pub fn put(&mut self, machine: &mut Machine, addr: u32, data: &[u8]) -> Result<WriteOutcome, KernelError> {
        debug!(
            "process {} put 0x{:08x} [{}]",
            self.id,
            addr,
            hex::encode(data)
        );
        let len = data.len() as u32;
        self.write_with_paging(machine, addr, len, |mmu| mmu.put_bytes(addr, data))
    }

    /// Write `value` into `count` bytes at `addr`, one byte at a time.
    pub fn fill(
        &mut self,
        machine: &mut Machine,
        addr: u32,
        count: u32,
        value: u8,
    ) -> Result<WriteOutcome, KernelError> {
        debug!(
            "process {} fill 0x{:08x} count {:#x} value {:02x}",
            self.id, addr, count, value
        );
        self.write_with_paging(machine, addr, count, |mmu| {
            for i in 0..count {
                mmu.put_byte(addr.wrapping_add(i), value)?;
            }
            Ok(())
        })
    }

    /// Read up to `count` bytes at `addr`, stopping at the first fault.
    /// Never maps anything.
    pub fn read(
        &mut self,
        machine: &mut Machine,
        addr: u32,
        count: u32,
    ) -> Result<(Vec<u8>, Option<Fault>), KernelError> {
        self.enter(machine);
        let mut bytes = Vec::new();
        let mut fault = None;
        let mut chunk = [0u8; PAGE_SIZE];
        while (bytes.len() as u32) < count {
            let va = VirtualAddress(addr).wrapping_add(bytes.len() as u32);
            let want = va
                .bytes_to_page_end()
                .min((count - bytes.len() as u32) as usize);
            match machine.mmu_mut().get_bytes(va.as_u32(), &mut chunk[..want]) {
                Ok(()) => bytes.extend_from_slice(&chunk[..want]),
                Err(MmuError::Fault(mut f)) => {
                    // Report relative to the whole read
                    f.transferred = bytes.len();
                    fault = Some(f);
                    break;
                }
                Err(MmuError::Memory(err)) => return Err(err.into()),
            }
        }
        self.sync(machine);
        Ok((bytes, fault))
    }

    /// Copy up to `count` bytes from `src` to `dst`. Only the bytes readable
    /// before the first source fault are written; missing source pages are
    /// never created.
    pub fn copy(
        &mut self,
        machine: &mut Machine,
        dst: u32,
        src: u32,
        count: u32,
    ) -> Result<CopyOutcome, KernelError> {
        let (bytes, read_fault) = self.read(machine, src, count)?;
        if let Some(fault) = read_fault {
            debug!("process {} copy source: {}", self.id, fault);
        }
        let write = match self.put(machine, dst, &bytes) {
            Err(err) if err.is_fatal() => return Err(err),
            write => write,
        };
        Ok(CopyOutcome {
            bytes_read: bytes.len() as u32,
            read_fault,
            write,
        })
    }

    /// Compare memory at `addr` against `expected`. Memory is left unchanged.
    /// A fault anywhere in the range reports only the fault.
    pub fn compare(
        &mut self,
        machine: &mut Machine,
        addr: u32,
        expected: &[u32],
    ) -> Result<CompareReport, KernelError> {
        let (actual, fault) = self.read(machine, addr, expected.len() as u32)?;
        if fault.is_some() {
            return Ok(CompareReport {
                mismatches: Vec::new(),
                fault,
            });
        }
        let mismatches = expected
            .iter()
            .zip(actual.iter())
            .enumerate()
            .filter(|(_, (e, a))| **e != u32::from(**a))
            .map(|(i, (e, a))| Mismatch {
                address: addr.wrapping_add(i as u32),
                expected: *e,
                actual: *a,
            })
            .collect();
        Ok(CompareReport { mismatches, fault: None })
    }

    pub fn dump(&mut self, machine: &mut Machine, addr: u32, count: u32) -> Result<DumpReport, KernelError> {
        let (bytes, fault) = self.read(machine, addr, count)?;
        Ok(DumpReport {
            address: addr,
            bytes,
            fault,
        })
    }

    /// Set or clear the writable bit of every mapped page overlapping
    /// `[addr, addr + byte_count)`. Returns the number of pages changed.
    pub fn set_writable(
        &mut self,
        machine: &mut Machine,
        addr: u32,
        byte_count: u32,
        writable: bool,
    ) -> Result<u32, KernelError> {
        machine.mmu_mut().set_mode_block(self.physical_block);
        let mut changed = 0;
        for page in pages_spanned(addr, byte_count) {
            if paging::set_writable(machine, self.page_table_root(), page.as_u32(), writable)? {
                changed += 1;
            }
        }
        self.enter(machine);
        debug!(
            "process {} writable={} on {} page(s) from {}",
            self.id,
            writable,
            changed,
            VirtualAddress(addr)
        );
        Ok(changed)
    }
}
