use vm::{Mmu, PhysicalMemory};

use crate::frame_allocator::PageFrameAllocator;

pub const DEFAULT_FRAMES: u32 = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MachineConfig {
    /// Number of 4 KiB physical frames.
    pub frames: u32,
}

impl Default for MachineConfig {
    fn default() -> Self {
        Self {
            frames: DEFAULT_FRAMES,
        }
    }
}

/// The simulated machine: one MMU over physical memory plus the frame pool
/// carved out of that memory.
///
/// Every process operation borrows the machine mutably, so mode-block
/// installation and frame allocation never interleave between processes.
#[derive(Debug)]
pub struct Machine {
    mmu: Mmu,
    allocator: PageFrameAllocator,
}

impl Machine {
    pub fn new(config: MachineConfig) -> Self {
        let memory = PhysicalMemory::new(config.frames);
        let allocator = PageFrameAllocator::for_memory(&memory);
        Self {
            mmu: Mmu::with_memory(memory),
            allocator,
        }
    }

    pub fn with_frames(frames: u32) -> Self {
        Self::new(MachineConfig { frames })
    }

    pub fn mmu(&self) -> &Mmu {
        &self.mmu
    }

    pub fn mmu_mut(&mut self) -> &mut Mmu {
        &mut self.mmu
    }

    pub fn allocator(&self) -> &PageFrameAllocator {
        &self.allocator
    }

    pub fn allocator_mut(&mut self) -> &mut PageFrameAllocator {
        &mut self.allocator
    }
}
