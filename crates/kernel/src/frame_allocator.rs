use log::debug;
use types::PAGE_SHIFT;
use vm::PhysicalMemory;

use crate::error::KernelError;

/// Bump allocator over physical frames `[next_frame, limit_frame)`.
///
/// Frames are handed out in ascending order and never returned.
#[derive(Debug, Clone, Copy)]
pub struct PageFrameAllocator {
    next_frame: u32,
    limit_frame: u32,
    first_frame: u32,
}

impl PageFrameAllocator {
    /// Create a bump-frame allocator over frame numbers [start_frame, limit_frame).
    pub const fn new(start_frame: u32, limit_frame: u32) -> Self {
        Self {
            next_frame: start_frame,
            limit_frame,
            first_frame: start_frame,
        }
    }

    /// Allocator covering every frame of `memory`.
    pub fn for_memory(memory: &PhysicalMemory) -> Self {
        Self::new(0, memory.frame_count())
    }

    /// Allocate `count` frames and return their base addresses.
    ///
    /// All-or-nothing: when fewer than `count` frames remain nothing is
    /// consumed.
    pub fn allocate(&mut self, count: u32) -> Result<Vec<u32>, KernelError> {
        let available = self.available();
        if count > available {
            return Err(KernelError::OutOfFrames {
                requested: count,
                available,
            });
        }
        let frames: Vec<u32> = (self.next_frame..self.next_frame + count)
            .map(|frame| frame << PAGE_SHIFT)
            .collect();
        self.next_frame += count;
        debug!(
            "allocated {} frame(s) at {:x?}, {} left",
            count,
            frames,
            self.available()
        );
        Ok(frames)
    }

    /// Allocate a single frame.
    pub fn allocate_one(&mut self) -> Result<u32, KernelError> {
        Ok(self.allocate(1)?[0])
    }

    pub fn available(&self) -> u32 {
        self.limit_frame.saturating_sub(self.next_frame)
    }

    pub fn allocated(&self) -> u32 {
        self.next_frame - self.first_frame
    }
}
