use std::ops::Range;

use thiserror::Error;
use types::{PAGE_SIZE, PTE_SIZE, Pte};

/// Fatal physical-store failure. Never produced by a well-formed page table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum MemoryError {
    #[error("physical access out of bounds: addr = 0x{addr:08x}, len = {len}, size = 0x{size:x}")]
    OutOfRange { addr: u32, len: usize, size: usize },
}

/// Contiguous physical backing store. Frames are 4 KiB slices into it.
#[derive(Debug, Clone)]
pub struct PhysicalMemory {
    backing: Vec<u8>,
}

impl PhysicalMemory {
    /// Zeroed store holding `frame_count` frames.
    pub fn new(frame_count: u32) -> Self {
        let size = (frame_count as usize)
            .checked_mul(PAGE_SIZE)
            .filter(|size| *size <= u32::MAX as usize + 1)
            .unwrap_or(u32::MAX as usize + 1);
        Self {
            backing: vec![0u8; size],
        }
    }

    pub fn size(&self) -> usize {
        self.backing.len()
    }

    pub fn frame_count(&self) -> u32 {
        (self.backing.len() / PAGE_SIZE) as u32
    }

    fn range(&self, addr: u32, len: usize) -> Result<Range<usize>, MemoryError> {
        let start = addr as usize;
        match start.checked_add(len) {
            Some(end) if end <= self.backing.len() => Ok(start..end),
            _ => Err(MemoryError::OutOfRange {
                addr,
                len,
                size: self.backing.len(),
            }),
        }
    }

    pub fn load_byte(&self, addr: u32) -> Result<u8, MemoryError> {
        let range = self.range(addr, 1)?;
        Ok(self.backing[range.start])
    }

    pub fn store_byte(&mut self, addr: u32, value: u8) -> Result<(), MemoryError> {
        let range = self.range(addr, 1)?;
        self.backing[range.start] = value;
        Ok(())
    }

    /// Fill `buf` from physical memory starting at `addr`.
    pub fn read(&self, addr: u32, buf: &mut [u8]) -> Result<(), MemoryError> {
        let range = self.range(addr, buf.len())?;
        buf.copy_from_slice(&self.backing[range]);
        Ok(())
    }

    /// Copy `data` into physical memory starting at `addr`.
    pub fn write(&mut self, addr: u32, data: &[u8]) -> Result<(), MemoryError> {
        let range = self.range(addr, data.len())?;
        self.backing[range].copy_from_slice(data);
        Ok(())
    }

    pub fn load_u32(&self, addr: u32) -> Result<u32, MemoryError> {
        let mut raw = [0u8; 4];
        self.read(addr, &mut raw)?;
        Ok(u32::from_le_bytes(raw))
    }

    pub fn store_u32(&mut self, addr: u32, value: u32) -> Result<(), MemoryError> {
        self.write(addr, &value.to_le_bytes())
    }

    pub fn load_pte(&self, addr: u32) -> Result<Pte, MemoryError> {
        let mut raw = [0u8; PTE_SIZE];
        self.read(addr, &mut raw)?;
        Ok(Pte::from_le_bytes(raw))
    }

    pub fn store_pte(&mut self, addr: u32, pte: Pte) -> Result<(), MemoryError> {
        self.write(addr, &pte.to_le_bytes())
    }

    /// Zero the frame based at `frame_base`.
    pub fn zero_frame(&mut self, frame_base: u32) -> Result<(), MemoryError> {
        let range = self.range(frame_base, PAGE_SIZE)?;
        self.backing[range].fill(0);
        Ok(())
    }

    /// Borrow `[start, end)` of the store, or None when out of range.
    pub fn mem_slice(&self, start: u32, end: u32) -> Option<&[u8]> {
        if start > end {
            return None;
        }
        self.backing.get(start as usize..end as usize)
    }
}
