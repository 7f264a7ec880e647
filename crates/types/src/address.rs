use core::fmt;

use crate::mmu::{L1_SHIFT, PAGE_NUMBER_MASK, PAGE_OFFSET_MASK, PAGE_SHIFT, PAGE_SIZE, PT_INDEX_MASK};

/// Virtual address helper newtype.
///
/// Decomposes a 32-bit address into the two page-table indices and the
/// in-page offset used by the two-level walk:
///
/// ```text
///  31        22 21        12 11          0
/// +------------+------------+-------------+
/// |  L1 index  |  L2 index  |   offset    |
/// +------------+------------+-------------+
/// ```
#[derive(Clone, Copy, Eq, PartialEq, Hash, PartialOrd, Ord, Default)]
pub struct VirtualAddress(pub u32);

impl VirtualAddress {
    pub fn as_u32(self) -> u32 {
        self.0
    }

    pub fn offset(self) -> u32 {
        self.0 & PAGE_OFFSET_MASK
    }

    /// Index into the L2 table.
    pub fn l2_index(self) -> u32 {
        (self.0 >> PAGE_SHIFT) & PT_INDEX_MASK
    }

    /// Index into the L1 (root) table.
    pub fn l1_index(self) -> u32 {
        (self.0 >> L1_SHIFT) & PT_INDEX_MASK
    }

    /// Base address of the page holding this address.
    pub fn page_base(self) -> Self {
        VirtualAddress(self.0 & PAGE_NUMBER_MASK)
    }

    /// Virtual page number.
    pub fn page_number(self) -> u32 {
        self.0 >> PAGE_SHIFT
    }

    pub fn wrapping_add(self, value: u32) -> Self {
        VirtualAddress(self.0.wrapping_add(value))
    }

    pub fn checked_add(self, value: u32) -> Option<Self> {
        self.0.checked_add(value).map(VirtualAddress)
    }

    /// Bytes left in this address's page, counting the address itself.
    pub fn bytes_to_page_end(self) -> usize {
        PAGE_SIZE - self.offset() as usize
    }
}

impl From<u32> for VirtualAddress {
    fn from(value: u32) -> Self {
        VirtualAddress(value)
    }
}

impl From<VirtualAddress> for u32 {
    fn from(value: VirtualAddress) -> Self {
        value.0
    }
}

impl fmt::Debug for VirtualAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "VirtualAddress(0x{:08x})", self.0)
    }
}

impl fmt::Display for VirtualAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:08x}", self.0)
    }
}

/// Iterator over the base addresses of every page overlapping a byte range.
#[derive(Clone, Debug)]
pub struct PageRange {
    next: u32,
    remaining: u32,
}

impl Iterator for PageRange {
    type Item = VirtualAddress;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let page = VirtualAddress(self.next);
        self.next = self.next.wrapping_add(PAGE_SIZE as u32);
        self.remaining -= 1;
        Some(page)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining as usize, Some(self.remaining as usize))
    }
}

impl ExactSizeIterator for PageRange {}

/// Pages overlapping `[start, start + len)`. Ranges running past the top of
/// the address space wrap to page 0.
pub fn pages_spanned(start: u32, len: u32) -> PageRange {
    if len == 0 {
        return PageRange { next: 0, remaining: 0 };
    }
    let first = start & PAGE_NUMBER_MASK;
    let last = start.wrapping_add(len - 1) & PAGE_NUMBER_MASK;
    let remaining = (last.wrapping_sub(first) >> PAGE_SHIFT) + 1;
    PageRange { next: first, remaining }
}
