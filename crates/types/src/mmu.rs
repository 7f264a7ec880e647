use bitflags::bitflags;

/// Page size in bytes (4 KiB).
pub const PAGE_SIZE: usize = 4096;
/// Number of in-page offset bits.
pub const PAGE_SHIFT: u32 = 12;
/// Mask selecting the in-page offset of an address.
pub const PAGE_OFFSET_MASK: u32 = 0xfff;
/// Mask selecting the page base (page number bits) of an address.
pub const PAGE_NUMBER_MASK: u32 = !PAGE_OFFSET_MASK;

/// Number of bits in a page-table index.
pub const PT_INDEX_BITS: u32 = 10;
/// Mask applied to a shifted address to obtain a page-table index.
pub const PT_INDEX_MASK: u32 = 0x3ff;
/// Entries per page table; one table fills exactly one page.
pub const PT_ENTRIES: usize = 1 << PT_INDEX_BITS;
/// Size of a single PTE in bytes.
pub const PTE_SIZE: usize = core::mem::size_of::<u32>();

/// Shift that moves the L1 index of a virtual address into the low bits.
pub const L1_SHIFT: u32 = PAGE_SHIFT + PT_INDEX_BITS;

bitflags! {
    /// Flag bits stored in the low bits of a PTE.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct PteFlags: u32 {
        /// Entry refers to a valid frame or table.
        const PRESENT = 1 << 0;
        /// Stores through this entry are allowed.
        const WRITABLE = 1 << 1;
    }
}

/// Page table entry in its simulated hardware encoding.
///
/// Layout (32 bits, stored little-endian in physical memory):
/// - bit 0: present
/// - bit 1: writable
/// - bits 12..31: page-aligned physical base of the next-level table (L1
///   entries) or of the mapped data frame (L2 entries)
///
/// L1 and L2 entries share this encoding; which one an entry is follows from
/// where it was read.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Pte(u32);

impl Pte {
    /// Entry with no bits set (not present).
    pub const EMPTY: Pte = Pte(0);

    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    pub const fn raw(self) -> u32 {
        self.0
    }

    /// Build an entry pointing at `frame_base`. Offset bits of the base are dropped.
    pub fn new(frame_base: u32, flags: PteFlags) -> Self {
        Self((frame_base & PAGE_NUMBER_MASK) | flags.bits())
    }

    /// Present, writable entry for a freshly allocated table or frame.
    pub fn present_writable(frame_base: u32) -> Self {
        Self::new(frame_base, PteFlags::PRESENT | PteFlags::WRITABLE)
    }

    pub fn flags(self) -> PteFlags {
        PteFlags::from_bits_truncate(self.0)
    }

    pub fn is_present(self) -> bool {
        self.flags().contains(PteFlags::PRESENT)
    }

    pub fn is_writable(self) -> bool {
        self.flags().contains(PteFlags::WRITABLE)
    }

    /// Physical base of the referenced table or frame.
    pub fn frame_base(self) -> u32 {
        self.0 & PAGE_NUMBER_MASK
    }

    /// Same entry with only the writable bit rewritten.
    pub fn with_writable(self, writable: bool) -> Self {
        if writable {
            Self(self.0 | PteFlags::WRITABLE.bits())
        } else {
            Self(self.0 & !PteFlags::WRITABLE.bits())
        }
    }

    pub fn to_le_bytes(self) -> [u8; PTE_SIZE] {
        self.0.to_le_bytes()
    }

    pub fn from_le_bytes(bytes: [u8; PTE_SIZE]) -> Self {
        Self(u32::from_le_bytes(bytes))
    }
}

/// Physical address of entry `index` in the table based at `table_base`.
pub const fn pte_addr(table_base: u32, index: u32) -> u32 {
    table_base.wrapping_add(index.wrapping_mul(PTE_SIZE as u32))
}

pub const fn align_down(addr: u32) -> u32 {
    addr & PAGE_NUMBER_MASK
}

pub const fn is_page_aligned(addr: u32) -> bool {
    addr & PAGE_OFFSET_MASK == 0
}
