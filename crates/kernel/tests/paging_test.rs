use kernel::{KernelError, Machine, paging};
use types::{Pte, pte_addr};
use vm::ModeBlock;

fn machine_with_root(frames: u32) -> (Machine, u32) {
    let mut machine = Machine::with_frames(frames);
    machine.mmu_mut().set_mode_block(ModeBlock::physical());
    let root = paging::alloc_root(&mut machine).unwrap();
    (machine, root)
}

#[test]
fn test_map_page_builds_both_levels() {
    let (mut machine, root) = machine_with_root(8);
    let frame = paging::map_page(&mut machine, root, 0x0040_3abc).unwrap();

    // root, L2 table, data frame
    assert_eq!(machine.allocator().allocated(), 3);
    let memory = machine.mmu().memory();
    let l1 = memory.load_pte(pte_addr(root, 1)).unwrap();
    assert!(l1.is_present() && l1.is_writable());
    let l2 = memory.load_pte(pte_addr(l1.frame_base(), 3)).unwrap();
    assert_eq!(l2, Pte::present_writable(frame));

    let found = paging::lookup(&mut machine, root, 0x0040_3000).unwrap();
    assert_eq!(found, Some(l2));
}

#[test]
fn test_second_page_reuses_l2_table() {
    let (mut machine, root) = machine_with_root(8);
    paging::map_page(&mut machine, root, 0x1000).unwrap();
    paging::map_page(&mut machine, root, 0x2000).unwrap();
    assert_eq!(machine.allocator().allocated(), 4);
}

#[test]
fn test_duplicate_mapping_is_fatal() {
    let (mut machine, root) = machine_with_root(8);
    paging::map_page(&mut machine, root, 0x5000).unwrap();
    let err = paging::map_page(&mut machine, root, 0x5123).unwrap_err();
    assert_eq!(err, KernelError::DuplicateMapping { vaddr: 0x5000 });
    assert!(err.is_fatal());
}

#[test]
fn test_set_writable_skips_unmapped_pages() {
    let (mut machine, root) = machine_with_root(8);
    assert!(!paging::set_writable(&mut machine, root, 0x9000, false).unwrap());

    paging::map_page(&mut machine, root, 0x9000).unwrap();
    // L1 present, L2 entry absent
    assert!(!paging::set_writable(&mut machine, root, 0xa000, false).unwrap());

    assert!(paging::set_writable(&mut machine, root, 0x9000, false).unwrap());
    let pte = paging::lookup(&mut machine, root, 0x9000).unwrap().unwrap();
    assert!(pte.is_present());
    assert!(!pte.is_writable());

    assert!(paging::set_writable(&mut machine, root, 0x9fff, true).unwrap());
    assert!(paging::lookup(&mut machine, root, 0x9000).unwrap().unwrap().is_writable());
}

#[test]
fn test_editing_tables_in_virtual_mode_is_an_error() {
    let (mut machine, root) = machine_with_root(8);
    machine.mmu_mut().set_mode_block(ModeBlock::translated(root));
    let err = paging::map_page(&mut machine, root, 0x1000).unwrap_err();
    assert!(matches!(err, KernelError::UnexpectedFault(_)));
}

#[test]
fn test_out_of_frames_while_mapping() {
    // Room for the root and the L2 table but not the data frame
    let (mut machine, root) = machine_with_root(2);
    let err = paging::map_page(&mut machine, root, 0x1000).unwrap_err();
    assert_eq!(
        err,
        KernelError::OutOfFrames {
            requested: 1,
            available: 0
        }
    );
}
