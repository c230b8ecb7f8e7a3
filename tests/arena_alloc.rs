//! Arena allocation behavior: bump accounting, commit growth, guard
//! bytes, compound allocations, checkpoints and the error contract.

mod common;

use common::header_arena;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use x1gc::arena::{Arena, ArenaConfig, HEADER_Z};
use x1gc::error::ArenaErrorKind;
use x1gc::object::TypeSeq;

#[test]
fn bump_accounting_headerless() {
    let mut arena = Arena::map(ArenaConfig::simple(64 * 1024)).unwrap();

    let p1 = arena.alloc(TypeSeq::ANON, 1);
    assert!(!p1.is_null());
    assert_eq!(p1 as usize % 8, 0);
    assert_eq!(arena.allocated(), 8);

    let p2 = arena.alloc(TypeSeq::ANON, 16);
    assert!(!p2.is_null());
    assert_eq!(arena.allocated(), 24);
    assert_eq!(p2 as usize, p1 as usize + 8);

    assert_eq!(arena.available() + arena.allocated(), arena.committed());
    assert!(arena.committed() <= arena.reserved());
}

#[test]
fn allocations_appear_in_call_order() {
    let mut arena = header_arena(256 * 1024, 0);

    let mut expected = Vec::new();
    for i in 1..40usize {
        let z = i * 3;
        let p = arena.alloc(TypeSeq(1), z);
        assert!(!p.is_null());
        expected.push((p, (z + 7) & !7));
    }

    let walked: Vec<(*mut u8, usize)> = arena.iter().map(|r| (r.mem(), r.size())).collect();
    assert_eq!(walked, expected);
}

#[test]
fn guard_bytes_written_and_checked() {
    let mut arena = header_arena(64 * 1024, 16);

    let p = arena.alloc(TypeSeq(2), 40);
    let q = arena.alloc(TypeSeq(2), 8);

    for mem in [p, q] {
        let info = arena.alloc_info(mem);
        assert!(info.is_valid());
        assert_eq!(info.guard_z(), 16);
        assert!(info.guards_intact());
        assert!(info.guard_lo().iter().all(|&b| b == 0xfd));
        assert!(info.guard_hi().iter().all(|&b| b == 0xfd));
    }
}

#[test]
fn guard_detects_overrun() {
    let mut arena = header_arena(64 * 1024, 8);

    let p = arena.alloc(TypeSeq(2), 16);
    unsafe {
        // scribble one byte past the payload
        *p.add(16) = 0;
    }

    let info = arena.alloc_info(p);
    assert!(!info.guards_intact());
}

#[test]
fn super_sub_share_one_header() {
    let mut arena = header_arena(64 * 1024, 8);

    let head = arena.super_alloc(TypeSeq(3), 10); // 16 padded
    assert!(!head.is_null());

    let s1 = arena.sub_alloc(3, false); // 8 padded
    let s2 = arena.sub_alloc(17, false); // 24 padded
    let s3 = arena.sub_alloc(32, true); // 32 padded
    assert!(!s1.is_null() && !s2.is_null() && !s3.is_null());

    // sub-allocations are contiguous with the head
    assert_eq!(s1 as usize, head as usize + 16);
    assert_eq!(s2 as usize, s1 as usize + 8);
    assert_eq!(s3 as usize, s2 as usize + 24);

    let info = arena.alloc_info(head);
    assert_eq!(info.size(), 16 + 8 + 24 + 32);
    assert!(info.guards_intact());

    // the compound allocation is one record
    let records: Vec<usize> = arena.iter().map(|r| r.size()).collect();
    assert_eq!(records, vec![16 + 8 + 24 + 32]);
}

#[test]
fn orphan_sub_alloc_is_an_error() {
    let mut arena = header_arena(64 * 1024, 0);

    assert!(arena.sub_alloc(8, false).is_null());
    assert_eq!(arena.last_error().kind, ArenaErrorKind::OrphanSubAlloc);

    // completing a super alloc clears the remembered header
    let head = arena.super_alloc(TypeSeq(1), 8);
    assert!(!head.is_null());
    assert!(!arena.sub_alloc(8, true).is_null());

    assert!(arena.sub_alloc(8, true).is_null());
    assert_eq!(arena.last_error().kind, ArenaErrorKind::OrphanSubAlloc);
}

#[test]
fn header_size_mask_rejects_oversized_request() {
    let mut cfg = ArenaConfig::simple(1024 * 1024).with_headers();
    cfg.header.tseq_bits = 44;
    cfg.header.age_bits = 8;
    cfg.header.size_bits = 12;
    let mut arena = Arena::map(cfg).unwrap();

    assert!(!arena.alloc(TypeSeq(1), 4000).is_null());

    assert!(arena.alloc(TypeSeq(1), 5000).is_null());
    assert_eq!(arena.last_error().kind, ArenaErrorKind::HeaderSizeMask);
    assert_eq!(arena.last_error().request_z, 5000);
}

#[test]
fn reserve_exhaustion_captures_error_record() {
    let mut arena = Arena::map(ArenaConfig::simple(8 * 1024)).unwrap();

    let p = arena.alloc(TypeSeq::ANON, 1024 * 1024);
    assert!(p.is_null());

    let err = arena.last_error();
    assert_eq!(err.kind, ArenaErrorKind::ReserveExhausted);
    assert_eq!(err.seq, 1);
    assert!(err.request_z >= 1024 * 1024);
    assert_eq!(err.reserved_z, arena.reserved());

    // error sequence numbers are monotonic
    assert!(arena.alloc(TypeSeq::ANON, 1024 * 1024).is_null());
    assert_eq!(arena.last_error().seq, 2);
}

#[test]
fn failed_alloc_leaves_arena_usable() {
    let mut arena = header_arena(8 * 1024, 0);

    assert!(arena.alloc(TypeSeq(1), 1024 * 1024).is_null());

    let p = arena.alloc(TypeSeq(1), 64);
    assert!(!p.is_null());
    assert_eq!(arena.iter().count(), 1);
}

#[test]
fn exact_fit_boundary() {
    let mut arena = Arena::map(ArenaConfig::simple(1024 * 1024)).unwrap();

    assert!(arena.expand(4096));
    let available = arena.available();
    let committed = arena.committed();

    assert!(!arena.alloc(TypeSeq::ANON, available).is_null());
    assert_eq!(arena.available(), 0);
    assert_eq!(arena.committed(), committed);

    // one byte more forces a fresh commit
    assert!(!arena.alloc(TypeSeq::ANON, 1).is_null());
    assert!(arena.committed() > committed);
}

#[test]
fn alloc_copy_preserves_type_and_bumps_age() {
    let mut arena = header_arena(64 * 1024, 8);

    let p = arena.alloc(TypeSeq(6), 48);
    unsafe {
        p.write_bytes(0x11, 48);
    }

    let q = arena.alloc_copy(p);
    assert!(!q.is_null());

    let info = arena.alloc_info(q);
    assert_eq!(info.tseq(), 6);
    assert_eq!(info.age(), 1);
    assert_eq!(info.size(), 48);

    // alloc_copy allocates the slot; the payload copy is the caller's job
    unsafe {
        std::ptr::copy_nonoverlapping(p, q, 48);
        assert_eq!(*q.add(47), 0x11);
    }
}

#[test]
fn checkpoint_restore_rewinds_free_pointer() {
    let mut arena = header_arena(64 * 1024, 0);

    arena.alloc(TypeSeq(1), 32);
    let ckp = arena.checkpoint();
    let allocated = arena.allocated();

    for _ in 0..10 {
        arena.alloc(TypeSeq(1), 128);
    }
    assert!(arena.allocated() > allocated);

    arena.restore(ckp);
    assert_eq!(arena.allocated(), allocated);
    assert_eq!(arena.iter().count(), 1);
}

#[test]
fn clear_resets_to_empty() {
    let mut arena = header_arena(64 * 1024, 8);

    for _ in 0..20 {
        arena.alloc(TypeSeq(1), 64);
    }
    let committed = arena.committed();

    arena.clear();

    assert_eq!(arena.committed(), committed);
    assert_eq!(arena.iter().count(), 0);
    assert_eq!(arena.available() + arena.allocated(), arena.committed());

    // reusable afterwards
    assert!(!arena.alloc(TypeSeq(1), 64).is_null());
}

#[test]
fn random_allocation_soak() {
    let mut rng = StdRng::seed_from_u64(0x1357);
    let mut arena = header_arena(8 * 1024 * 1024, 8);

    let mut expected = Vec::new();
    for _ in 0..500 {
        let z = rng.gen_range(1..=512usize);
        let tseq = rng.gen_range(1..100u32);
        let p = arena.alloc(TypeSeq(tseq), z);
        assert!(!p.is_null());
        expected.push((tseq, (z + 7) & !7));
    }

    let walked: Vec<(u32, usize)> = arena.iter().map(|r| (r.tseq(), r.size())).collect();
    assert_eq!(walked, expected);

    for record in arena.iter() {
        assert!(record.guards_intact());
    }

    // the walk accounts for every allocated byte past the initial guard
    let guard_z = 8;
    let walked_z: usize = arena.iter().map(|r| HEADER_Z + r.size() + guard_z).sum();
    assert_eq!(walked_z + guard_z, arena.allocated());
}
