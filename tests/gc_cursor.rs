//! Cross-generation iteration over the collector's to-spaces.

mod common;

use common::{collector, Leaf};
use x1gc::arena::construct_in;
use x1gc::gc::Generation;
use x1gc::object::Obj;

#[test]
fn empty_collector_yields_nothing() {
    let gc = collector("cursor-empty");

    assert!(gc.begin() == gc.end());
    assert_eq!(gc.iter().count(), 0);
}

#[test]
fn fresh_allocations_visited_in_order() {
    let mut gc = collector("cursor-order");

    for i in 0..5u64 {
        construct_in(&mut gc, Leaf { value: i });
    }

    let values: Vec<u64> = gc
        .iter()
        .map(|info| unsafe { *(info.mem() as *const u64) })
        .collect();
    assert_eq!(values, vec![0, 1, 2, 3, 4]);
}

#[test]
fn iteration_spans_generations_young_first() {
    let mut gc = collector("cursor-gens"); // survive_threshold = 2

    // promote one object into generation 1
    let old = construct_in(&mut gc, Leaf { value: 100 });
    let mut old_root = Obj::of(old);
    gc.add_root(&mut old_root);
    gc.execute_gc(Generation(1));
    gc.execute_gc(Generation(1));
    assert!(gc.to_space(Generation(1)).contains(old_root.data()));

    // and allocate a fresh one in generation 0
    let young = construct_in(&mut gc, Leaf { value: 1 });
    let mut young_root = Obj::of(young);
    gc.add_root(&mut young_root);

    let seen: Vec<(u32, u64)> = {
        let mut cursor = gc.begin();
        let mut out = Vec::new();
        while cursor != gc.end() {
            let info = cursor.deref().unwrap();
            out.push((cursor.generation().value(), unsafe { *(info.mem() as *const u64) }));
            cursor.next();
        }
        out
    };

    assert_eq!(seen, vec![(0, 1), (1, 100)]);
    assert_eq!(gc.iter().count(), 2);
}

#[test]
fn iteration_skips_empty_young_generation() {
    let mut gc = collector("cursor-skip");

    let leaf = construct_in(&mut gc, Leaf { value: 55 });
    let mut root = Obj::of(leaf);
    gc.add_root(&mut root);

    // two cycles leave generation 0's to-space empty and the survivor
    // in generation 1
    gc.execute_gc(Generation(1));
    gc.execute_gc(Generation(1));
    assert_eq!(gc.to_space(Generation(0)).iter().count(), 0);

    let survivors: Vec<u64> =
        gc.iter().map(|info| unsafe { *(info.mem() as *const u64) }).collect();
    assert_eq!(survivors, vec![55]);

    let begin = gc.begin();
    assert_eq!(begin.generation(), Generation(1));
}

#[test]
fn cursor_comparisons() {
    let mut gc = collector("cursor-cmp");

    construct_in(&mut gc, Leaf { value: 1 });
    construct_in(&mut gc, Leaf { value: 2 });

    let first = gc.begin();
    let mut second = gc.begin();
    second.next();

    assert!(first != second);
    assert_eq!(first.compare(&second), Some(std::cmp::Ordering::Less));

    // cursors of different collectors are incomparable
    let other = collector("cursor-cmp-other");
    assert_eq!(gc.begin().compare(&other.begin()), None);
}

#[test]
fn iteration_matches_survivors_after_collection() {
    let mut gc = collector("cursor-survivors");

    let mut roots: Vec<Obj> = Vec::new();
    for i in 0..8u64 {
        let leaf = construct_in(&mut gc, Leaf { value: i });
        if i % 2 == 0 {
            roots.push(Obj::of(leaf));
        }
    }
    for root in roots.iter_mut() {
        gc.add_root(root as *mut Obj);
    }

    gc.execute_gc(Generation(1));

    let mut survivors: Vec<u64> =
        gc.iter().map(|info| unsafe { *(info.mem() as *const u64) }).collect();
    survivors.sort_unstable();
    assert_eq!(survivors, vec![0, 2, 4, 6]);

    // every surviving record carries an incremented age
    for info in gc.iter() {
        assert_eq!(info.age(), 1);
        assert!(!info.is_forwarding());
    }
}
