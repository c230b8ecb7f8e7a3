//! Shared fixtures for the integration suite: a small family of payload
//! types exercising the object protocol, and collector constructors.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use x1gc::arena::{Arena, ArenaConfig};
use x1gc::gc::{Collector, CollectorConfig};
use x1gc::object::{GcObject, Obj, TypeSeq};

/// Payload with no interior pointers.
pub struct Leaf {
    pub value: u64,
}

impl GcObject for Leaf {
    const TYPE_SEQ: TypeSeq = TypeSeq(5);
}

/// Payload with one interior fat pointer.
pub struct Node {
    pub tag: u64,
    pub next: Obj,
}

impl GcObject for Node {
    const TYPE_SEQ: TypeSeq = TypeSeq(7);

    unsafe fn forward_children(&mut self, gc: &mut Collector) {
        gc.forward_inplace(&mut self.next);
    }
}

/// Payload with two interior fat pointers.
pub struct Pair {
    pub a: Obj,
    pub b: Obj,
}

impl GcObject for Pair {
    const TYPE_SEQ: TypeSeq = TypeSeq(9);

    unsafe fn forward_children(&mut self, gc: &mut Collector) {
        gc.forward_inplace(&mut self.a);
        gc.forward_inplace(&mut self.b);
    }
}

static TRACKED_DROPS: AtomicUsize = AtomicUsize::new(0);

/// Payload whose destructor counts its invocations.
pub struct Tracked {
    pub id: u64,
}

impl GcObject for Tracked {
    const TYPE_SEQ: TypeSeq = TypeSeq(11);
}

impl Drop for Tracked {
    fn drop(&mut self) {
        TRACKED_DROPS.fetch_add(1, Ordering::Relaxed);
    }
}

/// Destructor invocations of [`Tracked`] so far, process-wide.
pub fn tracked_drops() -> usize {
    TRACKED_DROPS.load(Ordering::Relaxed)
}

/// Collector with 1 MiB spaces, two generations, survive threshold 2,
/// and all fixture types installed.
pub fn collector(name: &str) -> Collector {
    collector_with(CollectorConfig::default().with_name(name).with_size(1024 * 1024))
}

/// Collector from an explicit config, with all fixture types installed.
pub fn collector_with(config: CollectorConfig) -> Collector {
    let mut gc = Collector::new(config).expect("collector creation failed");

    assert!(gc.install::<Leaf>());
    assert!(gc.install::<Node>());
    assert!(gc.install::<Pair>());
    assert!(gc.install::<Tracked>());

    gc
}

/// Header-enabled arena for allocation tests.
pub fn header_arena(size: usize, guard_z: usize) -> Arena {
    let mut cfg = ArenaConfig::simple(size).with_name("fixture").with_headers();
    cfg.header.guard_z = guard_z;
    Arena::map(cfg).expect("arena map failed")
}
