//! # x1gc: generational copying collector on a bump-arena substrate
//!
//! x1gc is a precise, generational, copying garbage collector for
//! single-threaded runtimes, built directly on reserve/commit virtual
//! memory:
//!
//! - **Bump arenas**: each space is one contiguous reserved range
//!   (`mmap` `PROT_NONE`), committed lazily in page or huge-page units
//!   as the bump pointer advances. Optional per-allocation headers
//!   record `{type, age, padded size}` and make every arena walkable;
//!   optional guard bytes catch overruns.
//! - **Uniform object model**: payload types implement [`GcObject`];
//!   the collector sees them only through a per-type [`Vtable`]
//!   (`shallow_size` / `shallow_copy` / `forward_children`) and reaches
//!   them only through [`Obj`] fat pointers.
//! - **X1 collection**: two spaces per generation with reversing
//!   from/to roles, in-place forwarding through the allocation header,
//!   breadth-first evacuation with per-generation gray cursors, and
//!   promotion by age.
//!
//! ## Quick start: arenas
//!
//! ```rust
//! use x1gc::arena::{Arena, ArenaConfig};
//! use x1gc::object::TypeSeq;
//!
//! let mut arena = Arena::map(
//!     ArenaConfig::simple(1024 * 1024).with_name("scratch").with_headers(),
//! )?;
//!
//! let p = arena.alloc(TypeSeq(1), 24);
//! assert!(!p.is_null());
//!
//! for record in arena.iter() {
//!     assert_eq!(record.size(), 24);
//! }
//! # Ok::<(), x1gc::error::GcError>(())
//! ```
//!
//! ## Quick start: collection
//!
//! ```rust,no_run
//! use x1gc::arena::construct_in;
//! use x1gc::gc::{Collector, CollectorConfig, Generation};
//! use x1gc::object::{GcObject, Obj, TypeSeq};
//!
//! struct Leaf {
//!     value: u64,
//! }
//! impl GcObject for Leaf {
//!     const TYPE_SEQ: TypeSeq = TypeSeq(1);
//! }
//!
//! let mut gc = Collector::new(CollectorConfig::default().with_size(1024 * 1024))?;
//! gc.install::<Leaf>();
//!
//! let leaf = construct_in(&mut gc, Leaf { value: 7 });
//! let mut root = Obj::of(leaf);
//! gc.add_root(&mut root);
//!
//! gc.execute_gc(Generation(1));
//! // root.data() now points at the surviving copy in to-space
//! # Ok::<(), x1gc::error::GcError>(())
//! ```
//!
//! ## Safety contract
//!
//! The collector is exact, not conservative: it sees only registered
//! roots and the interior pointers `forward_children` reports. The
//! mutator must not hold a raw payload pointer across any call that can
//! run a collection; re-derive pointers from their `Obj` after such
//! calls. All mutator-visible references to collector memory are `Obj`
//! fat pointers, and collection rewrites them in place.
//!
//! ## Concurrency
//!
//! None. One thread owns the collector and runs both mutator and
//! collector roles; there are no locks and no atomics. Types are
//! deliberately not `Send`/`Sync`.

pub mod alloc;
pub mod arena;
pub mod containers;
pub mod error;
pub mod gc;
pub mod heap;
pub mod object;
pub mod stats;
pub mod util;

pub use alloc::Allocator;
pub use arena::{construct_in, AllocInfo, Arena, ArenaConfig, HeaderConfig};
pub use error::{AllocError, ArenaErrorKind, GcError};
pub use gc::{Collector, CollectorConfig, Generation, ObjectAge, Role};
pub use object::{GcBox, GcObject, Obj, TypeSeq, Vtable};

/// Crate version from Cargo.toml.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    #[test]
    fn test_version_not_empty() {
        assert!(!super::VERSION.is_empty());
    }
}
