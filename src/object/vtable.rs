//! Per-type interface records.
//!
//! Each collector-eligible payload type supplies three operations:
//! an exact shallow size, a shallow copy into an allocator, and a
//! child-forwarding walk over its interior fat pointers. The trait
//! implementation is lowered into a [`Vtable`] of plain function
//! pointers, stored by value in the collector's type registry and
//! indexed by [`TypeSeq`].

use crate::alloc::Allocator;
use crate::gc::Collector;
use std::mem;
use std::ptr;

/// Process-unique integer identity for a payload type.
///
/// `TypeSeq(0)` is reserved as the anonymous id for untyped
/// allocations; the all-ones value of the configured header field is
/// reserved for the forwarding sentinel. User types must avoid both.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TypeSeq(pub u32);

impl TypeSeq {
    /// Anonymous id for allocations without a registered type.
    pub const ANON: TypeSeq = TypeSeq(0);

    /// Raw sequence number.
    pub fn seqno(self) -> u32 {
        self.0
    }
}

impl std::fmt::Display for TypeSeq {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "tseq:{}", self.0)
    }
}

/// `shallow_size` entry: exact bytes consumed by the payload at `data`.
pub type ShallowSizeFn = unsafe fn(data: *const u8) -> usize;

/// `shallow_copy` entry: allocate in `mm`, bitwise-copy, return the new
/// address (null on allocation failure).
pub type ShallowCopyFn = unsafe fn(data: *const u8, mm: &mut dyn Allocator) -> *mut u8;

/// `forward_children` entry: rewrite every interior fat pointer via
/// [`Collector::forward_inplace`].
pub type ForwardChildrenFn = unsafe fn(data: *mut u8, gc: &mut Collector);

/// Destructor entry, present only for types that need drop.
pub type DropFn = unsafe fn(data: *mut u8);

/// Runtime interface record for one payload type.
///
/// A single vtable-style value with no instance state; the collector
/// stores a copy per installed type.
#[repr(C)]
#[derive(Clone, Copy)]
pub struct Vtable {
    /// Identity of the described type.
    pub tseq: TypeSeq,
    pub shallow_size: ShallowSizeFn,
    pub shallow_copy: ShallowCopyFn,
    pub forward_children: ForwardChildrenFn,
    /// Run during the sweep of abandoned from-space objects.
    pub drop: Option<DropFn>,
}

impl std::fmt::Debug for Vtable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Vtable")
            .field("tseq", &self.tseq)
            .field("drop", &self.drop.is_some())
            .finish()
    }
}

/// Compile-time interface a collector-eligible payload type implements.
///
/// The defaults cover the common case of a flat struct whose interior
/// references, if any, are `Obj` fields: `shallow_size` is the struct
/// size, `shallow_copy` clones the allocation slot (preserving the
/// type's `tseq` and incrementing the age) and copies the bytes, and
/// `forward_children` does nothing. A type holding `Obj` children must
/// override `forward_children` and call
/// [`Collector::forward_inplace`] for each one.
pub trait GcObject: Sized {
    /// Identity of this type; unique per type within one process.
    const TYPE_SEQ: TypeSeq;

    /// Exact bytes consumed by this object, excluding the allocation
    /// header and guards. Padded consistently with arena padding.
    fn shallow_size(&self) -> usize {
        mem::size_of::<Self>()
    }

    /// Copy this object into `mm` and return the new payload address.
    ///
    /// The default reads this object's allocation header through
    /// `mm.alloc_copy`, so it requires `self` to live in collector- or
    /// arena-owned memory with headers enabled.
    ///
    /// # Safety
    /// `self` must be a live payload whose allocation header is intact.
    unsafe fn shallow_copy(&self, mm: &mut dyn Allocator) -> *mut u8 {
        let src = self as *const Self as *mut u8;
        let dest = mm.alloc_copy(src);

        if !dest.is_null() {
            ptr::copy_nonoverlapping(src as *const u8, dest, self.shallow_size());
        }

        dest
    }

    /// Rewrite every interior fat pointer held by this object.
    ///
    /// # Safety
    /// Called only mid-collection by the collector, on a payload it
    /// owns.
    unsafe fn forward_children(&mut self, gc: &mut Collector) {
        let _ = gc;
    }
}

unsafe fn shallow_size_thunk<T: GcObject>(data: *const u8) -> usize {
    (*(data as *const T)).shallow_size()
}

unsafe fn shallow_copy_thunk<T: GcObject>(data: *const u8, mm: &mut dyn Allocator) -> *mut u8 {
    (*(data as *const T)).shallow_copy(mm)
}

unsafe fn forward_children_thunk<T: GcObject>(data: *mut u8, gc: &mut Collector) {
    (*(data as *mut T)).forward_children(gc)
}

unsafe fn drop_thunk<T: GcObject>(data: *mut u8) {
    ptr::drop_in_place(data as *mut T)
}

trait HasVtable {
    const VTABLE: Vtable;
}

impl<T: GcObject> HasVtable for T {
    const VTABLE: Vtable = Vtable {
        tseq: T::TYPE_SEQ,
        shallow_size: shallow_size_thunk::<T>,
        shallow_copy: shallow_copy_thunk::<T>,
        forward_children: forward_children_thunk::<T>,
        drop: if mem::needs_drop::<T>() { Some(drop_thunk::<T>) } else { None },
    };
}

/// The runtime interface record for `T`.
pub fn vtable_of<T: GcObject>() -> &'static Vtable {
    &<T as HasVtable>::VTABLE
}
