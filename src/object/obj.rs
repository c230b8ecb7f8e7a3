//! Fat pointers to collector-eligible objects.

use crate::alloc::Allocator;
use crate::gc::Collector;
use crate::object::vtable::{vtable_of, GcObject, TypeSeq, Vtable};
use std::ptr;

/// Fat pointer to a garbage-collected object: a per-type interface plus
/// a borrowed payload pointer.
///
/// ```text
///            +---------+             +------------------+
///            | .iface x------------->| Vtable for the   |
///            +---------+             | payload's type   |
///            | .data  x------\       +------------------+
///            +---------+     |
///                            |       +------------------+
///                            \------>| payload bytes    |
///                                    +------------------+
/// ```
///
/// `Obj` values are the only mutator-visible references to
/// collector-owned memory. During a collection the collector rewrites
/// the `data` field of every registered root and of every interior
/// `Obj` reached through `forward_children`; the mutator must re-read
/// any raw pointer it derived from an `Obj` after a collection.
#[repr(C)]
#[derive(Clone, Copy, Debug)]
pub struct Obj {
    iface: *const Vtable,
    data: *mut u8,
}

impl Obj {
    /// The null fat pointer.
    pub const fn null() -> Self {
        Self { iface: ptr::null(), data: ptr::null_mut() }
    }

    /// Assemble from an interface and a type-erased payload pointer.
    pub fn from_raw(iface: *const Vtable, data: *mut u8) -> Self {
        Self { iface, data }
    }

    /// Typed constructor: pair `data` with `T`'s vtable.
    pub fn of<T: GcObject>(data: *mut T) -> Self {
        Self { iface: vtable_of::<T>(), data: data as *mut u8 }
    }

    /// True when the payload pointer is null.
    pub fn is_null(&self) -> bool {
        self.data.is_null()
    }

    /// Interface pointer.
    pub fn iface(&self) -> *const Vtable {
        self.iface
    }

    /// Borrowed payload pointer.
    pub fn data(&self) -> *mut u8 {
        self.data
    }

    /// Replace the payload pointer, keeping the interface.
    ///
    /// The collector uses this to redirect roots and interior pointers
    /// to forwarded locations.
    pub fn reset(&mut self, data: *mut u8) {
        self.data = data;
    }

    /// Identity of the payload's runtime type, or
    /// [`TypeSeq::ANON`] for a detached fat pointer.
    pub fn tseq(&self) -> TypeSeq {
        if self.iface.is_null() {
            TypeSeq::ANON
        } else {
            unsafe { (*self.iface).tseq }
        }
    }

    /// Safe downcast: the payload pointer as `*mut T` when the runtime
    /// type matches.
    pub fn downcast<T: GcObject>(&self) -> Option<*mut T> {
        if !self.is_null() && self.tseq() == T::TYPE_SEQ {
            Some(self.data as *mut T)
        } else {
            None
        }
    }

    /// Router: `shallow_size` with the payload injected.
    ///
    /// # Safety
    /// The fat pointer must reference a live payload of its interface's
    /// type.
    pub unsafe fn shallow_size(&self) -> usize {
        ((*self.iface).shallow_size)(self.data)
    }

    /// Router: `shallow_copy` with the payload injected.
    ///
    /// # Safety
    /// As [`Obj::shallow_size`]; additionally the payload's allocation
    /// header must be intact when the type's default copy is in use.
    pub unsafe fn shallow_copy(&self, mm: &mut dyn Allocator) -> *mut u8 {
        ((*self.iface).shallow_copy)(self.data, mm)
    }

    /// Router: `forward_children` with the payload injected.
    ///
    /// # Safety
    /// Only meaningful mid-collection, on a payload the collector owns.
    pub unsafe fn forward_children(&self, gc: &mut Collector) {
        ((*self.iface).forward_children)(self.data, gc)
    }
}

impl Default for Obj {
    fn default() -> Self {
        Self::null()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Num {
        value: i64,
    }
    impl GcObject for Num {
        const TYPE_SEQ: TypeSeq = TypeSeq(31);
    }

    struct Text {
        _len: usize,
    }
    impl GcObject for Text {
        const TYPE_SEQ: TypeSeq = TypeSeq(32);
    }

    #[test]
    fn test_null() {
        let o = Obj::null();
        assert!(o.is_null());
        assert_eq!(o.tseq(), TypeSeq::ANON);
        assert!(o.downcast::<Num>().is_none());
    }

    #[test]
    fn test_typed_construction_and_downcast() {
        let mut n = Num { value: 42 };
        let o = Obj::of(&mut n as *mut Num);

        assert!(!o.is_null());
        assert_eq!(o.tseq(), Num::TYPE_SEQ);

        let back = o.downcast::<Num>().unwrap();
        assert_eq!(unsafe { (*back).value }, 42);

        assert!(o.downcast::<Text>().is_none());
    }

    #[test]
    fn test_reset() {
        let mut a = Num { value: 1 };
        let mut b = Num { value: 2 };

        let mut o = Obj::of(&mut a as *mut Num);
        o.reset(&mut b as *mut Num as *mut u8);

        let p = o.downcast::<Num>().unwrap();
        assert_eq!(unsafe { (*p).value }, 2);
    }

    #[test]
    fn test_router_shallow_size() {
        let mut n = Num { value: 0 };
        let o = Obj::of(&mut n as *mut Num);
        assert_eq!(unsafe { o.shallow_size() }, std::mem::size_of::<Num>());
    }
}
