//! Owned fat-pointer variant.

use crate::object::obj::Obj;
use crate::object::vtable::GcObject;
use std::ops::{Deref, DerefMut};
use std::ptr::NonNull;

/// Fat pointer that owns its payload.
///
/// Unlike [`Obj`], which borrows collector-owned memory, a `GcBox`
/// holds its payload on the ordinary heap and drops it when the box
/// goes out of scope. Useful for object graphs built outside the
/// collector, e.g. expression nodes a parser keeps for its own
/// lifetime.
pub struct GcBox<T: GcObject> {
    data: NonNull<T>,
}

impl<T: GcObject> GcBox<T> {
    /// Take ownership of `value`.
    pub fn new(value: T) -> Self {
        // Box never returns null
        let data = unsafe { NonNull::new_unchecked(Box::into_raw(Box::new(value))) };
        Self { data }
    }

    /// Borrowing fat pointer to the owned payload.
    ///
    /// The returned `Obj` must not outlive this box.
    pub fn as_obj(&self) -> Obj {
        Obj::of(self.data.as_ptr())
    }

    /// Consume the box, returning the payload.
    pub fn into_inner(self) -> T {
        let raw = self.data.as_ptr();
        std::mem::forget(self);
        *unsafe { Box::from_raw(raw) }
    }
}

impl<T: GcObject> Deref for GcBox<T> {
    type Target = T;

    fn deref(&self) -> &T {
        unsafe { self.data.as_ref() }
    }
}

impl<T: GcObject> DerefMut for GcBox<T> {
    fn deref_mut(&mut self) -> &mut T {
        unsafe { self.data.as_mut() }
    }
}

impl<T: GcObject> Drop for GcBox<T> {
    fn drop(&mut self) {
        unsafe {
            drop(Box::from_raw(self.data.as_ptr()));
        }
    }
}
