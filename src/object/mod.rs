//! Object model: the uniform protocol the collector requires of payloads.
//!
//! The collector never knows payload representations. It sees every
//! object through a per-type [`Vtable`] of function pointers and reaches
//! mutator-held objects only through [`Obj`] fat pointers
//! (`{interface, data}` pairs). [`GcObject`] is the compile-time trait a
//! payload type implements; [`vtable_of`] lowers an implementation to
//! the runtime record the collector's type registry stores.

pub mod boxed;
pub mod obj;
pub mod vtable;

pub use boxed::GcBox;
pub use obj::Obj;
pub use vtable::{vtable_of, GcObject, TypeSeq, Vtable};
