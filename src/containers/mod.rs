//! Arena-backed containers.
//!
//! Fixed-capacity structures whose storage is a dedicated reserved
//! range, committed lazily. None of them reallocate: element addresses
//! are stable for the container's lifetime.

pub mod map;
pub mod ring;
pub mod vec;

pub use map::ArenaHashMap;
pub use ring::CircularBuffer;
pub use vec::ArenaVec;
