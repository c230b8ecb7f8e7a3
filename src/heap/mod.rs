//! Virtual-memory plumbing shared by arenas and the collector.

pub mod mapping;
