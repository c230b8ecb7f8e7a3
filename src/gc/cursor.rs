//! Cross-generation allocation cursor.
//!
//! Walks allocation headers across the collector's to-spaces, youngest
//! generation first, skipping generations whose to-space is empty.
//! Two cursors compare equal iff they reference the same collector and
//! the same `(generation, position)`; positions in different
//! generations compare by generation number.

use crate::arena::{AllocInfo, ArenaCursor};
use crate::gc::cohort::Generation;
use crate::gc::Collector;
use std::cmp::Ordering;

/// Cursor over every allocation in the collector's to-spaces.
#[derive(Clone, Copy)]
pub struct CollectorCursor<'a> {
    gc: &'a Collector,
    gen_ix: u32,
    gen_hi: u32,
    arena_ix: ArenaCursor<'a>,
    arena_hi: ArenaCursor<'a>,
}

impl<'a> CollectorCursor<'a> {
    /// Cursor at the first allocation of the youngest non-empty
    /// to-space.
    pub fn begin(gc: &'a Collector) -> Self {
        let arena = gc.to_space(Generation::NURSERY);
        let mut cursor = Self {
            gc,
            gen_ix: 0,
            gen_hi: gc.config().n_generation,
            arena_ix: arena.begin(),
            arena_hi: arena.end(),
        };
        cursor.normalize();
        cursor
    }

    /// Cursor past the last allocation of the oldest to-space.
    ///
    /// Anchored at a real arena position so it stays comparable with
    /// working cursors.
    pub fn end(gc: &'a Collector) -> Self {
        let gen_hi = gc.config().n_generation;
        let last = gc.to_space(Generation(gen_hi - 1));
        let arena_end = last.end();

        Self { gc, gen_ix: gen_hi, gen_hi, arena_ix: arena_end, arena_hi: arena_end }
    }

    /// Advance `gen_ix` to the next generation with a non-empty
    /// to-space whenever the arena cursor is exhausted.
    fn normalize(&mut self) {
        if self.arena_ix.compare(&self.arena_hi) != Some(Ordering::Equal) {
            return;
        }

        if self.gen_ix < self.gen_hi {
            self.gen_ix += 1;
        }

        while self.gen_ix < self.gen_hi {
            let arena = self.gc.to_space(Generation(self.gen_ix));
            self.arena_ix = arena.begin();
            self.arena_hi = arena.end();

            if self.arena_ix != self.arena_hi {
                break;
            }
            self.gen_ix += 1;
        }
    }

    /// Generation the cursor currently visits.
    pub fn generation(&self) -> Generation {
        Generation(self.gen_ix)
    }

    /// A valid cursor can be compared; it can be dereferenced iff it is
    /// not at the end.
    pub fn is_valid(&self) -> bool {
        self.arena_ix.is_valid()
    }

    /// Fetch the allocation record at the current position, or `None`
    /// at the end.
    pub fn deref(&self) -> Option<AllocInfo<'a>> {
        self.arena_ix.deref()
    }

    /// Advance to the next allocation, crossing into older generations
    /// as the younger ones are exhausted.
    pub fn next(&mut self) {
        if self.arena_ix != self.arena_hi {
            self.arena_ix.next();
            self.normalize();
        }
    }

    /// Compare two cursors; `None` when they are not comparable
    /// (different collectors or invalid positions).
    pub fn compare(&self, other: &CollectorCursor<'a>) -> Option<Ordering> {
        if !std::ptr::eq(self.gc, other.gc) {
            return None;
        }

        if self.gen_ix != other.gen_ix {
            return Some(self.gen_ix.cmp(&other.gen_ix));
        }

        self.arena_ix.compare(&other.arena_ix)
    }
}

impl PartialEq for CollectorCursor<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.compare(other) == Some(Ordering::Equal)
    }
}

/// Iterator adapter over a collector's surviving allocations.
pub struct CollectorAllocs<'a> {
    cur: CollectorCursor<'a>,
    end: CollectorCursor<'a>,
}

impl<'a> CollectorAllocs<'a> {
    pub(crate) fn new(cur: CollectorCursor<'a>, end: CollectorCursor<'a>) -> Self {
        Self { cur, end }
    }
}

impl<'a> Iterator for CollectorAllocs<'a> {
    type Item = AllocInfo<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.cur == self.end {
            return None;
        }

        let info = self.cur.deref()?;
        self.cur.next();
        Some(info)
    }
}
