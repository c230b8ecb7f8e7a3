//! Arena allocation cursor.
//!
//! A cursor points at an allocation header and walks the arena in
//! allocation order, using each header's recorded (padded) size to find
//! the next one:
//!
//! ```text
//!                   <--------------z1-------------->
//!          < guard ><  hz  ><     req_z     >< dz  >< guard >
//!          +++++++++0000zzzz@@@@@@@@@@@@@@@@@ppppppp+++++++++
//!                   ^       ^                                ^
//!                   pos     mem                              next pos
//! ```
//!
//! Two cursors compare equal iff they share an arena and a position.
//! Invalid cursors (headerless arena, or detached) are pairwise
//! incomparable, including with themselves.

use crate::arena::header::{AllocHeader, HEADER_Z};
use crate::arena::info::AllocInfo;
use crate::arena::Arena;
use crate::error::ArenaErrorKind;
use std::cmp::Ordering;

/// Cursor over the allocations of one arena.
#[derive(Clone, Copy, Debug)]
pub struct ArenaCursor<'a> {
    arena: Option<&'a Arena>,
    pos: *mut AllocHeader,
}

impl<'a> ArenaCursor<'a> {
    /// Cursor in the invalid state.
    pub fn invalid() -> Self {
        Self { arena: None, pos: std::ptr::null_mut() }
    }

    /// Cursor at the first allocation of `arena`.
    ///
    /// Invalid (capturing an error in the arena) when the arena does not
    /// store allocation headers.
    pub fn begin(arena: &'a Arena) -> Self {
        match arena.begin_header() {
            Some(pos) => Self { arena: Some(arena), pos },
            None => Self::invalid(),
        }
    }

    /// Cursor just past the last allocation of `arena`.
    pub fn end(arena: &'a Arena) -> Self {
        match arena.end_header() {
            Some(pos) => Self { arena: Some(arena), pos },
            None => Self::invalid(),
        }
    }

    /// A valid cursor can be compared, at least with itself. It can be
    /// dereferenced iff it is also in bounds.
    pub fn is_valid(&self) -> bool {
        self.arena.is_some() && !self.pos.is_null()
    }

    /// Current position, as a byte pointer.
    pub fn pos(&self) -> *mut u8 {
        self.pos as *mut u8
    }

    fn in_bounds(&self, arena: &Arena) -> bool {
        let p = self.pos as *const u8;
        arena.contains(p) && p < arena.free_ptr()
    }

    /// Fetch the allocation record at the current position.
    ///
    /// Returns `None` (capturing `IteratorDeref` in the arena) when the
    /// cursor is invalid or past the end.
    pub fn deref(&self) -> Option<AllocInfo<'a>> {
        let arena = self.arena?;

        if !self.in_bounds(arena) {
            arena.capture_error(ArenaErrorKind::IteratorDeref, 0);
            return None;
        }

        let mem = unsafe { (self.pos as *mut u8).add(HEADER_Z) };
        let info = arena.alloc_info(mem);
        debug_assert!(info.is_valid());

        Some(info)
    }

    /// Advance to the next allocation.
    ///
    /// Misuse (invalid cursor, or already at the end) captures
    /// `IteratorNext` in the arena and leaves the cursor unchanged.
    pub fn next(&mut self) {
        let Some(arena) = self.arena else { return };

        if !self.in_bounds(arena) {
            arena.capture_error(ArenaErrorKind::IteratorNext, 0);
            return;
        }

        let hdr: AllocHeader = unsafe { *self.pos };
        let mem_z = arena.header_config().size(hdr);
        let guard_z = arena.header_config().guard_z;

        let next = unsafe { (self.pos as *mut u8).add(HEADER_Z + mem_z + guard_z) };
        debug_assert!(next <= arena.free_ptr());

        self.pos = next as *mut AllocHeader;
    }

    /// Compare two cursors.
    ///
    /// `None` when either cursor is invalid or they reference different
    /// arenas.
    pub fn compare(&self, other: &ArenaCursor<'a>) -> Option<Ordering> {
        let (a, b) = (self.arena?, other.arena?);

        if !std::ptr::eq(a, b) || self.pos.is_null() || other.pos.is_null() {
            return None;
        }

        Some(self.pos.cmp(&other.pos))
    }
}

impl PartialEq for ArenaCursor<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.compare(other) == Some(Ordering::Equal)
    }
}

/// Iterator adapter over `[begin, end)` allocation records.
pub struct ArenaAllocs<'a> {
    cur: ArenaCursor<'a>,
    end: ArenaCursor<'a>,
}

impl<'a> ArenaAllocs<'a> {
    pub(crate) fn new(cur: ArenaCursor<'a>, end: ArenaCursor<'a>) -> Self {
        Self { cur, end }
    }
}

impl<'a> Iterator for ArenaAllocs<'a> {
    type Item = AllocInfo<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if !self.cur.is_valid() || self.cur == self.end {
            return None;
        }

        let info = self.cur.deref()?;
        self.cur.next();
        Some(info)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arena::ArenaConfig;
    use crate::object::TypeSeq;

    fn arena(guard_z: usize) -> Arena {
        let mut cfg = ArenaConfig::simple(256 * 1024).with_name("cursor").with_headers();
        cfg.header.guard_z = guard_z;
        Arena::map(cfg).unwrap()
    }

    #[test]
    fn test_empty_arena() {
        let a = arena(0);
        assert_eq!(a.begin(), a.end());
        assert_eq!(a.iter().count(), 0);
    }

    #[test]
    fn test_visit_order_and_sizes() {
        let mut a = arena(0);

        a.alloc(TypeSeq(5), 13);
        a.alloc(TypeSeq(5), 16);
        a.alloc(TypeSeq(7), 40);

        let records: Vec<(u32, usize)> = a.iter().map(|i| (i.tseq(), i.size())).collect();
        assert_eq!(records, vec![(5, 16), (5, 16), (7, 40)]);
    }

    #[test]
    fn test_consecutive_layout() {
        let mut a = arena(0);

        a.alloc(TypeSeq(5), 13);
        a.alloc(TypeSeq(5), 16);
        a.alloc(TypeSeq(7), 40);

        let mems: Vec<*mut u8> = a.iter().map(|i| i.mem()).collect();
        assert_eq!(mems[1] as usize, mems[0] as usize + 16 + HEADER_Z);
        assert_eq!(mems[2] as usize, mems[1] as usize + 16 + HEADER_Z);
    }

    #[test]
    fn test_accounting_invariant() {
        let mut a = arena(8);

        a.alloc(TypeSeq(1), 13);
        a.alloc(TypeSeq(2), 100);
        a.super_alloc(TypeSeq(3), 8);
        a.sub_alloc(24, true);

        let guard_z = a.header_config().guard_z;
        let walked: usize = a.iter().map(|i| HEADER_Z + i.size() + guard_z).sum();

        // everything after the initial guard is covered by the records
        assert_eq!(walked + guard_z, a.allocated());
    }

    #[test]
    fn test_deref_at_end() {
        let mut a = arena(0);
        a.alloc(TypeSeq(1), 8);

        let end = a.end();
        assert!(end.deref().is_none());
        assert_eq!(a.last_error().kind, ArenaErrorKind::IteratorDeref);
    }

    #[test]
    fn test_next_past_end() {
        let mut a = arena(0);
        a.alloc(TypeSeq(1), 8);

        let mut cur = a.begin();
        cur.next();
        assert_eq!(cur, a.end());

        let errors_before = a.error_count();
        cur.next();
        assert_eq!(cur, a.end());
        assert_eq!(a.last_error().kind, ArenaErrorKind::IteratorNext);
        assert_eq!(a.error_count(), errors_before + 1);
    }

    #[test]
    fn test_headerless_iteration_unsupported() {
        let mut a = Arena::map(ArenaConfig::simple(64 * 1024)).unwrap();
        a.alloc(TypeSeq::ANON, 8);

        let cur = a.begin();
        assert!(!cur.is_valid());
        assert_eq!(a.last_error().kind, ArenaErrorKind::IteratorNotSupported);
    }

    #[test]
    fn test_invalid_cursors_incomparable() {
        let x = ArenaCursor::invalid();
        let y = ArenaCursor::invalid();

        assert_eq!(x.compare(&y), None);
        assert!(x != y);
        // an invalid cursor is incomparable even with itself
        assert!(x != x);
    }

    #[test]
    fn test_cross_arena_incomparable() {
        let a = arena(0);
        let b = arena(0);

        assert_eq!(a.begin().compare(&b.begin()), None);
    }

    #[test]
    fn test_ordering_within_arena() {
        let mut a = arena(0);
        a.alloc(TypeSeq(1), 8);
        a.alloc(TypeSeq(1), 8);

        let first = a.begin();
        let mut second = a.begin();
        second.next();

        assert_eq!(first.compare(&second), Some(Ordering::Less));
        assert_eq!(second.compare(&first), Some(Ordering::Greater));
        assert_eq!(first.compare(&first), Some(Ordering::Equal));
    }

    #[test]
    fn test_iteration_with_guards() {
        let mut a = arena(16);

        a.alloc(TypeSeq(4), 32);
        a.alloc(TypeSeq(4), 8);

        let records: Vec<(u32, usize)> = a.iter().map(|i| (i.tseq(), i.size())).collect();
        assert_eq!(records, vec![(4, 32), (4, 8)]);

        for info in a.iter() {
            assert!(info.guards_intact());
        }
    }
}
