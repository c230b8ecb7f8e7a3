//! Bump Arena
//!
//! A single contiguous virtual-memory range with a bump-pointer
//! allocator on top. The range is reserved up front (`PROT_NONE`) and
//! committed lazily in alignment-sized steps as allocation demands.
//!
//! ```text
//!    <----------------------------reserved------------------------->
//!    <------------committed-----------><-------uncommitted--------->
//!    <--allocated-->
//!
//!    XXXXXXXXXXXXXXX___________________...........................
//!    ^              ^                  ^                          ^
//!    lo             free               limit                      hi
//!
//!    [X] allocated:   in use
//!    [_] committed:   physical memory obtained
//!    [.] uncommitted: reserved in virtual memory only
//! ```
//!
//! With `store_header` enabled, each allocation is preceded by an 8-byte
//! header encoding `{tseq, age, padded size}` and followed by optional
//! guard bytes:
//!
//! ```text
//!                   free(pre)
//!                   v
//!                   <--------------z1-------------->
//!          < guard ><  hz  ><     req_z     >< dz  >< guard >
//!          +++++++++0000zzzz@@@@@@@@@@@@@@@@@ppppppp+++++++++
//!                   ^       ^                                ^
//!                   header  mem                     free(post)
//! ```
//!
//! The guard that precedes the very first allocation is written once
//! when the first commit succeeds; every later allocation writes only
//! its trailing guard, which doubles as the next allocation's leading
//! guard.

pub mod config;
pub mod cursor;
pub mod header;
pub mod info;

pub use config::ArenaConfig;
pub use cursor::{ArenaAllocs, ArenaCursor};
pub use header::{AllocHeader, HeaderConfig, HEADER_Z};
pub use info::AllocInfo;

use crate::error::{AllocError, ArenaErrorKind, GcError};
use crate::heap::mapping;
use crate::object::TypeSeq;
use crate::util::alignment::{is_aligned, padding, with_alloc_padding, with_padding, ALLOC_ALIGN};
use std::cell::Cell;
use std::ptr;

/// Saved arena position; see [`Arena::checkpoint`].
///
/// Restoring rewinds the free pointer only: payloads constructed after
/// the checkpoint are abandoned, not dropped.
#[derive(Debug, Clone, Copy)]
pub struct Checkpoint {
    free: *mut u8,
}

/// Internal allocation mode; see [`Arena::alloc`], [`Arena::super_alloc`]
/// and [`Arena::sub_alloc`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AllocMode {
    /// Ordinary alloc. Most common mode.
    Standard,
    /// Begin a sequence of sub-allocs that share a single header.
    Super,
    /// Subsidiary allocation on behalf of a preceding super alloc; at
    /// least one more sub-alloc follows.
    SubIncomplete,
    /// Subsidiary allocation that completes the preceding super alloc.
    SubComplete,
}

/// Arena allocator state.
///
/// Owns its mapped address range exclusively; dropping the arena unmaps
/// it. Not `Send`/`Sync`: the collector core is single-threaded by
/// design.
#[derive(Debug)]
pub struct Arena {
    config: ArenaConfig,
    /// VM page size (obtained via the OS at map time). Likely 4 KiB.
    page_z: usize,
    /// Commit granularity: `page_z`, or `hugepage_z` for large arenas.
    arena_align_z: usize,
    /// Low end of the owned range.
    lo: *mut u8,
    /// Committed prefix length; multiple of `arena_align_z`.
    committed_z: usize,
    /// Header of the most recent `super_alloc`, pending sub-allocs.
    last_header: *mut AllocHeader,
    /// Bump pointer. `[lo, free)` is in use.
    free: *mut u8,
    /// End of committed memory: `lo + committed_z`.
    limit: *mut u8,
    /// End of reserved memory.
    hi: *mut u8,
    /// Runtime error count; each error also updates `last_error`.
    error_count: Cell<u32>,
    /// Details of the most recent error.
    last_error: Cell<AllocError>,
}

impl Default for Arena {
    /// An unmapped arena. Every allocation fails with `ReserveExhausted`
    /// until the slot is replaced by a mapped instance.
    fn default() -> Self {
        Self {
            config: ArenaConfig::default(),
            page_z: 0,
            arena_align_z: 0,
            lo: ptr::null_mut(),
            committed_z: 0,
            last_header: ptr::null_mut(),
            free: ptr::null_mut(),
            limit: ptr::null_mut(),
            hi: ptr::null_mut(),
            error_count: Cell::new(0),
            last_error: Cell::new(AllocError::default()),
        }
    }
}

impl Arena {
    /// Reserve an address range per `cfg` and return the arena over it.
    ///
    /// No memory is committed yet. Arenas at least `hugepage_z` large
    /// are aligned to the huge-page unit and advised to use transparent
    /// huge pages.
    ///
    /// # Errors
    /// [`GcError::ReserveFailed`] when the kernel refuses the
    /// reservation; the arena cannot exist without its address range.
    pub fn map(cfg: ArenaConfig) -> Result<Self, GcError> {
        let page_z = mapping::os_page_size();

        let enable_hugepage = cfg.size >= cfg.hugepage_z;
        let align_z = if enable_hugepage { cfg.hugepage_z } else { page_z };

        let span = mapping::reserve_aligned(cfg.size, align_z, enable_hugepage, cfg.debug)?;

        Ok(Self::from_span(cfg, page_z, align_z, span.lo, span.hi))
    }

    /// Arena over an already-reserved (not committed) range.
    pub(crate) fn from_span(
        mut config: ArenaConfig,
        page_z: usize,
        arena_align_z: usize,
        lo: *mut u8,
        hi: *mut u8,
    ) -> Self {
        // guard regions must preserve payload alignment
        config.header.guard_z = with_alloc_padding(config.header.guard_z);

        Self {
            config,
            page_z,
            arena_align_z,
            lo,
            committed_z: 0,
            last_header: ptr::null_mut(),
            free: lo,
            limit: lo,
            hi,
            error_count: Cell::new(0),
            last_error: Cell::new(AllocError::default()),
        }
    }

    /// Arena configuration.
    pub fn config(&self) -> &ArenaConfig {
        &self.config
    }

    /// Diagnostic name.
    pub fn name(&self) -> &str {
        &self.config.name
    }

    /// Reserved memory in bytes: the maximum size of this arena.
    pub fn reserved(&self) -> usize {
        self.hi as usize - self.lo as usize
    }

    /// Allocated memory in bytes: memory consumed by allocations,
    /// including headers and guard bytes.
    pub fn allocated(&self) -> usize {
        self.free as usize - self.lo as usize
    }

    /// Committed memory in bytes: the prefix backed by physical memory.
    pub fn committed(&self) -> usize {
        self.committed_z
    }

    /// Committed memory guaranteed usable for future allocations.
    pub fn available(&self) -> usize {
        self.limit as usize - self.free as usize
    }

    /// VM page size for this arena.
    pub fn page_z(&self) -> usize {
        self.page_z
    }

    /// Number of errors captured since construction.
    pub fn error_count(&self) -> u32 {
        self.error_count.get()
    }

    /// Details of the most recent error.
    pub fn last_error(&self) -> AllocError {
        self.last_error.get()
    }

    /// True iff `addr` falls within this arena's reserved range.
    pub fn contains(&self, addr: *const u8) -> bool {
        !self.lo.is_null() && self.lo as *const u8 <= addr && addr < self.hi as *const u8
    }

    /// True iff the arena has a reserved address range.
    pub fn is_mapped(&self) -> bool {
        !self.lo.is_null() && !self.hi.is_null()
    }

    pub(crate) fn lo_ptr(&self) -> *mut u8 {
        self.lo
    }

    pub(crate) fn free_ptr(&self) -> *mut u8 {
        self.free
    }

    /// Record an error: advance the error counter and stash the details.
    pub(crate) fn capture_error(&self, kind: ArenaErrorKind, request_z: usize) {
        let seq = self.error_count.get() + 1;
        self.error_count.set(seq);
        self.last_error.set(AllocError::capture(
            kind,
            seq,
            request_z,
            self.committed_z,
            self.reserved(),
        ));
    }

    /// Expand committed memory to at least `target_z` bytes.
    ///
    /// Rounds up to the arena's commit granularity. The very first
    /// successful expansion writes the initial guard.
    pub fn expand(&mut self, target_z: usize) -> bool {
        if target_z <= self.committed_z {
            return true;
        }

        if target_z > self.reserved() {
            self.capture_error(ArenaErrorKind::ReserveExhausted, target_z);
            return false;
        }

        let aligned_target_z = with_padding(target_z, self.arena_align_z);
        let commit_start = self.limit;
        let add_commit_z = aligned_target_z - self.committed_z;

        debug_assert!(self.limit as usize == self.lo as usize + self.committed_z);
        debug_assert!(aligned_target_z <= self.reserved());

        if !mapping::commit(commit_start, add_commit_z) {
            if self.config.debug {
                log::warn!(
                    "arena {}: commit failed at {:p} for {} bytes",
                    self.config.name,
                    commit_start,
                    add_commit_z
                );
            }
            self.capture_error(ArenaErrorKind::CommitFailed, add_commit_z);
            return false;
        }

        let first_expand = commit_start == self.lo;

        self.committed_z = aligned_target_z;
        self.limit = unsafe { self.lo.add(self.committed_z) };

        if first_expand {
            self.establish_initial_guard();
        }

        if self.config.debug {
            log::debug!(
                "arena {}: committed {} bytes (target {})",
                self.config.name,
                self.committed_z,
                target_z
            );
        }

        debug_assert!(is_aligned(self.committed_z, self.arena_align_z));

        true
    }

    /// Write the guard that precedes the first allocation.
    fn establish_initial_guard(&mut self) {
        debug_assert!(self.free == self.lo);

        let guard_z = self.config.header.guard_z;
        unsafe {
            ptr::write_bytes(self.free, self.config.header.guard_byte, guard_z);
            self.free = self.free.add(guard_z);
        }
    }

    /// Allocate at least `z` bytes for an object of type `tseq`.
    ///
    /// Returns null and captures an error when the request cannot be
    /// satisfied. The payload is pointer-aligned; with headers enabled
    /// its padded size, `tseq` and age 0 are recorded in the header.
    pub fn alloc(&mut self, tseq: TypeSeq, z: usize) -> *mut u8 {
        self._alloc(z, AllocMode::Standard, tseq, 0)
    }

    /// Like [`Arena::alloc`], but the memory consumed by this call plus
    /// the immediately following `sub_alloc` calls is accounted under a
    /// single shared header. Collapses into `alloc` behavior when
    /// headers are disabled.
    pub fn super_alloc(&mut self, tseq: TypeSeq, z: usize) -> *mut u8 {
        self._alloc(z, AllocMode::Super, tseq, 0)
    }

    /// Follow a preceding `super_alloc` with a subsidiary allocation.
    ///
    /// The padded size accumulates into the super header. All calls but
    /// the last must pass `complete = false`; the last must pass
    /// `complete = true`, which also writes the trailing guard.
    pub fn sub_alloc(&mut self, z: usize, complete: bool) -> *mut u8 {
        let mode = if complete { AllocMode::SubComplete } else { AllocMode::SubIncomplete };
        self._alloc(z, mode, TypeSeq::ANON, 0)
    }

    /// Allocate a fresh block mirroring the allocation at `src`,
    /// preserving its `tseq` and incrementing its age.
    ///
    /// `src` may belong to a different arena with the same header
    /// configuration; the caller copies the payload afterwards.
    pub fn alloc_copy(&mut self, src: *mut u8) -> *mut u8 {
        if !self.config.store_header {
            self.capture_error(ArenaErrorKind::AllocInfoDisabled, 0);
            return ptr::null_mut();
        }

        let hdr = unsafe { *(src.sub(HEADER_Z) as *const AllocHeader) };
        let hcfg = &self.config.header;

        let req_z = hcfg.size(hdr);
        let tseq = TypeSeq(hcfg.tseq(hdr));
        let age = hcfg.age(hdr);

        self._alloc(req_z, AllocMode::Standard, tseq, age.saturating_add(1))
    }

    /// Allocation driver shared by `alloc`, `super_alloc` and `sub_alloc`.
    fn _alloc(&mut self, req_z: usize, mode: AllocMode, tseq: TypeSeq, age: u32) -> *mut u8 {
        /*
         *                                                   SubComplete
         *                                      SubIncomplete     |
         *                       Standard  Super       |          |
         *                              v      v       v          v
         * store_header             true    true   false      false
         * retain_header           false    true   false      false
         * store_guard              true   false   false       true
         */
        let headers = self.config.store_header;
        let (store_header, retain_header, store_guard) = if headers {
            match mode {
                AllocMode::Standard => (true, false, true),
                AllocMode::Super => (true, true, false),
                AllocMode::SubIncomplete => (false, false, false),
                AllocMode::SubComplete => (false, false, true),
            }
        } else {
            (false, false, false)
        };

        let is_sub = matches!(mode, AllocMode::SubIncomplete | AllocMode::SubComplete);

        if headers && is_sub && self.last_header.is_null() {
            self.capture_error(ArenaErrorKind::OrphanSubAlloc, req_z);
            return ptr::null_mut();
        }

        debug_assert!(is_aligned(self.free as usize, ALLOC_ALIGN));

        // pad request to pointer alignment; the padded size is what the
        // header records, which arena iteration depends on
        let dz = padding(req_z, ALLOC_ALIGN);
        let z0 = req_z + dz;

        let (hz, header): (usize, AllocHeader) = if store_header {
            let hcfg = &self.config.header;
            if !hcfg.is_size_enabled() || !hcfg.size_fits(z0) {
                self.capture_error(ArenaErrorKind::HeaderSizeMask, req_z);
                return ptr::null_mut();
            }
            (HEADER_Z, hcfg.mkheader(tseq.seqno() as u64, age as u64, z0 as u64))
        } else {
            (0, 0)
        };

        let z1 = hz + z0;
        let guard_extra = if store_guard { self.config.header.guard_z } else { 0 };

        if !self.expand(self.allocated() + z1 + guard_extra) {
            // error state already captured
            return ptr::null_mut();
        }

        if store_header {
            unsafe {
                *(self.free as *mut AllocHeader) = header;
            }
            if retain_header {
                self.last_header = self.free as *mut AllocHeader;
            }
        }

        let mem = unsafe { self.free.add(hz) };
        self.free = unsafe { self.free.add(z1) };

        if headers && is_sub {
            // accumulate padded size into the remembered super header
            unsafe {
                *self.last_header = self.config.header.bump_size(*self.last_header, z0);
            }
        }

        if store_guard {
            let guard_z = self.config.header.guard_z;
            unsafe {
                ptr::write_bytes(self.free, self.config.header.guard_byte, guard_z);
                self.free = self.free.add(guard_z);
            }
        }

        if headers && mode == AllocMode::SubComplete {
            self.last_header = ptr::null_mut();
        }

        if self.config.debug {
            log::trace!(
                "arena {}: alloc {:?} req {} pad {} at {:p}, free {:p}, avail {}",
                self.config.name,
                mode,
                req_z,
                dz,
                mem,
                self.free,
                self.available()
            );
        }

        mem
    }

    /// Bookkeeping info for the allocation at `mem`.
    ///
    /// `mem` must be an address previously returned by an allocation
    /// method of this arena, and must not have been invalidated by
    /// `clear` or `restore`.
    pub fn alloc_info(&self, mem: *mut u8) -> AllocInfo<'_> {
        if !self.config.store_header {
            self.capture_error(ArenaErrorKind::AllocInfoDisabled, 0);
            return AllocInfo::invalid(&self.config.header);
        }

        let header_mem = unsafe { mem.sub(HEADER_Z) };

        if !self.contains(header_mem) {
            self.capture_error(ArenaErrorKind::AllocInfoAddress, 0);
            return AllocInfo::invalid(&self.config.header);
        }

        let header = header_mem as *const AllocHeader;
        let hcfg = &self.config.header;
        let guard_lo = unsafe { header_mem.sub(hcfg.guard_z) } as *const u8;
        let guard_hi = unsafe { mem.add(hcfg.size(*header)) } as *const u8;

        AllocInfo::new(hcfg, guard_lo, header, guard_hi)
    }

    /// Header configuration shared by every allocation in this arena.
    pub fn header_config(&self) -> &HeaderConfig {
        &self.config.header
    }

    /// Address of the first allocation header, or `None` (capturing an
    /// error) when headers are disabled.
    pub(crate) fn begin_header(&self) -> Option<*mut AllocHeader> {
        if !self.config.store_header {
            self.capture_error(ArenaErrorKind::IteratorNotSupported, 0);
            return None;
        }

        // before the first commit nothing exists, not even the initial
        // guard; begin collapses onto end
        let first = unsafe { self.lo.add(self.config.header.guard_z) };
        let first = if first > self.free { self.free } else { first };

        Some(first as *mut AllocHeader)
    }

    /// Address where the next allocation's header would be written.
    pub(crate) fn end_header(&self) -> Option<*mut AllocHeader> {
        if !self.config.store_header {
            self.capture_error(ArenaErrorKind::IteratorNotSupported, 0);
            return None;
        }

        Some(self.free as *mut AllocHeader)
    }

    /// Cursor at the first allocation.
    pub fn begin(&self) -> ArenaCursor<'_> {
        ArenaCursor::begin(self)
    }

    /// Cursor just past the last allocation.
    pub fn end(&self) -> ArenaCursor<'_> {
        ArenaCursor::end(self)
    }

    /// Iterate the allocation records currently present, in allocation
    /// order.
    pub fn iter(&self) -> ArenaAllocs<'_> {
        ArenaAllocs::new(self.begin(), self.end())
    }

    /// Save the current arena position.
    pub fn checkpoint(&self) -> Checkpoint {
        Checkpoint { free: self.free }
    }

    /// Rewind to a previously-saved position. Only the free pointer is
    /// restored; no destructors run for abandoned payloads.
    pub fn restore(&mut self, ckp: Checkpoint) {
        self.free = ckp.free;
    }

    /// Discard all allocated memory, returning to the empty state.
    ///
    /// Committed memory is unchanged: afterwards `available()` equals
    /// `committed()` less the initial guard.
    pub fn clear(&mut self) {
        self.free = self.lo;
        self.last_header = ptr::null_mut();

        if self.committed_z > 0 {
            self.establish_initial_guard();
        }
    }
}

impl Drop for Arena {
    fn drop(&mut self) {
        if !self.lo.is_null() {
            unsafe {
                mapping::release(self.lo, self.reserved());
            }
            self.lo = ptr::null_mut();
            self.free = ptr::null_mut();
            self.limit = ptr::null_mut();
            self.hi = ptr::null_mut();
            self.committed_z = 0;
        }
    }
}

/// Construct a `T` in memory obtained from `mm`, tagged with `T`'s type
/// sequence. Returns null when the allocation fails.
pub fn construct_in<T: crate::object::GcObject>(
    mm: &mut dyn crate::alloc::Allocator,
    value: T,
) -> *mut T {
    let mem = mm.alloc(T::TYPE_SEQ, std::mem::size_of::<T>());

    if mem.is_null() {
        return ptr::null_mut();
    }

    let p = mem as *mut T;
    unsafe {
        ptr::write(p, value);
    }
    p
}
