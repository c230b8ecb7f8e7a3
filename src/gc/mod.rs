//! X1 Copying Collector
//!
//! A precise, generational, copying collector built directly on
//! [`Arena`] spaces: two arenas per generation whose from/to roles
//! reverse at the start of each collection of that generation.
//!
//! Evacuation is breadth-first. Colors are implicit in location:
//!
//! ```text
//!   to-space   wwwwwwwwwwwwwwwwwwwgggggggggggggggggg_______________
//!              ^                  ^                 ^
//!              to_lo              gray_lo(g)        free(g)
//!
//!   w  white: copied, children already forwarded
//!   g  gray:  copied, children not yet forwarded
//!   _  free to-space memory
//! ```
//!
//! Objects still in from-space are black (unprocessed). `shallow_move`
//! copies one object to to-space and overwrites the original with a
//! forwarding pointer; the sweep loop walks each generation's gray
//! region, calling the payload type's `forward_children`, until no
//! generation's cursor trails its free pointer.
//!
//! The mutator obtains memory exclusively from the gen-0 to-space and
//! sees collector-owned objects only through [`Obj`] fat pointers.
//! Roots are addresses of such fat pointers; during a cycle every
//! root's payload pointer is replaced with the forwarded location of
//! the subgraph behind it.

pub mod cohort;
pub mod config;
pub mod cursor;

pub use cohort::{Generation, ObjectAge, Role, RunState, MAX_GENERATION, MAX_OBJECT_AGE};
pub use config::CollectorConfig;
pub use cursor::{CollectorAllocs, CollectorCursor};

use crate::alloc::Allocator;
use crate::arena::{AllocHeader, AllocInfo, Arena, ArenaConfig, HEADER_Z};
use crate::error::{AllocError, GcError};
use crate::object::{Obj, TypeSeq, Vtable};
use crate::stats::{CycleStats, StatsHistory};
use std::ptr;
use std::time::Instant;

const N_ROLE: usize = 2;

/// Generational copying collector.
pub struct Collector {
    config: CollectorConfig,
    runstate: RunState,
    /// Dense array of per-type interface records, indexed by type
    /// sequence number. An arena doubles as the extensible backing
    /// store.
    types: Arena,
    /// Dense array of `*mut Obj` root addresses, append-only.
    roots: Arena,
    /// Collection is disabled while positive.
    gc_blocked: u32,
    /// Widest deferred request accumulated while blocked.
    gc_pending_upto: Generation,
    /// Arena storage, two rows of [`MAX_GENERATION`] slots. Only the
    /// first `n_generation` columns are mapped.
    space_storage: [[Arena; MAX_GENERATION]; N_ROLE],
    /// Per-generation polarity bit: which storage row currently plays
    /// the to-space role. Flipped when that generation is collected.
    polarity: [u8; MAX_GENERATION],
    cycle_count: u64,
    stats: StatsHistory,
    // per-cycle counters
    cycle_objects: usize,
    cycle_bytes: usize,
    cycle_dropped: usize,
}

impl Collector {
    /// Create a collector per `config`.
    ///
    /// Maps the type table, the root table, and two spaces per
    /// generation. Fails when the configuration is invalid or the
    /// kernel refuses a reservation.
    pub fn new(config: CollectorConfig) -> Result<Self, GcError> {
        config.validate()?;

        let page_z = crate::heap::mapping::os_page_size();

        // small metadata tables: page-granular, no headers
        let types = Arena::map(ArenaConfig {
            name: format!("{}-object-types", config.name),
            size: config.object_types_z,
            hugepage_z: page_z,
            store_header: false,
            header: config.arena.header,
            debug: config.debug,
        })?;

        let roots = Arena::map(ArenaConfig {
            name: format!("{}-object-roots", config.name),
            size: config.object_roots_z,
            hugepage_z: page_z,
            store_header: false,
            header: config.arena.header,
            debug: config.debug,
        })?;

        let mut space_storage: [[Arena; MAX_GENERATION]; N_ROLE] =
            std::array::from_fn(|_| std::array::from_fn(|_| Arena::default()));

        for g in 0..config.n_generation as usize {
            for (r, suffix) in ["a", "b"].iter().enumerate() {
                let name = format!("{}-space-g{}-{}", config.name, g, suffix);
                space_storage[r][g] = Arena::map(config.arena.clone().with_name(name))?;
            }
        }

        let stats = StatsHistory::new(config.stats_history as usize);

        Ok(Self {
            config,
            runstate: RunState::idle(),
            types,
            roots,
            gc_blocked: 0,
            gc_pending_upto: Generation(0),
            space_storage,
            polarity: [0; MAX_GENERATION],
            cycle_count: 0,
            stats,
            cycle_objects: 0,
            cycle_bytes: 0,
            cycle_dropped: 0,
        })
    }

    /// Collector configuration.
    pub fn config(&self) -> &CollectorConfig {
        &self.config
    }

    fn storage_row(&self, r: Role, g: usize) -> usize {
        let p = self.polarity[g] as usize;
        match r {
            Role::To => p,
            Role::From => 1 - p,
        }
    }

    /// The arena playing role `r` for generation `g`.
    pub fn space(&self, r: Role, g: Generation) -> &Arena {
        &self.space_storage[self.storage_row(r, g.index())][g.index()]
    }

    fn space_mut(&mut self, r: Role, g: Generation) -> &mut Arena {
        let row = self.storage_row(r, g.index());
        &mut self.space_storage[row][g.index()]
    }

    /// Current to-space of generation `g`.
    pub fn to_space(&self, g: Generation) -> &Arena {
        self.space(Role::To, g)
    }

    /// Current from-space of generation `g`.
    pub fn from_space(&self, g: Generation) -> &Arena {
        self.space(Role::From, g)
    }

    /// Where new allocations land: gen-0 to-space.
    pub fn new_space(&self) -> &Arena {
        self.to_space(Generation::NURSERY)
    }

    fn new_space_mut(&mut self) -> &mut Arena {
        self.space_mut(Role::To, Generation::NURSERY)
    }

    fn n_generation(&self) -> u32 {
        self.config.n_generation
    }

    /// True iff `addr` lies in any generation's arena of role `r`.
    pub fn contains_role(&self, r: Role, addr: *const u8) -> bool {
        (0..self.n_generation()).any(|g| self.space(r, Generation(g)).contains(addr))
    }

    fn sum_spaces(&self, f: impl Fn(&Arena) -> usize) -> usize {
        let mut total = f(&self.types) + f(&self.roots);
        for r in Role::ALL {
            for g in 0..self.n_generation() {
                total += f(self.space(r, Generation(g)));
            }
        }
        total
    }

    /// Total reserved memory across all tables and spaces.
    pub fn reserved_total(&self) -> usize {
        self.sum_spaces(Arena::reserved)
    }

    /// Total committed memory across all tables and spaces.
    pub fn committed_total(&self) -> usize {
        self.sum_spaces(Arena::committed)
    }

    /// Total available memory across all tables and spaces.
    pub fn available_total(&self) -> usize {
        self.sum_spaces(Arena::available)
    }

    /// Total allocated memory across all tables and spaces.
    pub fn allocated_total(&self) -> usize {
        self.sum_spaces(Arena::allocated)
    }

    // ----- header decoding -----

    /// Padded allocation size recorded in `hdr`.
    pub fn header2size(&self, hdr: AllocHeader) -> usize {
        self.config.arena.header.size(hdr)
    }

    /// Age recorded in `hdr`.
    pub fn header2age(&self, hdr: AllocHeader) -> ObjectAge {
        ObjectAge(self.config.arena.header.age(hdr))
    }

    /// Type sequence recorded in `hdr`.
    pub fn header2tseq(&self, hdr: AllocHeader) -> TypeSeq {
        TypeSeq(self.config.arena.header.tseq(hdr))
    }

    /// True iff `hdr` marks a forwarded allocation.
    pub fn is_forwarding_header(&self, hdr: AllocHeader) -> bool {
        self.config.arena.header.is_forwarding(hdr)
    }

    // ----- type registry -----

    /// Register a payload type's interface record. Idempotent: a later
    /// registration of the same `tseq` overwrites the earlier one.
    ///
    /// Must precede any allocation of the type and any collection that
    /// could encounter such an allocation.
    pub fn install_type(&mut self, meta: &Vtable) -> bool {
        let t = meta.tseq;

        if t == TypeSeq::ANON || t.seqno() >= self.config.arena.header.forwarding_tseq() {
            log::warn!("refusing to install reserved type id {}", t);
            return false;
        }

        let need = std::mem::size_of::<Vtable>() * (t.seqno() as usize + 1);
        if !self.types.expand(need) {
            return false;
        }

        unsafe {
            let slot = (self.types.lo_ptr() as *mut Vtable).add(t.seqno() as usize);
            ptr::write(slot, *meta);
        }

        true
    }

    /// Register `T`'s interface record.
    pub fn install<T: crate::object::GcObject>(&mut self) -> bool {
        self.install_type(crate::object::vtable_of::<T>())
    }

    /// True iff `tseq` has appeared in a preceding `install_type` call.
    pub fn is_type_installed(&self, tseq: TypeSeq) -> bool {
        if tseq == TypeSeq::ANON {
            return false;
        }

        let ix = tseq.seqno() as usize;
        if self.types.committed() < std::mem::size_of::<Vtable>() * (ix + 1) {
            return false;
        }

        // committed pages are zero-filled; an unwritten slot reads as
        // tseq 0, which never matches a non-ANON id
        let stored = unsafe {
            let slot = (self.types.lo_ptr() as *const Vtable).add(ix);
            *ptr::addr_of!((*slot).tseq)
        };

        stored == tseq
    }

    /// Interface record for `tseq`, when installed.
    pub fn lookup_type(&self, tseq: TypeSeq) -> Option<Vtable> {
        if !self.is_type_installed(tseq) {
            return None;
        }

        let vt = unsafe { *(self.types.lo_ptr() as *const Vtable).add(tseq.seqno() as usize) };
        Some(vt)
    }

    fn require_type(&self, tseq: TypeSeq) -> Vtable {
        match self.lookup_type(tseq) {
            Some(vt) => vt,
            None => panic!("gc: no interface installed for {}", tseq),
        }
    }

    // ----- roots -----

    /// Declare the fat pointer at `p_root` reachable.
    ///
    /// Stores the *address* of the fat pointer, not the payload it
    /// currently references; the address must stay valid for the life
    /// of the collector. Roots are append-only.
    pub fn add_root(&mut self, p_root: *mut Obj) -> bool {
        let mem = self.roots.alloc(TypeSeq::ANON, std::mem::size_of::<*mut Obj>());

        if mem.is_null() {
            log::warn!("gc: root table exhausted");
            return false;
        }

        unsafe {
            *(mem as *mut *mut Obj) = p_root;
        }
        true
    }

    /// Number of registered roots.
    pub fn roots_len(&self) -> usize {
        self.roots.allocated() / std::mem::size_of::<*mut Obj>()
    }

    // ----- collection -----

    /// True while a collection cycle is executing.
    pub fn is_collecting(&self) -> bool {
        self.runstate.is_running()
    }

    /// Completed collection cycles.
    pub fn cycle_count(&self) -> u64 {
        self.cycle_count
    }

    /// Disable collection. Nestable; requests arriving while blocked
    /// accumulate into a single deferred collection.
    pub fn block_gc(&mut self) {
        self.gc_blocked += 1;
    }

    /// Re-enable collection, running the widest deferred request once
    /// the last block is released.
    pub fn unblock_gc(&mut self) {
        debug_assert!(self.gc_blocked > 0);
        self.gc_blocked = self.gc_blocked.saturating_sub(1);

        if self.gc_blocked == 0 && self.gc_pending_upto > Generation(0) {
            let upto = std::mem::replace(&mut self.gc_pending_upto, Generation(0));
            self.execute_gc(upto);
        }
    }

    fn effective_upto(&self, upto: Generation) -> Generation {
        let n = self.n_generation();
        if self.config.allow_incremental_gc {
            Generation(upto.value().clamp(1, n))
        } else {
            Generation(n)
        }
    }

    /// Request collection of generations `< upto`.
    ///
    /// Runs immediately unless collection is blocked, in which case the
    /// request is remembered (keeping the widest upper bound seen) and
    /// executed when unblocked.
    pub fn request_gc(&mut self, upto: Generation) {
        let upto = self.effective_upto(upto);

        if self.gc_blocked > 0 {
            if self.gc_pending_upto < upto {
                self.gc_pending_upto = upto;
            }
            return;
        }

        self.execute_gc(upto);
    }

    /// Consult the per-generation triggers and request the widest
    /// indicated collection.
    ///
    /// Call from mutator safepoints only: no borrowed payload pointers
    /// may be live across this call.
    pub fn maybe_collect(&mut self) {
        let mut upto = 0u32;

        for g in 0..self.n_generation() {
            let trigger = self.config.gc_trigger[g as usize];
            if trigger > 0 && self.to_space(Generation(g)).allocated() >= trigger {
                upto = g + 1;
            }
        }

        if upto > 0 {
            self.request_gc(Generation(upto));
        }
    }

    /// Collect all generations `< upto`, immediately.
    ///
    /// Every object reachable from the root table is evacuated to
    /// to-space; unreachable from-space objects have their destructors
    /// run and their memory abandoned for reuse on the next cycle.
    pub fn execute_gc(&mut self, upto: Generation) {
        assert!(!self.runstate.is_running(), "gc: collection already in progress");

        let upto = Generation(upto.value().clamp(1, self.n_generation()));
        let started = Instant::now();
        let started_at = chrono::Local::now();

        self.cycle_count += 1;
        self.cycle_objects = 0;
        self.cycle_bytes = 0;
        self.cycle_dropped = 0;

        log::debug!("gc: cycle {} start, collecting generations < {}", self.cycle_count, upto);

        self.runstate = RunState::collecting(upto);

        self.swap_roles(upto);
        let roots_scanned = self.copy_roots(upto);
        self.sweep_dead(upto);

        self.runstate = RunState::idle();

        let duration_us = started.elapsed().as_micros() as u64;
        log::debug!(
            "gc: cycle {} end, {} roots, {} objects / {} bytes evacuated, {} dropped",
            self.cycle_count,
            roots_scanned,
            self.cycle_objects,
            self.cycle_bytes,
            self.cycle_dropped
        );

        let allocated_after =
            (0..self.n_generation()).map(|g| self.to_space(Generation(g)).allocated()).sum();

        self.stats.push(CycleStats {
            cycle: self.cycle_count,
            upto: upto.value(),
            started_at,
            duration_us,
            roots_scanned,
            objects_evacuated: self.cycle_objects,
            bytes_evacuated: self.cycle_bytes,
            objects_dropped: self.cycle_dropped,
            allocated_after,
        });
    }

    /// Reverse from/to roles for the generations being collected. The
    /// arena taking over the to-space role is recycled, so it starts
    /// empty.
    fn swap_roles(&mut self, upto: Generation) {
        for g in 0..upto.value() {
            self.polarity[g as usize] ^= 1;
            self.space_mut(Role::To, Generation(g)).clear();
        }
    }

    /// Walk the root table, replacing each root's payload pointer with
    /// the forwarded location of the subgraph behind it.
    fn copy_roots(&mut self, upto: Generation) -> usize {
        let mut p = self.roots.lo_ptr() as *mut *mut Obj;
        let end = self.roots.free_ptr() as *mut *mut Obj;
        let mut scanned = 0usize;

        while p < end {
            unsafe {
                let p_root: *mut Obj = *p;
                let new_data = self.deep_move((*p_root).data(), upto);
                (*p_root).reset(new_data);
            }
            p = unsafe { p.add(1) };
            scanned += 1;
        }

        scanned
    }

    /// Where the gray region of `g`'s to-space begins right now: its
    /// free pointer, adjusted for the initial guard when the space has
    /// not been committed yet (the first copy into it will write the
    /// guard before the first header).
    fn gray_start(&self, g: Generation) -> *mut u8 {
        let arena = self.to_space(g);
        let free = arena.free_ptr();

        if free == arena.lo_ptr() {
            unsafe { free.add(self.config.arena.header.guard_z) }
        } else {
            free
        }
    }

    /// Should the object described by `hdr` move in the current cycle?
    ///
    /// An object moves iff its generation is among those being
    /// collected. A tenured object stays put during a partial
    /// collection; its own interior pointers to moved objects are
    /// rewritten when it is reached through `forward_children`.
    fn check_move_policy(&self, hdr: AllocHeader) -> bool {
        debug_assert!(self.runstate.is_running());

        let g = self.config.age2gen(self.header2age(hdr));
        g < self.runstate.gc_upto()
    }

    /// Evacuate the subgraph rooted at `from_src`; return the new
    /// location of the root object (or `from_src` unchanged when it is
    /// not collector memory or not being collected).
    fn deep_move(&mut self, from_src: *mut u8, upto: Generation) -> *mut u8 {
        if from_src.is_null() {
            return from_src;
        }

        if !self.contains_role(Role::From, from_src) {
            // memory not owned by the collector, or already in to-space
            return from_src;
        }

        let hcfg = self.config.arena.header;
        let hdr = unsafe { *(from_src.sub(HEADER_Z) as *const AllocHeader) };

        if hcfg.is_forwarding(hdr) {
            // already moved this cycle: pick up the destination
            return unsafe { *(from_src as *const *mut u8) };
        }

        if !self.check_move_policy(hdr) {
            return from_src;
        }

        // promoted copies can land one generation past the collected
        // range; their children still need forwarding
        let scan_hi = (upto.value() + 1).min(self.n_generation());

        let mut gray_lo = [ptr::null_mut::<u8>(); MAX_GENERATION];
        for g in 0..scan_hi {
            gray_lo[g as usize] = self.gray_start(Generation(g));
        }

        let vt = self.require_type(TypeSeq(hcfg.tseq(hdr)));
        let to_dest = self.shallow_move(&vt, from_src);

        loop {
            let mut fixup_work = 0usize;

            for g in 0..scan_hi {
                loop {
                    let free = self.to_space(Generation(g)).free_ptr();
                    if gray_lo[g as usize] >= free {
                        break;
                    }

                    let pos = gray_lo[g as usize];
                    let hdr = unsafe { *(pos as *const AllocHeader) };
                    let src = unsafe { pos.add(HEADER_Z) };
                    let z = hcfg.size(hdr);

                    let vt = self.require_type(TypeSeq(hcfg.tseq(hdr)));
                    unsafe {
                        (vt.forward_children)(src, self);
                    }

                    gray_lo[g as usize] = unsafe { src.add(z + hcfg.guard_z) };
                    fixup_work += 1;
                }
            }

            if fixup_work == 0 {
                break;
            }
        }

        to_dest
    }

    /// Copy one object to to-space and leave a forwarding record behind:
    /// the from-space header's `tseq` becomes the sentinel (age and size
    /// preserved, so iteration still works) and the first payload bytes
    /// hold the destination address.
    fn shallow_move(&mut self, vt: &Vtable, from_src: *mut u8) -> *mut u8 {
        debug_assert!(self.runstate.is_running());

        let size = {
            let info = self.alloc_info(from_src);
            debug_assert!(info.is_valid());
            info.size()
        };

        let to_dest = unsafe { (vt.shallow_copy)(from_src, self) };

        if to_dest.is_null() {
            // every reachable object must evacuate
            panic!("gc: evacuation failed, out of to-space: {}", self.last_error());
        }
        assert!(to_dest != from_src, "gc: shallow_copy returned the source address");

        let hcfg = &self.config.arena.header;
        unsafe {
            let p_header = from_src.sub(HEADER_Z) as *mut AllocHeader;
            *p_header = hcfg.mark_forwarding(*p_header);
            *(from_src as *mut *mut u8) = to_dest;
        }

        self.cycle_objects += 1;
        self.cycle_bytes += size;

        to_dest
    }

    /// Rewrite one interior fat pointer to its forwarded location.
    ///
    /// The primitive `forward_children` implementations call for each
    /// child. Pointers outside collector from-space are left unchanged;
    /// already-forwarded targets are resolved through their forwarding
    /// slot; targets that the move policy keeps in place (tenured
    /// objects during a partial collection) are left as-is.
    pub fn forward_inplace(&mut self, obj: &mut Obj) {
        assert!(self.runstate.is_running(), "gc: forward_inplace outside a collection cycle");

        let data = obj.data();
        if data.is_null() || !self.contains_role(Role::From, data) {
            return;
        }

        let hcfg = self.config.arena.header;
        let hdr = unsafe { *(data.sub(HEADER_Z) as *const AllocHeader) };

        // the forwarding slot must fit where the payload was; payload
        // padding to pointer alignment guarantees it
        debug_assert!(hcfg.size(hdr) >= std::mem::size_of::<*mut u8>());

        if hcfg.is_forwarding(hdr) {
            obj.reset(unsafe { *(data as *const *mut u8) });
        } else if self.check_move_policy(hdr) {
            let vt = unsafe { *obj.iface() };
            let dest = self.shallow_move(&vt, data);
            obj.reset(dest);
        }
        // else: not part of this collection, leave in place
    }

    /// Run destructors for the from-space objects that did not survive,
    /// in allocation order.
    fn sweep_dead(&mut self, upto: Generation) {
        let hcfg = self.config.arena.header;

        for g in 0..upto.value() {
            let arena = self.from_space(Generation(g));
            let lo = arena.lo_ptr();
            let free = arena.free_ptr();

            if lo.is_null() || free == lo {
                continue;
            }

            let mut pos = unsafe { lo.add(hcfg.guard_z) };
            while pos < free {
                let hdr = unsafe { *(pos as *const AllocHeader) };
                let z = hcfg.size(hdr);

                if !hcfg.is_forwarding(hdr) {
                    if let Some(vt) = self.lookup_type(TypeSeq(hcfg.tseq(hdr))) {
                        if let Some(drop_fn) = vt.drop {
                            unsafe {
                                drop_fn(pos.add(HEADER_Z));
                            }
                            self.cycle_dropped += 1;
                        }
                    }
                }

                pos = unsafe { pos.add(HEADER_Z + z + hcfg.guard_z) };
            }
        }
    }

    // ----- iteration -----

    /// Cursor at the first surviving allocation, across all to-spaces.
    pub fn begin(&self) -> CollectorCursor<'_> {
        CollectorCursor::begin(self)
    }

    /// Cursor past the last allocation.
    pub fn end(&self) -> CollectorCursor<'_> {
        CollectorCursor::end(self)
    }

    /// Iterate allocation records across all generations' to-spaces,
    /// youngest generation first.
    pub fn iter(&self) -> CollectorAllocs<'_> {
        CollectorAllocs::new(self.begin(), self.end())
    }

    // ----- statistics -----

    /// Recorded cycle statistics, oldest first.
    pub fn stats(&self) -> &[CycleStats] {
        self.stats.entries()
    }

    /// Cycle statistics as a JSON array.
    pub fn stats_json(&self) -> String {
        self.stats.to_json()
    }

    /// Discard all allocated memory in every space.
    pub fn clear(&mut self) {
        for r in Role::ALL {
            for g in 0..self.n_generation() {
                self.space_mut(r, Generation(g)).clear();
            }
        }
    }
}

impl Allocator for Collector {
    fn name(&self) -> &str {
        &self.config.name
    }

    fn reserved(&self) -> usize {
        self.reserved_total()
    }

    fn committed(&self) -> usize {
        self.committed_total()
    }

    fn available(&self) -> usize {
        self.available_total()
    }

    fn allocated(&self) -> usize {
        self.allocated_total()
    }

    fn contains(&self, addr: *const u8) -> bool {
        self.contains_role(Role::To, addr)
    }

    fn last_error(&self) -> AllocError {
        self.new_space().last_error()
    }

    /// Allocate in gen-0 to-space with age 0.
    fn alloc(&mut self, tseq: TypeSeq, z: usize) -> *mut u8 {
        self.new_space_mut().alloc(tseq, z)
    }

    fn super_alloc(&mut self, tseq: TypeSeq, z: usize) -> *mut u8 {
        self.new_space_mut().super_alloc(tseq, z)
    }

    fn sub_alloc(&mut self, z: usize, complete: bool) -> *mut u8 {
        self.new_space_mut().sub_alloc(z, complete)
    }

    /// Evacuation helper: allocate a copy slot preserving `tseq` with
    /// age incremented. The copy is placed in the to-space of the
    /// generation the new age belongs to, which is how survivors
    /// physically promote.
    fn alloc_copy(&mut self, src: *mut u8) -> *mut u8 {
        let age = {
            let info = self.alloc_info(src);
            if !info.is_valid() {
                return ptr::null_mut();
            }
            info.age()
        };

        let target = self.config.age2gen(ObjectAge(age.saturating_add(1)));
        self.space_mut(Role::To, target).alloc_copy(src)
    }

    /// Expand gen-0 committed size (both spaces) to at least `z`.
    fn expand(&mut self, z: usize) -> bool {
        if !self.space_mut(Role::To, Generation::NURSERY).expand(z) {
            return false;
        }
        self.space_mut(Role::From, Generation::NURSERY).expand(z)
    }

    /// Bookkeeping info for `mem`, searching every space. Falls back to
    /// gen-0 to-space for unowned addresses, capturing the error there.
    fn alloc_info(&self, mem: *mut u8) -> AllocInfo<'_> {
        for r in Role::ALL {
            for g in 0..self.n_generation() {
                let arena = self.space(r, Generation(g));
                if arena.contains(mem) {
                    return arena.alloc_info(mem);
                }
            }
        }

        self.new_space().alloc_info(mem)
    }
}
