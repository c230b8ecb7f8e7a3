//! Open-addressed flat hash map over a dedicated arena.

use crate::arena::{Arena, ArenaConfig};
use crate::error::GcError;
use crate::util::alignment::with_alloc_padding;
use std::hash::{BuildHasher, Hash, Hasher};
use std::marker::PhantomData;
use std::ptr;

/// Control byte: slot has never held an entry.
const CTRL_EMPTY: u8 = 0xFF;
/// Control byte: slot held an entry that was removed.
const CTRL_TOMBSTONE: u8 = 0xFE;

/// Numerator/denominator of the maximum load factor (7/8).
const LOAD_NUM: usize = 7;
const LOAD_DEN: usize = 8;

/// Open-addressed hash map with one control byte per slot, using a
/// dedicated arena for storage.
///
/// Layout inside the arena: a control-byte array of `n_slot` bytes,
/// padded to allocation alignment, followed by `n_slot` key-value
/// slots. A control byte is empty (0xFF), tombstone (0xFE), or the
/// high 7 bits of the key's hash, so most probes are settled without
/// touching the slot array.
///
/// Slot count is fixed at `map` time; inserts beyond the load limit
/// fail rather than rehash.
pub struct ArenaHashMap<K, V> {
    n_slot: usize,
    mask: usize,
    len: usize,
    tombstones: usize,
    store: Arena,
    hasher: std::collections::hash_map::RandomState,
    _marker: PhantomData<(K, V)>,
}

impl<K: Hash + Eq, V> ArenaHashMap<K, V> {
    /// Create a map able to hold at least `capacity` entries, with
    /// storage configured by `cfg` (size is derived from `capacity`;
    /// the `cfg` size field is ignored).
    pub fn map(cfg: ArenaConfig, capacity: usize) -> Result<Self, GcError> {
        // smallest power-of-two slot count keeping the load in bounds
        let want = (capacity.max(1) * LOAD_DEN).div_ceil(LOAD_NUM);
        let n_slot = want.next_power_of_two();

        let ctrl_z = with_alloc_padding(n_slot);
        let slots_z = n_slot * std::mem::size_of::<(K, V)>();

        let cfg = ArenaConfig { store_header: false, size: ctrl_z + slots_z, ..cfg };
        let mut store = Arena::map(cfg)?;

        // the table is probed at random offsets: commit it whole
        if !store.expand(ctrl_z + slots_z) {
            return Err(GcError::Configuration(format!(
                "hash map storage commit failed: {}",
                store.last_error()
            )));
        }

        unsafe {
            ptr::write_bytes(store.lo_ptr(), CTRL_EMPTY, n_slot);
        }

        Ok(Self {
            n_slot,
            mask: n_slot - 1,
            len: 0,
            tombstones: 0,
            store,
            hasher: std::collections::hash_map::RandomState::new(),
            _marker: PhantomData,
        })
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Entries the map accepts before inserts start failing.
    pub fn capacity(&self) -> usize {
        self.n_slot * LOAD_NUM / LOAD_DEN
    }

    fn hash_of(&self, key: &K) -> (usize, u8) {
        let mut h = self.hasher.build_hasher();
        key.hash(&mut h);
        let hash = h.finish();

        // h1 picks the slot, h2 is the 7-bit control fragment
        let h1 = hash as usize;
        let h2 = (hash >> 57) as u8 & 0x7F;
        (h1, h2)
    }

    /// Index of the slot holding `key`, if present.
    fn find(&self, key: &K) -> Option<usize> {
        let (h1, h2) = self.hash_of(key);
        let mut ix = h1 & self.mask;

        for _ in 0..self.n_slot {
            let c = unsafe { *self.ctrl().add(ix) };

            if c == CTRL_EMPTY {
                return None;
            }
            if c == h2 {
                let slot = unsafe { &*self.slots().add(ix) };
                if slot.0 == *key {
                    return Some(ix);
                }
            }

            ix = (ix + 1) & self.mask;
        }

        None
    }

    /// Insert or replace. Returns the previous value for the key, or
    /// `Err` with the rejected pair when the map is at capacity.
    pub fn insert(&mut self, key: K, value: V) -> Result<Option<V>, (K, V)> {
        if let Some(ix) = self.find(&key) {
            let slot = unsafe { &mut *self.slots().add(ix) };
            let old = std::mem::replace(&mut slot.1, value);
            return Ok(Some(old));
        }

        if self.len + self.tombstones >= self.capacity() {
            return Err((key, value));
        }

        let (h1, h2) = self.hash_of(&key);
        let mut ix = h1 & self.mask;

        loop {
            let c = unsafe { *self.ctrl().add(ix) };
            if c == CTRL_EMPTY || c == CTRL_TOMBSTONE {
                if c == CTRL_TOMBSTONE {
                    self.tombstones -= 1;
                }
                unsafe {
                    *self.ctrl().add(ix) = h2;
                    ptr::write(self.slots().add(ix), (key, value));
                }
                self.len += 1;
                return Ok(None);
            }

            ix = (ix + 1) & self.mask;
        }
    }

    pub fn get(&self, key: &K) -> Option<&V> {
        let ix = self.find(key)?;
        Some(unsafe { &(*self.slots().add(ix)).1 })
    }

    pub fn get_mut(&mut self, key: &K) -> Option<&mut V> {
        let ix = self.find(key)?;
        Some(unsafe { &mut (*self.slots().add(ix)).1 })
    }

    pub fn contains_key(&self, key: &K) -> bool {
        self.find(key).is_some()
    }

    /// Remove `key`, returning its value. The slot becomes a tombstone
    /// so later probes keep walking past it.
    pub fn remove(&mut self, key: &K) -> Option<V> {
        let ix = self.find(key)?;

        unsafe {
            *self.ctrl().add(ix) = CTRL_TOMBSTONE;
        }
        let (_k, v) = unsafe { ptr::read(self.slots().add(ix)) };

        self.len -= 1;
        self.tombstones += 1;
        Some(v)
    }

    /// Drop all entries and reset every slot to empty.
    pub fn clear(&mut self) {
        for ix in 0..self.n_slot {
            let c = unsafe { *self.ctrl().add(ix) };
            if c != CTRL_EMPTY && c != CTRL_TOMBSTONE {
                unsafe {
                    ptr::drop_in_place(self.slots().add(ix));
                }
            }
        }

        unsafe {
            ptr::write_bytes(self.ctrl(), CTRL_EMPTY, self.n_slot);
        }
        self.len = 0;
        self.tombstones = 0;
    }
}

impl<K, V> ArenaHashMap<K, V> {
    fn ctrl(&self) -> *mut u8 {
        self.store.lo_ptr()
    }

    fn slots(&self) -> *mut (K, V) {
        unsafe { self.store.lo_ptr().add(with_alloc_padding(self.n_slot)) as *mut (K, V) }
    }
}

impl<K, V> Drop for ArenaHashMap<K, V> {
    fn drop(&mut self) {
        if !std::mem::needs_drop::<(K, V)>() {
            return;
        }

        for ix in 0..self.n_slot {
            let c = unsafe { *self.ctrl().add(ix) };
            if c != CTRL_EMPTY && c != CTRL_TOMBSTONE {
                unsafe {
                    ptr::drop_in_place(self.slots().add(ix));
                }
            }
        }
    }
}
