//! VM-aware circular byte buffer.

use crate::arena::ArenaConfig;
use crate::error::GcError;
use crate::heap::mapping;
use crate::util::alignment::{align_down, with_padding};
use std::ptr;
use std::slice;

/// Byte buffer over a large reserved range, committed lazily and
/// released back to the OS as the consumer drains it.
///
/// A generalization of the arena: the occupied window `[head, tail)`
/// slides forward through the reservation instead of always growing
/// from the base. Unlike a classic ring it never wraps mid-data;
/// whenever the buffer drains empty, both offsets reset to the base of
/// the range, so a reservation much larger than physical memory
/// sustains unbounded throughput as long as the consumer keeps up.
///
/// ```text
///    <-----------------------reserved------------------------>
///    ..........._______XXXXXXXXXXXXXX___________..............
///    ^          ^      ^             ^          ^            ^
///    lo         win_lo head          tail       win_hi       hi
///
///    [X] occupied   [_] committed slack   [.] uncommitted
/// ```
pub struct CircularBuffer {
    config: ArenaConfig,
    page_z: usize,
    align_z: usize,
    lo: *mut u8,
    hi: *mut u8,
    /// Committed window `[win_lo, win_hi)`; both alignment multiples
    /// relative to `lo`.
    win_lo: *mut u8,
    win_hi: *mut u8,
    /// Consume position.
    head: *mut u8,
    /// Produce position.
    tail: *mut u8,
}

impl CircularBuffer {
    /// Reserve the address range for a buffer configured by `cfg`.
    pub fn map(cfg: ArenaConfig) -> Result<Self, GcError> {
        let page_z = mapping::os_page_size();

        let enable_hugepage = cfg.size >= cfg.hugepage_z;
        let align_z = if enable_hugepage { cfg.hugepage_z } else { page_z };

        let span = mapping::reserve_aligned(cfg.size, align_z, enable_hugepage, cfg.debug)?;

        Ok(Self {
            config: cfg,
            page_z,
            align_z,
            lo: span.lo,
            hi: span.hi,
            win_lo: span.lo,
            win_hi: span.lo,
            head: span.lo,
            tail: span.lo,
        })
    }

    /// Bytes currently occupied.
    pub fn len(&self) -> usize {
        self.tail as usize - self.head as usize
    }

    pub fn is_empty(&self) -> bool {
        self.head == self.tail
    }

    /// Size of the reserved range.
    pub fn reserved(&self) -> usize {
        self.hi as usize - self.lo as usize
    }

    /// Size of the committed window.
    pub fn committed(&self) -> usize {
        self.win_hi as usize - self.win_lo as usize
    }

    /// Reserved bytes remaining ahead of the produce position.
    pub fn headroom(&self) -> usize {
        self.hi as usize - self.tail as usize
    }

    /// Append `data`. Fails when the remaining reservation cannot hold
    /// it or the commit is refused.
    pub fn produce(&mut self, data: &[u8]) -> bool {
        match self.produce_uninit(data.len()) {
            Some(dst) => {
                unsafe {
                    ptr::copy_nonoverlapping(data.as_ptr(), dst, data.len());
                }
                true
            },
            None => false,
        }
    }

    /// Reserve `n` writable bytes at the tail and advance it, returning
    /// the write position. The caller fills them.
    pub fn produce_uninit(&mut self, n: usize) -> Option<*mut u8> {
        if n > self.headroom() {
            return None;
        }

        let need_hi = unsafe { self.tail.add(n) };

        if need_hi > self.win_hi {
            let target = with_padding(need_hi as usize - self.lo as usize, self.align_z);
            let target_hi = unsafe { self.lo.add(target.min(self.reserved())) };
            let add = target_hi as usize - self.win_hi as usize;

            if !mapping::commit(self.win_hi, add) {
                log::warn!("ring {}: commit failed for {} bytes", self.config.name, add);
                return None;
            }
            self.win_hi = target_hi;
        }

        let dst = self.tail;
        self.tail = unsafe { self.tail.add(n) };
        Some(dst)
    }

    /// Borrow the next `n` occupied bytes without consuming them.
    pub fn peek(&self, n: usize) -> Option<&[u8]> {
        if n > self.len() {
            return None;
        }
        Some(unsafe { slice::from_raw_parts(self.head, n) })
    }

    /// Consume `n` bytes from the head.
    ///
    /// When this empties the buffer, both offsets snap back to the base
    /// of the reservation so the address range is reused from the
    /// start.
    pub fn consume(&mut self, n: usize) -> bool {
        if n > self.len() {
            return false;
        }

        self.head = unsafe { self.head.add(n) };

        if self.head == self.tail {
            self.reset();
        }
        true
    }

    /// Return the physical memory behind fully-consumed bytes to the
    /// OS, keeping the address range reserved.
    pub fn release_consumed(&mut self) {
        let cut = align_down(self.head as usize - self.lo as usize, self.align_z);
        let cut_ptr = unsafe { self.lo.add(cut) };

        if cut_ptr > self.win_lo {
            unsafe {
                mapping::uncommit(self.win_lo, cut_ptr as usize - self.win_lo as usize);
            }
            self.win_lo = cut_ptr;
        }
    }

    fn reset(&mut self) {
        self.head = self.lo;
        self.tail = self.lo;

        // drop the whole window; production recommits from the base
        if self.win_hi > self.win_lo {
            unsafe {
                mapping::uncommit(self.win_lo, self.win_hi as usize - self.win_lo as usize);
            }
        }
        self.win_lo = self.lo;
        self.win_hi = self.lo;
    }

    /// VM page size for this buffer.
    pub fn page_z(&self) -> usize {
        self.page_z
    }
}

impl Drop for CircularBuffer {
    fn drop(&mut self) {
        if !self.lo.is_null() {
            unsafe {
                mapping::release(self.lo, self.reserved());
            }
            self.lo = ptr::null_mut();
            self.hi = ptr::null_mut();
        }
    }
}
