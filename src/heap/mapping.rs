//! Virtual Memory Mapping
//!
//! Reserve / commit / release primitives for arena memory.
//!
//! Lifecycle of an arena's address range:
//!
//! ```text
//! Reserve ──► Commit ──► Use ──► Release
//!    │          │                  │
//!    │          │                  └── munmap (arena drop)
//!    │          └── mprotect(PROT_READ | PROT_WRITE), page-multiple prefix
//!    └── mmap(PROT_NONE, MAP_PRIVATE | MAP_ANONYMOUS), trimmed to alignment
//! ```
//!
//! Reservation over-requests by one alignment unit and unmaps the
//! unaligned prefix and suffix, so the surviving range starts on an
//! `align_z` boundary and spans a whole multiple of `align_z`. When the
//! caller opts into huge pages, the range is additionally advised with
//! `MADV_HUGEPAGE` so the kernel may back it with transparent huge pages;
//! commits then consume physical memory in `align_z` units, which trades
//! up to `align_z` bytes of slack for shorter page-table walks.

use crate::error::GcError;
use crate::util::alignment::with_padding;
use std::ptr;

/// A reserved (not yet committed) contiguous address range `[lo, hi)`.
#[derive(Debug, Clone, Copy)]
pub struct Span {
    pub lo: *mut u8,
    pub hi: *mut u8,
}

impl Span {
    /// Length of the range in bytes.
    pub fn len(&self) -> usize {
        self.hi as usize - self.lo as usize
    }

    pub fn is_empty(&self) -> bool {
        self.lo == self.hi
    }
}

/// Size of a VM page. Likely 4 KiB.
pub fn os_page_size() -> usize {
    page_size::get()
}

/// Reserve an uncommitted address range of at least `req_z` bytes,
/// aligned on an `align_z` boundary and spanning a whole multiple of
/// `align_z`.
///
/// The entire range is mapped `PROT_NONE`: any access before a commit
/// faults. When `enable_hugepage` is set the range is advised with
/// `MADV_HUGEPAGE` (Linux; a no-op elsewhere). `align_z` should then be
/// the huge-page size, probably 2 MiB.
///
/// `MAP_HUGETLB` is deliberately not used: it requires pages reserved up
/// front in `/proc/sys/vm/nr_hugepages`.
pub fn reserve_aligned(
    req_z: usize,
    align_z: usize,
    enable_hugepage: bool,
    debug: bool,
) -> Result<Span, GcError> {
    let target_z = with_padding(req_z, align_z);
    let map_z = target_z + align_z;

    let base = unsafe {
        libc::mmap(
            ptr::null_mut(),
            map_z,
            libc::PROT_NONE,
            libc::MAP_PRIVATE | libc::MAP_ANONYMOUS,
            -1,
            0,
        )
    };

    if base == libc::MAP_FAILED {
        return Err(GcError::ReserveFailed { size: req_z });
    }

    let base = base as *mut u8;
    let hi = unsafe { base.add(map_z) };
    // lowest align_z-aligned address in [base, hi)
    let aligned_lo = with_padding(base as usize, align_z) as *mut u8;
    let aligned_hi = unsafe { aligned_lo.add(target_z) };

    debug_assert!(aligned_lo >= base);
    debug_assert!((aligned_lo as usize) < base as usize + align_z);
    debug_assert!(aligned_hi <= hi);

    // release unaligned prefix
    if (base as usize) < aligned_lo as usize {
        unsafe {
            libc::munmap(base as *mut libc::c_void, aligned_lo as usize - base as usize);
        }
    }

    // release unaligned suffix
    if (aligned_hi as usize) < hi as usize {
        unsafe {
            libc::munmap(
                aligned_hi as *mut libc::c_void,
                hi as usize - aligned_hi as usize,
            );
        }
    }

    if enable_hugepage {
        #[cfg(target_os = "linux")]
        unsafe {
            libc::madvise(
                aligned_lo as *mut libc::c_void,
                target_z,
                libc::MADV_HUGEPAGE,
            );
        }
    }

    if debug {
        log::debug!(
            "reserved [{:p}, {:p}) req_z={} target_z={} align_z={} hugepage={}",
            aligned_lo,
            aligned_hi,
            req_z,
            target_z,
            align_z,
            enable_hugepage
        );
    }

    Ok(Span { lo: aligned_lo, hi: aligned_hi })
}

/// Commit `len` bytes starting at `lo`: back the range with physical
/// memory on first touch by granting read/write access.
///
/// `lo` and `len` must be page-multiples inside a reserved range.
/// Returns false when the kernel refuses.
pub fn commit(lo: *mut u8, len: usize) -> bool {
    if len == 0 {
        return true;
    }

    let rc = unsafe {
        libc::mprotect(
            lo as *mut libc::c_void,
            len,
            libc::PROT_READ | libc::PROT_WRITE,
        )
    };

    rc == 0
}

/// Return a committed range to the OS and make it inaccessible again.
///
/// Used by the circular buffer to drop physical backing for consumed
/// bytes while keeping the address range reserved.
///
/// # Safety
/// `lo..lo+len` must lie inside a mapping owned by the caller, with no
/// live references into it.
pub unsafe fn uncommit(lo: *mut u8, len: usize) {
    if len == 0 {
        return;
    }

    #[cfg(target_os = "linux")]
    libc::madvise(lo as *mut libc::c_void, len, libc::MADV_DONTNEED);

    libc::mprotect(lo as *mut libc::c_void, len, libc::PROT_NONE);
}

/// Unmap a reserved range.
///
/// # Safety
/// `lo..lo+len` must be exactly a range previously returned by
/// [`reserve_aligned`], with no live references into it.
pub unsafe fn release(lo: *mut u8, len: usize) {
    if len == 0 {
        return;
    }
    libc::munmap(lo as *mut libc::c_void, len);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reserve_alignment() {
        let page_z = os_page_size();
        let span = reserve_aligned(10 * page_z, page_z, false, false).unwrap();

        assert!(!span.lo.is_null());
        assert_eq!(span.lo as usize % page_z, 0);
        assert_eq!(span.len() % page_z, 0);
        assert!(span.len() >= 10 * page_z);

        unsafe { release(span.lo, span.len()) };
    }

    #[test]
    fn test_reserve_hugepage_alignment() {
        let huge_z = 2 * 1024 * 1024;
        let span = reserve_aligned(3 * huge_z, huge_z, true, false).unwrap();

        assert_eq!(span.lo as usize % huge_z, 0);
        assert_eq!(span.len(), 3 * huge_z);

        unsafe { release(span.lo, span.len()) };
    }

    #[test]
    fn test_commit_and_touch() {
        let page_z = os_page_size();
        let span = reserve_aligned(4 * page_z, page_z, false, false).unwrap();

        assert!(commit(span.lo, page_z));
        unsafe {
            span.lo.write_bytes(0xab, page_z);
            assert_eq!(*span.lo, 0xab);
            assert_eq!(*span.lo.add(page_z - 1), 0xab);
        }

        unsafe { release(span.lo, span.len()) };
    }

    #[test]
    fn test_zero_size_reservation() {
        let page_z = os_page_size();
        let span = reserve_aligned(0, page_z, false, false).unwrap();
        assert!(span.is_empty());
        // nothing left mapped; release is a no-op on an empty span
        unsafe { release(span.lo, span.len()) };
    }
}
