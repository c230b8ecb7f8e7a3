//! Allocation bookkeeping records.

use crate::arena::header::{AllocHeader, HeaderConfig, HEADER_Z};

/// Bookkeeping information for one allocation.
///
/// Instances are 1:1 with completed `alloc` / `super_alloc` calls; the
/// sub-allocations of a compound allocation share the super header and
/// therefore one record.
///
/// Layout around an allocation:
///
/// ```text
///  ...prev alloc... [guard lo] [header] [payload (padded)] [guard hi] ...
///                   ^          ^         ^
///                   guard_lo   header    mem (returned to the caller)
/// ```
#[derive(Debug, Clone, Copy)]
pub struct AllocInfo<'a> {
    config: &'a HeaderConfig,
    guard_lo: *const u8,
    header: *const AllocHeader,
    guard_hi: *const u8,
}

impl<'a> AllocInfo<'a> {
    pub(crate) fn new(
        config: &'a HeaderConfig,
        guard_lo: *const u8,
        header: *const AllocHeader,
        guard_hi: *const u8,
    ) -> Self {
        Self { config, guard_lo, header, guard_hi }
    }

    /// Sentinel record returned on misuse (header feature disabled,
    /// foreign address, invalid cursor).
    pub(crate) fn invalid(config: &'a HeaderConfig) -> Self {
        Self {
            config,
            guard_lo: std::ptr::null(),
            header: std::ptr::null(),
            guard_hi: std::ptr::null(),
        }
    }

    /// True for non-sentinel records.
    pub fn is_valid(&self) -> bool {
        !self.header.is_null()
    }

    /// Raw header value. Zero for sentinel records.
    pub fn header(&self) -> AllocHeader {
        if self.header.is_null() {
            0
        } else {
            unsafe { *self.header }
        }
    }

    /// Address of the header word.
    pub fn header_ptr(&self) -> *const AllocHeader {
        self.header
    }

    /// Payload address: the memory available to the application.
    pub fn mem(&self) -> *mut u8 {
        if self.header.is_null() {
            std::ptr::null_mut()
        } else {
            unsafe { (self.header as *mut u8).add(HEADER_Z) }
        }
    }

    /// Type sequence number recorded for this allocation.
    pub fn tseq(&self) -> u32 {
        self.config.tseq(self.header())
    }

    /// Survived-collection count recorded for this allocation.
    pub fn age(&self) -> u32 {
        self.config.age(self.header())
    }

    /// Padded payload size in bytes (excluding header and guards).
    pub fn size(&self) -> usize {
        self.config.size(self.header())
    }

    /// True iff this allocation has been replaced by a forwarding pointer.
    pub fn is_forwarding(&self) -> bool {
        self.config.is_forwarding(self.header())
    }

    /// Guard bytes preceding the header.
    pub fn guard_lo(&self) -> &[u8] {
        if self.guard_lo.is_null() || self.config.guard_z == 0 {
            &[]
        } else {
            unsafe { std::slice::from_raw_parts(self.guard_lo, self.config.guard_z) }
        }
    }

    /// Guard bytes immediately following the payload.
    pub fn guard_hi(&self) -> &[u8] {
        if self.guard_hi.is_null() || self.config.guard_z == 0 {
            &[]
        } else {
            unsafe { std::slice::from_raw_parts(self.guard_hi, self.config.guard_z) }
        }
    }

    /// Number of guard bytes on each side of the allocation.
    pub fn guard_z(&self) -> usize {
        self.config.guard_z
    }

    /// Fixed test-pattern value of each guard byte.
    pub fn guard_byte(&self) -> u8 {
        self.config.guard_byte
    }

    /// True iff both guard regions still hold the configured pattern.
    pub fn guards_intact(&self) -> bool {
        let b = self.config.guard_byte;
        self.guard_lo().iter().all(|&x| x == b) && self.guard_hi().iter().all(|&x| x == b)
    }
}
