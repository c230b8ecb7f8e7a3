//! Arena configuration.

use crate::arena::header::HeaderConfig;

/// Default huge-page unit: 2 MiB.
pub const DEFAULT_HUGEPAGE_Z: usize = 2 * 1024 * 1024;

/// Configuration for an [`Arena`](crate::arena::Arena) instance.
#[derive(Debug, Clone)]
pub struct ArenaConfig {
    /// Optional name, for diagnostics.
    pub name: String,
    /// Desired arena size; hard max = reserved virtual memory.
    pub size: usize,
    /// Huge-page unit. Arenas at least this large are aligned to it and
    /// advised to use transparent huge pages, relieving TLB pressure at
    /// the cost of committing physical memory in units of this size.
    pub hugepage_z: usize,
    /// True to store an 8-byte header before each allocation. Necessary
    /// and sufficient to iterate the allocations present in an arena.
    pub store_header: bool,
    /// Header bit-field split and guard-byte settings.
    pub header: HeaderConfig,
    /// True to enable debug logging.
    pub debug: bool,
}

impl Default for ArenaConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            size: 0,
            hugepage_z: DEFAULT_HUGEPAGE_Z,
            store_header: false,
            header: HeaderConfig::default(),
            debug: false,
        }
    }
}

impl ArenaConfig {
    /// Minimal configuration reserving `size` bytes.
    pub fn simple(size: usize) -> Self {
        Self { size, ..Default::default() }
    }

    /// Copy of this config with a different name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Copy of this config with a different size.
    pub fn with_size(mut self, size: usize) -> Self {
        self.size = size;
        self
    }

    /// Copy of this config with headers enabled.
    pub fn with_headers(mut self) -> Self {
        self.store_header = true;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = ArenaConfig::default();
        assert_eq!(cfg.hugepage_z, 2 * 1024 * 1024);
        assert!(!cfg.store_header);
        assert_eq!(cfg.header.guard_byte, 0xfd);
    }

    #[test]
    fn test_builders() {
        let cfg = ArenaConfig::simple(4096).with_name("scratch").with_headers();
        assert_eq!(cfg.size, 4096);
        assert_eq!(cfg.name, "scratch");
        assert!(cfg.store_header);
    }
}
