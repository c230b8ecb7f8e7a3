//! Collector configuration.

use crate::arena::ArenaConfig;
use crate::error::GcError;
use crate::gc::cohort::{Generation, ObjectAge, MAX_GENERATION};

/// Configuration for a [`Collector`](crate::gc::Collector).
#[derive(Debug, Clone)]
pub struct CollectorConfig {
    /// Optional name, for diagnostics.
    pub name: String,

    /// Configuration template for the collector's spaces: two arenas
    /// per generation. `store_header` must be true; the header split
    /// must accommodate `tseq`, `age` and `size`.
    pub arena: ArenaConfig,

    /// Reservation for the type-metadata table. Storage for N object
    /// types needs `N * size_of::<Vtable>()` bytes.
    pub object_types_z: usize,

    /// Reservation for the root table. Storage for N roots needs
    /// `8 * N` bytes.
    pub object_roots_z: usize,

    /// Number of generations; at least 2, at most
    /// [`MAX_GENERATION`].
    pub n_generation: u32,

    /// Number of survived collections after which an object advances to
    /// the next generation.
    pub survive_threshold: u32,

    /// Trigger collection of generations `[0, g]` when generation `g`'s
    /// to-space allocation reaches this many bytes. Zero disables the
    /// trigger for that generation. Consulted by
    /// [`Collector::maybe_collect`](crate::gc::Collector::maybe_collect),
    /// never from the allocation path itself.
    pub gc_trigger: [usize; MAX_GENERATION],

    /// Allow collections that cover only the younger generations.
    ///
    /// Without a mutation log a partial collection cannot see pointers
    /// from uncollected tenured objects into the collected range, so
    /// requests are escalated to full collections while this is false.
    pub allow_incremental_gc: bool,

    /// Remember statistics for this many recent collections; zero
    /// disables the history.
    pub stats_history: u32,

    /// True to enable debug logging.
    pub debug: bool,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            arena: ArenaConfig { store_header: true, ..ArenaConfig::default() },
            object_types_z: 2 * 1024 * 1024,
            object_roots_z: 16 * 1024,
            n_generation: 2,
            survive_threshold: 2,
            gc_trigger: [0; MAX_GENERATION],
            allow_incremental_gc: false,
            stats_history: 0,
            debug: false,
        }
    }
}

impl CollectorConfig {
    /// Configuration with per-generation spaces of `gen_z` bytes each.
    pub fn with_size(mut self, gen_z: usize) -> Self {
        self.arena = self.arena.with_size(gen_z);
        self
    }

    /// Copy of this config with a different name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Generation an object of the given age lives in.
    pub fn age2gen(&self, age: ObjectAge) -> Generation {
        let g = age.value() / self.survive_threshold;
        Generation(g.min(self.n_generation - 1))
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), GcError> {
        let h = &self.arena.header;

        if !self.arena.store_header {
            return Err(GcError::Configuration(
                "collector spaces require allocation headers".into(),
            ));
        }

        if h.tseq_bits as u32 + h.age_bits as u32 + h.size_bits as u32 > 64 {
            return Err(GcError::Configuration(format!(
                "header bit fields exceed 64 bits: tseq {} + age {} + size {}",
                h.tseq_bits, h.age_bits, h.size_bits
            )));
        }

        if h.size_bits == 0 {
            return Err(GcError::Configuration("header size field is empty".into()));
        }

        if self.n_generation < 2 || self.n_generation as usize > MAX_GENERATION {
            return Err(GcError::Configuration(format!(
                "n_generation {} outside [2, {}]",
                self.n_generation, MAX_GENERATION
            )));
        }

        if self.survive_threshold == 0 {
            return Err(GcError::Configuration("survive_threshold must be positive".into()));
        }

        if self.arena.size == 0 {
            return Err(GcError::Configuration("collector spaces have zero size".into()));
        }

        Ok(())
    }
}
