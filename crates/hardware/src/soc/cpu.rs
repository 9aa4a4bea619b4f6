//! CPU variants, their memory modes and cache geometry.
//!
//! This module replaces an implicit global catalogue of constructible CPU types with an
//! explicit [`CpuRegistry`] that the topology builder receives by reference. It provides:
//! 1. **Variants:** The enumerated `--cpu` choices.
//! 2. **Models:** Per-variant core model name, memory mode and optional L1I/L1D/L2 geometry.
//! 3. **Registry:** Validated variant → model mapping; a model may only declare caches
//!    when it runs in timing memory mode.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::common::error::ConfigError;

/// CPU model selected on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CpuVariant {
    /// Functional, single-cycle memory accesses.
    #[default]
    Atomic,
    /// In-order four-stage pipeline.
    Minor,
    /// High-performance in-order model tuned after a Cortex-A class core.
    Hpi,
    /// Out-of-order model tuned after a Cortex-A15 class core.
    O3,
}

impl CpuVariant {
    /// All variants, in command-line order.
    pub const ALL: [Self; 4] = [Self::Atomic, Self::Minor, Self::Hpi, Self::O3];

    /// Returns the command-line spelling of this variant.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Atomic => "atomic",
            Self::Minor => "minor",
            Self::Hpi => "hpi",
            Self::O3 => "o3",
        }
    }
}

impl fmt::Display for CpuVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CpuVariant {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|v| v.as_str() == s)
            .ok_or_else(|| ConfigError::InvalidChoice {
                what: "cpu",
                value: s.to_string(),
                expected: Self::ALL.map(Self::as_str).join(", "),
            })
    }
}

/// How the memory system services CPU requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemoryMode {
    /// Requests complete immediately; no cache timing is modelled.
    Atomic,
    /// Requests travel through timed ports; caches are simulated.
    Timing,
}

impl MemoryMode {
    /// Whether a cache hierarchy is built for this mode.
    pub const fn wants_caches(self) -> bool {
        matches!(self, Self::Timing)
    }
}

impl fmt::Display for MemoryMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Atomic => "atomic",
            Self::Timing => "timing",
        })
    }
}

/// Geometry and timing of one cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheSpec {
    /// Capacity in bytes.
    pub size_bytes: u64,
    /// Ways per set.
    pub assoc: u32,
    /// Tag lookup latency in cycles.
    pub tag_latency: u32,
    /// Data array latency in cycles.
    pub data_latency: u32,
    /// Response latency in cycles.
    pub response_latency: u32,
    /// Miss status holding registers.
    pub mshrs: u32,
    /// Targets per MSHR.
    pub tgts_per_mshr: u32,
    /// Write buffer entries (0 when the cache never writes back).
    pub write_buffers: u32,
}

impl CacheSpec {
    const fn new(
        size_kib: u64,
        assoc: u32,
        latency: (u32, u32, u32),
        mshrs: (u32, u32),
        write_buffers: u32,
    ) -> Self {
        Self {
            size_bytes: size_kib * 1024,
            assoc,
            tag_latency: latency.0,
            data_latency: latency.1,
            response_latency: latency.2,
            mshrs: mshrs.0,
            tgts_per_mshr: mshrs.1,
            write_buffers,
        }
    }
}

/// A constructible CPU model: core type plus the caches it is paired with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CpuModel {
    /// Core model name handed to the simulation kernel.
    pub name: &'static str,
    /// Memory mode the core requires.
    pub memory_mode: MemoryMode,
    /// Per-core instruction cache.
    pub l1i: Option<CacheSpec>,
    /// Per-core data cache.
    pub l1d: Option<CacheSpec>,
    /// Cluster-shared second-level cache.
    pub l2: Option<CacheSpec>,
}

impl CpuModel {
    /// A model with no caches.
    pub const fn uncached(name: &'static str, memory_mode: MemoryMode) -> Self {
        Self {
            name,
            memory_mode,
            l1i: None,
            l1d: None,
            l2: None,
        }
    }

    /// A timing model with its full cache set.
    pub const fn timing(name: &'static str, l1i: CacheSpec, l1d: CacheSpec, l2: CacheSpec) -> Self {
        Self {
            name,
            memory_mode: MemoryMode::Timing,
            l1i: Some(l1i),
            l1d: Some(l1d),
            l2: Some(l2),
        }
    }

    fn has_caches(&self) -> bool {
        self.l1i.is_some() || self.l1d.is_some() || self.l2.is_some()
    }
}

/// Explicit mapping from CPU variant to model.
#[derive(Debug, Clone, Default)]
pub struct CpuRegistry {
    models: BTreeMap<CpuVariant, CpuModel>,
}

impl CpuRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the four stock Arm models.
    pub fn arm() -> Self {
        let mut registry = Self::new();
        let stock = [
            (
                CpuVariant::Atomic,
                CpuModel::uncached("AtomicSimpleCPU", MemoryMode::Atomic),
            ),
            (
                CpuVariant::Minor,
                CpuModel::timing(
                    "MinorCPU",
                    CacheSpec::new(48, 3, (1, 1, 1), (4, 8), 0),
                    CacheSpec::new(32, 2, (2, 2, 1), (16, 16), 16),
                    CacheSpec::new(1024, 16, (12, 12, 5), (32, 8), 8),
                ),
            ),
            (
                CpuVariant::Hpi,
                CpuModel::timing(
                    "HPI",
                    CacheSpec::new(32, 2, (1, 1, 1), (2, 8), 0),
                    CacheSpec::new(32, 4, (1, 1, 1), (4, 8), 4),
                    CacheSpec::new(1024, 16, (13, 13, 5), (4, 8), 16),
                ),
            ),
            (
                CpuVariant::O3,
                CpuModel::timing(
                    "O3_ARM_v7a_3",
                    CacheSpec::new(32, 2, (1, 1, 1), (2, 8), 0),
                    CacheSpec::new(32, 2, (2, 2, 2), (6, 8), 16),
                    CacheSpec::new(1024, 16, (12, 12, 12), (16, 8), 8),
                ),
            ),
        ];
        for (variant, model) in stock {
            let _ = registry.models.insert(variant, model);
        }
        registry
    }

    /// Adds or replaces the model for `variant`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::CachesWithoutTiming`] if the model declares caches while
    /// running in atomic memory mode.
    pub fn register(&mut self, variant: CpuVariant, model: CpuModel) -> Result<(), ConfigError> {
        if model.has_caches() && !model.memory_mode.wants_caches() {
            return Err(ConfigError::CachesWithoutTiming { model: model.name });
        }
        let _ = self.models.insert(variant, model);
        Ok(())
    }

    /// Looks up the model for `variant`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnregisteredCpu`] when the variant has no model.
    pub fn lookup(&self, variant: CpuVariant) -> Result<&CpuModel, ConfigError> {
        self.models
            .get(&variant)
            .ok_or(ConfigError::UnregisteredCpu(variant))
    }

    /// Memory mode of `variant`; a pure function of the registered model.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnregisteredCpu`] when the variant has no model.
    pub fn memory_mode(&self, variant: CpuVariant) -> Result<MemoryMode, ConfigError> {
        self.lookup(variant).map(|m| m.memory_mode)
    }
}
