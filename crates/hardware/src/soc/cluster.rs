//! CPU clusters.
//!
//! A cluster is a group of identical cores sharing a clock/voltage domain and, in timing
//! mode, an L2 cache. It provides:
//! 1. **Core numbering:** Core IDs continue system-wide from the previous cluster.
//! 2. **PMUs:** One performance monitoring unit per core, wired to a private peripheral
//!    interrupt.
//! 3. **Caches:** Per-core L1I/L1D and a shared L2, attached only for timing models.
//! 4. **Tracing:** Optional per-core tarmac tracers.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::common::constants::{MAX_CORES, PPI_MAX, PPI_MIN};
use crate::common::error::ConfigError;
use crate::common::units::{parse_frequency, parse_voltage, period_ticks};
use crate::soc::cpu::{CacheSpec, CpuModel};

/// Checks that `ppi` is a private peripheral interrupt number.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidPpi`] outside `16..=31`.
pub fn validate_ppi(ppi: u32) -> Result<u32, ConfigError> {
    if (PPI_MIN..=PPI_MAX).contains(&ppi) {
        Ok(ppi)
    } else {
        Err(ConfigError::InvalidPpi(ppi))
    }
}

/// Where tarmac trace output is written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TarmacDest {
    /// Simulator standard output.
    #[default]
    Stdoutput,
    /// Simulator standard error.
    Stderror,
    /// A file in the output directory.
    File,
}

impl TarmacDest {
    /// All destinations, in command-line order.
    pub const ALL: [Self; 3] = [Self::Stdoutput, Self::Stderror, Self::File];

    /// Returns the command-line spelling of this destination.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Stdoutput => "stdoutput",
            Self::Stderror => "stderror",
            Self::File => "file",
        }
    }
}

impl fmt::Display for TarmacDest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TarmacDest {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|d| d.as_str() == s)
            .ok_or_else(|| ConfigError::InvalidChoice {
                what: "tarmac-dest",
                value: s.to_string(),
                expected: Self::ALL.map(Self::as_str).join(", "),
            })
    }
}

/// Per-core instruction trace in tarmac format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TarmacTracer {
    /// Output destination.
    pub dest: TarmacDest,
}

/// Performance monitoring unit of one core.
///
/// Always wired to a valid private peripheral interrupt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Pmu {
    ppi: u32,
}

impl Pmu {
    /// Creates a PMU raising `ppi` on counter overflow.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidPpi`] outside `16..=31`.
    pub fn new(ppi: u32) -> Result<Self, ConfigError> {
        Ok(Self {
            ppi: validate_ppi(ppi)?,
        })
    }

    /// Private peripheral interrupt raised on counter overflow.
    pub const fn ppi(self) -> u32 {
        self.ppi
    }

    /// The interrupt as a GIC PPI cell, numbered from the first PPI.
    pub const fn gic_ppi_index(self) -> u32 {
        self.ppi - PPI_MIN
    }
}

/// Clock and voltage shared by a cluster.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ClockDomain {
    /// Core clock in hertz.
    pub frequency_hz: u64,
    /// Clock period in ticks.
    pub period_ticks: u64,
    /// Supply voltage in volts.
    pub voltage: f64,
}

impl ClockDomain {
    /// Parses frequency and voltage strings such as `"4GHz"` and `"1.0V"`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidFrequency`] or [`ConfigError::InvalidVoltage`].
    pub fn parse(frequency: &str, voltage: &str) -> Result<Self, ConfigError> {
        let frequency_hz = parse_frequency(frequency)?;
        Ok(Self {
            frequency_hz,
            period_ticks: period_ticks(frequency_hz),
            voltage: parse_voltage(voltage)?,
        })
    }
}

/// One core of a cluster.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Core {
    /// System-wide core ID.
    pub id: u32,
    /// PMU, when requested.
    pub pmu: Option<Pmu>,
    /// Tarmac tracer, when requested.
    pub tracer: Option<TarmacTracer>,
    /// Private instruction cache.
    pub icache: Option<CacheSpec>,
    /// Private data cache.
    pub dcache: Option<CacheSpec>,
}

/// What the cluster's memory-side port connects to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MemSide {
    /// Cores talk to the memory bus directly.
    MemBus,
    /// Cores go through private L1s and the cluster's L2.
    L2,
}

/// A group of identical cores.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CpuCluster {
    /// Core model.
    pub model: CpuModel,
    /// Clock/voltage domain.
    pub clock: ClockDomain,
    /// Cores, ordered by ID.
    pub cores: Vec<Core>,
    /// Shared second-level cache.
    pub l2: Option<CacheSpec>,
    /// Memory-side connection.
    pub mem_side: MemSide,
}

impl CpuCluster {
    /// Creates `num_cores` cores numbered from `first_core_id`.
    ///
    /// # Arguments
    ///
    /// * `model` - Core model from the registry.
    /// * `num_cores` - Cores in the cluster; at least one.
    /// * `first_core_id` - ID of the first core (number of cores in earlier clusters).
    /// * `clock` - Clock/voltage domain.
    /// * `tracer` - Tarmac tracer copied onto every core, if any.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::NoCores`] when `num_cores` is zero and
    /// [`ConfigError::TooManyCores`] when the cluster would end past [`MAX_CORES`].
    pub fn new(
        model: CpuModel,
        num_cores: u32,
        first_core_id: u32,
        clock: ClockDomain,
        tracer: Option<TarmacTracer>,
    ) -> Result<Self, ConfigError> {
        if num_cores == 0 {
            return Err(ConfigError::NoCores);
        }
        let end = first_core_id
            .checked_add(num_cores)
            .filter(|&end| end <= MAX_CORES)
            .ok_or_else(|| ConfigError::TooManyCores {
                requested: num_cores,
                limit: MAX_CORES.saturating_sub(first_core_id),
            })?;
        let cores = (first_core_id..end)
            .map(|id| Core {
                id,
                pmu: None,
                tracer,
                icache: None,
                dcache: None,
            })
            .collect();
        Ok(Self {
            model,
            clock,
            cores,
            l2: None,
            mem_side: MemSide::MemBus,
        })
    }

    /// Number of cores.
    pub fn len(&self) -> usize {
        self.cores.len()
    }

    /// Whether the cluster has no cores (never true for a constructed cluster).
    pub fn is_empty(&self) -> bool {
        self.cores.is_empty()
    }

    /// Wires one PMU per core to `ppi`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidPpi`] outside `16..=31`.
    pub fn add_pmus(&mut self, ppi: u32) -> Result<(), ConfigError> {
        let pmu = Pmu::new(ppi)?;
        for core in &mut self.cores {
            core.pmu = Some(pmu);
        }
        Ok(())
    }

    /// Attaches the model's L1s to every core and its L2 to the cluster.
    pub fn add_caches(&mut self) {
        for core in &mut self.cores {
            core.icache = self.model.l1i;
            core.dcache = self.model.l1d;
        }
        self.l2 = self.model.l2;
        if self.l2.is_some() {
            self.mem_side = MemSide::L2;
        }
    }

    /// Whether any cache is attached.
    pub fn has_caches(&self) -> bool {
        self.l2.is_some()
            || self
                .cores
                .iter()
                .any(|c| c.icache.is_some() || c.dcache.is_some())
    }
}
