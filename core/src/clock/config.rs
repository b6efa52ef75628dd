//! Clock configuration

use serde::{Deserialize, Serialize};

/// Duration of one emulated M-cycle in nanoseconds (~1.048576 MHz)
pub const M_CYCLE_NANOS: u64 = 953;
/// Maximum wall-clock lag tolerated before the deficit is discarded
pub const MAX_CATCHUP_NANOS: u64 = 250_000_000;
/// Maximum cycles handed to the core in one sub-step
pub const MAX_CYCLES_PER_STEP: u32 = 8_192;

/// Throttling clock configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClockConfig {
    /// Nanoseconds per emulated cycle
    #[serde(default = "default_m_cycle_nanos")]
    pub m_cycle_nanos: u64,
    /// Catch-up cap (prevents replaying a long stall in one burst)
    #[serde(default = "default_max_catchup_nanos")]
    pub max_catchup_nanos: u64,
    /// Per-substep cycle ceiling (bounds single-step latency and audio burst size)
    #[serde(default = "default_max_cycles_per_step")]
    pub max_cycles_per_step: u32,
}

impl Default for ClockConfig {
    fn default() -> Self {
        Self {
            m_cycle_nanos: M_CYCLE_NANOS,
            max_catchup_nanos: MAX_CATCHUP_NANOS,
            max_cycles_per_step: MAX_CYCLES_PER_STEP,
        }
    }
}

fn default_m_cycle_nanos() -> u64 {
    M_CYCLE_NANOS
}
fn default_max_catchup_nanos() -> u64 {
    MAX_CATCHUP_NANOS
}
fn default_max_cycles_per_step() -> u32 {
    MAX_CYCLES_PER_STEP
}
