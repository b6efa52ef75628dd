//! Throttling clock
//!
//! Maps elapsed wall-clock time onto a whole number of emulated cycles.
//!
//! The clock keeps a wall origin and the virtual time already emulated. Each
//! tick it targets `min(wall, virtual + catch-up cap)` and hands the owed
//! cycles to the core in sub-steps no larger than the per-step ceiling.
//! Virtual time only ever advances by whole cycles, so the sub-cycle
//! remainder carries into the next tick.

use std::time::{Duration, Instant};

use tracing::debug;

mod config;
mod time;


pub use config::{ClockConfig, M_CYCLE_NANOS, MAX_CATCHUP_NANOS, MAX_CYCLES_PER_STEP};
pub use time::{MonotonicTime, TimeSource};

/// Pacing mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacingMode {
    /// Cycles follow the wall clock
    Throttled,
    /// One frame per tick, as fast as ticks are scheduled
    Unthrottled,
}

impl PacingMode {
    pub fn from_throttle(enabled: bool) -> Self {
        if enabled {
            Self::Throttled
        } else {
            Self::Unthrottled
        }
    }
}

/// What one throttled advance did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClockAdvance {
    /// Cycles handed to the core
    pub cycles: u64,
    /// Number of core calls the cycles were split across
    pub substeps: u32,
    /// Frames the core reported completing
    pub frames: u32,
    /// Owed time dropped by the catch-up cap
    pub discarded_nanos: u64,
}

/// Wall-clock to virtual-cycle mapper
#[derive(Debug, Clone)]
pub struct EmulationClock {
    config: ClockConfig,
    origin: Instant,
    elapsed_virtual_nanos: u64,
}

impl EmulationClock {
    pub fn new(config: ClockConfig, now: Instant) -> Self {
        // Zero would divide by zero or never make progress
        let config = ClockConfig {
            m_cycle_nanos: config.m_cycle_nanos.max(1),
            max_cycles_per_step: config.max_cycles_per_step.max(1),
            ..config
        };
        Self {
            config,
            origin: now,
            elapsed_virtual_nanos: 0,
        }
    }

    pub fn config(&self) -> &ClockConfig {
        &self.config
    }

    /// Rebase the origin to `now` and forget all owed time
    pub fn reset(&mut self, now: Instant) {
        self.origin = now;
        self.elapsed_virtual_nanos = 0;
    }

    /// Virtual time emulated since the origin
    pub fn elapsed_virtual_nanos(&self) -> u64 {
        self.elapsed_virtual_nanos
    }

    /// Wall time since the origin
    pub fn wall_elapsed_nanos(&self, now: Instant) -> u64 {
        let elapsed = now.saturating_duration_since(self.origin).as_nanos();
        u64::try_from(elapsed).unwrap_or(u64::MAX)
    }

    /// Cycles owed at `now` under the catch-up cap, before sub-step splitting
    pub fn owed_cycles(&self, now: Instant) -> u64 {
        let target = self
            .wall_elapsed_nanos(now)
            .min(self.elapsed_virtual_nanos.saturating_add(self.config.max_catchup_nanos));
        target.saturating_sub(self.elapsed_virtual_nanos) / self.config.m_cycle_nanos
    }

    /// Run the owed cycles through `step`, which receives a cycle count and
    /// returns the frames completed.
    ///
    /// Lag beyond the catch-up cap is discarded by moving the origin forward,
    /// so a long stall never turns into a long burst. If `step` fails, virtual
    /// time reflects only the sub-steps that completed.
    pub fn advance<E, F>(&mut self, now: Instant, mut step: F) -> Result<ClockAdvance, E>
    where
        F: FnMut(u32) -> Result<u32, E>,
    {
        let mut report = ClockAdvance::default();
        let nanos_per_cycle = self.config.m_cycle_nanos;

        let mut wall = self.wall_elapsed_nanos(now);
        let lag = wall.saturating_sub(self.elapsed_virtual_nanos);
        let discarded = lag.saturating_sub(self.config.max_catchup_nanos);
        if discarded > 0 {
            self.origin += Duration::from_nanos(discarded);
            wall -= discarded;
            report.discarded_nanos = discarded;
            debug!(
                "Clock fell {:.1}ms behind, discarding {:.1}ms of owed emulation",
                lag as f64 / 1e6,
                discarded as f64 / 1e6
            );
        }
        let target = wall;

        while target > self.elapsed_virtual_nanos {
            let owed = (target - self.elapsed_virtual_nanos) / nanos_per_cycle;
            if owed == 0 {
                break;
            }
            let cycles = owed.min(u64::from(self.config.max_cycles_per_step)) as u32;

            report.frames += step(cycles)?;
            report.cycles += u64::from(cycles);
            report.substeps += 1;
            self.elapsed_virtual_nanos += u64::from(cycles) * nanos_per_cycle;
        }

        Ok(report)
    }
}
