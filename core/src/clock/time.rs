//! Wall-clock source

use std::time::Instant;

/// Source of monotonic wall-clock instants
pub trait TimeSource {
    fn now(&self) -> Instant;
}

/// The process monotonic clock
#[derive(Debug, Clone, Copy, Default)]
pub struct MonotonicTime;

impl TimeSource for MonotonicTime {
    fn now(&self) -> Instant {
        Instant::now()
    }
}
