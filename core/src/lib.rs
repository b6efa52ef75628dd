//! Lunaboy Core - real-time pacing and streaming layer
//!
//! This crate sits between a cycle-stepped emulation core and its two
//! real-time consumers: a pixel renderer and a continuous audio device.
//!
//! # Architecture
//!
//! - [`EmulationClock`] - Maps wall-clock time onto bounded emulated cycles
//! - [`Driver`] - Owns the core; per tick runs clock → step → audio drain → frame publish
//! - [`AudioRingBuffer`] - Overwrite-oldest stereo ring decoupling producer and callback
//! - [`RealtimeAudioSink`] - Fixed-rate callback consumer, silence on underrun
//! - [`Command`] / [`Event`] - Closed message protocol between the contexts
//! - [`SessionThread`] - Driver thread handling commands between ticks
//! - [`WasmCore`] - wasmtime adapter implementing [`EmulationCore`]

pub mod audio;
pub mod clock;
pub mod config;
pub mod driver;
pub mod emulation;
pub mod error;
pub mod input;
pub mod layout;
pub mod rom;
pub mod session;
#[cfg(test)]
pub mod test_utils;
pub mod transport;
pub mod wasm;

pub use audio::{AudioFeed, AudioRingBuffer, RealtimeAudioSink, StereoFrame, audio_channel};
pub use clock::{ClockAdvance, EmulationClock, MonotonicTime, PacingMode, TimeSource};
pub use config::{AudioConfig, ClockConfig, Config, ConfigError, CoreConfig, DriverConfig};
pub use driver::{Driver, TickOutcome, TickReport, TickScheduler, TickTicket};
pub use emulation::{AudioView, CoreLoader, EmulationCore};
pub use error::{CoreFault, HostError, InitializationError, RomLoadError, RuntimeFault};
pub use input::{Action, Button, Direction, InputLatch, InputState};
pub use rom::RomLibrary;
pub use session::{SessionHandle, SessionThread};
pub use transport::{AudioBatch, Command, Event, EventSink, FrameSnapshot};
pub use wasm::{WasmCore, WasmCoreLoader, WasmEngine};
