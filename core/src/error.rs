//! Error taxonomy
//!
//! Three failure classes cross the command boundary:
//!
//! - [`InitializationError`] - the core could not be brought up at all
//! - [`RomLoadError`] - a single load attempt failed
//! - [`RuntimeFault`] - a scheduled tick faulted and the session stopped
//!
//! Underrun and overflow of the audio path are not errors.

use std::path::PathBuf;

use thiserror::Error;

/// Failure raised by the emulation core adapter while servicing a call.
#[derive(Debug, Error)]
pub enum CoreFault {
    /// The core trapped or the host call failed
    #[error("{export}() failed: {message}")]
    Trap {
        export: &'static str,
        message: String,
    },

    /// A read or write fell outside the core's memory region
    #[error("memory access out of bounds: offset {offset} + {len} exceeds {size} bytes")]
    OutOfBounds {
        offset: usize,
        len: usize,
        size: usize,
    },

    /// The memory region could not be grown
    #[error("failed to grow core memory by {pages} pages: {message}")]
    Grow { pages: u64, message: String },
}

/// The core is unusable: nothing was loaded, nothing can run.
#[derive(Debug, Error)]
pub enum InitializationError {
    #[error("Failed to fetch core module {}: {source}", path.display())]
    AssetFetch {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to create WASM engine: {0}")]
    Engine(String),

    #[error("Failed to compile core module: {0}")]
    Compile(String),

    #[error("Failed to instantiate core module: {0}")]
    Instantiate(String),

    #[error("Missing required exports: {}", .0.join(", "))]
    MissingExports(Vec<&'static str>),

    #[error("Export {export} has the wrong signature: {message}")]
    Signature {
        export: &'static str,
        message: String,
    },

    #[error("Missing export memory: {0}")]
    MissingMemory(String),
}

/// A ROM load attempt failed. The driver is left stopped and unloaded.
#[derive(Debug, Error)]
pub enum RomLoadError {
    /// The core has not been initialized, so there is nothing to boot into
    #[error("Core is not initialized (send initCore before loading a ROM)")]
    CoreNotInitialized,

    #[error("ROM is empty")]
    Empty,

    #[error("ROM is {len} bytes, exceeding the {max} byte limit")]
    Oversized { len: usize, max: usize },

    #[error("Invalid preinstalled ROM name: {0:?}")]
    InvalidName(String),

    #[error("Failed to fetch rom: {}", path.display())]
    Fetch {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Core rejected ROM: {0}")]
    Core(#[from] CoreFault),
}

/// A scheduled tick faulted. The session is stopped and is not retried.
#[derive(Debug, Error)]
#[error("Emulation stopped at tick {tick}: {fault}")]
pub struct RuntimeFault {
    /// Number of ticks completed before the fault
    pub tick: u64,
    pub fault: CoreFault,
}

/// Any failure a command handler can report upstream.
#[derive(Debug, Error)]
pub enum HostError {
    #[error(transparent)]
    Initialization(#[from] InitializationError),

    #[error(transparent)]
    RomLoad(#[from] RomLoadError),

    #[error(transparent)]
    Runtime(#[from] RuntimeFault),
}
