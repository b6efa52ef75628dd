//! WASM core adapter
//!
//! Wraps a wasmtime instance of the emulation core behind [`EmulationCore`].
//!
//! # Key Types
//!
//! - [`WasmEngine`] - Shared WASM engine
//! - [`WasmCore`] - Instantiated core with its typed exports resolved
//! - [`WasmCoreLoader`] - Reads the module from the configured path
//!
//! [`EmulationCore`]: crate::emulation::EmulationCore

mod engine;
mod host;
mod instance;
mod loader;

pub use engine::WasmEngine;
pub use instance::{FALLBACK_MEMORY_EXPORT, REQUIRED_EXPORTS, WasmCore};
pub use loader::WasmCoreLoader;
