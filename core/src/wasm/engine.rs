//! WASM engine wrapper for loading and compiling modules

use wasmtime::{Engine, Module};

use crate::error::InitializationError;

/// Shared WASM engine (one per session)
pub struct WasmEngine {
    engine: Engine,
}

impl WasmEngine {
    /// Create a new WASM engine with default configuration
    pub fn new() -> Result<Self, InitializationError> {
        let engine = Engine::new(&wasmtime::Config::default())
            .map_err(|e| InitializationError::Engine(format!("{e:#}")))?;
        Ok(Self { engine })
    }

    /// Get a reference to the underlying wasmtime engine
    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    /// Compile a core module from bytes
    pub fn load_module(&self, bytes: &[u8]) -> Result<Module, InitializationError> {
        Module::new(&self.engine, bytes).map_err(|e| InitializationError::Compile(format!("{e:#}")))
    }
}

// NOTE: WasmEngine does not implement Default because engine creation is
// fallible. Use WasmEngine::new().
