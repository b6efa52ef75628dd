//! Fetches, compiles and instantiates the core module from disk

use tracing::info;

use super::engine::WasmEngine;
use super::instance::WasmCore;
use crate::config::CoreConfig;
use crate::emulation::CoreLoader;
use crate::error::InitializationError;

/// Loads [`WasmCore`]s from the configured module path
pub struct WasmCoreLoader {
    config: CoreConfig,
}

impl WasmCoreLoader {
    pub fn new(config: CoreConfig) -> Self {
        Self { config }
    }

    /// Instantiate a core from module bytes already in memory
    pub fn from_bytes(&self, bytes: &[u8]) -> Result<WasmCore, InitializationError> {
        let engine = WasmEngine::new()?;
        let module = engine.load_module(bytes)?;
        WasmCore::new(&engine, &module, &self.config.memory_export)
    }
}

impl CoreLoader for WasmCoreLoader {
    type Core = WasmCore;

    fn load(&mut self) -> Result<WasmCore, InitializationError> {
        let path = &self.config.wasm_path;
        let bytes = std::fs::read(path).map_err(|source| InitializationError::AssetFetch {
            path: path.clone(),
            source,
        })?;
        info!("Loading core module {} ({} bytes)", path.display(), bytes.len());
        self.from_bytes(&bytes)
    }
}
