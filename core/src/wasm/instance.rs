//! Instantiated core module

use tracing::debug;
use wasmtime::{Instance, Linker, Memory, Module, Store, TypedFunc, WasmParams, WasmResults};

use super::engine::WasmEngine;
use super::host::register_host_imports;
use crate::emulation::EmulationCore;
use crate::error::{CoreFault, InitializationError};
use crate::input::InputState;
use crate::layout::pages_for;

/// Memory export probed when the configured name is absent
pub const FALLBACK_MEMORY_EXPORT: &str = "memory";

/// Function exports every core module must provide
pub const REQUIRED_EXPORTS: [&str; 5] = [
    "init_extern",
    "run_frame_extern",
    "run_cycles_extern",
    "set_input_extern",
    "pop_audio_extern",
];

/// A loaded and instantiated core
pub struct WasmCore {
    store: Store<()>,
    memory: Memory,
    init_fn: TypedFunc<i32, ()>,
    run_frame_fn: TypedFunc<(), ()>,
    run_cycles_fn: TypedFunc<i32, i32>,
    set_input_fn: TypedFunc<(i32, i32), ()>,
    pop_audio_fn: TypedFunc<(), i32>,
}

impl WasmCore {
    /// Instantiate `module`, resolving `memory_export` (or `memory`) and every
    /// required function export.
    pub fn new(
        engine: &WasmEngine,
        module: &Module,
        memory_export: &str,
    ) -> Result<Self, InitializationError> {
        let mut linker = Linker::new(engine.engine());
        register_host_imports(&mut linker)
            .map_err(|e| InitializationError::Instantiate(format!("{e:#}")))?;

        let mut store = Store::new(engine.engine(), ());
        let instance = linker
            .instantiate(&mut store, module)
            .map_err(|e| InitializationError::Instantiate(format!("{e:#}")))?;

        let missing: Vec<&'static str> = REQUIRED_EXPORTS
            .into_iter()
            .filter(|name| instance.get_func(&mut store, name).is_none())
            .collect();
        if !missing.is_empty() {
            return Err(InitializationError::MissingExports(missing));
        }

        let memory = match instance.get_memory(&mut store, memory_export) {
            Some(memory) => memory,
            None => {
                let memory = instance
                    .get_memory(&mut store, FALLBACK_MEMORY_EXPORT)
                    .ok_or_else(|| InitializationError::MissingMemory(memory_export.to_string()))?;
                debug!(
                    "Memory export '{}' not found, using '{}'",
                    memory_export, FALLBACK_MEMORY_EXPORT
                );
                memory
            }
        };

        let init_fn = typed_export(&instance, &mut store, "init_extern")?;
        let run_frame_fn = typed_export(&instance, &mut store, "run_frame_extern")?;
        let run_cycles_fn = typed_export(&instance, &mut store, "run_cycles_extern")?;
        let set_input_fn = typed_export(&instance, &mut store, "set_input_extern")?;
        let pop_audio_fn = typed_export(&instance, &mut store, "pop_audio_extern")?;

        debug!(
            "Core instantiated with {} bytes of memory",
            memory.data_size(&store)
        );

        Ok(Self {
            store,
            memory,
            init_fn,
            run_frame_fn,
            run_cycles_fn,
            set_input_fn,
            pop_audio_fn,
        })
    }
}

fn typed_export<P, R>(
    instance: &Instance,
    store: &mut Store<()>,
    export: &'static str,
) -> Result<TypedFunc<P, R>, InitializationError>
where
    P: WasmParams,
    R: WasmResults,
{
    instance
        .get_typed_func::<P, R>(store, export)
        .map_err(|e| InitializationError::Signature {
            export,
            message: format!("{e:#}"),
        })
}

fn trap(export: &'static str) -> impl FnOnce(wasmtime::Error) -> CoreFault {
    move |e| CoreFault::Trap {
        export,
        message: format!("{e:#}"),
    }
}

impl EmulationCore for WasmCore {
    fn memory(&self) -> &[u8] {
        self.memory.data(&self.store)
    }

    fn grow_memory(&mut self, additional: usize) -> Result<(), CoreFault> {
        let pages = pages_for(additional);
        if pages == 0 {
            return Ok(());
        }
        let previous = self
            .memory
            .grow(&mut self.store, pages)
            .map_err(|e| CoreFault::Grow {
                pages,
                message: format!("{e:#}"),
            })?;
        debug!("Grew core memory from {} by {} pages", previous, pages);
        Ok(())
    }

    fn write_memory(&mut self, offset: usize, bytes: &[u8]) -> Result<(), CoreFault> {
        self.memory
            .write(&mut self.store, offset, bytes)
            .map_err(|_| CoreFault::OutOfBounds {
                offset,
                len: bytes.len(),
                size: self.memory.data_size(&self.store),
            })
    }

    fn init(&mut self, rom_len: usize) -> Result<(), CoreFault> {
        let rom_len = i32::try_from(rom_len).map_err(|_| CoreFault::Trap {
            export: "init_extern",
            message: format!("ROM length {rom_len} does not fit in i32"),
        })?;
        self.init_fn
            .call(&mut self.store, rom_len)
            .map_err(trap("init_extern"))
    }

    fn step(&mut self, cycles: u32) -> Result<u32, CoreFault> {
        let cycles = i32::try_from(cycles).unwrap_or(i32::MAX);
        let frames = self
            .run_cycles_fn
            .call(&mut self.store, cycles)
            .map_err(trap("run_cycles_extern"))?;
        Ok(frames.max(0) as u32)
    }

    fn run_frame(&mut self) -> Result<(), CoreFault> {
        self.run_frame_fn
            .call(&mut self.store, ())
            .map_err(trap("run_frame_extern"))
    }

    fn set_input(&mut self, input: InputState) -> Result<(), CoreFault> {
        let direction = i32::from(input.direction.bits());
        let action = i32::from(input.action.bits());
        self.set_input_fn
            .call(&mut self.store, (direction, action))
            .map_err(trap("set_input_extern"))
    }

    fn pop_audio(&mut self) -> Result<usize, CoreFault> {
        let samples = self
            .pop_audio_fn
            .call(&mut self.store, ())
            .map_err(trap("pop_audio_extern"))?;
        Ok(samples.max(0) as usize)
    }
}
