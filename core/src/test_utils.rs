//! Shared test utilities for driver and session tests

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use crate::clock::TimeSource;
use crate::emulation::{CoreLoader, EmulationCore};
use crate::error::{CoreFault, InitializationError};
use crate::input::InputState;
use crate::layout::{AUDIO_BUFFER_OFFSET, WASM_PAGE_SIZE, pages_for};

/// Cycles per frame on the emulated hardware (154 lines * 114 M-cycles)
pub const CYCLES_PER_FRAME: u64 = 17_556;

// ============================================================================
// Test Core Implementation
// ============================================================================

/// Scripted in-memory core.
///
/// Completes one frame every [`CYCLES_PER_FRAME`] cycles, stamps the frame
/// count into the first framebuffer byte and emits `audio_per_pop` samples
/// of a constant value on every drain.
#[derive(Debug, Clone)]
pub struct FakeCore {
    memory: Vec<u8>,
    cycle_acc: u64,
    frames: u32,
    pub audio_per_pop: usize,
    pub audio_value: f32,
    /// Fault on the step call with this zero-based index
    pub fail_step_at: Option<usize>,
    pub fail_init: bool,
    pub step_calls: Vec<u32>,
    pub run_frame_calls: u32,
    pub init_calls: Vec<usize>,
    pub inputs: Vec<InputState>,
}

impl Default for FakeCore {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeCore {
    /// One page of memory, like a freshly instantiated module
    pub fn new() -> Self {
        Self {
            memory: vec![0; WASM_PAGE_SIZE],
            cycle_acc: 0,
            frames: 0,
            audio_per_pop: 0,
            audio_value: 0.25,
            fail_step_at: None,
            fail_init: false,
            step_calls: Vec::new(),
            run_frame_calls: 0,
            init_calls: Vec::new(),
            inputs: Vec::new(),
        }
    }

    pub fn with_audio(mut self, samples_per_pop: usize) -> Self {
        self.audio_per_pop = samples_per_pop;
        self
    }

    /// Fault on the step call with zero-based index `call`
    pub fn failing_step_at(mut self, call: usize) -> Self {
        self.fail_step_at = Some(call);
        self
    }

    pub fn failing_init(mut self) -> Self {
        self.fail_init = true;
        self
    }

    pub fn total_cycles(&self) -> u64 {
        self.step_calls.iter().map(|&c| u64::from(c)).sum()
    }

    fn complete_frame(&mut self) {
        self.frames += 1;
        self.memory[0] = self.frames as u8;
    }
}

impl EmulationCore for FakeCore {
    fn memory(&self) -> &[u8] {
        &self.memory
    }

    fn grow_memory(&mut self, additional: usize) -> Result<(), CoreFault> {
        let pages = pages_for(additional) as usize;
        self.memory.resize(self.memory.len() + pages * WASM_PAGE_SIZE, 0);
        Ok(())
    }

    fn write_memory(&mut self, offset: usize, bytes: &[u8]) -> Result<(), CoreFault> {
        let size = self.memory.len();
        let dest = offset
            .checked_add(bytes.len())
            .and_then(|end| self.memory.get_mut(offset..end))
            .ok_or(CoreFault::OutOfBounds {
                offset,
                len: bytes.len(),
                size,
            })?;
        dest.copy_from_slice(bytes);
        Ok(())
    }

    fn init(&mut self, rom_len: usize) -> Result<(), CoreFault> {
        self.init_calls.push(rom_len);
        if self.fail_init {
            return Err(CoreFault::Trap {
                export: "init_extern",
                message: "unreachable".into(),
            });
        }
        self.cycle_acc = 0;
        Ok(())
    }

    fn step(&mut self, cycles: u32) -> Result<u32, CoreFault> {
        if self.fail_step_at == Some(self.step_calls.len()) {
            return Err(CoreFault::Trap {
                export: "run_cycles_extern",
                message: "wasm trap: unreachable".into(),
            });
        }
        self.step_calls.push(cycles);
        self.cycle_acc += u64::from(cycles);
        let mut frames = 0;
        while self.cycle_acc >= CYCLES_PER_FRAME {
            self.cycle_acc -= CYCLES_PER_FRAME;
            self.complete_frame();
            frames += 1;
        }
        Ok(frames)
    }

    fn run_frame(&mut self) -> Result<(), CoreFault> {
        self.run_frame_calls += 1;
        self.complete_frame();
        Ok(())
    }

    fn set_input(&mut self, input: InputState) -> Result<(), CoreFault> {
        self.inputs.push(input);
        Ok(())
    }

    fn pop_audio(&mut self) -> Result<usize, CoreFault> {
        let samples: Vec<u8> = std::iter::repeat_n(self.audio_value, self.audio_per_pop)
            .flat_map(f32::to_le_bytes)
            .collect();
        self.write_memory(AUDIO_BUFFER_OFFSET, &samples)?;
        Ok(self.audio_per_pop)
    }
}

/// Loader handing out [`FakeCore`]s built from a template
#[derive(Debug, Clone, Default)]
pub struct FakeLoader {
    pub template: FakeCore,
    pub fail: bool,
    pub loads: usize,
}

impl FakeLoader {
    pub fn new(template: FakeCore) -> Self {
        Self {
            template,
            fail: false,
            loads: 0,
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }
}

impl CoreLoader for FakeLoader {
    type Core = FakeCore;

    fn load(&mut self) -> Result<FakeCore, InitializationError> {
        self.loads += 1;
        if self.fail {
            return Err(InitializationError::MissingExports(vec!["init_extern"]));
        }
        Ok(self.template.clone())
    }
}

// ============================================================================
// Test Time Source
// ============================================================================

/// Manually advanced clock; clones share the same instant
#[derive(Debug, Clone)]
pub struct ManualTime {
    now: Arc<Mutex<Instant>>,
}

impl Default for ManualTime {
    fn default() -> Self {
        Self::new()
    }
}

impl ManualTime {
    pub fn new() -> Self {
        Self {
            now: Arc::new(Mutex::new(Instant::now())),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap();
        *now += by;
    }
}

impl TimeSource for ManualTime {
    fn now(&self) -> Instant {
        *self.now.lock().unwrap()
    }
}
