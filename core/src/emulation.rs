//! Emulation core capability
//!
//! The core is an opaque collaborator. The driver only ever reaches it through
//! [`EmulationCore`], which the WASM adapter ([`crate::wasm::WasmCore`])
//! implements and tests replace with an in-memory fake.

use crate::error::{CoreFault, InitializationError};
use crate::input::InputState;
use crate::layout::{AUDIO_BUFFER_OFFSET, AUDIO_BUFFER_SAMPLES, FRAMEBUFFER_SIZE};

/// Capability surface of a cycle-stepped emulation core
pub trait EmulationCore {
    /// Entire memory region, borrowed
    fn memory(&self) -> &[u8];

    /// Grow the memory region by at least `additional` bytes. Never shrinks.
    fn grow_memory(&mut self, additional: usize) -> Result<(), CoreFault>;

    /// Copy `bytes` into the memory region at `offset`
    fn write_memory(&mut self, offset: usize, bytes: &[u8]) -> Result<(), CoreFault>;

    /// Boot the ROM previously staged at offset 0
    fn init(&mut self, rom_len: usize) -> Result<(), CoreFault>;

    /// Run `cycles` M-cycles, returning the number of frames completed
    fn step(&mut self, cycles: u32) -> Result<u32, CoreFault>;

    /// Run until the next frame completes
    fn run_frame(&mut self) -> Result<(), CoreFault>;

    fn set_input(&mut self, input: InputState) -> Result<(), CoreFault>;

    /// Move pending audio into the audio region, returning the sample count
    fn pop_audio(&mut self) -> Result<usize, CoreFault>;

    /// Size of the memory region in bytes
    fn memory_size(&self) -> usize {
        self.memory().len()
    }

    /// Borrowed view of the framebuffer region
    fn read_pixels(&self) -> Result<&[u8], CoreFault> {
        region(self.memory(), 0, FRAMEBUFFER_SIZE)
    }

    /// Borrowed view of the first `samples` entries of the audio region
    fn read_audio(&self, samples: usize) -> Result<AudioView<'_>, CoreFault> {
        let samples = samples.min(AUDIO_BUFFER_SAMPLES);
        let bytes = region(self.memory(), AUDIO_BUFFER_OFFSET, samples * 4)?;
        Ok(AudioView { bytes })
    }
}

/// Brings up a fresh core on `initCore`
pub trait CoreLoader {
    type Core: EmulationCore;

    fn load(&mut self) -> Result<Self::Core, InitializationError>;
}

fn region(memory: &[u8], offset: usize, len: usize) -> Result<&[u8], CoreFault> {
    offset
        .checked_add(len)
        .and_then(|end| memory.get(offset..end))
        .ok_or(CoreFault::OutOfBounds {
            offset,
            len,
            size: memory.len(),
        })
}

/// Interleaved stereo f32 samples borrowed from core memory (little-endian)
#[derive(Debug, Clone, Copy)]
pub struct AudioView<'a> {
    bytes: &'a [u8],
}

impl<'a> AudioView<'a> {
    pub fn from_bytes(bytes: &'a [u8]) -> Self {
        Self { bytes }
    }

    pub fn sample_count(&self) -> usize {
        self.bytes.len() / 4
    }

    pub fn is_empty(&self) -> bool {
        self.sample_count() == 0
    }

    pub fn samples(self) -> impl Iterator<Item = f32> + 'a {
        self.bytes
            .chunks_exact(4)
            .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    /// Stereo frames; a trailing unpaired sample is ignored
    pub fn frames(self) -> impl Iterator<Item = (f32, f32)> + 'a {
        self.bytes.chunks_exact(8).map(|b| {
            (
                f32::from_le_bytes([b[0], b[1], b[2], b[3]]),
                f32::from_le_bytes([b[4], b[5], b[6], b[7]]),
            )
        })
    }
}
