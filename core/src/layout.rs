//! Fixed memory layout shared with the emulation core
//!
//! The core renders into a framebuffer at offset 0 and writes drained audio
//! samples directly after it. ROM bytes are staged at offset 0 before `init`.

/// Native display width in pixels
pub const FRAME_WIDTH: usize = 160;
/// Native display height in pixels
pub const FRAME_HEIGHT: usize = 144;
/// Framebuffer size in bytes (tightly packed RGBA8)
pub const FRAMEBUFFER_SIZE: usize = FRAME_WIDTH * FRAME_HEIGHT * 4;

/// Offset of the audio sample region
pub const AUDIO_BUFFER_OFFSET: usize = FRAMEBUFFER_SIZE;
/// Capacity of the audio region in f32 samples (interleaved stereo)
pub const AUDIO_BUFFER_SAMPLES: usize = 1024 * 2;
/// Audio region size in bytes
pub const AUDIO_BUFFER_SIZE: usize = AUDIO_BUFFER_SAMPLES * 4;

/// Smallest memory region that covers both the framebuffer and the audio region
pub const MIN_REQUIRED_MEMORY: usize = AUDIO_BUFFER_OFFSET + AUDIO_BUFFER_SIZE;

/// WASM linear memory page size
pub const WASM_PAGE_SIZE: usize = 65536;

/// Memory the core must expose before a ROM of `rom_len` bytes is copied in.
pub fn required_memory(rom_len: usize) -> usize {
    rom_len.max(MIN_REQUIRED_MEMORY)
}

/// Whole pages needed to grow a region by `bytes`.
pub fn pages_for(bytes: usize) -> u64 {
    bytes.div_ceil(WASM_PAGE_SIZE) as u64
}
