//! Message protocol between the UI, driver and audio contexts
//!
//! Every message is a closed enum variant. Payload buffers are owned values:
//! sending one moves it, so the sender can never touch it again.

use std::fmt;
use std::sync::mpsc;

use crate::layout::{FRAME_HEIGHT, FRAME_WIDTH, FRAMEBUFFER_SIZE};

/// Commands flowing UI → driver
#[derive(Debug)]
pub enum Command {
    /// Fetch and instantiate the emulation core
    InitCore,
    StartCore,
    StopCore,
    /// Load ROM bytes supplied by the UI
    LoadRom(Vec<u8>),
    /// Load a ROM by name from the preinstalled ROM directory
    LoadPreinstalledRom(String),
    SetThrottle(bool),
    KeyEvent { code: String, pressed: bool },
}

/// Events flowing driver → UI (audio is forwarded on to the sink)
#[derive(Debug)]
pub enum Event {
    Initialized,
    PixelData(FrameSnapshot),
    AudioData(AudioBatch),
    Error(String),
}

/// Immutable copy of the framebuffer, RGBA8 row-major at native resolution
#[derive(Clone, PartialEq, Eq)]
pub struct FrameSnapshot {
    pixels: Box<[u8]>,
}

impl FrameSnapshot {
    pub const WIDTH: usize = FRAME_WIDTH;
    pub const HEIGHT: usize = FRAME_HEIGHT;

    /// Copy a framebuffer region. Returns `None` unless `pixels` is exactly
    /// `WIDTH * HEIGHT * 4` bytes.
    pub fn copy_from(pixels: &[u8]) -> Option<Self> {
        (pixels.len() == FRAMEBUFFER_SIZE).then(|| Self {
            pixels: pixels.into(),
        })
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// RGBA of the pixel at (`x`, `y`)
    pub fn pixel(&self, x: usize, y: usize) -> Option<[u8; 4]> {
        if x >= Self::WIDTH || y >= Self::HEIGHT {
            return None;
        }
        let i = (y * Self::WIDTH + x) * 4;
        Some([
            self.pixels[i],
            self.pixels[i + 1],
            self.pixels[i + 2],
            self.pixels[i + 3],
        ])
    }
}

impl fmt::Debug for FrameSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FrameSnapshot")
            .field("width", &Self::WIDTH)
            .field("height", &Self::HEIGHT)
            .finish_non_exhaustive()
    }
}

/// Interleaved stereo f32 samples at the sink's sample rate
#[derive(Clone, Default, PartialEq)]
pub struct AudioBatch {
    samples: Box<[f32]>,
}

impl AudioBatch {
    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn frame_count(&self) -> usize {
        self.samples.len() / 2
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

impl From<Vec<f32>> for AudioBatch {
    fn from(samples: Vec<f32>) -> Self {
        Self {
            samples: samples.into_boxed_slice(),
        }
    }
}

impl fmt::Debug for AudioBatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AudioBatch")
            .field("frames", &self.frame_count())
            .finish()
    }
}

/// Destination for driver events
pub trait EventSink {
    fn publish(&mut self, event: Event);
}

impl EventSink for Vec<Event> {
    fn publish(&mut self, event: Event) {
        self.push(event);
    }
}

impl EventSink for mpsc::Sender<Event> {
    fn publish(&mut self, event: Event) {
        // A dropped receiver means the UI went away; the session exits on its next recv
        let _ = self.send(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_snapshot_requires_exact_size() {
        assert!(FrameSnapshot::copy_from(&[0u8; 16]).is_none());
        assert!(FrameSnapshot::copy_from(&vec![0u8; FRAMEBUFFER_SIZE + 4]).is_none());
        assert!(FrameSnapshot::copy_from(&vec![0u8; FRAMEBUFFER_SIZE]).is_some());
    }

    #[test]
    fn test_frame_snapshot_is_independent_copy() {
        let mut source = vec![0u8; FRAMEBUFFER_SIZE];
        source[4..8].copy_from_slice(&[1, 2, 3, 255]);
        let snapshot = FrameSnapshot::copy_from(&source).unwrap();

        source[4] = 99;
        assert_eq!(snapshot.pixel(1, 0), Some([1, 2, 3, 255]));
        assert_eq!(snapshot.pixel(FrameSnapshot::WIDTH, 0), None);
    }

    #[test]
    fn test_audio_batch_frames() {
        let batch = AudioBatch::from(vec![0.1, 0.2, 0.3, 0.4]);
        assert_eq!(batch.frame_count(), 2);
        assert!(!batch.is_empty());
        assert!(AudioBatch::default().is_empty());
    }

    #[test]
    fn test_channel_sink_ignores_closed_receiver() {
        let (mut tx, rx) = mpsc::channel::<Event>();
        drop(rx);
        tx.publish(Event::Initialized);
    }
}
