//! Real-time audio sink and the lane that feeds it
//!
//! The sink runs inside the audio device callback. It never shares its ring
//! buffer: batches arrive through a lock-free SPSC lane and are replayed into
//! a local [`AudioRingBuffer`] replica at the start of every callback.

use ringbuf::traits::{Consumer, Observer, Producer, Split};
use ringbuf::{HeapCons, HeapProd, HeapRb};
use tracing::debug;

use super::ring::AudioRingBuffer;
use crate::config::AudioConfig;
use crate::transport::AudioBatch;

/// Samples moved from the lane per pop (must be even)
const INGEST_CHUNK: usize = 1024;

/// Create a connected feed/sink pair from the audio configuration.
pub fn audio_channel(config: &AudioConfig) -> (AudioFeed, RealtimeAudioSink) {
    // Keep the lane an even number of samples so a stereo frame never splits
    let lane_capacity = (config.lane_capacity_samples.max(INGEST_CHUNK) + 1) & !1;
    let (producer, consumer) = HeapRb::<f32>::new(lane_capacity).split();

    let feed = AudioFeed {
        producer,
        muted: config.muted,
        dropped_samples: 0,
    };
    let sink = RealtimeAudioSink {
        consumer,
        replica: AudioRingBuffer::new(config.ring_capacity_frames),
        scratch: vec![0.0; INGEST_CHUNK].into_boxed_slice(),
        max_ingest_rounds: lane_capacity.div_ceil(INGEST_CHUNK),
        sample_rate: config.sample_rate,
        underrun_frames: 0,
    };
    (feed, sink)
}

/// Producer end of the audio lane, held by the context that receives
/// `audioData` events.
pub struct AudioFeed {
    producer: HeapProd<f32>,
    muted: bool,
    dropped_samples: u64,
}

impl AudioFeed {
    /// Hand a batch to the sink. The batch is consumed; its samples are
    /// copied into the lane and the allocation is freed on this side.
    ///
    /// Returns the number of samples queued. While muted, or when the sink
    /// has stopped draining and the lane is full, samples are discarded.
    pub fn enqueue(&mut self, batch: AudioBatch) -> usize {
        if self.muted {
            return 0;
        }

        let samples = batch.samples();
        let room = self.producer.vacant_len() & !1;
        let queued = self.producer.push_slice(&samples[..samples.len().min(room) & !1]);

        let dropped = samples.len() - queued;
        if dropped > 0 {
            self.dropped_samples += dropped as u64;
            debug!(
                "Audio lane full, dropped {} samples ({} total)",
                dropped, self.dropped_samples
            );
        }
        queued
    }

    pub fn set_muted(&mut self, muted: bool) {
        self.muted = muted;
    }

    /// Samples discarded because the lane was full
    pub fn dropped_samples(&self) -> u64 {
        self.dropped_samples
    }

    /// Samples waiting in the lane
    pub fn queued_samples(&self) -> usize {
        self.producer.occupied_len()
    }
}

/// Consumer side, owned by the real-time audio callback.
///
/// Every render call is bounded: the lane is drained at most once through,
/// the replica is read without allocation, and shortfalls become silence.
pub struct RealtimeAudioSink {
    consumer: HeapCons<f32>,
    replica: AudioRingBuffer,
    scratch: Box<[f32]>,
    max_ingest_rounds: usize,
    sample_rate: u32,
    underrun_frames: u64,
}

impl RealtimeAudioSink {
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Frames buffered in the local replica
    pub fn buffered_frames(&self) -> usize {
        self.replica.available_frames()
    }

    /// Silent frames substituted since creation
    pub fn underrun_frames(&self) -> u64 {
        self.underrun_frames
    }

    /// Frames lost to overwrite-oldest in the replica
    pub fn overwritten_frames(&self) -> u64 {
        self.replica.overwritten()
    }

    /// Move everything currently in the lane into the replica
    fn ingest(&mut self) {
        for _ in 0..self.max_ingest_rounds {
            let popped = self.consumer.pop_slice(&mut self.scratch);
            self.replica.push_interleaved(&self.scratch[..popped]);
            if popped < self.scratch.len() {
                break;
            }
        }
    }

    /// Render one interleaved stereo block. Returns frames taken from the buffer.
    pub fn render_interleaved(&mut self, out: &mut [f32]) -> usize {
        self.ingest();
        let rendered = self.replica.pull_interleaved(out);
        self.underrun_frames += (out.len() / 2 - rendered) as u64;
        rendered
    }

    /// Render one block into separate channel slices of equal length.
    pub fn render_planar(&mut self, left: &mut [f32], right: &mut [f32]) -> usize {
        self.ingest();
        let rendered = self.replica.pull_into(left, right);
        self.underrun_frames += (left.len().min(right.len()) - rendered) as u64;
        rendered
    }
}
