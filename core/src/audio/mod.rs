//! Audio path
//!
//! ```text
//! Driver thread              UI thread                 Audio callback
//!     │                          │                           │
//! [pop_audio → staging ring]     │                           │
//! [drain → AudioBatch]──(event)─►[AudioFeed::enqueue]        │
//!     │                          [push]──────(lane)────────►[ingest → replica]
//!     │                          │                          [pull block / silence]
//! ```
//!
//! Both the driver's staging buffer and the sink's replica are
//! [`AudioRingBuffer`]s with overwrite-oldest semantics. The lane between the
//! UI context and the callback is a lock-free SPSC ring from `ringbuf`.

mod ring;
mod sink;

pub use ring::{AudioRingBuffer, StereoFrame};
pub use sink::{AudioFeed, RealtimeAudioSink, audio_channel};
