//! Audio output using cpal
//!
//! The cpal callback owns the [`RealtimeAudioSink`] outright. Each callback
//! renders stereo blocks through a scratch buffer allocated up front and
//! spreads them over however many channels the device has.

use anyhow::{Context, Result, bail};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use lunaboy_core::RealtimeAudioSink;
use tracing::{debug, error, warn};

/// Scratch size in interleaved stereo samples
const SCRATCH_SAMPLES: usize = 4096;

/// Audio output stream fed by a [`RealtimeAudioSink`]
pub struct AudioOutput {
    /// The cpal stream (kept alive for the duration)
    _stream: cpal::Stream,
    sample_rate: u32,
    channels: u16,
}

impl AudioOutput {
    /// Open the default output device at the sink's rate and start playing
    pub fn new(sink: RealtimeAudioSink) -> Result<Self> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .context("No audio output device available")?;

        let supported = pick_config(&device, sink.sample_rate())?;
        let sample_format = supported.sample_format();
        let config: cpal::StreamConfig = supported.into();
        let sample_rate = config.sample_rate.0;
        let channels = config.channels;

        let stream = match sample_format {
            cpal::SampleFormat::F32 => build_stream(&device, &config, sink, |s| s)?,
            cpal::SampleFormat::I16 => build_stream(&device, &config, sink, |s| {
                (s * 32767.0).clamp(-32768.0, 32767.0) as i16
            })?,
            cpal::SampleFormat::U16 => build_stream(&device, &config, sink, |s| {
                (s * 32767.0 + 32768.0).clamp(0.0, 65535.0) as u16
            })?,
            other => bail!("Unsupported sample format: {:?}", other),
        };

        stream.play().context("Failed to play audio stream")?;

        debug!(
            "Audio stream started: {} Hz, {} channels, {:?}",
            sample_rate, channels, sample_format
        );

        Ok(Self {
            _stream: stream,
            sample_rate,
            channels,
        })
    }

    /// Get the output sample rate
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }
}

/// Prefer a stereo config at exactly `sample_rate`; the core is never resampled.
fn pick_config(device: &cpal::Device, sample_rate: u32) -> Result<cpal::SupportedStreamConfig> {
    let preferred = device
        .supported_output_configs()
        .context("Failed to query output configs")?
        .find(|range| {
            range.channels() == 2
                && range.min_sample_rate().0 <= sample_rate
                && sample_rate <= range.max_sample_rate().0
                && matches!(
                    range.sample_format(),
                    cpal::SampleFormat::F32 | cpal::SampleFormat::I16 | cpal::SampleFormat::U16
                )
        });
    if let Some(range) = preferred {
        return Ok(range.with_sample_rate(cpal::SampleRate(sample_rate)));
    }

    let fallback = device
        .default_output_config()
        .context("Failed to get default output config")?;
    if fallback.sample_rate().0 != sample_rate {
        warn!(
            "Output device does not support {} Hz; playing at {} Hz (pitch will be off)",
            sample_rate,
            fallback.sample_rate().0
        );
    }
    Ok(fallback)
}

fn build_stream<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    mut sink: RealtimeAudioSink,
    convert: fn(f32) -> T,
) -> Result<cpal::Stream>
where
    T: cpal::SizedSample + Send + 'static,
{
    let channels = usize::from(config.channels.max(1));
    let mut scratch = vec![0.0f32; SCRATCH_SAMPLES];
    device
        .build_output_stream(
            config,
            move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                write_block(data, channels, &mut sink, &mut scratch, convert);
            },
            |err| error!("Audio stream error: {}", err),
            None,
        )
        .context("Failed to build audio stream")
}

/// Fill one device buffer from the sink. Never allocates.
fn write_block<T: Copy>(
    data: &mut [T],
    channels: usize,
    sink: &mut RealtimeAudioSink,
    scratch: &mut [f32],
    convert: fn(f32) -> T,
) {
    let frames_per_chunk = scratch.len() / 2;
    for chunk in data.chunks_mut(frames_per_chunk * channels) {
        let frames = chunk.len() / channels;
        let stereo = &mut scratch[..frames * 2];
        sink.render_interleaved(stereo);

        for (out, lr) in chunk.chunks_exact_mut(channels).zip(stereo.chunks_exact(2)) {
            if channels == 1 {
                out[0] = convert((lr[0] + lr[1]) * 0.5);
            } else {
                out[0] = convert(lr[0]);
                out[1] = convert(lr[1]);
                for extra in &mut out[2..] {
                    *extra = convert(0.0);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lunaboy_core::{AudioBatch, AudioConfig, audio_channel};

    fn sink_with(samples: Vec<f32>) -> RealtimeAudioSink {
        let (mut feed, sink) = audio_channel(&AudioConfig::default());
        feed.enqueue(AudioBatch::from(samples));
        sink
    }

    #[test]
    fn test_write_block_stereo() {
        let mut sink = sink_with(vec![0.5, -0.5, 0.25, -0.25]);
        let mut scratch = vec![0.0; 8];
        let mut out = vec![1.0f32; 6];

        write_block(&mut out, 2, &mut sink, &mut scratch, |s| s);

        assert_eq!(out, vec![0.5, -0.5, 0.25, -0.25, 0.0, 0.0]);
        assert_eq!(sink.underrun_frames(), 1);
    }

    #[test]
    fn test_write_block_mono_downmix() {
        let mut sink = sink_with(vec![0.5, 0.25]);
        let mut scratch = vec![0.0; 8];
        let mut out = vec![1.0f32; 2];

        write_block(&mut out, 1, &mut sink, &mut scratch, |s| s);

        assert_eq!(out, vec![0.375, 0.0]);
    }

    #[test]
    fn test_write_block_extra_channels_are_silent() {
        let mut sink = sink_with(vec![0.5, -0.5]);
        let mut scratch = vec![0.0; 8];
        let mut out = vec![1.0f32; 4];

        write_block(&mut out, 4, &mut sink, &mut scratch, |s| s);

        assert_eq!(out, vec![0.5, -0.5, 0.0, 0.0]);
    }

    #[test]
    fn test_write_block_spans_multiple_chunks() {
        let samples: Vec<f32> = (0..20).map(|i| i as f32 / 100.0).collect();
        let mut sink = sink_with(samples.clone());
        // Four stereo frames per chunk
        let mut scratch = vec![0.0; 8];
        let mut out = vec![0.0f32; 20];

        write_block(&mut out, 2, &mut sink, &mut scratch, |s| s);

        assert_eq!(out, samples);
    }

    #[test]
    fn test_write_block_i16_conversion() {
        let mut sink = sink_with(vec![1.0, -1.0]);
        let mut scratch = vec![0.0; 8];
        let mut out = vec![0i16; 4];

        write_block(&mut out, 2, &mut sink, &mut scratch, |s| {
            (s * 32767.0).clamp(-32768.0, 32767.0) as i16
        });

        assert_eq!(out, vec![32767, -32767, 0, 0]);
    }
}
