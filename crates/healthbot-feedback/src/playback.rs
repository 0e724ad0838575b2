//! Tone playback on the default output device via `cpal`.
//!
//! Each tone gets its own short-lived output stream on a background thread,
//! so `play` returns immediately and overlapping tones mix at the device.

use std::thread;
use std::time::Duration;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::SampleFormat;

use crate::{FeedbackError, ToneSink};

/// Grace period after the last sample before the stream is dropped.
const TAIL: Duration = Duration::from_millis(30);

/// Output sink bound to the host's default output device.
#[derive(Debug, Clone)]
pub struct CpalToneSink {
    sample_rate: u32,
    channels: u16,
}

impl CpalToneSink {
    /// Probe the default output device.
    ///
    /// Fails with `NoDevice` on hosts without audio output, which callers
    /// treat as "play nothing".
    pub fn open() -> Result<Self, FeedbackError> {
        let host = cpal::default_host();
        let device = host.default_output_device().ok_or(FeedbackError::NoDevice)?;
        let config = device
            .default_output_config()
            .map_err(|e| FeedbackError::Playback(e.to_string()))?;
        if config.sample_format() != SampleFormat::F32 {
            return Err(FeedbackError::UnsupportedFormat(format!(
                "{:?}",
                config.sample_format()
            )));
        }
        tracing::info!(
            sample_rate = config.sample_rate().0,
            channels = config.channels(),
            "Audio output ready"
        );
        Ok(Self {
            sample_rate: config.sample_rate().0,
            channels: config.channels(),
        })
    }
}

impl ToneSink for CpalToneSink {
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn play(&self, samples: Vec<f32>, sample_rate: u32) -> Result<(), FeedbackError> {
        if samples.is_empty() {
            return Ok(());
        }
        let channels = self.channels.max(1) as usize;
        let length = Duration::from_secs_f64(samples.len() as f64 / sample_rate.max(1) as f64);

        // cpal streams are not Send on every platform, so the stream lives
        // and dies on its own thread.
        thread::Builder::new()
            .name("healthbot-tone".to_string())
            .spawn(move || {
                let host = cpal::default_host();
                let Some(device) = host.default_output_device() else {
                    tracing::debug!("Output device vanished before tone playback");
                    return;
                };
                let config = cpal::StreamConfig {
                    channels: channels as u16,
                    sample_rate: cpal::SampleRate(sample_rate),
                    buffer_size: cpal::BufferSize::Default,
                };
                let mut position = 0usize;
                let stream = device.build_output_stream(
                    &config,
                    move |data: &mut [f32], _info: &cpal::OutputCallbackInfo| {
                        for frame in data.chunks_mut(channels) {
                            let value = samples.get(position).copied().unwrap_or(0.0);
                            position += 1;
                            for out in frame.iter_mut() {
                                *out = value;
                            }
                        }
                    },
                    |error| tracing::debug!(error = %error, "Tone stream error"),
                    Some(Duration::from_millis(100)),
                );
                let stream = match stream {
                    Ok(s) => s,
                    Err(e) => {
                        tracing::debug!(error = %e, "Failed to build tone stream");
                        return;
                    }
                };
                if let Err(e) = stream.play() {
                    tracing::debug!(error = %e, "Failed to start tone stream");
                    return;
                }
                thread::sleep(length + TAIL);
            })
            .map(|_| ())
            .map_err(|e| FeedbackError::Playback(e.to_string()))
    }
}
