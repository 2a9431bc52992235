//! `Sink` adapter over `cpal`. Bridges the engine's blocking `write` call to
//! cpal's push-based output callback with a small bounded rendezvous
//! channel, grounded on the teacher's `RealtimeOutputStream`.

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::StreamConfig;
use crossbeam_channel::{bounded, Sender};
use tracing::{error, info, warn};

use hibiki_core::{Result as HibikiResult, Sink};

use crate::error::MediaError;

/// Channel depth of queued blocks; bounds how far the Scheduler can run
/// ahead of the device before `write` applies backpressure.
const QUEUE_DEPTH: usize = 4;

pub struct CpalSink {
    tx: Sender<Vec<f32>>,
    sample_rate: f64,
    channels: u16,
    ready: bool,
    _stream: cpal::Stream,
}

impl CpalSink {
    /// Opens the default output device at its native sample rate, requesting
    /// `channels` output channels (the engine always asks for
    /// [`hibiki_core::OUT_CHANNELS`]).
    pub fn new(channels: u16) -> Result<Self, MediaError> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or_else(|| MediaError::Output("no audio output devices found".into()))?;

        let supported_config = device
            .default_output_config()
            .map_err(|e| MediaError::Output(format!("failed to get output config: {e}")))?;

        let sample_rate = supported_config.sample_rate().0 as f64;
        let config = StreamConfig {
            channels,
            sample_rate: supported_config.sample_rate(),
            buffer_size: cpal::BufferSize::Default,
        };

        let (tx, rx) = bounded::<Vec<f32>>(QUEUE_DEPTH);
        let mut pending: Vec<f32> = Vec::new();
        let mut pending_pos = 0usize;

        let stream = device
            .build_output_stream(
                &config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    let mut written = 0;
                    while written < data.len() {
                        if pending_pos >= pending.len() {
                            match rx.try_recv() {
                                Ok(block) => {
                                    pending = block;
                                    pending_pos = 0;
                                }
                                Err(_) => {
                                    data[written..].fill(0.0);
                                    return;
                                }
                            }
                        }
                        let available = pending.len() - pending_pos;
                        let take = available.min(data.len() - written);
                        data[written..written + take]
                            .copy_from_slice(&pending[pending_pos..pending_pos + take]);
                        pending_pos += take;
                        written += take;
                    }
                },
                move |err| error!("audio output stream error: {err}"),
                None,
            )
            .map_err(|e| MediaError::Output(format!("failed to build output stream: {e}")))?;

        stream
            .play()
            .map_err(|e| MediaError::Output(format!("failed to start output stream: {e}")))?;

        info!(sample_rate, channels, "cpal output stream started");

        Ok(Self {
            tx,
            sample_rate,
            channels,
            ready: true,
            _stream: stream,
        })
    }
}

impl Sink for CpalSink {
    fn is_ready(&self) -> bool {
        self.ready
    }

    fn write(&mut self, frames: &[f32], n_frames: usize) -> HibikiResult<()> {
        let expected = n_frames * self.channels as usize;
        debug_assert_eq!(frames.len(), expected);
        let sanitized: Vec<f32> = frames
            .iter()
            .map(|s| if s.is_finite() { s.clamp(-1.0, 1.0) } else { 0.0 })
            .collect();
        if self.tx.send(sanitized).is_err() {
            warn!("output stream receiver dropped, marking sink not ready");
            self.ready = false;
            return Err(hibiki_core::HibikiError::SinkUnavailable(
                "output stream closed".into(),
            ));
        }
        Ok(())
    }

    fn sample_rate(&self) -> f64 {
        self.sample_rate
    }
}
