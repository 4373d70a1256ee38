//! # Audio Capture Module
//!
//! This module handles real-time audio capture using CPAL (Cross-Platform
//! Audio Library). It owns the input stream for a session and hands
//! fixed-size frame snapshots to the detection loop.
//!
//! ## Features
//! - Automatic input device and format selection
//! - Device-reported sample rate with a 44.1 kHz fallback target
//! - Fixed-size frame snapshots, never a live concurrently-written buffer
//! - Error handling via `anyhow` for every setup step

use anyhow::{Result, anyhow};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use crossbeam_channel::Receiver;

use crate::scheduler::FrameSource;

/// Audio buffer size for analysis frames.
///
/// This constant defines the number of samples per analysis frame. Larger
/// frames resolve lower pitches but increase latency (~46ms at 44.1kHz).
pub const BUFFER_SIZE: usize = 2048;

/// Sample rate targeted when the device does not report a preference.
const FALLBACK_SAMPLE_RATE: u32 = 44100;

/// Snapshots kept in flight between the stream callback and the detection
/// loop. The reader drains to the newest one, so depth only buys slack.
const FRAME_QUEUE_DEPTH: usize = 8;

/// An open capture connection: the input stream plus the frame handoff.
///
/// The session is constructed explicitly with [`CaptureSession::connect`]
/// and owned by whoever starts the detection loop; dropping it detaches
/// the stream from the analysis sink.
pub struct CaptureSession {
    // Held for its side effect: dropping the stream stops the callback.
    _stream: cpal::Stream,
    frames: Receiver<Vec<f32>>,
    sample_rate: u32,
}

impl CaptureSession {
    /// Connects to the default input device and starts capturing.
    ///
    /// The stream callback accumulates interleaved input, keeps the first
    /// channel, and sends each full [`BUFFER_SIZE`]-sample snapshot to the
    /// analysis side. Snapshots are immutable once sent; the detection
    /// loop never observes a buffer the device is still writing.
    ///
    /// # Returns
    /// * `Ok(session)` - Capture is running
    /// * `Err(e)` - No device, no f32 format, or the stream failed to open
    pub fn connect() -> Result<Self> {
        let host = cpal::default_host();
        let device = host
            .default_input_device()
            .ok_or_else(|| anyhow!("No input device available"))?;

        println!("Using audio input device: {}", device.name()?);

        let supported = pick_input_config(&device)?;
        let sample_rate = supported.sample_rate().0;
        let channels = supported.channels() as usize;
        let config: cpal::StreamConfig = supported.into();

        println!("Capturing at {} Hz, {} channel(s)", sample_rate, channels);

        let (frames_tx, frames_rx) = crossbeam_channel::bounded(FRAME_QUEUE_DEPTH);
        let err_fn = |err| eprintln!("[AUDIO] An error occurred on the audio stream: {}", err);

        // Accumulates callback data until a full analysis frame is ready.
        let mut pending: Vec<f32> = Vec::with_capacity(BUFFER_SIZE * 2);

        let stream = device.build_input_stream(
            &config,
            move |data: &[f32], _: &cpal::InputCallbackInfo| {
                // Keep only the first channel of interleaved input.
                pending.extend(data.iter().step_by(channels));

                while pending.len() >= BUFFER_SIZE {
                    let snapshot: Vec<f32> = pending.drain(..BUFFER_SIZE).collect();
                    // If the analysis side is behind, drop the frame;
                    // read_frame drains to the newest snapshot anyway.
                    let _ = frames_tx.try_send(snapshot);
                }
            },
            err_fn,
            None,
        )?;

        stream.play()?;

        Ok(Self {
            _stream: stream,
            frames: frames_rx,
            sample_rate,
        })
    }

    /// The sample rate of this capture session, constant for its lifetime.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }
}

impl Drop for CaptureSession {
    fn drop(&mut self) {
        // Detach the device before the stream handle goes away.
        if let Err(e) = self._stream.pause() {
            eprintln!("[AUDIO] Error pausing stream: {}", e);
        }
    }
}

impl FrameSource for CaptureSession {
    fn read_frame(&mut self, frame: &mut Vec<f32>) -> Option<u32> {
        let mut newest = None;
        while let Ok(snapshot) = self.frames.try_recv() {
            newest = Some(snapshot);
        }
        let snapshot = newest?;
        frame.clear();
        frame.extend_from_slice(&snapshot);
        Some(self.sample_rate)
    }
}

/// Finds the best supported f32 input configuration for a device.
///
/// Targets the device-reported default sample rate (falling back to
/// 44.1 kHz), preferring the fewest channels and then the closest
/// supported rate.
fn pick_input_config(device: &cpal::Device) -> Result<cpal::SupportedStreamConfig> {
    let target_rate = device
        .default_input_config()
        .map(|config| config.sample_rate().0)
        .unwrap_or(FALLBACK_SAMPLE_RATE);

    let range = device
        .supported_input_configs()?
        .filter(|c| c.sample_format() == cpal::SampleFormat::F32)
        .min_by_key(|c| {
            let below = (c.min_sample_rate().0 as i64 - target_rate as i64).abs();
            let above = (c.max_sample_rate().0 as i64 - target_rate as i64).abs();
            (c.channels(), below.min(above))
        })
        .ok_or_else(|| anyhow!("No suitable f32 input format found"))?;

    let rate = target_rate.clamp(range.min_sample_rate().0, range.max_sample_rate().0);
    Ok(range.with_sample_rate(cpal::SampleRate(rate)))
}
