//! cpal-based audio capture
//!
//! Uses the cpal crate for cross-platform audio input.
//! Works with PipeWire, PulseAudio, and ALSA backends.
//!
//! cpal::Stream is not Send, so the stream lives on a dedicated thread and
//! talks to the async world via channels. The thread reports stream build
//! success over a readiness channel before `start` returns, so a failed
//! acquisition surfaces as `DeviceUnavailable` instead of a half-open
//! capture. Dropping the stream happens before the buffer is drained, which
//! is what guarantees no frame lands after `stop` returns.

use super::AudioCapture;
use crate::config::{AudioSettings, SampleFormat};
use crate::error::AudioError;
use crate::state::AudioBuffer;
use std::sync::{Arc, Mutex};
use std::thread;
use tokio::sync::oneshot;

/// Commands sent to the capture thread
enum CaptureCommand {
    Stop(oneshot::Sender<AudioBuffer>),
}

/// Parameters for building an audio input stream
struct StreamBuildParams {
    buffer: Arc<Mutex<AudioBuffer>>,
    format: SampleFormat,
    source_rate: u32,
    target_rate: u32,
    source_channels: usize,
}

/// cpal-based audio capture implementation
pub struct CpalCapture {
    settings: AudioSettings,
    /// Command sender to the capture thread (Some while capturing)
    cmd_tx: Option<std::sync::mpsc::Sender<CaptureCommand>>,
    /// Handle to the capture thread
    thread_handle: Option<thread::JoinHandle<()>>,
}

impl CpalCapture {
    /// Create a new cpal audio capture instance
    pub fn new(settings: &AudioSettings) -> Self {
        Self {
            settings: settings.clone(),
            cmd_tx: None,
            thread_handle: None,
        }
    }
}

/// Find an audio input device by name (exact, then case-insensitive
/// substring), so users can give either full cpal names or PipeWire short
/// names.
fn find_audio_device(host: &cpal::Host, device_name: &str) -> Result<cpal::Device, AudioError> {
    use cpal::traits::{DeviceTrait, HostTrait};

    let devices: Vec<cpal::Device> = host
        .input_devices()
        .map_err(|e| AudioError::DeviceUnavailable(e.to_string()))?
        .collect();

    let search_lower = device_name.to_lowercase();

    for device in devices {
        if let Ok(name) = device.name() {
            if name == device_name || name.to_lowercase().contains(&search_lower) {
                tracing::debug!("Matched audio device: {}", name);
                return Ok(device);
            }
        }
    }

    Err(AudioError::DeviceUnavailable(format!(
        "no input device matching '{}'",
        device_name
    )))
}

#[async_trait::async_trait]
impl AudioCapture for CpalCapture {
    async fn start(&mut self) -> Result<(), AudioError> {
        use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};

        if self.cmd_tx.is_some() {
            tracing::debug!("Audio capture already running, ignoring start");
            return Ok(());
        }

        let host = cpal::default_host();
        let device = if self.settings.device == "default" {
            host.default_input_device()
                .ok_or_else(|| AudioError::DeviceUnavailable("no default input device".into()))?
        } else {
            find_audio_device(&host, &self.settings.device)?
        };

        let device_name = device.name().unwrap_or_else(|_| "unknown".to_string());
        tracing::info!("Using audio device: {}", device_name);

        let supported_config = device
            .default_input_config()
            .map_err(|e| AudioError::DeviceUnavailable(e.to_string()))?;

        let source_rate = supported_config.sample_rate().0;
        let source_channels = supported_config.channels() as usize;
        let sample_format = supported_config.sample_format();

        tracing::debug!(
            "Device config: {} Hz, {} channel(s), format: {:?}",
            source_rate,
            source_channels,
            sample_format
        );

        let (cmd_tx, cmd_rx) = std::sync::mpsc::channel::<CaptureCommand>();
        let (ready_tx, ready_rx) = oneshot::channel::<Result<(), String>>();

        let buffer = Arc::new(Mutex::new(AudioBuffer::new()));

        let target_rate = self.settings.sample_rate;
        let target_format = self.settings.sample_format;
        let chunk_size = self.settings.chunk_size;

        let thread_handle = thread::spawn(move || {
            let stream_config = cpal::StreamConfig {
                channels: supported_config.channels(),
                sample_rate: supported_config.sample_rate(),
                buffer_size: cpal::BufferSize::Fixed(chunk_size),
            };

            let err_fn = |err| tracing::error!("Audio stream error: {}", err);

            let make_params = || StreamBuildParams {
                buffer: buffer.clone(),
                format: target_format,
                source_rate,
                target_rate,
                source_channels,
            };

            let stream_result = match sample_format {
                cpal::SampleFormat::F32 => {
                    build_stream::<f32>(&device, &stream_config, make_params(), err_fn)
                }
                cpal::SampleFormat::I16 => {
                    build_stream::<i16>(&device, &stream_config, make_params(), err_fn)
                }
                cpal::SampleFormat::U16 => {
                    build_stream::<u16>(&device, &stream_config, make_params(), err_fn)
                }
                format => {
                    let _ = ready_tx.send(Err(format!("unsupported sample format: {:?}", format)));
                    return;
                }
            };

            let stream = match stream_result {
                Ok(s) => s,
                Err(e) => {
                    let _ = ready_tx.send(Err(e.to_string()));
                    return;
                }
            };

            if let Err(e) = stream.play() {
                let _ = ready_tx.send(Err(e.to_string()));
                return;
            }

            if ready_tx.send(Ok(())).is_err() {
                return;
            }

            tracing::debug!("Audio capture thread started");

            if let Ok(CaptureCommand::Stop(response_tx)) = cmd_rx.recv() {
                // Drop the stream first: once this returns, the callback can
                // no longer run, so the snapshot below is final.
                drop(stream);

                let collected = match buffer.lock() {
                    Ok(mut guard) => std::mem::take(&mut *guard),
                    Err(poisoned) => std::mem::take(&mut *poisoned.into_inner()),
                };

                let _ = response_tx.send(collected);
            }

            tracing::debug!("Audio capture thread stopped");
        });

        match ready_rx.await {
            Ok(Ok(())) => {
                self.cmd_tx = Some(cmd_tx);
                self.thread_handle = Some(thread_handle);
                Ok(())
            }
            Ok(Err(msg)) => {
                let _ = thread_handle.join();
                Err(AudioError::DeviceUnavailable(msg))
            }
            Err(_) => {
                let _ = thread_handle.join();
                Err(AudioError::StreamError("capture thread died during startup".into()))
            }
        }
    }

    async fn stop(&mut self) -> Result<AudioBuffer, AudioError> {
        let Some(cmd_tx) = self.cmd_tx.take() else {
            return Ok(AudioBuffer::new());
        };

        let (response_tx, response_rx) = oneshot::channel();

        let bytes = if cmd_tx.send(CaptureCommand::Stop(response_tx)).is_ok() {
            match tokio::time::timeout(std::time::Duration::from_secs(2), response_rx).await {
                Ok(Ok(bytes)) => bytes,
                Ok(Err(_)) => {
                    return Err(AudioError::StreamError("capture thread channel closed".into()))
                }
                Err(_) => {
                    return Err(AudioError::StreamError(
                        "capture thread did not respond within 2s".into(),
                    ))
                }
            }
        } else {
            AudioBuffer::new()
        };

        if let Some(handle) = self.thread_handle.take() {
            let _ = handle.join();
        }

        let duration_secs = bytes.len() as f32
            / (self.settings.sample_rate as f32
                * self.settings.sample_format.bytes_per_sample() as f32);
        tracing::debug!(
            "Audio capture stopped: {} bytes ({:.2}s)",
            bytes.len(),
            duration_secs
        );

        Ok(bytes)
    }
}

/// Build an input stream for a specific sample type
fn build_stream<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    params: StreamBuildParams,
    err_fn: impl Fn(cpal::StreamError) + Send + 'static,
) -> Result<cpal::Stream, AudioError>
where
    T: cpal::Sample + cpal::SizedSample + Send + 'static,
    f32: cpal::FromSample<T>,
{
    use cpal::traits::DeviceTrait;

    let StreamBuildParams {
        buffer,
        format,
        source_rate,
        target_rate,
        source_channels,
    } = params;

    let stream = device
        .build_input_stream(
            config,
            move |data: &[T], _: &cpal::InputCallbackInfo| {
                let mono = mix_to_mono(data, source_channels);

                let resampled = if source_rate != target_rate {
                    resample(&mono, source_rate, target_rate)
                } else {
                    mono
                };

                if let Ok(mut guard) = buffer.lock() {
                    encode_samples(&resampled, format, &mut guard);
                }
            },
            err_fn,
            None,
        )
        .map_err(|e| AudioError::StreamError(e.to_string()))?;

    Ok(stream)
}

/// Convert an interleaved frame slice to mono f32 by averaging channels
fn mix_to_mono<T>(data: &[T], channels: usize) -> Vec<f32>
where
    T: cpal::Sample,
    f32: cpal::FromSample<T>,
{
    data.chunks(channels.max(1))
        .map(|frame| {
            let sum: f32 = frame
                .iter()
                .map(|&s| <f32 as cpal::FromSample<T>>::from_sample_(s))
                .sum();
            sum / frame.len() as f32
        })
        .collect()
}

/// Linear interpolation resampling
fn resample(samples: &[f32], from_rate: u32, to_rate: u32) -> Vec<f32> {
    if from_rate == to_rate || samples.is_empty() {
        return samples.to_vec();
    }

    let ratio = to_rate as f64 / from_rate as f64;
    let new_len = (samples.len() as f64 * ratio).ceil() as usize;
    let mut output = Vec::with_capacity(new_len);

    for i in 0..new_len {
        let src_idx = i as f64 / ratio;
        let idx = src_idx.floor() as usize;
        let frac = (src_idx - idx as f64) as f32;

        let sample = if idx + 1 < samples.len() {
            samples[idx] * (1.0 - frac) + samples[idx + 1] * frac
        } else {
            samples.get(idx).copied().unwrap_or(0.0)
        };

        output.push(sample);
    }

    output
}

/// Append f32 samples to the buffer as little-endian PCM bytes
fn encode_samples(samples: &[f32], format: SampleFormat, out: &mut AudioBuffer) {
    match format {
        SampleFormat::Int16 => {
            for &sample in samples {
                let clamped = sample.clamp(-1.0, 1.0);
                let scaled = (clamped * i16::MAX as f32) as i16;
                out.extend_from_slice(&scaled.to_le_bytes());
            }
        }
        SampleFormat::Float32 => {
            for &sample in samples {
                out.extend_from_slice(&sample.to_le_bytes());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resample_same_rate() {
        let samples = vec![1.0, 2.0, 3.0, 4.0];
        let result = resample(&samples, 16000, 16000);
        assert_eq!(result, samples);
    }

    #[test]
    fn test_resample_downsample() {
        let samples = vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0];
        let result = resample(&samples, 48000, 16000);
        // 48000 -> 16000 is 3:1 ratio, so 8 samples -> ~3 samples
        assert!(result.len() >= 2 && result.len() <= 4);
    }

    #[test]
    fn test_resample_upsample() {
        let samples = vec![1.0, 2.0];
        let result = resample(&samples, 8000, 16000);
        assert_eq!(result.len(), 4);
    }

    #[test]
    fn test_resample_empty() {
        let samples: Vec<f32> = vec![];
        let result = resample(&samples, 48000, 16000);
        assert!(result.is_empty());
    }

    #[test]
    fn test_mix_to_mono_stereo() {
        let data = vec![0.0f32, 1.0, -1.0, 1.0];
        let mono = mix_to_mono(&data, 2);
        assert_eq!(mono, vec![0.5, 0.0]);
    }

    #[test]
    fn test_encode_int16_clamps_and_orders() {
        let mut out = AudioBuffer::new();
        encode_samples(&[0.0, 1.0, -2.0], SampleFormat::Int16, &mut out);
        assert_eq!(out.len(), 6);
        assert_eq!(&out[0..2], &0i16.to_le_bytes());
        assert_eq!(&out[2..4], &i16::MAX.to_le_bytes());
        // -2.0 clamps to -1.0
        assert_eq!(&out[4..6], &(-i16::MAX).to_le_bytes());
    }

    #[test]
    fn test_encode_float32_roundtrip() {
        let mut out = AudioBuffer::new();
        encode_samples(&[0.25, -0.5], SampleFormat::Float32, &mut out);
        assert_eq!(out.len(), 8);
        let first = f32::from_le_bytes([out[0], out[1], out[2], out[3]]);
        assert_eq!(first, 0.25);
    }

    #[test]
    fn test_appends_preserve_frame_order() {
        // Two "frames" encoded back to back must concatenate in order
        let mut out = AudioBuffer::new();
        encode_samples(&[0.0], SampleFormat::Int16, &mut out);
        encode_samples(&[1.0], SampleFormat::Int16, &mut out);
        assert_eq!(&out[0..2], &0i16.to_le_bytes());
        assert_eq!(&out[2..4], &i16::MAX.to_le_bytes());
    }
}
