//! cpal microphone capture provider.
//!
//! Captures from a cpal input device and hands 16-bit little-endian PCM to
//! the drain worker through a byte ring buffer. cpal streams are not `Send`,
//! so each stream lives on a dedicated thread for the length of a capture.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use cpal::traits::{DeviceTrait, StreamTrait};
use cpal::{SampleFormat, StreamConfig, SupportedStreamConfigRange};

use media_capture_core::models::audio_models::{AudioDevice, AudioFormat};
use media_capture_core::models::error::CaptureError;
use media_capture_core::processing::pcm;
use media_capture_core::traits::sample_source::SampleSource;

use crate::device_enumerator::find_input_device;
use crate::permissions::looks_like_denial;
use crate::shared_buffer::SharedBuffer;

/// Longest a `read` waits for the callback before reporting no data.
const READ_TIMEOUT: Duration = Duration::from_millis(50);

/// Seconds of audio buffered between the callback and the drain worker.
const BUFFER_SECONDS: usize = 2;

/// Device sample formats this provider converts to PCM16, in order of preference.
const SUPPORTED_SAMPLE_FORMATS: [SampleFormat; 3] = [SampleFormat::I16, SampleFormat::F32, SampleFormat::U16];

/// cpal microphone capture.
///
/// Only 16-bit output is supported; the device may deliver i16, u16 or f32
/// samples, which are converted in the audio callback.
pub struct CpalMicSource {
    device_name: Option<String>,
    display_name: String,
    opened: Option<OpenedStream>,
    buffer: Arc<SharedBuffer>,
    running: Arc<AtomicBool>,
    stream_thread: Option<thread::JoinHandle<()>>,
    reported_drops: u64,
}

#[derive(Clone, Copy)]
struct OpenedStream {
    format: AudioFormat,
    sample_format: SampleFormat,
}

impl CpalMicSource {
    /// Create a capture for the system default microphone.
    pub fn default_device() -> Result<Self, CaptureError> {
        let device = find_input_device(None)?;
        let display_name = device.name().unwrap_or_else(|_| "Default Microphone".into());
        Ok(Self::build(None, display_name))
    }

    /// Create a capture for a specific microphone by device name.
    pub fn with_device(name: String) -> Self {
        Self::build(Some(name.clone()), name)
    }

    fn build(device_name: Option<String>, display_name: String) -> Self {
        Self {
            device_name,
            display_name,
            opened: None,
            buffer: Arc::new(SharedBuffer::new(1)),
            running: Arc::new(AtomicBool::new(false)),
            stream_thread: None,
            reported_drops: 0,
        }
    }

    fn halt_stream(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.stream_thread.take() {
            handle.thread().unpark();
            if handle.join().is_err() {
                log::error!("Input stream thread panicked");
            }
        }
    }
}

impl SampleSource for CpalMicSource {
    fn open(&mut self, format: &AudioFormat) -> Result<usize, CaptureError> {
        format.validate()?;
        if format.bits_per_sample != 16 {
            return Err(CaptureError::ConfigurationFailed(format!(
                "{}-bit capture is not supported, use 16-bit",
                format.bits_per_sample
            )));
        }
        let min_buffer = format.min_buffer_size()?;

        let device = find_input_device(self.device_name.as_deref())?;
        let ranges: Vec<SupportedStreamConfigRange> = match device.supported_input_configs() {
            Ok(configs) => configs.collect(),
            Err(cpal::SupportedStreamConfigsError::DeviceNotAvailable) => {
                return Err(CaptureError::DeviceNotAvailable)
            }
            Err(e) if looks_like_denial(&e.to_string()) => return Err(CaptureError::PermissionDenied),
            Err(e) => {
                return Err(CaptureError::ConfigurationFailed(format!(
                    "failed to query input configs: {}",
                    e
                )))
            }
        };

        let sample_format = select_sample_format(&ranges, format).ok_or_else(|| {
            CaptureError::ConfigurationFailed(format!(
                "{} does not support {} Hz with {} channel(s)",
                self.display_name, format.sample_rate_hz, format.channel_count
            ))
        })?;

        let capacity = (format.byte_rate() as usize)
            .saturating_mul(BUFFER_SECONDS)
            .max(min_buffer);
        self.buffer = Arc::new(SharedBuffer::new(capacity));
        self.reported_drops = 0;
        self.opened = Some(OpenedStream {
            format: *format,
            sample_format,
        });

        log::info!(
            "Opened {}: {} Hz, {} ch, device samples {:?}, min buffer {} bytes",
            self.display_name,
            format.sample_rate_hz,
            format.channel_count,
            sample_format,
            min_buffer
        );
        Ok(min_buffer)
    }

    fn start(&mut self) -> Result<(), CaptureError> {
        let Some(opened) = self.opened else {
            return Err(CaptureError::InvalidState("microphone is not open".into()));
        };
        if self.running.load(Ordering::SeqCst) {
            return Err(CaptureError::InvalidState("mic capture already running".into()));
        }

        self.buffer.reset();
        self.reported_drops = 0;
        self.running.store(true, Ordering::SeqCst);

        let running = Arc::clone(&self.running);
        let buffer = Arc::clone(&self.buffer);
        let device_name = self.device_name.clone();
        let (ready_tx, ready_rx) = mpsc::channel();

        let handle = thread::Builder::new()
            .name("cpal-input-stream".into())
            .spawn(move || {
                let stream = match open_stream(device_name.as_deref(), opened, buffer) {
                    Ok(stream) => stream,
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                        return;
                    }
                };
                let _ = ready_tx.send(Ok(()));

                while running.load(Ordering::SeqCst) {
                    thread::park_timeout(READ_TIMEOUT);
                }
                if let Err(e) = stream.pause() {
                    log::debug!("Failed to pause input stream: {}", e);
                }
                drop(stream);
            })
            .map_err(|e| {
                self.running.store(false, Ordering::SeqCst);
                CaptureError::DeviceFailed(format!("failed to spawn stream thread: {}", e))
            })?;
        self.stream_thread = Some(handle);

        let started = ready_rx
            .recv()
            .unwrap_or_else(|_| Err(CaptureError::DeviceFailed("input stream thread exited".into())));
        if let Err(e) = started {
            self.halt_stream();
            return Err(e);
        }

        log::info!("Microphone capture started on {}", self.display_name);
        Ok(())
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize, CaptureError> {
        if let Some(message) = self.buffer.fault() {
            return Err(CaptureError::DeviceFailed(message));
        }

        let n = self.buffer.read(buf, READ_TIMEOUT);

        let dropped = self.buffer.dropped();
        if dropped > self.reported_drops {
            log::warn!(
                "Capture buffer overflow: {} bytes dropped so far",
                dropped
            );
            self.reported_drops = dropped;
        }

        if n == 0 {
            if let Some(message) = self.buffer.fault() {
                return Err(CaptureError::DeviceFailed(message));
            }
        }
        Ok(n)
    }

    fn stop(&mut self) -> Result<(), CaptureError> {
        self.halt_stream();
        Ok(())
    }

    fn release(&mut self) -> Result<(), CaptureError> {
        self.halt_stream();
        if self.opened.take().is_some() {
            self.buffer = Arc::new(SharedBuffer::new(1));
            log::debug!("Released {}", self.display_name);
        }
        Ok(())
    }

    fn device_info(&self) -> AudioDevice {
        AudioDevice {
            id: self.device_name.clone().unwrap_or_else(|| "default-mic".into()),
            name: self.display_name.clone(),
            is_default: self.device_name.is_none(),
        }
    }
}

impl Drop for CpalMicSource {
    fn drop(&mut self) {
        self.halt_stream();
    }
}

/// Pick the preferred device sample format able to deliver `format`.
fn select_sample_format(ranges: &[SupportedStreamConfigRange], format: &AudioFormat) -> Option<SampleFormat> {
    SUPPORTED_SAMPLE_FORMATS.into_iter().find(|wanted| {
        ranges.iter().any(|range| {
            range.sample_format() == *wanted
                && range.channels() == format.channel_count
                && range.min_sample_rate().0 <= format.sample_rate_hz
                && format.sample_rate_hz <= range.max_sample_rate().0
        })
    })
}

/// Build and play an input stream. Runs on the stream thread.
fn open_stream(
    device_name: Option<&str>,
    opened: OpenedStream,
    buffer: Arc<SharedBuffer>,
) -> Result<cpal::Stream, CaptureError> {
    let device = find_input_device(device_name)?;
    let config = StreamConfig {
        channels: opened.format.channel_count,
        sample_rate: cpal::SampleRate(opened.format.sample_rate_hz),
        buffer_size: cpal::BufferSize::Default,
    };

    let stream = match opened.sample_format {
        SampleFormat::I16 => build_stream::<i16, _>(&device, &config, buffer, pcm::extend_pcm16_from_i16),
        SampleFormat::F32 => build_stream::<f32, _>(&device, &config, buffer, pcm::extend_pcm16_from_f32),
        SampleFormat::U16 => build_stream::<u16, _>(&device, &config, buffer, extend_pcm16_from_u16),
        other => {
            return Err(CaptureError::ConfigurationFailed(format!(
                "unsupported device sample format {:?}",
                other
            )))
        }
    }
    .map_err(map_build_error)?;

    stream.play().map_err(|e| {
        let message = e.to_string();
        if looks_like_denial(&message) {
            CaptureError::PermissionDenied
        } else {
            CaptureError::DeviceFailed(format!("failed to start input stream: {}", message))
        }
    })?;
    Ok(stream)
}

fn build_stream<T, F>(
    device: &cpal::Device,
    config: &StreamConfig,
    buffer: Arc<SharedBuffer>,
    convert: F,
) -> Result<cpal::Stream, cpal::BuildStreamError>
where
    T: cpal::SizedSample,
    F: Fn(&mut Vec<u8>, &[T]) + Send + 'static,
{
    let data_buffer = Arc::clone(&buffer);
    let mut scratch = Vec::new();

    device.build_input_stream(
        config,
        move |data: &[T], _: &cpal::InputCallbackInfo| {
            scratch.clear();
            convert(&mut scratch, data);
            data_buffer.push(&scratch);
        },
        move |err| {
            log::error!("Input stream error: {}", err);
            buffer.fail(err.to_string());
        },
        None,
    )
}

fn map_build_error(err: cpal::BuildStreamError) -> CaptureError {
    match err {
        cpal::BuildStreamError::DeviceNotAvailable => CaptureError::DeviceNotAvailable,
        cpal::BuildStreamError::StreamConfigNotSupported | cpal::BuildStreamError::InvalidArgument => {
            CaptureError::ConfigurationFailed(format!("failed to build input stream: {}", err))
        }
        other => {
            let message = other.to_string();
            if looks_like_denial(&message) {
                CaptureError::PermissionDenied
            } else {
                CaptureError::DeviceFailed(format!("failed to build input stream: {}", message))
            }
        }
    }
}

/// Offset-binary u16 samples to signed PCM16 LE.
fn extend_pcm16_from_u16(out: &mut Vec<u8>, samples: &[u16]) {
    out.reserve(samples.len() * 2);
    for &sample in samples {
        let signed = (i32::from(sample) - 32768) as i16;
        out.extend_from_slice(&signed.to_le_bytes());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cpal::{SampleRate, SupportedBufferSize};

    fn range(channels: u16, min: u32, max: u32, sample_format: SampleFormat) -> SupportedStreamConfigRange {
        SupportedStreamConfigRange::new(
            channels,
            SampleRate(min),
            SampleRate(max),
            SupportedBufferSize::Unknown,
            sample_format,
        )
    }

    #[test]
    fn prefers_native_i16() {
        let ranges = vec![
            range(1, 8000, 48000, SampleFormat::F32),
            range(1, 8000, 48000, SampleFormat::I16),
        ];
        let format = AudioFormat::cd_mono();
        assert_eq!(select_sample_format(&ranges, &format), Some(SampleFormat::I16));
    }

    #[test]
    fn falls_back_to_f32() {
        let ranges = vec![range(2, 44100, 48000, SampleFormat::F32)];
        let format = AudioFormat::new(48000, 2, 16);
        assert_eq!(select_sample_format(&ranges, &format), Some(SampleFormat::F32));
    }

    #[test]
    fn rejects_mismatched_channels_and_rate() {
        let ranges = vec![
            range(2, 8000, 48000, SampleFormat::I16),
            range(1, 48000, 48000, SampleFormat::I16),
        ];
        let format = AudioFormat::cd_mono();
        assert_eq!(select_sample_format(&ranges, &format), None);
    }

    #[test]
    fn ignores_unconvertible_sample_formats() {
        let ranges = vec![range(1, 8000, 48000, SampleFormat::I32)];
        assert_eq!(select_sample_format(&ranges, &AudioFormat::cd_mono()), None);
    }

    #[test]
    fn u16_samples_are_recentred() {
        let mut out = Vec::new();
        extend_pcm16_from_u16(&mut out, &[0, 32768, 65535]);
        assert_eq!(out, vec![0x00, 0x80, 0x00, 0x00, 0xFF, 0x7F]);
    }

    #[test]
    fn build_errors_map_to_capture_errors() {
        assert_eq!(
            map_build_error(cpal::BuildStreamError::DeviceNotAvailable),
            CaptureError::DeviceNotAvailable
        );
        assert!(matches!(
            map_build_error(cpal::BuildStreamError::StreamConfigNotSupported),
            CaptureError::ConfigurationFailed(_)
        ));
    }

    #[test]
    fn unopened_source_cannot_start() {
        let mut source = CpalMicSource::with_device("nonexistent".into());
        assert!(matches!(source.start(), Err(CaptureError::InvalidState(_))));
        assert!(source.release().is_ok());
        assert!(source.release().is_ok());
    }

    #[test]
    fn named_device_info() {
        let source = CpalMicSource::with_device("USB Mic".into());
        let info = source.device_info();
        assert_eq!(info.id, "USB Mic");
        assert_eq!(info.name, "USB Mic");
        assert!(!info.is_default);
    }
}
