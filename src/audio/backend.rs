use anyhow::Result;
use tokio::sync::mpsc;

use crate::recognition::RecognitionError;

/// Audio sample data (16-bit PCM, interleaved)
#[derive(Debug, Clone)]
pub struct AudioFrame {
    /// Raw audio samples (i16 PCM, interleaved)
    pub samples: Vec<i16>,
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Number of channels
    pub channels: u16,
    /// Timestamp in milliseconds since capture started
    pub timestamp_ms: u64,
}

impl AudioFrame {
    pub fn duration_ms(&self) -> u64 {
        let per_second = self.sample_rate as u64 * self.channels.max(1) as u64;
        if per_second == 0 {
            return 0;
        }
        self.samples.len() as u64 * 1000 / per_second
    }
}

/// Configuration for audio backend
#[derive(Debug, Clone)]
pub struct AudioBackendConfig {
    /// Target sample rate (will resample if needed)
    pub target_sample_rate: u32,
    /// Target channel count (1 = mono, 2 = stereo)
    pub target_channels: u16,
    /// Buffer size in milliseconds (affects latency)
    pub buffer_duration_ms: u64,
}

impl Default for AudioBackendConfig {
    fn default() -> Self {
        Self {
            target_sample_rate: 16000, // 16kHz for Whisper
            target_channels: 1,        // Mono
            buffer_duration_ms: 100,   // 100ms buffers
        }
    }
}

/// Why capture hardware could not be acquired
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CaptureError {
    #[error("permission denied: {0}")]
    PermissionDenied(String),
    #[error("no capture device: {0}")]
    DeviceNotFound(String),
    #[error("capture device busy: {0}")]
    DeviceBusy(String),
    #[error("capture failed: {0}")]
    Other(String),
}

impl From<CaptureError> for RecognitionError {
    fn from(err: CaptureError) -> Self {
        match err {
            CaptureError::PermissionDenied(_) => RecognitionError::PermissionDenied(
                "Allow microphone access in your system settings and try again.".to_string(),
            ),
            CaptureError::DeviceNotFound(detail) => RecognitionError::AudioCapture(detail),
            CaptureError::DeviceBusy(detail) => RecognitionError::AudioCapture(format!(
                "{detail} (close other applications using the microphone)"
            )),
            CaptureError::Other(detail) => RecognitionError::AudioCapture(detail),
        }
    }
}

/// Audio capture backend trait
///
/// The capture handle is held from a successful `start` until `stop`.
/// Implementations:
/// - File: plays a WAV file as capture frames (testing/batch processing)
/// - Microphone backends behind the same contract
#[async_trait::async_trait]
pub trait AudioBackend: Send + Sync {
    /// Whether capture hardware exists at all (no permission prompt)
    fn is_available(&self) -> bool;

    /// Start capturing audio
    ///
    /// Returns a channel receiver that will receive audio frames
    async fn start(&mut self) -> Result<mpsc::Receiver<AudioFrame>, CaptureError>;

    /// Stop capturing audio and release the capture handle
    async fn stop(&mut self) -> Result<()>;

    /// Check if backend is currently capturing
    fn is_capturing(&self) -> bool;

    /// Get backend name for logging
    fn name(&self) -> &str;
}

/// Stand-in when no capture device is configured
///
/// Reports itself unavailable, so anything depending on capture is
/// unsupported rather than failing mid-session.
#[derive(Debug, Default)]
pub struct NullBackend;

#[async_trait::async_trait]
impl AudioBackend for NullBackend {
    fn is_available(&self) -> bool {
        false
    }

    async fn start(&mut self) -> Result<mpsc::Receiver<AudioFrame>, CaptureError> {
        Err(CaptureError::DeviceNotFound(
            "no audio capture device is configured".to_string(),
        ))
    }

    async fn stop(&mut self) -> Result<()> {
        Ok(())
    }

    fn is_capturing(&self) -> bool {
        false
    }

    fn name(&self) -> &str {
        "No capture device"
    }
}
