use anyhow::{Context, Result};
use hound::WavReader;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use super::backend::{AudioBackend, AudioBackendConfig, AudioFrame, CaptureError};
use super::convert::process_frame;

pub struct AudioFile {
    pub path: String,
    pub duration_seconds: f64,
    pub sample_rate: u32,
    pub channels: u16,
    pub samples: Vec<i16>,
}

impl AudioFile {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        info!("Opening audio file: {}", path.display());

        let reader = WavReader::open(path)
            .context("Failed to open WAV file")?;

        let spec = reader.spec();
        let samples: Vec<i16> = reader
            .into_samples::<i16>()
            .collect::<Result<Vec<_>, _>>()
            .context("Failed to read audio samples")?;

        let duration_seconds = samples.len() as f64 /
            (spec.sample_rate as f64 * spec.channels as f64);

        info!(
            "Audio file loaded: {:.1}s, {}Hz, {} channels, {} samples",
            duration_seconds,
            spec.sample_rate,
            spec.channels,
            samples.len()
        );

        Ok(Self {
            path: path.display().to_string(),
            duration_seconds,
            sample_rate: spec.sample_rate,
            channels: spec.channels,
            samples,
        })
    }

    /// Split the file into capture-sized frames in the target format
    pub fn frames(&self, config: &AudioBackendConfig) -> Vec<AudioFrame> {
        let channels = self.channels.max(1) as usize;
        let per_frame = (self.sample_rate as u64 * config.buffer_duration_ms / 1000).max(1) as usize
            * channels;

        self.samples
            .chunks(per_frame)
            .enumerate()
            .map(|(i, chunk)| {
                let frame = AudioFrame {
                    samples: chunk.to_vec(),
                    sample_rate: self.sample_rate,
                    channels: self.channels,
                    timestamp_ms: i as u64 * config.buffer_duration_ms,
                };
                process_frame(frame, config.target_sample_rate, config.target_channels)
            })
            .collect()
    }
}

/// Capture backend that plays a WAV file as if it came from a microphone
///
/// After the file is exhausted the backend keeps the handle open (silence)
/// until `stop`, like a live device would.
pub struct FileBackend {
    path: PathBuf,
    config: AudioBackendConfig,
    /// Pace frames at real time instead of sending them all at once
    realtime: bool,
    task: Option<JoinHandle<()>>,
}

impl FileBackend {
    pub fn new(path: impl Into<PathBuf>, config: AudioBackendConfig) -> Self {
        Self {
            path: path.into(),
            config,
            realtime: false,
            task: None,
        }
    }

    pub fn realtime(mut self, realtime: bool) -> Self {
        self.realtime = realtime;
        self
    }
}

#[async_trait::async_trait]
impl AudioBackend for FileBackend {
    fn is_available(&self) -> bool {
        self.path.exists()
    }

    async fn start(&mut self) -> Result<mpsc::Receiver<AudioFrame>, CaptureError> {
        if self.task.is_some() {
            return Err(CaptureError::DeviceBusy(format!(
                "{} is already capturing",
                self.path.display()
            )));
        }

        if !self.path.exists() {
            return Err(CaptureError::DeviceNotFound(format!(
                "audio file {} does not exist",
                self.path.display()
            )));
        }

        let audio = AudioFile::open(&self.path)
            .map_err(|e| CaptureError::Other(format!("{e:#}")))?;
        let frames = audio.frames(&self.config);
        let pace = self
            .realtime
            .then(|| Duration::from_millis(self.config.buffer_duration_ms));

        info!(
            "File capture started: {} ({} frames)",
            self.path.display(),
            frames.len()
        );

        let (tx, rx) = mpsc::channel(100);
        self.task = Some(tokio::spawn(async move {
            for frame in frames {
                if let Some(pace) = pace {
                    tokio::time::sleep(pace).await;
                }
                if tx.send(frame).await.is_err() {
                    return;
                }
            }
            tx.closed().await;
        }));

        Ok(rx)
    }

    async fn stop(&mut self) -> Result<()> {
        match self.task.take() {
            Some(task) => {
                task.abort();
                info!("File capture stopped: {}", self.path.display());
            }
            None => warn!("File capture was not running"),
        }
        Ok(())
    }

    fn is_capturing(&self) -> bool {
        self.task.is_some()
    }

    fn name(&self) -> &str {
        "WAV file"
    }
}
