use anyhow::{Context, Result};
use std::io::Cursor;
use tokio::sync::mpsc;
use tracing::{debug, info};

use super::backend::AudioFrame;

/// Clip buffering configuration
#[derive(Debug, Clone)]
pub struct ClipConfig {
    /// Duration of each buffered slice in milliseconds (default: 250)
    pub slice_duration_ms: u64,
}

impl Default for ClipConfig {
    fn default() -> Self {
        Self {
            slice_duration_ms: 250,
        }
    }
}

/// A closed or open slice of captured audio
#[derive(Debug, Clone)]
pub struct AudioSlice {
    /// Slice number (0-indexed)
    pub index: usize,
    /// Start time in milliseconds since capture started
    pub start_ms: u64,
    /// Timestamp of the last frame in this slice
    pub end_ms: u64,
    pub samples: Vec<i16>,
}

/// One finalized recording, ready for upload
#[derive(Debug, Clone, PartialEq)]
pub struct AudioClip {
    pub sample_rate: u32,
    pub channels: u16,
    pub samples: Vec<i16>,
}

impl AudioClip {
    pub fn duration_ms(&self) -> u64 {
        let per_second = self.sample_rate as u64 * self.channels.max(1) as u64;
        if per_second == 0 {
            return 0;
        }
        self.samples.len() as u64 * 1000 / per_second
    }

    /// Encode as 16-bit PCM WAV in memory
    pub fn to_wav(&self) -> Result<Vec<u8>> {
        let spec = hound::WavSpec {
            channels: self.channels,
            sample_rate: self.sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };

        let mut cursor = Cursor::new(Vec::new());
        {
            let mut writer = hound::WavWriter::new(&mut cursor, spec)
                .context("Failed to create WAV writer")?;
            for &sample in &self.samples {
                writer
                    .write_sample(sample)
                    .context("Failed to write sample to WAV")?;
            }
            writer.finalize().context("Failed to finalize WAV data")?;
        }

        Ok(cursor.into_inner())
    }
}

/// Buffers capture frames in fixed-duration slices
///
/// Closed slices are kept as they fill up, so whatever was captured before an
/// abrupt stop still ends up in the clip.
pub struct ClipRecorder {
    config: ClipConfig,
    slices: Vec<AudioSlice>,
    current: Option<AudioSlice>,
    sample_rate: u32,
    channels: u16,
}

impl ClipRecorder {
    pub fn new(config: ClipConfig) -> Self {
        Self {
            config,
            slices: Vec::new(),
            current: None,
            sample_rate: 0,
            channels: 0,
        }
    }

    /// Add a frame, rotating to a new slice when the current one is full
    pub fn push(&mut self, frame: &AudioFrame) {
        if self.sample_rate == 0 {
            self.sample_rate = frame.sample_rate;
            self.channels = frame.channels;
        }

        if self.should_start_new_slice(frame) {
            if let Some(slice) = self.current.take() {
                debug!(
                    "Slice {} closed: {}ms - {}ms ({} samples)",
                    slice.index,
                    slice.start_ms,
                    slice.end_ms,
                    slice.samples.len()
                );
                self.slices.push(slice);
            }

            self.current = Some(AudioSlice {
                index: self.slices.len(),
                start_ms: frame.timestamp_ms,
                end_ms: frame.timestamp_ms,
                samples: Vec::new(),
            });
        }

        if let Some(slice) = &mut self.current {
            slice.samples.extend_from_slice(&frame.samples);
            slice.end_ms = frame.timestamp_ms;
        }
    }

    /// Drain frames from a capture channel until it closes
    pub async fn record(&mut self, mut audio_rx: mpsc::Receiver<AudioFrame>) {
        while let Some(frame) = audio_rx.recv().await {
            self.push(&frame);
        }
    }

    fn should_start_new_slice(&self, frame: &AudioFrame) -> bool {
        match &self.current {
            None => true,
            Some(slice) => {
                frame.timestamp_ms.saturating_sub(slice.start_ms) >= self.config.slice_duration_ms
            }
        }
    }

    /// Number of slices, including the one still being filled
    pub fn slice_count(&self) -> usize {
        self.slices.len() + usize::from(self.current.is_some())
    }

    pub fn slices(&self) -> &[AudioSlice] {
        &self.slices
    }

    /// Concatenate every slice into one clip and reset the recorder
    ///
    /// Returns `None` if nothing was captured.
    pub fn finish(&mut self) -> Option<AudioClip> {
        if let Some(slice) = self.current.take() {
            self.slices.push(slice);
        }

        let slices = std::mem::take(&mut self.slices);
        let samples: Vec<i16> = slices.into_iter().flat_map(|s| s.samples).collect();
        let sample_rate = std::mem::take(&mut self.sample_rate);
        let channels = std::mem::take(&mut self.channels);

        if samples.is_empty() {
            return None;
        }

        let clip = AudioClip {
            sample_rate,
            channels,
            samples,
        };
        info!(
            "Clip finalized: {}ms, {}Hz, {} channels",
            clip.duration_ms(),
            clip.sample_rate,
            clip.channels
        );
        Some(clip)
    }
}
