// Integration tests for audio file processing
//
// These tests verify that we can read WAV files, split them into capture
// frames and stream them through the file capture backend.

use anyhow::Result;
use speech_entry::audio::{AudioBackend, AudioBackendConfig, AudioFile, CaptureError, FileBackend};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Write a 16-bit PCM WAV with a simple ramp
fn write_wav(path: &Path, sample_rate: u32, channels: u16, seconds: f64) -> Result<usize> {
    let spec = hound::WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let count = (sample_rate as f64 * seconds) as usize * channels as usize;

    let mut writer = hound::WavWriter::create(path, spec)?;
    for i in 0..count {
        writer.write_sample((i % 1000) as i16)?;
    }
    writer.finalize()?;
    Ok(count)
}

#[test]
fn test_audio_file_open() -> Result<()> {
    let dir = TempDir::new()?;
    let path = dir.path().join("groceries.wav");
    let count = write_wav(&path, 16000, 1, 1.5)?;

    let audio = AudioFile::open(&path)?;

    assert!((audio.duration_seconds - 1.5).abs() < 0.001);
    assert_eq!(audio.sample_rate, 16000);
    assert_eq!(audio.channels, 1);
    assert_eq!(audio.samples.len(), count);
    assert!(audio.path.contains("groceries.wav"));

    Ok(())
}

#[test]
fn test_audio_file_nonexistent() {
    let path = PathBuf::from("/nonexistent/path/to/audio.wav");
    let result = AudioFile::open(&path);

    assert!(result.is_err(), "Opening nonexistent file should fail");
}

#[test]
fn test_frames_are_converted_to_target_format() -> Result<()> {
    let dir = TempDir::new()?;
    let path = dir.path().join("stereo.wav");
    write_wav(&path, 48000, 2, 1.0)?;

    let audio = AudioFile::open(&path)?;
    let frames = audio.frames(&AudioBackendConfig::default());

    // 1s in 100ms buffers
    assert_eq!(frames.len(), 10);
    for (i, frame) in frames.iter().enumerate() {
        assert_eq!(frame.sample_rate, 16000);
        assert_eq!(frame.channels, 1);
        assert_eq!(frame.samples.len(), 1600);
        assert_eq!(frame.timestamp_ms, i as u64 * 100);
    }

    Ok(())
}

#[test]
fn test_trailing_partial_frame_is_kept() -> Result<()> {
    let dir = TempDir::new()?;
    let path = dir.path().join("short.wav");
    write_wav(&path, 16000, 1, 0.25)?;

    let frames = AudioFile::open(&path)?.frames(&AudioBackendConfig::default());

    assert_eq!(frames.len(), 3);
    assert_eq!(frames[2].samples.len(), 800);
    Ok(())
}

#[tokio::test]
async fn test_file_backend_streams_all_frames() -> Result<()> {
    let dir = TempDir::new()?;
    let path = dir.path().join("clip.wav");
    write_wav(&path, 16000, 1, 0.5)?;

    let mut backend = FileBackend::new(&path, AudioBackendConfig::default());
    assert!(backend.is_available());

    let mut rx = backend.start().await?;
    assert!(backend.is_capturing());

    let mut received = 0;
    while received < 5 {
        match tokio::time::timeout(std::time::Duration::from_secs(1), rx.recv()).await? {
            Some(frame) => {
                assert_eq!(frame.samples.len(), 1600);
                received += 1;
            }
            None => break,
        }
    }
    assert_eq!(received, 5);

    // A second acquisition while capturing is refused
    assert!(matches!(
        backend.start().await,
        Err(CaptureError::DeviceBusy(_))
    ));

    backend.stop().await?;
    assert!(!backend.is_capturing());
    assert!(rx.recv().await.is_none(), "Channel closes once released");

    Ok(())
}

#[tokio::test]
async fn test_file_backend_missing_file() {
    let mut backend = FileBackend::new("/nonexistent/clip.wav", AudioBackendConfig::default());

    assert!(!backend.is_available());
    assert!(matches!(
        backend.start().await,
        Err(CaptureError::DeviceNotFound(_))
    ));
    assert!(!backend.is_capturing());
}
