// Integration tests for clip recording
//
// These tests verify that capture frames are buffered in time-based slices
// and concatenated into one WAV clip for upload.

use anyhow::Result;
use speech_entry::audio::{AudioFrame, ClipConfig, ClipRecorder};
use std::io::Cursor;
use tokio::sync::mpsc;

/// 100ms of 16kHz mono audio at `index * 100` ms
fn frame(index: u64, value: i16) -> AudioFrame {
    AudioFrame {
        samples: vec![value; 1600],
        sample_rate: 16000,
        channels: 1,
        timestamp_ms: index * 100,
    }
}

#[test]
fn test_slices_rotate_on_duration() {
    let mut recorder = ClipRecorder::new(ClipConfig {
        slice_duration_ms: 250,
    });

    // 0, 100, 200 | 300, 400, 500 | 600
    for i in 0..7 {
        recorder.push(&frame(i, 1));
    }

    assert_eq!(recorder.slice_count(), 3);
    let closed = recorder.slices();
    assert_eq!(closed.len(), 2);
    assert_eq!(closed[0].index, 0);
    assert_eq!(closed[0].start_ms, 0);
    assert_eq!(closed[0].end_ms, 200);
    assert_eq!(closed[0].samples.len(), 4800);
    assert_eq!(closed[1].index, 1);
    assert_eq!(closed[1].start_ms, 300);
}

#[test]
fn test_finish_concatenates_in_order() {
    let mut recorder = ClipRecorder::new(ClipConfig::default());
    for i in 0..6 {
        recorder.push(&frame(i, i as i16));
    }

    let clip = recorder.finish().expect("audio was captured");

    assert_eq!(clip.sample_rate, 16000);
    assert_eq!(clip.channels, 1);
    assert_eq!(clip.samples.len(), 6 * 1600);
    assert_eq!(clip.duration_ms(), 600);
    assert_eq!(clip.samples[0], 0);
    assert_eq!(clip.samples[5 * 1600], 5);

    // The recorder is reset for the next session
    assert_eq!(recorder.slice_count(), 0);
    assert!(recorder.finish().is_none());
}

#[test]
fn test_empty_recording_has_no_clip() {
    let mut recorder = ClipRecorder::new(ClipConfig::default());
    assert_eq!(recorder.slice_count(), 0);
    assert!(recorder.finish().is_none());
}

#[test]
fn test_clip_encodes_as_wav() -> Result<()> {
    let mut recorder = ClipRecorder::new(ClipConfig::default());
    for i in 0..3 {
        recorder.push(&frame(i, 42));
    }
    let clip = recorder.finish().expect("audio was captured");

    let wav = clip.to_wav()?;
    assert_eq!(&wav[..4], b"RIFF");

    let reader = hound::WavReader::new(Cursor::new(wav))?;
    let spec = reader.spec();
    assert_eq!(spec.sample_rate, 16000);
    assert_eq!(spec.channels, 1);
    assert_eq!(spec.bits_per_sample, 16);

    let samples = reader.into_samples::<i16>().collect::<Result<Vec<_>, _>>()?;
    assert_eq!(samples.len(), 3 * 1600);
    assert!(samples.iter().all(|&s| s == 42));
    Ok(())
}

#[tokio::test]
async fn test_record_drains_channel() -> Result<()> {
    let (tx, rx) = mpsc::channel(16);

    let handle = tokio::spawn(async move {
        let mut recorder = ClipRecorder::new(ClipConfig::default());
        recorder.record(rx).await;
        recorder.finish()
    });

    for i in 0..10 {
        tx.send(frame(i, 7)).await?;
    }
    drop(tx);

    let clip = handle.await?.expect("audio was captured");
    assert_eq!(clip.duration_ms(), 1000);
    Ok(())
}
