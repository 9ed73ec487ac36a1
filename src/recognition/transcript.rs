use serde::{Deserialize, Serialize};

/// One candidate transcription of a segment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alternative {
    pub transcript: String,
    #[serde(default)]
    pub confidence: f32,
}

/// Pick the alternative with the highest confidence
///
/// Ties go to the first-listed alternative. Returns `None` for an empty list.
pub fn best_alternative(alternatives: &[Alternative]) -> Option<&Alternative> {
    let mut best: Option<&Alternative> = None;
    for alt in alternatives {
        match best {
            Some(current) if alt.confidence <= current.confidence => {}
            _ => best = Some(alt),
        }
    }
    best
}

/// Append-only concatenation of a session's final segments
#[derive(Debug, Clone, Default)]
pub struct TranscriptAccumulator {
    text: String,
    segments: usize,
}

impl TranscriptAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a final segment; returns the trimmed segment that was added
    pub fn push(&mut self, segment: &str) -> Option<String> {
        let segment = segment.trim();
        if segment.is_empty() {
            return None;
        }

        if !self.text.is_empty() {
            self.text.push(' ');
        }
        self.text.push_str(segment);
        self.segments += 1;

        Some(segment.to_string())
    }

    /// Accumulated text followed by a live interim fragment, never stored
    pub fn preview(&self, interim: &str) -> String {
        let interim = interim.trim();
        match (self.text.is_empty(), interim.is_empty()) {
            (true, _) => interim.to_string(),
            (false, true) => self.text.clone(),
            (false, false) => format!("{} {}", self.text, interim),
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn segment_count(&self) -> usize {
        self.segments
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    pub fn clear(&mut self) {
        self.text.clear();
        self.segments = 0;
    }
}
