//! Caller-side session tracking
//!
//! This module turns the callback stream of one recognition session into a
//! queryable snapshot:
//! - Session identity and timing
//! - Live interim preview and final segments
//! - Last error and end-of-session state

mod feed;
mod stats;

pub use feed::{TranscriptFeed, TranscriptSnapshot};
pub use stats::{SessionStats, TranscriptSegment};
