//! Recognition manager
//!
//! The single start/stop/status surface exposed to callers:
//! - Resolves the provider for each session from the configured preference
//! - Runs every transcript callback through the shared normalizer
//! - Keeps at most one live session across all providers

mod manager;
mod selection;

pub use manager::RecognitionManager;
pub use selection::ProviderPreference;
