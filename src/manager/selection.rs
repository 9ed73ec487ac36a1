use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::recognition::{ProviderId, RecognitionError};

/// Which provider the manager should use for the next session
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderPreference {
    /// Always the local provider; the paid remote provider is never chosen
    /// automatically
    #[default]
    Auto,
    Local,
    /// Remote when supported, otherwise falls back to local
    Remote,
}

impl ProviderPreference {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderPreference::Auto => "auto",
            ProviderPreference::Local => "local",
            ProviderPreference::Remote => "remote",
        }
    }
}

impl From<ProviderId> for ProviderPreference {
    fn from(id: ProviderId) -> Self {
        match id {
            ProviderId::Local => ProviderPreference::Local,
            ProviderId::Remote => ProviderPreference::Remote,
        }
    }
}

impl fmt::Display for ProviderPreference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderPreference {
    type Err = RecognitionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "auto" => Ok(ProviderPreference::Auto),
            other => other.parse::<ProviderId>().map(ProviderPreference::from),
        }
    }
}
