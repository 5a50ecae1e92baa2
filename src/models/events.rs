use serde::{Deserialize, Serialize};

use crate::models::features::{CompatibilityFeatureVector, MatchType};

/// What the user did with a suggested match
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchOutcome {
    Accept,
    Chat,
    Ignore,
    Unmatch,
}

impl MatchOutcome {
    /// Binary training label: positive engagement is 1
    pub fn label(self) -> u8 {
        match self {
            MatchOutcome::Accept | MatchOutcome::Chat => 1,
            MatchOutcome::Ignore | MatchOutcome::Unmatch => 0,
        }
    }
}

/// Where a logged event came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EventSource {
    #[default]
    Live,
    RuleBased,
    Synthetic,
}

/// Training record for one observed match outcome. Written once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchEventLog {
    #[serde(rename = "matchType")]
    pub match_type: MatchType,
    pub features: CompatibilityFeatureVector,
    pub outcome: MatchOutcome,
    pub label: u8,
    pub preset: String,
    /// Milliseconds since the Unix epoch
    pub timestamp: i64,
    pub source: EventSource,
}

impl MatchEventLog {
    pub fn with_source(mut self, source: EventSource) -> Self {
        self.source = source;
        self
    }
}
