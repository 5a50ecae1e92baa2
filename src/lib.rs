//! Kovari Compat - travel compatibility scoring service
//!
//! This library extracts normalized compatibility features for a solo traveler
//! against another traveler or a group, and turns them into an ML score through
//! a model server with a subprocess fallback. Observed outcomes are logged as
//! training events.

pub mod config;
pub mod core;
pub mod models;
pub mod routes;
pub mod services;

// Re-export commonly used types
pub use core::{extract_features, CompatibilityScorer, ScoredCompatibility};
pub use models::{
    CompatibilityFeatureVector, GroupEntity, MatchTarget, MatchType, NormalizedScore, PredictOptions,
    PredictionResult, RawFeatureVector, SoloEntity,
};
pub use services::{MatchEventLogger, PredictionClient, PredictionError};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_library_exports() {
        // Verify that the library exports work correctly
        let empty = SoloEntity::default();
        let vector = extract_features(&empty, MatchTarget::Solo(&empty));
        assert_eq!(vector.match_type(), MatchType::SoloSolo);
        assert!(vector.is_valid());
    }
}
