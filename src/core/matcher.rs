use std::collections::HashMap;
use std::sync::Arc;

use crate::core::extractor::extract_features;
use crate::core::normalize::{coerce, count_active_features};
use crate::models::{
    CompatibilityFeatureVector, GroupEntity, MatchTarget, PredictOptions, PredictionResult,
    RawFeatureVector, SoloEntity,
};
use crate::services::PredictionClient;

/// Outcome of scoring one pair
#[derive(Debug, Clone)]
pub struct ScoredCompatibility {
    pub features: CompatibilityFeatureVector,
    pub active_features: usize,
    pub prediction: PredictionResult,
}

impl ScoredCompatibility {
    /// ML score, or `None` when the caller should use rule-based scoring
    pub fn score(&self) -> Option<f64> {
        self.prediction.score().map(|score| score.value())
    }
}

/// Main compatibility orchestrator
///
/// # Pipeline Stages
/// 1. Feature extraction
/// 2. Schema validation (repairing the vector if needed)
/// 3. ML prediction through the configured transports
#[derive(Clone)]
pub struct CompatibilityScorer {
    client: Arc<PredictionClient>,
}

impl CompatibilityScorer {
    pub fn new(client: Arc<PredictionClient>) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &PredictionClient {
        &self.client
    }

    /// Extract and validate features for one pair
    pub fn features(&self, user: &SoloEntity, target: MatchTarget<'_>) -> CompatibilityFeatureVector {
        let vector = extract_features(user, target);
        if vector.is_valid() {
            return vector;
        }

        tracing::warn!(match_type = %vector.match_type(), "Extracted features failed validation, repairing");
        coerce(&RawFeatureVector::from(&vector))
    }

    async fn score(
        &self,
        user: &SoloEntity,
        target: MatchTarget<'_>,
        options: &PredictOptions,
    ) -> ScoredCompatibility {
        let features = self.features(user, target);
        let active_features = count_active_features(&features);

        tracing::debug!(
            match_type = %features.match_type(),
            distance = %features.distance_score(),
            date_overlap = %features.date_overlap_score(),
            budget = %features.budget_score(),
            interest = %features.interest_score(),
            age = %features.age_score(),
            personality = %features.personality_score(),
            active_features,
            "Extracted compatibility features"
        );

        let prediction = self.client.predict(&features, options).await;
        match &prediction {
            PredictionResult::Success { score, .. } => {
                tracing::debug!("ML prediction successful: {}", score);
            }
            PredictionResult::Failure { error } => {
                tracing::info!("ML prediction unavailable, caller falls back to rules: {}", error);
            }
        }

        ScoredCompatibility {
            features,
            active_features,
            prediction,
        }
    }

    /// Score a solo traveler against another solo traveler
    pub async fn score_solo(
        &self,
        user: &SoloEntity,
        candidate: &SoloEntity,
        options: &PredictOptions,
    ) -> ScoredCompatibility {
        self.score(user, MatchTarget::Solo(candidate), options).await
    }

    /// Score a solo traveler against a group
    pub async fn score_group(
        &self,
        user: &SoloEntity,
        group: &GroupEntity,
        options: &PredictOptions,
    ) -> ScoredCompatibility {
        self.score(user, MatchTarget::Group(group), options).await
    }

    /// Score many candidates in one batch, keyed by candidate user id.
    ///
    /// Candidates without a user id are skipped. A `None` score means the ML
    /// path failed for that candidate.
    pub async fn score_solo_batch(
        &self,
        user: &SoloEntity,
        candidates: &[SoloEntity],
        options: &PredictOptions,
    ) -> HashMap<String, Option<f64>> {
        let (ids, vectors): (Vec<&str>, Vec<CompatibilityFeatureVector>) = candidates
            .iter()
            .filter_map(|candidate| {
                let id = candidate.user_id.as_deref()?;
                Some((id, self.features(user, MatchTarget::Solo(candidate))))
            })
            .unzip();

        let skipped = candidates.len() - ids.len();
        if skipped > 0 {
            tracing::debug!("Skipping {} candidates without a user id", skipped);
        }

        let results = self.client.predict_batch(&vectors, options).await;

        ids.into_iter()
            .zip(results)
            .map(|(id, result)| (id.to_string(), result.score().map(|score| score.value())))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PredictionSettings;
    use crate::models::{LatLon, MatchType, NormalizedScore, PredictionRequest, StaticAttributes};
    use crate::services::{HttpTransport, PredictionError, PredictionTransport, RequestScheduler};
    use async_trait::async_trait;
    use std::time::Duration;

    /// Scores by echoing the distance feature back
    struct DistanceEcho;

    #[async_trait]
    impl PredictionTransport for DistanceEcho {
        fn name(&self) -> &'static str {
            "echo"
        }

        async fn predict(&self, request: &PredictionRequest) -> Result<PredictionResult, PredictionError> {
            Ok(PredictionResult::Success {
                score: NormalizedScore::new(request.payload.distance_score),
                confidence: None,
            })
        }
    }

    fn scorer() -> CompatibilityScorer {
        let http = Arc::new(HttpTransport::new(Duration::from_millis(100), Duration::from_millis(100)).unwrap());
        let client = PredictionClient::with_transports(
            http,
            RequestScheduler::new(Arc::new(DistanceEcho)),
            PredictionSettings::default(),
        );
        CompatibilityScorer::new(Arc::new(client))
    }

    fn spawn_only() -> PredictOptions {
        PredictOptions {
            use_http_api: false,
            ..Default::default()
        }
    }

    fn traveler(id: Option<&str>, lat: f64, lon: f64) -> SoloEntity {
        SoloEntity {
            user_id: id.map(str::to_string),
            destination: Some(LatLon::new(lat, lon)),
            start_date: Some("2025-06-01".to_string()),
            end_date: Some("2025-06-10".to_string()),
            budget: Some(20000.0),
            static_attributes: StaticAttributes {
                age: Some(27.0),
                ..Default::default()
            },
        }
    }

    #[tokio::test]
    async fn test_score_solo() {
        let user = traveler(Some("u1"), 48.8566, 2.3522);
        let scored = scorer().score_solo(&user, &user, &spawn_only()).await;

        assert_eq!(scored.features.match_type(), MatchType::SoloSolo);
        assert_eq!(scored.score(), Some(1.0));
        assert!(scored.active_features > 0);
    }

    #[tokio::test]
    async fn test_score_group_has_group_fields() {
        let user = traveler(Some("u1"), 48.8566, 2.3522);
        let group = GroupEntity {
            size: Some(8),
            ..Default::default()
        };
        let scored = scorer().score_group(&user, &group, &spawn_only()).await;

        assert_eq!(scored.features.match_type(), MatchType::SoloGroup);
        assert!(scored.features.group_size_score().is_some());
        // Group without a destination is neutral on distance
        assert_eq!(scored.score(), Some(0.5));
    }

    #[tokio::test]
    async fn test_batch_skips_candidates_without_id() {
        let user = traveler(Some("u1"), 48.8566, 2.3522);
        let candidates = vec![
            traveler(Some("near"), 48.86, 2.35),
            traveler(None, 48.86, 2.35),
            traveler(Some("far"), 51.5074, -0.1278),
        ];

        let scores = scorer().score_solo_batch(&user, &candidates, &spawn_only()).await;

        assert_eq!(scores.len(), 2);
        assert_eq!(scores["near"], Some(1.0));
        assert_eq!(scores["far"], Some(0.0));
    }

    #[tokio::test]
    async fn test_disabled_yields_no_score() {
        let user = traveler(Some("u1"), 48.8566, 2.3522);
        let options = PredictOptions {
            enabled: false,
            ..Default::default()
        };
        let scored = scorer().score_solo(&user, &user, &options).await;

        assert_eq!(scored.score(), None);
        assert!(scored.features.is_valid());
    }
}
