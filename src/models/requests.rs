use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use crate::models::domain::{GroupEntity, SoloEntity};
use crate::models::events::{EventSource, MatchOutcome};
use crate::models::features::RawFeatureVector;
use crate::models::prediction::PredictOptions;

/// Request to extract a feature vector without scoring it
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[validate(schema(function = "validate_single_target"))]
pub struct ExtractFeaturesRequest {
    pub user: SoloEntity,
    #[serde(default)]
    pub candidate: Option<SoloEntity>,
    #[serde(default)]
    pub group: Option<GroupEntity>,
}

fn validate_single_target(req: &ExtractFeaturesRequest) -> Result<(), ValidationError> {
    match (&req.candidate, &req.group) {
        (Some(_), None) | (None, Some(_)) => Ok(()),
        _ => Err(ValidationError::new("exactly_one_of_candidate_or_group")),
    }
}

/// Request to score a solo traveler against another solo traveler
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SoloCompatibilityRequest {
    pub user: SoloEntity,
    pub candidate: SoloEntity,
    /// Falls back to the service's configured options when absent
    #[serde(default)]
    pub options: Option<PredictOptions>,
}

/// Request to score one solo traveler against many candidates at once
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SoloBatchCompatibilityRequest {
    pub user: SoloEntity,
    #[validate(length(min = 1, max = 200))]
    pub candidates: Vec<SoloEntity>,
    #[serde(default)]
    pub options: Option<PredictOptions>,
}

/// Request to score a solo traveler against a group
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct GroupCompatibilityRequest {
    pub user: SoloEntity,
    pub group: GroupEntity,
    #[serde(default)]
    pub options: Option<PredictOptions>,
}

/// Request to log an observed match outcome
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RecordEventRequest {
    pub features: RawFeatureVector,
    pub outcome: MatchOutcome,
    /// Matching preset in effect when the match was shown
    #[validate(length(min = 1, max = 64))]
    #[serde(default)]
    pub preset: Option<String>,
    #[serde(default)]
    pub source: EventSource,
}
