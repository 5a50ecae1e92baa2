use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::models::features::CompatibilityFeatureVector;
use crate::models::prediction::MlServerHealth;

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub ml_server: Option<MlServerHealth>,
    pub model_available: bool,
}

/// Error response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    pub status_code: u16,
}

/// Extracted features, without a prediction
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeaturesResponse {
    pub features: CompatibilityFeatureVector,
    pub active_features: usize,
    pub valid: bool,
}

/// Score for a single pair
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompatibilityResponse {
    pub features: CompatibilityFeatureVector,
    pub active_features: usize,
    /// `None` means the caller should fall back to rule-based scoring
    pub score: Option<f64>,
    pub confidence: Option<f64>,
    pub error: Option<String>,
}

/// Scores for a batch of candidates, keyed by candidate user id
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchCompatibilityResponse {
    pub scores: HashMap<String, Option<f64>>,
    pub successful: usize,
    pub total: usize,
}

/// Record event response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordEventResponse {
    pub success: bool,
    pub event_id: String,
    pub label: u8,
}
