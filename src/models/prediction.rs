use serde::{Deserialize, Serialize};

use crate::models::features::{CompatibilityFeatureVector, NormalizedScore};

/// Default ML server when neither options nor `ML_SERVER_URL` name one
pub const DEFAULT_ML_SERVER_URL: &str = "http://localhost:8001";
pub const DEFAULT_MODEL_DIR: &str = "models";

/// Outcome of one prediction request, whichever transport produced it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum PredictionResult {
    Success {
        score: NormalizedScore,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        confidence: Option<NormalizedScore>,
    },
    Failure {
        error: String,
    },
}

impl PredictionResult {
    pub fn failure(error: impl Into<String>) -> Self {
        PredictionResult::Failure {
            error: error.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, PredictionResult::Success { .. })
    }

    /// Score on success; `None` tells the caller to use its rule-based path
    pub fn score(&self) -> Option<NormalizedScore> {
        match self {
            PredictionResult::Success { score, .. } => Some(*score),
            PredictionResult::Failure { .. } => None,
        }
    }

    pub fn confidence(&self) -> Option<NormalizedScore> {
        match self {
            PredictionResult::Success { confidence, .. } => *confidence,
            PredictionResult::Failure { .. } => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            PredictionResult::Success { .. } => None,
            PredictionResult::Failure { error } => Some(error),
        }
    }
}

/// Per-call prediction options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PredictOptions {
    /// Disables prediction entirely when false
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Whether an HTTP failure may fall through to the spawn transport
    #[serde(default = "default_true")]
    pub fallback_on_error: bool,
    #[serde(default = "default_model_dir")]
    pub model_dir: String,
    #[serde(default, rename = "mlServerUrl")]
    pub ml_server_url: Option<String>,
    #[serde(default = "default_true")]
    pub use_http_api: bool,
}

impl Default for PredictOptions {
    fn default() -> Self {
        Self {
            enabled: true,
            fallback_on_error: true,
            model_dir: default_model_dir(),
            ml_server_url: None,
            use_http_api: true,
        }
    }
}

impl PredictOptions {
    /// Explicit option, then `ML_SERVER_URL`, then the localhost default
    pub fn server_url(&self) -> String {
        self.ml_server_url
            .clone()
            .or_else(|| std::env::var("ML_SERVER_URL").ok())
            .filter(|url| !url.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_ML_SERVER_URL.to_string())
    }
}

fn default_true() -> bool {
    true
}

fn default_model_dir() -> String {
    DEFAULT_MODEL_DIR.to_string()
}

/// The 12 named model inputs sent over both transports
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeaturePayload {
    #[serde(rename = "matchType")]
    pub match_type: String,
    #[serde(rename = "distanceScore")]
    pub distance_score: f64,
    #[serde(rename = "dateOverlapScore")]
    pub date_overlap_score: f64,
    #[serde(rename = "budgetScore")]
    pub budget_score: f64,
    #[serde(rename = "interestScore")]
    pub interest_score: f64,
    #[serde(rename = "ageScore")]
    pub age_score: f64,
    #[serde(rename = "personalityScore")]
    pub personality_score: f64,
    pub destination_interest: f64,
    pub date_budget: f64,
    #[serde(rename = "languageScore")]
    pub language_score: f64,
    #[serde(rename = "lifestyleScore")]
    pub lifestyle_score: f64,
    #[serde(rename = "backgroundScore")]
    pub background_score: f64,
}

impl From<&CompatibilityFeatureVector> for FeaturePayload {
    fn from(vector: &CompatibilityFeatureVector) -> Self {
        Self {
            match_type: vector.match_type().model_label().to_string(),
            distance_score: vector.distance_score().value(),
            date_overlap_score: vector.date_overlap_score().value(),
            budget_score: vector.budget_score().value(),
            interest_score: vector.interest_score().value(),
            age_score: vector.age_score().value(),
            personality_score: vector.personality_score().value(),
            destination_interest: vector.destination_interest().value(),
            date_budget: vector.date_budget().value(),
            // Not produced by extraction; the model was trained with these zero-filled
            language_score: 0.0,
            lifestyle_score: 0.0,
            background_score: 0.0,
        }
    }
}

/// One prediction request as handed to a transport
#[derive(Debug, Clone, PartialEq)]
pub struct PredictionRequest {
    pub payload: FeaturePayload,
    pub model_dir: String,
    pub server_url: String,
}

impl PredictionRequest {
    pub fn new(vector: &CompatibilityFeatureVector, options: &PredictOptions) -> Self {
        Self {
            payload: FeaturePayload::from(vector),
            model_dir: options.model_dir.clone(),
            server_url: options.server_url(),
        }
    }
}

/// `POST /predict` body
#[derive(Debug, Clone, Serialize)]
pub struct PredictBody<'a> {
    pub features: &'a FeaturePayload,
    pub model_dir: &'a str,
}

/// `POST /predict/batch` body
#[derive(Debug, Clone, Serialize)]
pub struct BatchPredictBody<'a> {
    pub features_list: &'a [FeaturePayload],
    pub model_dir: &'a str,
}

/// Response document shared by the HTTP server and the predictor script
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PredictionResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub score: Option<f64>,
    #[serde(default)]
    pub probability: Option<f64>,
    #[serde(default)]
    pub prediction: Option<i64>,
    #[serde(default)]
    pub confidence: Option<f64>,
    #[serde(default)]
    pub error: Option<String>,
}

impl PredictionResponse {
    /// Turn a wire response into a result; `score` falls back to `probability`
    pub fn into_result(self) -> PredictionResult {
        if !self.success {
            return PredictionResult::failure(
                self.error
                    .unwrap_or_else(|| "Prediction failed without an error message".to_string()),
            );
        }
        match self.score.or(self.probability) {
            Some(raw) if raw.is_finite() => PredictionResult::Success {
                score: NormalizedScore::new(raw),
                confidence: self.confidence.map(NormalizedScore::new),
            },
            _ => PredictionResult::failure("Prediction response is missing a score"),
        }
    }
}

/// `POST /predict/batch` response
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchPredictionResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub results: Option<Vec<PredictionResponse>>,
    #[serde(default)]
    pub error: Option<String>,
}

/// `GET /health` response of the ML server
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MlServerHealth {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub model_loaded: bool,
    #[serde(default)]
    pub load_time_seconds: Option<f64>,
}
