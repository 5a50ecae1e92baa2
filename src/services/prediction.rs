use async_trait::async_trait;
use futures::future::join_all;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use tokio::time::Instant;

use crate::config::PredictionSettings;
use crate::models::prediction::FeaturePayload;
use crate::models::{
    CompatibilityFeatureVector, MlServerHealth, PredictOptions, PredictionRequest,
    PredictionResponse, PredictionResult,
};
use crate::services::http_transport::HttpTransport;
use crate::services::scheduler::RequestScheduler;
use crate::services::spawn_transport::SpawnTransport;

/// File the predictor loads from the model directory
pub const MODEL_FILE_NAME: &str = "match_compatibility_model.pkl";

/// Errors that can occur while obtaining a prediction
#[derive(Debug, Error)]
pub enum PredictionError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("ML server returned HTTP {0}")]
    Status(u16),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("{operation} timed out after {millis}ms")]
    Timeout { operation: &'static str, millis: u64 },

    #[error("Prediction rejected: {0}")]
    Rejected(String),

    #[error("Failed to start predictor: {0}")]
    Spawn(std::io::Error),

    #[error("Predictor I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Predictor exited with code {code}: {stderr}")]
    ProcessExit { code: i32, stderr: String },

    #[error("Process terminated unexpectedly")]
    Terminated,

    #[error("Predictor timed out after {0}s")]
    ProcessTimeout(u64),

    #[error("ML scoring is disabled")]
    Disabled,

    #[error("Prediction queue closed before a result was delivered")]
    QueueClosed,
}

/// Coarse grouping of [`PredictionError`] variants
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Transport,
    Process,
    Config,
    Queue,
}

impl PredictionError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            PredictionError::Request(_)
            | PredictionError::Status(_)
            | PredictionError::InvalidResponse(_)
            | PredictionError::Timeout { .. }
            | PredictionError::Rejected(_) => ErrorCategory::Transport,
            PredictionError::Spawn(_)
            | PredictionError::Io(_)
            | PredictionError::ProcessExit { .. }
            | PredictionError::Terminated
            | PredictionError::ProcessTimeout(_) => ErrorCategory::Process,
            PredictionError::Disabled => ErrorCategory::Config,
            PredictionError::QueueClosed => ErrorCategory::Queue,
        }
    }
}

/// Convert a wire response into a successful result or a rejection.
pub(crate) fn accept_response(response: PredictionResponse) -> Result<PredictionResult, PredictionError> {
    match response.into_result() {
        PredictionResult::Failure { error } => Err(PredictionError::Rejected(error)),
        success => Ok(success),
    }
}

/// A way of turning one prediction request into a score.
///
/// `Ok` always carries [`PredictionResult::Success`]; anything else is an error
/// so the client can move on to the next transport.
#[async_trait]
pub trait PredictionTransport: Send + Sync {
    fn name(&self) -> &'static str;

    async fn predict(&self, request: &PredictionRequest) -> Result<PredictionResult, PredictionError>;
}

/// Prediction client: HTTP first, then the queued subprocess, under one budget
pub struct PredictionClient {
    http: Arc<HttpTransport>,
    scheduler: RequestScheduler,
    settings: PredictionSettings,
}

impl PredictionClient {
    /// Build the client and its transports from settings
    pub fn new(settings: PredictionSettings) -> Result<Self, PredictionError> {
        let http = Arc::new(HttpTransport::new(settings.http_timeout(), settings.batch_timeout())?);
        let spawn = SpawnTransport::new(
            settings.interpreter.clone(),
            settings.script_path.clone(),
            settings.spawn_timeout(),
            settings.kill_grace(),
        );
        let scheduler = RequestScheduler::new(Arc::new(spawn));

        Ok(Self::with_transports(http, scheduler, settings))
    }

    /// Build the client around already constructed transports
    pub fn with_transports(
        http: Arc<HttpTransport>,
        scheduler: RequestScheduler,
        settings: PredictionSettings,
    ) -> Self {
        Self {
            http,
            scheduler,
            settings,
        }
    }

    pub fn settings(&self) -> &PredictionSettings {
        &self.settings
    }

    fn is_enabled(&self, options: &PredictOptions) -> bool {
        self.settings.enabled && options.enabled
    }

    /// Ordered transport list for the given options
    fn strategies(&self, options: &PredictOptions) -> Vec<&dyn PredictionTransport> {
        let mut strategies: Vec<&dyn PredictionTransport> = Vec::with_capacity(2);
        if options.use_http_api {
            strategies.push(self.http.as_ref());
            if options.fallback_on_error {
                strategies.push(&self.scheduler);
            }
        } else {
            strategies.push(&self.scheduler);
        }
        strategies
    }

    /// Predict a compatibility score. Never fails: errors become
    /// [`PredictionResult::Failure`], which callers treat as "use rule-based".
    pub async fn predict(
        &self,
        vector: &CompatibilityFeatureVector,
        options: &PredictOptions,
    ) -> PredictionResult {
        if !self.is_enabled(options) {
            return PredictionResult::failure(PredictionError::Disabled.to_string());
        }

        let request = PredictionRequest::new(vector, options);
        match self.run_strategies(&request, options).await {
            Ok(result) => result,
            Err(e) => {
                tracing::debug!(error = %e, category = ?e.category(), "Prediction failed on every transport");
                PredictionResult::failure(e.to_string())
            }
        }
    }

    async fn run_strategies(
        &self,
        request: &PredictionRequest,
        options: &PredictOptions,
    ) -> Result<PredictionResult, PredictionError> {
        let budget = self.settings.total_budget();
        let deadline = Instant::now() + budget;
        let budget_exceeded = PredictionError::Timeout {
            operation: "Prediction",
            millis: budget.as_millis() as u64,
        };

        let mut last_error = None;
        for transport in self.strategies(options) {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                last_error = Some(budget_exceeded);
                break;
            }

            match tokio::time::timeout(remaining, transport.predict(request)).await {
                Ok(Ok(result)) => {
                    tracing::debug!(transport = transport.name(), "Prediction succeeded");
                    return Ok(result);
                }
                Ok(Err(e)) => {
                    tracing::warn!(transport = transport.name(), error = %e, "Prediction transport failed");
                    last_error = Some(e);
                }
                Err(_) => {
                    tracing::warn!(transport = transport.name(), "Prediction budget exhausted");
                    last_error = Some(budget_exceeded);
                    break;
                }
            }
        }

        Err(last_error.unwrap_or(PredictionError::Disabled))
    }

    /// Predict many vectors at once. The output has the same length and order
    /// as the input.
    pub async fn predict_batch(
        &self,
        vectors: &[CompatibilityFeatureVector],
        options: &PredictOptions,
    ) -> Vec<PredictionResult> {
        if vectors.is_empty() {
            return Vec::new();
        }
        if !self.is_enabled(options) {
            let disabled = PredictionResult::failure(PredictionError::Disabled.to_string());
            return vec![disabled; vectors.len()];
        }

        if options.use_http_api {
            let payloads: Vec<FeaturePayload> = vectors.iter().map(FeaturePayload::from).collect();
            match self
                .http
                .predict_batch(&payloads, &options.model_dir, &options.server_url())
                .await
            {
                Ok(results) => return results,
                Err(e) => {
                    tracing::warn!(
                        error = %e,
                        count = vectors.len(),
                        "Batch prediction failed, falling back to individual predictions"
                    );
                }
            }
        }

        join_all(vectors.iter().map(|vector| self.predict(vector, options))).await
    }

    /// Probe the ML server's health endpoint
    pub async fn ml_server_health(&self, options: &PredictOptions) -> Result<MlServerHealth, PredictionError> {
        self.http.health(&options.server_url()).await
    }
}

/// Whether a trained model artifact exists in `model_dir`
pub fn is_model_available(model_dir: impl AsRef<Path>) -> bool {
    model_dir.as_ref().join(MODEL_FILE_NAME).is_file()
}
