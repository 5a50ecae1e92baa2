use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use std::future::Future;
use std::time::Duration;

use crate::models::prediction::{BatchPredictBody, BatchPredictionResponse, FeaturePayload, PredictBody};
use crate::models::{MlServerHealth, PredictionRequest, PredictionResponse, PredictionResult};
use crate::services::prediction::{accept_response, PredictionError, PredictionTransport};

/// Client for the long-running ML model server
///
/// Handles all communication with the model server including:
/// - Single predictions (`POST /predict`)
/// - Batch predictions (`POST /predict/batch`)
/// - Health probes (`GET /health`)
pub struct HttpTransport {
    client: Client,
    timeout: Duration,
    batch_timeout: Duration,
}

impl HttpTransport {
    /// Create a new transport; one connection pool is shared by every call
    pub fn new(timeout: Duration, batch_timeout: Duration) -> Result<Self, PredictionError> {
        let client = Client::builder().build()?;

        Ok(Self {
            client,
            timeout,
            batch_timeout,
        })
    }

    fn endpoint(server_url: &str, path: &str) -> String {
        format!("{}{}", server_url.trim_end_matches('/'), path)
    }

    /// Run `call` under `limit`, mapping expiry to a timeout error
    async fn within<T, F>(operation: &'static str, limit: Duration, call: F) -> Result<T, PredictionError>
    where
        F: Future<Output = Result<T, PredictionError>>,
    {
        tokio::time::timeout(limit, call)
            .await
            .map_err(|_| PredictionError::Timeout {
                operation,
                millis: limit.as_millis() as u64,
            })?
    }

    async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, PredictionError> {
        let status = response.status();
        if !status.is_success() {
            return Err(PredictionError::Status(status.as_u16()));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| PredictionError::InvalidResponse(format!("Failed to parse response: {}", e)))
    }

    /// Score a batch in one round trip. Results come back in input order.
    pub async fn predict_batch(
        &self,
        payloads: &[FeaturePayload],
        model_dir: &str,
        server_url: &str,
    ) -> Result<Vec<PredictionResult>, PredictionError> {
        let url = Self::endpoint(server_url, "/predict/batch");
        let body = BatchPredictBody {
            features_list: payloads,
            model_dir,
        };

        tracing::debug!("Sending batch of {} predictions to {}", payloads.len(), url);

        let batch: BatchPredictionResponse = Self::within("Batch prediction", self.batch_timeout, async {
            let response = self.client.post(&url).json(&body).send().await?;
            Self::decode(response).await
        })
        .await?;

        if !batch.success {
            return Err(PredictionError::Rejected(
                batch.error.unwrap_or_else(|| "Batch prediction failed".to_string()),
            ));
        }

        let results = batch
            .results
            .ok_or_else(|| PredictionError::InvalidResponse("Missing results array".into()))?;

        if results.len() != payloads.len() {
            return Err(PredictionError::InvalidResponse(format!(
                "Expected {} batch results, got {}",
                payloads.len(),
                results.len()
            )));
        }

        Ok(results.into_iter().map(PredictionResponse::into_result).collect())
    }

    /// Fetch the model server's health document
    pub async fn health(&self, server_url: &str) -> Result<MlServerHealth, PredictionError> {
        let url = Self::endpoint(server_url, "/health");

        Self::within("Health check", self.timeout, async {
            let response = self.client.get(&url).send().await?;
            Self::decode(response).await
        })
        .await
    }
}

#[async_trait]
impl PredictionTransport for HttpTransport {
    fn name(&self) -> &'static str {
        "http"
    }

    async fn predict(&self, request: &PredictionRequest) -> Result<PredictionResult, PredictionError> {
        let url = Self::endpoint(&request.server_url, "/predict");
        let body = PredictBody {
            features: &request.payload,
            model_dir: &request.model_dir,
        };

        tracing::debug!("Requesting prediction from {}", url);

        let response: PredictionResponse = Self::within("Prediction request", self.timeout, async {
            let response = self.client.post(&url).json(&body).send().await?;
            Self::decode(response).await
        })
        .await?;

        accept_response(response)
    }
}
