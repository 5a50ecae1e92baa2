use actix_web::{web, HttpResponse, Responder};
use std::sync::Arc;
use validator::{Validate, ValidationErrors};

use crate::config::Settings;
use crate::core::{count_active_features, CompatibilityScorer, ScoredCompatibility};
use crate::models::{
    BatchCompatibilityResponse, CompatibilityFeatureVector, CompatibilityResponse, ErrorResponse,
    ExtractFeaturesRequest, FeaturesResponse, GroupCompatibilityRequest, HealthResponse,
    MatchTarget, PredictOptions, RecordEventRequest, RecordEventResponse,
    SoloBatchCompatibilityRequest, SoloCompatibilityRequest,
};
use crate::services::{create_event_log, is_model_available, MatchEventLogger};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub scorer: CompatibilityScorer,
    pub events: MatchEventLogger,
    pub settings: Arc<Settings>,
}

impl AppState {
    fn options(&self, requested: &Option<PredictOptions>) -> PredictOptions {
        requested
            .clone()
            .unwrap_or_else(|| self.settings.prediction.default_options())
    }
}

/// Configure all compatibility routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg
        .route("/health", web::get().to(health_check))
        .route("/features/extract", web::post().to(extract_features))
        .route("/compatibility/solo", web::post().to(score_solo))
        .route("/compatibility/solo/batch", web::post().to(score_solo_batch))
        .route("/compatibility/group", web::post().to(score_group))
        .route("/events", web::post().to(record_event));
}

fn validation_failed(errors: ValidationErrors) -> HttpResponse {
    HttpResponse::BadRequest().json(ErrorResponse {
        error: "Validation failed".to_string(),
        message: errors.to_string(),
        status_code: 400,
    })
}

fn compatibility_response(scored: ScoredCompatibility) -> CompatibilityResponse {
    CompatibilityResponse {
        score: scored.score(),
        confidence: scored.prediction.confidence().map(|c| c.value()),
        error: scored.prediction.error().map(str::to_string),
        features: scored.features,
        active_features: scored.active_features,
    }
}

/// Health check endpoint
async fn health_check(state: web::Data<AppState>) -> impl Responder {
    let options = state.settings.prediction.default_options();

    let ml_server = match state.scorer.client().ml_server_health(&options).await {
        Ok(health) => Some(health),
        Err(e) => {
            tracing::debug!("ML server health probe failed: {}", e);
            None
        }
    };
    let model_available = is_model_available(&options.model_dir);

    let ml_ready = ml_server.as_ref().is_some_and(|h| h.model_loaded);
    let status = if ml_ready || model_available { "healthy" } else { "degraded" };

    HttpResponse::Ok().json(HealthResponse {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: chrono::Utc::now(),
        ml_server,
        model_available,
    })
}

/// Extract features endpoint
///
/// POST /api/v1/features/extract
///
/// Request body:
/// ```json
/// {
///   "user": { "destination": {"lat": 0.0, "lon": 0.0}, "startDate": "2025-06-01", ... },
///   "candidate": { ... }
/// }
/// ```
/// Exactly one of `candidate` or `group` must be given.
async fn extract_features(
    state: web::Data<AppState>,
    req: web::Json<ExtractFeaturesRequest>,
) -> impl Responder {
    if let Err(errors) = req.validate() {
        return validation_failed(errors);
    }

    let target = match (&req.candidate, &req.group) {
        (Some(candidate), None) => MatchTarget::Solo(candidate),
        (None, Some(group)) => MatchTarget::Group(group),
        _ => {
            return HttpResponse::BadRequest().json(ErrorResponse {
                error: "Validation failed".to_string(),
                message: "Exactly one of candidate or group is required".to_string(),
                status_code: 400,
            })
        }
    };

    let features = state.scorer.features(&req.user, target);

    HttpResponse::Ok().json(FeaturesResponse {
        active_features: count_active_features(&features),
        valid: features.is_valid(),
        features,
    })
}

/// Solo compatibility endpoint
///
/// POST /api/v1/compatibility/solo
async fn score_solo(
    state: web::Data<AppState>,
    req: web::Json<SoloCompatibilityRequest>,
) -> impl Responder {
    if let Err(errors) = req.validate() {
        return validation_failed(errors);
    }

    let options = state.options(&req.options);
    let scored = state.scorer.score_solo(&req.user, &req.candidate, &options).await;

    HttpResponse::Ok().json(compatibility_response(scored))
}

/// Batched solo compatibility endpoint
///
/// POST /api/v1/compatibility/solo/batch
///
/// Candidates without a `userId` are skipped; scores are keyed by `userId`.
async fn score_solo_batch(
    state: web::Data<AppState>,
    req: web::Json<SoloBatchCompatibilityRequest>,
) -> impl Responder {
    if let Err(errors) = req.validate() {
        return validation_failed(errors);
    }

    let options = state.options(&req.options);
    let scores = state
        .scorer
        .score_solo_batch(&req.user, &req.candidates, &options)
        .await;

    let successful = scores.values().filter(|score| score.is_some()).count();
    tracing::info!(
        "Scored {}/{} candidates with ML ({} submitted)",
        successful,
        scores.len(),
        req.candidates.len()
    );

    HttpResponse::Ok().json(BatchCompatibilityResponse {
        total: scores.len(),
        successful,
        scores,
    })
}

/// Group compatibility endpoint
///
/// POST /api/v1/compatibility/group
async fn score_group(
    state: web::Data<AppState>,
    req: web::Json<GroupCompatibilityRequest>,
) -> impl Responder {
    if let Err(errors) = req.validate() {
        return validation_failed(errors);
    }

    let options = state.options(&req.options);
    let scored = state.scorer.score_group(&req.user, &req.group, &options).await;

    HttpResponse::Ok().json(compatibility_response(scored))
}

/// Record match event endpoint
///
/// POST /api/v1/events
///
/// Request body:
/// ```json
/// {
///   "features": { "matchType": "solo_solo", "distanceScore": 0.9, ... },
///   "outcome": "accept|chat|ignore|unmatch",
///   "preset": "balanced|strict|loose",
///   "source": "live"
/// }
/// ```
async fn record_event(
    state: web::Data<AppState>,
    req: web::Json<RecordEventRequest>,
) -> impl Responder {
    if let Err(errors) = req.validate() {
        return validation_failed(errors);
    }

    let req = req.into_inner();
    let preset = req
        .preset
        .unwrap_or_else(|| state.settings.events.default_preset.clone());
    let features = CompatibilityFeatureVector::from(req.features);
    let event = create_event_log(features.match_type(), features, req.outcome, preset)
        .with_source(req.source);

    state.events.emit(&event);

    let event_id = uuid::Uuid::new_v4().to_string();
    tracing::debug!(
        event_id = %event_id,
        match_type = %event.match_type,
        outcome = ?event.outcome,
        "Match event queued"
    );

    HttpResponse::Ok().json(RecordEventResponse {
        success: true,
        event_id,
        label: event.label,
    })
}
