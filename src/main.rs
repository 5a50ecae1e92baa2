use actix_cors::Cors;
use actix_web::{error, http::StatusCode, middleware, web, App, HttpResponse, HttpServer};
use kovari_compat::config::{LoggingSettings, Settings};
use kovari_compat::routes::{self, AppState};
use kovari_compat::services::{JsonlFileSink, MatchEventLogger, PredictionClient};
use kovari_compat::CompatibilityScorer;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// JSON error response for JSON payload errors
#[derive(Debug, serde::Serialize)]
pub struct JsonError {
    pub error: String,
    pub message: String,
    pub status_code: u16,
}

impl std::fmt::Display for JsonError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.error, self.message)
    }
}

impl std::error::Error for JsonError {}

impl error::ResponseError for JsonError {
    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(StatusCode::from_u16(self.status_code).unwrap_or(StatusCode::BAD_REQUEST))
            .content_type("application/json")
            .json(self)
    }
}

/// Handle JSON payload errors
pub fn handle_json_payload_error(err: error::JsonPayloadError, req: &actix_web::HttpRequest) -> actix_web::Error {
    tracing::info!("JSON payload error on {}: {}", req.path(), err);
    JsonError {
        error: "invalid_json".to_string(),
        message: format!("Invalid JSON: {}", err),
        status_code: 400,
    }
    .into()
}

/// `LOG_LEVEL`/`LOG_FORMAT` win over the logging section; `RUST_LOG` wins over both
fn init_tracing(logging: &LoggingSettings) {
    let log_level = std::env::var("LOG_LEVEL").unwrap_or_else(|_| logging.level.clone());
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| logging.format.clone());

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_level(true);

    if log_format == "pretty" {
        subscriber.pretty().init();
    } else {
        subscriber.init();
    }
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load .env file if present
    dotenv::dotenv().ok();

    let loaded = Settings::load();
    let logging = loaded
        .as_ref()
        .map(|settings| settings.logging.clone())
        .unwrap_or_default();
    init_tracing(&logging);

    info!("Starting Kovari compatibility service...");

    let settings = match loaded {
        Ok(settings) => Arc::new(settings),
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            return Err(std::io::Error::new(std::io::ErrorKind::InvalidInput, e.to_string()));
        }
    };

    info!("Configuration loaded successfully");

    let client = PredictionClient::new(settings.prediction.clone()).map_err(|e| {
        error!("Failed to initialize prediction client: {}", e);
        std::io::Error::other(e.to_string())
    })?;

    info!(
        "Prediction client initialized (http: {}, fallback: {}, predictor: {} {})",
        settings.prediction.use_http_api,
        settings.prediction.fallback_on_error,
        settings.prediction.interpreter,
        settings.prediction.script_path.display()
    );

    let scorer = CompatibilityScorer::new(Arc::new(client));

    let sink = Arc::new(JsonlFileSink::new(settings.events.sink_path.clone()));
    let (events, event_writer) = MatchEventLogger::spawn(sink);

    info!("Match events are written to {}", settings.events.sink_path.display());

    // Build application state
    let app_state = AppState {
        scorer,
        events,
        settings: Arc::clone(&settings),
    };

    // Configure HTTP server
    let host = settings.server.host.clone();
    let port = settings.server.port;
    let workers = settings.server.workers.unwrap_or(4);

    info!("Starting HTTP server on {}:{}", host, port);

    let server = HttpServer::new(move || {
        let cors = Cors::permissive();

        App::new()
            .app_data(web::Data::new(app_state.clone()))
            .app_data(web::JsonConfig::default().error_handler(handle_json_payload_error))
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .wrap(middleware::Compress::default())
            .configure(routes::configure_routes)
    })
    .workers(workers)
    .bind((host, port))?
    .run();

    let result = server.await;

    // Give queued events a moment to reach the sink
    match tokio::time::timeout(Duration::from_secs(2), event_writer).await {
        Ok(Err(e)) => error!("Match event writer failed: {}", e),
        Err(_) => info!("Match event writer still busy at shutdown"),
        Ok(Ok(())) => {}
    }

    result
}
