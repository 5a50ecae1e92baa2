// Service exports
pub mod event_log;
pub mod http_transport;
pub mod prediction;
pub mod scheduler;
pub mod spawn_transport;

pub use event_log::{create_event_log, EventLogError, EventSink, JsonlFileSink, MatchEventLogger, MemorySink};
pub use http_transport::HttpTransport;
pub use prediction::{is_model_available, ErrorCategory, PredictionClient, PredictionError, PredictionTransport};
pub use scheduler::{PendingPrediction, RequestScheduler};
pub use spawn_transport::SpawnTransport;
