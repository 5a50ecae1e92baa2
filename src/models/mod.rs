// Model exports
pub mod domain;
pub mod events;
pub mod features;
pub mod prediction;
pub mod requests;
pub mod responses;

pub use domain::{GroupEntity, LatLon, MatchTarget, Personality, SoloEntity, StaticAttributes};
pub use events::{EventSource, MatchEventLog, MatchOutcome};
pub use features::{CompatibilityFeatureVector, MatchType, NormalizedScore, RawFeatureVector};
pub use prediction::{
    FeaturePayload, MlServerHealth, PredictOptions, PredictionRequest, PredictionResponse,
    PredictionResult,
};
pub use requests::{
    ExtractFeaturesRequest, GroupCompatibilityRequest, RecordEventRequest,
    SoloBatchCompatibilityRequest, SoloCompatibilityRequest,
};
pub use responses::{
    BatchCompatibilityResponse, CompatibilityResponse, ErrorResponse, FeaturesResponse,
    HealthResponse, RecordEventResponse,
};
