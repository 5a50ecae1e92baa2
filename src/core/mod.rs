// Core algorithm exports
pub mod distance;
pub mod extractor;
pub mod matcher;
pub mod normalize;
pub mod scoring;

pub use distance::{distance_score, haversine_distance};
pub use extractor::{extract_features, extract_solo};
pub use matcher::{CompatibilityScorer, ScoredCompatibility};
pub use normalize::{coerce, count_active_features, is_valid, is_valid_json};
