use crate::models::{CompatibilityFeatureVector, NormalizedScore, RawFeatureVector};

#[inline]
fn in_range(value: f64) -> bool {
    value.is_finite() && (0.0..=1.0).contains(&value)
}

#[inline]
fn optional_in_range(value: Option<f64>) -> bool {
    value.map_or(true, in_range)
}

/// Repair untrusted feature data into a schema-valid vector.
///
/// Required fields that are missing or non-finite become neutral; everything
/// else is clamped. Missing interaction fields are derived from their inputs.
/// Group-only scores survive only on group matches.
pub fn coerce(raw: &RawFeatureVector) -> CompatibilityFeatureVector {
    let distance = NormalizedScore::from_option(raw.distance_score);
    let date_overlap = NormalizedScore::from_option(raw.date_overlap_score);
    let budget = NormalizedScore::from_option(raw.budget_score);
    let interest = NormalizedScore::from_option(raw.interest_score);

    let destination_interest = raw
        .destination_interest
        .map(NormalizedScore::new)
        .unwrap_or_else(|| distance.product(interest));
    let date_budget = raw
        .date_budget
        .map(NormalizedScore::new)
        .unwrap_or_else(|| date_overlap.product(budget));

    let (group_size_score, group_diversity_score) = if raw.match_type.is_group() {
        (
            raw.group_size_score.map(NormalizedScore::new),
            raw.group_diversity_score.map(NormalizedScore::new),
        )
    } else {
        (None, None)
    };

    CompatibilityFeatureVector {
        match_type: raw.match_type,
        distance_score: distance,
        date_overlap_score: date_overlap,
        budget_score: budget,
        interest_score: interest,
        age_score: NormalizedScore::from_option(raw.age_score),
        personality_score: NormalizedScore::from_option(raw.personality_score),
        destination_interest,
        date_budget,
        group_size_score,
        group_diversity_score,
    }
}

/// Check a raw vector against the schema without repairing it
pub fn is_valid(raw: &RawFeatureVector) -> bool {
    let required = [
        raw.distance_score,
        raw.date_overlap_score,
        raw.budget_score,
        raw.interest_score,
        raw.age_score,
        raw.personality_score,
    ];
    if !required.iter().all(|field| field.is_some_and(in_range)) {
        return false;
    }

    if !optional_in_range(raw.destination_interest) || !optional_in_range(raw.date_budget) {
        return false;
    }

    if raw.match_type.is_group() {
        optional_in_range(raw.group_size_score) && optional_in_range(raw.group_diversity_score)
    } else {
        raw.group_size_score.is_none() && raw.group_diversity_score.is_none()
    }
}

/// Validate a JSON document; an unknown or missing `matchType` is invalid
pub fn is_valid_json(value: &serde_json::Value) -> bool {
    serde_json::from_value::<RawFeatureVector>(value.clone())
        .map(|raw| is_valid(&raw))
        .unwrap_or(false)
}

/// Number of numeric fields carrying signal, i.e. not neutral
pub fn count_active_features(vector: &CompatibilityFeatureVector) -> usize {
    vector
        .numeric_fields()
        .into_iter()
        .filter(|(_, score)| !score.is_neutral())
        .count()
}
