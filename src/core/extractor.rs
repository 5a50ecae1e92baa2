use crate::core::distance::distance_score;
use crate::core::scoring;
use crate::models::{CompatibilityFeatureVector, MatchTarget, NormalizedScore, SoloEntity};

/// Build the feature vector for `user` against `target`.
///
/// Pure and deterministic: no I/O, no clock. Missing data never fails, it
/// degrades to the neutral score for that feature.
pub fn extract_features(user: &SoloEntity, target: MatchTarget<'_>) -> CompatibilityFeatureVector {
    let match_type = target.match_type();

    let distance = distance_score(user.destination, target.destination());
    let date_overlap = scoring::date_overlap_score(
        (user.start_date.as_deref(), user.end_date.as_deref()),
        target.dates(),
        match_type,
    );
    let budget = scoring::budget_score(user.budget, target.budget(), match_type);
    let interest = scoring::interest_score(user.interests(), target.interests(), match_type);
    let age = scoring::age_score(user.age(), target.age());

    let personality = match target {
        MatchTarget::Solo(candidate) => {
            scoring::personality_score(user.personality(), candidate.personality())
        }
        // Groups have no single personality
        MatchTarget::Group(_) => NormalizedScore::NEUTRAL,
    };

    let (group_size_score, group_diversity_score) = match target {
        MatchTarget::Solo(_) => (None, None),
        MatchTarget::Group(group) => (
            Some(scoring::group_size_score(group.size)),
            Some(scoring::group_diversity_score(
                group.dominant_languages.as_deref(),
                group.dominant_nationalities.as_deref(),
            )),
        ),
    };

    debug_assert!(match_type.is_group() || group_size_score.is_none());

    CompatibilityFeatureVector {
        match_type,
        distance_score: distance,
        date_overlap_score: date_overlap,
        budget_score: budget,
        interest_score: interest,
        age_score: age,
        personality_score: personality,
        destination_interest: distance.product(interest),
        date_budget: date_overlap.product(budget),
        group_size_score,
        group_diversity_score,
    }
}

/// Convenience wrapper for solo-to-solo extraction
pub fn extract_solo(user: &SoloEntity, candidate: &SoloEntity) -> CompatibilityFeatureVector {
    extract_features(user, MatchTarget::Solo(candidate))
}
