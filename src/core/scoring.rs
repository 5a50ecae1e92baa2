use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use std::collections::HashSet;

use crate::models::{MatchType, NormalizedScore, Personality};

const MILLIS_PER_DAY: f64 = 86_400_000.0;

/// Absolute budget gap at which a solo-to-group budget score reaches zero
const GROUP_BUDGET_TOLERANCE: f64 = 40_000.0;

/// Bonus for any shared interest in solo-to-solo matching
const SOLO_INTEREST_BONUS: f64 = 0.2;

/// Parse a trip date. Accepts RFC 3339 timestamps and plain `YYYY-MM-DD`.
pub fn parse_trip_date(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(naive.and_utc());
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Trip range in epoch milliseconds
fn trip_range(start: Option<&str>, end: Option<&str>) -> Option<(i64, i64)> {
    let start = parse_trip_date(start?)?;
    let end = parse_trip_date(end?)?;
    Some((start.timestamp_millis(), end.timestamp_millis()))
}

/// Score how much two trips overlap.
///
/// Less than one full day of overlap is a hard zero. The ratio denominator is
/// the user's own trip for group matching and the longer trip for solo matching.
pub fn date_overlap_score(
    user: (Option<&str>, Option<&str>),
    target: (Option<&str>, Option<&str>),
    match_type: MatchType,
) -> NormalizedScore {
    let (Some((start_a, end_a)), Some((start_b, end_b))) =
        (trip_range(user.0, user.1), trip_range(target.0, target.1))
    else {
        return NormalizedScore::ZERO;
    };

    let overlap_ms = (end_a.min(end_b) - start_a.max(start_b)).max(0);
    let overlap_days = overlap_ms as f64 / MILLIS_PER_DAY;
    if overlap_days < 1.0 {
        return NormalizedScore::ZERO;
    }

    let denominator_ms = match match_type {
        MatchType::SoloGroup => end_a - start_a,
        MatchType::SoloSolo => (end_a - start_a).max(end_b - start_b),
    };
    if denominator_ms <= 0 {
        return NormalizedScore::ZERO;
    }

    overlap_ratio_score(overlap_days / (denominator_ms as f64 / MILLIS_PER_DAY))
}

/// Tiered score for an overlap ratio
#[inline]
pub fn overlap_ratio_score(ratio: f64) -> NormalizedScore {
    let score = if ratio >= 0.8 {
        1.0
    } else if ratio >= 0.5 {
        0.9
    } else if ratio >= 0.3 {
        0.8
    } else if ratio >= 0.2 {
        0.6
    } else if ratio >= 0.1 {
        0.3
    } else {
        0.1
    };
    NormalizedScore::new(score)
}

/// Budget compatibility.
///
/// Solo pairs compare the relative gap `|a-b| / max(a,b)` (symmetric); a solo
/// traveler against a group uses an absolute tolerance instead.
pub fn budget_score(a: Option<f64>, b: Option<f64>, match_type: MatchType) -> NormalizedScore {
    let (Some(a), Some(b)) = (a, b) else {
        return NormalizedScore::NEUTRAL;
    };
    if !a.is_finite() || !b.is_finite() {
        return NormalizedScore::NEUTRAL;
    }

    match match_type {
        MatchType::SoloSolo => {
            let max_budget = a.max(b);
            if max_budget == 0.0 {
                return NormalizedScore::ONE;
            }
            let ratio = (a - b).abs() / max_budget;
            let score = if ratio <= 0.1 {
                1.0
            } else if ratio <= 0.25 {
                0.8
            } else if ratio <= 0.5 {
                0.6
            } else if ratio <= 1.0 {
                0.4
            } else if ratio <= 2.0 {
                0.2
            } else {
                0.1
            };
            NormalizedScore::new(score)
        }
        MatchType::SoloGroup => NormalizedScore::new(1.0 - (a - b).abs() / GROUP_BUDGET_TOLERANCE),
    }
}

/// Jaccard similarity of two interest sets, with a shared-interest bonus
/// applied to solo-to-solo matches only
pub fn interest_score(
    a: Option<&[String]>,
    b: Option<&[String]>,
    match_type: MatchType,
) -> NormalizedScore {
    let (Some(a), Some(b)) = (a, b) else {
        return NormalizedScore::NEUTRAL;
    };
    if a.is_empty() || b.is_empty() {
        return NormalizedScore::NEUTRAL;
    }

    let set_a: HashSet<&str> = a.iter().map(String::as_str).collect();
    let set_b: HashSet<&str> = b.iter().map(String::as_str).collect();
    let shared = set_a.intersection(&set_b).count();
    let union = set_a.union(&set_b).count();
    if union == 0 {
        return NormalizedScore::NEUTRAL;
    }

    let mut score = shared as f64 / union as f64;
    if match_type == MatchType::SoloSolo && shared > 0 {
        score = (score + SOLO_INTEREST_BONUS).min(1.0);
    }
    NormalizedScore::new(score)
}

/// Tiered score on the absolute age gap
pub fn age_score(a: Option<f64>, b: Option<f64>) -> NormalizedScore {
    let (Some(a), Some(b)) = (a, b) else {
        return NormalizedScore::NEUTRAL;
    };
    let diff = (a - b).abs();
    if !diff.is_finite() {
        return NormalizedScore::NEUTRAL;
    }

    let score = if diff <= 2.0 {
        1.0
    } else if diff <= 5.0 {
        0.9
    } else if diff <= 10.0 {
        0.7
    } else if diff <= 15.0 {
        0.5
    } else if diff <= 25.0 {
        0.3
    } else if diff <= 40.0 {
        0.1
    } else {
        0.05
    };
    NormalizedScore::new(score)
}

/// Symmetric personality matrix: same 1.0, adjacent 0.7, opposite 0.4
pub fn personality_score(a: Option<&str>, b: Option<&str>) -> NormalizedScore {
    let (Some(a), Some(b)) = (a.and_then(Personality::parse), b.and_then(Personality::parse))
    else {
        return NormalizedScore::NEUTRAL;
    };

    let score = match a.rank().abs_diff(b.rank()) {
        0 => 1.0,
        1 => 0.7,
        _ => 0.4,
    };
    NormalizedScore::new(score)
}

/// Smaller groups score higher; unknown or empty groups are neutral
pub fn group_size_score(size: Option<u32>) -> NormalizedScore {
    let size = match size {
        Some(size) if size > 0 => size,
        _ => return NormalizedScore::NEUTRAL,
    };

    let score = match size {
        0..=6 => 1.0,
        7..=12 => 0.8,
        13..=20 => 0.6,
        21..=40 => 0.4,
        _ => 0.2,
    };
    NormalizedScore::new(score)
}

/// Tier for one diversity dimension, by count of distinct values
fn diversity_tier(values: Option<&[String]>) -> NormalizedScore {
    let Some(values) = values else {
        return NormalizedScore::NEUTRAL;
    };
    let distinct: HashSet<&str> = values.iter().map(String::as_str).collect();
    let score = match distinct.len() {
        n if n >= 3 => 1.0,
        2 => 0.7,
        _ => 0.5,
    };
    NormalizedScore::new(score)
}

/// Mean of the language and nationality diversity tiers
pub fn group_diversity_score(
    languages: Option<&[String]>,
    nationalities: Option<&[String]>,
) -> NormalizedScore {
    let language = diversity_tier(languages);
    let nationality = diversity_tier(nationalities);
    NormalizedScore::new((language.value() + nationality.value()) / 2.0)
}
