// Unit tests for Kovari Compat

use kovari_compat::core::{
    coerce, count_active_features,
    distance::{haversine_distance, score_for_distance_km},
    extract_features, is_valid_json,
    scoring::{budget_score, date_overlap_score},
};
use kovari_compat::models::{
    GroupEntity, LatLon, MatchTarget, MatchType, NormalizedScore, RawFeatureVector, SoloEntity,
    StaticAttributes,
};

fn traveler(lat: f64, lon: f64, start: &str, end: &str, budget: f64) -> SoloEntity {
    SoloEntity {
        user_id: None,
        destination: Some(LatLon::new(lat, lon)),
        start_date: Some(start.to_string()),
        end_date: Some(end.to_string()),
        budget: Some(budget),
        static_attributes: StaticAttributes {
            age: Some(28.0),
            interests: Some(vec!["hiking".to_string(), "food".to_string()]),
            personality: Some("ambivert".to_string()),
            ..Default::default()
        },
    }
}

fn group(lat: f64, lon: f64, size: u32) -> GroupEntity {
    GroupEntity {
        destination: Some(LatLon::new(lat, lon)),
        start_date: Some("2025-06-01".to_string()),
        end_date: Some("2025-06-10".to_string()),
        average_budget: Some(25_000.0),
        average_age: Some(30.0),
        top_interests: Some(vec!["food".to_string()]),
        dominant_languages: Some(vec!["en".to_string(), "hi".to_string()]),
        dominant_nationalities: Some(vec!["IN".to_string()]),
        size: Some(size),
        ..Default::default()
    }
}

#[test]
fn test_identical_trips_score_full() {
    let a = traveler(48.8566, 2.3522, "2025-06-01", "2025-06-10", 20_000.0);
    let b = traveler(48.8566, 2.3522, "2025-06-01", "2025-06-10", 20_000.0);

    let v = extract_features(&a, MatchTarget::Solo(&b));
    assert_eq!(v.distance_score().value(), 1.0);
    assert_eq!(v.date_overlap_score().value(), 1.0);
    assert_eq!(v.budget_score().value(), 1.0);
}

#[test]
fn test_destinations_300km_apart_score_zero() {
    // 300 km due north along a meridian
    let north = 10.0 + 300.0 / 111.195;
    assert!((haversine_distance(10.0, 20.0, north, 20.0) - 300.0).abs() < 1.0);

    let a = traveler(10.0, 20.0, "2025-06-01", "2025-06-10", 20_000.0);
    let b = traveler(north, 20.0, "2025-06-01", "2025-06-10", 20_000.0);

    let v = extract_features(&a, MatchTarget::Solo(&b));
    assert_eq!(v.distance_score(), NormalizedScore::ZERO);
    assert_eq!(v.destination_interest(), NormalizedScore::ZERO);
}

#[test]
fn test_overlap_ratio_tiers_from_dates() {
    // Two 20-day trips offset by 3 days: 17/20 = 0.85
    let high = date_overlap_score(
        (Some("2025-06-01"), Some("2025-06-21")),
        (Some("2025-06-04"), Some("2025-06-24")),
        MatchType::SoloSolo,
    );
    assert_eq!(high.value(), 1.0);

    // Offset by 15 days: 5/20 = 0.25
    let low = date_overlap_score(
        (Some("2025-06-01"), Some("2025-06-21")),
        (Some("2025-06-16"), Some("2025-07-06")),
        MatchType::SoloSolo,
    );
    assert_eq!(low.value(), 0.6);
}

#[test]
fn test_overlap_below_one_day_is_hard_zero() {
    let score = date_overlap_score(
        (Some("2025-06-01T00:00:00Z"), Some("2025-06-10T00:00:00Z")),
        (Some("2025-06-09T12:00:00Z"), Some("2025-06-20T00:00:00Z")),
        MatchType::SoloGroup,
    );
    assert_eq!(score, NormalizedScore::ZERO);
}

#[test]
fn test_every_feature_in_unit_range() {
    let user = traveler(28.6139, 77.2090, "2025-01-01", "2025-12-31", 1.0);
    let targets = [
        traveler(-33.8688, 151.2093, "2024-01-01", "2024-01-02", 9e9),
        traveler(28.6139, 77.2090, "2025-03-01", "2025-03-02", f64::NAN),
        SoloEntity::default(),
    ];

    for target in &targets {
        let v = extract_features(&user, MatchTarget::Solo(target));
        for (name, score) in v.numeric_fields() {
            assert!((0.0..=1.0).contains(&score.value()), "{} = {}", name, score);
        }
        assert!(v.is_valid());
    }
}

#[test]
fn test_group_fields_follow_match_type() {
    let user = traveler(28.6139, 77.2090, "2025-06-01", "2025-06-10", 20_000.0);
    let solo = extract_features(&user, MatchTarget::Solo(&user));
    let grouped = extract_features(&user, MatchTarget::Group(&group(28.62, 77.21, 9)));

    assert!(solo.group_size_score().is_none() && solo.group_diversity_score().is_none());
    assert_eq!(grouped.group_size_score().map(|s| s.value()), Some(0.8));
    // Languages: 2 distinct (0.7), nationalities: 1 (0.5)
    assert!((grouped.group_diversity_score().unwrap().value() - 0.6).abs() < 1e-9);
}

#[test]
fn test_group_budget_uses_absolute_gap() {
    let user = traveler(28.6139, 77.2090, "2025-06-01", "2025-06-10", 20_000.0);
    let v = extract_features(&user, MatchTarget::Group(&group(28.62, 77.21, 4)));

    // 1 - 5000/40000
    assert!((v.budget_score().value() - 0.875).abs() < 1e-9);
}

#[test]
fn test_distance_is_non_increasing() {
    let mut previous = 1.0;
    for km in (0..1000).map(|step| step as f64 * 0.5) {
        let score = score_for_distance_km(km).value();
        assert!(score <= previous);
        previous = score;
    }
}

#[test]
fn test_budget_is_symmetric() {
    for (a, b) in [(100.0, 250.0), (3_000.0, 2_999.0), (0.0, 10.0), (5e5, 1.0)] {
        assert_eq!(
            budget_score(Some(a), Some(b), MatchType::SoloSolo),
            budget_score(Some(b), Some(a), MatchType::SoloSolo)
        );
    }
}

#[test]
fn test_coerced_payload_is_valid() {
    let raw: RawFeatureVector = serde_json::from_value(serde_json::json!({
        "matchType": "user_group",
        "distanceScore": 3.0,
        "budgetScore": -1.0,
        "groupDiversityScore": 0.7
    }))
    .unwrap();

    let v = coerce(&raw);
    assert!(v.is_valid());
    assert_eq!(v.match_type(), MatchType::SoloGroup);
    assert_eq!(v.distance_score().value(), 1.0);
    assert_eq!(v.budget_score().value(), 0.0);
    assert_eq!(v.date_budget().value(), 0.0);
    assert!(count_active_features(&v) >= 3);

    assert!(!is_valid_json(&serde_json::json!({"distanceScore": 0.5})));
}
