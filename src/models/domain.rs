use serde::{Deserialize, Serialize};

use crate::models::features::MatchType;

/// Geographic coordinates in degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLon {
    pub lat: f64,
    pub lon: f64,
}

impl LatLon {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }
}

/// Attributes of a traveler that do not change from trip to trip
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StaticAttributes {
    #[serde(default)]
    pub age: Option<f64>,
    #[serde(default)]
    pub interests: Option<Vec<String>>,
    #[serde(default)]
    pub personality: Option<String>,
    #[serde(default)]
    pub location: Option<LatLon>,
    #[serde(default)]
    pub smoking: Option<String>,
    #[serde(default)]
    pub drinking: Option<String>,
    #[serde(default)]
    pub religion: Option<String>,
}

/// Snapshot of a solo traveler's trip session plus profile attributes
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SoloEntity {
    #[serde(rename = "userId", default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default)]
    pub destination: Option<LatLon>,
    #[serde(rename = "startDate", default)]
    pub start_date: Option<String>,
    #[serde(rename = "endDate", default)]
    pub end_date: Option<String>,
    #[serde(default)]
    pub budget: Option<f64>,
    #[serde(default)]
    pub static_attributes: StaticAttributes,
}

impl SoloEntity {
    pub fn age(&self) -> Option<f64> {
        self.static_attributes.age
    }

    pub fn interests(&self) -> Option<&[String]> {
        self.static_attributes.interests.as_deref()
    }

    pub fn personality(&self) -> Option<&str> {
        self.static_attributes.personality.as_deref()
    }
}

/// Aggregated snapshot of a travel group
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GroupEntity {
    #[serde(rename = "groupId", default, skip_serializing_if = "Option::is_none")]
    pub group_id: Option<String>,
    #[serde(default)]
    pub destination: Option<LatLon>,
    #[serde(rename = "startDate", default)]
    pub start_date: Option<String>,
    #[serde(rename = "endDate", default)]
    pub end_date: Option<String>,
    #[serde(rename = "averageBudget", default)]
    pub average_budget: Option<f64>,
    #[serde(rename = "averageAge", default)]
    pub average_age: Option<f64>,
    #[serde(rename = "topInterests", default)]
    pub top_interests: Option<Vec<String>>,
    #[serde(rename = "dominantLanguages", default)]
    pub dominant_languages: Option<Vec<String>>,
    #[serde(rename = "dominantNationalities", default)]
    pub dominant_nationalities: Option<Vec<String>>,
    #[serde(rename = "smokingPolicy", default)]
    pub smoking_policy: Option<String>,
    #[serde(rename = "drinkingPolicy", default)]
    pub drinking_policy: Option<String>,
    /// Member count
    #[serde(default)]
    pub size: Option<u32>,
}

/// The other side of a compatibility evaluation
#[derive(Debug, Clone, Copy)]
pub enum MatchTarget<'a> {
    Solo(&'a SoloEntity),
    Group(&'a GroupEntity),
}

impl MatchTarget<'_> {
    pub fn match_type(&self) -> MatchType {
        match self {
            MatchTarget::Solo(_) => MatchType::SoloSolo,
            MatchTarget::Group(_) => MatchType::SoloGroup,
        }
    }

    pub fn destination(&self) -> Option<LatLon> {
        match self {
            MatchTarget::Solo(solo) => solo.destination,
            MatchTarget::Group(group) => group.destination,
        }
    }

    pub fn dates(&self) -> (Option<&str>, Option<&str>) {
        match self {
            MatchTarget::Solo(solo) => (solo.start_date.as_deref(), solo.end_date.as_deref()),
            MatchTarget::Group(group) => (group.start_date.as_deref(), group.end_date.as_deref()),
        }
    }

    pub fn budget(&self) -> Option<f64> {
        match self {
            MatchTarget::Solo(solo) => solo.budget,
            MatchTarget::Group(group) => group.average_budget,
        }
    }

    pub fn age(&self) -> Option<f64> {
        match self {
            MatchTarget::Solo(solo) => solo.age(),
            MatchTarget::Group(group) => group.average_age,
        }
    }

    pub fn interests(&self) -> Option<&[String]> {
        match self {
            MatchTarget::Solo(solo) => solo.interests(),
            MatchTarget::Group(group) => group.top_interests.as_deref(),
        }
    }
}

/// Tri-state personality tag used by the compatibility matrix
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Personality {
    Introvert,
    Ambivert,
    Extrovert,
}

impl Personality {
    /// Parse a free-text tag; unknown tags yield `None`
    pub fn parse(tag: &str) -> Option<Self> {
        match tag.trim().to_lowercase().as_str() {
            "introvert" => Some(Personality::Introvert),
            "ambivert" => Some(Personality::Ambivert),
            "extrovert" => Some(Personality::Extrovert),
            _ => None,
        }
    }

    /// Position on the introvert-extrovert axis
    pub(crate) fn rank(self) -> u8 {
        match self {
            Personality::Introvert => 0,
            Personality::Ambivert => 1,
            Personality::Extrovert => 2,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_solo_entity_from_session_json() {
        let json = r#"{
            "userId": "u1",
            "destination": {"lat": 48.8566, "lon": 2.3522},
            "startDate": "2025-06-01",
            "endDate": "2025-06-10",
            "budget": 20000,
            "static_attributes": {"age": 27, "interests": ["food", "museums"], "personality": "ambivert"}
        }"#;

        let solo: SoloEntity = serde_json::from_str(json).unwrap();
        assert_eq!(solo.user_id.as_deref(), Some("u1"));
        assert_eq!(solo.age(), Some(27.0));
        assert_eq!(solo.interests().map(|i| i.len()), Some(2));
        assert_eq!(solo.personality(), Some("ambivert"));
    }

    #[test]
    fn test_group_entity_defaults_missing_fields() {
        let group: GroupEntity = serde_json::from_str(r#"{"size": 5}"#).unwrap();
        assert_eq!(group.size, Some(5));
        assert!(group.destination.is_none());
        assert!(group.dominant_languages.is_none());
    }

    #[test]
    fn test_personality_parse() {
        assert_eq!(Personality::parse(" Introvert "), Some(Personality::Introvert));
        assert_eq!(Personality::parse("EXTROVERT"), Some(Personality::Extrovert));
        assert_eq!(Personality::parse("omnivert"), None);
    }

    #[test]
    fn test_match_target_type() {
        let solo = SoloEntity::default();
        let group = GroupEntity::default();
        assert_eq!(MatchTarget::Solo(&solo).match_type(), MatchType::SoloSolo);
        assert_eq!(MatchTarget::Group(&group).match_type(), MatchType::SoloGroup);
    }
}
