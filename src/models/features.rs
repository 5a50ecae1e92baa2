use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// A compatibility sub-score constrained to the closed interval [0, 1].
///
/// The inner value is private: the only ways to obtain one are the clamping
/// factory [`NormalizedScore::new`] and the constants below. Non-finite input
/// maps to [`NormalizedScore::NEUTRAL`].
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize)]
#[serde(transparent)]
pub struct NormalizedScore(f64);

impl NormalizedScore {
    /// Value used whenever data is missing or invalid
    pub const NEUTRAL: NormalizedScore = NormalizedScore(0.5);
    pub const ZERO: NormalizedScore = NormalizedScore(0.0);
    pub const ONE: NormalizedScore = NormalizedScore(1.0);

    /// Clamp a raw value into [0, 1]. NaN and infinities become neutral.
    #[inline]
    pub fn new(raw: f64) -> Self {
        if !raw.is_finite() {
            return Self::NEUTRAL;
        }
        Self(raw.clamp(0.0, 1.0))
    }

    /// Like [`new`](Self::new), but a missing value is neutral too.
    #[inline]
    pub fn from_option(raw: Option<f64>) -> Self {
        raw.map(Self::new).unwrap_or(Self::NEUTRAL)
    }

    #[inline]
    pub fn value(self) -> f64 {
        self.0
    }

    /// Product of two scores, routed back through the factory.
    #[inline]
    pub fn product(self, other: NormalizedScore) -> Self {
        Self::new(self.0 * other.0)
    }

    #[inline]
    pub fn is_neutral(self) -> bool {
        self == Self::NEUTRAL
    }
}

impl Default for NormalizedScore {
    fn default() -> Self {
        Self::NEUTRAL
    }
}

impl fmt::Display for NormalizedScore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.3}", self.0)
    }
}

impl<'de> Deserialize<'de> for NormalizedScore {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = f64::deserialize(deserializer)?;
        Ok(Self::new(raw))
    }
}

/// Which kind of pair is being evaluated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MatchType {
    #[serde(rename = "solo_solo", alias = "user_user")]
    SoloSolo,
    #[serde(rename = "solo_group", alias = "user_group")]
    SoloGroup,
}

impl MatchType {
    pub fn as_str(self) -> &'static str {
        match self {
            MatchType::SoloSolo => "solo_solo",
            MatchType::SoloGroup => "solo_group",
        }
    }

    /// Discriminator spelling the trained model was fit on.
    pub fn model_label(self) -> &'static str {
        match self {
            MatchType::SoloSolo => "user_user",
            MatchType::SoloGroup => "user_group",
        }
    }

    pub fn is_group(self) -> bool {
        matches!(self, MatchType::SoloGroup)
    }
}

impl fmt::Display for MatchType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Schema-valid feature vector for one pairwise evaluation.
///
/// Fields are crate-private so a vector can only come out of the extractor or
/// the normalizer. Group-only scores are never set for `solo_solo`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawFeatureVector")]
pub struct CompatibilityFeatureVector {
    #[serde(rename = "matchType")]
    pub(crate) match_type: MatchType,
    #[serde(rename = "distanceScore")]
    pub(crate) distance_score: NormalizedScore,
    #[serde(rename = "dateOverlapScore")]
    pub(crate) date_overlap_score: NormalizedScore,
    #[serde(rename = "budgetScore")]
    pub(crate) budget_score: NormalizedScore,
    #[serde(rename = "interestScore")]
    pub(crate) interest_score: NormalizedScore,
    #[serde(rename = "ageScore")]
    pub(crate) age_score: NormalizedScore,
    #[serde(rename = "personalityScore")]
    pub(crate) personality_score: NormalizedScore,
    pub(crate) destination_interest: NormalizedScore,
    pub(crate) date_budget: NormalizedScore,
    #[serde(rename = "groupSizeScore", skip_serializing_if = "Option::is_none")]
    pub(crate) group_size_score: Option<NormalizedScore>,
    #[serde(rename = "groupDiversityScore", skip_serializing_if = "Option::is_none")]
    pub(crate) group_diversity_score: Option<NormalizedScore>,
}

impl CompatibilityFeatureVector {
    pub fn match_type(&self) -> MatchType {
        self.match_type
    }

    pub fn distance_score(&self) -> NormalizedScore {
        self.distance_score
    }

    pub fn date_overlap_score(&self) -> NormalizedScore {
        self.date_overlap_score
    }

    pub fn budget_score(&self) -> NormalizedScore {
        self.budget_score
    }

    pub fn interest_score(&self) -> NormalizedScore {
        self.interest_score
    }

    pub fn age_score(&self) -> NormalizedScore {
        self.age_score
    }

    pub fn personality_score(&self) -> NormalizedScore {
        self.personality_score
    }

    pub fn destination_interest(&self) -> NormalizedScore {
        self.destination_interest
    }

    pub fn date_budget(&self) -> NormalizedScore {
        self.date_budget
    }

    pub fn group_size_score(&self) -> Option<NormalizedScore> {
        self.group_size_score
    }

    pub fn group_diversity_score(&self) -> Option<NormalizedScore> {
        self.group_diversity_score
    }

    /// Every numeric field, optional group scores included when present
    pub fn numeric_fields(&self) -> Vec<(&'static str, NormalizedScore)> {
        let mut fields = vec![
            ("distanceScore", self.distance_score),
            ("dateOverlapScore", self.date_overlap_score),
            ("budgetScore", self.budget_score),
            ("interestScore", self.interest_score),
            ("ageScore", self.age_score),
            ("personalityScore", self.personality_score),
            ("destination_interest", self.destination_interest),
            ("date_budget", self.date_budget),
        ];
        if let Some(size) = self.group_size_score {
            fields.push(("groupSizeScore", size));
        }
        if let Some(diversity) = self.group_diversity_score {
            fields.push(("groupDiversityScore", diversity));
        }
        fields
    }

    /// Re-run the schema checks against this vector
    pub fn is_valid(&self) -> bool {
        crate::core::normalize::is_valid(&RawFeatureVector::from(self))
    }
}

/// Untrusted, possibly partial feature data (external payloads, logs).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawFeatureVector {
    #[serde(rename = "matchType")]
    pub match_type: MatchType,
    #[serde(rename = "distanceScore", default)]
    pub distance_score: Option<f64>,
    #[serde(rename = "dateOverlapScore", default)]
    pub date_overlap_score: Option<f64>,
    #[serde(rename = "budgetScore", default)]
    pub budget_score: Option<f64>,
    #[serde(rename = "interestScore", default)]
    pub interest_score: Option<f64>,
    #[serde(rename = "ageScore", default)]
    pub age_score: Option<f64>,
    #[serde(rename = "personalityScore", default)]
    pub personality_score: Option<f64>,
    #[serde(default)]
    pub destination_interest: Option<f64>,
    #[serde(default)]
    pub date_budget: Option<f64>,
    #[serde(rename = "groupSizeScore", default)]
    pub group_size_score: Option<f64>,
    #[serde(rename = "groupDiversityScore", default)]
    pub group_diversity_score: Option<f64>,
}

impl RawFeatureVector {
    pub fn new(match_type: MatchType) -> Self {
        Self {
            match_type,
            distance_score: None,
            date_overlap_score: None,
            budget_score: None,
            interest_score: None,
            age_score: None,
            personality_score: None,
            destination_interest: None,
            date_budget: None,
            group_size_score: None,
            group_diversity_score: None,
        }
    }
}

impl From<&CompatibilityFeatureVector> for RawFeatureVector {
    fn from(vector: &CompatibilityFeatureVector) -> Self {
        Self {
            match_type: vector.match_type,
            distance_score: Some(vector.distance_score.value()),
            date_overlap_score: Some(vector.date_overlap_score.value()),
            budget_score: Some(vector.budget_score.value()),
            interest_score: Some(vector.interest_score.value()),
            age_score: Some(vector.age_score.value()),
            personality_score: Some(vector.personality_score.value()),
            destination_interest: Some(vector.destination_interest.value()),
            date_budget: Some(vector.date_budget.value()),
            group_size_score: vector.group_size_score.map(NormalizedScore::value),
            group_diversity_score: vector.group_diversity_score.map(NormalizedScore::value),
        }
    }
}

impl From<RawFeatureVector> for CompatibilityFeatureVector {
    fn from(raw: RawFeatureVector) -> Self {
        crate::core::normalize::coerce(&raw)
    }
}
