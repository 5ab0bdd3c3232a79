//! Participant input validation
//!
//! The harness submits raw form values; each is validated here into a typed
//! value before anything touches the participant's record. Nothing is ever
//! clamped: an out-of-range value is an error the harness re-prompts on.

use crate::core::Money;
use crate::orchestrator::ExperimentError;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Risky-asset share of the current portfolio, integer percent in [0, 100]
///
/// # Example
/// ```
/// use portfolio_experiment_core_rs::Allocation;
///
/// assert_eq!(Allocation::new(40).unwrap().percent(), 40);
/// assert!(Allocation::new(101).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct Allocation(u8);

impl Allocation {
    pub const MAX_PERCENT: i64 = 100;

    pub fn new(percent: i64) -> Result<Self, ExperimentError> {
        if !(0..=Self::MAX_PERCENT).contains(&percent) {
            debug!(value = percent, "rejected allocation");
            return Err(ExperimentError::InvalidAllocation { value: percent });
        }
        Ok(Allocation(percent as u8))
    }

    pub fn percent(self) -> u8 {
        self.0
    }
}

impl TryFrom<i64> for Allocation {
    type Error = ExperimentError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Allocation::new(value)
    }
}

impl From<Allocation> for i64 {
    fn from(allocation: Allocation) -> i64 {
        allocation.0 as i64
    }
}

fn check_range(field: &'static str, value: i64, min: i64, max: i64) -> Result<(), ExperimentError> {
    if (min..=max).contains(&value) {
        Ok(())
    } else {
        debug!(field, value, min, max, "rejected out-of-range field");
        Err(ExperimentError::InvalidField {
            field,
            reason: format!("{} is outside [{}, {}]", value, min, max),
        })
    }
}

fn optional_text(value: Option<String>) -> Option<String> {
    value
        .map(|text| text.trim().to_string())
        .filter(|text| !text.is_empty())
}

// ============================================================================
// Beliefs
// ============================================================================

/// Raw belief-elicitation form as submitted between the rounds
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BeliefsForm {
    /// Minimum selling price for the current portfolio (cents)
    pub wta_sell: Money,
    /// Believed probability of a positive stock return (%)
    pub belief_stock_prob: i64,
    /// Luck (1) vs skill (7) attribution of the round-1 result
    pub luck_vs_skill: i64,
}

/// Validated beliefs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Beliefs {
    pub wta_sell: Money,
    pub belief_stock_prob: u8,
    pub luck_vs_skill: u8,
}

impl BeliefsForm {
    pub const WTA_SELL_MAX: Money = Money::from_units(200);

    pub fn validate(self) -> Result<Beliefs, ExperimentError> {
        check_range(
            "wta_sell",
            self.wta_sell.cents(),
            0,
            Self::WTA_SELL_MAX.cents(),
        )?;
        check_range("belief_stock_prob", self.belief_stock_prob, 0, 100)?;
        check_range("luck_vs_skill", self.luck_vs_skill, 1, 7)?;

        Ok(Beliefs {
            wta_sell: self.wta_sell,
            belief_stock_prob: self.belief_stock_prob as u8,
            luck_vs_skill: self.luck_vs_skill as u8,
        })
    }
}

// ============================================================================
// Demographics
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Gender {
    #[serde(rename = "male")]
    Male,
    #[serde(rename = "female")]
    Female,
    #[serde(rename = "other")]
    Other,
    #[serde(rename = "prefer not to say")]
    PreferNotToSay,
}

impl Gender {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "male" => Some(Gender::Male),
            "female" => Some(Gender::Female),
            "other" => Some(Gender::Other),
            "prefer not to say" => Some(Gender::PreferNotToSay),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Gender::Male => "male",
            Gender::Female => "female",
            Gender::Other => "other",
            Gender::PreferNotToSay => "prefer not to say",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Education {
    HighSchool,
    Bachelor,
    Master,
    Phd,
    Other,
}

impl Education {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "high_school" => Some(Education::HighSchool),
            "bachelor" => Some(Education::Bachelor),
            "master" => Some(Education::Master),
            "phd" => Some(Education::Phd),
            "other" => Some(Education::Other),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Education::HighSchool => "high_school",
            Education::Bachelor => "bachelor",
            Education::Master => "master",
            Education::Phd => "phd",
            Education::Other => "other",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvestmentExperience {
    None,
    Little,
    Moderate,
    Extensive,
}

impl InvestmentExperience {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "none" => Some(InvestmentExperience::None),
            "little" => Some(InvestmentExperience::Little),
            "moderate" => Some(InvestmentExperience::Moderate),
            "extensive" => Some(InvestmentExperience::Extensive),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            InvestmentExperience::None => "none",
            InvestmentExperience::Little => "little",
            InvestmentExperience::Moderate => "moderate",
            InvestmentExperience::Extensive => "extensive",
        }
    }
}

/// Raw demographics form; choice fields arrive as strings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DemographicsForm {
    pub age: i64,
    pub gender: String,
    pub education: String,
    #[serde(default)]
    pub field_of_study: Option<String>,
    /// 1 = very risk-averse, 10 = very risk-seeking
    pub risk_attitude: i64,
    pub investment_experience: String,
    /// What influenced the round-2 decision
    #[serde(default)]
    pub decision_reasoning: Option<String>,
}

/// Validated demographics
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Demographics {
    pub age: u8,
    pub gender: Gender,
    pub education: Education,
    pub field_of_study: Option<String>,
    pub risk_attitude: u8,
    pub investment_experience: InvestmentExperience,
    pub decision_reasoning: Option<String>,
}

fn invalid_choice(field: &'static str, value: &str) -> ExperimentError {
    debug!(field, value, "rejected choice");
    ExperimentError::InvalidField {
        field,
        reason: format!("'{}' is not an allowed choice", value),
    }
}

impl DemographicsForm {
    pub fn validate(self) -> Result<Demographics, ExperimentError> {
        check_range("age", self.age, 18, 100)?;
        check_range("risk_attitude", self.risk_attitude, 1, 10)?;

        let gender =
            Gender::parse(&self.gender).ok_or_else(|| invalid_choice("gender", &self.gender))?;
        let education = Education::parse(&self.education)
            .ok_or_else(|| invalid_choice("education", &self.education))?;
        let investment_experience = InvestmentExperience::parse(&self.investment_experience)
            .ok_or_else(|| invalid_choice("investment_experience", &self.investment_experience))?;

        Ok(Demographics {
            age: self.age as u8,
            gender,
            education,
            field_of_study: optional_text(self.field_of_study),
            risk_attitude: self.risk_attitude as u8,
            investment_experience,
            decision_reasoning: optional_text(self.decision_reasoning),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allocation_bounds_inclusive() {
        assert!(Allocation::new(0).is_ok());
        assert!(Allocation::new(100).is_ok());
        assert_eq!(
            Allocation::new(-5),
            Err(ExperimentError::InvalidAllocation { value: -5 })
        );
    }

    #[test]
    fn test_allocation_deserialize_validates() {
        let ok: Allocation = serde_json::from_str("55").unwrap();
        assert_eq!(ok.percent(), 55);
        assert!(serde_json::from_str::<Allocation>("150").is_err());
    }

    #[test]
    fn test_blank_optional_text_is_none() {
        assert_eq!(optional_text(Some("   ".to_string())), None);
        assert_eq!(
            optional_text(Some(" economics ".to_string())),
            Some("economics".to_string())
        );
    }
}
