use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Normal,
    Hard,
}

/// When the level annual deposit lands inside each saving year.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Timing {
    #[default]
    #[serde(alias = "end-of-period", alias = "endOfPeriod")]
    End,
    #[serde(alias = "begin-of-period", alias = "beginOfPeriod", alias = "start")]
    Begin,
}

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub enum Method {
    #[default]
    #[serde(rename = "AM", alias = "am")]
    Annuity,
    #[serde(rename = "CPM", alias = "cpm")]
    CapitalPreservation,
    #[serde(rename = "PPPM", alias = "pppm")]
    PurchasingPowerPreservation,
}

impl Method {
    /// The capital field followed by the required-savings field.
    pub fn answer_fields(self) -> [AnswerField; 2] {
        match self {
            Method::Annuity => [AnswerField::CapA, AnswerField::SvA],
            Method::CapitalPreservation => [AnswerField::TotalCpm, AnswerField::SvCpm],
            Method::PurchasingPowerPreservation => {
                [AnswerField::TotalPppm, AnswerField::SvPppm]
            }
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
pub enum AnswerField {
    #[serde(rename = "capA")]
    CapA,
    #[serde(rename = "svA")]
    SvA,
    #[serde(rename = "totalCPM")]
    TotalCpm,
    #[serde(rename = "svCPM")]
    SvCpm,
    #[serde(rename = "totalPPPM")]
    TotalPppm,
    #[serde(rename = "svPPPM")]
    SvPppm,
}

/// One retirement-funding problem. Rates are decimal fractions, `rwle` and
/// `rle` are whole years.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scenario {
    pub income: f64,
    pub wrr: f64,
    pub ss: f64,
    pub rwle: u32,
    pub rle: u32,
    pub g: f64,
    pub r: f64,
    #[serde(default)]
    pub pvcur: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub r_retire: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bequest: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ScenarioError {
    #[error("{field} must be a finite number (got {value})")]
    NotFinite { field: &'static str, value: f64 },
    #[error("{field} must be greater than {min} (got {value})")]
    TooSmall {
        field: &'static str,
        min: f64,
        value: f64,
    },
    #[error("{field} must be at least {min} (got {value})")]
    Negative {
        field: &'static str,
        min: f64,
        value: f64,
    },
    #[error("{field} must be at least 1 year")]
    ZeroYears { field: &'static str },
}

impl Scenario {
    /// Checks a hand-entered scenario before any truth is computed from it.
    pub fn validate(&self) -> Result<(), ScenarioError> {
        require_above("income", self.income, 0.0)?;
        require_at_least("wrr", self.wrr, 0.0)?;
        require_at_least("ss", self.ss, 0.0)?;
        require_at_least("pvcur", self.pvcur, 0.0)?;
        if let Some(bequest) = self.bequest {
            require_at_least("bequest", bequest, 0.0)?;
        }
        require_above("g", self.g, -1.0)?;
        require_above("r", self.r, -1.0)?;
        if let Some(r_retire) = self.r_retire {
            require_above("rRetire", r_retire, -1.0)?;
        }
        if self.rwle == 0 {
            return Err(ScenarioError::ZeroYears { field: "rwle" });
        }
        if self.rle == 0 {
            return Err(ScenarioError::ZeroYears { field: "rle" });
        }
        Ok(())
    }
}

fn require_finite(field: &'static str, value: f64) -> Result<(), ScenarioError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(ScenarioError::NotFinite { field, value })
    }
}

fn require_above(field: &'static str, value: f64, min: f64) -> Result<(), ScenarioError> {
    require_finite(field, value)?;
    if value > min {
        Ok(())
    } else {
        Err(ScenarioError::TooSmall { field, min, value })
    }
}

fn require_at_least(field: &'static str, value: f64, min: f64) -> Result<(), ScenarioError> {
    require_finite(field, value)?;
    if value >= min {
        Ok(())
    } else {
        Err(ScenarioError::Negative { field, min, value })
    }
}

/// Cosmetic character attached to a generated scenario. Never graded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Persona {
    pub name: String,
    pub occupation: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedProblem {
    pub seed: u32,
    pub difficulty: Difficulty,
    pub persona: Persona,
    pub scenario: Scenario,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Truth {
    #[serde(rename = "needToday")]
    pub need_today: f64,
    #[serde(rename = "PMT1")]
    pub pmt1: f64,
    #[serde(rename = "rReal")]
    pub r_real: f64,
    #[serde(rename = "capA")]
    pub cap_a: f64,
    #[serde(rename = "keepCPM")]
    pub keep_cpm: f64,
    #[serde(rename = "totalCPM")]
    pub total_cpm: f64,
    #[serde(rename = "keepPPPM")]
    pub keep_pppm: f64,
    #[serde(rename = "totalPPPM")]
    pub total_pppm: f64,
    #[serde(rename = "svA")]
    pub sv_a: f64,
    #[serde(rename = "svCPM")]
    pub sv_cpm: f64,
    #[serde(rename = "svPPPM")]
    pub sv_pppm: f64,
}

impl Truth {
    pub fn value(&self, field: AnswerField) -> f64 {
        match field {
            AnswerField::CapA => self.cap_a,
            AnswerField::SvA => self.sv_a,
            AnswerField::TotalCpm => self.total_cpm,
            AnswerField::SvCpm => self.sv_cpm,
            AnswerField::TotalPppm => self.total_pppm,
            AnswerField::SvPppm => self.sv_pppm,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    Correct,
    Incorrect,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldGrade {
    pub field: AnswerField,
    pub submitted: f64,
    pub expected: f64,
    pub abs_error: f64,
    pub rel_error: f64,
    pub verdict: Verdict,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Grade {
    pub method: Method,
    pub fields: Vec<FieldGrade>,
}

/// Running practice counters. Only `Stats::reset` moves them backwards.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Stats {
    pub attempted: u32,
    pub all_correct: u32,
    pub correct: u32,
    pub incorrect: u32,
}
