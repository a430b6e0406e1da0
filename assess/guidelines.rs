//! # Clinical Risk Assessment
//!
//! A model verdict alone is a probability. Downstream consumers want a risk
//! band, a short list of plain-language insights, and a safety net for cases
//! the model is known to under-call: a clinical model fed survey data has no
//! HbA1c and only an estimated glucose, so values already in the diagnostic
//! range must raise the band regardless of what the model says.
//!
//! Thresholds follow the ADA diagnostic criteria:
//! - Diabetes range: HbA1c ≥ 6.5 % or glucose ≥ 200 mg/dL.
//! - Prediabetes range: HbA1c ≥ 5.7 % or glucose ≥ 140 mg/dL.

use crate::driver::Verdict;
use crate::record::RawRecord;
use serde::Serialize;
use std::fmt;

const HIGH_PROBABILITY: f64 = 0.6;
const MODERATE_PROBABILITY: f64 = 0.2;

const DIABETIC_HBA1C: f64 = 6.5;
const DIABETIC_GLUCOSE: f64 = 200.0;
const PREDIABETIC_HBA1C: f64 = 5.7;
const PREDIABETIC_GLUCOSE: f64 = 140.0;

const OBESE_BMI: f64 = 30.0;
const OVERWEIGHT_BMI: f64 = 25.0;
const HYPERTENSIVE_SYSTOLIC: f64 = 130.0;

/// Minimum displayed score for each band when the model score is lower.
const HIGH_DISPLAY_FLOOR: (u8, u8) = (60, 85);
const MODERATE_DISPLAY_FLOOR: (u8, u8) = (20, 45);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum RiskLevel {
    Low,
    Moderate,
    High,
}

impl RiskLevel {
    pub fn from_probability(probability: f64) -> Self {
        if probability >= HIGH_PROBABILITY {
            RiskLevel::High
        } else if probability >= MODERATE_PROBABILITY {
            RiskLevel::Moderate
        } else {
            RiskLevel::Low
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RiskLevel::Low => "Low",
            RiskLevel::Moderate => "Moderate",
            RiskLevel::High => "High",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Assessment {
    pub risk_level: RiskLevel,
    pub clinical_override: bool,
    pub insights: Vec<String>,
    pub display_score: u8,
    pub message: String,
}

/// The handful of measurements the guidelines look at, read leniently.
struct Markers {
    glucose: f64,
    hba1c: f64,
    bmi: f64,
    high_blood_pressure: bool,
}

impl Markers {
    fn from_record(record: &RawRecord) -> Self {
        let nonzero = |key: &str| record.number(key).filter(|v| *v != 0.0);
        let glucose = nonzero("glucose")
            .or_else(|| nonzero("bloodGlucoseEstimated"))
            .unwrap_or(0.0);
        let high_blood_pressure = record.code("highBP") == Some(1)
            || record
                .number("bloodPressure")
                .is_some_and(|bp| bp > HYPERTENSIVE_SYSTOLIC);
        Self {
            glucose,
            hba1c: record.number("hba1cEstimated").unwrap_or(0.0),
            bmi: record.number("bmi").unwrap_or(0.0),
            high_blood_pressure,
        }
    }
}

/// Bands the verdict, applies guideline overrides, and collects insights.
pub fn assess(record: &RawRecord, verdict: &Verdict) -> Assessment {
    let markers = Markers::from_record(record);
    let mut level = RiskLevel::from_probability(verdict.probability);
    let mut clinical_override = false;

    if markers.hba1c >= DIABETIC_HBA1C || markers.glucose >= DIABETIC_GLUCOSE {
        level = RiskLevel::High;
        clinical_override = true;
    } else if markers.hba1c >= PREDIABETIC_HBA1C || markers.glucose >= PREDIABETIC_GLUCOSE {
        level = level.max(RiskLevel::Moderate);
        clinical_override = true;
    }
    if clinical_override {
        log::info!("Risk level raised to {level} by clinical guideline thresholds");
    }

    let mut insights = Vec::new();
    if clinical_override {
        insights.push("Risk level elevated based on clinical guidelines (HbA1c/Glucose).".to_string());
    } else if level == RiskLevel::High {
        insights.push(
            "Your calculated risk is High based on ML factors. Please consult a healthcare provider."
                .to_string(),
        );
    }
    if markers.glucose > PREDIABETIC_GLUCOSE {
        insights.push(format!(
            "Glucose level ({:.1}) appears elevated.",
            markers.glucose
        ));
    }
    if markers.hba1c > PREDIABETIC_HBA1C {
        insights.push(format!(
            "HbA1c level ({:.1}%) is above normal.",
            markers.hba1c
        ));
    }
    if markers.bmi > OBESE_BMI {
        insights.push("BMI indicates obesity. Weight management reduces risk.".to_string());
    } else if markers.bmi > OVERWEIGHT_BMI {
        insights.push("BMI indicates overweight.".to_string());
    }
    if markers.high_blood_pressure {
        insights.push("High blood pressure is a contributing risk factor.".to_string());
    }
    if insights.is_empty() && level == RiskLevel::Low {
        insights.push("Great job! Your metrics indicate a healthy profile.".to_string());
    }

    Assessment {
        risk_level: level,
        clinical_override,
        insights,
        display_score: display_score(level, verdict.risk_score),
        message: verdict_message(verdict.prediction).to_string(),
    }
}

fn verdict_message(prediction: u8) -> &'static str {
    if prediction == 1 {
        "Prediction indicates potential risk."
    } else {
        "Prediction indicates low risk."
    }
}

/// Keeps the displayed score consistent with the band.
fn display_score(level: RiskLevel, score: u8) -> u8 {
    let floor = match level {
        RiskLevel::High => Some(HIGH_DISPLAY_FLOOR),
        RiskLevel::Moderate => Some(MODERATE_DISPLAY_FLOOR),
        RiskLevel::Low => None,
    };
    match floor {
        Some((minimum, replacement)) if score < minimum => replacement,
        _ => score,
    }
}
