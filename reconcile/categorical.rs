//! # Categorical → Clinical Heuristic Mapping
//!
//! Behavioural-survey records (BRFSS style) describe a patient with coded
//! categories: an age bracket from 1 to 13, binary flags for sex and high blood
//! pressure, and little else. Clinical models (Pima style) want measurements.
//! This module bridges the two with fixed, population-level approximations so a
//! clinical model can still produce a verdict for a survey-style record.
//!
//! The mapping is total: every clinical field receives a value, and a field that
//! is missing or cannot be read as a number takes its documented default. It is
//! an approximation, not a measurement, and the verdict inherits that caveat.

use crate::record::RawRecord;
use crate::schema::ClinicalField;
use std::ops::Index;

/// Representative age in years for each survey age bracket
/// (1: 18-24, 2: 25-29, ... 12: 75-79, 13: 80+).
const AGE_BRACKET_YEARS: [(i64, f64); 13] = [
    (1, 21.0),
    (2, 27.0),
    (3, 32.0),
    (4, 37.0),
    (5, 42.0),
    (6, 47.0),
    (7, 52.0),
    (8, 57.0),
    (9, 62.0),
    (10, 67.0),
    (11, 72.0),
    (12, 77.0),
    (13, 80.0),
];

/// Bracket 5 (40-44) stands in for a missing or unreadable age code.
const DEFAULT_AGE_YEARS: f64 = 42.0;

const BLOOD_PRESSURE_HYPERTENSIVE: f64 = 90.0;
const BLOOD_PRESSURE_NORMAL: f64 = 72.0;

/// Input keys of the survey convention, spelled exactly as callers send them.
mod keys {
    pub const AGE: &str = "age";
    pub const GLUCOSE_ESTIMATED: &str = "bloodGlucoseEstimated";
    pub const GLUCOSE: &str = "glucose";
    pub const HIGH_BP: &str = "highBP";
    pub const BLOOD_PRESSURE: &str = "bloodPressure";
    pub const BMI: &str = "bmi";
    pub const INSULIN: &str = "insulin";
    pub const SKIN_THICKNESS: &str = "skinThickness";
    pub const SEX: &str = "sex";
    pub const PREGNANCIES: &str = "pregnancies";
    pub const PEDIGREE: &str = "diabetesPedigreeFunction";
}

/// A complete set of clinical values, one per `ClinicalField`.
#[derive(Debug, Clone, PartialEq)]
pub struct ClinicalValues([f64; 8]);

impl ClinicalValues {
    pub fn get(&self, field: ClinicalField) -> f64 {
        self.0[field.index()]
    }

    /// Value for an exact clinical column name.
    pub fn get_by_name(&self, name: &str) -> Option<f64> {
        ClinicalField::from_name(name).map(|field| self.get(field))
    }

    pub fn iter(&self) -> impl Iterator<Item = (ClinicalField, f64)> + '_ {
        ClinicalField::ALL
            .into_iter()
            .map(move |field| (field, self.get(field)))
    }
}

impl Index<ClinicalField> for ClinicalValues {
    type Output = f64;

    fn index(&self, field: ClinicalField) -> &f64 {
        &self.0[field.index()]
    }
}

/// Survey age bracket to representative age in years.
pub fn bracket_age(code: Option<i64>) -> f64 {
    code.and_then(|code| {
        AGE_BRACKET_YEARS
            .iter()
            .find(|(bracket, _)| *bracket == code)
            .map(|(_, years)| *years)
    })
    .unwrap_or(DEFAULT_AGE_YEARS)
}

/// True when the record looks like a survey record rather than a clinical one:
/// it carries a high-blood-pressure flag and does not carry both glucose and
/// insulin. Keys are compared case-insensitively.
///
/// This detector is deliberately naive and can misjudge partially filled
/// clinical records. JSON nulls never reach the record, so a null `glucose`
/// or `insulin` counts as missing here and does not block the survey path.
pub fn is_categorical(record: &RawRecord) -> bool {
    let has_survey_marker = record.has_key_ignoring_case("highbp");
    let has_clinical_markers =
        record.has_key_ignoring_case("glucose") && record.has_key_ignoring_case("insulin");
    has_survey_marker && !has_clinical_markers
}

/// Maps a survey-style record to the full clinical field set.
pub fn map_categorical(record: &RawRecord) -> ClinicalValues {
    let mut values = [0.0; 8];
    let mut set = |field: ClinicalField, value: f64| values[field.index()] = value;

    set(ClinicalField::Age, bracket_age(record.code(keys::AGE)));

    let glucose = [keys::GLUCOSE_ESTIMATED, keys::GLUCOSE]
        .into_iter()
        .find_map(|key| record.number(key))
        .unwrap_or_else(|| ClinicalField::Glucose.default_value());
    set(ClinicalField::Glucose, glucose);

    let derived_pressure = if record.code(keys::HIGH_BP) == Some(1) {
        BLOOD_PRESSURE_HYPERTENSIVE
    } else {
        BLOOD_PRESSURE_NORMAL
    };
    set(
        ClinicalField::BloodPressure,
        record
            .number(keys::BLOOD_PRESSURE)
            .unwrap_or(derived_pressure),
    );

    set(
        ClinicalField::Bmi,
        field_or_default(record, keys::BMI, ClinicalField::Bmi),
    );
    set(
        ClinicalField::Insulin,
        field_or_default(record, keys::INSULIN, ClinicalField::Insulin),
    );
    set(
        ClinicalField::SkinThickness,
        field_or_default(record, keys::SKIN_THICKNESS, ClinicalField::SkinThickness),
    );

    let pregnancies = if record.code(keys::SEX) == Some(1) {
        0.0
    } else {
        field_or_default(record, keys::PREGNANCIES, ClinicalField::Pregnancies)
    };
    set(ClinicalField::Pregnancies, pregnancies);

    set(
        ClinicalField::DiabetesPedigreeFunction,
        field_or_default(
            record,
            keys::PEDIGREE,
            ClinicalField::DiabetesPedigreeFunction,
        ),
    );

    let mapped = ClinicalValues(values);
    for (field, value) in mapped.iter() {
        if !field.valid_range().contains(&value) {
            log::debug!("Mapped {field} = {value} lies outside the range seen in clinical data");
        }
    }
    mapped
}

fn field_or_default(record: &RawRecord, key: &str, field: ClinicalField) -> f64 {
    record
        .number(key)
        .unwrap_or_else(|| field.default_value())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Scalar;
    use approx::assert_abs_diff_eq;

    fn record(json: &str) -> RawRecord {
        RawRecord::from_json_str(json).unwrap()
    }

    #[test]
    fn age_brackets_map_to_midpoints() {
        let ages: Vec<f64> = (1..=13).map(|code| bracket_age(Some(code))).collect();
        assert_eq!(
            ages,
            vec![
                21.0, 27.0, 32.0, 37.0, 42.0, 47.0, 52.0, 57.0, 62.0, 67.0, 72.0, 77.0, 80.0
            ]
        );
        assert_eq!(bracket_age(Some(0)), 42.0);
        assert_eq!(bracket_age(Some(14)), 42.0);
        assert_eq!(bracket_age(None), 42.0);
    }

    #[test]
    fn empty_record_takes_every_default() {
        let mapped = map_categorical(&RawRecord::default());
        for (field, value) in mapped.iter() {
            assert_abs_diff_eq!(value, field.default_value(), epsilon = 1e-12);
        }
    }

    #[test]
    fn male_records_never_report_pregnancies() {
        let mapped = map_categorical(&record(r#"{"sex": 1, "pregnancies": 4}"#));
        assert_eq!(mapped[ClinicalField::Pregnancies], 0.0);

        let female = map_categorical(&record(r#"{"sex": 0}"#));
        assert_eq!(female[ClinicalField::Pregnancies], 1.0);

        let female_with_history = map_categorical(&record(r#"{"sex": 0, "pregnancies": 3}"#));
        assert_eq!(female_with_history[ClinicalField::Pregnancies], 3.0);
    }

    #[test]
    fn blood_pressure_follows_flag_unless_explicit() {
        let high = map_categorical(&record(r#"{"highBP": 1}"#));
        assert_eq!(high[ClinicalField::BloodPressure], 90.0);

        let normal = map_categorical(&record(r#"{"highBP": 0}"#));
        assert_eq!(normal[ClinicalField::BloodPressure], 72.0);

        let explicit = map_categorical(&record(r#"{"highBP": 1, "bloodPressure": 66}"#));
        assert_eq!(explicit[ClinicalField::BloodPressure], 66.0);

        let unreadable = map_categorical(&record(r#"{"highBP": 1, "bloodPressure": "high"}"#));
        assert_eq!(unreadable[ClinicalField::BloodPressure], 90.0);
    }

    #[test]
    fn estimated_glucose_takes_precedence() {
        let both = map_categorical(&record(r#"{"bloodGlucoseEstimated": 132, "glucose": 99}"#));
        assert_eq!(both[ClinicalField::Glucose], 132.0);

        let raw = map_categorical(&record(r#"{"glucose": 99}"#));
        assert_eq!(raw[ClinicalField::Glucose], 99.0);

        let unreadable = map_categorical(&record(r#"{"bloodGlucoseEstimated": "n/a"}"#));
        assert_eq!(unreadable[ClinicalField::Glucose], 100.0);

        let fallback = map_categorical(&record(
            r#"{"highBP": 1, "bloodGlucoseEstimated": "n/a", "glucose": 160}"#,
        ));
        assert_eq!(fallback[ClinicalField::Glucose], 160.0);
    }

    #[test]
    fn unreadable_values_fall_back_to_defaults() {
        let mapped = map_categorical(&record(
            r#"{"age": "unknown", "bmi": "heavy", "insulin": true, "sex": "1"}"#,
        ));
        assert_eq!(mapped[ClinicalField::Age], 42.0);
        assert_eq!(mapped[ClinicalField::Bmi], 25.0);
        assert_eq!(mapped[ClinicalField::Insulin], 1.0);
        assert_eq!(mapped[ClinicalField::Pregnancies], 0.0);
    }

    #[test]
    fn survey_detection() {
        assert!(is_categorical(&record(r#"{"highBP": 1}"#)));
        assert!(is_categorical(&record(r#"{"HIGHBP": 0, "glucose": 120}"#)));
        assert!(!is_categorical(
            &record(r#"{"highBP": 1, "Glucose": 120, "insulin": 80}"#)
        ));
        assert!(!is_categorical(&record(r#"{"glucose": 120}"#)));

        assert!(is_categorical(&record(
            r#"{"highBP": 1, "glucose": null, "insulin": null}"#
        )));

        let flags: RawRecord = [("highbp", Scalar::Bool(true))].into_iter().collect();
        assert!(is_categorical(&flags));
    }
}
