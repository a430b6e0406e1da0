//! Feature schema resolution and the canonical clinical vocabulary.
//!
//! The resolver only inspects what the model is willing to tell us. A model
//! that stores its column names yields `Named`, one that only knows its input
//! width yields `Counted`, and anything else degrades to `Unknown`. None of
//! these outcomes is an error.

use crate::model::capability::Model;
use std::fmt;
use std::ops::RangeInclusive;

/// The eight fields of the clinical (Pima-style) diabetes schema, in the
/// canonical column order used by models that only report a feature count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClinicalField {
    Pregnancies,
    Glucose,
    BloodPressure,
    SkinThickness,
    Insulin,
    Bmi,
    DiabetesPedigreeFunction,
    Age,
}

impl ClinicalField {
    pub const ALL: [ClinicalField; 8] = [
        ClinicalField::Pregnancies,
        ClinicalField::Glucose,
        ClinicalField::BloodPressure,
        ClinicalField::SkinThickness,
        ClinicalField::Insulin,
        ClinicalField::Bmi,
        ClinicalField::DiabetesPedigreeFunction,
        ClinicalField::Age,
    ];

    /// Column name as the clinical models spell it.
    pub fn name(self) -> &'static str {
        match self {
            ClinicalField::Pregnancies => "Pregnancies",
            ClinicalField::Glucose => "Glucose",
            ClinicalField::BloodPressure => "BloodPressure",
            ClinicalField::SkinThickness => "SkinThickness",
            ClinicalField::Insulin => "Insulin",
            ClinicalField::Bmi => "BMI",
            ClinicalField::DiabetesPedigreeFunction => "DiabetesPedigreeFunction",
            ClinicalField::Age => "Age",
        }
    }

    /// Value used by the categorical mapping when the record says nothing.
    /// Blood pressure and age have derived defaults (72 mmHg with no
    /// hypertension flag, bracket 5 for age), reported here in resolved form.
    pub fn default_value(self) -> f64 {
        match self {
            ClinicalField::Pregnancies => 1.0,
            ClinicalField::Glucose => 100.0,
            ClinicalField::BloodPressure => 72.0,
            ClinicalField::SkinThickness => 20.0,
            ClinicalField::Insulin => 79.0,
            ClinicalField::Bmi => 25.0,
            ClinicalField::DiabetesPedigreeFunction => 0.47,
            ClinicalField::Age => 42.0,
        }
    }

    /// Plausible range observed in the clinical training population.
    /// Informational only: values outside it are passed to the model unchanged.
    pub fn valid_range(self) -> RangeInclusive<f64> {
        match self {
            ClinicalField::Pregnancies => 0.0..=17.0,
            ClinicalField::Glucose => 0.0..=199.0,
            ClinicalField::BloodPressure => 0.0..=122.0,
            ClinicalField::SkinThickness => 0.0..=99.0,
            ClinicalField::Insulin => 0.0..=846.0,
            ClinicalField::Bmi => 0.0..=67.1,
            ClinicalField::DiabetesPedigreeFunction => 0.078..=2.42,
            ClinicalField::Age => 21.0..=81.0,
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|field| field.name() == name)
    }

    pub(crate) fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for ClinicalField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Number of columns in the clinical schema.
pub const CLINICAL_FEATURE_COUNT: usize = ClinicalField::ALL.len();

pub fn clinical_feature_names() -> Vec<String> {
    ClinicalField::ALL
        .iter()
        .map(|field| field.name().to_string())
        .collect()
}

/// What we managed to learn about the model's expected input.
#[derive(Debug, Clone, PartialEq)]
pub enum FeatureSchema {
    Named(Vec<String>),
    Counted(usize),
    Unknown,
}

impl FeatureSchema {
    /// Declared input width, when the model declares one.
    pub fn declared_len(&self) -> Option<usize> {
        match self {
            FeatureSchema::Named(names) => Some(names.len()),
            FeatureSchema::Counted(n) => Some(*n),
            FeatureSchema::Unknown => None,
        }
    }

    /// True when at least one named column is a clinical field, compared
    /// without regard to case.
    pub fn overlaps_clinical(&self) -> bool {
        let FeatureSchema::Named(names) = self else {
            return false;
        };
        names.iter().any(|name| {
            let lowered = name.to_lowercase();
            ClinicalField::ALL
                .iter()
                .any(|field| field.name().to_lowercase() == lowered)
        })
    }
}

impl fmt::Display for FeatureSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeatureSchema::Named(names) => write!(f, "named features {names:?}"),
            FeatureSchema::Counted(n) => write!(f, "{n} unnamed features"),
            FeatureSchema::Unknown => f.write_str("no feature information"),
        }
    }
}

/// Inspects the model's introspection capability.
pub fn resolve_schema(model: &dyn Model) -> FeatureSchema {
    let schema = match model.schema() {
        Some(provider) => match (provider.named_features(), provider.feature_count()) {
            (Some(names), _) => FeatureSchema::Named(names.to_vec()),
            (None, Some(count)) => FeatureSchema::Counted(count),
            (None, None) => FeatureSchema::Unknown,
        },
        None => FeatureSchema::Unknown,
    };
    log::debug!("Resolved model schema: {schema}");
    schema
}
