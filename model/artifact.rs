use crate::features::FeatureVector;
use crate::model::capability::{Classifier, Model, Probabilistic, SchemaProvider};
use ndarray::{Array1, ArrayView1};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

// --- Public Data Structures ---
// These structs define the public, human-readable format of the trained model
// when serialized to a TOML file.

/// Per-column standardization applied before the linear predictor,
/// `x' = (x - mean) / scale`. A zero scale leaves the centred column unscaled.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Standardizer {
    pub mean: Vec<f64>,
    pub scale: Vec<f64>,
}

impl Standardizer {
    fn transform(&self, values: ArrayView1<f64>) -> Array1<f64> {
        let mean = ArrayView1::from(self.mean.as_slice());
        let scale: Array1<f64> = self
            .scale
            .iter()
            .map(|&s| if s == 0.0 { 1.0 } else { s })
            .collect();
        (&values - &mean) / &scale
    }
}

/// The fitted linear estimator.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Estimator {
    /// Logistic regression: exposes class probabilities through the sigmoid of
    /// the linear predictor, and labels rows positive at or above `threshold`.
    LogisticRegression {
        intercept: f64,
        coefficients: Vec<f64>,
        #[serde(default = "default_threshold")]
        threshold: f64,
    },
    /// Linear support vector classifier: a decision function only, no
    /// probabilities. Rows with a positive margin are labelled positive.
    LinearSvc {
        intercept: f64,
        coefficients: Vec<f64>,
    },
}

fn default_threshold() -> f64 {
    0.5
}

impl Estimator {
    fn intercept(&self) -> f64 {
        match self {
            Estimator::LogisticRegression { intercept, .. } | Estimator::LinearSvc { intercept, .. } => {
                *intercept
            }
        }
    }

    fn coefficients(&self) -> &[f64] {
        match self {
            Estimator::LogisticRegression { coefficients, .. }
            | Estimator::LinearSvc { coefficients, .. } => coefficients,
        }
    }
}

/// The top-level, self-contained, trained model artifact.
/// This is the structure that gets saved to and loaded from a file.
///
/// `feature_names` and `n_features` are both optional: older exports record
/// neither, some record only the width.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainedModel {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feature_names: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub n_features: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub standardizer: Option<Standardizer>,
    pub estimator: Estimator,
}

/// Custom error type for model loading, saving, and prediction.
#[derive(Error, Debug)]
pub enum ModelError {
    #[error("Model file not found at: {}", .0.display())]
    NotFound(PathBuf),
    #[error("Failed to read or write model file: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Failed to parse TOML model file: {0}")]
    TomlParseError(#[from] toml::de::Error),
    #[error("Failed to serialize model to TOML format: {0}")]
    TomlSerializeError(#[from] toml::ser::Error),
    #[error("Model file is internally inconsistent: {0}")]
    Inconsistent(String),
    #[error("Prediction row has {found} features, but the model was trained on {expected}.")]
    MismatchedFeatureCount { found: usize, expected: usize },
    #[error("The linear predictor is not finite for this row; check the input for extreme values.")]
    NonFiniteOutput,
}

impl TrainedModel {
    /// Saves the trained model to a file in a human-readable TOML format.
    pub fn save(&self, path: &Path) -> Result<(), ModelError> {
        let toml_string = toml::to_string_pretty(self)?;
        let mut file = BufWriter::new(fs::File::create(path)?);
        file.write_all(toml_string.as_bytes())?;
        file.flush()?;
        Ok(())
    }

    /// Loads a trained model from a TOML file and checks that its parts agree
    /// on the input width.
    pub fn load(path: &Path) -> Result<Self, ModelError> {
        let toml_string = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ModelError::NotFound(path.to_path_buf()));
            }
            Err(e) => return Err(e.into()),
        };
        let model: TrainedModel = toml::from_str(&toml_string)?;
        model.validate()?;
        log::debug!(
            "Loaded {} model with {} coefficients from {}",
            model.kind(),
            model.estimator.coefficients().len(),
            path.display()
        );
        Ok(model)
    }

    fn validate(&self) -> Result<(), ModelError> {
        let width = self.estimator.coefficients().len();
        if width == 0 {
            return Err(ModelError::Inconsistent(
                "the estimator has no coefficients".to_string(),
            ));
        }
        if let Some(names) = &self.feature_names {
            if names.len() != width {
                return Err(ModelError::Inconsistent(format!(
                    "{} feature names for {width} coefficients",
                    names.len()
                )));
            }
        }
        if let Some(n) = self.n_features {
            if n != width {
                return Err(ModelError::Inconsistent(format!(
                    "n_features is {n} but there are {width} coefficients"
                )));
            }
        }
        if let Some(standardizer) = &self.standardizer {
            if standardizer.mean.len() != width || standardizer.scale.len() != width {
                return Err(ModelError::Inconsistent(format!(
                    "standardizer has {} means and {} scales for {width} coefficients",
                    standardizer.mean.len(),
                    standardizer.scale.len()
                )));
            }
        }
        Ok(())
    }

    /// Linear predictor `eta = intercept + x'·w` for one row.
    fn decision_function(&self, features: &FeatureVector) -> Result<f64, ModelError> {
        let coefficients = ArrayView1::from(self.estimator.coefficients());
        if features.len() != coefficients.len() {
            return Err(ModelError::MismatchedFeatureCount {
                found: features.len(),
                expected: coefficients.len(),
            });
        }

        let eta = match &self.standardizer {
            Some(standardizer) => standardizer.transform(features.values()).dot(&coefficients),
            None => features.values().dot(&coefficients),
        } + self.estimator.intercept();

        if eta.is_finite() {
            Ok(eta)
        } else {
            Err(ModelError::NonFiniteOutput)
        }
    }
}

fn sigmoid(eta: f64) -> f64 {
    // Clamp eta to prevent numerical overflow in exp()
    let eta = eta.clamp(-700.0, 700.0);
    1.0 / (1.0 + f64::exp(-eta))
}

impl Classifier for TrainedModel {
    fn predict(&self, features: &FeatureVector) -> Result<f64, ModelError> {
        let eta = self.decision_function(features)?;
        let positive = match &self.estimator {
            Estimator::LogisticRegression { threshold, .. } => sigmoid(eta) >= *threshold,
            Estimator::LinearSvc { .. } => eta > 0.0,
        };
        Ok(if positive { 1.0 } else { 0.0 })
    }
}

impl SchemaProvider for TrainedModel {
    fn named_features(&self) -> Option<&[String]> {
        self.feature_names.as_deref()
    }

    fn feature_count(&self) -> Option<usize> {
        self.n_features
    }
}

impl Probabilistic for TrainedModel {
    fn predict_proba(&self, features: &FeatureVector) -> Result<[f64; 2], ModelError> {
        let positive = sigmoid(self.decision_function(features)?);
        Ok([1.0 - positive, positive])
    }
}

impl Model for TrainedModel {
    fn kind(&self) -> &'static str {
        match self.estimator {
            Estimator::LogisticRegression { .. } => "logistic_regression",
            Estimator::LinearSvc { .. } => "linear_svc",
        }
    }

    fn schema(&self) -> Option<&dyn SchemaProvider> {
        if self.feature_names.is_some() || self.n_features.is_some() {
            Some(self)
        } else {
            None
        }
    }

    fn probabilistic(&self) -> Option<&dyn Probabilistic> {
        match self.estimator {
            Estimator::LogisticRegression { .. } => Some(self),
            Estimator::LinearSvc { .. } => None,
        }
    }
}
