//! # Prediction Driver
//!
//! Runs one request end to end: record intake, model loading, schema
//! resolution, reconciliation, classification, and probability post-processing.
//! Each stage either hands its output to the next or returns a typed error;
//! nothing here catches broadly. The single catch-all lives at the process
//! boundary, which turns any `PredictionError` (or panic) into a `Response`.

use crate::assess::Assessment;
use crate::features::FeatureVector;
use crate::model::artifact::{ModelError, TrainedModel};
use crate::model::capability::Model;
use crate::model::locate::resolve_model_path;
use crate::pipeline::{ReconcileError, ReconcileStrategy, reconcile};
use crate::record::{InputError, RawRecord};
use crate::schema::resolve_schema;
use serde::Serialize;
use std::error::Error as StdError;
use std::io::Read;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PredictionError {
    #[error(transparent)]
    Input(#[from] InputError),
    #[error(transparent)]
    Model(#[from] ModelError),
    #[error(transparent)]
    Reconcile(#[from] ReconcileError),
    #[error("The model failed to classify the reconciled features: {0}")]
    Classification(#[source] ModelError),
}

/// A successful verdict for one record.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Verdict {
    pub prediction: u8,
    pub probability: f64,
    pub risk_score: u8,
    pub used_features: FeatureVector,
    #[serde(skip)]
    pub strategy: ReconcileStrategy,
}

/// The parsed request together with its verdict.
#[derive(Debug, Clone)]
pub struct Evaluation {
    pub record: RawRecord,
    pub verdict: Verdict,
}

/// Truncated integer percentage of `probability`, after clamping it to [0, 1].
pub fn risk_score(probability: f64) -> u8 {
    (probability.clamp(0.0, 1.0) * 100.0).floor() as u8
}

fn to_label(raw: f64) -> Result<u8, ModelError> {
    if !raw.is_finite() {
        return Err(ModelError::NonFiniteOutput);
    }
    Ok(u8::from(raw >= 0.5))
}

/// Probability of the positive class. A model without probability support
/// reports 0; a failing probability call degrades to the label itself.
fn positive_probability(model: &dyn Model, features: &FeatureVector, label: u8) -> f64 {
    let Some(probabilistic) = model.probabilistic() else {
        log::debug!("{} model exposes no probabilities; reporting 0", model.kind());
        return 0.0;
    };
    match probabilistic.predict_proba(features) {
        Ok([_, positive]) if positive.is_finite() => positive.clamp(0.0, 1.0),
        Ok(_) => {
            log::warn!("Probability output was not finite; using the class label instead");
            f64::from(label)
        }
        Err(e) => {
            log::warn!("Probability computation failed ({e}); using the class label instead");
            f64::from(label)
        }
    }
}

/// Classifies one record with an already loaded model.
pub fn predict(model: &dyn Model, record: &RawRecord) -> Result<Verdict, PredictionError> {
    let schema = resolve_schema(model);
    let reconciled = reconcile(record, &schema)?;

    let label = model
        .predict(&reconciled.features)
        .and_then(to_label)
        .map_err(PredictionError::Classification)?;
    let probability = positive_probability(model, &reconciled.features, label);

    Ok(Verdict {
        prediction: label,
        probability,
        risk_score: risk_score(probability),
        used_features: reconciled.features,
        strategy: reconciled.strategy,
    })
}

/// Full request: read the record from `input`, load the model from `model_path`
/// (or its conventional location), and classify.
///
/// Input is read before the model is touched, so an empty request is reported
/// as such even when the model is also missing.
pub fn evaluate<R: Read>(input: R, model_path: Option<&Path>) -> Result<Evaluation, PredictionError> {
    let record = RawRecord::read_from(input)?;
    let path = resolve_model_path(model_path)?;
    log::debug!("Loading model from: {}", path.display());
    let model = TrainedModel::load(&path)?;
    let verdict = predict(&model, &record)?;
    Ok(Evaluation { record, verdict })
}

#[derive(Debug, Clone, Serialize)]
pub struct SuccessResponse {
    success: bool,
    #[serde(flatten)]
    pub verdict: Verdict,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assessment: Option<Assessment>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FailureResponse {
    success: bool,
    pub error: String,
    pub trace: String,
}

/// The single JSON document written to stdout.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum Response {
    Success(SuccessResponse),
    Failure(FailureResponse),
}

impl Response {
    pub fn success(verdict: Verdict, assessment: Option<Assessment>) -> Self {
        Response::Success(SuccessResponse {
            success: true,
            verdict,
            assessment,
        })
    }

    /// Failure carrying the error message and its full cause chain.
    pub fn failure(error: &(dyn StdError + 'static)) -> Self {
        let mut trace = format!("Error: {error}");
        let mut source = error.source();
        while let Some(cause) = source {
            trace.push_str(&format!("\nCaused by: {cause}"));
            source = cause.source();
        }
        Self::fault(error.to_string(), trace)
    }

    /// Failure for a fault that was not an error value, such as a panic.
    pub fn fault(message: impl Into<String>, trace: impl Into<String>) -> Self {
        Response::Failure(FailureResponse {
            success: false,
            error: message.into(),
            trace: trace.into(),
        })
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Response::Success(_))
    }
}
