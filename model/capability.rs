//! Capabilities a trained classifier may offer.
//!
//! Classification is mandatory. Introspection of the expected input and
//! class probabilities are optional, and callers ask for them through
//! `Model::schema` and `Model::probabilistic` instead of probing a concrete type.

use crate::features::FeatureVector;
use crate::model::artifact::ModelError;

pub trait Classifier {
    /// Raw class label for one row. Binary models answer 0 or 1.
    fn predict(&self, features: &FeatureVector) -> Result<f64, ModelError>;
}

pub trait SchemaProvider {
    /// Ordered column names the model was fitted on, if it kept them.
    fn named_features(&self) -> Option<&[String]>;

    /// Input width, if known.
    fn feature_count(&self) -> Option<usize>;
}

pub trait Probabilistic {
    /// `[P(negative), P(positive)]` for one row.
    fn predict_proba(&self, features: &FeatureVector) -> Result<[f64; 2], ModelError>;
}

pub trait Model: Classifier {
    /// Short estimator name for diagnostics.
    fn kind(&self) -> &'static str;

    fn schema(&self) -> Option<&dyn SchemaProvider> {
        None
    }

    fn probabilistic(&self) -> Option<&dyn Probabilistic> {
        None
    }
}
