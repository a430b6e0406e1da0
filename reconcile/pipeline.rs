//! The layered reconciliation strategy.
//!
//! 1. No schema: pass the record through, keys lowercased.
//! 2. Clinical schema and survey-style record: heuristic categorical mapping.
//! 3. Anything else with a known column order: generic name alignment.

use crate::align::align_features;
use crate::categorical::{is_categorical, map_categorical};
use crate::features::FeatureVector;
use crate::record::RawRecord;
use crate::schema::{CLINICAL_FEATURE_COUNT, FeatureSchema, clinical_feature_names};
use std::borrow::Cow;
use std::fmt;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReconcileError {
    #[error(
        "The model expects {count} input features but does not record their names; a column order is only known for the 8-field clinical schema."
    )]
    UnorderedSchema { count: usize },
}

/// Which tier produced the feature vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileStrategy {
    PassThrough,
    Categorical,
    Aligned,
}

impl fmt::Display for ReconcileStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ReconcileStrategy::PassThrough => "pass-through",
            ReconcileStrategy::Categorical => "categorical-to-clinical mapping",
            ReconcileStrategy::Aligned => "normalized name alignment",
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Reconciled {
    pub features: FeatureVector,
    pub strategy: ReconcileStrategy,
}

/// Produces the model input for `record` under `schema`.
pub fn reconcile(record: &RawRecord, schema: &FeatureSchema) -> Result<Reconciled, ReconcileError> {
    let expected: Cow<'_, [String]> = match schema {
        FeatureSchema::Unknown => {
            // Keys that collide once lowercased collapse to one column; the later value wins.
            let lowered: RawRecord = record
                .iter()
                .map(|(key, value)| (key.to_lowercase(), value.clone()))
                .collect();
            let features = FeatureVector::from_pairs(
                lowered
                    .iter()
                    .map(|(key, value)| (key, value.as_f64().unwrap_or(0.0))),
            );
            log::info!(
                "Model schema unknown; passing {} input fields through unaligned",
                features.len()
            );
            return Ok(Reconciled {
                features,
                strategy: ReconcileStrategy::PassThrough,
            });
        }
        FeatureSchema::Counted(CLINICAL_FEATURE_COUNT) => {
            log::debug!("Assuming the canonical clinical column order for an 8-feature model");
            Cow::Owned(clinical_feature_names())
        }
        FeatureSchema::Counted(count) => {
            return Err(ReconcileError::UnorderedSchema { count: *count });
        }
        FeatureSchema::Named(names) => Cow::Borrowed(names.as_slice()),
    };

    // A count-only model is treated as clinical-named from here on.
    let clinical = match schema {
        FeatureSchema::Named(_) => schema.overlaps_clinical(),
        _ => true,
    };

    let reconciled = if clinical && is_categorical(record) {
        let mapped = map_categorical(record);
        Reconciled {
            features: FeatureVector::from_pairs(
                expected
                    .iter()
                    .map(|name| (name.clone(), mapped.get_by_name(name).unwrap_or(0.0))),
            ),
            strategy: ReconcileStrategy::Categorical,
        }
    } else {
        Reconciled {
            features: align_features(record, &expected),
            strategy: ReconcileStrategy::Aligned,
        }
    };

    log::info!(
        "Reconciled {} features via {}",
        reconciled.features.len(),
        reconciled.strategy
    );
    debug_assert_eq!(Some(reconciled.features.len()), schema.declared_len());
    Ok(reconciled)
}
