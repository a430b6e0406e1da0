use approx::assert_abs_diff_eq;
use glycorisk::driver::{PredictionError, evaluate, predict};
use glycorisk::model::artifact::{Estimator, TrainedModel};
use glycorisk::pipeline::{ReconcileError, ReconcileStrategy};
use glycorisk::record::RawRecord;
use glycorisk::schema::clinical_feature_names;
use tempfile::tempdir;

fn logistic(feature_names: Option<Vec<String>>, n_features: Option<usize>, width: usize) -> TrainedModel {
    let mut coefficients = vec![0.0; width];
    coefficients[0] = 0.5;
    TrainedModel {
        feature_names,
        n_features,
        standardizer: None,
        estimator: Estimator::LogisticRegression {
            intercept: -1.0,
            coefficients,
            threshold: 0.5,
        },
    }
}

fn record(json: &str) -> RawRecord {
    RawRecord::from_json_str(json).unwrap()
}

#[test]
fn count_only_clinical_model_reconciles_survey_records() {
    let model = logistic(None, Some(8), 8);
    let verdict = predict(&model, &record(r#"{"age": 13, "highBP": 0, "sex": 1}"#)).unwrap();

    assert_eq!(verdict.strategy, ReconcileStrategy::Categorical);
    assert_eq!(verdict.used_features.names(), &clinical_feature_names()[..]);
    assert_eq!(verdict.used_features.get("Pregnancies"), Some(0.0));
    assert_eq!(verdict.used_features.get("BloodPressure"), Some(72.0));
    assert_eq!(verdict.used_features.get("Age"), Some(80.0));
    // Pregnancies is the only weighted column, so eta = -1.
    assert_abs_diff_eq!(verdict.probability, 1.0 / (1.0 + 1.0_f64.exp()), epsilon = 1e-12);
    assert_eq!(verdict.risk_score, 26);
    assert_eq!(verdict.prediction, 0);
}

#[test]
fn count_only_model_of_another_width_is_rejected() {
    let model = logistic(None, Some(5), 5);
    let err = predict(&model, &record(r#"{"age": 3}"#)).unwrap_err();
    assert!(matches!(
        err,
        PredictionError::Reconcile(ReconcileError::UnorderedSchema { count: 5 })
    ));
}

#[test]
fn nameless_model_receives_the_record_as_is() {
    let model = logistic(None, None, 2);
    let verdict = predict(&model, &record(r#"{"Pregnancies": 4, "Other": 1}"#)).unwrap();
    assert_eq!(verdict.strategy, ReconcileStrategy::PassThrough);
    assert_eq!(verdict.used_features.names(), &["pregnancies", "other"]);
    assert_eq!(verdict.prediction, 1);
}

#[test]
fn snake_case_names_align_with_camel_case_input() {
    let model = logistic(
        Some(vec!["blood_glucose".to_string(), "body_mass_index".to_string()]),
        None,
        2,
    );
    let verdict = predict(
        &model,
        &record(r#"{"bloodGlucose": 6, "bodyMassIndex": "27.5", "ignored": true}"#),
    )
    .unwrap();
    assert_eq!(verdict.strategy, ReconcileStrategy::Aligned);
    assert_eq!(verdict.used_features.get("blood_glucose"), Some(6.0));
    assert_eq!(verdict.used_features.get("body_mass_index"), Some(27.5));
    assert_eq!(verdict.prediction, 1);
    assert_eq!(verdict.risk_score, 88);
}

#[test]
fn svc_model_reports_zero_probability() {
    let model = TrainedModel {
        feature_names: Some(vec!["Glucose".to_string()]),
        n_features: None,
        standardizer: None,
        estimator: Estimator::LinearSvc {
            intercept: -100.0,
            coefficients: vec![1.0],
        },
    };
    let verdict = predict(&model, &record(r#"{"glucose": 180}"#)).unwrap();
    assert_eq!(verdict.prediction, 1);
    assert_eq!(verdict.probability, 0.0);
    assert_eq!(verdict.risk_score, 0);
}

#[test]
fn evaluate_loads_a_saved_model() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("diabetes_model.toml");
    logistic(Some(clinical_feature_names()), Some(8), 8)
        .save(&path)
        .unwrap();

    let evaluation = evaluate(&br#"{"Pregnancies": 2}"#[..], Some(path.as_path())).unwrap();
    assert_eq!(evaluation.verdict.strategy, ReconcileStrategy::Aligned);
    // eta = 0 lands exactly on the decision threshold.
    assert_eq!(evaluation.verdict.prediction, 1);
    assert_eq!(evaluation.verdict.risk_score, 50);
    assert_eq!(evaluation.record.number("Pregnancies"), Some(2.0));
}
