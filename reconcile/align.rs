use crate::features::FeatureVector;
use crate::record::{RawRecord, Scalar};
use ahash::AHashMap;
use itertools::Itertools;

/// Canonical comparison form of a field name: lowercase, underscores removed.
/// `Blood_Pressure`, `bloodPressure` and `bloodpressure` all collide.
pub fn normalize_key(key: &str) -> String {
    key.chars()
        .filter(|c| *c != '_')
        .flat_map(char::to_lowercase)
        .collect()
}

/// Normalized key → value. When two input keys normalize to the same form, the
/// one appearing later in the record wins.
fn normalized_lookup(record: &RawRecord) -> AHashMap<String, &Scalar> {
    let mut lookup = AHashMap::with_capacity(record.len());
    for (key, value) in record.iter() {
        lookup.insert(normalize_key(key), value);
    }
    lookup
}

/// Aligns an arbitrary record to `expected` column names by normalized name.
///
/// Every expected column appears exactly once, in order. Columns the record
/// does not provide, or provides with a non-numeric value, are set to 0.
pub fn align_features(record: &RawRecord, expected: &[String]) -> FeatureVector {
    let lookup = normalized_lookup(record);

    log::info!(
        "Input keys normalized: [{}]",
        record.iter().map(|(key, _)| normalize_key(key)).unique().join(", ")
    );
    log::info!("Expected features: [{}]", expected.iter().join(", "));

    FeatureVector::from_pairs(expected.iter().map(|name| {
        let value = lookup
            .get(&normalize_key(name))
            .and_then(|scalar| scalar.as_f64())
            .unwrap_or(0.0);
        (name.clone(), value)
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn normalization_collapses_case_and_underscores() {
        assert_eq!(normalize_key("Blood_Pressure"), "bloodpressure");
        assert_eq!(normalize_key("bloodPressure"), "bloodpressure");
        assert_eq!(normalize_key("__BMI__"), "bmi");
    }

    #[test]
    fn normalization_is_idempotent() {
        for key in ["Diabetes_Pedigree_Function", "HighBP", "age", "skin_thickness"] {
            let once = normalize_key(key);
            assert_eq!(normalize_key(&once), once);
        }

        let record = RawRecord::from_json_str(r#"{"Skin_Thickness": 31, "BMI": 28.4}"#).unwrap();
        let normalized: RawRecord = record
            .iter()
            .map(|(key, value)| (normalize_key(key), value.clone()))
            .collect();
        let expected = names(&["SkinThickness", "BMI"]);
        assert_eq!(
            align_features(&record, &expected),
            align_features(&normalized, &expected)
        );
    }

    #[test]
    fn aligns_by_normalized_name_in_schema_order() {
        let record =
            RawRecord::from_json_str(r#"{"bmi": 28.4, "blood_pressure": "70", "AGE": 45}"#)
                .unwrap();
        let row = align_features(&record, &names(&["Age", "BloodPressure", "BMI"]));
        assert_eq!(row.names(), &names(&["Age", "BloodPressure", "BMI"])[..]);
        assert_eq!(row.values().to_vec(), vec![45.0, 70.0, 28.4]);
    }

    #[test]
    fn missing_and_non_numeric_fields_become_zero() {
        let record = RawRecord::from_json_str(r#"{"Glucose": "high"}"#).unwrap();
        let row = align_features(&record, &names(&["Glucose", "Insulin"]));
        assert_eq!(row.values().to_vec(), vec![0.0, 0.0]);
    }

    #[test]
    fn later_colliding_key_wins() {
        let record = RawRecord::from_json_str(r#"{"skin_thickness": 10, "SkinThickness": 30}"#)
            .unwrap();
        let row = align_features(&record, &names(&["SkinThickness"]));
        assert_eq!(row.get("SkinThickness"), Some(30.0));
    }
}
