use ndarray::{Array1, ArrayView1};
use serde::ser::{Serialize, SerializeMap, Serializer};

/// The ordered, named numeric row handed to the model.
///
/// Names and values are stored side by side so the row can be fed to the
/// estimator as a plain `ndarray` view and still be reported back to the caller
/// as `usedFeatures` in exactly the order the model consumed it.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FeatureVector {
    names: Vec<String>,
    values: Array1<f64>,
}

impl FeatureVector {
    pub fn from_pairs<I, S>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (S, f64)>,
        S: Into<String>,
    {
        let (names, values): (Vec<String>, Vec<f64>) = pairs
            .into_iter()
            .map(|(name, value)| (name.into(), value))
            .unzip();
        Self {
            names,
            values: Array1::from_vec(values),
        }
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn values(&self) -> ArrayView1<'_, f64> {
        self.values.view()
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.names
            .iter()
            .position(|n| n == name)
            .map(|idx| self.values[idx])
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.names
            .iter()
            .map(String::as_str)
            .zip(self.values.iter().copied())
    }
}

// Serialized as a JSON object whose key order is the model's column order.
impl Serialize for FeatureVector {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.len()))?;
        for (name, value) in self.iter() {
            map.serialize_entry(name, &value)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_in_column_order() {
        let row = FeatureVector::from_pairs([("Zeta", 1.0), ("Alpha", 2.5)]);
        let json = serde_json::to_string(&row).unwrap();
        assert_eq!(json, r#"{"Zeta":1.0,"Alpha":2.5}"#);
    }

    #[test]
    fn lookup_by_name() {
        let row = FeatureVector::from_pairs([("BMI", 31.2), ("Age", 42.0)]);
        assert_eq!(row.len(), 2);
        assert_eq!(row.get("Age"), Some(42.0));
        assert_eq!(row.get("age"), None);
        assert_eq!(row.values().to_vec(), vec![31.2, 42.0]);
    }
}
