//! Patient record data structures

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Contract features, in the exact order the classifier expects them.
pub const FEATURE_NAMES: [&str; 12] = [
    "age",
    "anaemia",
    "creatinine_phosphokinase",
    "diabetes",
    "ejection_fraction",
    "high_blood_pressure",
    "platelets",
    "serum_creatinine",
    "serum_sodium",
    "sex",
    "smoking",
    "time",
];

/// Number of contract features
pub const FEATURE_COUNT: usize = FEATURE_NAMES.len();

/// Outcome column carried by historical data
pub const LABEL_FIELD: &str = "DEATH_EVENT";

/// Loosely-typed record as received from callers: field name to JSON value.
pub type RawRecord = Map<String, Value>;

/// Telemetry record posted by the device gateway
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeartData {
    /// Age in years
    pub age: f64,

    /// Decrease of red blood cells (0/1)
    pub anaemia: i64,

    /// Level of the CPK enzyme in the blood (mcg/L)
    pub creatinine_phosphokinase: i64,

    /// Diabetic patient (0/1)
    pub diabetes: i64,

    /// Percentage of blood leaving the heart at each contraction
    pub ejection_fraction: i64,

    /// Hypertensive patient (0/1)
    pub high_blood_pressure: i64,

    /// Platelets in the blood (kiloplatelets/mL)
    pub platelets: f64,

    /// Level of serum creatinine in the blood (mg/dL)
    pub serum_creatinine: f64,

    /// Level of serum sodium in the blood (mEq/L)
    pub serum_sodium: i64,

    /// Woman or man (0/1)
    pub sex: i64,

    /// Smoker (0/1)
    pub smoking: i64,

    /// Follow-up period (days)
    pub time: i64,

    /// Historical outcome; replaced by the predicted label on ingestion
    #[serde(rename = "DEATH_EVENT", default)]
    pub death_event: Option<i64>,
}

impl HeartData {
    /// Contract fields only, label stripped, as fed to the predictor.
    pub fn features(&self) -> RawRecord {
        let mut record = self.to_record();
        record.remove(LABEL_FIELD);
        record
    }

    /// Full record in contract order followed by the label column.
    pub fn to_record(&self) -> RawRecord {
        let mut record = Map::new();
        record.insert("age".into(), json_f64(self.age));
        record.insert("anaemia".into(), self.anaemia.into());
        record.insert(
            "creatinine_phosphokinase".into(),
            self.creatinine_phosphokinase.into(),
        );
        record.insert("diabetes".into(), self.diabetes.into());
        record.insert("ejection_fraction".into(), self.ejection_fraction.into());
        record.insert("high_blood_pressure".into(), self.high_blood_pressure.into());
        record.insert("platelets".into(), json_f64(self.platelets));
        record.insert("serum_creatinine".into(), json_f64(self.serum_creatinine));
        record.insert("serum_sodium".into(), self.serum_sodium.into());
        record.insert("sex".into(), self.sex.into());
        record.insert("smoking".into(), self.smoking.into());
        record.insert("time".into(), self.time.into());
        record.insert(
            LABEL_FIELD.into(),
            self.death_event.map(Value::from).unwrap_or(Value::Null),
        );
        record
    }

    /// Copy of this record carrying the given label.
    pub fn with_label(&self, label: Option<i64>) -> Self {
        Self {
            death_event: label,
            ..self.clone()
        }
    }
}

fn json_f64(value: f64) -> Value {
    serde_json::Number::from_f64(value)
        .map(Value::Number)
        .unwrap_or(Value::Null)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> HeartData {
        serde_json::from_value(serde_json::json!({
            "age": 75.0,
            "anaemia": 0,
            "creatinine_phosphokinase": 582,
            "diabetes": 0,
            "ejection_fraction": 20,
            "high_blood_pressure": 1,
            "platelets": 265000.0,
            "serum_creatinine": 1.9,
            "serum_sodium": 130,
            "sex": 1,
            "smoking": 0,
            "time": 4,
            "DEATH_EVENT": 1
        }))
        .unwrap()
    }

    #[test]
    fn test_label_is_optional() {
        let data: HeartData = serde_json::from_value(serde_json::json!({
            "age": 60, "anaemia": 0, "creatinine_phosphokinase": 100, "diabetes": 0,
            "ejection_fraction": 38, "high_blood_pressure": 0, "platelets": 250000,
            "serum_creatinine": 1.1, "serum_sodium": 137, "sex": 1, "smoking": 0, "time": 120
        }))
        .unwrap();
        assert_eq!(data.death_event, None);
        assert_eq!(data.age, 60.0);
    }

    #[test]
    fn test_features_strip_label() {
        let features = sample().features();
        assert_eq!(features.len(), FEATURE_COUNT);
        assert!(!features.contains_key(LABEL_FIELD));
    }

    #[test]
    fn test_record_keeps_contract_order() {
        let record = sample().to_record();
        let keys: Vec<&str> = record.keys().map(String::as_str).collect();
        let mut expected: Vec<&str> = FEATURE_NAMES.to_vec();
        expected.push(LABEL_FIELD);
        assert_eq!(keys, expected);
    }

    #[test]
    fn test_with_label_replaces_outcome() {
        let relabeled = sample().with_label(Some(0));
        assert_eq!(relabeled.death_event, Some(0));
        let json = serde_json::to_value(&relabeled).unwrap();
        assert_eq!(json[LABEL_FIELD], 0);
    }
}
