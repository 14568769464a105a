//! JSON representation of contexts, used for the `dumps`/`loads` round trip
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::context::measure::{Measure, MeasureBuilder, Variable};
use crate::context::{Context, ContextError};

// region JSON Context
/// Represents a JSON serialized context
#[derive(Serialize, Deserialize)]
struct JsonContext {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    measures: Vec<JsonMeasure>,
}

#[derive(Serialize, Deserialize)]
struct JsonMeasure {
    id: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    target: JsonValues,
    #[serde(default)]
    lower_bound: JsonValues,
    #[serde(default)]
    upper_bound: JsonValues,
    #[serde(default = "default_confidence")]
    confidence_score: JsonValues,
    #[serde(default)]
    variables: Vec<Variable>,
}

/// A numeric measure field: a number (or null for a missing value), an array with
/// one value per simulation, or an array encoded as a string
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
enum JsonValues {
    Scalar(Option<f64>),
    Vector(Vec<Option<f64>>),
    Encoded(String),
}

impl Default for JsonValues {
    fn default() -> Self {
        JsonValues::Scalar(None)
    }
}

fn default_confidence() -> JsonValues {
    JsonValues::Scalar(Some(1.0))
}
// endregion JSON Context

// region Conversions
fn nan_to_none(value: f64) -> Option<f64> {
    if value.is_nan() {
        None
    } else {
        Some(value)
    }
}

impl From<&[f64]> for JsonValues {
    fn from(values: &[f64]) -> Self {
        // JSON numbers can't be infinite, so those fields are written as encoded strings
        if values.iter().any(|v| v.is_infinite()) {
            let encoded: Vec<String> = values.iter().map(|v| v.to_string()).collect();
            return if values.len() == 1 {
                JsonValues::Encoded(encoded[0].clone())
            } else {
                JsonValues::Encoded(format!("[{}]", encoded.join(", ")))
            };
        }
        if values.len() == 1 {
            JsonValues::Scalar(nan_to_none(values[0]))
        } else {
            JsonValues::Vector(values.iter().map(|v| nan_to_none(*v)).collect())
        }
    }
}

impl JsonValues {
    fn into_values(self, measure: &str) -> Result<Vec<f64>, ContextError> {
        match self {
            JsonValues::Scalar(v) => Ok(vec![v.unwrap_or(f64::NAN)]),
            JsonValues::Vector(values) => {
                Ok(values.into_iter().map(|v| v.unwrap_or(f64::NAN)).collect())
            }
            JsonValues::Encoded(encoded) => parse_encoded(&encoded).ok_or_else(|| {
                ContextError::Parse(format!(
                    "measure {} has an invalid encoded value {:?}",
                    measure, encoded
                ))
            }),
        }
    }
}

/// Parse a value encoded as a string, such as `"[1.0, -inf, NaN]"` or `"3.2"`
fn parse_encoded(encoded: &str) -> Option<Vec<f64>> {
    let trimmed = encoded.trim();
    match trimmed
        .strip_prefix('[')
        .and_then(|inner| inner.strip_suffix(']'))
    {
        Some(inner) if inner.trim().is_empty() => Some(Vec::new()),
        Some(inner) => inner.split(',').map(parse_number).collect(),
        None if trimmed.starts_with('[') => None,
        None => parse_number(trimmed).map(|v| vec![v]),
    }
}

/// Missing values are `null`, `NaN` or empty, infinities are `inf` or `-inf`
fn parse_number(token: &str) -> Option<f64> {
    let token = token.trim();
    if token.is_empty() || token == "null" || token.eq_ignore_ascii_case("nan") {
        return Some(f64::NAN);
    }
    token.parse::<f64>().ok()
}

impl From<&Measure> for JsonMeasure {
    fn from(m: &Measure) -> Self {
        Self {
            id: m.id.clone(),
            name: m.name.clone(),
            target: JsonValues::from(m.target.as_slice()),
            lower_bound: JsonValues::from(m.lower_bound.as_slice()),
            upper_bound: JsonValues::from(m.upper_bound.as_slice()),
            confidence_score: JsonValues::from(m.confidence_score.as_slice()),
            variables: m.variables.clone(),
        }
    }
}

impl TryFrom<JsonMeasure> for Measure {
    type Error = ContextError;

    fn try_from(m: JsonMeasure) -> Result<Self, Self::Error> {
        let target = m.target.into_values(&m.id)?;
        let lower_bound = m.lower_bound.into_values(&m.id)?;
        let upper_bound = m.upper_bound.into_values(&m.id)?;
        let confidence_score = m.confidence_score.into_values(&m.id)?;
        MeasureBuilder::default()
            .id(m.id)
            .name(m.name)
            .target(target)
            .lower_bound(lower_bound)
            .upper_bound(upper_bound)
            .confidence_score(confidence_score)
            .variables(m.variables)
            .build()
    }
}

impl Context {
    /// Dump the context as a JSON value
    pub fn dumps(&self) -> Result<Value, ContextError> {
        let json_context = JsonContext {
            name: self.name.clone(),
            measures: self.measures().values().map(JsonMeasure::from).collect(),
        };
        serde_json::to_value(json_context).map_err(|err| ContextError::Serialize(err.to_string()))
    }

    /// Load a context from a JSON value, validating every measure
    pub fn loads(value: &Value) -> Result<Context, ContextError> {
        let json_context: JsonContext = serde_json::from_value(value.clone())
            .map_err(|err| ContextError::Parse(err.to_string()))?;
        let mut context = Context::new(json_context.name.as_deref());
        for json_measure in json_context.measures {
            context.add_measure(Measure::try_from(json_measure)?)?;
        }
        Ok(context)
    }

    /// Load a context from a JSON string
    pub fn loads_str(data: &str) -> Result<Context, ContextError> {
        let value: Value =
            serde_json::from_str(data).map_err(|err| ContextError::Parse(err.to_string()))?;
        Context::loads(&value)
    }

    pub fn read_json<P: AsRef<Path>>(path: P) -> Result<Context, ContextError> {
        let data = fs::read_to_string(path).map_err(|err| ContextError::Io(err.to_string()))?;
        Context::loads_str(&data)
    }

    pub fn write_json<P: AsRef<Path>>(&self, path: P) -> Result<(), ContextError> {
        let data = serde_json::to_string_pretty(&self.dumps()?)
            .map_err(|err| ContextError::Serialize(err.to_string()))?;
        fs::write(path, data).map_err(|err| ContextError::Io(err.to_string()))
    }
}
// endregion Conversions

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn scalar_and_vector_fields() {
        let data = json!({
            "name": "ctx",
            "measures": [
                {
                    "id": "m1",
                    "name": "glucose uptake",
                    "target": 5.0,
                    "lower_bound": 0.0,
                    "upper_bound": 10.0,
                    "confidence_score": 1.0,
                    "variables": [{"coefficient": 1.0, "reference_id": "R1"}]
                },
                {
                    "id": "m2",
                    "target": [1.0, 2.0, null],
                    "lower_bound": "[0.0, 0.0, 0.0]",
                    "upper_bound": [10.0, 10.0, 10.0],
                    "confidence_score": "[1.0, 1.0, NaN]",
                    "variables": [{"coefficient": -1.0, "reference_id": "R2"}]
                }
            ]
        });
        let context = Context::loads(&data).unwrap();
        assert_eq!(context.name.as_deref(), Some("ctx"));
        let m1 = context.get_measure("m1").unwrap();
        assert_eq!(m1.len(), 1);
        assert!((m1.target[0] - 5.).abs() < 1e-25);
        let m2 = context.get_measure("m2").unwrap();
        assert_eq!(m2.len(), 3);
        assert!(m2.target[2].is_nan());
        assert!(m2.confidence_score[2].is_nan());
        assert!((m2.lower_bound[1]).abs() < 1e-25);
        assert_eq!(m2.variables, vec![Variable::new("R2", -1.)]);
    }

    #[test]
    fn missing_fields_use_defaults() {
        let data = json!({"measures": [{"id": "m1", "variables": []}]});
        let context = Context::loads(&data).unwrap();
        let m1 = context.get_measure("m1").unwrap();
        assert!(m1.target[0].is_nan());
        assert!(m1.lower_bound[0].is_nan());
        assert!((m1.confidence_score[0] - 1.).abs() < 1e-25);
    }

    #[test]
    fn round_trip() {
        let data = json!({
            "name": "ctx",
            "measures": [
                {
                    "id": "m1",
                    "name": null,
                    "target": 5.0,
                    "lower_bound": 0.0,
                    "upper_bound": 10.0,
                    "confidence_score": 1.0,
                    "variables": [{"coefficient": 1.0, "reference_id": "R1"}]
                },
                {
                    "id": "m2",
                    "name": "vector",
                    "target": [1.0, null],
                    "lower_bound": [0.0, 0.0],
                    "upper_bound": "[10.0, 10.0]",
                    "confidence_score": [1.0, 0.5],
                    "variables": [
                        {"coefficient": 1.0, "reference_id": "R1"},
                        {"coefficient": 2.0, "reference_id": "A"}
                    ]
                }
            ]
        });
        let context = Context::loads(&data).unwrap();
        let dumped = context.dumps().unwrap();
        let reloaded = Context::loads(&dumped).unwrap();
        assert_eq!(reloaded.dumps().unwrap(), dumped);
        // Encoded strings are dumped as arrays
        assert_eq!(dumped["measures"][1]["upper_bound"], json!([10.0, 10.0]));
        assert_eq!(dumped["measures"][1]["target"], json!([1.0, null]));
    }

    #[test]
    fn infinite_bounds_round_trip() {
        let data = json!({
            "measures": [
                {"id": "m1", "target": 5.0, "lower_bound": "-inf", "upper_bound": "inf"},
                {"id": "m2", "target": [1.0, null], "lower_bound": [0.0, 0.0],
                 "upper_bound": "[inf, 2.5]", "confidence_score": [1.0, 1.0]}
            ]
        });
        let context = Context::loads(&data).unwrap();
        let m1 = context.get_measure("m1").unwrap();
        assert_eq!(m1.lower_bound[0], f64::NEG_INFINITY);
        assert_eq!(m1.upper_bound[0], f64::INFINITY);

        let dumped = context.dumps().unwrap();
        assert_eq!(dumped["measures"][0]["lower_bound"], json!("-inf"));
        assert_eq!(dumped["measures"][1]["upper_bound"], json!("[inf, 2.5]"));
        // Fields without infinities stay plain numbers
        assert_eq!(dumped["measures"][1]["lower_bound"], json!([0.0, 0.0]));

        let reloaded = Context::loads(&dumped).unwrap();
        assert_eq!(reloaded.get_measure("m1").unwrap().upper_bound[0], f64::INFINITY);
        let m2 = reloaded.get_measure("m2").unwrap();
        assert_eq!(m2.upper_bound, vec![f64::INFINITY, 2.5]);
        assert!(m2.target[1].is_nan());
    }

    #[test]
    fn invalid_values() {
        let data = json!({"measures": [{"id": "m1", "target": "not a number"}]});
        match Context::loads(&data) {
            Err(ContextError::Parse(_)) => {}
            _ => panic!("Invalid encoded value not caught"),
        }
        let data = json!({"measures": [{"id": "m1", "target": "[1.0, 2.0"}]});
        assert!(matches!(Context::loads(&data), Err(ContextError::Parse(_))));
        let data = json!({"measures": [{"id": "m1", "target": 1.0, "lower_bound": 5.0, "upper_bound": 2.0}]});
        match Context::loads(&data) {
            Err(ContextError::Constraint { .. }) => {}
            _ => panic!("Inverted bounds not caught"),
        }
    }
}
