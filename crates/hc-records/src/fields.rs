//! Coercion of loosely typed field maps into concrete values.
//!
//! Field maps usually come straight out of model output, so numbers may
//! arrive as strings and enumerations in any case. Everything here either
//! produces a typed value or a `ValidationError` naming the offending field.

use chrono::NaiveDate;
use serde_json::{Map, Value};

pub const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("missing required field '{0}'")]
    MissingField(String),
    #[error("field '{field}' must be {expected}")]
    InvalidType {
        field: String,
        expected: &'static str,
    },
    #[error("field '{field}' has malformed date '{value}' (expected YYYY-MM-DD)")]
    InvalidDate { field: String, value: String },
    #[error("field '{field}' value {value} is out of range ({min} to {max})")]
    OutOfRange {
        field: String,
        value: f64,
        min: f64,
        max: f64,
    },
    #[error("field '{field}' must be one of {allowed}, got '{value}'")]
    InvalidChoice {
        field: String,
        value: String,
        allowed: String,
    },
    #[error("at least one of {0} is required")]
    NothingToRecord(String),
    #[error("{list} entry {index}: {source}")]
    Nested {
        list: &'static str,
        index: usize,
        #[source]
        source: Box<ValidationError>,
    },
}

/// Read-only view over one record's field map.
#[derive(Debug, Clone, Copy)]
pub struct Fields<'a> {
    map: &'a Map<String, Value>,
}

impl<'a> Fields<'a> {
    pub fn new(map: &'a Map<String, Value>) -> Self {
        Self { map }
    }

    /// Null values and blank strings count as absent.
    fn present(&self, name: &str) -> Option<&'a Value> {
        match self.map.get(name) {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) if s.trim().is_empty() => None,
            Some(v) => Some(v),
        }
    }

    pub fn optional_str(&self, name: &str) -> Result<Option<String>, ValidationError> {
        match self.present(name) {
            None => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.trim().to_string())),
            Some(Value::Number(n)) => Ok(Some(n.to_string())),
            Some(_) => Err(ValidationError::InvalidType {
                field: name.to_string(),
                expected: "text",
            }),
        }
    }

    pub fn required_str(&self, name: &str) -> Result<String, ValidationError> {
        self.optional_str(name)?
            .ok_or_else(|| ValidationError::MissingField(name.to_string()))
    }

    pub fn optional_date(&self, name: &str) -> Result<Option<NaiveDate>, ValidationError> {
        let Some(raw) = self.optional_str(name)? else {
            return Ok(None);
        };
        NaiveDate::parse_from_str(&raw, DATE_FORMAT)
            .map(Some)
            .map_err(|_| ValidationError::InvalidDate {
                field: name.to_string(),
                value: raw,
            })
    }

    pub fn required_date(&self, name: &str) -> Result<NaiveDate, ValidationError> {
        self.optional_date(name)?
            .ok_or_else(|| ValidationError::MissingField(name.to_string()))
    }

    pub fn optional_f64(
        &self,
        name: &str,
        min: f64,
        max: f64,
    ) -> Result<Option<f64>, ValidationError> {
        let value = match self.present(name) {
            None => return Ok(None),
            Some(Value::Number(n)) => n.as_f64(),
            Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
            Some(_) => None,
        };
        let value = value
            .filter(|v| v.is_finite())
            .ok_or_else(|| ValidationError::InvalidType {
                field: name.to_string(),
                expected: "a number",
            })?;
        if value < min || value > max {
            return Err(ValidationError::OutOfRange {
                field: name.to_string(),
                value,
                min,
                max,
            });
        }
        Ok(Some(value))
    }

    /// Like [`Fields::optional_f64`] but rejects fractional values.
    pub fn optional_u32(&self, name: &str, min: u32, max: u32) -> Result<Option<u32>, ValidationError> {
        let Some(value) = self.optional_f64(name, f64::from(min), f64::from(max))? else {
            return Ok(None);
        };
        if value.fract() != 0.0 {
            return Err(ValidationError::InvalidType {
                field: name.to_string(),
                expected: "a whole number",
            });
        }
        // range already checked against u32 bounds
        Ok(Some(value as u32))
    }

    pub fn optional_bool(&self, name: &str) -> Result<Option<bool>, ValidationError> {
        match self.present(name) {
            None => Ok(None),
            Some(Value::Bool(b)) => Ok(Some(*b)),
            Some(Value::String(s)) => match s.trim().to_ascii_lowercase().as_str() {
                "true" | "yes" | "y" | "1" => Ok(Some(true)),
                "false" | "no" | "n" | "0" => Ok(Some(false)),
                _ => Err(ValidationError::InvalidType {
                    field: name.to_string(),
                    expected: "true or false",
                }),
            },
            Some(_) => Err(ValidationError::InvalidType {
                field: name.to_string(),
                expected: "true or false",
            }),
        }
    }

    /// Case-insensitive match against `allowed`; returns the canonical spelling.
    pub fn optional_choice(
        &self,
        name: &str,
        allowed: &[&'static str],
    ) -> Result<Option<&'static str>, ValidationError> {
        let Some(raw) = self.optional_str(name)? else {
            return Ok(None);
        };
        allowed
            .iter()
            .find(|candidate| candidate.eq_ignore_ascii_case(&raw))
            .copied()
            .map(Some)
            .ok_or_else(|| ValidationError::InvalidChoice {
                field: name.to_string(),
                value: raw,
                allowed: allowed.join(", "),
            })
    }

    pub fn required_choice(
        &self,
        name: &str,
        allowed: &[&'static str],
    ) -> Result<&'static str, ValidationError> {
        self.optional_choice(name, allowed)?
            .ok_or_else(|| ValidationError::MissingField(name.to_string()))
    }

    /// A list of strings. A lone string is accepted as a one-item list.
    pub fn str_list(&self, name: &str) -> Result<Vec<String>, ValidationError> {
        let invalid = || ValidationError::InvalidType {
            field: name.to_string(),
            expected: "a list of text items",
        };
        match self.present(name) {
            None => Ok(Vec::new()),
            Some(Value::String(s)) => Ok(vec![s.trim().to_string()]),
            Some(Value::Array(items)) => items
                .iter()
                .filter(|item| !item.is_null())
                .map(|item| match item {
                    Value::String(s) => Ok(s.trim().to_string()),
                    _ => Err(invalid()),
                })
                .collect(),
            Some(_) => Err(invalid()),
        }
    }

    pub fn object_list(&self, name: &str) -> Result<Vec<Fields<'a>>, ValidationError> {
        let invalid = || ValidationError::InvalidType {
            field: name.to_string(),
            expected: "a list of objects",
        };
        match self.present(name) {
            None => Ok(Vec::new()),
            Some(Value::Array(items)) => items
                .iter()
                .map(|item| item.as_object().map(Fields::new).ok_or_else(invalid))
                .collect(),
            Some(_) => Err(invalid()),
        }
    }

    /// Raw string value of `name`, used to label error messages.
    pub fn raw_str(&self, name: &str) -> Option<&'a str> {
        self.map.get(name).and_then(Value::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn map(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn blank_and_null_are_absent() {
        let m = map(json!({"a": "  ", "b": null}));
        let f = Fields::new(&m);
        assert_eq!(f.optional_str("a").unwrap(), None);
        assert_eq!(f.optional_str("b").unwrap(), None);
        assert_eq!(
            f.required_str("a").unwrap_err(),
            ValidationError::MissingField("a".to_string())
        );
    }

    #[test]
    fn numbers_accept_numeric_strings() {
        let m = map(json!({"weight": "72.5", "steps": 9000, "bad": "lots"}));
        let f = Fields::new(&m);
        assert_eq!(f.optional_f64("weight", 0.0, 500.0).unwrap(), Some(72.5));
        assert_eq!(f.optional_u32("steps", 0, 200_000).unwrap(), Some(9000));
        assert!(matches!(
            f.optional_f64("bad", 0.0, 1.0),
            Err(ValidationError::InvalidType { .. })
        ));
    }

    #[test]
    fn out_of_range_is_reported() {
        let m = map(json!({"hr": 400}));
        let err = Fields::new(&m).optional_u32("hr", 20, 250).unwrap_err();
        assert!(matches!(err, ValidationError::OutOfRange { .. }));
        assert!(err.to_string().contains("out of range"));
    }

    #[test]
    fn fractional_counts_are_rejected() {
        let m = map(json!({"sets": 2.5}));
        assert!(Fields::new(&m).optional_u32("sets", 0, 100).is_err());
    }

    #[test]
    fn dates_must_be_iso() {
        let m = map(json!({"ok": "2024-03-01", "bad": "03/01/2024"}));
        let f = Fields::new(&m);
        assert_eq!(
            f.required_date("ok").unwrap(),
            NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()
        );
        let err = f.required_date("bad").unwrap_err();
        assert!(err.to_string().contains("malformed date"));
        assert!(matches!(
            f.required_date("missing"),
            Err(ValidationError::MissingField(_))
        ));
    }

    #[test]
    fn choices_are_case_insensitive() {
        let m = map(json!({"meal_type": "Dinner", "bad": "brunch"}));
        let f = Fields::new(&m);
        let allowed = ["breakfast", "lunch", "dinner", "snack"];
        assert_eq!(f.required_choice("meal_type", &allowed).unwrap(), "dinner");
        let err = f.required_choice("bad", &allowed).unwrap_err();
        assert!(err.to_string().contains("breakfast, lunch, dinner, snack"));
    }

    #[test]
    fn bools_accept_yes_no() {
        let m = map(json!({"a": "yes", "b": false, "c": "maybe"}));
        let f = Fields::new(&m);
        assert_eq!(f.optional_bool("a").unwrap(), Some(true));
        assert_eq!(f.optional_bool("b").unwrap(), Some(false));
        assert!(f.optional_bool("c").is_err());
    }

    #[test]
    fn lists_accept_single_strings() {
        let m = map(json!({"one": "stretch", "many": ["a", "b"], "bad": [1]}));
        let f = Fields::new(&m);
        assert_eq!(f.str_list("one").unwrap(), vec!["stretch"]);
        assert_eq!(f.str_list("many").unwrap(), vec!["a", "b"]);
        assert!(f.str_list("bad").is_err());
        assert!(f.str_list("absent").unwrap().is_empty());
    }

    #[test]
    fn object_lists_require_objects() {
        let m = map(json!({"ok": [{"name": "squat"}], "bad": ["squat"]}));
        let f = Fields::new(&m);
        assert_eq!(f.object_list("ok").unwrap().len(), 1);
        assert!(f.object_list("bad").is_err());
    }
}
