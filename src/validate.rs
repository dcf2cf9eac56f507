//! Schema validation for request bodies.
//!
//! Validation is structural only: presence, JSON type and a few unambiguous
//! integer coercions. Every offending field is reported, each with its
//! location from the body root.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ValidationError;

/// One segment of an error location: an object key or an array index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Loc {
    Key(String),
    Index(usize),
}

impl From<&str> for Loc {
    fn from(key: &str) -> Self {
        Loc::Key(key.to_string())
    }
}

impl From<usize> for Loc {
    fn from(index: usize) -> Self {
        Loc::Index(index)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldError {
    pub loc: Vec<Loc>,
    pub msg: String,
    #[serde(rename = "type")]
    pub kind: String,
}

impl FieldError {
    pub fn new(loc: Vec<Loc>, msg: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            loc,
            msg: msg.into(),
            kind: kind.into(),
        }
    }
}

/// A record shape that can be checked against a JSON value.
///
/// Implementations must push at least one error whenever they return `None`,
/// and should check every field before giving up so errors accumulate.
pub trait Schema: Sized {
    fn check(value: &Value, loc: &[Loc], errors: &mut Vec<FieldError>) -> Option<Self>;
}

/// Parse and validate a raw request body.
///
/// Well-typed payloads go through the derived `Deserialize` impl. The
/// [`Schema`] walk runs only when that fails, to apply the integer
/// coercions and to locate every error.
pub fn parse_body<T: Schema + DeserializeOwned>(body: &[u8]) -> Result<T, ValidationError> {
    let root = vec![Loc::from("body")];
    let value: Value = serde_json::from_slice(body).map_err(|e| ValidationError {
        errors: vec![FieldError::new(
            root.clone(),
            format!("JSON decode error: {e}"),
            "json_invalid",
        )],
    })?;

    if let Ok(parsed) = T::deserialize(&value) {
        return Ok(parsed);
    }

    let mut errors = Vec::new();
    match T::check(&value, &root, &mut errors) {
        Some(parsed) if errors.is_empty() => Ok(parsed),
        _ => Err(ValidationError { errors }),
    }
}

fn child(loc: &[Loc], segment: impl Into<Loc>) -> Vec<Loc> {
    let mut path = loc.to_vec();
    path.push(segment.into());
    path
}

pub fn object<'a>(
    value: &'a Value,
    loc: &[Loc],
    errors: &mut Vec<FieldError>,
) -> Option<&'a Map<String, Value>> {
    let obj = value.as_object();
    if obj.is_none() {
        errors.push(FieldError::new(
            loc.to_vec(),
            "Input should be a valid object",
            "object_type",
        ));
    }
    obj
}

fn required<'a>(
    obj: &'a Map<String, Value>,
    name: &str,
    loc: &[Loc],
    errors: &mut Vec<FieldError>,
) -> Option<(&'a Value, Vec<Loc>)> {
    let path = child(loc, name);
    match obj.get(name) {
        Some(value) => Some((value, path)),
        None => {
            errors.push(FieldError::new(path, "Field required", "missing"));
            None
        }
    }
}

pub fn text(value: &Value, loc: &[Loc], errors: &mut Vec<FieldError>) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        _ => {
            errors.push(FieldError::new(
                loc.to_vec(),
                "Input should be a valid string",
                "string_type",
            ));
            None
        }
    }
}

/// Accepts integers, floats without a fractional part and strings holding
/// a base-10 integer. Booleans and `null` are rejected.
pub fn integer(value: &Value, loc: &[Loc], errors: &mut Vec<FieldError>) -> Option<i64> {
    let mut fail = |msg: &str, kind: &str| {
        errors.push(FieldError::new(loc.to_vec(), msg, kind));
        None
    };
    match value {
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                return Some(i);
            }
            match n.as_f64() {
                Some(f) if f.is_finite() && f.fract() != 0.0 => fail(
                    "Input should be a valid integer, got a number with a fractional part",
                    "int_from_float",
                ),
                Some(f) if f.is_finite() && f >= i64::MIN as f64 && f < i64::MAX as f64 => {
                    Some(f as i64)
                }
                _ => fail(
                    "Input should be a valid integer, unable to parse input as an integer",
                    "int_parsing_size",
                ),
            }
        }
        Value::String(s) => match s.trim().parse::<i64>() {
            Ok(i) => Some(i),
            Err(_) => fail(
                "Input should be a valid integer, unable to parse string as an integer",
                "int_parsing",
            ),
        },
        _ => fail("Input should be a valid integer", "int_type"),
    }
}

/// Validates every element with `item`, reporting errors per index.
pub fn list<T>(
    value: &Value,
    loc: &[Loc],
    errors: &mut Vec<FieldError>,
    item: impl Fn(&Value, &[Loc], &mut Vec<FieldError>) -> Option<T>,
) -> Option<Vec<T>> {
    let Value::Array(values) = value else {
        errors.push(FieldError::new(
            loc.to_vec(),
            "Input should be a valid list",
            "list_type",
        ));
        return None;
    };
    let mut out = Vec::with_capacity(values.len());
    let mut ok = true;
    for (index, v) in values.iter().enumerate() {
        match item(v, &child(loc, index), errors) {
            Some(parsed) => out.push(parsed),
            None => ok = false,
        }
    }
    ok.then_some(out)
}

pub fn text_field(
    obj: &Map<String, Value>,
    name: &str,
    loc: &[Loc],
    errors: &mut Vec<FieldError>,
) -> Option<String> {
    let (value, path) = required(obj, name, loc, errors)?;
    text(value, &path, errors)
}

pub fn int_field(
    obj: &Map<String, Value>,
    name: &str,
    loc: &[Loc],
    errors: &mut Vec<FieldError>,
) -> Option<i64> {
    let (value, path) = required(obj, name, loc, errors)?;
    integer(value, &path, errors)
}

pub fn list_field<T>(
    obj: &Map<String, Value>,
    name: &str,
    loc: &[Loc],
    errors: &mut Vec<FieldError>,
    item: impl Fn(&Value, &[Loc], &mut Vec<FieldError>) -> Option<T>,
) -> Option<Vec<T>> {
    let (value, path) = required(obj, name, loc, errors)?;
    list(value, &path, errors, item)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn check_int(value: Value) -> (Option<i64>, Vec<FieldError>) {
        let mut errors = Vec::new();
        let parsed = integer(&value, &[Loc::from("hours")], &mut errors);
        (parsed, errors)
    }

    #[test]
    fn integers_coerce_unambiguous_input() {
        assert_eq!(check_int(json!(12)).0, Some(12));
        assert_eq!(check_int(json!(12.0)).0, Some(12));
        assert_eq!(check_int(json!(" 12 ")).0, Some(12));
        assert_eq!(check_int(json!(-3)).0, Some(-3));
    }

    #[test]
    fn integers_reject_ambiguous_input() {
        assert_eq!(check_int(json!(true)).1[0].kind, "int_type");
        assert_eq!(check_int(Value::Null).1[0].kind, "int_type");
        assert_eq!(check_int(json!(1.5)).1[0].kind, "int_from_float");
        assert_eq!(check_int(json!("twelve")).1[0].kind, "int_parsing");
    }

    #[test]
    fn list_errors_carry_index() {
        let mut errors = Vec::new();
        let parsed = list(&json!([1, "x", 3]), &[Loc::from("ids")], &mut errors, integer);
        assert!(parsed.is_none());
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].loc, vec![Loc::from("ids"), Loc::Index(1)]);
    }

    #[test]
    fn loc_serializes_as_mixed_array() {
        let err = FieldError::new(
            vec![Loc::from("body"), Loc::from("enrollees"), Loc::Index(0)],
            "Field required",
            "missing",
        );
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(
            json,
            json!({"loc": ["body", "enrollees", 0], "msg": "Field required", "type": "missing"})
        );
    }
}
