//! Canonical string forms for values arriving from HTTP clients.
//!
//! Clients send roll numbers, amounts and dates either as JSON strings or as JSON
//! numbers. Everything is normalised to a string at the boundary so the rest of
//! the crate only ever compares strings.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;

/// A member's primary key: a trimmed, non-empty string.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct RollNumber(String);

impl RollNumber {
    pub fn new(raw: impl AsRef<str>) -> Option<Self> {
        let trimmed = raw.as_ref().trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(RollNumber(trimmed.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether a stored key cell refers to this roll number.
    pub fn matches(&self, cell: &str) -> bool {
        cell.trim() == self.0
    }
}

impl fmt::Display for RollNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A scalar JSON value (string, number or bool) held as its string rendering.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Loose(String);

impl Loose {
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::String(text) => Some(Loose(text.clone())),
            Value::Number(number) => Some(Loose(render_number(number))),
            Value::Bool(flag) => Some(Loose(flag.to_string())),
            Value::Null | Value::Array(_) | Value::Object(_) => None,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }

    pub fn to_roll_number(&self) -> Option<RollNumber> {
        RollNumber::new(&self.0)
    }
}

impl From<&str> for Loose {
    fn from(text: &str) -> Self {
        Loose(text.to_string())
    }
}

impl<'de> Deserialize<'de> for Loose {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Loose::from_json(&value)
            .ok_or_else(|| serde::de::Error::custom("expected a string or a number"))
    }
}

/// Returns the value as a non-blank string, or `None` when missing or blank.
pub fn required(value: &Option<Loose>) -> Option<&str> {
    value.as_ref().filter(|v| !v.is_blank()).map(Loose::as_str)
}

// Integral floats render without a fraction, matching how the frontends print them.
fn render_number(number: &serde_json::Number) -> String {
    match number.as_f64() {
        Some(float) if number.is_f64() && float.fract() == 0.0 && float.abs() < 1e15 => {
            format!("{}", float as i64)
        }
        _ => number.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn roll_numbers_are_trimmed_and_non_empty() {
        assert_eq!(RollNumber::new(" 42 ").unwrap().as_str(), "42");
        assert!(RollNumber::new("   ").is_none());
        assert!(RollNumber::new("7").unwrap().matches(" 7"));
        assert!(!RollNumber::new("7").unwrap().matches("07"));
    }

    #[test]
    fn loose_accepts_strings_and_numbers() {
        let parsed: Vec<Loose> = serde_json::from_value(json!(["101", 101, 2.5, 3.0, true])).unwrap();
        let texts: Vec<&str> = parsed.iter().map(Loose::as_str).collect();
        assert_eq!(texts, ["101", "101", "2.5", "3", "true"]);
    }

    #[test]
    fn loose_rejects_structures() {
        assert!(serde_json::from_value::<Loose>(json!({"a": 1})).is_err());
        assert!(Loose::from_json(&json!(null)).is_none());
    }

    #[test]
    fn required_skips_blank_values() {
        assert_eq!(required(&Some(Loose::from(" "))), None);
        assert_eq!(required(&None), None);
        assert_eq!(required(&Some(Loose::from("x"))), Some("x"));
    }
}
