//! Raw User Input

use serde::{Deserialize, Serialize};

/// Raw value for one field as typed by a user
///
/// Forms submit text; API clients may submit JSON numbers directly, or
/// `null` to mark the field as unavailable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldInput {
    Number(f64),
    Text(String),
    Clear,
}

impl FieldInput {
    /// Text form of the input, as it would appear in an error message
    pub fn raw(&self) -> String {
        match self {
            FieldInput::Number(n) => n.to_string(),
            FieldInput::Text(s) => s.clone(),
            FieldInput::Clear => "null".to_string(),
        }
    }

    /// True for text that is empty after trimming
    pub fn is_blank(&self) -> bool {
        matches!(self, FieldInput::Text(s) if s.trim().is_empty())
    }
}

impl From<f64> for FieldInput {
    fn from(value: f64) -> Self {
        FieldInput::Number(value)
    }
}

impl From<i32> for FieldInput {
    fn from(value: i32) -> Self {
        FieldInput::Number(value as f64)
    }
}

impl From<&str> for FieldInput {
    fn from(value: &str) -> Self {
        FieldInput::Text(value.to_string())
    }
}

impl From<String> for FieldInput {
    fn from(value: String) -> Self {
        FieldInput::Text(value)
    }
}
