//! Data Validation
//!
//! Parses user-entered field values into typed [`FieldValue`]s and rejects
//! anything of the wrong semantic type before it can reach the record log.

mod error;
mod input;
mod validator;

pub use error::ValidationError;
pub use input::FieldInput;
pub use validator::{ValidationConfig, Validator};

pub use sensor_model::FieldValue;
