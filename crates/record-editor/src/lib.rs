//! Record Editor
//!
//! User-driven create, edit and delete on the record log. Every input is
//! validated before anything changes; an invalid edit changes nothing.

mod editor;
mod error;
mod patch;

pub use editor::RecordEditor;
pub use error::EditError;
pub use patch::{FieldInputs, ManualEntry, RecordPatch};

pub use data_validator::FieldInput;
