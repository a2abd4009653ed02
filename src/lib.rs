//! Editor core for ENT examination and operation reports.
//!
//! [`report::ReportEditor`] keeps a form-side [`report::FieldStore`] and a
//! paginated [`document::model::Document`] in sync in both directions.

pub mod document;
pub mod editor;
pub mod error;
pub mod report;
pub mod settings;
pub mod templates;

pub use error::{Error, Result};
