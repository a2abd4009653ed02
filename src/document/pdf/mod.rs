//! PDF output.

pub mod writer;
