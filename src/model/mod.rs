//! Immutable records produced by the header parsers.

pub mod address;
pub mod token;
