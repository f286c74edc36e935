//! Record storage.

pub mod bag;
