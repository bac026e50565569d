//! Filesystem helpers: name sanitization and atomic file placement.

pub mod atomic;
pub mod sanitize;
