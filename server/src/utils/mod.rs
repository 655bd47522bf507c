//! Utility functions

pub mod file;
pub mod json;
pub mod string;
pub mod time;
