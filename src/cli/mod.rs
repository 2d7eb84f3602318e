//! Command-line interface definitions and helpers

pub mod commands;
pub mod completions;
