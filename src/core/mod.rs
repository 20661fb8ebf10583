//! Core types: errors, configuration, shared path helpers.

pub mod config;
pub mod errors;
pub mod paths;
