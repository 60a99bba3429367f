//! Shared building blocks for the Courier workspace.
//!
//! Holds the domain error type, environment-based configuration helpers
//! and common type aliases. This crate has no internal dependencies.

pub mod config;
pub mod error;
pub mod types;
