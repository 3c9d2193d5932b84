//! # Stabilis Library
//!
//! CLI and configuration layers of the `stabilis` binary, exposed for
//! integration tests.

pub mod cli;
pub mod config;
