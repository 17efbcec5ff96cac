//! Shared primitives for the secret-backed database probe.
//!
//! This crate owns configuration parsing, the secret request contract,
//! credential decoding and the probe error kinds. It intentionally excludes
//! AWS SDK, database driver and Lambda runtime concerns.

pub mod config;
pub mod contract;
pub mod error;
