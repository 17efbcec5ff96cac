//! AWS-oriented adapters and the handler for the database probe Lambda.
//!
//! This crate owns runtime integration details (Secrets Manager access,
//! PostgreSQL sessions, logging setup and the Lambda entry point). Domain
//! types live in `secret_probe_core`.

pub mod adapters;
pub mod context;
pub mod handlers;
pub mod telemetry;
