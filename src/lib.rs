//! Pipedrive CRM client library
//!
//! Async client for the Pipedrive REST API covering leads, persons, lead
//! labels, custom fields and notes, plus idempotent find-or-create workflows
//! for "minimal leads" (one lead per email address).
//!
//! # Modules
//!
//! - `config`: Configuration management.
//! - `errors`: Error handling types.
//! - `models`: Domain records (leads, persons, labels, custom fields, notes).
//! - `resources`: One call per remote resource operation.
//! - `transport`: HTTP session with API token injection.
//! - `validation`: Input validation (email addresses).
//! - `wire_models`: Response envelopes and search result shapes.
//! - `workflows`: Find-or-create and minimal lead workflows.

pub mod config;
pub mod errors;
pub mod models;
pub mod resources;
pub mod transport;
pub mod validation;
pub mod wire_models;
pub mod workflows;

pub use config::Config;
pub use errors::{PipedriveError, Result};
pub use resources::PipedriveClient;
pub use transport::Session;
pub use wire_models::SearchOutcome;
