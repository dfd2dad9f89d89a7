// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod api;
pub mod cli;
pub mod clock;
pub mod config;
pub mod digest;
pub mod fetch;
pub mod metrics;
pub mod pipeline;
pub mod render;
pub mod validate;

pub use crate::api::create_router;
pub use crate::digest::{DigestAggregate, Payload, Section};
pub use crate::validate::{Issue, IssueKind, ValidationSummary, Validator, ValidatorSettings};
