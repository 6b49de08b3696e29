//! Safety policy for caller-built queries.
//!
//! Queries are written by an LLM, so the gateway assumes nothing about their
//! intent. This module holds the secret-exposure policy applied during
//! validation.

pub mod secret_policy;

pub use secret_policy::{DEFAULT_FORBIDDEN_TYPES, ForbiddenTypeSet, scan_selection_set};
