//! Read-only GraphQL gateway for LLM-built queries.
//!
//! The gateway sits between an LLM caller and an upstream GraphQL API:
//!
//! ```text
//! caller ──► tools ──► Gateway ──► rate limiter
//!                        │
//!                        ├──► SchemaCache ──► SchemaIndex ──► explore views
//!                        ├──► QueryValidator (query-only, depth, secret scan)
//!                        └──► QueryExecutor (upstream endpoint)
//! ```
//!
//! Only queries that parse, are `query` operations, stay within the depth
//! limit and never select a forbidden secret type reach the upstream.

pub mod cli;
pub mod config;
pub mod error;
pub mod gateway;
pub mod safety;
pub mod schema;
pub mod testing;
pub mod tools;
pub mod upstream;
pub mod validation;

pub use config::GatewayConfig;
pub use error::{ConfigError, GatewayError, UpstreamError};
pub use gateway::Gateway;
pub use validation::{QueryValidator, ValidationResult};
