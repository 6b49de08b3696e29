//! Tool surface.
//!
//! Tools are how LLM callers reach the gateway. Every tool:
//! - Validates its parameters before touching the gateway
//! - Is admitted by the shared rate limiter
//! - Returns JSON, or a [`ToolError`] with a stable code

pub mod builtin;
pub mod rate_limiter;

mod registry;
mod tool;

pub use rate_limiter::RateLimiter;
pub use registry::ToolRegistry;
pub use tool::{
    Tool, ToolContext, ToolError, ToolOutput, ToolSchema, optional_str, require_str,
    validate_tool_schema,
};
