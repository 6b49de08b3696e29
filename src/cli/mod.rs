//! CLI command handling.
//!
//! Provides subcommands for:
//! - Validating a single query (`validate`)
//! - Listing tool schemas (`tools`)
//! - Invoking one tool (`call`)
//! - Serving tool calls as JSON lines over stdio (`serve`)

pub mod serve;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{ColorChoice, Parser, Subcommand, ValueEnum};
use tokio::io::AsyncReadExt;

use crate::config::GatewayConfig;
use crate::gateway::Gateway;
use crate::tools::{ToolContext, ToolRegistry};

#[derive(Parser, Debug)]
#[command(name = "graphql-gateway")]
#[command(about = "Read-only, rate-limited GraphQL tool gateway for LLM callers")]
#[command(
    long_about = "Validates LLM-written GraphQL queries against the upstream schema, blocks \
                  mutations, deep queries and secret access, and exposes schema exploration \
                  tools.\nExamples:\n  graphql-gateway validate --query q.graphql\n  \
                  graphql-gateway call get_type '{\"name\":\"Team\"}'\n  graphql-gateway serve"
)]
#[command(version)]
#[command(color = ColorChoice::Auto)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Log output format (logs go to stderr)
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,

    /// Requests per minute across all tools; 0 disables limiting
    #[arg(long, global = true, env = "GATEWAY_RATE_LIMIT_RPM")]
    pub rate_limit: Option<i64>,

    /// Read the upstream schema from this SDL file
    #[arg(long, global = true)]
    pub schema_file: Option<PathBuf>,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Validate one query and print the result as JSON
    Validate {
        /// File containing the query (default: stdin)
        #[arg(long)]
        query: Option<PathBuf>,
    },

    /// Print the schema of every tool
    Tools,

    /// Invoke one tool and print its result
    Call {
        /// Tool name, e.g. get_type
        tool: String,

        /// Parameters as a JSON object
        #[arg(default_value = "{}")]
        params: String,
    },

    /// Serve JSON-lines tool calls on stdin/stdout
    Serve,
}

impl Cli {
    /// Resolve configuration, letting CLI flags take precedence over the
    /// environment.
    pub fn config(&self) -> anyhow::Result<GatewayConfig> {
        let schema_file = self.schema_file.clone();
        let mut config = GatewayConfig::resolve(|key| match key {
            "GATEWAY_SCHEMA_FILE" if schema_file.is_some() => {
                Ok(schema_file.as_ref().map(|p| p.display().to_string()))
            }
            "GATEWAY_SCHEMA_URL" if schema_file.is_some() => Ok(None),
            _ => crate::config::optional_env(key),
        })?;

        if let Some(rpm) = self.rate_limit {
            config.rate_limit_rpm = rpm;
        }
        Ok(config)
    }
}

/// Run the parsed command to completion.
pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = cli.config().context("invalid configuration")?;
    tracing::debug!(?config, "Resolved configuration");

    let gateway = Arc::new(Gateway::from_config(&config)?);

    match cli.command {
        Command::Validate { query } => {
            let query = match query {
                Some(path) => tokio::fs::read_to_string(&path)
                    .await
                    .with_context(|| format!("failed to read {}", path.display()))?,
                None => {
                    let mut buf = String::new();
                    tokio::io::stdin().read_to_string(&mut buf).await?;
                    buf
                }
            };
            let result = gateway.validate_query(&query).await?;
            println!("{}", serde_json::to_string_pretty(&result)?);
            if !result.valid {
                std::process::exit(1);
            }
        }
        Command::Tools => {
            let registry = registry(gateway).await?;
            println!("{}", serde_json::to_string_pretty(&registry.schemas().await)?);
        }
        Command::Call { tool, params } => {
            let params: serde_json::Value =
                serde_json::from_str(&params).context("params must be a JSON object")?;
            let registry = registry(gateway).await?;
            let output = registry
                .dispatch(&tool, params, &ToolContext::new(Some("cli".to_string())))
                .await?;
            println!("{}", serde_json::to_string_pretty(&output.result)?);
        }
        Command::Serve => {
            let registry = Arc::new(registry(gateway).await?);
            tracing::info!(tools = registry.count().await, "Serving tool calls on stdio");
            serve::serve(
                registry,
                tokio::io::BufReader::new(tokio::io::stdin()),
                tokio::io::stdout(),
            )
            .await?;
        }
    }
    Ok(())
}

async fn registry(gateway: Arc<Gateway>) -> anyhow::Result<ToolRegistry> {
    let registry = ToolRegistry::new();
    registry.register_gateway_tools(gateway).await?;
    Ok(registry)
}
