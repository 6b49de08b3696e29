//! Deterministic fakes for tests.
//!
//! Provides:
//! - [`StubSchemaSource`]: returns fixed SDL, counts fetches, can delay or fail
//! - [`StubExecutor`]: records queries and returns a canned response
//! - [`ManualClock`]: a rate-limiter clock that only moves when told to
//! - [`SAMPLE_SCHEMA`]: a small but realistic SDL document
//! - [`test_gateway`]: an unlimited gateway over the sample schema
//!
//! # Usage
//!
//! ```rust,no_run
//! use graphql_gateway::testing::test_gateway;
//!
//! #[tokio::test]
//! async fn test_something() {
//!     let gateway = test_gateway();
//!     let result = gateway.validate_query("{ __typename }").await.unwrap();
//!     assert!(result.valid);
//! }
//! ```

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use async_trait::async_trait;

use crate::error::UpstreamError;
use crate::gateway::Gateway;
use crate::schema::SchemaCache;
use crate::tools::rate_limiter::{Clock, RateLimiter};
use crate::upstream::{ExecutionResponse, QueryExecutor, SchemaSource, UpstreamGraphqlError};

/// Upstream-style SDL: declares the built-in scalars with descriptions, the
/// way introspection dumps usually do.
pub const SAMPLE_SCHEMA: &str = r#""""
The `Boolean` scalar type represents `true` or `false`.
"""
scalar Boolean

"""
The `String` scalar type represents textual data, represented as UTF-8
character sequences.
"""
scalar String

"""The `Int` scalar type represents non-fractional signed whole numbers."""
scalar Int

scalar Float

"""
The `ID` scalar type represents a unique identifier.
"""
scalar ID

"""
A calendar date in ISO 8601 format.
"""
scalar Date

"""Team identifier: lowercase letters, digits and dashes."""
scalar Slug

schema {
  query: Query
  mutation: Mutation
}

"""An object with a globally unique ID."""
interface Node {
  id: ID!
}

type Query {
  """Get a team by its slug."""
  team(slug: Slug!): Team
  """List teams visible to the caller."""
  teams(first: Int = 20, after: String, filter: TeamFilter): TeamConnection!
  """Fetch any object by its ID."""
  node(id: ID!): Node
  """Search teams and applications by name."""
  search(query: String!, first: Int = 20): [SearchResult!]!
  """The authenticated user."""
  me: User
}

type Mutation {
  createSecret(team: Slug!, name: String!, environment: String!): Secret!
  deleteTeam(slug: Slug!): Boolean!
}

"""
A team owns applications and secrets. Members of a team can deploy its
applications.
"""
type Team implements Node {
  id: ID!
  slug: Slug!
  """What the team is for."""
  purpose: String!
  legacyName: String @deprecated(reason: "Use slug")
  members(first: Int = 50): [TeamMember!]!
  applications(first: Int = 20, after: String): ApplicationConnection!
  secrets(first: Int, after: String): SecretConnection!
  serviceAccountTokens: [ServiceAccountToken!]!
  createdAt: Date
}

type TeamMember {
  user: User!
  email: String!
  role: TeamRole!
}

"""Role of a member within a team."""
enum TeamRole {
  OWNER
  MEMBER
  VIEWER @deprecated
}

type User {
  name: String!
  email: String!
  teams: [Team!]!
}

type TeamConnection {
  nodes: [Team!]!
  pageInfo: PageInfo!
  totalCount: Int!
}

input TeamFilter {
  slugPrefix: String
  hasMember: String
}

type PageInfo {
  hasNextPage: Boolean!
  endCursor: String
}

"""A deployable workload."""
type Application implements Node {
  id: ID!
  name: String!
  environment: String!
  team: Team!
  secrets: [Secret!]!
}

type ApplicationConnection {
  nodes: [Application!]!
  pageInfo: PageInfo!
}

"""A named bag of secret values, mounted into applications."""
type Secret implements Node {
  id: ID!
  name: String!
  environment: String!
  values: [SecretValue!]!
  lastModifiedAt: Date
}

type SecretValue {
  name: String!
  value: String!
}

type SecretConnection {
  nodes: [Secret!]!
  edges: [SecretEdge!]!
  pageInfo: PageInfo!
}

type SecretEdge {
  cursor: String!
  node: Secret!
}

type ServiceAccountToken {
  id: ID!
  name: String!
  expiresAt: Date
}

union SearchResult = Team | Application
"#;

/// A schema source that returns fixed SDL.
///
/// Counts fetches via [`calls()`](Self::calls). Use
/// [`with_delay()`](Self::with_delay) to hold callers inside the fetch.
pub struct StubSchemaSource {
    sdl: String,
    failure: Option<String>,
    delay: Option<Duration>,
    call_count: AtomicU32,
}

impl StubSchemaSource {
    pub fn new(sdl: impl Into<String>) -> Self {
        Self {
            sdl: sdl.into(),
            failure: None,
            delay: None,
            call_count: AtomicU32::new(0),
        }
    }

    /// A source whose every fetch fails with `reason`.
    pub fn failing(reason: impl Into<String>) -> Self {
        Self {
            failure: Some(reason.into()),
            ..Self::new("")
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> u32 {
        self.call_count.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SchemaSource for StubSchemaSource {
    async fn fetch_schema(&self) -> Result<String, UpstreamError> {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        match &self.failure {
            Some(reason) => Err(UpstreamError::RequestFailed {
                url: "stub://schema".to_string(),
                reason: reason.clone(),
            }),
            None => Ok(self.sdl.clone()),
        }
    }
}

/// A query executor that records what it was asked to run.
pub struct StubExecutor {
    response: ExecutionResponse,
    failure: Option<String>,
    requests: Mutex<Vec<(String, serde_json::Value)>>,
}

impl StubExecutor {
    pub fn new(response: ExecutionResponse) -> Self {
        Self {
            response,
            failure: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// An executor that answers with a GraphQL `errors` array.
    pub fn with_errors(messages: &[&str]) -> Self {
        Self::new(ExecutionResponse {
            data: serde_json::Value::Null,
            errors: messages
                .iter()
                .map(|m| UpstreamGraphqlError {
                    message: m.to_string(),
                })
                .collect(),
        })
    }

    /// An executor whose transport always fails.
    pub fn failing(reason: impl Into<String>) -> Self {
        Self {
            failure: Some(reason.into()),
            ..Self::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.requests().len()
    }

    /// Every `(query, variables)` pair received, in order.
    pub fn requests(&self) -> Vec<(String, serde_json::Value)> {
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

impl Default for StubExecutor {
    fn default() -> Self {
        Self::new(ExecutionResponse::data(serde_json::json!({ "ok": true })))
    }
}

#[async_trait]
impl QueryExecutor for StubExecutor {
    async fn execute(
        &self,
        query: &str,
        variables: serde_json::Value,
    ) -> Result<ExecutionResponse, UpstreamError> {
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push((query.to_string(), variables));
        match &self.failure {
            Some(reason) => Err(UpstreamError::RequestFailed {
                url: "stub://graphql".to_string(),
                reason: reason.clone(),
            }),
            None => Ok(self.response.clone()),
        }
    }
}

/// Clock that starts at construction time and advances only via
/// [`advance()`](Self::advance).
pub struct ManualClock {
    start: Instant,
    offset: Mutex<Duration>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
            offset: Mutex::new(Duration::ZERO),
        }
    }

    pub fn advance(&self, by: Duration) {
        *self.offset.lock().unwrap_or_else(|e| e.into_inner()) += by;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.start + *self.offset.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// An unlimited gateway over [`SAMPLE_SCHEMA`] with a default [`StubExecutor`].
pub fn test_gateway() -> Gateway {
    test_gateway_with(Arc::new(StubExecutor::default()), 0)
}

/// A gateway over [`SAMPLE_SCHEMA`] with the given executor and rate.
pub fn test_gateway_with(executor: Arc<StubExecutor>, requests_per_minute: i64) -> Gateway {
    Gateway::new(
        SchemaCache::new(Arc::new(StubSchemaSource::new(SAMPLE_SCHEMA))),
        RateLimiter::new(requests_per_minute),
    )
    .with_executor(executor)
}
