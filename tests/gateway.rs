//! End-to-end behaviour of the gateway facade over the sample schema.

use std::sync::Arc;
use std::time::Duration;

use graphql_gateway::error::GatewayError;
use graphql_gateway::schema::{SchemaCache, SchemaState};
use graphql_gateway::testing::{
    ManualClock, SAMPLE_SCHEMA, StubExecutor, StubSchemaSource, test_gateway, test_gateway_with,
};
use graphql_gateway::tools::RateLimiter;
use graphql_gateway::upstream::ExecutionResponse;
use graphql_gateway::validation::{OperationKind, ViolationCode};
use graphql_gateway::Gateway;
use pretty_assertions::assert_eq;
use serde_json::json;

fn nested_query(cycles: usize) -> String {
    let mut q = String::from("{ team(slug: \"x\") { ");
    for _ in 0..cycles {
        q.push_str("applications { nodes { team { ");
    }
    q.push_str("slug ");
    for _ in 0..(3 * cycles + 2) {
        q.push_str("} ");
    }
    q
}

#[tokio::test(start_paused = true)]
async fn concurrent_first_calls_share_one_fetch() {
    let source = Arc::new(StubSchemaSource::new(SAMPLE_SCHEMA).with_delay(Duration::from_millis(50)));
    let gateway = Arc::new(Gateway::new(
        SchemaCache::new(source.clone()),
        RateLimiter::unlimited(),
    ));

    let mut handles = Vec::new();
    for _ in 0..16 {
        let gateway = Arc::clone(&gateway);
        handles.push(tokio::spawn(async move {
            gateway.validate_query("{ me { name } }").await
        }));
    }
    for handle in handles {
        let result = handle.await.unwrap().unwrap();
        assert!(result.valid);
    }

    assert_eq!(source.calls(), 1);
    assert_eq!(gateway.schema_cache().state(), SchemaState::Ready);
}

#[tokio::test]
async fn failed_fetch_is_permanent() {
    let source = Arc::new(StubSchemaSource::failing("connection refused"));
    let gateway = Gateway::new(SchemaCache::new(source.clone()), RateLimiter::unlimited());

    for _ in 0..3 {
        let err = gateway.validate_query("{ me { name } }").await.unwrap_err();
        assert!(matches!(err, GatewayError::SchemaFetchFailed(_)));
        assert!(err.is_fault());
        assert!(err.to_string().contains("connection refused"));
    }
    assert_eq!(source.calls(), 1);
    assert_eq!(gateway.schema_cache().state(), SchemaState::Failed);
}

#[tokio::test]
async fn rate_limit_applies_across_operations() {
    let clock = Arc::new(ManualClock::new());
    let gateway = Gateway::new(
        SchemaCache::new(Arc::new(StubSchemaSource::new(SAMPLE_SCHEMA))),
        RateLimiter::with_clock(2, clock.clone()),
    );

    gateway.validate_query("{ me { name } }").await.unwrap();
    gateway.explore(|index| index.len()).await.unwrap();

    let err = gateway.validate_query("{ me { name } }").await.unwrap_err();
    let GatewayError::RateLimited { retry_after } = err else {
        panic!("expected rate limit, got {err:?}");
    };
    // 2 rpm refills one token every 30 seconds
    assert!(retry_after > Duration::from_secs(29) && retry_after <= Duration::from_secs(31));
    assert_eq!(gateway.retry_after(), retry_after);

    clock.advance(Duration::from_secs(31));
    gateway.validate_query("{ me { name } }").await.unwrap();
}

#[tokio::test]
async fn unlimited_gateway_never_throttles() {
    let gateway = test_gateway();
    for _ in 0..500 {
        assert!(gateway.validate_query("{ me { name } }").await.is_ok());
    }
}

#[tokio::test]
async fn rejects_each_violation_class() {
    let gateway = test_gateway();

    let cases = [
        ("{ team(slug: \"x\") { slug ", ViolationCode::QueryInvalid),
        ("{ team(slug: \"x\") { nope } }", ViolationCode::QueryInvalid),
        (
            "mutation { deleteTeam(slug: \"x\") }",
            ViolationCode::OperationNotAllowed,
        ),
        (
            "mutation { ...F } fragment F on Mutation { doesNotExist }",
            ViolationCode::OperationNotAllowed,
        ),
        (
            "subscription { teamUpdated { slug } }",
            ViolationCode::OperationNotAllowed,
        ),
        (
            "{ team(slug: \"x\") { secrets { nodes { name } } } }",
            ViolationCode::SecretPolicyViolation,
        ),
        (
            "{ team(slug: \"x\") { serviceAccountTokens { name } } }",
            ViolationCode::SecretPolicyViolation,
        ),
        (
            "{ node(id: \"1\") { ... on Secret { name } } }",
            ViolationCode::SecretPolicyViolation,
        ),
    ];

    for (query, code) in cases {
        let result = gateway.validate_query(query).await.unwrap();
        assert!(!result.valid, "expected rejection for {query}");
        assert_eq!(result.code, Some(code), "wrong code for {query}");
        assert!(result.error_message.is_some());
        assert!(result.operation_type.is_none());
    }
}

#[tokio::test]
async fn secret_rejection_tells_caller_where_to_go() {
    let gateway = test_gateway();
    let result = gateway
        .validate_query("{ team(slug: \"x\") { applications { nodes { secrets { name } } } } }")
        .await
        .unwrap();

    let message = result.error_message.unwrap();
    assert!(message.contains("'Secret'"));
    assert!(message.contains("console or CLI"));
}

#[tokio::test]
async fn depth_ceiling_is_fifteen() {
    let gateway = test_gateway();

    let ok = gateway.validate_query(&nested_query(4)).await.unwrap();
    assert!(ok.valid);
    assert_eq!(ok.depth, Some(13));

    let too_deep = gateway.validate_query(&nested_query(5)).await.unwrap();
    assert_eq!(too_deep.code, Some(ViolationCode::DepthExceeded));
    assert!(too_deep.error_message.unwrap().contains("exceeds maximum allowed depth of 15"));
}

#[tokio::test]
async fn execute_forwards_only_accepted_queries() {
    let executor = Arc::new(StubExecutor::new(ExecutionResponse::data(
        json!({"team": {"slug": "platform"}}),
    )));
    let gateway = test_gateway_with(executor.clone(), 0);

    let response = gateway
        .execute_query(
            "query T($s: Slug!) { team(slug: $s) { slug } }",
            json!({"s": "platform"}),
        )
        .await
        .unwrap();
    assert_eq!(response.data["team"]["slug"], "platform");

    let err = gateway
        .execute_query("{ team(slug: \"x\") { secrets { nodes { name } } } }", json!({}))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        GatewayError::QueryRejected {
            code: ViolationCode::SecretPolicyViolation,
            ..
        }
    ));

    assert_eq!(executor.calls(), 1);
    let requests = executor.requests();
    assert_eq!(requests[0].1, json!({"s": "platform"}));
}

#[tokio::test]
async fn execute_without_endpoint_is_unavailable() {
    let gateway = Gateway::new(
        SchemaCache::new(Arc::new(StubSchemaSource::new(SAMPLE_SCHEMA))),
        RateLimiter::unlimited(),
    );

    let err = gateway
        .execute_query("{ me { name } }", json!({}))
        .await
        .unwrap_err();
    assert!(matches!(err, GatewayError::ExecutorUnavailable));
    assert!(!gateway.has_executor());
}

#[tokio::test]
async fn accepted_result_reports_operation() {
    let gateway = test_gateway();
    let result = gateway
        .validate_query("query Me { me { name teams { slug } } }")
        .await
        .unwrap();

    assert!(result.valid);
    assert_eq!(result.operation_type, Some(OperationKind::Query));
    assert_eq!(result.operation_name.as_deref(), Some("Me"));
    assert_eq!(result.depth, Some(2));
}
