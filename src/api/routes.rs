use axum::{middleware, routing::get, Router};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::AppState;

use super::{handlers, middleware as guards};

pub fn api_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/audit/:contract_address", get(handlers::audit_contract))
        .route(
            "/analyze-transfers/:contract_address",
            get(handlers::analyze_transfers),
        )
}

/// Full application router
pub fn app(state: Arc<AppState>) -> Router {
    // Protected routes (API key if configured, then the per-client budget)
    let protected_routes = Router::new()
        .nest("/api", api_routes())
        .route_layer(middleware::from_fn_with_state(state.clone(), guards::rate_limit))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            guards::require_api_key,
        ));

    Router::new()
        .route("/health", get(handlers::health))
        .merge(protected_routes)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::middleware::RequestLimiter;
    use crate::assessment::mock::ScriptedGenerator;
    use crate::assessment::{AssessmentRequester, RetryPolicy};
    use crate::audit::engine::tests::{build_engine, token_chain, TOKEN};
    use crate::audit::AuditService;
    use crate::blockchain::mock::MockChain;
    use crate::cache::{TtlCache, REPORT_KEY_PREFIX, TRANSFER_KEY_PREFIX};
    use crate::config::Config;
    use crate::explorer::mock::{sample_source, MockExplorer};
    use crate::queue::SerialQueue;
    use crate::transfers::TransferAnalyzer;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use serde_json::Value;
    use std::time::Duration;
    use tower::ServiceExt;

    const REPLY: &str = "{\"redFlag\": false, \"comment\": \"ok\", \"criticalityScore\": 2, \"summary\": \"fine\", \"dangers\": [], \"comments\": \"-\", \"totalRiskScore\": 2}";

    fn config(api_key: Option<&str>, rate_limit_max: u32) -> Config {
        Config {
            port: 0,
            chain_id: 1,
            infura_project_id: None,
            explorer_api_url: "http://explorer.invalid/v2/api".to_string(),
            explorer_api_key: None,
            openai_api_url: "http://openai.invalid/v1".to_string(),
            openai_api_key: None,
            openai_model: "gpt-4o-mini".to_string(),
            redis_url: None,
            report_ttl: Duration::from_secs(60),
            transfer_ttl: Duration::from_secs(60),
            queue_interval: Duration::ZERO,
            diagnostics_dir: None,
            api_key: api_key.map(str::to_string),
            rate_limit_max,
            rate_limit_window: Duration::from_secs(60),
        }
    }

    fn router(config: Config) -> Router {
        let generator = Arc::new(ScriptedGenerator::always(REPLY));
        let engine = build_engine(
            token_chain(),
            MockExplorer::new().with_source(TOKEN, sample_source("TetherToken")),
            generator.clone(),
        );
        let audits = AuditService::new(
            Arc::new(engine),
            Arc::new(TtlCache::in_memory(REPORT_KEY_PREFIX, Duration::from_secs(60))),
            Arc::new(SerialQueue::new(Duration::ZERO)),
        );
        let transfers = TransferAnalyzer::new(
            Arc::new(MockExplorer::new()),
            Arc::new(AssessmentRequester::new(generator, RetryPolicy::default())),
            Arc::new(TtlCache::in_memory(TRANSFER_KEY_PREFIX, Duration::from_secs(60))),
        );

        app(Arc::new(AppState {
            request_limiter: RequestLimiter::new(config.rate_limit_max, config.rate_limit_window),
            config,
            reader: Arc::new(MockChain::new()),
            audits,
            transfers,
            cache_backend: "memory",
        }))
    }

    async fn get(router: &Router, uri: &str, api_key: Option<&str>) -> (StatusCode, Value) {
        let mut request = Request::builder().uri(uri);
        if let Some(key) = api_key {
            request = request.header("X-API-Key", key);
        }
        let response = router
            .clone()
            .oneshot(request.body(Body::empty()).unwrap())
            .await
            .unwrap();

        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }

    #[tokio::test]
    async fn test_health() {
        let router = router(config(None, 100));
        let (status, body) = get(&router, "/health", None).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["chainId"], 1);
        assert_eq!(body["rpcReachable"], true);
        assert_eq!(body["cache"], "memory");
    }

    #[tokio::test]
    async fn test_audit_returns_report() {
        let router = router(config(None, 100));
        let (status, body) = get(&router, &format!("/api/audit/{}", TOKEN), None).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["tokenData"]["symbol"], "USDT");
        assert_eq!(body["auditByAiBadge"], true);
        assert_eq!(body["renounceStatus"], "Ownership not renounced");
    }

    #[tokio::test]
    async fn test_malformed_address_is_bad_request() {
        let router = router(config(None, 100));
        let (status, body) = get(&router, "/api/audit/0x1234", None).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "invalid_address");
    }

    #[tokio::test]
    async fn test_non_contract_is_bad_request() {
        let router = router(config(None, 100));
        let (status, body) = get(
            &router,
            "/api/audit/0x000000000000000000000000000000000000dead",
            None,
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "not_a_contract");
    }

    #[tokio::test]
    async fn test_missing_deployer_is_server_error() {
        let router = router(config(None, 100));
        let (status, body) =
            get(&router, &format!("/api/analyze-transfers/{}", TOKEN), None).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["code"], "source_unavailable");
    }

    #[tokio::test]
    async fn test_api_key_guard() {
        let router = router(config(Some("secret"), 100));
        let uri = format!("/api/audit/{}", TOKEN);

        assert_eq!(get(&router, &uri, None).await.0, StatusCode::UNAUTHORIZED);
        assert_eq!(get(&router, &uri, Some("wrong")).await.0, StatusCode::UNAUTHORIZED);
        assert_eq!(get(&router, &uri, Some("secret")).await.0, StatusCode::OK);

        // health stays open
        assert_eq!(get(&router, "/health", None).await.0, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_rate_limit() {
        let router = router(config(None, 1));

        let (first, _) = get(&router, "/api/audit/0x1234", None).await;
        assert_eq!(first, StatusCode::BAD_REQUEST);

        let (second, body) = get(&router, "/api/audit/0x1234", None).await;
        assert_eq!(second, StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(body["code"], "rate_limited");
        assert!(body["retry_after"].as_u64().unwrap() > 0);
    }
}
