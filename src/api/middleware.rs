use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;
use tracing::warn;

use crate::types::AuditError;
use crate::AppState;

/// Middleware to validate API key for service-to-service authentication.
///
/// If `API_KEY` is configured, all requests must include a matching `X-API-Key` header.
/// If `API_KEY` is not set, all requests are allowed (open mode).
pub async fn require_api_key(
    State(state): State<Arc<AppState>>,
    request: Request<Body>,
    next: Next,
) -> Result<Response, StatusCode> {
    let Some(expected_key) = &state.config.api_key else {
        return Ok(next.run(request).await);
    };

    let provided_key = request
        .headers()
        .get("X-API-Key")
        .and_then(|v| v.to_str().ok());

    match provided_key {
        Some(key) if key == expected_key => Ok(next.run(request).await),
        Some(_) => {
            warn!("Invalid API key provided");
            Err(StatusCode::UNAUTHORIZED)
        }
        None => {
            warn!("Missing X-API-Key header");
            Err(StatusCode::UNAUTHORIZED)
        }
    }
}

struct Window {
    started: Instant,
    hits: u32,
}

/// Fixed-window request budget per client
pub struct RequestLimiter {
    max_requests: u32,
    window: Duration,
    clients: Mutex<HashMap<String, Window>>,
}

impl RequestLimiter {
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            max_requests,
            window,
            clients: Mutex::new(HashMap::new()),
        }
    }

    /// Count one request; on rejection returns the seconds until the window resets
    pub fn check(&self, client: &str) -> Result<(), u64> {
        let now = Instant::now();
        let mut clients = self
            .clients
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        // Evict finished windows
        clients.retain(|_, w| now.duration_since(w.started) < self.window);

        let window = clients.entry(client.to_string()).or_insert(Window {
            started: now,
            hits: 0,
        });

        if window.hits >= self.max_requests {
            let remaining = self.window.saturating_sub(now.duration_since(window.started));
            return Err(remaining.as_secs().max(1));
        }

        window.hits += 1;
        Ok(())
    }
}

/// Reject clients that exceeded their budget with 429
pub async fn rate_limit(
    State(state): State<Arc<AppState>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let client = client_key(&request);

    match state.request_limiter.check(&client) {
        Ok(()) => next.run(request).await,
        Err(retry_after) => {
            warn!("Rate limit exceeded for {}", client);
            AuditError::RateLimited { retry_after }.into_response()
        }
    }
}

/// Peer IP, or the first `X-Forwarded-For` hop when there is no socket info
fn client_key(request: &Request<Body>) -> String {
    if let Some(ConnectInfo(addr)) = request.extensions().get::<ConnectInfo<SocketAddr>>() {
        return addr.ip().to_string();
    }

    request
        .headers()
        .get("X-Forwarded-For")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|ip| ip.trim().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}
