use axum::{
    extract::{Path, State},
    Json,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::transfers::TransferOutcome;
use crate::types::{AuditError, AuditReport};
use crate::AppState;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub chain_id: u64,
    pub rpc_reachable: bool,
    pub cache: String,
}

/// GET /health
pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let rpc_reachable = match state.reader.get_network().await {
        Ok(chain_id) if chain_id == state.config.chain_id => true,
        Ok(chain_id) => {
            warn!(
                "RPC reports chain {} but {} is configured",
                chain_id, state.config.chain_id
            );
            false
        }
        Err(e) => {
            warn!("RPC health check failed: {}", e);
            false
        }
    };

    Json(HealthResponse {
        status: if rpc_reachable { "healthy" } else { "degraded" }.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        chain_id: state.config.chain_id,
        rpc_reachable,
        cache: state.cache_backend.to_string(),
    })
}

/// GET /api/audit/:contractAddress
pub async fn audit_contract(
    State(state): State<Arc<AppState>>,
    Path(contract_address): Path<String>,
) -> Result<Json<AuditReport>, AuditError> {
    info!("Audit requested for {}", contract_address);

    state
        .audits
        .audit(&contract_address)
        .await
        .map(Json)
        .map_err(|e| {
            error!("Audit of {} failed: {}", contract_address, e);
            e
        })
}

/// GET /api/analyze-transfers/:contractAddress
pub async fn analyze_transfers(
    State(state): State<Arc<AppState>>,
    Path(contract_address): Path<String>,
) -> Result<Json<TransferOutcome>, AuditError> {
    info!("Transfer analysis requested for {}", contract_address);

    state
        .transfers
        .analyze(&contract_address)
        .await
        .map(Json)
        .map_err(|e| {
            error!("Transfer analysis of {} failed: {}", contract_address, e);
            e
        })
}
