use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{info, warn};

mod abi;
mod api;
mod assessment;
mod audit;
mod blockchain;
mod cache;
mod chains;
mod config;
mod diagnostics;
mod explorer;
mod ownership;
mod queue;
mod transfers;
mod types;

use api::middleware::RequestLimiter;
use assessment::{AssessmentRequester, OpenAiGenerator, RetryPolicy};
use audit::{AuditEngine, AuditService};
use blockchain::{ChainReader, RpcChainReader};
use cache::{TtlCache, REPORT_KEY_PREFIX, TRANSFER_KEY_PREFIX};
use config::Config;
use diagnostics::DiagnosticSink;
use explorer::{ExplorerClient, SourceFetcher};
use ownership::OwnershipEngine;
use queue::SerialQueue;
use transfers::TransferAnalyzer;

pub struct AppState {
    pub config: Config,
    pub reader: Arc<dyn ChainReader>,
    pub audits: AuditService,
    pub transfers: TransferAnalyzer,
    pub request_limiter: RequestLimiter,
    pub cache_backend: &'static str,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("auditwatch=debug".parse()?),
        )
        .json()
        .init();

    // Load configuration
    dotenvy::dotenv().ok();
    let config = Config::from_env()?;

    info!("Starting auditwatch v{}", env!("CARGO_PKG_VERSION"));
    info!("Chain: {}", config.chain_id);

    let rpc_urls = config.rpc_urls();
    info!("RPC endpoints: {}", rpc_urls.len());
    let reader: Arc<dyn ChainReader> = Arc::new(RpcChainReader::new(config.chain_id, &rpc_urls)?);

    if config.explorer_api_key.is_none() {
        warn!("ETHERSCAN_API_KEY not set; explorer lookups will fail");
    }
    let diagnostics = match &config.diagnostics_dir {
        Some(dir) => {
            info!("Writing explorer diagnostics to {}", dir.display());
            DiagnosticSink::to_dir(dir.clone())
        }
        None => DiagnosticSink::disabled(),
    };
    let explorer: Arc<dyn SourceFetcher> = Arc::new(ExplorerClient::new(
        config.explorer_api_url.clone(),
        config.explorer_api_key.clone(),
        config.chain_id,
        diagnostics,
    ));

    if config.openai_api_key.is_none() {
        warn!("OPENAI_API_KEY not set; every assessment will fall back");
    }
    let generator = Arc::new(OpenAiGenerator::new(
        config.openai_api_url.clone(),
        config.openai_api_key.clone(),
        config.openai_model.clone(),
    ));
    let requester = Arc::new(AssessmentRequester::new(generator, RetryPolicy::default()));

    // Caches share one Redis connection if configured
    let redis = cache::connect_redis(config.redis_url.as_deref()).await;
    let reports = Arc::new(TtlCache::new(redis.clone(), REPORT_KEY_PREFIX, config.report_ttl));
    let transfer_cache = Arc::new(TtlCache::new(redis, TRANSFER_KEY_PREFIX, config.transfer_ttl));
    let cache_backend = reports.backend();
    info!("Cache backend: {}", cache_backend);

    let ownership = Arc::new(OwnershipEngine::new(reader.clone(), Some(explorer.clone())));
    let engine = Arc::new(AuditEngine::new(
        reader.clone(),
        explorer.clone(),
        ownership,
        requester.clone(),
    ));
    let queue = Arc::new(SerialQueue::new(config.queue_interval));

    let state = Arc::new(AppState {
        config: config.clone(),
        reader,
        audits: AuditService::new(engine, reports, queue),
        transfers: TransferAnalyzer::new(explorer, requester, transfer_cache),
        request_limiter: RequestLimiter::new(config.rate_limit_max, config.rate_limit_window),
        cache_backend,
    });

    if config.api_key.is_some() {
        info!("API key authentication enabled");
    } else {
        info!("API key authentication disabled (open mode)");
    }

    let app = api::routes::app(state.clone());

    // Start server with graceful shutdown
    let addr = format!("0.0.0.0:{}", config.port);
    info!("Listening on {}", addr);

    let listener = TcpListener::bind(&addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    state.audits.shutdown();
    info!("Server shutdown complete");
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, starting graceful shutdown...");
        }
        _ = terminate => {
            info!("Received SIGTERM, starting graceful shutdown...");
        }
    }
}
