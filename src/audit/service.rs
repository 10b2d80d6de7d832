use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

use crate::cache::TtlCache;
use crate::queue::SerialQueue;
use crate::types::{AuditError, AuditReport, CachedReport, ContractAddress};

use super::engine::AuditEngine;

/// Cache-first front of the audit pipeline.
///
/// Misses are funneled through the shared queue, and each job looks at the
/// cache again before running so duplicate requests compute once.
pub struct AuditService {
    engine: Arc<AuditEngine>,
    cache: Arc<TtlCache<CachedReport>>,
    queue: Arc<SerialQueue>,
}

impl AuditService {
    pub fn new(
        engine: Arc<AuditEngine>,
        cache: Arc<TtlCache<CachedReport>>,
        queue: Arc<SerialQueue>,
    ) -> Self {
        Self {
            engine,
            cache,
            queue,
        }
    }

    pub async fn audit(&self, raw: &str) -> Result<AuditReport, AuditError> {
        let contract = ContractAddress::parse(raw)?;
        let key = contract.checksummed();

        if let Some(cached) = self.cache.get(&key).await {
            info!("Serving cached audit for {}", key);
            return Ok(cached.audit_report);
        }

        let job_id = Uuid::new_v4();
        debug!("No cached audit for {}, queueing job {}", key, job_id);
        let engine = self.engine.clone();
        let cache = self.cache.clone();

        self.queue
            .enqueue(async move {
                if let Some(cached) = cache.get(&key).await {
                    debug!("Audit for {} finished while queued", key);
                    return Ok(cached.audit_report);
                }

                debug!("Job {} started", job_id);
                let report = engine.run_audit(contract).await?;
                cache.put(&key, &CachedReport::new(report.clone())).await;
                Ok(report)
            })
            .await
            .map_err(|e| AuditError::Internal(e.to_string()))?
    }

    /// Stop accepting audits
    pub fn shutdown(&self) {
        self.queue.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assessment::mock::ScriptedGenerator;
    use crate::audit::engine::tests::{build_engine, token_chain, TOKEN};
    use crate::blockchain::mock::MockChain;
    use crate::cache::REPORT_KEY_PREFIX;
    use crate::explorer::mock::{sample_source, MockExplorer};
    use std::time::Duration;

    const REPLY: &str =
        "{\"redFlag\": false, \"comment\": \"ok\", \"criticalityScore\": 2, \"summary\": \"fine\", \"dangers\": [], \"comments\": \"-\", \"totalRiskScore\": 2}";

    fn service(chain: MockChain, generator: Arc<ScriptedGenerator>) -> AuditService {
        let engine = build_engine(
            chain,
            MockExplorer::new().with_source(TOKEN, sample_source("TetherToken")),
            generator,
        );
        AuditService::new(
            Arc::new(engine),
            Arc::new(TtlCache::in_memory(REPORT_KEY_PREFIX, Duration::from_secs(60))),
            Arc::new(SerialQueue::new(Duration::ZERO)),
        )
    }

    #[tokio::test]
    async fn test_second_request_is_served_from_cache() {
        let generator = Arc::new(ScriptedGenerator::always(REPLY));
        let service = service(token_chain(), generator.clone());

        let first = service.audit(&TOKEN.to_string()).await.unwrap();
        let calls = generator.calls();
        assert!(calls > 0);

        let second = service
            .audit(&TOKEN.to_string().to_lowercase())
            .await
            .unwrap();
        assert_eq!(first, second);
        assert_eq!(generator.calls(), calls);
    }

    #[tokio::test]
    async fn test_concurrent_misses_compute_once() {
        let generator = Arc::new(ScriptedGenerator::always(REPLY));
        let service = service(token_chain(), generator.clone());
        let raw = TOKEN.to_string();

        let (a, b) = tokio::join!(service.audit(&raw), service.audit(&raw));
        let (a, b) = (a.unwrap(), b.unwrap());

        assert_eq!(a.created_at, b.created_at);
        assert_eq!(generator.calls(), a.findings.len() + 1);
    }

    #[tokio::test]
    async fn test_invalid_address_never_queues() {
        let generator = Arc::new(ScriptedGenerator::always(REPLY));
        let service = service(token_chain(), generator.clone());

        assert!(matches!(
            service.audit("0x1234").await,
            Err(AuditError::InvalidAddress(_))
        ));
        assert_eq!(generator.calls(), 0);
    }

    #[tokio::test]
    async fn test_failed_audit_is_not_cached() {
        let generator = Arc::new(ScriptedGenerator::always(REPLY));
        let service = service(MockChain::new(), generator);

        assert!(matches!(
            service.audit(&TOKEN.to_string()).await,
            Err(AuditError::NotAContract(_))
        ));
        assert!(service.cache.get(&TOKEN.to_checksum(None)).await.is_none());
    }

    #[tokio::test]
    async fn test_shutdown_rejects_new_audits() {
        let generator = Arc::new(ScriptedGenerator::always(REPLY));
        let service = service(token_chain(), generator);
        service.shutdown();

        assert!(matches!(
            service.audit(&TOKEN.to_string()).await,
            Err(AuditError::Internal(_))
        ));
    }
}
