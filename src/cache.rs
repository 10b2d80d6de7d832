use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use std::marker::PhantomData;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

/// Key prefix for audit reports
pub const REPORT_KEY_PREFIX: &str = "auditwatch:report:";
/// Key prefix for transfer analyses
pub const TRANSFER_KEY_PREFIX: &str = "auditwatch:transfers:";

/// Connect once at startup; `None` means every cache runs in memory
pub async fn connect_redis(redis_url: Option<&str>) -> Option<ConnectionManager> {
    let Some(url) = redis_url else {
        info!("No Redis URL configured. Using in-memory cache.");
        return None;
    };

    match Client::open(url) {
        Ok(client) => match client.get_connection_manager().await {
            Ok(conn) => {
                info!("Connected to Redis at {}", url);
                Some(conn)
            }
            Err(e) => {
                warn!("Failed to connect to Redis: {}. Using in-memory fallback.", e);
                None
            }
        },
        Err(e) => {
            warn!("Invalid Redis URL: {}. Using in-memory fallback.", e);
            None
        }
    }
}

struct MemoryEntry {
    json: String,
    expires_at: Instant,
}

/// Write-once cache with store-owned expiry.
///
/// Values are kept as JSON in Redis (`SET EX`) or, without Redis or when a
/// Redis command fails, in a process-local map that enforces the same TTL on
/// read. There is no invalidation path.
pub struct TtlCache<T> {
    redis: Option<ConnectionManager>,
    fallback: RwLock<HashMap<String, MemoryEntry>>,
    prefix: &'static str,
    ttl: Duration,
    _value: PhantomData<fn() -> T>,
}

impl<T> TtlCache<T>
where
    T: Serialize + DeserializeOwned,
{
    pub fn new(redis: Option<ConnectionManager>, prefix: &'static str, ttl: Duration) -> Self {
        Self {
            redis,
            fallback: RwLock::new(HashMap::new()),
            prefix,
            ttl,
            _value: PhantomData,
        }
    }

    /// In-memory only cache (for testing)
    pub fn in_memory(prefix: &'static str, ttl: Duration) -> Self {
        Self::new(None, prefix, ttl)
    }

    fn make_key(&self, key: &str) -> String {
        format!("{}{}", self.prefix, key)
    }

    pub async fn get(&self, key: &str) -> Option<T> {
        let full_key = self.make_key(key);

        if let Some(redis) = &self.redis {
            let mut conn = redis.clone();
            let result: Result<Option<String>, redis::RedisError> = conn.get(&full_key).await;
            match result {
                Ok(Some(json)) => match serde_json::from_str(&json) {
                    Ok(value) => return Some(value),
                    Err(e) => error!("Failed to deserialize cached {}: {}", full_key, e),
                },
                Ok(None) => {}
                Err(e) => error!("Redis GET failed: {}. Checking fallback.", e),
            }
        }

        self.get_fallback(&full_key).await
    }

    async fn get_fallback(&self, full_key: &str) -> Option<T> {
        let json = {
            let fallback = self.fallback.read().await;
            let entry = fallback.get(full_key)?;
            if entry.expires_at <= Instant::now() {
                None
            } else {
                Some(entry.json.clone())
            }
        };

        let Some(json) = json else {
            debug!("Cached {} expired", full_key);
            self.fallback.write().await.remove(full_key);
            return None;
        };

        match serde_json::from_str(&json) {
            Ok(value) => Some(value),
            Err(e) => {
                error!("Failed to deserialize cached {}: {}", full_key, e);
                None
            }
        }
    }

    pub async fn put(&self, key: &str, value: &T) {
        let full_key = self.make_key(key);
        let json = match serde_json::to_string(value) {
            Ok(json) => json,
            Err(e) => {
                error!("Failed to serialize {}: {}", full_key, e);
                return;
            }
        };

        if let Some(redis) = &self.redis {
            let mut conn = redis.clone();
            let result: Result<(), redis::RedisError> =
                conn.set_ex(&full_key, &json, self.ttl.as_secs().max(1)).await;
            match result {
                Ok(()) => {
                    debug!("Stored {} in Redis", full_key);
                    return;
                }
                Err(e) => error!("Redis SET failed: {}. Storing in memory.", e),
            }
        }

        let now = Instant::now();
        let mut fallback = self.fallback.write().await;
        fallback.retain(|_, entry| entry.expires_at > now);
        fallback.insert(
            full_key,
            MemoryEntry {
                json,
                expires_at: now + self.ttl,
            },
        );
    }

    pub fn has_redis(&self) -> bool {
        self.redis.is_some()
    }

    /// Backend name reported by the health endpoint
    pub fn backend(&self) -> &'static str {
        if self.has_redis() {
            "redis"
        } else {
            "memory"
        }
    }
}
