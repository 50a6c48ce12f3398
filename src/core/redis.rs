use std::sync::Arc;

use redis::aio::ConnectionManager;
use redis::{cmd, Client, RedisError};
use tokio::sync::RwLock;

#[derive(Clone)]
pub(crate) struct RedisHandle {
    url: String,
    manager: Arc<RwLock<Option<ConnectionManager>>>,
}

#[derive(Debug, Clone)]
pub(crate) enum RedisHealth {
    Healthy,
    Disconnected,
    Unhealthy(String),
}

const FIXED_WINDOW_SCRIPT: &str = r#"
    local current = redis.call("INCR", KEYS[1])
    if current == 1 then
        redis.call("EXPIRE", KEYS[1], ARGV[1])
    end
    return current
"#;

const GUARDED_HASH_SET_SCRIPT: &str = r#"
    local current = tonumber(redis.call("GET", KEYS[2]) or "0")
    if current ~= tonumber(ARGV[4]) then
        return 0
    end
    redis.call("HSET", KEYS[1], ARGV[1], ARGV[2])
    redis.call("EXPIRE", KEYS[1], ARGV[3])
    return 1
"#;

impl RedisHandle {
    pub(crate) fn new(url: String) -> Self {
        Self { url, manager: Arc::new(RwLock::new(None)) }
    }

    pub(crate) async fn connect(&self) -> Result<(), RedisError> {
        let client = Client::open(self.url.clone())?;
        let manager = ConnectionManager::new(client).await?;
        *self.manager.write().await = Some(manager);
        Ok(())
    }

    pub(crate) async fn disconnect(&self) {
        *self.manager.write().await = None;
    }

    async fn connection(&self) -> Option<ConnectionManager> {
        self.manager.read().await.clone()
    }

    pub(crate) async fn health(&self) -> RedisHealth {
        let Some(mut manager) = self.connection().await else {
            return RedisHealth::Disconnected;
        };

        match cmd("PING").query_async::<_, String>(&mut manager).await {
            Ok(_) => RedisHealth::Healthy,
            Err(err) => RedisHealth::Unhealthy(err.to_string()),
        }
    }

    /// Fixed-window counter. Without a connection every call is allowed.
    pub(crate) async fn rate_limit(
        &self,
        key: &str,
        limit: u64,
        window_seconds: u64,
    ) -> Result<bool, RedisError> {
        let Some(mut manager) = self.connection().await else {
            return Ok(true);
        };

        let current: i64 = redis::Script::new(FIXED_WINDOW_SCRIPT)
            .key(key)
            .arg(window_seconds as i64)
            .invoke_async(&mut manager)
            .await?;

        Ok(current <= limit as i64)
    }

    pub(crate) async fn hash_get(&self, key: &str, field: &str) -> Result<Option<String>, RedisError> {
        let Some(mut manager) = self.connection().await else {
            return Ok(None);
        };

        cmd("HGET").arg(key).arg(field).query_async::<_, Option<String>>(&mut manager).await
    }

    /// Reads an integer counter; a missing key counts as zero. `None` without a connection.
    pub(crate) async fn counter(&self, key: &str) -> Result<Option<i64>, RedisError> {
        let Some(mut manager) = self.connection().await else {
            return Ok(None);
        };

        let value: Option<i64> = cmd("GET").arg(key).query_async(&mut manager).await?;
        Ok(Some(value.unwrap_or(0)))
    }

    /// Writes the hash field only while `counter_key` still holds `expected`.
    pub(crate) async fn hash_set_if_counter(
        &self,
        key: &str,
        field: &str,
        value: &str,
        ttl_seconds: u64,
        counter_key: &str,
        expected: i64,
    ) -> Result<bool, RedisError> {
        let Some(mut manager) = self.connection().await else {
            return Ok(false);
        };

        let written: i64 = redis::Script::new(GUARDED_HASH_SET_SCRIPT)
            .key(key)
            .key(counter_key)
            .arg(field)
            .arg(value)
            .arg(ttl_seconds as i64)
            .arg(expected)
            .invoke_async(&mut manager)
            .await?;
        Ok(written == 1)
    }

    /// Bumps `counter_key` and drops `key` in one transaction.
    pub(crate) async fn bump_and_delete(
        &self,
        counter_key: &str,
        counter_ttl_seconds: u64,
        key: &str,
    ) -> Result<(), RedisError> {
        let Some(mut manager) = self.connection().await else {
            return Ok(());
        };

        redis::pipe()
            .atomic()
            .cmd("INCR")
            .arg(counter_key)
            .ignore()
            .cmd("EXPIRE")
            .arg(counter_key)
            .arg(counter_ttl_seconds as i64)
            .ignore()
            .cmd("DEL")
            .arg(key)
            .ignore()
            .query_async::<_, ()>(&mut manager)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::{RedisHandle, RedisHealth};
    use crate::core::config::Settings;
    use crate::test_support;
    use uuid::Uuid;

    #[tokio::test]
    async fn disconnected_handle_degrades_gracefully() {
        let handle = RedisHandle::new("redis://127.0.0.1:1/0".to_string());

        assert!(matches!(handle.health().await, RedisHealth::Disconnected));
        assert!(handle.rate_limit("any", 1, 60).await.expect("rate limit"));
        assert!(handle.rate_limit("any", 1, 60).await.expect("rate limit"));
        assert_eq!(handle.hash_get("progress:u", "c").await.expect("get"), None);
        assert_eq!(handle.counter("progress:u:gen").await.expect("counter"), None);
        assert!(!handle
            .hash_set_if_counter("progress:u", "c", "50", 60, "progress:u:gen", 0)
            .await
            .expect("guarded set"));
        handle.bump_and_delete("progress:u:gen", 60, "progress:u").await.expect("bump");
    }

    #[tokio::test]
    async fn rate_limit_enforces_limit() {
        let _guard = test_support::env_lock().await;
        test_support::set_test_env();

        let settings = Settings::load().expect("settings");
        test_support::reset_redis(settings.redis().redis_url()).await.expect("redis reset");

        let redis = RedisHandle::new(settings.redis().redis_url());
        redis.connect().await.expect("redis connect");

        let key = format!("rate-limit:{}", Uuid::new_v4());
        assert!(redis.rate_limit(&key, 1, 5).await.expect("rate limit"));
        assert!(!redis.rate_limit(&key, 1, 5).await.expect("rate limit"));
    }

    #[tokio::test]
    async fn guarded_set_is_refused_after_a_bump() {
        let _guard = test_support::env_lock().await;
        test_support::set_test_env();

        let settings = Settings::load().expect("settings");
        let redis = RedisHandle::new(settings.redis().redis_url());
        redis.connect().await.expect("redis connect");

        let key = format!("progress:{}", Uuid::new_v4());
        let counter_key = format!("{key}:gen");
        let seen = redis.counter(&counter_key).await.expect("counter").expect("connected");
        assert_eq!(seen, 0);

        redis.bump_and_delete(&counter_key, 60, &key).await.expect("bump");
        assert!(!redis
            .hash_set_if_counter(&key, "cat", "1/3", 30, &counter_key, seen)
            .await
            .expect("stale set"));
        assert_eq!(redis.hash_get(&key, "cat").await.expect("get"), None);

        let current = redis.counter(&counter_key).await.expect("counter").expect("connected");
        assert!(redis
            .hash_set_if_counter(&key, "cat", "2/3", 30, &counter_key, current)
            .await
            .expect("fresh set"));
        assert_eq!(redis.hash_get(&key, "cat").await.expect("get").as_deref(), Some("2/3"));
    }
}
