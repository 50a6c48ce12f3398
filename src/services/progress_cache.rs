use crate::core::metrics::PROGRESS_CACHE_TOTAL;
use crate::core::redis::RedisHandle;
use crate::services::progress::{progress_percent, CategoryProgress};

/// Read-through projection of category progress. The completion tables stay
/// authoritative; every mutating call drops the learner's whole hash and bumps
/// a per-learner generation, and values computed under an older generation are
/// never written back.
#[derive(Clone)]
pub(crate) struct ProgressCache {
    redis: RedisHandle,
    ttl_seconds: u64,
}

fn key(user_id: &str) -> String {
    format!("progress:{user_id}")
}

fn generation_key(user_id: &str) -> String {
    format!("progress:{user_id}:gen")
}

// Outlives any request that could still hold an older generation.
const GENERATION_TTL_SECONDS: u64 = 24 * 60 * 60;

/// Generation observed before computing a value; required to store it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Generation(i64);

fn encode(progress: CategoryProgress) -> String {
    format!("{}/{}", progress.completed, progress.total)
}

fn decode(raw: &str) -> Option<CategoryProgress> {
    let (completed, total) = raw.split_once('/')?;
    let completed: usize = completed.parse().ok()?;
    let total: usize = total.parse().ok()?;
    if completed > total {
        return None;
    }
    Some(CategoryProgress { completed, total, percent: progress_percent(completed, total) })
}

impl ProgressCache {
    pub(crate) fn new(redis: RedisHandle, ttl_seconds: u64) -> Self {
        Self { redis, ttl_seconds }
    }

    pub(crate) async fn get(&self, user_id: &str, category_id: &str) -> Option<CategoryProgress> {
        match self.redis.hash_get(&key(user_id), category_id).await {
            Ok(Some(raw)) => match decode(&raw) {
                Some(progress) => {
                    metrics::counter!(PROGRESS_CACHE_TOTAL, "outcome" => "hit").increment(1);
                    Some(progress)
                }
                None => {
                    tracing::warn!(user_id, category_id, raw, "Discarding malformed progress cache entry");
                    None
                }
            },
            Ok(None) => {
                metrics::counter!(PROGRESS_CACHE_TOTAL, "outcome" => "miss").increment(1);
                None
            }
            Err(err) => {
                tracing::warn!(error = %err, user_id, "Progress cache read failed");
                None
            }
        }
    }

    /// Read before loading completions. `None` when the cache is unreachable.
    pub(crate) async fn generation(&self, user_id: &str) -> Option<Generation> {
        match self.redis.counter(&generation_key(user_id)).await {
            Ok(value) => value.map(Generation),
            Err(err) => {
                tracing::warn!(error = %err, user_id, "Progress cache generation read failed");
                None
            }
        }
    }

    pub(crate) async fn put(
        &self,
        user_id: &str,
        category_id: &str,
        progress: CategoryProgress,
        generation: Option<Generation>,
    ) {
        let Some(Generation(expected)) = generation else {
            return;
        };
        if self.ttl_seconds == 0 {
            return;
        }

        let value = encode(progress);
        match self
            .redis
            .hash_set_if_counter(
                &key(user_id),
                category_id,
                &value,
                self.ttl_seconds,
                &generation_key(user_id),
                expected,
            )
            .await
        {
            Ok(true) => {}
            Ok(false) => {
                metrics::counter!(PROGRESS_CACHE_TOTAL, "outcome" => "stale").increment(1);
                tracing::debug!(user_id, category_id, "Skipped caching progress from an older generation");
            }
            Err(err) => tracing::warn!(error = %err, user_id, "Progress cache write failed"),
        }
    }

    pub(crate) async fn invalidate(&self, user_id: &str) {
        if let Err(err) = self
            .redis
            .bump_and_delete(&generation_key(user_id), GENERATION_TTL_SECONDS, &key(user_id))
            .await
        {
            tracing::warn!(error = %err, user_id, "Progress cache invalidation failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::Settings;
    use crate::test_support;
    use uuid::Uuid;

    #[tokio::test]
    async fn without_redis_every_read_misses() {
        let cache = ProgressCache::new(RedisHandle::new("redis://127.0.0.1:1/0".to_string()), 60);

        let generation = cache.generation("u1").await;
        assert_eq!(generation, None);
        cache.put("u1", "c1", CategoryProgress { completed: 2, total: 5, percent: 40 }, generation).await;
        assert_eq!(cache.get("u1", "c1").await, None);
        cache.invalidate("u1").await;
    }

    #[test]
    fn keys_are_scoped_per_learner() {
        assert_eq!(key("abc"), "progress:abc");
        assert_eq!(generation_key("abc"), "progress:abc:gen");
    }

    #[test]
    fn cached_values_carry_counts() {
        let progress = CategoryProgress { completed: 2, total: 3, percent: 67 };
        assert_eq!(encode(progress), "2/3");
        assert_eq!(decode("2/3"), Some(progress));
        assert_eq!(decode("0/0"), Some(CategoryProgress { completed: 0, total: 0, percent: 0 }));
        assert_eq!(decode("4/3"), None);
        assert_eq!(decode("67"), None);
    }

    #[tokio::test]
    async fn completion_between_compute_and_store_wins() {
        let _guard = test_support::env_lock().await;
        test_support::set_test_env();

        let settings = Settings::load().expect("settings");
        let redis = RedisHandle::new(settings.redis().redis_url());
        redis.connect().await.expect("redis connect");
        let cache = ProgressCache::new(redis, 60);
        let user_id = Uuid::new_v4().to_string();

        // Reader observes the generation and computes 1/3 from completions.
        let observed = cache.generation(&user_id).await;
        assert!(observed.is_some());
        let stale = CategoryProgress { completed: 1, total: 3, percent: 33 };

        // A completion lands and invalidates before the reader stores its value.
        cache.invalidate(&user_id).await;
        cache.put(&user_id, "c1", stale, observed).await;
        assert_eq!(cache.get(&user_id, "c1").await, None);

        let fresh = CategoryProgress { completed: 2, total: 3, percent: 67 };
        let current = cache.generation(&user_id).await;
        cache.put(&user_id, "c1", fresh, current).await;
        assert_eq!(cache.get(&user_id, "c1").await, Some(fresh));
    }
}
