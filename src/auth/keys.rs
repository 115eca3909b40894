// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Remote verification keys for RS256 tokens.
//!
//! ## Behavior
//!
//! - Keys are cached per `kid` in a bounded LRU and expire after a TTL.
//! - At most one key set fetch runs at a time. A miss joins the running
//!   fetch if there is one, otherwise it starts a new one.
//! - Upstream fetches are rate limited independently of the TTL. A fetch
//!   that cannot get a permit within a short wait fails, and every request
//!   waiting on it fails with it.
//! - A request waits for a missing key only up to its lookup timeout. The
//!   fetch keeps running in the background and still fills the cache.

use std::num::{NonZeroU32, NonZeroUsize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use jsonwebtoken::jwk::{AlgorithmParameters, Jwk};
use jsonwebtoken::DecodingKey;
use lru::LruCache;
use serde::Deserialize;
use tokio::sync::{watch, Mutex, RwLock};
use url::Url;

use super::error::AuthError;
use crate::config::KeyCacheConfig;

/// One cached verification key.
struct CachedKey {
    key: DecodingKey,
    fetched_at: Instant,
}

/// Key set document; individual keys are parsed leniently.
#[derive(Deserialize)]
struct RawKeySet {
    keys: Vec<serde_json::Value>,
}

/// Progress of one upstream fetch, broadcast to every request waiting on it.
#[derive(Clone)]
enum FetchState {
    Running,
    /// Number of usable keys stored, or why the fetch failed.
    Done(Result<usize, AuthError>),
}

impl FetchState {
    fn is_done(&self) -> bool {
        matches!(self, FetchState::Done(_))
    }
}

struct KeyCacheInner {
    jwks_url: Url,
    client: reqwest::Client,
    ttl: Duration,
    keys: RwLock<LruCache<String, CachedKey>>,
    /// Receiver of the most recent fetch. Locked only to join or replace it.
    in_flight: Mutex<Option<watch::Receiver<FetchState>>>,
    limiter: DefaultDirectRateLimiter,
    limiter_wait: Duration,
    lookup_timeout: Duration,
    upstream_fetches: AtomicU64,
}

/// Shared, cloneable cache of remote verification keys.
#[derive(Clone)]
pub struct KeyCache {
    inner: Arc<KeyCacheInner>,
}

impl KeyCache {
    /// Create an empty cache. Nothing is fetched until a key is requested
    /// or [`KeyCache::warm`] is called.
    pub fn new(config: &KeyCacheConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(config.fetch_timeout)
            .connect_timeout(config.fetch_timeout.min(Duration::from_secs(5)))
            .build()?;

        let limit = NonZeroU32::new(config.fetch_limit).unwrap_or(NonZeroU32::MIN);
        let quota = Quota::with_period(config.fetch_window / limit.get())
            .map(|q| q.allow_burst(limit))
            .unwrap_or_else(|| Quota::per_minute(limit));
        let capacity = NonZeroUsize::new(config.max_keys).unwrap_or(NonZeroUsize::MIN);

        Ok(Self {
            inner: Arc::new(KeyCacheInner {
                jwks_url: config.jwks_url.clone(),
                client,
                ttl: config.ttl,
                keys: RwLock::new(LruCache::new(capacity)),
                in_flight: Mutex::new(None),
                limiter: RateLimiter::direct(quota),
                limiter_wait: config.limiter_wait,
                lookup_timeout: config.lookup_timeout,
                upstream_fetches: AtomicU64::new(0),
            }),
        })
    }

    /// Get the verification key for `kid`, fetching the key set on a miss.
    pub async fn get(&self, kid: &str) -> Result<DecodingKey, AuthError> {
        if let Some(key) = self.inner.cached(kid).await {
            return Ok(key);
        }

        self.await_fetch().await?;

        self.inner.cached(kid).await.ok_or_else(|| {
            tracing::debug!(kid = %truncate(kid), "key id not present in key set");
            AuthError::KeyUnavailable("unknown key id".to_string())
        })
    }

    /// Fetch the key set now, or join the fetch already running, waiting at
    /// most the lookup timeout.
    ///
    /// Returns the number of usable keys stored.
    pub async fn warm(&self) -> Result<usize, AuthError> {
        self.await_fetch().await
    }

    /// Whether any cached key is still within its TTL.
    pub async fn has_fresh_keys(&self) -> bool {
        let keys = self.inner.keys.read().await;
        keys.iter()
            .any(|(_, entry)| entry.fetched_at.elapsed() < self.inner.ttl)
    }

    /// Number of key set requests sent upstream since creation.
    pub fn upstream_fetches(&self) -> u64 {
        self.inner.upstream_fetches.load(Ordering::Relaxed)
    }

    async fn await_fetch(&self) -> Result<usize, AuthError> {
        let mut progress = self.inner.join_or_start().await;
        let waited = tokio::time::timeout(self.inner.lookup_timeout, async {
            progress
                .wait_for(FetchState::is_done)
                .await
                .map(|state| state.clone())
        })
        .await;

        match waited {
            Ok(Ok(FetchState::Done(result))) => result,
            Ok(Ok(FetchState::Running)) | Ok(Err(_)) => Err(AuthError::KeyUnavailable(
                "key fetch ended without a result".to_string(),
            )),
            Err(_) => {
                tracing::debug!(
                    timeout_ms = self.inner.lookup_timeout.as_millis() as u64,
                    "key lookup timed out, fetch continues in background"
                );
                Err(AuthError::KeyUnavailable("key lookup timed out".to_string()))
            }
        }
    }
}

impl KeyCacheInner {
    async fn cached(&self, kid: &str) -> Option<DecodingKey> {
        let keys = self.keys.read().await;
        keys.peek(kid)
            .filter(|entry| entry.fetched_at.elapsed() < self.ttl)
            .map(|entry| entry.key.clone())
    }

    /// Subscribe to the running fetch, or spawn a new one if the last fetch
    /// has finished.
    async fn join_or_start(self: &Arc<Self>) -> watch::Receiver<FetchState> {
        let mut slot = self.in_flight.lock().await;
        if let Some(running) = slot.as_ref() {
            // A closed channel means the task died without reporting.
            if !running.borrow().is_done() && running.has_changed().is_ok() {
                return running.clone();
            }
        }

        let (report, progress) = watch::channel(FetchState::Running);
        *slot = Some(progress.clone());
        drop(slot);

        let inner = Arc::clone(self);
        tokio::spawn(async move {
            let result = inner.refresh().await;
            report.send_replace(FetchState::Done(result));
        });
        progress
    }

    /// Fetch and store the key set, subject to the rate limit.
    async fn refresh(&self) -> Result<usize, AuthError> {
        if tokio::time::timeout(self.limiter_wait, self.limiter.until_ready())
            .await
            .is_err()
        {
            tracing::warn!(jwks_url = %self.jwks_url, "key set fetch rate limit exceeded");
            return Err(AuthError::KeyUnavailable(
                "key set fetch rate limit exceeded".to_string(),
            ));
        }

        let key_set = self.fetch().await.inspect_err(|e| {
            tracing::warn!(jwks_url = %self.jwks_url, error = %e, "failed to fetch key set");
        })?;

        let fetched_at = Instant::now();
        let usable: Vec<(String, DecodingKey)> =
            key_set.keys.into_iter().filter_map(rsa_key).collect();
        let count = usable.len();

        let mut keys = self.keys.write().await;
        for (kid, key) in usable {
            keys.put(kid, CachedKey { key, fetched_at });
        }
        drop(keys);

        tracing::info!(jwks_url = %self.jwks_url, key_count = count, "key set cached");
        Ok(count)
    }

    async fn fetch(&self) -> Result<RawKeySet, AuthError> {
        self.upstream_fetches.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(jwks_url = %self.jwks_url, "fetching key set");

        let response = self
            .client
            .get(self.jwks_url.clone())
            .send()
            .await
            .map_err(|e| AuthError::KeyUnavailable(e.to_string()))?;

        if !response.status().is_success() {
            return Err(AuthError::KeyUnavailable(format!(
                "HTTP {} from key set endpoint",
                response.status()
            )));
        }

        response
            .json::<RawKeySet>()
            .await
            .map_err(|e| AuthError::KeyUnavailable(e.to_string()))
    }
}

/// Convert one key set entry into a `(kid, key)` pair. Only RSA keys with a
/// key id are usable for RS256.
fn rsa_key(value: serde_json::Value) -> Option<(String, DecodingKey)> {
    let jwk: Jwk = match serde_json::from_value(value) {
        Ok(jwk) => jwk,
        Err(e) => {
            tracing::debug!(error = %e, "skipping unparsable key set entry");
            return None;
        }
    };
    let kid = jwk.common.key_id.clone()?;

    match &jwk.algorithm {
        AlgorithmParameters::RSA(rsa) => match DecodingKey::from_rsa_components(&rsa.n, &rsa.e) {
            Ok(key) => Some((kid, key)),
            Err(e) => {
                tracing::debug!(kid = %truncate(&kid), error = %e, "skipping malformed RSA key");
                None
            }
        },
        _ => None,
    }
}

/// Shorten an untrusted string before it is logged.
pub(crate) fn truncate(value: &str) -> String {
    value.chars().take(20).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::test_support;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config_for(server: &MockServer) -> KeyCacheConfig {
        let url = Url::parse(&format!("{}/.well-known/jwks.json", server.uri())).unwrap();
        let mut config = KeyCacheConfig::new(url);
        config.lookup_timeout = Duration::from_secs(2);
        config
    }

    async fn is_cached(cache: &KeyCache, kid: &str) -> bool {
        cache.inner.cached(kid).await.is_some()
    }

    async fn mount_key_set(server: &MockServer, body: serde_json::Value, expected: u64) {
        Mock::given(method("GET"))
            .and(path("/.well-known/jwks.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .expect(expected)
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn miss_fetches_and_hit_uses_cache() {
        let server = MockServer::start().await;
        mount_key_set(&server, test_support::key_set("key-1"), 1).await;
        let cache = KeyCache::new(&config_for(&server)).unwrap();

        assert!(!is_cached(&cache, "key-1").await);
        cache.get("key-1").await.unwrap();
        cache.get("key-1").await.unwrap();

        assert!(is_cached(&cache, "key-1").await);
        assert_eq!(cache.upstream_fetches(), 1);
    }

    #[tokio::test]
    async fn concurrent_misses_share_one_fetch() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/.well-known/jwks.json"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(test_support::key_set("key-1"))
                    .set_delay(Duration::from_millis(100)),
            )
            .expect(1)
            .mount(&server)
            .await;
        let cache = KeyCache::new(&config_for(&server)).unwrap();

        let (a, b) = tokio::join!(cache.get("key-1"), cache.get("key-1"));
        assert!(a.is_ok());
        assert!(b.is_ok());
        assert_eq!(cache.upstream_fetches(), 1);
    }

    #[tokio::test]
    async fn unknown_key_id_is_unavailable() {
        let server = MockServer::start().await;
        mount_key_set(&server, test_support::key_set("key-1"), 1).await;
        let cache = KeyCache::new(&config_for(&server)).unwrap();

        let err = cache.get("other").await.unwrap_err();
        assert!(matches!(err, AuthError::KeyUnavailable(_)));
    }

    #[tokio::test]
    async fn fetches_beyond_rate_limit_fail_fast() {
        let server = MockServer::start().await;
        mount_key_set(&server, test_support::key_set("key-1"), 1).await;
        let mut config = config_for(&server);
        config.fetch_limit = 1;
        config.fetch_window = Duration::from_secs(60);
        config.limiter_wait = Duration::from_millis(20);
        let cache = KeyCache::new(&config).unwrap();

        assert!(cache.get("unknown-a").await.is_err());

        let started = Instant::now();
        let err = cache.get("unknown-b").await.unwrap_err();
        assert!(matches!(err, AuthError::KeyUnavailable(_)));
        assert!(started.elapsed() < Duration::from_secs(1));
        assert_eq!(cache.upstream_fetches(), 1);
    }

    #[tokio::test]
    async fn flood_of_unknown_ids_fails_after_one_limiter_wait() {
        let server = MockServer::start().await;
        mount_key_set(&server, test_support::key_set("key-1"), 1).await;
        let mut config = config_for(&server);
        config.fetch_limit = 1;
        config.fetch_window = Duration::from_secs(60);
        let limiter_wait = config.limiter_wait;
        let cache = KeyCache::new(&config).unwrap();

        // Spend the only permit.
        assert_eq!(cache.warm().await.unwrap(), 1);

        let mut lookups = Vec::new();
        for i in 0..40 {
            let cache = cache.clone();
            lookups.push(tokio::spawn(async move {
                let started = Instant::now();
                let result = cache.get(&format!("unknown-{i}")).await;
                (result, started.elapsed())
            }));
        }

        let mut slowest = Duration::ZERO;
        for lookup in lookups {
            let (result, elapsed) = lookup.await.unwrap();
            assert!(matches!(result, Err(AuthError::KeyUnavailable(_))));
            slowest = slowest.max(elapsed);
        }

        assert!(
            slowest < limiter_wait * 4,
            "rate limited lookup took {slowest:?}"
        );
        assert_eq!(cache.upstream_fetches(), 1);
        assert!(is_cached(&cache, "key-1").await);
    }

    #[tokio::test]
    async fn expired_entries_are_fetched_again() {
        let server = MockServer::start().await;
        mount_key_set(&server, test_support::key_set("key-1"), 2).await;
        let mut config = config_for(&server);
        config.ttl = Duration::from_millis(50);
        let cache = KeyCache::new(&config).unwrap();

        cache.get("key-1").await.unwrap();
        tokio::time::sleep(Duration::from_millis(80)).await;
        assert!(!is_cached(&cache, "key-1").await);
        cache.get("key-1").await.unwrap();

        assert_eq!(cache.upstream_fetches(), 2);
    }

    #[tokio::test]
    async fn slow_fetch_times_out_but_still_fills_cache() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(test_support::key_set("key-1"))
                    .set_delay(Duration::from_millis(300)),
            )
            .mount(&server)
            .await;
        let mut config = config_for(&server);
        config.lookup_timeout = Duration::from_millis(50);
        let cache = KeyCache::new(&config).unwrap();

        let err = cache.get("key-1").await.unwrap_err();
        assert!(matches!(err, AuthError::KeyUnavailable(_)));

        tokio::time::sleep(Duration::from_millis(600)).await;
        assert!(is_cached(&cache, "key-1").await);
    }

    #[tokio::test]
    async fn server_errors_are_unavailable() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;
        let cache = KeyCache::new(&config_for(&server)).unwrap();

        let err = cache.get("key-1").await.unwrap_err();
        assert!(matches!(err, AuthError::KeyUnavailable(_)));
        assert!(!cache.has_fresh_keys().await);
    }

    #[tokio::test]
    async fn unusable_entries_are_skipped() {
        let server = MockServer::start().await;
        let mut body = test_support::key_set("key-1");
        let keys = body["keys"].as_array_mut().unwrap();
        keys.push(json!({"kty": "oct", "kid": "hmac", "k": "c2VjcmV0"}));
        keys.push(json!({"kty": "RSA", "n": "AQAB", "e": "AQAB"}));
        keys.push(json!({"not": "a key"}));
        mount_key_set(&server, body, 1).await;
        let cache = KeyCache::new(&config_for(&server)).unwrap();

        assert_eq!(cache.warm().await.unwrap(), 1);
        assert!(is_cached(&cache, "key-1").await);
        assert!(!is_cached(&cache, "hmac").await);
        assert!(cache.has_fresh_keys().await);
    }

    #[test]
    fn truncate_limits_logged_values() {
        assert_eq!(truncate("short"), "short");
        assert_eq!(truncate(&"x".repeat(100)).len(), 20);
    }
}
