use std::{
	collections::HashMap,
	future::Future,
	sync::{
		Arc, Mutex as StdMutex,
		atomic::{AtomicU64, Ordering},
	},
};

use serde_json::Value;
use time::{Duration, OffsetDateTime};
use tokio::sync::Mutex as AsyncMutex;

use crate::{Error, Result};

/// Response cache with a single-flight guarantee: for any fingerprint, at
/// most one computation is in flight, and every concurrent caller observes
/// that one result. Entries expire on a per-kind TTL and the least recently
/// used are evicted once `max_entries` is exceeded.
#[derive(Clone)]
pub struct ResponseCache {
	inner: Arc<CacheInner>,
}

struct CacheInner {
	max_entries: usize,
	entries: StdMutex<HashMap<String, CacheEntry>>,
	locks: StdMutex<HashMap<String, Arc<AsyncMutex<()>>>>,
	hits: AtomicU64,
	misses: AtomicU64,
	evictions: AtomicU64,
}

struct CacheEntry {
	value: Value,
	expires_at: OffsetDateTime,
	last_used_at: OffsetDateTime,
}

#[derive(Clone, Copy, Debug, serde::Serialize, serde::Deserialize)]
pub struct CacheStats {
	pub entries: usize,
	pub hits: u64,
	pub misses: u64,
	pub evictions: u64,
}

impl ResponseCache {
	pub fn new(max_entries: usize) -> Self {
		Self {
			inner: Arc::new(CacheInner {
				max_entries,
				entries: StdMutex::new(HashMap::new()),
				locks: StdMutex::new(HashMap::new()),
				hits: AtomicU64::new(0),
				misses: AtomicU64::new(0),
				evictions: AtomicU64::new(0),
			}),
		}
	}

	/// Fast path on a fresh entry; otherwise the first caller for the key
	/// computes while later callers block on the same per-key lock and pick
	/// the stored result up afterwards. The computation itself runs on a
	/// detached task so a disconnecting requester never cancels work other
	/// waiters rely on. Failed computations cache nothing.
	pub async fn get_or_compute<F, Fut>(&self, key: &str, ttl: Duration, compute: F) -> Result<Value>
	where
		F: FnOnce() -> Fut,
		Fut: Future<Output = Result<Value>> + Send + 'static,
	{
		if let Some(value) = self.lookup(key, OffsetDateTime::now_utc()) {
			self.inner.hits.fetch_add(1, Ordering::Relaxed);

			return Ok(value);
		}

		let lock = self.key_lock(key);
		let _guard = lock.lock().await;

		if let Some(value) = self.lookup(key, OffsetDateTime::now_utc()) {
			self.inner.hits.fetch_add(1, Ordering::Relaxed);

			return Ok(value);
		}

		self.inner.misses.fetch_add(1, Ordering::Relaxed);

		let cache = self.clone();
		let owned_key = key.to_string();
		let future = compute();
		let handle = tokio::spawn(async move {
			let value = future.await?;

			cache.insert(&owned_key, value.clone(), ttl);

			Ok::<Value, Error>(value)
		});

		match handle.await {
			Ok(result) => result,
			Err(err) => Err(Error::Internal {
				message: format!("Cached computation aborted: {err}."),
			}),
		}
	}

	pub fn stats(&self) -> CacheStats {
		let entries = self.inner.entries.lock().unwrap_or_else(|err| err.into_inner()).len();

		CacheStats {
			entries,
			hits: self.inner.hits.load(Ordering::Relaxed),
			misses: self.inner.misses.load(Ordering::Relaxed),
			evictions: self.inner.evictions.load(Ordering::Relaxed),
		}
	}

	/// Drops expired entries and idle per-key locks. Returns how many entries
	/// were removed.
	pub fn sweep(&self, now: OffsetDateTime) -> usize {
		let removed = {
			let mut entries = self.inner.entries.lock().unwrap_or_else(|err| err.into_inner());
			let before = entries.len();

			entries.retain(|_, entry| entry.expires_at > now);

			before - entries.len()
		};

		{
			let mut locks = self.inner.locks.lock().unwrap_or_else(|err| err.into_inner());

			locks.retain(|_, lock| Arc::strong_count(lock) > 1);
		}

		removed
	}

	fn lookup(&self, key: &str, now: OffsetDateTime) -> Option<Value> {
		let mut entries = self.inner.entries.lock().unwrap_or_else(|err| err.into_inner());

		match entries.get_mut(key) {
			Some(entry) if entry.expires_at > now => {
				entry.last_used_at = now;

				Some(entry.value.clone())
			},
			Some(_) => {
				entries.remove(key);

				None
			},
			None => None,
		}
	}

	fn insert(&self, key: &str, value: Value, ttl: Duration) {
		let now = OffsetDateTime::now_utc();
		let mut entries = self.inner.entries.lock().unwrap_or_else(|err| err.into_inner());

		entries.insert(
			key.to_string(),
			CacheEntry { value, expires_at: now + ttl, last_used_at: now },
		);

		while entries.len() > self.inner.max_entries {
			let Some(oldest) = entries
				.iter()
				.min_by_key(|(_, entry)| entry.last_used_at)
				.map(|(key, _)| key.clone())
			else {
				break;
			};

			entries.remove(&oldest);
			self.inner.evictions.fetch_add(1, Ordering::Relaxed);
		}
	}

	fn key_lock(&self, key: &str) -> Arc<AsyncMutex<()>> {
		let mut locks = self.inner.locks.lock().unwrap_or_else(|err| err.into_inner());

		locks.entry(key.to_string()).or_insert_with(|| Arc::new(AsyncMutex::new(()))).clone()
	}
}

#[cfg(test)]
mod tests {
	use std::sync::atomic::AtomicUsize;

	use super::*;

	fn counted_compute(
		calls: Arc<AtomicUsize>,
		value: Value,
	) -> impl FnOnce() -> std::pin::Pin<Box<dyn Future<Output = Result<Value>> + Send>> {
		move || {
			Box::pin(async move {
				calls.fetch_add(1, Ordering::SeqCst);

				Ok(value)
			})
		}
	}

	#[tokio::test]
	async fn second_lookup_within_ttl_skips_the_computation() {
		let cache = ResponseCache::new(16);
		let calls = Arc::new(AtomicUsize::new(0));
		let first = cache
			.get_or_compute(
				"k",
				Duration::seconds(60),
				counted_compute(calls.clone(), serde_json::json!({ "answer": 42 })),
			)
			.await
			.expect("first compute failed");
		let second = cache
			.get_or_compute(
				"k",
				Duration::seconds(60),
				counted_compute(calls.clone(), serde_json::json!({ "answer": 43 })),
			)
			.await
			.expect("second lookup failed");

		assert_eq!(first, second);
		assert_eq!(calls.load(Ordering::SeqCst), 1);
		assert_eq!(cache.stats().hits, 1);
	}

	#[tokio::test]
	async fn expired_entries_trigger_a_fresh_computation() {
		let cache = ResponseCache::new(16);
		let calls = Arc::new(AtomicUsize::new(0));

		for _ in 0..2 {
			cache
				.get_or_compute(
					"k",
					Duration::seconds(-1),
					counted_compute(calls.clone(), serde_json::json!("stale")),
				)
				.await
				.expect("compute failed");
		}

		assert_eq!(calls.load(Ordering::SeqCst), 2);
	}

	#[tokio::test]
	async fn concurrent_identical_keys_compute_exactly_once() {
		let cache = ResponseCache::new(16);
		let calls = Arc::new(AtomicUsize::new(0));
		let mut handles = Vec::new();

		for _ in 0..8 {
			let cache = cache.clone();
			let calls = calls.clone();

			handles.push(tokio::spawn(async move {
				cache
					.get_or_compute("shared", Duration::seconds(60), move || {
						Box::pin(async move {
							tokio::time::sleep(std::time::Duration::from_millis(25)).await;
							calls.fetch_add(1, Ordering::SeqCst);

							Ok(serde_json::json!({ "winner": true }))
						})
							as std::pin::Pin<Box<dyn Future<Output = Result<Value>> + Send>>
					})
					.await
			}));
		}

		let mut results = Vec::new();

		for handle in handles {
			results.push(handle.await.expect("task panicked").expect("compute failed"));
		}

		assert_eq!(calls.load(Ordering::SeqCst), 1);
		assert!(results.windows(2).all(|pair| pair[0] == pair[1]));
	}

	#[tokio::test]
	async fn distinct_keys_do_not_share_results() {
		let cache = ResponseCache::new(16);
		let calls = Arc::new(AtomicUsize::new(0));

		for key in ["a", "b"] {
			cache
				.get_or_compute(
					key,
					Duration::seconds(60),
					counted_compute(calls.clone(), serde_json::json!(key)),
				)
				.await
				.expect("compute failed");
		}

		assert_eq!(calls.load(Ordering::SeqCst), 2);
	}

	#[tokio::test]
	async fn failed_computations_are_not_cached() {
		let cache = ResponseCache::new(16);
		let calls = Arc::new(AtomicUsize::new(0));

		for attempt in 0..2 {
			let calls = calls.clone();
			let result = cache
				.get_or_compute("k", Duration::seconds(60), move || {
					Box::pin(async move {
						calls.fetch_add(1, Ordering::SeqCst);

						if attempt == 0 {
							Err(Error::Provider { message: "boom".to_string() })
						} else {
							Ok(serde_json::json!("recovered"))
						}
					})
						as std::pin::Pin<Box<dyn Future<Output = Result<Value>> + Send>>
				})
				.await;

			if attempt == 0 {
				assert!(result.is_err());
			} else {
				assert_eq!(result.expect("recovery failed"), serde_json::json!("recovered"));
			}
		}

		assert_eq!(calls.load(Ordering::SeqCst), 2);
	}

	#[tokio::test]
	async fn least_recently_used_entries_are_evicted_at_capacity() {
		let cache = ResponseCache::new(2);

		for key in ["a", "b"] {
			cache
				.get_or_compute(
					key,
					Duration::seconds(60),
					counted_compute(Arc::new(AtomicUsize::new(0)), serde_json::json!(key)),
				)
				.await
				.expect("compute failed");
		}

		// Touch "a" so "b" becomes the eviction victim.
		let touched = cache.lookup("a", OffsetDateTime::now_utc());

		assert!(touched.is_some());

		cache
			.get_or_compute(
				"c",
				Duration::seconds(60),
				counted_compute(Arc::new(AtomicUsize::new(0)), serde_json::json!("c")),
			)
			.await
			.expect("compute failed");

		assert_eq!(cache.stats().evictions, 1);
		assert!(cache.lookup("a", OffsetDateTime::now_utc()).is_some());
		assert!(cache.lookup("b", OffsetDateTime::now_utc()).is_none());
		assert!(cache.lookup("c", OffsetDateTime::now_utc()).is_some());
	}

	#[tokio::test]
	async fn sweep_removes_expired_entries_and_idle_locks() {
		let cache = ResponseCache::new(16);

		cache
			.get_or_compute(
				"gone",
				Duration::seconds(-1),
				counted_compute(Arc::new(AtomicUsize::new(0)), serde_json::json!("gone")),
			)
			.await
			.expect("compute failed");
		cache
			.get_or_compute(
				"kept",
				Duration::seconds(60),
				counted_compute(Arc::new(AtomicUsize::new(0)), serde_json::json!("kept")),
			)
			.await
			.expect("compute failed");

		let removed = cache.sweep(OffsetDateTime::now_utc());

		assert_eq!(removed, 1);
		assert!(cache.lookup("kept", OffsetDateTime::now_utc()).is_some());
	}
}
