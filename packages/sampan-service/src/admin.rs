use sampan_index::models::IndexDocument;
use serde_json::{Map, Value};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{CacheStats, Error, Result, TourService};

#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct IngestDocumentRequest {
	pub title: String,
	pub content: String,
	pub category: Option<String>,
	pub url: Option<String>,
	/// Extra payload fields; activity metadata (name, area, categories,
	/// cost_hkd, duration_mins, rating, transport, tip) rides here when the
	/// document should be plannable.
	#[serde(default)]
	pub metadata: Map<String, Value>,
}

#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct IngestDocumentResponse {
	pub document_id: Uuid,
}

#[derive(Clone, Copy, Debug, serde::Serialize, serde::Deserialize)]
pub struct SweepReport {
	pub expired_cache_entries: usize,
	pub expired_sessions: usize,
}

#[derive(Clone, Copy, Debug, serde::Serialize, serde::Deserialize)]
pub struct CacheStatsResponse {
	pub cache: CacheStats,
}

impl TourService {
	/// Embeds and upserts one knowledge document. Write traffic is rare and
	/// admin-only, so there is no batching.
	pub async fn ingest_document(
		&self,
		request: IngestDocumentRequest,
	) -> Result<IngestDocumentResponse> {
		if request.title.trim().is_empty() {
			return Err(Error::InvalidRequest { message: "title must be non-empty.".to_string() });
		}
		if request.content.trim().is_empty() {
			return Err(Error::InvalidRequest {
				message: "content must be non-empty.".to_string(),
			});
		}

		let vectors = self
			.providers
			.embedding
			.embed(&self.cfg.providers.embedding, &[request.content.clone()])
			.await
			.map_err(|err| Error::from_provider(err, "Embedding"))?;
		let Some(vector) = vectors.into_iter().next() else {
			return Err(Error::Provider {
				message: "Embedding provider returned no vectors.".to_string(),
			});
		};
		let document_id = Uuid::new_v4();
		let mut payload = request.metadata;

		payload.insert("title".to_string(), Value::String(request.title));
		payload.insert("text".to_string(), Value::String(request.content));

		if let Some(category) = request.category {
			payload.insert("category".to_string(), Value::String(category));
		}
		if let Some(url) = request.url {
			payload.insert("url".to_string(), Value::String(url));
		}

		self.providers
			.index
			.upsert(vec![IndexDocument { id: document_id, payload }], vec![vector])
			.await
			.map_err(|err| Error::Internal {
				message: format!("Failed to index document: {err}."),
			})?;

		tracing::info!(%document_id, "Indexed knowledge document.");

		Ok(IngestDocumentResponse { document_id })
	}

	/// Removes expired cache entries and idle sessions. Also runs on a timer
	/// in the API process; the admin endpoint just triggers it eagerly.
	pub fn sweep(&self, now: OffsetDateTime) -> SweepReport {
		let expired_cache_entries = self.cache.sweep(now);
		let expired_sessions = self.sessions.sweep(now);

		if expired_cache_entries > 0 || expired_sessions > 0 {
			tracing::info!(
				cache_entries = expired_cache_entries,
				sessions = expired_sessions,
				"Swept expired state."
			);
		}

		SweepReport { expired_cache_entries, expired_sessions }
	}

	pub fn cache_stats(&self) -> CacheStatsResponse {
		CacheStatsResponse { cache: self.cache.stats() }
	}
}
