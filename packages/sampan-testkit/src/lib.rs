//! Stub and spy providers for exercising the engine without network access.
//! Call counters make "exactly one upstream call" assertions cheap.

use std::sync::{
	Arc, Mutex,
	atomic::{AtomicUsize, Ordering},
};

use serde_json::{Map, Value};
use uuid::Uuid;

use sampan_config::{
	Cache, Config, Context, EmbeddingProviderConfig, GenerationProviderConfig, Planner,
	ProviderConfig, Providers as ProviderSettings, Qdrant, Retrieval, Security, Service, Storage,
};
use sampan_index::models::{IndexDocument, KnowledgeHit};
use sampan_service::{
	BoxFuture, EmbeddingProvider, GenerationProvider, OcrProvider, Providers, VectorIndexProvider,
};

/// Returns the same completion for every call and counts invocations.
pub struct StaticGeneration {
	body: String,
	calls: AtomicUsize,
}
impl StaticGeneration {
	pub fn new(body: impl Into<String>) -> Self {
		Self { body: body.into(), calls: AtomicUsize::new(0) }
	}

	pub fn json(value: &Value) -> Self {
		Self::new(value.to_string())
	}

	pub fn calls(&self) -> usize {
		self.calls.load(Ordering::SeqCst)
	}
}
impl GenerationProvider for StaticGeneration {
	fn complete<'a>(
		&'a self,
		_cfg: &'a GenerationProviderConfig,
		_messages: &'a [Value],
	) -> BoxFuture<'a, sampan_providers::Result<String>> {
		self.calls.fetch_add(1, Ordering::SeqCst);

		let body = self.body.clone();

		Box::pin(async move { Ok(body) })
	}
}

/// Plays completions in order, repeating the last one when the script runs
/// out. Handy for malformed-then-valid retry scenarios.
pub struct ScriptedGeneration {
	bodies: Mutex<Vec<String>>,
	calls: AtomicUsize,
}
impl ScriptedGeneration {
	pub fn new(bodies: impl IntoIterator<Item = impl Into<String>>) -> Self {
		Self {
			bodies: Mutex::new(bodies.into_iter().map(Into::into).collect()),
			calls: AtomicUsize::new(0),
		}
	}

	pub fn calls(&self) -> usize {
		self.calls.load(Ordering::SeqCst)
	}
}
impl GenerationProvider for ScriptedGeneration {
	fn complete<'a>(
		&'a self,
		_cfg: &'a GenerationProviderConfig,
		_messages: &'a [Value],
	) -> BoxFuture<'a, sampan_providers::Result<String>> {
		let index = self.calls.fetch_add(1, Ordering::SeqCst);
		let bodies = self.bodies.lock().unwrap_or_else(|err| err.into_inner());
		let body = bodies.get(index).or_else(|| bodies.last()).cloned().unwrap_or_default();

		Box::pin(async move { Ok(body) })
	}
}

#[derive(Clone, Copy, Debug)]
pub enum FailureMode {
	Timeout,
	Quota,
}

/// Fails every call with the configured provider error.
pub struct FailingGeneration {
	mode: FailureMode,
	calls: AtomicUsize,
}
impl FailingGeneration {
	pub fn new(mode: FailureMode) -> Self {
		Self { mode, calls: AtomicUsize::new(0) }
	}

	pub fn calls(&self) -> usize {
		self.calls.load(Ordering::SeqCst)
	}
}
impl GenerationProvider for FailingGeneration {
	fn complete<'a>(
		&'a self,
		_cfg: &'a GenerationProviderConfig,
		_messages: &'a [Value],
	) -> BoxFuture<'a, sampan_providers::Result<String>> {
		self.calls.fetch_add(1, Ordering::SeqCst);

		let mode = self.mode;

		Box::pin(async move {
			Err(match mode {
				FailureMode::Timeout => sampan_providers::Error::Timeout,
				FailureMode::Quota => sampan_providers::Error::RateLimited {
					message: "monthly quota exhausted".to_string(),
				},
			})
		})
	}
}

/// Zero vectors of the configured dimension, one per input text.
pub struct StaticEmbedding;
impl EmbeddingProvider for StaticEmbedding {
	fn embed<'a>(
		&'a self,
		cfg: &'a EmbeddingProviderConfig,
		texts: &'a [String],
	) -> BoxFuture<'a, sampan_providers::Result<Vec<Vec<f32>>>> {
		let dim = (cfg.dimensions as usize).max(1);
		let vec = vec![0.0; dim];

		Box::pin(async move { Ok(vec![vec; texts.len()]) })
	}
}

pub struct StaticOcr {
	text: String,
	calls: AtomicUsize,
}
impl StaticOcr {
	pub fn new(text: impl Into<String>) -> Self {
		Self { text: text.into(), calls: AtomicUsize::new(0) }
	}

	pub fn calls(&self) -> usize {
		self.calls.load(Ordering::SeqCst)
	}
}
impl OcrProvider for StaticOcr {
	fn extract_text<'a>(
		&'a self,
		_cfg: &'a ProviderConfig,
		_image_base64: &'a str,
	) -> BoxFuture<'a, sampan_providers::Result<String>> {
		self.calls.fetch_add(1, Ordering::SeqCst);

		let text = self.text.clone();

		Box::pin(async move { Ok(text) })
	}
}

/// In-memory index serving canned hits and recording upserts.
pub struct StaticIndex {
	hits: Vec<KnowledgeHit>,
	search_calls: AtomicUsize,
	upserted: Mutex<Vec<IndexDocument>>,
}
impl StaticIndex {
	pub fn new(hits: Vec<KnowledgeHit>) -> Self {
		Self { hits, search_calls: AtomicUsize::new(0), upserted: Mutex::new(Vec::new()) }
	}

	pub fn empty() -> Self {
		Self::new(Vec::new())
	}

	pub fn search_calls(&self) -> usize {
		self.search_calls.load(Ordering::SeqCst)
	}

	pub fn upserted(&self) -> Vec<IndexDocument> {
		self.upserted.lock().unwrap_or_else(|err| err.into_inner()).clone()
	}
}
impl VectorIndexProvider for StaticIndex {
	fn search<'a>(
		&'a self,
		_vector: Vec<f32>,
		limit: u64,
	) -> BoxFuture<'a, sampan_index::Result<Vec<KnowledgeHit>>> {
		self.search_calls.fetch_add(1, Ordering::SeqCst);

		let hits: Vec<KnowledgeHit> =
			self.hits.iter().take(limit as usize).cloned().collect();

		Box::pin(async move { Ok(hits) })
	}

	fn upsert<'a>(
		&'a self,
		documents: Vec<IndexDocument>,
		_vectors: Vec<Vec<f32>>,
	) -> BoxFuture<'a, sampan_index::Result<()>> {
		self.upserted.lock().unwrap_or_else(|err| err.into_inner()).extend(documents);

		Box::pin(async move { Ok(()) })
	}
}

/// Simulates an unreachable nearest-neighbor index.
pub struct FailingIndex;
impl VectorIndexProvider for FailingIndex {
	fn search<'a>(
		&'a self,
		_vector: Vec<f32>,
		_limit: u64,
	) -> BoxFuture<'a, sampan_index::Result<Vec<KnowledgeHit>>> {
		Box::pin(async move {
			Err(sampan_index::Error::InvalidArgument("index unreachable".to_string()))
		})
	}

	fn upsert<'a>(
		&'a self,
		_documents: Vec<IndexDocument>,
		_vectors: Vec<Vec<f32>>,
	) -> BoxFuture<'a, sampan_index::Result<()>> {
		Box::pin(async move {
			Err(sampan_index::Error::InvalidArgument("index unreachable".to_string()))
		})
	}
}

pub fn chunk_hit(title: &str, text: &str, score: f32) -> KnowledgeHit {
	let mut payload = Map::new();

	payload.insert("title".to_string(), Value::String(title.to_string()));
	payload.insert("text".to_string(), Value::String(text.to_string()));

	KnowledgeHit { id: Uuid::new_v4().to_string(), score, payload }
}

pub fn activity_hit(
	name: &str,
	area: &str,
	categories: &[&str],
	cost_hkd: f32,
	rating: f32,
	score: f32,
) -> KnowledgeHit {
	let mut payload = Map::new();

	payload.insert("name".to_string(), Value::String(name.to_string()));
	payload.insert(
		"description".to_string(),
		Value::String(format!("{name} is a classic Hong Kong stop.")),
	);
	payload.insert("area".to_string(), Value::String(area.to_string()));
	payload.insert(
		"categories".to_string(),
		Value::Array(
			categories.iter().map(|value| Value::String(value.to_string())).collect(),
		),
	);
	payload.insert("cost_hkd".to_string(), serde_json::json!(cost_hkd));
	payload.insert("duration_mins".to_string(), serde_json::json!(120));
	payload.insert("rating".to_string(), serde_json::json!(rating));
	payload.insert("transport".to_string(), Value::String("MTR".to_string()));

	KnowledgeHit { id: Uuid::new_v4().to_string(), score, payload }
}

pub fn test_providers(
	generation: Arc<dyn GenerationProvider>,
	index: Arc<dyn VectorIndexProvider>,
) -> Providers {
	Providers::new(generation, Arc::new(StaticEmbedding), Arc::new(StaticOcr::new("")), index)
}

pub fn test_config() -> Config {
	Config {
		service: Service {
			http_bind: "127.0.0.1:0".to_string(),
			admin_bind: "127.0.0.1:0".to_string(),
			log_level: "info".to_string(),
		},
		storage: Storage {
			qdrant: Qdrant {
				url: "http://127.0.0.1:6334".to_string(),
				collection: "hk_tourism_test".to_string(),
				vector_dim: 8,
			},
		},
		providers: ProviderSettings {
			generation: GenerationProviderConfig {
				provider_id: "test".to_string(),
				api_base: "http://127.0.0.1:1".to_string(),
				api_key: "test-key".to_string(),
				path: "/v1/chat/completions".to_string(),
				model: "test-model".to_string(),
				temperature: 0.3,
				timeout_ms: 1_000,
				default_headers: Map::new(),
			},
			embedding: EmbeddingProviderConfig {
				provider_id: "test".to_string(),
				api_base: "http://127.0.0.1:1".to_string(),
				api_key: "test-key".to_string(),
				path: "/v1/embeddings".to_string(),
				model: "test-embed".to_string(),
				dimensions: 8,
				timeout_ms: 1_000,
				default_headers: Map::new(),
			},
			ocr: ProviderConfig {
				provider_id: "test".to_string(),
				api_base: "http://127.0.0.1:1".to_string(),
				api_key: "test-key".to_string(),
				path: "/v1/extract".to_string(),
				model: "test-ocr".to_string(),
				timeout_ms: 1_000,
				default_headers: Map::new(),
			},
		},
		retrieval: Retrieval::default(),
		cache: Cache::default(),
		context: Context::default(),
		planner: Planner::default(),
		security: Security { bind_localhost_only: true },
	}
}
