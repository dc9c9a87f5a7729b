pub mod admin;
pub mod cache;
pub mod chat;
pub mod fingerprint;
pub mod generate;
pub mod itinerary;
pub mod recommend;
pub mod retrieve;
pub mod session;
pub mod time_serde;
pub mod translate;

mod error;

use std::{future::Future, pin::Pin, sync::Arc};

use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;

pub use admin::{CacheStatsResponse, IngestDocumentRequest, IngestDocumentResponse, SweepReport};
pub use cache::{CacheStats, ResponseCache};
pub use chat::{ChatRequest, ChatResponse, Source};
pub use error::{Error, Result};
pub use itinerary::{ItineraryRequest, ItineraryResponse};
pub use recommend::{
	Recommendation, RecommendationRequest, RecommendationResponse, UserPreferences,
};
pub use session::{Message, Role, SessionStats, SessionStore, UserContext};
pub use translate::{TranslateImageRequest, TranslateTextRequest, TranslationResponse};

use sampan_config::{
	Config, EmbeddingProviderConfig, GenerationProviderConfig, ProviderConfig,
};
use sampan_index::{
	models::{IndexDocument, KnowledgeHit},
	store::KnowledgeStore,
};
use sampan_providers::{embedding, generation, ocr};

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

pub trait GenerationProvider
where
	Self: Send + Sync,
{
	fn complete<'a>(
		&'a self,
		cfg: &'a GenerationProviderConfig,
		messages: &'a [Value],
	) -> BoxFuture<'a, sampan_providers::Result<String>>;
}

pub trait EmbeddingProvider
where
	Self: Send + Sync,
{
	fn embed<'a>(
		&'a self,
		cfg: &'a EmbeddingProviderConfig,
		texts: &'a [String],
	) -> BoxFuture<'a, sampan_providers::Result<Vec<Vec<f32>>>>;
}

pub trait OcrProvider
where
	Self: Send + Sync,
{
	fn extract_text<'a>(
		&'a self,
		cfg: &'a ProviderConfig,
		image_base64: &'a str,
	) -> BoxFuture<'a, sampan_providers::Result<String>>;
}

pub trait VectorIndexProvider
where
	Self: Send + Sync,
{
	fn search<'a>(
		&'a self,
		vector: Vec<f32>,
		limit: u64,
	) -> BoxFuture<'a, sampan_index::Result<Vec<KnowledgeHit>>>;

	fn upsert<'a>(
		&'a self,
		documents: Vec<IndexDocument>,
		vectors: Vec<Vec<f32>>,
	) -> BoxFuture<'a, sampan_index::Result<()>>;
}

#[derive(Clone)]
pub struct Providers {
	pub generation: Arc<dyn GenerationProvider>,
	pub embedding: Arc<dyn EmbeddingProvider>,
	pub ocr: Arc<dyn OcrProvider>,
	pub index: Arc<dyn VectorIndexProvider>,
}
impl Providers {
	pub fn new(
		generation: Arc<dyn GenerationProvider>,
		embedding: Arc<dyn EmbeddingProvider>,
		ocr: Arc<dyn OcrProvider>,
		index: Arc<dyn VectorIndexProvider>,
	) -> Self {
		Self { generation, embedding, ocr, index }
	}

	/// Real HTTP providers plus the given index store.
	pub fn with_index(index: Arc<dyn VectorIndexProvider>) -> Self {
		let provider = Arc::new(DefaultProviders);

		Self { generation: provider.clone(), embedding: provider.clone(), ocr: provider, index }
	}
}

pub struct TourService {
	pub cfg: Arc<Config>,
	pub providers: Providers,
	pub cache: ResponseCache,
	pub sessions: SessionStore,
}
impl TourService {
	pub fn new(cfg: Config, store: KnowledgeStore) -> Self {
		let providers = Providers::with_index(Arc::new(store));

		Self::with_providers(cfg, providers)
	}

	pub fn with_providers(cfg: Config, providers: Providers) -> Self {
		let cache = ResponseCache::new(cfg.cache.max_entries);
		let sessions = SessionStore::new(&cfg.context);

		Self { cfg: Arc::new(cfg), providers, cache, sessions }
	}
}

struct DefaultProviders;

impl GenerationProvider for DefaultProviders {
	fn complete<'a>(
		&'a self,
		cfg: &'a GenerationProviderConfig,
		messages: &'a [Value],
	) -> BoxFuture<'a, sampan_providers::Result<String>> {
		Box::pin(generation::complete(cfg, messages))
	}
}

impl EmbeddingProvider for DefaultProviders {
	fn embed<'a>(
		&'a self,
		cfg: &'a EmbeddingProviderConfig,
		texts: &'a [String],
	) -> BoxFuture<'a, sampan_providers::Result<Vec<Vec<f32>>>> {
		Box::pin(embedding::embed(cfg, texts))
	}
}

impl OcrProvider for DefaultProviders {
	fn extract_text<'a>(
		&'a self,
		cfg: &'a ProviderConfig,
		image_base64: &'a str,
	) -> BoxFuture<'a, sampan_providers::Result<String>> {
		Box::pin(ocr::extract_text(cfg, image_base64))
	}
}

impl VectorIndexProvider for KnowledgeStore {
	fn search<'a>(
		&'a self,
		vector: Vec<f32>,
		limit: u64,
	) -> BoxFuture<'a, sampan_index::Result<Vec<KnowledgeHit>>> {
		Box::pin(KnowledgeStore::search(self, vector, limit))
	}

	fn upsert<'a>(
		&'a self,
		documents: Vec<IndexDocument>,
		vectors: Vec<Vec<f32>>,
	) -> BoxFuture<'a, sampan_index::Result<()>> {
		Box::pin(async move { KnowledgeStore::upsert(self, &documents, &vectors).await })
	}
}

pub(crate) fn encode_json<T>(value: &T, label: &str) -> Result<Value>
where
	T: Serialize,
{
	serde_json::to_value(value)
		.map_err(|err| Error::Internal { message: format!("Failed to encode {label}: {err}.") })
}

pub(crate) fn decode_json<T>(value: Value, label: &str) -> Result<T>
where
	T: DeserializeOwned,
{
	serde_json::from_value(value)
		.map_err(|err| Error::Internal { message: format!("Invalid {label} value: {err}.") })
}
