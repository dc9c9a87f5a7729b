use serde::Deserialize;
use serde_json::{Map, Value};

#[derive(Debug, Deserialize)]
pub struct Config {
	pub service: Service,
	pub storage: Storage,
	pub providers: Providers,
	#[serde(default)]
	pub retrieval: Retrieval,
	#[serde(default)]
	pub cache: Cache,
	#[serde(default)]
	pub context: Context,
	#[serde(default)]
	pub planner: Planner,
	pub security: Security,
}

#[derive(Debug, Deserialize)]
pub struct Service {
	pub http_bind: String,
	pub admin_bind: String,
	pub log_level: String,
}

#[derive(Debug, Deserialize)]
pub struct Storage {
	pub qdrant: Qdrant,
}

#[derive(Debug, Deserialize)]
pub struct Qdrant {
	pub url: String,
	pub collection: String,
	pub vector_dim: u32,
}

#[derive(Debug, Deserialize)]
pub struct Providers {
	pub generation: GenerationProviderConfig,
	pub embedding: EmbeddingProviderConfig,
	pub ocr: ProviderConfig,
}

#[derive(Debug, Deserialize)]
pub struct GenerationProviderConfig {
	pub provider_id: String,
	pub api_base: String,
	pub api_key: String,
	pub path: String,
	pub model: String,
	pub temperature: f32,
	pub timeout_ms: u64,
	#[serde(default)]
	pub default_headers: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
pub struct EmbeddingProviderConfig {
	pub provider_id: String,
	pub api_base: String,
	pub api_key: String,
	pub path: String,
	pub model: String,
	pub dimensions: u32,
	pub timeout_ms: u64,
	#[serde(default)]
	pub default_headers: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
pub struct ProviderConfig {
	pub provider_id: String,
	pub api_base: String,
	pub api_key: String,
	pub path: String,
	pub model: String,
	pub timeout_ms: u64,
	#[serde(default)]
	pub default_headers: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Retrieval {
	/// Grounding fragments per chat/recommendation request.
	pub top_k: u32,
	/// Candidate pool size for itinerary planning.
	pub candidate_k: u32,
	/// Hits scoring below this are dropped even when inside top_k.
	pub min_score: f32,
}
impl Default for Retrieval {
	fn default() -> Self {
		Self { top_k: 4, candidate_k: 40, min_score: 0.25 }
	}
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Cache {
	pub max_entries: usize,
	pub chat_ttl_secs: i64,
	pub itinerary_ttl_secs: i64,
	pub recommendation_ttl_secs: i64,
	pub translation_ttl_secs: i64,
	pub sweep_interval_secs: u64,
}
impl Default for Cache {
	fn default() -> Self {
		Self {
			max_entries: 4_096,
			chat_ttl_secs: 3_600,
			itinerary_ttl_secs: 21_600,
			recommendation_ttl_secs: 1_800,
			translation_ttl_secs: 900,
			sweep_interval_secs: 300,
		}
	}
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Context {
	/// Hard cap on stored messages per session; oldest are dropped beyond it.
	pub max_messages: usize,
	/// Character budget of the history slice handed to the prompt.
	pub prompt_budget_chars: usize,
	/// Newest messages that survive truncation verbatim.
	pub keep_last_messages: usize,
	pub session_ttl_hours: i64,
}
impl Default for Context {
	fn default() -> Self {
		Self {
			max_messages: 50,
			prompt_budget_chars: 4_000,
			keep_last_messages: 5,
			session_ttl_hours: 24,
		}
	}
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Planner {
	pub day_start_hour: u32,
	pub transfer_gap_mins: u32,
	pub default_activity_mins: u32,
	pub low_daily_cap_hkd: f32,
	pub medium_daily_cap_hkd: f32,
	pub high_daily_cap_hkd: f32,
}
impl Default for Planner {
	fn default() -> Self {
		Self {
			day_start_hour: 9,
			transfer_gap_mins: 30,
			default_activity_mins: 120,
			low_daily_cap_hkd: 500.0,
			medium_daily_cap_hkd: 1_000.0,
			high_daily_cap_hkd: 2_000.0,
		}
	}
}

#[derive(Debug, Deserialize)]
pub struct Security {
	pub bind_localhost_only: bool,
}
