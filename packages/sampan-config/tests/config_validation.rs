use std::{
	env, fs,
	path::PathBuf,
	sync::atomic::{AtomicU64, Ordering},
	time::{SystemTime, UNIX_EPOCH},
};

use toml::Value;

const SAMPLE_CONFIG_TOML: &str = r#"
[service]
http_bind  = "127.0.0.1:8080"
admin_bind = "127.0.0.1:8081"
log_level  = "info"

[security]
bind_localhost_only = true

[storage.qdrant]
url        = "http://127.0.0.1:6334"
collection = "hk_tourism_v1"
vector_dim = 1024

[providers.generation]
provider_id = "openai-compat"
api_base    = "http://127.0.0.1:1"
api_key     = "test-key"
path        = "/v1/chat/completions"
model       = "test-model"
temperature = 0.3
timeout_ms  = 4000

[providers.embedding]
provider_id = "openai-compat"
api_base    = "http://127.0.0.1:1"
api_key     = "test-key"
path        = "/v1/embeddings"
model       = "test-embed"
dimensions  = 1024
timeout_ms  = 4000

[providers.ocr]
provider_id = "ocr"
api_base    = "http://127.0.0.1:1"
api_key     = "test-key"
path        = "/v1/extract"
model       = "test-ocr"
timeout_ms  = 4000
"#;

fn mutated_toml(mutate: impl FnOnce(&mut toml::Table)) -> String {
	let mut value: Value = toml::from_str(SAMPLE_CONFIG_TOML).expect("Failed to parse sample.");
	let root = value.as_table_mut().expect("Sample config must be a table.");

	mutate(root);

	toml::to_string(&value).expect("Failed to render sample config.")
}

fn write_temp_config(payload: String) -> PathBuf {
	static COUNTER: AtomicU64 = AtomicU64::new(0);

	let nanos = SystemTime::now()
		.duration_since(UNIX_EPOCH)
		.expect("System time must be valid.")
		.as_nanos();
	let ordinal = COUNTER.fetch_add(1, Ordering::SeqCst);
	let pid = std::process::id();
	let mut path = env::temp_dir();

	path.push(format!("sampan_config_test_{nanos}_{pid}_{ordinal}.toml"));

	fs::write(&path, payload).expect("Failed to write test config.");

	path
}

fn load_expecting_error(payload: String) -> String {
	let path = write_temp_config(payload);
	let result = sampan_config::load(&path);

	fs::remove_file(&path).expect("Failed to remove test config.");

	result.expect_err("Expected a validation error.").to_string()
}

#[test]
fn sample_config_is_valid_with_defaults() {
	let path = write_temp_config(SAMPLE_CONFIG_TOML.to_string());
	let config = sampan_config::load(&path);

	fs::remove_file(&path).expect("Failed to remove test config.");

	let config = config.expect("Sample config must load.");

	assert_eq!(config.retrieval.top_k, 4);
	assert_eq!(config.cache.recommendation_ttl_secs, 1_800);
	assert_eq!(config.context.session_ttl_hours, 24);
	assert_eq!(config.planner.medium_daily_cap_hkd, 1_000.0);
}

#[test]
fn embedding_dimensions_must_match_vector_dim() {
	let payload = mutated_toml(|root| {
		let storage = root.get_mut("storage").and_then(Value::as_table_mut).unwrap();
		let qdrant = storage.get_mut("qdrant").and_then(Value::as_table_mut).unwrap();

		qdrant.insert("vector_dim".to_string(), Value::Integer(768));
	});
	let message = load_expecting_error(payload);

	assert!(message.contains("must match storage.qdrant.vector_dim"), "Got: {message}");
}

#[test]
fn min_score_must_be_a_ratio() {
	let payload = mutated_toml(|root| {
		let mut retrieval = toml::Table::new();

		retrieval.insert("min_score".to_string(), Value::Float(1.5));
		root.insert("retrieval".to_string(), Value::Table(retrieval));
	});
	let message = load_expecting_error(payload);

	assert!(message.contains("retrieval.min_score"), "Got: {message}");
}

#[test]
fn cache_ttls_must_be_positive() {
	let payload = mutated_toml(|root| {
		let mut cache = toml::Table::new();

		cache.insert("translation_ttl_secs".to_string(), Value::Integer(0));
		root.insert("cache".to_string(), Value::Table(cache));
	});
	let message = load_expecting_error(payload);

	assert!(message.contains("cache.translation_ttl_secs"), "Got: {message}");
}

#[test]
fn keep_last_messages_must_fit_history_cap() {
	let payload = mutated_toml(|root| {
		let mut context = toml::Table::new();

		context.insert("max_messages".to_string(), Value::Integer(4));
		context.insert("keep_last_messages".to_string(), Value::Integer(10));
		root.insert("context".to_string(), Value::Table(context));
	});
	let message = load_expecting_error(payload);

	assert!(message.contains("keep_last_messages"), "Got: {message}");
}

#[test]
fn budget_caps_must_be_increasing() {
	let payload = mutated_toml(|root| {
		let mut planner = toml::Table::new();

		planner.insert("low_daily_cap_hkd".to_string(), Value::Float(1_200.0));
		root.insert("planner".to_string(), Value::Table(planner));
	});
	let message = load_expecting_error(payload);

	assert!(message.contains("strictly increasing"), "Got: {message}");
}

#[test]
fn provider_api_keys_must_be_non_empty() {
	let payload = mutated_toml(|root| {
		let providers = root.get_mut("providers").and_then(Value::as_table_mut).unwrap();
		let generation = providers.get_mut("generation").and_then(Value::as_table_mut).unwrap();

		generation.insert("api_key".to_string(), Value::String("  ".to_string()));
	});
	let message = load_expecting_error(payload);

	assert!(message.contains("generation api_key"), "Got: {message}");
}
