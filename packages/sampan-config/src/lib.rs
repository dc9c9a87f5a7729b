mod error;
mod types;

pub use error::{Error, Result};
pub use types::{
	Cache, Config, Context, EmbeddingProviderConfig, GenerationProviderConfig, Planner,
	ProviderConfig, Providers, Qdrant, Retrieval, Security, Service, Storage,
};

use std::{fs, path::Path};

pub fn load(path: &Path) -> Result<Config> {
	let raw = fs::read_to_string(path)
		.map_err(|err| Error::ReadConfig { path: path.to_path_buf(), source: err })?;

	let cfg: Config = toml::from_str(&raw)
		.map_err(|err| Error::ParseConfig { path: path.to_path_buf(), source: err })?;

	validate(&cfg)?;

	Ok(cfg)
}

pub fn validate(cfg: &Config) -> Result<()> {
	if cfg.service.http_bind.trim().is_empty() {
		return Err(Error::Validation {
			message: "service.http_bind must be non-empty.".to_string(),
		});
	}
	if cfg.service.admin_bind.trim().is_empty() {
		return Err(Error::Validation {
			message: "service.admin_bind must be non-empty.".to_string(),
		});
	}
	if cfg.providers.embedding.dimensions == 0 {
		return Err(Error::Validation {
			message: "providers.embedding.dimensions must be greater than zero.".to_string(),
		});
	}
	if cfg.providers.embedding.dimensions != cfg.storage.qdrant.vector_dim {
		return Err(Error::Validation {
			message: "providers.embedding.dimensions must match storage.qdrant.vector_dim."
				.to_string(),
		});
	}
	if !cfg.retrieval.min_score.is_finite() || !(0.0..=1.0).contains(&cfg.retrieval.min_score) {
		return Err(Error::Validation {
			message: "retrieval.min_score must be in the range 0.0-1.0.".to_string(),
		});
	}
	if cfg.retrieval.top_k == 0 {
		return Err(Error::Validation {
			message: "retrieval.top_k must be greater than zero.".to_string(),
		});
	}
	if cfg.retrieval.candidate_k == 0 {
		return Err(Error::Validation {
			message: "retrieval.candidate_k must be greater than zero.".to_string(),
		});
	}
	if cfg.cache.max_entries == 0 {
		return Err(Error::Validation {
			message: "cache.max_entries must be greater than zero.".to_string(),
		});
	}

	for (label, ttl) in [
		("cache.chat_ttl_secs", cfg.cache.chat_ttl_secs),
		("cache.itinerary_ttl_secs", cfg.cache.itinerary_ttl_secs),
		("cache.recommendation_ttl_secs", cfg.cache.recommendation_ttl_secs),
		("cache.translation_ttl_secs", cfg.cache.translation_ttl_secs),
	] {
		if ttl <= 0 {
			return Err(Error::Validation {
				message: format!("{label} must be greater than zero."),
			});
		}
	}

	if cfg.cache.sweep_interval_secs == 0 {
		return Err(Error::Validation {
			message: "cache.sweep_interval_secs must be greater than zero.".to_string(),
		});
	}
	if cfg.context.max_messages == 0 {
		return Err(Error::Validation {
			message: "context.max_messages must be greater than zero.".to_string(),
		});
	}
	if cfg.context.keep_last_messages == 0 {
		return Err(Error::Validation {
			message: "context.keep_last_messages must be greater than zero.".to_string(),
		});
	}
	if cfg.context.keep_last_messages > cfg.context.max_messages {
		return Err(Error::Validation {
			message: "context.keep_last_messages must not exceed context.max_messages.".to_string(),
		});
	}
	if cfg.context.session_ttl_hours <= 0 {
		return Err(Error::Validation {
			message: "context.session_ttl_hours must be greater than zero.".to_string(),
		});
	}
	if cfg.planner.day_start_hour >= 24 {
		return Err(Error::Validation {
			message: "planner.day_start_hour must be less than 24.".to_string(),
		});
	}
	if cfg.planner.default_activity_mins == 0 {
		return Err(Error::Validation {
			message: "planner.default_activity_mins must be greater than zero.".to_string(),
		});
	}

	let caps = [
		("planner.low_daily_cap_hkd", cfg.planner.low_daily_cap_hkd),
		("planner.medium_daily_cap_hkd", cfg.planner.medium_daily_cap_hkd),
		("planner.high_daily_cap_hkd", cfg.planner.high_daily_cap_hkd),
	];

	for (label, cap) in caps {
		if !cap.is_finite() || cap <= 0.0 {
			return Err(Error::Validation {
				message: format!("{label} must be a positive number."),
			});
		}
	}

	if cfg.planner.low_daily_cap_hkd >= cfg.planner.medium_daily_cap_hkd
		|| cfg.planner.medium_daily_cap_hkd >= cfg.planner.high_daily_cap_hkd
	{
		return Err(Error::Validation {
			message: "planner daily caps must be strictly increasing from low to high.".to_string(),
		});
	}

	for (label, key) in [
		("generation", &cfg.providers.generation.api_key),
		("embedding", &cfg.providers.embedding.api_key),
		("ocr", &cfg.providers.ocr.api_key),
	] {
		if key.trim().is_empty() {
			return Err(Error::Validation {
				message: format!("Provider {label} api_key must be non-empty."),
			});
		}
	}

	Ok(())
}
