use std::sync::Arc;

use sampan_config::Config;
use sampan_domain::budget::BudgetBand;
use serde_json::Value;
use time::Duration;

use crate::{
	Error, Providers, Result, TourService, decode_json, encode_json, fingerprint, generate,
	retrieve,
};

const MAX_RECOMMENDATIONS: u32 = 20;
const TIME_CONTEXTS: [&str; 3] = ["morning", "afternoon", "evening"];

#[derive(Clone, Debug, Default, serde::Serialize, serde::Deserialize)]
pub struct UserPreferences {
	#[serde(default)]
	pub interests: Vec<String>,
	pub budget: Option<String>,
}

#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct RecommendationRequest {
	pub user_preferences: UserPreferences,
	pub current_location: Option<String>,
	pub time_context: Option<String>,
	#[serde(default = "default_limit")]
	pub limit: u32,
}

#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct Recommendation {
	pub name: String,
	pub description: String,
	pub category: String,
	pub location: String,
	pub rating: Option<f32>,
	pub estimated_time: Option<String>,
	pub cost_range: Option<String>,
	#[serde(default)]
	pub reasons: Vec<String>,
}

#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct RecommendationResponse {
	pub recommendations: Vec<Recommendation>,
}

fn default_limit() -> u32 {
	5
}

impl TourService {
	pub async fn recommendations(
		&self,
		request: RecommendationRequest,
	) -> Result<RecommendationResponse> {
		validate(&request)?;

		let key = fingerprint::recommendation_fingerprint(
			&request.user_preferences.interests,
			request.user_preferences.budget.as_deref(),
			request.current_location.as_deref(),
			request.time_context.as_deref(),
			request.limit,
		)?;
		let ttl = Duration::seconds(self.cfg.cache.recommendation_ttl_secs);
		let cfg = self.cfg.clone();
		let providers = self.providers.clone();
		let value = self
			.cache
			.get_or_compute(&key, ttl, move || compute_recommendations(cfg, providers, request))
			.await?;

		decode_json(value, "recommendation payload")
	}
}

fn validate(request: &RecommendationRequest) -> Result<()> {
	if request.limit == 0 {
		return Err(Error::InvalidRequest {
			message: "limit must be at least one.".to_string(),
		});
	}
	if request.limit > MAX_RECOMMENDATIONS {
		return Err(Error::InvalidRequest {
			message: format!("limit must be at most {MAX_RECOMMENDATIONS}."),
		});
	}
	if let Some(budget) = request.user_preferences.budget.as_deref()
		&& BudgetBand::parse(budget).is_none()
	{
		return Err(Error::InvalidRequest {
			message: "budget must be one of low, medium, or high.".to_string(),
		});
	}
	if let Some(time_context) = request.time_context.as_deref()
		&& !TIME_CONTEXTS.contains(&time_context)
	{
		return Err(Error::InvalidRequest {
			message: "time_context must be one of morning, afternoon, or evening.".to_string(),
		});
	}

	Ok(())
}

fn retrieval_query(request: &RecommendationRequest) -> String {
	let mut parts = Vec::new();

	if !request.user_preferences.interests.is_empty() {
		parts.push(request.user_preferences.interests.join(", "));
	}
	if let Some(location) = request
		.current_location
		.as_deref()
		.map(str::trim)
		.filter(|value| !value.is_empty())
	{
		parts.push(format!("near {location}"));
	}

	if parts.is_empty() {
		"things to do in Hong Kong".to_string()
	} else {
		format!("{} in Hong Kong", parts.join(" "))
	}
}

async fn compute_recommendations(
	cfg: Arc<Config>,
	providers: Providers,
	request: RecommendationRequest,
) -> Result<Value> {
	let query = retrieval_query(&request);
	let chunks =
		match retrieve::retrieve_chunks(&cfg, &providers, &query, cfg.retrieval.top_k).await {
			Ok(chunks) => chunks,
			Err(Error::RetrievalUnavailable { message }) => {
				tracing::warn!(%message, "Knowledge index unavailable. Recommending ungrounded.");

				Vec::new()
			},
			Err(err) => return Err(err),
		};
	let messages = generate::recommendation_messages(
		&request.user_preferences.interests,
		request.user_preferences.budget.as_deref(),
		request.current_location.as_deref(),
		request.time_context.as_deref(),
		request.limit,
		&chunks,
	);
	let limit = request.limit;
	let recommendations = generate::generate_with_retry(&cfg, &providers, messages, |value| {
		generate::normalize_recommendations(value, limit)
	})
	.await?;

	encode_json(&RecommendationResponse { recommendations }, "recommendation payload")
}

#[cfg(test)]
mod tests {
	use super::*;

	fn request(limit: u32) -> RecommendationRequest {
		RecommendationRequest {
			user_preferences: UserPreferences {
				interests: vec!["food".to_string()],
				budget: Some("medium".to_string()),
			},
			current_location: Some("Mong Kok".to_string()),
			time_context: Some("evening".to_string()),
			limit,
		}
	}

	#[test]
	fn limits_are_bounded() {
		assert!(validate(&request(5)).is_ok());
		assert!(validate(&request(0)).is_err());
		assert!(validate(&request(21)).is_err());
	}

	#[test]
	fn invalid_enums_are_rejected() {
		let mut bad_budget = request(5);

		bad_budget.user_preferences.budget = Some("lavish".to_string());

		assert!(validate(&bad_budget).is_err());

		let mut bad_time = request(5);

		bad_time.time_context = Some("midnight".to_string());

		assert!(validate(&bad_time).is_err());
	}

	#[test]
	fn retrieval_query_folds_interests_and_location() {
		assert_eq!(retrieval_query(&request(5)), "food near Mong Kok in Hong Kong");

		let bare = RecommendationRequest {
			user_preferences: UserPreferences::default(),
			current_location: None,
			time_context: None,
			limit: 5,
		};

		assert_eq!(retrieval_query(&bare), "things to do in Hong Kong");
	}
}
