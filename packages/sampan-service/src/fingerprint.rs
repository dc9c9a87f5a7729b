use serde_json::Value;
use unicode_normalization::UnicodeNormalization;

use crate::{
	Error, Result,
	session::{Message, UserContext},
};

const FINGERPRINT_SCHEMA_VERSION: i32 = 1;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RequestKind {
	Chat,
	Itinerary,
	Translation,
	Recommendation,
}
impl RequestKind {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Chat => "chat",
			Self::Itinerary => "itinerary",
			Self::Translation => "translation",
			Self::Recommendation => "recommendation",
		}
	}
}

/// NFKC-fold, lowercase and collapse whitespace so trivially different
/// spellings of the same question share a cache entry.
pub fn normalize_query(raw: &str) -> String {
	let folded: String = raw.nfkc().collect::<String>().to_lowercase();

	folded.split_whitespace().collect::<Vec<_>>().join(" ")
}

pub fn hash_payload(payload: &Value) -> Result<String> {
	let raw = serde_json::to_vec(payload).map_err(|err| Error::Internal {
		message: format!("Failed to encode fingerprint payload: {err}."),
	})?;

	Ok(blake3::hash(&raw).to_hex().to_string())
}

/// Chat keys cover the normalized question, the preserved context slice and
/// the preference snapshot. Session ids never enter a fingerprint, so the
/// same question from two sessions with the same visible context shares one
/// upstream call.
pub fn chat_fingerprint(
	query: &str,
	context: &[Message],
	user_context: Option<&UserContext>,
) -> Result<String> {
	let context: Vec<Value> = context
		.iter()
		.map(|message| {
			serde_json::json!({
				"role": message.role.as_str(),
				"content": message.content,
			})
		})
		.collect();
	let payload = serde_json::json!({
		"kind": RequestKind::Chat.as_str(),
		"schema_version": FINGERPRINT_SCHEMA_VERSION,
		"query": normalize_query(query),
		"context": context,
		"location": normalized_option(user_context.and_then(|ctx| ctx.location.as_deref())),
		"interests": user_context
			.map(|ctx| sorted_normalized(&ctx.interests))
			.unwrap_or_default(),
		"budget": normalized_option(user_context.and_then(|ctx| ctx.budget_range.as_deref())),
	});

	hash_payload(&payload)
}

pub fn itinerary_fingerprint(
	duration: u32,
	interests: &[String],
	budget: &str,
	pace: &str,
	group_size: u32,
	accommodation: Option<&str>,
	special_requirements: &[String],
) -> Result<String> {
	let payload = serde_json::json!({
		"kind": RequestKind::Itinerary.as_str(),
		"schema_version": FINGERPRINT_SCHEMA_VERSION,
		"duration": duration,
		"interests": sorted_normalized(interests),
		"budget": budget,
		"pace": pace,
		"group_size": group_size,
		"accommodation": normalized_option(accommodation),
		"special_requirements": sorted_normalized(special_requirements),
	});

	hash_payload(&payload)
}

pub fn translation_fingerprint(
	text: &str,
	source_language: &str,
	target_language: &str,
	context_type: Option<&str>,
) -> Result<String> {
	let payload = serde_json::json!({
		"kind": RequestKind::Translation.as_str(),
		"schema_version": FINGERPRINT_SCHEMA_VERSION,
		"text": normalize_query(text),
		"source_language": source_language.trim().to_lowercase(),
		"target_language": target_language.trim().to_lowercase(),
		"context_type": normalized_option(context_type),
	});

	hash_payload(&payload)
}

pub fn recommendation_fingerprint(
	interests: &[String],
	budget: Option<&str>,
	location: Option<&str>,
	time_context: Option<&str>,
	limit: u32,
) -> Result<String> {
	let payload = serde_json::json!({
		"kind": RequestKind::Recommendation.as_str(),
		"schema_version": FINGERPRINT_SCHEMA_VERSION,
		"interests": sorted_normalized(interests),
		"budget": normalized_option(budget),
		"location": normalized_option(location),
		"time_context": normalized_option(time_context),
		"limit": limit,
	});

	hash_payload(&payload)
}

fn sorted_normalized(values: &[String]) -> Vec<String> {
	let mut out: Vec<String> = values
		.iter()
		.map(|value| normalize_query(value))
		.filter(|value| !value.is_empty())
		.collect();

	out.sort();
	out.dedup();

	out
}

fn normalized_option(value: Option<&str>) -> Value {
	match value.map(normalize_query).filter(|value| !value.is_empty()) {
		Some(value) => Value::String(value),
		None => Value::Null,
	}
}
