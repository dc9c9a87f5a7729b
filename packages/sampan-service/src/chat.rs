use std::sync::Arc;

use sampan_config::Config;
use sampan_domain::text;
use sampan_index::models::KnowledgeChunk;
use serde_json::Value;
use time::Duration;
use uuid::Uuid;

use crate::{
	Error, Providers, Result, TourService, decode_json, encode_json, fingerprint, generate,
	retrieve,
	session::{Message, Role, UserContext},
};

/// Longest snippet carried into a source citation.
const SOURCE_PREVIEW_GRAPHEMES: usize = 200;

#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct ChatRequest {
	pub message: String,
	pub conversation_id: Option<String>,
	#[serde(default)]
	pub conversation_history: Vec<Message>,
	pub user_context: Option<UserContext>,
}

#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct Source {
	pub title: String,
	pub content: String,
	pub url: Option<String>,
	pub relevance_score: f32,
}

#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct ChatResponse {
	pub message: String,
	pub sources: Vec<Source>,
	pub conversation_id: String,
}

/// The cacheable part of a chat answer. The conversation id is attached per
/// caller and must never enter the cache.
#[derive(serde::Serialize, serde::Deserialize)]
struct ChatPayload {
	message: String,
	sources: Vec<Source>,
}

impl TourService {
	pub async fn chat(&self, request: ChatRequest) -> Result<ChatResponse> {
		if request.message.trim().is_empty() {
			return Err(Error::InvalidRequest {
				message: "message must be non-empty.".to_string(),
			});
		}

		let supplied_id = request
			.conversation_id
			.as_deref()
			.and_then(|raw| Uuid::parse_str(raw.trim()).ok());
		let session_id = self.sessions.ensure(supplied_id, request.user_context.as_ref());
		let history = if request.conversation_history.is_empty() {
			self.sessions.history(session_id)
		} else {
			request.conversation_history.clone()
		};
		let context_slice = self.sessions.bounded_slice(&history);

		self.sessions.record_turn(session_id, Role::User, &request.message);

		let user_context =
			request.user_context.clone().or_else(|| self.sessions.user_context(session_id));
		let key = fingerprint::chat_fingerprint(
			&request.message,
			&context_slice,
			user_context.as_ref(),
		)?;
		let ttl = Duration::seconds(self.cfg.cache.chat_ttl_secs);
		let cfg = self.cfg.clone();
		let providers = self.providers.clone();
		let query = enhance_query(&request.message, user_context.as_ref());
		let value = self
			.cache
			.get_or_compute(&key, ttl, move || {
				compute_chat(cfg, providers, query, context_slice)
			})
			.await?;
		let payload: ChatPayload = decode_json(value, "chat payload")?;

		self.sessions.record_turn(session_id, Role::Assistant, &payload.message);

		Ok(ChatResponse {
			message: payload.message,
			sources: payload.sources,
			conversation_id: session_id.to_string(),
		})
	}
}

async fn compute_chat(
	cfg: Arc<Config>,
	providers: Providers,
	query: String,
	context: Vec<Message>,
) -> Result<Value> {
	let chunks =
		match retrieve::retrieve_chunks(&cfg, &providers, &query, cfg.retrieval.top_k).await {
			Ok(chunks) => chunks,
			Err(Error::RetrievalUnavailable { message }) => {
				tracing::warn!(%message, "Knowledge index unavailable. Answering ungrounded.");

				Vec::new()
			},
			Err(err) => return Err(err),
		};
	let messages = generate::chat_messages(&query, &context, &chunks);
	let message =
		generate::generate_with_retry(&cfg, &providers, messages, generate::normalize_chat)
			.await?;
	let sources = chunks.iter().map(source_from_chunk).collect();

	encode_json(&ChatPayload { message, sources }, "chat payload")
}

/// Folds the preference snapshot into the retrieval/generation query, the
/// way a human would restate their situation.
fn enhance_query(message: &str, user_context: Option<&UserContext>) -> String {
	let Some(context) = user_context else {
		return message.to_string();
	};
	let mut notes = Vec::new();

	if let Some(location) = context.location.as_deref().filter(|value| !value.trim().is_empty()) {
		notes.push(format!("Current location: {location}"));
	}
	if !context.interests.is_empty() {
		notes.push(format!("Interests: {}", context.interests.join(", ")));
	}
	if let Some(budget) = context.budget_range.as_deref().filter(|value| !value.trim().is_empty())
	{
		notes.push(format!("Budget: {budget}"));
	}

	if notes.is_empty() {
		message.to_string()
	} else {
		format!("{message}\n\nUser context: {}", notes.join("; "))
	}
}

fn source_from_chunk(chunk: &KnowledgeChunk) -> Source {
	Source {
		title: chunk.title.clone(),
		content: text::truncate_graphemes(&chunk.text, SOURCE_PREVIEW_GRAPHEMES),
		url: chunk.url.clone(),
		relevance_score: chunk.relevance_score,
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn enhance_query_appends_known_context() {
		let context = UserContext {
			location: Some("Mong Kok".to_string()),
			language_preference: None,
			interests: vec!["food".to_string(), "markets".to_string()],
			budget_range: Some("low".to_string()),
		};
		let enhanced = enhance_query("Where should I eat?", Some(&context));

		assert_eq!(
			enhanced,
			"Where should I eat?\n\nUser context: Current location: Mong Kok; Interests: food, \
			 markets; Budget: low"
		);
	}

	#[test]
	fn enhance_query_is_identity_without_context() {
		assert_eq!(enhance_query("Where should I eat?", None), "Where should I eat?");
		assert_eq!(
			enhance_query("Where should I eat?", Some(&UserContext::default())),
			"Where should I eat?"
		);
	}
}
