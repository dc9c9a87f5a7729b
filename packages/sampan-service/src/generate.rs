use sampan_config::Config;
use sampan_domain::{planner::DayPlan, text};
use sampan_index::models::KnowledgeChunk;
use serde_json::Value;

use crate::{Error, Providers, Result, recommend::Recommendation, session::Message};

const SYSTEM_PROMPT: &str = "You are a helpful and knowledgeable Hong Kong tourism assistant. \
	Use the provided knowledge base context to answer questions about Hong Kong attractions, \
	culture, food, transportation, and travel tips. If you do not have enough information, say \
	so honestly.";

pub(crate) const STRICT_JSON_REMINDER: &str = "Return ONLY the JSON object described above. No \
	surrounding prose, no markdown, no code fences.";

/// One generation attempt, plus at most one retry: timeouts retry with the
/// same prompt, malformed output retries with a strict reminder appended.
/// Quota signals are surfaced untouched so a second call never makes the
/// situation worse.
pub(crate) async fn generate_with_retry<T>(
	cfg: &Config,
	providers: &Providers,
	messages: Vec<Value>,
	normalize: impl Fn(&Value) -> Result<T>,
) -> Result<T> {
	match attempt(cfg, providers, &messages, &normalize).await {
		Ok(value) => Ok(value),
		Err(Error::ProviderTimeout { message }) => {
			tracing::warn!(%message, "Generation timed out. Retrying once.");

			attempt(cfg, providers, &messages, &normalize).await
		},
		Err(Error::MalformedGeneration { message }) => {
			tracing::warn!(
				%message,
				"Generation output failed validation. Retrying once with a stricter prompt."
			);

			let mut messages = messages;

			messages.push(prompt_message("user", STRICT_JSON_REMINDER.to_string()));

			attempt(cfg, providers, &messages, &normalize).await
		},
		Err(err) => Err(err),
	}
}

async fn attempt<T>(
	cfg: &Config,
	providers: &Providers,
	messages: &[Value],
	normalize: &impl Fn(&Value) -> Result<T>,
) -> Result<T> {
	let raw = providers
		.generation
		.complete(&cfg.providers.generation, messages)
		.await
		.map_err(|err| Error::from_provider(err, "Generation"))?;
	let value = parse_json_object(&raw)?;

	normalize(&value)
}

/// The provider answers free-form; anything that is not a JSON object (after
/// shedding stray fences or prose around it) fails the contract.
pub(crate) fn parse_json_object(raw: &str) -> Result<Value> {
	let trimmed = raw.trim();

	if let Ok(value) = serde_json::from_str::<Value>(trimmed)
		&& value.is_object()
	{
		return Ok(value);
	}

	let start = trimmed.find('{');
	let end = trimmed.rfind('}');

	if let (Some(start), Some(end)) = (start, end)
		&& start < end
		&& let Ok(value) = serde_json::from_str::<Value>(&trimmed[start..=end])
		&& value.is_object()
	{
		return Ok(value);
	}

	Err(Error::MalformedGeneration {
		message: "Completion is not a JSON object.".to_string(),
	})
}

pub(crate) fn prompt_message(role: &str, content: String) -> Value {
	serde_json::json!({ "role": role, "content": content })
}

pub(crate) fn chat_messages(
	query: &str,
	context: &[Message],
	chunks: &[KnowledgeChunk],
) -> Vec<Value> {
	let mut system = String::from(SYSTEM_PROMPT);

	if chunks.is_empty() {
		system.push_str(
			"\n\nNo knowledge base context is available for this question; answer from general \
			 knowledge and say when you are unsure.",
		);
	} else {
		system.push_str("\n\nContext from the Hong Kong tourism knowledge base:\n");

		for chunk in chunks {
			system.push_str(&format!("- {}: {}\n", chunk.title, chunk.text));
		}
	}

	system.push_str(
		"\n\nRespond with a single JSON object of the form {\"message\": \"<your answer>\"}.",
	);

	let mut messages = vec![prompt_message("system", system)];

	for message in context {
		messages.push(prompt_message(message.role.as_str(), message.content.clone()));
	}

	messages.push(prompt_message("user", query.to_string()));

	messages
}

pub(crate) struct ItineraryPromptArgs<'a> {
	pub duration: u32,
	pub interests: &'a [String],
	pub budget_guidance: &'a str,
	pub pace_guidance: &'a str,
	pub group_size: u32,
	pub accommodation: Option<&'a str>,
	pub special_requirements: &'a [String],
	pub days: &'a [DayPlan],
}

pub(crate) fn itinerary_messages(args: &ItineraryPromptArgs<'_>) -> Vec<Value> {
	let interests = if args.interests.is_empty() {
		"general sightseeing".to_string()
	} else {
		args.interests.join(", ")
	};
	let accommodation = args.accommodation.unwrap_or("Central Hong Kong area");
	let requirements = if args.special_requirements.is_empty() {
		String::new()
	} else {
		format!("\n- Special requirements: {}", args.special_requirements.join(", "))
	};
	let skeleton =
		serde_json::to_string(args.days).unwrap_or_else(|_| "[]".to_string());
	let content = format!(
		"You are an expert Hong Kong travel planner. A deterministic scheduler has already \
		 assigned activities to days for this {duration}-day trip; do not change the schedule.\n\
		 \nTraveler profile:\n- Group size: {group_size}\n- Interests: {interests}\n- Budget: \
		 {budget}\n- Travel style: {pace}\n- Starting point: {accommodation}{requirements}\n\
		 \nPlanned days (JSON):\n{skeleton}\n\nRespond with a single JSON object of the form \
		 {{\"tips\": [\"...\"], \"summary\": \"...\"}} containing three to five practical, \
		 day-aware travel tips (transport cards, etiquette, weather backups) and a one-paragraph \
		 summary of the trip.",
		duration = args.duration,
		group_size = args.group_size,
		interests = interests,
		budget = args.budget_guidance,
		pace = args.pace_guidance,
		accommodation = accommodation,
		requirements = requirements,
		skeleton = skeleton,
	);

	vec![prompt_message("user", content)]
}

pub(crate) fn translation_messages(
	text: &str,
	source_language: &str,
	target_language: &str,
	context_type: Option<&str>,
) -> Vec<Value> {
	let context_note = match context_type {
		Some("menu") => "\nThe text comes from a restaurant menu; keep dish names recognizable.",
		Some("sign") => "\nThe text comes from signage; keep the translation short and literal.",
		Some("conversation") => "\nThe text is conversational; keep the register natural.",
		_ => "",
	};
	let content = format!(
		"Translate the following text from {source_language} to {target_language}. Provide a \
		 natural, culturally appropriate translation, and explain local expressions, Hong Kong \
		 specific terms, or food names when relevant.{context_note}\n\nText to translate:\n\
		 {text}\n\nRespond with a single JSON object of the form {{\"translated_text\": \"...\", \
		 \"cultural_context\": \"...\", \"confidence\": 0.0}} where confidence is your 0.0-1.0 \
		 estimate and cultural_context may be an empty string.",
	);

	vec![prompt_message("user", content)]
}

pub(crate) fn recommendation_messages(
	interests: &[String],
	budget: Option<&str>,
	location: Option<&str>,
	time_context: Option<&str>,
	limit: u32,
	chunks: &[KnowledgeChunk],
) -> Vec<Value> {
	let interests = if interests.is_empty() {
		"general sightseeing".to_string()
	} else {
		interests.join(", ")
	};
	let mut content = format!(
		"You are a local Hong Kong expert providing personalized recommendations.\n\nUser \
		 profile:\n- Interests: {interests}\n- Budget preference: {}\n- Location: {}\n",
		budget.unwrap_or("medium"),
		location.unwrap_or("Hong Kong"),
	);

	if let Some(time_context) = time_context {
		content.push_str(&format!("- Time of day: {time_context}\n"));
	}
	if !chunks.is_empty() {
		content.push_str("\nKnowledge base context:\n");

		for chunk in chunks {
			content.push_str(&format!("- {}: {}\n", chunk.title, chunk.text));
		}
	}

	content.push_str(&format!(
		"\nRespond with a single JSON object of the form {{\"recommendations\": [{{\"name\": \
		 \"...\", \"description\": \"...\", \"category\": \"...\", \"location\": \"...\", \
		 \"rating\": 4.5, \"estimated_time\": \"...\", \"cost_range\": \"...\", \"reasons\": \
		 [\"...\"]}}]}} with exactly {limit} entries, best match first.",
	));

	vec![prompt_message("user", content)]
}

pub(crate) fn normalize_chat(value: &Value) -> Result<String> {
	let message = value
		.get("message")
		.and_then(|v| v.as_str())
		.map(str::trim)
		.filter(|v| !v.is_empty())
		.ok_or_else(|| Error::MalformedGeneration {
			message: "Chat completion is missing a message field.".to_string(),
		})?;

	Ok(text::humanize(message))
}

pub(crate) fn normalize_tips(value: &Value) -> Result<(Vec<String>, Option<String>)> {
	let tips = value
		.get("tips")
		.and_then(|v| v.as_array())
		.ok_or_else(|| Error::MalformedGeneration {
			message: "Itinerary completion is missing a tips array.".to_string(),
		})?
		.iter()
		.filter_map(|tip| tip.as_str())
		.map(text::humanize)
		.filter(|tip| !tip.is_empty())
		.collect::<Vec<_>>();

	if tips.is_empty() {
		return Err(Error::MalformedGeneration {
			message: "Itinerary completion produced no usable tips.".to_string(),
		});
	}

	let summary = value
		.get("summary")
		.and_then(|v| v.as_str())
		.map(text::humanize)
		.filter(|summary| !summary.is_empty());

	Ok((tips, summary))
}

pub(crate) struct TranslationFields {
	pub translated_text: String,
	pub cultural_context: Option<String>,
	pub confidence: f32,
}

pub(crate) fn normalize_translation(value: &Value) -> Result<TranslationFields> {
	let translated_text = value
		.get("translated_text")
		.and_then(|v| v.as_str())
		.map(str::trim)
		.filter(|v| !v.is_empty())
		.ok_or_else(|| Error::MalformedGeneration {
			message: "Translation completion is missing translated_text.".to_string(),
		})?
		.to_string();
	let cultural_context = value
		.get("cultural_context")
		.and_then(|v| v.as_str())
		.map(text::humanize)
		.filter(|context| !context.is_empty());
	let confidence = value
		.get("confidence")
		.and_then(|v| v.as_f64())
		.ok_or_else(|| Error::MalformedGeneration {
			message: "Translation completion is missing a numeric confidence.".to_string(),
		})?;

	Ok(TranslationFields {
		translated_text,
		cultural_context,
		confidence: (confidence as f32).clamp(0.0, 1.0),
	})
}

pub(crate) fn normalize_recommendations(value: &Value, limit: u32) -> Result<Vec<Recommendation>> {
	let entries = value
		.get("recommendations")
		.and_then(|v| v.as_array())
		.ok_or_else(|| Error::MalformedGeneration {
			message: "Completion is missing a recommendations array.".to_string(),
		})?;
	let mut out = Vec::with_capacity(entries.len().min(limit as usize));

	for entry in entries.iter().take(limit as usize) {
		let name = required_str(entry, "name")?;
		let description = text::clean_markdown(&required_str(entry, "description")?);
		let category = required_str(entry, "category")?;
		let location = required_str(entry, "location")?;
		let reasons = entry
			.get("reasons")
			.and_then(|v| v.as_array())
			.map(|values| {
				values
					.iter()
					.filter_map(|value| value.as_str())
					.map(text::clean_markdown)
					.collect()
			})
			.unwrap_or_default();

		out.push(Recommendation {
			name,
			description,
			category,
			location,
			rating: entry.get("rating").and_then(|v| v.as_f64()).map(|v| v as f32),
			estimated_time: optional_str(entry, "estimated_time"),
			cost_range: optional_str(entry, "cost_range"),
			reasons,
		});
	}

	if out.is_empty() {
		return Err(Error::MalformedGeneration {
			message: "Completion produced no usable recommendations.".to_string(),
		});
	}

	Ok(out)
}

fn required_str(entry: &Value, field: &str) -> Result<String> {
	entry
		.get(field)
		.and_then(|v| v.as_str())
		.map(str::trim)
		.filter(|v| !v.is_empty())
		.map(|v| v.to_string())
		.ok_or_else(|| Error::MalformedGeneration {
			message: format!("Recommendation entry is missing {field}."),
		})
}

fn optional_str(entry: &Value, field: &str) -> Option<String> {
	entry
		.get(field)
		.and_then(|v| v.as_str())
		.map(str::trim)
		.filter(|v| !v.is_empty())
		.map(|v| v.to_string())
}
