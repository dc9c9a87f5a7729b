use std::time::Duration;

use reqwest::Client;
use serde_json::Value;

use crate::{Error, Result};

/// Single chat-completion call against an OpenAI-compatible endpoint.
///
/// Exactly one upstream request per invocation; retry policy lives with the
/// request handlers, not here.
pub async fn complete(
	cfg: &sampan_config::GenerationProviderConfig,
	messages: &[Value],
) -> Result<String> {
	let client = Client::builder().timeout(Duration::from_millis(cfg.timeout_ms)).build()?;
	let url = format!("{}{}", cfg.api_base, cfg.path);
	let body = serde_json::json!({
		"model": cfg.model,
		"temperature": cfg.temperature,
		"messages": messages,
	});
	let res = client
		.post(url)
		.headers(crate::auth_headers(&cfg.api_key, &cfg.default_headers)?)
		.json(&body)
		.send()
		.await?;
	let json: Value = crate::check_status(res).await?.json().await?;

	parse_completion_response(json)
}

fn parse_completion_response(json: Value) -> Result<String> {
	let content = json
		.get("choices")
		.and_then(|v| v.as_array())
		.and_then(|arr| arr.first())
		.and_then(|choice| choice.get("message"))
		.and_then(|msg| msg.get("content"))
		.and_then(|c| c.as_str())
		.ok_or_else(|| Error::InvalidResponse {
			message: "Completion response is missing message content.".to_string(),
		})?;

	Ok(content.to_string())
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn extracts_first_choice_content() {
		let json = serde_json::json!({
			"choices": [
				{ "message": { "content": "Take the Star Ferry at sunset." } }
			]
		});
		let content = parse_completion_response(json).expect("parse failed");

		assert_eq!(content, "Take the Star Ferry at sunset.");
	}

	#[test]
	fn missing_content_is_an_invalid_response() {
		let json = serde_json::json!({ "choices": [] });

		assert!(matches!(
			parse_completion_response(json),
			Err(Error::InvalidResponse { .. })
		));
	}
}
