use std::time::Duration;

use reqwest::Client;
use serde_json::Value;

use crate::{Error, Result};

/// Extracts text from a base64-encoded image via the external extraction
/// service. An image with no recognizable text yields an empty string.
pub async fn extract_text(
	cfg: &sampan_config::ProviderConfig,
	image_base64: &str,
) -> Result<String> {
	let client = Client::builder().timeout(Duration::from_millis(cfg.timeout_ms)).build()?;
	let url = format!("{}{}", cfg.api_base, cfg.path);
	let body = serde_json::json!({
		"model": cfg.model,
		"image": image_base64,
	});
	let res = client
		.post(url)
		.headers(crate::auth_headers(&cfg.api_key, &cfg.default_headers)?)
		.json(&body)
		.send()
		.await?;
	let json: Value = crate::check_status(res).await?.json().await?;

	parse_extraction_response(json)
}

fn parse_extraction_response(json: Value) -> Result<String> {
	let text = json
		.get("text")
		.or_else(|| json.get("extracted_text"))
		.and_then(|v| v.as_str())
		.ok_or_else(|| Error::InvalidResponse {
			message: "Extraction response is missing text.".to_string(),
		})?;

	Ok(text.trim().to_string())
}
