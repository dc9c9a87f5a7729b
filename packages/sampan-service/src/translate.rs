use std::sync::Arc;

use sampan_config::Config;
use serde_json::Value;
use time::Duration;

use crate::{
	Error, Providers, Result, TourService, decode_json, encode_json, fingerprint, generate,
};

const CONTEXT_TYPES: [&str; 3] = ["menu", "sign", "conversation"];

/// whatlang verdicts below this confidence fall back to the provider's own
/// language detection.
const DETECTION_MIN_CONFIDENCE: f64 = 0.5;

#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct TranslateTextRequest {
	pub text: String,
	#[serde(default = "default_source_language")]
	pub source_language: String,
	#[serde(default = "default_target_language")]
	pub target_language: String,
	pub context_type: Option<String>,
}

#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct TranslateImageRequest {
	pub image_base64: String,
	#[serde(default = "default_target_language")]
	pub target_language: String,
	pub context_type: Option<String>,
}

#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct TranslationResponse {
	pub translated_text: String,
	pub original_text: Option<String>,
	pub cultural_context: Option<String>,
	pub confidence: f32,
}

fn default_source_language() -> String {
	"auto".to_string()
}

fn default_target_language() -> String {
	"en".to_string()
}

impl TourService {
	pub async fn translate_text(
		&self,
		request: TranslateTextRequest,
	) -> Result<TranslationResponse> {
		if request.text.trim().is_empty() {
			return Err(Error::InvalidRequest { message: "text must be non-empty.".to_string() });
		}

		validate_context_type(request.context_type.as_deref())?;

		let source_language = resolve_source_language(&request.source_language, &request.text);
		let key = fingerprint::translation_fingerprint(
			&request.text,
			&source_language,
			&request.target_language,
			request.context_type.as_deref(),
		)?;
		let ttl = Duration::seconds(self.cfg.cache.translation_ttl_secs);
		let cfg = self.cfg.clone();
		let providers = self.providers.clone();
		let value = self
			.cache
			.get_or_compute(&key, ttl, move || {
				compute_translation(cfg, providers, TranslationJob {
					text: request.text,
					source_language,
					target_language: request.target_language,
					context_type: request.context_type,
					original_text: None,
				})
			})
			.await?;

		decode_json(value, "translation payload")
	}

	/// Image translation runs the out-of-scope OCR collaborator first, then
	/// the regular text path with `original_text` carrying the extraction.
	pub async fn translate_image(
		&self,
		request: TranslateImageRequest,
	) -> Result<TranslationResponse> {
		if request.image_base64.trim().is_empty() {
			return Err(Error::InvalidRequest {
				message: "image payload must be non-empty.".to_string(),
			});
		}

		validate_context_type(request.context_type.as_deref())?;

		let image_digest = blake3::hash(request.image_base64.as_bytes()).to_hex().to_string();
		let key = fingerprint::translation_fingerprint(
			&image_digest,
			"image",
			&request.target_language,
			request.context_type.as_deref(),
		)?;
		let ttl = Duration::seconds(self.cfg.cache.translation_ttl_secs);
		let cfg = self.cfg.clone();
		let providers = self.providers.clone();
		let value = self
			.cache
			.get_or_compute(&key, ttl, move || {
				compute_image_translation(cfg, providers, request)
			})
			.await?;

		decode_json(value, "translation payload")
	}
}

fn validate_context_type(context_type: Option<&str>) -> Result<()> {
	match context_type {
		Some(value) if !CONTEXT_TYPES.contains(&value) => Err(Error::InvalidRequest {
			message: "context_type must be one of menu, sign, or conversation.".to_string(),
		}),
		_ => Ok(()),
	}
}

/// Resolves "auto" with local language detection when the detector is
/// confident; otherwise the literal "auto" reaches the provider, which does
/// its own detection.
fn resolve_source_language(requested: &str, text: &str) -> String {
	let requested = requested.trim().to_lowercase();

	if requested != "auto" && !requested.is_empty() {
		return requested;
	}

	match whatlang::detect(text) {
		Some(info) if info.is_reliable() && info.confidence() >= DETECTION_MIN_CONFIDENCE =>
			info.lang().code().to_string(),
		_ => "auto".to_string(),
	}
}

/// Everything one translation needs, bundled so the compute path stays a
/// single spawned future.
struct TranslationJob {
	text: String,
	source_language: String,
	target_language: String,
	context_type: Option<String>,
	original_text: Option<String>,
}

async fn compute_translation(
	cfg: Arc<Config>,
	providers: Providers,
	job: TranslationJob,
) -> Result<Value> {
	let messages = generate::translation_messages(
		&job.text,
		&job.source_language,
		&job.target_language,
		job.context_type.as_deref(),
	);
	let fields =
		generate::generate_with_retry(&cfg, &providers, messages, generate::normalize_translation)
			.await?;

	encode_json(
		&TranslationResponse {
			translated_text: fields.translated_text,
			original_text: job.original_text,
			cultural_context: fields.cultural_context,
			confidence: fields.confidence,
		},
		"translation payload",
	)
}

async fn compute_image_translation(
	cfg: Arc<Config>,
	providers: Providers,
	request: TranslateImageRequest,
) -> Result<Value> {
	let extracted = providers
		.ocr
		.extract_text(&cfg.providers.ocr, &request.image_base64)
		.await
		.map_err(|err| Error::from_provider(err, "Text extraction"))?;

	if extracted.is_empty() {
		return encode_json(
			&TranslationResponse {
				translated_text: "No text detected in the image.".to_string(),
				original_text: Some(String::new()),
				cultural_context: None,
				confidence: 0.0,
			},
			"translation payload",
		);
	}

	let source_language = resolve_source_language("auto", &extracted);

	compute_translation(cfg, providers, TranslationJob {
		text: extracted.clone(),
		source_language,
		target_language: request.target_language,
		context_type: request.context_type,
		original_text: Some(extracted),
	})
	.await
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn explicit_source_languages_pass_through() {
		assert_eq!(resolve_source_language("ZH", "whatever"), "zh");
	}

	#[test]
	fn auto_resolves_confident_detections() {
		let english = "Where can I find the best roast goose restaurant in Hong Kong today?";

		assert_eq!(resolve_source_language("auto", english), "eng");
	}

	#[test]
	fn auto_survives_undetectable_text() {
		assert_eq!(resolve_source_language("auto", "1234 5678"), "auto");
	}

	#[test]
	fn context_type_is_validated() {
		assert!(validate_context_type(Some("menu")).is_ok());
		assert!(validate_context_type(None).is_ok());
		assert!(validate_context_type(Some("poem")).is_err());
	}
}
