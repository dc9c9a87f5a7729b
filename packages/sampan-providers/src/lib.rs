pub mod embedding;
pub mod generation;
pub mod ocr;

mod error;

pub use error::{Error, Result};

use reqwest::{
	Response, StatusCode,
	header::{AUTHORIZATION, HeaderMap, HeaderName},
};
use serde_json::{Map, Value};

pub fn auth_headers(api_key: &str, default_headers: &Map<String, Value>) -> Result<HeaderMap> {
	let mut headers = HeaderMap::new();

	headers.insert(AUTHORIZATION, format!("Bearer {api_key}").parse()?);

	for (key, value) in default_headers {
		let Some(raw) = value.as_str() else {
			return Err(Error::InvalidConfig {
				message: "Default header values must be strings.".to_string(),
			});
		};

		headers.insert(HeaderName::from_bytes(key.as_bytes())?, raw.parse()?);
	}

	Ok(headers)
}

/// Turns a non-success response into the typed error the engine keys its
/// retry policy on: 429 is a quota signal, everything else a plain HTTP error.
pub(crate) async fn check_status(res: Response) -> Result<Response> {
	let status = res.status();

	if status == StatusCode::TOO_MANY_REQUESTS {
		let message = res.text().await.unwrap_or_default();

		return Err(Error::RateLimited { message });
	}
	if !status.is_success() {
		let message = res.text().await.unwrap_or_default();

		return Err(Error::Http { status: status.as_u16(), message });
	}

	Ok(res)
}
