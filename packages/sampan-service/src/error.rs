pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Invalid request: {message}")]
	InvalidRequest { message: String },
	#[error("The knowledge index is unreachable right now: {message}")]
	RetrievalUnavailable { message: String },
	#[error("The generation service did not answer in time: {message}")]
	ProviderTimeout { message: String },
	#[error("The generation service is over its usage quota: {message}")]
	QuotaExceeded { message: String },
	#[error("The generated answer could not be validated: {message}")]
	MalformedGeneration { message: String },
	#[error("Upstream provider failure: {message}")]
	Provider { message: String },
	#[error("Internal error: {message}")]
	Internal { message: String },
}
impl Error {
	pub fn error_code(&self) -> &'static str {
		match self {
			Self::InvalidRequest { .. } => "invalid_request",
			Self::RetrievalUnavailable { .. } => "retrieval_unavailable",
			Self::ProviderTimeout { .. } => "provider_timeout",
			Self::QuotaExceeded { .. } => "quota_exceeded",
			Self::MalformedGeneration { .. } => "malformed_generation",
			Self::Provider { .. } => "provider_error",
			Self::Internal { .. } => "internal",
		}
	}

	/// Transient failures a handler may retry once. Quota and validation
	/// failures are deliberately excluded: retrying them burns budget.
	pub fn is_retryable(&self) -> bool {
		matches!(self, Self::ProviderTimeout { .. } | Self::MalformedGeneration { .. })
	}

	pub(crate) fn from_provider(err: sampan_providers::Error, what: &str) -> Self {
		match err {
			sampan_providers::Error::Timeout => Self::ProviderTimeout {
				message: format!("{what} call exceeded its deadline."),
			},
			sampan_providers::Error::RateLimited { message } => Self::QuotaExceeded {
				message: if message.trim().is_empty() {
					format!("{what} provider reported a rate limit.")
				} else {
					message
				},
			},
			sampan_providers::Error::InvalidResponse { message } =>
				Self::MalformedGeneration { message },
			other => Self::Provider { message: format!("{what}: {other}") },
		}
	}
}
