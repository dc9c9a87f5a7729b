pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Provider call exceeded its deadline.")]
	Timeout,
	#[error("Provider rate limit reached: {message}")]
	RateLimited { message: String },
	#[error("Provider returned HTTP {status}: {message}")]
	Http { status: u16, message: String },
	#[error(transparent)]
	SerdeJson(#[from] serde_json::Error),
	#[error(transparent)]
	InvalidHeaderName(#[from] reqwest::header::InvalidHeaderName),
	#[error(transparent)]
	InvalidHeaderValue(#[from] reqwest::header::InvalidHeaderValue),
	#[error("{message}")]
	InvalidConfig { message: String },
	#[error("{message}")]
	InvalidResponse { message: String },
	#[error("Transport error: {0}")]
	Transport(String),
}
impl From<reqwest::Error> for Error {
	fn from(err: reqwest::Error) -> Self {
		if err.is_timeout() { Self::Timeout } else { Self::Transport(err.to_string()) }
	}
}
