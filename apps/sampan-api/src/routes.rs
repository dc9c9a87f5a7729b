use axum::{
	Json, Router,
	extract::{Path, State},
	http::StatusCode,
	response::{IntoResponse, Response},
	routing::{get, post},
};
use serde::Serialize;
use time::OffsetDateTime;
use uuid::Uuid;

use sampan_service::{
	CacheStatsResponse, ChatRequest, ChatResponse, Error as ServiceError, IngestDocumentRequest,
	IngestDocumentResponse, ItineraryRequest, ItineraryResponse, RecommendationRequest,
	RecommendationResponse, SessionStats, SweepReport, TranslateImageRequest,
	TranslateTextRequest, TranslationResponse, UserContext,
};

use crate::state::AppState;

pub fn router(state: AppState) -> Router {
	Router::new()
		.route("/health", get(health))
		.route("/v1/sessions", post(create_session))
		.route("/v1/sessions/{id}/stats", get(session_stats))
		.route("/v1/chat", post(chat))
		.route("/v1/itinerary", post(itinerary))
		.route("/v1/translate/text", post(translate_text))
		.route("/v1/translate/image", post(translate_image))
		.route("/v1/recommendations", post(recommendations))
		.with_state(state)
}

pub fn admin_router(state: AppState) -> Router {
	Router::new()
		.route("/v1/admin/documents", post(ingest_document))
		.route("/v1/admin/sweep", post(sweep))
		.route("/v1/admin/cache_stats", get(cache_stats))
		.with_state(state)
}

async fn health() -> StatusCode {
	StatusCode::OK
}

#[derive(Debug, serde::Deserialize)]
struct CreateSessionRequest {
	user_context: Option<UserContext>,
}

#[derive(Debug, Serialize)]
struct CreateSessionResponse {
	session_id: Uuid,
	#[serde(with = "sampan_service::time_serde")]
	created_at: OffsetDateTime,
	message: String,
}

async fn create_session(
	State(state): State<AppState>,
	Json(payload): Json<CreateSessionRequest>,
) -> Json<CreateSessionResponse> {
	let (session_id, created_at) =
		state.service.sessions.create(payload.user_context.as_ref());

	Json(CreateSessionResponse {
		session_id,
		created_at,
		message: "Session created successfully.".to_string(),
	})
}

async fn session_stats(
	State(state): State<AppState>,
	Path(id): Path<Uuid>,
) -> Result<Json<SessionStats>, ApiError> {
	state.service.sessions.stats(id).map(Json).ok_or_else(|| {
		json_error(
			StatusCode::NOT_FOUND,
			"session_not_found",
			"Session not found or expired.",
			None,
		)
	})
}

async fn chat(
	State(state): State<AppState>,
	Json(payload): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
	let response = state.service.chat(payload).await?;

	Ok(Json(response))
}

async fn itinerary(
	State(state): State<AppState>,
	Json(payload): Json<ItineraryRequest>,
) -> Result<Json<ItineraryResponse>, ApiError> {
	let response = state.service.itinerary(payload).await?;

	Ok(Json(response))
}

async fn translate_text(
	State(state): State<AppState>,
	Json(payload): Json<TranslateTextRequest>,
) -> Result<Json<TranslationResponse>, ApiError> {
	let response = state.service.translate_text(payload).await?;

	Ok(Json(response))
}

async fn translate_image(
	State(state): State<AppState>,
	Json(payload): Json<TranslateImageRequest>,
) -> Result<Json<TranslationResponse>, ApiError> {
	let response = state.service.translate_image(payload).await?;

	Ok(Json(response))
}

async fn recommendations(
	State(state): State<AppState>,
	Json(payload): Json<RecommendationRequest>,
) -> Result<Json<RecommendationResponse>, ApiError> {
	let response = state.service.recommendations(payload).await?;

	Ok(Json(response))
}

async fn ingest_document(
	State(state): State<AppState>,
	Json(payload): Json<IngestDocumentRequest>,
) -> Result<Json<IngestDocumentResponse>, ApiError> {
	let response = state.service.ingest_document(payload).await?;

	Ok(Json(response))
}

async fn sweep(State(state): State<AppState>) -> Json<SweepReport> {
	Json(state.service.sweep(OffsetDateTime::now_utc()))
}

async fn cache_stats(State(state): State<AppState>) -> Json<CacheStatsResponse> {
	Json(state.service.cache_stats())
}

#[derive(Debug, Serialize)]
struct ErrorBody {
	error_code: String,
	message: String,
	fields: Option<Vec<String>>,
}

#[derive(Debug)]
pub struct ApiError {
	status: StatusCode,
	error_code: String,
	message: String,
	fields: Option<Vec<String>>,
}

pub fn json_error(
	status: StatusCode,
	code: &str,
	message: impl Into<String>,
	fields: Option<Vec<String>>,
) -> ApiError {
	ApiError { status, error_code: code.to_string(), message: message.into(), fields }
}

impl From<ServiceError> for ApiError {
	fn from(err: ServiceError) -> Self {
		let status = match &err {
			ServiceError::InvalidRequest { .. } => StatusCode::UNPROCESSABLE_ENTITY,
			ServiceError::RetrievalUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
			ServiceError::ProviderTimeout { .. } => StatusCode::GATEWAY_TIMEOUT,
			ServiceError::QuotaExceeded { .. } => StatusCode::TOO_MANY_REQUESTS,
			ServiceError::MalformedGeneration { .. } | ServiceError::Provider { .. } =>
				StatusCode::BAD_GATEWAY,
			ServiceError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
		};

		json_error(status, err.error_code(), err.to_string(), None)
	}
}

impl IntoResponse for ApiError {
	fn into_response(self) -> Response {
		let body = ErrorBody {
			error_code: self.error_code,
			message: self.message,
			fields: self.fields,
		};

		(self.status, Json(body)).into_response()
	}
}
