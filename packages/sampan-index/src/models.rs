use qdrant_client::qdrant::{ScoredPoint, Value, point_id::PointIdOptions, value::Kind};
use serde_json::{Map, Number, Value as JsonValue};
use uuid::Uuid;

use sampan_domain::planner::ActivityCandidate;

/// A raw nearest-neighbor hit: score plus the stored payload, decoded to
/// plain JSON so callers never touch Qdrant's value types.
#[derive(Clone, Debug)]
pub struct KnowledgeHit {
	pub id: String,
	pub score: f32,
	pub payload: Map<String, JsonValue>,
}
impl KnowledgeHit {
	pub fn from_scored_point(point: ScoredPoint) -> Self {
		let id = match point.id.and_then(|id| id.point_id_options) {
			Some(PointIdOptions::Uuid(value)) => value,
			Some(PointIdOptions::Num(value)) => value.to_string(),
			None => String::new(),
		};
		let payload = point
			.payload
			.into_iter()
			.map(|(key, value)| (key, qdrant_value_to_json(value)))
			.collect();

		Self { id, score: point.score, payload }
	}
}

/// A grounding fragment handed to the generation step.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct KnowledgeChunk {
	pub id: String,
	pub title: String,
	pub text: String,
	pub url: Option<String>,
	pub category: Option<String>,
	pub relevance_score: f32,
}

/// A document to upsert. The payload carries whatever the knowledge base
/// stores for the entry (title/text for facts, activity metadata for
/// plannable attractions).
#[derive(Clone, Debug)]
pub struct IndexDocument {
	pub id: Uuid,
	pub payload: Map<String, JsonValue>,
}

pub fn decode_chunk(hit: &KnowledgeHit) -> Option<KnowledgeChunk> {
	let text = payload_str(&hit.payload, "text")?;
	let title = payload_str(&hit.payload, "title")
		.or_else(|| payload_str(&hit.payload, "name"))
		.unwrap_or_else(|| "Hong Kong Tourism Info".to_string());

	Some(KnowledgeChunk {
		id: hit.id.clone(),
		title,
		text,
		url: payload_str(&hit.payload, "url"),
		category: payload_str(&hit.payload, "category"),
		relevance_score: hit.score,
	})
}

/// Decodes a plannable activity; hits without a name are not activities.
pub fn decode_activity(hit: &KnowledgeHit) -> Option<ActivityCandidate> {
	let name = payload_str(&hit.payload, "name")?;
	let description = payload_str(&hit.payload, "description")
		.or_else(|| payload_str(&hit.payload, "text"))
		.unwrap_or_else(|| name.clone());
	let categories = hit
		.payload
		.get("categories")
		.and_then(|value| value.as_array())
		.map(|values| {
			values
				.iter()
				.filter_map(|value| value.as_str())
				.map(|value| value.to_string())
				.collect()
		})
		.unwrap_or_default();

	Some(ActivityCandidate {
		name,
		description,
		area: payload_str(&hit.payload, "area"),
		categories,
		cost_hkd: payload_f32(&hit.payload, "cost_hkd").unwrap_or(0.0),
		duration_mins: payload_f32(&hit.payload, "duration_mins").unwrap_or(0.0) as u32,
		rating: payload_f32(&hit.payload, "rating").unwrap_or(0.0),
		transport: payload_str(&hit.payload, "transport"),
		tip: payload_str(&hit.payload, "tip"),
	})
}

fn payload_str(payload: &Map<String, JsonValue>, key: &str) -> Option<String> {
	payload
		.get(key)
		.and_then(|value| value.as_str())
		.map(|value| value.trim())
		.filter(|value| !value.is_empty())
		.map(|value| value.to_string())
}

fn payload_f32(payload: &Map<String, JsonValue>, key: &str) -> Option<f32> {
	payload.get(key).and_then(|value| value.as_f64()).map(|value| value as f32)
}

fn qdrant_value_to_json(value: Value) -> JsonValue {
	match value.kind {
		Some(Kind::NullValue(_)) | None => JsonValue::Null,
		Some(Kind::BoolValue(value)) => JsonValue::Bool(value),
		Some(Kind::IntegerValue(value)) => JsonValue::Number(value.into()),
		Some(Kind::DoubleValue(value)) =>
			Number::from_f64(value).map(JsonValue::Number).unwrap_or(JsonValue::Null),
		Some(Kind::StringValue(value)) => JsonValue::String(value),
		Some(Kind::ListValue(list)) =>
			JsonValue::Array(list.values.into_iter().map(qdrant_value_to_json).collect()),
		Some(Kind::StructValue(object)) => JsonValue::Object(
			object
				.fields
				.into_iter()
				.map(|(key, value)| (key, qdrant_value_to_json(value)))
				.collect(),
		),
	}
}
