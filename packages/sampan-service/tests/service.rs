use std::sync::Arc;

use sampan_service::{
	ChatRequest, Error, IngestDocumentRequest, ItineraryRequest, RecommendationRequest,
	TourService, TranslateImageRequest, TranslateTextRequest, UserPreferences,
};
use sampan_testkit::{
	FailingGeneration, FailingIndex, FailureMode, ScriptedGeneration, StaticGeneration,
	StaticIndex, StaticOcr, activity_hit, chunk_hit, test_config, test_providers,
};

fn chat_completion() -> StaticGeneration {
	StaticGeneration::json(&serde_json::json!({
		"message": "Try Tim Ho Wan in Sham Shui Po for award-winning dim sum."
	}))
}

fn itinerary_completion() -> StaticGeneration {
	StaticGeneration::json(&serde_json::json!({
		"tips": ["Get an Octopus card on arrival", "Carry a light rain jacket"],
		"summary": "Two days of focused eating across Kowloon and Hong Kong Island."
	}))
}

fn food_index(count: usize) -> StaticIndex {
	let hits = (0..count)
		.map(|index| {
			activity_hit(
				&format!("Food stop {index}"),
				"Tsim Sha Tsui",
				&["Food & Dining"],
				120.0,
				4.5 - index as f32 * 0.1,
				0.9 - index as f32 * 0.01,
			)
		})
		.collect();

	StaticIndex::new(hits)
}

fn chat_request(message: &str) -> ChatRequest {
	ChatRequest {
		message: message.to_string(),
		conversation_id: None,
		conversation_history: Vec::new(),
		user_context: None,
	}
}

fn itinerary_request() -> ItineraryRequest {
	ItineraryRequest {
		duration: 2,
		interests: vec!["Food & Dining".to_string()],
		budget: "medium".to_string(),
		accommodation: None,
		travel_style: "moderate".to_string(),
		group_size: 2,
		special_requirements: None,
	}
}

#[tokio::test]
async fn identical_chat_requests_hit_the_cache_and_call_upstream_once() {
	let generation = Arc::new(chat_completion());
	let index = Arc::new(StaticIndex::new(vec![
		chunk_hit("Dim Sum Culture", "Dim sum is a cornerstone of Hong Kong cuisine.", 0.9),
		chunk_hit("Tsim Sha Tsui", "Tsim Sha Tsui sits at the tip of Kowloon.", 0.6),
	]));
	let service = TourService::with_providers(
		test_config(),
		test_providers(generation.clone(), index.clone()),
	);
	let first = service
		.chat(chat_request("Where can I find dim sum in Tsim Sha Tsui?"))
		.await
		.expect("first chat failed");
	let second = service
		.chat(chat_request("Where can I find dim sum in Tsim Sha Tsui?"))
		.await
		.expect("second chat failed");

	assert_eq!(generation.calls(), 1);
	assert_eq!(first.message, second.message);
	assert_eq!(
		serde_json::to_value(&first.sources).expect("encode failed"),
		serde_json::to_value(&second.sources).expect("encode failed"),
	);
	assert_eq!(first.sources.len(), 2);
}

#[tokio::test]
async fn trivially_respelled_queries_share_one_cache_entry() {
	let generation = Arc::new(chat_completion());
	let service = TourService::with_providers(
		test_config(),
		test_providers(generation.clone(), Arc::new(StaticIndex::empty())),
	);

	service.chat(chat_request("Where can I find dim sum?")).await.expect("chat failed");
	service.chat(chat_request("  where can I   find DIM SUM? ")).await.expect("chat failed");

	assert_eq!(generation.calls(), 1);
}

#[tokio::test]
async fn concurrent_identical_itineraries_produce_one_upstream_call() {
	let generation = Arc::new(itinerary_completion());
	let service = Arc::new(TourService::with_providers(
		test_config(),
		test_providers(generation.clone(), Arc::new(food_index(10))),
	));
	let mut handles = Vec::new();

	for _ in 0..8 {
		let service = service.clone();

		handles.push(tokio::spawn(async move { service.itinerary(itinerary_request()).await }));
	}

	let mut responses = Vec::new();

	for handle in handles {
		responses.push(handle.await.expect("task panicked").expect("itinerary failed"));
	}

	assert_eq!(generation.calls(), 1);

	let encoded: Vec<serde_json::Value> = responses
		.iter()
		.map(|response| serde_json::to_value(response).expect("encode failed"))
		.collect();

	assert!(encoded.windows(2).all(|pair| pair[0] == pair[1]));
}

#[tokio::test]
async fn expired_ttl_triggers_a_fresh_upstream_call() {
	let generation = Arc::new(chat_completion());
	let mut config = test_config();

	config.cache.chat_ttl_secs = -1;

	let service = TourService::with_providers(
		config,
		test_providers(generation.clone(), Arc::new(StaticIndex::empty())),
	);

	service.chat(chat_request("Where can I find dim sum?")).await.expect("chat failed");
	service.chat(chat_request("Where can I find dim sum?")).await.expect("chat failed");

	assert_eq!(generation.calls(), 2);
}

#[tokio::test]
async fn sources_never_include_hits_below_the_relevance_floor() {
	let generation = Arc::new(chat_completion());
	let index = Arc::new(StaticIndex::new(vec![
		chunk_hit("Strong match", "Highly relevant fact.", 0.9),
		chunk_hit("Weak match", "Barely relevant fact.", 0.1),
	]));
	let service =
		TourService::with_providers(test_config(), test_providers(generation, index));
	let response = service.chat(chat_request("Tell me about dim sum.")).await.expect("chat failed");

	assert_eq!(response.sources.len(), 1);
	assert_eq!(response.sources[0].title, "Strong match");
	assert!(response.sources[0].relevance_score >= 0.25);
}

#[tokio::test]
async fn chat_degrades_to_ungrounded_answers_when_the_index_is_down() {
	let generation = Arc::new(chat_completion());
	let service = TourService::with_providers(
		test_config(),
		test_providers(generation.clone(), Arc::new(FailingIndex)),
	);
	let response = service.chat(chat_request("Tell me about dim sum.")).await.expect("chat failed");

	assert!(response.sources.is_empty());
	assert_eq!(generation.calls(), 1);
}

#[tokio::test]
async fn itinerary_requires_the_index_and_fails_when_it_is_down() {
	let generation = Arc::new(itinerary_completion());
	let service = TourService::with_providers(
		test_config(),
		test_providers(generation.clone(), Arc::new(FailingIndex)),
	);
	let result = service.itinerary(itinerary_request()).await;

	assert!(matches!(result, Err(Error::RetrievalUnavailable { .. })));
	assert_eq!(generation.calls(), 0);
}

#[tokio::test]
async fn planned_days_respect_pace_and_budget_invariants() {
	let generation = Arc::new(itinerary_completion());
	let service = TourService::with_providers(
		test_config(),
		test_providers(generation, Arc::new(food_index(10))),
	);
	let response = service.itinerary(itinerary_request()).await.expect("itinerary failed");

	assert_eq!(response.itinerary.len(), 2);
	assert_eq!(response.tips.len(), 2);

	for day in &response.itinerary {
		assert!((3..=4).contains(&day.activities.len()), "Got {}", day.activities.len());
		assert!(day.estimated_cost_hkd <= 1_000.0);

		let mut prev_end = 0u32;

		for activity in &day.activities {
			let (hours, minutes) =
				activity.time.split_once(':').expect("time must be HH:MM");
			let start: u32 =
				hours.parse::<u32>().unwrap() * 60 + minutes.parse::<u32>().unwrap();

			assert!(start >= prev_end, "Activities overlap.");

			prev_end = start + activity.duration_mins;
		}
	}

	let expected_total: f32 =
		response.itinerary.iter().map(|day| day.estimated_cost_hkd).sum();

	assert_eq!(response.total_estimated_cost, expected_total);
}

#[tokio::test]
async fn quota_failures_surface_immediately_without_retry() {
	let generation = Arc::new(FailingGeneration::new(FailureMode::Quota));
	let service = TourService::with_providers(
		test_config(),
		test_providers(generation.clone(), Arc::new(StaticIndex::empty())),
	);
	let result = service.chat(chat_request("Tell me about dim sum.")).await;

	assert!(matches!(result, Err(Error::QuotaExceeded { .. })));
	assert_eq!(generation.calls(), 1);
}

#[tokio::test]
async fn timeouts_are_retried_exactly_once_then_surfaced() {
	let generation = Arc::new(FailingGeneration::new(FailureMode::Timeout));
	let service = TourService::with_providers(
		test_config(),
		test_providers(generation.clone(), Arc::new(StaticIndex::empty())),
	);
	let result = service.chat(chat_request("Tell me about dim sum.")).await;

	assert!(matches!(result, Err(Error::ProviderTimeout { .. })));
	assert_eq!(generation.calls(), 2);
}

#[tokio::test]
async fn malformed_output_is_retried_once_with_a_stricter_prompt() {
	let generation = Arc::new(ScriptedGeneration::new([
		"I would love to help you with dim sum!".to_string(),
		serde_json::json!({ "message": "Second attempt sticks to the contract." }).to_string(),
	]));
	let service = TourService::with_providers(
		test_config(),
		test_providers(generation.clone(), Arc::new(StaticIndex::empty())),
	);
	let response =
		service.chat(chat_request("Tell me about dim sum.")).await.expect("chat failed");

	assert_eq!(generation.calls(), 2);
	assert_eq!(response.message, "Second attempt sticks to the contract.");
}

#[tokio::test]
async fn persistently_malformed_output_fails_after_one_retry() {
	let generation = Arc::new(ScriptedGeneration::new(["not json", "still not json"]));
	let service = TourService::with_providers(
		test_config(),
		test_providers(generation.clone(), Arc::new(StaticIndex::empty())),
	);
	let result = service.chat(chat_request("Tell me about dim sum.")).await;

	assert!(matches!(result, Err(Error::MalformedGeneration { .. })));
	assert_eq!(generation.calls(), 2);
}

#[tokio::test]
async fn invalid_requests_are_rejected_before_any_upstream_call() {
	let generation = Arc::new(chat_completion());
	let service = TourService::with_providers(
		test_config(),
		test_providers(generation.clone(), Arc::new(food_index(4))),
	);

	assert!(matches!(
		service.chat(chat_request("   ")).await,
		Err(Error::InvalidRequest { .. })
	));

	let mut zero_days = itinerary_request();

	zero_days.duration = 0;

	assert!(matches!(
		service.itinerary(zero_days).await,
		Err(Error::InvalidRequest { .. })
	));

	let mut empty_group = itinerary_request();

	empty_group.group_size = 0;

	assert!(matches!(
		service.itinerary(empty_group).await,
		Err(Error::InvalidRequest { .. })
	));

	let bad_limit = RecommendationRequest {
		user_preferences: UserPreferences::default(),
		current_location: None,
		time_context: None,
		limit: 0,
	};

	assert!(matches!(
		service.recommendations(bad_limit).await,
		Err(Error::InvalidRequest { .. })
	));
	assert_eq!(generation.calls(), 0);
}

#[tokio::test]
async fn chat_turns_accumulate_in_the_session() {
	let generation = Arc::new(chat_completion());
	let service = TourService::with_providers(
		test_config(),
		test_providers(generation, Arc::new(StaticIndex::empty())),
	);
	let first = service.chat(chat_request("Where can I find dim sum?")).await.expect("chat failed");
	let stats = service
		.sessions
		.stats(first.conversation_id.parse().expect("conversation_id must be a uuid"))
		.expect("session stats expected");

	assert_eq!(stats.conversation_messages, 2);
}

#[tokio::test]
async fn translation_clamps_confidence_and_keeps_context() {
	let generation = Arc::new(StaticGeneration::json(&serde_json::json!({
		"translated_text": "roast goose",
		"cultural_context": "A Cantonese barbecue classic, often eaten with plum sauce.",
		"confidence": 3.2
	})));
	let service = TourService::with_providers(
		test_config(),
		test_providers(generation, Arc::new(StaticIndex::empty())),
	);
	let response = service
		.translate_text(TranslateTextRequest {
			text: "燒鵝".to_string(),
			source_language: "auto".to_string(),
			target_language: "en".to_string(),
			context_type: Some("menu".to_string()),
		})
		.await
		.expect("translation failed");

	assert_eq!(response.translated_text, "roast goose");
	assert_eq!(response.confidence, 1.0);
	assert!(response.cultural_context.is_some());
	assert!(response.original_text.is_none());
}

#[tokio::test]
async fn image_translation_carries_the_extracted_text() {
	let generation = Arc::new(StaticGeneration::json(&serde_json::json!({
		"translated_text": "Mind the gap",
		"cultural_context": "",
		"confidence": 0.8
	})));
	let ocr = Arc::new(StaticOcr::new("小心空隙"));
	let service = TourService::with_providers(
		test_config(),
		sampan_service::Providers::new(
			generation,
			Arc::new(sampan_testkit::StaticEmbedding),
			ocr.clone(),
			Arc::new(StaticIndex::empty()),
		),
	);
	let response = service
		.translate_image(TranslateImageRequest {
			image_base64: "aGVsbG8=".to_string(),
			target_language: "en".to_string(),
			context_type: Some("sign".to_string()),
		})
		.await
		.expect("image translation failed");

	assert_eq!(response.original_text.as_deref(), Some("小心空隙"));
	assert_eq!(response.translated_text, "Mind the gap");
	assert_eq!(ocr.calls(), 1);
}

#[tokio::test]
async fn recommendations_are_cached_per_parameter_set() {
	let generation = Arc::new(StaticGeneration::json(&serde_json::json!({
		"recommendations": [{
			"name": "Temple Street Night Market",
			"description": "Street food and fortune tellers after dark.",
			"category": "Markets",
			"location": "Yau Ma Tei",
			"rating": 4.4,
			"estimated_time": "2 hours",
			"cost_range": "HK$50-150",
			"reasons": ["open in the evening", "matches a low budget"]
		}]
	})));
	let service = TourService::with_providers(
		test_config(),
		test_providers(generation.clone(), Arc::new(StaticIndex::empty())),
	);
	let request = RecommendationRequest {
		user_preferences: UserPreferences {
			interests: vec!["markets".to_string()],
			budget: Some("low".to_string()),
		},
		current_location: None,
		time_context: Some("evening".to_string()),
		limit: 1,
	};
	let first =
		service.recommendations(request.clone()).await.expect("recommendations failed");
	let second =
		service.recommendations(request).await.expect("recommendations failed");

	assert_eq!(generation.calls(), 1);
	assert_eq!(first.recommendations.len(), 1);
	assert_eq!(
		serde_json::to_value(&first).expect("encode failed"),
		serde_json::to_value(&second).expect("encode failed"),
	);
}

#[tokio::test]
async fn ingested_documents_reach_the_index_with_their_payload() {
	let index = Arc::new(StaticIndex::empty());
	let service = TourService::with_providers(
		test_config(),
		test_providers(Arc::new(chat_completion()), index.clone()),
	);
	let response = service
		.ingest_document(IngestDocumentRequest {
			title: "Star Ferry".to_string(),
			content: "The Star Ferry has crossed Victoria Harbour since 1888.".to_string(),
			category: Some("transport".to_string()),
			url: Some("https://example.org/star-ferry".to_string()),
			metadata: serde_json::Map::new(),
		})
		.await
		.expect("ingest failed");
	let upserted = index.upserted();

	assert_eq!(upserted.len(), 1);
	assert_eq!(upserted[0].id, response.document_id);
	assert_eq!(upserted[0].payload["title"], "Star Ferry");
	assert_eq!(upserted[0].payload["category"], "transport");
}

#[tokio::test]
async fn sweep_reports_expired_sessions() {
	let service = TourService::with_providers(
		test_config(),
		test_providers(Arc::new(chat_completion()), Arc::new(StaticIndex::empty())),
	);

	service.chat(chat_request("Where can I find dim sum?")).await.expect("chat failed");

	let report = service.sweep(time::OffsetDateTime::now_utc());

	assert_eq!(report.expired_sessions, 0);

	let report = service.sweep(time::OffsetDateTime::now_utc() + time::Duration::hours(25));

	assert_eq!(report.expired_sessions, 1);
}
