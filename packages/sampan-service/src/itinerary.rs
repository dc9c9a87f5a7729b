use std::sync::Arc;

use sampan_config::Config;
use sampan_domain::{
	budget::{BudgetBand, DailyCaps, TravelPace},
	planner::{self, DayPlan, PlanRequest, PlannerPolicy},
};
use serde_json::Value;
use time::Duration;

use crate::{
	Error, Providers, Result, TourService, decode_json, encode_json, fingerprint, generate,
	generate::ItineraryPromptArgs, retrieve,
};

const MAX_ITINERARY_DAYS: u32 = 30;

#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct ItineraryRequest {
	pub duration: u32,
	#[serde(default)]
	pub interests: Vec<String>,
	pub budget: String,
	pub accommodation: Option<String>,
	#[serde(default = "default_travel_style")]
	pub travel_style: String,
	#[serde(default = "default_group_size")]
	pub group_size: u32,
	pub special_requirements: Option<Vec<String>>,
}

#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct ItineraryResponse {
	pub itinerary: Vec<DayPlan>,
	pub total_estimated_cost: f32,
	pub tips: Vec<String>,
	pub summary: Option<String>,
}

fn default_travel_style() -> String {
	"moderate".to_string()
}

fn default_group_size() -> u32 {
	1
}

impl TourService {
	/// Planning needs candidates, so unlike chat this fails outright when the
	/// knowledge index is unreachable.
	pub async fn itinerary(&self, request: ItineraryRequest) -> Result<ItineraryResponse> {
		let plan_request = validate(&request)?;
		let special_requirements = request.special_requirements.clone().unwrap_or_default();
		let key = fingerprint::itinerary_fingerprint(
			plan_request.duration_days,
			&plan_request.interests,
			plan_request.budget.as_str(),
			plan_request.pace.as_str(),
			plan_request.group_size,
			plan_request.accommodation_area.as_deref(),
			&special_requirements,
		)?;
		let ttl = Duration::seconds(self.cfg.cache.itinerary_ttl_secs);
		let cfg = self.cfg.clone();
		let providers = self.providers.clone();
		let value = self
			.cache
			.get_or_compute(&key, ttl, move || {
				compute_itinerary(cfg, providers, plan_request, special_requirements)
			})
			.await?;

		decode_json(value, "itinerary payload")
	}
}

fn validate(request: &ItineraryRequest) -> Result<PlanRequest> {
	if request.duration == 0 {
		return Err(Error::InvalidRequest {
			message: "duration must be at least one day.".to_string(),
		});
	}
	if request.duration > MAX_ITINERARY_DAYS {
		return Err(Error::InvalidRequest {
			message: format!("duration must be at most {MAX_ITINERARY_DAYS} days."),
		});
	}
	if request.group_size == 0 {
		return Err(Error::InvalidRequest {
			message: "group_size must be at least one.".to_string(),
		});
	}

	let budget = BudgetBand::parse(&request.budget).ok_or_else(|| Error::InvalidRequest {
		message: "budget must be one of low, medium, or high.".to_string(),
	})?;
	let pace = TravelPace::parse(&request.travel_style).ok_or_else(|| Error::InvalidRequest {
		message: "travel_style must be one of slow, moderate, or fast.".to_string(),
	})?;

	Ok(PlanRequest {
		duration_days: request.duration,
		interests: request.interests.clone(),
		budget,
		pace,
		group_size: request.group_size,
		accommodation_area: request
			.accommodation
			.as_deref()
			.map(str::trim)
			.filter(|value| !value.is_empty())
			.map(str::to_string),
	})
}

fn planner_policy(cfg: &Config) -> PlannerPolicy {
	PlannerPolicy {
		day_start_minute: cfg.planner.day_start_hour * 60,
		transfer_gap_mins: cfg.planner.transfer_gap_mins,
		default_activity_mins: cfg.planner.default_activity_mins,
		daily_caps: DailyCaps {
			low: cfg.planner.low_daily_cap_hkd,
			medium: cfg.planner.medium_daily_cap_hkd,
			high: cfg.planner.high_daily_cap_hkd,
		},
	}
}

fn retrieval_query(interests: &[String]) -> String {
	if interests.is_empty() {
		"top attractions and experiences in Hong Kong".to_string()
	} else {
		format!("{} in Hong Kong", interests.join(", "))
	}
}

async fn compute_itinerary(
	cfg: Arc<Config>,
	providers: Providers,
	plan_request: PlanRequest,
	special_requirements: Vec<String>,
) -> Result<Value> {
	let query = retrieval_query(&plan_request.interests);
	let candidates = retrieve::retrieve_activities(&cfg, &providers, &query).await?;
	let days = planner::plan(&planner_policy(&cfg), &plan_request, &candidates);
	let messages = generate::itinerary_messages(&ItineraryPromptArgs {
		duration: plan_request.duration_days,
		interests: &plan_request.interests,
		budget_guidance: plan_request.budget.guidance(),
		pace_guidance: plan_request.pace.guidance(),
		group_size: plan_request.group_size,
		accommodation: plan_request.accommodation_area.as_deref(),
		special_requirements: &special_requirements,
		days: &days,
	});
	let (tips, summary) =
		generate::generate_with_retry(&cfg, &providers, messages, generate::normalize_tips)
			.await?;
	let total_estimated_cost = days.iter().map(|day| day.estimated_cost_hkd).sum();

	encode_json(
		&ItineraryResponse { itinerary: days, total_estimated_cost, tips, summary },
		"itinerary payload",
	)
}
