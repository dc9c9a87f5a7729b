use serde::{Deserialize, Serialize};

use crate::budget::{BudgetBand, DailyCaps, TravelPace};

/// Bonus added to a candidate's selection score when it shares the previous
/// pick's area. Worth exactly one interest match.
const AREA_PROXIMITY_BONUS: f32 = 1.0;

#[derive(Clone, Debug)]
pub struct PlannerPolicy {
	pub day_start_minute: u32,
	pub transfer_gap_mins: u32,
	pub default_activity_mins: u32,
	pub daily_caps: DailyCaps,
}

#[derive(Clone, Debug)]
pub struct PlanRequest {
	pub duration_days: u32,
	pub interests: Vec<String>,
	pub budget: BudgetBand,
	pub pace: TravelPace,
	pub group_size: u32,
	pub accommodation_area: Option<String>,
}

/// An activity decoded from the knowledge index. Costs are HK$ per person.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ActivityCandidate {
	pub name: String,
	pub description: String,
	pub area: Option<String>,
	pub categories: Vec<String>,
	pub cost_hkd: f32,
	pub duration_mins: u32,
	pub rating: f32,
	pub transport: Option<String>,
	pub tip: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PlannedActivity {
	pub name: String,
	pub time: String,
	pub duration_mins: u32,
	pub cost_hkd: f32,
	pub description: String,
	pub transport: Option<String>,
	pub tip: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DayPlan {
	pub day: u32,
	pub activities: Vec<PlannedActivity>,
	pub estimated_cost_hkd: f32,
}

/// Greedy deterministic day filler.
///
/// Each day picks unused candidates maximizing interest match plus an
/// area-proximity bonus, skipping anything that would push the day past its
/// budget cap, until the pace target's upper bound is reached or the pool is
/// exhausted. Later days running short of the target is a valid outcome.
pub fn plan(
	policy: &PlannerPolicy,
	request: &PlanRequest,
	candidates: &[ActivityCandidate],
) -> Vec<DayPlan> {
	let target = request.pace.target();
	let day_cap = request.budget.daily_cap_hkd(&policy.daily_caps);
	let interests = normalized_interests(&request.interests);
	let pool: Vec<usize> = candidates
		.iter()
		.enumerate()
		.filter(|(_, candidate)| interests.is_empty() || interest_match(candidate, &interests) > 0)
		.map(|(index, _)| index)
		.collect();
	let mut used = vec![false; candidates.len()];
	let mut days = Vec::with_capacity(request.duration_days as usize);

	for day in 1..=request.duration_days {
		let mut clock = policy.day_start_minute;
		let mut remaining_budget = day_cap;
		let mut prev_area = request.accommodation_area.clone();
		let mut activities = Vec::with_capacity(target.max);

		while activities.len() < target.max {
			let Some(index) = pick_next(
				candidates,
				&pool,
				&used,
				&interests,
				prev_area.as_deref(),
				remaining_budget,
			) else {
				break;
			};
			let candidate = &candidates[index];
			let duration = if candidate.duration_mins == 0 {
				policy.default_activity_mins
			} else {
				candidate.duration_mins
			};

			used[index] = true;
			remaining_budget -= candidate.cost_hkd;
			activities.push(PlannedActivity {
				name: candidate.name.clone(),
				time: format_minute(clock),
				duration_mins: duration,
				cost_hkd: candidate.cost_hkd,
				description: candidate.description.clone(),
				transport: candidate.transport.clone(),
				tip: candidate.tip.clone(),
			});

			clock += duration + policy.transfer_gap_mins;
			prev_area = candidate.area.clone();
		}

		let estimated_cost_hkd =
			activities.iter().map(|activity| activity.cost_hkd).sum::<f32>();

		days.push(DayPlan { day, activities, estimated_cost_hkd });
	}

	days
}

pub fn format_minute(minute: u32) -> String {
	format!("{:02}:{:02}", (minute / 60) % 24, minute % 60)
}

fn normalized_interests(interests: &[String]) -> Vec<String> {
	interests
		.iter()
		.map(|interest| interest.trim().to_lowercase())
		.filter(|interest| !interest.is_empty())
		.collect()
}

fn interest_match(candidate: &ActivityCandidate, interests: &[String]) -> usize {
	interests
		.iter()
		.filter(|interest| {
			candidate.categories.iter().any(|category| {
				let category = category.trim().to_lowercase();

				category == **interest
					|| category.contains(interest.as_str())
					|| interest.contains(category.as_str())
			})
		})
		.count()
}

fn selection_score(
	candidate: &ActivityCandidate,
	interests: &[String],
	prev_area: Option<&str>,
) -> f32 {
	let mut score = interest_match(candidate, interests) as f32;

	if let (Some(prev), Some(area)) = (prev_area, candidate.area.as_deref())
		&& prev.eq_ignore_ascii_case(area)
	{
		score += AREA_PROXIMITY_BONUS;
	}

	score
}

/// Picks the best affordable unused candidate. Ties break on rating, then on
/// original candidate order (first wins), keeping the fill stable.
fn pick_next(
	candidates: &[ActivityCandidate],
	pool: &[usize],
	used: &[bool],
	interests: &[String],
	prev_area: Option<&str>,
	remaining_budget: f32,
) -> Option<usize> {
	let mut best: Option<(usize, f32, f32)> = None;

	for &index in pool {
		if used[index] {
			continue;
		}

		let candidate = &candidates[index];

		if candidate.cost_hkd > remaining_budget {
			continue;
		}

		let score = selection_score(candidate, interests, prev_area);
		let replace = match best {
			None => true,
			Some((_, best_score, best_rating)) =>
				score > best_score || (score == best_score && candidate.rating > best_rating),
		};

		if replace {
			best = Some((index, score, candidate.rating));
		}
	}

	best.map(|(index, _, _)| index)
}
