use serde::{Deserialize, Serialize};

/// Daily spending bands in HK$ per traveller.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BudgetBand {
	Low,
	Medium,
	High,
}
impl BudgetBand {
	pub fn parse(raw: &str) -> Option<Self> {
		match raw.trim().to_ascii_lowercase().as_str() {
			"low" => Some(Self::Low),
			"medium" => Some(Self::Medium),
			"high" => Some(Self::High),
			_ => None,
		}
	}

	pub fn as_str(self) -> &'static str {
		match self {
			Self::Low => "low",
			Self::Medium => "medium",
			Self::High => "high",
		}
	}

	pub fn daily_cap_hkd(self, caps: &DailyCaps) -> f32 {
		match self {
			Self::Low => caps.low,
			Self::Medium => caps.medium,
			Self::High => caps.high,
		}
	}

	/// Prompt guidance matching the band, per traveller per day.
	pub fn guidance(self) -> &'static str {
		match self {
			Self::Low =>
				"Budget-friendly options (HK$200-500 per day), street food, free attractions, public transport",
			Self::Medium =>
				"Moderate spending (HK$500-1000 per day), mix of experiences, some dining out",
			Self::High =>
				"Premium experiences (HK$1000+ per day), fine dining, private transport, luxury activities",
		}
	}
}

#[derive(Clone, Copy, Debug)]
pub struct DailyCaps {
	pub low: f32,
	pub medium: f32,
	pub high: f32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TravelPace {
	Slow,
	Moderate,
	Fast,
}
impl TravelPace {
	pub fn parse(raw: &str) -> Option<Self> {
		match raw.trim().to_ascii_lowercase().as_str() {
			"slow" => Some(Self::Slow),
			"moderate" => Some(Self::Moderate),
			"fast" => Some(Self::Fast),
			_ => None,
		}
	}

	pub fn as_str(self) -> &'static str {
		match self {
			Self::Slow => "slow",
			Self::Moderate => "moderate",
			Self::Fast => "fast",
		}
	}

	/// Activities-per-day range. Days are filled toward the upper bound.
	pub fn target(self) -> PaceTarget {
		match self {
			Self::Slow => PaceTarget { min: 2, max: 3 },
			Self::Moderate => PaceTarget { min: 3, max: 4 },
			Self::Fast => PaceTarget { min: 4, max: 5 },
		}
	}

	pub fn guidance(self) -> &'static str {
		match self {
			Self::Slow => "Relaxed pace, 2-3 activities per day, plenty of rest time",
			Self::Moderate => "Balanced pace, 3-4 activities per day, some flexibility",
			Self::Fast => "Packed schedule, 4-5 activities per day, maximize experiences",
		}
	}
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PaceTarget {
	pub min: usize,
	pub max: usize,
}
