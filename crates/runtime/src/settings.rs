//! Game setup values forwarded to the engine.
//!
//! Nothing here interprets these values; they are passed to the engine as-is.

use serde::{Deserialize, Serialize};

/// Board size every game is played on.
pub const BOARD_SIZE: u32 = 19;

/// Engine strength parameters, each sent as its own `kata-set-param`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Difficulty {
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub max_visits: Option<u64>,
	/// Seconds of thinking time per move.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub max_time: Option<f64>,
	/// Negative values make the engine play as if it were behind.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub playout_doubling_advantage: Option<f64>,
	#[serde(default, rename = "humanSLProfile", skip_serializing_if = "Option::is_none")]
	pub human_sl_profile: Option<String>,
}

impl Default for Difficulty {
	fn default() -> Self {
		Self {
			max_visits: Some(10),
			max_time: Some(0.2),
			playout_doubling_advantage: Some(-1.0),
			human_sl_profile: None,
		}
	}
}

impl Difficulty {
	/// Present parameters as `(name, value)` pairs, in the order they are sent.
	pub fn params(&self) -> Vec<(&'static str, String)> {
		let mut params = Vec::new();
		if let Some(visits) = self.max_visits {
			params.push(("maxVisits", visits.to_string()));
		}
		if let Some(time) = self.max_time {
			params.push(("maxTime", time.to_string()));
		}
		if let Some(advantage) = self.playout_doubling_advantage {
			params.push(("playoutDoublingAdvantage", advantage.to_string()));
		}
		if let Some(profile) = self.human_sl_profile.as_deref().filter(|p| !p.is_empty()) {
			params.push(("humanSLProfile", profile.to_string()));
		}
		params
	}
}

/// Everything [`crate::game::start_game`] sends after `boardsize`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GameSettings {
	/// Shorthand rules name or JSON rules object for `kata-set-rules`.
	pub rules: String,
	pub komi: f64,
	pub difficulty: Difficulty,
}

impl Default for GameSettings {
	fn default() -> Self {
		Self {
			rules: "tromp-taylor".to_string(),
			komi: 7.5,
			difficulty: Difficulty::default(),
		}
	}
}
