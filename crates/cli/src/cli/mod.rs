#[cfg(test)]
mod tests;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use gtp_protocol::Color;
use gtp_runtime::{Difficulty, EngineConfig, GameSettings};

/// Root CLI for gtp.
#[derive(Parser, Debug)]
#[command(name = "gtp")]
#[command(about = "Play Go against a GTP engine such as KataGo")]
#[command(version)]
pub struct Cli {
	/// Increase verbosity (-v info, -vv debug)
	#[arg(short, long, global = true, action = clap::ArgAction::Count)]
	pub verbose: u8,

	#[command(flatten)]
	pub engine: EngineArgs,

	#[command(subcommand)]
	pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
	/// Play one game interactively, reading moves from stdin.
	Play(PlayArgs),
	/// Stream request envelopes over stdin/stdout (NDJSON).
	Batch(BatchArgs),
}

/// How engine processes are launched; unset flags fall back to the environment.
#[derive(Args, Debug, Clone, Default)]
pub struct EngineArgs {
	/// Engine executable.
	#[arg(long, global = true, value_name = "PATH", env = "KATAGO_PATH")]
	pub katago: Option<PathBuf>,

	/// Neural-net model file.
	#[arg(long, global = true, value_name = "FILE", env = "KATAGO_MODEL")]
	pub model: Option<PathBuf>,

	/// Engine configuration file.
	#[arg(long, global = true, value_name = "FILE", env = "KATAGO_CONFIG")]
	pub config: Option<PathBuf>,

	/// Per-command reply timeout in milliseconds (0 waits forever).
	#[arg(long, global = true, value_name = "MS")]
	pub command_timeout_ms: Option<u64>,
}

impl EngineArgs {
	/// Applies the flags on top of [`EngineConfig::from_env`].
	pub fn to_config(&self) -> EngineConfig {
		let mut config = EngineConfig::from_env();
		if let Some(katago) = &self.katago {
			config = config.with_executable(katago);
		}
		if let Some(model) = &self.model {
			config = config.with_model(model);
		}
		if let Some(path) = &self.config {
			config = config.with_config(path);
		}
		if let Some(ms) = self.command_timeout_ms {
			config = config.with_command_timeout((ms > 0).then(|| std::time::Duration::from_millis(ms)));
		}
		config
	}
}

#[derive(Args, Debug, Clone)]
pub struct PlayArgs {
	/// Game id; a random one is allocated when omitted.
	#[arg(long, value_name = "ID")]
	pub game_id: Option<String>,

	/// Color played from the keyboard.
	#[arg(long, value_enum, default_value = "black")]
	pub human: HumanColor,

	#[command(flatten)]
	pub game: GameArgs,
}

/// Game setup forwarded to the engine on start.
#[derive(Args, Debug, Clone)]
pub struct GameArgs {
	/// Rules name or JSON rules object for kata-set-rules.
	#[arg(long, default_value = "tromp-taylor")]
	pub rules: String,

	#[arg(long, default_value_t = 7.5, allow_negative_numbers = true)]
	pub komi: f64,

	/// Search visits per move.
	#[arg(long, value_name = "N")]
	pub max_visits: Option<u64>,

	/// Seconds of thinking time per move.
	#[arg(long, value_name = "SECONDS")]
	pub max_time: Option<f64>,

	/// Playout doubling advantage; negative values weaken the engine.
	#[arg(long, value_name = "VALUE", allow_negative_numbers = true)]
	pub playout_advantage: Option<f64>,

	/// Human-like play profile, e.g. rank_5k.
	#[arg(long, value_name = "PROFILE")]
	pub human_profile: Option<String>,
}

impl GameArgs {
	/// Settings with the default difficulty, overridden field by field.
	pub fn to_settings(&self) -> GameSettings {
		let defaults = Difficulty::default();
		GameSettings {
			rules: self.rules.clone(),
			komi: self.komi,
			difficulty: Difficulty {
				max_visits: self.max_visits.or(defaults.max_visits),
				max_time: self.max_time.or(defaults.max_time),
				playout_doubling_advantage: self.playout_advantage.or(defaults.playout_doubling_advantage),
				human_sl_profile: self.human_profile.clone().or(defaults.human_sl_profile),
			},
		}
	}
}

#[derive(Args, Debug, Clone)]
pub struct BatchArgs {
	/// Shut down engines unused for this many seconds.
	#[arg(long, value_name = "SECONDS")]
	pub idle_timeout: Option<u64>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum HumanColor {
	Black,
	White,
}

impl From<HumanColor> for Color {
	fn from(value: HumanColor) -> Self {
		match value {
			HumanColor::Black => Color::Black,
			HumanColor::White => Color::White,
		}
	}
}
