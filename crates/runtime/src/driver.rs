//! GTP engine driver configuration
//!
//! Resolves how the engine process is launched. Each setting can be overridden
//! from the environment and otherwise falls back to a default that matches a
//! containerised KataGo install:
//!
//! | Setting | Variable | Default |
//! |---|---|---|
//! | executable | `KATAGO_PATH` | `katago` |
//! | model | `KATAGO_MODEL` | `/models/gtp_model.bin` |
//! | engine config | `KATAGO_CONFIG` | `/models/analysis_example.cfg` |
//! | command timeout | `GTP_COMMAND_TIMEOUT_MS` | `120000` (`0` disables) |
//! | stderr ready marker | `GTP_READY_MARKER` | `GTP ready` |

use std::ffi::OsString;
use std::path::PathBuf;
use std::time::Duration;

use tracing::warn;

pub const ENV_EXECUTABLE: &str = "KATAGO_PATH";
pub const ENV_MODEL: &str = "KATAGO_MODEL";
pub const ENV_CONFIG: &str = "KATAGO_CONFIG";
pub const ENV_COMMAND_TIMEOUT_MS: &str = "GTP_COMMAND_TIMEOUT_MS";
pub const ENV_READY_MARKER: &str = "GTP_READY_MARKER";

pub const DEFAULT_EXECUTABLE: &str = "katago";
pub const DEFAULT_MODEL: &str = "/models/gtp_model.bin";
pub const DEFAULT_CONFIG: &str = "/models/analysis_example.cfg";
pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(120);
pub const DEFAULT_READY_MARKER: &str = "GTP ready";

/// Launch settings for one engine process.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
	/// Engine executable, looked up on `PATH` when not absolute
	pub executable: PathBuf,
	/// Neural-net model passed as `-model`
	pub model: PathBuf,
	/// Engine configuration file passed as `-config`
	pub config: PathBuf,
	/// Working directory for the process (inherits ours when `None`)
	pub working_dir: Option<PathBuf>,
	/// Per-command reply timeout; `None` waits forever
	pub command_timeout: Option<Duration>,
	/// Substring of a stderr line that signals the engine is ready
	pub ready_marker: Option<String>,
}

impl Default for EngineConfig {
	fn default() -> Self {
		Self {
			executable: PathBuf::from(DEFAULT_EXECUTABLE),
			model: PathBuf::from(DEFAULT_MODEL),
			config: PathBuf::from(DEFAULT_CONFIG),
			working_dir: None,
			command_timeout: Some(DEFAULT_COMMAND_TIMEOUT),
			ready_marker: Some(DEFAULT_READY_MARKER.to_string()),
		}
	}
}

impl EngineConfig {
	/// Reads overrides from the process environment.
	pub fn from_env() -> Self {
		Self::from_lookup(|key| std::env::var(key).ok())
	}

	/// Reads overrides through `lookup`, falling back to defaults for unset keys.
	///
	/// Empty values count as unset.
	pub fn from_lookup<F>(lookup: F) -> Self
	where
		F: Fn(&str) -> Option<String>,
	{
		let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
		let defaults = Self::default();

		let command_timeout = match get(ENV_COMMAND_TIMEOUT_MS) {
			Some(raw) => match raw.trim().parse::<u64>() {
				Ok(0) => None,
				Ok(ms) => Some(Duration::from_millis(ms)),
				Err(_) => {
					warn!(
						target = "gtp.engine",
						variable = ENV_COMMAND_TIMEOUT_MS,
						value = %raw,
						"ignoring non-numeric timeout override"
					);
					defaults.command_timeout
				}
			},
			None => defaults.command_timeout,
		};

		Self {
			executable: get(ENV_EXECUTABLE).map(PathBuf::from).unwrap_or(defaults.executable),
			model: get(ENV_MODEL).map(PathBuf::from).unwrap_or(defaults.model),
			config: get(ENV_CONFIG).map(PathBuf::from).unwrap_or(defaults.config),
			working_dir: None,
			command_timeout,
			ready_marker: get(ENV_READY_MARKER).or(defaults.ready_marker),
		}
	}

	pub fn with_executable(mut self, executable: impl Into<PathBuf>) -> Self {
		self.executable = executable.into();
		self
	}

	pub fn with_model(mut self, model: impl Into<PathBuf>) -> Self {
		self.model = model.into();
		self
	}

	pub fn with_config(mut self, config: impl Into<PathBuf>) -> Self {
		self.config = config.into();
		self
	}

	pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
		self.working_dir = Some(dir.into());
		self
	}

	pub fn with_command_timeout(mut self, timeout: Option<Duration>) -> Self {
		self.command_timeout = timeout;
		self
	}

	pub fn with_ready_marker(mut self, marker: Option<String>) -> Self {
		self.ready_marker = marker;
		self
	}

	/// Arguments for GTP mode: `gtp -model <model> -config <config>`.
	pub fn args(&self) -> Vec<OsString> {
		vec![
			OsString::from("gtp"),
			OsString::from("-model"),
			self.model.clone().into_os_string(),
			OsString::from("-config"),
			self.config.clone().into_os_string(),
		]
	}
}
