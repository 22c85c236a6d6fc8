use thiserror::Error;

pub type Result<T> = std::result::Result<T, CliError>;

#[derive(Debug, Error)]
pub enum CliError {
	/// Request or move text that cannot be acted on; no engine was touched.
	#[error("invalid input: {0}")]
	InvalidInput(String),

	#[error(transparent)]
	Engine(#[from] gtp_runtime::Error),

	#[error(transparent)]
	Io(#[from] std::io::Error),

	#[error(transparent)]
	Json(#[from] serde_json::Error),

	#[error(transparent)]
	Anyhow(#[from] anyhow::Error),
}

impl CliError {
	/// Stable code reported in batch error responses.
	pub fn code(&self) -> &'static str {
		use gtp_runtime::Error as E;

		match self {
			CliError::InvalidInput(_) => "INVALID_INPUT",
			CliError::Engine(E::InvalidVertex(_) | E::InvalidArgument(_)) => "INVALID_INPUT",
			CliError::Engine(E::Engine { .. }) => "ENGINE_REJECTED",
			CliError::Engine(E::Timeout(_)) => "TIMEOUT",
			CliError::Engine(e) if e.is_disconnected() => "ENGINE_UNAVAILABLE",
			CliError::Engine(_) | CliError::Io(_) => "IO_ERROR",
			CliError::Json(_) => "PARSE_ERROR",
			CliError::Anyhow(_) => "INTERNAL_ERROR",
		}
	}
}
