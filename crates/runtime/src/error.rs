//! Error types for the GTP runtime.

use gtp_protocol::VertexError;
use thiserror::Error;

/// Result type alias for runtime operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while talking to a GTP engine.
#[derive(Debug, Error)]
pub enum Error {
	/// The engine process could not be started.
	#[error("Failed to launch GTP engine: {0}")]
	LaunchFailed(String),

	/// Transport-level error (stdio communication).
	#[error("Transport error: {0}")]
	TransportError(String),

	/// The engine answered with a `?` failure reply.
	#[error("Engine rejected command {id}: {message}")]
	Engine {
		/// Identifier of the failed command
		id: String,
		/// Failure text as printed by the engine
		message: String,
	},

	/// The engine did not answer within the configured timeout.
	#[error("Timeout: {0}")]
	Timeout(String),

	/// Connection to the engine is gone; the call can never complete.
	#[error("Channel closed unexpectedly")]
	ChannelClosed,

	/// The engine replied with a move that does not decode.
	#[error("Invalid vertex: {0}")]
	InvalidVertex(#[from] VertexError),

	/// Invalid argument provided to an operation.
	#[error("Invalid argument: {0}")]
	InvalidArgument(String),

	/// I/O error.
	#[error("I/O error: {0}")]
	Io(#[from] std::io::Error),
}

impl Error {
	/// Returns true if the engine answered and refused the command.
	pub fn is_engine_failure(&self) -> bool {
		matches!(self, Error::Engine { .. })
	}

	/// Returns true if the engine can no longer be reached.
	pub fn is_disconnected(&self) -> bool {
		matches!(
			self,
			Error::ChannelClosed | Error::LaunchFailed(_) | Error::TransportError(_)
		)
	}

	pub fn is_timeout(&self) -> bool {
		matches!(self, Error::Timeout(_))
	}
}
