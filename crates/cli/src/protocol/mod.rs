//! NDJSON envelopes for `gtp batch`.
//!
//! One request per input line, one response per output line. Requests are
//! tagged by `op`:
//!
//! ```text
//! {"op":"start","gameId":"g1"}
//! {"op":"move","gameId":"g1","x":3,"y":3}
//! {"op":"genmove","gameId":"g1","color":"black"}
//! {"op":"close","gameId":"g1"}
//! ```

use std::io::Write;

use gtp_protocol::Color;
use gtp_runtime::GameSettings;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Single request line.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchRequest {
	#[serde(default)]
	pub request_id: Option<String>,
	#[serde(flatten)]
	pub op: BatchOp,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "op", rename_all = "lowercase")]
pub enum BatchOp {
	/// Configure a game; allocates an id when none is given.
	#[serde(rename_all = "camelCase")]
	Start {
		#[serde(default)]
		game_id: Option<String>,
		#[serde(default)]
		settings: Option<GameSettings>,
	},
	/// Human stone at `(x, y)`, or a pass when `pass` is set; the engine answers.
	#[serde(rename_all = "camelCase")]
	Move {
		game_id: String,
		#[serde(default)]
		x: Option<u32>,
		#[serde(default)]
		y: Option<u32>,
		#[serde(default)]
		pass: bool,
		#[serde(default = "default_human")]
		human: Color,
	},
	/// Engine move for `color` without a human move first.
	#[serde(rename_all = "camelCase")]
	Genmove { game_id: String, color: Color },
	/// Shut the game's engine down.
	#[serde(rename_all = "camelCase")]
	Close { game_id: String },
	/// End the batch.
	Quit,
}

impl BatchOp {
	pub fn name(&self) -> &'static str {
		match self {
			BatchOp::Start { .. } => "start",
			BatchOp::Move { .. } => "move",
			BatchOp::Genmove { .. } => "genmove",
			BatchOp::Close { .. } => "close",
			BatchOp::Quit => "quit",
		}
	}
}

fn default_human() -> Color {
	Color::Black
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchError {
	pub code: String,
	pub message: String,
}

/// Single response line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchResponse {
	#[serde(skip_serializing_if = "Option::is_none")]
	pub request_id: Option<String>,
	pub op: String,
	pub ok: bool,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub data: Option<Value>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub error: Option<BatchError>,
}

impl BatchResponse {
	pub fn success(request_id: Option<String>, op: &str, data: Value) -> Self {
		Self {
			request_id,
			op: op.to_string(),
			ok: true,
			data: Some(data),
			error: None,
		}
	}

	pub fn error(request_id: Option<String>, op: &str, code: &str, message: &str) -> Self {
		Self {
			request_id,
			op: op.to_string(),
			ok: false,
			data: None,
			error: Some(BatchError {
				code: code.to_string(),
				message: message.to_string(),
			}),
		}
	}
}

/// Writes one response as a single JSON line and flushes.
pub fn write_response<W: Write>(out: &mut W, response: &BatchResponse) -> std::io::Result<()> {
	let json = serde_json::to_string(response)?;
	writeln!(out, "{json}")?;
	out.flush()
}
