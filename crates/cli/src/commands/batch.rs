//! `gtp batch`: NDJSON requests on stdin, one response line each on stdout.

use std::io::Write;

use gtp_protocol::{Move, Point};
use gtp_runtime::{SessionRegistry, engine_move, play_move, start_game};
use serde_json::{Value, json};
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::{debug, error};

use crate::error::{CliError, Result};
use crate::protocol::{BatchOp, BatchRequest, BatchResponse, write_response};

/// Runs batch mode until EOF or a `quit` request.
///
/// Individual request failures are reported in the response stream, not
/// returned; only stdin/stdout failures end the batch with an error.
pub async fn execute<R, W>(registry: &SessionRegistry, reader: R, out: &mut W) -> Result<()>
where
	R: AsyncBufRead + Unpin,
	W: Write,
{
	let mut lines = reader.lines();

	while let Some(line) = lines.next_line().await? {
		let line = line.trim();
		if line.is_empty() {
			continue;
		}

		let request: BatchRequest = match serde_json::from_str(line) {
			Ok(request) => request,
			Err(e) => {
				debug!(target = "gtp.cli", error = %e, "malformed batch request");
				write_response(out, &BatchResponse::error(None, "unknown", "PARSE_ERROR", &e.to_string()))?;
				continue;
			}
		};

		let op = request.op.name();
		if matches!(request.op, BatchOp::Quit) {
			write_response(out, &BatchResponse::success(request.request_id, op, json!({})))?;
			break;
		}

		let response = match handle(registry, request.op).await {
			Ok(data) => BatchResponse::success(request.request_id, op, data),
			Err(err) => {
				error!(target = "gtp.cli", op, code = err.code(), error = %err, "batch request failed");
				BatchResponse::error(request.request_id, op, err.code(), &err.to_string())
			}
		};
		write_response(out, &response)?;
	}

	Ok(())
}

async fn handle(registry: &SessionRegistry, op: BatchOp) -> Result<Value> {
	match op {
		BatchOp::Start { game_id, settings } => {
			let settings = settings.unwrap_or_default();
			let game_id = start_game(registry, game_id, &settings).await?;
			Ok(json!({ "gameId": game_id }))
		}
		BatchOp::Move {
			game_id,
			x,
			y,
			pass,
			human,
		} => {
			let human_move = match (pass, x, y) {
				(true, None, None) => Move::Pass,
				(false, Some(x), Some(y)) => Move::Stone(Point::new(x, y)),
				_ => {
					return Err(CliError::InvalidInput(
						"move needs both x and y, or pass: true".to_string(),
					));
				}
			};
			let outcome = play_move(registry, &game_id, human_move, human).await?;
			Ok(serde_json::to_value(outcome)?)
		}
		BatchOp::Genmove { game_id, color } => {
			let mv = engine_move(registry, &game_id, color).await?;
			Ok(json!({ "gameId": game_id, "color": color, "move": mv }))
		}
		BatchOp::Close { game_id } => {
			let removed = registry.remove(&game_id).await;
			Ok(json!({ "gameId": game_id, "removed": removed }))
		}
		BatchOp::Quit => Ok(json!({})),
	}
}
