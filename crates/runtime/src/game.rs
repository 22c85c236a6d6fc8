//! Game flows built on the session registry.
//!
//! These are the operations a host exposes: start a game and exchange moves.
//! Each looks the engine up by game id, so any number of independent requests
//! can drive the same game.

use gtp_protocol::{Color, Move, VertexError};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::client::GtpClient;
use crate::error::{Error, Result};
use crate::registry::SessionRegistry;
use crate::settings::{BOARD_SIZE, GameSettings};

/// Result of one human move and the engine's answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveOutcome {
	pub game_id: String,
	pub player: Move,
	#[serde(rename = "ai")]
	pub engine: Move,
}

/// Configures a fresh game and returns its id.
///
/// A random id is allocated when `game_id` is `None`. The engine receives, in
/// order: `boardsize`, `clear_board`, rules, komi, then each difficulty
/// parameter.
pub async fn start_game(
	registry: &SessionRegistry,
	game_id: Option<String>,
	settings: &GameSettings,
) -> Result<String> {
	let game_id = game_id
		.filter(|id| !id.trim().is_empty())
		.unwrap_or_else(|| Uuid::new_v4().to_string());
	let engine = registry.get_or_create(&game_id);

	engine.set_board_size(BOARD_SIZE).await?;
	info!(target = "gtp.game", game_id = %game_id, size = BOARD_SIZE, "set board size");

	engine.clear_board().await?;
	info!(target = "gtp.game", game_id = %game_id, "cleared board");

	engine.set_rules(&settings.rules).await?;
	info!(target = "gtp.game", game_id = %game_id, rules = %settings.rules, "set rules");

	engine.set_komi(settings.komi).await?;
	info!(target = "gtp.game", game_id = %game_id, komi = settings.komi, "set komi");

	engine.configure_difficulty(&settings.difficulty).await?;
	info!(target = "gtp.game", game_id = %game_id, "configured difficulty");

	Ok(game_id)
}

/// Plays the human move, then asks the engine to answer as the other color.
pub async fn play_move(
	registry: &SessionRegistry,
	game_id: &str,
	human_move: Move,
	human: Color,
) -> Result<MoveOutcome> {
	match human_move {
		Move::Stone(point) if !point.within(BOARD_SIZE) => {
			return Err(VertexError::OffBoard {
				vertex: point.to_string(),
				size: BOARD_SIZE,
			}
			.into());
		}
		Move::Resign => {
			return Err(Error::InvalidArgument("resign is not a playable move".to_string()));
		}
		_ => {}
	}

	let engine = registry.get_or_create(game_id);
	engine.play(human, human_move).await?;
	info!(target = "gtp.game", game_id, color = %human, mv = %human_move, "human move");

	let engine_move = generate(&engine, game_id, human.opponent()).await?;
	Ok(MoveOutcome {
		game_id: game_id.to_string(),
		player: human_move,
		engine: engine_move,
	})
}

/// Asks the engine to move for `color`, e.g. to open when the human is white.
pub async fn engine_move(registry: &SessionRegistry, game_id: &str, color: Color) -> Result<Move> {
	let engine = registry.get_or_create(game_id);
	generate(&engine, game_id, color).await
}

async fn generate(engine: &GtpClient, game_id: &str, color: Color) -> Result<Move> {
	let reply = engine.genmove(color).await?;
	let mv = Move::parse_on_board(&reply, BOARD_SIZE)?;
	info!(target = "gtp.game", game_id, color = %color, mv = %mv, "engine move");
	Ok(mv)
}

#[cfg(test)]
mod tests {
	use gtp_protocol::Point;

	use super::*;

	#[test]
	fn outcome_serializes_engine_move_as_ai() {
		let outcome = MoveOutcome {
			game_id: "g1".to_string(),
			player: Move::Stone(Point::new(3, 3)),
			engine: Move::Pass,
		};
		let json = serde_json::to_value(&outcome).unwrap();
		assert_eq!(
			json,
			serde_json::json!({
				"gameId": "g1",
				"player": {"kind": "stone", "x": 3, "y": 3},
				"ai": {"kind": "pass"},
			})
		);
	}

	#[tokio::test]
	async fn off_board_human_move_is_rejected_before_any_engine_exists() {
		let registry = SessionRegistry::new(|_: &str| -> GtpClient {
			panic!("no engine should be created")
		});

		let result = play_move(&registry, "g1", Move::Stone(Point::new(19, 0)), Color::Black).await;
		assert!(matches!(result, Err(Error::InvalidVertex(VertexError::OffBoard { size: 19, .. }))));

		let result = play_move(&registry, "g1", Move::Resign, Color::Black).await;
		assert!(matches!(result, Err(Error::InvalidArgument(_))));
		assert!(registry.is_empty());
	}
}
