//! `gtp play`: one interactive game.
//!
//! Each input line is a vertex (`D4`), an `x,y` pair of zero-based
//! coordinates, `pass`, or `quit`. Every event is printed as one JSON line.

use std::io::Write;

use anyhow::{Context, bail};
use gtp_protocol::{Color, Move, Point};
use gtp_runtime::{SessionRegistry, engine_move, play_move, start_game};
use serde_json::{Value, json};
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::{info, warn};

use crate::cli::PlayArgs;
use crate::error::{CliError, Result};

pub async fn execute<R, W>(registry: &SessionRegistry, args: &PlayArgs, reader: R, out: &mut W) -> Result<()>
where
	R: AsyncBufRead + Unpin,
	W: Write,
{
	let human: Color = args.human.into();
	let game_id = start_game(registry, args.game_id.clone(), &args.game.to_settings()).await?;
	emit(out, &json!({ "gameId": game_id, "human": human }))?;

	if human == Color::White {
		let mv = engine_move(registry, &game_id, Color::Black).await?;
		emit(out, &json!({ "gameId": game_id, "ai": mv }))?;
	}

	let mut lines = reader.lines();
	while let Some(line) = lines.next_line().await? {
		let text = line.trim();
		if text.is_empty() {
			continue;
		}
		if text.eq_ignore_ascii_case("quit") || text.eq_ignore_ascii_case("exit") {
			break;
		}

		let human_move = match parse_move_input(text) {
			Ok(mv) => mv,
			Err(e) => {
				emit_error(out, &CliError::InvalidInput(format!("{e:#}")))?;
				continue;
			}
		};

		match play_move(registry, &game_id, human_move, human).await {
			Ok(outcome) => {
				emit(out, &serde_json::to_value(&outcome)?)?;
				if outcome.engine == Move::Resign {
					info!(target = "gtp.cli", game_id = %game_id, "engine resigned");
					break;
				}
			}
			Err(e) if e.is_disconnected() => return Err(e.into()),
			Err(e) => {
				warn!(target = "gtp.cli", game_id = %game_id, error = %e, "move failed");
				emit_error(out, &e.into())?;
			}
		}
	}

	registry.remove(&game_id).await;
	Ok(())
}

/// Accepts `D4`, `3,3`, or `pass`.
pub fn parse_move_input(text: &str) -> anyhow::Result<Move> {
	if let Some((x, y)) = text.split_once(',') {
		let x: u32 = x
			.trim()
			.parse()
			.with_context(|| format!("invalid x coordinate '{}'", x.trim()))?;
		let y: u32 = y
			.trim()
			.parse()
			.with_context(|| format!("invalid y coordinate '{}'", y.trim()))?;
		return Ok(Move::Stone(Point::new(x, y)));
	}

	let mv: Move = text
		.parse()
		.with_context(|| format!("'{text}' is not a vertex, an x,y pair, or pass"))?;
	if mv == Move::Resign {
		bail!("type quit to leave the game");
	}
	Ok(mv)
}

fn emit<W: Write>(out: &mut W, value: &Value) -> Result<()> {
	writeln!(out, "{value}")?;
	out.flush()?;
	Ok(())
}

fn emit_error<W: Write>(out: &mut W, err: &CliError) -> Result<()> {
	emit(out, &json!({ "error": { "code": err.code(), "message": err.to_string() } }))
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::cli::{GameArgs, HumanColor};
	use crate::testing::{mock_registry, transcript_lines};

	fn play_args(human: HumanColor) -> PlayArgs {
		PlayArgs {
			game_id: Some("local".to_string()),
			human,
			game: GameArgs {
				rules: "tromp-taylor".to_string(),
				komi: 7.5,
				max_visits: None,
				max_time: None,
				playout_advantage: None,
				human_profile: None,
			},
		}
	}

	async fn run_play(registry: &SessionRegistry, human: HumanColor, input: &str) -> Vec<Value> {
		let mut out = Vec::new();
		execute(registry, &play_args(human), input.as_bytes(), &mut out)
			.await
			.unwrap();
		String::from_utf8(out)
			.unwrap()
			.lines()
			.map(|line| serde_json::from_str(line).unwrap())
			.collect()
	}

	#[test]
	fn parses_each_input_form() {
		assert_eq!(parse_move_input("D4").unwrap(), Move::Stone(Point::new(3, 3)));
		assert_eq!(parse_move_input("q16").unwrap(), Move::Stone(Point::new(15, 15)));
		assert_eq!(parse_move_input("3, 15").unwrap(), Move::Stone(Point::new(3, 15)));
		assert_eq!(parse_move_input("PASS").unwrap(), Move::Pass);

		assert!(parse_move_input("resign").is_err());
		assert!(parse_move_input("I5").is_err());
		let err = parse_move_input("3,x").unwrap_err();
		assert!(format!("{err:#}").contains("invalid y coordinate 'x'"));
	}

	#[tokio::test]
	async fn plays_moves_until_quit() {
		let (registry, transcript) = mock_registry(&["Q16", "R4"]);
		let output = run_play(&registry, HumanColor::Black, "D4\n\nnonsense\n16,3\nquit\nD5\n").await;

		assert_eq!(output[0], json!({ "gameId": "local", "human": "black" }));
		assert_eq!(output[1]["ai"], json!({"kind": "stone", "x": 15, "y": 15}));
		assert_eq!(output[2]["error"]["code"], "INVALID_INPUT");
		assert_eq!(output[3]["player"], json!({"kind": "stone", "x": 16, "y": 3}));
		assert_eq!(output[3]["ai"], json!({"kind": "stone", "x": 16, "y": 3}));
		assert_eq!(output.len(), 4);

		let lines = transcript_lines(&transcript);
		assert_eq!(
			&lines[7..],
			["8 play B D4", "9 genmove W", "10 play B R4", "11 genmove W"]
		);
		assert!(registry.is_empty(), "game is closed when the loop ends");
	}

	#[tokio::test]
	async fn engine_opens_for_white_and_resignation_ends_game() {
		let (registry, transcript) = mock_registry(&["D16", "resign"]);
		let output = run_play(&registry, HumanColor::White, "Q4\nQ16\n").await;

		assert_eq!(output[1]["ai"], json!({"kind": "stone", "x": 3, "y": 15}));
		assert_eq!(output[2]["ai"], json!({"kind": "resign"}));
		assert_eq!(output.len(), 3);

		let lines = transcript_lines(&transcript);
		assert_eq!(&lines[7..], ["8 genmove B", "9 play W Q4", "10 genmove B"]);
	}

	#[tokio::test]
	async fn illegal_move_is_reported_and_play_continues() {
		let (registry, _) = mock_registry(&["pass"]);
		let output = run_play(&registry, HumanColor::Black, "A1\npass\n").await;

		assert_eq!(output[1]["error"]["code"], "ENGINE_REJECTED");
		assert_eq!(output[2]["player"], json!({"kind": "pass"}));
	}
}
