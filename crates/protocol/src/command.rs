//! Outbound GTP command bodies.
//!
//! A [`Command`] renders to the text that follows the identifier on the wire,
//! e.g. `play B D4`. Identifiers are assigned by the connection, not here.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::vertex::Move;

/// Stone color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Color {
	Black,
	White,
}

impl Color {
	pub fn opponent(self) -> Self {
		match self {
			Color::Black => Color::White,
			Color::White => Color::Black,
		}
	}

	/// Single-letter GTP form (`B` or `W`).
	pub fn as_gtp(self) -> &'static str {
		match self {
			Color::Black => "B",
			Color::White => "W",
		}
	}
}

impl fmt::Display for Color {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_gtp())
	}
}

/// A GTP command without its identifier.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
	/// `boardsize N`
	BoardSize(u32),
	/// `rectangular_boardsize W H`
	RectangularBoardSize { width: u32, height: u32 },
	/// `clear_board`
	ClearBoard,
	/// `kata-set-rules <rules>`, a shorthand name such as `tromp-taylor` or a JSON rules object.
	SetRules(String),
	/// `komi <value>`
	Komi(f64),
	/// `play <color> <move>`
	Play { color: Color, mv: Move },
	/// `genmove <color>`
	GenMove(Color),
	/// `kata-set-param <name> <value>`, forwarded verbatim.
	SetParam { name: String, value: String },
	/// Caller-supplied command text.
	Raw(String),
}

impl Command {
	/// Command name as it appears on the wire.
	pub fn name(&self) -> &str {
		match self {
			Command::BoardSize(_) => "boardsize",
			Command::RectangularBoardSize { .. } => "rectangular_boardsize",
			Command::ClearBoard => "clear_board",
			Command::SetRules(_) => "kata-set-rules",
			Command::Komi(_) => "komi",
			Command::Play { .. } => "play",
			Command::GenMove(_) => "genmove",
			Command::SetParam { .. } => "kata-set-param",
			Command::Raw(text) => text.split_whitespace().next().unwrap_or(""),
		}
	}
}

impl fmt::Display for Command {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Command::BoardSize(size) => write!(f, "boardsize {size}"),
			Command::RectangularBoardSize { width, height } => {
				write!(f, "rectangular_boardsize {width} {height}")
			}
			Command::ClearBoard => f.write_str("clear_board"),
			Command::SetRules(rules) => write!(f, "kata-set-rules {rules}"),
			Command::Komi(komi) => write!(f, "komi {komi}"),
			Command::Play { color, mv } => write!(f, "play {color} {mv}"),
			Command::GenMove(color) => write!(f, "genmove {color}"),
			Command::SetParam { name, value } => write!(f, "kata-set-param {name} {value}"),
			Command::Raw(text) => f.write_str(text),
		}
	}
}
