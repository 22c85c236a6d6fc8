//! Board points and their GTP vertex notation.
//!
//! The UI addresses intersections with zero-indexed `(x, y)` grid coordinates.
//! GTP names the same intersection with a column letter followed by a
//! one-indexed row number, e.g. `D4`. Column letters run from `A` and skip `I`,
//! so column index 8 is `J`.
//!
//! # Main Types
//!
//! - [`Point`] - A zero-indexed board intersection
//! - [`Move`] - A stone placement, a pass, or a resignation
//! - [`VertexError`] - Why a vertex string could not be decoded

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The letter GTP never uses for a column.
const SKIPPED_COLUMN: u8 = b'I';

/// Number of usable column letters (`A`-`Z` without `I`).
pub const MAX_COLUMNS: u32 = 25;

/// Errors produced when decoding a vertex string.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VertexError {
	#[error("empty vertex")]
	Empty,

	#[error("invalid column letter '{0}'")]
	InvalidColumn(char),

	#[error("column index {0} has no GTP letter")]
	ColumnOutOfRange(u32),

	#[error("invalid row in vertex '{0}'")]
	InvalidRow(String),

	#[error("vertex {vertex} is outside a {size}x{size} board")]
	OffBoard { vertex: String, size: u32 },
}

/// A zero-indexed board intersection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Point {
	pub x: u32,
	pub y: u32,
}

impl Point {
	pub const fn new(x: u32, y: u32) -> Self {
		Self { x, y }
	}

	/// Returns true if this point lies on a square board with `size` lines.
	pub fn within(&self, size: u32) -> bool {
		self.x < size && self.y < size
	}

	/// One-indexed row number, widened so `u32::MAX` still has a successor.
	fn row(&self) -> u64 {
		u64::from(self.y) + 1
	}

	/// Renders this point as a GTP vertex.
	///
	/// Fails only for columns past `Z`; see [`MAX_COLUMNS`].
	pub fn to_vertex(&self) -> Result<String, VertexError> {
		Ok(format!("{}{}", column_letter(self.x)?, self.row()))
	}
}

impl fmt::Display for Point {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match column_letter(self.x) {
			Ok(letter) => write!(f, "{}{}", letter, self.row()),
			Err(_) => write!(f, "({}, {})", self.x, self.y),
		}
	}
}

impl FromStr for Point {
	type Err = VertexError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		gtp_to_coords(s)
	}
}

fn column_letter(x: u32) -> Result<char, VertexError> {
	if x >= MAX_COLUMNS {
		return Err(VertexError::ColumnOutOfRange(x));
	}
	let offset = if x >= u32::from(SKIPPED_COLUMN - b'A') { x + 1 } else { x };
	// offset < 26 so the cast cannot truncate
	Ok(char::from(b'A' + offset as u8))
}

fn column_index(letter: char) -> Result<u32, VertexError> {
	let upper = letter.to_ascii_uppercase();
	if !upper.is_ascii_uppercase() || upper == char::from(SKIPPED_COLUMN) {
		return Err(VertexError::InvalidColumn(letter));
	}
	let raw = upper as u32 - u32::from(b'A');
	if upper > char::from(SKIPPED_COLUMN) {
		Ok(raw - 1)
	} else {
		Ok(raw)
	}
}

/// Converts grid coordinates to a GTP vertex such as `"D4"`.
///
/// Columns past `Z` have no letter. For those the result is the display form
/// `"(x, y)"`, which is not a vertex and must not be sent to an engine; use
/// [`Point::to_vertex`] when `x` is not known to be below [`MAX_COLUMNS`].
pub fn coords_to_gtp(x: u32, y: u32) -> String {
	Point::new(x, y).to_string()
}

/// Converts a GTP vertex such as `"Q16"` back to grid coordinates.
///
/// Engine output is validated rather than trusted: empty strings, bad column
/// letters (including `I`), and missing, non-numeric, or zero rows are errors.
pub fn gtp_to_coords(vertex: &str) -> Result<Point, VertexError> {
	let vertex = vertex.trim();
	let mut chars = vertex.chars();
	let letter = chars.next().ok_or(VertexError::Empty)?;
	let x = column_index(letter)?;

	let row = chars.as_str();
	if row.is_empty() || !row.bytes().all(|b| b.is_ascii_digit()) {
		return Err(VertexError::InvalidRow(vertex.to_string()));
	}
	let y = match row.parse::<u32>() {
		Ok(row) if row >= 1 => row - 1,
		_ => return Err(VertexError::InvalidRow(vertex.to_string())),
	};

	Ok(Point { x, y })
}

/// A move as it appears in `play` arguments and `genmove` replies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Move {
	Stone(Point),
	Pass,
	Resign,
}

impl Move {
	/// Decodes an engine move and checks it fits a `size`-line board.
	pub fn parse_on_board(text: &str, size: u32) -> Result<Self, VertexError> {
		let mv: Move = text.parse()?;
		if let Move::Stone(point) = mv {
			if !point.within(size) {
				return Err(VertexError::OffBoard {
					vertex: text.trim().to_string(),
					size,
				});
			}
		}
		Ok(mv)
	}

	pub fn point(&self) -> Option<Point> {
		match self {
			Move::Stone(point) => Some(*point),
			Move::Pass | Move::Resign => None,
		}
	}
}

impl From<Point> for Move {
	fn from(point: Point) -> Self {
		Move::Stone(point)
	}
}

impl fmt::Display for Move {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Move::Stone(point) => point.fmt(f),
			Move::Pass => f.write_str("pass"),
			Move::Resign => f.write_str("resign"),
		}
	}
}

impl FromStr for Move {
	type Err = VertexError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let s = s.trim();
		if s.eq_ignore_ascii_case("pass") {
			Ok(Move::Pass)
		} else if s.eq_ignore_ascii_case("resign") {
			Ok(Move::Resign)
		} else {
			gtp_to_coords(s).map(Move::Stone)
		}
	}
}
