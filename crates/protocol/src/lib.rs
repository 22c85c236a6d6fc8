//! Wire types for the Go Text Protocol.
//!
//! This crate holds the pure, I/O-free pieces of a GTP client: the vertex
//! codec between grid coordinates and GTP notation, the outbound command
//! grammar, and the classification of inbound reply lines.
//!
//! Process management and request/response correlation live in `gtp-runtime`.

pub mod command;
pub mod reply;
pub mod vertex;

pub use command::{Color, Command};
pub use reply::{ReplyLine, Status, parse_line};
pub use vertex::{MAX_COLUMNS, Move, Point, VertexError, coords_to_gtp, gtp_to_coords};
