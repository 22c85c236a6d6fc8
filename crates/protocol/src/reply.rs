//! Inbound reply-line framing.
//!
//! Every line the engine prints on stdout goes through [`parse_line`]. Only
//! framed lines (`=id payload` or `?id payload`) take part in correlation;
//! banners, diagnostics, and the blank line that terminates each GTP response
//! are classified so the caller can log and drop them.

/// Outcome marker of a framed reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
	/// `=`
	Success,
	/// `?`
	Failure,
}

/// Classification of one stdout line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplyLine<'a> {
	/// Blank after trimming.
	Empty,
	/// One character; too short to hold a marker and an identifier.
	TooShort(&'a str),
	/// Does not start with `=` or `?`.
	Unframed(&'a str),
	/// A correlated reply.
	Framed {
		status: Status,
		/// Raw identifier text; compared as text, never parsed.
		id: &'a str,
		/// Everything after the first space, possibly empty.
		payload: &'a str,
	},
}

/// Classifies a raw stdout line.
pub fn parse_line(line: &str) -> ReplyLine<'_> {
	let trimmed = line.trim();
	if trimmed.is_empty() {
		return ReplyLine::Empty;
	}
	if trimmed.chars().count() < 2 {
		return ReplyLine::TooShort(trimmed);
	}

	let status = match trimmed.as_bytes()[0] {
		b'=' => Status::Success,
		b'?' => Status::Failure,
		_ => return ReplyLine::Unframed(trimmed),
	};

	let rest = &trimmed[1..];
	let (id, payload) = match rest.find(' ') {
		Some(idx) => (&rest[..idx], &rest[idx + 1..]),
		None => (rest, ""),
	};

	ReplyLine::Framed { status, id, payload }
}
