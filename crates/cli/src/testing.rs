//! Scripted in-memory engines for testing commands without a real engine.

use std::sync::{Arc, Mutex};

use gtp_runtime::{GtpClient, SessionRegistry};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, duplex};

/// Command lines received by every engine the registry created, in order.
pub type Transcript = Arc<Mutex<Vec<String>>>;

/// Registry whose engines answer `genmove` from `genmove_replies` in turn
/// (repeating the last one), any `play` at `A1` with an illegal-move failure,
/// and everything else with an empty success.
pub fn mock_registry(genmove_replies: &'static [&'static str]) -> (SessionRegistry, Transcript) {
	let transcript: Transcript = Arc::new(Mutex::new(Vec::new()));
	let seen = Arc::clone(&transcript);

	let registry = SessionRegistry::new(move |_game_id: &str| {
		let (engine_stdin, client_writer) = duplex(4096);
		let (client_reader, mut engine_stdout) = duplex(4096);
		let seen = Arc::clone(&seen);

		tokio::spawn(async move {
			let mut genmoves = 0;
			let mut lines = BufReader::new(engine_stdin).lines();
			while let Ok(Some(line)) = lines.next_line().await {
				let (id, body) = line.split_once(' ').unwrap();
				let reply = if body.starts_with("genmove") {
					let mv = genmove_replies
						.get(genmoves)
						.or(genmove_replies.last())
						.copied()
						.unwrap_or("pass");
					genmoves += 1;
					format!("={id} {mv}\n\n")
				} else if body.starts_with("play") && body.ends_with(" A1") {
					format!("?{id} illegal move\n\n")
				} else {
					format!("={id}\n\n")
				};
				seen.lock().unwrap().push(line.clone());
				if engine_stdout.write_all(reply.as_bytes()).await.is_err() {
					break;
				}
			}
		});

		GtpClient::connect(client_writer, client_reader, None)
	});

	(registry, transcript)
}

pub fn transcript_lines(transcript: &Transcript) -> Vec<String> {
	transcript.lock().unwrap().clone()
}
