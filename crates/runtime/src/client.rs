//! High-level GTP client for one engine.
//!
//! [`GtpClient`] ties a [`Connection`] to the tasks that drive it and, when
//! spawned from an [`EngineConfig`], to the engine process itself.

use std::sync::Arc;
use std::time::Duration;

use gtp_protocol::{Color, Command, Move};
use parking_lot::Mutex;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::connection::{Connection, PendingReply, Readiness};
use crate::driver::EngineConfig;
use crate::error::{Error, Result};
use crate::process::{EngineProcess, LaunchedEngine, forward_stderr};
use crate::settings::Difficulty;
use crate::transport::PipeTransport;

/// GTP client bound to one engine.
pub struct GtpClient {
	connection: Arc<Connection>,
	process: Mutex<Option<EngineProcess>>,
	tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl GtpClient {
	/// Launches the engine described by `config` and starts its read loop.
	///
	/// Never fails here: if the process cannot be started the failure is
	/// logged and every command on the returned client fails with
	/// [`Error::LaunchFailed`].
	pub fn spawn(config: &EngineConfig) -> Self {
		let LaunchedEngine {
			process,
			stdin,
			stdout,
			stderr,
		} = match EngineProcess::launch(config) {
			Ok(launched) => launched,
			Err(e) => {
				error!(target = "gtp.engine", error = %e, "engine launch failed");
				let reason = match e {
					Error::LaunchFailed(reason) => reason,
					other => other.to_string(),
				};
				return Self {
					connection: Arc::new(Connection::launch_failed(reason)),
					process: Mutex::new(None),
					tasks: Mutex::new(Vec::new()),
				};
			}
		};

		let (transport, message_rx) = PipeTransport::new(stdin, stdout);
		let connection = Arc::new(Connection::new(
			transport.into_transport_parts(message_rx),
			config.command_timeout,
		));

		let stderr_task = tokio::spawn(forward_stderr(
			stderr,
			process.pid(),
			config.ready_marker.clone(),
			Arc::clone(&connection),
		));
		let run_task = Self::start(&connection);

		Self {
			connection,
			process: Mutex::new(Some(process)),
			tasks: Mutex::new(vec![run_task, stderr_task]),
		}
	}

	/// Attaches to an engine reachable through an arbitrary stream pair.
	///
	/// `writer` receives commands and `reply_reader` yields the engine's
	/// standard output.
	pub fn connect<W, R>(writer: W, reply_reader: R, command_timeout: Option<Duration>) -> Self
	where
		W: AsyncWrite + Unpin + Send + 'static,
		R: AsyncRead + Unpin + Send + 'static,
	{
		let (transport, message_rx) = PipeTransport::new(writer, reply_reader);
		let connection = Arc::new(Connection::new(
			transport.into_transport_parts(message_rx),
			command_timeout,
		));
		let run_task = Self::start(&connection);

		Self {
			connection,
			process: Mutex::new(None),
			tasks: Mutex::new(vec![run_task]),
		}
	}

	fn start(connection: &Arc<Connection>) -> JoinHandle<()> {
		let connection = Arc::clone(connection);
		tokio::spawn(async move { connection.run().await })
	}

	pub fn connection(&self) -> &Arc<Connection> {
		&self.connection
	}

	/// Sends raw command text; see [`Connection::send_command`].
	pub fn send_command(&self, command: &str) -> PendingReply {
		self.connection.send_command(command)
	}

	/// Sends a typed command and waits for its payload.
	pub async fn execute(&self, command: &Command) -> Result<String> {
		self.connection.send_command(&command.to_string()).await
	}

	pub async fn set_board_size(&self, size: u32) -> Result<()> {
		self.execute(&Command::BoardSize(size)).await.map(drop)
	}

	pub async fn set_rectangular_board_size(&self, width: u32, height: u32) -> Result<()> {
		self.execute(&Command::RectangularBoardSize { width, height })
			.await
			.map(drop)
	}

	pub async fn clear_board(&self) -> Result<()> {
		self.execute(&Command::ClearBoard).await.map(drop)
	}

	/// `kata-set-rules`; `rules` is a shorthand name or a JSON rules object.
	pub async fn set_rules(&self, rules: &str) -> Result<()> {
		self.execute(&Command::SetRules(rules.to_string())).await.map(drop)
	}

	pub async fn set_komi(&self, komi: f64) -> Result<()> {
		self.execute(&Command::Komi(komi)).await.map(drop)
	}

	/// Places a stone (or passes) for `color`.
	pub async fn play(&self, color: Color, mv: Move) -> Result<()> {
		if let Move::Stone(point) = mv {
			point.to_vertex()?;
		}
		self.execute(&Command::Play { color, mv }).await.map(drop)
	}

	/// Asks the engine to move for `color` and returns its reply, trimmed.
	///
	/// The reply is a vertex, `pass`, or `resign`.
	pub async fn genmove(&self, color: Color) -> Result<String> {
		let reply = self.execute(&Command::GenMove(color)).await?;
		Ok(reply.trim().to_string())
	}

	/// `kata-set-param <name> <value>`.
	pub async fn set_param(&self, name: &str, value: &str) -> Result<()> {
		self.execute(&Command::SetParam {
			name: name.to_string(),
			value: value.to_string(),
		})
		.await
		.map(drop)
	}

	/// Sends each present difficulty parameter, stopping at the first failure.
	///
	/// Parameters sent before a failure stay applied.
	pub async fn configure_difficulty(&self, difficulty: &Difficulty) -> Result<()> {
		for (name, value) in difficulty.params() {
			self.set_param(name, &value).await?;
		}
		Ok(())
	}

	pub fn readiness(&self) -> Readiness {
		self.connection.readiness()
	}

	pub async fn wait_ready(&self, timeout: Duration) -> Result<()> {
		self.connection.wait_ready(timeout).await
	}

	pub fn is_closed(&self) -> bool {
		self.connection.is_closed()
	}

	pub fn pid(&self) -> Option<u32> {
		self.process.lock().as_ref().and_then(EngineProcess::pid)
	}

	/// Fails outstanding calls, stops the background tasks, and kills the
	/// engine process if this client owns one.
	pub async fn shutdown(&self) -> Result<()> {
		self.connection.close();
		for task in self.tasks.lock().drain(..) {
			task.abort();
		}

		let process = self.process.lock().take();
		match process {
			Some(process) => {
				let pid = process.pid();
				process.shutdown().await?;
				info!(target = "gtp.engine", pid, "engine shut down");
			}
			None => debug!(target = "gtp.engine", "client closed"),
		}
		Ok(())
	}
}

impl Drop for GtpClient {
	fn drop(&mut self) {
		self.connection.close();
		for task in self.tasks.get_mut().drain(..) {
			task.abort();
		}
	}
}

#[cfg(test)]
mod tests {
	use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, duplex};

	use super::*;
	use crate::settings::Difficulty;

	/// Client over in-memory pipes plus a task answering every command.
	///
	/// `answer` maps a command body to the reply payload; `Err` produces a
	/// `?` failure line. Returns the client and the lines the engine saw.
	fn scripted_client(
		answer: fn(&str) -> std::result::Result<String, String>,
	) -> (GtpClient, JoinHandle<Vec<String>>) {
		let (engine_stdin, client_writer) = duplex(4096);
		let (client_reader, mut engine_stdout) = duplex(4096);

		let engine = tokio::spawn(async move {
			let mut seen = Vec::new();
			let mut lines = BufReader::new(engine_stdin).lines();
			while let Ok(Some(line)) = lines.next_line().await {
				let (id, body) = line.split_once(' ').unwrap();
				let reply = match answer(body) {
					Ok(payload) if payload.is_empty() => format!("={id}\n\n"),
					Ok(payload) => format!("={id} {payload}\n\n"),
					Err(message) => format!("?{id} {message}\n\n"),
				};
				seen.push(line);
				if engine_stdout.write_all(reply.as_bytes()).await.is_err() {
					break;
				}
			}
			seen
		});

		(GtpClient::connect(client_writer, client_reader, None), engine)
	}

	#[tokio::test]
	async fn test_convenience_ops_render_commands() {
		let (client, engine) = scripted_client(|body| match body {
			"genmove W" => Ok(" Q16 ".to_string()),
			_ => Ok(String::new()),
		});

		client.set_board_size(19).await.unwrap();
		client.set_rectangular_board_size(19, 13).await.unwrap();
		client.clear_board().await.unwrap();
		client.set_rules("japanese").await.unwrap();
		client.set_komi(6.5).await.unwrap();
		client.play(Color::Black, Move::Stone(gtp_protocol::Point::new(3, 3))).await.unwrap();
		client.play(Color::Black, Move::Pass).await.unwrap();
		assert_eq!(client.genmove(Color::White).await.unwrap(), "Q16");
		client.set_param("maxVisits", "50").await.unwrap();

		client.shutdown().await.unwrap();
		let seen = engine.await.unwrap();
		assert_eq!(
			seen,
			[
				"1 boardsize 19",
				"2 rectangular_boardsize 19 13",
				"3 clear_board",
				"4 kata-set-rules japanese",
				"5 komi 6.5",
				"6 play B D4",
				"7 play B pass",
				"8 genmove W",
				"9 kata-set-param maxVisits 50",
			]
		);
	}

	#[tokio::test]
	async fn test_configure_difficulty_stops_at_first_failure() {
		let (client, engine) = scripted_client(|body| {
			if body.starts_with("kata-set-param maxTime") {
				Err("unknown parameter".to_string())
			} else {
				Ok(String::new())
			}
		});

		let err = client.configure_difficulty(&Difficulty::default()).await.unwrap_err();
		match err {
			Error::Engine { id, message } => {
				assert_eq!(id, "2");
				assert_eq!(message, "unknown parameter");
			}
			other => panic!("Expected Engine error, got: {:?}", other),
		}

		client.shutdown().await.unwrap();
		let seen = engine.await.unwrap();
		assert_eq!(seen, ["1 kata-set-param maxVisits 10", "2 kata-set-param maxTime 0.2"]);
	}

	#[tokio::test]
	async fn test_play_rejects_unencodable_point() {
		let (client, _engine) = scripted_client(|_| Ok(String::new()));

		let result = client
			.play(Color::White, Move::Stone(gtp_protocol::Point::new(30, 0)))
			.await;
		assert!(matches!(result, Err(Error::InvalidVertex(_))));
		assert_eq!(client.connection().pending_count(), 0);
	}

	#[tokio::test]
	async fn test_shutdown_fails_later_commands() {
		let (client, _engine) = scripted_client(|_| Ok(String::new()));

		client.clear_board().await.unwrap();
		client.shutdown().await.unwrap();

		assert!(client.is_closed());
		assert!(matches!(client.clear_board().await, Err(Error::ChannelClosed)));
	}

	#[tokio::test]
	async fn test_spawn_failure_yields_closed_client() {
		let config = EngineConfig::default().with_executable("/nonexistent/gtp-engine-binary");
		let client = GtpClient::spawn(&config);

		assert!(client.is_closed());
		assert_eq!(client.pid(), None);
		let err = client.genmove(Color::Black).await.unwrap_err();
		assert!(matches!(err, Error::LaunchFailed(_)), "got {:?}", err);
		assert!(err.is_disconnected());
	}
}
