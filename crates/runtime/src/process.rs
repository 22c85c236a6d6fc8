//! GTP engine process management
//!
//! Launches the engine in GTP mode with piped stdio and supervises it:
//! stderr is logged line by line, exit is observed and logged, and the
//! process is killed on shutdown or when its handle is dropped.

use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, ChildStderr, ChildStdin, ChildStdout, Command};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::connection::Connection;
use crate::driver::EngineConfig;
use crate::error::{Error, Result};

/// How long [`EngineProcess::shutdown`] waits for the process to be reaped.
const SHUTDOWN_WAIT: Duration = Duration::from_secs(5);

/// A freshly spawned engine with its stdio handles.
pub struct LaunchedEngine {
	pub process: EngineProcess,
	pub stdin: ChildStdin,
	pub stdout: ChildStdout,
	pub stderr: ChildStderr,
}

/// Handle to a running engine process.
///
/// The child itself is owned by a supervisor task; this handle only asks it
/// to stop. Dropping the handle also stops the process.
#[derive(Debug)]
pub struct EngineProcess {
	pid: Option<u32>,
	kill_tx: Option<oneshot::Sender<()>>,
	supervisor: Option<JoinHandle<()>>,
}

impl EngineProcess {
	/// Spawns `<executable> gtp -model <model> -config <config>`.
	///
	/// # Errors
	///
	/// Returns `Error::LaunchFailed` if the process cannot be started.
	pub fn launch(config: &EngineConfig) -> Result<LaunchedEngine> {
		let mut cmd = Command::new(&config.executable);
		cmd.args(config.args())
			.stdin(Stdio::piped())
			.stdout(Stdio::piped())
			.stderr(Stdio::piped())
			.kill_on_drop(true);
		if let Some(dir) = &config.working_dir {
			cmd.current_dir(dir);
		}

		let mut child = cmd.spawn().map_err(|e| {
			Error::LaunchFailed(format!("Failed to spawn {}: {}", config.executable.display(), e))
		})?;

		let (Some(stdin), Some(stdout), Some(stderr)) = (child.stdin.take(), child.stdout.take(), child.stderr.take())
		else {
			return Err(Error::LaunchFailed("engine stdio was not piped".to_string()));
		};

		let pid = child.id();
		info!(
			target = "gtp.engine",
			pid,
			executable = %config.executable.display(),
			model = %config.model.display(),
			config = %config.config.display(),
			"engine started"
		);

		let (kill_tx, kill_rx) = oneshot::channel();
		let supervisor = tokio::spawn(supervise(child, pid, kill_rx));

		Ok(LaunchedEngine {
			process: Self {
				pid,
				kill_tx: Some(kill_tx),
				supervisor: Some(supervisor),
			},
			stdin,
			stdout,
			stderr,
		})
	}

	pub fn pid(&self) -> Option<u32> {
		self.pid
	}

	/// Kills the process and waits for it to be reaped.
	pub async fn shutdown(mut self) -> Result<()> {
		if let Some(kill_tx) = self.kill_tx.take() {
			let _ = kill_tx.send(());
		}
		let Some(supervisor) = self.supervisor.take() else {
			return Ok(());
		};

		match tokio::time::timeout(SHUTDOWN_WAIT, supervisor).await {
			Ok(_) => Ok(()),
			Err(_) => Err(Error::Timeout(format!(
				"engine {:?} not reaped after {}s",
				self.pid,
				SHUTDOWN_WAIT.as_secs()
			))),
		}
	}
}

impl Drop for EngineProcess {
	fn drop(&mut self) {
		if let Some(kill_tx) = self.kill_tx.take() {
			let _ = kill_tx.send(());
		}
	}
}

/// Owns the child until it exits on its own or is told to stop.
async fn supervise(mut child: Child, pid: Option<u32>, kill_rx: oneshot::Receiver<()>) {
	tokio::select! {
		status = child.wait() => match status {
			Ok(status) if status.success() => info!(target = "gtp.engine", pid, "engine exited"),
			Ok(status) => warn!(target = "gtp.engine", pid, %status, "engine exited abnormally"),
			Err(e) => warn!(target = "gtp.engine", pid, error = %e, "failed to wait for engine"),
		},
		_ = kill_rx => {
			if let Err(e) = child.kill().await {
				warn!(target = "gtp.engine", pid, error = %e, "failed to kill engine");
			} else {
				debug!(target = "gtp.engine", pid, "engine killed");
			}
		}
	}
}

/// Logs every stderr line; a line containing `ready_marker` marks the
/// connection ready. Nothing on stderr takes part in reply correlation.
pub(crate) async fn forward_stderr(
	stderr: ChildStderr,
	pid: Option<u32>,
	ready_marker: Option<String>,
	connection: Arc<Connection>,
) {
	let mut lines = BufReader::new(stderr).lines();
	loop {
		match lines.next_line().await {
			Ok(Some(line)) => {
				debug!(target = "gtp.engine", pid, line = %line, "stderr");
				if ready_marker.as_deref().is_some_and(|marker| line.contains(marker)) {
					info!(target = "gtp.engine", pid, "engine ready");
					connection.mark_ready();
				}
			}
			Ok(None) => break,
			Err(e) => {
				warn!(target = "gtp.engine", pid, error = %e, "failed to read engine stderr");
				break;
			}
		}
	}
}
