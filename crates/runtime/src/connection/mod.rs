//! GTP request/response correlation
//!
//! This module sits on top of the line transport. It handles:
//! - Assigning each command a unique, increasing identifier
//! - Correlating framed reply lines with pending calls
//! - Logging and dropping banners, blank lines, and unmatched replies
//! - Failing every outstanding call once the engine is unreachable
//!
//! # Message Flow
//!
//! 1. Caller invokes [`Connection::send_command`] with the command text
//! 2. Connection assigns id `N`, registers a oneshot sender, and queues `"N text"`
//! 3. The writer task writes the line to the engine's stdin
//! 4. Caller awaits the returned [`PendingReply`]
//! 5. The read loop receives `=N payload` or `?N message` from stdout
//! 6. The pending call for `N` is removed and completed
//!
//! Step 2 happens under the pending-table lock, so ids hit the wire in
//! increasing order even with concurrent callers.


use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::task::{Context, Poll};
use std::time::Duration;

use gtp_protocol::{ReplyLine, Status, parse_line};
use parking_lot::Mutex;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::Sleep;

use crate::error::{Error, Result};
use crate::transport::{Transport, TransportParts, TransportReceiver};

type Callback = oneshot::Sender<Result<String>>;

/// Why a connection stopped accepting commands.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Closed {
	/// Output stream ended or the writer failed.
	Disconnected,
	/// Closed on purpose by [`Connection::close`].
	Shutdown,
	/// The engine process never started.
	LaunchFailed(String),
}

impl Closed {
	fn to_error(&self) -> Error {
		match self {
			Closed::Disconnected | Closed::Shutdown => Error::ChannelClosed,
			Closed::LaunchFailed(reason) => Error::LaunchFailed(reason.clone()),
		}
	}
}

/// Engine warm-up state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Readiness {
	Starting,
	Ready,
	Closed,
}

/// Pending calls keyed by the identifier text written on the wire.
#[derive(Default)]
struct PendingTable {
	calls: HashMap<String, Callback>,
	closed: Option<Closed>,
}

/// State shared with the writer task and with cancellation guards.
struct Shared {
	pending: Mutex<PendingTable>,
	readiness: watch::Sender<Readiness>,
}

impl Shared {
	fn new() -> Self {
		Self {
			pending: Mutex::new(PendingTable::default()),
			readiness: watch::channel(Readiness::Starting).0,
		}
	}

	/// Marks the connection closed and fails every outstanding call.
	///
	/// The first reason wins; later calls are no-ops.
	fn close(&self, reason: Closed) -> usize {
		let drained: Vec<(String, Callback)> = {
			let mut table = self.pending.lock();
			if table.closed.is_some() {
				return 0;
			}
			table.closed = Some(reason.clone());
			table.calls.drain().collect()
		};

		self.readiness.send_replace(Readiness::Closed);

		let failed = drained.len();
		for (id, callback) in drained {
			tracing::debug!(target = "gtp.connection", id = %id, "failing pending call on close");
			let _ = callback.send(Err(reason.to_error()));
		}
		failed
	}

	fn mark_ready(&self) {
		self.readiness.send_if_modified(|state| {
			if *state == Readiness::Starting {
				*state = Readiness::Ready;
				true
			} else {
				false
			}
		});
	}
}

/// RAII guard removing the pending call when its future is dropped unanswered.
struct CancelGuard {
	id: String,
	shared: Arc<Shared>,
	completed: bool,
}

impl CancelGuard {
	fn new(id: String, shared: Arc<Shared>) -> Self {
		Self {
			id,
			shared,
			completed: false,
		}
	}

	fn complete(&mut self) {
		self.completed = true;
	}

	fn cancel(&mut self) {
		if !self.completed {
			self.completed = true;
			self.shared.pending.lock().calls.remove(&self.id);
		}
	}
}

impl Drop for CancelGuard {
	fn drop(&mut self) {
		if self.completed {
			return;
		}
		if self.shared.pending.lock().calls.remove(&self.id).is_some() {
			tracing::debug!(target = "gtp.connection", id = %self.id, "removed abandoned pending call");
		}
	}
}

enum ReplyState {
	Waiting {
		rx: oneshot::Receiver<Result<String>>,
		guard: CancelGuard,
		timeout: Option<Duration>,
		deadline: Option<Pin<Box<Sleep>>>,
	},
	Failed(Option<Error>),
	Done,
}

/// Future of one in-flight command, returned by [`Connection::send_command`].
///
/// The call is registered and queued before this value is returned; awaiting
/// it only waits for the reply. The timeout clock starts at the first poll.
pub struct PendingReply {
	id: Option<String>,
	command: String,
	state: ReplyState,
}

impl PendingReply {
	fn failed(command: &str, error: Error) -> Self {
		Self {
			id: None,
			command: command.to_string(),
			state: ReplyState::Failed(Some(error)),
		}
	}

	/// Identifier assigned to this command, if it was sent.
	pub fn id(&self) -> Option<&str> {
		self.id.as_deref()
	}
}

impl Future for PendingReply {
	type Output = Result<String>;

	fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
		let this = &mut *self;
		let output = match &mut this.state {
			ReplyState::Done => return Poll::Ready(Err(Error::ChannelClosed)),
			ReplyState::Failed(error) => Err(error.take().unwrap_or(Error::ChannelClosed)),
			ReplyState::Waiting {
				rx,
				guard,
				timeout,
				deadline,
			} => {
				if let Poll::Ready(result) = Pin::new(rx).poll(cx) {
					guard.complete();
					result.map_err(|_| Error::ChannelClosed).and_then(|r| r)
				} else {
					let Some(limit) = *timeout else {
						return Poll::Pending;
					};
					let sleep = deadline.get_or_insert_with(|| Box::pin(tokio::time::sleep(limit)));
					if sleep.as_mut().poll(cx).is_pending() {
						return Poll::Pending;
					}
					guard.cancel();
					tracing::warn!(
						target = "gtp.connection",
						id = this.id.as_deref().unwrap_or(""),
						command = %this.command,
						timeout_ms = limit.as_millis() as u64,
						"command timed out"
					);
					Err(Error::Timeout(format!(
						"no reply to '{}' within {}ms",
						this.command,
						limit.as_millis()
					)))
				}
			}
		};
		this.state = ReplyState::Done;
		Poll::Ready(output)
	}
}

/// GTP connection to one engine process
///
/// Manages identifier assignment and reply correlation. One read loop
/// ([`Connection::run`]) resolves calls; any number of callers may send.
pub struct Connection {
	/// Last identifier handed out; the first command gets 1
	last_id: AtomicU64,
	shared: Arc<Shared>,
	/// Channel for queuing outbound lines to the writer task
	outbound_tx: mpsc::UnboundedSender<String>,
	/// Per-command timeout applied by [`PendingReply`]
	command_timeout: Option<Duration>,
	transport_sender: Mutex<Option<Box<dyn Transport>>>,
	transport_receiver: Mutex<Option<Box<dyn TransportReceiver>>>,
	message_rx: Mutex<Option<mpsc::UnboundedReceiver<String>>>,
	outbound_rx: Mutex<Option<mpsc::UnboundedReceiver<String>>>,
}

impl Connection {
	/// Creates a connection over the given transport.
	pub fn new(parts: TransportParts, command_timeout: Option<Duration>) -> Self {
		let TransportParts {
			sender,
			receiver,
			message_rx,
		} = parts;

		let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();

		Self {
			last_id: AtomicU64::new(0),
			shared: Arc::new(Shared::new()),
			outbound_tx,
			command_timeout,
			transport_sender: Mutex::new(Some(sender)),
			transport_receiver: Mutex::new(Some(receiver)),
			message_rx: Mutex::new(Some(message_rx)),
			outbound_rx: Mutex::new(Some(outbound_rx)),
		}
	}

	/// Creates a connection that was never attached to a running engine.
	///
	/// Every command fails immediately with [`Error::LaunchFailed`].
	pub fn launch_failed(reason: impl Into<String>) -> Self {
		let (outbound_tx, _) = mpsc::unbounded_channel();
		let shared = Arc::new(Shared::new());
		shared.close(Closed::LaunchFailed(reason.into()));

		Self {
			last_id: AtomicU64::new(0),
			shared,
			outbound_tx,
			command_timeout: None,
			transport_sender: Mutex::new(None),
			transport_receiver: Mutex::new(None),
			message_rx: Mutex::new(None),
			outbound_rx: Mutex::new(None),
		}
	}

	/// Sends `command` and returns the future of its reply.
	///
	/// The command is registered and queued before this returns. Text
	/// containing a line break is rejected since it would split the frame.
	pub fn send_command(&self, command: &str) -> PendingReply {
		let command = command.trim();
		if command.is_empty() {
			return PendingReply::failed(command, Error::InvalidArgument("empty command".to_string()));
		}
		if command.contains(|c| c == '\n' || c == '\r') {
			return PendingReply::failed(
				command,
				Error::InvalidArgument(format!("command contains a line break: {command:?}")),
			);
		}

		let (id, rx) = {
			let mut table = self.shared.pending.lock();
			if let Some(closed) = &table.closed {
				return PendingReply::failed(command, closed.to_error());
			}

			let id = (self.last_id.fetch_add(1, Ordering::SeqCst) + 1).to_string();
			let (tx, rx) = oneshot::channel();
			table.calls.insert(id.clone(), tx);

			if self.outbound_tx.send(format!("{id} {command}")).is_err() {
				table.calls.remove(&id);
				tracing::error!(target = "gtp.connection", "Failed to queue command: outbound channel closed");
				return PendingReply::failed(command, Error::ChannelClosed);
			}
			(id, rx)
		};

		tracing::debug!(target = "gtp.connection", id = %id, command, "sent command");

		let guard = CancelGuard::new(id.clone(), Arc::clone(&self.shared));
		PendingReply {
			id: Some(id),
			command: command.to_string(),
			state: ReplyState::Waiting {
				rx,
				guard,
				timeout: self.command_timeout,
				deadline: None,
			},
		}
	}

	/// Number of calls awaiting a reply.
	pub fn pending_count(&self) -> usize {
		self.shared.pending.lock().calls.len()
	}

	/// Identifiers of calls awaiting a reply, in increasing order.
	pub fn pending_ids(&self) -> Vec<String> {
		let mut ids: Vec<String> = self.shared.pending.lock().calls.keys().cloned().collect();
		ids.sort_by_key(|id| id.parse::<u64>().unwrap_or(u64::MAX));
		ids
	}

	pub fn is_closed(&self) -> bool {
		self.shared.pending.lock().closed.is_some()
	}

	pub fn readiness(&self) -> Readiness {
		*self.shared.readiness.borrow()
	}

	/// Marks the engine as warm; used when the process layer sees its banner.
	pub fn mark_ready(&self) {
		self.shared.mark_ready();
	}

	/// Waits until the engine has produced output or signalled readiness.
	pub async fn wait_ready(&self, timeout: Duration) -> Result<()> {
		let mut rx = self.shared.readiness.subscribe();
		let waited = tokio::time::timeout(timeout, rx.wait_for(|state| *state != Readiness::Starting)).await;
		let state = match waited {
			Ok(Ok(state)) => *state,
			Ok(Err(_)) => Readiness::Closed,
			Err(_) => {
				return Err(Error::Timeout(format!(
					"engine not ready within {}ms",
					timeout.as_millis()
				)));
			}
		};

		match state {
			Readiness::Ready => Ok(()),
			_ => Err(self.closed_error()),
		}
	}

	fn closed_error(&self) -> Error {
		self.shared
			.pending
			.lock()
			.closed
			.as_ref()
			.map(Closed::to_error)
			.unwrap_or(Error::ChannelClosed)
	}

	/// Stops accepting commands and fails every outstanding call.
	pub fn close(&self) {
		let failed = self.shared.close(Closed::Shutdown);
		tracing::debug!(target = "gtp.connection", failed, "connection closed");
	}

	/// Runs the read loop until the engine's output ends.
	///
	/// Spawns the transport reader and the writer task, then resolves pending
	/// calls from inbound lines. Returns once stdout reaches EOF, after failing
	/// whatever is still outstanding.
	pub async fn run(self: &Arc<Self>) {
		let (Some(transport_receiver), Some(mut transport_sender), Some(mut outbound_rx), Some(mut message_rx)) = (
			self.transport_receiver.lock().take(),
			self.transport_sender.lock().take(),
			self.outbound_rx.lock().take(),
			self.message_rx.lock().take(),
		) else {
			tracing::error!(target = "gtp.connection", "run() called on a connection without a transport");
			return;
		};

		let reader_handle = tokio::spawn(async move {
			if let Err(e) = transport_receiver.run().await {
				tracing::error!(target = "gtp.connection", error = %e, "transport read error");
			}
		});

		// The writer owns the engine's stdin; it stops once the connection is
		// closed so the engine sees EOF.
		let writer_shared = Arc::clone(&self.shared);
		let mut readiness_rx = self.shared.readiness.subscribe();
		let writer_handle = tokio::spawn(async move {
			loop {
				let line = tokio::select! {
					line = outbound_rx.recv() => line,
					_ = async {
						let _ = readiness_rx.wait_for(|state| *state == Readiness::Closed).await;
					} => None,
				};
				let Some(line) = line else {
					break;
				};
				if let Err(e) = transport_sender.send(line).await {
					tracing::error!(target = "gtp.connection", error = %e, "transport write error");
					writer_shared.close(Closed::Disconnected);
					break;
				}
			}
		});

		while let Some(line) = message_rx.recv().await {
			self.dispatch_line(&line);
		}

		let failed = self.shared.close(Closed::Disconnected);
		if failed > 0 {
			tracing::warn!(target = "gtp.connection", failed, "engine output ended with calls outstanding");
		} else {
			tracing::debug!(target = "gtp.connection", "engine output ended");
		}

		let _ = reader_handle.await;
		writer_handle.abort();
	}

	/// Classifies one stdout line and resolves the matching call, if any.
	pub(crate) fn dispatch_line(&self, line: &str) {
		match parse_line(line) {
			ReplyLine::Empty => {}
			ReplyLine::TooShort(text) => {
				self.shared.mark_ready();
				tracing::warn!(target = "gtp.connection", line = text, "ignoring short GTP line");
			}
			ReplyLine::Unframed(text) => {
				self.shared.mark_ready();
				tracing::debug!(target = "gtp.connection", line = text, "engine output");
			}
			ReplyLine::Framed { status, id, payload } => {
				self.shared.mark_ready();
				let callback = self.shared.pending.lock().calls.remove(id);
				let Some(callback) = callback else {
					tracing::debug!(
						target = "gtp.connection",
						id,
						payload,
						"reply for unknown or already resolved command (ignored)"
					);
					return;
				};

				let result = match status {
					Status::Success => {
						tracing::debug!(target = "gtp.connection", id, payload, "reply");
						Ok(payload.to_string())
					}
					Status::Failure => {
						tracing::debug!(target = "gtp.connection", id, payload, "failure reply");
						Err(Error::Engine {
							id: id.to_string(),
							message: payload.to_string(),
						})
					}
				};

				let _ = callback.send(result);
			}
		}
	}
}
