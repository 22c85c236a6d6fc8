//! Line-delimited pipe transport
//!
//! GTP is a text protocol: every command is one line on the engine's stdin and
//! every reply line arrives on its stdout. The transport owns the byte streams
//! and knows nothing about identifiers or framing beyond the newline.
//!
//! The sender and receiver halves are split so that reading and writing run as
//! independent tasks; see [`PipeTransport::into_parts`].


use std::future::Future;
use std::pin::Pin;

use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;

use crate::error::{Error, Result};

/// Writing half of a transport.
pub trait Transport: Send {
	/// Writes `line` followed by a newline and flushes.
	fn send(&mut self, line: String) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;
}

/// Reading half of a transport.
pub trait TransportReceiver: Send {
	/// Forwards lines until EOF or until the consumer goes away.
	fn run(self: Box<Self>) -> Pin<Box<dyn Future<Output = Result<()>> + Send>>;
}

/// Both halves plus the channel the receiver forwards lines into.
pub struct TransportParts {
	pub sender: Box<dyn Transport>,
	pub receiver: Box<dyn TransportReceiver>,
	pub message_rx: mpsc::UnboundedReceiver<String>,
}

/// Transport over an arbitrary writer/reader pair, usually child stdin/stdout.
pub struct PipeTransport<W, R> {
	writer: W,
	reader: BufReader<R>,
	message_tx: mpsc::UnboundedSender<String>,
}

impl<W, R> PipeTransport<W, R>
where
	W: AsyncWrite + Unpin + Send + 'static,
	R: AsyncRead + Unpin + Send + 'static,
{
	/// Creates a transport and the receiver of inbound lines.
	pub fn new(writer: W, reader: R) -> (Self, mpsc::UnboundedReceiver<String>) {
		let (message_tx, message_rx) = mpsc::unbounded_channel();
		let transport = Self {
			writer,
			reader: BufReader::new(reader),
			message_tx,
		};
		(transport, message_rx)
	}

	pub fn into_parts(self) -> (PipeTransportSender<W>, PipeTransportReceiver<R>) {
		(
			PipeTransportSender { writer: self.writer },
			PipeTransportReceiver {
				reader: self.reader,
				message_tx: self.message_tx,
			},
		)
	}

	pub fn into_transport_parts(self, message_rx: mpsc::UnboundedReceiver<String>) -> TransportParts {
		let (sender, receiver) = self.into_parts();
		TransportParts {
			sender: Box::new(sender),
			receiver: Box::new(receiver),
			message_rx,
		}
	}

	/// Reads lines in place, without splitting the transport.
	pub async fn run(&mut self) -> Result<()> {
		read_lines(&mut self.reader, &self.message_tx).await
	}
}

/// Writing half of a [`PipeTransport`].
pub struct PipeTransportSender<W> {
	writer: W,
}

impl<W> PipeTransportSender<W>
where
	W: AsyncWrite + Unpin + Send,
{
	pub async fn send(&mut self, line: String) -> Result<()> {
		let mut bytes = line.into_bytes();
		bytes.push(b'\n');
		self.writer
			.write_all(&bytes)
			.await
			.map_err(|e| Error::TransportError(format!("Failed to write command: {e}")))?;
		self.writer
			.flush()
			.await
			.map_err(|e| Error::TransportError(format!("Failed to flush command: {e}")))
	}
}

impl<W> Transport for PipeTransportSender<W>
where
	W: AsyncWrite + Unpin + Send,
{
	fn send(&mut self, line: String) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
		Box::pin(PipeTransportSender::send(self, line))
	}
}

/// Reading half of a [`PipeTransport`].
pub struct PipeTransportReceiver<R> {
	reader: BufReader<R>,
	message_tx: mpsc::UnboundedSender<String>,
}

impl<R> TransportReceiver for PipeTransportReceiver<R>
where
	R: AsyncRead + Unpin + Send + 'static,
{
	fn run(self: Box<Self>) -> Pin<Box<dyn Future<Output = Result<()>> + Send>> {
		let PipeTransportReceiver { mut reader, message_tx } = *self;
		Box::pin(async move { read_lines(&mut reader, &message_tx).await })
	}
}

/// Splits the stream on `\n`, dropping the terminator and any `\r` before it.
///
/// Invalid UTF-8 is replaced rather than treated as fatal; the connection
/// decides what a garbled line means.
async fn read_lines<R>(reader: &mut BufReader<R>, message_tx: &mpsc::UnboundedSender<String>) -> Result<()>
where
	R: AsyncRead + Unpin,
{
	let mut buf = Vec::with_capacity(256);
	loop {
		buf.clear();
		let read = reader
			.read_until(b'\n', &mut buf)
			.await
			.map_err(|e| Error::TransportError(format!("Failed to read line: {e}")))?;
		if read == 0 {
			return Ok(());
		}

		if buf.last() == Some(&b'\n') {
			buf.pop();
		}
		if buf.last() == Some(&b'\r') {
			buf.pop();
		}

		let line = String::from_utf8_lossy(&buf).into_owned();
		if message_tx.send(line).is_err() {
			// Consumer dropped; nobody is left to correlate replies.
			return Ok(());
		}
	}
}
