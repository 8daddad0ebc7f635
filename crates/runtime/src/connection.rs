//! Request/response correlation on top of the websocket transport.
//!
//! # Message flow
//!
//! 1. A caller invokes [`Connection::send_message`] with a method, params and
//!    an optional target session id
//! 2. The connection allocates the next id and parks a oneshot sender under it
//! 3. The request is queued for the writer task
//! 4. The dispatch loop receives the reply, looks up the id and completes the
//!    oneshot
//! 5. Frames without an id are events and go out on a broadcast channel
//!
//! Dropping a pending request future removes its parked sender so the map never
//! accumulates orphans. Once the dispatch loop has exited, new commands fail
//! with [`Error::ChannelClosed`] instead of waiting for a reply.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::task::{Context, Poll};

use parking_lot::Mutex;
use rhombus_protocol::{ErrorPayload, Event, Message, Request};
use serde_json::Value;
use tokio::sync::{broadcast, mpsc, oneshot};

use crate::error::{Error, Result};
use crate::transport::{Transport, TransportParts, TransportReceiver, WebSocketTransport};

/// Capacity of the event fan-out; slow subscribers lag instead of blocking.
const EVENT_BUFFER: usize = 1024;

type CallbackMap = Arc<Mutex<HashMap<u64, Pending>>>;

struct Pending {
	method: String,
	tx: oneshot::Sender<Result<Value>>,
}

/// Removes the parked callback if the request future is dropped early.
struct CancelGuard {
	id: u64,
	callbacks: CallbackMap,
	completed: bool,
}

impl Drop for CancelGuard {
	fn drop(&mut self) {
		if !self.completed && self.callbacks.lock().remove(&self.id).is_some() {
			tracing::debug!(target = "rhombus", id = self.id, "removed orphaned callback");
		}
	}
}

struct ResponseFuture {
	rx: oneshot::Receiver<Result<Value>>,
	guard: CancelGuard,
}

impl Future for ResponseFuture {
	type Output = Result<Value>;

	fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
		match Pin::new(&mut self.rx).poll(cx) {
			Poll::Ready(result) => {
				self.guard.completed = true;
				Poll::Ready(result.map_err(|_| Error::ChannelClosed).and_then(|r| r))
			}
			Poll::Pending => Poll::Pending,
		}
	}
}

/// DevTools connection.
///
/// Create with [`Connection::new`], spawn [`Connection::run`], then issue
/// commands from any task.
pub struct Connection {
	last_id: AtomicU64,
	closed: AtomicBool,
	callbacks: CallbackMap,
	outbound_tx: mpsc::UnboundedSender<Value>,
	events: broadcast::Sender<Event>,
	transport_sender: Mutex<Option<Box<dyn Transport>>>,
	transport_receiver: Mutex<Option<Box<dyn TransportReceiver>>>,
	message_rx: Mutex<Option<mpsc::UnboundedReceiver<Value>>>,
	outbound_rx: Mutex<Option<mpsc::UnboundedReceiver<Value>>>,
}

impl Connection {
	pub fn new(parts: TransportParts) -> Self {
		let TransportParts {
			sender,
			receiver,
			message_rx,
		} = parts;
		let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
		let (events, _) = broadcast::channel(EVENT_BUFFER);

		Self {
			last_id: AtomicU64::new(1),
			closed: AtomicBool::new(false),
			callbacks: Arc::new(Mutex::new(HashMap::new())),
			outbound_tx,
			events,
			transport_sender: Mutex::new(Some(sender)),
			transport_receiver: Mutex::new(Some(receiver)),
			message_rx: Mutex::new(Some(message_rx)),
			outbound_rx: Mutex::new(Some(outbound_rx)),
		}
	}

	/// Connects to a DevTools websocket and starts the dispatch loop in the background.
	pub async fn connect(ws_url: &str) -> Result<Arc<Self>> {
		let parts = WebSocketTransport::connect(ws_url).await?;
		let connection = Arc::new(Self::new(parts));
		let runner = Arc::clone(&connection);
		tokio::spawn(async move {
			if let Err(e) = runner.run().await {
				tracing::error!(target = "rhombus", error = %e, "connection loop failed");
			}
		});
		Ok(connection)
	}

	/// Subscribes to every event received after this call.
	pub fn subscribe(&self) -> broadcast::Receiver<Event> {
		self.events.subscribe()
	}

	/// Sends a command and awaits its result.
	///
	/// `session_id` routes the command to an attached target; [`None`] talks to
	/// the browser itself.
	pub async fn send_message(&self, method: &str, params: Value, session_id: Option<&str>) -> Result<Value> {
		let id = self.last_id.fetch_add(1, Ordering::SeqCst);
		let (tx, rx) = oneshot::channel();
		self.callbacks.lock().insert(
			id,
			Pending {
				method: method.to_string(),
				tx,
			},
		);
		let guard = CancelGuard {
			id,
			callbacks: Arc::clone(&self.callbacks),
			completed: false,
		};
		// Set before the loop clears callbacks, so an entry added after the clear is seen here.
		if self.closed.load(Ordering::SeqCst) {
			return Err(Error::ChannelClosed);
		}

		let request = Request {
			id,
			method: method.to_string(),
			params,
			session_id: session_id.map(str::to_string),
		};
		tracing::debug!(target = "rhombus", id, method, session = ?session_id, "sending command");

		if self.outbound_tx.send(serde_json::to_value(&request)?).is_err() {
			tracing::error!(target = "rhombus", "failed to queue command: outbound channel closed");
			return Err(Error::ChannelClosed);
		}

		ResponseFuture { rx, guard }.await
	}

	/// Runs the reader, writer and dispatch loop until the socket closes.
	///
	/// Pending commands fail with [`Error::ChannelClosed`] once the loop exits.
	pub async fn run(self: &Arc<Self>) -> Result<()> {
		let taken = (
			self.transport_receiver.lock().take(),
			self.transport_sender.lock().take(),
			self.outbound_rx.lock().take(),
			self.message_rx.lock().take(),
		);
		let (Some(receiver), Some(mut sender), Some(mut outbound_rx), Some(mut message_rx)) = taken else {
			return Err(Error::ProtocolError("Connection::run() can only be called once".to_string()));
		};

		let reader = tokio::spawn(async move {
			if let Err(e) = receiver.run().await {
				tracing::error!(target = "rhombus", error = %e, "transport read error");
			}
		});

		let writer = tokio::spawn(async move {
			while let Some(message) = outbound_rx.recv().await {
				if let Err(e) = sender.send(message).await {
					tracing::error!(target = "rhombus", error = %e, "transport write error");
					break;
				}
			}
		});

		while let Some(value) = message_rx.recv().await {
			match serde_json::from_value::<Message>(value) {
				Ok(message) => {
					if let Err(e) = self.dispatch(message) {
						tracing::warn!(target = "rhombus", error = %e, "dispatch failed");
					}
				}
				Err(e) => tracing::warn!(target = "rhombus", error = %e, "failed to parse message"),
			}
		}

		self.closed.store(true, Ordering::SeqCst);
		writer.abort();
		let _ = writer.await;
		let _ = reader.await;
		self.callbacks.lock().clear();
		tracing::debug!(target = "rhombus", "connection closed");
		Ok(())
	}

	pub(crate) fn dispatch(&self, message: Message) -> Result<()> {
		match message {
			Message::Response(response) => {
				let pending = self.callbacks.lock().remove(&response.id).ok_or_else(|| {
					Error::ProtocolError(format!("Cannot find request to respond: id={}", response.id))
				})?;

				let result = match response.error {
					Some(error) => Err(remote_error(&pending.method, error)),
					None => Ok(response.result.unwrap_or(Value::Null)),
				};
				let _ = pending.tx.send(result);
				Ok(())
			}
			Message::Event(event) => {
				tracing::trace!(target = "rhombus", method = %event.method, "event");
				// No subscribers is fine.
				let _ = self.events.send(event);
				Ok(())
			}
			Message::Unknown(value) => {
				tracing::debug!(target = "rhombus", %value, "unknown frame ignored");
				Ok(())
			}
		}
	}

	#[cfg(test)]
	fn pending_count(&self) -> usize {
		self.callbacks.lock().len()
	}
}

fn remote_error(method: &str, error: ErrorPayload) -> Error {
	let message = match error.data {
		Some(data) if !data.is_empty() => format!("{} ({data})", error.message),
		_ => error.message,
	};
	Error::Remote {
		method: method.to_string(),
		code: error.code,
		message,
	}
}
