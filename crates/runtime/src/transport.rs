//! Websocket transport for the DevTools protocol.
//!
//! A DevTools endpoint speaks one JSON object per text frame. The transport is
//! split in two halves so the connection can write from one task while a
//! reader task forwards decoded frames into an unbounded channel.

use std::future::Future;
use std::pin::Pin;

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message as Frame;
use tokio_tungstenite::{WebSocketStream, connect_async};

use crate::error::{Error, Result};

/// Write half of a transport.
pub trait Transport: Send {
	/// Serializes and sends one message.
	fn send(&mut self, message: Value) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;
}

/// Read half of a transport.
pub trait TransportReceiver: Send {
	/// Reads frames until the peer closes, forwarding each decoded message.
	fn run(self: Box<Self>) -> Pin<Box<dyn Future<Output = Result<()>> + Send>>;
}

/// Both halves of a transport plus the channel the reader feeds.
pub struct TransportParts {
	pub sender: Box<dyn Transport>,
	pub receiver: Box<dyn TransportReceiver>,
	pub message_rx: mpsc::UnboundedReceiver<Value>,
}

/// Entry point for building websocket transports.
pub struct WebSocketTransport;

impl WebSocketTransport {
	/// Connects to a `ws://` / `wss://` DevTools URL.
	pub async fn connect(url: &str) -> Result<TransportParts> {
		let (stream, _response) = connect_async(url)
			.await
			.map_err(|e| Error::ConnectionFailed(format!("{url}: {e}")))?;
		tracing::debug!(target = "rhombus", %url, "websocket connected");
		Ok(Self::from_stream(stream))
	}

	/// Wraps an already-upgraded websocket stream.
	pub fn from_stream<S>(stream: WebSocketStream<S>) -> TransportParts
	where
		S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
	{
		let (sink, stream) = stream.split();
		let (message_tx, message_rx) = mpsc::unbounded_channel();

		TransportParts {
			sender: Box::new(WebSocketTransportSender { sink }),
			receiver: Box::new(WebSocketTransportReceiver { stream, message_tx }),
			message_rx,
		}
	}
}

pub struct WebSocketTransportSender<S> {
	sink: SplitSink<WebSocketStream<S>, Frame>,
}

impl<S> Transport for WebSocketTransportSender<S>
where
	S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
	fn send(&mut self, message: Value) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
		Box::pin(async move {
			let text = serde_json::to_string(&message)?;
			self.sink
				.send(Frame::Text(text))
				.await
				.map_err(|e| Error::TransportError(format!("Failed to write frame: {e}")))
		})
	}
}

pub struct WebSocketTransportReceiver<S> {
	stream: SplitStream<WebSocketStream<S>>,
	message_tx: mpsc::UnboundedSender<Value>,
}

impl<S> WebSocketTransportReceiver<S>
where
	S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
	/// Returns false once nobody is listening anymore.
	fn forward(&self, bytes: &[u8]) -> bool {
		match serde_json::from_slice::<Value>(bytes) {
			Ok(value) => self.message_tx.send(value).is_ok(),
			Err(e) => {
				tracing::warn!(target = "rhombus", error = %e, "dropping undecodable frame");
				true
			}
		}
	}
}

impl<S> TransportReceiver for WebSocketTransportReceiver<S>
where
	S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
	fn run(self: Box<Self>) -> Pin<Box<dyn Future<Output = Result<()>> + Send>> {
		Box::pin(async move {
			let mut this = *self;
			while let Some(frame) = this.stream.next().await {
				let frame = frame.map_err(|e| Error::TransportError(format!("Failed to read frame: {e}")))?;
				let keep_going = match frame {
					Frame::Text(text) => this.forward(text.as_bytes()),
					Frame::Binary(bytes) => this.forward(&bytes),
					Frame::Close(_) => break,
					_ => true,
				};
				if !keep_going {
					break;
				}
			}
			tracing::debug!(target = "rhombus", "websocket reader finished");
			Ok(())
		})
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use tokio_tungstenite::{accept_async, client_async};

	async fn socket_pair() -> (TransportParts, WebSocketStream<tokio::io::DuplexStream>) {
		let (client_io, server_io) = tokio::io::duplex(64 * 1024);
		let (client, server) = tokio::join!(client_async("ws://localhost/devtools", client_io), accept_async(server_io));
		let (client, _) = client.unwrap();
		(WebSocketTransport::from_stream(client), server.unwrap())
	}

	#[tokio::test]
	async fn sends_json_as_text_frames() {
		let (parts, mut server) = socket_pair().await;
		let TransportParts { mut sender, .. } = parts;

		let message = serde_json::json!({"id": 1, "method": "Browser.getVersion", "params": {}});
		sender.send(message.clone()).await.unwrap();

		match server.next().await.unwrap().unwrap() {
			Frame::Text(text) => {
				let received: Value = serde_json::from_str(&text).unwrap();
				assert_eq!(received, message);
			}
			other => panic!("expected text frame, got {other:?}"),
		}
	}

	#[tokio::test]
	async fn forwards_frames_in_order_and_skips_garbage() {
		let (parts, mut server) = socket_pair().await;
		let TransportParts {
			receiver,
			mut message_rx,
			..
		} = parts;
		let reader = tokio::spawn(receiver.run());

		server.send(Frame::Text("{\"id\":1}".into())).await.unwrap();
		server.send(Frame::Text("not json".into())).await.unwrap();
		server.send(Frame::Text("{\"method\":\"Page.loadEventFired\"}".into())).await.unwrap();

		assert_eq!(message_rx.recv().await.unwrap()["id"], 1);
		assert_eq!(message_rx.recv().await.unwrap()["method"], "Page.loadEventFired");

		server.close(None).await.unwrap();
		assert!(reader.await.unwrap().is_ok());
	}
}
