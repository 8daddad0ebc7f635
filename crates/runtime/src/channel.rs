//! Typed command proxy bound to one DevTools session.

use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::broadcast;

use rhombus_protocol::Event;

use crate::connection::Connection;
use crate::error::Result;

/// Sends commands on behalf of the browser or one attached target.
///
/// A channel without a session id talks to the browser endpoint; one created
/// with [`Channel::for_session`] routes every command to that page.
#[derive(Clone)]
pub struct Channel {
	connection: Arc<Connection>,
	session_id: Option<Arc<str>>,
}

impl Channel {
	/// Browser-level channel.
	pub fn new(connection: Arc<Connection>) -> Self {
		Self {
			connection,
			session_id: None,
		}
	}

	/// Channel bound to an attached target session.
	pub fn for_session(&self, session_id: impl Into<Arc<str>>) -> Self {
		Self {
			connection: Arc::clone(&self.connection),
			session_id: Some(session_id.into()),
		}
	}

	/// Sends a command and deserializes its result.
	pub async fn send<P: Serialize, R: DeserializeOwned>(&self, method: &str, params: P) -> Result<R> {
		let params = serde_json::to_value(params)?;
		let result = self
			.connection
			.send_message(method, params, self.session_id.as_deref())
			.await?;
		serde_json::from_value(result).map_err(Into::into)
	}

	/// Sends a command whose result is irrelevant.
	pub async fn send_no_result<P: Serialize>(&self, method: &str, params: P) -> Result<()> {
		let _: Value = self.send(method, params).await?;
		Ok(())
	}

	/// Subscribes to events; filter on [`Channel::session_id`] as needed.
	pub fn subscribe(&self) -> broadcast::Receiver<Event> {
		self.connection.subscribe()
	}

	pub fn session_id(&self) -> Option<&str> {
		self.session_id.as_deref()
	}

	pub fn connection(&self) -> &Arc<Connection> {
		&self.connection
	}
}

impl std::fmt::Debug for Channel {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Channel").field("session_id", &self.session_id).finish()
	}
}
