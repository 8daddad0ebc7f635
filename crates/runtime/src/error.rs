//! Error types for the browser runtime.

use thiserror::Error;

/// Result type alias for runtime operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while launching, connecting to, or talking with a browser.
#[derive(Debug, Error)]
pub enum Error {
	/// No Chromium-family executable was found.
	#[error("Chromium executable not found. Install Chrome/Chromium or set RHOMBUS_CHROME")]
	BrowserNotFound,

	/// The browser process could not be started or never exposed its endpoint.
	#[error("Failed to launch browser: {0}")]
	LaunchFailed(String),

	/// Could not reach or upgrade the DevTools websocket.
	#[error("Failed to connect to DevTools endpoint: {0}")]
	ConnectionFailed(String),

	/// Websocket-level failure.
	#[error("Transport error: {0}")]
	TransportError(String),

	/// Malformed or unexpected protocol traffic.
	#[error("Protocol error: {0}")]
	ProtocolError(String),

	/// The browser answered a command with an error.
	#[error("{method} failed ({code}): {message}")]
	Remote {
		method: String,
		code: i64,
		message: String,
	},

	/// Script evaluated in the page threw.
	#[error("Evaluation failed: {0}")]
	Evaluation(String),

	#[error("I/O error: {0}")]
	Io(#[from] std::io::Error),

	#[error("JSON error: {0}")]
	Json(#[from] serde_json::Error),

	#[error("Timeout: {0}")]
	Timeout(String),

	/// The connection went away while a command was in flight.
	#[error("Channel closed unexpectedly")]
	ChannelClosed,

	/// Command aimed at a page or context that no longer exists.
	#[error("Target closed: {0}")]
	TargetClosed(String),
}

impl Error {
	/// Returns true if this is a timeout error.
	pub fn is_timeout(&self) -> bool {
		matches!(self, Error::Timeout(_))
	}

	/// Returns true if the remote target is gone.
	pub fn is_target_closed(&self) -> bool {
		match self {
			Error::TargetClosed(_) | Error::ChannelClosed => true,
			Error::Remote { message, .. } => {
				message.contains("Target closed") || message.contains("No target with given id")
			}
			_ => false,
		}
	}
}
