//! Error types for the smoke suite.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for suite operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by the bootstrap, the API checks, and the output validator.
#[derive(Debug, Error)]
pub enum Error {
	/// Credentials were not provided; nothing was launched.
	#[error("Missing RHOMBUS_EMAIL or RHOMBUS_PASSWORD in environment.")]
	MissingCredentials,

	#[error("Invalid configuration: {0}")]
	Config(String),

	#[error("Navigation to {url} failed: {reason}")]
	Navigation { url: String, reason: String },

	/// A mandatory step never became actionable.
	#[error("Timed out after {ms}ms waiting for {condition}")]
	Timeout { ms: u64, condition: String },

	#[error("Element not found: {0}")]
	ElementNotFound(String),

	#[error("Unknown key: {0:?}")]
	UnknownKey(String),

	/// The persisted session is missing or unreadable.
	#[error("Session artifact {path} unusable: {reason}")]
	Artifact { path: PathBuf, reason: String },

	/// The shared bootstrap failed earlier in this process.
	#[error("Session bootstrap failed: {0}")]
	Bootstrap(String),

	/// An endpoint answered outside its contract.
	#[error("Contract violated by {endpoint}: {detail}")]
	ContractViolation { endpoint: String, detail: String },

	/// The downloaded output does not look like a cleaned version of the input.
	#[error("Output validation failed: {0}")]
	Validation(String),

	#[error(transparent)]
	Runtime(#[from] rhombus_runtime::Error),

	#[error("HTTP error: {0}")]
	Http(#[from] reqwest::Error),

	#[error("I/O error: {0}")]
	Io(#[from] std::io::Error),

	#[error("JSON error: {0}")]
	Json(#[from] serde_json::Error),

	#[error("CSV error: {0}")]
	Csv(#[from] csv::Error),

	#[error("Invalid URL: {0}")]
	Url(#[from] url::ParseError),
}

impl Error {
	/// Returns true for any kind of timeout, ours or the runtime's.
	pub fn is_timeout(&self) -> bool {
		match self {
			Error::Timeout { .. } => true,
			Error::Runtime(e) => e.is_timeout(),
			Error::Http(e) => e.is_timeout(),
			_ => false,
		}
	}

	/// Returns true if the page or browser went away underneath us.
	pub fn is_target_closed(&self) -> bool {
		matches!(self, Error::Runtime(e) if e.is_target_closed())
	}

	/// Returns false when another attempt cannot change the outcome.
	pub fn is_retryable(&self) -> bool {
		!matches!(self, Error::MissingCredentials | Error::Config(_))
	}

	pub(crate) fn timeout(duration: std::time::Duration, condition: impl Into<String>) -> Self {
		Error::Timeout {
			ms: duration.as_millis() as u64,
			condition: condition.into(),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::time::Duration;

	#[test]
	fn missing_credentials_message_is_stable() {
		assert_eq!(
			Error::MissingCredentials.to_string(),
			"Missing RHOMBUS_EMAIL or RHOMBUS_PASSWORD in environment."
		);
	}

	#[test]
	fn runtime_timeouts_count_as_timeouts() {
		assert!(Error::timeout(Duration::from_secs(30), "button").is_timeout());
		assert!(Error::from(rhombus_runtime::Error::Timeout("x".into())).is_timeout());
		assert!(!Error::MissingCredentials.is_timeout());
	}

	#[test]
	fn setup_problems_are_not_retryable() {
		assert!(!Error::MissingCredentials.is_retryable());
		assert!(!Error::Config("bad url".into()).is_retryable());
		assert!(Error::timeout(Duration::from_secs(1), "button").is_retryable());
	}
}
