//! DevTools protocol message envelopes.
//!
//! Every frame on the debugger websocket is one JSON object. Commands carry an
//! `id`; the browser answers with the same `id` and either `result` or
//! `error`. Frames without an `id` are events. Commands aimed at an attached
//! page carry that target's `sessionId`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Command sent to the browser.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Request {
	pub id: u64,
	pub method: String,
	pub params: Value,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub session_id: Option<String>,
}

/// Reply to a [`Request`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Response {
	pub id: u64,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub result: Option<Value>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub error: Option<ErrorPayload>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub session_id: Option<String>,
}

/// Protocol error details.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorPayload {
	pub code: i64,
	pub message: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub data: Option<String>,
}

/// Unsolicited notification, e.g. `Page.lifecycleEvent`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
	pub method: String,
	#[serde(default)]
	pub params: Value,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub session_id: Option<String>,
}

/// Discriminated union of inbound frames.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Message {
	/// Has an `id` field
	Response(Response),
	/// Has a `method` field and no `id`
	Event(Event),
	/// Forward-compatible catch-all
	Unknown(Value),
}

/// Body of the `/json/version` discovery endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct VersionInfo {
	#[serde(rename = "webSocketDebuggerUrl")]
	pub web_socket_debugger_url: String,
	#[serde(rename = "Browser")]
	pub browser: Option<String>,
	#[serde(rename = "Protocol-Version")]
	pub protocol_version: Option<String>,
}

/// Remote object handle returned by `Runtime.evaluate` without `returnByValue`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteObject {
	#[serde(rename = "type")]
	pub kind: String,
	#[serde(default)]
	pub subtype: Option<String>,
	#[serde(default)]
	pub value: Option<Value>,
	#[serde(default)]
	pub object_id: Option<String>,
	#[serde(default)]
	pub description: Option<String>,
}

/// Exception raised while evaluating script in the page.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExceptionDetails {
	pub text: String,
	#[serde(default)]
	pub exception: Option<RemoteObject>,
}

impl ExceptionDetails {
	/// Best human-readable description of the thrown value.
	pub fn message(&self) -> String {
		self.exception
			.as_ref()
			.and_then(|e| e.description.clone())
			.unwrap_or_else(|| self.text.clone())
	}
}

/// Result of `Runtime.evaluate` / `Runtime.callFunctionOn`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluateResult {
	pub result: RemoteObject,
	#[serde(default)]
	pub exception_details: Option<ExceptionDetails>,
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn request_omits_missing_session() {
		let request = Request {
			id: 7,
			method: "Page.navigate".into(),
			params: serde_json::json!({"url": "https://example.com"}),
			session_id: None,
		};
		let json = serde_json::to_string(&request).unwrap();
		assert!(json.contains("\"id\":7"));
		assert!(!json.contains("sessionId"));
	}

	#[test]
	fn response_frame_is_recognized() {
		let json = r#"{"id": 3, "result": {"frameId": "F"}, "sessionId": "S"}"#;
		match serde_json::from_str::<Message>(json).unwrap() {
			Message::Response(response) => {
				assert_eq!(response.id, 3);
				assert_eq!(response.session_id.as_deref(), Some("S"));
				assert!(response.error.is_none());
			}
			other => panic!("expected response, got {other:?}"),
		}
	}

	#[test]
	fn error_frame_carries_code_and_message() {
		let json = r#"{"id": 4, "error": {"code": -32000, "message": "No node with given id"}}"#;
		match serde_json::from_str::<Message>(json).unwrap() {
			Message::Response(response) => {
				let error = response.error.unwrap();
				assert_eq!(error.code, -32000);
				assert_eq!(error.message, "No node with given id");
			}
			other => panic!("expected response, got {other:?}"),
		}
	}

	#[test]
	fn event_frame_is_recognized() {
		let json = r#"{"method": "Page.lifecycleEvent", "params": {"name": "load"}, "sessionId": "S"}"#;
		match serde_json::from_str::<Message>(json).unwrap() {
			Message::Event(event) => {
				assert_eq!(event.method, "Page.lifecycleEvent");
				assert_eq!(event.params["name"], "load");
			}
			other => panic!("expected event, got {other:?}"),
		}
	}

	#[test]
	fn exception_message_prefers_description() {
		let details: ExceptionDetails = serde_json::from_value(serde_json::json!({
			"text": "Uncaught",
			"exception": {"type": "object", "subtype": "error", "description": "Error: boom"}
		}))
		.unwrap();
		assert_eq!(details.message(), "Error: boom");
	}
}
