//! HTTP checks against the app's API.
//!
//! The authenticated client replays cookies from the session artifact on each
//! request; the anonymous one sends none. Contract checks are plain functions
//! so the CLI and the integration tests share them.

use std::time::Duration;

use reqwest::header::{COOKIE, HeaderValue};
use rhombus_protocol::StorageState;
use serde_json::Value;
use url::Url;

use crate::config::SuiteConfig;
use crate::error::{Error, Result};

/// A received response, body fully read.
#[derive(Debug, Clone)]
pub struct ApiResponse {
	pub url: Url,
	pub status: u16,
	pub body: String,
}

impl ApiResponse {
	/// Parses the body as JSON.
	pub fn json(&self) -> Result<Value> {
		Ok(serde_json::from_str(&self.body)?)
	}
}

/// HTTP client rooted at the app's base URL.
#[derive(Debug, Clone)]
pub struct ApiClient {
	http: reqwest::Client,
	base_url: Url,
	state: Option<StorageState>,
}

impl ApiClient {
	/// Client that sends the cookies of `state` matching each request URL.
	pub fn authenticated(config: &SuiteConfig, state: StorageState) -> Result<Self> {
		Self::build(config.base_url.clone(), config.timeouts.expect, Some(state))
	}

	/// Client with no session at all.
	pub fn anonymous(config: &SuiteConfig) -> Result<Self> {
		Self::build(config.base_url.clone(), config.timeouts.expect, None)
	}

	fn build(base_url: Url, timeout: Duration, state: Option<StorageState>) -> Result<Self> {
		let http = reqwest::Client::builder()
			.timeout(timeout)
			.user_agent(concat!("rhombus-smoke/", env!("CARGO_PKG_VERSION")))
			.build()?;
		Ok(Self { http, base_url, state })
	}

	pub fn is_authenticated(&self) -> bool {
		self.state.is_some()
	}

	/// `GET {base_url}{path}`.
	pub async fn get(&self, path: &str) -> Result<ApiResponse> {
		let url = self.base_url.join(path)?;
		let mut request = self.http.get(url.clone());
		if let Some(header) = self.cookie_header(&url) {
			request = request.header(COOKIE, header);
		}

		let response = request.send().await?;
		let status = response.status().as_u16();
		let body = response.text().await?;
		tracing::debug!(target = "rhombus", %url, status, bytes = body.len(), "GET");
		Ok(ApiResponse { url, status, body })
	}

	fn cookie_header(&self, url: &Url) -> Option<HeaderValue> {
		let now = chrono::Utc::now().timestamp_millis() as f64 / 1000.0;
		let header = self.state.as_ref()?.cookie_header(url, now)?;
		match HeaderValue::from_str(&header) {
			Ok(value) => Some(value),
			Err(e) => {
				tracing::warn!(target = "rhombus", error = %e, "cookie header not representable; sending none");
				None
			}
		}
	}
}

/// JavaScript truthiness of a JSON value.
///
/// Objects and arrays are truthy even when empty.
pub fn is_truthy(value: &Value) -> bool {
	match value {
		Value::Null => false,
		Value::Bool(b) => *b,
		Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
		Value::String(s) => !s.is_empty(),
		Value::Array(_) | Value::Object(_) => true,
	}
}

fn violation(response: &ApiResponse, detail: impl Into<String>) -> Error {
	Error::ContractViolation {
		endpoint: response.url.path().to_string(),
		detail: detail.into(),
	}
}

/// An authenticated `GET` answers 200 with a truthy JSON body.
pub async fn check_authenticated(client: &ApiClient, path: &str) -> Result<Value> {
	let response = client.get(path).await?;
	if response.status != 200 {
		return Err(violation(&response, format!("expected status 200, got {}", response.status)));
	}
	let body = response
		.json()
		.map_err(|e| violation(&response, format!("body is not JSON: {e}")))?;
	if !is_truthy(&body) {
		return Err(violation(&response, format!("expected a truthy body, got {body}")));
	}
	Ok(body)
}

/// An anonymous `GET` is refused with 401 or 403.
pub async fn check_unauthenticated(client: &ApiClient, path: &str) -> Result<u16> {
	let response = client.get(path).await?;
	match response.status {
		401 | 403 => Ok(response.status),
		other => Err(violation(&response, format!("expected status 401 or 403, got {other}"))),
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use serde_json::json;

	#[test]
	fn truthiness_follows_javascript() {
		for falsy in [json!(null), json!(false), json!(0), json!(0.0), json!("")] {
			assert!(!is_truthy(&falsy), "{falsy} should be falsy");
		}
		for truthy in [json!({}), json!([]), json!(1), json!("x"), json!(true), json!({"id": 7})] {
			assert!(is_truthy(&truthy), "{truthy} should be truthy");
		}
	}

	#[test]
	fn anonymous_clients_send_no_cookies() {
		let client = ApiClient::anonymous(&SuiteConfig::default()).unwrap();
		assert!(!client.is_authenticated());
		let url = Url::parse("https://rhombusai.com/api/me").unwrap();
		assert!(client.cookie_header(&url).is_none());
	}

	#[test]
	fn authenticated_clients_scope_cookies_to_the_url() {
		let state = StorageState::with_cookies(vec![
			rhombus_protocol::Cookie::new("sid", "abc", ".rhombusai.com").path("/"),
			rhombus_protocol::Cookie::new("other", "x", "example.com").path("/"),
		]);
		let client = ApiClient::authenticated(&SuiteConfig::default(), state).unwrap();
		let url = Url::parse("https://rhombusai.com/api/me").unwrap();
		assert_eq!(client.cookie_header(&url).unwrap(), "sid=abc");
	}
}
