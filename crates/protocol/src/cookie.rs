//! Cookie and storage state types for session persistence.
//!
//! [`StorageState`] is the on-disk session artifact: every cookie in a browser
//! context plus localStorage grouped by origin. The JSON shape matches the
//! Playwright storage-state format so files stay interchangeable with other
//! tooling.

use std::path::Path;

use serde::{Deserialize, Serialize};
use url::Url;

/// SameSite cookie attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SameSite {
	/// Sent with same-site and cross-site requests
	#[serde(rename = "None")]
	None,
	/// Sent with same-site requests and cross-site top-level navigations
	#[default]
	#[serde(rename = "Lax")]
	Lax,
	/// Only sent with same-site requests
	#[serde(rename = "Strict")]
	Strict,
}

impl SameSite {
	fn parse(value: Option<&str>) -> Self {
		match value {
			Some("Strict") => SameSite::Strict,
			Some("None") => SameSite::None,
			_ => SameSite::Lax,
		}
	}
}

/// A browser cookie as stored in the session artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cookie {
	pub name: String,
	pub value: String,

	#[serde(skip_serializing_if = "Option::is_none")]
	pub domain: Option<String>,

	#[serde(skip_serializing_if = "Option::is_none")]
	pub path: Option<String>,

	/// Unix timestamp in seconds (-1 means session cookie)
	#[serde(skip_serializing_if = "Option::is_none")]
	pub expires: Option<f64>,

	#[serde(skip_serializing_if = "Option::is_none")]
	pub http_only: Option<bool>,

	#[serde(skip_serializing_if = "Option::is_none")]
	pub secure: Option<bool>,

	#[serde(skip_serializing_if = "Option::is_none")]
	pub same_site: Option<SameSite>,

	/// URL to infer domain and path from
	#[serde(skip_serializing_if = "Option::is_none")]
	pub url: Option<String>,
}

impl Cookie {
	/// Creates a cookie for `domain`; a leading `.` extends it to subdomains.
	pub fn new(name: impl Into<String>, value: impl Into<String>, domain: impl Into<String>) -> Self {
		Self {
			name: name.into(),
			value: value.into(),
			domain: Some(domain.into()),
			path: None,
			expires: None,
			http_only: None,
			secure: None,
			same_site: None,
			url: None,
		}
	}

	/// Creates a host-only cookie whose domain and path are inferred from `url`.
	pub fn from_url(name: impl Into<String>, value: impl Into<String>, url: impl Into<String>) -> Self {
		Self {
			name: name.into(),
			value: value.into(),
			domain: None,
			path: None,
			expires: None,
			http_only: None,
			secure: None,
			same_site: None,
			url: Some(url.into()),
		}
	}

	pub fn path(mut self, path: impl Into<String>) -> Self {
		self.path = Some(path.into());
		self
	}

	pub fn expires(mut self, expires: f64) -> Self {
		self.expires = Some(expires);
		self
	}

	pub fn http_only(mut self, http_only: bool) -> Self {
		self.http_only = Some(http_only);
		self
	}

	pub fn secure(mut self, secure: bool) -> Self {
		self.secure = Some(secure);
		self
	}

	pub fn same_site(mut self, same_site: SameSite) -> Self {
		self.same_site = Some(same_site);
		self
	}

	/// Returns true if the cookie has a positive expiry at or before `now` (unix seconds).
	pub fn is_expired(&self, now: f64) -> bool {
		matches!(self.expires, Some(ts) if ts > 0.0 && ts <= now)
	}

	/// Returns true if a browser would attach this cookie to a request for `url`.
	///
	/// Follows RFC 6265 domain and path matching. Secure cookies are only sent
	/// over https, except to loopback hosts which browsers treat as secure.
	pub fn matches(&self, url: &Url, now: f64) -> bool {
		if self.is_expired(now) {
			return false;
		}

		let Some(host) = url.host_str().map(str::to_ascii_lowercase) else {
			return false;
		};

		let domain_ok = match (&self.domain, &self.url) {
			(Some(domain), _) => domain_matches(&host, domain),
			(None, Some(origin)) => Url::parse(origin)
				.ok()
				.and_then(|u| u.host_str().map(str::to_ascii_lowercase))
				.is_some_and(|h| h == host),
			(None, None) => false,
		};
		if !domain_ok {
			return false;
		}

		if !path_matches(url.path(), self.path.as_deref().unwrap_or("/")) {
			return false;
		}

		if self.secure == Some(true) && url.scheme() != "https" && !is_loopback(&host) {
			return false;
		}

		true
	}

	/// Parameters for `Storage.setCookies`. Session cookies omit `expires`.
	pub fn to_cookie_param(&self) -> serde_json::Value {
		let mut cookie = self.clone();
		if cookie.expires.is_some_and(|ts| ts < 0.0) {
			cookie.expires = None;
		}
		if cookie.domain.is_some() && cookie.path.is_none() {
			cookie.path = Some("/".to_string());
		}
		serde_json::to_value(cookie).unwrap_or_default()
	}
}

/// A leading dot marks a domain cookie; a bare domain is host-only.
fn domain_matches(host: &str, domain: &str) -> bool {
	let domain = domain.to_ascii_lowercase();
	match domain.strip_prefix('.') {
		Some(parent) => host == parent || host.ends_with(&domain),
		None => host == domain,
	}
}

fn path_matches(request_path: &str, cookie_path: &str) -> bool {
	if request_path == cookie_path {
		return true;
	}
	request_path.starts_with(cookie_path)
		&& (cookie_path.ends_with('/') || request_path[cookie_path.len()..].starts_with('/'))
}

fn is_loopback(host: &str) -> bool {
	matches!(host, "localhost" | "127.0.0.1" | "[::1]")
}

/// Cookie as reported by the DevTools `Storage.getCookies` / `Network.getAllCookies`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DevtoolsCookie {
	pub name: String,
	pub value: String,
	pub domain: String,
	pub path: String,
	/// Unix timestamp in seconds, -1 for session cookies.
	#[serde(default = "session_expiry")]
	pub expires: f64,
	#[serde(default)]
	pub http_only: bool,
	#[serde(default)]
	pub secure: bool,
	#[serde(default)]
	pub session: bool,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub same_site: Option<String>,
}

fn session_expiry() -> f64 {
	-1.0
}

impl DevtoolsCookie {
	/// Converts to the artifact [`Cookie`] format.
	///
	/// Session cookies get `expires = -1` and a missing SameSite becomes `Lax`,
	/// matching what browsers apply by default.
	pub fn to_cookie(&self) -> Cookie {
		Cookie {
			name: self.name.clone(),
			value: self.value.clone(),
			domain: Some(self.domain.clone()),
			path: Some(self.path.clone()),
			expires: Some(if self.session { -1.0 } else { self.expires }),
			http_only: Some(self.http_only),
			secure: Some(self.secure),
			same_site: Some(SameSite::parse(self.same_site.as_deref())),
			url: None,
		}
	}
}

/// A localStorage entry within an origin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalStorageEntry {
	pub name: String,
	pub value: String,
}

/// Storage state for a single origin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OriginState {
	/// The origin URL, e.g. `https://rhombusai.com`
	pub origin: String,
	pub local_storage: Vec<LocalStorageEntry>,
}

/// Complete browser storage state.
///
/// Contains every cookie and the localStorage of each origin visited, enough to
/// rebuild an authenticated browser context or HTTP client without logging in.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StorageState {
	pub cookies: Vec<Cookie>,
	pub origins: Vec<OriginState>,
}

impl StorageState {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn with_cookies(cookies: Vec<Cookie>) -> Self {
		Self {
			cookies,
			origins: Vec::new(),
		}
	}

	/// Returns true when the state carries neither cookies nor localStorage.
	pub fn is_empty(&self) -> bool {
		self.cookies.is_empty() && self.origins.iter().all(|o| o.local_storage.is_empty())
	}

	/// Loads storage state from a JSON file.
	pub fn from_file(path: impl AsRef<Path>) -> std::io::Result<Self> {
		let content = std::fs::read_to_string(path)?;
		serde_json::from_str(&content).map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
	}

	/// Saves storage state as pretty JSON, creating the parent directory if needed.
	///
	/// An existing file is replaced.
	pub fn to_file(&self, path: impl AsRef<Path>) -> std::io::Result<()> {
		let path = path.as_ref();
		if let Some(parent) = path.parent() {
			if !parent.as_os_str().is_empty() {
				std::fs::create_dir_all(parent)?;
			}
		}
		let content = serde_json::to_string_pretty(self)
			.map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
		std::fs::write(path, content)
	}

	/// Cookies a browser would send with a request to `url`.
	///
	/// Longer paths sort first, as RFC 6265 recommends for the `Cookie` header.
	pub fn cookies_for(&self, url: &Url, now: f64) -> Vec<&Cookie> {
		let mut matched: Vec<&Cookie> = self.cookies.iter().filter(|c| c.matches(url, now)).collect();
		matched.sort_by_key(|c| std::cmp::Reverse(c.path.as_deref().unwrap_or("/").len()));
		matched
	}

	/// Builds a `Cookie` request header value for `url`, or [`None`] when nothing matches.
	pub fn cookie_header(&self, url: &Url, now: f64) -> Option<String> {
		let cookies = self.cookies_for(url, now);
		if cookies.is_empty() {
			return None;
		}
		Some(
			cookies
				.iter()
				.map(|c| format!("{}={}", c.name, c.value))
				.collect::<Vec<_>>()
				.join("; "),
		)
	}

	/// localStorage entries recorded for `origin`, if any.
	pub fn local_storage(&self, origin: &str) -> Option<&[LocalStorageEntry]> {
		self.origins
			.iter()
			.find(|o| o.origin == origin)
			.map(|o| o.local_storage.as_slice())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	const NOW: f64 = 1_700_000_000.0;

	fn url(s: &str) -> Url {
		Url::parse(s).unwrap()
	}

	#[test]
	fn cookie_serializes_camel_case() {
		let cookie = Cookie::new("session", "abc", ".example.com")
			.http_only(true)
			.same_site(SameSite::Lax);

		let json = serde_json::to_string(&cookie).unwrap();
		assert!(json.contains("\"name\":\"session\""));
		assert!(json.contains("\"httpOnly\":true"));
		assert!(json.contains("\"sameSite\":\"Lax\""));
		assert!(!json.contains("\"url\""));
	}

	#[test]
	fn domain_cookie_matches_subdomains() {
		let cookie = Cookie::new("sid", "1", ".rhombusai.com");
		assert!(cookie.matches(&url("https://rhombusai.com/api/me"), NOW));
		assert!(cookie.matches(&url("https://app.rhombusai.com/"), NOW));
		assert!(!cookie.matches(&url("https://evilrhombusai.com/"), NOW));
	}

	#[test]
	fn host_only_cookie_stays_on_its_host() {
		let cookie = Cookie::new("sid", "1", "rhombusai.com");
		assert!(cookie.matches(&url("https://rhombusai.com/api/me"), NOW));
		assert!(cookie.matches(&url("https://RhombusAI.com/api/me"), NOW));
		assert!(!cookie.matches(&url("https://app.rhombusai.com/api/me"), NOW));
	}

	#[test]
	fn path_match_respects_segment_boundaries() {
		let cookie = Cookie::new("sid", "1", "example.com").path("/api");
		assert!(cookie.matches(&url("https://example.com/api"), NOW));
		assert!(cookie.matches(&url("https://example.com/api/me"), NOW));
		assert!(!cookie.matches(&url("https://example.com/apiary"), NOW));
		assert!(!cookie.matches(&url("https://example.com/"), NOW));
	}

	#[test]
	fn secure_cookie_requires_https_except_loopback() {
		let cookie = Cookie::new("sid", "1", "example.com").secure(true);
		assert!(!cookie.matches(&url("http://example.com/"), NOW));
		assert!(cookie.matches(&url("https://example.com/"), NOW));

		let local = Cookie::new("sid", "1", "localhost").secure(true);
		assert!(local.matches(&url("http://localhost:8080/api/me"), NOW));
	}

	#[test]
	fn expired_cookies_are_skipped_but_session_cookies_are_kept() {
		let expired = Cookie::new("old", "1", "example.com").expires(NOW - 10.0);
		let session = Cookie::new("tmp", "1", "example.com").expires(-1.0);
		assert!(!expired.matches(&url("https://example.com/"), NOW));
		assert!(session.matches(&url("https://example.com/"), NOW));
	}

	#[test]
	fn url_cookie_is_host_only() {
		let cookie = Cookie::from_url("sid", "1", "https://example.com");
		assert!(cookie.matches(&url("https://example.com/x"), NOW));
		assert!(!cookie.matches(&url("https://sub.example.com/x"), NOW));
	}

	#[test]
	fn cookie_header_orders_longest_path_first() {
		let state = StorageState::with_cookies(vec![
			Cookie::new("root", "a", "example.com").path("/"),
			Cookie::new("api", "b", "example.com").path("/api"),
			Cookie::new("other", "c", "other.com"),
		]);

		let header = state.cookie_header(&url("https://example.com/api/me"), NOW);
		assert_eq!(header.as_deref(), Some("api=b; root=a"));
		assert_eq!(state.cookie_header(&url("https://nowhere.org/"), NOW), None);
	}

	#[test]
	fn devtools_session_cookie_converts_with_negative_expiry() {
		let raw = serde_json::json!({
			"name": "sid",
			"value": "xyz",
			"domain": "rhombusai.com",
			"path": "/",
			"expires": 0,
			"size": 6,
			"httpOnly": true,
			"secure": true,
			"session": true,
			"priority": "Medium"
		});
		let devtools: DevtoolsCookie = serde_json::from_value(raw).unwrap();
		let cookie = devtools.to_cookie();
		assert_eq!(cookie.expires, Some(-1.0));
		assert_eq!(cookie.same_site, Some(SameSite::Lax));
		assert_eq!(cookie.http_only, Some(true));
	}

	#[test]
	fn cookie_param_drops_session_expiry_and_defaults_path() {
		let param = Cookie::new("sid", "1", "example.com").expires(-1.0).to_cookie_param();
		assert!(param.get("expires").is_none());
		assert_eq!(param["path"], "/");
	}

	#[test]
	fn to_file_creates_parent_and_overwrites() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join(".auth").join("storageState.json");

		let first = StorageState::with_cookies(vec![Cookie::new("a", "1", "example.com")]);
		first.to_file(&path).unwrap();

		let second = StorageState {
			cookies: vec![Cookie::new("b", "2", "example.com")],
			origins: vec![OriginState {
				origin: "https://example.com".into(),
				local_storage: vec![LocalStorageEntry {
					name: "token".into(),
					value: "t".into(),
				}],
			}],
		};
		second.to_file(&path).unwrap();

		let loaded = StorageState::from_file(&path).unwrap();
		assert_eq!(loaded, second);
		assert_eq!(loaded.local_storage("https://example.com").map(<[_]>::len), Some(1));
	}

	#[test]
	fn empty_state_is_detected() {
		assert!(StorageState::new().is_empty());
		let with_origin_only = StorageState {
			cookies: vec![],
			origins: vec![OriginState {
				origin: "https://example.com".into(),
				local_storage: vec![],
			}],
		};
		assert!(with_origin_only.is_empty());
	}
}
