//! Suite configuration.
//!
//! Everything is read from the environment (after an optional `.env` file) into
//! a typed [`SuiteConfig`]. The CLI layers its own flags on top.

use std::path::PathBuf;
use std::time::Duration;

use url::Url;

use crate::error::{Error, Result};

pub const DEFAULT_BASE_URL: &str = "https://rhombusai.com";
pub const STORAGE_STATE_PATH: &str = ".auth/storageState.json";
pub const INPUT_FIXTURE: &str = "fixtures/messy-input.csv";
pub const DOWNLOADED_OUTPUT: &str = "data-validation/output/downloaded-output.csv";
pub const TRANSFORM_PROMPT: &str = "remove duplicates and give me new csv to download";

pub const ENV_BASE_URL: &str = "RHOMBUS_BASE_URL";
pub const ENV_EMAIL: &str = "RHOMBUS_EMAIL";
pub const ENV_PASSWORD: &str = "RHOMBUS_PASSWORD";
pub const ENV_HEADLESS: &str = "RHOMBUS_HEADLESS";
pub const ENV_SLOW_MO: &str = "RHOMBUS_SLOW_MO_MS";
pub const ENV_CHROME: &str = "RHOMBUS_CHROME";
pub const ENV_CDP_ENDPOINT: &str = "RHOMBUS_CDP_ENDPOINT";
pub const ENV_NO_SANDBOX: &str = "RHOMBUS_NO_SANDBOX";
pub const ENV_REUSE_SESSION: &str = "RHOMBUS_REUSE_SESSION";
pub const ENV_CI: &str = "CI";

/// Loads `.env` from the working directory, if there is one.
///
/// Variables already set in the process environment win.
pub fn load_dotenv() {
	match dotenvy::dotenv() {
		Ok(path) => tracing::debug!(target = "rhombus", path = %path.display(), "loaded .env"),
		Err(e) if e.not_found() => {}
		Err(e) => tracing::warn!(target = "rhombus", error = %e, "ignoring unreadable .env"),
	}
}

/// Time limits for the suite.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
	/// Whole-test budget applied by the runner.
	pub test: Duration,
	/// Budget for a single assertion or expectation.
	pub expect: Duration,
	/// Wait for an element to become visible before acting on it.
	pub action: Duration,
	/// Wait for an element to be attached to the DOM.
	pub attach: Duration,
	/// How long an optional step looks for its element before skipping.
	pub optional: Duration,
	pub navigation: Duration,
}

impl Default for Timeouts {
	fn default() -> Self {
		Self {
			test: Duration::from_secs(120),
			expect: Duration::from_secs(15),
			action: Duration::from_secs(30),
			attach: Duration::from_secs(15),
			optional: Duration::from_secs(2),
			navigation: Duration::from_secs(30),
		}
	}
}

/// How many times a failed check is re-run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RetryPolicy {
	pub retries: u32,
}

impl RetryPolicy {
	/// One retry on CI, none locally.
	pub fn for_ci(ci: bool) -> Self {
		Self {
			retries: u32::from(ci),
		}
	}

	pub fn attempts(&self) -> u32 {
		self.retries + 1
	}
}

/// Named API paths, relative to the base URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiEndpoints {
	pub me: String,
}

impl Default for ApiEndpoints {
	fn default() -> Self {
		Self {
			me: "/api/me".to_string(),
		}
	}
}

/// Browser launch settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrowserSettings {
	pub headless: bool,
	/// Pause inserted after every page action.
	pub slow_mo: Duration,
	pub executable: Option<PathBuf>,
	/// Connect to this DevTools endpoint instead of launching.
	pub cdp_endpoint: Option<String>,
	pub no_sandbox: bool,
}

impl Default for BrowserSettings {
	fn default() -> Self {
		Self {
			headless: true,
			slow_mo: Duration::ZERO,
			executable: None,
			cdp_endpoint: None,
			no_sandbox: false,
		}
	}
}

/// Resolved configuration for one run.
#[derive(Debug, Clone)]
pub struct SuiteConfig {
	pub base_url: Url,
	pub storage_state_path: PathBuf,
	pub input_fixture: PathBuf,
	pub downloaded_output: PathBuf,
	pub prompt: String,
	pub timeouts: Timeouts,
	pub retry: RetryPolicy,
	pub api: ApiEndpoints,
	pub browser: BrowserSettings,
	/// Load a saved session artifact instead of bootstrapping a new one.
	pub reuse_session: bool,
}

impl Default for SuiteConfig {
	fn default() -> Self {
		Self {
			base_url: default_base_url(),
			storage_state_path: PathBuf::from(STORAGE_STATE_PATH),
			input_fixture: PathBuf::from(INPUT_FIXTURE),
			downloaded_output: PathBuf::from(DOWNLOADED_OUTPUT),
			prompt: TRANSFORM_PROMPT.to_string(),
			timeouts: Timeouts::default(),
			retry: RetryPolicy::default(),
			api: ApiEndpoints::default(),
			browser: BrowserSettings::default(),
			reuse_session: false,
		}
	}
}

fn default_base_url() -> Url {
	Url::parse(DEFAULT_BASE_URL).expect("default base URL is valid")
}

impl SuiteConfig {
	/// Reads the process environment.
	pub fn from_env() -> Result<Self> {
		Self::from_lookup(|key| std::env::var(key).ok())
	}

	/// Builds a config from an arbitrary variable source.
	///
	/// Empty values count as unset.
	pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
		let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

		let mut config = Self::default();
		if let Some(base) = get(ENV_BASE_URL) {
			config.base_url = parse_base_url(&base)?;
		}
		if let Some(value) = get(ENV_HEADLESS) {
			config.browser.headless = parse_bool(ENV_HEADLESS, &value)?;
		}
		if let Some(value) = get(ENV_SLOW_MO) {
			let ms = value
				.parse::<u64>()
				.map_err(|_| Error::Config(format!("{ENV_SLOW_MO} must be milliseconds, got {value:?}")))?;
			config.browser.slow_mo = Duration::from_millis(ms);
		}
		if let Some(value) = get(ENV_NO_SANDBOX) {
			config.browser.no_sandbox = parse_bool(ENV_NO_SANDBOX, &value)?;
		}
		if let Some(value) = get(ENV_REUSE_SESSION) {
			config.reuse_session = parse_bool(ENV_REUSE_SESSION, &value)?;
		}
		config.browser.executable = get(ENV_CHROME).map(PathBuf::from);
		config.browser.cdp_endpoint = get(ENV_CDP_ENDPOINT);
		config.retry = RetryPolicy::for_ci(get(ENV_CI).is_some());
		Ok(config)
	}

	/// Absolute URL for a path on the app.
	pub fn url_for(&self, path: &str) -> Result<Url> {
		Ok(self.base_url.join(path)?)
	}
}

/// Parses a base URL, accepting a missing trailing slash.
pub fn parse_base_url(value: &str) -> Result<Url> {
	let url = Url::parse(value).map_err(|e| Error::Config(format!("{ENV_BASE_URL} {value:?}: {e}")))?;
	if !matches!(url.scheme(), "http" | "https") {
		return Err(Error::Config(format!("{ENV_BASE_URL} must be http(s), got {value:?}")));
	}
	Ok(url)
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
	match value.to_ascii_lowercase().as_str() {
		"1" | "true" | "yes" | "on" => Ok(true),
		"0" | "false" | "no" | "off" => Ok(false),
		_ => Err(Error::Config(format!("{key} must be a boolean, got {value:?}"))),
	}
}
