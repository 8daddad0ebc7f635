//! Chromium process management.
//!
//! Locates a Chromium-family browser, starts it with remote debugging on an
//! ephemeral port and a throwaway profile, and reads the DevTools websocket
//! URL the browser prints on stderr. Existing browsers can be reached through
//! their `/json/version` endpoint instead.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use rhombus_protocol::VersionInfo;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, Command};

use crate::error::{Error, Result};

const DEVTOOLS_PREFIX: &str = "DevTools listening on ";

/// Options for [`BrowserProcess::launch`].
#[derive(Debug, Clone)]
pub struct LaunchOptions {
	/// Explicit executable; searched for when [`None`].
	pub executable: Option<PathBuf>,
	pub headless: bool,
	/// Pass `--no-sandbox`, needed when running as root in containers.
	pub no_sandbox: bool,
	/// How long to wait for the DevTools endpoint to appear.
	pub startup_timeout: Duration,
	/// Extra command-line switches.
	pub args: Vec<String>,
}

impl Default for LaunchOptions {
	fn default() -> Self {
		Self {
			executable: None,
			headless: true,
			no_sandbox: false,
			startup_timeout: Duration::from_secs(30),
			args: Vec::new(),
		}
	}
}

/// Finds a Chromium-family executable.
///
/// `RHOMBUS_CHROME` wins when it points at an existing file, then well-known
/// install locations and `PATH` entries are tried in order.
pub fn find_chromium() -> Option<PathBuf> {
	if let Ok(path) = std::env::var("RHOMBUS_CHROME") {
		let path = PathBuf::from(path);
		if path.exists() {
			return Some(path);
		}
		tracing::warn!(target = "rhombus", path = %path.display(), "RHOMBUS_CHROME does not exist; searching");
	}

	let candidates: &[&str] = if cfg!(target_os = "macos") {
		&[
			"/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
			"/Applications/Chromium.app/Contents/MacOS/Chromium",
			"/Applications/Brave Browser.app/Contents/MacOS/Brave Browser",
			"/Applications/Google Chrome Canary.app/Contents/MacOS/Google Chrome Canary",
		]
	} else if cfg!(target_os = "windows") {
		&[
			r"C:\Program Files\Google\Chrome\Application\chrome.exe",
			r"C:\Program Files (x86)\Google\Chrome\Application\chrome.exe",
			r"C:\Program Files\Chromium\Application\chrome.exe",
		]
	} else {
		&[
			"google-chrome-stable",
			"google-chrome",
			"chromium-browser",
			"chromium",
			"/usr/bin/google-chrome-stable",
			"/usr/bin/google-chrome",
			"/usr/bin/chromium-browser",
			"/usr/bin/chromium",
			"/snap/bin/chromium",
		]
	};

	candidates.iter().find_map(|candidate| {
		if candidate.starts_with('/') || candidate.contains('\\') {
			let path = Path::new(candidate);
			path.exists().then(|| path.to_path_buf())
		} else {
			which::which(candidate).ok()
		}
	})
}

/// Extracts the websocket URL from a Chromium stderr line.
pub fn parse_devtools_line(line: &str) -> Option<String> {
	let rest = line.trim().strip_prefix(DEVTOOLS_PREFIX)?;
	let url = rest.trim();
	(url.starts_with("ws://") || url.starts_with("wss://")).then(|| url.to_string())
}

/// A browser process started by us.
///
/// The process is killed when this value is dropped; the profile directory is
/// removed with it.
#[derive(Debug)]
pub struct BrowserProcess {
	child: Child,
	ws_url: String,
	_profile: tempfile::TempDir,
}

impl BrowserProcess {
	/// Starts Chromium and waits for its DevTools endpoint.
	///
	/// # Errors
	///
	/// Returns [`Error::BrowserNotFound`] when no executable is available and
	/// [`Error::LaunchFailed`] when the process exits or stays silent past
	/// [`LaunchOptions::startup_timeout`].
	pub async fn launch(options: &LaunchOptions) -> Result<Self> {
		let executable = match &options.executable {
			Some(path) => path.clone(),
			None => find_chromium().ok_or(Error::BrowserNotFound)?,
		};
		let profile = tempfile::Builder::new().prefix("rhombus-profile-").tempdir()?;

		let mut cmd = Command::new(&executable);
		cmd.arg("--remote-debugging-port=0")
			.arg(format!("--user-data-dir={}", profile.path().display()))
			.args([
				"--no-first-run",
				"--no-default-browser-check",
				"--disable-background-networking",
				"--disable-sync",
				"--password-store=basic",
				"--use-mock-keychain",
			]);
		if options.headless {
			cmd.arg("--headless=new");
		}
		if options.no_sandbox {
			cmd.arg("--no-sandbox");
		}
		cmd.args(&options.args)
			.arg("about:blank")
			.stdin(Stdio::null())
			.stdout(Stdio::null())
			.stderr(Stdio::piped())
			.kill_on_drop(true);

		tracing::info!(
			target = "rhombus",
			executable = %executable.display(),
			headless = options.headless,
			"launching browser"
		);

		let mut child = cmd
			.spawn()
			.map_err(|e| Error::LaunchFailed(format!("{}: {e}", executable.display())))?;
		let stderr = child
			.stderr
			.take()
			.ok_or_else(|| Error::LaunchFailed("browser stderr not captured".to_string()))?;
		let mut lines = BufReader::new(stderr).lines();

		let ws_url = tokio::time::timeout(options.startup_timeout, async {
			while let Some(line) = lines.next_line().await? {
				if let Some(url) = parse_devtools_line(&line) {
					return Ok(url);
				}
				tracing::trace!(target = "rhombus", %line, "browser stderr");
			}
			Err::<String, Error>(Error::LaunchFailed(
				"browser exited before exposing DevTools endpoint".to_string(),
			))
		})
		.await
		.map_err(|_| {
			Error::LaunchFailed(format!(
				"no DevTools endpoint after {}ms",
				options.startup_timeout.as_millis()
			))
		})??;

		// Keep draining so a chatty browser never blocks on a full pipe.
		tokio::spawn(async move {
			while let Ok(Some(line)) = lines.next_line().await {
				tracing::trace!(target = "rhombus", %line, "browser stderr");
			}
		});

		tracing::debug!(target = "rhombus", %ws_url, "browser ready");
		Ok(Self {
			child,
			ws_url,
			_profile: profile,
		})
	}

	pub fn ws_url(&self) -> &str {
		&self.ws_url
	}

	/// Kills the browser and waits for it to exit.
	pub async fn shutdown(mut self) -> Result<()> {
		if let Err(e) = self.child.kill().await {
			tracing::debug!(target = "rhombus", error = %e, "browser already gone");
		}
		Ok(())
	}
}

/// Fetches `/json/version` from an HTTP DevTools endpoint such as `http://127.0.0.1:9222`.
pub async fn fetch_version(http_endpoint: &str) -> Result<VersionInfo> {
	let url = format!("{}/json/version", http_endpoint.trim_end_matches('/'));
	let client = reqwest::Client::builder()
		.timeout(Duration::from_secs(5))
		.build()
		.map_err(|e| Error::ConnectionFailed(format!("Failed to create HTTP client: {e}")))?;

	let response = client
		.get(&url)
		.send()
		.await
		.map_err(|e| Error::ConnectionFailed(format!("{url}: {e}")))?;
	if !response.status().is_success() {
		return Err(Error::ConnectionFailed(format!(
			"Unexpected response from {url}: {}",
			response.status()
		)));
	}

	response
		.json()
		.await
		.map_err(|e| Error::ConnectionFailed(format!("Failed to parse {url}: {e}")))
}

/// Turns a user-supplied endpoint into a websocket URL.
///
/// `ws://` and `wss://` URLs pass through; anything else is treated as an HTTP
/// endpoint and resolved through [`fetch_version`].
pub async fn resolve_endpoint(endpoint: &str) -> Result<String> {
	if endpoint.starts_with("ws://") || endpoint.starts_with("wss://") {
		return Ok(endpoint.to_string());
	}
	Ok(fetch_version(endpoint).await?.web_socket_debugger_url)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn parses_devtools_banner() {
		let line = "DevTools listening on ws://127.0.0.1:41234/devtools/browser/0f3c-11aa\n";
		assert_eq!(
			parse_devtools_line(line).as_deref(),
			Some("ws://127.0.0.1:41234/devtools/browser/0f3c-11aa")
		);
	}

	#[test]
	fn ignores_other_stderr_noise() {
		assert_eq!(parse_devtools_line("[1234:5678:ERROR:gpu_init.cc(523)] Passthrough"), None);
		assert_eq!(parse_devtools_line("DevTools listening on http://nope"), None);
	}

	#[tokio::test]
	async fn websocket_endpoints_pass_through() {
		let url = "ws://127.0.0.1:9222/devtools/browser/abc";
		assert_eq!(resolve_endpoint(url).await.unwrap(), url);
	}

	#[tokio::test]
	async fn missing_executable_fails_to_launch() {
		let options = LaunchOptions {
			executable: Some(PathBuf::from("/definitely/not/a/browser")),
			startup_timeout: Duration::from_secs(1),
			..LaunchOptions::default()
		};
		let err = BrowserProcess::launch(&options).await.unwrap_err();
		assert!(matches!(err, Error::LaunchFailed(_)), "unexpected error: {err:?}");
	}
}
