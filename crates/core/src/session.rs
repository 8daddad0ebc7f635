//! Authenticated session bootstrap.
//!
//! A single browser run logs in, walks the create-project/upload/prompt
//! workflow once, and saves the resulting cookies and localStorage as the
//! session artifact. Everything else (API checks, UI flows) reuses that
//! artifact through [`AuthenticatedSession::shared`], which guarantees the
//! bootstrap has finished before any consumer reads the file.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicI64, Ordering};

use rhombus_protocol::StorageState;
use tokio::sync::OnceCell;

use crate::api::ApiClient;
use crate::browser::{Browser, BrowserContext, BrowserOptions};
use crate::config::{ENV_EMAIL, ENV_PASSWORD, SuiteConfig, load_dotenv};
use crate::error::{Error, Result};
use crate::harness;
use crate::page::WaitUntil;
use crate::selector::{Selector, TextMatcher, WaitState};
use crate::steps::best_effort;
use crate::testing::PageLike;

/// Login identifier and secret.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
	pub email: String,
	pub password: String,
}

impl Credentials {
	pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
		Self {
			email: email.into(),
			password: password.into(),
		}
	}

	/// Reads `RHOMBUS_EMAIL` and `RHOMBUS_PASSWORD`.
	///
	/// # Errors
	///
	/// [`Error::MissingCredentials`] when either is unset or empty.
	pub fn from_env() -> Result<Self> {
		Self::from_lookup(|key| std::env::var(key).ok())
	}

	pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
		let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
		match (get(ENV_EMAIL), get(ENV_PASSWORD)) {
			(Some(email), Some(password)) => Ok(Self { email, password }),
			_ => Err(Error::MissingCredentials),
		}
	}
}

impl fmt::Debug for Credentials {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Credentials")
			.field("email", &self.email)
			.field("password", &"<redacted>")
			.finish()
	}
}

static LAST_PROJECT_MILLIS: AtomicI64 = AtomicI64::new(0);

/// Returns `test-<unix millis>`, distinct for every call in this process.
pub fn project_name() -> String {
	let now = chrono::Utc::now().timestamp_millis();
	let mut last = LAST_PROJECT_MILLIS.load(Ordering::Relaxed);
	loop {
		let next = now.max(last + 1);
		match LAST_PROJECT_MILLIS.compare_exchange_weak(last, next, Ordering::Relaxed, Ordering::Relaxed) {
			Ok(_) => return format!("test-{next}"),
			Err(actual) => last = actual,
		}
	}
}

/// The persisted session file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionArtifact {
	path: PathBuf,
}

impl SessionArtifact {
	pub fn new(path: impl Into<PathBuf>) -> Self {
		Self { path: path.into() }
	}

	pub fn path(&self) -> &Path {
		&self.path
	}

	/// True when the file exists and is non-empty.
	pub fn exists(&self) -> bool {
		std::fs::metadata(&self.path).is_ok_and(|m| m.is_file() && m.len() > 0)
	}

	/// Reads and parses the artifact.
	pub fn load(&self) -> Result<StorageState> {
		let unusable = |reason: String| Error::Artifact {
			path: self.path.clone(),
			reason,
		};
		if self.path.is_file() && !self.exists() {
			return Err(unusable("file is empty".to_string()));
		}
		StorageState::from_file(&self.path).map_err(|e| match e.kind() {
			std::io::ErrorKind::NotFound => unusable("not found; run the session bootstrap first".to_string()),
			std::io::ErrorKind::InvalidData => unusable(format!("not a storage state: {e}")),
			_ => unusable(e.to_string()),
		})
	}
}

/// What the exploratory workflow managed to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkflowReport {
	pub project_name: String,
	pub opened_app: bool,
	pub clicked_upload: bool,
	pub prompt_submitted: bool,
}

const PLUS_BUTTON: &str = r#"button:has(svg.lucide-plus), [role="button"]:has(svg.lucide-plus)"#;
const FILE_INPUT: &str = r#"input[type="file"]"#;
const PASSWORD_INPUT: &str = r#"input[type="password"]"#;

fn button(name: TextMatcher) -> Selector {
	Selector::role("button", Some(name))
}

/// Logs in through the UI and writes the session artifact.
#[derive(Debug, Clone)]
pub struct SessionBootstrap {
	config: SuiteConfig,
}

impl SessionBootstrap {
	pub fn new(config: SuiteConfig) -> Self {
		Self { config }
	}

	pub fn config(&self) -> &SuiteConfig {
		&self.config
	}

	/// Reads credentials from the environment, then runs the bootstrap.
	///
	/// Missing credentials fail before any browser is started.
	pub async fn run(&self) -> Result<SessionArtifact> {
		let credentials = Credentials::from_env()?;
		self.run_with(&credentials).await
	}

	/// Runs the bootstrap in a fresh browser, bounded by the test timeout.
	pub async fn run_with(&self, credentials: &Credentials) -> Result<SessionArtifact> {
		let project = project_name();
		tracing::info!(
			target = "rhombus",
			base_url = %self.config.base_url,
			project = %project,
			"starting session bootstrap"
		);

		let browser = Browser::start(BrowserOptions {
			settings: self.config.browser.clone(),
			navigation_timeout: self.config.timeouts.navigation,
		})
		.await?;

		let limit = self.config.timeouts.test;
		let outcome = tokio::time::timeout(limit, self.capture(&browser, credentials, &project))
			.await
			.unwrap_or_else(|_| Err(Error::timeout(limit, "session bootstrap")));

		if let Err(e) = browser.close().await {
			tracing::warn!(target = "rhombus", error = %e, "failed to close browser");
		}
		outcome
	}

	async fn capture(&self, browser: &Browser, credentials: &Credentials, project: &str) -> Result<SessionArtifact> {
		let context = browser.new_context(None).await?;
		let page = context.new_page().await?;
		let report = self.drive(&page, credentials, project).await?;
		tracing::info!(target = "rhombus", ?report, "workflow finished");

		self.persist(&context).await
	}

	async fn persist(&self, context: &BrowserContext) -> Result<SessionArtifact> {
		let path = &self.config.storage_state_path;
		context.storage_state(Some(path)).await?;
		Ok(SessionArtifact::new(path.clone()))
	}

	/// Walks the login and project workflow on `page`.
	///
	/// Mandatory steps propagate their failure; optional ones are skipped when
	/// their element does not show up.
	pub async fn drive(&self, page: &dyn PageLike, credentials: &Credentials, project: &str) -> Result<WorkflowReport> {
		let t = &self.config.timeouts;

		page.goto(self.config.base_url.as_str(), WaitUntil::DomContentLoaded).await?;
		let open_app = page.select(Selector::role("link", Some(TextMatcher::regex_ignore_case("open app"))));
		let opened_app = best_effort(open_app.as_ref(), t.optional).await;

		page.select(button(TextMatcher::regex_ignore_case("Log In")))
			.click(t.action)
			.await?;
		page.select(Selector::label(TextMatcher::regex_ignore_case("email")))
			.fill(&credentials.email, t.action)
			.await?;
		page.select(Selector::css(PASSWORD_INPUT).first())
			.fill(&credentials.password, t.action)
			.await?;
		page.select(button(TextMatcher::regex_ignore_case("sign in|log in")))
			.click(t.action)
			.await?;
		tracing::info!(target = "rhombus", email = %credentials.email, "login submitted");

		page.select(button(TextMatcher::text("Create a project")))
			.click(t.action)
			.await?;
		page.select(Selector::role("textbox", Some(TextMatcher::text("Enter project name"))))
			.fill(project, t.action)
			.await?;
		page.select(button(TextMatcher::text("Create"))).click(t.action).await?;
		tracing::info!(target = "rhombus", %project, "project created");

		let plus = page.select(Selector::css(PLUS_BUTTON).first());
		plus.wait_for(WaitState::Visible, t.action).await?;
		plus.click(t.action).await?;

		let file_input = page.select(Selector::css(FILE_INPUT).first());
		file_input.wait_for(WaitState::Attached, t.attach).await?;
		file_input
			.set_input_files(std::slice::from_ref(&self.config.input_fixture), t.attach)
			.await?;
		let upload = page.select(button(TextMatcher::regex_ignore_case("^upload$")));
		let clicked_upload = best_effort(upload.as_ref(), t.optional).await;
		tracing::info!(target = "rhombus", fixture = %self.config.input_fixture.display(), clicked_upload, "fixture attached");

		let prompt = page.select(Selector::role("textbox", Some(TextMatcher::regex_ignore_case("what would you like to"))).first());
		prompt.wait_for(WaitState::Visible, t.action).await?;
		prompt.fill(&self.config.prompt, t.action).await?;
		let prompt_submitted = match prompt.press("Enter", t.expect).await {
			Ok(()) => true,
			Err(e) => {
				tracing::warn!(target = "rhombus", error = %e, "prompt submission failed; continuing");
				false
			}
		};

		Ok(WorkflowReport {
			project_name: project.to_string(),
			opened_app,
			clicked_upload,
			prompt_submitted,
		})
	}
}

static SHARED: OnceCell<std::result::Result<AuthenticatedSession, String>> = OnceCell::const_new();

/// A bootstrapped session, ready to seed browsers and HTTP clients.
#[derive(Debug, Clone)]
pub struct AuthenticatedSession {
	config: SuiteConfig,
	artifact: SessionArtifact,
	state: StorageState,
}

impl AuthenticatedSession {
	/// The process-wide session, bootstrapped on first use.
	///
	/// Concurrent callers wait for the same bootstrap. A failed bootstrap is
	/// not retried; every caller gets [`Error::Bootstrap`] with its message.
	/// With `RHOMBUS_REUSE_SESSION` set, a saved artifact is loaded instead.
	pub async fn shared() -> Result<&'static AuthenticatedSession> {
		let outcome = SHARED
			.get_or_init(|| async {
				load_dotenv();
				let outcome = match SuiteConfig::from_env() {
					Ok(config) => {
						let fresh = !config.reuse_session;
						Self::load_or_bootstrap(config, fresh).await
					}
					Err(e) => Err(e),
				};
				outcome.map_err(|e| {
					tracing::error!(target = "rhombus", error = %e, "session bootstrap failed");
					e.to_string()
				})
			})
			.await;
		outcome.as_ref().map_err(|message| Error::Bootstrap(message.clone()))
	}

	/// Runs a fresh bootstrap for `config`.
	pub async fn bootstrap(config: SuiteConfig) -> Result<Self> {
		let artifact = SessionBootstrap::new(config.clone()).run().await?;
		Self::from_artifact(config, artifact)
	}

	/// Loads the saved artifact when there is one and `fresh` is false;
	/// otherwise bootstraps under the configured retry policy.
	///
	/// Credentials are checked before anything is launched.
	pub async fn load_or_bootstrap(config: SuiteConfig, fresh: bool) -> Result<Self> {
		let artifact = SessionArtifact::new(&config.storage_state_path);
		if !fresh && artifact.exists() {
			tracing::info!(target = "rhombus", path = %artifact.path().display(), "reusing saved session");
			return Self::from_artifact(config, artifact);
		}

		Credentials::from_env()?;
		tracing::info!(target = "rhombus", "bootstrapping a new session");
		// Browser launch and shutdown sit outside the bootstrap's own budget.
		let budget = config.timeouts.test + config.timeouts.action;
		harness::run_check("setup", config.retry, budget, || Self::bootstrap(config.clone())).await
	}

	/// Loads an artifact written by an earlier bootstrap.
	pub fn from_artifact(config: SuiteConfig, artifact: SessionArtifact) -> Result<Self> {
		let state = artifact.load()?;
		Ok(Self {
			config,
			artifact,
			state,
		})
	}

	pub fn config(&self) -> &SuiteConfig {
		&self.config
	}

	pub fn artifact(&self) -> &SessionArtifact {
		&self.artifact
	}

	pub fn state(&self) -> &StorageState {
		&self.state
	}

	/// HTTP client that sends the session's cookies.
	pub fn api_client(&self) -> Result<ApiClient> {
		ApiClient::authenticated(&self.config, self.state.clone())
	}

	/// Browser context restored from the session.
	pub async fn new_context(&self, browser: &Browser) -> Result<BrowserContext> {
		browser.new_context(Some(&self.state)).await
	}
}
