//! Browser and isolated browser contexts.

use std::path::Path;
use std::time::Duration;

use parking_lot::Mutex;
use rhombus_protocol::{DevtoolsCookie, LocalStorageEntry, OriginState, StorageState};
use rhombus_runtime::{BrowserProcess, Channel, Connection, LaunchOptions};
use serde::Deserialize;
use serde_json::{Value, json};

use crate::config::BrowserSettings;
use crate::error::Result;
use crate::js;
use crate::page::{Page, PageOptions};

/// Launch or connect options for [`Browser`].
#[derive(Debug, Clone)]
pub struct BrowserOptions {
	pub settings: BrowserSettings,
	pub navigation_timeout: Duration,
}

impl Default for BrowserOptions {
	fn default() -> Self {
		Self {
			settings: BrowserSettings::default(),
			navigation_timeout: Duration::from_secs(30),
		}
	}
}

/// A Chromium instance driven over DevTools.
///
/// Launched browsers are killed on [`Browser::close`] or drop; connected
/// browsers are left running.
pub struct Browser {
	channel: Channel,
	process: Mutex<Option<BrowserProcess>>,
	options: BrowserOptions,
}

impl Browser {
	/// Connects to `settings.cdp_endpoint` when set, otherwise launches Chromium.
	pub async fn start(options: BrowserOptions) -> Result<Self> {
		match options.settings.cdp_endpoint.clone() {
			Some(endpoint) => Self::connect(&endpoint, options).await,
			None => Self::launch(options).await,
		}
	}

	pub async fn launch(options: BrowserOptions) -> Result<Self> {
		let launch = LaunchOptions {
			executable: options.settings.executable.clone(),
			headless: options.settings.headless,
			no_sandbox: options.settings.no_sandbox,
			..LaunchOptions::default()
		};
		let process = BrowserProcess::launch(&launch).await?;
		let connection = Connection::connect(process.ws_url()).await?;
		Ok(Self {
			channel: Channel::new(connection),
			process: Mutex::new(Some(process)),
			options,
		})
	}

	/// Attaches to a running browser by `ws://` URL or HTTP DevTools endpoint.
	pub async fn connect(endpoint: &str, options: BrowserOptions) -> Result<Self> {
		let ws_url = rhombus_runtime::resolve_endpoint(endpoint).await?;
		tracing::info!(target = "rhombus", %ws_url, "connecting to existing browser");
		let connection = Connection::connect(&ws_url).await?;
		Ok(Self {
			channel: Channel::new(connection),
			process: Mutex::new(None),
			options,
		})
	}

	/// Browser product string, e.g. `HeadlessChrome/126.0.0.0`.
	pub async fn version(&self) -> Result<String> {
		let info: Value = self.channel.send("Browser.getVersion", json!({})).await?;
		Ok(info["product"].as_str().unwrap_or_default().to_string())
	}

	/// Creates an isolated context, optionally seeded with a saved session.
	pub async fn new_context(&self, state: Option<&StorageState>) -> Result<BrowserContext> {
		let created: Value = self
			.channel
			.send("Target.createBrowserContext", json!({ "disposeOnDetach": true }))
			.await?;
		let context_id = created["browserContextId"]
			.as_str()
			.ok_or_else(|| rhombus_runtime::Error::ProtocolError("createBrowserContext returned no id".into()))?
			.to_string();

		let mut init_scripts = Vec::new();
		if let Some(state) = state {
			if !state.cookies.is_empty() {
				let cookies: Vec<Value> = state.cookies.iter().map(|c| c.to_cookie_param()).collect();
				self.channel
					.send_no_result(
						"Storage.setCookies",
						json!({ "cookies": cookies, "browserContextId": context_id }),
					)
					.await?;
			}
			for origin in state.origins.iter().filter(|o| !o.local_storage.is_empty()) {
				let entries = serde_json::to_value(&origin.local_storage)?;
				init_scripts.push(js::restore_local_storage_script(&origin.origin, &entries));
			}
			tracing::debug!(
				target = "rhombus",
				cookies = state.cookies.len(),
				origins = state.origins.len(),
				"context seeded from storage state"
			);
		}

		Ok(BrowserContext {
			channel: self.channel.clone(),
			context_id,
			pages: Mutex::new(Vec::new()),
			page_options: PageOptions {
				slow_mo: self.options.settings.slow_mo,
				navigation_timeout: self.options.navigation_timeout,
				init_scripts,
			},
		})
	}

	/// Closes the browser. Launched processes are killed afterwards.
	pub async fn close(&self) -> Result<()> {
		let process = self.process.lock().take();
		if let Some(process) = process {
			if let Err(e) = self.channel.send_no_result("Browser.close", json!({})).await {
				tracing::debug!(target = "rhombus", error = %e, "Browser.close failed; killing");
			}
			process.shutdown().await?;
		}
		Ok(())
	}
}

impl std::fmt::Debug for Browser {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Browser")
			.field("launched", &self.process.lock().is_some())
			.finish()
	}
}

#[derive(Debug, Deserialize)]
struct CookiesResult {
	cookies: Vec<DevtoolsCookie>,
}

#[derive(Debug, Deserialize)]
struct LocalStorageSnapshot {
	origin: String,
	entries: Vec<LocalStorageEntry>,
}

/// An isolated cookie jar and set of pages.
#[derive(Debug)]
pub struct BrowserContext {
	channel: Channel,
	context_id: String,
	pages: Mutex<Vec<Page>>,
	page_options: PageOptions,
}

impl BrowserContext {
	pub fn id(&self) -> &str {
		&self.context_id
	}

	/// Opens a blank page in this context.
	pub async fn new_page(&self) -> Result<Page> {
		let created: Value = self
			.channel
			.send(
				"Target.createTarget",
				json!({ "url": "about:blank", "browserContextId": self.context_id }),
			)
			.await?;
		let target_id = created["targetId"]
			.as_str()
			.ok_or_else(|| rhombus_runtime::Error::ProtocolError("createTarget returned no targetId".into()))?
			.to_string();

		let page = Page::attach(&self.channel, target_id, &self.page_options).await?;
		self.pages.lock().push(page.clone());
		Ok(page)
	}

	pub fn pages(&self) -> Vec<Page> {
		self.pages.lock().clone()
	}

	/// All cookies in this context.
	pub async fn cookies(&self) -> Result<Vec<DevtoolsCookie>> {
		let result: CookiesResult = self
			.channel
			.send("Storage.getCookies", json!({ "browserContextId": self.context_id }))
			.await?;
		Ok(result.cookies)
	}

	/// Captures cookies and per-origin localStorage, writing them to `path` when given.
	pub async fn storage_state(&self, path: Option<&Path>) -> Result<StorageState> {
		let cookies = self.cookies().await?.iter().map(DevtoolsCookie::to_cookie).collect();
		let mut state = StorageState::with_cookies(cookies);

		for page in self.pages() {
			let snapshot = match page.evaluate_json(js::LOCAL_STORAGE_SNAPSHOT).await {
				Ok(value) => serde_json::from_value::<LocalStorageSnapshot>(value)?,
				Err(e) if e.is_target_closed() => continue,
				Err(e) => return Err(e),
			};
			if snapshot.origin == "null" || snapshot.entries.is_empty() {
				continue;
			}
			match state.origins.iter_mut().find(|o| o.origin == snapshot.origin) {
				Some(existing) => {
					for entry in snapshot.entries {
						if !existing.local_storage.iter().any(|e| e.name == entry.name) {
							existing.local_storage.push(entry);
						}
					}
				}
				None => state.origins.push(OriginState {
					origin: snapshot.origin,
					local_storage: snapshot.entries,
				}),
			}
		}

		if let Some(path) = path {
			state.to_file(path)?;
			tracing::info!(
				target = "rhombus",
				path = %path.display(),
				cookies = state.cookies.len(),
				origins = state.origins.len(),
				"storage state saved"
			);
		}
		Ok(state)
	}

	/// Disposes the context and every page in it.
	pub async fn close(&self) -> Result<()> {
		self.pages.lock().clear();
		self.channel
			.send_no_result("Target.disposeBrowserContext", json!({ "browserContextId": self.context_id }))
			.await?;
		Ok(())
	}
}
