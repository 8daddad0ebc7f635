//! A browser tab attached over a flattened DevTools session.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rhombus_protocol::EvaluateResult;
use rhombus_runtime::Channel;
use serde::Deserialize;
use serde_json::{Value, json};
use tokio::sync::broadcast::error::RecvError;

use crate::error::{Error, Result};
use crate::locator::Locator;
use crate::selector::{Selector, TextMatcher};
use crate::testing::{LocatorLike, PageLike};

/// Navigation milestone `goto` waits for.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum WaitUntil {
	/// Return once the navigation is committed.
	Commit,
	#[default]
	DomContentLoaded,
	Load,
}

impl WaitUntil {
	fn lifecycle_name(self) -> Option<&'static str> {
		match self {
			WaitUntil::Commit => None,
			WaitUntil::DomContentLoaded => Some("DOMContentLoaded"),
			WaitUntil::Load => Some("load"),
		}
	}
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NavigateResult {
	frame_id: String,
	#[serde(default)]
	loader_id: Option<String>,
	#[serde(default)]
	error_text: Option<String>,
}

/// Settings shared by every page of a context.
#[derive(Debug, Clone, Default)]
pub(crate) struct PageOptions {
	pub slow_mo: Duration,
	pub navigation_timeout: Duration,
	pub init_scripts: Vec<String>,
}

#[derive(Debug)]
struct PageInner {
	channel: Channel,
	target_id: String,
	slow_mo: Duration,
	navigation_timeout: Duration,
}

/// A page (tab) in a [`crate::BrowserContext`].
///
/// Cheap to clone; clones drive the same tab.
#[derive(Debug, Clone)]
pub struct Page {
	inner: Arc<PageInner>,
}

impl Page {
	/// Attaches to `target_id` and enables the domains the driver relies on.
	pub(crate) async fn attach(browser: &Channel, target_id: String, options: &PageOptions) -> Result<Self> {
		let attached: Value = browser
			.send("Target.attachToTarget", json!({ "targetId": target_id, "flatten": true }))
			.await?;
		let session_id = attached["sessionId"]
			.as_str()
			.ok_or_else(|| rhombus_runtime::Error::ProtocolError("attachToTarget returned no sessionId".into()))?;
		let channel = browser.for_session(session_id);

		channel.send_no_result("Page.enable", json!({})).await?;
		channel
			.send_no_result("Page.setLifecycleEventsEnabled", json!({ "enabled": true }))
			.await?;
		for source in &options.init_scripts {
			channel
				.send_no_result("Page.addScriptToEvaluateOnNewDocument", json!({ "source": source }))
				.await?;
		}

		tracing::debug!(target = "rhombus", %target_id, session_id, "page attached");
		Ok(Self {
			inner: Arc::new(PageInner {
				channel,
				target_id,
				slow_mo: options.slow_mo,
				navigation_timeout: options.navigation_timeout,
			}),
		})
	}

	pub fn target_id(&self) -> &str {
		&self.inner.target_id
	}

	pub(crate) fn channel(&self) -> &Channel {
		&self.inner.channel
	}

	/// Navigates the main frame and waits for `wait_until`.
	pub async fn goto(&self, url: &str, wait_until: WaitUntil) -> Result<()> {
		let channel = &self.inner.channel;
		let mut events = channel.subscribe();

		tracing::info!(target = "rhombus", %url, ?wait_until, "navigating");
		let nav: NavigateResult = channel.send("Page.navigate", json!({ "url": url })).await?;
		if let Some(reason) = nav.error_text.filter(|e| !e.is_empty()) {
			return Err(Error::Navigation {
				url: url.to_string(),
				reason,
			});
		}

		// Same-document navigations have no loader and fire no lifecycle events.
		let (Some(loader_id), Some(milestone)) = (nav.loader_id, wait_until.lifecycle_name()) else {
			self.slow_down().await;
			return Ok(());
		};

		let timeout = self.inner.navigation_timeout;
		let session_id = channel.session_id().map(str::to_string);
		tokio::time::timeout(timeout, async {
			loop {
				match events.recv().await {
					Ok(event) => {
						if event.method == "Page.lifecycleEvent"
							&& event.session_id == session_id
							&& event.params["frameId"] == nav.frame_id.as_str()
							&& event.params["loaderId"] == loader_id.as_str()
							&& event.params["name"] == milestone
						{
							return Ok(());
						}
					}
					Err(RecvError::Lagged(skipped)) => {
						tracing::warn!(target = "rhombus", skipped, "event receiver lagged during navigation");
					}
					Err(RecvError::Closed) => return Err(Error::from(rhombus_runtime::Error::ChannelClosed)),
				}
			}
		})
		.await
		.map_err(|_| Error::timeout(timeout, format!("{milestone} of {url}")))??;

		self.slow_down().await;
		Ok(())
	}

	/// Current URL of the main frame.
	pub async fn url(&self) -> Result<String> {
		let value = self.evaluate_json("location.href").await?;
		Ok(value.as_str().unwrap_or_default().to_string())
	}

	/// Evaluates `expression` and returns its JSON value; `undefined` becomes `null`.
	pub async fn evaluate_json(&self, expression: &str) -> Result<Value> {
		let result = self.evaluate(expression, true).await?;
		Ok(result.value.unwrap_or(Value::Null))
	}

	/// Evaluates `expression` and returns a remote object id, if the result is an object.
	pub(crate) async fn evaluate_handle(&self, expression: &str) -> Result<Option<String>> {
		Ok(self.evaluate(expression, false).await?.object_id)
	}

	async fn evaluate(&self, expression: &str, by_value: bool) -> Result<rhombus_protocol::RemoteObject> {
		let result: EvaluateResult = self
			.inner
			.channel
			.send(
				"Runtime.evaluate",
				json!({
					"expression": expression,
					"returnByValue": by_value,
					"awaitPromise": true,
				}),
			)
			.await?;
		if let Some(details) = result.exception_details {
			return Err(rhombus_runtime::Error::Evaluation(details.message()).into());
		}
		Ok(result.result)
	}

	pub(crate) async fn release(&self, object_id: &str) {
		let released = self
			.inner
			.channel
			.send_no_result("Runtime.releaseObject", json!({ "objectId": object_id }))
			.await;
		if let Err(e) = released {
			tracing::trace!(target = "rhombus", error = %e, "releaseObject failed");
		}
	}

	/// Locator for a CSS selector.
	pub fn locator(&self, selector: impl Into<String>) -> Locator {
		self.select(Selector::css(selector))
	}

	/// Locator for an ARIA role, optionally filtered by accessible name.
	pub fn get_by_role(&self, role: &str, name: Option<TextMatcher>) -> Locator {
		self.select(Selector::role(role, name))
	}

	/// Locator for a form control by its label.
	pub fn get_by_label(&self, text: impl Into<TextMatcher>) -> Locator {
		self.select(Selector::label(text))
	}

	pub fn select(&self, selector: Selector) -> Locator {
		Locator::new(self.clone(), selector)
	}

	/// Presses `key` on whatever has focus.
	pub async fn press(&self, key: &str) -> Result<()> {
		let def = key_definition(key)?;
		let mut down = json!({
			"type": "keyDown",
			"key": def.key,
			"code": def.code,
			"windowsVirtualKeyCode": def.key_code,
		});
		if let Some(text) = &def.text {
			down["text"] = json!(text);
		}
		let up = json!({
			"type": "keyUp",
			"key": def.key,
			"code": def.code,
			"windowsVirtualKeyCode": def.key_code,
		});
		self.inner.channel.send_no_result("Input.dispatchKeyEvent", down).await?;
		self.inner.channel.send_no_result("Input.dispatchKeyEvent", up).await?;
		self.slow_down().await;
		Ok(())
	}

	/// Left-clicks at viewport coordinates.
	pub(crate) async fn click_at(&self, x: f64, y: f64) -> Result<()> {
		let channel = &self.inner.channel;
		channel
			.send_no_result("Input.dispatchMouseEvent", json!({ "type": "mouseMoved", "x": x, "y": y }))
			.await?;
		for kind in ["mousePressed", "mouseReleased"] {
			channel
				.send_no_result(
					"Input.dispatchMouseEvent",
					json!({ "type": kind, "x": x, "y": y, "button": "left", "clickCount": 1 }),
				)
				.await?;
		}
		self.slow_down().await;
		Ok(())
	}

	/// Types `text` into the focused element as a single input event.
	pub(crate) async fn insert_text(&self, text: &str) -> Result<()> {
		self.inner
			.channel
			.send_no_result("Input.insertText", json!({ "text": text }))
			.await?;
		self.slow_down().await;
		Ok(())
	}

	pub(crate) async fn slow_down(&self) {
		if !self.inner.slow_mo.is_zero() {
			tokio::time::sleep(self.inner.slow_mo).await;
		}
	}

	/// Closes the tab.
	pub async fn close(&self) -> Result<()> {
		self.inner
			.channel
			.send_no_result("Page.close", json!({}))
			.await
			.map_err(Into::into)
	}
}

#[async_trait]
impl PageLike for Page {
	async fn goto(&self, url: &str, wait_until: WaitUntil) -> Result<()> {
		Page::goto(self, url, wait_until).await
	}

	fn select(&self, selector: Selector) -> Box<dyn LocatorLike + '_> {
		Box::new(Page::select(self, selector))
	}
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct KeyDefinition {
	key: String,
	code: String,
	key_code: u32,
	text: Option<String>,
}

fn key_definition(key: &str) -> Result<KeyDefinition> {
	let named = |key: &str, code: &str, key_code: u32, text: Option<&str>| KeyDefinition {
		key: key.to_string(),
		code: code.to_string(),
		key_code,
		text: text.map(str::to_string),
	};
	let def = match key {
		"Enter" => named("Enter", "Enter", 13, Some("\r")),
		"Tab" => named("Tab", "Tab", 9, None),
		"Escape" => named("Escape", "Escape", 27, None),
		"Backspace" => named("Backspace", "Backspace", 8, None),
		"Delete" => named("Delete", "Delete", 46, None),
		"ArrowUp" => named("ArrowUp", "ArrowUp", 38, None),
		"ArrowDown" => named("ArrowDown", "ArrowDown", 40, None),
		"ArrowLeft" => named("ArrowLeft", "ArrowLeft", 37, None),
		"ArrowRight" => named("ArrowRight", "ArrowRight", 39, None),
		"Space" | " " => named(" ", "Space", 32, Some(" ")),
		_ => {
			let mut chars = key.chars();
			let (Some(c), None) = (chars.next(), chars.next()) else {
				return Err(Error::UnknownKey(key.to_string()));
			};
			let upper = c.to_ascii_uppercase();
			let (code, key_code) = if c.is_ascii_alphabetic() {
				(format!("Key{upper}"), upper as u32)
			} else if c.is_ascii_digit() {
				(format!("Digit{c}"), c as u32)
			} else {
				(String::new(), 0)
			};
			KeyDefinition {
				key: c.to_string(),
				code,
				key_code,
				text: Some(c.to_string()),
			}
		}
	};
	Ok(def)
}
