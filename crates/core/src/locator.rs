//! Lazily-resolved element handles.
//!
//! A [`Locator`] never holds on to a DOM node. Every operation re-runs the
//! selector in the page, so locators survive re-renders and navigations.
//! Actions poll until the element is actionable or the timeout elapses.

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tokio::time::Instant;

use crate::error::{Error, Result};
use crate::js;
use crate::page::Page;
use crate::selector::{Selector, WaitState};
use crate::testing::LocatorLike;

/// Backoff between actionability probes, in milliseconds.
const POLL_BACKOFF_MS: [u64; 6] = [0, 20, 50, 100, 100, 500];

#[derive(Debug, Clone, Copy, Default, Deserialize)]
struct Probe {
	count: usize,
	found: bool,
	visible: bool,
	enabled: bool,
}

impl Probe {
	fn satisfies(&self, state: WaitState) -> bool {
		match state {
			WaitState::Attached => self.found,
			WaitState::Visible => self.visible,
			WaitState::Hidden => !self.visible,
		}
	}

	fn actionable(&self) -> bool {
		self.visible && self.enabled
	}
}

/// Element query bound to a [`Page`].
#[derive(Debug, Clone)]
pub struct Locator {
	page: Page,
	selector: Selector,
}

impl Locator {
	pub(crate) fn new(page: Page, selector: Selector) -> Self {
		Self { page, selector }
	}

	pub fn selector(&self) -> &Selector {
		&self.selector
	}

	/// Narrows to the first match.
	pub fn first(&self) -> Locator {
		self.nth(0)
	}

	pub fn nth(&self, index: usize) -> Locator {
		Locator::new(self.page.clone(), self.selector.clone().nth(index))
	}

	async fn probe(&self) -> Result<Probe> {
		let expr = js::probe_expression(&self.selector.to_json(), self.selector.resolved_index());
		let value = self.page.evaluate_json(&expr).await?;
		Ok(serde_json::from_value(value)?)
	}

	/// Number of elements matching the selector right now, ignoring any index.
	pub async fn count(&self) -> Result<usize> {
		Ok(self.probe().await?.count)
	}

	/// Whether the element is visible right now. Does not wait.
	pub async fn is_visible(&self) -> Result<bool> {
		Ok(self.probe().await?.visible)
	}

	/// Waits until the element reaches `state`.
	pub async fn wait_for(&self, state: WaitState, timeout: Duration) -> Result<()> {
		self.poll(timeout, &state.to_string(), |p| p.satisfies(state)).await?;
		Ok(())
	}

	/// Polls the page until `ready` holds for a probe.
	///
	/// Evaluation errors while polling (typically a navigation swapping the
	/// execution context) are retried; a closed target is not.
	async fn poll(&self, timeout: Duration, condition: &str, ready: impl Fn(&Probe) -> bool) -> Result<Probe> {
		let deadline = Instant::now() + timeout;
		let mut attempt = 0usize;
		let waited = tokio::time::timeout_at(deadline, async {
			loop {
				let delay = POLL_BACKOFF_MS[attempt.min(POLL_BACKOFF_MS.len() - 1)];
				if delay > 0 {
					tokio::time::sleep(Duration::from_millis(delay)).await;
				}
				attempt += 1;
				match self.probe().await {
					Ok(probe) if ready(&probe) => return Ok(probe),
					Ok(_) => {}
					Err(e) if e.is_target_closed() => return Err(e),
					Err(e) => tracing::trace!(target = "rhombus", selector = %self.selector, error = %e, "probe failed"),
				}
			}
		})
		.await;

		waited.map_err(|_| {
			tracing::debug!(target = "rhombus", selector = %self.selector, condition, attempts = attempt, "wait timed out");
			Error::timeout(timeout, format!("{} to be {condition}", self.selector))
		})?
	}

	/// Clicks the centre of the element once it is visible and enabled.
	pub async fn click(&self, timeout: Duration) -> Result<()> {
		self.poll(timeout, "visible and enabled", Probe::actionable).await?;
		let expr = js::click_point_expression(&self.selector.to_json(), self.selector.resolved_index());
		let point = self.page.evaluate_json(&expr).await?;
		let (Some(x), Some(y)) = (point["x"].as_f64(), point["y"].as_f64()) else {
			return Err(Error::ElementNotFound(self.selector.to_string()));
		};
		tracing::debug!(target = "rhombus", selector = %self.selector, x, y, "click");
		self.page.click_at(x, y).await
	}

	/// Replaces the element's value with `text`.
	pub async fn fill(&self, text: &str, timeout: Duration) -> Result<()> {
		self.poll(timeout, "visible and enabled", Probe::actionable).await?;
		let expr = js::focus_and_clear_expression(&self.selector.to_json(), self.selector.resolved_index());
		if self.page.evaluate_json(&expr).await? != json!(true) {
			return Err(Error::ElementNotFound(self.selector.to_string()));
		}
		tracing::debug!(target = "rhombus", selector = %self.selector, chars = text.chars().count(), "fill");
		if text.is_empty() {
			return Ok(());
		}
		self.page.insert_text(text).await
	}

	/// Focuses the element and presses `key`.
	pub async fn press(&self, key: &str, timeout: Duration) -> Result<()> {
		self.poll(timeout, "attached", |p| p.found).await?;
		let expr = js::focus_expression(&self.selector.to_json(), self.selector.resolved_index());
		if self.page.evaluate_json(&expr).await? != json!(true) {
			return Err(Error::ElementNotFound(self.selector.to_string()));
		}
		tracing::debug!(target = "rhombus", selector = %self.selector, key, "press");
		self.page.press(key).await
	}

	/// Attaches local files to an `<input type="file">`.
	///
	/// Only attachment is required; file inputs are commonly hidden.
	pub async fn set_input_files(&self, files: &[PathBuf], timeout: Duration) -> Result<()> {
		let files = files
			.iter()
			.map(|path| {
				std::fs::canonicalize(path).map_err(|e| {
					Error::Io(std::io::Error::new(e.kind(), format!("{}: {e}", path.display())))
				})
			})
			.collect::<Result<Vec<_>>>()?;

		self.poll(timeout, "attached", |p| p.found).await?;
		let expr = js::element_expression(&self.selector.to_json(), self.selector.resolved_index());
		let object_id = self
			.page
			.evaluate_handle(&expr)
			.await?
			.ok_or_else(|| Error::ElementNotFound(self.selector.to_string()))?;

		let files: Vec<String> = files.iter().map(|p| p.display().to_string()).collect();
		tracing::debug!(target = "rhombus", selector = %self.selector, ?files, "set input files");
		let result = self
			.page
			.channel()
			.send_no_result("DOM.setFileInputFiles", json!({ "files": files, "objectId": object_id }))
			.await;
		self.page.release(&object_id).await;
		result?;
		self.page.slow_down().await;
		Ok(())
	}
}

#[async_trait]
impl LocatorLike for Locator {
	fn selector(&self) -> &Selector {
		&self.selector
	}

	async fn is_visible(&self) -> Result<bool> {
		Locator::is_visible(self).await
	}

	async fn wait_for(&self, state: WaitState, timeout: Duration) -> Result<()> {
		Locator::wait_for(self, state, timeout).await
	}

	async fn click(&self, timeout: Duration) -> Result<()> {
		Locator::click(self, timeout).await
	}

	async fn fill(&self, text: &str, timeout: Duration) -> Result<()> {
		Locator::fill(self, text, timeout).await
	}

	async fn press(&self, key: &str, timeout: Duration) -> Result<()> {
		Locator::press(self, key, timeout).await
	}

	async fn set_input_files(&self, files: &[PathBuf], timeout: Duration) -> Result<()> {
		Locator::set_input_files(self, files, timeout).await
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn probe(found: bool, visible: bool, enabled: bool) -> Probe {
		Probe {
			count: usize::from(found),
			found,
			visible,
			enabled,
		}
	}

	#[test]
	fn hidden_file_inputs_are_attached_but_not_visible() {
		let p = probe(true, false, true);
		assert!(p.satisfies(WaitState::Attached));
		assert!(!p.satisfies(WaitState::Visible));
		assert!(p.satisfies(WaitState::Hidden));
	}

	#[test]
	fn disabled_elements_are_not_actionable() {
		assert!(!probe(true, true, false).actionable());
		assert!(probe(true, true, true).actionable());
	}

	#[test]
	fn probe_decodes_page_result() {
		let p: Probe = serde_json::from_value(json!({"count": 2, "found": true, "visible": true, "enabled": false})).unwrap();
		assert_eq!(p.count, 2);
		assert!(!p.actionable());
	}
}
