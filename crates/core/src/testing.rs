//! Page abstractions and test doubles.
//!
//! The bootstrap flow is written against [`PageLike`] and [`LocatorLike`] so it
//! can run against a real [`crate::Page`] or a [`MockPage`] that records what
//! would have happened.
//!
//! # Example
//!
//! ```ignore
//! use rhombus::testing::{MockAction, MockPage};
//!
//! let page = MockPage::all_visible();
//! page.set_visible(&Selector::role("link", None), false);
//! // ... drive the page
//! assert!(page.actions().iter().any(|a| matches!(a, MockAction::Click { .. })));
//! ```

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::error::{Error, Result};
use crate::page::WaitUntil;
use crate::selector::{Selector, WaitState};

/// Page operations the suite needs.
#[async_trait]
pub trait PageLike: Send + Sync {
	/// Navigates to `url` and waits for `wait_until`.
	async fn goto(&self, url: &str, wait_until: WaitUntil) -> Result<()>;

	/// Creates a [`LocatorLike`] for `selector`.
	fn select(&self, selector: Selector) -> Box<dyn LocatorLike + '_>;
}

/// Element operations the suite needs.
///
/// Actions wait up to `timeout` for the element to become actionable and fail
/// with [`Error::Timeout`] otherwise.
#[async_trait]
pub trait LocatorLike: Send + Sync {
	fn selector(&self) -> &Selector;

	/// Whether the element is visible right now.
	async fn is_visible(&self) -> Result<bool>;

	async fn wait_for(&self, state: WaitState, timeout: Duration) -> Result<()>;

	async fn click(&self, timeout: Duration) -> Result<()>;

	/// Replaces the element's value with `text`.
	async fn fill(&self, text: &str, timeout: Duration) -> Result<()>;

	async fn press(&self, key: &str, timeout: Duration) -> Result<()>;

	async fn set_input_files(&self, files: &[PathBuf], timeout: Duration) -> Result<()>;
}

/// Action recorded by [`MockPage`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockAction {
	Goto { url: String },
	Click { selector: String },
	Fill { selector: String, text: String },
	Press { selector: String, key: String },
	SetInputFiles { selector: String, files: Vec<PathBuf> },
}

/// Element presence as seen by [`MockPage`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockElement {
	Missing,
	/// In the DOM but not visible, like a styled-away file input.
	Hidden,
	Visible,
}

/// Mock page for exercising flows without a browser.
///
/// Elements are keyed by their selector's display form. Unknown selectors use
/// the page default set by [`MockPage::new`] or [`MockPage::all_visible`].
#[derive(Debug)]
pub struct MockPage {
	default: MockElement,
	elements: Mutex<HashMap<String, MockElement>>,
	failing_presses: Mutex<HashSet<String>>,
	probe_errors: Mutex<HashSet<String>>,
	actions: Mutex<Vec<MockAction>>,
}

impl Default for MockPage {
	fn default() -> Self {
		Self::new()
	}
}

impl MockPage {
	/// A page where nothing can be found.
	pub fn new() -> Self {
		Self::with_default(MockElement::Missing)
	}

	/// A page where every selector resolves to a visible element.
	pub fn all_visible() -> Self {
		Self::with_default(MockElement::Visible)
	}

	fn with_default(default: MockElement) -> Self {
		Self {
			default,
			elements: Mutex::new(HashMap::new()),
			failing_presses: Mutex::new(HashSet::new()),
			probe_errors: Mutex::new(HashSet::new()),
			actions: Mutex::new(Vec::new()),
		}
	}

	pub fn set_element(&self, selector: &Selector, element: MockElement) {
		self.elements.lock().insert(selector.to_string(), element);
	}

	pub fn set_visible(&self, selector: &Selector, visible: bool) {
		let element = if visible { MockElement::Visible } else { MockElement::Missing };
		self.set_element(selector, element);
	}

	/// Makes key presses on `selector` fail.
	pub fn fail_press(&self, selector: &Selector) {
		self.failing_presses.lock().insert(selector.to_string());
	}

	/// Makes visibility probes on `selector` error out.
	pub fn fail_probe(&self, selector: &Selector) {
		self.probe_errors.lock().insert(selector.to_string());
	}

	/// Actions performed so far, in order.
	pub fn actions(&self) -> Vec<MockAction> {
		self.actions.lock().clone()
	}

	fn record(&self, action: MockAction) {
		self.actions.lock().push(action);
	}

	fn element(&self, key: &str) -> MockElement {
		self.elements.lock().get(key).copied().unwrap_or(self.default)
	}
}

#[async_trait]
impl PageLike for MockPage {
	async fn goto(&self, url: &str, _wait_until: WaitUntil) -> Result<()> {
		self.record(MockAction::Goto { url: url.to_string() });
		Ok(())
	}

	fn select(&self, selector: Selector) -> Box<dyn LocatorLike + '_> {
		Box::new(MockLocator {
			key: selector.to_string(),
			selector,
			page: self,
		})
	}
}

/// Locator returned by [`MockPage::select`].
pub struct MockLocator<'a> {
	selector: Selector,
	key: String,
	page: &'a MockPage,
}

impl MockLocator<'_> {
	fn element(&self) -> MockElement {
		self.page.element(&self.key)
	}

	fn require(&self, ok: bool, condition: &str, timeout: Duration) -> Result<()> {
		if ok {
			Ok(())
		} else {
			Err(Error::timeout(timeout, format!("{} to be {condition}", self.key)))
		}
	}
}

#[async_trait]
impl<'a> LocatorLike for MockLocator<'a> {
	fn selector(&self) -> &Selector {
		&self.selector
	}

	async fn is_visible(&self) -> Result<bool> {
		if self.page.probe_errors.lock().contains(&self.key) {
			return Err(rhombus_runtime::Error::Evaluation(format!("probe failed for {}", self.key)).into());
		}
		Ok(self.element() == MockElement::Visible)
	}

	async fn wait_for(&self, state: WaitState, timeout: Duration) -> Result<()> {
		let element = self.element();
		let ok = match state {
			WaitState::Attached => element != MockElement::Missing,
			WaitState::Visible => self.is_visible().await?,
			WaitState::Hidden => element != MockElement::Visible,
		};
		self.require(ok, &state.to_string(), timeout)
	}

	async fn click(&self, timeout: Duration) -> Result<()> {
		self.require(self.element() == MockElement::Visible, "visible and enabled", timeout)?;
		self.page.record(MockAction::Click {
			selector: self.key.clone(),
		});
		Ok(())
	}

	async fn fill(&self, text: &str, timeout: Duration) -> Result<()> {
		self.require(self.element() == MockElement::Visible, "visible and enabled", timeout)?;
		self.page.record(MockAction::Fill {
			selector: self.key.clone(),
			text: text.to_string(),
		});
		Ok(())
	}

	async fn press(&self, key: &str, timeout: Duration) -> Result<()> {
		self.require(self.element() != MockElement::Missing, "attached", timeout)?;
		if self.page.failing_presses.lock().contains(&self.key) {
			return Err(rhombus_runtime::Error::TargetClosed(format!("press {key} on {}", self.key)).into());
		}
		self.page.record(MockAction::Press {
			selector: self.key.clone(),
			key: key.to_string(),
		});
		Ok(())
	}

	async fn set_input_files(&self, files: &[PathBuf], timeout: Duration) -> Result<()> {
		self.require(self.element() != MockElement::Missing, "attached", timeout)?;
		self.page.record(MockAction::SetInputFiles {
			selector: self.key.clone(),
			files: files.to_vec(),
		});
		Ok(())
	}
}
