//! Optional UI steps.

use std::time::Duration;

use crate::selector::WaitState;
use crate::testing::LocatorLike;

/// Clicks `locator` if it shows up within `wait`.
///
/// Returns `true` when the click happened and `false` when the step was
/// skipped. Nothing here fails the caller: an element that never appears, a
/// probe that errors, or a click that fails all count as skipped.
pub async fn best_effort(locator: &dyn LocatorLike, wait: Duration) -> bool {
	if let Err(e) = locator.wait_for(WaitState::Visible, wait).await {
		tracing::debug!(target = "rhombus", selector = %locator.selector(), error = %e, "optional step skipped");
		return false;
	}
	match locator.click(wait).await {
		Ok(()) => {
			tracing::debug!(target = "rhombus", selector = %locator.selector(), "optional step clicked");
			true
		}
		Err(e) => {
			tracing::warn!(target = "rhombus", selector = %locator.selector(), error = %e, "optional click failed");
			false
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::selector::{Selector, TextMatcher};
	use crate::testing::{MockAction, MockPage, PageLike};

	const WAIT: Duration = Duration::from_millis(10);

	fn upload() -> Selector {
		Selector::role("button", Some(TextMatcher::regex_ignore_case("^upload$")))
	}

	#[tokio::test]
	async fn clicks_when_visible() {
		let page = MockPage::new();
		page.set_visible(&upload(), true);
		assert!(best_effort(page.select(upload()).as_ref(), WAIT).await);
		assert_eq!(
			page.actions(),
			vec![MockAction::Click {
				selector: upload().to_string()
			}]
		);
	}

	#[tokio::test]
	async fn skips_when_absent() {
		let page = MockPage::new();
		assert!(!best_effort(page.select(upload()).as_ref(), WAIT).await);
		assert!(page.actions().is_empty());
	}

	#[tokio::test]
	async fn skips_when_probe_errors() {
		let page = MockPage::all_visible();
		page.fail_probe(&upload());
		assert!(!best_effort(page.select(upload()).as_ref(), WAIT).await);
		assert!(page.actions().is_empty());
	}
}
