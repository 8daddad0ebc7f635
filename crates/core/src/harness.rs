//! Running checks under the suite's timeout and retry policy.

use std::future::Future;
use std::time::Duration;

use crate::config::RetryPolicy;
use crate::error::{Error, Result};

/// Runs `check` until it passes or the retry budget is spent.
///
/// Each attempt is bounded by `timeout`. The last failure is returned; errors
/// that are not [`Error::is_retryable`] end the run on the first attempt.
pub async fn run_check<T, F, Fut>(name: &str, retry: RetryPolicy, timeout: Duration, mut check: F) -> Result<T>
where
	F: FnMut() -> Fut,
	Fut: Future<Output = Result<T>>,
{
	let attempts = retry.attempts();
	let mut attempt = 1;
	loop {
		let outcome = tokio::time::timeout(timeout, check())
			.await
			.unwrap_or_else(|_| Err(Error::timeout(timeout, name)));
		match outcome {
			Ok(value) => {
				tracing::info!(target = "rhombus", check = name, attempt, "passed");
				return Ok(value);
			}
			Err(e) if attempt < attempts && e.is_retryable() => {
				tracing::warn!(target = "rhombus", check = name, attempt, error = %e, "failed; retrying");
				attempt += 1;
			}
			Err(e) => {
				tracing::error!(target = "rhombus", check = name, attempt, error = %e, "failed");
				return Err(e);
			}
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::sync::atomic::{AtomicU32, Ordering};

	#[tokio::test]
	async fn retries_once_on_ci() {
		let counter = AtomicU32::new(0);
		let calls = &counter;
		let result = run_check("flaky", RetryPolicy::for_ci(true), Duration::from_secs(1), || async move {
			if calls.fetch_add(1, Ordering::SeqCst) == 0 {
				Err(Error::Validation("first attempt".into()))
			} else {
				Ok(42)
			}
		})
		.await;
		assert_eq!(result.unwrap(), 42);
		assert_eq!(calls.load(Ordering::SeqCst), 2);
	}

	#[tokio::test]
	async fn no_retry_locally() {
		let counter = AtomicU32::new(0);
		let calls = &counter;
		let result: Result<()> = run_check("broken", RetryPolicy::for_ci(false), Duration::from_secs(1), || async move {
			calls.fetch_add(1, Ordering::SeqCst);
			Err(Error::Validation("nope".into()))
		})
		.await;
		assert!(result.is_err());
		assert_eq!(calls.load(Ordering::SeqCst), 1);
	}

	#[tokio::test]
	async fn missing_credentials_fail_without_retry() {
		let counter = AtomicU32::new(0);
		let calls = &counter;
		let result: Result<()> = run_check("setup", RetryPolicy::for_ci(true), Duration::from_secs(1), || async move {
			calls.fetch_add(1, Ordering::SeqCst);
			Err(Error::MissingCredentials)
		})
		.await;
		assert!(matches!(result, Err(Error::MissingCredentials)));
		assert_eq!(calls.load(Ordering::SeqCst), 1);
	}

	#[tokio::test]
	async fn attempts_are_bounded_by_timeout() {
		let result: Result<()> = run_check("slow", RetryPolicy::default(), Duration::from_millis(50), || async {
			tokio::time::sleep(Duration::from_secs(60)).await;
			Ok(())
		})
		.await;
		assert!(result.unwrap_err().is_timeout());
	}
}
