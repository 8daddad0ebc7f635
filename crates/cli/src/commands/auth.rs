use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result};
use rhombus::SessionArtifact;
use serde_json::{Value, json};

pub fn show(path: &Path) -> Result<()> {
	super::print_json(&summary(path)?)
}

/// Cookie and origin summary of the artifact at `path`; values stay hidden.
pub fn summary(path: &Path) -> Result<Value> {
	let state = SessionArtifact::new(path)
		.load()
		.with_context(|| format!("failed to read session from {}", path.display()))?;
	let now = SystemTime::now()
		.duration_since(UNIX_EPOCH)
		.map(|d| d.as_secs_f64())
		.unwrap_or(0.0);

	let cookies: Vec<_> = state
		.cookies
		.iter()
		.map(|cookie| {
			json!({
				"name": cookie.name,
				"domain": cookie.domain,
				"expires": format_expiry(cookie.expires, now),
			})
		})
		.collect();

	let origins: Vec<_> = state
		.origins
		.iter()
		.map(|origin| {
			let keys: Vec<_> = origin.local_storage.iter().map(|entry| entry.name.as_str()).collect();
			json!({ "origin": origin.origin, "localStorage": keys })
		})
		.collect();

	Ok(json!({
		"file": path,
		"cookies": cookies,
		"cookieCount": state.cookies.len(),
		"origins": origins,
		"originCount": state.origins.len(),
	}))
}

fn format_expiry(expires: Option<f64>, now: f64) -> String {
	match expires {
		None => "session".into(),
		Some(ts) if ts < 0.0 => "session".into(),
		Some(ts) if ts < now => "expired".into(),
		Some(ts) => {
			let hours = (ts - now) / 3600.0;
			if hours < 1.0 {
				format!("{}m", (hours * 60.0).ceil() as u64)
			} else if hours < 48.0 {
				format!("{}h", hours.round() as u64)
			} else {
				format!("{}d", (hours / 24.0).round() as u64)
			}
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rhombus::{Cookie, StorageState};

	#[test]
	fn formats_expiry_relative_to_now() {
		let now = 1_700_000_000.0;
		assert_eq!(format_expiry(None, now), "session");
		assert_eq!(format_expiry(Some(-1.0), now), "session");
		assert_eq!(format_expiry(Some(now - 1.0), now), "expired");
		assert_eq!(format_expiry(Some(now + 600.0), now), "10m");
		assert_eq!(format_expiry(Some(now + 5.0 * 3600.0), now), "5h");
		assert_eq!(format_expiry(Some(now + 30.0 * 86400.0), now), "30d");
	}

	#[test]
	fn summary_lists_cookie_names_without_values() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("storageState.json");
		StorageState::with_cookies(vec![Cookie::new("sid", "s3cret", "rhombusai.com").path("/")])
			.to_file(&path)
			.unwrap();

		let summary = summary(&path).unwrap();
		assert_eq!(summary["cookieCount"], 1);
		assert_eq!(summary["cookies"][0]["name"], "sid");
		assert_eq!(summary["cookies"][0]["expires"], "session");
		assert!(!summary.to_string().contains("s3cret"));
	}

	#[test]
	fn missing_artifact_points_at_setup() {
		let dir = tempfile::tempdir().unwrap();
		let err = summary(&dir.path().join("nope.json")).unwrap_err();
		assert!(format!("{err:#}").contains("not found"), "{err:#}");
	}
}
