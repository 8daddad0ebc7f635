use anyhow::{Result, bail};
use rhombus::{ApiClient, AuthenticatedSession, SuiteConfig, api, harness};
use serde_json::json;

/// Runs both `/api/me` checks and reports each, failing if either did.
pub async fn run(config: &SuiteConfig, fresh: bool) -> Result<()> {
	let session = AuthenticatedSession::load_or_bootstrap(config.clone(), fresh).await?;
	let me = config.api.me.as_str();
	let budget = config.timeouts.expect;

	let client = session.api_client()?;
	let authenticated = harness::run_check("api.me authenticated", config.retry, budget, || {
		api::check_authenticated(&client, me)
	})
	.await;

	let anonymous = ApiClient::anonymous(config)?;
	let unauthenticated = harness::run_check("api.me unauthenticated", config.retry, budget, || {
		api::check_unauthenticated(&anonymous, me)
	})
	.await;

	let failed = usize::from(authenticated.is_err()) + usize::from(unauthenticated.is_err());
	let authenticated = match &authenticated {
		Ok(body) => json!({ "ok": true, "body": body }),
		Err(e) => json!({ "ok": false, "error": e.to_string() }),
	};
	let unauthenticated = match &unauthenticated {
		Ok(status) => json!({ "ok": true, "status": status }),
		Err(e) => json!({ "ok": false, "error": e.to_string() }),
	};
	super::print_json(&json!({
		"endpoint": me,
		"authenticated": authenticated,
		"unauthenticated": unauthenticated,
	}))?;

	if failed > 0 {
		bail!("{failed} of 2 API checks failed");
	}
	Ok(())
}
