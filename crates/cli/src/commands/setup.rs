use anyhow::Result;
use rhombus::{Credentials, SessionBootstrap, SuiteConfig, harness};
use serde_json::json;
use tracing::info;

pub async fn run(config: &SuiteConfig) -> Result<()> {
	Credentials::from_env()?;
	let bootstrap = SessionBootstrap::new(config.clone());
	// Browser launch and shutdown sit outside the bootstrap's own budget.
	let budget = config.timeouts.test + config.timeouts.action;
	let artifact = harness::run_check("setup", config.retry, budget, || bootstrap.run()).await?;

	info!(path = %artifact.path().display(), "session saved");
	super::print_json(&json!({ "artifact": artifact.path() }))
}
