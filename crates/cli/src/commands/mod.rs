mod api;
mod auth;
mod setup;
mod validate;

use anyhow::Result;
use rhombus::SuiteConfig;

use crate::cli::{AuthAction, Cli, Commands};

pub async fn dispatch(cli: Cli) -> Result<()> {
	let config = cli.apply(SuiteConfig::from_env()?)?;
	tracing::debug!(?config, "resolved suite config");

	match cli.command {
		Commands::Setup => setup::run(&config).await,
		Commands::Api { fresh } => api::run(&config, fresh).await,
		Commands::Validate { input, output } => validate::run(&config, input, output),
		Commands::Auth { action } => match action {
			AuthAction::Show => auth::show(&config.storage_state_path),
		},
	}
}

fn print_json(value: &serde_json::Value) -> Result<()> {
	println!("{}", serde_json::to_string_pretty(value)?);
	Ok(())
}
