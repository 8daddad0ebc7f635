use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};
use rhombus::SuiteConfig;
use rhombus::config::parse_base_url;

#[derive(Parser, Debug)]
#[command(name = "rhombus-smoke")]
#[command(about = "Smoke checks for the Rhombus AI web app")]
#[command(version)]
pub struct Cli {
	/// Increase verbosity (-v debug for the suite, -vv debug for everything)
	#[arg(short, long, global = true, action = clap::ArgAction::Count)]
	pub verbose: u8,

	/// App under test
	#[arg(long, global = true, value_name = "URL", env = "RHOMBUS_BASE_URL")]
	pub base_url: Option<String>,

	/// Session artifact to write or read
	#[arg(long, global = true, value_name = "FILE")]
	pub auth: Option<PathBuf>,

	/// Show the browser window
	#[arg(long, global = true)]
	pub headed: bool,

	/// Pause after every browser action
	#[arg(long, global = true, value_name = "MS")]
	pub slow_mo: Option<u64>,

	/// Connect to an existing DevTools endpoint instead of launching Chromium
	#[arg(long, global = true, value_name = "URL")]
	pub cdp_endpoint: Option<String>,

	/// Retry each failed check this many times (defaults to 1 on CI, 0 elsewhere)
	#[arg(long, global = true, value_name = "N")]
	pub retries: Option<u32>,

	#[command(subcommand)]
	pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
	/// Log in through the UI, create a project and save the session
	Setup,

	/// Check the `/api/me` contract with and without the saved session
	Api {
		/// Bootstrap a fresh session even if one is saved
		#[arg(long)]
		fresh: bool,
	},

	/// Check a downloaded CSV against the input fixture
	Validate {
		/// Input fixture (defaults to fixtures/messy-input.csv)
		#[arg(long, value_name = "FILE")]
		input: Option<PathBuf>,
		/// Transformed output (defaults to data-validation/output/downloaded-output.csv)
		#[arg(long, value_name = "FILE")]
		output: Option<PathBuf>,
	},

	/// Inspect the saved session
	Auth {
		#[command(subcommand)]
		action: AuthAction,
	},
}

#[derive(Subcommand, Debug)]
pub enum AuthAction {
	/// Show cookies and origins in the session artifact
	Show,
}

impl Cli {
	/// Applies command-line overrides on top of `config`.
	pub fn apply(&self, mut config: SuiteConfig) -> rhombus::Result<SuiteConfig> {
		if let Some(base) = self.base_url.as_deref().map(str::trim).filter(|b| !b.is_empty()) {
			config.base_url = parse_base_url(base)?;
		}
		if let Some(path) = &self.auth {
			config.storage_state_path = path.clone();
		}
		if self.headed {
			config.browser.headless = false;
		}
		if let Some(ms) = self.slow_mo {
			config.browser.slow_mo = Duration::from_millis(ms);
		}
		if let Some(endpoint) = &self.cdp_endpoint {
			config.browser.cdp_endpoint = Some(endpoint.clone());
		}
		if let Some(retries) = self.retries {
			config.retry.retries = retries;
		}
		Ok(config)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn parse(args: &[&str]) -> Cli {
		Cli::try_parse_from(std::iter::once("rhombus-smoke").chain(args.iter().copied())).unwrap()
	}

	#[test]
	fn global_flags_override_config() {
		let cli = parse(&[
			"api",
			"--base-url",
			"http://localhost:5173",
			"--auth",
			"/tmp/state.json",
			"--headed",
			"--slow-mo",
			"250",
			"--retries",
			"3",
		]);
		let config = cli.apply(SuiteConfig::default()).unwrap();

		assert_eq!(config.base_url.as_str(), "http://localhost:5173/");
		assert_eq!(config.storage_state_path, PathBuf::from("/tmp/state.json"));
		assert!(!config.browser.headless);
		assert_eq!(config.browser.slow_mo, Duration::from_millis(250));
		assert_eq!(config.retry.attempts(), 4);
		assert!(matches!(cli.command, Commands::Api { fresh: false }));
	}

	#[test]
	fn no_flags_keep_config() {
		let cli = parse(&["setup"]);
		let base = SuiteConfig::default();
		let config = cli.apply(base.clone()).unwrap();

		assert_eq!(config.storage_state_path, base.storage_state_path);
		assert_eq!(config.browser, base.browser);
		assert_eq!(config.retry, base.retry);
	}

	#[test]
	fn rejects_non_http_base_url() {
		let cli = parse(&["setup", "--base-url", "ftp://example.com"]);
		assert!(cli.apply(SuiteConfig::default()).is_err());
	}

	#[test]
	fn parses_nested_auth_show() {
		let cli = parse(&["-vv", "auth", "show"]);
		assert_eq!(cli.verbose, 2);
		assert!(matches!(
			cli.command,
			Commands::Auth {
				action: AuthAction::Show
			}
		));
	}

	#[test]
	fn validate_takes_paths() {
		let cli = parse(&["validate", "--output", "out.csv"]);
		match cli.command {
			Commands::Validate { input, output } => {
				assert_eq!(input, None);
				assert_eq!(output, Some(PathBuf::from("out.csv")));
			}
			other => panic!("unexpected {other:?}"),
		}
	}
}
