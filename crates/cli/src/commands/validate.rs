use std::path::PathBuf;

use anyhow::Result;
use rhombus::SuiteConfig;
use rhombus::validation;
use tracing::info;

pub fn run(config: &SuiteConfig, input: Option<PathBuf>, output: Option<PathBuf>) -> Result<()> {
	let input = input.unwrap_or_else(|| config.input_fixture.clone());
	let output = output.unwrap_or_else(|| config.downloaded_output.clone());

	let report = validation::validate_files(&input, &output)?;
	info!(input = %input.display(), output = %output.display(), "output is valid");
	println!("{report}");
	Ok(())
}
