use clap::Parser;
use rhombus_smoke_cli::{cli::Cli, commands, logging};

#[tokio::main]
async fn main() {
	rhombus::config::load_dotenv();
	let cli = Cli::parse();
	logging::init_logging(cli.verbose);

	if let Err(err) = commands::dispatch(cli).await {
		tracing::error!(error = %format!("{err:#}"), "run failed");
		std::process::exit(1);
	}
}
