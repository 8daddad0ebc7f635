use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::writer::MakeWriterExt;

/// Default filter for a verbosity level; `RUST_LOG` takes precedence.
pub fn default_filter(verbosity: u8) -> &'static str {
	// 0 = suite progress only, DevTools traffic stays quiet
	// 1 (-v) = debug for the suite, warn for the protocol plumbing
	// 2+ (-vv) = debug for everything
	match verbosity {
		0 => "warn,rhombus=info,rhombus_smoke_cli=info",
		1 => "info,rhombus=debug,rhombus_smoke_cli=debug,rhombus_runtime=warn",
		_ => "debug",
	}
}

pub fn init_logging(verbosity: u8) {
	let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter(verbosity)));

	let stderr = std::io::stderr.with_max_level(tracing::Level::TRACE);

	tracing_subscriber::fmt()
		.with_env_filter(env_filter)
		.with_writer(stderr)
		.with_target(true)
		.with_level(true)
		.compact()
		.init();
}
