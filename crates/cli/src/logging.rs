use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::writer::MakeWriterExt;

/// Filter used when `RUST_LOG` is unset.
///
/// 0 logs errors only and 1 (`-v`) adds game progress and engine lifecycle.
/// 2+ (`-vv`) logs every GTP line, engine stderr included.
fn default_directives(verbosity: u8) -> &'static str {
	match verbosity {
		0 => "error",
		1 => "info,gtp.connection=warn",
		_ => "debug",
	}
}

pub fn init_logging(verbosity: u8) {
	let env_filter =
		EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directives(verbosity)));

	tracing_subscriber::fmt()
		.with_env_filter(env_filter)
		.with_writer(std::io::stderr.with_max_level(tracing::Level::TRACE))
		.with_target(true)
		.compact()
		.init();
}
