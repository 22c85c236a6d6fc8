use clap::Parser;
use gtp_cli::{cli::Cli, commands, logging};

#[tokio::main]
async fn main() {
	let cli = Cli::parse();
	logging::init_logging(cli.verbose);

	if let Err(err) = commands::dispatch(cli).await {
		tracing::error!(target = "gtp.cli", code = err.code(), "{err}");
		eprintln!("error: {err}");
		std::process::exit(1);
	}
}
