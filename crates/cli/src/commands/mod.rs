pub mod batch;
pub mod play;

use std::sync::Arc;
use std::time::Duration;

use gtp_runtime::SessionRegistry;
use tokio::io::BufReader;
use tracing::info;

use crate::cli::{Cli, Commands};
use crate::error::Result;

/// Runs the selected subcommand against stdin/stdout.
///
/// Every engine started along the way is shut down before returning.
pub async fn dispatch(cli: Cli) -> Result<()> {
	let config = cli.engine.to_config();
	info!(
		target = "gtp.cli",
		executable = %config.executable.display(),
		model = %config.model.display(),
		config = %config.config.display(),
		"engine configuration"
	);
	let registry = Arc::new(SessionRegistry::from_config(config));

	let stdin = BufReader::new(tokio::io::stdin());
	let mut stdout = std::io::stdout();

	let result = match cli.command {
		Commands::Play(args) => play::execute(&registry, &args, stdin, &mut stdout).await,
		Commands::Batch(args) => {
			let reaper = args.idle_timeout.map(|secs| {
				let max_idle = Duration::from_secs(secs);
				registry.spawn_reaper(reaper_interval(max_idle), max_idle)
			});
			let result = batch::execute(&registry, stdin, &mut stdout).await;
			if let Some(reaper) = reaper {
				reaper.abort();
			}
			result
		}
	};

	registry.shutdown_all().await;
	result
}

/// Checks a few times per idle window, at most once a second.
fn reaper_interval(max_idle: Duration) -> Duration {
	(max_idle / 4).max(Duration::from_secs(1))
}
