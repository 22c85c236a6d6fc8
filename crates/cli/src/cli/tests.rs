use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use super::*;

#[test]
fn parse_play_defaults() {
	let cli = Cli::try_parse_from(["gtp", "play"]).unwrap();

	match cli.command {
		Commands::Play(args) => {
			assert_eq!(args.game_id, None);
			assert_eq!(args.human, HumanColor::Black);
			let settings = args.game.to_settings();
			assert_eq!(settings, GameSettings::default());
		}
		_ => panic!("Expected Play command"),
	}
	assert_eq!(cli.verbose, 0);
}

#[test]
fn parse_play_overrides_difficulty_fields() {
	let args = [
		"gtp",
		"-vv",
		"play",
		"--human",
		"white",
		"--komi",
		"-2.5",
		"--max-visits",
		"400",
		"--playout-advantage",
		"-0.5",
		"--human-profile",
		"rank_3d",
	];
	let cli = Cli::try_parse_from(args).unwrap();
	assert_eq!(cli.verbose, 2);

	match cli.command {
		Commands::Play(args) => {
			assert_eq!(Color::from(args.human), Color::White);
			let settings = args.game.to_settings();
			assert_eq!(settings.komi, -2.5);
			assert_eq!(settings.rules, "tromp-taylor");
			assert_eq!(settings.difficulty.max_visits, Some(400));
			assert_eq!(settings.difficulty.max_time, Some(0.2));
			assert_eq!(settings.difficulty.playout_doubling_advantage, Some(-0.5));
			assert_eq!(settings.difficulty.human_sl_profile.as_deref(), Some("rank_3d"));
		}
		_ => panic!("Expected Play command"),
	}
}

#[test]
fn parse_engine_flags_after_subcommand() {
	let args = [
		"gtp",
		"batch",
		"--idle-timeout",
		"600",
		"--katago",
		"/opt/katago/katago",
		"--model",
		"/opt/models/b18.bin.gz",
		"--command-timeout-ms",
		"0",
	];
	let cli = Cli::try_parse_from(args).unwrap();

	match &cli.command {
		Commands::Batch(args) => assert_eq!(args.idle_timeout, Some(600)),
		_ => panic!("Expected Batch command"),
	}

	assert_eq!(cli.engine.katago, Some(PathBuf::from("/opt/katago/katago")));
	let config = cli.engine.to_config();
	assert_eq!(config.executable, PathBuf::from("/opt/katago/katago"));
	assert_eq!(config.model, PathBuf::from("/opt/models/b18.bin.gz"));
	assert_eq!(config.command_timeout, None);
}

#[test]
fn command_timeout_flag_sets_duration() {
	let cli = Cli::try_parse_from(["gtp", "--command-timeout-ms", "2500", "batch"]).unwrap();
	let config = cli.engine.to_config();
	assert_eq!(config.command_timeout, Some(Duration::from_millis(2500)));
}

#[test]
fn rejects_unknown_color() {
	assert!(Cli::try_parse_from(["gtp", "play", "--human", "red"]).is_err());
}
