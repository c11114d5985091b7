mod board;
mod config;
mod domain;
mod logging;
mod schedule;
mod ui;

use std::error::Error;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing::info;

use crate::config::{load_config, resolve_config_path, save_config, Config};
use crate::domain::{format_time, DurationInput};
use crate::logging::init_logging;
use crate::ui::run_dashboard;

#[derive(Debug, Parser)]
#[command(name = "countdown-deck", about = "Up to five countdown timers in the terminal")]
struct Cli {
	#[arg(long)]
	config: Option<PathBuf>,
	/// Duration for new timers as MM:SS (or plain seconds).
	#[arg(long, value_parser = parse_duration_arg)]
	duration: Option<u32>,
	#[command(subcommand)]
	command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
	Dashboard,
	/// Write the default config file.
	InitConfig {
		#[arg(long)]
		force: bool,
	},
	/// Print the effective config.
	Config,
}

fn main() {
	if let Err(err) = run() {
		eprintln!("error: {err}");
		std::process::exit(1);
	}
}

fn run() -> Result<(), Box<dyn Error>> {
	let cli = Cli::parse();

	let config_path = resolve_config_path(cli.config);
	let mut config = match &config_path {
		Some(path) => load_config(path)?,
		None => Config::default(),
	};
	if let Some(duration) = cli.duration {
		config.default_duration_seconds = duration;
	}
	config.validate()?;

	match cli.command.unwrap_or(Command::Dashboard) {
		Command::Dashboard => {
			match init_logging(&config.log_filter) {
				Ok(path) => info!(log = %path.display(), "logging started"),
				Err(err) => eprintln!("warning: logging disabled: {err}"),
			}
			info!(
				default_duration = %format_time(config.default_duration_seconds),
				"opening dashboard"
			);
			run_dashboard(&config)?;
		}
		Command::InitConfig { force } => {
			let path = config_path.ok_or("no config location: pass --config or set HOME")?;
			if path.exists() && !force {
				return Err(format!("{} already exists, pass --force to overwrite", path.display()).into());
			}
			save_config(&path, &Config::default())?;
			println!("wrote config to {}", path.display());
		}
		Command::Config => {
			if let Some(path) = &config_path {
				println!("# {}", path.display());
			}
			print!("{}", config.to_toml()?);
		}
	}

	Ok(())
}

fn parse_duration_arg(raw: &str) -> Result<u32, String> {
	let input = DurationInput::parse_clock(raw)?;
	input.total_seconds().map_err(|_| {
		format!("'{raw}' is out of range: minutes and seconds must each be at most 60 and the total above zero")
	})
}

#[cfg(test)]
mod tests {
	use super::parse_duration_arg;

	#[test]
	fn duration_argument_accepts_clock_and_seconds() {
		assert_eq!(parse_duration_arg("05:00"), Ok(300));
		assert_eq!(parse_duration_arg("45"), Ok(45));
		assert_eq!(parse_duration_arg("90"), Ok(90));
	}

	#[test]
	fn duration_argument_rejects_bad_values() {
		assert!(parse_duration_arg("00:00").is_err());
		assert!(parse_duration_arg("61:00").is_err());
		assert!(parse_duration_arg("0:90").is_err());
		assert!(parse_duration_arg("five").is_err());
	}
}
