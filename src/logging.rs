use std::env;
use std::error::Error;
use std::fs::{self, OpenOptions};
use std::path::PathBuf;
use std::sync::Mutex;

use tracing_subscriber::EnvFilter;

const LOG_FILE: &str = "countdown_deck.log";
const APP_DIR: &str = "countdown_deck";

/// Sends tracing output to a file in the state directory, since the
/// dashboard owns the terminal. `COUNTDOWN_DECK_LOG` overrides `filter`.
pub fn init_logging(filter: &str) -> Result<PathBuf, Box<dyn Error>> {
	let dir = state_dir();
	fs::create_dir_all(&dir)?;
	let path = dir.join(LOG_FILE);
	let file = OpenOptions::new().create(true).append(true).open(&path)?;

	let filter = match env::var("COUNTDOWN_DECK_LOG") {
		Ok(value) if !value.trim().is_empty() => EnvFilter::try_new(value)?,
		_ => EnvFilter::try_new(filter)?,
	};

	tracing_subscriber::fmt()
		.with_env_filter(filter)
		.with_writer(Mutex::new(file))
		.with_ansi(false)
		.try_init()
		.map_err(|err| err.to_string())?;

	Ok(path)
}

fn state_dir() -> PathBuf {
	if let Some(path) = env::var_os("COUNTDOWN_DECK_STATE_DIR") {
		return PathBuf::from(path);
	}

	#[cfg(target_os = "windows")]
	{
		if let Some(path) = env::var_os("LOCALAPPDATA") {
			return PathBuf::from(path).join(APP_DIR);
		}
	}

	if let Some(path) = env::var_os("XDG_STATE_HOME") {
		return PathBuf::from(path).join(APP_DIR);
	}

	if let Some(path) = env::var_os("HOME") {
		return PathBuf::from(path).join(".local").join("state").join(APP_DIR);
	}

	PathBuf::from(".countdown_deck")
}
