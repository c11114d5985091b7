use std::env;
use std::fmt::{Display, Formatter};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration as StdDuration;

use serde::{Deserialize, Serialize};

use crate::domain::{DEFAULT_DURATION_SECONDS, MAX_DURATION_SECONDS};

const CONFIG_FILE: &str = "config.toml";
const APP_DIR: &str = "countdown_deck";

#[derive(Debug)]
pub enum ConfigError {
	Io(std::io::Error),
	TomlDecode(toml::de::Error),
	TomlEncode(toml::ser::Error),
	Invalid(String),
}

impl Display for ConfigError {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		match self {
			ConfigError::Io(err) => write!(f, "io error: {err}"),
			ConfigError::TomlDecode(err) => write!(f, "failed to parse config: {err}"),
			ConfigError::TomlEncode(err) => write!(f, "failed to encode config: {err}"),
			ConfigError::Invalid(message) => write!(f, "invalid config: {message}"),
		}
	}
}

impl std::error::Error for ConfigError {}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
	pub default_duration_seconds: u32,
	pub poll_interval_ms: u64,
	pub bell: bool,
	pub log_filter: String,
}

impl Default for Config {
	fn default() -> Self {
		Self {
			default_duration_seconds: DEFAULT_DURATION_SECONDS,
			poll_interval_ms: 250,
			bell: true,
			log_filter: "info".to_string(),
		}
	}
}

impl Config {
	pub fn validate(&self) -> Result<(), ConfigError> {
		if !(1..=MAX_DURATION_SECONDS).contains(&self.default_duration_seconds) {
			return Err(ConfigError::Invalid(format!(
				"default_duration_seconds must be between 1 and {MAX_DURATION_SECONDS}, got {}",
				self.default_duration_seconds
			)));
		}

		if !(10..=1000).contains(&self.poll_interval_ms) {
			return Err(ConfigError::Invalid(format!(
				"poll_interval_ms must be between 10 and 1000, got {}",
				self.poll_interval_ms
			)));
		}

		if self.log_filter.trim().is_empty() {
			return Err(ConfigError::Invalid("log_filter must not be empty".to_string()));
		}

		Ok(())
	}

	pub fn poll_interval(&self) -> StdDuration {
		StdDuration::from_millis(self.poll_interval_ms)
	}

	pub fn to_toml(&self) -> Result<String, ConfigError> {
		toml::to_string_pretty(self).map_err(ConfigError::TomlEncode)
	}
}

/// Picks the config file: `--config`, then `COUNTDOWN_DECK_CONFIG`, then the
/// per-user config directory. `None` when no location can be derived.
pub fn resolve_config_path(cli_path: Option<PathBuf>) -> Option<PathBuf> {
	if let Some(path) = cli_path {
		return Some(path);
	}

	if let Some(path) = env::var_os("COUNTDOWN_DECK_CONFIG") {
		let path = PathBuf::from(path);
		if !path.as_os_str().is_empty() {
			return Some(path);
		}
	}

	config_dir().map(|dir| dir.join(CONFIG_FILE))
}

pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
	let raw = match fs::read_to_string(path) {
		Ok(raw) => raw,
		Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Config::default()),
		Err(err) => return Err(ConfigError::Io(err)),
	};

	let config: Config = toml::from_str(&raw).map_err(ConfigError::TomlDecode)?;
	config.validate()?;
	Ok(config)
}

pub fn save_config(path: &Path, config: &Config) -> Result<(), ConfigError> {
	if let Some(parent) = path.parent() {
		if !parent.as_os_str().is_empty() {
			fs::create_dir_all(parent).map_err(ConfigError::Io)?;
		}
	}

	fs::write(path, config.to_toml()?).map_err(ConfigError::Io)
}

fn config_dir() -> Option<PathBuf> {
	#[cfg(target_os = "windows")]
	{
		if let Some(path) = env::var_os("APPDATA") {
			return Some(PathBuf::from(path).join(APP_DIR));
		}
	}

	if let Some(path) = env::var_os("XDG_CONFIG_HOME") {
		return Some(PathBuf::from(path).join(APP_DIR));
	}

	env::var_os("HOME").map(|home| PathBuf::from(home).join(".config").join(APP_DIR))
}
