use std::{str::FromStr, time::Duration};

use tracing::Level;

use crate::feed::RetryPolicy;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
	#[error("{name} has an invalid value {value:?}")]
	Invalid { name: &'static str, value: String },
}

/// Runtime configuration, read from the environment (and `.env`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
	/// `PORT`, the port to listen on.
	pub port: u16,
	/// `DATABASE_URL`. Without it, posts are kept in memory.
	pub database_url: Option<String>,
	/// `LOG_LEVEL`
	pub log_level: Level,
	/// `FEED_RETRY_BASE_MS` and `FEED_RETRY_MAX_MS`
	pub retry: RetryPolicy,
}

impl Config {
	pub fn from_env() -> Result<Self, ConfigError> {
		dotenvy::dotenv().ok();

		Self::from_lookup(|name| std::env::var(name).ok())
	}

	pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
		let defaults = RetryPolicy::default();

		Ok(Self {
			port: parse(&lookup, "PORT")?.unwrap_or(3000),
			database_url: lookup("DATABASE_URL").filter(|url| !url.is_empty()),
			log_level: parse(&lookup, "LOG_LEVEL")?.unwrap_or(Level::INFO),
			retry: RetryPolicy::new(
				parse(&lookup, "FEED_RETRY_BASE_MS")?
					.map_or(defaults.base, Duration::from_millis),
				parse(&lookup, "FEED_RETRY_MAX_MS")?
					.map_or(defaults.max, Duration::from_millis),
			),
		})
	}
}

fn parse<T: FromStr>(
	lookup: impl Fn(&str) -> Option<String>,
	name: &'static str,
) -> Result<Option<T>, ConfigError> {
	lookup(name)
		.map(|value| {
			value
				.trim()
				.parse()
				.map_err(|_| ConfigError::Invalid { name, value })
		})
		.transpose()
}
