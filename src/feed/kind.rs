use std::{fmt, str::FromStr};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::{
	store::{FeedQuery, Filter},
	Error,
};

/// The two post feeds of the app.
///
/// Open Jio holds same-day requests and only shows the last day of posts.
/// Open Letters is durable and shows everything.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FeedKind {
	OpenJio,
	OpenLetters,
}

impl FeedKind {
	pub const ALL: [Self; 2] = [Self::OpenJio, Self::OpenLetters];

	/// The collection the feed's posts are stored in.
	pub fn collection(self) -> &'static str {
		match self {
			Self::OpenJio => "openJioPosts",
			Self::OpenLetters => "openLetterPosts",
		}
	}

	/// How far back the feed looks, if it is limited at all.
	pub fn window(self) -> Option<Duration> {
		match self {
			Self::OpenJio => Some(Duration::hours(24)),
			Self::OpenLetters => None,
		}
	}

	/// Builds the feed's query as seen at `now`.
	///
	/// The cutoff is fixed here and does not move while a subscription
	/// built from this query stays open.
	pub fn query(self, now: DateTime<Utc>) -> FeedQuery {
		let query = FeedQuery::new(self.collection());

		match self.window() {
			Some(window) => query.filter(Filter::TimestampAtLeast(now - window)),
			None => query,
		}
	}

	pub fn title(self) -> &'static str {
		match self {
			Self::OpenJio => "Open Jio!",
			Self::OpenLetters => "Open Letters",
		}
	}

	pub fn slug(self) -> &'static str {
		match self {
			Self::OpenJio => "open-jio",
			Self::OpenLetters => "open-letters",
		}
	}
}

impl fmt::Display for FeedKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.slug())
	}
}

impl FromStr for FeedKind {
	type Err = Error;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Self::ALL
			.into_iter()
			.find(|kind| kind.slug() == s)
			.ok_or_else(|| Error::UnknownFeed(s.to_owned()))
	}
}
