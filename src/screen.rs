use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::StreamExt;
use serde::Serialize;

use crate::{
	feed::{FeedEvent, FeedKind, FeedSubscription, LiveFeedBinder},
	model::Post,
};

/// Cards per row in the feed grid.
pub const COLUMNS: usize = 2;
/// Titles are cut to a single line of at most this many characters.
pub const TITLE_MAX_CHARS: usize = 28;
/// Bodies are cut to at most this many characters.
pub const BODY_MAX_CHARS: usize = 140;

const ELLIPSIS: char = '…';

/// A fixed-size card in the feed grid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Card {
	pub author: String,
	pub title: String,
	pub body: String,
	/// The untruncated post, handed to the detail screen on tap.
	#[serde(skip)]
	pub post: Post,
}

impl From<Post> for Card {
	fn from(post: Post) -> Self {
		Self {
			author: post.username.clone(),
			title: truncate_line(&post.title, TITLE_MAX_CHARS),
			body: truncate_words(&post.body, BODY_MAX_CHARS),
			post,
		}
	}
}

/// Keeps the first line of `text`, ellipsized to `max` characters.
fn truncate_line(text: &str, max: usize) -> String {
	let mut lines = text.trim().lines();
	let line = lines.next().unwrap_or_default().trim_end();
	let cut = line.chars().count() > max || lines.next().is_some();

	if !cut {
		return line.to_owned();
	}

	let mut line = line.chars().take(max.saturating_sub(1)).collect::<String>();
	line.truncate(line.trim_end().len());
	line.push(ELLIPSIS);
	line
}

/// Ellipsizes `text` to `max` characters, preferring to break between words.
fn truncate_words(text: &str, max: usize) -> String {
	let text = text.trim();

	if text.chars().count() <= max {
		return text.to_owned();
	}

	let mut cut = text.chars().take(max.saturating_sub(1)).collect::<String>();

	if let Some(space) = cut.rfind(char::is_whitespace) {
		if space > 0 {
			cut.truncate(space);
		}
	}

	cut.truncate(cut.trim_end().len());
	cut.push(ELLIPSIS);
	cut
}

/// What the feed screen currently shows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScreenState {
	/// No snapshot has arrived yet.
	Loading,
	/// The feed is live and has no posts.
	Empty,
	Ready { cards: Vec<Card> },
	/// The feed is down. `stale` holds the last cards shown, if any.
	Failed {
		message: String,
		attempt: u32,
		retry_in: Duration,
		stale: Vec<Card>,
	},
}

impl ScreenState {
	/// The cards to draw, which may be stale.
	pub fn cards(&self) -> &[Card] {
		match self {
			Self::Ready { cards } => cards,
			Self::Failed { stale, .. } => stale,
			Self::Loading | Self::Empty => &[],
		}
	}
}

/// A screen the feed can navigate to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
	/// The creation form for a feed.
	NewPost { kind: FeedKind },
	/// The full view of a single post.
	Detail { kind: FeedKind, post: Post },
}

impl Route {
	/// The name the navigation stack knows the screen by.
	pub fn screen(&self) -> &'static str {
		match self {
			Self::NewPost {
				kind: FeedKind::OpenJio,
			} => "OpenJioNewPost",
			Self::NewPost {
				kind: FeedKind::OpenLetters,
			} => "OpenLetterNewPost",
			Self::Detail {
				kind: FeedKind::OpenJio,
				..
			} => "OpenJioPost",
			Self::Detail {
				kind: FeedKind::OpenLetters,
				..
			} => "OpenLetterPost",
		}
	}
}

/// The navigation stack the feed hands routes to.
pub trait Navigator {
	fn navigate(&mut self, route: Route);
}

/// One feed screen, from mount to unmount.
///
/// The screen owns its live subscription: it is opened on mount and
/// closed on unmount or when the screen is dropped.
#[derive(Debug)]
pub struct FeedScreen {
	kind: FeedKind,
	subscription: Option<FeedSubscription>,
	state: ScreenState,
}

impl FeedScreen {
	pub fn mount(binder: &LiveFeedBinder, kind: FeedKind, now: DateTime<Utc>) -> Self {
		tracing::debug!(feed = %kind, "mounting feed screen");

		Self {
			kind,
			subscription: Some(binder.open_feed(kind, now)),
			state: ScreenState::Loading,
		}
	}

	pub fn kind(&self) -> FeedKind {
		self.kind
	}

	pub fn title(&self) -> &'static str {
		self.kind.title()
	}

	pub fn state(&self) -> &ScreenState {
		&self.state
	}

	pub fn is_mounted(&self) -> bool {
		self.subscription.is_some()
	}

	/// Waits for the next feed event and applies it.
	///
	/// Returns `None` once the screen is unmounted.
	pub async fn next(&mut self) -> Option<&ScreenState> {
		let event = self.subscription.as_mut()?.next().await?;

		Some(self.apply(event))
	}

	pub fn apply(&mut self, event: FeedEvent) -> &ScreenState {
		self.state = match event {
			FeedEvent::Snapshot(posts) if posts.is_empty() => ScreenState::Empty,
			FeedEvent::Snapshot(posts) => ScreenState::Ready {
				cards: posts.into_iter().map(Card::from).collect(),
			},
			FeedEvent::Interrupted {
				error,
				attempt,
				retry_in,
			} => ScreenState::Failed {
				message: error,
				attempt,
				retry_in,
				stale: self.state.cards().to_vec(),
			},
		};

		&self.state
	}

	/// The cards laid out in rows of [`COLUMNS`].
	pub fn rows(&self) -> std::slice::Chunks<'_, Card> {
		self.state.cards().chunks(COLUMNS)
	}

	/// The route for tapping the card at `index`.
	pub fn tap(&self, index: usize) -> Option<Route> {
		self.state.cards().get(index).map(|card| Route::Detail {
			kind: self.kind,
			post: card.post.clone(),
		})
	}

	/// The route for the create button.
	pub fn compose(&self) -> Route {
		Route::NewPost { kind: self.kind }
	}

	/// Navigates to the card at `index`, returning whether it exists.
	pub fn tap_and_navigate(&self, index: usize, navigator: &mut impl Navigator) -> bool {
		match self.tap(index) {
			Some(route) => {
				navigator.navigate(route);
				true
			}
			None => false,
		}
	}

	pub fn compose_and_navigate(&self, navigator: &mut impl Navigator) {
		navigator.navigate(self.compose());
	}

	pub fn unmount(&mut self) {
		if let Some(mut subscription) = self.subscription.take() {
			subscription.close();

			tracing::debug!(feed = %self.kind, "feed screen unmounted");
		}
	}
}
