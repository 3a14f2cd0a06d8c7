use axum::response::sse::Event;
use serde::Serialize;

use crate::feed::FeedEvent;

pub use crate::model::CreatePostInput;

/// The payload of an `interrupted` live event.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Interruption {
	pub error: String,
	pub attempt: u32,
	pub retry_in_ms: u64,
}

/// Encodes a feed event for a live stream.
///
/// Snapshots are sent as `snapshot` events holding the list of posts,
/// failures as `interrupted` events holding an [`Interruption`].
pub fn sse_event(event: FeedEvent) -> Result<Event, axum::Error> {
	match event {
		FeedEvent::Snapshot(posts) => Event::default().event("snapshot").json_data(posts),
		FeedEvent::Interrupted {
			error,
			attempt,
			retry_in,
		} => Event::default().event("interrupted").json_data(Interruption {
			error,
			attempt,
			retry_in_ms: u64::try_from(retry_in.as_millis()).unwrap_or(u64::MAX),
		}),
	}
}
