use std::time::Duration;

use axum::{
	extract::{Path, State},
	response::sse::{Event, KeepAlive, Sse},
};
use chrono::Utc;
use futures::{Stream, StreamExt};

use crate::{
	extract::Json,
	feed::{FeedKind, LiveFeedBinder},
	model::Post,
	store::DocumentStore,
	Error,
};

use super::model;

/// How long a one-shot read waits for the feed to come up.
const SNAPSHOT_TIMEOUT: Duration = Duration::from_secs(10);

/// Get feed
/// Returns the posts currently in a feed, newest first.
pub async fn get_feed(
	State(binder): State<LiveFeedBinder>,
	Path(kind): Path<String>,
) -> Result<Json<Vec<Post>>, Error> {
	let kind = kind.parse::<FeedKind>()?;
	let subscription = binder.open_feed(kind, Utc::now());

	let posts = tokio::time::timeout(SNAPSHOT_TIMEOUT, subscription.first_snapshot())
		.await
		.map_err(|_| Error::Closed)??;

	Ok(Json(posts))
}

/// Watch feed
/// Streams the posts in a feed as server-sent events, sending the whole
/// feed again every time it changes.
///
/// The live query is closed when the client disconnects.
pub async fn watch_feed(
	State(binder): State<LiveFeedBinder>,
	Path(kind): Path<String>,
) -> Result<Sse<impl Stream<Item = Result<Event, axum::Error>>>, Error> {
	let kind = kind.parse::<FeedKind>()?;

	tracing::info!(feed = %kind, "live feed client connected");

	let events = binder.open_feed(kind, Utc::now()).map(model::sse_event);

	Ok(Sse::new(events).keep_alive(KeepAlive::default()))
}

/// Get single post
/// Returns a single post of a feed by its unique id.
pub async fn get_post(
	State(binder): State<LiveFeedBinder>,
	Path((kind, post_id)): Path<(String, String)>,
) -> Result<Json<Post>, Error> {
	let kind = kind.parse::<FeedKind>()?;

	let document = binder
		.store()
		.get(kind.collection(), &post_id)
		.await?
		.ok_or(Error::UnknownPost(post_id))?;

	Ok(Json(Post::from_document(&document)?))
}

/// Create post
/// Creates a new post in a feed. The store assigns its id and timestamp.
pub async fn create_post(
	State(binder): State<LiveFeedBinder>,
	Path(kind): Path<String>,
	Json(input): Json<model::CreatePostInput>,
) -> Result<Json<Post>, Error> {
	let kind = kind.parse::<FeedKind>()?;

	let document = binder
		.store()
		.insert(kind.collection(), input.into_fields())
		.await?;

	tracing::info!(feed = %kind, id = %document.id, "post created");

	Ok(Json(Post::from_document(&document)?))
}
