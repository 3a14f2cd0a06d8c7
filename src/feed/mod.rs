//! Live, ordered views of a post collection.
//!
//! A [`FeedSubscription`] is the handle to one live query. It yields a full
//! snapshot of the matching posts when the query is established and again
//! every time the matching set changes, until it is closed or dropped.

mod kind;
mod retry;

pub use kind::FeedKind;
pub use retry::RetryPolicy;

use std::{
	pin::Pin,
	sync::Arc,
	task::{Context, Poll},
	time::Duration,
};

use chrono::{DateTime, Utc};
use futures::{Stream, StreamExt};
use tokio::{sync::mpsc, task::JoinHandle};
use tracing::Instrument;

use crate::{
	model::Post,
	store::{DocumentStore, FeedQuery},
	Error,
};

/// How many undelivered events a subscription buffers before the
/// producing task waits for the consumer.
const EVENT_CAPACITY: usize = 16;

/// Something that happened to a live feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedEvent {
	/// The full matching set, newest first. Always replaces the previous one.
	Snapshot(Vec<Post>),
	/// The live query failed and will be retried after `retry_in`.
	Interrupted {
		error: String,
		attempt: u32,
		retry_in: Duration,
	},
}

/// Opens live feeds against a document store.
#[derive(Clone)]
pub struct LiveFeedBinder {
	store: Arc<dyn DocumentStore>,
	retry: RetryPolicy,
}

impl LiveFeedBinder {
	pub fn new(store: Arc<dyn DocumentStore>, retry: RetryPolicy) -> Self {
		Self { store, retry }
	}

	pub fn store(&self) -> &Arc<dyn DocumentStore> {
		&self.store
	}

	/// Opens the live query for one of the app's feeds, as seen at `now`.
	pub fn open_feed(&self, kind: FeedKind, now: DateTime<Utc>) -> FeedSubscription {
		self.open(kind.query(now))
	}

	/// Opens a live query. Returns immediately; events arrive on the
	/// returned subscription.
	///
	/// Must be called from within a Tokio runtime.
	pub fn open(&self, query: FeedQuery) -> FeedSubscription {
		let (sender, receiver) = mpsc::channel(EVENT_CAPACITY);
		let span = tracing::info_span!("feed", collection = %query.collection);
		let collection = query.collection.clone();

		let task = tokio::spawn(
			run(Arc::clone(&self.store), query, self.retry, sender).instrument(span),
		);

		tracing::debug!(%collection, "feed subscription opened");

		FeedSubscription {
			collection,
			receiver,
			task: Some(task),
		}
	}
}

/// The handle to an open live query.
///
/// Either `Subscribed` or `Closed`. Closing is idempotent, and dropping
/// the handle closes it.
#[derive(Debug)]
pub struct FeedSubscription {
	collection: String,
	receiver: mpsc::Receiver<FeedEvent>,
	task: Option<JoinHandle<()>>,
}

impl FeedSubscription {
	/// Stops the live query. Once this returns, the subscription yields
	/// no further events, including ones already in flight.
	pub fn close(&mut self) {
		if let Some(task) = self.task.take() {
			task.abort();
			self.receiver.close();

			tracing::debug!(collection = %self.collection, "feed subscription closed");
		}
	}

	pub fn is_closed(&self) -> bool {
		self.task.is_none()
	}

	pub fn collection(&self) -> &str {
		&self.collection
	}

	/// Waits for the first snapshot, skipping interruptions, then closes.
	pub async fn first_snapshot(mut self) -> Result<Vec<Post>, Error> {
		while let Some(event) = self.next().await {
			if let FeedEvent::Snapshot(posts) = event {
				self.close();
				return Ok(posts);
			}
		}

		Err(Error::Closed)
	}
}

impl Stream for FeedSubscription {
	type Item = FeedEvent;

	fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
		if self.is_closed() {
			return Poll::Ready(None);
		}

		self.receiver.poll_recv(cx)
	}
}

impl Drop for FeedSubscription {
	fn drop(&mut self) {
		self.close();
	}
}

/// Keeps a live query running until the subscriber goes away.
async fn run(
	store: Arc<dyn DocumentStore>,
	query: FeedQuery,
	retry: RetryPolicy,
	sender: mpsc::Sender<FeedEvent>,
) {
	let mut attempt = 0;

	loop {
		let error = match watch(store.as_ref(), &query, &sender, &mut attempt).await {
			Ok(()) => return,
			Err(error) => error,
		};

		attempt += 1;
		let retry_in = retry.delay(attempt);

		tracing::warn!(%error, attempt, ?retry_in, "feed interrupted");

		let interrupted = FeedEvent::Interrupted {
			error: error.to_string(),
			attempt,
			retry_in,
		};

		if sender.send(interrupted).await.is_err() {
			return;
		}

		tokio::time::sleep(retry_in).await;
	}
}

/// Establishes the live query and forwards snapshots until it fails.
///
/// Returns `Ok(())` only when the subscriber has gone away.
async fn watch(
	store: &dyn DocumentStore,
	query: &FeedQuery,
	sender: &mpsc::Sender<FeedEvent>,
	attempt: &mut u32,
) -> Result<(), Error> {
	// Subscribe before the first read so no write falls between the two.
	let mut changes = store.changes(&query.collection).await?;
	let mut last = None;

	loop {
		let posts = snapshot(store, query).await?;

		if last.as_ref() != Some(&posts) {
			if sender.send(FeedEvent::Snapshot(posts.clone())).await.is_err() {
				return Ok(());
			}

			if *attempt > 0 {
				tracing::info!(attempts = *attempt, "feed re-established");
			}

			*attempt = 0;
			last = Some(posts);
		}

		match changes.next().await {
			Some(Ok(change)) => {
				tracing::trace!(id = ?change.id, "collection changed");
			}
			Some(Err(error)) => return Err(error),
			None => return Err(Error::Store("change feed ended".into())),
		}
	}
}

/// Reads the matching posts, dropping documents that are not valid posts.
async fn snapshot(store: &dyn DocumentStore, query: &FeedQuery) -> Result<Vec<Post>, Error> {
	let documents = store.query(query).await?;

	Ok(documents
		.iter()
		.filter_map(|document| match Post::from_document(document) {
			Ok(post) => Some(post),
			Err(error) => {
				tracing::warn!(%error, "skipping malformed document");
				None
			}
		})
		.collect())
}
