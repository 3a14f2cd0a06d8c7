use std::collections::HashMap;

use chrono::Utc;
use futures::StreamExt;
use tokio::sync::{broadcast, RwLock};

use super::{new_id, Change, ChangeStream, DocumentStore, FeedQuery};
use crate::{
	model::{Document, Fields},
	Error,
};

/// How many unread changes a slow subscriber may fall behind by before
/// it is told that changes were dropped.
const CHANGE_CAPACITY: usize = 256;

type Collection = HashMap<String, Document>;

/// An in-process document store.
///
/// Used when no database is configured, and as the simulated
/// collection in tests.
#[derive(Debug)]
pub struct MemoryStore {
	collections: RwLock<HashMap<String, Collection>>,
	changes: broadcast::Sender<Change>,
}

impl Default for MemoryStore {
	fn default() -> Self {
		Self::new()
	}
}

impl MemoryStore {
	pub fn new() -> Self {
		Self {
			collections: RwLock::default(),
			changes: broadcast::channel(CHANGE_CAPACITY).0,
		}
	}

	fn notify(&self, collection: &str, id: &str) {
		// No receivers is fine; nobody is watching.
		let _ = self.changes.send(Change {
			collection: collection.to_owned(),
			id: Some(id.to_owned()),
		});
	}
}

#[axum::async_trait]
impl DocumentStore for MemoryStore {
	async fn query(&self, query: &FeedQuery) -> Result<Vec<Document>, Error> {
		let collections = self.collections.read().await;

		let mut documents = collections
			.get(&query.collection)
			.map(|collection| {
				collection
					.values()
					.filter(|document| query.matches(document))
					.cloned()
					.collect::<Vec<_>>()
			})
			.unwrap_or_default();

		query.sort(&mut documents);

		Ok(documents)
	}

	async fn changes(&self, collection: &str) -> Result<ChangeStream, Error> {
		let receiver = self.changes.subscribe();
		let collection = collection.to_owned();

		let stream = futures::stream::unfold(receiver, move |mut receiver| {
			let collection = collection.clone();

			async move {
				loop {
					match receiver.recv().await {
						Ok(change) if change.collection == collection => {
							return Some((Ok(change), receiver));
						}
						Ok(..) => continue,
						Err(broadcast::error::RecvError::Lagged(skipped)) => {
							tracing::debug!(%collection, skipped, "change subscriber lagged");

							return Some((
								Ok(Change {
									collection,
									id: None,
								}),
								receiver,
							));
						}
						Err(broadcast::error::RecvError::Closed) => return None,
					}
				}
			}
		});

		Ok(stream.boxed())
	}

	async fn insert(&self, collection: &str, fields: Fields) -> Result<Document, Error> {
		let mut document = Document::new(new_id(), fields);
		document.set_timestamp(Utc::now());

		self.put(collection, document.clone()).await?;

		Ok(document)
	}

	async fn put(&self, collection: &str, document: Document) -> Result<(), Error> {
		let id = document.id.clone();

		self.collections
			.write()
			.await
			.entry(collection.to_owned())
			.or_default()
			.insert(id.clone(), document);

		self.notify(collection, &id);

		Ok(())
	}

	async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, Error> {
		Ok(self
			.collections
			.read()
			.await
			.get(collection)
			.and_then(|collection| collection.get(id))
			.cloned())
	}

	async fn delete(&self, collection: &str, id: &str) -> Result<bool, Error> {
		let removed = self
			.collections
			.write()
			.await
			.get_mut(collection)
			.and_then(|collection| collection.remove(id))
			.is_some();

		if removed {
			self.notify(collection, id);
		}

		Ok(removed)
	}
}
