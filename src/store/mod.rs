mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use chrono::{DateTime, Utc};
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};

use crate::{
	model::{Document, Fields},
	Error,
};

/// A predicate over stored fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Filter {
	/// `timestamp >= cutoff`
	TimestampAtLeast(DateTime<Utc>),
}

impl Filter {
	pub fn matches(&self, document: &Document) -> bool {
		match self {
			Self::TimestampAtLeast(cutoff) => document
				.timestamp()
				.is_some_and(|timestamp| timestamp >= *cutoff),
		}
	}
}

/// The sort order of a query.
///
/// Ties are broken by ascending document id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Order {
	#[default]
	TimestampDescending,
}

/// A filtered, ordered read of a single collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedQuery {
	pub collection: String,
	pub filters: Vec<Filter>,
	pub order: Order,
}

impl FeedQuery {
	pub fn new(collection: impl Into<String>) -> Self {
		Self {
			collection: collection.into(),
			filters: Vec::new(),
			order: Order::default(),
		}
	}

	#[must_use]
	pub fn filter(mut self, filter: Filter) -> Self {
		self.filters.push(filter);
		self
	}

	/// The earliest timestamp admitted by the filters, if any.
	pub fn cutoff(&self) -> Option<DateTime<Utc>> {
		self.filters
			.iter()
			.map(|filter| match filter {
				Filter::TimestampAtLeast(cutoff) => *cutoff,
			})
			.max()
	}

	/// Whether a document belongs to the result set.
	///
	/// Documents without a readable `timestamp` never match, since the
	/// result set is ordered by it.
	pub fn matches(&self, document: &Document) -> bool {
		document.timestamp().is_some() && self.filters.iter().all(|filter| filter.matches(document))
	}

	/// Sorts matching documents into result order.
	pub fn sort(&self, documents: &mut [Document]) {
		match self.order {
			Order::TimestampDescending => documents.sort_by(|a, b| {
				b.timestamp()
					.cmp(&a.timestamp())
					.then_with(|| a.id.cmp(&b.id))
			}),
		}
	}
}

/// A notification that a document in a collection was written or deleted.
///
/// `id` is `None` when notifications were dropped and the exact documents
/// are unknown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Change {
	pub collection: String,
	pub id: Option<String>,
}

/// A stream of changes to one collection.
///
/// The stream ending, or yielding an error, means the change feed was lost.
pub type ChangeStream = BoxStream<'static, Result<Change, Error>>;

/// The query interface consumed by the feed binder.
#[axum::async_trait]
pub trait DocumentStore: Send + Sync + 'static {
	/// Returns the documents matching `query`, in result order.
	async fn query(&self, query: &FeedQuery) -> Result<Vec<Document>, Error>;

	/// Subscribes to changes in `collection`.
	async fn changes(&self, collection: &str) -> Result<ChangeStream, Error>;

	/// Creates a document with a store-assigned id and the current time
	/// as its `timestamp`.
	async fn insert(&self, collection: &str, fields: Fields) -> Result<Document, Error>;

	/// Writes a document as-is, replacing any document with the same id.
	async fn put(&self, collection: &str, document: Document) -> Result<(), Error>;

	async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, Error>;

	/// Deletes a document, returning whether it existed.
	async fn delete(&self, collection: &str, id: &str) -> Result<bool, Error>;
}

/// Generates a new document id.
fn new_id() -> String {
	uuid::Uuid::new_v4().simple().to_string()
}
