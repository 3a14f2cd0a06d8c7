use chrono::{DateTime, Utc};
use futures::StreamExt;
use sqlx::{postgres::PgListener, types::Json};

use super::{new_id, Change, ChangeStream, DocumentStore, FeedQuery};
use crate::{
	model::{Document, Fields},
	Error,
};

pub type Database = sqlx::Pool<sqlx::Postgres>;

/// The channel the `document_change` trigger notifies on.
const CHANGE_CHANNEL: &str = "document_changes";

#[derive(sqlx::FromRow)]
struct DocumentRow {
	id: String,
	fields: Json<Fields>,
}

/// Reads a change notification for `collection`.
///
/// `None` means the listener lost its connection, so any number of changes
/// may have been missed.
fn change_from(payload: Option<&str>, collection: &str) -> Option<Change> {
	let Some(payload) = payload else {
		tracing::warn!(%collection, "change listener reconnecting, notifications may be lost");

		return Some(Change {
			collection: collection.to_owned(),
			id: None,
		});
	};

	match serde_json::from_str::<Change>(payload) {
		Ok(change) if change.collection == collection => Some(change),
		Ok(..) => None,
		Err(error) => {
			tracing::warn!(%error, payload, "unreadable change notification");
			None
		}
	}
}

impl From<DocumentRow> for Document {
	fn from(row: DocumentRow) -> Self {
		Document::new(row.id, row.fields.0)
	}
}

/// A document store backed by a single Postgres table.
///
/// Changes are pushed by a trigger through `LISTEN/NOTIFY`, so
/// subscribers never poll.
#[derive(Debug, Clone)]
pub struct PgStore {
	database: Database,
}

impl PgStore {
	/// Wraps an existing pool. The schema must already be migrated.
	pub fn new(database: Database) -> Self {
		Self { database }
	}

	/// Connects to the database and runs pending migrations.
	pub async fn connect(url: &str) -> Result<Self, Error> {
		let database = Database::connect(url).await?;

		sqlx::migrate!("./migrations").run(&database).await?;

		Ok(Self::new(database))
	}
}

#[axum::async_trait]
impl DocumentStore for PgStore {
	async fn query(&self, query: &FeedQuery) -> Result<Vec<Document>, Error> {
		let rows = sqlx::query_as::<_, DocumentRow>(
			r#"
				SELECT id, fields FROM document
				WHERE collection = $1
					AND timestamp IS NOT NULL
					AND ($2::timestamptz IS NULL OR timestamp >= $2)
				ORDER BY timestamp DESC, id COLLATE "C" ASC
			"#,
		)
		.bind(&query.collection)
		.bind(query.cutoff())
		.fetch_all(&self.database)
		.await?;

		Ok(rows.into_iter().map(Document::from).collect())
	}

	async fn changes(&self, collection: &str) -> Result<ChangeStream, Error> {
		let mut listener = PgListener::connect_with(&self.database).await?;
		listener.listen(CHANGE_CHANNEL).await?;

		let collection = collection.to_owned();

		// `try_recv` rather than `recv`: a reconnect must be reported, since
		// notifications sent while the connection was down are gone.
		let stream = futures::stream::unfold(listener, move |mut listener| {
			let collection = collection.clone();

			async move {
				loop {
					let received = match listener.try_recv().await {
						Ok(received) => received,
						Err(error) => return Some((Err(Error::Database(error)), listener)),
					};

					let payload = received.as_ref().map(|notification| notification.payload());

					if let Some(change) = change_from(payload, &collection) {
						return Some((Ok(change), listener));
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
		let timestamp: Option<DateTime<Utc>> = document.timestamp();

		sqlx::query(
			r#"
				INSERT INTO document (collection, id, fields, timestamp)
				VALUES ($1, $2, $3, $4)
				ON CONFLICT (collection, id)
				DO UPDATE SET fields = EXCLUDED.fields, timestamp = EXCLUDED.timestamp
			"#,
		)
		.bind(collection)
		.bind(&document.id)
		.bind(Json(&document.fields))
		.bind(timestamp)
		.execute(&self.database)
		.await?;

		Ok(())
	}

	async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, Error> {
		let row = sqlx::query_as::<_, DocumentRow>(
			r#"
				SELECT id, fields FROM document
				WHERE collection = $1 AND id = $2
			"#,
		)
		.bind(collection)
		.bind(id)
		.fetch_optional(&self.database)
		.await?;

		Ok(row.map(Document::from))
	}

	async fn delete(&self, collection: &str, id: &str) -> Result<bool, Error> {
		let result = sqlx::query(
			r#"
				DELETE FROM document
				WHERE collection = $1 AND id = $2
			"#,
		)
		.bind(collection)
		.bind(id)
		.execute(&self.database)
		.await?;

		Ok(result.rows_affected() > 0)
	}
}
