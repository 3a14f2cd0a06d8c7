pub use std::sync::Arc;

pub use axum_test::TestServer;
pub use chrono::{DateTime, Duration as TimeDelta, Utc};
pub use serde_json::json;

pub use crate::{
	feed::{LiveFeedBinder, RetryPolicy},
	model::{Document, Fields, Post},
	store::{DocumentStore, MemoryStore},
};

/// App state over an in-memory store.
pub fn state(store: Arc<MemoryStore>) -> crate::State {
	crate::State {
		binder: LiveFeedBinder::new(store, RetryPolicy::default()),
	}
}

/// Serves the app over an in-memory store.
pub fn app(store: Arc<MemoryStore>) -> TestServer {
	TestServer::new(crate::app(state(store))).unwrap()
}

/// A well-formed post document.
pub fn document(id: &str, title: &str, timestamp: DateTime<Utc>) -> Document {
	let mut fields = Fields::new();
	fields.insert("Username".into(), json!("mei"));
	fields.insert("title".into(), json!(title));
	fields.insert("body".into(), json!(format!("{title} body")));

	let mut document = Document::new(id, fields);
	document.set_timestamp(timestamp);
	document
}
