#![warn(clippy::pedantic)]

use std::sync::Arc;

use open_feeds::{
	app,
	config::Config,
	feed::LiveFeedBinder,
	store::{DocumentStore, MemoryStore, PgStore},
	trace, State,
};

#[tokio::main]
async fn main() {
	let config = Config::from_env().expect("invalid configuration");

	trace::init_tracing_subscriber(config.log_level);

	let store: Arc<dyn DocumentStore> = match &config.database_url {
		Some(url) => Arc::new(
			PgStore::connect(url)
				.await
				.expect("failed to connect to database"),
		),
		None => {
			tracing::warn!("DATABASE_URL is not set, posts will be kept in memory");
			Arc::new(MemoryStore::new())
		}
	};

	let state = State {
		binder: LiveFeedBinder::new(store, config.retry),
	};

	let listener = tokio::net::TcpListener::bind(("127.0.0.1", config.port))
		.await
		.expect("failed to bind to port");

	tracing::info!("listening on port {}", config.port);

	axum::serve(listener, app(state))
		.await
		.expect("server error");
}
