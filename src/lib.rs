//! Live feeds of user posts for the Open Jio and Open Letters screens.

#![warn(clippy::pedantic)]

pub mod config;
pub mod error;
pub mod extract;
pub mod feed;
pub mod model;
pub mod route;
pub mod screen;
pub mod store;
#[cfg(test)]
mod test;
pub mod trace;

use axum::Router;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;

pub use error::Error;

use crate::feed::LiveFeedBinder;

pub type AppState = State;

/// The shared application state.
///
/// Every handler reaches the document store through the binder, so the
/// binder is the only dependency.
#[derive(Clone, axum::extract::FromRef)]
pub struct State {
	pub binder: LiveFeedBinder,
}

/// Builds the HTTP app around the given state.
pub fn app(state: State) -> Router {
	route::routes()
		.layer(
			ServiceBuilder::new()
				.layer(trace::http_layer())
				.layer(CorsLayer::permissive()),
		)
		.with_state(state)
}
