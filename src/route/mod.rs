use axum::Router;

use crate::AppState;

pub mod feed;

pub fn routes() -> Router<AppState> {
	Router::new().nest("/feeds", feed::routes())
}
