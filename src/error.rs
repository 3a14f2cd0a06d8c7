use axum::{
	body::Body,
	extract::rejection,
	http::{Response, StatusCode},
	response::IntoResponse,
	Json,
};
use serde::Serialize;

/// Error type for the application.
///
/// The Display trait is not sent to the client for internal errors,
/// so it can show sensitive information.
#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("validation error: {0}")]
	Validation(#[from] validator::ValidationErrors),
	#[error("json error: {0}")]
	Json(#[from] rejection::JsonRejection),
	#[error("unknown feed {0}")]
	UnknownFeed(String),
	#[error("unknown post {0}")]
	UnknownPost(String),
	#[error("malformed document {id}: bad or missing field `{field}`")]
	MalformedDocument { id: String, field: &'static str },
	#[error("database error: {0}")]
	Database(#[from] sqlx::Error),
	#[error("migration error: {0}")]
	Migrate(#[from] sqlx::migrate::MigrateError),
	#[error("store error: {0}")]
	Store(String),
	#[error("subscription closed")]
	Closed,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
	pub success: bool,
	pub errors: Vec<String>,
}

impl ErrorResponse {
	fn new(errors: Vec<String>) -> Self {
		Self {
			success: false,
			errors,
		}
	}
}

impl IntoResponse for Error {
	fn into_response(self) -> Response<Body> {
		match self {
			Error::Validation(errors) => (
				StatusCode::BAD_REQUEST,
				Json(ErrorResponse::new(
					errors
						.field_errors()
						.into_iter()
						.flat_map(move |(field, errors)| {
							errors
								.iter()
								.map(move |error| format!("{}: {}", field, error))
						})
						.collect(),
				)),
			)
				.into_response(),
			Error::Json(error) => (
				StatusCode::BAD_REQUEST,
				Json(ErrorResponse::new(vec![error.to_string()])),
			)
				.into_response(),
			Error::UnknownFeed(..) => (
				StatusCode::NOT_FOUND,
				Json(ErrorResponse::new(vec!["unknown_feed".into()])),
			)
				.into_response(),
			Error::UnknownPost(..) => (
				StatusCode::NOT_FOUND,
				Json(ErrorResponse::new(vec!["unknown_post".into()])),
			)
				.into_response(),
			Error::Closed => (
				StatusCode::SERVICE_UNAVAILABLE,
				Json(ErrorResponse::new(Vec::new())),
			)
				.into_response(),
			error => {
				tracing::error!(%error, "internal error");

				(
					StatusCode::INTERNAL_SERVER_ERROR,
					Json(ErrorResponse::new(Vec::new())),
				)
					.into_response()
			}
		}
	}
}
