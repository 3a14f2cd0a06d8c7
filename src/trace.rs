use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, HttpMakeClassifier, TraceLayer};
use tracing::{level_filters::LevelFilter, Level};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Initializes the global tracing subscriber, logging at `level` and above.
pub fn init_tracing_subscriber(level: Level) {
	tracing_subscriber::registry()
		.with(LevelFilter::from_level(level))
		.with(tracing_subscriber::fmt::layer().with_ansi(true))
		.init();
}

/// A layer that traces every request, with its latency and status.
pub fn http_layer() -> TraceLayer<HttpMakeClassifier> {
	TraceLayer::new_for_http()
		.make_span_with(DefaultMakeSpan::new().level(Level::INFO))
		.on_response(DefaultOnResponse::new().level(Level::INFO))
}
