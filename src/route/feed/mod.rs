use axum::{routing::get, Router};

use crate::AppState;

pub mod model;
pub mod route;

pub fn routes() -> Router<AppState> {
	use route::*;

	Router::new()
		.route("/:kind", get(get_feed))
		.route("/:kind/live", get(watch_feed))
		.route("/:kind/posts", axum::routing::post(create_post))
		.route("/:kind/posts/:id", get(get_post))
}

#[cfg(test)]
mod test {
	use std::time::Duration;

	use axum::{body::Body, http::Request};
	use futures::{Stream, StreamExt};
	use tower::ServiceExt;

	use crate::test::*;

	async fn seeded() -> Arc<MemoryStore> {
		let store = Arc::new(MemoryStore::new());
		let now = Utc::now();

		for (id, title, hours) in [("a", "A", 0), ("b", "B", 1), ("c", "C", 25)] {
			store
				.put(
					"openJioPosts",
					document(id, title, now - TimeDelta::hours(hours)),
				)
				.await
				.unwrap();
		}

		store
	}

	#[tokio::test]
	async fn test_get_feed() {
		let app = app(seeded().await);

		let response = app.get("/feeds/open-jio").await;

		assert_eq!(response.status_code(), 200);

		let posts = response.json::<Vec<Post>>();
		let titles = posts.iter().map(|p| p.title.as_str()).collect::<Vec<_>>();

		assert_eq!(titles, ["A", "B"]);

		let response = app.get("/feeds/open-letters").await;

		assert_eq!(response.status_code(), 200);
		assert!(response.json::<Vec<Post>>().is_empty());
	}

	#[tokio::test]
	async fn test_unknown_feed() {
		let app = app(seeded().await);

		let response = app.get("/feeds/closed-jio").await;

		assert_eq!(response.status_code(), 404);
		assert_eq!(
			response.json::<serde_json::Value>(),
			json!({ "success": false, "errors": ["unknown_feed"] })
		);
	}

	#[tokio::test]
	async fn test_get_post() {
		let app = app(seeded().await);

		let response = app.get("/feeds/open-jio/posts/c").await;

		assert_eq!(response.status_code(), 200);
		assert_eq!(response.json::<Post>().id, "c");

		let response = app.get("/feeds/open-jio/posts/missing").await;

		assert_eq!(response.status_code(), 404);
	}

	#[tokio::test]
	async fn test_create_post_flow() {
		let store = seeded().await;
		let app = app(store.clone());

		let response = app
			.post("/feeds/open-letters/posts")
			.json(&json!({
				"Username": "mei",
				"title": "Dear hall",
				"body": "Thanks for the snacks",
			}))
			.await;

		assert_eq!(response.status_code(), 200);

		let post = response.json::<Post>();

		assert_eq!(post.username, "mei");
		assert!(store
			.get("openLetterPosts", &post.id)
			.await
			.unwrap()
			.is_some());

		let response = app.get("/feeds/open-letters").await;

		assert_eq!(response.json::<Vec<Post>>(), [post]);
	}

	#[tokio::test]
	async fn test_create_post_validation() {
		let app = app(seeded().await);

		let response = app
			.post("/feeds/open-jio/posts")
			.json(&json!({
				"Username": "mei",
				"title": "",
				"body": "no title",
			}))
			.await;

		assert_eq!(response.status_code(), 400);
		assert_eq!(response.json::<serde_json::Value>()["success"], false);

		let response = app
			.post("/feeds/open-jio/posts")
			.json(&json!({ "title": "no author" }))
			.await;

		assert_eq!(response.status_code(), 400);
	}

	/// Reads the next server-sent event as `(event, data)`.
	async fn next_event<S, E>(body: &mut S, buffer: &mut String) -> (String, serde_json::Value)
	where
		S: Stream<Item = Result<axum::body::Bytes, E>> + Unpin,
		E: std::fmt::Debug,
	{
		let text = loop {
			if let Some(end) = buffer.find("\n\n") {
				let text = buffer[..end].to_owned();
				buffer.drain(..end + 2);
				break text;
			}

			let chunk = tokio::time::timeout(Duration::from_secs(5), body.next())
				.await
				.expect("no event in time")
				.expect("stream ended")
				.unwrap();

			buffer.push_str(std::str::from_utf8(&chunk).unwrap());
		};

		let field = |name: &str| {
			text.lines()
				.find_map(|line| line.strip_prefix(name))
				.map(str::trim_start)
				.unwrap_or_default()
				.to_owned()
		};

		let data = serde_json::from_str(&field("data:")).unwrap();

		(field("event:"), data)
	}

	fn titles(data: &serde_json::Value) -> Vec<&str> {
		data.as_array()
			.unwrap()
			.iter()
			.map(|post| post["title"].as_str().unwrap())
			.collect()
	}

	#[tokio::test]
	async fn test_watch_feed() {
		let store = seeded().await;

		let response = crate::app(state(store.clone()))
			.oneshot(
				Request::get("/feeds/open-jio/live")
					.body(Body::empty())
					.unwrap(),
			)
			.await
			.unwrap();

		assert_eq!(response.status(), 200);
		assert_eq!(response.headers()["content-type"], "text/event-stream");

		let mut body = response.into_body().into_data_stream();
		let mut buffer = String::new();

		let (event, data) = next_event(&mut body, &mut buffer).await;

		assert_eq!(event, "snapshot");
		assert_eq!(titles(&data), ["A", "B"]);
		assert_eq!(data[0]["Username"], "mei");
		assert_eq!(data[0]["id"], "a");

		store
			.put(
				"openJioPosts",
				document("d", "D", Utc::now() + TimeDelta::minutes(1)),
			)
			.await
			.unwrap();

		let (event, data) = next_event(&mut body, &mut buffer).await;

		assert_eq!(event, "snapshot");
		assert_eq!(titles(&data), ["D", "A", "B"]);
	}

	#[tokio::test]
	async fn test_watch_unknown_feed() {
		let app = app(seeded().await);

		let response = app.get("/feeds/closed-jio/live").await;

		assert_eq!(response.status_code(), 404);
	}
}
