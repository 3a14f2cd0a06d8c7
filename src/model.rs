use chrono::{DateTime, Utc};
use serde::{de, Deserialize, Serialize};
use validator::Validate;

use crate::Error;

/// The stored field holding the server-assigned creation time.
pub const TIMESTAMP_FIELD: &str = "timestamp";

pub type Fields = serde_json::Map<String, serde_json::Value>;

/// A schemaless record as it is held by a [`crate::store::DocumentStore`].
///
/// `id` is assigned by the store and is never read from `fields`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
	pub id: String,
	pub fields: Fields,
}

impl Document {
	pub fn new(id: impl Into<String>, fields: Fields) -> Self {
		Self {
			id: id.into(),
			fields,
		}
	}

	/// The parsed `timestamp` field, if it exists and is RFC 3339.
	pub fn timestamp(&self) -> Option<DateTime<Utc>> {
		self.fields
			.get(TIMESTAMP_FIELD)
			.and_then(serde_json::Value::as_str)
			.and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
			.map(|timestamp| timestamp.with_timezone(&Utc))
	}

	pub fn set_timestamp(&mut self, timestamp: DateTime<Utc>) {
		self.fields.insert(
			TIMESTAMP_FIELD.into(),
			serde_json::Value::String(timestamp.to_rfc3339()),
		);
	}
}

/// The stored shape of a post, with every field optional.
///
/// Documents are written by clients we do not control, so nothing here
/// is trusted until [`Post::from_document`] has checked it.
#[derive(Debug)]
struct RawPost {
	username: Option<String>,
	title: Option<String>,
	body: Option<String>,
	timestamp: Option<DateTime<Utc>>,
}

impl RawPost {
	/// Reads field by field so the error can name the culprit.
	fn read(fields: &Fields) -> Result<Self, &'static str> {
		fn field<T: de::DeserializeOwned>(
			fields: &Fields,
			name: &'static str,
		) -> Result<Option<T>, &'static str> {
			fields
				.get(name)
				.map(|value| serde_json::from_value(value.clone()).map_err(|_| name))
				.transpose()
		}

		Ok(Self {
			username: field(fields, "Username")?,
			title: field(fields, "title")?,
			body: field(fields, "body")?,
			timestamp: field(fields, TIMESTAMP_FIELD)?,
		})
	}
}

/// A single post, as handed to the rendering layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
	/// The identifier of the source document.
	pub id: String,
	/// The display name of the author.
	#[serde(rename = "Username")]
	pub username: String,
	pub title: String,
	pub body: String,
	/// The server-assigned creation time.
	pub timestamp: DateTime<Utc>,
}

impl Post {
	/// Validates the stored fields of a document and injects its identifier.
	///
	/// A stored field named `id` is ignored.
	pub fn from_document(document: &Document) -> Result<Self, Error> {
		let malformed = |field: &'static str| Error::MalformedDocument {
			id: document.id.clone(),
			field,
		};

		let raw = RawPost::read(&document.fields).map_err(malformed)?;

		Ok(Self {
			id: document.id.clone(),
			username: raw.username.ok_or_else(|| malformed("Username"))?,
			title: raw.title.ok_or_else(|| malformed("title"))?,
			body: raw.body.ok_or_else(|| malformed("body"))?,
			timestamp: raw.timestamp.ok_or_else(|| malformed(TIMESTAMP_FIELD))?,
		})
	}
}

/// The body of the creation form.
///
/// `timestamp` is assigned by the store on insert.
#[derive(Debug, Deserialize, Validate)]
pub struct CreatePostInput {
	#[serde(rename = "Username")]
	#[validate(length(min = 1, max = 64))]
	pub username: String,
	#[validate(length(min = 1, max = 120))]
	pub title: String,
	#[validate(length(min = 1, max = 4000))]
	pub body: String,
}

impl CreatePostInput {
	pub fn into_fields(self) -> Fields {
		let mut fields = Fields::new();

		fields.insert("Username".into(), self.username.into());
		fields.insert("title".into(), self.title.into());
		fields.insert("body".into(), self.body.into());
		fields
	}
}

#[cfg(test)]
mod test {
	use chrono::{Duration, TimeZone, Utc};
	use serde_json::json;

	use super::*;

	fn fields(value: serde_json::Value) -> Fields {
		match value {
			serde_json::Value::Object(map) => map,
			_ => unreachable!(),
		}
	}

	#[test]
	fn test_post_injects_document_id() {
		let timestamp = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
		let document = Document::new(
			"doc-1",
			fields(json!({
				"id": "stored-id",
				"Username": "mei",
				"title": "Supper at 10?",
				"body": "Anyone up for prata",
				"timestamp": timestamp.to_rfc3339(),
			})),
		);

		let post = Post::from_document(&document).unwrap();

		assert_eq!(post.id, "doc-1");
		assert_eq!(post.username, "mei");
		assert_eq!(post.timestamp, timestamp);
	}

	#[test]
	fn test_post_missing_field_is_malformed() {
		let document = Document::new(
			"doc-2",
			fields(json!({
				"Username": "mei",
				"body": "no title here",
				"timestamp": Utc::now().to_rfc3339(),
			})),
		);

		let error = Post::from_document(&document).unwrap_err();

		assert!(matches!(
			error,
			Error::MalformedDocument { ref id, field: "title" } if id == "doc-2"
		));
	}

	#[test]
	fn test_post_wrong_type_is_malformed() {
		let document = Document::new(
			"doc-3",
			fields(json!({
				"Username": 42,
				"title": "t",
				"body": "b",
				"timestamp": Utc::now().to_rfc3339(),
			})),
		);

		assert!(matches!(
			Post::from_document(&document),
			Err(Error::MalformedDocument {
				field: "Username",
				..
			})
		));
	}

	#[test]
	fn test_document_timestamp() {
		let mut document = Document::new("doc-4", Fields::new());

		assert_eq!(document.timestamp(), None);

		let timestamp = Utc::now() - Duration::hours(3);
		document.set_timestamp(timestamp);

		assert_eq!(document.timestamp(), Some(timestamp));

		document
			.fields
			.insert(TIMESTAMP_FIELD.into(), json!("yesterday"));

		assert_eq!(document.timestamp(), None);
	}

	#[test]
	fn test_create_input_into_fields() {
		let input = CreatePostInput {
			username: "mei".into(),
			title: "Hello".into(),
			body: "World".into(),
		};

		let fields = input.into_fields();

		assert_eq!(fields["Username"], json!("mei"));
		assert!(!fields.contains_key(TIMESTAMP_FIELD));
	}
}
