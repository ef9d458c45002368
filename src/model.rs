//! Typed views of the remote records. Column names mirror the hosted schema
//! (snake_case); timestamps are structured UTC values end to end.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A board post as stored remotely.
///
/// Exactly one of `user_id` / `secret_key` is populated at creation depending
/// on the creating identity's auth mode; both may be absent on legacy rows.
/// The key is write-once and never surfaced to readers by the board layer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Post {
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_url: Option<String>,
    #[serde(default)]
    pub upvotes: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pokemon_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pokemon_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pokemon_image: Option<String>,
    /// Category flag names, stored denormalized on the post.
    #[serde(default)]
    pub flags: Vec<String>,
    /// Repost/thread link; no referential integrity, may dangle.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub referenced_post_id: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Author-supplied fields for a new post; ownership fields are attached by
/// the board layer from the current identity.
#[derive(Debug, Clone, Default, Serialize)]
pub struct NewPost {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pokemon_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pokemon_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pokemon_image: Option<String>,
    #[serde(default)]
    pub flags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub referenced_post_id: Option<String>,
}

/// Partial update for an existing post. `None` fields are left untouched.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PostPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pokemon_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pokemon_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pokemon_image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flags: Option<Vec<String>>,
}

/// A comment. The schema carries no authorship or key fields; see the guard
/// for the authorization consequence.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Comment {
    pub id: String,
    pub post_id: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// A selectable category flag from the shared catalog.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PostFlag {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

/// Per-identity UI preferences, upserted keyed on `user_id`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Preferences {
    pub user_id: String,
    #[serde(default = "default_scheme")]
    pub color_scheme: String,
    #[serde(default)]
    pub show_content_on_feed: bool,
    #[serde(default = "default_true")]
    pub show_images_on_feed: bool,
}

impl Preferences {
    pub fn default_for(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            color_scheme: default_scheme(),
            show_content_on_feed: false,
            show_images_on_feed: true,
        }
    }
}

fn default_scheme() -> String { "default".to_string() }
fn default_true() -> bool { true }

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn post_decodes_sparse_row() {
        // Legacy rows miss most optional columns; decoding must not fail.
        let row = json!({
            "id": "p1",
            "title": "First",
            "created_at": "2025-06-01T10:00:00Z"
        });
        let post: Post = serde_json::from_value(row).unwrap();
        assert_eq!(post.upvotes, 0);
        assert!(post.user_id.is_none());
        assert!(post.flags.is_empty());
    }

    #[test]
    fn patch_serializes_only_set_fields() {
        let patch = PostPatch { title: Some("New".into()), ..Default::default() };
        let v = serde_json::to_value(&patch).unwrap();
        assert_eq!(v.as_object().unwrap().len(), 1);
        assert_eq!(v["title"].as_str(), Some("New"));
    }

    #[test]
    fn preferences_defaults() {
        let p: Preferences = serde_json::from_value(json!({"user_id": "u1"})).unwrap();
        assert_eq!(p.color_scheme, "default");
        assert!(!p.show_content_on_feed);
        assert!(p.show_images_on_feed);
    }
}
