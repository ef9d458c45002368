//! Board operations: everything the UI does to posts, comments, flags and
//! preferences, with the authorization guard consulted before every mutation
//! and double-submit protection per resource.
//!
//! Concurrency stance: the gateway is last-write-wins and this client adds no
//! optimistic locking, so two devices editing the same post race unguarded.
//! That is accepted behavior inherited from the backend contract.

use std::collections::HashSet;

use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tracing::{debug, warn};

use crate::context::AppContext;
use crate::error::{AppError, AppResult};
use crate::gateway::{Collection, Filter, Order};
use crate::identity::{Access, Action, AuthMode, KeyGrant, ResourceKind};
use crate::identity::{generate_secret_key, verify_secret_key};
use crate::media;
use crate::model::{Comment, NewPost, Post, PostFlag, PostPatch, Preferences};

/// Result of creating a post. `secret_key` is populated exactly once, only
/// for secret-key-mode identities; it is never readable again through this
/// layer, and there is no recovery if the user loses it.
#[derive(Debug, Clone)]
pub struct CreatedPost {
    pub post: Post,
    pub secret_key: Option<String>,
}

pub struct Board {
    ctx: AppContext,
    in_flight: Mutex<HashSet<String>>,
}

/// Removes its in-flight marker when the operation completes or is dropped
/// mid-request (component unmount discards the result, never crashes).
struct InFlight<'a> {
    set: &'a Mutex<HashSet<String>>,
    key: String,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.set.lock().remove(&self.key);
    }
}

impl Board {
    pub fn new(ctx: AppContext) -> Self {
        Self { ctx, in_flight: Mutex::new(HashSet::new()) }
    }

    pub fn context(&self) -> &AppContext { &self.ctx }

    /// Mark a mutation on one resource as in flight. A second conflicting
    /// call while the first is outstanding fails fast instead of
    /// double-submitting.
    fn begin(&self, key: impl Into<String>) -> AppResult<InFlight<'_>> {
        let key = key.into();
        let mut set = self.in_flight.lock();
        if !set.insert(key.clone()) {
            return Err(AppError::conflict("in_flight", "this action is already in progress"));
        }
        drop(set);
        Ok(InFlight { set: &self.in_flight, key })
    }

    // ----- posts -----

    pub async fn create_post(&self, draft: NewPost) -> AppResult<CreatedPost> {
        if draft.title.trim().is_empty() {
            return Err(AppError::user("title_required", "Post title is required"));
        }
        if let Some(url) = draft.video_url.as_deref() {
            media::validate_embed_url(url)?;
        }
        let me = self.ctx.identity.current();

        let mut fields = serde_json::to_value(&draft)?;
        let obj = fields.as_object_mut().expect("NewPost serializes to an object");
        obj.insert("title".into(), json!(draft.title.trim()));
        obj.insert("upvotes".into(), json!(0));
        // Ownership data depends on the auth mode chosen at onboarding.
        let secret = match me.auth_mode {
            AuthMode::AnonymousId => {
                obj.insert("user_id".into(), json!(me.id));
                None
            }
            AuthMode::SecretKey => {
                let key = generate_secret_key();
                obj.insert("secret_key".into(), json!(key));
                Some(key)
            }
        };

        let row = self.ctx.gateway.create(Collection::Posts, fields).await?;
        let post = scrub(decode::<Post>(row)?);
        debug!(target: "board", post_id = %post.id, keyed = secret.is_some(), "post created");
        Ok(CreatedPost { post, secret_key: secret })
    }

    pub async fn get_post(&self, id: &str) -> AppResult<Post> {
        let row = self.ctx.gateway.read_one(Collection::Posts, id).await?;
        Ok(scrub(decode(row)?))
    }

    /// Feed listing. Read failures are surfaced; callers degrade to an empty
    /// feed rather than crash.
    pub async fn list_posts(&self, order: Order) -> AppResult<Vec<Post>> {
        let rows = self.ctx.gateway.read(Collection::Posts, Filter::none(), Some(order)).await?;
        rows.into_iter().map(|r| decode(r).map(scrub)).collect()
    }

    /// Case-insensitive title search over the feed.
    pub async fn search_posts(&self, query: &str) -> AppResult<Vec<Post>> {
        let needle = query.trim().to_lowercase();
        let posts = self.list_posts(Order::desc("created_at")).await?;
        if needle.is_empty() {
            return Ok(posts);
        }
        Ok(posts.into_iter().filter(|p| p.title.to_lowercase().contains(&needle)).collect())
    }

    /// Resolve a repost link. A dangling reference (the target was deleted)
    /// reads as `None`, never an error.
    pub async fn referenced_post(&self, referenced_id: &str) -> AppResult<Option<Post>> {
        match self.ctx.gateway.read_one(Collection::Posts, referenced_id).await {
            Ok(row) => Ok(Some(scrub(decode(row)?))),
            Err(AppError::NotFound { .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Anyone may upvote; read-modify-write, last-write-wins.
    pub async fn upvote(&self, post_id: &str) -> AppResult<i64> {
        let _op = self.begin(format!("posts/{}/upvote", post_id))?;
        let post = self.get_post(post_id).await?;
        let next = post.upvotes + 1;
        let row = self
            .ctx
            .gateway
            .update(Collection::Posts, post_id, json!({ "upvotes": next }))
            .await?;
        Ok(decode::<Post>(row)?.upvotes)
    }

    /// Run the pure guard decision for a post the UI wants to edit/delete.
    pub fn access_for(&self, action: Action, post: &Post) -> Access {
        crate::identity::check(
            &self.ctx.identity.current(),
            action,
            ResourceKind::Posts,
            post.user_id.as_deref(),
        )
    }

    /// Remote secret-key challenge for one post. A successful challenge
    /// yields a grant valid for that post only, reusable within a single
    /// edit session's subsequent save.
    pub async fn verify_post_key(&self, post_id: &str, candidate: &str) -> AppResult<KeyGrant> {
        let ok = verify_secret_key(self.ctx.gateway.as_ref(), ResourceKind::Posts, post_id, candidate).await?;
        if ok {
            debug!(target: "board", post_id, "secret key verified");
            Ok(KeyGrant::new(ResourceKind::Posts, post_id))
        } else {
            warn!(target: "board", post_id, "secret key rejected");
            Err(AppError::key("invalid_key", "Invalid secret key"))
        }
    }

    /// Authorization gate shared by update and delete. Runs before the
    /// mutation; a denial here means the gateway is never called.
    fn authorize_post(&self, action: Action, post: &Post, grant: Option<&KeyGrant>) -> AppResult<()> {
        match self.access_for(action, post) {
            Access::Granted => Ok(()),
            Access::KeyRequired => match grant {
                Some(g) if g.covers(ResourceKind::Posts, &post.id) => Ok(()),
                _ => Err(AppError::auth(
                    "key_required",
                    "Enter the secret key for this post to continue",
                )),
            },
            Access::Denied => {
                Err(AppError::auth("not_author", "You are not authorized to modify this post"))
            }
        }
    }

    pub async fn update_post(
        &self,
        post_id: &str,
        patch: PostPatch,
        grant: Option<&KeyGrant>,
    ) -> AppResult<Post> {
        if let Some(title) = patch.title.as_deref() {
            if title.trim().is_empty() {
                return Err(AppError::user("title_required", "Post title is required"));
            }
        }
        if let Some(url) = patch.video_url.as_deref() {
            if !url.is_empty() {
                media::validate_embed_url(url)?;
            }
        }
        let _op = self.begin(format!("posts/{}", post_id))?;
        let post = self.get_post(post_id).await?;
        self.authorize_post(Action::Edit, &post, grant)?;

        let mut fields = serde_json::to_value(&patch)?;
        fields
            .as_object_mut()
            .expect("PostPatch serializes to an object")
            .insert("updated_at".into(), json!(chrono::Utc::now()));
        let row = self.ctx.gateway.update(Collection::Posts, post_id, fields).await?;
        debug!(target: "board", post_id, "post updated");
        Ok(scrub(decode(row)?))
    }

    /// Delete a post. Posts referencing it keep their `referenced_post_id`;
    /// the link simply resolves to nothing afterwards.
    pub async fn delete_post(&self, post_id: &str, grant: Option<&KeyGrant>) -> AppResult<()> {
        let _op = self.begin(format!("posts/{}", post_id))?;
        let post = self.get_post(post_id).await?;
        self.authorize_post(Action::Delete, &post, grant)?;
        self.ctx.gateway.delete(Collection::Posts, post_id).await?;
        debug!(target: "board", post_id, "post deleted");
        Ok(())
    }

    // ----- comments -----

    pub async fn add_comment(&self, post_id: &str, content: &str) -> AppResult<Comment> {
        let text = content.trim();
        if text.is_empty() {
            return Err(AppError::user("comment_required", "Comment text is required"));
        }
        // The comments schema has no authorship columns; nothing else is sent.
        let row = self
            .ctx
            .gateway
            .create(Collection::Comments, json!({ "post_id": post_id, "content": text }))
            .await?;
        decode(row)
    }

    pub async fn list_comments(&self, post_id: &str) -> AppResult<Vec<Comment>> {
        let rows = self
            .ctx
            .gateway
            .read(Collection::Comments, Filter::by("post_id", post_id), Some(Order::desc("created_at")))
            .await?;
        rows.into_iter().map(decode).collect()
    }

    /// Comment deletion is open to everyone; the schema stores no ownership
    /// to check against. The guard is still consulted so the decision lives
    /// in one place.
    pub async fn delete_comment(&self, comment_id: &str) -> AppResult<()> {
        let me = self.ctx.identity.current();
        match crate::identity::check(&me, Action::Delete, ResourceKind::Comments, None) {
            Access::Granted => {}
            _ => return Err(AppError::auth("not_authorized", "You may not delete this comment")),
        }
        let _op = self.begin(format!("comments/{}", comment_id))?;
        self.ctx.gateway.delete(Collection::Comments, comment_id).await?;
        debug!(target: "board", comment_id, "comment deleted");
        Ok(())
    }

    // ----- flags and preferences -----

    pub async fn list_flags(&self) -> AppResult<Vec<PostFlag>> {
        let rows = self
            .ctx
            .gateway
            .read(Collection::PostFlags, Filter::none(), Some(Order::asc("name")))
            .await?;
        rows.into_iter().map(decode).collect()
    }

    /// Stored preferences for the current identity, or defaults when none
    /// are saved yet.
    pub async fn load_preferences(&self) -> AppResult<Preferences> {
        let me = self.ctx.identity.current();
        let rows = self
            .ctx
            .gateway
            .read(Collection::UserPreferences, Filter::by("user_id", &me.id), None)
            .await?;
        match rows.into_iter().next() {
            Some(row) => decode(row),
            None => Ok(Preferences::default_for(me.id)),
        }
    }

    pub async fn save_preferences(&self, mut prefs: Preferences) -> AppResult<Preferences> {
        // Preferences are always keyed by the current identity, whatever the caller set.
        prefs.user_id = self.ctx.identity.current().id;
        let row = self
            .ctx
            .gateway
            .upsert(Collection::UserPreferences, "user_id", serde_json::to_value(&prefs)?)
            .await?;
        decode(row)
    }

    // ----- media -----

    pub async fn upload_image(&self, file_name: &str, bytes: Vec<u8>) -> AppResult<String> {
        media::upload_image(self.ctx.gateway.as_ref(), file_name, bytes).await
    }
}

fn decode<T: DeserializeOwned>(row: Value) -> AppResult<T> {
    serde_json::from_value(row).map_err(AppError::from)
}

/// Strip the stored secret key before a post leaves this layer; it is shown
/// exactly once at creation and never again.
fn scrub(mut post: Post) -> Post {
    post.secret_key = None;
    post
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::AppContext;

    fn board() -> Board {
        Board::new(AppContext::in_memory())
    }

    #[tokio::test]
    async fn create_requires_title() {
        let b = board();
        let err = b.create_post(NewPost::default()).await.unwrap_err();
        assert!(matches!(err, AppError::UserInput { .. }));
    }

    #[tokio::test]
    async fn create_rejects_bad_embed_url() {
        let b = board();
        let draft = NewPost {
            title: "clip".into(),
            video_url: Some("https://example.com/clip.mp4".into()),
            ..Default::default()
        };
        assert!(b.create_post(draft).await.is_err());
    }

    #[tokio::test]
    async fn anonymous_post_carries_author_id_not_key() {
        let b = board();
        let me = b.context().identity.current();
        let created = b.create_post(NewPost { title: "hi".into(), ..Default::default() }).await.unwrap();
        assert!(created.secret_key.is_none());
        assert_eq!(created.post.user_id.as_deref(), Some(me.id.as_str()));
    }

    #[tokio::test]
    async fn double_submit_same_post_conflicts() {
        let b = board();
        let created = b.create_post(NewPost { title: "hi".into(), ..Default::default() }).await.unwrap();
        let id = created.post.id.clone();
        // Hold an in-flight marker as an outstanding request would.
        let _op = b.begin(format!("posts/{}", id)).unwrap();
        let err = b.delete_post(&id, None).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict { .. }));
        drop(_op);
        b.delete_post(&id, None).await.unwrap();
    }

    #[tokio::test]
    async fn in_flight_marker_clears_on_drop() {
        let b = board();
        {
            let _op = b.begin("posts/p1").unwrap();
            assert!(b.begin("posts/p1").is_err());
        }
        assert!(b.begin("posts/p1").is_ok());
    }
}
