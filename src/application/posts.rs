//! Post reads and writes coordinated across the store and the entity cache.
//!
//! The store is authoritative. Reads go to `post:{id}` first and fall back to
//! the store on a miss; every successful store commit is followed by a
//! best-effort cache write (or removal, for deletes). A post is never handed
//! out without an author whose id matches `author_id`: snapshots carrying a
//! missing or mismatched author are repaired through [`UserService`].

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use time::OffsetDateTime;
use tracing::{debug, warn};

use crate::application::cache::{
    CacheKey, EntityCache, record_error, record_hit, record_miss,
};
use crate::application::pagination::ListQuery;
use crate::application::repos::{
    CreatePostParams, PostsRepo, PostsWriteRepo, RepoError, UpdatePostParams,
};
use crate::application::users::{UserService, UserServiceError};
use crate::domain::entities::{AuthorSnapshot, PostId, PostRecord, PostWithAuthor, UserId};

#[derive(Debug, Error)]
pub enum PostServiceError {
    #[error("{0}")]
    Validation(&'static str),
    #[error("post not found")]
    NotFound,
    #[error("author {0} not found")]
    AuthorNotFound(UserId),
    #[error("acting user does not own this post")]
    Permission,
    #[error("post {post_id} could not be attached to its author")]
    Hydration { post_id: PostId },
    #[error(transparent)]
    Author(UserServiceError),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

impl PostServiceError {
    fn from_author(author_id: UserId, err: UserServiceError) -> Self {
        match err {
            UserServiceError::NotFound => Self::AuthorNotFound(author_id),
            UserServiceError::Repo(err) => Self::Repo(err),
            other => Self::Author(other),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CreatePostCommand {
    pub title: String,
    pub content: String,
    pub author_id: UserId,
}

#[derive(Debug, Clone)]
pub struct UpdatePostCommand {
    pub title: String,
    pub content: String,
}

/// Cache representation of a post. The embedded author defaults to a
/// zero-identity snapshot when missing from the stored JSON.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct CachedPost {
    id: PostId,
    title: String,
    content: String,
    author_id: UserId,
    #[serde(default)]
    author: AuthorSnapshot,
    #[serde(with = "time::serde::rfc3339")]
    created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    updated_at: OffsetDateTime,
}

impl CachedPost {
    fn into_parts(self) -> (PostRecord, AuthorSnapshot) {
        (
            PostRecord {
                id: self.id,
                title: self.title,
                content: self.content,
                author_id: self.author_id,
                created_at: self.created_at,
                updated_at: self.updated_at,
            },
            self.author,
        )
    }
}

impl From<&PostWithAuthor> for CachedPost {
    fn from(post: &PostWithAuthor) -> Self {
        Self {
            id: post.id,
            title: post.title.clone(),
            content: post.content.clone(),
            author_id: post.author_id,
            author: post.author.clone(),
            created_at: post.created_at,
            updated_at: post.updated_at,
        }
    }
}

#[derive(Clone)]
pub struct PostService {
    reader: Arc<dyn PostsRepo>,
    writer: Arc<dyn PostsWriteRepo>,
    users: UserService,
    cache: EntityCache,
}

impl PostService {
    pub fn new(
        reader: Arc<dyn PostsRepo>,
        writer: Arc<dyn PostsWriteRepo>,
        users: UserService,
        cache: EntityCache,
    ) -> Self {
        Self {
            reader,
            writer,
            users,
            cache,
        }
    }

    pub async fn get_post(&self, id: PostId) -> Result<PostWithAuthor, PostServiceError> {
        let key = CacheKey::Post(id);
        if let Some(snapshot) = self.cached_post(&key, id).await {
            let (record, author) = snapshot.into_parts();
            let needs_repair = !author_matches(&record, &author);
            let post = self.hydrate(record, author).await?;
            if needs_repair {
                self.remember(&post).await;
            }
            return Ok(post);
        }

        let stored = self
            .reader
            .find_by_id(id)
            .await?
            .ok_or(PostServiceError::NotFound)?;
        let post = self
            .hydrate(stored.post, stored.author.unwrap_or_default())
            .await?;
        self.remember(&post).await;
        Ok(post)
    }

    pub async fn create_post(
        &self,
        command: CreatePostCommand,
    ) -> Result<PostWithAuthor, PostServiceError> {
        let (title, content) = validate_fields(&command.title, &command.content)?;

        let author = self
            .users
            .resolve_author(command.author_id)
            .await
            .map_err(|err| PostServiceError::from_author(command.author_id, err))?;

        let record = self
            .writer
            .create_post(CreatePostParams {
                title,
                content,
                author_id: author.id,
                created_at: OffsetDateTime::now_utc(),
            })
            .await?;

        let post_id = record.id;
        let post = PostWithAuthor::attach(record, AuthorSnapshot::from(&author))
            .ok_or(PostServiceError::Hydration { post_id })?;
        self.remember(&post).await;
        Ok(post)
    }

    pub async fn update_post(
        &self,
        id: PostId,
        command: UpdatePostCommand,
        acting_user_id: UserId,
    ) -> Result<PostWithAuthor, PostServiceError> {
        let (title, content) = validate_fields(&command.title, &command.content)?;

        let existing = self.get_post(id).await?;
        ensure_owner(&existing, acting_user_id)?;

        let record = self
            .writer
            .update_post(UpdatePostParams {
                id,
                title,
                content,
                updated_at: OffsetDateTime::now_utc(),
            })
            .await
            .map_err(|err| match err {
                RepoError::NotFound => PostServiceError::NotFound,
                other => PostServiceError::Repo(other),
            })?;

        let post = self.hydrate(record, existing.author).await?;
        self.remember(&post).await;
        Ok(post)
    }

    pub async fn delete_post(
        &self,
        id: PostId,
        acting_user_id: UserId,
    ) -> Result<(), PostServiceError> {
        let existing = self.get_post(id).await?;
        ensure_owner(&existing, acting_user_id)?;

        let removed = self.writer.delete_post(id).await?;
        self.forget(&CacheKey::Post(id)).await;
        if !removed {
            return Err(PostServiceError::NotFound);
        }
        Ok(())
    }

    pub async fn list_posts(
        &self,
        query: &ListQuery,
    ) -> Result<Vec<PostWithAuthor>, PostServiceError> {
        Ok(self.reader.list_posts(query).await?)
    }

    pub async fn count_posts(&self, query: &ListQuery) -> Result<u64, PostServiceError> {
        Ok(self.reader.count_posts(query).await?)
    }

    async fn hydrate(
        &self,
        record: PostRecord,
        author: AuthorSnapshot,
    ) -> Result<PostWithAuthor, PostServiceError> {
        let author = if author_matches(&record, &author) {
            author
        } else {
            debug!(
                target = "blog::cache",
                post_id = record.id,
                author_id = record.author_id,
                "re-resolving author for partially hydrated post"
            );
            let user = self
                .users
                .resolve_author(record.author_id)
                .await
                .map_err(|err| PostServiceError::from_author(record.author_id, err))?;
            AuthorSnapshot::from(&user)
        };

        let post_id = record.id;
        PostWithAuthor::attach(record, author).ok_or(PostServiceError::Hydration { post_id })
    }

    async fn cached_post(&self, key: &CacheKey, id: PostId) -> Option<CachedPost> {
        match self.cache.get_entity::<CachedPost>(key).await {
            Ok(Some(snapshot)) if snapshot.id != 0 && snapshot.id == id => {
                record_hit(key);
                Some(snapshot)
            }
            Ok(_) => {
                record_miss(key);
                None
            }
            Err(err) => {
                record_error(key, "get");
                warn!(
                    target = "blog::cache",
                    key = %key,
                    error = %err,
                    "cache read failed, falling back to store"
                );
                None
            }
        }
    }

    async fn remember(&self, post: &PostWithAuthor) {
        let key = CacheKey::Post(post.id);
        if let Err(err) = self.cache.set_entity(&key, &CachedPost::from(post)).await {
            record_error(&key, "set");
            warn!(
                target = "blog::cache",
                key = %key,
                error = %err,
                "failed to cache post snapshot"
            );
        }
    }

    async fn forget(&self, key: &CacheKey) {
        if let Err(err) = self.cache.delete_entity(key).await {
            record_error(key, "delete");
            warn!(
                target = "blog::cache",
                key = %key,
                error = %err,
                "failed to evict post snapshot"
            );
        }
    }
}

fn author_matches(record: &PostRecord, author: &AuthorSnapshot) -> bool {
    author.has_identity() && author.id == record.author_id
}

fn ensure_owner(post: &PostWithAuthor, acting_user_id: UserId) -> Result<(), PostServiceError> {
    if post.author_id != acting_user_id {
        return Err(PostServiceError::Permission);
    }
    Ok(())
}

fn validate_fields(title: &str, content: &str) -> Result<(String, String), PostServiceError> {
    if title.trim().is_empty() {
        return Err(PostServiceError::Validation("title is required"));
    }
    if content.trim().is_empty() {
        return Err(PostServiceError::Validation("content is required"));
    }
    Ok((title.to_string(), content.to_string()))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;

    use super::*;
    use crate::application::auth::TokenService;
    use crate::application::cache::{CacheError, KvCache};
    use crate::application::repos::{CreateUserParams, StoredPost, UsersRepo};
    use crate::domain::entities::UserRecord;
    use crate::infra::cache::InMemoryCache;

    #[derive(Default)]
    struct StubStore {
        users: Mutex<HashMap<UserId, UserRecord>>,
        posts: Mutex<HashMap<PostId, PostRecord>>,
        post_reads: AtomicUsize,
        fail_writes: bool,
    }

    impl StubStore {
        fn with_user(id: UserId) -> Self {
            let store = Self::default();
            let now = OffsetDateTime::now_utc();
            store.users.lock().unwrap().insert(
                id,
                UserRecord {
                    id,
                    name: format!("User {id}"),
                    email: format!("user{id}@example.com"),
                    password_hash: "hash".into(),
                    created_at: now,
                    updated_at: now,
                },
            );
            store
        }

        fn post_reads(&self) -> usize {
            self.post_reads.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl UsersRepo for StubStore {
        async fn create_user(&self, _params: CreateUserParams) -> Result<UserRecord, RepoError> {
            Err(RepoError::from_persistence("not supported"))
        }

        async fn find_by_id(&self, id: UserId) -> Result<Option<UserRecord>, RepoError> {
            Ok(self.users.lock().unwrap().get(&id).cloned())
        }

        async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, RepoError> {
            Ok(self
                .users
                .lock()
                .unwrap()
                .values()
                .find(|user| user.email == email)
                .cloned())
        }
    }

    #[async_trait]
    impl PostsRepo for StubStore {
        async fn find_by_id(&self, id: PostId) -> Result<Option<StoredPost>, RepoError> {
            self.post_reads.fetch_add(1, Ordering::SeqCst);
            let post = self.posts.lock().unwrap().get(&id).cloned();
            Ok(post.map(|post| {
                let author = self
                    .users
                    .lock()
                    .unwrap()
                    .get(&post.author_id)
                    .map(AuthorSnapshot::from);
                StoredPost { post, author }
            }))
        }

        async fn list_posts(&self, _query: &ListQuery) -> Result<Vec<PostWithAuthor>, RepoError> {
            Ok(Vec::new())
        }

        async fn count_posts(&self, _query: &ListQuery) -> Result<u64, RepoError> {
            Ok(self.posts.lock().unwrap().len() as u64)
        }
    }

    #[async_trait]
    impl PostsWriteRepo for StubStore {
        async fn create_post(&self, params: CreatePostParams) -> Result<PostRecord, RepoError> {
            if self.fail_writes {
                return Err(RepoError::Timeout);
            }
            let mut posts = self.posts.lock().unwrap();
            let record = PostRecord {
                id: posts.len() as PostId + 1,
                title: params.title,
                content: params.content,
                author_id: params.author_id,
                created_at: params.created_at,
                updated_at: params.created_at,
            };
            posts.insert(record.id, record.clone());
            Ok(record)
        }

        async fn update_post(&self, params: UpdatePostParams) -> Result<PostRecord, RepoError> {
            let mut posts = self.posts.lock().unwrap();
            let post = posts.get_mut(&params.id).ok_or(RepoError::NotFound)?;
            post.title = params.title;
            post.content = params.content;
            post.updated_at = params.updated_at;
            Ok(post.clone())
        }

        async fn delete_post(&self, id: PostId) -> Result<bool, RepoError> {
            Ok(self.posts.lock().unwrap().remove(&id).is_some())
        }
    }

    /// Reads work, writes always fail.
    #[derive(Default)]
    struct ReadOnlyCache {
        inner: InMemoryCache,
    }

    #[async_trait]
    impl KvCache for ReadOnlyCache {
        async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
            self.inner.get(key).await
        }

        async fn set(&self, _key: &str, _value: &str, _ttl: Duration) -> Result<(), CacheError> {
            Err(CacheError::backend("read-only replica"))
        }

        async fn delete(&self, _key: &str) -> Result<(), CacheError> {
            Err(CacheError::backend("read-only replica"))
        }
    }

    fn service(store: Arc<StubStore>, backend: Arc<dyn KvCache>) -> PostService {
        let cache = EntityCache::new(backend);
        let users = UserService::new(
            store.clone(),
            cache.clone(),
            TokenService::new("test-secret", Duration::from_secs(60)),
        );
        PostService::new(store.clone(), store, users, cache)
    }

    fn command(author_id: UserId) -> CreatePostCommand {
        CreatePostCommand {
            title: "T".into(),
            content: "C".into(),
            author_id,
        }
    }

    #[tokio::test]
    async fn snapshot_without_author_is_repaired_and_recached() {
        let store = Arc::new(StubStore::with_user(7));
        let backend = Arc::new(InMemoryCache::new());
        let posts = service(store.clone(), backend.clone());
        let created = posts.create_post(command(7)).await.expect("create");

        backend
            .set(
                "post:1",
                &format!(
                    r#"{{"id":1,"title":"T","content":"C","author_id":7,"created_at":"{ts}","updated_at":"{ts}"}}"#,
                    ts = "2024-01-01T00:00:00Z"
                ),
                Duration::from_secs(60),
            )
            .await
            .expect("seed");

        let post = posts.get_post(created.id).await.expect("get");
        assert_eq!(post.author.id, 7);
        assert_eq!(post.author.email, "user7@example.com");
        assert_eq!(store.post_reads(), 0);

        let raw = backend.get("post:1").await.expect("get raw").expect("cached");
        let repaired: serde_json::Value = serde_json::from_str(&raw).expect("json");
        assert_eq!(repaired["author"]["id"], 7);
    }

    #[tokio::test]
    async fn create_for_unknown_author_fails_without_store_write() {
        let store = Arc::new(StubStore::default());
        let posts = service(store.clone(), Arc::new(InMemoryCache::new()));

        let result = posts.create_post(command(42)).await;

        assert!(matches!(result, Err(PostServiceError::AuthorNotFound(42))));
        assert!(store.posts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn create_requires_title_and_content() {
        let store = Arc::new(StubStore::with_user(7));
        let posts = service(store, Arc::new(InMemoryCache::new()));

        let mut blank_title = command(7);
        blank_title.title = "   ".into();
        assert!(matches!(
            posts.create_post(blank_title).await,
            Err(PostServiceError::Validation("title is required"))
        ));

        let mut blank_content = command(7);
        blank_content.content = String::new();
        assert!(matches!(
            posts.create_post(blank_content).await,
            Err(PostServiceError::Validation("content is required"))
        ));
    }

    #[tokio::test]
    async fn store_failure_leaves_cache_untouched() {
        let store = Arc::new(StubStore {
            fail_writes: true,
            ..StubStore::with_user(7)
        });
        let backend = Arc::new(InMemoryCache::new());
        let posts = service(store, backend.clone());

        let result = posts.create_post(command(7)).await;

        assert!(matches!(
            result,
            Err(PostServiceError::Repo(RepoError::Timeout))
        ));
        assert!(backend.get("post:1").await.expect("get").is_none());
    }

    #[tokio::test]
    async fn cache_write_failures_do_not_fail_mutations() {
        let store = Arc::new(StubStore::with_user(7));
        let posts = service(store.clone(), Arc::new(ReadOnlyCache::default()));

        let created = posts.create_post(command(7)).await.expect("create");
        let updated = posts
            .update_post(
                created.id,
                UpdatePostCommand {
                    title: "T2".into(),
                    content: "C2".into(),
                },
                7,
            )
            .await
            .expect("update");
        assert_eq!(updated.title, "T2");

        posts.delete_post(created.id, 7).await.expect("delete");
        assert!(store.posts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn update_overwrites_cached_snapshot() {
        let store = Arc::new(StubStore::with_user(7));
        let posts = service(store.clone(), Arc::new(InMemoryCache::new()));
        let created = posts.create_post(command(7)).await.expect("create");

        posts
            .update_post(
                created.id,
                UpdatePostCommand {
                    title: "Fresh".into(),
                    content: "Body".into(),
                },
                7,
            )
            .await
            .expect("update");

        let reads_before = store.post_reads();
        let post = posts.get_post(created.id).await.expect("get");
        assert_eq!(post.title, "Fresh");
        assert_eq!(store.post_reads(), reads_before);
        assert!(post.updated_at >= created.updated_at);
    }
}
