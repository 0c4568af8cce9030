//! In-memory store and cache fakes shared by the integration suites.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::Mutex;

use blog_service::application::auth::{TokenService, hash_password};
use blog_service::application::cache::{CacheError, EntityCache, KvCache};
use blog_service::application::comments::CommentService;
use blog_service::application::pagination::{ListQuery, SortDirection};
use blog_service::application::posts::PostService;
use blog_service::application::repos::{
    CommentsRepo, CreateCommentParams, CreatePostParams, CreateUserParams, PostsRepo,
    PostsWriteRepo, RepoError, StoredPost, UpdatePostParams, UsersRepo,
};
use blog_service::application::users::UserService;
use blog_service::domain::entities::{
    AuthorSnapshot, CommentRecord, PostId, PostRecord, PostWithAuthor, UserId, UserRecord,
};
use blog_service::infra::cache::InMemoryCache;
use blog_service::infra::http::ApiState;

pub const JWT_SECRET: &str = "integration-secret";

#[derive(Default)]
struct Tables {
    users: BTreeMap<UserId, UserRecord>,
    posts: BTreeMap<PostId, PostRecord>,
    comments: Vec<CommentRecord>,
    next_id: i64,
}

impl Tables {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }
}

/// Store with the same visible semantics as the Postgres adapter.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
    post_reads: AtomicUsize,
    user_reads: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub async fn seed_user(&self, name: &str, email: &str, password: &str) -> UserRecord {
        let mut tables = self.tables.lock().await;
        let now = OffsetDateTime::now_utc();
        let id = tables.next_id();
        let user = UserRecord {
            id,
            name: name.to_string(),
            email: email.to_string(),
            password_hash: hash_password(password).expect("hash password"),
            created_at: now,
            updated_at: now,
        };
        tables.users.insert(id, user.clone());
        user
    }

    pub async fn remove_user(&self, id: UserId) {
        self.tables.lock().await.users.remove(&id);
    }

    pub async fn stored_post(&self, id: PostId) -> Option<PostRecord> {
        self.tables.lock().await.posts.get(&id).cloned()
    }

    pub fn post_reads(&self) -> usize {
        self.post_reads.load(Ordering::SeqCst)
    }

    pub fn user_reads(&self) -> usize {
        self.user_reads.load(Ordering::SeqCst)
    }
}

fn matches_search(query: &ListQuery, fields: &[&str]) -> bool {
    match query.search.as_deref() {
        None => true,
        Some(term) => {
            let term = term.to_lowercase();
            fields
                .iter()
                .any(|field| field.to_lowercase().contains(&term))
        }
    }
}

fn page<T>(items: Vec<T>, query: &ListQuery) -> Vec<T> {
    items
        .into_iter()
        .skip(query.offset() as usize)
        .take(query.limit() as usize)
        .collect()
}

#[async_trait]
impl UsersRepo for MemoryStore {
    async fn create_user(&self, params: CreateUserParams) -> Result<UserRecord, RepoError> {
        let mut tables = self.tables.lock().await;
        if tables.users.values().any(|user| user.email == params.email) {
            return Err(RepoError::Duplicate {
                constraint: "users_email_key".into(),
            });
        }
        let now = OffsetDateTime::now_utc();
        let id = tables.next_id();
        let user = UserRecord {
            id,
            name: params.name,
            email: params.email,
            password_hash: params.password_hash,
            created_at: now,
            updated_at: now,
        };
        tables.users.insert(id, user.clone());
        Ok(user)
    }

    async fn find_by_id(&self, id: UserId) -> Result<Option<UserRecord>, RepoError> {
        self.user_reads.fetch_add(1, Ordering::SeqCst);
        Ok(self.tables.lock().await.users.get(&id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, RepoError> {
        self.user_reads.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .tables
            .lock()
            .await
            .users
            .values()
            .find(|user| user.email == email)
            .cloned())
    }
}

#[async_trait]
impl PostsRepo for MemoryStore {
    async fn find_by_id(&self, id: PostId) -> Result<Option<StoredPost>, RepoError> {
        self.post_reads.fetch_add(1, Ordering::SeqCst);
        let tables = self.tables.lock().await;
        Ok(tables.posts.get(&id).cloned().map(|post| {
            let author = tables.users.get(&post.author_id).map(AuthorSnapshot::from);
            StoredPost { post, author }
        }))
    }

    async fn list_posts(&self, query: &ListQuery) -> Result<Vec<PostWithAuthor>, RepoError> {
        let tables = self.tables.lock().await;
        let mut items: Vec<PostWithAuthor> = tables
            .posts
            .values()
            .filter(|post| matches_search(query, &[post.title.as_str(), post.content.as_str()]))
            .filter_map(|post| {
                let author = tables.users.get(&post.author_id)?;
                PostWithAuthor::attach(post.clone(), AuthorSnapshot::from(author))
            })
            .collect();

        match query.sort {
            Some(sort) => {
                items.sort_by(|a, b| match sort.column {
                    "title" => a.title.cmp(&b.title),
                    "created_at" => a.created_at.cmp(&b.created_at),
                    "updated_at" => a.updated_at.cmp(&b.updated_at),
                    _ => a.id.cmp(&b.id),
                });
                if sort.direction == SortDirection::Desc {
                    items.reverse();
                }
            }
            None => items.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id))),
        }

        Ok(page(items, query))
    }

    async fn count_posts(&self, query: &ListQuery) -> Result<u64, RepoError> {
        let tables = self.tables.lock().await;
        Ok(tables
            .posts
            .values()
            .filter(|post| tables.users.contains_key(&post.author_id))
            .filter(|post| matches_search(query, &[post.title.as_str(), post.content.as_str()]))
            .count() as u64)
    }
}

#[async_trait]
impl PostsWriteRepo for MemoryStore {
    async fn create_post(&self, params: CreatePostParams) -> Result<PostRecord, RepoError> {
        let mut tables = self.tables.lock().await;
        if !tables.users.contains_key(&params.author_id) {
            return Err(RepoError::Integrity {
                message: "posts_author_id_fkey".into(),
            });
        }
        let id = tables.next_id();
        let post = PostRecord {
            id,
            title: params.title,
            content: params.content,
            author_id: params.author_id,
            created_at: params.created_at,
            updated_at: params.created_at,
        };
        tables.posts.insert(id, post.clone());
        Ok(post)
    }

    async fn update_post(&self, params: UpdatePostParams) -> Result<PostRecord, RepoError> {
        let mut tables = self.tables.lock().await;
        let post = tables.posts.get_mut(&params.id).ok_or(RepoError::NotFound)?;
        post.title = params.title;
        post.content = params.content;
        post.updated_at = params.updated_at;
        Ok(post.clone())
    }

    async fn delete_post(&self, id: PostId) -> Result<bool, RepoError> {
        let mut tables = self.tables.lock().await;
        let removed = tables.posts.remove(&id).is_some();
        if removed {
            tables.comments.retain(|comment| comment.post_id != id);
        }
        Ok(removed)
    }
}

#[async_trait]
impl CommentsRepo for MemoryStore {
    async fn create_comment(
        &self,
        params: CreateCommentParams,
    ) -> Result<CommentRecord, RepoError> {
        let mut tables = self.tables.lock().await;
        if !tables.posts.contains_key(&params.post_id) {
            return Err(RepoError::Integrity {
                message: "comments_post_id_fkey".into(),
            });
        }
        let id = tables.next_id();
        let comment = CommentRecord {
            id,
            post_id: params.post_id,
            author_name: params.author_name,
            content: params.content,
            created_at: OffsetDateTime::now_utc(),
        };
        tables.comments.push(comment.clone());
        Ok(comment)
    }

    async fn list_for_post(
        &self,
        post_id: PostId,
        query: &ListQuery,
    ) -> Result<Vec<CommentRecord>, RepoError> {
        let tables = self.tables.lock().await;
        let mut items: Vec<CommentRecord> = tables
            .comments
            .iter()
            .filter(|comment| comment.post_id == post_id)
            .filter(|comment| matches_search(query, &[comment.author_name.as_str(), comment.content.as_str()]))
            .cloned()
            .collect();
        if let Some(sort) = query.sort {
            items.sort_by(|a, b| match sort.column {
                "author_name" => a.author_name.cmp(&b.author_name),
                "created_at" => a.created_at.cmp(&b.created_at),
                _ => a.id.cmp(&b.id),
            });
            if sort.direction == SortDirection::Desc {
                items.reverse();
            }
        }
        Ok(page(items, query))
    }

    async fn count_for_post(&self, post_id: PostId, query: &ListQuery) -> Result<u64, RepoError> {
        let tables = self.tables.lock().await;
        Ok(tables
            .comments
            .iter()
            .filter(|comment| comment.post_id == post_id)
            .filter(|comment| matches_search(query, &[comment.author_name.as_str(), comment.content.as_str()]))
            .count() as u64)
    }
}

/// Every operation fails, as if the cache server were unreachable.
#[derive(Default)]
pub struct UnreachableCache;

#[async_trait]
impl KvCache for UnreachableCache {
    async fn get(&self, _key: &str) -> Result<Option<String>, CacheError> {
        Err(CacheError::backend("connection refused"))
    }

    async fn set(&self, _key: &str, _value: &str, _ttl: Duration) -> Result<(), CacheError> {
        Err(CacheError::backend("connection refused"))
    }

    async fn delete(&self, _key: &str) -> Result<(), CacheError> {
        Err(CacheError::backend("connection refused"))
    }
}

pub struct Services {
    pub users: UserService,
    pub posts: PostService,
    pub comments: CommentService,
    pub tokens: TokenService,
}

pub fn services(store: Arc<MemoryStore>, backend: Arc<dyn KvCache>) -> Services {
    let cache = EntityCache::new(backend);
    let tokens = TokenService::new(JWT_SECRET, Duration::from_secs(3600));
    let users = UserService::new(store.clone(), cache.clone(), tokens.clone());
    let posts = PostService::new(store.clone(), store.clone(), users.clone(), cache);
    let comments = CommentService::new(store, posts.clone());
    Services {
        users,
        posts,
        comments,
        tokens,
    }
}

pub fn api_state(store: Arc<MemoryStore>, backend: Arc<dyn KvCache>) -> ApiState {
    let Services {
        users,
        posts,
        comments,
        tokens,
    } = services(store, backend);
    ApiState {
        users,
        posts,
        comments,
        tokens,
        db: None,
    }
}

pub fn memory_cache() -> Arc<InMemoryCache> {
    Arc::new(InMemoryCache::new())
}
