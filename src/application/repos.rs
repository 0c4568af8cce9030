//! Repository traits describing persistence adapters.

use async_trait::async_trait;
use thiserror::Error;
use time::OffsetDateTime;

use crate::application::pagination::ListQuery;
use crate::domain::entities::{
    AuthorSnapshot, CommentRecord, PostId, PostRecord, PostWithAuthor, UserId, UserRecord,
};

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("persistence error: {0}")]
    Persistence(String),
    #[error("duplicate record violates unique constraint `{constraint}`")]
    Duplicate { constraint: String },
    #[error("resource not found")]
    NotFound,
    #[error("invalid input: {message}")]
    InvalidInput { message: String },
    #[error("integrity error: {message}")]
    Integrity { message: String },
    #[error("database timeout")]
    Timeout,
}

impl RepoError {
    pub fn from_persistence(err: impl std::fmt::Display) -> Self {
        Self::Persistence(err.to_string())
    }
}

#[derive(Debug, Clone)]
pub struct CreateUserParams {
    pub name: String,
    pub email: String,
    pub password_hash: String,
}

#[derive(Debug, Clone)]
pub struct CreatePostParams {
    pub title: String,
    pub content: String,
    pub author_id: UserId,
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone)]
pub struct UpdatePostParams {
    pub id: PostId,
    pub title: String,
    pub content: String,
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone)]
pub struct CreateCommentParams {
    pub post_id: PostId,
    pub author_name: String,
    pub content: String,
}

/// A post row as joined by the store. The author columns come from an outer
/// join and are absent when the referenced user row is missing.
#[derive(Debug, Clone)]
pub struct StoredPost {
    pub post: PostRecord,
    pub author: Option<AuthorSnapshot>,
}

#[async_trait]
pub trait UsersRepo: Send + Sync {
    async fn create_user(&self, params: CreateUserParams) -> Result<UserRecord, RepoError>;

    async fn find_by_id(&self, id: UserId) -> Result<Option<UserRecord>, RepoError>;

    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, RepoError>;
}

#[async_trait]
pub trait PostsRepo: Send + Sync {
    async fn find_by_id(&self, id: PostId) -> Result<Option<StoredPost>, RepoError>;

    async fn list_posts(&self, query: &ListQuery) -> Result<Vec<PostWithAuthor>, RepoError>;

    /// Counts rows matching the search filter; sorting and paging are ignored.
    async fn count_posts(&self, query: &ListQuery) -> Result<u64, RepoError>;
}

#[async_trait]
pub trait PostsWriteRepo: Send + Sync {
    async fn create_post(&self, params: CreatePostParams) -> Result<PostRecord, RepoError>;

    /// Fails with [`RepoError::NotFound`] when no row has the given id.
    async fn update_post(&self, params: UpdatePostParams) -> Result<PostRecord, RepoError>;

    /// Returns `false` when no row was removed.
    async fn delete_post(&self, id: PostId) -> Result<bool, RepoError>;
}

#[async_trait]
pub trait CommentsRepo: Send + Sync {
    async fn create_comment(&self, params: CreateCommentParams)
    -> Result<CommentRecord, RepoError>;

    async fn list_for_post(
        &self,
        post_id: PostId,
        query: &ListQuery,
    ) -> Result<Vec<CommentRecord>, RepoError>;

    async fn count_for_post(&self, post_id: PostId, query: &ListQuery) -> Result<u64, RepoError>;
}
