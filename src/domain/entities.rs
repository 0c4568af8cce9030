//! Domain entities mirrored from persistent storage.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

pub type UserId = i64;
pub type PostId = i64;
pub type CommentId = i64;

/// A registered user. The full record, password hash included, is what the
/// entity cache stores under `user:{id}` and `user:{email}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl UserRecord {
    /// A record decoded from the cache with `id == 0` carries no identity.
    pub fn has_identity(&self) -> bool {
        self.id != 0
    }
}

/// Denormalized author fields embedded in a post.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorSnapshot {
    pub id: UserId,
    pub name: String,
    pub email: String,
}

impl AuthorSnapshot {
    pub fn has_identity(&self) -> bool {
        self.id != 0
    }
}

impl From<&UserRecord> for AuthorSnapshot {
    fn from(user: &UserRecord) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
            email: user.email.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostRecord {
    pub id: PostId,
    pub title: String,
    pub content: String,
    pub author_id: UserId,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

/// A post whose author has been resolved.
///
/// Only built through [`PostWithAuthor::attach`], which refuses an author
/// without identity or one that does not match `author_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PostWithAuthor {
    pub id: PostId,
    pub title: String,
    pub content: String,
    pub author_id: UserId,
    pub author: AuthorSnapshot,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl PostWithAuthor {
    pub fn attach(post: PostRecord, author: AuthorSnapshot) -> Option<Self> {
        if !author.has_identity() || author.id != post.author_id {
            return None;
        }
        Some(Self {
            id: post.id,
            title: post.title,
            content: post.content,
            author_id: post.author_id,
            author,
            created_at: post.created_at,
            updated_at: post.updated_at,
        })
    }

    pub fn record(&self) -> PostRecord {
        PostRecord {
            id: self.id,
            title: self.title.clone(),
            content: self.content.clone(),
            author_id: self.author_id,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommentRecord {
    pub id: CommentId,
    pub post_id: PostId,
    pub author_name: String,
    pub content: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}
