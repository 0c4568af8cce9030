use time::OffsetDateTime;

use crate::application::repos::StoredPost;
use crate::domain::entities::{
    AuthorSnapshot, CommentId, CommentRecord, PostId, PostRecord, UserId, UserRecord,
};

#[derive(sqlx::FromRow)]
pub(crate) struct UserRow {
    pub(crate) id: UserId,
    pub(crate) name: String,
    pub(crate) email: String,
    pub(crate) password_hash: String,
    pub(crate) created_at: OffsetDateTime,
    pub(crate) updated_at: OffsetDateTime,
}

impl From<UserRow> for UserRecord {
    fn from(row: UserRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            email: row.email,
            password_hash: row.password_hash,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(sqlx::FromRow)]
pub(crate) struct PostRow {
    pub(crate) id: PostId,
    pub(crate) title: String,
    pub(crate) content: String,
    pub(crate) author_id: UserId,
    pub(crate) created_at: OffsetDateTime,
    pub(crate) updated_at: OffsetDateTime,
}

impl From<PostRow> for PostRecord {
    fn from(row: PostRow) -> Self {
        Self {
            id: row.id,
            title: row.title,
            content: row.content,
            author_id: row.author_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Post joined with its author. The author columns are nullable because the
/// single-post lookup uses an outer join.
#[derive(sqlx::FromRow)]
pub(crate) struct PostAuthorRow {
    pub(crate) id: PostId,
    pub(crate) title: String,
    pub(crate) content: String,
    pub(crate) author_id: UserId,
    pub(crate) created_at: OffsetDateTime,
    pub(crate) updated_at: OffsetDateTime,
    pub(crate) author_ref: Option<UserId>,
    pub(crate) author_name: Option<String>,
    pub(crate) author_email: Option<String>,
}

impl From<PostAuthorRow> for StoredPost {
    fn from(row: PostAuthorRow) -> Self {
        let author = match (row.author_ref, row.author_name, row.author_email) {
            (Some(id), Some(name), Some(email)) => Some(AuthorSnapshot { id, name, email }),
            _ => None,
        };
        Self {
            post: PostRecord {
                id: row.id,
                title: row.title,
                content: row.content,
                author_id: row.author_id,
                created_at: row.created_at,
                updated_at: row.updated_at,
            },
            author,
        }
    }
}

#[derive(sqlx::FromRow)]
pub(crate) struct CommentRow {
    pub(crate) id: CommentId,
    pub(crate) post_id: PostId,
    pub(crate) author_name: String,
    pub(crate) content: String,
    pub(crate) created_at: OffsetDateTime,
}

impl From<CommentRow> for CommentRecord {
    fn from(row: CommentRow) -> Self {
        Self {
            id: row.id,
            post_id: row.post_id,
            author_name: row.author_name,
            content: row.content,
            created_at: row.created_at,
        }
    }
}
