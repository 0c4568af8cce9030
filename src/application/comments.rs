//! Comments are read from and written to the store directly.

use std::sync::Arc;

use thiserror::Error;

use crate::application::pagination::ListQuery;
use crate::application::posts::{PostService, PostServiceError};
use crate::application::repos::{CommentsRepo, CreateCommentParams, RepoError};
use crate::domain::entities::{CommentRecord, PostId};

#[derive(Debug, Error)]
pub enum CommentServiceError {
    #[error("{0}")]
    Validation(&'static str),
    #[error(transparent)]
    Post(#[from] PostServiceError),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

#[derive(Debug, Clone)]
pub struct CreateCommentCommand {
    pub author_name: String,
    pub content: String,
}

#[derive(Clone)]
pub struct CommentService {
    comments: Arc<dyn CommentsRepo>,
    posts: PostService,
}

impl CommentService {
    pub fn new(comments: Arc<dyn CommentsRepo>, posts: PostService) -> Self {
        Self { comments, posts }
    }

    pub async fn create_comment(
        &self,
        post_id: PostId,
        command: CreateCommentCommand,
    ) -> Result<CommentRecord, CommentServiceError> {
        if command.author_name.trim().is_empty() {
            return Err(CommentServiceError::Validation("author_name is required"));
        }
        if command.content.trim().is_empty() {
            return Err(CommentServiceError::Validation("content is required"));
        }

        self.posts.get_post(post_id).await?;

        let comment = self
            .comments
            .create_comment(CreateCommentParams {
                post_id,
                author_name: command.author_name.trim().to_string(),
                content: command.content,
            })
            .await?;
        Ok(comment)
    }

    pub async fn list_comments(
        &self,
        post_id: PostId,
        query: &ListQuery,
    ) -> Result<Vec<CommentRecord>, CommentServiceError> {
        Ok(self.comments.list_for_post(post_id, query).await?)
    }

    pub async fn count_comments(
        &self,
        post_id: PostId,
        query: &ListQuery,
    ) -> Result<u64, CommentServiceError> {
        Ok(self.comments.count_for_post(post_id, query).await?)
    }
}
