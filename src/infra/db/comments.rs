use async_trait::async_trait;
use sqlx::QueryBuilder;

use crate::application::pagination::ListQuery;
use crate::application::repos::{CommentsRepo, CreateCommentParams, RepoError};
use crate::domain::entities::{CommentRecord, PostId};

use super::PostgresRepositories;
use super::types::CommentRow;
use super::util::map_sqlx_error;

const COMMENT_SEARCH_COLUMNS: &[&str] = &["c.author_name", "c.content"];

#[async_trait]
impl CommentsRepo for PostgresRepositories {
    async fn create_comment(
        &self,
        params: CreateCommentParams,
    ) -> Result<CommentRecord, RepoError> {
        let row = sqlx::query_as::<_, CommentRow>(
            "INSERT INTO comments (post_id, author_name, content) VALUES ($1, $2, $3) \
             RETURNING id, post_id, author_name, content, created_at",
        )
        .bind(params.post_id)
        .bind(params.author_name)
        .bind(params.content)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(CommentRecord::from(row))
    }

    async fn list_for_post(
        &self,
        post_id: PostId,
        query: &ListQuery,
    ) -> Result<Vec<CommentRecord>, RepoError> {
        let mut qb = QueryBuilder::new(
            "SELECT c.id, c.post_id, c.author_name, c.content, c.created_at \
             FROM comments c WHERE c.post_id = ",
        );
        qb.push_bind(post_id);
        Self::push_search(&mut qb, COMMENT_SEARCH_COLUMNS, query);
        Self::push_order(&mut qb, "c", query.sort, "c.created_at ASC, c.id ASC");
        Self::push_page(&mut qb, query);

        let rows = qb
            .build_query_as::<CommentRow>()
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(CommentRecord::from).collect())
    }

    async fn count_for_post(&self, post_id: PostId, query: &ListQuery) -> Result<u64, RepoError> {
        let mut qb = QueryBuilder::new("SELECT COUNT(*) FROM comments c WHERE c.post_id = ");
        qb.push_bind(post_id);
        Self::push_search(&mut qb, COMMENT_SEARCH_COLUMNS, query);

        let total: i64 = qb
            .build_query_scalar::<i64>()
            .fetch_one(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Self::convert_count(total)
    }
}
