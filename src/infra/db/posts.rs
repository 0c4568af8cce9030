use async_trait::async_trait;
use sqlx::QueryBuilder;

use crate::application::pagination::ListQuery;
use crate::application::repos::{
    CreatePostParams, PostsRepo, PostsWriteRepo, RepoError, StoredPost, UpdatePostParams,
};
use crate::domain::entities::{PostId, PostRecord, PostWithAuthor};

use super::PostgresRepositories;
use super::types::{PostAuthorRow, PostRow};
use super::util::map_sqlx_error;

const POST_COLUMNS: &str = "id, title, content, author_id, created_at, updated_at";

const POST_AUTHOR_SELECT: &str = "SELECT p.id, p.title, p.content, p.author_id, \
     p.created_at, p.updated_at, \
     u.id AS author_ref, u.name AS author_name, u.email AS author_email \
     FROM posts p";

const POST_SEARCH_COLUMNS: &[&str] = &["p.title", "p.content"];

#[async_trait]
impl PostsRepo for PostgresRepositories {
    async fn find_by_id(&self, id: PostId) -> Result<Option<StoredPost>, RepoError> {
        let sql =
            format!("{POST_AUTHOR_SELECT} LEFT JOIN users u ON u.id = p.author_id WHERE p.id = $1");
        let row = sqlx::query_as::<_, PostAuthorRow>(&sql)
            .bind(id)
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(row.map(StoredPost::from))
    }

    async fn list_posts(&self, query: &ListQuery) -> Result<Vec<PostWithAuthor>, RepoError> {
        let mut qb = QueryBuilder::new(POST_AUTHOR_SELECT);
        qb.push(" INNER JOIN users u ON u.id = p.author_id WHERE 1=1 ");
        Self::push_search(&mut qb, POST_SEARCH_COLUMNS, query);
        Self::push_order(&mut qb, "p", query.sort, "p.created_at DESC, p.id DESC");
        Self::push_page(&mut qb, query);

        let rows = qb
            .build_query_as::<PostAuthorRow>()
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        rows.into_iter()
            .map(|row| {
                let StoredPost { post, author } = StoredPost::from(row);
                let post_id = post.id;
                author
                    .and_then(|author| PostWithAuthor::attach(post, author))
                    .ok_or_else(|| RepoError::Integrity {
                        message: format!("post {post_id} has no matching author row"),
                    })
            })
            .collect()
    }

    async fn count_posts(&self, query: &ListQuery) -> Result<u64, RepoError> {
        let mut qb = QueryBuilder::new(
            "SELECT COUNT(*) FROM posts p INNER JOIN users u ON u.id = p.author_id WHERE 1=1 ",
        );
        Self::push_search(&mut qb, POST_SEARCH_COLUMNS, query);

        let total: i64 = qb
            .build_query_scalar::<i64>()
            .fetch_one(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Self::convert_count(total)
    }
}

#[async_trait]
impl PostsWriteRepo for PostgresRepositories {
    async fn create_post(&self, params: CreatePostParams) -> Result<PostRecord, RepoError> {
        let CreatePostParams {
            title,
            content,
            author_id,
            created_at,
        } = params;

        let sql = format!(
            "INSERT INTO posts (title, content, author_id, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $4) RETURNING {POST_COLUMNS}"
        );
        let row = sqlx::query_as::<_, PostRow>(&sql)
            .bind(title)
            .bind(content)
            .bind(author_id)
            .bind(created_at)
            .fetch_one(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(PostRecord::from(row))
    }

    async fn update_post(&self, params: UpdatePostParams) -> Result<PostRecord, RepoError> {
        let UpdatePostParams {
            id,
            title,
            content,
            updated_at,
        } = params;

        let sql = format!(
            "UPDATE posts SET title = $2, content = $3, updated_at = $4 \
             WHERE id = $1 RETURNING {POST_COLUMNS}"
        );
        let row = sqlx::query_as::<_, PostRow>(&sql)
            .bind(id)
            .bind(title)
            .bind(content)
            .bind(updated_at)
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)?
            .ok_or(RepoError::NotFound)?;

        Ok(PostRecord::from(row))
    }

    async fn delete_post(&self, id: PostId) -> Result<bool, RepoError> {
        let result = sqlx::query("DELETE FROM posts WHERE id = $1")
            .bind(id)
            .execute(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(result.rows_affected() > 0)
    }
}
