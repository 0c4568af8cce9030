//! Comment handlers, nested under a post.

use axum::Json;
use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;

use crate::application::comments::CreateCommentCommand;
use crate::application::pagination::{COMMENT_SORT_COLUMNS, QueryParams};
use crate::domain::entities::PostId;

use super::{comment_to_api, json_body, post_id, query_params, query_to_api, sanitize};
use crate::infra::http::error::ApiError;
use crate::infra::http::models::{CommentRequest, ListResponse};
use crate::infra::http::state::ApiState;

pub async fn create_comment(
    State(state): State<ApiState>,
    path: Result<Path<PostId>, PathRejection>,
    payload: Result<Json<CommentRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let post_id = post_id(path)?;
    let payload = json_body(payload)?;

    let comment = state
        .comments
        .create_comment(
            post_id,
            CreateCommentCommand {
                author_name: sanitize(&payload.author_name),
                content: sanitize(&payload.content),
            },
        )
        .await
        .map_err(comment_to_api)?;

    Ok((StatusCode::CREATED, Json(comment)))
}

pub async fn list_comments(
    State(state): State<ApiState>,
    path: Result<Path<PostId>, PathRejection>,
    query: Result<Query<QueryParams>, QueryRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let post_id = post_id(path)?;
    let query = query_params(query)?
        .normalize(COMMENT_SORT_COLUMNS)
        .map_err(query_to_api)?;

    let (items, total) = tokio::try_join!(
        state.comments.list_comments(post_id, &query),
        state.comments.count_comments(post_id, &query)
    )
    .map_err(comment_to_api)?;

    Ok(Json(ListResponse {
        items,
        total,
        page: query.page,
        page_size: query.page_size,
    }))
}
