//! Posts handlers

use axum::Json;
use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{Extension, Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;

use crate::application::auth::Identity;
use crate::application::pagination::{POST_SORT_COLUMNS, QueryParams};
use crate::application::posts::{CreatePostCommand, UpdatePostCommand};
use crate::domain::entities::PostId;

use super::{json_body, post_id, post_to_api, query_params, query_to_api, sanitize};
use crate::infra::http::error::ApiError;
use crate::infra::http::models::{ListResponse, PostRequest};
use crate::infra::http::state::ApiState;

pub async fn list_posts(
    State(state): State<ApiState>,
    query: Result<Query<QueryParams>, QueryRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let query = query_params(query)?
        .normalize(POST_SORT_COLUMNS)
        .map_err(query_to_api)?;

    let (items, total) = tokio::try_join!(
        state.posts.list_posts(&query),
        state.posts.count_posts(&query)
    )
    .map_err(post_to_api)?;

    Ok(Json(ListResponse {
        items,
        total,
        page: query.page,
        page_size: query.page_size,
    }))
}

pub async fn get_post(
    State(state): State<ApiState>,
    path: Result<Path<PostId>, PathRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let id = post_id(path)?;
    let post = state.posts.get_post(id).await.map_err(post_to_api)?;
    Ok(Json(post))
}

pub async fn create_post(
    State(state): State<ApiState>,
    Extension(identity): Extension<Identity>,
    payload: Result<Json<PostRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let payload = json_body(payload)?;

    let post = state
        .posts
        .create_post(CreatePostCommand {
            title: sanitize(&payload.title),
            content: sanitize(&payload.content),
            author_id: identity.user_id,
        })
        .await
        .map_err(post_to_api)?;

    Ok((StatusCode::CREATED, Json(post)))
}

pub async fn update_post(
    State(state): State<ApiState>,
    Extension(identity): Extension<Identity>,
    path: Result<Path<PostId>, PathRejection>,
    payload: Result<Json<PostRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let id = post_id(path)?;
    let payload = json_body(payload)?;

    let post = state
        .posts
        .update_post(
            id,
            UpdatePostCommand {
                title: sanitize(&payload.title),
                content: sanitize(&payload.content),
            },
            identity.user_id,
        )
        .await
        .map_err(post_to_api)?;

    Ok(Json(post))
}

pub async fn delete_post(
    State(state): State<ApiState>,
    Extension(identity): Extension<Identity>,
    path: Result<Path<PostId>, PathRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let id = post_id(path)?;

    state
        .posts
        .delete_post(id, identity.user_id)
        .await
        .map_err(post_to_api)?;

    Ok(StatusCode::NO_CONTENT)
}
