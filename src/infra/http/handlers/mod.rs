//! HTTP handlers organized by resource, plus the service-error mappings they
//! share.

mod comments;
mod posts;
mod users;

pub use comments::*;
pub use posts::*;
pub use users::*;

use std::collections::HashSet;
use std::sync::LazyLock;

use axum::Json;
use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{Path, Query};
use axum::http::StatusCode;

use crate::application::comments::CommentServiceError;
use crate::application::pagination::QueryError;
use crate::application::posts::PostServiceError;
use crate::application::repos::RepoError;
use crate::application::users::UserServiceError;
use crate::domain::entities::PostId;

use super::error::{ApiError, codes};

/// Strips every tag; script and style bodies are dropped with their tags.
static STRICT_SANITIZER: LazyLock<ammonia::Builder<'static>> = LazyLock::new(|| {
    let mut builder = ammonia::Builder::default();
    builder.tags(HashSet::new());
    builder
});

pub(crate) fn sanitize(text: &str) -> String {
    STRICT_SANITIZER.clean(text).to_string()
}

pub(crate) fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    payload.map(|Json(body)| body).map_err(|rejection| {
        ApiError::bad_request("Malformed request body", Some(rejection.body_text()))
    })
}

pub(crate) fn post_id(path: Result<Path<PostId>, PathRejection>) -> Result<PostId, ApiError> {
    path.map(|Path(id)| id).map_err(|rejection| {
        ApiError::bad_request("Invalid post id", Some(rejection.body_text()))
    })
}

pub(crate) fn query_params<T>(query: Result<Query<T>, QueryRejection>) -> Result<T, ApiError> {
    query.map(|Query(params)| params).map_err(|rejection| {
        ApiError::new(
            StatusCode::BAD_REQUEST,
            codes::INVALID_QUERY,
            "Invalid query parameters",
            Some(rejection.body_text()),
        )
    })
}

pub(crate) fn query_to_api(err: QueryError) -> ApiError {
    ApiError::new(
        StatusCode::BAD_REQUEST,
        codes::INVALID_QUERY,
        "Invalid query parameters",
        Some(err.to_string()),
    )
}

pub(crate) fn repo_to_api(err: RepoError) -> ApiError {
    match err {
        RepoError::Duplicate { constraint } => ApiError::new(
            StatusCode::CONFLICT,
            codes::DUPLICATE,
            "Duplicate record",
            Some(constraint),
        ),
        RepoError::NotFound => ApiError::not_found("Resource not found"),
        RepoError::InvalidInput { message } => ApiError::new(
            StatusCode::BAD_REQUEST,
            codes::INVALID_INPUT,
            "Invalid input",
            Some(message),
        ),
        other => ApiError::internal(other.to_string()),
    }
}

pub(crate) fn user_to_api(err: UserServiceError) -> ApiError {
    match err {
        UserServiceError::Validation(message) => ApiError::validation(message),
        UserServiceError::NotFound => ApiError::not_found("User not found"),
        UserServiceError::EmailTaken => ApiError::new(
            StatusCode::CONFLICT,
            codes::EMAIL_TAKEN,
            "Email already registered",
            None,
        ),
        UserServiceError::InvalidCredentials => ApiError::new(
            StatusCode::UNAUTHORIZED,
            codes::INVALID_CREDENTIALS,
            "Invalid email or password",
            None,
        ),
        UserServiceError::Auth(err) => ApiError::internal(err.to_string()),
        UserServiceError::Repo(err) => repo_to_api(err),
    }
}

pub(crate) fn post_to_api(err: PostServiceError) -> ApiError {
    match err {
        PostServiceError::Validation(message) => ApiError::validation(message),
        PostServiceError::NotFound => ApiError::not_found("Post not found"),
        PostServiceError::AuthorNotFound(id) => ApiError::new(
            StatusCode::NOT_FOUND,
            codes::NOT_FOUND,
            "Author not found",
            Some(format!("no user with id {id}")),
        ),
        PostServiceError::Permission => {
            ApiError::forbidden("You are not allowed to modify this post")
        }
        err @ PostServiceError::Hydration { .. } => ApiError::internal(err.to_string()),
        PostServiceError::Author(err) => user_to_api(err),
        PostServiceError::Repo(err) => repo_to_api(err),
    }
}

pub(crate) fn comment_to_api(err: CommentServiceError) -> ApiError {
    match err {
        CommentServiceError::Validation(message) => ApiError::validation(message),
        CommentServiceError::Post(err) => post_to_api(err),
        CommentServiceError::Repo(err) => repo_to_api(err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_strips_markup_and_script_bodies() {
        assert_eq!(sanitize("hello <b>world</b>"), "hello world");
        assert_eq!(sanitize("a<script>alert(1)</script>b"), "ab");
        assert_eq!(sanitize("plain text"), "plain text");
    }

    #[test]
    fn service_errors_map_to_statuses() {
        assert_eq!(
            post_to_api(PostServiceError::Permission).status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            post_to_api(PostServiceError::NotFound).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            user_to_api(UserServiceError::EmailTaken).status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            user_to_api(UserServiceError::InvalidCredentials).status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            comment_to_api(CommentServiceError::Validation("content is required")).status(),
            StatusCode::BAD_REQUEST
        );
        let internal = repo_to_api(RepoError::Timeout);
        assert_eq!(internal.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(internal.code(), codes::INTERNAL);
    }
}
