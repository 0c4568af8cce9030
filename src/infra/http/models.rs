use serde::{Deserialize, Serialize};

use crate::application::users::AuthenticatedUser;
use crate::domain::entities::UserId;

#[derive(Debug, Deserialize, Serialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Public user fields plus a freshly issued bearer token.
#[derive(Debug, Deserialize, Serialize)]
pub struct UserResponse {
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub token: String,
}

impl From<AuthenticatedUser> for UserResponse {
    fn from(auth: AuthenticatedUser) -> Self {
        Self {
            id: auth.user.id,
            name: auth.user.name,
            email: auth.user.email,
            token: auth.token,
        }
    }
}

/// Body for creating or replacing a post. A client-supplied `author_id` is
/// accepted and ignored; the author is always the authenticated caller.
#[derive(Debug, Deserialize, Serialize)]
pub struct PostRequest {
    pub title: String,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author_id: Option<UserId>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct CommentRequest {
    pub author_name: String,
    pub content: String,
}

#[derive(Debug, Serialize)]
pub struct ListResponse<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u32,
    pub page_size: u32,
}
