use std::sync::Arc;

use crate::application::auth::TokenService;
use crate::application::comments::CommentService;
use crate::application::posts::PostService;
use crate::application::users::UserService;
use crate::infra::db::PostgresRepositories;

#[derive(Clone)]
pub struct ApiState {
    pub users: UserService,
    pub posts: PostService,
    pub comments: CommentService,
    pub tokens: TokenService,
    /// Probed by `/health` when present.
    pub db: Option<Arc<PostgresRepositories>>,
}
