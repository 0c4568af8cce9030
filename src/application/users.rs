//! User lookups through the entity cache, plus registration and login.

use std::sync::Arc;

use email_address::EmailAddress;
use thiserror::Error;
use tracing::{debug, warn};

use crate::application::auth::{AuthError, TokenService, hash_password, verify_password};
use crate::application::cache::{
    CacheKey, EntityCache, record_error, record_hit, record_miss,
};
use crate::application::repos::{CreateUserParams, RepoError, UsersRepo};
use crate::domain::entities::{UserId, UserRecord};

#[derive(Debug, Error)]
pub enum UserServiceError {
    #[error("{0}")]
    Validation(&'static str),
    #[error("user not found")]
    NotFound,
    #[error("email already in use")]
    EmailTaken,
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

#[derive(Debug, Clone)]
pub struct RegisterCommand {
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone)]
pub struct LoginCommand {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub user: UserRecord,
    pub token: String,
}

#[derive(Clone)]
pub struct UserService {
    users: Arc<dyn UsersRepo>,
    cache: EntityCache,
    tokens: TokenService,
}

impl UserService {
    pub fn new(users: Arc<dyn UsersRepo>, cache: EntityCache, tokens: TokenService) -> Self {
        Self {
            users,
            cache,
            tokens,
        }
    }

    /// Resolve a user by id: cache first, then the store, re-populating the
    /// cache on the way out.
    pub async fn resolve_author(&self, id: UserId) -> Result<UserRecord, UserServiceError> {
        let key = CacheKey::User(id);
        if let Some(user) = self
            .cached_user(&key, |user| user.has_identity() && user.id == id)
            .await
        {
            return Ok(user);
        }

        let user = self
            .users
            .find_by_id(id)
            .await?
            .ok_or(UserServiceError::NotFound)?;
        self.remember(&user).await;
        Ok(user)
    }

    /// Resolve a user by email. `Ok(None)` means the store has no such user.
    pub async fn resolve_author_by_email(
        &self,
        email: &str,
    ) -> Result<Option<UserRecord>, UserServiceError> {
        let key = CacheKey::UserEmail(email.to_string());
        // A snapshot with a blank email is a decode artifact, not a user.
        if let Some(user) = self
            .cached_user(&key, |user| !user.email.is_empty() && user.email == email)
            .await
        {
            return Ok(Some(user));
        }

        let Some(user) = self.users.find_by_email(email).await? else {
            return Ok(None);
        };
        self.remember(&user).await;
        Ok(Some(user))
    }

    pub async fn register(
        &self,
        command: RegisterCommand,
    ) -> Result<AuthenticatedUser, UserServiceError> {
        let email = validate_email(&command.email)?;
        if command.name.trim().is_empty() {
            return Err(UserServiceError::Validation("name is required"));
        }
        if command.password.is_empty() {
            return Err(UserServiceError::Validation("password is required"));
        }

        if self.resolve_author_by_email(&email).await?.is_some() {
            return Err(UserServiceError::EmailTaken);
        }

        let password_hash = hash_password(&command.password)?;
        let user = self
            .users
            .create_user(CreateUserParams {
                name: command.name.trim().to_string(),
                email,
                password_hash,
            })
            .await
            .map_err(|err| match err {
                RepoError::Duplicate { .. } => UserServiceError::EmailTaken,
                other => UserServiceError::Repo(other),
            })?;

        self.remember(&user).await;
        let token = self.tokens.issue(user.id, &user.email)?;
        Ok(AuthenticatedUser { user, token })
    }

    pub async fn login(
        &self,
        command: LoginCommand,
    ) -> Result<AuthenticatedUser, UserServiceError> {
        let email = validate_email(&command.email)?;

        let user = self
            .resolve_author_by_email(&email)
            .await?
            .ok_or(UserServiceError::InvalidCredentials)?;
        if !verify_password(&command.password, &user.password_hash) {
            return Err(UserServiceError::InvalidCredentials);
        }

        let token = self.tokens.issue(user.id, &user.email)?;
        Ok(AuthenticatedUser { user, token })
    }

    async fn cached_user(
        &self,
        key: &CacheKey,
        present: impl Fn(&UserRecord) -> bool,
    ) -> Option<UserRecord> {
        match self.cache.get_entity::<UserRecord>(key).await {
            Ok(Some(user)) if present(&user) => {
                record_hit(key);
                Some(user)
            }
            Ok(_) => {
                record_miss(key);
                None
            }
            Err(err) => {
                record_error(key, "get");
                warn!(
                    target = "blog::cache",
                    key = %key,
                    error = %err,
                    "cache read failed, falling back to store"
                );
                None
            }
        }
    }

    async fn remember(&self, user: &UserRecord) {
        for key in [CacheKey::User(user.id), CacheKey::UserEmail(user.email.clone())] {
            if let Err(err) = self.cache.set_entity(&key, user).await {
                record_error(&key, "set");
                warn!(
                    target = "blog::cache",
                    key = %key,
                    error = %err,
                    "failed to cache user snapshot"
                );
            } else {
                debug!(target = "blog::cache", key = %key, "cached user snapshot");
            }
        }
    }
}

fn validate_email(raw: &str) -> Result<String, UserServiceError> {
    let email = raw.trim();
    if !EmailAddress::is_valid(email) {
        return Err(UserServiceError::Validation("invalid email format"));
    }
    Ok(email.to_string())
}
