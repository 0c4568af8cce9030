//! Application services layer.

pub mod auth;
pub mod cache;
pub mod comments;
pub mod error;
pub mod pagination;
pub mod posts;
pub mod repos;
pub mod users;
