//! Blog backend: users, posts and comments stored in Postgres, with posts
//! and users mirrored in a key-value cache.

pub mod application;
pub mod config;
pub mod domain;
pub mod infra;
