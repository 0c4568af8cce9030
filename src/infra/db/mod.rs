//! Postgres-backed repository implementations.

mod comments;
mod posts;
mod types;
mod users;
mod util;

pub use util::map_sqlx_error;

use std::sync::Arc;

use sqlx::{
    Postgres, QueryBuilder,
    postgres::{PgPool, PgPoolOptions},
    query,
};

use crate::application::pagination::{ListQuery, Sort};
use crate::application::repos::RepoError;

#[derive(Clone)]
pub struct PostgresRepositories {
    pool: Arc<PgPool>,
}

impl PostgresRepositories {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn connect(url: &str, max_connections: u32) -> Result<PgPool, sqlx::Error> {
        PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await
    }

    pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::Error> {
        sqlx::migrate!("./migrations")
            .run(pool)
            .await
            .map_err(Into::into)
    }

    pub async fn health_check(&self) -> Result<(), sqlx::Error> {
        query("SELECT 1").execute(self.pool()).await.map(|_| ())
    }

    /// Appends `AND (a ILIKE $n OR b ILIKE $m ...)` for a non-empty search.
    fn push_search(qb: &mut QueryBuilder<'_, Postgres>, columns: &[&str], query: &ListQuery) {
        let Some(search) = query.search.as_deref() else {
            return;
        };
        let pattern = util::like_pattern(search);
        qb.push(" AND (");
        for (index, column) in columns.iter().enumerate() {
            if index > 0 {
                qb.push(" OR ");
            }
            qb.push(*column);
            qb.push(" ILIKE ");
            qb.push_bind(pattern.clone());
        }
        qb.push(")");
    }

    /// Sort columns come from a fixed allow-list, so they are spliced as-is.
    fn push_order(
        qb: &mut QueryBuilder<'_, Postgres>,
        alias: &str,
        sort: Option<Sort>,
        fallback: &str,
    ) {
        qb.push(" ORDER BY ");
        match sort {
            Some(sort) => {
                qb.push(format!(
                    "{alias}.{} {}, {alias}.id {}",
                    sort.column,
                    sort.direction.as_sql(),
                    sort.direction.as_sql()
                ));
            }
            None => {
                qb.push(fallback);
            }
        }
    }

    fn push_page(qb: &mut QueryBuilder<'_, Postgres>, query: &ListQuery) {
        qb.push(" LIMIT ");
        qb.push_bind(query.limit());
        qb.push(" OFFSET ");
        qb.push_bind(query.offset());
    }

    fn convert_count(value: i64) -> Result<u64, RepoError> {
        value
            .try_into()
            .map_err(|_| RepoError::from_persistence("count exceeds supported range"))
    }
}
