//! Postgres-backed repository implementations.

mod categories;
mod posts;
mod util;

pub use util::map_sqlx_error;

use std::sync::Arc;

use async_trait::async_trait;
use sqlx::{
    Postgres, QueryBuilder,
    postgres::{PgPool, PgPoolOptions},
    query,
};

use crate::application::repos::{HealthRepo, PostQueryFilter, RepoError};

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

    pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(pool).await
    }

    /// Appends the `AND ...` clauses for every predicate set on `filter`.
    fn apply_post_filter<'q>(qb: &mut QueryBuilder<'q, Postgres>, filter: &'q PostQueryFilter) {
        if let Some(title) = filter.title_contains.as_deref() {
            qb.push(" AND p.title ILIKE ");
            qb.push_bind(util::contains_pattern(title));
        }

        if let Some(category_id) = filter.category_id {
            qb.push(" AND p.category_id = ");
            qb.push_bind(category_id);
        }

        if let Some(since) = filter.created_since {
            qb.push(" AND p.created_at >= ");
            qb.push_bind(since);
        }
    }

    fn convert_count(value: i64) -> Result<u64, RepoError> {
        value
            .try_into()
            .map_err(|_| RepoError::from_persistence("count exceeds supported range"))
    }
}

#[async_trait]
impl HealthRepo for PostgresRepositories {
    async fn health_check(&self) -> Result<(), RepoError> {
        query("SELECT 1")
            .execute(self.pool())
            .await
            .map(|_| ())
            .map_err(map_sqlx_error)
    }
}
