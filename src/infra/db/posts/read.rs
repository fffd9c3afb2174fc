use async_trait::async_trait;
use sqlx::QueryBuilder;

use crate::application::repos::{PageRequest, PostQueryFilter, PostsRepo, RepoError};
use crate::domain::entities::PostRecord;

use super::PostgresRepositories;
use super::types::PostRow;
use crate::infra::db::map_sqlx_error;

#[async_trait]
impl PostsRepo for PostgresRepositories {
    async fn list_posts(
        &self,
        filter: &PostQueryFilter,
        page: PageRequest,
    ) -> Result<Vec<PostRecord>, RepoError> {
        let offset = i64::try_from(page.offset)
            .map_err(|_| RepoError::from_persistence("page offset exceeds supported range"))?;

        let mut qb = QueryBuilder::new(Self::posts_select_prefix());
        qb.push(" WHERE 1=1 ");
        Self::apply_post_filter(&mut qb, filter);
        qb.push(" ORDER BY p.created_at DESC, p.id DESC LIMIT ");
        qb.push_bind(i64::from(page.limit));
        qb.push(" OFFSET ");
        qb.push_bind(offset);

        let rows = qb
            .build_query_as::<PostRow>()
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(PostRecord::from).collect())
    }

    async fn count_posts(&self, filter: &PostQueryFilter) -> Result<u64, RepoError> {
        let mut qb = QueryBuilder::new("SELECT COUNT(*) FROM posts p WHERE 1=1 ");
        Self::apply_post_filter(&mut qb, filter);

        let count: i64 = qb
            .build_query_scalar()
            .fetch_one(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Self::convert_count(count)
    }

    async fn find_post(&self, id: i64) -> Result<Option<PostRecord>, RepoError> {
        let sql = format!("{} WHERE p.id = $1", Self::posts_select_prefix());
        let row = sqlx::query_as::<_, PostRow>(&sql)
            .bind(id)
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(row.map(PostRecord::from))
    }
}
