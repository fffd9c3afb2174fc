use async_trait::async_trait;
use time::OffsetDateTime;

use crate::application::repos::{CreatePostParams, PostsWriteRepo, RepoError, UpdatePostParams};
use crate::domain::entities::PostRecord;

use super::PostgresRepositories;
use super::types::PostRow;
use crate::infra::db::map_sqlx_error;

/// Name of the data-modifying CTE whose row is joined back onto its category,
/// so writes return the same shape as reads.
const WRITTEN: &str = "written";

#[async_trait]
impl PostsWriteRepo for PostgresRepositories {
    async fn create_post(&self, params: CreatePostParams) -> Result<PostRecord, RepoError> {
        let CreatePostParams {
            title,
            body,
            category_id,
        } = params;

        let now = OffsetDateTime::now_utc();
        let returning = Self::posts_select_from(WRITTEN);
        let sql = format!(
            "WITH {WRITTEN} AS (\
                INSERT INTO posts (title, body, category_id, created_at, updated_at) \
                VALUES ($1, $2, $3, $4, $4) \
                RETURNING *\
             ) {returning}"
        );

        let row = sqlx::query_as::<_, PostRow>(&sql)
            .bind(title)
            .bind(body)
            .bind(category_id)
            .bind(now)
            .fetch_one(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(PostRecord::from(row))
    }

    async fn update_post(&self, params: UpdatePostParams) -> Result<PostRecord, RepoError> {
        let UpdatePostParams {
            id,
            title,
            body,
            category_id,
        } = params;

        let now = OffsetDateTime::now_utc();
        let returning = Self::posts_select_from(WRITTEN);
        let sql = format!(
            "WITH {WRITTEN} AS (\
                UPDATE posts SET title = $2, body = $3, category_id = $4, updated_at = $5 \
                WHERE id = $1 \
                RETURNING *\
             ) {returning}"
        );

        let row = sqlx::query_as::<_, PostRow>(&sql)
            .bind(id)
            .bind(title)
            .bind(body)
            .bind(category_id)
            .bind(now)
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        row.map(PostRecord::from).ok_or(RepoError::NotFound)
    }

    async fn delete_post(&self, id: i64) -> Result<(), RepoError> {
        let result = sqlx::query("DELETE FROM posts WHERE id = $1")
            .bind(id)
            .execute(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        if result.rows_affected() == 0 {
            return Err(RepoError::NotFound);
        }
        Ok(())
    }
}
