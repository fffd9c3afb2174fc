use time::OffsetDateTime;

use crate::domain::entities::PostRecord;

#[derive(sqlx::FromRow)]
pub(crate) struct PostRow {
    pub(crate) id: i64,
    pub(crate) title: String,
    pub(crate) body: String,
    pub(crate) category_id: i64,
    pub(crate) category_name: String,
    pub(crate) created_at: OffsetDateTime,
    pub(crate) updated_at: OffsetDateTime,
}

impl From<PostRow> for PostRecord {
    fn from(row: PostRow) -> Self {
        Self {
            id: row.id,
            title: row.title,
            body: row.body,
            category_id: row.category_id,
            category_name: row.category_name,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}
