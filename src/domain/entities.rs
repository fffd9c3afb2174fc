//! Domain entities mirrored from persistent storage.

use serde::Serialize;
use time::OffsetDateTime;

/// A news article together with the name of the category it belongs to.
///
/// `created_at` is assigned by the store when the post is inserted and is
/// never rewritten afterwards; `updated_at` tracks the last edit.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PostRecord {
    pub id: i64,
    pub title: String,
    pub body: String,
    pub category_id: i64,
    pub category_name: String,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryRecord {
    pub id: i64,
    pub name: String,
}
