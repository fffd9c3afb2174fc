//! Repository traits describing persistence adapters.

use async_trait::async_trait;
use thiserror::Error;
use time::OffsetDateTime;

use crate::domain::entities::{CategoryRecord, PostRecord};

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("persistence error: {0}")]
    Persistence(String),
    #[error("duplicate record violates unique constraint `{constraint}`")]
    Duplicate { constraint: String },
    #[error("resource not found")]
    NotFound,
    #[error("invalid input: {message}")]
    InvalidInput { message: String },
    #[error("integrity error: {message}")]
    Integrity { message: String },
    #[error("database timeout")]
    Timeout,
}

impl RepoError {
    pub fn from_persistence(err: impl std::fmt::Display) -> Self {
        Self::Persistence(err.to_string())
    }
}

/// Typed predicate over stored posts. Unset fields do not constrain the result.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PostQueryFilter {
    /// Case-insensitive substring of the title.
    pub title_contains: Option<String>,
    pub category_id: Option<i64>,
    /// Inclusive lower bound on `created_at`.
    pub created_since: Option<OffsetDateTime>,
}

/// Offset window into an ordered result set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub limit: u32,
    pub offset: u64,
}

impl PageRequest {
    pub fn new(limit: u32, offset: u64) -> Self {
        Self { limit, offset }
    }
}

#[derive(Debug, Clone)]
pub struct CreatePostParams {
    pub title: String,
    pub body: String,
    pub category_id: i64,
}

#[derive(Debug, Clone)]
pub struct UpdatePostParams {
    pub id: i64,
    pub title: String,
    pub body: String,
    pub category_id: i64,
}

#[async_trait]
pub trait PostsRepo: Send + Sync {
    /// Posts matching `filter`, newest first (`created_at DESC, id DESC`).
    async fn list_posts(
        &self,
        filter: &PostQueryFilter,
        page: PageRequest,
    ) -> Result<Vec<PostRecord>, RepoError>;

    async fn count_posts(&self, filter: &PostQueryFilter) -> Result<u64, RepoError>;

    async fn find_post(&self, id: i64) -> Result<Option<PostRecord>, RepoError>;
}

#[async_trait]
pub trait PostsWriteRepo: Send + Sync {
    /// Inserts a post; the store assigns `id` and `created_at`.
    async fn create_post(&self, params: CreatePostParams) -> Result<PostRecord, RepoError>;

    /// Rewrites title, body and category. Fails with `NotFound` for unknown ids.
    async fn update_post(&self, params: UpdatePostParams) -> Result<PostRecord, RepoError>;

    /// Fails with `NotFound` for unknown ids.
    async fn delete_post(&self, id: i64) -> Result<(), RepoError>;
}

#[async_trait]
pub trait CategoriesRepo: Send + Sync {
    /// All categories ordered by name.
    async fn list_categories(&self) -> Result<Vec<CategoryRecord>, RepoError>;

    async fn find_category(&self, id: i64) -> Result<Option<CategoryRecord>, RepoError>;

    async fn create_category(&self, name: &str) -> Result<CategoryRecord, RepoError>;
}

#[async_trait]
pub trait HealthRepo: Send + Sync {
    async fn health_check(&self) -> Result<(), RepoError>;
}
