//! Listing, lookup and editing of news posts.

use std::{num::NonZeroU32, sync::Arc};

use thiserror::Error;
use time::OffsetDateTime;
use tracing::{debug, info};

use crate::application::filter::{BoundFilter, PostFilterParams};
use crate::application::forms::{FormError, FormErrors, PostFormInput, PostFormValidator};
use crate::application::pagination::{PageSelector, PageWindow, PaginationError, Paginator};
use crate::application::repos::{
    CategoriesRepo, CreatePostParams, PostsRepo, PostsWriteRepo, RepoError, UpdatePostParams,
};
use crate::domain::entities::{CategoryRecord, PostRecord};
use crate::domain::error::DomainError;
use crate::domain::posts::CategoryName;

#[derive(Debug, Error)]
pub enum NewsError {
    #[error("post {0} not found")]
    PostNotFound(i64),
    #[error("submitted form is invalid")]
    InvalidForm(FormErrors),
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error(transparent)]
    Pagination(#[from] PaginationError),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

impl From<FormError> for NewsError {
    fn from(err: FormError) -> Self {
        match err {
            FormError::Invalid(errors) => Self::InvalidForm(errors),
            FormError::Repo(err) => Self::Repo(err),
        }
    }
}

/// Which listing is being served; each has its own page size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListingKind {
    Posts,
    Search,
}

/// One page of filtered posts plus everything needed to render around it.
#[derive(Debug, Clone)]
pub struct PostListing {
    pub posts: Vec<PostRecord>,
    pub window: PageWindow,
    pub filter: BoundFilter,
    pub categories: Vec<CategoryRecord>,
    pub time_now: OffsetDateTime,
}

#[derive(Clone)]
pub struct NewsService {
    reader: Arc<dyn PostsRepo>,
    writer: Arc<dyn PostsWriteRepo>,
    categories: Arc<dyn CategoriesRepo>,
    forms: PostFormValidator,
    list_page_size: NonZeroU32,
    search_page_size: NonZeroU32,
}

impl NewsService {
    pub fn new(
        reader: Arc<dyn PostsRepo>,
        writer: Arc<dyn PostsWriteRepo>,
        categories: Arc<dyn CategoriesRepo>,
        list_page_size: NonZeroU32,
        search_page_size: NonZeroU32,
    ) -> Self {
        Self {
            forms: PostFormValidator::new(categories.clone()),
            reader,
            writer,
            categories,
            list_page_size,
            search_page_size,
        }
    }

    fn page_size(&self, kind: ListingKind) -> NonZeroU32 {
        match kind {
            ListingKind::Posts => self.list_page_size,
            ListingKind::Search => self.search_page_size,
        }
    }

    pub async fn listing(
        &self,
        kind: ListingKind,
        params: PostFilterParams,
        page: PageSelector,
    ) -> Result<PostListing, NewsError> {
        let filter = BoundFilter::bind(params);
        let per_page = self.page_size(kind);

        let (posts, window) = match filter.query_filter() {
            Some(query) => {
                let total = self.reader.count_posts(query).await?;
                let window = Paginator::new(per_page, total).page(page)?;
                let posts = self.reader.list_posts(query, window.request()).await?;
                (posts, window)
            }
            None => {
                debug!(
                    target = "goodnews::news",
                    errors = ?filter.errors(),
                    "filter rejected; listing nothing"
                );
                (Vec::new(), Paginator::new(per_page, 0).page(page)?)
            }
        };

        let categories = self.categories.list_categories().await?;

        Ok(PostListing {
            posts,
            window,
            filter,
            categories,
            time_now: OffsetDateTime::now_utc(),
        })
    }

    /// Fails when `page` does not exist in the listing as it stands now.
    pub async fn check_page(
        &self,
        kind: ListingKind,
        params: &PostFilterParams,
        page: PageSelector,
    ) -> Result<(), NewsError> {
        let filter = BoundFilter::bind(params.clone());
        let total = match filter.query_filter() {
            Some(query) => self.reader.count_posts(query).await?,
            None => 0,
        };
        Paginator::new(self.page_size(kind), total).page(page)?;
        Ok(())
    }

    pub async fn post(&self, id: i64) -> Result<PostRecord, NewsError> {
        self.reader
            .find_post(id)
            .await?
            .ok_or(NewsError::PostNotFound(id))
    }

    pub async fn categories(&self) -> Result<Vec<CategoryRecord>, NewsError> {
        Ok(self.categories.list_categories().await?)
    }

    pub async fn create_post(&self, input: &PostFormInput) -> Result<PostRecord, NewsError> {
        let valid = self.forms.validate(input).await?;
        let post = self
            .writer
            .create_post(CreatePostParams {
                title: valid.title.into_inner(),
                body: valid.body.into_inner(),
                category_id: valid.category_id,
            })
            .await?;

        metrics::counter!("goodnews_posts_created_total").increment(1);
        info!(
            target = "goodnews::news",
            post_id = post.id,
            category_id = post.category_id,
            "post created"
        );
        Ok(post)
    }

    /// Loads the post by primary key before validating, so unknown ids are
    /// reported as missing regardless of the submitted fields.
    pub async fn update_post(
        &self,
        id: i64,
        input: &PostFormInput,
    ) -> Result<PostRecord, NewsError> {
        let existing = self.post(id).await?;
        let valid = self.forms.validate(input).await?;

        let post = self
            .writer
            .update_post(UpdatePostParams {
                id: existing.id,
                title: valid.title.into_inner(),
                body: valid.body.into_inner(),
                category_id: valid.category_id,
            })
            .await
            .map_err(|err| match err {
                RepoError::NotFound => NewsError::PostNotFound(id),
                other => NewsError::Repo(other),
            })?;

        metrics::counter!("goodnews_posts_updated_total").increment(1);
        info!(target = "goodnews::news", post_id = post.id, "post updated");
        Ok(post)
    }

    pub async fn delete_post(&self, id: i64) -> Result<(), NewsError> {
        self.writer.delete_post(id).await.map_err(|err| match err {
            RepoError::NotFound => NewsError::PostNotFound(id),
            other => NewsError::Repo(other),
        })?;

        metrics::counter!("goodnews_posts_deleted_total").increment(1);
        info!(target = "goodnews::news", post_id = id, "post deleted");
        Ok(())
    }

    pub async fn create_category(&self, name: &str) -> Result<CategoryRecord, NewsError> {
        let name = CategoryName::parse(name)?;
        let category = self.categories.create_category(name.as_str()).await?;
        info!(
            target = "goodnews::news",
            category_id = category.id,
            name = %category.name,
            "category created"
        );
        Ok(category)
    }
}
