//! Validation of create/update submissions.

use std::sync::Arc;

use serde::Deserialize;
use thiserror::Error;

use crate::application::repos::{CategoriesRepo, RepoError};
use crate::domain::entities::PostRecord;
use crate::domain::error::DomainError;
use crate::domain::posts::{PostBody, PostTitle};

/// Raw form fields as posted by the browser.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PostFormInput {
    pub title: String,
    pub body: String,
    pub category: String,
}

impl PostFormInput {
    pub fn from_record(record: &PostRecord) -> Self {
        Self {
            title: record.title.clone(),
            body: record.body.clone(),
            category: record.category_id.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormErrors {
    entries: Vec<FieldError>,
}

impl FormErrors {
    pub fn push(&mut self, field: &'static str, message: impl Into<String>) {
        self.entries.push(FieldError {
            field,
            message: message.into(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[FieldError] {
        &self.entries
    }

    pub fn for_field(&self, field: &str) -> Vec<String> {
        self.entries
            .iter()
            .filter(|entry| entry.field == field)
            .map(|entry| entry.message.clone())
            .collect()
    }

    fn push_domain(&mut self, error: DomainError) {
        let DomainError::Validation { field, message } = error;
        self.push(field, message);
    }
}

/// A submission that passed every field check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidPost {
    pub title: PostTitle,
    pub body: PostBody,
    pub category_id: i64,
}

#[derive(Debug, Error)]
pub enum FormError {
    #[error("submission has {} invalid field(s)", .0.entries().len())]
    Invalid(FormErrors),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

#[derive(Clone)]
pub struct PostFormValidator {
    categories: Arc<dyn CategoriesRepo>,
}

impl PostFormValidator {
    pub fn new(categories: Arc<dyn CategoriesRepo>) -> Self {
        Self { categories }
    }

    pub async fn validate(&self, input: &PostFormInput) -> Result<ValidPost, FormError> {
        let mut errors = FormErrors::default();

        let title = PostTitle::parse(&input.title)
            .map_err(|err| errors.push_domain(err))
            .ok();
        let body = PostBody::parse(&input.body)
            .map_err(|err| errors.push_domain(err))
            .ok();
        let category_id = self.resolve_category(&input.category, &mut errors).await?;

        match (title, body, category_id) {
            (Some(title), Some(body), Some(category_id)) if errors.is_empty() => Ok(ValidPost {
                title,
                body,
                category_id,
            }),
            _ => Err(FormError::Invalid(errors)),
        }
    }

    async fn resolve_category(
        &self,
        raw: &str,
        errors: &mut FormErrors,
    ) -> Result<Option<i64>, RepoError> {
        let raw = raw.trim();
        if raw.is_empty() {
            errors.push("category", "This field is required.");
            return Ok(None);
        }

        let Ok(id) = raw.parse::<i64>() else {
            errors.push("category", invalid_choice());
            return Ok(None);
        };

        match self.categories.find_category(id).await? {
            Some(category) => Ok(Some(category.id)),
            None => {
                errors.push("category", invalid_choice());
                Ok(None)
            }
        }
    }
}

fn invalid_choice() -> &'static str {
    "Select a valid choice. That choice is not one of the available choices."
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use super::*;
    use crate::domain::entities::CategoryRecord;

    struct FixedCategories(Vec<CategoryRecord>);

    #[async_trait]
    impl CategoriesRepo for FixedCategories {
        async fn list_categories(&self) -> Result<Vec<CategoryRecord>, RepoError> {
            Ok(self.0.clone())
        }

        async fn find_category(&self, id: i64) -> Result<Option<CategoryRecord>, RepoError> {
            Ok(self.0.iter().find(|c| c.id == id).cloned())
        }

        async fn create_category(&self, _name: &str) -> Result<CategoryRecord, RepoError> {
            Err(RepoError::from_persistence("read-only fixture"))
        }
    }

    fn validator() -> PostFormValidator {
        PostFormValidator::new(Arc::new(FixedCategories(vec![CategoryRecord {
            id: 1,
            name: "World".into(),
        }])))
    }

    fn input(title: &str, body: &str, category: &str) -> PostFormInput {
        PostFormInput {
            title: title.into(),
            body: body.into(),
            category: category.into(),
        }
    }

    fn invalid(result: Result<ValidPost, FormError>) -> FormErrors {
        match result {
            Err(FormError::Invalid(errors)) => errors,
            other => panic!("expected invalid form, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn valid_submission_is_accepted() {
        let valid = validator()
            .validate(&input(" Headline ", "Story", "1"))
            .await
            .expect("valid form");
        assert_eq!(valid.title.as_str(), "Headline");
        assert_eq!(valid.body.as_str(), "Story");
        assert_eq!(valid.category_id, 1);
    }

    #[tokio::test]
    async fn every_missing_field_is_reported() {
        let errors = invalid(validator().validate(&PostFormInput::default()).await);
        assert_eq!(errors.for_field("title"), vec!["This field is required."]);
        assert_eq!(errors.for_field("body"), vec!["This field is required."]);
        assert_eq!(errors.for_field("category"), vec!["This field is required."]);
    }

    #[tokio::test]
    async fn unknown_category_is_an_invalid_choice() {
        let errors = invalid(validator().validate(&input("Headline", "Story", "7")).await);
        assert_eq!(errors.entries().len(), 1);
        assert!(errors.for_field("category")[0].starts_with("Select a valid choice"));
    }

    #[tokio::test]
    async fn non_numeric_category_is_an_invalid_choice() {
        let errors = invalid(validator().validate(&input("Headline", "Story", "world")).await);
        assert_eq!(errors.for_field("category").len(), 1);
        assert!(errors.for_field("title").is_empty());
    }
}
