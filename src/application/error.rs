use std::error::Error as StdError;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::{
    application::{news::NewsError, repos::RepoError},
    infra::error::InfraError,
};

#[derive(Debug, Clone)]
pub struct ErrorReport {
    pub source: &'static str,
    pub status: StatusCode,
    pub messages: Vec<String>,
}

impl ErrorReport {
    pub fn from_error(source: &'static str, status: StatusCode, error: &dyn StdError) -> Self {
        let mut messages = vec![error.to_string()];
        let mut current = error.source();
        while let Some(inner) = current {
            messages.push(inner.to_string());
            current = inner.source();
        }
        Self {
            source,
            status,
            messages,
        }
    }

    pub fn from_message(
        source: &'static str,
        status: StatusCode,
        message: impl Into<String>,
    ) -> Self {
        Self {
            source,
            status,
            messages: vec![message.into()],
        }
    }

    pub fn attach(self, response: &mut Response) {
        response.extensions_mut().insert(self);
    }
}

#[derive(Debug)]
pub struct HttpError {
    status: StatusCode,
    public_message: &'static str,
    report: ErrorReport,
}

impl HttpError {
    pub fn new(
        source: &'static str,
        status: StatusCode,
        public_message: &'static str,
        detail: impl Into<String>,
    ) -> Self {
        let report = ErrorReport::from_message(source, status, detail);
        Self {
            status,
            public_message,
            report,
        }
    }

    pub fn from_error(
        source: &'static str,
        status: StatusCode,
        public_message: &'static str,
        error: &dyn StdError,
    ) -> Self {
        let report = ErrorReport::from_error(source, status, error);
        Self {
            status,
            public_message,
            report,
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        let mut response = (self.status, self.public_message).into_response();
        self.report.attach(&mut response);
        response
    }
}

/// Maps repository failures onto HTTP statuses.
pub fn repo_error_to_http(source: &'static str, err: RepoError) -> HttpError {
    match err {
        RepoError::NotFound => HttpError::from_error(
            source,
            StatusCode::NOT_FOUND,
            "Resource not found",
            &err,
        ),
        RepoError::Duplicate { .. } => {
            HttpError::from_error(source, StatusCode::CONFLICT, "Duplicate record", &err)
        }
        RepoError::InvalidInput { .. } | RepoError::Integrity { .. } => HttpError::from_error(
            source,
            StatusCode::BAD_REQUEST,
            "Request could not be processed",
            &err,
        ),
        RepoError::Timeout => HttpError::from_error(
            source,
            StatusCode::SERVICE_UNAVAILABLE,
            "Service temporarily unavailable",
            &err,
        ),
        RepoError::Persistence(_) => HttpError::from_error(
            source,
            StatusCode::INTERNAL_SERVER_ERROR,
            "Internal server error",
            &err,
        ),
    }
}

impl From<NewsError> for HttpError {
    fn from(error: NewsError) -> Self {
        const SOURCE: &str = "application::error::news_error_to_http_error";
        match error {
            NewsError::PostNotFound(id) => HttpError::new(
                SOURCE,
                StatusCode::NOT_FOUND,
                "Post not found",
                format!("Post {id} does not exist"),
            ),
            err @ NewsError::InvalidForm(_) => HttpError::from_error(
                SOURCE,
                StatusCode::BAD_REQUEST,
                "Request could not be processed",
                &err,
            ),
            NewsError::Pagination(err) => HttpError::from_error(
                SOURCE,
                StatusCode::NOT_FOUND,
                "Invalid page",
                &err,
            ),
            err @ NewsError::Domain(_) => HttpError::from_error(
                SOURCE,
                StatusCode::BAD_REQUEST,
                "Request could not be processed",
                &err,
            ),
            NewsError::Repo(err) => repo_error_to_http(SOURCE, err),
        }
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Infra(#[from] InfraError),
    #[error(transparent)]
    News(#[from] NewsError),
    #[error("unexpected error: {0}")]
    Unexpected(String),
}

impl AppError {
    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::Unexpected(message.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::pagination::PaginationError;

    #[test]
    fn missing_post_maps_to_not_found() {
        let err = HttpError::from(NewsError::PostNotFound(9));
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn invalid_page_maps_to_not_found() {
        let err = HttpError::from(NewsError::Pagination(PaginationError::LessThanOne));
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn persistence_failure_is_internal() {
        let err = HttpError::from(NewsError::Repo(RepoError::from_persistence("boom")));
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn report_collects_the_source_chain() {
        let err = NewsError::Repo(RepoError::Timeout);
        let report = ErrorReport::from_error("test", StatusCode::SERVICE_UNAVAILABLE, &err);
        assert_eq!(report.messages, vec!["database timeout".to_string()]);
    }
}
