//! Binds request query parameters to a typed post predicate.
//!
//! Only the fields declared on [`PostFilterParams`] are understood. Blank
//! values leave the corresponding predicate unset; malformed values make the
//! whole filter invalid, in which case the listing must match nothing while
//! still echoing back what the client sent.

use serde::Deserialize;
use time::{Date, macros::format_description};

use crate::application::repos::PostQueryFilter;

/// Raw filter values as submitted in the query string.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PostFilterParams {
    pub title: Option<String>,
    pub category: Option<String>,
    pub after: Option<String>,
}

impl PostFilterParams {
    fn normalized(self) -> Self {
        Self {
            title: non_blank(self.title),
            category: non_blank(self.category),
            after: non_blank(self.after),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterFieldError {
    pub field: &'static str,
    pub message: String,
}

/// Filter parameters bound to their typed predicate, or to the reasons they
/// could not be.
#[derive(Debug, Clone)]
pub struct BoundFilter {
    params: PostFilterParams,
    outcome: Result<PostQueryFilter, Vec<FilterFieldError>>,
}

impl BoundFilter {
    pub fn bind(params: PostFilterParams) -> Self {
        let params = params.normalized();
        let mut errors = Vec::new();
        let mut filter = PostQueryFilter {
            title_contains: params.title.clone(),
            ..PostQueryFilter::default()
        };

        if let Some(raw) = params.category.as_deref() {
            match raw.parse::<i64>() {
                Ok(id) if id > 0 => filter.category_id = Some(id),
                _ => errors.push(FilterFieldError {
                    field: "category",
                    message: "Select a valid choice.".to_string(),
                }),
            }
        }

        if let Some(raw) = params.after.as_deref() {
            match Date::parse(raw, format_description!("[year]-[month]-[day]")) {
                Ok(date) => filter.created_since = Some(date.midnight().assume_utc()),
                Err(_) => errors.push(FilterFieldError {
                    field: "after",
                    message: "Enter a valid date (YYYY-MM-DD).".to_string(),
                }),
            }
        }

        let outcome = if errors.is_empty() {
            Ok(filter)
        } else {
            Err(errors)
        };

        Self { params, outcome }
    }

    pub fn params(&self) -> &PostFilterParams {
        &self.params
    }

    /// The predicate to query with, or `None` when the parameters are invalid.
    pub fn query_filter(&self) -> Option<&PostQueryFilter> {
        self.outcome.as_ref().ok()
    }

    pub fn errors(&self) -> &[FilterFieldError] {
        match &self.outcome {
            Ok(_) => &[],
            Err(errors) => errors,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.outcome.is_ok()
    }

    pub fn is_active(&self) -> bool {
        self.params != PostFilterParams::default()
    }

    /// URL-encoded parameters (without `page`) for building pagination links.
    pub fn query_string(&self) -> String {
        let mut serializer = url::form_urlencoded::Serializer::new(String::new());
        let pairs = [
            ("title", self.params.title.as_deref()),
            ("category", self.params.category.as_deref()),
            ("after", self.params.after.as_deref()),
        ];
        for (key, value) in pairs {
            if let Some(value) = value {
                serializer.append_pair(key, value);
            }
        }
        serializer.finish()
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.and_then(|value| {
        let trimmed = value.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    })
}

#[cfg(test)]
mod tests {
    use time::macros::datetime;

    use super::*;

    fn params(
        title: Option<&str>,
        category: Option<&str>,
        after: Option<&str>,
    ) -> PostFilterParams {
        PostFilterParams {
            title: title.map(str::to_string),
            category: category.map(str::to_string),
            after: after.map(str::to_string),
        }
    }

    #[test]
    fn empty_params_match_everything() {
        let bound = BoundFilter::bind(PostFilterParams::default());
        assert_eq!(bound.query_filter(), Some(&PostQueryFilter::default()));
        assert!(!bound.is_active());
        assert_eq!(bound.query_string(), "");
    }

    #[test]
    fn blank_values_are_ignored() {
        let bound = BoundFilter::bind(params(Some("  "), Some(""), Some(" ")));
        assert_eq!(bound.query_filter(), Some(&PostQueryFilter::default()));
        assert_eq!(bound.params(), &PostFilterParams::default());
    }

    #[test]
    fn all_fields_bind_to_typed_predicates() {
        let bound = BoundFilter::bind(params(Some(" election "), Some("2"), Some("2024-03-01")));
        let filter = bound.query_filter().expect("valid filter");
        assert_eq!(filter.title_contains.as_deref(), Some("election"));
        assert_eq!(filter.category_id, Some(2));
        assert_eq!(filter.created_since, Some(datetime!(2024-03-01 0:00 UTC)));
        assert!(bound.is_active());
    }

    #[test]
    fn malformed_values_invalidate_the_filter() {
        let bound = BoundFilter::bind(params(Some("budget"), Some("sports"), Some("yesterday")));
        assert!(bound.query_filter().is_none());
        let fields: Vec<_> = bound.errors().iter().map(|err| err.field).collect();
        assert_eq!(fields, vec!["category", "after"]);
        assert_eq!(bound.params().title.as_deref(), Some("budget"));
        assert_eq!(bound.params().category.as_deref(), Some("sports"));
    }

    #[test]
    fn non_positive_category_is_rejected() {
        let bound = BoundFilter::bind(params(None, Some("0"), None));
        assert!(!bound.is_valid());
    }

    #[test]
    fn query_string_encodes_submitted_values() {
        let bound = BoundFilter::bind(params(Some("war & peace"), Some("3"), None));
        assert_eq!(bound.query_string(), "title=war+%26+peace&category=3");
    }
}
