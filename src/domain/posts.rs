//! Value types guarding the textual invariants of posts and categories.

use super::error::DomainError;

pub const TITLE_MAX_CHARS: usize = 128;
pub const BODY_MAX_CHARS: usize = 20_000;
pub const CATEGORY_NAME_MAX_CHARS: usize = 64;

/// Trimmed, non-empty post title.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostTitle(String);

impl PostTitle {
    pub fn parse(raw: &str) -> Result<Self, DomainError> {
        bounded_text(raw, "title", TITLE_MAX_CHARS).map(Self)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

/// Post body; surrounding whitespace is dropped, inner formatting kept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostBody(String);

impl PostBody {
    pub fn parse(raw: &str) -> Result<Self, DomainError> {
        bounded_text(raw, "body", BODY_MAX_CHARS).map(Self)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryName(String);

impl CategoryName {
    pub fn parse(raw: &str) -> Result<Self, DomainError> {
        bounded_text(raw, "name", CATEGORY_NAME_MAX_CHARS).map(Self)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

fn bounded_text(raw: &str, field: &'static str, max_chars: usize) -> Result<String, DomainError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(DomainError::validation(field, "This field is required."));
    }

    let length = trimmed.chars().count();
    if length > max_chars {
        return Err(DomainError::validation(
            field,
            format!("Ensure this value has at most {max_chars} characters (it has {length})."),
        ));
    }

    Ok(trimmed.to_string())
}
