use crate::application::{
    error::{ErrorReport, HttpError},
    filter::BoundFilter,
    forms::{FormErrors, PostFormInput},
    news::PostListing,
    pagination::PageWindow,
};
use crate::domain::entities::{CategoryRecord, PostRecord};
use askama::{Error as AskamaError, Template};
use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use thiserror::Error;
use time::{
    OffsetDateTime,
    format_description::{BorrowedFormatItem, well_known::Rfc3339},
    macros::format_description,
};

const EXCERPT_CHARS: usize = 200;
const DISPLAY_TIME: &[BorrowedFormatItem<'static>] =
    format_description!("[day] [month repr:short] [year], [hour]:[minute] UTC");
const ISO_TIME: &[BorrowedFormatItem<'static>] =
    format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]Z");

#[derive(Debug, Error)]
#[error("{public_message}")]
pub struct TemplateRenderError {
    pub(crate) source: &'static str,
    pub(crate) public_message: &'static str,
    #[source]
    pub(crate) error: AskamaError,
}

impl TemplateRenderError {
    pub fn new(source: &'static str, public_message: &'static str, error: AskamaError) -> Self {
        Self {
            source,
            public_message,
            error,
        }
    }
}

impl From<TemplateRenderError> for HttpError {
    fn from(err: TemplateRenderError) -> Self {
        let TemplateRenderError {
            source,
            public_message,
            error,
        } = err;

        HttpError::from_error(
            source,
            StatusCode::INTERNAL_SERVER_ERROR,
            public_message,
            &error,
        )
    }
}

pub fn render_template<T: Template>(template: T) -> Result<Html<String>, HttpError> {
    template.render().map(Html).map_err(|err| {
        TemplateRenderError::new(
            "presentation::views::render_template",
            "Template rendering failed",
            err,
        )
        .into()
    })
}

pub fn render_template_response<T: Template>(template: T, status: StatusCode) -> Response {
    match render_template(template) {
        Ok(html) => (status, html).into_response(),
        Err(err) => err.into_response(),
    }
}

pub fn render_not_found_response(chrome: LayoutChrome) -> Response {
    let view = LayoutContext::new(chrome, ErrorPageView::not_found());
    let mut response = render_template_response(ErrorTemplate { view }, StatusCode::NOT_FOUND);
    ErrorReport::from_message(
        "presentation::views::render_not_found_response",
        StatusCode::NOT_FOUND,
        "Resource not found",
    )
    .attach(&mut response);
    response
}

/// Per-request chrome shared by every page.
#[derive(Clone)]
pub struct LayoutChrome {
    pub site_title: String,
    pub editor: Option<String>,
}

#[derive(Clone)]
pub struct LayoutContext<T> {
    pub site_title: String,
    pub editor: Option<String>,
    pub content: T,
}

impl<T> LayoutContext<T> {
    pub fn new(chrome: LayoutChrome, content: T) -> Self {
        Self {
            site_title: chrome.site_title,
            editor: chrome.editor,
            content,
        }
    }
}

#[derive(Clone)]
pub struct PostCard {
    pub id: i64,
    pub title: String,
    pub excerpt: String,
    pub category: String,
    pub created: String,
    pub iso_date: String,
}

impl PostCard {
    pub fn from_record(record: &PostRecord) -> Self {
        Self {
            id: record.id,
            title: record.title.clone(),
            excerpt: excerpt(&record.body, EXCERPT_CHARS),
            category: record.category_name.clone(),
            created: display_time(record.created_at),
            iso_date: iso_time(record.created_at),
        }
    }
}

#[derive(Clone)]
pub struct CategoryOption {
    pub id: i64,
    pub name: String,
    pub selected: bool,
}

fn category_options(categories: &[CategoryRecord], selected: Option<&str>) -> Vec<CategoryOption> {
    let selected = selected.map(str::trim);
    categories
        .iter()
        .map(|category| CategoryOption {
            id: category.id,
            name: category.name.clone(),
            selected: selected == Some(category.id.to_string().as_str()),
        })
        .collect()
}

/// Filter form echoing what the client submitted.
pub struct FilterView {
    pub action: &'static str,
    pub title: String,
    pub after: String,
    pub categories: Vec<CategoryOption>,
    pub errors: Vec<String>,
    pub is_active: bool,
    pub total_count: u64,
}

impl FilterView {
    fn new(
        action: &'static str,
        filter: &BoundFilter,
        categories: &[CategoryRecord],
        total: u64,
    ) -> Self {
        let params = filter.params();
        Self {
            action,
            title: params.title.clone().unwrap_or_default(),
            after: params.after.clone().unwrap_or_default(),
            categories: category_options(categories, params.category.as_deref()),
            errors: filter
                .errors()
                .iter()
                .map(|err| format!("{}: {}", err.field, err.message))
                .collect(),
            is_active: filter.is_active(),
            total_count: total,
        }
    }
}

pub struct PageNavView {
    pub number: u64,
    pub num_pages: u64,
    pub is_paginated: bool,
    pub first_href: Option<String>,
    pub previous_href: Option<String>,
    pub next_href: Option<String>,
    pub last_href: Option<String>,
}

impl PageNavView {
    fn new(path: &str, window: &PageWindow, filter: &BoundFilter) -> Self {
        let query = filter.query_string();
        let href = |page: &str| {
            if query.is_empty() {
                format!("{path}?page={page}")
            } else {
                format!("{path}?{query}&page={page}")
            }
        };

        Self {
            number: window.number,
            num_pages: window.num_pages,
            is_paginated: window.is_paginated(),
            first_href: window.has_previous().then(|| href("1")),
            previous_href: window.previous_number().map(|n| href(&n.to_string())),
            next_href: window.next_number().map(|n| href(&n.to_string())),
            last_href: window.has_next().then(|| href("last")),
        }
    }
}

pub struct PostFormView {
    pub action: String,
    pub heading: &'static str,
    pub submit_label: &'static str,
    pub title: String,
    pub body: String,
    pub categories: Vec<CategoryOption>,
    pub title_errors: Vec<String>,
    pub body_errors: Vec<String>,
    pub category_errors: Vec<String>,
}

impl PostFormView {
    pub fn new(
        action: impl Into<String>,
        heading: &'static str,
        submit_label: &'static str,
        input: &PostFormInput,
        categories: &[CategoryRecord],
        errors: &FormErrors,
    ) -> Self {
        Self {
            action: action.into(),
            heading,
            submit_label,
            title: input.title.clone(),
            body: input.body.clone(),
            categories: category_options(categories, Some(input.category.as_str())),
            title_errors: errors.for_field("title"),
            body_errors: errors.for_field("body"),
            category_errors: errors.for_field("category"),
        }
    }
}

pub struct PostListView {
    pub post_list: Vec<PostCard>,
    /// RFC 3339, UTC.
    pub time_now: String,
    pub time_now_display: String,
    pub filter: FilterView,
    pub page: PageNavView,
    pub form: PostFormView,
}

impl PostListView {
    pub fn new(listing: &PostListing, input: &PostFormInput, errors: &FormErrors) -> Self {
        Self {
            post_list: listing.posts.iter().map(PostCard::from_record).collect(),
            time_now: rfc3339(listing.time_now),
            time_now_display: display_time(listing.time_now),
            filter: FilterView::new(
                "/news/",
                &listing.filter,
                &listing.categories,
                listing.window.total,
            ),
            page: PageNavView::new("/news/", &listing.window, &listing.filter),
            form: PostFormView::new(
                "/news/",
                "Quick post",
                "Publish",
                input,
                &listing.categories,
                errors,
            ),
        }
    }
}

#[derive(Template)]
#[template(path = "news/post_list.html")]
pub struct PostListTemplate {
    pub view: LayoutContext<PostListView>,
}

pub struct SearchView {
    pub search_list: Vec<PostCard>,
    pub time_now: String,
    pub time_now_display: String,
    pub filter: FilterView,
    pub page: PageNavView,
}

impl SearchView {
    pub fn new(listing: &PostListing) -> Self {
        Self {
            search_list: listing.posts.iter().map(PostCard::from_record).collect(),
            time_now: rfc3339(listing.time_now),
            time_now_display: display_time(listing.time_now),
            filter: FilterView::new(
                "/search/",
                &listing.filter,
                &listing.categories,
                listing.window.total,
            ),
            page: PageNavView::new("/search/", &listing.window, &listing.filter),
        }
    }
}

#[derive(Template)]
#[template(path = "news/search.html")]
pub struct SearchTemplate {
    pub view: LayoutContext<SearchView>,
}

pub struct PostDetailView {
    pub post_detail: PostDetail,
}

pub struct PostDetail {
    pub id: i64,
    pub title: String,
    pub paragraphs: Vec<String>,
    pub category: String,
    pub created: String,
    pub iso_date: String,
    pub updated: Option<String>,
}

impl PostDetailView {
    pub fn new(record: &PostRecord) -> Self {
        let updated =
            (record.updated_at != record.created_at).then(|| display_time(record.updated_at));
        Self {
            post_detail: PostDetail {
                id: record.id,
                title: record.title.clone(),
                paragraphs: paragraphs(&record.body),
                category: record.category_name.clone(),
                created: display_time(record.created_at),
                iso_date: iso_time(record.created_at),
                updated,
            },
        }
    }
}

#[derive(Template)]
#[template(path = "news/post_detail.html")]
pub struct PostDetailTemplate {
    pub view: LayoutContext<PostDetailView>,
}

/// Standalone create/edit page.
pub struct PostFormPage {
    pub form: PostFormView,
}

#[derive(Template)]
#[template(path = "news/add.html")]
pub struct PostFormTemplate {
    pub view: LayoutContext<PostFormPage>,
}

pub struct DeleteConfirmView {
    pub post: PostCard,
    pub action: String,
}

impl DeleteConfirmView {
    pub fn new(record: &PostRecord) -> Self {
        Self {
            post: PostCard::from_record(record),
            action: format!("/news/{}/delete/", record.id),
        }
    }
}

#[derive(Template)]
#[template(path = "news/delete.html")]
pub struct DeleteConfirmTemplate {
    pub view: LayoutContext<DeleteConfirmView>,
}

pub struct LoginView {
    pub username: String,
    pub next: String,
    pub error: Option<String>,
}

#[derive(Template)]
#[template(path = "accounts/login.html")]
pub struct LoginTemplate {
    pub view: LayoutContext<LoginView>,
}

pub struct ErrorPageView {
    pub title: String,
    pub message: String,
}

impl ErrorPageView {
    pub fn not_found() -> Self {
        Self {
            title: "Page Not Found".to_string(),
            message: "The page you requested does not exist. It may have been deleted."
                .to_string(),
        }
    }
}

#[derive(Template)]
#[template(path = "error.html")]
pub struct ErrorTemplate {
    pub view: LayoutContext<ErrorPageView>,
}

fn display_time(value: OffsetDateTime) -> String {
    value
        .format(DISPLAY_TIME)
        .unwrap_or_else(|_| value.to_string())
}

fn rfc3339(value: OffsetDateTime) -> String {
    value
        .to_offset(time::UtcOffset::UTC)
        .format(&Rfc3339)
        .unwrap_or_else(|_| value.to_string())
}

fn iso_time(value: OffsetDateTime) -> String {
    value.format(ISO_TIME).unwrap_or_else(|_| value.to_string())
}

fn excerpt(body: &str, max_chars: usize) -> String {
    let trimmed = body.trim();
    match trimmed.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}…", trimmed[..cut].trim_end()),
        None => trimmed.to_string(),
    }
}

fn paragraphs(body: &str) -> Vec<String> {
    body.replace("\r\n", "\n")
        .split("\n\n")
        .map(str::trim)
        .filter(|paragraph| !paragraph.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use time::macros::datetime;

    use super::*;

    #[test]
    fn excerpt_truncates_on_char_boundaries() {
        assert_eq!(excerpt("short", 10), "short");
        assert_eq!(excerpt("ééééé", 3), "ééé…");
    }

    #[test]
    fn body_is_split_into_paragraphs() {
        assert_eq!(
            paragraphs("first\r\n\r\nsecond\n\n\n third "),
            vec!["first".to_string(), "second".to_string(), "third".to_string()]
        );
    }

    #[test]
    fn times_render_in_utc() {
        let at = datetime!(2024-03-01 09:05 UTC);
        assert_eq!(display_time(at), "01 Mar 2024, 09:05 UTC");
        assert_eq!(iso_time(at), "2024-03-01T09:05:00Z");
        assert_eq!(
            rfc3339(datetime!(2024-03-01 11:05 +2)),
            "2024-03-01T09:05:00Z"
        );
    }

    #[test]
    fn selected_category_is_marked() {
        let categories = vec![
            CategoryRecord {
                id: 1,
                name: "Science".into(),
            },
            CategoryRecord {
                id: 2,
                name: "World".into(),
            },
        ];
        let options = category_options(&categories, Some("2"));
        assert!(!options[0].selected);
        assert!(options[1].selected);
    }
}
