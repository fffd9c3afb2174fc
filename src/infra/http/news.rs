//! Public news pages: listing, search, detail and the post forms.

use axum::{
    extract::{Form, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::CookieJar;
use serde::Deserialize;
use tracing::debug;

use crate::{
    application::{
        error::{ErrorReport, HttpError},
        filter::PostFilterParams,
        forms::{FormErrors, PostFormInput},
        news::{ListingKind, NewsError},
        pagination::PageSelector,
    },
    presentation::views::{
        DeleteConfirmTemplate, DeleteConfirmView, LayoutChrome, LayoutContext, PostDetailTemplate,
        PostDetailView, PostFormPage, PostFormTemplate, PostFormView, PostListTemplate,
        PostListView, SearchTemplate, SearchView, render_not_found_response,
        render_template_response,
    },
};

use super::HttpState;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub(super) struct ListQuery {
    title: Option<String>,
    category: Option<String>,
    after: Option<String>,
    page: Option<String>,
}

impl ListQuery {
    fn split(self) -> (PostFilterParams, Option<String>) {
        let params = PostFilterParams {
            title: self.title,
            category: self.category,
            after: self.after,
        };
        (params, self.page)
    }
}

/// Path ids that are not positive integers cannot name a post.
fn parse_post_id(raw: &str) -> Option<i64> {
    raw.parse::<i64>().ok().filter(|id| *id > 0)
}

fn news_error_to_response(err: NewsError, chrome: LayoutChrome) -> Response {
    match err {
        NewsError::PostNotFound(id) => {
            let mut response = render_not_found_response(chrome);
            ErrorReport::from_message(
                "infra::http::news_error_to_response",
                StatusCode::NOT_FOUND,
                format!("Post {id} does not exist"),
            )
            .attach(&mut response);
            response
        }
        NewsError::Pagination(err) => {
            let mut response = render_not_found_response(chrome);
            ErrorReport::from_error(
                "infra::http::news_error_to_response",
                StatusCode::NOT_FOUND,
                &err,
            )
            .attach(&mut response);
            response
        }
        err => HttpError::from(err).into_response(),
    }
}

fn not_found_post(raw_id: &str, chrome: LayoutChrome) -> Response {
    let mut response = render_not_found_response(chrome);
    ErrorReport::from_message(
        "infra::http::news::parse_post_id",
        StatusCode::NOT_FOUND,
        format!("`{raw_id}` is not a post id"),
    )
    .attach(&mut response);
    response
}

async fn render_listing(
    state: &HttpState,
    chrome: LayoutChrome,
    kind: ListingKind,
    query: ListQuery,
    input: &PostFormInput,
    errors: &FormErrors,
) -> Response {
    let (params, page) = query.split();
    let page = match PageSelector::parse(page.as_deref()) {
        Ok(page) => page,
        Err(err) => return news_error_to_response(NewsError::Pagination(err), chrome),
    };

    let listing = match state.news.listing(kind, params, page).await {
        Ok(listing) => listing,
        Err(err) => return news_error_to_response(err, chrome),
    };

    match kind {
        ListingKind::Posts => {
            let view = PostListView::new(&listing, input, errors);
            render_template_response(
                PostListTemplate {
                    view: LayoutContext::new(chrome, view),
                },
                StatusCode::OK,
            )
        }
        ListingKind::Search => {
            let view = SearchView::new(&listing);
            render_template_response(
                SearchTemplate {
                    view: LayoutContext::new(chrome, view),
                },
                StatusCode::OK,
            )
        }
    }
}

pub(super) async fn post_list(
    State(state): State<HttpState>,
    jar: CookieJar,
    Query(query): Query<ListQuery>,
) -> Response {
    let chrome = state.chrome(&jar).await;
    render_listing(
        &state,
        chrome,
        ListingKind::Posts,
        query,
        &PostFormInput::default(),
        &FormErrors::default(),
    )
    .await
}

/// Accepts the quick-post form embedded in the list page, then renders the
/// list as a plain GET would. Rejected submissions are echoed back with
/// their field errors. Nothing is saved when the requested page is missing.
pub(super) async fn post_list_submit(
    State(state): State<HttpState>,
    jar: CookieJar,
    Query(query): Query<ListQuery>,
    Form(input): Form<PostFormInput>,
) -> Response {
    let chrome = state.chrome(&jar).await;

    let (params, page) = query.clone().split();
    let checked = match PageSelector::parse(page.as_deref()) {
        Ok(page) => state.news.check_page(ListingKind::Posts, &params, page).await,
        Err(err) => Err(NewsError::Pagination(err)),
    };
    if let Err(err) = checked {
        return news_error_to_response(err, chrome);
    }

    let (input, errors) = match state.news.create_post(&input).await {
        Ok(_) => (PostFormInput::default(), FormErrors::default()),
        Err(NewsError::InvalidForm(errors)) => {
            debug!(
                target = "goodnews::http::news",
                errors = ?errors.entries(),
                "list form submission rejected"
            );
            (input, errors)
        }
        Err(err) => return news_error_to_response(err, chrome),
    };

    render_listing(&state, chrome, ListingKind::Posts, query, &input, &errors).await
}

pub(super) async fn search(
    State(state): State<HttpState>,
    jar: CookieJar,
    Query(query): Query<ListQuery>,
) -> Response {
    let chrome = state.chrome(&jar).await;
    render_listing(
        &state,
        chrome,
        ListingKind::Search,
        query,
        &PostFormInput::default(),
        &FormErrors::default(),
    )
    .await
}

pub(super) async fn post_detail(
    State(state): State<HttpState>,
    jar: CookieJar,
    Path(raw_id): Path<String>,
) -> Response {
    let chrome = state.chrome(&jar).await;
    let Some(id) = parse_post_id(&raw_id) else {
        return not_found_post(&raw_id, chrome);
    };

    match state.news.post(id).await {
        Ok(post) => render_template_response(
            PostDetailTemplate {
                view: LayoutContext::new(chrome, PostDetailView::new(&post)),
            },
            StatusCode::OK,
        ),
        Err(err) => news_error_to_response(err, chrome),
    }
}

async fn render_post_form(
    state: &HttpState,
    chrome: LayoutChrome,
    form: FormTarget,
    input: &PostFormInput,
    errors: &FormErrors,
) -> Response {
    let categories = match state.news.categories().await {
        Ok(categories) => categories,
        Err(err) => return news_error_to_response(err, chrome),
    };

    let (action, heading, submit_label) = match form {
        FormTarget::Create => ("/news/add/".to_string(), "Add a post", "Publish"),
        FormTarget::Edit(id) => (format!("/news/{id}/edit/"), "Edit post", "Save changes"),
    };
    let form = PostFormView::new(action, heading, submit_label, input, &categories, errors);

    render_template_response(
        PostFormTemplate {
            view: LayoutContext::new(chrome, PostFormPage { form }),
        },
        StatusCode::OK,
    )
}

#[derive(Debug, Clone, Copy)]
enum FormTarget {
    Create,
    Edit(i64),
}

pub(super) async fn add_post_form(State(state): State<HttpState>, jar: CookieJar) -> Response {
    let chrome = state.chrome(&jar).await;
    render_post_form(
        &state,
        chrome,
        FormTarget::Create,
        &PostFormInput::default(),
        &FormErrors::default(),
    )
    .await
}

pub(super) async fn create_post(
    State(state): State<HttpState>,
    jar: CookieJar,
    Form(input): Form<PostFormInput>,
) -> Response {
    match state.news.create_post(&input).await {
        Ok(post) => Redirect::to(&format!("/news/{}/", post.id)).into_response(),
        Err(NewsError::InvalidForm(errors)) => {
            let chrome = state.chrome(&jar).await;
            render_post_form(&state, chrome, FormTarget::Create, &input, &errors).await
        }
        Err(err) => news_error_to_response(err, state.chrome(&jar).await),
    }
}

pub(super) async fn edit_post_form(
    State(state): State<HttpState>,
    jar: CookieJar,
    Path(raw_id): Path<String>,
) -> Response {
    let chrome = state.chrome(&jar).await;
    let Some(id) = parse_post_id(&raw_id) else {
        return not_found_post(&raw_id, chrome);
    };

    match state.news.post(id).await {
        Ok(post) => {
            render_post_form(
                &state,
                chrome,
                FormTarget::Edit(id),
                &PostFormInput::from_record(&post),
                &FormErrors::default(),
            )
            .await
        }
        Err(err) => news_error_to_response(err, chrome),
    }
}

pub(super) async fn update_post(
    State(state): State<HttpState>,
    jar: CookieJar,
    Path(raw_id): Path<String>,
    Form(input): Form<PostFormInput>,
) -> Response {
    let chrome = state.chrome(&jar).await;
    let Some(id) = parse_post_id(&raw_id) else {
        return not_found_post(&raw_id, chrome);
    };

    match state.news.update_post(id, &input).await {
        Ok(post) => Redirect::to(&format!("/news/{}/", post.id)).into_response(),
        Err(NewsError::InvalidForm(errors)) => {
            render_post_form(&state, chrome, FormTarget::Edit(id), &input, &errors).await
        }
        Err(err) => news_error_to_response(err, chrome),
    }
}

pub(super) async fn delete_post_confirm(
    State(state): State<HttpState>,
    jar: CookieJar,
    Path(raw_id): Path<String>,
) -> Response {
    let chrome = state.chrome(&jar).await;
    let Some(id) = parse_post_id(&raw_id) else {
        return not_found_post(&raw_id, chrome);
    };

    match state.news.post(id).await {
        Ok(post) => render_template_response(
            DeleteConfirmTemplate {
                view: LayoutContext::new(chrome, DeleteConfirmView::new(&post)),
            },
            StatusCode::OK,
        ),
        Err(err) => news_error_to_response(err, chrome),
    }
}

pub(super) async fn delete_post(
    State(state): State<HttpState>,
    jar: CookieJar,
    Path(raw_id): Path<String>,
) -> Response {
    let Some(id) = parse_post_id(&raw_id) else {
        return not_found_post(&raw_id, state.chrome(&jar).await);
    };

    match state.news.delete_post(id).await {
        Ok(()) => Redirect::to("/news/").into_response(),
        Err(err) => news_error_to_response(err, state.chrome(&jar).await),
    }
}

pub(super) async fn not_found(State(state): State<HttpState>, jar: CookieJar) -> Response {
    render_not_found_response(state.chrome(&jar).await)
}
