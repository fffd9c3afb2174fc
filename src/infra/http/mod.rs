mod auth;
mod middleware;
mod news;

pub use auth::SessionCookie;

use std::sync::Arc;

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    middleware as axum_middleware,
    response::{IntoResponse, Redirect, Response},
    routing::get,
};

use crate::application::{
    auth::AuthService,
    error::ErrorReport,
    news::NewsService,
    repos::{HealthRepo, RepoError},
};

use self::middleware::{log_responses, set_request_context};

#[derive(Clone)]
pub struct HttpState {
    pub news: Arc<NewsService>,
    pub auth: Arc<AuthService>,
    pub health: Arc<dyn HealthRepo>,
    pub cookie: SessionCookie,
    pub site_title: Arc<str>,
}

pub fn build_router(state: HttpState) -> Router {
    let editor_routes = Router::new()
        .route(
            "/news/{id}/edit/",
            get(news::edit_post_form).post(news::update_post),
        )
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            auth::require_editor,
        ));

    Router::new()
        .route("/", get(index))
        .route("/news/", get(news::post_list).post(news::post_list_submit))
        .route("/news/add/", get(news::add_post_form).post(news::create_post))
        .route("/news/{id}/", get(news::post_detail))
        .route(
            "/news/{id}/delete/",
            get(news::delete_post_confirm).post(news::delete_post),
        )
        .route("/search/", get(news::search))
        .route("/accounts/login/", get(auth::login_form).post(auth::login))
        .route("/accounts/logout/", get(auth::logout).post(auth::logout))
        .route("/_health/db", get(db_health))
        .merge(editor_routes)
        .fallback(news::not_found)
        .with_state(state)
        .layer(axum_middleware::from_fn(log_responses))
        .layer(axum_middleware::from_fn(set_request_context))
}

async fn index() -> Redirect {
    Redirect::permanent("/news/")
}

async fn db_health(State(state): State<HttpState>) -> Response {
    db_health_response(state.health.health_check().await)
}

fn db_health_response(result: Result<(), RepoError>) -> Response {
    match result {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => {
            let mut response = StatusCode::SERVICE_UNAVAILABLE.into_response();
            ErrorReport::from_error(
                "infra::http::db_health",
                StatusCode::SERVICE_UNAVAILABLE,
                &err,
            )
            .attach(&mut response);
            response
        }
    }
}
