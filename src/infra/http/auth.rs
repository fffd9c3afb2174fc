//! Editor sign-in pages and the session guard for editor-only routes.

use axum::{
    body::Body,
    extract::{Form, Query, State},
    http::{Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::Deserialize;

use crate::application::auth::{AuthError, Principal};
use crate::presentation::views::{
    LayoutChrome, LayoutContext, LoginTemplate, LoginView, render_template_response,
};

use super::HttpState;

const LOGIN_PATH: &str = "/accounts/login/";
const DEFAULT_REDIRECT: &str = "/news/";

/// Name and attributes of the session cookie.
#[derive(Debug, Clone)]
pub struct SessionCookie {
    pub name: String,
    pub secure: bool,
}

impl HttpState {
    /// The editor signed in on this request, if any.
    pub(super) async fn current_editor(&self, jar: &CookieJar) -> Option<Principal> {
        let token = jar.get(&self.cookie.name)?;
        self.auth.current(token.value()).await
    }

    pub(super) async fn chrome(&self, jar: &CookieJar) -> LayoutChrome {
        LayoutChrome {
            site_title: self.site_title.to_string(),
            editor: self
                .current_editor(jar)
                .await
                .map(|principal| principal.username),
        }
    }
}

/// Redirects anonymous visitors to the login page, remembering where they were going.
pub(super) async fn require_editor(
    State(state): State<HttpState>,
    jar: CookieJar,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let Some(principal) = state.current_editor(&jar).await else {
        let next_target = request
            .uri()
            .path_and_query()
            .map(|value| value.as_str().to_string())
            .unwrap_or_else(|| DEFAULT_REDIRECT.to_string());
        return Redirect::to(&login_redirect(&next_target)).into_response();
    };

    request.extensions_mut().insert(principal.clone());
    let mut response = next.run(request).await;
    response.extensions_mut().insert(principal);
    response
}

fn login_redirect(next: &str) -> String {
    let query = url::form_urlencoded::Serializer::new(String::new())
        .append_pair("next", next)
        .finish();
    format!("{LOGIN_PATH}?{query}")
}

/// Only same-site absolute paths are honoured as post-login destinations.
fn safe_next(next: Option<&str>) -> String {
    match next.map(str::trim) {
        Some(path) if path.starts_with('/') && !path.starts_with("//") && !path.contains('\\') => {
            path.to_string()
        }
        _ => DEFAULT_REDIRECT.to_string(),
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(super) struct LoginQuery {
    next: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(super) struct LoginForm {
    username: String,
    password: String,
    next: Option<String>,
}

pub(super) async fn login_form(
    State(state): State<HttpState>,
    jar: CookieJar,
    Query(query): Query<LoginQuery>,
) -> Response {
    let chrome = state.chrome(&jar).await;
    let view = LoginView {
        username: String::new(),
        next: safe_next(query.next.as_deref()),
        error: None,
    };
    render_template_response(
        LoginTemplate {
            view: LayoutContext::new(chrome, view),
        },
        StatusCode::OK,
    )
}

pub(super) async fn login(
    State(state): State<HttpState>,
    jar: CookieJar,
    Form(form): Form<LoginForm>,
) -> Response {
    let next = safe_next(form.next.as_deref());

    match state.auth.login(form.username.trim(), &form.password).await {
        Ok((token, _)) => {
            let max_age = time::Duration::try_from(state.auth.session_ttl())
                .unwrap_or(time::Duration::WEEK);
            let cookie = Cookie::build((state.cookie.name.clone(), token))
                .path("/")
                .http_only(true)
                .same_site(SameSite::Lax)
                .secure(state.cookie.secure)
                .max_age(max_age);
            (jar.add(cookie), Redirect::to(&next)).into_response()
        }
        Err(AuthError::InvalidCredentials) => {
            let chrome = state.chrome(&jar).await;
            let view = LoginView {
                username: form.username,
                next,
                error: Some("Please enter a correct username and password.".to_string()),
            };
            render_template_response(
                LoginTemplate {
                    view: LayoutContext::new(chrome, view),
                },
                StatusCode::OK,
            )
        }
    }
}

pub(super) async fn logout(State(state): State<HttpState>, jar: CookieJar) -> Response {
    if let Some(token) = jar.get(&state.cookie.name) {
        state.auth.logout(token.value()).await;
    }
    let removal = Cookie::build((state.cookie.name.clone(), "")).path("/");
    (jar.remove(removal), Redirect::to(DEFAULT_REDIRECT)).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn next_must_be_a_local_path() {
        assert_eq!(safe_next(Some("/news/3/edit/")), "/news/3/edit/");
        assert_eq!(safe_next(Some("https://evil.example/")), DEFAULT_REDIRECT);
        assert_eq!(safe_next(Some("//evil.example/")), DEFAULT_REDIRECT);
        assert_eq!(safe_next(None), DEFAULT_REDIRECT);
    }

    #[test]
    fn login_redirect_encodes_the_destination() {
        assert_eq!(
            login_redirect("/news/3/edit/?x=1"),
            "/accounts/login/?next=%2Fnews%2F3%2Fedit%2F%3Fx%3D1"
        );
    }
}
