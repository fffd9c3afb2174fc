#![allow(dead_code)]

use std::{num::NonZeroU32, sync::Arc, time::Duration};

use async_trait::async_trait;
use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, Response, header},
};
use time::{Duration as TimeDuration, OffsetDateTime, macros::datetime};
use tokio::sync::Mutex;
use tower::ServiceExt;

use goodnews::application::auth::{
    AuthService, Authenticator, ConfiguredEditors, EditorCredential, SessionStore,
};
use goodnews::application::news::NewsService;
use goodnews::application::repos::{
    CategoriesRepo, CreatePostParams, HealthRepo, PageRequest, PostQueryFilter, PostsRepo,
    PostsWriteRepo, RepoError, UpdatePostParams,
};
use goodnews::domain::entities::{CategoryRecord, PostRecord};
use goodnews::infra::http::{HttpState, SessionCookie, build_router};

pub const COOKIE_NAME: &str = "goodnews_session";
pub const EDITOR: &str = "editor";
pub const EDITOR_PASSWORD: &str = "s3cret";

#[derive(Default)]
struct State {
    posts: Vec<PostRecord>,
    categories: Vec<CategoryRecord>,
    next_post_id: i64,
    next_category_id: i64,
    ticks: i64,
}

/// In-memory store with the same filtering and ordering rules as Postgres.
///
/// Each insert advances a fake clock by one minute so creation order is
/// always observable through `created_at`.
#[derive(Default)]
pub struct InMemoryNews {
    state: Mutex<State>,
}

impl InMemoryNews {
    pub async fn add_category(&self, name: &str) -> CategoryRecord {
        self.create_category(name).await.expect("category")
    }

    /// Inserts a post with an explicit creation time.
    pub async fn seed_post(
        &self,
        title: &str,
        category: &CategoryRecord,
        created_at: OffsetDateTime,
    ) -> PostRecord {
        let mut state = self.state.lock().await;
        state.next_post_id += 1;
        let post = PostRecord {
            id: state.next_post_id,
            title: title.to_string(),
            body: format!("Body of {title}"),
            category_id: category.id,
            category_name: category.name.clone(),
            created_at,
            updated_at: created_at,
        };
        state.posts.push(post.clone());
        post
    }

    pub async fn post(&self, id: i64) -> Option<PostRecord> {
        self.find_post(id).await.expect("find post")
    }

    pub async fn post_count(&self) -> usize {
        self.state.lock().await.posts.len()
    }
}

fn matches(post: &PostRecord, filter: &PostQueryFilter) -> bool {
    if let Some(needle) = filter.title_contains.as_deref() {
        if !post.title.to_lowercase().contains(&needle.to_lowercase()) {
            return false;
        }
    }
    if let Some(category_id) = filter.category_id {
        if post.category_id != category_id {
            return false;
        }
    }
    if let Some(since) = filter.created_since {
        if post.created_at < since {
            return false;
        }
    }
    true
}

#[async_trait]
impl PostsRepo for InMemoryNews {
    async fn list_posts(
        &self,
        filter: &PostQueryFilter,
        page: PageRequest,
    ) -> Result<Vec<PostRecord>, RepoError> {
        let state = self.state.lock().await;
        let mut posts: Vec<_> = state
            .posts
            .iter()
            .filter(|post| matches(post, filter))
            .cloned()
            .collect();
        posts.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(posts
            .into_iter()
            .skip(page.offset as usize)
            .take(page.limit as usize)
            .collect())
    }

    async fn count_posts(&self, filter: &PostQueryFilter) -> Result<u64, RepoError> {
        let state = self.state.lock().await;
        Ok(state.posts.iter().filter(|post| matches(post, filter)).count() as u64)
    }

    async fn find_post(&self, id: i64) -> Result<Option<PostRecord>, RepoError> {
        let state = self.state.lock().await;
        Ok(state.posts.iter().find(|post| post.id == id).cloned())
    }
}

#[async_trait]
impl PostsWriteRepo for InMemoryNews {
    async fn create_post(&self, params: CreatePostParams) -> Result<PostRecord, RepoError> {
        let mut state = self.state.lock().await;
        let category = state
            .categories
            .iter()
            .find(|category| category.id == params.category_id)
            .cloned()
            .ok_or_else(|| RepoError::InvalidInput {
                message: "unknown category".into(),
            })?;

        state.ticks += 1;
        state.next_post_id += 1;
        let created_at = datetime!(2025-01-01 0:00 UTC) + TimeDuration::minutes(state.ticks);
        let post = PostRecord {
            id: state.next_post_id,
            title: params.title,
            body: params.body,
            category_id: category.id,
            category_name: category.name,
            created_at,
            updated_at: created_at,
        };
        state.posts.push(post.clone());
        Ok(post)
    }

    async fn update_post(&self, params: UpdatePostParams) -> Result<PostRecord, RepoError> {
        let mut state = self.state.lock().await;
        let category = state
            .categories
            .iter()
            .find(|category| category.id == params.category_id)
            .cloned()
            .ok_or_else(|| RepoError::InvalidInput {
                message: "unknown category".into(),
            })?;

        state.ticks += 1;
        let updated_at = datetime!(2025-01-01 0:00 UTC) + TimeDuration::minutes(state.ticks);
        let post = state
            .posts
            .iter_mut()
            .find(|post| post.id == params.id)
            .ok_or(RepoError::NotFound)?;
        post.title = params.title;
        post.body = params.body;
        post.category_id = category.id;
        post.category_name = category.name;
        post.updated_at = updated_at;
        Ok(post.clone())
    }

    async fn delete_post(&self, id: i64) -> Result<(), RepoError> {
        let mut state = self.state.lock().await;
        let before = state.posts.len();
        state.posts.retain(|post| post.id != id);
        if state.posts.len() == before {
            return Err(RepoError::NotFound);
        }
        Ok(())
    }
}

#[async_trait]
impl CategoriesRepo for InMemoryNews {
    async fn list_categories(&self) -> Result<Vec<CategoryRecord>, RepoError> {
        let state = self.state.lock().await;
        let mut categories = state.categories.clone();
        categories.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Ok(categories)
    }

    async fn find_category(&self, id: i64) -> Result<Option<CategoryRecord>, RepoError> {
        let state = self.state.lock().await;
        Ok(state
            .categories
            .iter()
            .find(|category| category.id == id)
            .cloned())
    }

    async fn create_category(&self, name: &str) -> Result<CategoryRecord, RepoError> {
        let mut state = self.state.lock().await;
        if state.categories.iter().any(|category| category.name == name) {
            return Err(RepoError::Duplicate {
                constraint: "categories_name_key".into(),
            });
        }
        state.next_category_id += 1;
        let category = CategoryRecord {
            id: state.next_category_id,
            name: name.to_string(),
        };
        state.categories.push(category.clone());
        Ok(category)
    }
}

#[async_trait]
impl HealthRepo for InMemoryNews {
    async fn health_check(&self) -> Result<(), RepoError> {
        Ok(())
    }
}

pub struct TestApp {
    pub router: Router,
    pub store: Arc<InMemoryNews>,
    pub auth: Arc<AuthService>,
}

impl TestApp {
    /// News list pages hold one post, search pages ten.
    pub fn new() -> Self {
        let store = Arc::new(InMemoryNews::default());
        let authenticator: Arc<dyn Authenticator> =
            Arc::new(ConfiguredEditors::new(vec![EditorCredential {
                username: EDITOR.to_string(),
                password_sha256: ConfiguredEditors::digest(EDITOR_PASSWORD),
            }]));
        let auth = Arc::new(AuthService::new(
            authenticator,
            Arc::new(SessionStore::new(Duration::from_secs(3600))),
        ));
        let news = NewsService::new(
            store.clone(),
            store.clone(),
            store.clone(),
            NonZeroU32::new(1).expect("non-zero"),
            NonZeroU32::new(10).expect("non-zero"),
        );

        let state = HttpState {
            news: Arc::new(news),
            auth: auth.clone(),
            health: store.clone(),
            cookie: SessionCookie {
                name: COOKIE_NAME.to_string(),
                secure: false,
            },
            site_title: Arc::from("GoodNews"),
        };

        Self {
            router: build_router(state),
            store,
            auth,
        }
    }

    /// Session cookie header value for a signed-in editor.
    pub async fn editor_cookie(&self) -> String {
        let (token, _) = self
            .auth
            .login(EDITOR, EDITOR_PASSWORD)
            .await
            .expect("editor login");
        format!("{COOKIE_NAME}={token}")
    }

    pub async fn get(&self, uri: &str) -> Response<Body> {
        self.send(Request::get(uri).body(Body::empty()).expect("request"))
            .await
    }

    pub async fn post_form(&self, uri: &str, form: &str) -> Response<Body> {
        self.send(form_request(uri, form, None)).await
    }

    pub async fn post_form_with_cookie(
        &self,
        uri: &str,
        form: &str,
        cookie: &str,
    ) -> Response<Body> {
        self.send(form_request(uri, form, Some(cookie))).await
    }

    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible")
    }
}

fn form_request(uri: &str, form: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::post(uri).header(
        header::CONTENT_TYPE,
        "application/x-www-form-urlencoded",
    );
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::from(form.to_string())).expect("request")
}

pub async fn body_text(response: Response<Body>) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read body");
    String::from_utf8(bytes.to_vec()).expect("utf-8 body")
}

pub fn location(response: &Response<Body>) -> &str {
    response
        .headers()
        .get(header::LOCATION)
        .and_then(|value| value.to_str().ok())
        .expect("location header")
}
