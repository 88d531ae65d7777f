//! Web middleware and shared state
//!
//! Contains:
//! - `AppState`, the services every handler reaches through `State`
//! - session loading (cookie or bearer token) for every request
//! - login/admin guards for protected route groups
//! - `WebError` and the layer that turns it into a themed error page
//! - lock-free request statistics

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tera::Context as TeraContext;

use crate::cache::Cache;
use crate::config::Config;
use crate::db::repositories::{
    EntryRepository, SqlxCategoryRepository, SqlxCommentRepository, SqlxEntryRepository, SqlxSessionRepository,
    SqlxTagRepository, SqlxTodoItemRepository, SqlxUserRepository,
};
use crate::db::DynDatabasePool;
use crate::models::{EntryKind, User};
use crate::services::{
    CategoryService, CategoryServiceError, CommentService, CommentServiceError, EntryService,
    EntryServiceError, TagService, TagServiceError, TodoItemService, TodoItemServiceError,
    UserService, UserServiceError,
};
use crate::theme::{simple_error_page, StandardTemplateVars, ThemeEngine};
use crate::web::common::{current_user_view, redirect_found};
use crate::web::flash::cookie_value;

pub const SESSION_COOKIE: &str = "session";

// ============================================================================
// Request Statistics
// ============================================================================

/// Request counter and accumulated latency, updated with atomics only
pub struct RequestStats {
    total_requests: AtomicU64,
    total_response_time_us: AtomicU64,
    start_time: Instant,
}

impl RequestStats {
    pub fn new() -> Self {
        Self {
            total_requests: AtomicU64::new(0),
            total_response_time_us: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    pub fn record(&self, duration_us: u64) {
        self.total_requests.fetch_add(1, Ordering::Relaxed);
        self.total_response_time_us.fetch_add(duration_us, Ordering::Relaxed);
    }

    pub fn total_requests(&self) -> u64 {
        self.total_requests.load(Ordering::Relaxed)
    }

    /// Mean response time in microseconds, 0 before the first request
    pub fn avg_response_time_us(&self) -> f64 {
        let total = self.total_requests.load(Ordering::Relaxed);
        if total == 0 {
            return 0.0;
        }
        self.total_response_time_us.load(Ordering::Relaxed) as f64 / total as f64
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    /// One-line report, e.g. `42 requests, avg 1.25ms, up 3h 5m`
    pub fn summary(&self) -> String {
        format!(
            "{} requests, avg {:.2}ms, up {}",
            self.total_requests(),
            self.avg_response_time_us() / 1000.0,
            format_uptime(self.uptime_seconds())
        )
    }
}

fn format_uptime(seconds: u64) -> String {
    let days = seconds / 86400;
    let hours = (seconds % 86400) / 3600;
    let minutes = (seconds % 3600) / 60;

    if days > 0 {
        format!("{}d {}h {}m", days, hours, minutes)
    } else if hours > 0 {
        format!("{}h {}m", hours, minutes)
    } else if minutes > 0 {
        format!("{}m", minutes)
    } else {
        format!("{}s", seconds)
    }
}

impl Default for RequestStats {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Application state
// ============================================================================

#[derive(Clone)]
pub struct AppState {
    pub pool: DynDatabasePool,
    pub config: Arc<Config>,
    pub user_service: Arc<UserService>,
    pub post_service: Arc<EntryService>,
    pub note_service: Arc<EntryService>,
    pub category_service: Arc<CategoryService>,
    pub tag_service: Arc<TagService>,
    pub comment_service: Arc<CommentService>,
    pub todo_item_service: Arc<TodoItemService>,
    pub theme: Arc<ThemeEngine>,
    pub request_stats: Arc<RequestStats>,
}

impl AppState {
    /// Wire repositories and services over one pool
    pub fn new(pool: DynDatabasePool, config: Config, cache: Arc<Cache>, theme: ThemeEngine) -> Self {
        let per_page = config.pagination.per_page;

        let category_repo = SqlxCategoryRepository::boxed(pool.clone());
        let tag_repo = SqlxTagRepository::boxed(pool.clone());
        let post_repo = SqlxEntryRepository::boxed(pool.clone(), EntryKind::Post);
        let note_repo = SqlxEntryRepository::boxed(pool.clone(), EntryKind::Note);

        let entry_service = |repo: Arc<dyn EntryRepository>| {
            Arc::new(EntryService::new(repo, category_repo.clone(), tag_repo.clone()).with_per_page(per_page))
        };

        Self {
            user_service: Arc::new(UserService::with_session_lifetime(
                SqlxUserRepository::boxed(pool.clone()),
                SqlxSessionRepository::boxed(pool.clone()),
                config.session.lifetime_days,
            )),
            post_service: entry_service(post_repo.clone()),
            note_service: entry_service(note_repo.clone()),
            category_service: Arc::new(CategoryService::new(
                category_repo.clone(),
                vec![post_repo, note_repo],
                cache.clone(),
            )),
            tag_service: Arc::new(TagService::new(tag_repo.clone(), cache)),
            comment_service: Arc::new(CommentService::new(SqlxCommentRepository::boxed(pool.clone()))),
            todo_item_service: Arc::new(
                TodoItemService::new(SqlxTodoItemRepository::boxed(pool.clone())).with_per_page(per_page),
            ),
            theme: Arc::new(theme),
            request_stats: Arc::new(RequestStats::new()),
            config: Arc::new(config),
            pool,
        }
    }

    pub fn entries(&self, kind: EntryKind) -> &Arc<EntryService> {
        match kind {
            EntryKind::Post => &self.post_service,
            EntryKind::Note => &self.note_service,
        }
    }
}

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum WebError {
    #[error("Not found")]
    NotFound,

    #[error("Access denied")]
    Forbidden,

    #[error("Unprocessable: {0}")]
    Unprocessable(String),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

/// Marker left on error responses; `render_error_pages` swaps in the themed page
#[derive(Debug, Clone)]
pub struct ErrorPage {
    pub status: StatusCode,
    pub message: String,
}

impl WebError {
    pub fn status(&self) -> StatusCode {
        match self {
            WebError::NotFound => StatusCode::NOT_FOUND,
            WebError::Forbidden => StatusCode::FORBIDDEN,
            WebError::Unprocessable(_) => StatusCode::UNPROCESSABLE_ENTITY,
            WebError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn public_message(&self) -> String {
        match self {
            WebError::NotFound => "The page you are looking for does not exist.".to_string(),
            WebError::Forbidden => "You are not allowed to access this page.".to_string(),
            WebError::Unprocessable(message) => message.clone(),
            WebError::Internal(_) => "Something went wrong on our side.".to_string(),
        }
    }
}

impl IntoResponse for WebError {
    fn into_response(self) -> Response {
        if let WebError::Internal(ref e) = self {
            tracing::error!("internal error: {:#}", e);
        }

        let status = self.status();
        let message = self.public_message();
        let mut response = (
            status,
            [(header::CONTENT_TYPE, "text/html; charset=utf-8")],
            simple_error_page(status.as_u16(), &message),
        )
            .into_response();
        response.extensions_mut().insert(ErrorPage { status, message });
        response
    }
}

macro_rules! impl_from_service_error {
    ($($error:ident),* $(,)?) => {
        $(
            impl From<$error> for WebError {
                fn from(err: $error) -> Self {
                    match err {
                        $error::NotFound(_) => WebError::NotFound,
                        $error::ValidationError(message) => WebError::Unprocessable(message),
                        other => WebError::Internal(anyhow::Error::new(other)),
                    }
                }
            }
        )*
    };
}

impl_from_service_error!(
    CategoryServiceError,
    CommentServiceError,
    EntryServiceError,
    TagServiceError,
    TodoItemServiceError,
);

impl From<UserServiceError> for WebError {
    fn from(err: UserServiceError) -> Self {
        match err {
            UserServiceError::NotFound => WebError::NotFound,
            UserServiceError::ValidationError(message)
            | UserServiceError::UserExists(message)
            | UserServiceError::AuthenticationError(message) => WebError::Unprocessable(message),
            UserServiceError::InternalError(e) => WebError::Internal(e),
        }
    }
}

// ============================================================================
// Sessions
// ============================================================================

/// The logged-in user and the token that identified them
#[derive(Debug, Clone)]
pub struct CurrentSession {
    pub token: String,
    pub user: User,
}

/// Session token from `Authorization: Bearer` or the `session` cookie
pub fn extract_session_token(headers: &HeaderMap) -> Option<String> {
    if let Some(token) = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
    {
        return Some(token.trim().to_string());
    }

    cookie_value(headers, SESSION_COOKIE).filter(|token| !token.is_empty())
}

/// `Set-Cookie` value for a fresh session
pub fn session_cookie(token: &str, max_age_secs: i64, secure: bool) -> String {
    let mut cookie = format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        SESSION_COOKIE, token, max_age_secs
    );
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}

pub fn clear_session_cookie() -> String {
    format!("{}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0", SESSION_COOKIE)
}

/// Attach `CurrentSession` to every request that carries a valid token
pub async fn load_session(State(state): State<AppState>, mut request: Request, next: Next) -> Response {
    if let Some(token) = extract_session_token(request.headers()) {
        match state.user_service.validate_session(&token).await {
            Ok(Some(user)) => {
                request.extensions_mut().insert(CurrentSession { token, user });
            }
            Ok(None) => {}
            Err(e) => tracing::error!("session lookup failed: {:#}", e),
        }
    }
    next.run(request).await
}

/// Anonymous requests are sent to the login page
pub async fn require_login(request: Request, next: Next) -> Response {
    if request.extensions().get::<CurrentSession>().is_none() {
        tracing::debug!(path = %request.uri().path(), "login required");
        return redirect_found("/login");
    }
    next.run(request).await
}

/// Anonymous requests go to the login page; logged-in non-admins get 403
pub async fn require_admin(request: Request, next: Next) -> Response {
    match request.extensions().get::<CurrentSession>() {
        None => redirect_found("/login"),
        Some(session) if !session.user.is_admin() => {
            tracing::info!(
                user_id = session.user.id,
                path = %request.uri().path(),
                "admin area refused"
            );
            WebError::Forbidden.into_response()
        }
        Some(_) => next.run(request).await,
    }
}

// ============================================================================
// Response post-processing
// ============================================================================

/// Replace the bare body of `WebError` responses with `error.html`
pub async fn render_error_pages(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let path = request.uri().path().to_string();
    let user = request.extensions().get::<CurrentSession>().map(|s| s.user.clone());

    let mut response = next.run(request).await;
    let Some(page) = response.extensions_mut().remove::<ErrorPage>() else {
        return response;
    };

    let mut vars = StandardTemplateVars::new(state.config.server.site_name.clone(), path);
    if let Some(user) = user.as_ref() {
        vars = vars.with_user(current_user_view(user));
    }
    let mut context = TeraContext::new();
    vars.insert_into(&mut context);
    context.insert("status", &page.status.as_u16());
    context.insert("error_message", &page.message);

    let html = state.theme.render_with_fallback("error.html", &context);
    let (mut parts, _) = response.into_parts();
    parts.headers.remove(header::CONTENT_LENGTH);
    parts
        .headers
        .insert(header::CONTENT_TYPE, HeaderValue::from_static("text/html; charset=utf-8"));
    Response::from_parts(parts, axum::body::Body::from(html))
}

/// Count requests and their latency
pub async fn request_stats_middleware(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let start = Instant::now();
    let response = next.run(request).await;
    state.request_stats.record(start.elapsed().as_micros() as u64);
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_stats() {
        let stats = RequestStats::new();
        assert_eq!(stats.avg_response_time_us(), 0.0);

        stats.record(100);
        stats.record(300);
        assert_eq!(stats.total_requests(), 2);
        assert_eq!(stats.avg_response_time_us(), 200.0);
        assert!(stats.summary().starts_with("2 requests, avg 0.20ms, up "));
    }

    #[test]
    fn test_format_uptime() {
        assert_eq!(format_uptime(42), "42s");
        assert_eq!(format_uptime(125), "2m");
        assert_eq!(format_uptime(3 * 3600 + 5 * 60), "3h 5m");
        assert_eq!(format_uptime(2 * 86400 + 3600), "2d 1h 0m");
    }

    #[test]
    fn test_extract_token_prefers_bearer() {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_static("session=from-cookie"));
        assert_eq!(extract_session_token(&headers).as_deref(), Some("from-cookie"));

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer from-header"));
        assert_eq!(extract_session_token(&headers).as_deref(), Some("from-header"));
    }

    #[test]
    fn test_extract_token_ignores_empty_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_static("session="));
        assert!(extract_session_token(&headers).is_none());
    }

    #[test]
    fn test_session_cookie_attributes() {
        let cookie = session_cookie("tok", 60, false);
        assert_eq!(cookie, "session=tok; Path=/; HttpOnly; SameSite=Lax; Max-Age=60");
        assert!(session_cookie("tok", 60, true).ends_with("; Secure"));
        assert!(clear_session_cookie().contains("Max-Age=0"));
    }

    #[test]
    fn test_web_error_status() {
        assert_eq!(WebError::NotFound.status(), StatusCode::NOT_FOUND);
        assert_eq!(WebError::Forbidden.status(), StatusCode::FORBIDDEN);
        assert_eq!(
            WebError::Internal(anyhow::anyhow!("boom")).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );

        let response = WebError::Forbidden.into_response();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert!(response.extensions().get::<ErrorPage>().is_some());
    }

    #[test]
    fn test_service_errors_map_to_web_errors() {
        assert!(matches!(
            WebError::from(EntryServiceError::NotFound(1)),
            WebError::NotFound
        ));
        assert!(matches!(
            WebError::from(TagServiceError::ValidationError("bad".into())),
            WebError::Unprocessable(_)
        ));
        assert!(matches!(
            WebError::from(CategoryServiceError::InUse(3)),
            WebError::Internal(_)
        ));
    }
}
