//! Shared handler utilities
//!
//! Extractors for the current user and page, form decoding, redirects and
//! page rendering.

use axum::{
    extract::{FromRequestParts, Path},
    http::{header, request::Parts, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tera::Context as TeraContext;

use crate::models::{PagedResult, User};
use crate::theme::{CurrentUser, StandardTemplateVars};
use crate::web::flash::{clear_flash_cookie, flash_cookie, read_flashes, Flash};
use crate::web::middleware::{AppState, CurrentSession, WebError};

static ROUTE_ID_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[1-9]\d*$").expect("valid id regex"));

// ============================================================================
// Redirects
// ============================================================================

/// `302 Found` to `location`
pub fn redirect_found(location: &str) -> Response {
    let mut response = StatusCode::FOUND.into_response();
    if let Ok(value) = HeaderValue::from_str(location) {
        response.headers_mut().insert(header::LOCATION, value);
    }
    response
}

/// `302 Found` that leaves a flash message for the next page
pub fn redirect_with_flash(location: &str, flash: Flash) -> Response {
    let mut response = redirect_found(location);
    if let Ok(cookie) = HeaderValue::from_str(&flash_cookie(&[flash])) {
        response.headers_mut().append(header::SET_COOKIE, cookie);
    }
    response
}

// ============================================================================
// Extractors
// ============================================================================

/// The logged-in user, if any
#[derive(Debug, Clone)]
pub struct MaybeUser(pub Option<User>);

impl<S: Send + Sync> FromRequestParts<S> for MaybeUser {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(MaybeUser(
            parts.extensions.get::<CurrentSession>().map(|s| s.user.clone()),
        ))
    }
}

/// The logged-in user; anonymous requests are redirected to `/login`
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub User);

impl<S: Send + Sync> FromRequestParts<S> for AuthenticatedUser {
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CurrentSession>()
            .map(|s| AuthenticatedUser(s.user.clone()))
            .ok_or_else(|| redirect_found("/login"))
    }
}

/// `{id}` path segment. Anything but a positive integer without a leading
/// zero is a 404.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordId(pub i64);

impl<S: Send + Sync> FromRequestParts<S> for RecordId {
    type Rejection = WebError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(raw) = Path::<String>::from_request_parts(parts, state)
            .await
            .map_err(|_| WebError::NotFound)?;
        parse_route_id(&raw).map(RecordId).ok_or(WebError::NotFound)
    }
}

pub fn parse_route_id(raw: &str) -> Option<i64> {
    if !ROUTE_ID_RE.is_match(raw) {
        return None;
    }
    raw.parse().ok()
}

/// Everything a page needs besides its own data
#[derive(Debug, Clone)]
pub struct PageContext {
    pub site_name: String,
    pub path: String,
    pub user: Option<User>,
    pub flashes: Vec<Flash>,
}

impl FromRequestParts<AppState> for PageContext {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        Ok(PageContext {
            site_name: state.config.server.site_name.clone(),
            path: parts.uri.path().to_string(),
            user: parts.extensions.get::<CurrentSession>().map(|s| s.user.clone()),
            flashes: read_flashes(&parts.headers),
        })
    }
}

impl PageContext {
    pub fn standard_vars(&self) -> StandardTemplateVars {
        let mut vars = StandardTemplateVars::new(self.site_name.clone(), self.path.clone())
            .with_flashes(self.flashes.iter().map(Flash::view).collect());
        if let Some(user) = self.user.as_ref() {
            vars = vars.with_user(current_user_view(user));
        }
        vars
    }
}

pub fn current_user_view(user: &User) -> CurrentUser {
    CurrentUser {
        id: user.id,
        email: user.email.clone(),
        is_admin: user.is_admin(),
    }
}

// ============================================================================
// Rendering
// ============================================================================

/// Render a page with the standard variables. Flashes shown on this page
/// are cleared from the browser.
pub fn render(
    state: &AppState,
    page: &PageContext,
    template: &str,
    context: TeraContext,
    status: StatusCode,
) -> Result<Response, WebError> {
    let html = state
        .theme
        .render_page(template, &context, &page.standard_vars())
        .map_err(|e| WebError::Internal(e.into()))?;

    let mut response = (status, [(header::CONTENT_TYPE, "text/html; charset=utf-8")], html).into_response();
    if !page.flashes.is_empty() {
        if let Ok(cookie) = HeaderValue::from_str(&clear_flash_cookie()) {
            response.headers_mut().append(header::SET_COOKIE, cookie);
        }
    }
    Ok(response)
}

pub fn render_ok(
    state: &AppState,
    page: &PageContext,
    template: &str,
    context: TeraContext,
) -> Result<Response, WebError> {
    render(state, page, template, context, StatusCode::OK)
}

/// Re-render a form with its error messages
pub fn render_invalid(
    state: &AppState,
    page: &PageContext,
    template: &str,
    mut context: TeraContext,
    errors: Vec<String>,
) -> Result<Response, WebError> {
    context.insert("errors", &errors);
    render(state, page, template, context, StatusCode::UNPROCESSABLE_ENTITY)
}

// ============================================================================
// Query strings and forms
// ============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    #[serde(default)]
    pub page: Option<String>,
}

impl PageQuery {
    /// Requested page; anything that isn't a positive number means 1
    pub fn page(&self) -> u32 {
        self.page
            .as_deref()
            .and_then(|p| p.trim().parse::<u32>().ok())
            .filter(|p| *p > 0)
            .unwrap_or(1)
    }
}

/// Submitted form fields, keeping repeated keys (multi-selects)
#[derive(Debug, Clone, Default)]
pub struct FormData(Vec<(String, String)>);

impl FormData {
    pub fn new(fields: Vec<(String, String)>) -> Self {
        Self(fields)
    }

    /// First value of a field
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
    }

    pub fn text(&self, key: &str) -> String {
        self.get(key).unwrap_or_default().to_string()
    }

    /// Every value of a field; `key[]` is accepted as well as `key`
    pub fn all(&self, key: &str) -> Vec<&str> {
        let bracketed = format!("{}[]", key);
        self.0
            .iter()
            .filter(|(k, _)| k == key || *k == bracketed)
            .map(|(_, v)| v.as_str())
            .collect()
    }

    /// Checkbox semantics: present and not "0"/"false"/"off"
    pub fn flag(&self, key: &str) -> bool {
        matches!(self.get(key), Some(v) if !matches!(v.trim(), "" | "0" | "false" | "off"))
    }

    /// Numeric ids from a (multi-)select; junk values are skipped
    pub fn ids(&self, key: &str) -> Vec<i64> {
        self.all(key)
            .into_iter()
            .filter_map(|v| crate::services::parse_id(v))
            .collect()
    }
}

/// Pagination values for templates
#[derive(Debug, Clone, Serialize)]
pub struct PaginationView {
    pub page: u32,
    pub total_pages: u32,
    pub total: i64,
    pub has_prev: bool,
    pub has_next: bool,
    pub prev_page: u32,
    pub next_page: u32,
    /// Extra query string to keep (filters), starting with `&` or empty
    pub query: String,
}

impl PaginationView {
    pub fn from_result<T>(result: &PagedResult<T>, query: impl Into<String>) -> Self {
        Self {
            page: result.page,
            total_pages: result.total_pages(),
            total: result.total,
            has_prev: result.has_prev(),
            has_next: result.has_next(),
            prev_page: result.page.saturating_sub(1).max(1),
            next_page: result.page.saturating_add(1),
            query: query.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ListParams;

    #[test]
    fn test_parse_route_id() {
        assert_eq!(parse_route_id("1"), Some(1));
        assert_eq!(parse_route_id("120"), Some(120));
        assert_eq!(parse_route_id("0"), None);
        assert_eq!(parse_route_id("01"), None);
        assert_eq!(parse_route_id("-1"), None);
        assert_eq!(parse_route_id("abc"), None);
        assert_eq!(parse_route_id("1a"), None);
        assert_eq!(parse_route_id("99999999999999999999999"), None);
    }

    #[test]
    fn test_redirect_found() {
        let response = redirect_found("/post");
        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(response.headers()[header::LOCATION], "/post");
    }

    #[test]
    fn test_redirect_with_flash_sets_cookie() {
        let response = redirect_with_flash("/post", Flash::success(crate::web::flash::Notice::CreatedSuccessfully));
        let cookie = response.headers()[header::SET_COOKIE].to_str().unwrap();
        assert!(cookie.starts_with("flash="));
    }

    #[test]
    fn test_page_query() {
        let page = |raw: Option<&str>| PageQuery { page: raw.map(str::to_string) }.page();
        assert_eq!(page(None), 1);
        assert_eq!(page(Some("3")), 3);
        assert_eq!(page(Some("0")), 1);
        assert_eq!(page(Some("-2")), 1);
        assert_eq!(page(Some("x")), 1);
    }

    #[test]
    fn test_form_data() {
        let form = FormData::new(vec![
            ("title".into(), "Hello".into()),
            ("tags[]".into(), "2".into()),
            ("tags".into(), "5".into()),
            ("tags".into(), "junk".into()),
            ("completed".into(), "1".into()),
        ]);

        assert_eq!(form.get("title"), Some("Hello"));
        assert_eq!(form.text("missing"), "");
        assert_eq!(form.ids("tags"), vec![2, 5]);
        assert!(form.flag("completed"));
        assert!(!form.flag("other"));
    }

    #[test]
    fn test_pagination_view() {
        let result = PagedResult::new(vec![1, 2], 5, &ListParams::new(2, 2));
        let view = PaginationView::from_result(&result, "&filters_tag_id=3");
        assert_eq!(view.total_pages, 3);
        assert!(view.has_prev && view.has_next);
        assert_eq!((view.prev_page, view.next_page), (1, 3));
    }

    #[test]
    fn test_pagination_view_at_largest_page() {
        let result: PagedResult<i32> = PagedResult::new(vec![], 3, &ListParams::new(u32::MAX, 10));
        let view = PaginationView::from_result(&result, "");
        assert_eq!(view.next_page, u32::MAX);
        assert_eq!(view.prev_page, u32::MAX - 1);
        assert!(!view.has_next);
        assert!(view.has_prev);
    }
}

#[cfg(test)]
mod property_tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn route_id_accepts_canonical_numbers(id in 1i64..=i64::MAX) {
            prop_assert_eq!(parse_route_id(&id.to_string()), Some(id));
        }

        #[test]
        fn route_id_rejects_leading_zero(id in 0i64..1_000_000) {
            let raw = format!("0{}", id);
            prop_assert_eq!(parse_route_id(&raw), None);
        }
    }
}
