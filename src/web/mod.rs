//! Web layer - server-rendered HTML pages and routing
//!
//! - `auth`: register, login, logout
//! - `entries`: posts and notes (one router per `EntryKind`)
//! - `categories`, `todo_items`: owner-scoped CRUD
//! - `tags`: admin CRUD
//! - `common`, `flash`, `middleware`: shared extractors, flash cookie,
//!   state, sessions and error pages

pub mod auth;
pub mod categories;
pub mod common;
pub mod entries;
pub mod flash;
pub mod middleware;
pub mod tags;
pub mod todo_items;


use axum::{middleware as axum_middleware, response::Response, routing::get, Router};

use crate::models::EntryKind;

pub use common::redirect_found;
pub use middleware::{AppState, RequestStats, WebError};

/// Build the application router with every page, session loading and
/// themed error pages
pub fn build_router(state: AppState) -> Router {
    let mut router = Router::new()
        .route("/", get(home))
        .merge(auth::router())
        .merge(categories::router())
        .merge(tags::router())
        .merge(todo_items::router());

    for kind in EntryKind::ALL {
        router = router.merge(entries::router(kind));
    }

    router
        .fallback(not_found)
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::render_error_pages,
        ))
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::load_session,
        ))
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::request_stats_middleware,
        ))
        .with_state(state)
}

/// GET / - the post list is the start page
async fn home() -> Response {
    redirect_found(EntryKind::Post.route_prefix())
}

async fn not_found() -> WebError {
    WebError::NotFound
}
