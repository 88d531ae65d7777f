//! Category pages (logged in, owner only)
//!
//! - GET /category
//! - GET /category/{id}
//! - GET/POST /category/create
//! - GET/PUT/POST /category/{id}/edit
//! - GET/DELETE/POST /category/{id}/delete

use axum::{
    extract::{Query, State},
    middleware as axum_middleware,
    response::Response,
    routing::get,
    Form, Router,
};
use serde::Serialize;
use tera::Context as TeraContext;

use crate::models::{Category, ListParams, User};
use crate::services::{can_access_owned, CategoryServiceError};
use crate::web::common::{
    redirect_with_flash, render_invalid, render_ok, AuthenticatedUser, FormData, PageContext,
    PageQuery, PaginationView, RecordId,
};
use crate::web::flash::{Flash, Notice};
use crate::web::middleware::{require_login, AppState, WebError};

const INDEX: &str = "/category";

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/category", get(index))
        .route("/category/create", get(create_form).post(create))
        .route("/category/{id}", get(show))
        .route("/category/{id}/edit", get(edit_form).put(edit).post(edit))
        .route("/category/{id}/delete", get(delete_form).delete(delete).post(delete))
        .route_layer(axum_middleware::from_fn(require_login))
}

#[derive(Serialize)]
struct CategoryRow<'a> {
    #[serde(flatten)]
    category: &'a Category,
    can_be_deleted: bool,
}

/// The category if it exists and belongs to `user`.
///
/// `Err(response)` is the redirect to send instead: non-owners are told the
/// record was not found.
async fn load_owned(state: &AppState, user: &User, id: i64) -> Result<Result<Category, Response>, WebError> {
    let category = state
        .category_service
        .get(id)
        .await?
        .ok_or(WebError::NotFound)?;

    if !can_access_owned(Some(user), category.author_id) {
        tracing::info!(user_id = user.id, category_id = id, "category access refused");
        return Ok(Err(redirect_with_flash(INDEX, Flash::warning(Notice::RecordNotFound))));
    }
    Ok(Ok(category))
}

fn form_context(title: &str, action: &str) -> TeraContext {
    let mut context = TeraContext::new();
    context.insert("title", title);
    context.insert("action", action);
    context
}

/// GET /category
async fn index(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    page: PageContext,
    Query(page_query): Query<PageQuery>,
) -> Result<Response, WebError> {
    let params = ListParams::new(page_query.page(), state.config.pagination.per_page);
    let result = state.category_service.list_for_author(user.id, &params).await?;

    let mut rows = Vec::with_capacity(result.items.len());
    for category in &result.items {
        rows.push(CategoryRow {
            category,
            can_be_deleted: state.category_service.can_be_deleted(category).await,
        });
    }

    let mut context = TeraContext::new();
    context.insert("categories", &rows);
    context.insert("pagination", &PaginationView::from_result(&result, ""));
    render_ok(&state, &page, "category/index.html", context)
}

/// GET /category/{id}
async fn show(
    State(state): State<AppState>,
    RecordId(id): RecordId,
    AuthenticatedUser(user): AuthenticatedUser,
    page: PageContext,
) -> Result<Response, WebError> {
    let category = match load_owned(&state, &user, id).await? {
        Ok(category) => category,
        Err(redirect) => return Ok(redirect),
    };

    let mut context = TeraContext::new();
    context.insert("can_be_deleted", &state.category_service.can_be_deleted(&category).await);
    context.insert("category", &category);
    render_ok(&state, &page, "category/show.html", context)
}

/// GET /category/create
async fn create_form(State(state): State<AppState>, page: PageContext) -> Result<Response, WebError> {
    render_ok(&state, &page, "category/form.html", form_context("", "/category/create"))
}

/// POST /category/create
async fn create(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    page: PageContext,
    Form(fields): Form<Vec<(String, String)>>,
) -> Result<Response, WebError> {
    let title = FormData::new(fields).text("title");

    match state.category_service.create(user.id, &title).await {
        Ok(category) => {
            tracing::info!(category_id = category.id, user_id = user.id, "category created");
            Ok(redirect_with_flash(INDEX, Flash::success(Notice::CreatedSuccessfully)))
        }
        Err(CategoryServiceError::ValidationError(message)) => render_invalid(
            &state,
            &page,
            "category/form.html",
            form_context(&title, "/category/create"),
            vec![message],
        ),
        Err(e) => Err(e.into()),
    }
}

/// GET /category/{id}/edit
async fn edit_form(
    State(state): State<AppState>,
    RecordId(id): RecordId,
    AuthenticatedUser(user): AuthenticatedUser,
    page: PageContext,
) -> Result<Response, WebError> {
    let category = match load_owned(&state, &user, id).await? {
        Ok(category) => category,
        Err(redirect) => return Ok(redirect),
    };

    let mut context = form_context(&category.title, &format!("/category/{}/edit", id));
    context.insert("category", &category);
    render_ok(&state, &page, "category/form.html", context)
}

/// PUT/POST /category/{id}/edit
async fn edit(
    State(state): State<AppState>,
    RecordId(id): RecordId,
    AuthenticatedUser(user): AuthenticatedUser,
    page: PageContext,
    Form(fields): Form<Vec<(String, String)>>,
) -> Result<Response, WebError> {
    let category = match load_owned(&state, &user, id).await? {
        Ok(category) => category,
        Err(redirect) => return Ok(redirect),
    };
    let title = FormData::new(fields).text("title");

    match state.category_service.update(id, &title).await {
        Ok(_) => Ok(redirect_with_flash(INDEX, Flash::success(Notice::EditedSuccessfully))),
        Err(CategoryServiceError::ValidationError(message)) => {
            let mut context = form_context(&title, &format!("/category/{}/edit", id));
            context.insert("category", &category);
            render_invalid(&state, &page, "category/form.html", context, vec![message])
        }
        Err(e) => Err(e.into()),
    }
}

/// GET /category/{id}/delete - refused while posts or notes use it
async fn delete_form(
    State(state): State<AppState>,
    RecordId(id): RecordId,
    AuthenticatedUser(user): AuthenticatedUser,
    page: PageContext,
) -> Result<Response, WebError> {
    let category = match load_owned(&state, &user, id).await? {
        Ok(category) => category,
        Err(redirect) => return Ok(redirect),
    };

    if !state.category_service.can_be_deleted(&category).await {
        return Ok(redirect_with_flash(
            INDEX,
            Flash::warning(Notice::CategoryContainsPosts),
        ));
    }

    let mut context = TeraContext::new();
    context.insert("record_label", "Category");
    context.insert("record_title", &category.title);
    context.insert("action", &format!("/category/{}/delete", id));
    context.insert("cancel", INDEX);
    render_ok(&state, &page, "shared/delete.html", context)
}

/// DELETE/POST /category/{id}/delete - refused while posts or notes use it
async fn delete(
    State(state): State<AppState>,
    RecordId(id): RecordId,
    AuthenticatedUser(user): AuthenticatedUser,
) -> Result<Response, WebError> {
    if let Err(redirect) = load_owned(&state, &user, id).await? {
        return Ok(redirect);
    }

    match state.category_service.delete(id).await {
        Ok(()) => {
            tracing::info!(category_id = id, user_id = user.id, "category deleted");
            Ok(redirect_with_flash(INDEX, Flash::success(Notice::DeletedSuccessfully)))
        }
        Err(CategoryServiceError::InUse(_)) => Ok(redirect_with_flash(
            INDEX,
            Flash::warning(Notice::CategoryContainsPosts),
        )),
        Err(e) => Err(e.into()),
    }
}
