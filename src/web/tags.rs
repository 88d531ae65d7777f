//! Tag pages (admin only)
//!
//! - GET /tag
//! - GET /tag/{id}
//! - GET/POST /tag/create
//! - GET/PUT/POST /tag/{id}/edit
//! - GET/DELETE/POST /tag/{id}/delete

use axum::{
    extract::{Query, State},
    middleware as axum_middleware,
    response::Response,
    routing::get,
    Form, Router,
};
use tera::Context as TeraContext;

use crate::models::{ListParams, Tag};
use crate::services::TagServiceError;
use crate::web::common::{
    redirect_with_flash, render_invalid, render_ok, FormData, PageContext, PageQuery,
    PaginationView, RecordId,
};
use crate::web::flash::{Flash, Notice};
use crate::web::middleware::{require_admin, AppState, WebError};

const INDEX: &str = "/tag";

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/tag", get(index))
        .route("/tag/create", get(create_form).post(create))
        .route("/tag/{id}", get(show))
        .route("/tag/{id}/edit", get(edit_form).put(edit).post(edit))
        .route("/tag/{id}/delete", get(delete_form).delete(delete).post(delete))
        .route_layer(axum_middleware::from_fn(require_admin))
}

async fn load(state: &AppState, id: i64) -> Result<Tag, WebError> {
    state.tag_service.get(id).await?.ok_or(WebError::NotFound)
}

fn form_context(title: &str, action: &str) -> TeraContext {
    let mut context = TeraContext::new();
    context.insert("title", title);
    context.insert("action", action);
    context
}

/// GET /tag
async fn index(
    State(state): State<AppState>,
    page: PageContext,
    Query(page_query): Query<PageQuery>,
) -> Result<Response, WebError> {
    let params = ListParams::new(page_query.page(), state.config.pagination.per_page);
    let result = state.tag_service.list(&params).await?;

    let mut context = TeraContext::new();
    context.insert("tags", &result.items);
    context.insert("pagination", &PaginationView::from_result(&result, ""));
    render_ok(&state, &page, "tag/index.html", context)
}

/// GET /tag/{id}
async fn show(
    State(state): State<AppState>,
    RecordId(id): RecordId,
    page: PageContext,
) -> Result<Response, WebError> {
    let mut context = TeraContext::new();
    context.insert("tag", &load(&state, id).await?);
    render_ok(&state, &page, "tag/show.html", context)
}

/// GET /tag/create
async fn create_form(State(state): State<AppState>, page: PageContext) -> Result<Response, WebError> {
    render_ok(&state, &page, "tag/form.html", form_context("", "/tag/create"))
}

/// POST /tag/create
async fn create(
    State(state): State<AppState>,
    page: PageContext,
    Form(fields): Form<Vec<(String, String)>>,
) -> Result<Response, WebError> {
    let title = FormData::new(fields).text("title");

    match state.tag_service.create(&title).await {
        Ok(tag) => {
            tracing::info!(tag_id = tag.id, "tag created");
            Ok(redirect_with_flash(INDEX, Flash::success(Notice::CreatedSuccessfully)))
        }
        Err(TagServiceError::ValidationError(message)) => render_invalid(
            &state,
            &page,
            "tag/form.html",
            form_context(&title, "/tag/create"),
            vec![message],
        ),
        Err(e) => Err(e.into()),
    }
}

/// GET /tag/{id}/edit
async fn edit_form(
    State(state): State<AppState>,
    RecordId(id): RecordId,
    page: PageContext,
) -> Result<Response, WebError> {
    let tag = load(&state, id).await?;
    let mut context = form_context(&tag.title, &format!("/tag/{}/edit", id));
    context.insert("tag", &tag);
    render_ok(&state, &page, "tag/form.html", context)
}

/// PUT/POST /tag/{id}/edit
async fn edit(
    State(state): State<AppState>,
    RecordId(id): RecordId,
    page: PageContext,
    Form(fields): Form<Vec<(String, String)>>,
) -> Result<Response, WebError> {
    let tag = load(&state, id).await?;
    let title = FormData::new(fields).text("title");

    match state.tag_service.update(id, &title).await {
        Ok(_) => Ok(redirect_with_flash(INDEX, Flash::success(Notice::EditedSuccessfully))),
        Err(TagServiceError::ValidationError(message)) => {
            let mut context = form_context(&title, &format!("/tag/{}/edit", id));
            context.insert("tag", &tag);
            render_invalid(&state, &page, "tag/form.html", context, vec![message])
        }
        Err(e) => Err(e.into()),
    }
}

/// GET /tag/{id}/delete
async fn delete_form(
    State(state): State<AppState>,
    RecordId(id): RecordId,
    page: PageContext,
) -> Result<Response, WebError> {
    let tag = load(&state, id).await?;

    let mut context = TeraContext::new();
    context.insert("record_label", "Tag");
    context.insert("record_title", &tag.title);
    context.insert("action", &format!("/tag/{}/delete", id));
    context.insert("cancel", INDEX);
    render_ok(&state, &page, "shared/delete.html", context)
}

/// DELETE/POST /tag/{id}/delete
async fn delete(State(state): State<AppState>, RecordId(id): RecordId) -> Result<Response, WebError> {
    state.tag_service.delete(id).await?;
    tracing::info!(tag_id = id, "tag deleted");
    Ok(redirect_with_flash(INDEX, Flash::success(Notice::DeletedSuccessfully)))
}
