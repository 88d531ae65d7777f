//! Post and note pages
//!
//! Both kinds share these handlers; the router for each kind carries its
//! `EntryKind` as a request extension.
//!
//! - GET /{kind} - paginated, filterable list
//! - GET/POST /{kind}/{id} - show, POST adds a comment
//! - GET/POST /{kind}/create
//! - GET/PUT/POST /{kind}/{id}/edit
//! - GET/DELETE/POST /{kind}/{id}/delete

use axum::{
    extract::{Query, State},
    middleware as axum_middleware,
    response::Response,
    routing::get,
    Extension, Form, Router,
};
use serde::Serialize;
use tera::Context as TeraContext;

use crate::models::{CommentTarget, Entry, EntryFilters, EntryKind, FilterRequest, User};
use crate::services::{can_manage_entry, parse_id, CommentServiceError, EntryDraft, EntryServiceError};
use crate::web::common::{
    redirect_with_flash, render_invalid, render_ok, AuthenticatedUser, FormData, MaybeUser,
    PageContext, PageQuery, PaginationView, RecordId,
};
use crate::web::flash::{Flash, Notice};
use crate::web::middleware::{require_login, AppState, WebError};

/// Routes for one entry kind, e.g. everything under `/post`
pub fn router(kind: EntryKind) -> Router<AppState> {
    let prefix = kind.route_prefix();

    let public = Router::new()
        .route(prefix, get(index))
        .route(&format!("{}/{{id}}", prefix), get(show).post(add_comment));

    let members = Router::new()
        .route(&format!("{}/create", prefix), get(create_form).post(create))
        .route(
            &format!("{}/{{id}}/edit", prefix),
            get(edit_form).put(edit).post(edit),
        )
        .route(
            &format!("{}/{{id}}/delete", prefix),
            get(delete_form).delete(delete).post(delete),
        )
        .route_layer(axum_middleware::from_fn(require_login));

    public.merge(members).layer(Extension(kind))
}

/// List row: the entry plus whether the viewer may change it
#[derive(Serialize)]
struct EntryRow<'a> {
    #[serde(flatten)]
    entry: &'a Entry,
    can_manage: bool,
}

fn kind_context(kind: EntryKind) -> TeraContext {
    let mut context = TeraContext::new();
    context.insert("kind", kind.slug());
    context.insert("kind_label", kind.label());
    context.insert("prefix", kind.route_prefix());
    context
}

fn show_path(kind: EntryKind, id: i64) -> String {
    format!("{}/{}", kind.route_prefix(), id)
}

/// Query string that keeps the active filters across pages
fn filter_query(filters: &EntryFilters) -> String {
    let mut query = String::new();
    if let Some(id) = filters.category_id() {
        query.push_str(&format!("&filters_category_id={}", id));
    }
    if let Some(id) = filters.tag_id() {
        query.push_str(&format!("&filters_tag_id={}", id));
    }
    query
}

fn draft_from_form(form: &FormData) -> EntryDraft {
    let content = form.text("content");
    let mut draft = EntryDraft::new(form.text("title"), form.get("category").and_then(parse_id))
        .with_tags(form.ids("tags"));
    if !content.trim().is_empty() {
        draft = draft.with_content(content);
    }
    draft
}

/// Load an entry or answer 404
async fn load_entry(state: &AppState, kind: EntryKind, id: i64) -> Result<Entry, WebError> {
    state.entries(kind).get(id).await?.ok_or(WebError::NotFound)
}

/// GET /{kind}
async fn index(
    State(state): State<AppState>,
    Extension(kind): Extension<EntryKind>,
    page: PageContext,
    Query(page_query): Query<PageQuery>,
    Query(filter_request): Query<FilterRequest>,
) -> Result<Response, WebError> {
    let service = state.entries(kind);
    let filters = service.prepare_filters(&filter_request).await?;
    let result = service.paginated_list(page_query.page(), &filters).await?;

    let rows: Vec<EntryRow> = result
        .items
        .iter()
        .map(|entry| EntryRow {
            entry,
            can_manage: can_manage_entry(page.user.as_ref(), entry),
        })
        .collect();

    let mut context = kind_context(kind);
    context.insert("entries", &rows);
    context.insert("pagination", &PaginationView::from_result(&result, filter_query(&filters)));
    context.insert("filters", &filters);
    context.insert("filter_category_id", &filters.category_id().unwrap_or_default());
    context.insert("filter_tag_id", &filters.tag_id().unwrap_or_default());
    context.insert("categories", &state.category_service.all().await?);
    context.insert("tags", &state.tag_service.all().await?);
    render_ok(&state, &page, "entry/index.html", context)
}

async fn show_context(
    state: &AppState,
    kind: EntryKind,
    entry: &Entry,
    viewer: Option<&User>,
) -> Result<TeraContext, WebError> {
    let comments = state
        .comment_service
        .list_for(CommentTarget::for_entry(kind, entry.id))
        .await?;

    let mut context = kind_context(kind);
    context.insert("entry", entry);
    context.insert("comments", &comments);
    context.insert("can_manage", &can_manage_entry(viewer, entry));
    context.insert("comment", "");
    Ok(context)
}

/// GET /{kind}/{id}
async fn show(
    State(state): State<AppState>,
    Extension(kind): Extension<EntryKind>,
    RecordId(id): RecordId,
    page: PageContext,
) -> Result<Response, WebError> {
    let entry = load_entry(&state, kind, id).await?;
    let context = show_context(&state, kind, &entry, page.user.as_ref()).await?;
    render_ok(&state, &page, "entry/show.html", context)
}

/// POST /{kind}/{id} - add a comment
async fn add_comment(
    State(state): State<AppState>,
    Extension(kind): Extension<EntryKind>,
    RecordId(id): RecordId,
    MaybeUser(user): MaybeUser,
    page: PageContext,
    Form(fields): Form<Vec<(String, String)>>,
) -> Result<Response, WebError> {
    let entry = load_entry(&state, kind, id).await?;

    let Some(user) = user else {
        return Ok(redirect_with_flash(
            &show_path(kind, id),
            Flash::warning(Notice::CanNotCreateAComment),
        ));
    };

    let form = FormData::new(fields);
    let content = form.text("content");
    match state
        .comment_service
        .create(&user, CommentTarget::for_entry(kind, id), &content)
        .await
    {
        Ok(comment) => {
            tracing::info!(comment_id = comment.id, entry_id = id, kind = %kind, "comment added");
            Ok(redirect_with_flash(
                &show_path(kind, id),
                Flash::success(Notice::CommentCreatedSuccessfully),
            ))
        }
        Err(CommentServiceError::ValidationError(message)) => {
            let mut context = show_context(&state, kind, &entry, Some(&user)).await?;
            context.insert("comment", &content);
            render_invalid(&state, &page, "entry/show.html", context, vec![message])
        }
        Err(e) => Err(e.into()),
    }
}

async fn form_context(
    state: &AppState,
    kind: EntryKind,
    draft: &EntryDraft,
    action: &str,
) -> Result<TeraContext, WebError> {
    let mut context = kind_context(kind);
    context.insert("draft", &DraftView::from(draft));
    context.insert("action", action);
    context.insert("categories", &state.category_service.all().await?);
    context.insert("tags", &state.tag_service.all().await?);
    Ok(context)
}

/// Template view of a draft; empty strings instead of `None`
#[derive(Serialize)]
struct DraftView {
    title: String,
    content: String,
    category_id: i64,
    tag_ids: Vec<i64>,
}

impl From<&EntryDraft> for DraftView {
    fn from(draft: &EntryDraft) -> Self {
        Self {
            title: draft.title.clone(),
            content: draft.content.clone().unwrap_or_default(),
            category_id: draft.category_id.unwrap_or_default(),
            tag_ids: draft.tag_ids.clone(),
        }
    }
}

/// GET /{kind}/create
async fn create_form(
    State(state): State<AppState>,
    Extension(kind): Extension<EntryKind>,
    page: PageContext,
) -> Result<Response, WebError> {
    let action = format!("{}/create", kind.route_prefix());
    let context = form_context(&state, kind, &EntryDraft::default(), &action).await?;
    render_ok(&state, &page, "entry/form.html", context)
}

/// POST /{kind}/create
async fn create(
    State(state): State<AppState>,
    Extension(kind): Extension<EntryKind>,
    AuthenticatedUser(user): AuthenticatedUser,
    page: PageContext,
    Form(fields): Form<Vec<(String, String)>>,
) -> Result<Response, WebError> {
    let draft = draft_from_form(&FormData::new(fields));

    match state.entries(kind).create(user.id, &draft).await {
        Ok(entry) => {
            tracing::info!(entry_id = entry.id, kind = %kind, user_id = user.id, "entry created");
            Ok(redirect_with_flash(
                kind.route_prefix(),
                Flash::success(Notice::CreatedSuccessfully),
            ))
        }
        Err(EntryServiceError::ValidationError(message)) => {
            let action = format!("{}/create", kind.route_prefix());
            let context = form_context(&state, kind, &draft, &action).await?;
            render_invalid(&state, &page, "entry/form.html", context, vec![message])
        }
        Err(e) => Err(e.into()),
    }
}

/// GET /{kind}/{id}/edit
async fn edit_form(
    State(state): State<AppState>,
    Extension(kind): Extension<EntryKind>,
    RecordId(id): RecordId,
    AuthenticatedUser(user): AuthenticatedUser,
    page: PageContext,
) -> Result<Response, WebError> {
    let entry = load_entry(&state, kind, id).await?;
    if !can_manage_entry(Some(&user), &entry) {
        return Ok(refuse(kind, user.id, id, Notice::YouCantEditNotYourPost));
    }

    let action = format!("{}/edit", show_path(kind, id));
    let mut context = form_context(&state, kind, &EntryDraft::from_entry(&entry), &action).await?;
    context.insert("entry", &entry);
    render_ok(&state, &page, "entry/form.html", context)
}

/// PUT/POST /{kind}/{id}/edit
async fn edit(
    State(state): State<AppState>,
    Extension(kind): Extension<EntryKind>,
    RecordId(id): RecordId,
    AuthenticatedUser(user): AuthenticatedUser,
    page: PageContext,
    Form(fields): Form<Vec<(String, String)>>,
) -> Result<Response, WebError> {
    let entry = load_entry(&state, kind, id).await?;
    if !can_manage_entry(Some(&user), &entry) {
        return Ok(refuse(kind, user.id, id, Notice::YouCantEditNotYourPost));
    }

    let draft = draft_from_form(&FormData::new(fields));
    match state.entries(kind).update(id, &draft).await {
        Ok(_) => {
            tracing::info!(entry_id = id, kind = %kind, user_id = user.id, "entry edited");
            Ok(redirect_with_flash(
                kind.route_prefix(),
                Flash::success(Notice::EditedSuccessfully),
            ))
        }
        Err(EntryServiceError::ValidationError(message)) => {
            let action = format!("{}/edit", show_path(kind, id));
            let mut context = form_context(&state, kind, &draft, &action).await?;
            context.insert("entry", &entry);
            render_invalid(&state, &page, "entry/form.html", context, vec![message])
        }
        Err(e) => Err(e.into()),
    }
}

/// GET /{kind}/{id}/delete - confirmation page
async fn delete_form(
    State(state): State<AppState>,
    Extension(kind): Extension<EntryKind>,
    RecordId(id): RecordId,
    AuthenticatedUser(user): AuthenticatedUser,
    page: PageContext,
) -> Result<Response, WebError> {
    let entry = load_entry(&state, kind, id).await?;
    if !can_manage_entry(Some(&user), &entry) {
        return Ok(refuse(kind, user.id, id, Notice::YouCantDeleteNotYourPost));
    }

    let mut context = TeraContext::new();
    context.insert("record_label", kind.label());
    context.insert("record_title", &entry.title);
    context.insert("action", &format!("{}/delete", show_path(kind, id)));
    context.insert("cancel", kind.route_prefix());
    render_ok(&state, &page, "shared/delete.html", context)
}

/// DELETE/POST /{kind}/{id}/delete
async fn delete(
    State(state): State<AppState>,
    Extension(kind): Extension<EntryKind>,
    RecordId(id): RecordId,
    AuthenticatedUser(user): AuthenticatedUser,
) -> Result<Response, WebError> {
    let entry = load_entry(&state, kind, id).await?;
    if !can_manage_entry(Some(&user), &entry) {
        return Ok(refuse(kind, user.id, id, Notice::YouCantDeleteNotYourPost));
    }

    state.entries(kind).delete(id).await?;
    tracing::info!(entry_id = id, kind = %kind, user_id = user.id, "entry deleted");
    Ok(redirect_with_flash(
        kind.route_prefix(),
        Flash::success(Notice::DeletedSuccessfully),
    ))
}

fn refuse(kind: EntryKind, user_id: i64, entry_id: i64, notice: Notice) -> Response {
    tracing::info!(user_id, entry_id, kind = %kind, "entry change refused");
    redirect_with_flash(kind.route_prefix(), Flash::warning(notice))
}
