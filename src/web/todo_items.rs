//! Todo item pages (logged in, owner only)

use axum::{
    extract::{Query, State},
    middleware as axum_middleware,
    response::Response,
    routing::get,
    Form, Router,
};
use tera::Context as TeraContext;

use crate::models::{TodoItem, User};
use crate::services::{can_access_owned, TodoItemServiceError};
use crate::web::common::{
    redirect_with_flash, render_invalid, render_ok, AuthenticatedUser, FormData, PageContext,
    PageQuery, PaginationView, RecordId,
};
use crate::web::flash::{Flash, Notice};
use crate::web::middleware::{require_login, AppState, WebError};

const INDEX: &str = "/todoitem";

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/todoitem", get(index))
        .route("/todoitem/create", get(create_form).post(create))
        .route("/todoitem/{id}", get(show))
        .route("/todoitem/{id}/edit", get(edit_form).put(edit).post(edit))
        .route("/todoitem/{id}/delete", get(delete_form).delete(delete).post(delete))
        .route_layer(axum_middleware::from_fn(require_login))
}

/// Same contract as the category loader: non-owners get a redirect
async fn load_owned(state: &AppState, user: &User, id: i64) -> Result<Result<TodoItem, Response>, WebError> {
    let item = state
        .todo_item_service
        .get(id)
        .await?
        .ok_or(WebError::NotFound)?;

    if !can_access_owned(Some(user), item.author_id) {
        tracing::info!(user_id = user.id, todo_item_id = id, "todo item access refused");
        return Ok(Err(redirect_with_flash(INDEX, Flash::warning(Notice::RecordNotFound))));
    }
    Ok(Ok(item))
}

fn form_context(title: &str, completed: bool, action: &str) -> TeraContext {
    let mut context = TeraContext::new();
    context.insert("title", title);
    context.insert("completed", &completed);
    context.insert("action", action);
    context
}

async fn index(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    page: PageContext,
    Query(page_query): Query<PageQuery>,
) -> Result<Response, WebError> {
    let result = state
        .todo_item_service
        .paginated_list(user.id, page_query.page())
        .await?;

    let mut context = TeraContext::new();
    context.insert("items", &result.items);
    context.insert("pagination", &PaginationView::from_result(&result, ""));
    render_ok(&state, &page, "todo_item/index.html", context)
}

async fn show(
    State(state): State<AppState>,
    RecordId(id): RecordId,
    AuthenticatedUser(user): AuthenticatedUser,
    page: PageContext,
) -> Result<Response, WebError> {
    let item = match load_owned(&state, &user, id).await? {
        Ok(item) => item,
        Err(redirect) => return Ok(redirect),
    };

    let mut context = TeraContext::new();
    context.insert("item", &item);
    render_ok(&state, &page, "todo_item/show.html", context)
}

async fn create_form(State(state): State<AppState>, page: PageContext) -> Result<Response, WebError> {
    render_ok(&state, &page, "todo_item/form.html", form_context("", false, "/todoitem/create"))
}

async fn create(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    page: PageContext,
    Form(fields): Form<Vec<(String, String)>>,
) -> Result<Response, WebError> {
    let form = FormData::new(fields);
    let title = form.text("title");
    let completed = form.flag("completed");

    match state.todo_item_service.create(user.id, &title, completed).await {
        Ok(item) => {
            tracing::info!(todo_item_id = item.id, user_id = user.id, "todo item created");
            Ok(redirect_with_flash(INDEX, Flash::success(Notice::CreatedSuccessfully)))
        }
        Err(TodoItemServiceError::ValidationError(message)) => render_invalid(
            &state,
            &page,
            "todo_item/form.html",
            form_context(&title, completed, "/todoitem/create"),
            vec![message],
        ),
        Err(e) => Err(e.into()),
    }
}

async fn edit_form(
    State(state): State<AppState>,
    RecordId(id): RecordId,
    AuthenticatedUser(user): AuthenticatedUser,
    page: PageContext,
) -> Result<Response, WebError> {
    let item = match load_owned(&state, &user, id).await? {
        Ok(item) => item,
        Err(redirect) => return Ok(redirect),
    };

    let mut context = form_context(&item.title, item.completed, &format!("/todoitem/{}/edit", id));
    context.insert("item", &item);
    render_ok(&state, &page, "todo_item/form.html", context)
}

async fn edit(
    State(state): State<AppState>,
    RecordId(id): RecordId,
    AuthenticatedUser(user): AuthenticatedUser,
    page: PageContext,
    Form(fields): Form<Vec<(String, String)>>,
) -> Result<Response, WebError> {
    let item = match load_owned(&state, &user, id).await? {
        Ok(item) => item,
        Err(redirect) => return Ok(redirect),
    };
    let form = FormData::new(fields);
    let title = form.text("title");
    let completed = form.flag("completed");

    match state.todo_item_service.update(id, &title, completed).await {
        Ok(_) => Ok(redirect_with_flash(INDEX, Flash::success(Notice::EditedSuccessfully))),
        Err(TodoItemServiceError::ValidationError(message)) => {
            let mut context = form_context(&title, completed, &format!("/todoitem/{}/edit", id));
            context.insert("item", &item);
            render_invalid(&state, &page, "todo_item/form.html", context, vec![message])
        }
        Err(e) => Err(e.into()),
    }
}

async fn delete_form(
    State(state): State<AppState>,
    RecordId(id): RecordId,
    AuthenticatedUser(user): AuthenticatedUser,
    page: PageContext,
) -> Result<Response, WebError> {
    let item = match load_owned(&state, &user, id).await? {
        Ok(item) => item,
        Err(redirect) => return Ok(redirect),
    };

    let mut context = TeraContext::new();
    context.insert("record_label", "Todo item");
    context.insert("record_title", &item.title);
    context.insert("action", &format!("/todoitem/{}/delete", id));
    context.insert("cancel", INDEX);
    render_ok(&state, &page, "shared/delete.html", context)
}

async fn delete(
    State(state): State<AppState>,
    RecordId(id): RecordId,
    AuthenticatedUser(user): AuthenticatedUser,
) -> Result<Response, WebError> {
    if let Err(redirect) = load_owned(&state, &user, id).await? {
        return Ok(redirect);
    }

    state.todo_item_service.delete(id).await?;
    tracing::info!(todo_item_id = id, user_id = user.id, "todo item deleted");
    Ok(redirect_with_flash(INDEX, Flash::success(Notice::DeletedSuccessfully)))
}
