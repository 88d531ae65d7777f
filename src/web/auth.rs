//! Registration, login and logout pages
//!
//! - GET/POST /register
//! - GET/POST /login
//! - GET/POST /logout

use axum::{
    extract::State,
    http::{header, HeaderMap, HeaderValue},
    response::Response,
    routing::get,
    Form, Router,
};
use tera::Context as TeraContext;

use crate::models::Session;
use crate::services::{LoginInput, RegisterInput, UserServiceError};
use crate::web::common::{redirect_found, render_invalid, render_ok, FormData, PageContext};
use crate::web::flash::{flash_cookie, Flash, Notice};
use crate::web::middleware::{
    clear_session_cookie, extract_session_token, session_cookie, AppState, WebError,
};

const AFTER_LOGIN: &str = "/post";

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/register", get(register_form).post(register))
        .route("/login", get(login_form).post(login))
        .route("/logout", get(logout).post(logout))
}

fn form_context(email: &str) -> TeraContext {
    let mut context = TeraContext::new();
    context.insert("email", email);
    context
}

/// Redirect with the session cookie (and optionally a flash) attached
fn signed_in(state: &AppState, session: &Session, flash: Option<Flash>) -> Response {
    let max_age = state.config.session.lifetime_days * 24 * 60 * 60;
    let mut response = redirect_found(AFTER_LOGIN);
    let mut cookies = vec![session_cookie(&session.id, max_age, state.config.session.secure_cookie)];
    if let Some(flash) = flash {
        cookies.push(flash_cookie(&[flash]));
    }
    for cookie in cookies {
        if let Ok(value) = HeaderValue::from_str(&cookie) {
            response.headers_mut().append(header::SET_COOKIE, value);
        }
    }
    response
}

/// GET /register
async fn register_form(State(state): State<AppState>, page: PageContext) -> Result<Response, WebError> {
    render_ok(&state, &page, "auth/register.html", form_context(""))
}

/// POST /register - create the account and sign it in
async fn register(
    State(state): State<AppState>,
    page: PageContext,
    Form(fields): Form<Vec<(String, String)>>,
) -> Result<Response, WebError> {
    let form = FormData::new(fields);
    let email = form.text("email");

    let user = match state
        .user_service
        .register(RegisterInput::new(email.clone(), form.text("password")))
        .await
    {
        Ok(user) => user,
        Err(UserServiceError::ValidationError(message)) | Err(UserServiceError::UserExists(message)) => {
            return render_invalid(&state, &page, "auth/register.html", form_context(&email), vec![message]);
        }
        Err(e) => return Err(e.into()),
    };

    tracing::info!(user_id = user.id, "user registered");
    let session = state.user_service.start_session(user.id).await?;
    Ok(signed_in(&state, &session, Some(Flash::success(Notice::RegisteredSuccessfully))))
}

/// GET /login
async fn login_form(State(state): State<AppState>, page: PageContext) -> Result<Response, WebError> {
    render_ok(&state, &page, "auth/login.html", form_context(""))
}

/// POST /login
async fn login(
    State(state): State<AppState>,
    page: PageContext,
    Form(fields): Form<Vec<(String, String)>>,
) -> Result<Response, WebError> {
    let form = FormData::new(fields);
    let email = form.text("email");

    match state
        .user_service
        .login(LoginInput::new(email.clone(), form.text("password")))
        .await
    {
        Ok(session) => Ok(signed_in(&state, &session, None)),
        Err(UserServiceError::AuthenticationError(message)) | Err(UserServiceError::ValidationError(message)) => {
            tracing::debug!("login refused");
            render_invalid(&state, &page, "auth/login.html", form_context(&email), vec![message])
        }
        Err(e) => Err(e.into()),
    }
}

/// GET/POST /logout - drop the session row and the cookie
async fn logout(State(state): State<AppState>, headers: HeaderMap) -> Result<Response, WebError> {
    if let Some(token) = extract_session_token(&headers) {
        state.user_service.logout(&token).await?;
    }

    let mut response = redirect_found(AFTER_LOGIN);
    if let Ok(value) = HeaderValue::from_str(&clear_session_cookie()) {
        response.headers_mut().append(header::SET_COOKIE, value);
    }
    Ok(response)
}
