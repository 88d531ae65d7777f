//! One-shot flash messages
//!
//! A redirect stores the message in the `flash` cookie (URL-encoded JSON);
//! the next rendered page shows it and clears the cookie.

use axum::http::{header, HeaderMap};
use serde::{Deserialize, Serialize};

use crate::theme::FlashView;

pub const FLASH_COOKIE: &str = "flash";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlashLevel {
    Success,
    Warning,
}

impl FlashLevel {
    /// Bootstrap alert suffix
    pub fn as_str(self) -> &'static str {
        match self {
            FlashLevel::Success => "success",
            FlashLevel::Warning => "warning",
        }
    }
}

/// Message keys; each maps to one fixed sentence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Notice {
    CreatedSuccessfully,
    EditedSuccessfully,
    DeletedSuccessfully,
    CommentCreatedSuccessfully,
    CanNotCreateAComment,
    YouCantEditNotYourPost,
    YouCantDeleteNotYourPost,
    RecordNotFound,
    CategoryContainsPosts,
    RegisteredSuccessfully,
}

impl Notice {
    pub fn message(self) -> &'static str {
        match self {
            Notice::CreatedSuccessfully => "Created successfully.",
            Notice::EditedSuccessfully => "Edited successfully.",
            Notice::DeletedSuccessfully => "Deleted successfully.",
            Notice::CommentCreatedSuccessfully => "Your comment has been added.",
            Notice::CanNotCreateAComment => "You have to log in to add a comment.",
            Notice::YouCantEditNotYourPost => "You can't edit a record that isn't yours.",
            Notice::YouCantDeleteNotYourPost => "You can't delete a record that isn't yours.",
            Notice::RecordNotFound => "Record not found.",
            Notice::CategoryContainsPosts => "This category still contains records and can't be deleted.",
            Notice::RegisteredSuccessfully => "Your account has been created.",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flash {
    pub level: FlashLevel,
    pub notice: Notice,
}

impl Flash {
    pub fn success(notice: Notice) -> Self {
        Self {
            level: FlashLevel::Success,
            notice,
        }
    }

    pub fn warning(notice: Notice) -> Self {
        Self {
            level: FlashLevel::Warning,
            notice,
        }
    }

    pub fn view(&self) -> FlashView {
        FlashView {
            level: self.level.as_str().to_string(),
            message: self.notice.message().to_string(),
        }
    }
}

/// `Set-Cookie` value carrying the messages
pub fn flash_cookie(flashes: &[Flash]) -> String {
    let json = serde_json::to_string(flashes).unwrap_or_else(|_| "[]".to_string());
    format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax",
        FLASH_COOKIE,
        urlencoding::encode(&json)
    )
}

/// `Set-Cookie` value removing the messages
pub fn clear_flash_cookie() -> String {
    format!("{}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0", FLASH_COOKIE)
}

/// Read pending messages from the request cookies. Garbage is ignored.
pub fn read_flashes(headers: &HeaderMap) -> Vec<Flash> {
    let Some(raw) = cookie_value(headers, FLASH_COOKIE) else {
        return Vec::new();
    };
    if raw.is_empty() {
        return Vec::new();
    }

    urlencoding::decode(&raw)
        .ok()
        .and_then(|json| serde_json::from_str::<Vec<Flash>>(&json).ok())
        .unwrap_or_default()
}

/// Value of a cookie by name, from every `Cookie` header present
pub fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|cookies| cookies.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.to_string())
}
