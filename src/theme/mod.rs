//! Theme engine
//!
//! Tera templates compiled into the binary from `templates/`. A directory
//! named by `theme.path` may override any of them by file name, so a site can
//! restyle pages without rebuilding.

use chrono::Datelike;
use rust_embed::RustEmbed;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::error::Error as StdError;
use std::fs;
use std::path::Path;
use tera::{Context as TeraContext, Tera};

mod error;

pub use error::ThemeError;

#[derive(RustEmbed)]
#[folder = "templates/"]
#[include = "*.html"]
struct EmbeddedTemplates;

pub struct ThemeEngine {
    tera: Tera,
    /// Names of templates that came from the override directory
    overridden: Vec<String>,
}

impl ThemeEngine {
    /// Load the embedded templates, then anything under `override_path`
    ///
    /// # Errors
    ///
    /// - `ThemeError::IoError` if the override directory cannot be read
    /// - `ThemeError::TemplateError` if any template fails to parse
    pub fn new(override_path: Option<&Path>) -> Result<Self, ThemeError> {
        let mut templates: BTreeMap<String, String> = BTreeMap::new();

        for name in EmbeddedTemplates::iter() {
            if let Some(file) = EmbeddedTemplates::get(&name) {
                let content = String::from_utf8_lossy(&file.data).into_owned();
                templates.insert(name.replace('\\', "/"), content);
            }
        }

        let mut overridden = Vec::new();
        if let Some(dir) = override_path {
            let mut found = Vec::new();
            collect_templates_from_dir(dir, dir, &mut found)?;
            for (name, content) in found {
                tracing::debug!(template = %name, "template overridden from theme path");
                overridden.push(name.clone());
                templates.insert(name, content);
            }
        }

        let mut tera = Tera::default();
        tera.add_raw_templates(templates.into_iter().collect::<Vec<_>>())
            .map_err(|e| ThemeError::TemplateError(error_chain("Failed to load templates", &e)))?;

        Ok(Self { tera, overridden })
    }

    pub fn has_template(&self, name: &str) -> bool {
        self.tera.get_template_names().any(|n| n == name)
    }

    pub fn overridden(&self) -> &[String] {
        &self.overridden
    }

    pub fn render(&self, template: &str, context: &TeraContext) -> Result<String, ThemeError> {
        self.tera.render(template, context).map_err(|e| {
            ThemeError::TemplateError(error_chain(&format!("Failed to render '{}'", template), &e))
        })
    }

    /// Render `template` with the standard page variables merged in
    pub fn render_page(
        &self,
        template: &str,
        context: &TeraContext,
        vars: &StandardTemplateVars,
    ) -> Result<String, ThemeError> {
        let mut full = context.clone();
        vars.insert_into(&mut full);
        self.render(template, &full)
    }

    /// Render a template; on failure render `error.html`, and if that fails
    /// too, a static HTML page. Never fails.
    pub fn render_with_fallback(&self, template: &str, context: &TeraContext) -> String {
        match self.render(template, context) {
            Ok(html) => html,
            Err(e) => {
                tracing::error!("{}", e);

                let mut error_context = context.clone();
                error_context.insert("status", &500);
                error_context.insert("error_message", "The page could not be rendered.");
                error_context.insert("requested_template", template);

                match self.render("error.html", &error_context) {
                    Ok(html) => html,
                    Err(error_template_err) => {
                        tracing::error!("{}", error_template_err);
                        simple_error_page(500, "The page could not be rendered.")
                    }
                }
            }
        }
    }
}

/// Build "<what>: <err>" followed by one "Caused by" line per source
fn error_chain(what: &str, err: &tera::Error) -> String {
    let mut message = format!("{}: {}", what, err);
    let mut source = err.source();
    while let Some(s) = source {
        message.push_str(&format!("\n  Caused by: {}", s));
        source = s.source();
    }
    message
}

fn collect_templates_from_dir(
    base_path: &Path,
    current_path: &Path,
    templates: &mut Vec<(String, String)>,
) -> Result<(), ThemeError> {
    if !current_path.exists() {
        return Ok(());
    }

    for entry in fs::read_dir(current_path)? {
        let path = entry?.path();

        if path.is_dir() {
            collect_templates_from_dir(base_path, &path, templates)?;
        } else if path.extension().is_some_and(|ext| ext == "html") {
            let relative = path
                .strip_prefix(base_path)
                .map_err(|_| ThemeError::TemplateError("Failed to get relative path".to_string()))?;
            let name = relative.to_string_lossy().replace('\\', "/");
            templates.push((name, fs::read_to_string(&path)?));
        }
    }

    Ok(())
}

/// Last-resort page used when even `error.html` cannot be rendered
pub fn simple_error_page(status: u16, message: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <title>Error {status}</title>
</head>
<body>
    <h1>Error {status}</h1>
    <p>{message}</p>
    <p><a href="/">Back to the start page</a></p>
</body>
</html>"#,
        status = status,
        message = tera::escape_html(message),
    )
}

/// Variables every page receives
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StandardTemplateVars {
    pub site_name: String,
    pub request_path: String,
    pub year: i32,
    pub current_user: Option<CurrentUser>,
    pub flashes: Vec<FlashView>,
}

/// Logged-in user as templates see it
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CurrentUser {
    pub id: i64,
    pub email: String,
    pub is_admin: bool,
}

/// One flash message ready for display; `level` is a Bootstrap alert suffix
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FlashView {
    pub level: String,
    pub message: String,
}

impl StandardTemplateVars {
    pub fn new(site_name: impl Into<String>, request_path: impl Into<String>) -> Self {
        Self {
            site_name: site_name.into(),
            request_path: request_path.into(),
            year: chrono::Utc::now().year(),
            current_user: None,
            flashes: Vec::new(),
        }
    }

    pub fn with_user(mut self, user: CurrentUser) -> Self {
        self.current_user = Some(user);
        self
    }

    pub fn with_flashes(mut self, flashes: Vec<FlashView>) -> Self {
        self.flashes = flashes;
        self
    }

    pub fn insert_into(&self, context: &mut TeraContext) {
        context.insert("site_name", &self.site_name);
        context.insert("request_path", &self.request_path);
        context.insert("year", &self.year);
        context.insert("current_user", &self.current_user);
        context.insert("flashes", &self.flashes);
    }
}
