//! Inkpad - a small server-rendered notebook
//!
//! Posts, notes, categories, tags, comments and todo lists behind a
//! session login, rendered with Tera templates.

pub mod cache;
pub mod config;
pub mod db;
pub mod models;
pub mod services;
pub mod theme;
pub mod web;
