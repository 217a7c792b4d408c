//! Terminal chat client for an AI completion backend.
//!
//! The backend owns inference and persistence; this crate owns UI state and
//! three HTTP calls: submit a prompt, list stored conversations, delete them.

pub mod api;
pub mod app;
pub mod config;
pub mod events;
pub mod ui;
