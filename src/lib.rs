#![deny(missing_docs)]
//! Telegram bot that opens the insurance mini-app form and relays
//! submitted form data to a single administrator chat.

/// Telegram-facing handlers and the outbound messaging seam.
pub mod bot;
/// Configuration loading and validation.
pub mod config;
/// Tracing setup with secret redaction.
pub mod logging;
/// Submission parsing, formatting and delivery to the administrator.
pub mod relay;
/// Dispatcher wiring and the run loop.
pub mod runner;
