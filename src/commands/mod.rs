//! CLI subcommand implementations for buscribe.
//!
//! This module contains the business logic behind the CLI dispatcher in
//! `main.rs`, organized into submodules by domain:
//!
//! - [`capture`] - interactive capture sessions (single and paired)
//! - [`monitor`] - live decoded frame monitor
//! - [`catalog`] - catalog maintenance (list, delete, wipe, send)

pub mod capture;
pub mod catalog;
pub mod monitor;
