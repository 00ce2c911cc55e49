//! CLI command handlers.

pub mod apply;
pub mod common;
pub mod config;
pub mod registry;
