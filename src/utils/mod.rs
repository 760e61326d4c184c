//! Shared helpers for provider adapters

pub mod http;
pub mod text;
