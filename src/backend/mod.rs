//! # Backend HTTP API
//!
//! Typed client for the conversational backend: history, chat, message
//! edit/delete, tasks, achievements, and preferences. All request/response
//! shapes live in [`types`]; the reqwest plumbing lives in [`client`].

pub mod client;
pub mod types;

pub use client::{BackendClient, BackendError};
