//! # Charla
//!
//! Terminal client for a conversational AI backend: optimistic message
//! sending, typewriter reply reveal, live relay of exchanges between
//! sessions, reminders, and achievements.

pub mod backend;
pub mod core;
pub mod pollers;
pub mod relay;
pub mod reveal;
pub mod tui;
