//! # Core (pure state)
//!
//! The terminal-independent heart of the client: the transcript store, the
//! application state, and the action/effect reducer. Nothing in here touches
//! the network or the terminal, which is what keeps it unit-testable.

pub mod action;
pub mod config;
pub mod state;
pub mod transcript;
