//! # TUI Components
//!
//! Each component file is self-contained: state types, event types,
//! rendering, and tests live together. Stateless components (`TurnView`,
//! `StatusBar`, `Toasts`) are rebuilt each frame from props; stateful ones
//! (`TranscriptState`, `InputBox`) persist in `TuiState` and implement
//! `EventHandler`.

pub mod input_box;
pub mod status_bar;
pub mod toasts;
pub mod transcript;
pub mod turn;

pub use input_box::{InputBox, InputEvent};
pub use status_bar::StatusBar;
pub use toasts::Toasts;
pub use transcript::{TranscriptState, TranscriptView};
