use ratatui::Frame;
use ratatui::layout::Rect;

/// A reusable UI component.
///
/// Components receive data via props (struct fields), may hold internal
/// presentation state, and render into a `Rect`. `render` takes `&mut self`
/// so components can update caches and scroll offsets during the pass,
/// matching ratatui's `StatefulWidget` shape.
pub trait Component {
    fn render(&mut self, frame: &mut Frame, area: Rect);
}

/// A component that consumes terminal events and emits higher-level ones.
pub trait EventHandler {
    type Event;

    /// Handle a low-level `TuiEvent`, optionally emitting a component event.
    fn handle_event(&mut self, event: &super::event::TuiEvent) -> Option<Self::Event>;
}
