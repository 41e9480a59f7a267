//! A draggable overlay compositor for terminal UIs.
//!
//! A host ratatui application embeds an [`OverlayManager`] and gains floating
//! panels above its own content: draggable by mouse on their headers,
//! stackable in z-order, minimizable into a dock strip, with per-panel
//! positions persisted across sessions.
//!
//! The state machine (registry, drag clamping, dock, capacity policy) is pure
//! and lives apart from the ratatui/crossterm binding, so every lifecycle
//! rule is testable without a terminal.

pub mod constants;
pub mod notify;
pub mod overlay;
pub mod store;
pub mod theme;
pub mod tracing_sub;
pub mod ui;

pub use overlay::decorator::{DefaultDecorator, HeaderAction, OverlayDecorator};
pub use overlay::dock::{DockEntry, MinimizedDock};
pub use overlay::drag::{DragController, DragUpdate, clamp_position};
pub use overlay::manager::OverlayManager;
pub use overlay::registry::{OpenOutcome, OverlayRecord, OverlayRegistry};
pub use overlay::{
    OverlayCallback, OverlayConfig, OverlayContent, OverlayOptions, OverlayState, Point, Viewport,
};
pub use notify::{BufferedNotifier, LogNotifier, NotificationSink};
pub use store::{JsonPositionStore, MemoryStore, PositionStore, StoreError};
pub use ui::UiFrame;
