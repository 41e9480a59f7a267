pub mod decorator;
pub mod dock;
pub mod drag;
pub mod manager;
pub mod registry;

use std::time::Duration;

use ratatui::prelude::Rect;
use serde::{Deserialize, Serialize};

use crate::constants::{
    CASCADE_STEP, CLOSE_ANIMATION, DEFAULT_OVERLAY_HEIGHT, DEFAULT_OVERLAY_WIDTH,
    MAX_CONCURRENT_OVERLAYS, MIN_VISIBLE_MARGIN,
};
use crate::ui::UiFrame;

/// Signed top-left corner of an overlay, in layout units.
///
/// `x` may go negative while a wide overlay hangs off the left viewport edge;
/// `y` never does (the header must stay reachable).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// The area overlays are placed and clamped against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Viewport {
    pub width: u16,
    pub height: u16,
}

impl Viewport {
    pub fn new(width: u16, height: u16) -> Self {
        Self { width, height }
    }
}

/// Lifecycle state of a tracked overlay.
///
/// Untracked overlays have no state; `open` admits into `Opening`, the
/// following raise promotes to `Active`. `Closing` is the exit-animation
/// phase: still tracked, still occupying a slot, gone after finalization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverlayState {
    Opening,
    Active,
    Inactive,
    Minimized,
    Closing,
}

impl OverlayState {
    /// Open on screen, i.e. participating in the active/inactive focus pair.
    pub fn is_open(self) -> bool {
        matches!(self, OverlayState::Active | OverlayState::Inactive)
    }
}

/// Caller-owned lifecycle callback. Invoked at most once by the registry;
/// panics are caught and logged, never propagated.
pub type OverlayCallback = Box<dyn FnMut()>;

/// Configuration for [`manager::OverlayManager::open`].
///
/// `content` is an opaque payload; the compositor stores and returns it but
/// never inspects it. Geometry fields left unset fall back to
/// [`OverlayOptions`] defaults.
pub struct OverlayConfig<C> {
    pub id: String,
    pub title: String,
    pub content: C,
    pub width: Option<u16>,
    pub height: Option<u16>,
    pub module: String,
    pub on_close: Option<OverlayCallback>,
    pub on_save: Option<OverlayCallback>,
}

impl<C> OverlayConfig<C> {
    pub fn new(id: impl Into<String>, content: C) -> Self {
        Self {
            id: id.into(),
            title: String::new(),
            content,
            width: None,
            height: None,
            module: String::new(),
            on_close: None,
            on_save: None,
        }
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn size(mut self, width: u16, height: u16) -> Self {
        self.width = Some(width);
        self.height = Some(height);
        self
    }

    /// Free-text provenance tag, informational only.
    pub fn module(mut self, module: impl Into<String>) -> Self {
        self.module = module.into();
        self
    }

    pub fn on_close(mut self, callback: impl FnMut() + 'static) -> Self {
        self.on_close = Some(Box::new(callback));
        self
    }

    pub fn on_save(mut self, callback: impl FnMut() + 'static) -> Self {
        self.on_save = Some(Box::new(callback));
        self
    }
}

/// Tunables for the compositor. Defaults come from [`crate::constants`] and
/// suit logical coordinate spaces; terminal hosts pass cell-sized values.
#[derive(Debug, Clone)]
pub struct OverlayOptions {
    pub max_concurrent: usize,
    pub default_width: u16,
    pub default_height: u16,
    pub min_visible: u16,
    pub cascade_step: i32,
    pub close_animation: Duration,
}

impl Default for OverlayOptions {
    fn default() -> Self {
        Self {
            max_concurrent: MAX_CONCURRENT_OVERLAYS,
            default_width: DEFAULT_OVERLAY_WIDTH,
            default_height: DEFAULT_OVERLAY_HEIGHT,
            min_visible: MIN_VISIBLE_MARGIN,
            cascade_step: CASCADE_STEP,
            close_animation: CLOSE_ANIMATION,
        }
    }
}

impl OverlayOptions {
    /// A set of defaults sized for terminal cells rather than logical units.
    pub fn terminal_cells() -> Self {
        Self {
            default_width: 48,
            default_height: 14,
            min_visible: 4,
            cascade_step: 2,
            ..Self::default()
        }
    }
}

/// Render hook for overlay payloads. Only the manager's draw path requires
/// this; the registry and its state machine stay payload-agnostic.
pub trait OverlayContent {
    fn render(&mut self, frame: &mut UiFrame<'_>, area: Rect, focused: bool);
}

/// True when the (signed) overlay rect contains the given screen cell.
pub(crate) fn overlay_contains(position: Point, width: u16, height: u16, column: u16, row: u16) -> bool {
    let col = i32::from(column);
    let row = i32::from(row);
    col >= position.x
        && col < position.x.saturating_add(i32::from(width))
        && row >= position.y
        && row < position.y.saturating_add(i32::from(height))
}
