//! Shared crate-wide constants.

use std::time::Duration;

/// Hard ceiling on simultaneously tracked overlays. Minimized overlays still
/// count against this limit; only finalized closes free a slot.
pub const MAX_CONCURRENT_OVERLAYS: usize = 3;

/// Default overlay size in layout units.
pub const DEFAULT_OVERLAY_WIDTH: u16 = 600;
pub const DEFAULT_OVERLAY_HEIGHT: u16 = 700;

/// Minimum number of layout units an overlay must keep inside the viewport on
/// every edge so the user can grab its header again.
///
/// Terminal front ends typically pass a much smaller margin (a handful of
/// cells) through [`crate::overlay::OverlayOptions`]; the default here is
/// sized for logical coordinate spaces.
pub const MIN_VISIBLE_MARGIN: u16 = 50;

/// Diagonal offset applied per already-tracked overlay when no stored
/// position exists, starting from a viewport-centered anchor.
pub const CASCADE_STEP: i32 = 40;

/// Fixed duration of the exit animation between begin-close and teardown.
/// The record keeps occupying its concurrency slot until this elapses.
pub const CLOSE_ANIMATION: Duration = Duration::from_millis(150);
