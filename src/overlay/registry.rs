use std::collections::BTreeMap;
use std::panic::{self, AssertUnwindSafe};
use std::time::Instant;

use super::drag::clamp_position;
use super::{OverlayCallback, OverlayConfig, OverlayOptions, OverlayState, Point, Viewport};

/// Result of an `open` attempt. Capacity rejection and duplicate-open are
/// policy outcomes, not errors; the facade maps them onto the notification
/// sink instead of returning `Err`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenOutcome {
    Opened,
    RaisedExisting,
    RejectedCapacity,
    RejectedInvalid,
}

/// One tracked overlay. Owned exclusively by the registry; the manager and
/// hosts observe it through accessors.
pub struct OverlayRecord<C> {
    id: String,
    title: String,
    content: C,
    width: u16,
    height: u16,
    position: Point,
    z: u64,
    state: OverlayState,
    module: String,
    on_close: Option<OverlayCallback>,
    on_save: Option<OverlayCallback>,
    closing_since: Option<Instant>,
}

impl<C> OverlayRecord<C> {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn content(&self) -> &C {
        &self.content
    }

    pub fn content_mut(&mut self) -> &mut C {
        &mut self.content
    }

    pub fn size(&self) -> (u16, u16) {
        (self.width, self.height)
    }

    pub fn position(&self) -> Point {
        self.position
    }

    pub fn z(&self) -> u64 {
        self.z
    }

    pub fn state(&self) -> OverlayState {
        self.state
    }

    pub fn module(&self) -> &str {
        &self.module
    }
}

/// Canonical map of overlay id → record. Owns the z counter, enforces the
/// concurrency ceiling and keeps the active/inactive bookkeeping honest.
///
/// All transitions are synchronous and free of rendering side effects, so the
/// whole state machine is exercisable without a terminal.
pub struct OverlayRegistry<C> {
    overlays: BTreeMap<String, OverlayRecord<C>>,
    next_z: u64,
    viewport: Viewport,
    options: OverlayOptions,
    scroll_locked: bool,
    scroll_lock_dirty: bool,
}

impl<C> OverlayRegistry<C> {
    pub fn new(options: OverlayOptions) -> Self {
        Self {
            overlays: BTreeMap::new(),
            next_z: 0,
            viewport: Viewport::default(),
            options,
            scroll_locked: false,
            scroll_lock_dirty: false,
        }
    }

    pub fn options(&self) -> &OverlayOptions {
        &self.options
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    /// Update the clamp area. Existing overlays are pulled back inside so a
    /// shrinking viewport cannot strand a header out of reach.
    pub fn set_viewport(&mut self, viewport: Viewport) {
        if self.viewport == viewport {
            return;
        }
        self.viewport = viewport;
        let min_visible = self.options.min_visible;
        for record in self.overlays.values_mut() {
            record.position = clamp_position(record.position, record.width, viewport, min_visible);
        }
    }

    pub fn len(&self) -> usize {
        self.overlays.len()
    }

    pub fn is_empty(&self) -> bool {
        self.overlays.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.overlays.contains_key(id)
    }

    pub fn get(&self, id: &str) -> Option<&OverlayRecord<C>> {
        self.overlays.get(id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut OverlayRecord<C>> {
        self.overlays.get_mut(id)
    }

    pub fn state_of(&self, id: &str) -> Option<OverlayState> {
        self.overlays.get(id).map(|record| record.state)
    }

    pub fn position_of(&self, id: &str) -> Option<Point> {
        self.overlays.get(id).map(|record| record.position)
    }

    /// Admit a new overlay or raise an existing one.
    ///
    /// `remembered` is the position-store lookup result; without one the
    /// overlay lands on the cascade default. The record is created in
    /// `Opening`; callers promote it with [`OverlayRegistry::bring_to_front`]
    /// once mounted.
    pub fn admit(&mut self, config: OverlayConfig<C>, remembered: Option<Point>) -> OpenOutcome {
        if config.id.is_empty() {
            tracing::error!("overlay config has no id; open request dropped");
            return OpenOutcome::RejectedInvalid;
        }
        if self.overlays.contains_key(&config.id) {
            tracing::debug!(overlay_id = %config.id, "already tracked; raising instead");
            self.bring_to_front(&config.id);
            return OpenOutcome::RaisedExisting;
        }
        if self.overlays.len() >= self.options.max_concurrent {
            tracing::debug!(
                overlay_id = %config.id,
                limit = self.options.max_concurrent,
                "overlay limit reached; open request rejected"
            );
            return OpenOutcome::RejectedCapacity;
        }

        let width = config.width.unwrap_or(self.options.default_width).max(1);
        let height = config.height.unwrap_or(self.options.default_height).max(1);
        let position = remembered
            .unwrap_or_else(|| self.cascade_position(self.overlays.len(), width, height));
        let position = clamp_position(position, width, self.viewport, self.options.min_visible);

        let record = OverlayRecord {
            id: config.id.clone(),
            title: config.title,
            content: config.content,
            width,
            height,
            position,
            z: self.bump_z(),
            state: OverlayState::Opening,
            module: config.module,
            on_close: config.on_close,
            on_save: config.on_save,
            closing_since: None,
        };
        tracing::debug!(overlay_id = %record.id, x = position.x, y = position.y, "overlay admitted");
        self.overlays.insert(config.id, record);
        self.update_scroll_lock();
        OpenOutcome::Opened
    }

    /// Raise `id`: fresh z value, every other open overlay demoted to
    /// inactive, the target active. Minimized targets are restored in the
    /// same motion; closing and untracked ids are ignored.
    pub fn bring_to_front(&mut self, id: &str) {
        match self.overlays.get(id).map(|record| record.state) {
            None | Some(OverlayState::Closing) => return,
            _ => {}
        }
        let z = self.bump_z();
        for (key, record) in self.overlays.iter_mut() {
            if key == id {
                record.z = z;
                record.state = OverlayState::Active;
            } else if record.state == OverlayState::Active {
                record.state = OverlayState::Inactive;
            }
        }
    }

    /// `Active`/`Inactive` → `Minimized`. The record keeps its concurrency
    /// slot. Returns false when the transition does not apply.
    pub fn minimize(&mut self, id: &str) -> bool {
        let Some(record) = self.overlays.get_mut(id) else {
            return false;
        };
        if !record.state.is_open() && record.state != OverlayState::Opening {
            return false;
        }
        let was_active = record.state == OverlayState::Active;
        record.state = OverlayState::Minimized;
        tracing::debug!(overlay_id = %id, "overlay minimized");
        if was_active {
            self.promote_fallback();
        }
        true
    }

    /// `Minimized` → `Active` via a raise. Returns false otherwise.
    pub fn restore(&mut self, id: &str) -> bool {
        if self.state_of(id) != Some(OverlayState::Minimized) {
            return false;
        }
        self.bring_to_front(id);
        true
    }

    /// First phase of closing: run `on_close`, enter the exit animation.
    /// Idempotent: a second call while the animation runs is a no-op, as is
    /// closing an untracked id. Returns true when the transition happened.
    pub fn begin_close(&mut self, id: &str, now: Instant) -> bool {
        let Some(record) = self.overlays.get_mut(id) else {
            return false;
        };
        if record.state == OverlayState::Closing {
            return false;
        }
        run_callback(id, "on_close", &mut record.on_close);
        let was_active = record.state == OverlayState::Active;
        record.state = OverlayState::Closing;
        record.closing_since = Some(now);
        tracing::debug!(overlay_id = %id, "overlay closing");
        if was_active {
            self.promote_fallback();
        }
        true
    }

    /// Second phase: delete records whose exit animation has run its course,
    /// freeing their slots. Returns the removed ids.
    pub fn finalize_expired(&mut self, now: Instant) -> Vec<String> {
        let animation = self.options.close_animation;
        let expired: Vec<String> = self
            .overlays
            .values()
            .filter(|record| {
                record
                    .closing_since
                    .is_some_and(|since| now.duration_since(since) >= animation)
            })
            .map(|record| record.id.clone())
            .collect();
        for id in &expired {
            self.overlays.remove(id);
            tracing::debug!(overlay_id = %id, "overlay removed");
        }
        if !expired.is_empty() {
            self.update_scroll_lock();
        }
        expired
    }

    /// Begin closing every tracked overlay. Order is unspecified; each id
    /// follows the single-id close contract.
    pub fn close_all(&mut self, now: Instant) {
        let ids: Vec<String> = self.overlays.keys().cloned().collect();
        for id in ids {
            self.begin_close(&id, now);
        }
    }

    /// The overlay currently holding the active state, if any.
    pub fn active(&self) -> Option<&str> {
        self.overlays
            .values()
            .find(|record| record.state == OverlayState::Active)
            .map(|record| record.id.as_str())
    }

    /// The open overlay with the greatest z, if any. Minimized and closing
    /// records are not candidates.
    pub fn topmost_open(&self) -> Option<&str> {
        self.overlays
            .values()
            .filter(|record| record.state.is_open())
            .max_by_key(|record| record.z)
            .map(|record| record.id.as_str())
    }

    /// Topmost non-minimized, non-closing overlay under a screen cell.
    pub fn topmost_at(&self, column: u16, row: u16) -> Option<&OverlayRecord<C>> {
        self.overlays
            .values()
            .filter(|record| record.state.is_open() || record.state == OverlayState::Opening)
            .filter(|record| {
                super::overlay_contains(record.position, record.width, record.height, column, row)
            })
            .max_by_key(|record| record.z)
    }

    /// Ids of everything that paints, bottom-to-top. Closing overlays are
    /// included so the exit animation can render; minimized ones are not.
    pub fn draw_order(&self) -> Vec<String> {
        let mut visible: Vec<(u64, &str)> = self
            .overlays
            .values()
            .filter(|record| record.state != OverlayState::Minimized)
            .map(|record| (record.z, record.id.as_str()))
            .collect();
        visible.sort_by_key(|(z, _)| *z);
        visible.into_iter().map(|(_, id)| id.to_string()).collect()
    }

    pub fn update_title(&mut self, id: &str, title: impl Into<String>) -> bool {
        let Some(record) = self.overlays.get_mut(id) else {
            return false;
        };
        record.title = title.into();
        true
    }

    pub fn update_content(&mut self, id: &str, content: C) -> bool {
        let Some(record) = self.overlays.get_mut(id) else {
            return false;
        };
        record.content = content;
        true
    }

    /// Fire the caller's `on_save` callback, once.
    pub fn request_save(&mut self, id: &str) -> bool {
        let Some(record) = self.overlays.get_mut(id) else {
            return false;
        };
        run_callback(id, "on_save", &mut record.on_save);
        true
    }

    /// Move an overlay; used by the drag path with pre-clamped positions.
    pub fn set_position(&mut self, id: &str, position: Point) -> bool {
        let Some(record) = self.overlays.get_mut(id) else {
            return false;
        };
        record.position = position;
        true
    }

    /// Whether the host should suspend its background scrolling. Locked
    /// whenever at least one overlay is tracked.
    pub fn scroll_locked(&self) -> bool {
        self.scroll_locked
    }

    /// Drain the lock-state change since the last call, if any.
    pub fn take_scroll_lock_change(&mut self) -> Option<bool> {
        if self.scroll_lock_dirty {
            self.scroll_lock_dirty = false;
            Some(self.scroll_locked)
        } else {
            None
        }
    }

    fn bump_z(&mut self) -> u64 {
        self.next_z += 1;
        self.next_z
    }

    // After the active overlay minimizes or starts closing, the highest open
    // overlay takes over so "exactly one active while any are open" holds.
    fn promote_fallback(&mut self) {
        let fallback = self
            .overlays
            .values()
            .filter(|record| record.state.is_open())
            .max_by_key(|record| record.z)
            .map(|record| record.id.clone());
        if let Some(id) = fallback
            && let Some(record) = self.overlays.get_mut(&id)
        {
            record.state = OverlayState::Active;
        }
    }

    fn cascade_position(&self, index: usize, width: u16, height: u16) -> Point {
        let anchor_x = (i32::from(self.viewport.width) - i32::from(width)) / 2;
        let anchor_y = (i32::from(self.viewport.height) - i32::from(height)) / 2;
        let offset = self.options.cascade_step * index as i32;
        Point::new(anchor_x + offset, anchor_y.max(0) + offset)
    }

    fn update_scroll_lock(&mut self) {
        let locked = !self.overlays.is_empty();
        if locked != self.scroll_locked {
            self.scroll_locked = locked;
            self.scroll_lock_dirty = true;
        }
    }
}

fn run_callback(id: &str, kind: &str, slot: &mut Option<OverlayCallback>) {
    // One-shot: the callback is consumed even if it panics.
    let Some(mut callback) = slot.take() else {
        return;
    };
    if panic::catch_unwind(AssertUnwindSafe(|| callback())).is_err() {
        tracing::error!(overlay_id = %id, callback = kind, "overlay callback panicked");
    }
}
