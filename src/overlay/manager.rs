use std::sync::Arc;
use std::time::Instant;

use crossterm::event::{Event, KeyCode, KeyEventKind, MouseEvent, MouseEventKind};
use ratatui::Frame;
use ratatui::buffer::Buffer;
use ratatui::layout::Rect;

use super::decorator::{DefaultDecorator, HeaderAction, OverlayDecorator};
use super::dock::MinimizedDock;
use super::drag::DragController;
use super::registry::{OpenOutcome, OverlayRegistry};
use super::{OverlayConfig, OverlayContent, OverlayOptions, OverlayState, Point, Viewport};
use crate::notify::{LogNotifier, NotificationSink};
use crate::store::PositionStore;
use crate::ui::UiFrame;

/// The compositor facade.
///
/// Owns the registry, dock, drag controller, position store and notification
/// sink, and binds them to crossterm input and ratatui output. Hosts drive it
/// with three calls per tick: [`OverlayManager::handle_event`] for each input
/// event, then [`OverlayManager::begin_frame`] and [`OverlayManager::render`]
/// inside the draw pass.
///
/// One value per host UI; pass it by reference to whichever modules need to
/// open overlays instead of reaching for a global.
pub struct OverlayManager<C> {
    registry: OverlayRegistry<C>,
    dock: MinimizedDock,
    drag: DragController,
    store: Box<dyn PositionStore>,
    notifier: Box<dyn NotificationSink>,
    decorator: Arc<dyn OverlayDecorator>,
    refresh_hook: Option<Box<dyn FnMut(&str)>>,
    area: Rect,
}

impl<C> OverlayManager<C> {
    pub fn new(options: OverlayOptions, store: Box<dyn PositionStore>) -> Self {
        Self {
            registry: OverlayRegistry::new(options),
            dock: MinimizedDock::new(),
            drag: DragController::new(),
            store,
            notifier: Box::new(LogNotifier),
            decorator: Arc::new(DefaultDecorator),
            refresh_hook: None,
            area: Rect::default(),
        }
    }

    pub fn with_notifier(mut self, sink: impl NotificationSink + 'static) -> Self {
        self.notifier = Box::new(sink);
        self
    }

    pub fn with_decorator(mut self, decorator: Arc<dyn OverlayDecorator>) -> Self {
        self.decorator = decorator;
        self
    }

    /// Best-effort hook invoked with the overlay id after every content or
    /// title swap; hosts that post-process freshly mounted payloads (icon
    /// passes and the like) register here. Absence is fine.
    pub fn set_refresh_hook(&mut self, hook: impl FnMut(&str) + 'static) {
        self.refresh_hook = Some(Box::new(hook));
    }

    pub fn options(&self) -> &OverlayOptions {
        self.registry.options()
    }

    pub fn len(&self) -> usize {
        self.registry.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registry.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.registry.contains(id)
    }

    pub fn state_of(&self, id: &str) -> Option<OverlayState> {
        self.registry.state_of(id)
    }

    pub fn position_of(&self, id: &str) -> Option<Point> {
        self.registry.position_of(id)
    }

    /// Id of the overlay holding the active state, if any.
    pub fn active_id(&self) -> Option<&str> {
        self.registry.active()
    }

    pub fn is_dragging(&self) -> bool {
        self.drag.is_dragging()
    }

    /// Whether the host should suspend background scrolling (and text
    /// selection during drags).
    pub fn scroll_locked(&self) -> bool {
        self.registry.scroll_locked()
    }

    pub fn take_scroll_lock_change(&mut self) -> Option<bool> {
        self.registry.take_scroll_lock_change()
    }

    pub fn dock(&self) -> &crate::overlay::dock::MinimizedDock {
        &self.dock
    }

    /// Admit a new overlay or raise the existing one with the same id.
    /// Capacity rejections surface through the notification sink only.
    pub fn open(&mut self, config: OverlayConfig<C>) -> OpenOutcome {
        let id = config.id.clone();
        let remembered = if id.is_empty() {
            None
        } else {
            self.store.load(&id)
        };
        let outcome = self.registry.admit(config, remembered);
        match outcome {
            OpenOutcome::Opened => {
                // Opening → Active happens through the regular raise path.
                self.registry.bring_to_front(&id);
            }
            OpenOutcome::RaisedExisting => {
                // The raise restored a minimized overlay; drop its dock entry.
                self.dock.remove(&id);
            }
            OpenOutcome::RejectedCapacity => {
                let message = format!(
                    "Overlay limit reached ({}); close one before opening another.",
                    self.registry.options().max_concurrent
                );
                self.notifier.warn(&message);
            }
            OpenOutcome::RejectedInvalid => {}
        }
        outcome
    }

    /// Begin closing `id`: dock entry removed first, `on_close` fired, exit
    /// animation started. The record disappears once the animation has run.
    pub fn close(&mut self, id: &str) {
        if self.drag.dragging_id() == Some(id) {
            self.drag.cancel();
        }
        self.dock.remove(id);
        self.registry.begin_close(id, Instant::now());
    }

    pub fn close_all(&mut self) {
        let ids: Vec<String> = self.registry.draw_order();
        for id in ids {
            self.close(&id);
        }
        // Minimized overlays are not in the draw order but close all the same.
        let minimized: Vec<String> = self
            .dock
            .entries()
            .iter()
            .map(|entry| entry.id().to_string())
            .collect();
        for id in minimized {
            self.close(&id);
        }
    }

    /// Close the overlay with the greatest z among the open ones. No-op when
    /// everything is minimized, closing or absent. Bound to Esc.
    pub fn close_topmost(&mut self) {
        if let Some(id) = self.registry.topmost_open().map(str::to_string) {
            self.close(&id);
        }
    }

    pub fn minimize(&mut self, id: &str) {
        if self.registry.minimize(id) {
            let title = self
                .registry
                .get(id)
                .map(|record| record.title().to_string())
                .unwrap_or_default();
            self.dock.add(id, title);
        }
    }

    pub fn restore(&mut self, id: &str) {
        if self.registry.restore(id) {
            self.dock.remove(id);
        }
    }

    pub fn bring_to_front(&mut self, id: &str) {
        let was_minimized = self.registry.state_of(id) == Some(OverlayState::Minimized);
        self.registry.bring_to_front(id);
        if was_minimized {
            self.dock.remove(id);
        }
    }

    pub fn update_title(&mut self, id: &str, title: impl Into<String>) {
        let title = title.into();
        if self.registry.update_title(id, title.clone()) {
            self.dock.rename(id, title);
            self.run_refresh_hook(id);
        }
    }

    pub fn update_content(&mut self, id: &str, content: C) {
        if self.registry.update_content(id, content) {
            self.run_refresh_hook(id);
        }
    }

    /// Fire the caller's `on_save` callback for `id`, once.
    pub fn save(&mut self, id: &str) {
        self.registry.request_save(id);
    }

    /// Route one input event. Returns true when the compositor consumed it
    /// and the host must not act on it: the Esc that closes an overlay never
    /// doubles as the host's own cancel key.
    pub fn handle_event(&mut self, event: &Event) -> bool {
        match event {
            Event::Key(key) if key.code == KeyCode::Esc && key.kind == KeyEventKind::Press => {
                if self.registry.is_empty() {
                    return false;
                }
                self.close_topmost();
                true
            }
            Event::Mouse(mouse) => self.handle_mouse(event, *mouse),
            _ => false,
        }
    }

    /// Per-frame housekeeping: finalize expired closes, adopt the new frame
    /// area, apply at most one coalesced drag update. Call before
    /// [`OverlayManager::render`] in every draw pass.
    pub fn begin_frame(&mut self, area: Rect) {
        let now = Instant::now();
        for id in self.registry.finalize_expired(now) {
            self.dock.remove(&id);
            if self.drag.dragging_id() == Some(id.as_str()) {
                self.drag.cancel();
            }
        }
        self.area = area;
        self.registry.set_viewport(self.viewport());
        let min_visible = self.registry.options().min_visible;
        if let Some(update) = self.drag.take_frame_update(self.viewport(), min_visible) {
            self.registry.set_position(&update.id, update.position);
        }
    }

    // The clamp area: the frame minus the dock row while the dock shows.
    fn viewport(&self) -> Viewport {
        Viewport::new(
            self.area.width,
            self.area.height.saturating_sub(self.dock.height()),
        )
    }

    fn run_refresh_hook(&mut self, id: &str) {
        if let Some(hook) = self.refresh_hook.as_mut() {
            hook(id);
        }
    }

    fn handle_mouse(&mut self, event: &Event, mouse: MouseEvent) -> bool {
        match mouse.kind {
            MouseEventKind::Down(_) => {
                if let Some(id) = self.dock.hit_test(event).map(str::to_string) {
                    self.restore(&id);
                    return true;
                }
                let Some(record) = self.registry.topmost_at(mouse.column, mouse.row) else {
                    return false;
                };
                let id = record.id().to_string();
                let position = record.position();
                let (width, height) = record.size();
                // Hit-test in overlay-local coordinates so negative screen
                // origins stay out of the decorator's math.
                let local = Rect {
                    x: 0,
                    y: 0,
                    width,
                    height,
                };
                let column = (i32::from(mouse.column) - position.x).max(0) as u16;
                let row = (i32::from(mouse.row) - position.y).max(0) as u16;
                let action = self
                    .decorator
                    .hit_test(local, record.title(), column, row);
                match action {
                    HeaderAction::Minimize => self.minimize(&id),
                    HeaderAction::Close => self.close(&id),
                    HeaderAction::Drag => {
                        self.bring_to_front(&id);
                        let pointer = Point::new(i32::from(mouse.column), i32::from(mouse.row));
                        let origin = self
                            .registry
                            .position_of(&id)
                            .unwrap_or(position);
                        self.drag.begin(&id, pointer, origin, width);
                    }
                    HeaderAction::None => self.bring_to_front(&id),
                }
                true
            }
            MouseEventKind::Drag(_) => {
                if self.drag.is_dragging() {
                    self.drag
                        .update(Point::new(i32::from(mouse.column), i32::from(mouse.row)));
                    true
                } else {
                    false
                }
            }
            MouseEventKind::Up(_) => {
                let pointer = Point::new(i32::from(mouse.column), i32::from(mouse.row));
                let min_visible = self.registry.options().min_visible;
                if let Some(update) = self.drag.finish(pointer, self.viewport(), min_visible) {
                    self.registry.set_position(&update.id, update.position);
                    // The single write per drag; intermediate frames never
                    // touch the store.
                    self.store.save(&update.id, update.position);
                    true
                } else {
                    false
                }
            }
            MouseEventKind::ScrollUp
            | MouseEventKind::ScrollDown
            | MouseEventKind::ScrollLeft
            | MouseEventKind::ScrollRight => {
                // Background scroll stays suspended while overlays exist.
                self.registry.scroll_locked()
            }
            _ => false,
        }
    }
}

impl<C: OverlayContent> OverlayManager<C> {
    /// Paint overlays bottom-to-top by z, then the dock strip. Closing
    /// overlays render dimmed for the duration of the exit animation.
    pub fn render(&mut self, frame: &mut Frame) {
        let area = self.area;
        let buffer = frame.buffer_mut();
        let mut ui = UiFrame::from_parts(area, buffer);
        for id in self.registry.draw_order() {
            let Some(record) = self.registry.get_mut(&id) else {
                continue;
            };
            let (width, height) = record.size();
            let position = record.position();
            let state = record.state();
            let title = record.title().to_string();
            let focused = state == OverlayState::Active;
            let closing = state == OverlayState::Closing;

            let logical = Rect {
                x: 0,
                y: 0,
                width,
                height,
            };
            let mut offscreen = Buffer::empty(logical);
            let mut surface = UiFrame::from_parts(logical, &mut offscreen);
            self.decorator
                .render_chrome(&mut surface, logical, &title, focused, closing);
            let inner = self.decorator.content_area(logical);
            if inner.width > 0 && inner.height > 0 {
                record.content_mut().render(&mut surface, inner, focused);
            }
            ui.blit_from_signed(&offscreen, position, width, height);
        }
        if self.dock.height() > 0 {
            let dock_area = Rect {
                x: area.x,
                y: area.y + area.height.saturating_sub(1),
                width: area.width,
                height: 1,
            };
            self.dock.render(&mut ui, dock_area);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryStore, PositionStore};
    use std::cell::RefCell;
    use std::rc::Rc;
    use std::time::Duration;

    use crossterm::event::{KeyEvent, KeyModifiers, MouseButton};

    struct Body;

    impl OverlayContent for Body {
        fn render(&mut self, _frame: &mut UiFrame<'_>, _area: Rect, _focused: bool) {}
    }

    #[derive(Default)]
    struct CountingStore {
        saves: Rc<RefCell<Vec<(String, Point)>>>,
        preload: std::collections::HashMap<String, Point>,
    }

    impl PositionStore for CountingStore {
        fn load(&self, id: &str) -> Option<Point> {
            self.preload.get(id).copied()
        }

        fn save(&mut self, id: &str, position: Point) {
            self.saves.borrow_mut().push((id.to_string(), position));
        }
    }

    fn options() -> OverlayOptions {
        OverlayOptions {
            max_concurrent: 3,
            default_width: 20,
            default_height: 10,
            min_visible: 2,
            cascade_step: 2,
            close_animation: Duration::ZERO,
        }
    }

    fn manager() -> OverlayManager<Body> {
        let mut manager = OverlayManager::new(options(), Box::new(MemoryStore::new()));
        manager.begin_frame(Rect::new(0, 0, 80, 24));
        manager
    }

    fn esc() -> Event {
        Event::Key(KeyEvent::new(KeyCode::Esc, KeyModifiers::NONE))
    }

    fn mouse(kind: MouseEventKind, column: u16, row: u16) -> Event {
        Event::Mouse(MouseEvent {
            kind,
            column,
            row,
            modifiers: KeyModifiers::NONE,
        })
    }

    #[test]
    fn esc_closes_topmost_and_is_consumed() {
        let mut manager = manager();
        manager.open(OverlayConfig::new("a", Body));
        manager.open(OverlayConfig::new("b", Body));
        assert!(manager.handle_event(&esc()));
        assert_eq!(manager.state_of("b"), Some(OverlayState::Closing));
        assert_eq!(manager.state_of("a"), Some(OverlayState::Active));
    }

    #[test]
    fn esc_passes_through_when_nothing_is_tracked() {
        let mut manager = manager();
        assert!(!manager.handle_event(&esc()));
    }

    #[test]
    fn header_drag_commits_exactly_one_store_write() {
        let saves = Rc::new(RefCell::new(Vec::new()));
        let store = CountingStore {
            saves: Rc::clone(&saves),
            preload: [("a".to_string(), Point::new(10, 5))].into_iter().collect(),
        };
        let mut manager: OverlayManager<Body> = OverlayManager::new(options(), Box::new(store));
        manager.begin_frame(Rect::new(0, 0, 80, 24));
        manager.open(OverlayConfig::new("a", Body));
        assert_eq!(manager.position_of("a"), Some(Point::new(10, 5)));

        // Header row sits one cell below the top border.
        let down = mouse(MouseEventKind::Down(MouseButton::Left), 12, 6);
        assert!(manager.handle_event(&down));
        assert!(manager.is_dragging());
        for step in 0..100u16 {
            let drag = mouse(MouseEventKind::Drag(MouseButton::Left), 13 + (step % 5), 6);
            assert!(manager.handle_event(&drag));
        }
        manager.begin_frame(Rect::new(0, 0, 80, 24));
        let up = mouse(MouseEventKind::Up(MouseButton::Left), 30, 8);
        assert!(manager.handle_event(&up));

        assert!(!manager.is_dragging());
        assert_eq!(manager.position_of("a"), Some(Point::new(28, 7)));
        assert_eq!(saves.borrow().len(), 1);
        assert_eq!(saves.borrow()[0], ("a".to_string(), Point::new(28, 7)));
    }

    #[test]
    fn drag_clamps_against_left_edge() {
        let store = CountingStore {
            saves: Rc::default(),
            preload: [("a".to_string(), Point::new(10, 5))].into_iter().collect(),
        };
        let mut manager: OverlayManager<Body> = OverlayManager::new(options(), Box::new(store));
        manager.begin_frame(Rect::new(0, 0, 80, 24));
        manager.open(OverlayConfig::new("a", Body));

        assert!(manager.handle_event(&mouse(MouseEventKind::Down(MouseButton::Left), 12, 6)));
        assert!(manager.handle_event(&mouse(MouseEventKind::Drag(MouseButton::Left), 0, 0)));
        manager.begin_frame(Rect::new(0, 0, 80, 24));
        // width 20, min visible 2 → floor at -(20 - 2).
        assert_eq!(manager.position_of("a"), Some(Point::new(-2, 0)));
        assert!(manager.handle_event(&mouse(MouseEventKind::Up(MouseButton::Left), 0, 0)));
        assert_eq!(manager.position_of("a"), Some(Point::new(-2, 0)));
    }

    #[test]
    fn minimize_control_sends_overlay_to_dock() {
        let mut manager = manager();
        manager.open(OverlayConfig::new("a", Body).title("Alpha").size(20, 10));
        let origin = manager.position_of("a").unwrap();
        // Minimize control: six cells before the right border, header row.
        let column = (origin.x + 20 - 1 - 6) as u16;
        let row = (origin.y + 1) as u16;
        assert!(manager.handle_event(&mouse(MouseEventKind::Down(MouseButton::Left), column, row)));
        assert_eq!(manager.state_of("a"), Some(OverlayState::Minimized));
        assert_eq!(manager.dock().len(), 1);

        manager.restore("a");
        assert_eq!(manager.state_of("a"), Some(OverlayState::Active));
        assert!(manager.dock().is_empty());
    }

    #[test]
    fn capacity_rejection_warns_exactly_once() {
        let sink = Rc::new(RefCell::new(crate::notify::BufferedNotifier::new()));
        let mut manager: OverlayManager<Body> =
            OverlayManager::new(options(), Box::new(MemoryStore::new()))
                .with_notifier(Rc::clone(&sink));
        manager.begin_frame(Rect::new(0, 0, 80, 24));
        for id in ["a", "b", "c"] {
            assert_eq!(manager.open(OverlayConfig::new(id, Body)), OpenOutcome::Opened);
        }
        assert_eq!(
            manager.open(OverlayConfig::new("d", Body)),
            OpenOutcome::RejectedCapacity
        );
        assert_eq!(manager.len(), 3);
        assert_eq!(sink.borrow_mut().take_messages().len(), 1);
    }

    #[test]
    fn minimized_close_clears_dock_before_animation_ends() {
        let mut manager: OverlayManager<Body> = OverlayManager::new(
            OverlayOptions {
                close_animation: Duration::from_secs(60),
                ..options()
            },
            Box::new(MemoryStore::new()),
        );
        manager.begin_frame(Rect::new(0, 0, 80, 24));
        manager.open(OverlayConfig::new("a", Body).title("Alpha"));
        manager.minimize("a");
        assert_eq!(manager.dock().len(), 1);
        manager.close("a");
        // Dock entry gone immediately; the record lingers for the animation.
        assert!(manager.dock().is_empty());
        assert_eq!(manager.state_of("a"), Some(OverlayState::Closing));
        assert!(manager.scroll_locked());
    }

    #[test]
    fn finalized_close_releases_scroll_lock() {
        let mut manager = manager();
        manager.open(OverlayConfig::new("a", Body));
        assert_eq!(manager.take_scroll_lock_change(), Some(true));
        manager.close("a");
        // Zero-length animation: the next frame finalizes.
        manager.begin_frame(Rect::new(0, 0, 80, 24));
        assert!(manager.is_empty());
        assert_eq!(manager.take_scroll_lock_change(), Some(false));
    }

    #[test]
    fn update_title_refreshes_dock_label_and_hook() {
        let refreshed = Rc::new(RefCell::new(Vec::new()));
        let seen = Rc::clone(&refreshed);
        let mut manager = manager();
        manager.set_refresh_hook(move |id| seen.borrow_mut().push(id.to_string()));
        manager.open(OverlayConfig::new("a", Body).title("Old"));
        manager.minimize("a");
        manager.update_title("a", "New");
        assert_eq!(manager.dock().entries()[0].title(), "New");
        manager.update_content("a", Body);
        assert_eq!(*refreshed.borrow(), vec!["a".to_string(), "a".to_string()]);
    }

    #[test]
    fn wheel_events_are_swallowed_while_overlays_exist() {
        let mut manager = manager();
        assert!(!manager.handle_event(&mouse(MouseEventKind::ScrollDown, 5, 5)));
        manager.open(OverlayConfig::new("a", Body));
        assert!(manager.handle_event(&mouse(MouseEventKind::ScrollDown, 5, 5)));
    }

    #[test]
    fn dock_click_restores_overlay() {
        let mut manager = manager();
        manager.open(OverlayConfig::new("a", Body).title("Alpha"));
        manager.minimize("a");

        // Render once so the dock has hit rectangles.
        let backend = ratatui::backend::TestBackend::new(80, 24);
        let mut terminal = ratatui::Terminal::new(backend).unwrap();
        terminal
            .draw(|frame| {
                manager.begin_frame(frame.area());
                manager.render(frame);
            })
            .unwrap();

        assert!(manager.handle_event(&mouse(MouseEventKind::Down(MouseButton::Left), 1, 23)));
        assert_eq!(manager.state_of("a"), Some(OverlayState::Active));
    }
}
