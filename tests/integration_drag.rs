use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use std::time::Duration;

use crossterm::event::{Event, KeyModifiers, MouseButton, MouseEvent, MouseEventKind};
use ratatui::layout::Rect;

use overlay_wm::{
    JsonPositionStore, OverlayConfig, OverlayManager, OverlayOptions, Point, PositionStore,
};

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

fn mouse(kind: MouseEventKind, column: u16, row: u16) -> Event {
    Event::Mouse(MouseEvent {
        kind,
        column,
        row,
        modifiers: KeyModifiers::NONE,
    })
}

#[derive(Default)]
struct CountingStore {
    preload: HashMap<String, Point>,
    saves: Rc<RefCell<Vec<(String, Point)>>>,
}

impl PositionStore for CountingStore {
    fn load(&self, id: &str) -> Option<Point> {
        self.preload.get(id).copied()
    }

    fn save(&mut self, id: &str, position: Point) {
        self.saves.borrow_mut().push((id.to_string(), position));
    }
}

#[test]
fn hundred_moves_one_release_one_write() {
    let saves = Rc::new(RefCell::new(Vec::new()));
    let store = CountingStore {
        preload: [("panel".to_string(), Point::new(10, 5))].into_iter().collect(),
        saves: Rc::clone(&saves),
    };
    let mut manager: OverlayManager<String> = OverlayManager::new(options(), Box::new(store));
    manager.begin_frame(Rect::new(0, 0, 80, 24));
    manager.open(OverlayConfig::new("panel", String::from("body")));

    // Grab the header one cell below the top border.
    assert!(manager.handle_event(&mouse(MouseEventKind::Down(MouseButton::Left), 12, 6)));
    for step in 0..100u16 {
        manager.handle_event(&mouse(
            MouseEventKind::Drag(MouseButton::Left),
            12 + (step % 10),
            6,
        ));
        if step % 10 == 0 {
            manager.begin_frame(Rect::new(0, 0, 80, 24));
        }
    }
    assert!(saves.borrow().is_empty());

    assert!(manager.handle_event(&mouse(MouseEventKind::Up(MouseButton::Left), 40, 12)));
    let recorded = saves.borrow();
    assert_eq!(recorded.len(), 1);
    assert_eq!(recorded[0], ("panel".to_string(), Point::new(38, 11)));
}

#[test]
fn drag_positions_are_clamped_at_every_edge() {
    let store = CountingStore {
        preload: [("panel".to_string(), Point::new(30, 10))].into_iter().collect(),
        saves: Rc::default(),
    };
    let mut manager: OverlayManager<String> = OverlayManager::new(options(), Box::new(store));
    manager.begin_frame(Rect::new(0, 0, 80, 24));
    manager.open(OverlayConfig::new("panel", String::from("body")));

    // Far beyond the top-left corner.
    assert!(manager.handle_event(&mouse(MouseEventKind::Down(MouseButton::Left), 32, 11)));
    manager.handle_event(&mouse(MouseEventKind::Drag(MouseButton::Left), 0, 0));
    manager.begin_frame(Rect::new(0, 0, 80, 24));
    // width 20 with a 2-cell margin: x floors at -(20 - 2), y at 0.
    assert_eq!(manager.position_of("panel"), Some(Point::new(-2, 0)));

    manager.handle_event(&mouse(MouseEventKind::Up(MouseButton::Left), 90, 40));
    // Bottom-right release clamps to viewport minus margin.
    assert_eq!(manager.position_of("panel"), Some(Point::new(78, 22)));
}

#[test]
fn committed_position_survives_a_new_session() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("positions.json");

    {
        let store = JsonPositionStore::open(&path);
        let mut manager: OverlayManager<String> = OverlayManager::new(options(), Box::new(store));
        manager.begin_frame(Rect::new(0, 0, 80, 24));
        manager.open(OverlayConfig::new("panel", String::from("body")));
        let origin = manager.position_of("panel").unwrap();

        let header = ((origin.x + 2) as u16, (origin.y + 1) as u16);
        assert!(manager.handle_event(&mouse(
            MouseEventKind::Down(MouseButton::Left),
            header.0,
            header.1
        )));
        manager.handle_event(&mouse(
            MouseEventKind::Drag(MouseButton::Left),
            header.0 + 7,
            header.1 + 3,
        ));
        manager.begin_frame(Rect::new(0, 0, 80, 24));
        manager.handle_event(&mouse(
            MouseEventKind::Up(MouseButton::Left),
            header.0 + 7,
            header.1 + 3,
        ));
        assert_eq!(
            manager.position_of("panel"),
            Some(Point::new(origin.x + 7, origin.y + 3))
        );
    }

    // A fresh manager over the same file reuses the committed position.
    let store = JsonPositionStore::open(&path);
    let mut manager: OverlayManager<String> = OverlayManager::new(options(), Box::new(store));
    manager.begin_frame(Rect::new(0, 0, 80, 24));
    manager.open(OverlayConfig::new("panel", String::from("body")));
    let reopened = manager.position_of("panel").unwrap();
    let cascade_anchor = Point::new((80 - 20) / 2, (24 - 10) / 2);
    assert_eq!(
        reopened,
        Point::new(cascade_anchor.x + 7, cascade_anchor.y + 3)
    );
}

#[test]
fn dragging_needs_the_header_not_the_body() {
    let store = CountingStore {
        preload: [("panel".to_string(), Point::new(10, 5))].into_iter().collect(),
        saves: Rc::default(),
    };
    let mut manager: OverlayManager<String> = OverlayManager::new(options(), Box::new(store));
    manager.begin_frame(Rect::new(0, 0, 80, 24));
    manager.open(OverlayConfig::new("panel", String::from("body")));

    // Body click raises but does not start a drag.
    assert!(manager.handle_event(&mouse(MouseEventKind::Down(MouseButton::Left), 15, 9)));
    assert!(!manager.is_dragging());

    // Subsequent drag events are not consumed and move nothing.
    assert!(!manager.handle_event(&mouse(MouseEventKind::Drag(MouseButton::Left), 40, 12)));
    manager.begin_frame(Rect::new(0, 0, 80, 24));
    assert_eq!(manager.position_of("panel"), Some(Point::new(10, 5)));
}
