use crossterm::event::{Event, MouseEventKind};
use ratatui::layout::Rect;
use ratatui::style::{Modifier, Style};

use crate::theme;
use crate::ui::{UiFrame, rect_contains, safe_set_string, truncate_to_width};

/// Projection of one minimized overlay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DockEntry {
    id: String,
    title: String,
}

impl DockEntry {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }
}

#[derive(Debug, Clone, Copy)]
struct DockHit {
    index: usize,
    rect: Rect,
}

/// Ordered strip of minimized overlays, appended in activation order.
///
/// Entries are few (bounded by the concurrency ceiling), so linear scans by
/// id are fine. The dock occupies no screen row while empty.
#[derive(Debug, Default)]
pub struct MinimizedDock {
    entries: Vec<DockEntry>,
    hits: Vec<DockHit>,
    area: Rect,
}

impl MinimizedDock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn entries(&self) -> &[DockEntry] {
        &self.entries
    }

    /// Strip area from the last render; empty until then.
    pub fn area(&self) -> Rect {
        self.area
    }

    /// Screen rows the dock wants: one when populated, none when empty.
    pub fn height(&self) -> u16 {
        if self.entries.is_empty() { 0 } else { 1 }
    }

    /// Append a projection; re-adding a present id is a no-op.
    pub fn add(&mut self, id: impl Into<String>, title: impl Into<String>) {
        let id = id.into();
        if self.entries.iter().any(|entry| entry.id == id) {
            return;
        }
        self.entries.push(DockEntry {
            id,
            title: title.into(),
        });
    }

    pub fn remove(&mut self, id: &str) -> bool {
        let before = self.entries.len();
        self.entries.retain(|entry| entry.id != id);
        self.entries.len() != before
    }

    /// Refresh a label in place, e.g. after `update_title` on a minimized
    /// overlay.
    pub fn rename(&mut self, id: &str, title: impl Into<String>) {
        if let Some(entry) = self.entries.iter_mut().find(|entry| entry.id == id) {
            entry.title = title.into();
        }
    }

    /// Paint the strip and rebuild the per-entry hit rectangles.
    pub fn render(&mut self, frame: &mut UiFrame<'_>, area: Rect) {
        self.hits.clear();
        self.area = area;
        if self.entries.is_empty() || area.width == 0 || area.height == 0 {
            return;
        }
        let buffer = frame.buffer_mut();
        let bounds = area.intersection(buffer.area);
        if bounds.width == 0 || bounds.height == 0 {
            return;
        }
        for x in bounds.x..bounds.x.saturating_add(bounds.width) {
            if let Some(cell) = buffer.cell_mut((x, area.y)) {
                cell.set_symbol(" ");
                cell.set_style(
                    Style::default()
                        .bg(theme::dock_bg())
                        .fg(theme::dock_fg()),
                );
            }
        }
        let mut x = area.x;
        let max_x = area.x.saturating_add(area.width);
        for (index, entry) in self.entries.iter().enumerate() {
            let mut label = entry.title.clone();
            if label.is_empty() {
                label = entry.id.clone();
            }
            let max_label = max_x.saturating_sub(x).saturating_sub(4) as usize;
            if label.chars().count() > max_label {
                label = truncate_to_width(&label, max_label);
            }
            let chunk = format!(" ▴ {label} ");
            let chunk_width = chunk.chars().count() as u16;
            if x.saturating_add(chunk_width) > max_x {
                break;
            }
            let style = Style::default()
                .bg(theme::dock_entry_bg())
                .fg(theme::dock_entry_fg())
                .add_modifier(Modifier::BOLD);
            safe_set_string(buffer, bounds, x, area.y, &chunk, style);
            self.hits.push(DockHit {
                index,
                rect: Rect {
                    x,
                    y: area.y,
                    width: chunk_width,
                    height: 1,
                },
            });
            x = x.saturating_add(chunk_width).saturating_add(1);
        }
    }

    /// Id under a mouse-down, using the rects from the last render.
    pub fn hit_test(&self, event: &Event) -> Option<&str> {
        let Event::Mouse(mouse) = event else {
            return None;
        };
        if !matches!(mouse.kind, MouseEventKind::Down(_)) {
            return None;
        }
        self.hits
            .iter()
            .find(|hit| rect_contains(hit.rect, mouse.column, mouse.row))
            .and_then(|hit| self.entries.get(hit.index))
            .map(|entry| entry.id.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::{KeyModifiers, MouseButton, MouseEvent};
    use ratatui::buffer::Buffer;

    fn click(column: u16, row: u16) -> Event {
        Event::Mouse(MouseEvent {
            kind: MouseEventKind::Down(MouseButton::Left),
            column,
            row,
            modifiers: KeyModifiers::NONE,
        })
    }

    #[test]
    fn entries_keep_activation_order() {
        let mut dock = MinimizedDock::new();
        dock.add("b", "Second");
        dock.add("a", "First");
        dock.add("b", "ignored duplicate");
        let ids: Vec<&str> = dock.entries().iter().map(|entry| entry.id()).collect();
        assert_eq!(ids, vec!["b", "a"]);
        assert!(dock.remove("b"));
        assert!(!dock.remove("b"));
        assert_eq!(dock.len(), 1);
    }

    #[test]
    fn rename_updates_label() {
        let mut dock = MinimizedDock::new();
        dock.add("a", "Old");
        dock.rename("a", "New");
        assert_eq!(dock.entries()[0].title(), "New");
    }

    #[test]
    fn empty_dock_claims_no_rows() {
        let mut dock = MinimizedDock::new();
        assert_eq!(dock.height(), 0);
        dock.add("a", "A");
        assert_eq!(dock.height(), 1);
    }

    #[test]
    fn hit_test_resolves_rendered_entry() {
        let area = Rect {
            x: 0,
            y: 0,
            width: 40,
            height: 1,
        };
        let mut buf = Buffer::empty(area);
        let mut frame = UiFrame::from_parts(area, &mut buf);
        let mut dock = MinimizedDock::new();
        dock.add("a", "Alpha");
        dock.add("b", "Beta");
        dock.render(&mut frame, area);

        assert_eq!(dock.hit_test(&click(1, 0)), Some("a"));
        // " ▴ Alpha " is 9 cells wide plus a 1-cell gap.
        assert_eq!(dock.hit_test(&click(11, 0)), Some("b"));
        assert_eq!(dock.hit_test(&click(39, 0)), None);
        assert_eq!(dock.hit_test(&click(1, 1)), None);
    }
}
