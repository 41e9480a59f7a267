use ratatui::layout::Rect;
use ratatui::style::{Modifier, Style};

use crate::theme;
use crate::ui::UiFrame;

/// What a pointer-down on overlay chrome means.
///
/// The title text region deliberately maps to `None`: clicking the title
/// raises the overlay but does not start a drag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderAction {
    None,
    Drag,
    Minimize,
    Close,
}

/// Paints overlay chrome and classifies header hits.
///
/// Chrome layout: top border row, header row (title centered, minimize and
/// close controls right-aligned), content, bottom border row. The content
/// area is what remains inside.
pub trait OverlayDecorator: std::fmt::Debug {
    fn render_chrome(
        &self,
        frame: &mut UiFrame<'_>,
        rect: Rect,
        title: &str,
        focused: bool,
        closing: bool,
    );

    /// Classify a cell relative to an overlay occupying `rect`. Cells outside
    /// the header row are `None`.
    fn hit_test(&self, rect: Rect, title: &str, column: u16, row: u16) -> HeaderAction;

    fn content_area(&self, rect: Rect) -> Rect;
}

const MINIMIZE_CONTROL: &str = "[_]";
const CLOSE_CONTROL: &str = "[x]";

#[derive(Debug)]
pub struct DefaultDecorator;

impl DefaultDecorator {
    fn header_row(rect: Rect) -> u16 {
        rect.y.saturating_add(1)
    }

    // Controls sit flush against the right border: "[_][x]│".
    fn control_origin(rect: Rect) -> u16 {
        rect.x
            .saturating_add(rect.width)
            .saturating_sub(1)
            .saturating_sub((MINIMIZE_CONTROL.len() + CLOSE_CONTROL.len()) as u16)
    }

    fn title_span(rect: Rect, title: &str) -> Option<(u16, u16)> {
        if title.is_empty() {
            return None;
        }
        let inner_left = rect.x.saturating_add(1);
        let inner_width = rect.width.saturating_sub(2);
        let title_len = (title.chars().count() as u16).min(inner_width);
        if title_len == 0 {
            return None;
        }
        let start = inner_left + (inner_width - title_len) / 2;
        Some((start, title_len))
    }
}

impl OverlayDecorator for DefaultDecorator {
    fn render_chrome(
        &self,
        frame: &mut UiFrame<'_>,
        rect: Rect,
        title: &str,
        focused: bool,
        closing: bool,
    ) {
        if rect.width < 3 || rect.height < 3 {
            return;
        }
        let header_style = if focused {
            Style::default()
                .bg(theme::header_active_bg())
                .fg(theme::header_active_fg())
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default()
                .bg(theme::header_inactive_bg())
                .fg(theme::header_inactive_fg())
        };
        let border_style = Style::default().fg(theme::border());
        let dim = Style::default().add_modifier(Modifier::DIM);

        let right = rect.x + rect.width - 1;
        let bottom = rect.y + rect.height - 1;
        let header_y = Self::header_row(rect);
        let buffer = frame.buffer_mut();
        let bounds = buffer.area;

        let mut put = |x: u16, y: u16, symbol: &str, style: Style| {
            if x < bounds.x
                || x >= bounds.x + bounds.width
                || y < bounds.y
                || y >= bounds.y + bounds.height
            {
                return;
            }
            if let Some(cell) = buffer.cell_mut((x, y)) {
                cell.set_symbol(symbol);
                cell.set_style(if closing { style.patch(dim) } else { style });
            }
        };

        for x in rect.x..=right {
            let (top_symbol, bottom_symbol) = if x == rect.x {
                ("┌", "└")
            } else if x == right {
                ("┐", "┘")
            } else {
                ("─", "─")
            };
            put(x, rect.y, top_symbol, border_style);
            put(x, bottom, bottom_symbol, border_style);
        }
        for y in rect.y + 1..bottom {
            put(rect.x, y, "│", border_style);
            put(right, y, "│", border_style);
        }

        for x in rect.x + 1..right {
            put(x, header_y, " ", header_style);
        }
        if let Some((start, len)) = Self::title_span(rect, title) {
            for (idx, ch) in title.chars().take(len as usize).enumerate() {
                put(start + idx as u16, header_y, &ch.to_string(), header_style);
            }
        }
        let controls = Self::control_origin(rect);
        for (idx, ch) in MINIMIZE_CONTROL.chars().chain(CLOSE_CONTROL.chars()).enumerate() {
            put(controls + idx as u16, header_y, &ch.to_string(), header_style);
        }
    }

    fn hit_test(&self, rect: Rect, title: &str, column: u16, row: u16) -> HeaderAction {
        if rect.width < 3 || rect.height < 3 {
            return HeaderAction::None;
        }
        if row != Self::header_row(rect) {
            return HeaderAction::None;
        }
        let inner_left = rect.x.saturating_add(1);
        let inner_right = rect.x + rect.width - 1;
        if column < inner_left || column >= inner_right {
            return HeaderAction::None;
        }
        let controls = Self::control_origin(rect);
        let control_len = MINIMIZE_CONTROL.len() as u16;
        if column >= controls && column < controls + control_len {
            return HeaderAction::Minimize;
        }
        if column >= controls + control_len && column < controls + 2 * control_len {
            return HeaderAction::Close;
        }
        if let Some((start, len)) = Self::title_span(rect, title)
            && column >= start
            && column < start + len
        {
            return HeaderAction::None;
        }
        HeaderAction::Drag
    }

    fn content_area(&self, rect: Rect) -> Rect {
        if rect.width < 3 || rect.height < 4 {
            return Rect::default();
        }
        Rect {
            x: rect.x + 1,
            y: rect.y + 2,
            width: rect.width - 2,
            height: rect.height - 3,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RECT: Rect = Rect {
        x: 0,
        y: 0,
        width: 30,
        height: 10,
    };

    #[test]
    fn header_row_classifies_drag_and_controls() {
        let decorator = DefaultDecorator;
        // Inside the header, away from title and controls.
        assert_eq!(decorator.hit_test(RECT, "", 2, 1), HeaderAction::Drag);
        // Controls occupy the last six inner cells: [_][x] then the border.
        assert_eq!(decorator.hit_test(RECT, "", 23, 1), HeaderAction::Minimize);
        assert_eq!(decorator.hit_test(RECT, "", 26, 1), HeaderAction::Close);
        // Outside the header row.
        assert_eq!(decorator.hit_test(RECT, "", 2, 2), HeaderAction::None);
        // Border cells never drag.
        assert_eq!(decorator.hit_test(RECT, "", 0, 1), HeaderAction::None);
    }

    #[test]
    fn title_cells_do_not_start_a_drag() {
        let decorator = DefaultDecorator;
        let title = "Hello";
        let (start, len) = DefaultDecorator::title_span(RECT, title).unwrap();
        for offset in 0..len {
            assert_eq!(
                decorator.hit_test(RECT, title, start + offset, 1),
                HeaderAction::None
            );
        }
        assert_eq!(decorator.hit_test(RECT, title, start - 1, 1), HeaderAction::Drag);
    }

    #[test]
    fn content_area_excludes_chrome() {
        let decorator = DefaultDecorator;
        let inner = decorator.content_area(RECT);
        assert_eq!(inner, Rect { x: 1, y: 2, width: 28, height: 7 });
        assert_eq!(decorator.content_area(Rect { x: 0, y: 0, width: 2, height: 2 }), Rect::default());
    }
}
