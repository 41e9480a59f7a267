use ratatui::style::Color;

// Centralized theme colors. Kept as small helpers so hosts embedding the
// compositor can restyle by swapping this module in a fork.

// Overlay chrome
pub fn header_active_bg() -> Color {
    Color::Blue
}
pub fn header_active_fg() -> Color {
    Color::White
}
pub fn header_inactive_bg() -> Color {
    Color::DarkGray
}
pub fn header_inactive_fg() -> Color {
    Color::Gray
}
pub fn border() -> Color {
    Color::DarkGray
}

// Minimized dock
pub fn dock_bg() -> Color {
    Color::DarkGray
}
pub fn dock_fg() -> Color {
    Color::White
}
pub fn dock_entry_bg() -> Color {
    Color::Gray
}
pub fn dock_entry_fg() -> Color {
    Color::Black
}

// Host chrome used by the demo binary
pub fn host_bar_bg() -> Color {
    Color::DarkGray
}
pub fn host_bar_fg() -> Color {
    Color::White
}
pub fn warning_fg() -> Color {
    Color::Yellow
}
