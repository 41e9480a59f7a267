use std::cell::RefCell;
use std::io;
use std::path::PathBuf;
use std::rc::Rc;
use std::time::Duration;

use clap::Parser;
use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers, MouseEventKind};
use crossterm::terminal::{EnterAlternateScreen, LeaveAlternateScreen};
use crossterm::{execute, terminal};
use ratatui::backend::CrosstermBackend;
use ratatui::layout::Rect;
use ratatui::style::{Modifier, Style};
use ratatui::text::Text;
use ratatui::widgets::{Paragraph, Wrap};
use ratatui::{Frame, Terminal};

use overlay_wm::notify::BufferedNotifier;
use overlay_wm::ui::UiFrame;
use overlay_wm::{
    JsonPositionStore, MemoryStore, OverlayConfig, OverlayContent, OverlayManager, OverlayOptions,
    PositionStore, theme, tracing_sub,
};

#[derive(Parser, Debug)]
#[command(
    name = "overlay-wm",
    version = env!("CARGO_PKG_VERSION"),
    about = "Demo host for the overlay compositor"
)]
struct Cli {
    /// Where to persist overlay positions. Defaults to the per-user config
    /// directory; pass an explicit path to keep demo state elsewhere.
    #[arg(long = "store", value_name = "PATH")]
    store: Option<PathBuf>,

    /// Skip position persistence entirely.
    #[arg(long = "no-store", default_value_t = false)]
    no_store: bool,

    /// Maximum number of simultaneously tracked overlays.
    #[arg(long = "max", value_name = "N", default_value_t = 3)]
    max: usize,

    /// Append tracing output to this file instead of stderr.
    #[arg(long = "log-file", value_name = "PATH")]
    log_file: Option<PathBuf>,
}

fn main() -> io::Result<()> {
    let cli = Cli::parse();
    match &cli.log_file {
        Some(path) => tracing_sub::init_file(path)?,
        None => tracing_sub::init_default(),
    }

    let store: Box<dyn PositionStore> = if cli.no_store {
        Box::new(MemoryStore::new())
    } else {
        let path = cli
            .store
            .clone()
            .or_else(JsonPositionStore::default_path)
            .unwrap_or_else(|| PathBuf::from("positions.json"));
        Box::new(JsonPositionStore::open(path))
    };

    let mut app = App::new(cli.max, store);

    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, event::EnableMouseCapture)?;
    terminal::enable_raw_mode()?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run(&mut terminal, &mut app);

    terminal::disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        event::DisableMouseCapture,
        LeaveAlternateScreen
    )?;
    terminal.show_cursor()?;

    result
}

fn run<B: ratatui::backend::Backend<Error = io::Error>>(
    terminal: &mut Terminal<B>,
    app: &mut App,
) -> io::Result<()> {
    loop {
        terminal.draw(|frame| app.draw(frame))?;
        if event::poll(Duration::from_millis(16))? {
            // Drain the queue so mouse-drag bursts do not outrun rendering;
            // the compositor coalesces them to one position update per frame.
            loop {
                let evt = event::read()?;
                if app.handle_event(&evt) {
                    return Ok(());
                }
                if !event::poll(Duration::from_millis(0))? {
                    break;
                }
            }
        }
    }
}

/// Text payload rendered inside overlay panels.
struct PanelBody {
    text: String,
}

impl PanelBody {
    fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

impl OverlayContent for PanelBody {
    fn render(&mut self, frame: &mut UiFrame<'_>, area: Rect, focused: bool) {
        let style = if focused {
            Style::default()
        } else {
            Style::default().add_modifier(Modifier::DIM)
        };
        let paragraph = Paragraph::new(Text::from(self.text.as_str()))
            .style(style)
            .wrap(Wrap { trim: false });
        frame.render_widget(paragraph, area);
    }
}

struct App {
    overlays: OverlayManager<PanelBody>,
    warnings: Rc<RefCell<BufferedNotifier>>,
    status: String,
    scroll: u16,
    hostname: Option<String>,
}

const HOST_LINES: usize = 200;

impl App {
    fn new(max: usize, store: Box<dyn PositionStore>) -> Self {
        let warnings = Rc::new(RefCell::new(BufferedNotifier::new()));
        let options = OverlayOptions {
            max_concurrent: max,
            ..OverlayOptions::terminal_cells()
        };
        let overlays = OverlayManager::new(options, store).with_notifier(Rc::clone(&warnings));
        Self {
            overlays,
            warnings,
            status: String::from("1-4 open panels · m minimize · s save · Esc close top · q quit"),
            scroll: 0,
            hostname: None,
        }
    }

    /// Returns true when the app should exit.
    fn handle_event(&mut self, event: &Event) -> bool {
        if self.overlays.handle_event(event) {
            return false;
        }
        match event {
            Event::Key(key) if key.kind == KeyEventKind::Press => match key.code {
                KeyCode::Char('q') => return true,
                KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                    return true;
                }
                KeyCode::Char('1') => self.open_panel(
                    "inbox",
                    "Inbox",
                    "Three unread conversations.\n\nDrag this panel by its header; \
                     the position sticks across restarts.",
                ),
                KeyCode::Char('2') => self.open_panel(
                    "contacts",
                    "Contacts",
                    "Ada Lovelace\nGrace Hopper\nKatherine Johnson",
                ),
                KeyCode::Char('3') => self.open_panel(
                    "reports",
                    "Reports",
                    "Weekly summary pending.\nQuarterly figures ready for review.",
                ),
                KeyCode::Char('4') => self.open_panel(
                    "activity",
                    "Activity",
                    "Nothing new since you last looked.",
                ),
                KeyCode::Char('m') => {
                    if let Some(id) = self.overlays.active_id().map(str::to_string) {
                        self.overlays.minimize(&id);
                    }
                }
                KeyCode::Char('s') => {
                    if let Some(id) = self.overlays.active_id().map(str::to_string) {
                        self.overlays.save(&id);
                        self.status = format!("saved {id}");
                    }
                }
                _ => {}
            },
            Event::Mouse(mouse) => match mouse.kind {
                // Only reachable while no overlay is tracked; the compositor
                // consumes wheel events otherwise.
                MouseEventKind::ScrollDown => {
                    self.scroll = (self.scroll + 1).min(HOST_LINES as u16);
                }
                MouseEventKind::ScrollUp => {
                    self.scroll = self.scroll.saturating_sub(1);
                }
                _ => {}
            },
            _ => {}
        }
        false
    }

    fn open_panel(&mut self, id: &str, title: &str, body: &str) {
        let panel = id.to_string();
        self.overlays.open(
            OverlayConfig::new(id, PanelBody::new(body))
                .title(title)
                .module("demo")
                .on_save(move || {
                    tracing::info!(panel = %panel, "save requested");
                }),
        );
    }

    fn draw(&mut self, frame: &mut Frame) {
        let area = frame.area();
        if area.height < 2 {
            return;
        }
        let host = Rect {
            x: area.x,
            y: area.y,
            width: area.width,
            height: area.height - 1,
        };
        self.draw_host(frame, host);
        self.draw_host_bar(frame, Rect {
            x: area.x,
            y: area.y + area.height - 1,
            width: area.width,
            height: 1,
        });
        // Overlays paint above the host but below the bottom host bar.
        self.overlays.begin_frame(host);
        self.overlays.render(frame);
    }

    fn draw_host(&mut self, frame: &mut Frame, area: Rect) {
        let mut lines = Vec::with_capacity(HOST_LINES);
        lines.push(String::from("overlay-wm demo / host document"));
        lines.push(String::new());
        for index in 0..HOST_LINES {
            lines.push(format!(
                "{index:>4}  the host keeps scrolling with the wheel until a panel opens"
            ));
        }
        let paragraph = Paragraph::new(lines.join("\n")).scroll((self.scroll, 0));
        frame.render_widget(paragraph, area);
    }

    fn draw_host_bar(&mut self, frame: &mut Frame, area: Rect) {
        if area.width == 0 || area.height == 0 {
            return;
        }
        if let Some(warning) = self.warnings.borrow_mut().take_messages().pop() {
            self.status = warning;
        }
        let buffer = frame.buffer_mut();
        for x in area.x..area.x + area.width {
            if let Some(cell) = buffer.cell_mut((x, area.y)) {
                cell.set_symbol(" ");
                cell.set_style(
                    Style::default()
                        .bg(theme::host_bar_bg())
                        .fg(theme::host_bar_fg()),
                );
            }
        }
        let status_style = Style::default()
            .bg(theme::host_bar_bg())
            .fg(theme::warning_fg());
        buffer.set_stringn(
            area.x + 1,
            area.y,
            &self.status,
            area.width.saturating_sub(2) as usize,
            status_style,
        );

        // Right-aligned platform info, cached hostname.
        let hostname = self.hostname.get_or_insert_with(|| {
            hostname::get()
                .ok()
                .and_then(|value| value.into_string().ok())
                .unwrap_or_else(|| "unknown-host".to_string())
        });
        const PKG_NAME: &str = env!("CARGO_PKG_NAME");
        const PKG_VERSION: &str = env!("CARGO_PKG_VERSION");
        let info = format!("{PKG_NAME} {PKG_VERSION} · {} · {hostname}", std::env::consts::OS);
        let width = info.chars().count() as u16;
        if width < area.width {
            buffer.set_string(
                area.x + area.width - width,
                area.y,
                info,
                Style::default()
                    .bg(theme::host_bar_bg())
                    .fg(theme::host_bar_fg()),
            );
        }
    }
}
