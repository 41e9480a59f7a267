use std::io::{self, Stdout};
use std::time::{Duration, Instant};

use clap::Parser;
use crossterm::{
    cursor,
    event::{
        self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind, KeyModifiers,
        MouseButton, MouseEvent, MouseEventKind,
    },
    execute,
    terminal::{self, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    Frame, Terminal,
    backend::CrosstermBackend,
    layout::Rect,
    style::{Color, Style},
    widgets::Paragraph,
};

use overlay_wm::ui::UiFrame;
use overlay_wm::{
    MemoryStore, OverlayConfig, OverlayContent, OverlayManager, OverlayOptions,
};

#[derive(Parser, Debug)]
#[command(
    name = "overlay-bench",
    version = env!("CARGO_PKG_VERSION"),
    about = "Compositing-heavy benchmark driving a scripted overlay drag"
)]
struct BenchCli {
    /// How long to run the benchmark.
    #[arg(
        short = 'd',
        long = "duration",
        value_name = "SECONDS",
        default_value_t = 10.0
    )]
    duration_seconds: f64,

    /// Target frames per second. Used to pace rendering so comparisons are repeatable.
    #[arg(short = 'f', long = "fps", value_name = "FPS", default_value_t = 60.0)]
    target_fps: f64,

    /// How many overlays to keep stacked while one of them is dragged.
    #[arg(short = 'n', long = "overlays", value_name = "N", default_value_t = 3)]
    overlays: usize,
}

impl BenchCli {
    fn duration(&self) -> Duration {
        Duration::from_secs_f64(self.duration_seconds)
    }

    fn frame_budget(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.target_fps)
    }
}

struct BenchConfig {
    duration: Duration,
    target_fps: f64,
    frame_budget: Duration,
    overlays: usize,
}

impl TryFrom<&BenchCli> for BenchConfig {
    type Error = String;

    fn try_from(cli: &BenchCli) -> Result<Self, Self::Error> {
        if !(0.5..=600.0).contains(&cli.duration_seconds) {
            return Err("duration must be between 0.5 and 600 seconds".to_string());
        }
        if !(1.0..=240.0).contains(&cli.target_fps) {
            return Err("fps must be between 1 and 240".to_string());
        }
        if !(1..=8).contains(&cli.overlays) {
            return Err("overlays must be between 1 and 8".to_string());
        }
        Ok(Self {
            duration: cli.duration(),
            target_fps: cli.target_fps,
            frame_budget: cli.frame_budget(),
            overlays: cli.overlays,
        })
    }
}

fn main() -> io::Result<()> {
    let args = BenchCli::parse();
    let config = BenchConfig::try_from(&args)
        .map_err(|msg| io::Error::new(io::ErrorKind::InvalidInput, msg))?;

    terminal::enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(
        stdout,
        EnterAlternateScreen,
        EnableMouseCapture,
        cursor::Hide
    )?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;
    terminal.hide_cursor()?;

    let bench_result = run_benchmark(&mut terminal, &config);

    terminal.show_cursor()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture,
        cursor::Show
    )?;
    terminal::disable_raw_mode()?;

    let stats = bench_result?;
    println!("{}", stats.final_report(&config));

    Ok(())
}

type BenchTerminal = Terminal<CrosstermBackend<Stdout>>;

/// Flat fill payload; cheap on purpose so the measurement tracks the
/// compositor, not the content.
struct Swatch {
    color: Color,
}

impl OverlayContent for Swatch {
    fn render(&mut self, frame: &mut UiFrame<'_>, area: Rect, _focused: bool) {
        let buffer = frame.buffer_mut();
        for y in area.y..area.y.saturating_add(area.height) {
            for x in area.x..area.x.saturating_add(area.width) {
                if let Some(cell) = buffer.cell_mut((x, y)) {
                    cell.set_symbol("·");
                    cell.set_style(Style::default().fg(self.color));
                }
            }
        }
    }
}

const SWATCH_COLORS: [Color; 8] = [
    Color::Cyan,
    Color::Magenta,
    Color::Green,
    Color::Yellow,
    Color::Blue,
    Color::Red,
    Color::LightCyan,
    Color::LightGreen,
];

fn run_benchmark(terminal: &mut BenchTerminal, config: &BenchConfig) -> io::Result<BenchStats> {
    let mut manager: OverlayManager<Swatch> = OverlayManager::new(
        OverlayOptions {
            max_concurrent: config.overlays,
            ..OverlayOptions::terminal_cells()
        },
        Box::new(MemoryStore::new()),
    );
    let area = terminal.size()?;
    manager.begin_frame(Rect::new(0, 0, area.width, area.height));
    for index in 0..config.overlays {
        manager.open(
            OverlayConfig::new(format!("swatch-{index}"), Swatch {
                color: SWATCH_COLORS[index % SWATCH_COLORS.len()],
            })
            .title(format!("swatch {index}"))
            .size(30, 9),
        );
    }

    // Grab the topmost overlay by its header and never let go; every frame
    // feeds one synthetic pointer sample, exactly like a real drag burst.
    let origin = manager
        .position_of(&format!("swatch-{}", config.overlays - 1))
        .unwrap_or_default();
    let grab = ((origin.x + 2).max(0) as u16, (origin.y + 1).max(0) as u16);
    manager.handle_event(&mouse(MouseEventKind::Down(MouseButton::Left), grab.0, grab.1));

    let mut stats = BenchStats::new();
    let mut tick: u64 = 0;
    let mut exit_reason = ExitReason::Completed;

    loop {
        let pointer = drag_path(tick, area.width, area.height, grab);
        manager.handle_event(&mouse(
            MouseEventKind::Drag(MouseButton::Left),
            pointer.0,
            pointer.1,
        ));

        let frame_start = Instant::now();
        let mut cells_drawn: u64 = 0;
        terminal.draw(|frame| {
            cells_drawn = draw_frame(frame, &mut manager, &stats, config);
        })?;
        let draw_time = frame_start.elapsed();
        stats.record_frame(cells_drawn, draw_time);

        if stats.elapsed() >= config.duration {
            break;
        }

        if poll_for_exit(config.frame_budget.saturating_sub(draw_time))? {
            exit_reason = ExitReason::UserAbort;
            break;
        }

        tick = tick.wrapping_add(1);
    }

    manager.handle_event(&mouse(MouseEventKind::Up(MouseButton::Left), grab.0, grab.1));
    stats.exit_reason = exit_reason;
    stats.mark_completed();
    Ok(stats)
}

// Lissajous-ish sweep keeping the pointer inside the terminal.
fn drag_path(tick: u64, width: u16, height: u16, grab: (u16, u16)) -> (u16, u16) {
    if width == 0 || height == 0 {
        return grab;
    }
    let t = tick as f64 / 17.0;
    let x = (width as f64 / 2.0) * (1.0 + (t).sin());
    let y = (height as f64 / 2.0) * (1.0 + (t * 0.7).cos());
    (
        (x as u16).min(width.saturating_sub(1)),
        (y as u16).min(height.saturating_sub(1)),
    )
}

fn mouse(kind: MouseEventKind, column: u16, row: u16) -> Event {
    Event::Mouse(MouseEvent {
        kind,
        column,
        row,
        modifiers: KeyModifiers::NONE,
    })
}

fn draw_frame(
    frame: &mut Frame,
    manager: &mut OverlayManager<Swatch>,
    stats: &BenchStats,
    config: &BenchConfig,
) -> u64 {
    let area = frame.area();
    if area.width == 0 || area.height == 0 {
        return 0;
    }

    let lines = build_status_lines(stats, config);
    frame.render_widget(
        Paragraph::new(lines.join("\n")).style(Style::default().fg(Color::White)),
        area,
    );

    manager.begin_frame(area);
    manager.render(frame);

    area.width as u64 * area.height as u64
}

fn build_status_lines(stats: &BenchStats, config: &BenchConfig) -> Vec<String> {
    let elapsed = stats.elapsed().as_secs_f64();
    let duration_target = config.duration.as_secs_f64();
    let progress = if duration_target > 0.0 {
        (elapsed / duration_target).clamp(0.0, 1.0)
    } else {
        0.0
    };
    let fps_avg = if elapsed > 0.0 {
        stats.frame_count as f64 / elapsed
    } else {
        0.0
    };

    vec![
        "== Overlay Bench ==".to_string(),
        format!(
            "elapsed {:>5.1}/{:>5.1}s ({:>3.0}%)",
            elapsed,
            duration_target,
            progress * 100.0
        ),
        format!(
            "frames {:>8} | avg fps {:>5.1} / target {:>5.1}",
            stats.frame_count, fps_avg, config.target_fps
        ),
        format!(
            "overlays {:>2} | frame ms avg {:>6.2} | best {:>5.2} | worst {:>5.2}",
            config.overlays,
            stats.average_frame_ms(),
            stats.fastest_frame_ms(),
            stats.slowest_frame_ms()
        ),
        "press q / esc / ctrl+c to stop".to_string(),
    ]
}

struct BenchStats {
    start: Instant,
    completed_at: Option<Instant>,
    frame_count: u64,
    cell_updates: u64,
    total_draw_time: Duration,
    fastest_frame: Duration,
    slowest_frame: Duration,
    exit_reason: ExitReason,
}

impl BenchStats {
    fn new() -> Self {
        Self {
            start: Instant::now(),
            completed_at: None,
            frame_count: 0,
            cell_updates: 0,
            total_draw_time: Duration::ZERO,
            fastest_frame: Duration::MAX,
            slowest_frame: Duration::ZERO,
            exit_reason: ExitReason::Completed,
        }
    }

    fn elapsed(&self) -> Duration {
        match self.completed_at {
            Some(done) => done.duration_since(self.start),
            None => self.start.elapsed(),
        }
    }

    fn mark_completed(&mut self) {
        self.completed_at = Some(Instant::now());
    }

    fn record_frame(&mut self, cells: u64, draw_time: Duration) {
        self.frame_count = self.frame_count.saturating_add(1);
        self.cell_updates = self.cell_updates.saturating_add(cells);
        self.total_draw_time += draw_time;
        if draw_time < self.fastest_frame {
            self.fastest_frame = draw_time;
        }
        if draw_time > self.slowest_frame {
            self.slowest_frame = draw_time;
        }
    }

    fn average_frame_ms(&self) -> f64 {
        if self.frame_count == 0 {
            return 0.0;
        }
        (self.total_draw_time.as_secs_f64() / self.frame_count as f64) * 1_000.0
    }

    fn fastest_frame_ms(&self) -> f64 {
        if self.frame_count == 0 {
            return 0.0;
        }
        self.fastest_frame.as_secs_f64() * 1_000.0
    }

    fn slowest_frame_ms(&self) -> f64 {
        if self.frame_count == 0 {
            return 0.0;
        }
        self.slowest_frame.as_secs_f64() * 1_000.0
    }

    fn final_report(&self, config: &BenchConfig) -> String {
        let elapsed = self.elapsed().as_secs_f64();
        let fps_avg = if elapsed > 0.0 {
            self.frame_count as f64 / elapsed
        } else {
            0.0
        };
        let cells_per_second = if elapsed > 0.0 {
            self.cell_updates as f64 / elapsed
        } else {
            0.0
        };

        indoc::formatdoc!(
            r#"
            Overlay bench {status}.
            Duration: {elapsed:.2}s (target {target:.2}s)
            Overlays: {overlays} (one dragged continuously)
            Frames: {frames} | Avg FPS: {fps:.1} (target {target_fps:.1})
            Avg frame: {avg:.2} ms | Best: {best:.2} ms | Worst: {worst:.2} ms
            Cell updates: {cells} total (~{cells_per_sec:.0}/s)
            "#,
            status = self.exit_reason.describe(),
            elapsed = elapsed,
            target = config.duration.as_secs_f64(),
            overlays = config.overlays,
            frames = self.frame_count,
            fps = fps_avg,
            target_fps = config.target_fps,
            avg = self.average_frame_ms(),
            best = self.fastest_frame_ms(),
            worst = self.slowest_frame_ms(),
            cells = self.cell_updates,
            cells_per_sec = cells_per_second,
        )
    }
}

#[derive(Copy, Clone)]
enum ExitReason {
    Completed,
    UserAbort,
}

impl ExitReason {
    fn describe(self) -> &'static str {
        match self {
            ExitReason::Completed => "completed full duration",
            ExitReason::UserAbort => "stopped by user",
        }
    }
}

fn poll_for_exit(wait: Duration) -> io::Result<bool> {
    if !event::poll(wait)? {
        return Ok(false);
    }
    loop {
        match event::read()? {
            Event::Key(key) if key.kind == KeyEventKind::Press => {
                if matches!(
                    key.code,
                    KeyCode::Char('q') | KeyCode::Char('Q') | KeyCode::Esc
                ) {
                    return Ok(true);
                }
                if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
                    return Ok(true);
                }
            }
            _ => {}
        }
        if !event::poll(Duration::ZERO)? {
            break;
        }
    }
    Ok(false)
}
