//! Feed TUI - terminal rendering of the live activity feed
//!
//! Collapsed: a one-line ticker scrolling the most recent events.
//! Expanded: the full panel with Activity and Stats tabs.
//! Hidden: a re-open hint.
//!
//! Keys: `e` expand/collapse, `p` pause ticker, `h` hide/show,
//! `tab` switch tab, `q` quit. Logs go to a file so they do not
//! corrupt the screen.

use activity_feed::domain::{EventLog, SessionId};
use activity_feed::infra::{Config, FeedMetrics};
use activity_feed::io::replay;
use activity_feed::services::classifier::EventClass;
use activity_feed::services::display::{DisplayMode, PanelTab};
use activity_feed::services::feed::{FeedContent, FeedItem};
use activity_feed::services::ticker::{Extents, Measure};
use activity_feed::services::{
    Action, FeedEngine, FeedOptions, FeedRuntime, FeedSink, FeedView, SessionClock,
};
use anyhow::Context;
use clap::Parser;
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, Paragraph, Row, Table, Tabs},
    Frame, Terminal,
};
use std::io::{self, Stdout};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tracing::{info, warn};
use tracing_subscriber::fmt::time::UtcTime;
use tracing_subscriber::EnvFilter;
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

/// Pixels per terminal column for the ticker and the responsive policy
const CELL_PX: f64 = 8.0;

/// Rows used by the collapsed ticker bar
const TICKER_ROWS: u16 = 3;

#[derive(Parser, Debug)]
#[command(name = "feed-tui", version, about = "Terminal live activity feed")]
struct Args {
    /// Path to TOML configuration file
    #[arg(short, long, default_value = "config/dev.toml")]
    config: String,

    /// Log file (the terminal is owned by the UI)
    #[arg(long, default_value = "feed-tui.log")]
    log_file: String,

    /// JSONL file of recorded events to replay into the log
    #[arg(long)]
    replay: Option<String>,

    /// Replay with recorded gaps, capped at this many seconds
    #[arg(long, default_value_t = 3)]
    pace_secs: u64,
}

fn class_color(class: &EventClass) -> Color {
    match class.style_class {
        "event-pageview" => Color::Blue,
        "event-click" => Color::Green,
        "event-form" => Color::Magenta,
        "event-heatmap" => Color::Red,
        _ => Color::Yellow,
    }
}

fn ticker_text(view: &FeedView) -> String {
    view.ticker_items()
        .iter()
        .map(|item| match &item.summary {
            Some(summary) => format!("{} {} · {}", item.class.icon, summary, item.relative_time),
            None => format!("{} {} · {}", item.class.icon, item.class.label, item.relative_time),
        })
        .collect::<Vec<_>>()
        .join("   ")
}

/// Rendered width of `text` in pixels; icons take two cells
fn pixel_width(text: &str) -> f64 {
    text.width() as f64 * CELL_PX
}

/// Slice of `text` visible at ticker `offset` (pixels, negative = scrolled left)
fn scrolled(text: &str, offset: f64) -> String {
    let cols = (offset / CELL_PX).round() as i64;
    if cols >= 0 {
        return format!("{}{}", " ".repeat(cols as usize), text);
    }

    let mut skip = cols.unsigned_abs() as usize;
    let mut visible = String::with_capacity(text.len());
    for ch in text.chars() {
        let width = ch.width().unwrap_or(0);
        if skip == 0 {
            visible.push(ch);
        } else if width > skip {
            // Wide glyph cut at the left edge: keep its remaining cells blank
            visible.extend(std::iter::repeat(' ').take(width - skip));
            skip = 0;
        } else {
            skip -= width;
        }
    }
    visible
}

struct TuiSink {
    terminal: Terminal<CrosstermBackend<Stdout>>,
    view: Option<FeedView>,
    ticker: String,
    offset: f64,
}

impl TuiSink {
    fn redraw(&mut self) {
        let Some(view) = &self.view else { return };
        let ticker = scrolled(&self.ticker, self.offset);
        if let Err(e) = self.terminal.draw(|f| draw_ui(f, view, &ticker)) {
            warn!(error = %e, "tui_draw_failed");
        }
    }
}

impl Measure for TuiSink {
    fn extents(&self) -> Option<Extents> {
        let width = self.terminal.size().ok()?.width;
        Some(Extents::new(pixel_width(&self.ticker), width as f64 * CELL_PX))
    }
}

impl FeedSink for TuiSink {
    fn present(&mut self, view: &FeedView) {
        self.ticker = ticker_text(view);
        self.view = Some(view.clone());
        self.redraw();
    }

    fn scroll(&mut self, offset: f64) {
        self.offset = offset;
        self.redraw();
    }
}

fn draw_ui(f: &mut Frame, view: &FeedView, ticker: &str) {
    match view.mode {
        DisplayMode::Hidden => draw_hidden(f),
        DisplayMode::Collapsed => {
            let chunks = Layout::default()
                .direction(Direction::Vertical)
                .constraints([Constraint::Min(0), Constraint::Length(TICKER_ROWS)])
                .split(f.area());
            draw_ticker(f, chunks[1], view, ticker);
        }
        DisplayMode::Expanded => draw_panel(f, f.area(), view),
    }
}

fn draw_hidden(f: &mut Frame) {
    let area = f.area();
    let hint = Paragraph::new(Line::from(vec![
        Span::styled("📊 ", Style::default().fg(Color::Cyan)),
        Span::styled("Activity feed hidden", Style::default().fg(Color::DarkGray)),
        Span::raw(" | 'h' show | 'q' quit"),
    ]));
    f.render_widget(hint, Rect { y: area.bottom().saturating_sub(1), height: 1, ..area });
}

fn draw_ticker(f: &mut Frame, area: Rect, view: &FeedView, ticker: &str) {
    let paused = if view.ticker_paused { " ⏸" } else { "" };
    let title = if view.minimized {
        format!(" 📊 {} ", view.stats.total)
    } else {
        format!(
            " Activity · {} · {} events{} | 'e' expand 'p' pause 'h' hide ",
            view.time_on_page, view.stats.total, paused
        )
    };

    let line = match &view.content {
        FeedContent::Empty { placeholder } => {
            Line::from(Span::styled(*placeholder, Style::default().fg(Color::DarkGray)))
        }
        FeedContent::Items(_) if view.minimized => Line::from(""),
        FeedContent::Items(items) => {
            let style = if items.first().is_some_and(|item| item.is_new) {
                Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
            } else {
                Style::default()
            };
            Line::from(Span::styled(ticker.to_string(), style))
        }
    };

    let bar = Paragraph::new(line).block(
        Block::default()
            .title(title)
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan)),
    );
    f.render_widget(bar, area);
}

fn draw_panel(f: &mut Frame, area: Rect, view: &FeedView) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header + tabs
            Constraint::Min(0),    // Tab body
            Constraint::Length(1), // Footer
        ])
        .split(area);

    let selected = match view.tab {
        PanelTab::Activity => 0,
        PanelTab::Stats => 1,
    };
    let tabs = Tabs::new(vec![PanelTab::Activity.title(), PanelTab::Stats.title()])
        .select(selected)
        .highlight_style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD))
        .block(
            Block::default()
                .title(format!(
                    " Activity feed · session {} · {} · {} ",
                    view.session_short,
                    view.time_on_page,
                    view.device.as_str()
                ))
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Cyan)),
        );
    f.render_widget(tabs, chunks[0]);

    match view.tab {
        PanelTab::Activity => draw_activity(f, chunks[1], view),
        PanelTab::Stats => draw_stats(f, chunks[1], view),
    }

    let footer = Paragraph::new(Line::from(vec![
        Span::styled(format!("Privacy: {}", view.privacy_url), Style::default().fg(Color::DarkGray)),
        Span::raw(" | 'tab' switch 'e' collapse 'h' hide 'q' quit"),
    ]));
    f.render_widget(footer, chunks[2]);
}

fn activity_item(item: &FeedItem) -> ListItem<'static> {
    let color = class_color(&item.class);
    let mut header = vec![
        Span::raw(format!("{} ", item.class.icon)),
        Span::styled(item.event_type.to_string(), Style::default().fg(color)),
        Span::styled(format!("  {}", item.relative_time), Style::default().fg(Color::DarkGray)),
    ];
    if item.is_new {
        header.push(Span::styled(
            "  new",
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
        ));
    }

    let mut lines = vec![Line::from(header)];
    lines.extend(item.details.iter().map(|detail| {
        Line::from(vec![
            Span::styled(format!("    {}: ", detail.label), Style::default().fg(Color::DarkGray)),
            Span::raw(detail.value.clone()),
        ])
    }));
    ListItem::new(lines)
}

fn draw_activity(f: &mut Frame, area: Rect, view: &FeedView) {
    let block = Block::default()
        .title(format!(" Recent events ({}) ", view.items().len()))
        .borders(Borders::ALL);

    match &view.content {
        FeedContent::Empty { placeholder } => {
            let empty = Paragraph::new(Span::styled(*placeholder, Style::default().fg(Color::DarkGray)))
                .block(block);
            f.render_widget(empty, area);
        }
        FeedContent::Items(items) => {
            let list = List::new(items.iter().map(activity_item).collect::<Vec<_>>()).block(block);
            f.render_widget(list, area);
        }
    }
}

fn draw_stats(f: &mut Frame, area: Rect, view: &FeedView) {
    let rows: Vec<Row> = view
        .stats
        .ranked()
        .into_iter()
        .map(|(event_type, count)| Row::new(vec![event_type.to_string(), count.to_string()]))
        .collect();

    let table = Table::new(rows, [Constraint::Min(16), Constraint::Length(8)])
        .header(
            Row::new(vec!["Event type", "Count"])
                .style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)),
        )
        .block(
            Block::default()
                .title(format!(
                    " Total {} · clicks {} · page views {} · forms {} ",
                    view.stats.total,
                    view.stats.clicks(),
                    view.stats.pageviews(),
                    view.stats.form_submits()
                ))
                .borders(Borders::ALL),
        );
    f.render_widget(table, area);
}

/// Translate terminal input into feed actions until quit or shutdown
fn read_input(actions: mpsc::Sender<Action>, shutdown_tx: watch::Sender<bool>) -> io::Result<()> {
    while !*shutdown_tx.borrow() {
        if !event::poll(Duration::from_millis(100))? {
            continue;
        }
        let action = match event::read()? {
            Event::Key(key) if key.kind == KeyEventKind::Press => match key.code {
                KeyCode::Char('q') | KeyCode::Esc => {
                    let _ = shutdown_tx.send(true);
                    return Ok(());
                }
                KeyCode::Char('e') => Action::ToggleExpanded,
                KeyCode::Char('p') => Action::TogglePause,
                KeyCode::Char('h') => Action::ToggleVisible,
                KeyCode::Tab => Action::NextTab,
                _ => continue,
            },
            Event::Resize(cols, _) => Action::Resize((cols as f64 * CELL_PX) as u32),
            _ => continue,
        };
        if actions.blocking_send(action).is_err() {
            return Ok(());
        }
    }
    Ok(())
}

fn init_file_logging(path: &str) -> anyhow::Result<()> {
    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("failed to open log file {path}"))?;
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_timer(UtcTime::rfc_3339())
        .with_target(false)
        .with_ansi(false)
        .with_writer(std::sync::Mutex::new(file))
        .init();
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_file_logging(&args.log_file)?;

    let config = Config::load_from_path(&args.config);
    let session = config
        .session_id()
        .map(|id| SessionId(id.to_string()))
        .unwrap_or_else(SessionId::generate);
    info!(config_file = %config.config_file(), session = %session.0, "feed_tui_starting");

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let log = Arc::new(EventLog::new(session.clone()));
    let metrics = Arc::new(FeedMetrics::new());

    if config.collector_enabled() {
        let addr: SocketAddr = format!("{}:{}", config.collector_bind_address(), config.collector_port())
            .parse()
            .context("invalid collector bind address")?;
        let collector_log = log.clone();
        let collector_metrics = metrics.clone();
        let collector_shutdown = shutdown_rx.clone();
        tokio::spawn(async move {
            if let Err(e) = activity_feed::io::start_collector(
                addr,
                collector_log,
                collector_metrics,
                collector_shutdown,
            )
            .await
            {
                tracing::error!(error = %e, "collector_error");
            }
        });
    }

    if let Some(path) = &args.replay {
        let events = replay::load_events(path)?;
        let replay_log = log.clone();
        let replay_shutdown = shutdown_rx.clone();
        let max_gap = Duration::from_secs(args.pace_secs);
        tokio::spawn(async move {
            replay::replay(events, &replay_log, Some(max_gap), replay_shutdown).await;
        });
    }

    let clock = SessionClock::system(
        Duration::from_millis(config.tick_ms()),
        Duration::from_secs(config.now_refresh_secs()),
    );
    let clock_rx = clock.subscribe();
    tokio::spawn(clock.run(shutdown_rx.clone()));

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let terminal = Terminal::new(CrosstermBackend::new(stdout))?;

    let (actions_tx, actions_rx) = mpsc::channel(32);
    let width = terminal.size()?.width;
    actions_tx.send(Action::Resize((width as f64 * CELL_PX) as u32)).await?;
    let input = tokio::task::spawn_blocking(move || read_input(actions_tx, shutdown_tx));

    let engine = FeedEngine::new(FeedOptions::from_config(&config), session, *clock_rx.borrow());
    let runtime = FeedRuntime::new(
        engine,
        log,
        clock_rx,
        actions_rx,
        Duration::from_millis(config.frame_ms()),
    )
    .with_metrics(metrics.clone());

    let mut sink = TuiSink { terminal, view: None, ticker: String::new(), offset: 0.0 };
    runtime.run(&mut sink, shutdown_rx).await;

    disable_raw_mode()?;
    execute!(sink.terminal.backend_mut(), LeaveAlternateScreen)?;
    sink.terminal.show_cursor()?;

    input.await??;
    metrics.report().log();
    info!("feed_tui_stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scrolled_enters_from_right_and_leaves_left() {
        assert_eq!(scrolled("abc", 16.0), "  abc");
        assert_eq!(scrolled("abcdef", -24.0), "def");
        assert_eq!(scrolled("abc", -80.0), "");
    }

    #[test]
    fn test_icons_measure_and_scroll_by_cells() {
        assert_eq!(pixel_width("🔍 /shop"), 8.0 * CELL_PX);
        assert_eq!(pixel_width("👆 a · 5s ago"), 13.0 * CELL_PX);

        assert_eq!(scrolled("🔍ab", -CELL_PX), " ab");
        assert_eq!(scrolled("🔍ab", -2.0 * CELL_PX), "ab");
        assert_eq!(scrolled("a🔥b", -3.0 * CELL_PX), "b");
    }
}
