use std::io;
use std::time::Duration;

use chrono::{DateTime, Utc};
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    Frame, Terminal,
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    symbols,
    text::{Line, Span},
    widgets::{
        Axis, Bar, BarChart, BarGroup, Block, Borders, Chart, Dataset, GraphType, Paragraph, Row,
        Table, TableState,
    },
};
use tokio::runtime::Runtime;
use xp_stat::*;

use super::app::{App, LoginMode, Page, Screen};
use crate::config::Config;
use crate::report::{TOP_PROJECTS, format_best, format_day};
use crate::stat::{SessionStore, Snapshot, signin};

const TICKS: usize = 5;
const LABEL_WIDTH: usize = 10;

pub fn run_tui(config: Config, store: SessionStore, rt: &Runtime) -> anyhow::Result<()> {
    let mut app = App::new(config, store);

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = event_loop(&mut terminal, &mut app, rt);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

fn event_loop(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
    rt: &Runtime,
) -> anyhow::Result<()> {
    loop {
        terminal.draw(|f| ui(f, app))?;

        if app.should_quit {
            return Ok(());
        }

        if app.needs_refresh {
            app.needs_refresh = false;
            if let Some(gateway) = app.gateway.clone() {
                let result = rt.block_on(Snapshot::fetch(&gateway));
                app.apply_refresh(result);
                continue;
            }
        }

        if event::poll(Duration::from_millis(200))? {
            if let Event::Key(key) = event::read()? {
                handle_key_event(app, key, rt);
            }
        }
    }
}

fn handle_key_event(app: &mut App, key: KeyEvent, rt: &Runtime) {
    if key.kind != KeyEventKind::Press {
        return;
    }

    match app.page {
        Page::Login => handle_key_login(app, key, rt),
        Page::Dashboard => handle_key_normal(app, key),
    }
}

fn handle_key_login(app: &mut App, key: KeyEvent, rt: &Runtime) {
    use KeyCode::*;

    match key.code {
        Esc => app.should_quit = true,
        Tab | BackTab | Up | Down => app.login.toggle_mode(),
        Enter => {
            if app.login.mode == LoginMode::Identifier {
                app.login.mode = LoginMode::Password;
            } else {
                submit_login(app, rt);
            }
        }
        Backspace => {
            app.login.active_field().pop();
        }
        Char(c) => app.login.active_field().push(c),
        _ => {}
    }
}

fn submit_login(app: &mut App, rt: &Runtime) {
    let identifier = app.login.identifier.trim().to_string();
    if identifier.is_empty() || app.login.password.is_empty() {
        app.login.error_message = Some("Enter your username or email and password.".to_string());
        return;
    }
    match rt.block_on(signin(&app.config, &identifier, &app.login.password)) {
        Ok(session) => app.start_session(session),
        Err(e) => app.logout(Some(e.to_string())),
    }
}

fn handle_key_normal(app: &mut App, key: KeyEvent) {
    use KeyCode::*;

    match key.code {
        Char('q') => app.should_quit = true,

        Tab => app.next_screen(),
        BackTab => app.prev_screen(),

        Up => {
            if let Screen::History = app.current_screen {
                app.select_prev_point();
            }
        }
        Down => {
            if let Screen::History = app.current_screen {
                app.select_next_point();
            }
        }

        Char('r') => app.needs_refresh = true,
        Char('l') => app.logout(None),
        Char('?') => app.current_screen = Screen::Help,
        Char('c') => {
            app.error_message = None;
            app.success_message = None;
        }
        _ => {}
    }
}

fn ui(f: &mut Frame<'_>, app: &App) {
    if app.page == Page::Login {
        let area = f.area();
        draw_login(f, area, app);
        return;
    }

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints([
            Constraint::Length(3), // header
            Constraint::Min(0),    // main
            Constraint::Length(3), // footer
        ])
        .split(f.area());

    let screen_name = match app.current_screen {
        Screen::Profile => "Profile",
        Screen::Graph => "XP Over Time",
        Screen::Projects => "XP By Project",
        Screen::History => "History",
        Screen::Help => "Help",
    };
    let who = app
        .snapshot
        .as_ref()
        .map(|s| s.identity.display_name.as_str())
        .unwrap_or("loading…");
    let header = Paragraph::new(format!("XP Dashboard - {screen_name}   |   {who}"))
        .block(Block::default().borders(Borders::ALL));
    f.render_widget(header, chunks[0]);

    match &app.snapshot {
        None => {
            let p = Paragraph::new("Loading profile and XP transactions…")
                .block(Block::default().borders(Borders::ALL));
            f.render_widget(p, chunks[1]);
        }
        Some(snap) => match app.current_screen {
            Screen::Profile => draw_profile(f, chunks[1], snap),
            Screen::Graph => draw_graph(f, chunks[1], snap),
            Screen::Projects => draw_projects(f, chunks[1], snap),
            Screen::History => draw_history(f, chunks[1], snap, app.selected_point_idx),
            Screen::Help => draw_help(f, chunks[1]),
        },
    }

    let footer_text = if let Some(ref msg) = app.error_message {
        format!("ERROR: {msg} | Press 'c' to clear")
    } else if let Some(ref msg) = app.success_message {
        format!("{msg} | Press 'c' to clear")
    } else {
        "Tab/Shift+Tab: switch screen  |  ↑/↓: move  |  r: refresh  |  l: logout  |  ?: help  |  q: quit"
            .to_string()
    };
    let footer = Paragraph::new(footer_text).block(Block::default().borders(Borders::ALL));
    f.render_widget(footer, chunks[2]);
}

fn draw_login(f: &mut Frame<'_>, area: Rect, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(2)
        .constraints([Constraint::Length(8), Constraint::Min(0)])
        .split(area);

    let marker = |mode: LoginMode| if app.login.mode == mode { "> " } else { "  " };
    let masked = "*".repeat(app.login.password.chars().count());
    let mut lines = vec![
        Line::from(format!(
            "{}Username or email: {}",
            marker(LoginMode::Identifier),
            app.login.identifier
        )),
        Line::from(format!("{}Password:          {}", marker(LoginMode::Password), masked)),
        Line::from(""),
        Line::from("Tab: switch field  |  Enter: sign in  |  Esc: quit"),
    ];
    if let Some(ref msg) = app.login.error_message {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            msg.clone(),
            Style::default().fg(Color::Red),
        )));
    }

    let block = Block::default()
        .title(Span::raw("Sign in"))
        .borders(Borders::ALL);
    f.render_widget(Paragraph::new(lines).block(block), chunks[0]);
}

fn draw_profile(f: &mut Frame<'_>, area: Rect, snap: &Snapshot) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(area);

    let id = &snap.identity;
    let total = snap.series.total;
    let text = format!(
        "Login:    {}\n\
         User id:  {}\n\
         Email:    {}\n\n\
         Total XP: {} ({})\n",
        id.display_name,
        id.id,
        id.email,
        format_magnitude(total),
        format_grouped(total),
    );
    let block = Block::default()
        .title(Span::raw("Profile"))
        .borders(Borders::ALL);
    f.render_widget(Paragraph::new(text).block(block), chunks[0]);

    let m = &snap.milestones;
    let text = format!(
        "First activity:   {}\n\
         Last activity:    {}\n\
         Projects:         {}\n\
         Best single gain: {}\n",
        format_day(m.first_timestamp),
        format_day(m.last_timestamp),
        format_grouped(m.distinct_entity_count as f64),
        format_best(m),
    );
    let block = Block::default()
        .title(Span::raw("Milestones"))
        .borders(Borders::ALL);
    f.render_widget(Paragraph::new(text).block(block), chunks[1]);
}

fn draw_graph(f: &mut Frame<'_>, area: Rect, snap: &Snapshot) {
    let block = Block::default()
        .title(Span::raw("Total XP over time"))
        .borders(Borders::ALL);
    let points = &snap.series.points;
    let (Some(first), Some(last)) = (points.first(), points.last()) else {
        f.render_widget(Paragraph::new("No XP data").block(block), area);
        return;
    };

    let data: Vec<(f64, f64)> = points
        .iter()
        .map(|p| (p.timestamp.timestamp() as f64, p.cumulative_total))
        .collect();
    let min_x = first.timestamp.timestamp() as f64;
    let max_x = (last.timestamp.timestamp() as f64).max(min_x + 1.0);
    let (min_y, max_y) = y_bounds(points);

    let datasets = vec![
        Dataset::default()
            .name("Total XP")
            .marker(symbols::Marker::Braille)
            .graph_type(GraphType::Line)
            .style(Style::default().fg(Color::Blue))
            .data(&data),
        Dataset::default()
            .marker(symbols::Marker::Dot)
            .graph_type(GraphType::Scatter)
            .style(Style::default().fg(Color::Magenta))
            .data(&data),
    ];

    let chart = Chart::new(datasets)
        .block(block)
        .x_axis(
            Axis::default()
                .title("Time")
                .bounds([min_x, max_x])
                .labels(time_ticks(first.timestamp, last.timestamp)),
        )
        .y_axis(
            Axis::default()
                .title("Total XP")
                .bounds([min_y, max_y])
                .labels(magnitude_ticks(min_y, max_y)),
        );
    f.render_widget(chart, area);
}

fn draw_projects(f: &mut Frame<'_>, area: Rect, snap: &Snapshot) {
    let block = Block::default()
        .title(Span::raw(format!("Top {TOP_PROJECTS} projects")))
        .borders(Borders::ALL);
    let top = snap.top_projects(TOP_PROJECTS);
    if top.is_empty() {
        f.render_widget(Paragraph::new("No XP data").block(block), area);
        return;
    }

    let bars: Vec<Bar> = top
        .iter()
        .map(|p| {
            Bar::default()
                .value(p.total_xp.max(0.0) as u64)
                .text_value(format_magnitude(p.total_xp))
                .label(Line::from(truncate_label(&p.entity_name, LABEL_WIDTH)))
        })
        .collect();

    let gap: u16 = 1;
    let n = top.len() as u16;
    let inner = area.width.saturating_sub(2);
    let bar_width = (inner.saturating_sub(gap * n.saturating_sub(1)) / n.max(1)).clamp(3, 12);

    let chart = BarChart::default()
        .block(block)
        .bar_width(bar_width)
        .bar_gap(gap)
        .bar_style(Style::default().fg(Color::Blue))
        .value_style(Style::default().add_modifier(Modifier::BOLD))
        .data(BarGroup::default().bars(&bars));
    f.render_widget(chart, area);
}

fn draw_history(f: &mut Frame<'_>, area: Rect, snap: &Snapshot, selected: usize) {
    let rows = snap.series.points.iter().map(|p| {
        Row::new(vec![
            p.timestamp.format("%Y-%m-%d").to_string(),
            p.entity_name.clone(),
            format!("+{}", format_magnitude(p.increment)),
            format_magnitude(p.cumulative_total),
        ])
    });

    let widths = [
        Constraint::Length(12),
        Constraint::Min(20),
        Constraint::Length(12),
        Constraint::Length(12),
    ];

    let table = Table::new(rows, widths)
        .header(
            Row::new(vec!["Date", "Project", "Gain", "Total"])
                .style(Style::default().add_modifier(Modifier::BOLD)),
        )
        .row_highlight_style(Style::default().add_modifier(Modifier::REVERSED))
        .block(Block::default().title("XP history").borders(Borders::ALL));

    let mut state = TableState::default();
    if !snap.series.points.is_empty() {
        state.select(Some(selected));
    }
    f.render_stateful_widget(table, area, &mut state);
}

fn draw_help(f: &mut Frame<'_>, area: Rect) {
    let text = "\
Screens:
  Profile       – who you are, total XP and milestones
  XP Over Time  – cumulative XP curve
  XP By Project – the projects that earned the most XP
  History       – every XP grant with the running total

Key bindings:
  Tab / Shift+Tab : switch screen
  ↑ / ↓           : move selection (History)
  r               : refresh from the server
  l               : log out
  c               : clear messages
  ?               : open this help
  q               : quit
";

    let block = Block::default()
        .title(Span::raw("Help"))
        .borders(Borders::ALL);
    f.render_widget(Paragraph::new(text).block(block), area);
}

/// `TICKS + 1` evenly spaced labels from zero to `max`.
/// Y range of the curve: always includes zero, and never collapses.
fn y_bounds(points: &[XpPoint]) -> (f64, f64) {
    let min = points
        .iter()
        .map(|p| p.cumulative_total)
        .fold(0.0_f64, f64::min);
    let max = points
        .iter()
        .map(|p| p.cumulative_total)
        .fold(0.0_f64, f64::max);
    (min, max.max(min + 1.0))
}

fn magnitude_ticks(min: f64, max: f64) -> Vec<String> {
    (0..=TICKS)
        .map(|i| format_magnitude(min + (max - min) * i as f64 / TICKS as f64))
        .collect()
}

/// `TICKS + 1` month/year labels spread evenly between `from` and `to`.
fn time_ticks(from: DateTime<Utc>, to: DateTime<Utc>) -> Vec<String> {
    let span = (to - from).num_seconds().max(1);
    (0..=TICKS as i64)
        .map(|i| {
            let at = from + chrono::Duration::seconds(span * i / TICKS as i64);
            at.format("%b %y").to_string()
        })
        .collect()
}

fn truncate_label(name: &str, width: usize) -> String {
    if name.chars().count() > width {
        let head: String = name.chars().take(width).collect();
        format!("{head}…")
    } else {
        name.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn long_labels_are_truncated() {
        assert_eq!(truncate_label("groupie-tracker", 10), "groupie-tr…");
        assert_eq!(truncate_label("ascii-art", 10), "ascii-art");
        assert_eq!(truncate_label("ütf8-namesx", 10), "ütf8-names…");
    }

    #[test]
    fn magnitude_ticks_span_zero_to_max() {
        let ticks = magnitude_ticks(0.0, 1_000_000.0);
        assert_eq!(ticks.len(), TICKS + 1);
        assert_eq!(ticks[0], "0 KB");
        assert_eq!(ticks[1], "200 KB");
        assert_eq!(ticks[TICKS], "1.0 MB");
    }

    fn point(cumulative_total: f64) -> XpPoint {
        XpPoint {
            timestamp: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            increment: 0.0,
            cumulative_total,
            entity_name: "a".into(),
        }
    }

    #[test]
    fn negative_totals_extend_the_y_axis_below_zero() {
        let points = [point(-2_000_000.0), point(-500_000.0), point(1_000_000.0)];
        assert_eq!(y_bounds(&points), (-2_000_000.0, 1_000_000.0));
        let ticks = magnitude_ticks(-2_000_000.0, 1_000_000.0);
        assert_eq!(ticks[0], "-2,000 KB");
        assert_eq!(ticks[TICKS], "1.0 MB");
    }

    #[test]
    fn flat_or_positive_curves_start_at_zero() {
        assert_eq!(y_bounds(&[point(0.0)]), (0.0, 1.0));
        assert_eq!(y_bounds(&[point(500.0), point(800.0)]), (0.0, 800.0));
        assert_eq!(y_bounds(&[point(-300.0)]), (-300.0, 0.0));
    }

    #[test]
    fn time_ticks_run_from_first_to_last() {
        let from = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let to = Utc.with_ymd_and_hms(2024, 11, 1, 0, 0, 0).unwrap();
        let ticks = time_ticks(from, to);
        assert_eq!(ticks.len(), TICKS + 1);
        assert_eq!(ticks[0], "Jan 24");
        assert_eq!(ticks[TICKS], "Nov 24");
    }

    #[test]
    fn single_instant_still_has_ticks() {
        let at = Utc.with_ymd_and_hms(2024, 5, 5, 0, 0, 0).unwrap();
        let ticks = time_ticks(at, at);
        assert!(ticks.iter().all(|t| t == "May 24"));
    }
}
