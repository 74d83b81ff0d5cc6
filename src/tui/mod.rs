//! Ratatui-based terminal dashboard.
//!
//! A sidebar holds the Country / Month multi-selects and the returns toggle;
//! the main area shows the KPI tiles, the monthly revenue chart and the
//! top-products / top-countries tables. Every filter change recomputes the
//! whole dashboard from the cached table.

use std::io;
use std::path::PathBuf;
use std::time::Duration;

use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    Terminal,
    backend::CrosstermBackend,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Row, Table},
};
use tracing::{info, warn};

use crate::app::session::{FilterOptions, Session};
use crate::domain::{Breakdown, Dashboard, DashboardConfig, EXPORT_FILE_NAME, FilterSet};
use crate::error::AppError;
use crate::report::{fmt_count, fmt_currency, truncate};

mod plotters_chart;

use plotters_chart::{MonthlyRevenueChart, month_label};

const SIDEBAR_WIDTH: u16 = 30;
const BAR_WIDTH: usize = 16;

/// Start the TUI.
pub fn run(config: DashboardConfig) -> Result<(), AppError> {
    // Load before touching the terminal so a missing file prints normally.
    let session = Session::open(&config.data_path)?;
    let export_path = config
        .export_path
        .unwrap_or_else(|| PathBuf::from(EXPORT_FILE_NAME));
    let mut app = App::new(session, config.filters, export_path);

    let _guard = TerminalGuard::new()?;

    let backend = CrosstermBackend::new(io::stdout());
    let mut terminal = Terminal::new(backend)
        .map_err(|e| AppError::terminal(format!("Failed to initialize terminal: {e}")))?;

    app.event_loop(&mut terminal)
}

/// Ensures the terminal is restored (raw mode, alternate screen) on exit.
struct TerminalGuard;

impl TerminalGuard {
    fn new() -> Result<Self, AppError> {
        enable_raw_mode().map_err(|e| AppError::terminal(format!("Failed to enable raw mode: {e}")))?;
        if let Err(e) = execute!(io::stdout(), EnterAlternateScreen) {
            let _ = disable_raw_mode();
            return Err(AppError::terminal(format!("Failed to enter alternate screen: {e}")));
        }
        Ok(Self)
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
    }
}

/// Sidebar widget that receives arrow keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Focus {
    Countries,
    Months,
    Returns,
}

impl Focus {
    fn next(self) -> Self {
        match self {
            Focus::Countries => Focus::Months,
            Focus::Months => Focus::Returns,
            Focus::Returns => Focus::Countries,
        }
    }

    fn prev(self) -> Self {
        match self {
            Focus::Countries => Focus::Returns,
            Focus::Months => Focus::Countries,
            Focus::Returns => Focus::Months,
        }
    }
}

struct App {
    session: Session,
    options: FilterOptions,
    filters: FilterSet,
    dashboard: Dashboard,
    focus: Focus,
    country_cursor: usize,
    month_cursor: usize,
    export_path: PathBuf,
    status: String,
}

impl App {
    fn new(session: Session, filters: FilterSet, export_path: PathBuf) -> Self {
        let options = session.filter_options();
        let dashboard = session.dashboard(&filters);
        let status = format!("Loaded {} rows from {}", fmt_count(session.loaded_rows()), session.path().display());
        Self {
            session,
            options,
            filters,
            dashboard,
            focus: Focus::Countries,
            country_cursor: 0,
            month_cursor: 0,
            export_path,
            status,
        }
    }

    fn event_loop<B: ratatui::backend::Backend>(&mut self, terminal: &mut Terminal<B>) -> Result<(), AppError> {
        let mut needs_redraw = true;
        loop {
            if needs_redraw {
                terminal
                    .draw(|f| self.draw(f))
                    .map_err(|e| AppError::terminal(format!("Terminal draw error: {e}")))?;
                needs_redraw = false;
            }

            if !event::poll(Duration::from_millis(100))
                .map_err(|e| AppError::terminal(format!("Event poll error: {e}")))?
            {
                continue;
            }

            match event::read().map_err(|e| AppError::terminal(format!("Event read error: {e}")))? {
                Event::Key(key) => {
                    if key.kind != KeyEventKind::Press {
                        continue;
                    }
                    if self.handle_key(key.code) {
                        break;
                    }
                    needs_redraw = true;
                }
                Event::Resize(_, _) => {
                    needs_redraw = true;
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// Apply one key press; returns `true` to quit.
    fn handle_key(&mut self, code: KeyCode) -> bool {
        match code {
            KeyCode::Char('q') | KeyCode::Esc => return true,
            KeyCode::Tab => self.focus = self.focus.next(),
            KeyCode::BackTab => self.focus = self.focus.prev(),
            KeyCode::Up => self.move_cursor(-1),
            KeyCode::Down => self.move_cursor(1),
            KeyCode::Char(' ') | KeyCode::Enter => self.toggle_selected(),
            KeyCode::Char('r') => {
                self.filters.include_returns = !self.filters.include_returns;
                self.refresh();
            }
            KeyCode::Char('c') => {
                self.filters = FilterSet::default();
                self.refresh();
                self.status = "Filters cleared.".to_string();
            }
            KeyCode::Char('d') => self.download(),
            _ => {}
        }
        false
    }

    fn move_cursor(&mut self, delta: isize) {
        let (cursor, len) = match self.focus {
            Focus::Countries => (&mut self.country_cursor, self.options.countries.len()),
            Focus::Months => (&mut self.month_cursor, self.options.months.len()),
            Focus::Returns => return,
        };
        if len == 0 {
            return;
        }
        *cursor = cursor.saturating_add_signed(delta).min(len - 1);
    }

    fn toggle_selected(&mut self) {
        match self.focus {
            Focus::Countries => {
                if let Some(c) = self.options.countries.get(self.country_cursor) {
                    self.filters.toggle_country(c);
                }
            }
            Focus::Months => {
                if let Some(m) = self.options.months.get(self.month_cursor) {
                    self.filters.toggle_month(m);
                }
            }
            Focus::Returns => self.filters.include_returns = !self.filters.include_returns,
        }
        self.refresh();
    }

    fn refresh(&mut self) {
        self.dashboard = self.session.dashboard(&self.filters);
        self.status = format!(
            "{} of {} rows in view",
            fmt_count(self.dashboard.filtered_rows),
            fmt_count(self.dashboard.loaded_rows)
        );
    }

    fn download(&mut self) {
        let path = self.export_path.clone();
        let view = self.session.apply(&self.filters);
        let rows = view.len();
        let result = crate::io::export::export_filtered_csv(&view)
            .and_then(|bytes| crate::io::export::write_export(&path, &bytes));
        match result {
            Ok(()) => {
                info!(path = %path.display(), rows, "exported filtered view");
                self.status = format!("Wrote {} rows to {}", fmt_count(rows), path.display());
            }
            Err(err) => {
                warn!("download failed: {err}");
                self.status = format!("Download failed: {err}");
            }
        }
    }

    fn draw(&mut self, frame: &mut ratatui::Frame<'_>) {
        let size = frame.area();
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(4), Constraint::Min(0), Constraint::Length(3)])
            .split(size);

        self.draw_header(frame, chunks[0]);

        let body = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Length(SIDEBAR_WIDTH), Constraint::Min(0)])
            .split(chunks[1]);
        self.draw_sidebar(frame, body[0]);
        self.draw_main(frame, body[1]);

        self.draw_footer(frame, chunks[2]);
    }

    fn draw_header(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let lines = vec![
            Line::from(vec![
                Span::styled("sales", Style::default().fg(Color::Cyan)),
                Span::raw(" | online retail revenue dashboard"),
            ]),
            Line::from(Span::styled(
                format!(
                    "Loaded rows: {} | In view: {} | Source: {}",
                    fmt_count(self.dashboard.loaded_rows),
                    fmt_count(self.dashboard.filtered_rows),
                    self.session.path().display()
                ),
                Style::default().fg(Color::Gray),
            )),
        ];
        let p = Paragraph::new(Text::from(lines)).block(Block::default().borders(Borders::ALL));
        frame.render_widget(p, area);
    }

    fn draw_sidebar(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Percentage(50),
                Constraint::Percentage(50),
                Constraint::Length(3),
            ])
            .split(area);

        let countries = &self.options.countries;
        self.draw_multiselect(
            frame,
            chunks[0],
            "Country",
            countries.iter().map(|c| (c.as_str(), self.filters.countries.contains(c))),
            self.country_cursor,
            Focus::Countries,
        );

        let months = &self.options.months;
        self.draw_multiselect(
            frame,
            chunks[1],
            "Month",
            months.iter().map(|m| (m.as_str(), self.filters.months.contains(m))),
            self.month_cursor,
            Focus::Months,
        );

        let mark = if self.filters.include_returns { "[x]" } else { "[ ]" };
        let returns = Paragraph::new(format!("{mark} Include returns"))
            .block(self.focus_block("Returns", Focus::Returns));
        frame.render_widget(returns, chunks[2]);
    }

    fn draw_multiselect<'a>(
        &self,
        frame: &mut ratatui::Frame<'_>,
        area: Rect,
        title: &str,
        entries: impl Iterator<Item = (&'a str, bool)>,
        cursor: usize,
        focus: Focus,
    ) {
        let items: Vec<ListItem> = entries
            .map(|(label, selected)| {
                let mark = if selected { "[x]" } else { "[ ]" };
                ListItem::new(format!("{mark} {label}"))
            })
            .collect();
        let empty = items.is_empty();

        let list = List::new(items)
            .block(self.focus_block(title, focus))
            .highlight_style(Style::default().fg(Color::Black).bg(Color::White))
            .highlight_symbol("» ");

        let mut state = ListState::default();
        if !empty && self.focus == focus {
            state.select(Some(cursor));
        }
        frame.render_stateful_widget(list, area, &mut state);
    }

    fn focus_block<'a>(&self, title: &'a str, focus: Focus) -> Block<'a> {
        let style = if self.focus == focus {
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)
        } else {
            Style::default()
        };
        Block::default().title(title).borders(Borders::ALL).border_style(style)
    }

    fn draw_main(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Percentage(50),
                Constraint::Min(0),
            ])
            .split(area);

        self.draw_kpis(frame, chunks[0]);
        self.draw_chart(frame, chunks[1]);

        let tables = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
            .split(chunks[2]);
        draw_breakdown(frame, tables[0], "Top 15 products", "Description", &self.dashboard.top_products);
        draw_breakdown(frame, tables[1], "Top 15 countries", "Country", &self.dashboard.top_countries);
    }

    fn draw_kpis(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let kpis = &self.dashboard.kpis;
        let tiles = [
            ("Revenue", fmt_currency(kpis.total_revenue, 0)),
            ("Orders", fmt_count(kpis.orders)),
            ("Avg Basket", fmt_currency(kpis.avg_basket, 2)),
            ("Customers", fmt_count(kpis.customers)),
        ];
        let chunks = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Ratio(1, 4); 4])
            .split(area);
        for ((title, value), rect) in tiles.into_iter().zip(chunks.iter()) {
            let p = Paragraph::new(value)
                .alignment(Alignment::Center)
                .style(Style::default().add_modifier(Modifier::BOLD))
                .block(Block::default().title(title).borders(Borders::ALL));
            frame.render_widget(p, *rect);
        }
    }

    fn draw_chart(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let block = Block::default().title("Monthly revenue").borders(Borders::ALL);
        let inner = block.inner(area);
        frame.render_widget(block, area);
        frame.render_widget(Clear, inner);

        let rows = match self.dashboard.revenue_by_month.rows_or_message() {
            Ok(rows) => rows,
            Err(msg) => {
                let p = Paragraph::new(msg).style(Style::default().fg(Color::Yellow));
                frame.render_widget(p, inner);
                return;
            }
        };

        let labels: Vec<String> = rows.iter().map(|g| g.key.clone()).collect();
        let (points, x_bounds, y_bounds) = chart_series(&self.dashboard.revenue_by_month);

        let (chart_rect, insets) = chart_layout(inner);
        let widget = MonthlyRevenueChart {
            points: &points,
            labels: &labels,
            x_bounds,
            y_bounds,
            fmt_y: fmt_axis_revenue,
        };
        frame.render_widget(widget, chart_rect);
        if let Some(insets) = insets {
            draw_axis_ticks(frame, inner, chart_rect, insets, &labels, x_bounds, y_bounds);
        }
    }

    fn draw_footer(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let help = "Tab focus  ↑/↓ move  Space toggle  r returns  c clear  d download  q quit";
        let line = Line::from(vec![
            Span::styled(help, Style::default().fg(Color::Gray)),
            Span::raw(" | "),
            Span::styled(&self.status, Style::default().fg(Color::Yellow)),
        ]);
        let p = Paragraph::new(line).block(Block::default().borders(Borders::ALL));
        frame.render_widget(p, area);
    }
}

/// Bar + table pane for a top-N breakdown, or its "no data" message.
fn draw_breakdown(frame: &mut ratatui::Frame<'_>, area: Rect, title: &str, key_label: &str, breakdown: &Breakdown) {
    let block = Block::default().title(title.to_string()).borders(Borders::ALL);
    let rows = match breakdown.rows_or_message() {
        Ok(rows) => rows,
        Err(msg) => {
            let p = Paragraph::new(msg).style(Style::default().fg(Color::Yellow)).block(block);
            frame.render_widget(p, area);
            return;
        }
    };

    let key_width = usize::from(area.width.saturating_sub(2)).saturating_sub(BAR_WIDTH + 16).max(8);
    let max = rows.iter().map(|g| g.revenue).fold(0.0_f64, f64::max);
    let table_rows: Vec<Row> = rows
        .iter()
        .map(|g| {
            Row::new(vec![
                truncate(&g.key, key_width),
                fmt_currency(g.revenue, 2),
                crate::plot::hbar(g.revenue, max, BAR_WIDTH),
            ])
        })
        .collect();

    let widths = [
        Constraint::Min(8),
        Constraint::Length(14),
        Constraint::Length(BAR_WIDTH as u16),
    ];
    let table = Table::new(table_rows, widths)
        .header(
            Row::new(vec![key_label, "Revenue", ""])
                .style(Style::default().fg(Color::Gray).add_modifier(Modifier::BOLD)),
        )
        .block(block);
    frame.render_widget(table, area);
}

/// Build the chart series: month index on x, revenue on y.
fn chart_series(monthly: &Breakdown) -> (Vec<(f64, f64)>, [f64; 2], [f64; 2]) {
    let points: Vec<(f64, f64)> = monthly
        .rows
        .iter()
        .enumerate()
        .map(|(i, g)| (i as f64, g.revenue))
        .collect();

    let x_bounds = if points.len() > 1 {
        [0.0, (points.len() - 1) as f64]
    } else {
        [-0.5, 0.5]
    };

    let (mut y_min, mut y_max) = (f64::INFINITY, f64::NEG_INFINITY);
    for &(_, y) in &points {
        y_min = y_min.min(y);
        y_max = y_max.max(y);
    }
    if !y_min.is_finite() || !y_max.is_finite() {
        y_min = 0.0;
        y_max = 1.0;
    } else if y_max <= y_min {
        y_min -= 1.0;
        y_max += 1.0;
    }

    let pad = ((y_max - y_min).abs() * 0.05).max(1e-12);
    let y_bounds = [y_min - pad, y_max + pad];

    (points, x_bounds, y_bounds)
}

/// Compact axis label: `950`, `12k`, `1.2M`.
fn fmt_axis_revenue(v: f64) -> String {
    let a = v.abs();
    if a >= 1_000_000.0 {
        format!("{:.1}M", v / 1_000_000.0)
    } else if a >= 1_000.0 {
        format!("{:.0}k", v / 1_000.0)
    } else {
        format!("{v:.0}")
    }
}

#[derive(Debug, Clone, Copy)]
struct AxisInsets {
    left: u16,
    right: u16,
    top: u16,
    bottom: u16,
}

fn chart_layout(inner: Rect) -> (Rect, Option<AxisInsets>) {
    let insets = AxisInsets {
        left: 8,
        right: 2,
        top: 1,
        bottom: 2,
    };

    if inner.width <= insets.left + insets.right + 10 || inner.height <= insets.top + insets.bottom + 5 {
        return (inner, None);
    }

    let rect = Rect {
        x: inner.x + insets.left,
        y: inner.y + insets.top,
        width: inner.width - insets.left - insets.right,
        height: inner.height - insets.top - insets.bottom,
    };

    (rect, Some(insets))
}

fn draw_axis_ticks(
    frame: &mut ratatui::Frame<'_>,
    inner: Rect,
    chart: Rect,
    insets: AxisInsets,
    labels: &[String],
    x_bounds: [f64; 2],
    y_bounds: [f64; 2],
) {
    let style = Style::default().fg(Color::Gray);

    // Month labels: at most six, evenly spread over the series.
    let n = labels.len();
    let ticks = n.min(6);
    let y = chart.y + chart.height;
    if y < inner.y + inner.height - 1 {
        for i in 0..ticks {
            let idx = if ticks > 1 { (i * (n - 1)) / (ticks - 1) } else { 0 };
            let u = if x_bounds[1] > x_bounds[0] {
                (idx as f64 - x_bounds[0]) / (x_bounds[1] - x_bounds[0])
            } else {
                0.5
            };
            let x = chart.x + ((chart.width - 1) as f64 * u).round() as u16;
            let label = month_label(labels, idx as f64);
            let label_len = label.len() as u16;
            let start = x
                .saturating_sub(label_len / 2)
                .min((chart.x + chart.width).saturating_sub(label_len));
            frame.render_widget(
                Paragraph::new(label).style(style),
                Rect {
                    x: start,
                    y,
                    width: label_len,
                    height: 1,
                },
            );
        }
    }

    let y_ticks = 5usize;
    for i in 0..y_ticks {
        let u = i as f64 / (y_ticks as f64 - 1.0);
        let y_val = y_bounds[0] + u * (y_bounds[1] - y_bounds[0]);
        let y = chart.y + (chart.height - 1) - ((chart.height - 1) as f64 * u).round() as u16;
        let label = fmt_axis_revenue(y_val);
        let label_len = label.len() as u16;
        let x = inner.x + insets.left.saturating_sub(1);
        let start = x.saturating_sub(label_len);
        if start < inner.x {
            continue;
        }
        frame.render_widget(
            Paragraph::new(label).style(style),
            Rect {
                x: start,
                y,
                width: label_len,
                height: 1,
            },
        );
    }

    let y_label = Paragraph::new("revenue").style(style.add_modifier(Modifier::BOLD));
    let y_rect = Rect {
        x: inner.x,
        y: inner.y,
        width: insets.left.saturating_sub(1),
        height: 1,
    };
    frame.render_widget(y_label, y_rect);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{CleanTable, CleanedRecord, Column, SourceFields};
    use chrono::NaiveDate;

    fn app(export_dir: PathBuf) -> App {
        let rec = |country: &str, month: u32, qty: f64| {
            let ts = NaiveDate::from_ymd_opt(2011, month, 3).unwrap().and_hms_opt(9, 0, 0).unwrap();
            CleanedRecord::derive(
                SourceFields {
                    invoice: Some(format!("{country}-{month}")),
                    country: Some(country.to_string()),
                    description: Some("ITEM".into()),
                    ..SourceFields::default()
                },
                qty,
                ts,
                5.0,
            )
        };
        let table = CleanTable {
            columns: Column::ALL.to_vec(),
            records: vec![rec("France", 1, 2.0), rec("Spain", 2, 1.0), rec("France", 2, -3.0)],
        };
        App::new(Session::from_table(PathBuf::from("mem.csv"), table, 0), FilterSet::default(), export_dir.join(EXPORT_FILE_NAME))
    }

    #[test]
    fn toggling_a_country_recomputes_the_dashboard() {
        let mut a = app(PathBuf::from("."));
        assert_eq!(a.dashboard.filtered_rows, 3);

        // Countries are sorted: France, Spain.
        a.handle_key(KeyCode::Down);
        a.handle_key(KeyCode::Char(' '));
        assert!(a.filters.countries.contains("Spain"));
        assert_eq!(a.dashboard.filtered_rows, 1);
        assert_eq!(a.dashboard.kpis.total_revenue, 5.0);

        a.handle_key(KeyCode::Char('c'));
        assert!(a.filters.countries.is_empty());
        assert_eq!(a.dashboard.filtered_rows, 3);
    }

    #[test]
    fn returns_toggle_and_focus_cycle() {
        let mut a = app(PathBuf::from("."));
        a.handle_key(KeyCode::Char('r'));
        assert!(!a.filters.include_returns);
        assert_eq!(a.dashboard.kpis.total_revenue, 15.0);

        a.handle_key(KeyCode::Tab);
        a.handle_key(KeyCode::Tab);
        assert_eq!(a.focus, Focus::Returns);
        a.handle_key(KeyCode::Enter);
        assert!(a.filters.include_returns);
        a.handle_key(KeyCode::BackTab);
        assert_eq!(a.focus, Focus::Months);
    }

    #[test]
    fn cursor_stays_in_bounds() {
        let mut a = app(PathBuf::from("."));
        for _ in 0..5 {
            a.handle_key(KeyCode::Down);
        }
        assert_eq!(a.country_cursor, 1);
        for _ in 0..5 {
            a.handle_key(KeyCode::Up);
        }
        assert_eq!(a.country_cursor, 0);
    }

    #[test]
    fn download_writes_filtered_view() {
        let dir = tempfile::tempdir().unwrap();
        let mut a = app(dir.path().to_path_buf());
        a.handle_key(KeyCode::Char(' ')); // select France
        a.handle_key(KeyCode::Char('d'));

        let text = std::fs::read_to_string(dir.path().join(EXPORT_FILE_NAME)).unwrap();
        assert_eq!(text.lines().count(), 3);
        assert!(a.status.starts_with("Wrote 2 rows"));
    }

    #[test]
    fn quit_keys() {
        let mut a = app(PathBuf::from("."));
        assert!(a.handle_key(KeyCode::Char('q')));
        assert!(a.handle_key(KeyCode::Esc));
        assert!(!a.handle_key(KeyCode::Char('x')));
    }

    #[test]
    fn single_month_chart_bounds_are_valid() {
        let a = app(PathBuf::from("."));
        let mut filters = FilterSet::default();
        filters.toggle_month("2011-01");
        let d = a.session.dashboard(&filters);
        let (points, x, y) = chart_series(&d.revenue_by_month);
        assert_eq!(points, vec![(0.0, 10.0)]);
        assert!(x[1] > x[0]);
        assert!(y[1] > y[0]);
    }

    #[test]
    fn axis_labels_are_compact() {
        assert_eq!(fmt_axis_revenue(950.0), "950");
        assert_eq!(fmt_axis_revenue(12_400.0), "12k");
        assert_eq!(fmt_axis_revenue(1_340_000.0), "1.3M");
    }
}
