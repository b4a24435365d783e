use chrono::DateTime;
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    symbols,
    text::{Line, Span},
    widgets::{
        Axis, Block, BorderType, Borders, Cell, Chart, Clear, Dataset, GraphType, Paragraph, Row,
        Table, Tabs, Wrap,
    },
    Frame,
};

use coinboard_common::types::{Coin, SortKey, TimeRange, TradeSide};
use coinboard_utils::format::{format_currency, format_date, format_number, format_percentage};
use coinboard_utils::transform::{price_range_position, ChartSummary};

use super::state::{App, TABS, TAB_COIN, TAB_MARKETS};

// ─── Color palette ──────────────────────────────────────────────────

const ACCENT: Color = Color::Cyan;
const GREEN: Color = Color::Green;
const RED: Color = Color::Red;
const DIM: Color = Color::DarkGray;
const YELLOW: Color = Color::Yellow;
const WHITE: Color = Color::White;
const BG_HEADER: Color = Color::Rgb(20, 20, 40);
const BG_SELECTED: Color = Color::Rgb(40, 40, 70);

const RANGE_BAR_WIDTH: usize = 24;

// ─── Main render ────────────────────────────────────────────────────

pub fn render(frame: &mut Frame, app: &App) {
    let area = frame.area();

    // Root layout: header(3) + tabs(3) + body(flex) + status(1)
    let root = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header
            Constraint::Length(3), // Tabs
            Constraint::Min(8),    // Body
            Constraint::Length(1), // Status bar
        ])
        .split(area);

    render_header(frame, app, root[0]);
    render_tabs(frame, app, root[1]);

    match app.tab {
        TAB_MARKETS => render_markets(frame, app, root[2]),
        TAB_COIN => render_coin(frame, app, root[2]),
        _ => {}
    }

    render_status_bar(frame, app, root[3]);

    // Help overlay on top
    if app.show_help {
        render_help(frame, area);
    }
}

// ─── Header ─────────────────────────────────────────────────────────

fn render_header(frame: &mut Frame, app: &App, area: Rect) {
    let block = Block::default()
        .borders(Borders::BOTTOM)
        .border_style(Style::default().fg(DIM))
        .style(Style::default().bg(BG_HEADER));

    let busy = app.list_loading || app.details_loading || app.chart_loading;
    let indicator = if app.list_error.is_some() || app.details_error.is_some() || app.chart_error.is_some() {
        Span::styled(" ● ", Style::default().fg(RED).bold())
    } else if busy {
        Span::styled(" ● ", Style::default().fg(YELLOW).bold())
    } else {
        Span::styled(" ● ", Style::default().fg(GREEN).bold())
    };

    let auto = if app.auto_refresh() {
        Span::styled("AUTO", Style::default().fg(GREEN))
    } else {
        Span::styled("AUTO", Style::default().fg(DIM))
    };

    let header = Paragraph::new(Line::from(vec![
        Span::styled(" COINBOARD ", Style::default().fg(Color::Black).bg(ACCENT).bold()),
        Span::raw("  "),
        indicator,
        Span::styled(&app.sources, Style::default().fg(DIM)),
        Span::raw(" "),
        auto,
        Span::raw("  │  "),
        Span::styled(&app.vs_currency, Style::default().fg(YELLOW).bold()),
        Span::raw("  │  "),
        Span::styled(
            format!("page {} × {}", app.page, app.per_page),
            Style::default().fg(WHITE),
        ),
    ]))
    .block(block);

    frame.render_widget(header, area);
}

// ─── Tab bar ────────────────────────────────────────────────────────

fn render_tabs(frame: &mut Frame, app: &App, area: Rect) {
    let tab_titles: Vec<Line> = TABS
        .iter()
        .enumerate()
        .map(|(i, t)| match (i, &app.coin_id) {
            (TAB_COIN, Some(id)) => Line::from(format!(" {} {} · {} ", i + 1, t, id)),
            _ => Line::from(format!(" {} {} ", i + 1, t)),
        })
        .collect();

    let tabs = Tabs::new(tab_titles)
        .select(app.tab)
        .style(Style::default().fg(DIM))
        .highlight_style(Style::default().fg(ACCENT).bold().underlined())
        .divider("│")
        .block(
            Block::default()
                .borders(Borders::BOTTOM)
                .border_style(Style::default().fg(DIM)),
        );

    frame.render_widget(tabs, area);
}

// ─── Tab 1: Markets ─────────────────────────────────────────────────

fn render_markets(frame: &mut Frame, app: &App, area: Rect) {
    let rows_total = app.table.source().len();
    let shown = app.table.rows().len();
    let title = if app.table.query().is_empty() {
        format!(" Markets ({rows_total}) ")
    } else {
        format!(" Markets ({shown}/{rows_total}) · filter \"{}\" ", app.table.query())
    };

    let block = Block::default()
        .title(title)
        .title_style(Style::default().fg(YELLOW).bold())
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(DIM));

    if app.table.is_empty() {
        let message = if rows_total > 0 {
            format!("\n  No coins match \"{}\".", app.table.query())
        } else if app.list_loading {
            "\n  Loading...".to_string()
        } else if let Some(ref err) = app.list_error {
            format!("\n  {err}\n\n  Press r to retry.")
        } else {
            "\n  No coins.".to_string()
        };
        let p = Paragraph::new(message)
            .style(Style::default().fg(DIM))
            .block(block);
        frame.render_widget(p, area);
        return;
    }

    let sort = app.table.sort();
    let header_cell = |key: SortKey| {
        if sort.key == key {
            Cell::from(format!("{} {}", key.label(), sort.direction.arrow()))
                .style(Style::default().fg(YELLOW).bold())
        } else {
            Cell::from(key.label())
        }
    };
    let header = Row::new(vec![
        Cell::from(""),
        header_cell(SortKey::MarketCapRank),
        Cell::from("Coin"),
        Cell::from("Symbol"),
        header_cell(SortKey::CurrentPrice),
        header_cell(SortKey::PriceChangePercentage24h),
        header_cell(SortKey::MarketCap),
        header_cell(SortKey::TotalVolume),
    ])
    .style(Style::default().fg(ACCENT).bold());

    // borders + header row
    let visible = area.height.saturating_sub(3).max(1) as usize;
    let offset = app.selected.saturating_sub(visible - 1);

    let rows: Vec<Row> = app
        .table
        .rows()
        .iter()
        .enumerate()
        .skip(offset)
        .take(visible)
        .map(|(i, coin)| market_row(coin, i == app.selected))
        .collect();

    let table = Table::new(
        rows,
        [
            Constraint::Length(2),  // Indicator
            Constraint::Length(6),  // Rank
            Constraint::Min(14),    // Name
            Constraint::Length(8),  // Symbol
            Constraint::Length(16), // Price
            Constraint::Length(9),  // 24h
            Constraint::Length(14), // Market cap
            Constraint::Length(14), // Volume
        ],
    )
    .header(header)
    .block(block);

    frame.render_widget(table, area);
}

fn market_row(coin: &Coin, selected: bool) -> Row<'static> {
    let indicator = if selected { "►" } else { " " };
    let bg = if selected {
        Style::default().bg(BG_SELECTED)
    } else {
        Style::default()
    };
    let rank = match coin.market_cap_rank {
        0 => "-".to_string(),
        r => r.to_string(),
    };

    Row::new(vec![
        Cell::from(indicator).style(Style::default().fg(ACCENT).bold()),
        Cell::from(rank).style(Style::default().fg(DIM)),
        Cell::from(coin.name.clone()).style(Style::default().fg(WHITE).bold()),
        Cell::from(coin.symbol.to_uppercase()).style(Style::default().fg(DIM)),
        Cell::from(format_currency(coin.current_price, false)),
        Cell::from(format_percentage(coin.price_change_percentage_24h))
            .style(Style::default().fg(change_color(coin.price_change_percentage_24h))),
        Cell::from(format_currency(coin.market_cap, true)),
        Cell::from(format_currency(coin.total_volume, true)),
    ])
    .style(bg)
}

// ─── Tab 2: Coin ────────────────────────────────────────────────────

fn render_coin(frame: &mut Frame, app: &App, area: Rect) {
    if app.coin_id.is_none() {
        let p = Paragraph::new("\n  Select a coin on the Markets tab and press Enter.")
            .style(Style::default().fg(DIM))
            .block(panel(" Coin ", ACCENT));
        frame.render_widget(p, area);
        return;
    }

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
        .split(area);
    let top = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(46), Constraint::Min(30)])
        .split(rows[0]);
    let bottom = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(46), Constraint::Min(30)])
        .split(rows[1]);

    render_stats(frame, app, top[0]);
    render_chart(frame, app, top[1]);
    render_trades(frame, app, bottom[0]);
    render_description(frame, app, bottom[1]);
}

fn render_stats(frame: &mut Frame, app: &App, area: Rect) {
    let Some(details) = &app.details else {
        let message = match (&app.details_error, app.details_loading) {
            (Some(err), _) => format!("\n  {err}\n\n  Press r to retry, Esc to go back."),
            (None, true) => "\n  Loading...".to_string(),
            (None, false) => "\n  No data.".to_string(),
        };
        let p = Paragraph::new(message)
            .style(Style::default().fg(DIM))
            .block(panel(" Overview ", ACCENT));
        frame.render_widget(p, area);
        return;
    };
    let coin = &details.coin;

    let title = match coin.market_cap_rank {
        0 => format!(" {} ({}) ", coin.name, coin.symbol.to_uppercase()),
        r => format!(" {} ({}) · #{r} ", coin.name, coin.symbol.to_uppercase()),
    };

    let position = price_range_position(coin.low_24h, coin.high_24h, coin.current_price);
    let text = vec![
        Line::from(vec![
            Span::styled(" Price          ", Style::default().fg(DIM)),
            Span::styled(
                format_currency(coin.current_price, false),
                Style::default().fg(WHITE).bold(),
            ),
            Span::raw("  "),
            Span::styled(
                format_percentage(coin.price_change_percentage_24h),
                Style::default().fg(change_color(coin.price_change_percentage_24h)),
            ),
        ]),
        stat_line("Market Cap", format_currency(coin.market_cap, true)),
        stat_line("Volume (24h)", format_currency(coin.total_volume, true)),
        Line::from(vec![
            Span::styled(" 24h Range      ", Style::default().fg(DIM)),
            Span::styled(format_currency(coin.low_24h, false), Style::default().fg(RED)),
            Span::raw(" "),
            Span::styled(range_bar(position), Style::default().fg(ACCENT)),
            Span::raw(" "),
            Span::styled(format_currency(coin.high_24h, false), Style::default().fg(GREEN)),
        ]),
        stat_line(
            "All-Time High",
            format!("{} ({})", format_currency(coin.ath, false), format_date(&coin.ath_date)),
        ),
        stat_line(
            "All-Time Low",
            format!("{} ({})", format_currency(coin.atl, false), format_date(&coin.atl_date)),
        ),
        stat_line("Circulating", format_number(coin.circulating_supply, true)),
        stat_line("Max Supply", format_number(coin.max_supply, true)),
    ];

    let p = Paragraph::new(text).block(panel(&title, ACCENT));
    frame.render_widget(p, area);
}

fn render_chart(frame: &mut Frame, app: &App, area: Rect) {
    let ranges: Vec<Span> = TimeRange::ALL
        .iter()
        .flat_map(|r| {
            let style = if *r == app.range {
                Style::default().fg(Color::Black).bg(ACCENT).bold()
            } else {
                Style::default().fg(DIM)
            };
            [Span::styled(format!(" {r} "), style), Span::raw(" ")]
        })
        .collect();

    let summary = ChartSummary::from_points(&app.chart);
    let color = match summary.and_then(|s| s.change_pct) {
        Some(pct) if pct < 0.0 => RED,
        _ => GREEN,
    };
    let title = match summary {
        Some(s) => format!(
            " Price · {} · {} ",
            app.range,
            format_percentage(s.change_pct)
        ),
        None => format!(" Price · {} ", app.range),
    };
    let block = panel(&title, YELLOW).title_bottom(Line::from(ranges));

    let Some(summary) = summary else {
        let message = match (&app.chart_error, app.chart_loading) {
            (Some(err), _) => format!("\n  {err}\n\n  Press r to retry."),
            (None, true) => "\n  Loading...".to_string(),
            (None, false) => "\n  No chart data.".to_string(),
        };
        let p = Paragraph::new(message)
            .style(Style::default().fg(DIM))
            .block(block);
        frame.render_widget(p, area);
        return;
    };

    let data: Vec<(f64, f64)> = app
        .chart
        .iter()
        .map(|p| (p.timestamp as f64, p.price))
        .collect();
    let (first_ts, last_ts) = match (app.chart.first(), app.chart.last()) {
        (Some(first), Some(last)) => (first.timestamp, last.timestamp),
        _ => (0, 0),
    };
    let pad = ((summary.high - summary.low) * 0.05).max(summary.high.abs() * 1e-6);

    let dataset = Dataset::default()
        .marker(symbols::Marker::Braille)
        .graph_type(GraphType::Line)
        .style(Style::default().fg(color))
        .data(&data);

    let chart = Chart::new(vec![dataset])
        .block(block)
        .x_axis(
            Axis::default()
                .style(Style::default().fg(DIM))
                .bounds([first_ts as f64, (last_ts as f64).max(first_ts as f64 + 1.0)])
                .labels(vec![axis_time(first_ts, app.range), axis_time(last_ts, app.range)]),
        )
        .y_axis(
            Axis::default()
                .style(Style::default().fg(DIM))
                .bounds([summary.low - pad, summary.high + pad])
                .labels(vec![
                    format_currency(summary.low, true),
                    format_currency(summary.high, true),
                ]),
        );

    frame.render_widget(chart, area);
}

fn render_trades(frame: &mut Frame, app: &App, area: Rect) {
    let block = panel(" Trading History ", GREEN);

    if app.trades.is_empty() {
        let message = if app.chart_loading { "\n  Loading..." } else { "\n  No trades." };
        let p = Paragraph::new(message)
            .style(Style::default().fg(DIM))
            .block(block);
        frame.render_widget(p, area);
        return;
    }

    let header = Row::new(vec!["Time", "Side", "Amount", "Price"])
        .style(Style::default().fg(ACCENT).bold());

    let rows: Vec<Row> = app
        .trades
        .iter()
        .map(|t| {
            let (side, color) = match t.side {
                TradeSide::Buy => ("BUY", GREEN),
                TradeSide::Sell => ("SELL", RED),
            };
            Row::new(vec![
                Cell::from(axis_time(t.timestamp, TimeRange::Day)).style(Style::default().fg(DIM)),
                Cell::from(side).style(Style::default().fg(color).bold()),
                Cell::from(format!("{:.3}", t.amount)),
                Cell::from(format_currency(t.price, false)),
            ])
        })
        .collect();

    let table = Table::new(
        rows,
        [
            Constraint::Length(12),
            Constraint::Length(5),
            Constraint::Length(8),
            Constraint::Min(12),
        ],
    )
    .header(header)
    .block(block);

    frame.render_widget(table, area);
}

fn render_description(frame: &mut Frame, app: &App, area: Rect) {
    let mut lines = Vec::new();
    if let Some(details) = &app.details {
        if !details.categories.is_empty() {
            lines.push(Line::from(Span::styled(
                format!(" {}", details.categories.join(" · ")),
                Style::default().fg(YELLOW),
            )));
            lines.push(Line::raw(""));
        }
        let text = strip_tags(&details.description.en);
        if text.trim().is_empty() {
            lines.push(Line::styled(" No description.", Style::default().fg(DIM)));
        } else {
            lines.extend(text.lines().map(|l| Line::raw(format!(" {l}"))));
        }
        let urls = details.links.urls();
        if !urls.is_empty() {
            lines.push(Line::raw(""));
            for url in urls.into_iter().take(4) {
                lines.push(Line::styled(format!(" {url}"), Style::default().fg(ACCENT)));
            }
        }
    }

    let p = Paragraph::new(lines)
        .wrap(Wrap { trim: false })
        .scroll((app.scroll, 0))
        .block(panel(" About ", ACCENT));
    frame.render_widget(p, area);
}

// ─── Status bar ─────────────────────────────────────────────────────

fn render_status_bar(frame: &mut Frame, app: &App, area: Rect) {
    if app.filter_editing {
        let line = Line::from(vec![
            Span::styled(" / ", Style::default().fg(Color::Black).bg(YELLOW).bold()),
            Span::styled(format!(" {}█", app.filter_input), Style::default().fg(WHITE)),
            Span::styled("   Enter keep · Esc clear", Style::default().fg(DIM)),
        ]);
        frame.render_widget(Paragraph::new(line).style(Style::default().bg(BG_HEADER)), area);
        return;
    }

    let message = match (&app.notice, app.tab) {
        (Some(notice), _) => Span::styled(format!(" {}", truncate(notice, 60)), Style::default().fg(RED)),
        (None, TAB_COIN) => Span::styled(" t range · r refresh · Esc back", Style::default().fg(DIM)),
        (None, _) => Span::styled(
            " Enter open · / filter · R P C M V sort · [ ] page",
            Style::default().fg(DIM),
        ),
    };

    let line = Line::from(vec![
        message,
        Span::styled(format!("  │  {}  ", app.last_refresh), Style::default().fg(DIM)),
        Span::styled(
            "?",
            Style::default()
                .fg(Color::Black)
                .bg(ACCENT)
                .add_modifier(Modifier::BOLD),
        ),
        Span::styled(" Help ", Style::default().fg(DIM)),
        Span::styled(
            "q",
            Style::default()
                .fg(Color::Black)
                .bg(RED)
                .add_modifier(Modifier::BOLD),
        ),
        Span::styled(" Quit", Style::default().fg(DIM)),
    ]);

    let bar = Paragraph::new(line).style(Style::default().bg(BG_HEADER));
    frame.render_widget(bar, area);
}

// ─── Help overlay ───────────────────────────────────────────────────

fn render_help(frame: &mut Frame, area: Rect) {
    let popup = centered_rect(55, 80, area);

    frame.render_widget(Clear, popup);

    let section = |title: &'static str| {
        Line::from(Span::styled(title, Style::default().fg(ACCENT).bold()))
    };

    let help_text = vec![
        Line::from(""),
        section("  Navigation"),
        Line::from(""),
        Line::from("  1-2           Switch tab"),
        Line::from("  Tab / l / →   Next tab"),
        Line::from("  S-Tab / h / ← Previous tab"),
        Line::from("  j / ↓         Select next / scroll"),
        Line::from("  k / ↑         Select prev / scroll"),
        Line::from(""),
        section("  Markets"),
        Line::from(""),
        Line::from("  Enter         Open selected coin"),
        Line::from("  /             Filter by name or symbol"),
        Line::from("  R P C M V     Sort: rank, price, 24h, cap, volume"),
        Line::from("                (again to flip direction)"),
        Line::from("  [ / ]         Previous / next page"),
        Line::from(""),
        section("  Coin"),
        Line::from(""),
        Line::from("  t             Next time range"),
        Line::from("  Esc           Back to markets"),
        Line::from(""),
        section("  General"),
        Line::from(""),
        Line::from("  r             Refresh now"),
        Line::from("  ?             Toggle help"),
        Line::from("  q / Ctrl+C    Quit"),
        Line::from(""),
        Line::from(Span::styled("  Press ? or Esc to close", Style::default().fg(DIM))),
    ];

    let help = Paragraph::new(help_text)
        .block(
            Block::default()
                .title(" Help ")
                .title_style(Style::default().fg(ACCENT).bold())
                .borders(Borders::ALL)
                .border_type(BorderType::Rounded)
                .border_style(Style::default().fg(ACCENT)),
        )
        .style(Style::default().bg(Color::Rgb(15, 15, 30)));

    frame.render_widget(help, popup);
}

// ─── Helpers ────────────────────────────────────────────────────────

fn panel(title: &str, color: Color) -> Block<'static> {
    Block::default()
        .title(title.to_string())
        .title_style(Style::default().fg(color).bold())
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(DIM))
}

fn stat_line(label: &str, value: String) -> Line<'static> {
    Line::from(vec![
        Span::styled(format!(" {label:<15}"), Style::default().fg(DIM)),
        Span::styled(value, Style::default().fg(WHITE)),
    ])
}

fn change_color(pct: f64) -> Color {
    if !pct.is_finite() || pct == 0.0 {
        DIM
    } else if pct > 0.0 {
        GREEN
    } else {
        RED
    }
}

/// `[────●─────]` with the marker at `position` percent.
fn range_bar(position: f64) -> String {
    let slot = ((position / 100.0) * (RANGE_BAR_WIDTH - 1) as f64).round() as usize;
    (0..RANGE_BAR_WIDTH)
        .map(|i| if i == slot.min(RANGE_BAR_WIDTH - 1) { '●' } else { '─' })
        .collect()
}

fn axis_time(ms: i64, range: TimeRange) -> String {
    let pattern = match range {
        TimeRange::Day => "%m-%d %H:%M",
        TimeRange::Week | TimeRange::Month | TimeRange::Quarter => "%m-%d",
        TimeRange::Year | TimeRange::Max => "%Y-%m",
    };
    DateTime::from_timestamp_millis(ms)
        .map(|dt| dt.format(pattern).to_string())
        .unwrap_or_default()
}

/// Drop HTML tags; CoinGecko descriptions embed anchors.
fn strip_tags(html: &str) -> String {
    let mut out = String::with_capacity(html.len());
    let mut in_tag = false;
    for ch in html.chars() {
        match ch {
            '<' => in_tag = true,
            '>' if in_tag => in_tag = false,
            _ if !in_tag => out.push(ch),
            _ => {}
        }
    }
    out.replace("\r\n", "\n")
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let head: String = s.chars().take(max.saturating_sub(1)).collect();
        format!("{head}…")
    }
}

/// Create a centered rectangle for overlay popups.
fn centered_rect(pct_x: u16, pct_y: u16, area: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - pct_y) / 2),
            Constraint::Percentage(pct_y),
            Constraint::Percentage((100 - pct_y) / 2),
        ])
        .split(area);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - pct_x) / 2),
            Constraint::Percentage(pct_x),
            Constraint::Percentage((100 - pct_x) / 2),
        ])
        .split(popup_layout[1])[1]
}
