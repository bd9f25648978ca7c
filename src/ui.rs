use crate::devices::DeviceShare;
use crate::model;
use crate::report::{self, Report};
use crate::stats::{Metric, RankedRow, TimeSeries};
use ratatui::prelude::*;
use ratatui::symbols;
use ratatui::widgets::{
    Axis, Bar, BarChart, BarGroup, Block, Borders, Chart, Dataset, Gauge, GraphType, Paragraph,
    Wrap,
};

const APP_TITLE: &str = "tune-history  ";
const HINT: &str = "q / Esc to close";

#[derive(Clone, Copy)]
struct Palette {
    bg: Color,
    panel_bg: Color,
    border: Color,
    text: Color,
    muted: Color,
    accent: Color,
    alert: Color,
}

const PALETTE: Palette = Palette {
    bg: Color::Rgb(10, 15, 24),
    panel_bg: Color::Rgb(19, 29, 43),
    border: Color::Rgb(69, 121, 176),
    text: Color::Rgb(214, 228, 248),
    muted: Color::Rgb(149, 173, 204),
    accent: Color::Rgb(100, 203, 184),
    alert: Color::Rgb(249, 174, 88),
};

pub fn draw_report(frame: &mut Frame, report: &Report) {
    let colors = PALETTE;
    frame.render_widget(
        Block::default().style(Style::default().bg(colors.bg)),
        frame.area(),
    );

    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Min(4),
            Constraint::Length(1),
        ])
        .split(frame.area());

    let header = Paragraph::new(Line::from(vec![
        Span::styled(
            APP_TITLE,
            Style::default()
                .fg(colors.accent)
                .add_modifier(Modifier::BOLD),
        ),
        Span::styled(report.title(), Style::default().fg(colors.text)),
    ]));
    frame.render_widget(header, vertical[0]);

    let title = report.title();
    match report {
        Report::Ranking { metric, rows, .. } => {
            draw_ranking(frame, vertical[1], &title, *metric, rows, &colors)
        }
        Report::Series { metric, series, .. } => {
            draw_series(frame, vertical[1], &title, *metric, series, &colors)
        }
        Report::Devices(share) => draw_devices(frame, vertical[1], &title, share, &colors),
        other => {
            let body = Paragraph::new(report::render_text(other))
                .block(panel_block(&title, &colors))
                .style(Style::default().fg(colors.text))
                .wrap(Wrap { trim: false });
            frame.render_widget(body, vertical[1]);
        }
    }

    frame.render_widget(
        Paragraph::new(Span::styled(HINT, Style::default().fg(colors.muted)))
            .alignment(Alignment::Right),
        vertical[2],
    );
}

fn panel_block<'a>(title: &str, colors: &Palette) -> Block<'a> {
    Block::default()
        .borders(Borders::ALL)
        .title(Span::styled(
            format!(" {title} "),
            Style::default().fg(colors.text).add_modifier(Modifier::BOLD),
        ))
        .border_style(Style::default().fg(colors.border))
        .style(Style::default().bg(colors.panel_bg))
}

/// Horizontal bars, biggest group on top.
fn draw_ranking(
    frame: &mut Frame,
    area: Rect,
    title: &str,
    metric: Metric,
    rows: &[RankedRow],
    colors: &Palette,
) {
    let bars: Vec<Bar> = rows
        .iter()
        .map(|row| {
            let value = row.metric_value(metric);
            Bar::default()
                .value(chart_value(metric, value))
                .label(Line::from(row.key.display_name()))
                .text_value(report::format_metric(metric, value))
                .style(Style::default().fg(colors.accent))
                .value_style(Style::default().fg(colors.bg).bg(colors.accent))
        })
        .collect();

    let chart = BarChart::default()
        .block(panel_block(title, colors))
        .direction(Direction::Horizontal)
        .bar_width(1)
        .bar_gap(0)
        .label_style(Style::default().fg(colors.text))
        .data(BarGroup::default().bars(&bars));
    frame.render_widget(chart, area);
}

fn draw_series(
    frame: &mut Frame,
    area: Rect,
    title: &str,
    metric: Metric,
    series: &TimeSeries,
    colors: &Palette,
) {
    let points = series_points(metric, series);
    let max_y = points
        .iter()
        .map(|(_, y)| *y)
        .fold(0.0_f64, f64::max)
        .max(1.0);
    let max_x = (points.len().saturating_sub(1) as f64).max(1.0);

    let first_label = series
        .points
        .first()
        .map(|point| model::format_date(point.start))
        .unwrap_or_default();
    let last_label = series
        .points
        .last()
        .map(|point| model::format_date(point.start))
        .unwrap_or_default();

    let dataset = Dataset::default()
        .name(metric.label())
        .marker(symbols::Marker::Braille)
        .graph_type(GraphType::Line)
        .style(Style::default().fg(colors.accent))
        .data(&points);

    let y_title = match metric {
        Metric::Plays => "plays",
        Metric::ListenTime => "hours",
    };

    let chart = Chart::new(vec![dataset])
        .block(panel_block(title, colors))
        .x_axis(
            Axis::default()
                .style(Style::default().fg(colors.muted))
                .bounds([0.0, max_x])
                .labels(vec![first_label, last_label]),
        )
        .y_axis(
            Axis::default()
                .title(y_title)
                .style(Style::default().fg(colors.muted))
                .bounds([0.0, max_y])
                .labels(vec![String::from("0"), format!("{max_y:.1}")]),
        );
    frame.render_widget(chart, area);
}

/// Two gauges stand in for a pie chart.
fn draw_devices(
    frame: &mut Frame,
    area: Rect,
    title: &str,
    share: &DeviceShare,
    colors: &Palette,
) {
    let block = panel_block(title, colors);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Min(0),
        ])
        .split(inner);

    let gauges = [
        ("Smartphone", share.smartphone_percent, colors.accent),
        ("PC", share.pc_percent, colors.alert),
    ];
    for ((label, percent, color), slot) in gauges.into_iter().zip(rows.iter()) {
        let gauge = Gauge::default()
            .block(Block::default().borders(Borders::ALL).title(label))
            .gauge_style(Style::default().fg(color).bg(colors.panel_bg))
            .ratio((percent / 100.0).clamp(0.0, 1.0))
            .label(format!("{percent:.1}%"));
        frame.render_widget(gauge, *slot);
    }

    if share.unclassified_plays > 0 {
        frame.render_widget(
            Paragraph::new(Span::styled(
                format!("{} plays on other devices", share.unclassified_plays),
                Style::default().fg(colors.muted),
            )),
            rows[2],
        );
    }
}

fn series_points(metric: Metric, series: &TimeSeries) -> Vec<(f64, f64)> {
    series
        .points
        .iter()
        .enumerate()
        .map(|(index, point)| {
            let value = point.metric_value(metric) as f64;
            let y = match metric {
                Metric::Plays => value,
                Metric::ListenTime => value / 3_600_000.0,
            };
            (index as f64, y)
        })
        .collect()
}

/// Bars are drawn in whole minutes for listening time so the values stay
/// comparable on narrow terminals.
fn chart_value(metric: Metric, value: u64) -> u64 {
    match metric {
        Metric::Plays => value,
        Metric::ListenTime => value / 60_000,
    }
}
