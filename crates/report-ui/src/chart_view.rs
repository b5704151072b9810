//! Cumulative series chart for the membership report.
//!
//! Draws one Braille line per visible membership type against a calendar-day
//! x axis, a vertical cursor on the selected date and a tooltip box listing
//! each visible type's value plus a grand total.

use chrono::{DateTime, Utc};
use ratatui::{
    layout::{Constraint, Layout, Rect},
    symbols::Marker,
    text::{Line, Span, Text},
    widgets::{Axis, Block, Borders, Chart, Clear, Dataset, GraphType, Paragraph},
    Frame,
};
use unicode_width::UnicodeWidthStr;

use report_core::formatting::format_metric_value;
use report_core::models::{
    CountEntry, GenerationMarker, MembershipType, Metric, PaymentEntry, SeriesEntry, TypeValues,
};
use report_core::time_utils::TimezoneHandler;

use crate::components::{Header, MetricSelector, TypeLegend};
use crate::state::ViewState;
use crate::themes::Theme;

const SECONDS_PER_DAY: f64 = 86_400.0;
const DATE_FORMAT: &str = "%-m/%-d/%Y";
const DATA_AS_OF_FORMAT: &str = "%-m/%-d/%Y, %-I:%M:%S %p";
const GRAND_TOTAL: &str = "Grand Total:";

// ── Data ──────────────────────────────────────────────────────────────────────

/// One metric's cumulative series, widened to `f64` for plotting.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChartSeries {
    pub dates: Vec<DateTime<Utc>>,
    pub values: Vec<TypeValues<f64>>,
}

impl ChartSeries {
    pub fn from_entries<T: Copy + Into<f64>>(entries: &[SeriesEntry<T>]) -> Self {
        Self {
            dates: entries.iter().map(|e| e.date).collect(),
            values: entries
                .iter()
                .map(|e| e.values.map(|v| -> f64 { v.into() }))
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }
}

/// Everything the viewer displays, loaded once at startup.
#[derive(Debug, Clone)]
pub struct ReportView {
    pub payments: ChartSeries,
    pub counts: ChartSeries,
    pub generated_at: DateTime<Utc>,
}

impl ReportView {
    pub fn new(payments: &[PaymentEntry], counts: &[CountEntry], marker: GenerationMarker) -> Self {
        Self {
            payments: ChartSeries::from_entries(payments),
            counts: ChartSeries::from_entries(counts),
            generated_at: marker.today,
        }
    }

    /// Series backing `metric`.
    pub fn series(&self, metric: Metric) -> &ChartSeries {
        match metric {
            Metric::Payments => &self.payments,
            Metric::Counts => &self.counts,
        }
    }
}

/// Points of one drawn line.
#[derive(Debug, Clone, PartialEq)]
pub struct PlottedSeries {
    pub membership_type: MembershipType,
    pub points: Vec<(f64, f64)>,
}

/// Values under the cursor.
#[derive(Debug, Clone, PartialEq)]
pub struct Tooltip {
    pub date: DateTime<Utc>,
    pub rows: Vec<(MembershipType, f64)>,
    pub grand_total: f64,
}

// ── Geometry ──────────────────────────────────────────────────────────────────

/// X coordinate of a date, in days since the Unix epoch.
pub fn day_x(date: DateTime<Utc>) -> f64 {
    date.timestamp() as f64 / SECONDS_PER_DAY
}

fn x_to_date(x: f64) -> Option<DateTime<Utc>> {
    DateTime::<Utc>::from_timestamp((x * SECONDS_PER_DAY).round() as i64, 0)
}

/// Lines for the visible types in legend order.
///
/// When stacked, each line is drawn on top of the visible lines before it.
pub fn plotted_series(series: &ChartSeries, state: &ViewState) -> Vec<PlottedSeries> {
    let mut base = vec![0.0; series.len()];
    let mut plotted = Vec::new();

    for t in state.visible_types() {
        let mut points = Vec::with_capacity(series.len());
        for ((date, values), floor) in series.dates.iter().zip(&series.values).zip(&mut base) {
            let y = if state.stacked {
                *floor += values[t];
                *floor
            } else {
                values[t]
            };
            points.push((day_x(*date), y));
        }
        plotted.push(PlottedSeries {
            membership_type: t,
            points,
        });
    }
    plotted
}

/// `[first, last]` day of the series, widened when there is only one day.
pub fn x_bounds(series: &ChartSeries) -> [f64; 2] {
    match (series.dates.first(), series.dates.last()) {
        (Some(first), Some(last)) if first != last => [day_x(*first), day_x(*last)],
        (Some(only), _) => [day_x(*only) - 1.0, day_x(*only) + 1.0],
        _ => [0.0, 1.0],
    }
}

/// Top of the y axis: the highest plotted value, or 1 when nothing is above 0.
pub fn y_upper_bound(plotted: &[PlottedSeries]) -> f64 {
    let max = plotted
        .iter()
        .flat_map(|p| p.points.iter().map(|(_, y)| *y))
        .fold(0.0_f64, f64::max);
    if max > 0.0 {
        max
    } else {
        1.0
    }
}

/// Tooltip for the cursor position; `None` for an empty series.
pub fn tooltip(series: &ChartSeries, state: &ViewState) -> Option<Tooltip> {
    if series.is_empty() {
        return None;
    }
    let index = state.clamped_cursor(series.len());
    let values = &series.values[index];
    let rows: Vec<(MembershipType, f64)> = state.visible_types().map(|t| (t, values[t])).collect();
    let grand_total: f64 = rows.iter().map(|(_, v)| v).sum();

    Some(Tooltip {
        date: series.dates[index],
        rows,
        grand_total,
    })
}

// ── Line builders ─────────────────────────────────────────────────────────────

/// Tooltip body: one aligned row per visible type, a rule, and the total.
pub fn tooltip_lines<'a>(tip: &Tooltip, metric: Metric, theme: &'a Theme) -> Vec<Line<'a>> {
    let values: Vec<String> = tip
        .rows
        .iter()
        .map(|(_, v)| format_metric_value(metric, *v))
        .collect();
    let label_width = tip
        .rows
        .iter()
        .map(|(t, _)| t.label().width())
        .max()
        .unwrap_or(0);
    let value_width = values.iter().map(|v| v.width()).max().unwrap_or(0);

    let mut lines: Vec<Line<'a>> = tip
        .rows
        .iter()
        .zip(&values)
        .map(|((t, _), value)| {
            Line::from(vec![
                Span::styled("■ ", theme.type_style(*t)),
                Span::styled(pad_right(t.label(), label_width), theme.label),
                Span::raw("  "),
                Span::styled(pad_left(value, value_width), theme.value),
            ])
        })
        .collect();

    let total = format_metric_value(metric, tip.grand_total);
    let row_width = 2 + label_width + 2 + value_width;
    let total_width = GRAND_TOTAL.width() + 1 + total.width();
    let width = row_width.max(total_width);

    lines.push(Line::from(Span::styled("─".repeat(width), theme.dim)));
    lines.push(Line::from(Span::styled(
        pad_left(&format!("{GRAND_TOTAL} {total}"), width),
        theme.tooltip_total,
    )));
    lines
}

fn pad_right(s: &str, width: usize) -> String {
    format!("{s}{}", " ".repeat(width.saturating_sub(s.width())))
}

fn pad_left(s: &str, width: usize) -> String {
    format!("{}{s}", " ".repeat(width.saturating_sub(s.width())))
}

// ── Rendering ─────────────────────────────────────────────────────────────────

/// Render the whole report screen: header, controls, legend, chart, help.
pub fn render_report_view(
    frame: &mut Frame,
    area: Rect,
    view: &ReportView,
    state: &ViewState,
    timezone: &TimezoneHandler,
    theme: &Theme,
) {
    let [header_area, controls_area, legend_area, chart_area, help_area] = Layout::vertical([
        Constraint::Length(4),
        Constraint::Length(1),
        Constraint::Length(1),
        Constraint::Min(8),
        Constraint::Length(1),
    ])
    .areas(area);

    let data_as_of = timezone.format_local(view.generated_at, DATA_AS_OF_FORMAT);
    let header = Header::new(&data_as_of, timezone.name(), theme);
    frame.render_widget(Paragraph::new(Text::from(header.to_lines())), header_area);
    frame.render_widget(
        Paragraph::new(MetricSelector::new(state, theme).to_line()),
        controls_area,
    );
    frame.render_widget(
        Paragraph::new(TypeLegend::new(state, theme).to_line()),
        legend_area,
    );

    let series = view.series(state.metric);
    if series.is_empty() {
        render_no_data(frame, chart_area, theme);
    } else {
        render_chart(frame, chart_area, series, state, timezone, theme);
    }

    frame.render_widget(
        Paragraph::new(Line::from(Span::styled(
            "m/Tab metric   s stack   1-5 types   ←/→ Home/End date   q quit",
            theme.dim,
        ))),
        help_area,
    );
}

/// Render the chart and its tooltip for a non-empty series.
pub fn render_chart(
    frame: &mut Frame,
    area: Rect,
    series: &ChartSeries,
    state: &ViewState,
    timezone: &TimezoneHandler,
    theme: &Theme,
) {
    let plotted = plotted_series(series, state);
    let [x_lo, x_hi] = x_bounds(series);
    let y_hi = y_upper_bound(&plotted);

    let cursor_x = day_x(series.dates[state.clamped_cursor(series.len())]);
    let cursor_points = [(cursor_x, 0.0), (cursor_x, y_hi)];

    // Cursor first so the series lines are drawn over it.
    let mut datasets = vec![Dataset::default()
        .marker(Marker::Braille)
        .graph_type(GraphType::Line)
        .style(theme.cursor)
        .data(&cursor_points)];
    datasets.extend(plotted.iter().map(|p| {
        Dataset::default()
            .name(p.membership_type.label())
            .marker(Marker::Braille)
            .graph_type(GraphType::Line)
            .style(theme.type_style(p.membership_type))
            .data(&p.points)
    }));

    let x_labels: Vec<Line> = [x_lo, (x_lo + x_hi) / 2.0, x_hi]
        .into_iter()
        .map(|x| {
            let label = x_to_date(x)
                .map(|d| timezone.format_local(d, DATE_FORMAT))
                .unwrap_or_default();
            Line::from(Span::styled(label, theme.axis))
        })
        .collect();
    let y_labels: Vec<Line> = [0.0, y_hi / 2.0, y_hi]
        .into_iter()
        .map(|y| Line::from(Span::styled(format_metric_value(state.metric, y), theme.axis)))
        .collect();

    let chart = Chart::new(datasets)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(theme.separator)
                .title(Span::styled(format!(" {} ", state.metric.title()), theme.header)),
        )
        .x_axis(
            Axis::default()
                .style(theme.axis)
                .bounds([x_lo, x_hi])
                .labels(x_labels),
        )
        .y_axis(
            Axis::default()
                .style(theme.axis)
                .bounds([0.0, y_hi])
                .labels(y_labels),
        )
        .legend_position(None);
    frame.render_widget(chart, area);

    if let Some(tip) = tooltip(series, state) {
        render_tooltip(frame, area, &tip, state.metric, timezone, theme);
    }
}

/// Boxed tooltip in the top-right corner of `chart_area`.
fn render_tooltip(
    frame: &mut Frame,
    chart_area: Rect,
    tip: &Tooltip,
    metric: Metric,
    timezone: &TimezoneHandler,
    theme: &Theme,
) {
    let lines = tooltip_lines(tip, metric, theme);
    let title = format!(" Date ≤ {} ", timezone.format_local(tip.date, DATE_FORMAT));

    let content_width = lines.iter().map(Line::width).max().unwrap_or(0);
    let width = (content_width.max(title.width()) + 4) as u16;
    let height = lines.len() as u16 + 2;

    let x = chart_area
        .right()
        .saturating_sub(width + 1)
        .max(chart_area.x);
    let popup = Rect::new(x, chart_area.y + 1, width, height).intersection(chart_area);

    frame.render_widget(Clear, popup);
    frame.render_widget(
        Paragraph::new(Text::from(lines)).block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(theme.tooltip_border)
                .title(Span::styled(title, theme.value)),
        ),
        popup,
    );
}

/// Placeholder when the selected series has no points.
pub fn render_no_data(frame: &mut Frame, area: Rect, theme: &Theme) {
    let text = vec![
        Line::from(""),
        Line::from(Span::styled("No report data found", theme.warning)),
        Line::from(""),
        Line::from(Span::styled(
            "Run with --mode generate to fetch the membership change report.",
            theme.dim,
        )),
        Line::from(Span::styled("Press 'q' or Ctrl+C to exit", theme.dim)),
    ];
    frame.render_widget(
        Paragraph::new(Text::from(text)).block(Block::default().borders(Borders::ALL)),
        area,
    );
}

// ── Tests ──────────────────────────────────────────────────────────────────────
