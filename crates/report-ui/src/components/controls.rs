use crate::state::{ViewState, LEGEND_ORDER};
use crate::themes::Theme;
use ratatui::text::{Line, Span};
use report_core::models::Metric;

// ── MetricSelector ───────────────────────────────────────────────────────────

/// Radio-style metric choice plus the stacking checkbox.
///
/// Format: `"(•) Cumulative Payments ($)  ( ) Cumulative Renewal Count   [x] Stack Data"`
pub struct MetricSelector<'a> {
    pub state: &'a ViewState,
    pub theme: &'a Theme,
}

impl<'a> MetricSelector<'a> {
    pub fn new(state: &'a ViewState, theme: &'a Theme) -> Self {
        Self { state, theme }
    }

    pub fn to_line(&self) -> Line<'a> {
        let mut spans = Vec::new();
        for metric in [Metric::Payments, Metric::Counts] {
            let selected = metric == self.state.metric;
            let (mark, style) = if selected {
                ("(•) ", self.theme.selected)
            } else {
                ("( ) ", self.theme.dim)
            };
            spans.push(Span::styled(mark, style));
            spans.push(Span::styled(metric.title(), style));
            spans.push(Span::raw("  "));
        }
        spans.push(Span::raw(" "));
        spans.push(Span::styled(
            checkbox(self.state.stacked),
            self.theme.label,
        ));
        spans.push(Span::styled(" Stack Data", self.theme.label));
        Line::from(spans)
    }
}

// ── TypeLegend ───────────────────────────────────────────────────────────────

/// One entry per membership type with its toggle key and visibility.
///
/// Format: `"1 [x] Flexible  2 [ ] Standard (Annual)  ..."`; hidden types are
/// dimmed, visible ones use their series colour.
pub struct TypeLegend<'a> {
    pub state: &'a ViewState,
    pub theme: &'a Theme,
}

impl<'a> TypeLegend<'a> {
    pub fn new(state: &'a ViewState, theme: &'a Theme) -> Self {
        Self { state, theme }
    }

    pub fn to_line(&self) -> Line<'a> {
        let mut spans = Vec::new();
        for (i, t) in LEGEND_ORDER.into_iter().enumerate() {
            let visible = self.state.is_visible(t);
            let style = if visible {
                self.theme.type_style(t)
            } else {
                self.theme.dim
            };
            if i > 0 {
                spans.push(Span::raw("  "));
            }
            spans.push(Span::styled(format!("{} ", i + 1), self.theme.dim));
            spans.push(Span::styled(checkbox(visible), style));
            spans.push(Span::styled(format!(" {}", t.label()), style));
        }
        Line::from(spans)
    }
}

fn checkbox(checked: bool) -> &'static str {
    if checked {
        "[x]"
    } else {
        "[ ]"
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
