//! Application state and TUI event loop for the membership report viewer.
//!
//! [`App`] owns the theme, the loaded report and the interactive
//! [`ViewState`].  [`App::run`] drives the terminal until the user quits and
//! hands the final view state back so it can be persisted.

use std::io;
use std::time::Duration;

use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Frame, Terminal};

use report_core::time_utils::TimezoneHandler;

use crate::chart_view::{self, ReportView};
use crate::state::ViewState;
use crate::themes::Theme;

/// Root application state for the report viewer.
pub struct App {
    pub theme: Theme,
    pub timezone: TimezoneHandler,
    pub view: ReportView,
    pub state: ViewState,
    /// Set to `true` to break out of the event loop on the next iteration.
    pub should_quit: bool,
}

impl App {
    /// The cursor starts on the most recent date.
    pub fn new(
        theme_name: &str,
        timezone: TimezoneHandler,
        view: ReportView,
        state: ViewState,
    ) -> Self {
        let last = view.series(state.metric).len().saturating_sub(1);
        Self {
            theme: Theme::from_name(theme_name),
            timezone,
            view,
            state: ViewState {
                cursor: last,
                ..state
            },
            should_quit: false,
        }
    }

    // ── Event loop ────────────────────────────────────────────────────────────

    /// Run the viewer until `q`, `Esc` or `Ctrl+C`; returns the final state.
    ///
    /// The terminal is restored even when drawing or reading events fails.
    pub fn run(mut self) -> io::Result<ViewState> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;

        let result = self.event_loop(&mut terminal);

        disable_raw_mode()?;
        execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
        terminal.show_cursor()?;

        result.map(|()| self.state)
    }

    fn event_loop(
        &mut self,
        terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    ) -> io::Result<()> {
        let tick_rate = Duration::from_millis(250);

        while !self.should_quit {
            terminal.draw(|frame| self.render(frame))?;

            if event::poll(tick_rate)? {
                if let Event::Key(key) = event::read()? {
                    if key.kind == KeyEventKind::Press {
                        self.handle_key(key);
                    }
                }
            }
        }
        Ok(())
    }

    // ── Input ─────────────────────────────────────────────────────────────────

    /// Apply one key press to the view state.
    pub fn handle_key(&mut self, key: KeyEvent) {
        let len = self.view.series(self.state.metric).len();
        let state = &mut self.state;

        match key.code {
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.should_quit = true;
            }
            KeyCode::Char('q') | KeyCode::Char('Q') | KeyCode::Esc => self.should_quit = true,
            KeyCode::Char('m') | KeyCode::Tab | KeyCode::BackTab => {
                state.metric = state.metric.toggled();
            }
            KeyCode::Char('s') => state.stacked = !state.stacked,
            KeyCode::Char(c @ '1'..='5') => {
                if let Some(n) = c.to_digit(10) {
                    state.toggle_legend_key(n as usize);
                }
            }
            KeyCode::Left | KeyCode::Char('h') => {
                state.cursor = state.clamped_cursor(len).saturating_sub(1);
            }
            KeyCode::Right | KeyCode::Char('l') => {
                state.cursor = state.clamped_cursor(len).saturating_add(1);
                state.cursor = state.clamped_cursor(len);
            }
            KeyCode::Home => state.cursor = 0,
            KeyCode::End => state.cursor = len.saturating_sub(1),
            _ => {}
        }
    }

    // ── Rendering ─────────────────────────────────────────────────────────────

    fn render(&self, frame: &mut Frame) {
        let area = frame.area();
        chart_view::render_report_view(
            frame,
            area,
            &self.view,
            &self.state,
            &self.timezone,
            &self.theme,
        );
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Utc};
    use ratatui::backend::TestBackend;
    use report_core::models::{
        CountEntry, GenerationMarker, MembershipType, Metric, PaymentEntry, SeriesEntry, TypeValues,
    };

    fn la() -> TimezoneHandler {
        TimezoneHandler::new("America/Los_Angeles").unwrap()
    }

    fn view(days: usize) -> ReportView {
        let dates: Vec<DateTime<Utc>> = (0..days as i64)
            .map(|i| {
                DateTime::<Utc>::from_timestamp_millis(1_704_096_000_000 + i * 86_400_000).unwrap()
            })
            .collect();
        let payments: Vec<PaymentEntry> = dates
            .iter()
            .enumerate()
            .map(|(i, d)| {
                let mut v = TypeValues::<f64>::default();
                v[MembershipType::Flexible] = 10.0 * (i + 1) as f64;
                SeriesEntry { date: *d, values: v }
            })
            .collect();
        let counts: Vec<CountEntry> = dates
            .iter()
            .enumerate()
            .map(|(i, d)| {
                let mut v = TypeValues::<u32>::default();
                v[MembershipType::Flexible] = i as u32 + 1;
                SeriesEntry { date: *d, values: v }
            })
            .collect();
        let marker = GenerationMarker { today: Utc::now() };
        ReportView::new(&payments, &counts, marker)
    }

    fn make_app(days: usize) -> App {
        App::new("dark", la(), view(days), ViewState::default())
    }

    fn press(app: &mut App, code: KeyCode) {
        app.handle_key(KeyEvent::new(code, KeyModifiers::NONE));
    }

    #[test]
    fn test_app_starts_on_last_date() {
        let app = make_app(3);
        assert_eq!(app.state.cursor, 2);
        assert!(!app.should_quit);
    }

    #[test]
    fn test_app_with_empty_report() {
        let mut app = make_app(0);
        assert_eq!(app.state.cursor, 0);
        press(&mut app, KeyCode::Left);
        press(&mut app, KeyCode::Right);
        press(&mut app, KeyCode::End);
        assert_eq!(app.state.cursor, 0);
    }

    #[test]
    fn test_quit_keys() {
        for code in [KeyCode::Char('q'), KeyCode::Char('Q'), KeyCode::Esc] {
            let mut app = make_app(2);
            press(&mut app, code);
            assert!(app.should_quit, "{code:?} should quit");
        }

        let mut app = make_app(2);
        app.handle_key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL));
        assert!(app.should_quit);

        let mut app = make_app(2);
        press(&mut app, KeyCode::Char('c'));
        assert!(!app.should_quit, "plain 'c' is not a quit key");
    }

    #[test]
    fn test_metric_and_stack_toggles() {
        let mut app = make_app(2);
        press(&mut app, KeyCode::Char('m'));
        assert_eq!(app.state.metric, Metric::Counts);
        press(&mut app, KeyCode::Tab);
        assert_eq!(app.state.metric, Metric::Payments);

        press(&mut app, KeyCode::Char('s'));
        assert!(!app.state.stacked);
        press(&mut app, KeyCode::Char('s'));
        assert!(app.state.stacked);
    }

    #[test]
    fn test_number_keys_toggle_types() {
        let mut app = make_app(2);
        press(&mut app, KeyCode::Char('1'));
        press(&mut app, KeyCode::Char('5'));
        assert_eq!(
            app.state.hidden_types(),
            vec![MembershipType::Flexible, MembershipType::Regular]
        );
        press(&mut app, KeyCode::Char('1'));
        assert_eq!(app.state.hidden_types(), vec![MembershipType::Regular]);

        press(&mut app, KeyCode::Char('9'));
        assert_eq!(app.state.hidden_types(), vec![MembershipType::Regular]);
    }

    #[test]
    fn test_cursor_movement_is_clamped() {
        let mut app = make_app(3);
        press(&mut app, KeyCode::Right);
        assert_eq!(app.state.cursor, 2);

        press(&mut app, KeyCode::Left);
        press(&mut app, KeyCode::Left);
        press(&mut app, KeyCode::Left);
        assert_eq!(app.state.cursor, 0);

        press(&mut app, KeyCode::End);
        assert_eq!(app.state.cursor, 2);
        press(&mut app, KeyCode::Home);
        assert_eq!(app.state.cursor, 0);
        press(&mut app, KeyCode::Right);
        assert_eq!(app.state.cursor, 1);
    }

    #[test]
    fn test_initial_state_is_kept() {
        let state = ViewState::new(Metric::Counts, false, &[MembershipType::StandardMonthly]);
        let app = App::new("classic", la(), view(4), state);
        assert_eq!(app.state.metric, Metric::Counts);
        assert!(!app.state.stacked);
        assert_eq!(app.state.hidden_types(), vec![MembershipType::StandardMonthly]);
        assert_eq!(app.state.cursor, 3);
    }

    #[test]
    fn test_render_into_test_backend() {
        let app = make_app(3);
        let mut terminal = Terminal::new(TestBackend::new(120, 30)).unwrap();
        terminal.draw(|frame| app.render(frame)).unwrap();

        let buffer = terminal.backend().buffer();
        let screen: String = buffer.content.iter().map(|c| c.symbol()).collect();
        assert!(screen.contains("Grand Total: $30"));
    }
}
