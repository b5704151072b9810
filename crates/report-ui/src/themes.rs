use ratatui::style::{Color, Modifier, Style};
use report_core::models::MembershipType;

/// Terminal background type detection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BackgroundType {
    Dark,
    Light,
}

/// Detect terminal background type from the `COLORFGBG` environment variable.
///
/// The variable has the format `"foreground;background"`.  Background values
/// 0–6 are considered dark; 7–15 are considered light.  If the variable is
/// absent or unparseable, `BackgroundType::Dark` is returned.
pub fn detect_background() -> BackgroundType {
    std::env::var("COLORFGBG")
        .ok()
        .as_deref()
        .and_then(background_from_colorfgbg)
        .unwrap_or(BackgroundType::Dark)
}

fn background_from_colorfgbg(value: &str) -> Option<BackgroundType> {
    let bg = value.split(';').next_back()?.parse::<u8>().ok()?;
    Some(if bg <= 6 {
        BackgroundType::Dark
    } else {
        BackgroundType::Light
    })
}

/// Orange used for the `regular` series where the terminal supports RGB.
const ORANGE: Color = Color::Rgb(255, 133, 27);

/// Complete theme definition carrying all UI styles used by report-ui
/// components.
#[derive(Debug, Clone)]
pub struct Theme {
    // ── Header ───────────────────────────────────────────────────────────────
    pub header: Style,
    pub header_sparkle: Style,
    pub separator: Style,

    // ── Text ─────────────────────────────────────────────────────────────────
    pub text: Style,
    pub dim: Style,
    pub label: Style,
    pub value: Style,
    pub warning: Style,

    // ── Chart ────────────────────────────────────────────────────────────────
    pub axis: Style,
    pub cursor: Style,
    pub selected: Style,
    pub tooltip_border: Style,
    pub tooltip_total: Style,

    // ── Membership types ─────────────────────────────────────────────────────
    pub flexible: Style,
    pub standard_annual: Style,
    pub standard_monthly: Style,
    pub sustaining_annual: Style,
    pub regular: Style,
}

impl Theme {
    // ── Constructors ─────────────────────────────────────────────────────────

    /// Dark-background terminal theme (default).
    pub fn dark() -> Self {
        Self {
            header: Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
            header_sparkle: Style::default().fg(Color::Yellow),
            separator: Style::default().fg(Color::DarkGray),

            text: Style::default().fg(Color::White),
            dim: Style::default().fg(Color::DarkGray),
            label: Style::default().fg(Color::Gray),
            value: Style::default()
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
            warning: Style::default().fg(Color::Yellow),

            axis: Style::default().fg(Color::Gray),
            cursor: Style::default().fg(Color::DarkGray),
            selected: Style::default()
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
            tooltip_border: Style::default().fg(Color::Gray),
            tooltip_total: Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),

            flexible: Style::default().fg(Color::Blue),
            standard_annual: Style::default().fg(Color::Green),
            standard_monthly: Style::default().fg(Color::Red),
            sustaining_annual: Style::default().fg(Color::Magenta),
            regular: Style::default().fg(ORANGE),
        }
    }

    /// Light-background terminal theme.
    pub fn light() -> Self {
        Self {
            header: Style::default()
                .fg(Color::Blue)
                .add_modifier(Modifier::BOLD),
            header_sparkle: Style::default().fg(Color::Magenta),
            separator: Style::default().fg(Color::Gray),

            text: Style::default().fg(Color::Black),
            dim: Style::default().fg(Color::Gray),
            label: Style::default().fg(Color::DarkGray),
            value: Style::default()
                .fg(Color::Black)
                .add_modifier(Modifier::BOLD),
            warning: Style::default().fg(Color::Red),

            axis: Style::default().fg(Color::DarkGray),
            cursor: Style::default().fg(Color::Gray),
            selected: Style::default()
                .fg(Color::Black)
                .add_modifier(Modifier::BOLD),
            tooltip_border: Style::default().fg(Color::Gray),
            tooltip_total: Style::default()
                .fg(Color::Magenta)
                .add_modifier(Modifier::BOLD),

            flexible: Style::default().fg(Color::Blue),
            standard_annual: Style::default().fg(Color::Green),
            standard_monthly: Style::default().fg(Color::Red),
            sustaining_annual: Style::default().fg(Color::Magenta),
            regular: Style::default().fg(ORANGE),
        }
    }

    /// Classic terminal theme using only the basic 8-colour ANSI palette.
    ///
    /// No bold modifiers, and `regular` is drawn in plain yellow.
    pub fn classic() -> Self {
        Self {
            header: Style::default().fg(Color::Cyan),
            header_sparkle: Style::default().fg(Color::White),
            separator: Style::default().fg(Color::DarkGray),

            text: Style::default().fg(Color::White),
            dim: Style::default().fg(Color::DarkGray),
            label: Style::default().fg(Color::Gray),
            value: Style::default().fg(Color::White),
            warning: Style::default().fg(Color::Yellow),

            axis: Style::default().fg(Color::Gray),
            cursor: Style::default().fg(Color::DarkGray),
            selected: Style::default().fg(Color::White),
            tooltip_border: Style::default().fg(Color::DarkGray),
            tooltip_total: Style::default().fg(Color::Yellow),

            flexible: Style::default().fg(Color::Blue),
            standard_annual: Style::default().fg(Color::Green),
            standard_monthly: Style::default().fg(Color::Red),
            sustaining_annual: Style::default().fg(Color::Magenta),
            regular: Style::default().fg(Color::Yellow),
        }
    }

    /// Choose a theme automatically based on the detected terminal background.
    pub fn auto_detect() -> Self {
        match detect_background() {
            BackgroundType::Light => Self::light(),
            BackgroundType::Dark => Self::dark(),
        }
    }

    /// Construct a theme by name.  Falls back to `auto_detect` for unknown
    /// names.
    pub fn from_name(name: &str) -> Self {
        match name {
            "light" => Self::light(),
            "dark" => Self::dark(),
            "classic" => Self::classic(),
            _ => Self::auto_detect(),
        }
    }

    // ── Style helpers ────────────────────────────────────────────────────────

    /// Series colour for a membership type.
    pub fn type_style(&self, membership_type: MembershipType) -> Style {
        match membership_type {
            MembershipType::Flexible => self.flexible,
            MembershipType::StandardAnnual => self.standard_annual,
            MembershipType::StandardMonthly => self.standard_monthly,
            MembershipType::SustainingAnnual => self.sustaining_annual,
            MembershipType::Regular => self.regular,
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
