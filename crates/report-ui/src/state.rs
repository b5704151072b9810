//! Interactive viewer state: metric, stacking, type visibility and cursor.

use report_core::models::{MembershipType, Metric, TypeValues};

/// Order in which types are stacked, listed in the legend and bound to the
/// `1`-`5` keys.
pub const LEGEND_ORDER: [MembershipType; MembershipType::COUNT] = [
    MembershipType::Flexible,
    MembershipType::StandardAnnual,
    MembershipType::StandardMonthly,
    MembershipType::SustainingAnnual,
    MembershipType::Regular,
];

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewState {
    pub metric: Metric,
    pub stacked: bool,
    pub visible: TypeValues<bool>,
    /// Index of the selected date; clamped to the series when rendering.
    pub cursor: usize,
}

impl Default for ViewState {
    fn default() -> Self {
        Self {
            metric: Metric::Payments,
            stacked: true,
            visible: TypeValues::from_array([true; MembershipType::COUNT]),
            cursor: 0,
        }
    }
}

impl ViewState {
    pub fn new(metric: Metric, stacked: bool, hidden: &[MembershipType]) -> Self {
        let mut state = Self {
            metric,
            stacked,
            ..Self::default()
        };
        for t in hidden {
            state.visible[*t] = false;
        }
        state
    }

    pub fn is_visible(&self, t: MembershipType) -> bool {
        self.visible[t]
    }

    pub fn toggle_type(&mut self, t: MembershipType) {
        self.visible[t] = !self.visible[t];
    }

    /// Toggle the type bound to legend key `n` (1-based); other keys are ignored.
    pub fn toggle_legend_key(&mut self, n: usize) {
        if let Some(t) = n.checked_sub(1).and_then(|i| LEGEND_ORDER.get(i)) {
            self.toggle_type(*t);
        }
    }

    /// Visible types in legend order.
    pub fn visible_types(&self) -> impl Iterator<Item = MembershipType> + '_ {
        LEGEND_ORDER.into_iter().filter(|t| self.visible[*t])
    }

    /// Hidden types in legend order, as persisted between runs.
    pub fn hidden_types(&self) -> Vec<MembershipType> {
        LEGEND_ORDER
            .into_iter()
            .filter(|t| !self.visible[*t])
            .collect()
    }

    /// Cursor index valid for a series of `len` points.
    pub fn clamped_cursor(&self, len: usize) -> usize {
        self.cursor.min(len.saturating_sub(1))
    }
}
