use chrono::{DateTime, NaiveDate, Utc};
use serde::de::{DeserializeOwned, Error as _};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::HashMap;
use std::fmt;
use std::ops::{Add, Index, IndexMut};

// ── MembershipType ─────────────────────────────────────────────────────────────

/// The closed set of membership types tracked by the renewal report.
///
/// Anything the upstream system reports outside this set is ignored during
/// aggregation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MembershipType {
    Flexible,
    StandardMonthly,
    StandardAnnual,
    SustainingAnnual,
    Regular,
}

impl MembershipType {
    /// Number of tracked types.
    pub const COUNT: usize = 5;

    /// Every tracked type, in report column order.
    pub const ALL: [MembershipType; Self::COUNT] = [
        MembershipType::Flexible,
        MembershipType::StandardMonthly,
        MembershipType::StandardAnnual,
        MembershipType::SustainingAnnual,
        MembershipType::Regular,
    ];

    /// Label exactly as it appears in the upstream `To` column and in the
    /// persisted artifacts.
    pub fn label(self) -> &'static str {
        match self {
            MembershipType::Flexible => "Flexible",
            MembershipType::StandardMonthly => "Standard (Monthly)",
            MembershipType::StandardAnnual => "Standard (Annual)",
            MembershipType::SustainingAnnual => "Sustaining (Annual)",
            MembershipType::Regular => "regular",
        }
    }

    /// Resolve an upstream label.  Matching is exact and case-sensitive.
    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.label() == label)
    }

    /// Position of this type inside [`TypeValues`].
    pub fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for MembershipType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl Serialize for MembershipType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.label())
    }
}

impl<'de> Deserialize<'de> for MembershipType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let label = String::deserialize(deserializer)?;
        Self::from_label(&label)
            .ok_or_else(|| D::Error::custom(format!("unknown membership type: {label}")))
    }
}

// ── TypeValues ─────────────────────────────────────────────────────────────────

/// One value per tracked [`MembershipType`].
///
/// Every type is always present, so a bucket can never be missing a column.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TypeValues<T>([T; MembershipType::COUNT]);

impl<T: Copy + Default> Default for TypeValues<T> {
    fn default() -> Self {
        Self([T::default(); MembershipType::COUNT])
    }
}

impl<T: Copy> TypeValues<T> {
    /// Build from values listed in [`MembershipType::ALL`] order.
    pub fn from_array(values: [T; MembershipType::COUNT]) -> Self {
        Self(values)
    }

    /// Iterate `(type, value)` pairs in column order.
    pub fn iter(&self) -> impl Iterator<Item = (MembershipType, T)> + '_ {
        MembershipType::ALL.into_iter().map(move |t| (t, self.0[t.index()]))
    }

    /// Apply `f` to every value.
    pub fn map<U: Copy>(&self, f: impl Fn(T) -> U) -> TypeValues<U> {
        TypeValues(self.0.map(f))
    }
}

impl<T: Copy + Into<f64>> TypeValues<T> {
    /// Sum of every type's value, as `f64`.
    pub fn total(&self) -> f64 {
        self.0.iter().map(|v| (*v).into()).sum()
    }
}

impl<T> Index<MembershipType> for TypeValues<T> {
    type Output = T;

    fn index(&self, t: MembershipType) -> &T {
        &self.0[t.index()]
    }
}

impl<T> IndexMut<MembershipType> for TypeValues<T> {
    fn index_mut(&mut self, t: MembershipType) -> &mut T {
        &mut self.0[t.index()]
    }
}

impl<T: Copy + Add<Output = T>> Add for TypeValues<T> {
    type Output = TypeValues<T>;

    fn add(self, rhs: Self) -> Self::Output {
        let mut out = self;
        for (slot, v) in out.0.iter_mut().zip(rhs.0) {
            *slot = *slot + v;
        }
        out
    }
}

// ── TransactionRecord ──────────────────────────────────────────────────────────

/// A single row of the membership-change report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionRecord {
    /// Calendar day the change happened.
    pub date: NaiveDate,
    /// Membership type before the change (informational only).
    pub from_type: String,
    /// Membership type after the change.
    pub to_type: String,
    /// Raw cost column; may be malformed.
    pub cost: String,
}

impl TransactionRecord {
    /// Tracked destination type, or `None` when the record should be ignored.
    pub fn membership_type(&self) -> Option<MembershipType> {
        MembershipType::from_label(&self.to_type)
    }
}

// ── DailyBucket ────────────────────────────────────────────────────────────────

/// Per-day totals before accumulation.
#[derive(Debug, Clone, PartialEq)]
pub struct DailyBucket {
    pub date: NaiveDate,
    /// Sum of costs per destination type.
    pub payments: TypeValues<f64>,
    /// Number of records per destination type.
    pub counts: TypeValues<u32>,
}

impl DailyBucket {
    /// A bucket with every type explicitly zeroed.
    pub fn empty(date: NaiveDate) -> Self {
        Self {
            date,
            payments: TypeValues::default(),
            counts: TypeValues::default(),
        }
    }
}

// ── SeriesEntry ────────────────────────────────────────────────────────────────

/// One point of a persisted cumulative series.
///
/// Serialises to `{"date": <epoch ms>, "Flexible": .., ..., "regular": ..}`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SeriesEntry<T> {
    /// Start of the calendar day in the report timezone.
    pub date: DateTime<Utc>,
    pub values: TypeValues<T>,
}

/// Cumulative payment amount per type.
pub type PaymentEntry = SeriesEntry<f64>;

/// Cumulative renewal count per type.
pub type CountEntry = SeriesEntry<u32>;

impl<T: Serialize + Copy> Serialize for SeriesEntry<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1 + MembershipType::COUNT))?;
        map.serialize_entry("date", &self.date.timestamp_millis())?;
        for (t, v) in self.values.iter() {
            map.serialize_entry(t.label(), &v)?;
        }
        map.end()
    }
}

impl<'de, T> Deserialize<'de> for SeriesEntry<T>
where
    T: DeserializeOwned + Copy + Default,
{
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let mut fields: HashMap<String, serde_json::Value> = HashMap::deserialize(deserializer)?;

        let millis = fields
            .remove("date")
            .and_then(|v| v.as_i64())
            .ok_or_else(|| D::Error::missing_field("date"))?;
        let date = DateTime::<Utc>::from_timestamp_millis(millis)
            .ok_or_else(|| D::Error::custom(format!("timestamp out of range: {millis}")))?;

        let mut values = TypeValues::default();
        for t in MembershipType::ALL {
            let raw = fields
                .remove(t.label())
                .ok_or_else(|| D::Error::custom(format!("missing field `{}`", t.label())))?;
            values[t] = T::deserialize(raw).map_err(D::Error::custom)?;
        }

        Ok(Self { date, values })
    }
}

// ── GenerationMarker ───────────────────────────────────────────────────────────

/// When the artifacts were generated; shown by the viewer as "data as of".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationMarker {
    pub today: DateTime<Utc>,
}

// ── Metric ─────────────────────────────────────────────────────────────────────

/// Which cumulative series the viewer is showing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Metric {
    #[default]
    Payments,
    Counts,
}

impl Metric {
    /// Parse the CLI spelling; unknown names fall back to payments.
    pub fn from_name(name: &str) -> Self {
        match name {
            "counts" => Metric::Counts,
            _ => Metric::Payments,
        }
    }

    /// CLI spelling.
    pub fn name(self) -> &'static str {
        match self {
            Metric::Payments => "payments",
            Metric::Counts => "counts",
        }
    }

    /// Chart title / axis label.
    pub fn title(self) -> &'static str {
        match self {
            Metric::Payments => "Cumulative Payments ($)",
            Metric::Counts => "Cumulative Renewal Count",
        }
    }

    /// The other metric.
    pub fn toggled(self) -> Self {
        match self {
            Metric::Payments => Metric::Counts,
            Metric::Counts => Metric::Payments,
        }
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────
