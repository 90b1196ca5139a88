use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::{MixError, MixResult};

/// Column holding the week key in both tables.
pub const DATE_KEY: &str = "date";
/// Contribution-table column for outcome not attributable to any channel.
pub const BASE_KEY: &str = "base";
/// Contribution-table column for total observed outcome.
pub const SALES_KEY: &str = "sales";

const MONTH_LABELS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

/// One row of the investment or contribution table for a single week.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeeklyRecord {
    pub date: DateTime<Utc>,
    /// channel name -> spend (investments) or attributed outcome (contributions).
    pub values: BTreeMap<String, f64>,
}

impl WeeklyRecord {
    pub fn new(date: DateTime<Utc>, values: BTreeMap<String, f64>) -> Self {
        Self { date, values }
    }

    /// Build a record from a parsed row. Every non-date column is coerced to a
    /// number; cells that are missing, null, negative or non-numeric become `0`.
    pub fn from_row(row: &serde_json::Map<String, serde_json::Value>) -> MixResult<Self> {
        let date = row
            .get(DATE_KEY)
            .and_then(parse_date)
            .ok_or_else(|| MixError::Validation(format!("row has no parseable `{DATE_KEY}`")))?;

        let values = row
            .iter()
            .filter(|(key, _)| key.as_str() != DATE_KEY)
            .map(|(key, value)| (key.clone(), coerce_number(value)))
            .collect();

        Ok(Self { date, values })
    }

    /// Value for a column, `0` when absent.
    pub fn value(&self, column: &str) -> f64 {
        self.values.get(column).copied().unwrap_or(0.0)
    }

    /// Calendar day of the record with time-of-day stripped.
    pub fn day(&self) -> NaiveDate {
        self.date.date_naive()
    }
}

/// Parse the date formats seen in exported spreadsheets.
pub fn parse_date(value: &serde_json::Value) -> Option<DateTime<Utc>> {
    let raw = value.as_str()?.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(naive.and_utc());
        }
    }
    for fmt in ["%Y-%m-%d", "%Y/%m/%d"] {
        if let Ok(day) = NaiveDate::parse_from_str(raw, fmt) {
            return day.and_hms_opt(0, 0, 0).map(|naive| naive.and_utc());
        }
    }
    None
}

fn coerce_number(value: &serde_json::Value) -> f64 {
    let parsed = match value {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.trim().replace(',', "").parse::<f64>().ok(),
        _ => None,
    };
    parsed.filter(|v| v.is_finite() && *v > 0.0).unwrap_or(0.0)
}

/// Short month label (`1` -> `Jan`).
pub fn month_label(month: u32) -> &'static str {
    month
        .checked_sub(1)
        .and_then(|i| MONTH_LABELS.get(i as usize))
        .copied()
        .unwrap_or("")
}

/// Coarse media classification attached to every channel metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MediaType {
    #[serde(alias = "online")]
    Online,
    #[serde(alias = "offline")]
    Offline,
}

/// `contribution / investment`, or `0` for an unfunded channel.
pub fn roi(contribution: f64, investment: f64) -> f64 {
    if investment > 0.0 {
        contribution / investment
    } else {
        0.0
    }
}

/// Investment, contribution and ROI for one channel over one period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelMetric {
    pub channel: String,
    pub media_type: MediaType,
    pub investment: f64,
    pub contribution: f64,
    pub roi: f64,
}

impl ChannelMetric {
    pub fn new(channel: &str, media_type: MediaType, investment: f64, contribution: f64) -> Self {
        Self {
            channel: channel.to_string(),
            media_type,
            investment,
            contribution,
            roi: roi(contribution, investment),
        }
    }
}

/// Channel metrics for all rows falling in one calendar month (any year).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyMetrics {
    /// 1 = January.
    pub month: u32,
    pub label: String,
    pub channel_metrics: Vec<ChannelMetric>,
}

/// Period-wide sums across all channels.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PeriodTotals {
    pub investment: f64,
    pub contribution: f64,
    pub base: f64,
    pub sales: f64,
    pub roi: f64,
}

/// Aggregator output for one year or one explicit date range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeriodAggregate {
    pub period_key: String,
    pub channel_metrics: Vec<ChannelMetric>,
    pub monthly_breakdown: Vec<MonthlyMetrics>,
    pub totals: PeriodTotals,
    /// Number of contribution weeks that fell in the window.
    pub weeks: usize,
}

impl PeriodAggregate {
    pub fn metric(&self, channel: &str) -> Option<&ChannelMetric> {
        self.channel_metrics.iter().find(|m| m.channel == channel)
    }

    pub fn month(&self, month: u32) -> Option<&MonthlyMetrics> {
        self.monthly_breakdown.iter().find(|m| m.month == month)
    }
}

/// Pearson coefficient for one unordered channel pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrelationPair {
    pub channel_a: String,
    pub channel_b: String,
    pub coefficient: f64,
}

impl CorrelationPair {
    /// True when this pair covers `a` and `b` in either order.
    pub fn matches(&self, a: &str, b: &str) -> bool {
        (self.channel_a == a && self.channel_b == b) || (self.channel_a == b && self.channel_b == a)
    }
}

/// Working budget state for one channel during an optimization run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllocationState {
    pub channel: String,
    /// Baseline budget, never changed by the optimizer.
    pub current_budget: f64,
    /// ROI observed at `current_budget`; anchors the response model.
    pub current_roi: f64,
    pub new_budget: f64,
    pub expected_roi: f64,
}

impl AllocationState {
    pub fn new(channel: &str, current_budget: f64, current_roi: f64) -> Self {
        Self {
            channel: channel.to_string(),
            current_budget,
            current_roi,
            new_budget: current_budget,
            expected_roi: current_roi,
        }
    }

    pub fn from_metric(metric: &ChannelMetric) -> Self {
        Self::new(&metric.channel, metric.investment, metric.roi)
    }

    /// Expected contribution at `new_budget`.
    pub fn expected_return(&self) -> f64 {
        self.expected_roi * self.new_budget
    }
}
