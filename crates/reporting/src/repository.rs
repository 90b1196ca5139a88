//! In-memory record repository with an explicit load/clear lifecycle.

use chrono::Datelike;
use mediamix_core::types::{WeeklyRecord, BASE_KEY, DATE_KEY, SALES_KEY};
use mediamix_core::{MixError, MixResult};
use parking_lot::RwLock;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{info, warn};

/// Both weekly tables plus the canonical channel list derived from them.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordSet {
    pub investments: Vec<WeeklyRecord>,
    pub contributions: Vec<WeeklyRecord>,
    /// Investment columns that also appear in the contribution table,
    /// sorted by name.
    pub channels: Vec<String>,
}

impl RecordSet {
    pub fn new(
        investments: Vec<WeeklyRecord>,
        contributions: Vec<WeeklyRecord>,
    ) -> MixResult<Self> {
        let investment_columns = columns(&investments);
        let contribution_columns = columns(&contributions);

        let channels: Vec<String> = investment_columns
            .intersection(&contribution_columns)
            .cloned()
            .collect();

        if channels.is_empty() && !(investments.is_empty() && contributions.is_empty()) {
            return Err(MixError::ChannelMismatch(format!(
                "investment columns {:?} share nothing with contribution columns {:?}",
                investment_columns, contribution_columns
            )));
        }

        let unmatched: Vec<&String> = investment_columns
            .symmetric_difference(&contribution_columns)
            .collect();
        if !unmatched.is_empty() {
            warn!(columns = ?unmatched, "Ignoring columns present in only one table");
        }

        Ok(Self {
            investments,
            contributions,
            channels,
        })
    }

    /// Build from raw parsed rows, dropping rows without a usable date.
    pub fn from_rows(
        investments: &[serde_json::Map<String, serde_json::Value>],
        contributions: &[serde_json::Map<String, serde_json::Value>],
    ) -> MixResult<Self> {
        Self::new(
            parse_rows("investments", investments),
            parse_rows("contributions", contributions),
        )
    }

    /// Distinct calendar years in the investment table, ascending.
    pub fn years(&self) -> Vec<i32> {
        self.investments
            .iter()
            .map(|r| r.date.year())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    pub fn has_channel(&self, channel: &str) -> bool {
        self.channels.iter().any(|c| c == channel)
    }
}

fn columns(records: &[WeeklyRecord]) -> BTreeSet<String> {
    records
        .iter()
        .flat_map(|r| r.values.keys())
        .filter(|k| !matches!(k.as_str(), DATE_KEY | BASE_KEY | SALES_KEY))
        .cloned()
        .collect()
}

fn parse_rows(
    table: &str,
    rows: &[serde_json::Map<String, serde_json::Value>],
) -> Vec<WeeklyRecord> {
    let mut dropped = 0usize;
    let records: Vec<WeeklyRecord> = rows
        .iter()
        .filter_map(|row| match WeeklyRecord::from_row(row) {
            Ok(record) => Some(record),
            Err(_) => {
                dropped += 1;
                None
            }
        })
        .collect();
    if dropped > 0 {
        warn!(table, dropped, "Dropped rows without a parseable date");
    }
    records
}

/// Caller-owned holder of the currently loaded [`RecordSet`]. Readers get a
/// cheap `Arc` snapshot, so a reload never disturbs queries in flight.
#[derive(Debug, Default)]
pub struct RecordRepository {
    records: RwLock<Option<Arc<RecordSet>>>,
}

impl RecordRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the loaded records.
    pub fn load(&self, records: RecordSet) {
        info!(
            investment_rows = records.investments.len(),
            contribution_rows = records.contributions.len(),
            channels = records.channels.len(),
            "Records loaded"
        );
        *self.records.write() = Some(Arc::new(records));
    }

    /// Validate and load raw tables in one call.
    pub fn load_tables(
        &self,
        investments: Vec<WeeklyRecord>,
        contributions: Vec<WeeklyRecord>,
    ) -> MixResult<()> {
        self.load(RecordSet::new(investments, contributions)?);
        Ok(())
    }

    pub fn clear(&self) {
        if self.records.write().take().is_some() {
            info!("Records cleared");
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.records.read().is_some()
    }

    pub fn snapshot(&self) -> MixResult<Arc<RecordSet>> {
        self.records.read().clone().ok_or_else(|| {
            MixError::MissingData("load investment and contribution records first".to_string())
        })
    }
}
