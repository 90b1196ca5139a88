//! Channel aggregation: period totals, ROI and the month-bucketed breakdown.

use chrono::Datelike;
use mediamix_core::config::MediaConfig;
use mediamix_core::types::{
    month_label, ChannelMetric, MediaType, MonthlyMetrics, PeriodAggregate, PeriodTotals,
    WeeklyRecord, BASE_KEY, SALES_KEY,
};
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

// ---------------------------------------------------------------------------
// MediaClassifier
// ---------------------------------------------------------------------------

/// Labels channels as online or offline. Explicit table entries take
/// precedence; otherwise a channel is online when its lowercased name
/// contains one of the configured keywords.
#[derive(Debug, Clone)]
pub struct MediaClassifier {
    table: HashMap<String, MediaType>,
    online_keywords: Vec<String>,
}

impl MediaClassifier {
    pub fn new(table: HashMap<String, MediaType>, online_keywords: Vec<String>) -> Self {
        let table = table
            .into_iter()
            .map(|(name, media)| (name.to_lowercase(), media))
            .collect();
        let online_keywords = online_keywords
            .into_iter()
            .map(|k| k.to_lowercase())
            .filter(|k| !k.is_empty())
            .collect();
        Self {
            table,
            online_keywords,
        }
    }

    pub fn from_config(config: &MediaConfig) -> Self {
        Self::new(config.channels.clone(), config.online_keywords.clone())
    }

    pub fn classify(&self, channel: &str) -> MediaType {
        let name = channel.to_lowercase();
        if let Some(media) = self.table.get(&name) {
            return *media;
        }
        if self.online_keywords.iter().any(|k| name.contains(k.as_str())) {
            MediaType::Online
        } else {
            MediaType::Offline
        }
    }
}

impl Default for MediaClassifier {
    fn default() -> Self {
        Self::from_config(&MediaConfig::default())
    }
}

// ---------------------------------------------------------------------------
// ChannelAggregator
// ---------------------------------------------------------------------------

pub struct ChannelAggregator {
    classifier: MediaClassifier,
}

impl ChannelAggregator {
    pub fn new(classifier: MediaClassifier) -> Self {
        Self { classifier }
    }

    pub fn classifier(&self) -> &MediaClassifier {
        &self.classifier
    }

    /// Sum already-filtered rows into per-channel metrics plus a breakdown by
    /// calendar month. Months of different years fold into the same bucket.
    pub fn aggregate(
        &self,
        period_key: &str,
        investments: &[&WeeklyRecord],
        contributions: &[&WeeklyRecord],
        channels: &[String],
    ) -> PeriodAggregate {
        let channel_metrics = self.channel_metrics(investments, contributions, channels);
        let totals = period_totals(&channel_metrics, contributions);

        let mut buckets: BTreeMap<u32, (Vec<&WeeklyRecord>, Vec<&WeeklyRecord>)> = BTreeMap::new();
        for &record in investments {
            buckets.entry(record.date.month()).or_default().0.push(record);
        }
        for &record in contributions {
            buckets.entry(record.date.month()).or_default().1.push(record);
        }

        let monthly_breakdown = buckets
            .into_iter()
            .map(|(month, (inv, contrib))| MonthlyMetrics {
                month,
                label: month_label(month).to_string(),
                channel_metrics: self.channel_metrics(&inv, &contrib, channels),
            })
            .collect();

        debug!(
            period = period_key,
            investment_rows = investments.len(),
            contribution_rows = contributions.len(),
            channels = channels.len(),
            "Aggregated period"
        );

        PeriodAggregate {
            period_key: period_key.to_string(),
            channel_metrics,
            monthly_breakdown,
            totals,
            weeks: contributions.len(),
        }
    }

    fn channel_metrics(
        &self,
        investments: &[&WeeklyRecord],
        contributions: &[&WeeklyRecord],
        channels: &[String],
    ) -> Vec<ChannelMetric> {
        channels
            .iter()
            .map(|channel| {
                ChannelMetric::new(
                    channel,
                    self.classifier.classify(channel),
                    column_sum(investments, channel),
                    column_sum(contributions, channel),
                )
            })
            .collect()
    }
}

impl Default for ChannelAggregator {
    fn default() -> Self {
        Self::new(MediaClassifier::default())
    }
}

fn column_sum(records: &[&WeeklyRecord], column: &str) -> f64 {
    records.iter().map(|r| r.value(column)).sum()
}

fn period_totals(metrics: &[ChannelMetric], contributions: &[&WeeklyRecord]) -> PeriodTotals {
    let investment: f64 = metrics.iter().map(|m| m.investment).sum();
    let contribution: f64 = metrics.iter().map(|m| m.contribution).sum();
    PeriodTotals {
        investment,
        contribution,
        base: column_sum(contributions, BASE_KEY),
        sales: column_sum(contributions, SALES_KEY),
        roi: mediamix_core::types::roi(contribution, investment),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn week(y: i32, m: u32, d: u32, values: &[(&str, f64)]) -> WeeklyRecord {
        WeeklyRecord::new(
            Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap(),
            values.iter().map(|(k, v)| (k.to_string(), *v)).collect(),
        )
    }

    fn channels() -> Vec<String> {
        vec!["TV".to_string(), "Digital Search".to_string()]
    }

    #[test]
    fn test_classifier_keywords_and_table() {
        let classifier = MediaClassifier::new(
            HashMap::from([("Podcast".to_string(), MediaType::Online)]),
            vec!["digital".into(), "social".into()],
        );
        assert_eq!(classifier.classify("Digital Search"), MediaType::Online);
        assert_eq!(classifier.classify("SOCIAL_Paid"), MediaType::Online);
        assert_eq!(classifier.classify("podcast"), MediaType::Online);
        assert_eq!(classifier.classify("TV"), MediaType::Offline);
    }

    #[test]
    fn test_table_overrides_keyword_rule() {
        let classifier = MediaClassifier::new(
            HashMap::from([("Digital OOH".to_string(), MediaType::Offline)]),
            vec!["digital".into()],
        );
        assert_eq!(classifier.classify("Digital OOH"), MediaType::Offline);
        assert_eq!(classifier.classify("Digital Video"), MediaType::Online);
    }

    #[test]
    fn test_aggregate_sums_and_roi() {
        let investments = vec![
            week(2024, 1, 7, &[("TV", 1000.0), ("Digital Search", 200.0)]),
            week(2024, 2, 4, &[("TV", 500.0)]),
        ];
        let contributions = vec![
            week(
                2024,
                1,
                7,
                &[("TV", 1800.0), ("Digital Search", 700.0), ("base", 50.0), ("sales", 2550.0)],
            ),
            week(
                2024,
                2,
                4,
                &[("TV", 600.0), ("Digital Search", 100.0), ("base", 40.0), ("sales", 740.0)],
            ),
        ];
        let inv: Vec<&WeeklyRecord> = investments.iter().collect();
        let contrib: Vec<&WeeklyRecord> = contributions.iter().collect();

        let agg = ChannelAggregator::default().aggregate("2024", &inv, &contrib, &channels());

        let tv = agg.metric("TV").unwrap();
        assert!((tv.investment - 1500.0).abs() < f64::EPSILON);
        assert!((tv.contribution - 2400.0).abs() < f64::EPSILON);
        assert!((tv.roi - 1.6).abs() < 1e-12);
        assert_eq!(tv.media_type, MediaType::Offline);

        let digital = agg.metric("Digital Search").unwrap();
        assert!((digital.roi - 4.0).abs() < f64::EPSILON);
        assert_eq!(digital.media_type, MediaType::Online);

        assert!((agg.totals.investment - 1700.0).abs() < f64::EPSILON);
        assert!((agg.totals.base - 90.0).abs() < f64::EPSILON);
        assert!((agg.totals.sales - 3290.0).abs() < f64::EPSILON);
        assert_eq!(agg.weeks, 2);
    }

    #[test]
    fn test_monthly_buckets_fold_years() {
        let investments = vec![
            week(2023, 3, 5, &[("TV", 100.0)]),
            week(2024, 3, 3, &[("TV", 300.0)]),
            week(2024, 4, 7, &[("TV", 50.0)]),
        ];
        let contributions = vec![
            week(2023, 3, 5, &[("TV", 200.0)]),
            week(2024, 3, 3, &[("TV", 600.0)]),
        ];
        let inv: Vec<&WeeklyRecord> = investments.iter().collect();
        let contrib: Vec<&WeeklyRecord> = contributions.iter().collect();

        let agg = ChannelAggregator::default().aggregate("range", &inv, &contrib, &channels());

        assert_eq!(agg.monthly_breakdown.len(), 2);
        let march = agg.month(3).unwrap();
        assert_eq!(march.label, "Mar");
        let tv = march.channel_metrics.iter().find(|m| m.channel == "TV").unwrap();
        assert!((tv.investment - 400.0).abs() < f64::EPSILON);
        assert!((tv.roi - 2.0).abs() < f64::EPSILON);

        let april = agg.month(4).unwrap();
        let tv = april.channel_metrics.iter().find(|m| m.channel == "TV").unwrap();
        assert_eq!(tv.contribution, 0.0);
        assert_eq!(tv.roi, 0.0);
    }

    #[test]
    fn test_empty_window_is_all_zero() {
        let agg = ChannelAggregator::default().aggregate("empty", &[], &[], &channels());
        assert_eq!(agg.channel_metrics.len(), 2);
        assert!(agg
            .channel_metrics
            .iter()
            .all(|m| m.investment == 0.0 && m.contribution == 0.0 && m.roi == 0.0));
        assert!(agg.monthly_breakdown.is_empty());
        assert_eq!(agg.totals, PeriodTotals::default());
    }

    #[test]
    fn test_unfunded_channel_reports_zero_roi() {
        let investments = vec![week(2024, 5, 5, &[("TV", 0.0)])];
        let contributions = vec![week(2024, 5, 5, &[("TV", 900.0)])];
        let inv: Vec<&WeeklyRecord> = investments.iter().collect();
        let contrib: Vec<&WeeklyRecord> = contributions.iter().collect();

        let agg = ChannelAggregator::default().aggregate("2024", &inv, &contrib, &channels());
        let tv = agg.metric("TV").unwrap();
        assert_eq!(tv.roi, 0.0);
        assert!((tv.contribution - 900.0).abs() < f64::EPSILON);
    }
}
