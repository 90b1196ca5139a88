//! Numeric digests of period aggregates for the conversational assistant.
//! Prompt text is assembled elsewhere; these are plain data.

use mediamix_core::types::{ChannelMetric, CorrelationPair, PeriodAggregate, PeriodTotals};
use serde::{Deserialize, Serialize};

use crate::correlation::CorrelationMatrix;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelShare {
    pub channel: String,
    /// Fraction of total channel investment, `0..=1`.
    pub investment_share: f64,
    /// Fraction of total channel contribution, `0..=1`.
    pub contribution_share: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceSummary {
    pub period_key: String,
    pub weeks: usize,
    pub totals: PeriodTotals,
    pub top_by_roi: Vec<ChannelMetric>,
    pub top_by_contribution: Vec<ChannelMetric>,
    pub shares: Vec<ChannelShare>,
    pub strongest_synergies: Vec<CorrelationPair>,
    pub weakest_synergies: Vec<CorrelationPair>,
}

impl PerformanceSummary {
    /// Summarize a period, keeping the `top_n` entries of each ranking.
    pub fn build(
        aggregate: &PeriodAggregate,
        correlations: &CorrelationMatrix,
        top_n: usize,
    ) -> Self {
        let mut top_by_roi = aggregate.channel_metrics.clone();
        top_by_roi.sort_by(|a, b| b.roi.total_cmp(&a.roi));
        top_by_roi.truncate(top_n);

        let mut top_by_contribution = aggregate.channel_metrics.clone();
        top_by_contribution.sort_by(|a, b| b.contribution.total_cmp(&a.contribution));
        top_by_contribution.truncate(top_n);

        let shares = aggregate
            .channel_metrics
            .iter()
            .map(|m| ChannelShare {
                channel: m.channel.clone(),
                investment_share: fraction(m.investment, aggregate.totals.investment),
                contribution_share: fraction(m.contribution, aggregate.totals.contribution),
            })
            .collect();

        let ranked = correlations.ranked();
        let strongest_synergies = ranked.iter().take(top_n).cloned().collect();
        let weakest_synergies = ranked.iter().rev().take(top_n).cloned().collect();

        Self {
            period_key: aggregate.period_key.clone(),
            weeks: aggregate.weeks,
            totals: aggregate.totals.clone(),
            top_by_roi,
            top_by_contribution,
            shares,
            strongest_synergies,
            weakest_synergies,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelDelta {
    pub channel: String,
    pub investment_change: f64,
    pub contribution_change: f64,
    pub roi_change: f64,
    /// Relative investment change; `None` when the earlier period had none.
    pub investment_change_pct: Option<f64>,
}

/// Channel-by-channel movement between two periods.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YearComparison {
    pub from_period: String,
    pub to_period: String,
    pub investment_change: f64,
    pub contribution_change: f64,
    pub channels: Vec<ChannelDelta>,
}

impl YearComparison {
    pub fn between(from: &PeriodAggregate, to: &PeriodAggregate) -> Self {
        let channels = to
            .channel_metrics
            .iter()
            .map(|current| {
                let (investment, contribution, roi) = from
                    .metric(&current.channel)
                    .map(|prior| (prior.investment, prior.contribution, prior.roi))
                    .unwrap_or_default();
                ChannelDelta {
                    channel: current.channel.clone(),
                    investment_change: current.investment - investment,
                    contribution_change: current.contribution - contribution,
                    roi_change: current.roi - roi,
                    investment_change_pct: (investment > 0.0)
                        .then(|| (current.investment - investment) / investment * 100.0),
                }
            })
            .collect();

        Self {
            from_period: from.period_key.clone(),
            to_period: to.period_key.clone(),
            investment_change: to.totals.investment - from.totals.investment,
            contribution_change: to.totals.contribution - from.totals.contribution,
            channels,
        }
    }
}

fn fraction(part: f64, whole: f64) -> f64 {
    if whole > 0.0 {
        part / whole
    } else {
        0.0
    }
}
