//! Query interface over the loaded records. Every query takes a fresh
//! snapshot of the repository and rebuilds its result from scratch.

use chrono::NaiveDate;
use mediamix_core::config::{AppConfig, CurveConfig};
use mediamix_core::types::{AllocationState, PeriodAggregate, WeeklyRecord};
use mediamix_core::MixResult;
use std::sync::Arc;

use crate::aggregation::{ChannelAggregator, MediaClassifier};
use crate::budget::{BudgetOptimizer, BudgetSession, OptimizationResult};
use crate::correlation::{contribution_series, CorrelationMatrix};
use crate::filter::{filter_by_window, DateWindow};
use crate::repository::{RecordRepository, RecordSet};
use crate::response::{curve_report, ResponseCurveReport};
use crate::summary::{PerformanceSummary, YearComparison};

/// Entries kept per ranking in [`PerformanceSummary`].
const SUMMARY_TOP_N: usize = 3;

pub struct MixEngine {
    repository: Arc<RecordRepository>,
    aggregator: ChannelAggregator,
    optimizer: BudgetOptimizer,
    curve: CurveConfig,
}

impl MixEngine {
    pub fn new(repository: Arc<RecordRepository>, config: &AppConfig) -> MixResult<Self> {
        config.curve.validate()?;
        Ok(Self {
            repository,
            aggregator: ChannelAggregator::new(MediaClassifier::from_config(&config.media)),
            optimizer: BudgetOptimizer::new(config.optimizer.clone())?,
            curve: config.curve.clone(),
        })
    }

    pub fn repository(&self) -> &Arc<RecordRepository> {
        &self.repository
    }

    pub fn optimizer(&self) -> &BudgetOptimizer {
        &self.optimizer
    }

    pub fn available_years(&self) -> MixResult<Vec<i32>> {
        Ok(self.repository.snapshot()?.years())
    }

    pub fn aggregate_by_year(&self, year: i32) -> MixResult<PeriodAggregate> {
        let records = self.repository.snapshot()?;
        let window = DateWindow::year(year)?;
        Ok(self.aggregate_window(&records, &window, &year.to_string()))
    }

    pub fn aggregate_by_range(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> MixResult<PeriodAggregate> {
        let records = self.repository.snapshot()?;
        let window = DateWindow::new(start, end)?;
        Ok(self.aggregate_window(&records, &window, &window.period_key()))
    }

    /// Synergy matrix over the year's weekly contribution series.
    pub fn correlate(&self, year: i32) -> MixResult<CorrelationMatrix> {
        let records = self.repository.snapshot()?;
        let window = DateWindow::year(year)?;
        Ok(self.correlate_window(&records, &window))
    }

    pub fn correlate_range(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> MixResult<CorrelationMatrix> {
        let records = self.repository.snapshot()?;
        Ok(self.correlate_window(&records, &DateWindow::new(start, end)?))
    }

    /// Allocation states seeded from the year's channel investment and ROI.
    pub fn allocation_baseline(&self, year: i32) -> MixResult<Vec<AllocationState>> {
        Ok(self
            .aggregate_by_year(year)?
            .channel_metrics
            .iter()
            .map(AllocationState::from_metric)
            .collect())
    }

    pub fn optimize(
        &self,
        channels: &[AllocationState],
        total_budget: f64,
    ) -> MixResult<OptimizationResult> {
        self.optimizer.optimize(channels, total_budget)
    }

    /// Planning session seeded from `year`.
    pub fn session(&self, year: i32) -> MixResult<BudgetSession> {
        Ok(BudgetSession::new(
            self.optimizer.clone(),
            self.allocation_baseline(year)?,
        ))
    }

    pub fn response_curves(&self, year: i32) -> MixResult<Vec<ResponseCurveReport>> {
        Ok(self
            .aggregate_by_year(year)?
            .channel_metrics
            .iter()
            .map(|metric| curve_report(metric, &self.curve))
            .collect())
    }

    pub fn summary(&self, year: i32) -> MixResult<PerformanceSummary> {
        let records = self.repository.snapshot()?;
        let window = DateWindow::year(year)?;
        let aggregate = self.aggregate_window(&records, &window, &year.to_string());
        let correlations = self.correlate_window(&records, &window);
        Ok(PerformanceSummary::build(&aggregate, &correlations, SUMMARY_TOP_N))
    }

    pub fn compare_years(&self, from: i32, to: i32) -> MixResult<YearComparison> {
        Ok(YearComparison::between(
            &self.aggregate_by_year(from)?,
            &self.aggregate_by_year(to)?,
        ))
    }

    fn aggregate_window(
        &self,
        records: &RecordSet,
        window: &DateWindow,
        key: &str,
    ) -> PeriodAggregate {
        let investments = filter_by_window(&records.investments, window);
        let contributions = filter_by_window(&records.contributions, window);
        self.aggregator
            .aggregate(key, &investments, &contributions, &records.channels)
    }

    fn correlate_window(&self, records: &RecordSet, window: &DateWindow) -> CorrelationMatrix {
        let contributions: Vec<&WeeklyRecord> = filter_by_window(&records.contributions, window);
        CorrelationMatrix::from_series(&contribution_series(&contributions, &records.channels))
    }
}
