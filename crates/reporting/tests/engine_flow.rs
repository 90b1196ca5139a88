//! End-to-end queries over a synthetic two-year weekly dataset.

use chrono::{Duration, NaiveDate, TimeZone, Utc};
use mediamix_core::config::AppConfig;
use mediamix_core::types::{MediaType, WeeklyRecord};
use mediamix_core::MixError;
use mediamix_reporting::{MixEngine, RecordRepository};
use std::collections::BTreeMap;
use std::sync::Arc;

const WEEKS: i64 = 105;

fn tables() -> (Vec<WeeklyRecord>, Vec<WeeklyRecord>) {
    let first = Utc.with_ymd_and_hms(2023, 1, 2, 0, 0, 0).unwrap();
    let mut investments = Vec::new();
    let mut contributions = Vec::new();

    let mut push = |date, i: i64| {
        let tv = 10_000.0 + 100.0 * (i % 5) as f64;
        let search = 5_000.0 + 50.0 * (i % 4) as f64;
        let radio = 2_000.0;

        let tv_c = 2.0 * tv + 50.0 * (i % 3) as f64;
        let search_c = 3.0 * search;
        let radio_c = 1_000.0;
        let base = 20_000.0;

        investments.push(WeeklyRecord::new(
            date,
            BTreeMap::from([
                ("TV".to_string(), tv),
                ("Digital Search".to_string(), search),
                ("Radio".to_string(), radio),
            ]),
        ));
        contributions.push(WeeklyRecord::new(
            date,
            BTreeMap::from([
                ("TV".to_string(), tv_c),
                ("Digital Search".to_string(), search_c),
                ("Radio".to_string(), radio_c),
                ("base".to_string(), base),
                ("sales".to_string(), base + tv_c + search_c + radio_c),
            ]),
        ));
    };

    for i in 0..WEEKS {
        push(first + Duration::weeks(i), i);
    }
    // Late-evening row on the last day of 2024.
    push(Utc.with_ymd_and_hms(2024, 12, 31, 22, 30, 0).unwrap(), WEEKS);

    (investments, contributions)
}

fn engine() -> MixEngine {
    let repository = Arc::new(RecordRepository::new());
    let (investments, contributions) = tables();
    repository.load_tables(investments, contributions).unwrap();
    MixEngine::new(repository, &AppConfig::default()).unwrap()
}

fn day(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

#[test]
fn test_queries_before_load_fail() {
    let engine = MixEngine::new(Arc::new(RecordRepository::new()), &AppConfig::default()).unwrap();
    assert!(matches!(engine.aggregate_by_year(2024), Err(MixError::MissingData(_))));
    assert!(matches!(engine.correlate(2024), Err(MixError::MissingData(_))));
    assert!(matches!(engine.available_years(), Err(MixError::MissingData(_))));
}

#[test]
fn test_year_filter_includes_boundaries() {
    let engine = engine();
    assert_eq!(engine.available_years().unwrap(), vec![2023, 2024]);

    let agg = engine.aggregate_by_year(2024).unwrap();
    assert_eq!(agg.period_key, "2024");
    // 2024-01-01 through 2024-12-30 weekly, plus the 2024-12-31 row.
    assert_eq!(agg.weeks, 54);
    assert!(agg.month(1).is_some() && agg.month(12).is_some());
}

#[test]
fn test_aggregation_is_additive() {
    let engine = engine();
    let first_half = engine.aggregate_by_range(day(2023, 1, 1), day(2023, 6, 30)).unwrap();
    let second_half = engine.aggregate_by_range(day(2023, 7, 1), day(2023, 12, 31)).unwrap();
    let year = engine.aggregate_by_year(2023).unwrap();

    for metric in &year.channel_metrics {
        let a = first_half.metric(&metric.channel).unwrap();
        let b = second_half.metric(&metric.channel).unwrap();
        assert!((a.investment + b.investment - metric.investment).abs() < 1e-6);
        assert!((a.contribution + b.contribution - metric.contribution).abs() < 1e-6);
    }
    assert_eq!(first_half.weeks + second_half.weeks, year.weeks);
}

#[test]
fn test_roi_and_media_type() {
    let agg = engine().aggregate_by_year(2023).unwrap();
    for metric in &agg.channel_metrics {
        assert!(metric.investment > 0.0);
        assert_eq!(metric.roi, metric.contribution / metric.investment);
    }
    let search = agg.metric("Digital Search").unwrap();
    assert_eq!(search.media_type, MediaType::Online);
    assert!((search.roi - 3.0).abs() < 1e-12);
    assert_eq!(agg.metric("Radio").unwrap().media_type, MediaType::Offline);
    assert!(agg.totals.sales > agg.totals.base);
}

#[test]
fn test_empty_range_is_all_zero() {
    let agg = engine().aggregate_by_range(day(2030, 1, 1), day(2030, 12, 31)).unwrap();
    assert_eq!(agg.weeks, 0);
    assert!(agg.channel_metrics.iter().all(|m| m.roi == 0.0 && m.investment == 0.0));
    assert!(matches!(
        engine().aggregate_by_range(day(2024, 5, 1), day(2024, 1, 1)),
        Err(MixError::Validation(_))
    ));
}

#[test]
fn test_correlation_matrix_properties() {
    let matrix = engine().correlate(2024).unwrap();
    assert_eq!(matrix.channels.len(), 3);
    assert_eq!(matrix.pairs.len(), 3);

    // Radio's contribution is constant.
    assert_eq!(matrix.coefficient("Radio", "TV"), Some(0.0));
    assert_eq!(matrix.coefficient("Radio", "Radio"), Some(1.0));

    for pair in &matrix.pairs {
        assert!((-1.0..=1.0).contains(&pair.coefficient));
        assert_eq!(
            matrix.coefficient(&pair.channel_a, &pair.channel_b),
            matrix.coefficient(&pair.channel_b, &pair.channel_a)
        );
    }
    let dense = matrix.dense();
    for (i, row) in dense.iter().enumerate() {
        assert_eq!(row[i], 1.0);
    }
}

#[test]
fn test_optimize_from_baseline() {
    let engine = engine();
    let baseline = engine.allocation_baseline(2024).unwrap();
    let total: f64 = baseline.iter().map(|a| a.current_budget).sum();

    let result = engine.optimize(&baseline, total).unwrap();
    assert!((result.allocated - total).abs() <= 1_000.0);
    for a in &result.allocations {
        assert!(a.new_budget >= 0.5 * a.current_budget - 1e-6);
        assert!(a.new_budget <= 3.0 * a.current_budget + 1e-6);
    }
    // Search carries the best ROI and gains share.
    let search = result.allocation("Digital Search").unwrap();
    assert!(search.new_budget > search.current_budget);

    assert!(matches!(
        engine.optimize(&baseline, total * 0.25),
        Err(MixError::InfeasibleBudget { .. })
    ));
}

#[test]
fn test_session_round_trip() {
    let engine = engine();
    let mut session = engine.session(2024).unwrap();
    let total = session.total_new_budget();

    session.override_budget("Radio", 0.0).unwrap();
    let radio = session.states().iter().find(|s| s.channel == "Radio").unwrap();
    assert!((radio.new_budget - radio.current_budget * 0.5).abs() < 1e-9);

    let result = session.reoptimize(total).unwrap();
    assert!((session.total_new_budget() - result.allocated).abs() < 1e-9);
}

#[test]
fn test_response_curves_and_summary() {
    let engine = engine();
    let curves = engine.response_curves(2024).unwrap();
    assert_eq!(curves.len(), 3);
    for report in &curves {
        assert_eq!(report.points.len(), 200);
        let zone = report.optimal_zone.as_ref().unwrap();
        assert!(zone.start <= zone.end);
        assert!(zone.peak_roi > 0.0);
    }

    let summary = engine.summary(2024).unwrap();
    assert_eq!(summary.top_by_roi[0].channel, "Digital Search");
    let share_total: f64 = summary.shares.iter().map(|s| s.contribution_share).sum();
    assert!((share_total - 1.0).abs() < 1e-9);

    let cmp = engine.compare_years(2023, 2024).unwrap();
    assert_eq!(cmp.channels.len(), 3);
}

#[test]
fn test_parallel_queries_share_repository() {
    let engine = Arc::new(engine());
    let handles: Vec<_> = [2023, 2024]
        .into_iter()
        .map(|year| {
            let engine = Arc::clone(&engine);
            std::thread::spawn(move || engine.aggregate_by_year(year).unwrap())
        })
        .collect();
    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert_eq!(results[0].period_key, "2023");
    assert_eq!(results[1].period_key, "2024");

    engine.repository().clear();
    assert!(engine.aggregate_by_year(2024).is_err());
}
