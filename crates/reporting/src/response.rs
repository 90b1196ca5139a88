//! Diminishing-returns response curves.
//!
//! Two strategies implement [`ResponseCurve`]:
//! - [`PowerLawCurve`] drives the response-curve charts and optimal-zone
//!   estimation.
//! - [`AnchoredRoiCurve`] anchors on a channel's current budget and ROI and
//!   drives the budget optimizer.
//!
//! The two are not reconciled and can disagree at the same budget level.

use mediamix_core::config::{CurveConfig, OptimizerConfig};
use mediamix_core::types::{ChannelMetric, MediaType};
use serde::{Deserialize, Serialize};

/// Concave, non-negative contribution as a function of investment, `0` at `0`.
pub trait ResponseCurve {
    fn expected_contribution(&self, investment: f64) -> f64;

    fn expected_roi(&self, investment: f64) -> f64 {
        if investment > 0.0 {
            self.expected_contribution(investment) / investment
        } else {
            0.0
        }
    }
}

// ---------------------------------------------------------------------------
// PowerLawCurve
// ---------------------------------------------------------------------------

/// `scale * max_roi * x * (x / reference_budget)^(-concavity)`, capped at
/// `x * roi_cap`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PowerLawCurve {
    pub scale: f64,
    pub max_roi: f64,
    pub concavity: f64,
    pub reference_budget: f64,
    pub roi_cap: f64,
}

impl PowerLawCurve {
    /// Curve for a channel anchored on its observed period metrics. The
    /// channel's observed ROI is the ceiling unless configured otherwise.
    pub fn for_channel(metric: &ChannelMetric, config: &CurveConfig) -> Self {
        let overrides = config.channels.get(&metric.channel);
        let scale = match metric.media_type {
            MediaType::Online => config.online_scale,
            MediaType::Offline => config.offline_scale,
        };
        Self {
            scale,
            max_roi: overrides.and_then(|o| o.max_roi).unwrap_or(metric.roi),
            concavity: overrides
                .and_then(|o| o.concavity)
                .unwrap_or(config.default_concavity),
            reference_budget: metric.investment,
            roi_cap: config.roi_cap_multiple,
        }
    }
}

impl ResponseCurve for PowerLawCurve {
    fn expected_contribution(&self, investment: f64) -> f64 {
        if investment <= 0.0 || self.reference_budget <= 0.0 {
            return 0.0;
        }
        let raw = self.scale
            * self.max_roi
            * investment
            * (investment / self.reference_budget).powf(-self.concavity);
        raw.min(investment * self.roi_cap).max(0.0)
    }
}

// ---------------------------------------------------------------------------
// AnchoredRoiCurve
// ---------------------------------------------------------------------------

/// ROI relative to a known operating point:
/// `current_roi * (budget / current_budget)^(-k)` where `k` is `k_increase`
/// above the anchor and `k_decrease` below it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnchoredRoiCurve {
    pub current_budget: f64,
    pub current_roi: f64,
    pub k_increase: f64,
    pub k_decrease: f64,
}

impl AnchoredRoiCurve {
    pub fn new(current_budget: f64, current_roi: f64, config: &OptimizerConfig) -> Self {
        Self {
            current_budget,
            current_roi: current_roi.max(0.0),
            k_increase: config.k_increase,
            k_decrease: config.k_decrease,
        }
    }
}

impl ResponseCurve for AnchoredRoiCurve {
    fn expected_contribution(&self, investment: f64) -> f64 {
        self.expected_roi(investment) * investment.max(0.0)
    }

    fn expected_roi(&self, investment: f64) -> f64 {
        if investment <= 0.0 || self.current_budget <= 0.0 {
            return 0.0;
        }
        let ratio = investment / self.current_budget;
        let k = if ratio >= 1.0 {
            self.k_increase
        } else {
            self.k_decrease
        };
        self.current_roi * ratio.powf(-k)
    }
}

// ---------------------------------------------------------------------------
// Curve sampling & optimal zone
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurvePoint {
    pub investment: f64,
    pub contribution: f64,
    pub roi: f64,
}

/// Investment interval where ROI sits on its plateau near the peak.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimalZone {
    pub start: f64,
    pub end: f64,
    pub peak_roi: f64,
    pub peak_investment: f64,
}

/// Chart-ready curve for one channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseCurveReport {
    pub channel: String,
    pub media_type: MediaType,
    pub current_investment: f64,
    pub current_contribution: f64,
    pub curve: PowerLawCurve,
    pub points: Vec<CurvePoint>,
    pub optimal_zone: Option<OptimalZone>,
}

/// `samples` evenly spaced points over `[0, max_budget]`.
pub fn sample_curve(curve: &dyn ResponseCurve, max_budget: f64, samples: usize) -> Vec<CurvePoint> {
    if samples < 2 || max_budget <= 0.0 {
        return Vec::new();
    }
    let step = max_budget / (samples - 1) as f64;
    (0..samples)
        .map(|i| {
            let investment = step * i as f64;
            CurvePoint {
                investment,
                contribution: curve.expected_contribution(investment),
                roi: curve.expected_roi(investment),
            }
        })
        .collect()
}

/// The zone starts at the first point reaching `roi_fraction` of peak ROI and
/// ends just before the first post-peak step whose ROI change, relative to the
/// peak, drops below `-deterioration_threshold`.
pub fn optimal_zone(
    points: &[CurvePoint],
    roi_fraction: f64,
    deterioration_threshold: f64,
) -> Option<OptimalZone> {
    let funded: Vec<&CurvePoint> = points.iter().filter(|p| p.investment > 0.0).collect();

    let (peak_idx, peak) = funded
        .iter()
        .copied()
        .enumerate()
        .fold(None::<(usize, &CurvePoint)>, |best, (i, p)| match best {
            Some((_, b)) if b.roi >= p.roi => best,
            _ => Some((i, p)),
        })?;
    if peak.roi <= 0.0 {
        return None;
    }

    let start = funded
        .iter()
        .find(|p| p.roi >= roi_fraction * peak.roi)
        .map(|p| p.investment)
        .unwrap_or(peak.investment);

    let mut end = funded.last().map(|p| p.investment).unwrap_or(peak.investment);
    for i in (peak_idx + 1)..funded.len() {
        let change = (funded[i].roi - funded[i - 1].roi) / peak.roi;
        if change < -deterioration_threshold {
            end = funded[i - 1].investment;
            break;
        }
    }

    Some(OptimalZone {
        start,
        end: end.max(start),
        peak_roi: peak.roi,
        peak_investment: peak.investment,
    })
}

/// Sample a channel's power-law curve and locate its optimal zone.
pub fn curve_report(metric: &ChannelMetric, config: &CurveConfig) -> ResponseCurveReport {
    let curve = PowerLawCurve::for_channel(metric, config);
    let max_budget = metric.investment * config.max_budget_multiple;
    let points = sample_curve(&curve, max_budget, config.samples);
    let optimal_zone = optimal_zone(
        &points,
        config.optimal_roi_fraction,
        config.deterioration_threshold,
    );
    ResponseCurveReport {
        channel: metric.channel.clone(),
        media_type: metric.media_type,
        current_investment: metric.investment,
        current_contribution: metric.contribution,
        curve,
        points,
        optimal_zone,
    }
}
