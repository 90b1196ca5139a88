//! Synergy analysis: Pearson correlation between channels' weekly
//! contribution series.

use mediamix_core::types::{CorrelationPair, WeeklyRecord};
use serde::{Deserialize, Serialize};

/// Pearson product-moment coefficient. A zero denominator (either series
/// constant) resolves to `0`. Series are paired index by index; extra
/// trailing values of the longer series are ignored.
pub fn pearson(x: &[f64], y: &[f64]) -> f64 {
    let n = x.len().min(y.len());
    if n == 0 {
        return 0.0;
    }

    let mean_x = x[..n].iter().sum::<f64>() / n as f64;
    let mean_y = y[..n].iter().sum::<f64>() / n as f64;

    let mut covariance = 0.0;
    let mut var_x = 0.0;
    let mut var_y = 0.0;
    for (xi, yi) in x.iter().zip(y) {
        let dx = xi - mean_x;
        let dy = yi - mean_y;
        covariance += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }

    if is_flat(var_x, &x[..n]) || is_flat(var_y, &y[..n]) {
        return 0.0;
    }
    let denominator = (var_x * var_y).sqrt();
    if !denominator.is_finite() {
        return 0.0;
    }
    (covariance / denominator).clamp(-1.0, 1.0)
}

/// True when the sum of squared deviations is within summation rounding
/// noise. A constant series like `[0.1; 10]` leaves a residue of order
/// `n * EPSILON * |value|` per element once the mean is subtracted.
fn is_flat(sum_sq: f64, values: &[f64]) -> bool {
    let scale = values.iter().fold(0.0_f64, |m, v| m.max(v.abs()));
    let noise = 4.0 * values.len() as f64 * f64::EPSILON * scale;
    sum_sq <= values.len() as f64 * noise * noise
}

/// One coefficient per unordered pair `(i, j)` with `i < j` in input order.
pub fn correlate(series: &[(String, Vec<f64>)]) -> Vec<CorrelationPair> {
    let mut pairs = Vec::with_capacity(series.len() * series.len().saturating_sub(1) / 2);
    for (i, (channel_a, xs)) in series.iter().enumerate() {
        for (channel_b, ys) in &series[i + 1..] {
            pairs.push(CorrelationPair {
                channel_a: channel_a.clone(),
                channel_b: channel_b.clone(),
                coefficient: pearson(xs, ys),
            });
        }
    }
    pairs
}

/// Week-aligned contribution series for each channel, in `channels` order.
pub fn contribution_series(
    contributions: &[&WeeklyRecord],
    channels: &[String],
) -> Vec<(String, Vec<f64>)> {
    channels
        .iter()
        .map(|channel| {
            let values = contributions.iter().map(|r| r.value(channel)).collect();
            (channel.clone(), values)
        })
        .collect()
}

/// Triangular pair set plus the channel order it was computed over.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrelationMatrix {
    pub channels: Vec<String>,
    pub pairs: Vec<CorrelationPair>,
}

impl CorrelationMatrix {
    pub fn from_series(series: &[(String, Vec<f64>)]) -> Self {
        Self {
            channels: series.iter().map(|(c, _)| c.clone()).collect(),
            pairs: correlate(series),
        }
    }

    /// Coefficient for an unordered pair; self-pairs are `1`.
    pub fn coefficient(&self, a: &str, b: &str) -> Option<f64> {
        if a == b {
            return self.channels.iter().any(|c| c == a).then_some(1.0);
        }
        self.pairs
            .iter()
            .find(|p| p.matches(a, b))
            .map(|p| p.coefficient)
    }

    /// Full symmetric matrix in `channels` order with a unit diagonal.
    pub fn dense(&self) -> Vec<Vec<f64>> {
        let n = self.channels.len();
        let mut matrix = vec![vec![0.0; n]; n];
        for (i, row) in matrix.iter_mut().enumerate() {
            row[i] = 1.0;
        }
        for pair in &self.pairs {
            let a = self.channels.iter().position(|c| *c == pair.channel_a);
            let b = self.channels.iter().position(|c| *c == pair.channel_b);
            if let (Some(a), Some(b)) = (a, b) {
                matrix[a][b] = pair.coefficient;
                matrix[b][a] = pair.coefficient;
            }
        }
        matrix
    }

    /// Pairs sorted by coefficient, strongest positive first.
    pub fn ranked(&self) -> Vec<CorrelationPair> {
        let mut ranked = self.pairs.clone();
        ranked.sort_by(|a, b| b.coefficient.total_cmp(&a.coefficient));
        ranked
    }
}
