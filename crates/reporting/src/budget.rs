//! Budget reallocation: greedy diminishing-returns optimizer and the
//! interactive session state built around it.

use chrono::{DateTime, Utc};
use mediamix_core::config::OptimizerConfig;
use mediamix_core::types::AllocationState;
use mediamix_core::{MixError, MixResult};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::response::{AnchoredRoiCurve, ResponseCurve};

/// Headroom below this is treated as a channel sitting on its ceiling.
const HEADROOM_EPSILON: f64 = 1e-9;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Outcome of one optimization run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizationResult {
    pub run_id: Uuid,
    pub total_budget: f64,
    /// `sum(new_budget)` after the run.
    pub allocated: f64,
    /// Budget left over because every channel reached its ceiling or the
    /// remainder fell under the stop threshold.
    pub unallocated: f64,
    /// Number of increments handed out.
    pub steps: usize,
    pub allocations: Vec<AllocationState>,
    pub computed_at: DateTime<Utc>,
}

impl OptimizationResult {
    pub fn allocation(&self, channel: &str) -> Option<&AllocationState> {
        self.allocations.iter().find(|a| a.channel == channel)
    }

    /// Expected contribution of the recommended allocation.
    pub fn expected_return(&self) -> f64 {
        self.allocations.iter().map(|a| a.expected_return()).sum()
    }
}

// ---------------------------------------------------------------------------
// BudgetOptimizer
// ---------------------------------------------------------------------------

/// Hands a fixed total budget out in increments to whichever channel returns
/// the most per unit at its current level, between a floor and a ceiling
/// relative to each channel's current budget.
#[derive(Debug, Clone)]
pub struct BudgetOptimizer {
    config: OptimizerConfig,
}

impl BudgetOptimizer {
    pub fn new(config: OptimizerConfig) -> MixResult<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &OptimizerConfig {
        &self.config
    }

    pub fn floor(&self, state: &AllocationState) -> f64 {
        state.current_budget * self.config.floor_ratio
    }

    pub fn ceiling(&self, state: &AllocationState) -> f64 {
        state.current_budget * self.config.ceiling_ratio
    }

    pub fn curve(&self, state: &AllocationState) -> AnchoredRoiCurve {
        AnchoredRoiCurve::new(state.current_budget, state.current_roi, &self.config)
    }

    /// ROI the response model expects for `state`'s channel at `budget`.
    pub fn expected_roi(&self, state: &AllocationState, budget: f64) -> f64 {
        self.curve(state).expected_roi(budget)
    }

    /// Reallocate `total_budget` across `channels`. Every channel starts at
    /// its floor; increments then go to the best marginal return until the
    /// budget is spent or every channel is at its ceiling. Ties go to the
    /// channel listed first.
    pub fn optimize(
        &self,
        channels: &[AllocationState],
        total_budget: f64,
    ) -> MixResult<OptimizationResult> {
        self.validate_inputs(channels, total_budget)?;

        let floor_total: f64 = channels.iter().map(|c| self.floor(c)).sum();
        if total_budget + HEADROOM_EPSILON < floor_total {
            return Err(MixError::InfeasibleBudget {
                total_budget,
                floor_total,
            });
        }

        let mut states: Vec<AllocationState> = channels
            .iter()
            .map(|c| AllocationState {
                new_budget: self.floor(c),
                ..c.clone()
            })
            .collect();

        let mut remaining = total_budget - floor_total;
        let mut eligible: Vec<usize> = (0..states.len())
            .filter(|&i| self.headroom(&states[i]) > HEADROOM_EPSILON)
            .collect();
        let mut steps = 0usize;

        while remaining > self.config.stop_threshold && !eligible.is_empty() {
            let mut best: Option<(usize, f64, f64)> = None;
            for (pos, &idx) in eligible.iter().enumerate() {
                let state = &states[idx];
                let step = self
                    .config
                    .increment
                    .min(remaining)
                    .min(self.headroom(state));
                let curve = self.curve(state);
                let marginal = (curve.expected_contribution(state.new_budget + step)
                    - curve.expected_contribution(state.new_budget))
                    / step;
                if best.map_or(true, |(_, top, _)| marginal > top) {
                    best = Some((pos, marginal, step));
                }
            }

            let Some((pos, _, step)) = best else {
                break;
            };
            let idx = eligible[pos];
            states[idx].new_budget += step;
            remaining -= step;
            steps += 1;

            if self.headroom(&states[idx]) <= HEADROOM_EPSILON {
                debug!(channel = %states[idx].channel, "Channel reached its ceiling");
                eligible.remove(pos);
            }
        }

        for state in states.iter_mut() {
            state.expected_roi = self.expected_roi(state, state.new_budget);
        }

        let allocated: f64 = states.iter().map(|s| s.new_budget).sum();
        let result = OptimizationResult {
            run_id: Uuid::new_v4(),
            total_budget,
            allocated,
            unallocated: (total_budget - allocated).max(0.0),
            steps,
            allocations: states,
            computed_at: Utc::now(),
        };

        if result.unallocated > self.config.stop_threshold {
            warn!(
                run_id = %result.run_id,
                unallocated = result.unallocated,
                "Every channel reached its ceiling before the budget was spent"
            );
        }
        info!(
            run_id = %result.run_id,
            channels = result.allocations.len(),
            total_budget,
            allocated = result.allocated,
            steps,
            "Budget optimization complete"
        );

        Ok(result)
    }

    fn headroom(&self, state: &AllocationState) -> f64 {
        self.ceiling(state) - state.new_budget
    }

    fn validate_inputs(&self, channels: &[AllocationState], total_budget: f64) -> MixResult<()> {
        if !(total_budget.is_finite() && total_budget >= 0.0) {
            return Err(MixError::Validation(format!(
                "total budget must be a non-negative number, got {total_budget}"
            )));
        }
        let mut seen = HashSet::new();
        for state in channels {
            if !(state.current_budget.is_finite() && state.current_budget >= 0.0) {
                return Err(MixError::Validation(format!(
                    "channel {} has invalid current budget {}",
                    state.channel, state.current_budget
                )));
            }
            if !seen.insert(state.channel.as_str()) {
                return Err(MixError::Validation(format!(
                    "channel {} listed more than once",
                    state.channel
                )));
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// BudgetSession
// ---------------------------------------------------------------------------

/// Caller-owned working state for one interactive planning session. All
/// mutation goes through `&mut self`, so concurrent edits must be serialized
/// by the owner.
#[derive(Debug, Clone)]
pub struct BudgetSession {
    id: Uuid,
    optimizer: BudgetOptimizer,
    baseline: Vec<AllocationState>,
    states: Vec<AllocationState>,
}

impl BudgetSession {
    pub fn new(optimizer: BudgetOptimizer, baseline: Vec<AllocationState>) -> Self {
        Self {
            id: Uuid::new_v4(),
            optimizer,
            states: baseline.clone(),
            baseline,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn states(&self) -> &[AllocationState] {
        &self.states
    }

    pub fn total_new_budget(&self) -> f64 {
        self.states.iter().map(|s| s.new_budget).sum()
    }

    pub fn expected_return(&self) -> f64 {
        self.states.iter().map(|s| s.expected_return()).sum()
    }

    /// Apply a user-chosen budget for one channel, clamped to the channel's
    /// floor and ceiling, and refresh its expected ROI.
    pub fn override_budget(&mut self, channel: &str, amount: f64) -> MixResult<&AllocationState> {
        if !amount.is_finite() {
            return Err(MixError::Validation(format!(
                "budget override for {channel} must be finite"
            )));
        }
        let optimizer = &self.optimizer;
        let state = self
            .states
            .iter_mut()
            .find(|s| s.channel == channel)
            .ok_or_else(|| MixError::UnknownChannel(channel.to_string()))?;

        let clamped = amount
            .max(optimizer.floor(state))
            .min(optimizer.ceiling(state));
        if clamped != amount {
            debug!(channel, requested = amount, applied = clamped, "Budget override clamped");
        }
        state.new_budget = clamped;
        state.expected_roi = optimizer.expected_roi(state, clamped);
        Ok(state)
    }

    /// Run the optimizer from the session baseline and adopt its allocation.
    pub fn reoptimize(&mut self, total_budget: f64) -> MixResult<OptimizationResult> {
        let result = self.optimizer.optimize(&self.baseline, total_budget)?;
        self.states = result.allocations.clone();
        Ok(result)
    }

    /// Discard overrides and optimizer output.
    pub fn reset(&mut self) {
        self.states = self.baseline.clone();
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
