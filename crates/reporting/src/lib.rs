//! Media-mix analytics: period aggregation, channel synergy, response
//! curves and budget reallocation over weekly investment and contribution
//! records.

pub mod aggregation;
pub mod budget;
pub mod correlation;
pub mod engine;
pub mod filter;
pub mod repository;
pub mod response;
pub mod summary;

pub use aggregation::{ChannelAggregator, MediaClassifier};
pub use budget::{BudgetOptimizer, BudgetSession, OptimizationResult};
pub use correlation::CorrelationMatrix;
pub use engine::MixEngine;
pub use filter::DateWindow;
pub use repository::{RecordRepository, RecordSet};
pub use response::{AnchoredRoiCurve, PowerLawCurve, ResponseCurve};
