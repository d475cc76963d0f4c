//! Business logic services for the Restaurant POS Platform

pub mod anomaly;
pub mod baseline;
pub mod consumption;
pub mod insights;
pub mod ledger;
pub mod thresholds;
pub mod trends;
pub mod variance;

pub use anomaly::AnomalyService;
pub use baseline::BaselineService;
pub use consumption::ConsumptionService;
pub use insights::InsightService;
pub use ledger::LedgerService;
pub use trends::TrendService;
pub use variance::VarianceService;
