//! HTTP handlers for the Restaurant POS Platform

pub mod anomaly;
pub mod consumption;
pub mod health;
pub mod trends;
pub mod variance;

pub use anomaly::{get_inventory_alerts, get_operational_insights};
pub use consumption::{get_actual_consumption, get_theoretical_consumption};
pub use health::health_check;
pub use trends::{export_variance_report, get_top_variance_items, get_variance_trends};
pub use variance::{delete_variance_tag, get_consumption_variance, upsert_variance_tag};
