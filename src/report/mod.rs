//! Fleet report generation.
//!
//! [`aggregator`] drives the per-vehicle pipeline, [`derive`] turns raw
//! readings into a [`VehiclePeriodRecord`], and [`columns`] renders rows for
//! export.

pub mod aggregator;
pub mod columns;
pub mod derive;
pub mod types;

pub use aggregator::{generate_report, generate_report_with};
pub use columns::Column;
pub use types::{AvgConsumption, BySource, Distance, VehiclePeriodRecord};
