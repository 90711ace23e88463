//! Trait and types for a fleet telemetry provider.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::reconcile::{Channel, FuelSummary};
use crate::resolve::TimestampedSample;

/// A vehicle from the account roster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Vehicle {
    pub id: u64,
    pub display_name: String,
}

impl Vehicle {
    pub fn new(id: u64, display_name: impl Into<String>) -> Self {
        Self {
            id,
            display_name: display_name.into(),
        }
    }
}

/// Abstraction over a telemetry vendor.
///
/// Every operation degrades to absence: transport failures, unexpected
/// response shapes and missing data all come back as an empty collection or
/// `None`, with the reason logged by the implementation. Callers only ever
/// check for absence.
#[async_trait]
pub trait TelemetryApi: Send + Sync {
    /// Eligible vehicles on the account, in roster order.
    async fn list_vehicles(&self) -> Vec<Vehicle>;

    /// Odometer reading at (or nearest to) `instant`.
    async fn get_instant_reading(&self, vehicle_id: u64, instant: DateTime<Utc>) -> Option<f64>;

    /// All valid samples of `channel` for the UTC calendar day containing
    /// `instant`, sorted ascending by timestamp.
    async fn get_day_samples(
        &self,
        vehicle_id: u64,
        instant: DateTime<Utc>,
        channel: Channel,
    ) -> Vec<TimestampedSample>;

    /// Refuel, drain and consumption totals per channel for `[start, end]`.
    async fn get_period_summary(
        &self,
        vehicle_id: u64,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> FuelSummary;
}
