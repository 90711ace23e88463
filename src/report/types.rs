//! Row types of the fleet report.

use crate::services::telemetry_api::Vehicle;

/// Distance travelled over the window, derived from the two odometer readings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Distance {
    /// Non-negative delta, rounded to two decimals.
    Measured(f64),
    /// End reading below start reading; carries the (negative) rounded delta.
    Rollback(f64),
    /// At least one odometer reading was unavailable.
    NoData,
}

impl Distance {
    /// Distance used for consumption math. Rollbacks and gaps count as zero.
    pub fn for_math(&self) -> f64 {
        match *self {
            Distance::Measured(km) => km,
            Distance::Rollback(_) | Distance::NoData => 0.0,
        }
    }

    pub fn is_rollback(&self) -> bool {
        matches!(self, Distance::Rollback(_))
    }
}

/// Litres per 100 km.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AvgConsumption {
    Value(f64),
    /// Fuel was consumed but the vehicle did not move, so the ratio is undefined.
    NoMovement,
    Absent,
}

/// Figures kept apart by measurement basis instead of being reconciled.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BySource<T> {
    pub sensor: T,
    pub flow: T,
}

/// One report row: everything known about a vehicle for the window.
#[derive(Debug, Clone, PartialEq)]
pub struct VehiclePeriodRecord {
    pub vehicle: Vehicle,
    pub odometer_start: Option<f64>,
    pub odometer_end: Option<f64>,
    pub distance: Distance,
    pub fuel_start: Option<f64>,
    pub fuel_end: Option<f64>,
    pub refueled_overall: Option<f64>,
    pub drained_overall: Option<f64>,
    pub consumed_by_source: BySource<Option<f64>>,
    pub avg_consumption_by_source: BySource<AvgConsumption>,
}

impl VehiclePeriodRecord {
    /// Row with nothing but the vehicle, used when its processing could not
    /// complete at all.
    pub fn unavailable(vehicle: Vehicle) -> Self {
        Self {
            vehicle,
            odometer_start: None,
            odometer_end: None,
            distance: Distance::NoData,
            fuel_start: None,
            fuel_end: None,
            refueled_overall: None,
            drained_overall: None,
            consumed_by_source: BySource {
                sensor: None,
                flow: None,
            },
            avg_consumption_by_source: BySource {
                sensor: AvgConsumption::Absent,
                flow: AvgConsumption::Absent,
            },
        }
    }
}
