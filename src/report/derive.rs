//! Derived metrics and assembly of a vehicle's report row.

use tracing::{debug, info, warn};

use super::types::{AvgConsumption, BySource, Distance, VehiclePeriodRecord};
use crate::reconcile::{FuelSourceReading, FuelSummary, SummaryMetric, reconcile_with_source};
use crate::services::telemetry_api::Vehicle;
use crate::utility::round2;

/// Raw per-vehicle inputs gathered from the telemetry provider.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VehicleReadings {
    pub odometer_start: Option<f64>,
    pub odometer_end: Option<f64>,
    pub fuel_start: Option<f64>,
    pub fuel_end: Option<f64>,
    pub summary: FuelSummary,
}

/// Distance between two odometer readings.
pub fn distance(odometer_start: Option<f64>, odometer_end: Option<f64>) -> Distance {
    let (Some(start), Some(end)) = (odometer_start, odometer_end) else {
        return Distance::NoData;
    };
    if !(start.is_finite() && end.is_finite()) {
        return Distance::NoData;
    }

    let raw = end - start;
    if raw < 0.0 {
        Distance::Rollback(round2(raw))
    } else {
        Distance::Measured(round2(raw))
    }
}

/// Average consumption in l/100km for one channel.
///
/// A vendor-supplied average wins. Otherwise it is computed from the
/// consumed volume when the vehicle moved, flagged [`AvgConsumption::NoMovement`]
/// when fuel was burnt without movement, and absent in every other case.
pub fn average_consumption(
    vendor_avg: Option<f64>,
    consumed: Option<f64>,
    distance_for_math: f64,
) -> AvgConsumption {
    if let Some(avg) = vendor_avg {
        return AvgConsumption::Value(avg);
    }
    match consumed {
        Some(litres) if litres >= 0.0 && distance_for_math > 0.0 => {
            AvgConsumption::Value(round2(litres / distance_for_math * 100.0))
        }
        Some(litres) if litres > 0.0 && distance_for_math == 0.0 => AvgConsumption::NoMovement,
        _ => AvgConsumption::Absent,
    }
}

/// Builds the report row for `vehicle`, logging the anomalies it encounters.
pub fn assemble_record(vehicle: Vehicle, readings: VehicleReadings) -> VehiclePeriodRecord {
    let distance = distance(readings.odometer_start, readings.odometer_end);
    match distance {
        Distance::Rollback(delta) => warn!(
            delta,
            odometer_start = readings.odometer_start,
            odometer_end = readings.odometer_end,
            "Odometer rollback, distance counted as zero"
        ),
        Distance::NoData => info!(
            has_start = readings.odometer_start.is_some(),
            has_end = readings.odometer_end.is_some(),
            "Odometer reading missing, distance not computed"
        ),
        Distance::Measured(km) => debug!(km, "Distance computed"),
    }
    let km = distance.for_math();

    let summary = &readings.summary;
    let [refueled_overall, drained_overall] =
        [SummaryMetric::Refueled, SummaryMetric::Drained].map(|metric| {
            let picked = reconcile_with_source(summary, metric);
            match picked {
                Some((channel, value)) => debug!(%metric, %channel, value, "Channel selected"),
                None => info!(%metric, "No channel reported metric"),
            }
            picked.map(|(_, value)| value)
        });

    let sensor = summary.sensor.unwrap_or_default();
    let flow = summary.flow.unwrap_or_default();
    let avg_consumption_by_source = BySource {
        sensor: channel_average(&sensor, km, "sensor"),
        flow: channel_average(&flow, km, "flow"),
    };

    VehiclePeriodRecord {
        vehicle,
        odometer_start: readings.odometer_start,
        odometer_end: readings.odometer_end,
        distance,
        fuel_start: readings.fuel_start,
        fuel_end: readings.fuel_end,
        refueled_overall,
        drained_overall,
        consumed_by_source: BySource {
            sensor: sensor.consumed,
            flow: flow.consumed,
        },
        avg_consumption_by_source,
    }
}

fn channel_average(reading: &FuelSourceReading, km: f64, channel: &str) -> AvgConsumption {
    let avg = average_consumption(reading.avg_consumption, reading.consumed, km);
    if avg == AvgConsumption::NoMovement {
        info!(channel, consumed = reading.consumed, "Fuel consumed without movement");
    }
    avg
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_distance_measured() {
        assert_eq!(distance(Some(1000.0), Some(1200.0)), Distance::Measured(200.0));
        assert_eq!(distance(Some(10.111), Some(20.0)), Distance::Measured(9.89));
        assert_eq!(distance(Some(500.0), Some(500.0)), Distance::Measured(0.0));
        assert_eq!(distance(Some(0.0), Some(0.125)), Distance::Measured(0.12));
    }

    #[test]
    fn test_distance_rollback() {
        let d = distance(Some(1200.0), Some(1000.0));
        assert_eq!(d, Distance::Rollback(-200.0));
        assert!(d.is_rollback());
        assert_eq!(d.for_math(), 0.0);
    }

    #[test]
    fn test_distance_needs_both_readings() {
        assert_eq!(distance(None, Some(1.0)), Distance::NoData);
        assert_eq!(distance(Some(1.0), None), Distance::NoData);
        assert_eq!(distance(Some(f64::NAN), Some(1.0)), Distance::NoData);
    }

    #[test]
    fn test_average_consumption_cases() {
        assert_eq!(
            average_consumption(None, Some(20.0), 200.0),
            AvgConsumption::Value(10.0)
        );
        assert_eq!(
            average_consumption(None, Some(5.0), 0.0),
            AvgConsumption::NoMovement
        );
        assert_eq!(average_consumption(None, None, 200.0), AvgConsumption::Absent);
        assert_eq!(average_consumption(None, Some(0.0), 0.0), AvgConsumption::Absent);
        assert_eq!(
            average_consumption(None, Some(0.0), 50.0),
            AvgConsumption::Value(0.0)
        );
    }

    #[test]
    fn test_vendor_average_wins() {
        assert_eq!(
            average_consumption(Some(11.5), Some(20.0), 200.0),
            AvgConsumption::Value(11.5)
        );
        assert_eq!(
            average_consumption(Some(11.5), Some(20.0), 0.0),
            AvgConsumption::Value(11.5)
        );
    }

    #[test]
    fn test_assemble_full_record() {
        let readings = VehicleReadings {
            odometer_start: Some(1000.0),
            odometer_end: Some(1200.0),
            fuel_start: Some(40.0),
            fuel_end: Some(75.5),
            summary: FuelSummary {
                sensor: Some(FuelSourceReading {
                    refueled: Some(55.0),
                    drained: None,
                    consumed: Some(20.0),
                    avg_consumption: None,
                }),
                can: Some(FuelSourceReading {
                    refueled: Some(54.0),
                    drained: Some(1.5),
                    ..Default::default()
                }),
                flow: Some(FuelSourceReading {
                    consumed: Some(19.0),
                    avg_consumption: Some(9.4),
                    ..Default::default()
                }),
            },
        };

        let record = assemble_record(Vehicle::new(1, "AA1111"), readings);
        assert_eq!(record.distance, Distance::Measured(200.0));
        assert_eq!(record.refueled_overall, Some(55.0));
        assert_eq!(record.drained_overall, Some(1.5));
        assert_eq!(record.consumed_by_source.sensor, Some(20.0));
        assert_eq!(record.consumed_by_source.flow, Some(19.0));
        assert_eq!(
            record.avg_consumption_by_source.sensor,
            AvgConsumption::Value(10.0)
        );
        assert_eq!(
            record.avg_consumption_by_source.flow,
            AvgConsumption::Value(9.4)
        );
    }

    #[test]
    fn test_assemble_rollback_flags_no_movement() {
        let readings = VehicleReadings {
            odometer_start: Some(1200.0),
            odometer_end: Some(1000.0),
            summary: FuelSummary {
                sensor: Some(FuelSourceReading {
                    consumed: Some(5.0),
                    ..Default::default()
                }),
                ..Default::default()
            },
            ..Default::default()
        };

        let record = assemble_record(Vehicle::new(2, "BB2222"), readings);
        assert!(record.distance.is_rollback());
        assert_eq!(
            record.avg_consumption_by_source.sensor,
            AvgConsumption::NoMovement
        );
        assert_eq!(record.avg_consumption_by_source.flow, AvgConsumption::Absent);
    }

    #[test]
    fn test_assemble_with_nothing() {
        let record = assemble_record(Vehicle::new(3, "CC3333"), VehicleReadings::default());
        assert_eq!(record, VehiclePeriodRecord::unavailable(Vehicle::new(3, "CC3333")));
    }
}
