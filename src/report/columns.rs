//! Selectable report columns and how each renders a cell.

use clap::ValueEnum;
use serde_json::{Value, json};

use super::types::{AvgConsumption, Distance, VehiclePeriodRecord};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum)]
pub enum Column {
    Vehicle,
    OdometerStart,
    OdometerEnd,
    Distance,
    FuelStart,
    FuelEnd,
    Refueled,
    Drained,
    ConsumedSensor,
    AvgConsumptionSensor,
    ConsumedFlow,
    AvgConsumptionFlow,
}

impl Column {
    /// Every column, in report order.
    pub const ALL: [Column; 12] = [
        Column::Vehicle,
        Column::OdometerStart,
        Column::OdometerEnd,
        Column::Distance,
        Column::FuelStart,
        Column::FuelEnd,
        Column::Refueled,
        Column::Drained,
        Column::ConsumedSensor,
        Column::AvgConsumptionSensor,
        Column::ConsumedFlow,
        Column::AvgConsumptionFlow,
    ];

    /// Spreadsheet header.
    pub fn header(&self) -> &'static str {
        match self {
            Column::Vehicle => "Vehicle",
            Column::OdometerStart => "CAN odometer (start)",
            Column::OdometerEnd => "CAN odometer (end)",
            Column::Distance => "Distance (CAN, km)",
            Column::FuelStart => "Fuel in tank (start, l)",
            Column::FuelEnd => "Fuel in tank (end, l)",
            Column::Refueled => "Refueled in period (l)",
            Column::Drained => "Drained in period (l)",
            Column::ConsumedSensor => "Consumed (level sensor, l)",
            Column::AvgConsumptionSensor => "Avg consumption (level sensor, l/100km)",
            Column::ConsumedFlow => "Consumed (CAN flow, l)",
            Column::AvgConsumptionFlow => "Avg consumption (CAN flow, l/100km)",
        }
    }

    /// Key used in JSON output.
    pub fn key(&self) -> &'static str {
        match self {
            Column::Vehicle => "vehicle",
            Column::OdometerStart => "odometer_start",
            Column::OdometerEnd => "odometer_end",
            Column::Distance => "distance",
            Column::FuelStart => "fuel_start",
            Column::FuelEnd => "fuel_end",
            Column::Refueled => "refueled",
            Column::Drained => "drained",
            Column::ConsumedSensor => "consumed_sensor",
            Column::AvgConsumptionSensor => "avg_consumption_sensor",
            Column::ConsumedFlow => "consumed_flow",
            Column::AvgConsumptionFlow => "avg_consumption_flow",
        }
    }

    /// Text cell. Absent values render empty.
    pub fn cell(&self, record: &VehiclePeriodRecord) -> String {
        match self {
            Column::Vehicle => record.vehicle.display_name.clone(),
            Column::Distance => match record.distance {
                Distance::Measured(km) => format!("{km:.2}"),
                Distance::Rollback(km) => format!("rollback ({km:.2} km)"),
                Distance::NoData => "no data".to_string(),
            },
            Column::AvgConsumptionSensor => avg_cell(record.avg_consumption_by_source.sensor),
            Column::AvgConsumptionFlow => avg_cell(record.avg_consumption_by_source.flow),
            _ => self
                .number(record)
                .map(|v| format!("{v:.2}"))
                .unwrap_or_default(),
        }
    }

    /// JSON cell: numbers stay numbers, sentinels become strings, absence is null.
    pub fn value(&self, record: &VehiclePeriodRecord) -> Value {
        match self {
            Column::Vehicle => json!(record.vehicle.display_name),
            Column::Distance => match record.distance {
                Distance::Measured(km) => json!(km),
                Distance::Rollback(km) => json!({ "rollback": km }),
                Distance::NoData => Value::Null,
            },
            Column::AvgConsumptionSensor => avg_value(record.avg_consumption_by_source.sensor),
            Column::AvgConsumptionFlow => avg_value(record.avg_consumption_by_source.flow),
            _ => self.number(record).map_or(Value::Null, |v| json!(v)),
        }
    }

    fn number(&self, record: &VehiclePeriodRecord) -> Option<f64> {
        match self {
            Column::OdometerStart => record.odometer_start,
            Column::OdometerEnd => record.odometer_end,
            Column::FuelStart => record.fuel_start,
            Column::FuelEnd => record.fuel_end,
            Column::Refueled => record.refueled_overall,
            Column::Drained => record.drained_overall,
            Column::ConsumedSensor => record.consumed_by_source.sensor,
            Column::ConsumedFlow => record.consumed_by_source.flow,
            Column::Vehicle
            | Column::Distance
            | Column::AvgConsumptionSensor
            | Column::AvgConsumptionFlow => None,
        }
    }
}

fn avg_cell(avg: AvgConsumption) -> String {
    match avg {
        AvgConsumption::Value(v) => format!("{v:.2}"),
        AvgConsumption::NoMovement => "no movement".to_string(),
        AvgConsumption::Absent => String::new(),
    }
}

fn avg_value(avg: AvgConsumption) -> Value {
    match avg {
        AvgConsumption::Value(v) => json!(v),
        AvgConsumption::NoMovement => json!("no movement"),
        AvgConsumption::Absent => Value::Null,
    }
}

/// Keeps the caller's selection in report order without duplicates; an empty
/// selection means every column.
pub fn normalize_selection(selected: &[Column]) -> Vec<Column> {
    if selected.is_empty() {
        return Column::ALL.to_vec();
    }
    Column::ALL
        .into_iter()
        .filter(|c| selected.contains(c))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::types::BySource;
    use crate::services::telemetry_api::Vehicle;

    fn record() -> VehiclePeriodRecord {
        VehiclePeriodRecord {
            odometer_start: Some(1200.0),
            odometer_end: Some(1000.0),
            distance: Distance::Rollback(-200.0),
            fuel_start: Some(40.5),
            consumed_by_source: BySource {
                sensor: Some(5.0),
                flow: None,
            },
            avg_consumption_by_source: BySource {
                sensor: AvgConsumption::NoMovement,
                flow: AvgConsumption::Value(9.456),
            },
            ..VehiclePeriodRecord::unavailable(Vehicle::new(9, "AA9999"))
        }
    }

    #[test]
    fn test_cells_render_sentinels() {
        let r = record();
        assert_eq!(Column::Vehicle.cell(&r), "AA9999");
        assert_eq!(Column::OdometerStart.cell(&r), "1200.00");
        assert_eq!(Column::Distance.cell(&r), "rollback (-200.00 km)");
        assert_eq!(Column::FuelEnd.cell(&r), "");
        assert_eq!(Column::AvgConsumptionSensor.cell(&r), "no movement");
        assert_eq!(Column::AvgConsumptionFlow.cell(&r), "9.46");
    }

    #[test]
    fn test_json_values() {
        let r = record();
        assert_eq!(Column::FuelStart.value(&r), json!(40.5));
        assert_eq!(Column::FuelEnd.value(&r), Value::Null);
        assert_eq!(Column::Distance.value(&r), json!({"rollback": -200.0}));
        assert_eq!(Column::AvgConsumptionSensor.value(&r), json!("no movement"));
    }

    #[test]
    fn test_selection_keeps_report_order() {
        let picked = normalize_selection(&[Column::Distance, Column::Vehicle, Column::Distance]);
        assert_eq!(picked, [Column::Vehicle, Column::Distance]);
        assert_eq!(normalize_selection(&[]).len(), Column::ALL.len());
    }
}
