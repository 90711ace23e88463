//! Fleet-wide orchestration: roster, per-vehicle fetches, derived metrics.

use anyhow::Result;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{Instrument, debug, error, info, warn};

use super::derive::{VehicleReadings, assemble_record};
use super::types::VehiclePeriodRecord;
use crate::config::{ClientConfig, Credential, ReportOptions, ReportWindow};
use crate::infra::mapon::MaponClient;
use crate::reconcile::Channel;
use crate::resolve::{Edge, resolve_sample};
use crate::services::telemetry_api::{TelemetryApi, Vehicle};
use crate::utility::{format_api_instant, round2};

/// Channels read for tank level, most trusted first.
const FUEL_LEVEL_CHANNELS: [Channel; 2] = [Channel::Sensor, Channel::Can];

/// Builds the fleet report for `window` against the live vendor API.
///
/// Vendor-side problems never fail the call; they show up as absent values.
///
/// # Errors
///
/// Only if the HTTP client itself cannot be constructed.
pub async fn generate_report(
    credential: &Credential,
    window: ReportWindow,
    config: &ClientConfig,
    options: ReportOptions,
) -> Result<Vec<VehiclePeriodRecord>> {
    let api = MaponClient::connect(credential, config)?
        .with_mileage_requirement(options.require_mileage);
    Ok(generate_report_with(Arc::new(api), window, options).await)
}

/// Builds the fleet report using any [`TelemetryApi`].
///
/// Vehicles are processed concurrently, at most `options.concurrency` at a
/// time, and rows come back in roster order.
#[tracing::instrument(
    skip(api, window),
    fields(start = %format_api_instant(window.start), end = %format_api_instant(window.end))
)]
pub async fn generate_report_with<A>(
    api: Arc<A>,
    window: ReportWindow,
    options: ReportOptions,
) -> Vec<VehiclePeriodRecord>
where
    A: TelemetryApi + ?Sized + 'static,
{
    if !window.is_ordered() {
        error!("Report start is after report end, nothing to do");
        return Vec::new();
    }

    let vehicles = api.list_vehicles().await;
    if vehicles.is_empty() {
        warn!("No eligible vehicles, report is empty");
        return Vec::new();
    }
    info!(vehicles = vehicles.len(), concurrency = options.concurrency, "Processing fleet");

    let semaphore = Arc::new(Semaphore::new(options.concurrency.max(1)));
    let mut tasks = Vec::with_capacity(vehicles.len());

    for vehicle in &vehicles {
        let sem = semaphore.clone();
        let api = api.clone();
        let vehicle = vehicle.clone();

        let span = tracing::info_span!(
            "process_vehicle",
            vehicle_id = vehicle.id,
            vehicle = %vehicle.display_name,
        );

        tasks.push(tokio::spawn(
            async move {
                // Held for the whole vehicle; dropped when the task finishes.
                let _permit = sem.acquire_owned().await;
                process_vehicle(api.as_ref(), vehicle, window).await
            }
            .instrument(span),
        ));
    }

    let mut records = Vec::with_capacity(tasks.len());
    for (vehicle, task) in vehicles.into_iter().zip(tasks) {
        match task.await {
            Ok(record) => records.push(record),
            Err(e) => {
                error!(vehicle_id = vehicle.id, error = %e, "Vehicle task failed, emitting empty row");
                records.push(VehiclePeriodRecord::unavailable(vehicle));
            }
        }
    }

    info!(rows = records.len(), "Fleet report assembled");
    records
}

/// Runs every stage for one vehicle. Each stage tolerates absence from the
/// previous one, so a row is always produced.
async fn process_vehicle<A>(api: &A, vehicle: Vehicle, window: ReportWindow) -> VehiclePeriodRecord
where
    A: TelemetryApi + ?Sized,
{
    debug!(stage = "fetch_odometers", "Stage started");
    let odometer_start = api.get_instant_reading(vehicle.id, window.start).await;
    let odometer_end = api.get_instant_reading(vehicle.id, window.end).await;

    debug!(stage = "fetch_fuel_points", "Stage started");
    let fuel_start = fuel_level(api, vehicle.id, window.start, Edge::RangeStart).await;
    let fuel_end = fuel_level(api, vehicle.id, window.end, Edge::RangeEnd).await;

    debug!(stage = "fetch_fuel_summary", "Stage started");
    let summary = api
        .get_period_summary(vehicle.id, window.start, window.end)
        .await;

    debug!(stage = "compute_derived", "Stage started");
    let record = assemble_record(
        vehicle,
        VehicleReadings {
            odometer_start,
            odometer_end,
            fuel_start,
            fuel_end,
            summary,
        },
    );

    debug!(stage = "emit_record", "Vehicle processed");
    record
}

/// Tank level at one edge of the window, from the first channel that has any
/// sample in the surrounding UTC day.
async fn fuel_level<A>(
    api: &A,
    vehicle_id: u64,
    instant: DateTime<Utc>,
    edge: Edge,
) -> Option<f64>
where
    A: TelemetryApi + ?Sized,
{
    for channel in FUEL_LEVEL_CHANNELS {
        let samples = api.get_day_samples(vehicle_id, instant, channel).await;
        let Some(resolution) = resolve_sample(&samples, instant, edge) else {
            debug!(%edge, %channel, "No samples on channel");
            continue;
        };

        let sample = resolution.sample();
        if resolution.is_fallback() {
            info!(
                %edge,
                %channel,
                sample_time = %format_api_instant(sample.timestamp),
                "No sample on the requested side of the edge, using nearest in day"
            );
        }
        debug!(%edge, %channel, value = sample.value, "Fuel level resolved");
        return Some(round2(sample.value));
    }

    info!(%edge, "No fuel level available");
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reconcile::FuelSummary;
    use crate::resolve::TimestampedSample;
    use async_trait::async_trait;
    use chrono::TimeZone;
    use std::sync::Mutex;

    /// Answers only the fuel-data endpoint, from per-channel series, and
    /// records which channels were asked for.
    #[derive(Default)]
    struct TankOnly {
        sensor: Vec<TimestampedSample>,
        can: Vec<TimestampedSample>,
        asked: Mutex<Vec<Channel>>,
    }

    #[async_trait]
    impl TelemetryApi for TankOnly {
        async fn list_vehicles(&self) -> Vec<Vehicle> {
            vec![Vehicle::new(1, "AA1111")]
        }

        async fn get_instant_reading(&self, _: u64, _: DateTime<Utc>) -> Option<f64> {
            None
        }

        async fn get_day_samples(
            &self,
            _: u64,
            _: DateTime<Utc>,
            channel: Channel,
        ) -> Vec<TimestampedSample> {
            self.asked.lock().unwrap().push(channel);
            match channel {
                Channel::Sensor => self.sensor.clone(),
                Channel::Can => self.can.clone(),
                Channel::Flow => Vec::new(),
            }
        }

        async fn get_period_summary(&self, _: u64, _: DateTime<Utc>, _: DateTime<Utc>) -> FuelSummary {
            FuelSummary::default()
        }
    }

    fn at(h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, h, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn test_fuel_level_prefers_sensor() {
        let api = TankOnly {
            sensor: vec![TimestampedSample::new(at(8), 41.234)],
            can: vec![TimestampedSample::new(at(8), 99.0)],
            ..Default::default()
        };
        assert_eq!(fuel_level(&api, 1, at(6), Edge::RangeStart).await, Some(41.23));
        assert_eq!(*api.asked.lock().unwrap(), [Channel::Sensor]);
    }

    #[tokio::test]
    async fn test_fuel_level_falls_back_to_can() {
        let api = TankOnly {
            can: vec![
                TimestampedSample::new(at(8), 60.0),
                TimestampedSample::new(at(20), 30.0),
            ],
            ..Default::default()
        };
        assert_eq!(fuel_level(&api, 1, at(12), Edge::RangeEnd).await, Some(60.0));
        assert_eq!(*api.asked.lock().unwrap(), [Channel::Sensor, Channel::Can]);
    }

    #[tokio::test]
    async fn test_fuel_level_absent_everywhere() {
        let api = TankOnly::default();
        assert_eq!(fuel_level(&api, 1, at(12), Edge::RangeStart).await, None);
    }

    #[tokio::test]
    async fn test_reversed_window_short_circuits() {
        let api = Arc::new(TankOnly::default());
        let window = ReportWindow::new(at(12), at(6));
        let rows = generate_report_with(api.clone(), window, ReportOptions::default()).await;
        assert!(rows.is_empty());
        assert!(api.asked.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_zero_concurrency_still_progresses() {
        let api = Arc::new(TankOnly::default());
        let options = ReportOptions {
            concurrency: 0,
            ..Default::default()
        };
        let rows = generate_report_with(api, ReportWindow::new(at(0), at(23)), options).await;
        assert_eq!(rows.len(), 1);
    }
}
