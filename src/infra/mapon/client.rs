use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::{debug, error, info, warn};

use super::wire;
use crate::config::{ClientConfig, Credential};
use crate::fetch::auth::UrlParam;
use crate::fetch::{BasicClient, HttpClient, fetch_json};
use crate::reconcile::{Channel, FuelSummary};
use crate::resolve::TimestampedSample;
use crate::services::telemetry_api::{TelemetryApi, Vehicle};
use crate::utility::{format_api_instant, utc_day_bounds};

const UNIT_LIST: &str = "unit/list.json";
const CAN_POINT: &str = "unit_data/can_point.json";
const FUEL_DATA: &str = "fuel/data.json";
const FUEL_SUMMARY: &str = "fuel/summary.json";

/// Mapon REST client. Authentication is whatever `C` attaches to each request;
/// [`MaponClient::connect`] wires the API key in as the `key` query parameter.
pub struct MaponClient<C> {
    http: C,
    base_url: String,
    require_mileage: bool,
}

impl MaponClient<UrlParam<BasicClient>> {
    pub fn connect(credential: &Credential, config: &ClientConfig) -> Result<Self> {
        let basic = BasicClient::new(config.request_timeout, config.connect_timeout)
            .context("failed to build HTTP client")?;
        let http = UrlParam::new(basic, "key", credential.expose());
        Ok(Self::new(http, &config.base_url))
    }
}

impl<C: HttpClient> MaponClient<C> {
    pub fn new(http: C, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            require_mileage: true,
        }
    }

    /// Whether roster units without a positive mileage are skipped.
    pub fn with_mileage_requirement(mut self, required: bool) -> Self {
        self.require_mileage = required;
        self
    }

    async fn get(&self, endpoint: &str, params: &[(&str, String)]) -> Result<Value> {
        let mut url = reqwest::Url::parse(&format!("{}/{}", self.base_url, endpoint))
            .with_context(|| format!("invalid base URL '{}'", self.base_url))?;
        if !params.is_empty() {
            url.query_pairs_mut()
                .extend_pairs(params.iter().map(|(k, v)| (*k, v.as_str())));
        }
        fetch_json(&self.http, url).await
    }
}

#[async_trait]
impl<C: HttpClient> TelemetryApi for MaponClient<C> {
    #[tracing::instrument(skip(self), fields(require_mileage = self.require_mileage))]
    async fn list_vehicles(&self) -> Vec<Vehicle> {
        let json = match self.get(UNIT_LIST, &[]).await {
            Ok(json) => json,
            Err(e) => {
                error!(error = %e, "Unit list request failed");
                return Vec::new();
            }
        };

        let units = match wire::units_from_json(json) {
            Ok(units) => units,
            Err(e) => {
                error!(error = %e, "Unexpected unit list response");
                return Vec::new();
            }
        };
        info!(total = units.len(), "Unit list fetched");

        let (eligible, rejected) = wire::eligible_vehicles(&units, self.require_mileage);
        for (unit, reason) in &rejected {
            info!(unit = %unit.describe(), reason = reason.as_str(), "Unit skipped");
        }
        info!(
            eligible = eligible.len(),
            skipped = rejected.len(),
            "Unit roster filtered"
        );
        if eligible.is_empty() {
            warn!("No eligible units after filtering");
        }

        eligible
    }

    #[tracing::instrument(skip(self, instant), fields(instant = %format_api_instant(instant)))]
    async fn get_instant_reading(&self, vehicle_id: u64, instant: DateTime<Utc>) -> Option<f64> {
        let params = [
            ("unit_id", vehicle_id.to_string()),
            ("datetime", format_api_instant(instant)),
        ];

        match self.get(CAN_POINT, &params).await {
            Ok(json) => {
                let reading = wire::odometer_from_json(json);
                if reading.is_none() {
                    warn!("No CAN odometer value in response");
                }
                reading
            }
            Err(e) => {
                warn!(error = %e, "Odometer request failed");
                None
            }
        }
    }

    #[tracing::instrument(
        skip(self, instant, channel),
        fields(instant = %format_api_instant(instant), %channel)
    )]
    async fn get_day_samples(
        &self,
        vehicle_id: u64,
        instant: DateTime<Utc>,
        channel: Channel,
    ) -> Vec<TimestampedSample> {
        let (from, till) = utc_day_bounds(instant);
        let params = [
            ("unit_id", vehicle_id.to_string()),
            ("from", format_api_instant(from)),
            ("till", format_api_instant(till)),
            ("data_source", channel.as_str().to_string()),
        ];

        let json = match self.get(FUEL_DATA, &params).await {
            Ok(json) => json,
            Err(e) => {
                warn!(error = %e, "Fuel data request failed");
                return Vec::new();
            }
        };

        match wire::tank_samples_from_json(json, channel) {
            Some(parsed) => {
                debug!(
                    kept = parsed.samples.len(),
                    discarded = parsed.discarded,
                    "Tank samples parsed"
                );
                if parsed.samples.is_empty() {
                    info!("All tank samples missing or invalid");
                }
                parsed.samples
            }
            None => {
                info!("No tank data for channel");
                Vec::new()
            }
        }
    }

    #[tracing::instrument(
        skip(self, start, end),
        fields(start = %format_api_instant(start), end = %format_api_instant(end))
    )]
    async fn get_period_summary(
        &self,
        vehicle_id: u64,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> FuelSummary {
        let params = [
            ("unit_id", vehicle_id.to_string()),
            ("from", format_api_instant(start)),
            ("till", format_api_instant(end)),
        ];

        let json = match self.get(FUEL_SUMMARY, &params).await {
            Ok(json) => json,
            Err(e) => {
                warn!(error = %e, "Fuel summary request failed");
                return FuelSummary::default();
            }
        };

        match wire::summary_from_json(json) {
            Ok(summary) => {
                if summary.is_empty() {
                    info!("Fuel summary has no sensor, CAN or flow section");
                }
                summary
            }
            Err(e) => {
                warn!(error = %e, "Unexpected fuel summary response");
                FuelSummary::default()
            }
        }
    }
}
