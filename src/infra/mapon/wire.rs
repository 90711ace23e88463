//! Response records for the Mapon endpoints and their normalization into
//! domain values.
//!
//! Every field is optional and decoded leniently: a value of the wrong JSON
//! type reads as absent instead of failing the whole document, so one odd
//! unit or sample never hides the rest of a response.

use anyhow::{Result, anyhow};
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::reconcile::{Channel, FuelSourceReading, FuelSummary};
use crate::resolve::TimestampedSample;
use crate::services::telemetry_api::Vehicle;
use crate::utility::round2;

fn lenient<'de, D, T>(de: D) -> std::result::Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Option::<Value>::deserialize(de)?;
    Ok(value.and_then(|v| serde_json::from_value(v).ok()))
}

/// `{ "data": ... }` wrapper shared by every endpoint.
#[derive(Debug, Deserialize)]
#[serde(bound = "T: DeserializeOwned")]
struct Envelope<T> {
    #[serde(default, deserialize_with = "lenient")]
    data: Option<T>,
}

fn decode<T: DeserializeOwned>(json: Value) -> Option<T> {
    serde_json::from_value::<Envelope<T>>(json)
        .ok()
        .and_then(|envelope| envelope.data)
}

// unit/list.json

#[derive(Debug, Deserialize)]
struct UnitListData {
    #[serde(default, deserialize_with = "lenient")]
    units: Option<Vec<Value>>,
}

/// One roster entry as the vendor sends it.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct RawUnit {
    #[serde(default, deserialize_with = "lenient")]
    pub unit_id: Option<Value>,
    #[serde(default, deserialize_with = "lenient")]
    pub number: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub label: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub mileage: Option<f64>,
}

impl RawUnit {
    /// Positive integer id, accepting numeric strings.
    pub fn id(&self) -> Option<u64> {
        let id = match self.unit_id.as_ref()? {
            Value::Number(n) => n.as_u64(),
            Value::String(s) => s.trim().parse::<u64>().ok(),
            _ => None,
        }?;
        (id > 0).then_some(id)
    }

    /// Plate number, else label, else a generated name.
    pub fn display_name(&self, id: u64) -> String {
        [&self.number, &self.label]
            .into_iter()
            .flatten()
            .map(|s| s.trim())
            .find(|s| !s.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| format!("Unit {id}"))
    }

    /// Human-readable handle for log lines about units that may lack an id.
    pub fn describe(&self) -> String {
        match (self.id(), &self.number, &self.label) {
            (Some(id), _, _) => self.display_name(id),
            (None, Some(number), _) if !number.trim().is_empty() => number.clone(),
            (None, _, Some(label)) if !label.trim().is_empty() => label.clone(),
            _ => format!("unit_id={}", self.unit_id.clone().unwrap_or(Value::Null)),
        }
    }
}

/// Extracts `data.units`. Entries that are not objects become empty units and
/// are later rejected for lacking an id.
pub fn units_from_json(json: Value) -> Result<Vec<RawUnit>> {
    let units = decode::<UnitListData>(json)
        .and_then(|data| data.units)
        .ok_or_else(|| anyhow!("response has no data.units array"))?;

    Ok(units
        .into_iter()
        .map(|unit| serde_json::from_value(unit).unwrap_or_default())
        .collect())
}

/// Why a roster entry was left out of the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    InvalidId,
    NoMileage,
}

impl Rejection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Rejection::InvalidId => "missing or non-positive unit_id",
            Rejection::NoMileage => "mileage missing or zero",
        }
    }
}

/// Splits the roster into eligible vehicles and rejected entries, keeping
/// roster order on both sides.
pub fn eligible_vehicles(
    units: &[RawUnit],
    require_mileage: bool,
) -> (Vec<Vehicle>, Vec<(&RawUnit, Rejection)>) {
    let mut eligible = Vec::new();
    let mut rejected = Vec::new();

    for unit in units {
        let Some(id) = unit.id() else {
            rejected.push((unit, Rejection::InvalidId));
            continue;
        };
        if require_mileage && !unit.mileage.is_some_and(|m| m > 0.0) {
            rejected.push((unit, Rejection::NoMileage));
            continue;
        }
        eligible.push(Vehicle::new(id, unit.display_name(id)));
    }

    (eligible, rejected)
}

// unit_data/can_point.json

#[derive(Debug, Deserialize)]
struct CanPointData {
    #[serde(default, deserialize_with = "lenient")]
    units: Option<Vec<CanPointUnit>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct CanPointUnit {
    #[serde(deserialize_with = "lenient")]
    total_distance: Option<CanValue>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct CanValue {
    #[serde(deserialize_with = "lenient")]
    value: Option<f64>,
}

/// `data.units[0].total_distance.value`, if numeric.
pub fn odometer_from_json(json: Value) -> Option<f64> {
    decode::<CanPointData>(json)?
        .units?
        .into_iter()
        .next()?
        .total_distance?
        .value
}

// fuel/data.json

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FuelChannelData {
    #[serde(deserialize_with = "lenient")]
    tanks: Option<Vec<FuelTank>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FuelTank {
    #[serde(deserialize_with = "lenient")]
    values: Option<Vec<Value>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawFuelPoint {
    #[serde(deserialize_with = "lenient")]
    gmt: Option<String>,
    #[serde(deserialize_with = "lenient")]
    value: Option<f64>,
}

/// Samples of one tank, plus how many raw points were thrown away.
#[derive(Debug, Clone, PartialEq)]
pub struct TankSamples {
    pub samples: Vec<TimestampedSample>,
    pub discarded: usize,
}

/// Reads `data.<channel>.tanks[0].values`, dropping points with a missing or
/// negative value or an unparseable timestamp, and sorts the rest ascending.
///
/// `None` means the channel has no tank data at all.
pub fn tank_samples_from_json(json: Value, channel: Channel) -> Option<TankSamples> {
    let mut data = decode::<serde_json::Map<String, Value>>(json)?;
    let channel_data: FuelChannelData =
        serde_json::from_value(data.remove(channel.as_str())?).ok()?;
    let raw = channel_data.tanks?.into_iter().next()?.values?;

    let total = raw.len();
    let mut samples: Vec<TimestampedSample> = raw
        .into_iter()
        .filter_map(|point| {
            let point: RawFuelPoint = serde_json::from_value(point).ok()?;
            let value = point.value.filter(|v| v.is_finite() && *v >= 0.0)?;
            let timestamp = parse_vendor_time(point.gmt.as_deref()?)?;
            Some(TimestampedSample::new(timestamp, value))
        })
        .collect();
    samples.sort_by_key(|s| s.timestamp);

    Some(TankSamples {
        discarded: total - samples.len(),
        samples,
    })
}

/// Accepts RFC 3339 (`2024-06-01T06:00:00Z`) or a bare `YYYY-MM-DD HH:MM:SS`
/// taken as UTC.
pub fn parse_vendor_time(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
                .ok()
                .map(|naive| naive.and_utc())
        })
}

// fuel/summary.json

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SummaryEntry {
    #[serde(deserialize_with = "lenient")]
    sensor: Option<SummaryChannel>,
    #[serde(deserialize_with = "lenient")]
    can: Option<SummaryChannel>,
    #[serde(deserialize_with = "lenient")]
    flow: Option<SummaryChannel>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SummaryChannel {
    #[serde(deserialize_with = "lenient")]
    fueled: Option<f64>,
    #[serde(deserialize_with = "lenient")]
    drained: Option<f64>,
    #[serde(deserialize_with = "lenient")]
    total_consumed: Option<f64>,
    #[serde(deserialize_with = "lenient")]
    avg_consumption: Option<f64>,
}

impl From<SummaryChannel> for FuelSourceReading {
    fn from(raw: SummaryChannel) -> Self {
        let clean = |v: Option<f64>| v.filter(|v| v.is_finite() && *v >= 0.0).map(round2);
        FuelSourceReading {
            refueled: clean(raw.fueled),
            drained: clean(raw.drained),
            consumed: clean(raw.total_consumed),
            avg_consumption: clean(raw.avg_consumption),
        }
    }
}

/// Reads `data[0]` of the period summary.
///
/// # Errors
///
/// Fails when `data` is not a non-empty array.
pub fn summary_from_json(json: Value) -> Result<FuelSummary> {
    let entry = decode::<Vec<Value>>(json)
        .and_then(|entries| entries.into_iter().next())
        .ok_or_else(|| anyhow!("response data is not a non-empty array"))?;
    let entry: SummaryEntry = serde_json::from_value(entry).unwrap_or_default();

    Ok(FuelSummary {
        sensor: entry.sensor.map(Into::into),
        can: entry.can.map(Into::into),
        flow: entry.flow.map(Into::into),
    })
}
