//! Mapon fleet-telematics adapter.
//!
//! [`MaponClient`] implements [`TelemetryApi`](crate::services::telemetry_api::TelemetryApi)
//! over four GET endpoints; [`wire`] holds the response records.

mod client;
pub mod wire;

pub use client::MaponClient;
