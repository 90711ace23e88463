//! Fleet odometer and fuel report built from Mapon telematics.
//!
//! The entry point is [`report::generate_report`]: given an API key and a UTC
//! window it returns one [`report::VehiclePeriodRecord`] per eligible vehicle.

pub mod config;
pub mod fetch;
pub mod infra;
pub mod output;
pub mod reconcile;
pub mod report;
pub mod resolve;
pub mod services;
pub mod utility;
