//! Core library for the `trip` CLI.
//!
//! This crate defines:
//! - Configuration & credentials handling
//! - Provider adapters for geocoding, weather, air quality, places and narration
//! - Primary/secondary fusion of weather and air quality
//! - Advisories, the per-city planner, the agent tool plan and export
//!
//! It is used by `trip-cli`, but can also be reused by other binaries or services.

pub mod advisory;
pub mod agent;
pub mod attractions;
pub mod config;
pub mod error;
pub mod export;
pub mod fusion;
pub mod model;
pub mod planner;
pub mod provider;

pub use agent::{AgentReport, ToolInvocation, TripAgent};
pub use config::{Config, Settings};
pub use error::TripError;
pub use export::ExportFormat;
pub use model::{AirQualityReading, Attraction, CityRequest, DailyForecast, DataSource, TripResult};
pub use planner::{CityFailure, CityOutcome, PlanReport, TripPlanner};
pub use provider::{ProviderId, Providers};
