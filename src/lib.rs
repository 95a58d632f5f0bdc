//! Marine voyage routing engine: land/bathymetry/blocked-zone/ocean-mask
//! oracles, a weather provider, a vessel fuel/CO₂ cost model, two A*
//! planner variants and a genetic route optimizer, orchestrated behind the
//! entry points in [`api`].

pub mod api;
pub mod config;
pub mod error;
pub mod genetic;
pub mod geo_math;
pub mod oracle;
pub mod planner;
pub mod ports;
pub mod vessel;
pub mod weather;

pub use error::{Result, RoutingError};
pub use geo_math::Coordinate;
pub use oracle::Oracles;
pub use vessel::Vessel;
