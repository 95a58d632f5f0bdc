//! Environment-driven configuration.
//!
//! The teacher has no configuration framework of its own (no `config`/
//! `figment` dependency), so this crate follows suit and reads recognized
//! environment variables directly, with documented defaults, rather than
//! introducing a dependency the rest of the corpus doesn't reach for here.

use std::env;
use std::path::PathBuf;

use crate::error::{Result, RoutingError};

pub const DEFAULT_ASTAR_MAX_ITERATIONS: u64 = 200_000;
pub const DEFAULT_MAX_BATHY_CONCURRENCY: usize = 3;

#[derive(Debug, Clone)]
pub struct Config {
    /// Root directory for dataset files. Required for `Oracles::init`.
    pub data_dir: PathBuf,
    /// Override for the fallback depth API base URL.
    pub bathy_api_base: Option<String>,
    /// Semaphore capacity bounding concurrent bathymetry fallback requests.
    pub max_bathy_concurrency: usize,
    /// A* iteration cap override.
    pub astar_max_iterations: u64,
}

impl Config {
    /// Reads the recognized environment variables. `DATA_DIR` is required;
    /// everything else falls back to a documented default.
    pub fn from_env() -> Result<Self> {
        let data_dir = env::var("DATA_DIR").map_err(|_| {
            RoutingError::input("DATA_DIR", "DATA_DIR must be set to the dataset root directory")
        })?;

        let max_bathy_concurrency = env::var("MAX_BATHY_CONCURRENCY")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_MAX_BATHY_CONCURRENCY);

        let astar_max_iterations = env::var("ASTAR_MAX_ITERATIONS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_ASTAR_MAX_ITERATIONS);

        Ok(Self {
            data_dir: PathBuf::from(data_dir),
            bathy_api_base: env::var("BATHY_API_BASE").ok(),
            max_bathy_concurrency,
            astar_max_iterations,
        })
    }

    /// Config pointing at an in-memory/fixture data root, for tests.
    pub fn for_tests(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            bathy_api_base: None,
            max_bathy_concurrency: DEFAULT_MAX_BATHY_CONCURRENCY,
            astar_max_iterations: DEFAULT_ASTAR_MAX_ITERATIONS,
        }
    }
}
