//! Geospatial environment oracles (C2–C5): land, bathymetry, blocked
//! zones, and the ocean mask + A* planner. Bundled behind a single
//! `Oracles` handle constructed once at process startup via [`Oracles::init`],
//! per spec §9's "lazy global singletons become explicit init()" guidance.

pub mod bathymetry;
pub mod blocked_zone;
pub mod land;
pub mod ocean_mask;

use std::path::Path;
use std::sync::OnceLock;

use log::warn;

use bathymetry::BathymetryOracle;
use blocked_zone::BlockedZoneOracle;
use land::{LandGrid, LandOracle, LandPolygons};
use ocean_mask::OceanMask;

use crate::config::Config;

/// Immutable, process-wide handles to every dataset-backed oracle. Datasets
/// are loaded once at construction and never mutated afterward; only the
/// bathymetry depth cache is interior-mutable (see [`BathymetryOracle`]).
pub struct Oracles {
    pub land: LandOracle,
    pub bathymetry: BathymetryOracle,
    pub blocked_zones: BlockedZoneOracle,
    pub ocean_mask: OceanMask,
    pub high_res_ocean_mask: Option<OceanMask>,
}

const LAND_GRID_RESOLUTION: f64 = 0.05;
const OCEAN_MASK_RESOLUTION: f64 = 0.25;

impl Oracles {
    /// Loads every dataset under `data_dir`, degrading individual oracles
    /// to permissive defaults (and logging once) on a per-file load
    /// failure rather than failing the whole process. This call is
    /// idempotent to run twice (e.g. under a race in a process that calls
    /// it from two threads): re-running it simply reloads into a fresh
    /// `Oracles` value, and callers are expected to publish it behind a
    /// single `OnceLock`/`Arc` (see [`global`]).
    pub fn init(config: &Config) -> Self {
        let data_dir = config.data_dir.as_path();
        let land = Self::load_land(data_dir);
        let bathymetry =
            Self::load_bathymetry(data_dir).with_api_base(config.bathy_api_base.clone(), config.max_bathy_concurrency);
        let blocked_zones = Self::load_blocked_zones(data_dir);
        let ocean_mask = Self::load_ocean_mask(data_dir, "ocean_mask.json", OCEAN_MASK_RESOLUTION);
        let high_res_ocean_mask = Self::try_load_ocean_mask(data_dir, "ocean_mask_highres.json");

        Self { land, bathymetry, blocked_zones, ocean_mask, high_res_ocean_mask }
    }

    /// The mask to route against: the high-resolution variant if present,
    /// otherwise the standard one.
    pub fn active_ocean_mask(&self) -> &OceanMask {
        self.high_res_ocean_mask.as_ref().unwrap_or(&self.ocean_mask)
    }

    fn load_land(data_dir: &Path) -> LandOracle {
        let grid_path = data_dir.join("land_grid.json");
        let grid = match std::fs::read_to_string(&grid_path) {
            Ok(data) => match LandGrid::from_json(&data) {
                Ok(g) => g,
                Err(e) => {
                    warn!("failed to parse land grid {:?}: {e}", grid_path);
                    return LandOracle::degraded();
                }
            },
            Err(e) => {
                warn!("failed to read land grid {:?}: {e}", grid_path);
                return LandOracle::degraded();
            }
        };

        let polygons_path = data_dir.join("land_polygons.geojson");
        let polygons = match std::fs::read_to_string(&polygons_path) {
            Ok(data) => LandPolygons::from_geojson(&data).unwrap_or_else(|e| {
                warn!("failed to parse land polygons {:?}: {e}", polygons_path);
                LandPolygons::empty()
            }),
            Err(_) => LandPolygons::empty(),
        };

        LandOracle::new(grid, polygons)
    }

    fn load_bathymetry(data_dir: &Path) -> BathymetryOracle {
        let path = data_dir.join("bathymetry.json");
        match std::fs::read_to_string(&path) {
            Ok(data) => BathymetryOracle::from_json(&data).unwrap_or_else(|e| {
                warn!("failed to parse bathymetry dataset {:?}: {e}", path);
                BathymetryOracle::degraded()
            }),
            Err(e) => {
                warn!("failed to read bathymetry dataset {:?}: {e}", path);
                BathymetryOracle::degraded()
            }
        }
    }

    fn load_blocked_zones(data_dir: &Path) -> BlockedZoneOracle {
        let path = data_dir.join("blocked_zones.json");
        match std::fs::read_to_string(&path) {
            Ok(data) => BlockedZoneOracle::from_json(&data).unwrap_or_else(|e| {
                warn!("failed to parse blocked zones {:?}: {e}", path);
                BlockedZoneOracle::empty()
            }),
            Err(_) => BlockedZoneOracle::empty(),
        }
    }

    fn load_ocean_mask(data_dir: &Path, filename: &str, fallback_resolution: f64) -> OceanMask {
        let path = data_dir.join(filename);
        match std::fs::read_to_string(&path) {
            Ok(data) => OceanMask::from_json(&data).unwrap_or_else(|e| {
                warn!("failed to parse ocean mask {:?}: {e}", path);
                OceanMask::all_water(fallback_resolution)
            }),
            Err(e) => {
                warn!("failed to read ocean mask {:?}: {e}", path);
                OceanMask::all_water(fallback_resolution)
            }
        }
    }

    fn try_load_ocean_mask(data_dir: &Path, filename: &str) -> Option<OceanMask> {
        let path = data_dir.join(filename);
        let data = std::fs::read_to_string(&path).ok()?;
        match OceanMask::from_json(&data) {
            Ok(mask) => Some(mask),
            Err(e) => {
                warn!("failed to parse high-res ocean mask {:?}: {e}", path);
                None
            }
        }
    }

    /// Builds an in-memory `Oracles` from fixtures, for tests that want
    /// more control than a directory of files on disk (per spec §9's "tests
    /// inject in-memory fixtures").
    pub fn from_fixtures(
        land: LandOracle,
        bathymetry: BathymetryOracle,
        blocked_zones: BlockedZoneOracle,
        ocean_mask: OceanMask,
    ) -> Self {
        Self { land, bathymetry, blocked_zones, ocean_mask, high_res_ocean_mask: None }
    }
}

static GLOBAL: OnceLock<Oracles> = OnceLock::new();

/// Publishes a process-wide `Oracles` handle the first time it's called;
/// subsequent calls (even racing ones) observe the same published value —
/// double-load under a race is tolerated, one publish wins, per spec §5.
pub fn global(config: &Config) -> &'static Oracles {
    GLOBAL.get_or_init(|| Oracles::init(config))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_data_dir_degrades_every_oracle_gracefully() {
        let config = Config::for_tests(Path::new("/nonexistent/path/for/tests"));
        let oracles = Oracles::init(&config);
        assert!(oracles.land.is_degraded());
        assert!(!oracles.land.is_land(crate::geo_math::Coordinate::new(41.9, 12.5)));
        assert!(oracles.ocean_mask.is_point_in_sea(crate::geo_math::Coordinate::new(0.0, 0.0)));
    }
}
