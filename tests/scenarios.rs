//! Black-box end-to-end scenarios against small synthetic fixture datasets
//! (not full-resolution production data), exercising the orchestration
//! entry points in [`marine_router::api`] the way a caller would.

use marine_router::api::{self, GeneticRequest};
use marine_router::genetic::WeatherField;
use marine_router::oracle::bathymetry::BathymetryOracle;
use marine_router::oracle::blocked_zone::BlockedZoneOracle;
use marine_router::oracle::land::{LandGrid, LandOracle, LandPolygons};
use marine_router::oracle::ocean_mask::OceanMask;
use marine_router::oracle::Oracles;
use marine_router::vessel::{FuelType, Vessel};
use marine_router::Coordinate;

const ISTANBUL: (f64, f64) = (41.0082, 28.9784);
const NAPOLI: (f64, f64) = (40.8518, 14.2681);
const PIRAEUS: (f64, f64) = (37.9416, 23.6470);
const BARCELONA: (f64, f64) = (41.3851, 2.1734);
const ROME: (f64, f64) = (41.9028, 12.4964);
const AEGEAN_OPEN_WATER: (f64, f64) = (38.0, 25.0);

fn test_vessel() -> Vessel {
    Vessel {
        name: "Scenario Carrier".into(),
        vessel_type: "Container".into(),
        dwt: 50_000.0,
        length_m: 220.0,
        beam_m: 32.0,
        draft_m: 11.0,
        service_speed_kn: 18.0,
        max_speed_kn: Some(22.0),
        fuel_type: FuelType::Hfo,
        fuel_consumption_rate: 60.0,
        engine_power_kw: 18_000.0,
    }
}

/// Builds a full-globe 1°-resolution land grid JSON with a single
/// `(row, start_col, run_len)` land run, everything else open water.
fn land_grid_json_with_band(row: usize, start_col: u32, run_len: u32) -> String {
    let mut rows = vec!["[]".to_string(); 180];
    rows[row] = format!("[{start_col}, {run_len}]");
    format!(
        r#"{{"resolution": 1.0, "width": 360, "height": 180, "originLat": 90.0, "originLon": -180.0, "rows": [{}]}}"#,
        rows.join(", ")
    )
}

/// A land oracle with a single 1°×9° land band at latitude (41,42], spanning
/// longitude (12,21] — covers Rome and the Balkan landmass a direct
/// Istanbul→Rome segment would cross, standing in for the real coastline
/// dataset in these fixture-scale tests.
fn land_oracle_with_italy_band() -> LandOracle {
    let json = land_grid_json_with_band(48, 192, 9);
    let grid = LandGrid::from_json(&json).unwrap();
    LandOracle::new(grid, LandPolygons::empty())
}

fn open_ocean_oracles() -> Oracles {
    Oracles::from_fixtures(
        LandOracle::degraded(),
        BathymetryOracle::degraded(),
        BlockedZoneOracle::empty(),
        OceanMask::all_water(0.25),
    )
}

#[test]
fn genetic_route_istanbul_to_napoli_stays_sea_valid() {
    let oracles = open_ocean_oracles();
    let vessel = test_vessel();
    let start = Coordinate::new(ISTANBUL.0, ISTANBUL.1);
    let end = Coordinate::new(NAPOLI.0, NAPOLI.1);

    let result = api::run_genetic(&oracles, &vessel, start, end, GeneticRequest::default(), WeatherField::empty()).unwrap();

    assert!(result.success);
    assert_eq!(result.path.first().unwrap().lat, start.lat);
    assert_eq!(result.path.last().unwrap().lat, end.lat);
    assert!(result.total_fuel_t > 0.0);
    assert!(result.total_co2_t > 0.0);
    assert!(result.generations.is_some());
}

#[test]
fn genetic_route_piraeus_to_barcelona_stays_sea_valid() {
    let oracles = open_ocean_oracles();
    let vessel = test_vessel();
    let start = Coordinate::new(PIRAEUS.0, PIRAEUS.1);
    let end = Coordinate::new(BARCELONA.0, BARCELONA.1);

    let result = api::run_genetic(&oracles, &vessel, start, end, GeneticRequest::default(), WeatherField::empty()).unwrap();

    assert!(result.success);
    assert!(result.total_distance_nm > 0.0);
    assert!(result.best_fitness.unwrap() > 0.0);
}

#[test]
fn aegean_open_water_point_reports_positive_depth_and_no_land() {
    let land = land_oracle_with_italy_band();
    let bathymetry = BathymetryOracle::degraded();
    let point = Coordinate::new(AEGEAN_OPEN_WATER.0, AEGEAN_OPEN_WATER.1);

    assert!(!land.is_land(point));
    assert!(bathymetry.depth(point, &land) > 0.0);
}

#[test]
fn rome_point_is_land_with_zero_depth() {
    let land = land_oracle_with_italy_band();
    let bathymetry = BathymetryOracle::degraded();
    let point = Coordinate::new(ROME.0, ROME.1);

    assert!(land.is_land(point));
    assert_eq!(bathymetry.depth(point, &land), 0.0);
}

#[test]
fn direct_segment_istanbul_to_rome_crosses_land() {
    let land = land_oracle_with_italy_band();
    let start = Coordinate::new(ISTANBUL.0, ISTANBUL.1);
    let end = Coordinate::new(ROME.0, ROME.1);

    assert!(land.segment_crosses_land(start, end));
}

#[test]
fn run_simple_istanbul_to_napoli_produces_positive_fuel_and_co2() {
    let oracles = open_ocean_oracles();
    let vessel = test_vessel();
    let start = Coordinate::new(ISTANBUL.0, ISTANBUL.1);
    let end = Coordinate::new(NAPOLI.0, NAPOLI.1);

    let result = api::run_simple(&oracles, &vessel, start, end, 200_000).unwrap();

    assert!(result.success);
    assert_eq!(result.algorithm, "simple");
    assert!(result.total_fuel_t > 0.0);
    assert!(result.total_co2_t > 0.0);

    let validation = api::validate_route(&oracles, &result.path.iter().map(|p| Coordinate::new(p.lat, p.lon)).collect::<Vec<_>>());
    assert!(validation.valid);
}
