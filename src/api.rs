//! Orchestration entry points (C9): `listPorts`, `searchPorts`, `runSimple`,
//! `runAStar`, `runGenetic`, `compare`. Each wires the oracles (C1-C5),
//! weather provider (C6), vessel model (C7) and, for `runGenetic`, the
//! genetic optimizer (C8) into a single [`RouteResult`] shaped per spec §6.
//!
//! Grounded on the teacher's `main.rs`, which played the same role of a
//! thin orchestration layer calling into `IsochroneRouter`/`PhysicsModel`
//! and shaping their output for the UI; here the shape is a serializable
//! result struct instead of a Bevy resource.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Result, RoutingError};
use crate::genetic::{GaConfig, GeneticOptimizer, WeatherField};
use crate::geo_math::Coordinate;
use crate::oracle::ocean_mask::{find_ocean_path, validate_sea_route};
use crate::oracle::Oracles;
use crate::planner::find_fuel_optimal_path;
use crate::ports::{Port, PortCatalog};
use crate::vessel::{segment_cost, Vessel};
use crate::weather::WeatherProvider;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PathPoint {
    pub lat: f64,
    pub lon: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub depth: Option<f64>,
}

/// The shared result shape every planner variant returns, per spec §6.
/// Fields specific to one algorithm (`generations`, `iterations`,
/// `best_fitness`) are `None` for the others.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteResult {
    pub success: bool,
    pub path: Vec<PathPoint>,
    pub total_distance_nm: f64,
    pub total_fuel_t: f64,
    pub total_co2_t: f64,
    pub total_duration_h: f64,
    pub algorithm: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generations: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iterations: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub best_fitness: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub vessel: Vessel,
    pub calculated_at: DateTime<Utc>,
}

fn points_with_depth(oracles: &Oracles, path: &[Coordinate]) -> Vec<PathPoint> {
    path.iter()
        .map(|&c| PathPoint { lat: c.lat, lon: c.lon, depth: Some(oracles.bathymetry.depth(c, &oracles.land)) })
        .collect()
}

fn totals_for_path(vessel: &Vessel, path: &[Coordinate], weather: &WeatherField, weather_enabled: bool) -> (f64, f64, f64, f64) {
    let mut distance = 0.0;
    let mut fuel = 0.0;
    let mut co2 = 0.0;
    let mut duration = 0.0;
    for pair in path.windows(2) {
        let d = crate::geo_math::great_circle_distance(pair[0], pair[1]);
        let sample = if weather_enabled { weather.nearest(pair[0]) } else { None };
        let cost = segment_cost(vessel, d, vessel.service_speed_kn, sample);
        distance += d;
        fuel += cost.fuel_consumed_t;
        co2 += cost.co2_emitted_t;
        duration += cost.duration_h;
    }
    (distance, fuel, co2, duration)
}

fn validate_endpoints(start: Coordinate, end: Coordinate) -> Result<()> {
    if !start.is_valid() {
        return Err(RoutingError::input("start", "latitude must be in [-90, 90]"));
    }
    if !end.is_valid() {
        return Err(RoutingError::input("end", "latitude must be in [-90, 90]"));
    }
    Ok(())
}

/// `listPorts(limit) → Port[]`.
pub fn list_ports(catalog: &PortCatalog, limit: usize) -> Vec<Port> {
    catalog.list(limit)
}

/// `searchPorts(query, limit) → Port[]`.
pub fn search_ports(catalog: &PortCatalog, query: &str, limit: usize) -> Vec<Port> {
    catalog.search(query, limit)
}

/// `runSimple({start, end, vessel?})`: C5's guaranteed-sea mask A* (distance
/// cost, distance heuristic), then C7 costs the resulting polyline at
/// service speed with weather disabled. The cheapest, always-available
/// planner variant.
pub fn run_simple(oracles: &Oracles, vessel: &Vessel, start: Coordinate, end: Coordinate, max_iterations: u64) -> Result<RouteResult> {
    validate_endpoints(start, end)?;
    vessel.validate()?;

    let mask = oracles.active_ocean_mask();
    let search = find_ocean_path(mask, start, end, max_iterations)?;
    let weather = WeatherField::empty();
    let (distance, fuel, co2, duration) = totals_for_path(vessel, &search.path, &weather, false);

    Ok(RouteResult {
        success: true,
        path: points_with_depth(oracles, &search.path),
        total_distance_nm: distance,
        total_fuel_t: fuel,
        total_co2_t: co2,
        total_duration_h: duration,
        algorithm: "simple".into(),
        generations: None,
        iterations: Some(search.iterations),
        best_fitness: None,
        message: None,
        vessel: vessel.clone(),
        calculated_at: Utc::now(),
    })
}

/// `runAStar({start, end, vessel?, gridResolution, weatherEnabled})`: the
/// fuel-cost grid A* of [`crate::planner`] — C1+C2+C3+C6+C7, distinct from
/// `runSimple`'s distance-cost mask A* per spec §2's data-flow line and the
/// open question resolved in `DESIGN.md`.
pub fn run_a_star(
    oracles: &Oracles,
    vessel: &Vessel,
    start: Coordinate,
    end: Coordinate,
    grid_resolution_deg: f64,
    weather_enabled: bool,
    weather: &WeatherField,
    max_iterations: u64,
) -> Result<RouteResult> {
    validate_endpoints(start, end)?;
    vessel.validate()?;
    if !(0.1..=2.0).contains(&grid_resolution_deg) {
        return Err(RoutingError::input("gridResolution", "must be within [0.1, 2.0] degrees"));
    }

    let result = find_fuel_optimal_path(
        start,
        end,
        vessel,
        &oracles.land,
        &oracles.bathymetry,
        &oracles.blocked_zones,
        weather,
        weather_enabled,
        grid_resolution_deg,
        max_iterations,
    )?;

    Ok(RouteResult {
        success: true,
        path: points_with_depth(oracles, &result.path),
        total_distance_nm: result.total_distance_nm,
        total_fuel_t: result.total_fuel_t,
        total_co2_t: result.total_co2_t,
        total_duration_h: result.total_duration_h,
        algorithm: "astar".into(),
        generations: None,
        iterations: Some(result.iterations),
        best_fitness: None,
        message: None,
        vessel: vessel.clone(),
        calculated_at: Utc::now(),
    })
}

#[derive(Debug, Clone)]
pub struct GeneticRequest {
    pub population_size: usize,
    pub generations: usize,
    pub weather_enabled: bool,
    pub seed: u64,
}

impl Default for GeneticRequest {
    fn default() -> Self {
        let defaults = GaConfig::default();
        Self {
            population_size: defaults.population_size,
            generations: defaults.generations,
            weather_enabled: defaults.weather_enabled,
            seed: defaults.seed,
        }
    }
}

/// `runGenetic({start, end, vessel?, populationSize ∈ [5,100], generations ∈
/// [5,50], weatherEnabled})`: C8's population search with a final repair
/// pass. Never fails once inputs validate — a suboptimal repaired path is
/// always returned.
pub fn run_genetic(
    oracles: &Oracles,
    vessel: &Vessel,
    start: Coordinate,
    end: Coordinate,
    request: GeneticRequest,
    weather: WeatherField,
) -> Result<RouteResult> {
    validate_endpoints(start, end)?;
    vessel.validate()?;
    if !(5..=100).contains(&request.population_size) {
        return Err(RoutingError::input("populationSize", "must be within [5, 100]"));
    }
    if !(5..=50).contains(&request.generations) {
        return Err(RoutingError::input("generations", "must be within [5, 50]"));
    }

    let config = GaConfig {
        population_size: request.population_size,
        generations: request.generations,
        weather_enabled: request.weather_enabled,
        seed: request.seed,
        ..GaConfig::default()
    };
    let mut optimizer = GeneticOptimizer::new(&oracles.land, &oracles.bathymetry, &oracles.blocked_zones, config);
    let run_result = optimizer.run(start, end, vessel, &weather);

    let message = if run_result.repaired_segments > 0 {
        Some(format!("{} segment(s) required repair to stay sea-valid", run_result.repaired_segments))
    } else {
        None
    };

    Ok(RouteResult {
        success: true,
        path: points_with_depth(oracles, &run_result.path),
        total_distance_nm: run_result.total_distance_nm,
        total_fuel_t: run_result.total_fuel_t,
        total_co2_t: run_result.total_co2_t,
        total_duration_h: run_result.total_duration_h,
        algorithm: "genetic".into(),
        generations: Some(run_result.generations_run),
        iterations: None,
        best_fitness: Some(run_result.best_fitness),
        message,
        vessel: vessel.clone(),
        calculated_at: Utc::now(),
    })
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompareResult {
    pub simple: RouteResult,
    pub genetic: RouteResult,
    pub fuel_savings_t: f64,
    pub distance_delta_nm: f64,
}

/// `compare({start, end, vessel?})`: runs `runSimple` and `runGenetic`
/// concurrently (they share no mutable state — both only read the oracles)
/// and reports the genetic result's savings relative to the simple
/// baseline.
pub async fn compare(oracles: &Oracles, vessel: &Vessel, start: Coordinate, end: Coordinate, max_iterations: u64) -> Result<CompareResult> {
    let weather = WeatherField::empty();
    let (simple, genetic) = tokio::join!(
        async { run_simple(oracles, vessel, start, end, max_iterations) },
        async { run_genetic(oracles, vessel, start, end, GeneticRequest::default(), weather) }
    );
    let simple = simple?;
    let genetic = genetic?;

    let fuel_savings_t = simple.total_fuel_t - genetic.total_fuel_t;
    let distance_delta_nm = genetic.total_distance_nm - simple.total_distance_nm;

    Ok(CompareResult { simple, genetic, fuel_savings_t, distance_delta_nm })
}

/// Validates a computed route against the active ocean mask, per spec §7's
/// "routes may be advisory-flagged, never silently corrected" guidance.
pub fn validate_route(oracles: &Oracles, path: &[Coordinate]) -> crate::oracle::ocean_mask::SeaRouteValidation {
    validate_sea_route(oracles.active_ocean_mask(), path)
}

pub async fn sample_weather_along_route(provider: &WeatherProvider, start: Coordinate, end: Coordinate, resolution_deg: f64) -> WeatherField {
    WeatherField::new(provider.fetch_along_route(start, end, resolution_deg).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oracle::bathymetry::BathymetryOracle;
    use crate::oracle::blocked_zone::BlockedZoneOracle;
    use crate::oracle::land::LandOracle;
    use crate::oracle::ocean_mask::OceanMask;
    use crate::vessel::FuelType;

    fn test_vessel() -> Vessel {
        Vessel {
            name: "API Test Ship".into(),
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

    fn open_ocean_oracles() -> Oracles {
        Oracles::from_fixtures(
            LandOracle::degraded(),
            BathymetryOracle::degraded(),
            BlockedZoneOracle::empty(),
            OceanMask::all_water(0.25),
        )
    }

    #[test]
    fn run_simple_preserves_endpoints_and_succeeds() {
        let oracles = open_ocean_oracles();
        let vessel = test_vessel();
        let start = Coordinate::new(41.0082, 28.9784);
        let end = Coordinate::new(40.8518, 14.2681);
        let result = run_simple(&oracles, &vessel, start, end, 200_000).unwrap();
        assert!(result.success);
        assert!(result.total_fuel_t > 0.0);
        assert_eq!(result.algorithm, "simple");
    }

    #[test]
    fn run_simple_rejects_invalid_vessel() {
        let oracles = open_ocean_oracles();
        let mut vessel = test_vessel();
        vessel.draft_m = -1.0;
        let start = Coordinate::new(41.0082, 28.9784);
        let end = Coordinate::new(40.8518, 14.2681);
        assert!(run_simple(&oracles, &vessel, start, end, 200_000).is_err());
    }

    #[test]
    fn run_a_star_rejects_out_of_range_resolution() {
        let oracles = open_ocean_oracles();
        let vessel = test_vessel();
        let start = Coordinate::new(38.0, 25.0);
        let end = Coordinate::new(38.5, 25.5);
        let result = run_a_star(&oracles, &vessel, start, end, 5.0, false, &WeatherField::empty(), 200_000);
        assert!(result.is_err());
    }

    #[test]
    fn run_genetic_rejects_out_of_range_population() {
        let oracles = open_ocean_oracles();
        let vessel = test_vessel();
        let start = Coordinate::new(38.0, 25.0);
        let end = Coordinate::new(38.5, 25.5);
        let request = GeneticRequest { population_size: 200, ..GeneticRequest::default() };
        let result = run_genetic(&oracles, &vessel, start, end, request, WeatherField::empty());
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn compare_runs_both_planners() {
        let oracles = open_ocean_oracles();
        let vessel = test_vessel();
        let start = Coordinate::new(37.9416, 23.6470);
        let end = Coordinate::new(41.3851, 2.1734);
        let result = compare(&oracles, &vessel, start, end, 200_000).await.unwrap();
        assert!(result.simple.success);
        assert!(result.genetic.success);
    }
}
