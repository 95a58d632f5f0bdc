//! The fuel-cost A* variant behind `runAStar` (§6): an 8-connected
//! great-circle grid like C5's ocean-mask A*, but weighted by fuel burn
//! (via C7) instead of distance, with a fuel-estimate heuristic, and
//! validated cell-by-cell against the land/bathymetry/blocked-zone/weather
//! oracles (C2/C3/C4/C6) rather than a precomputed mask. Per spec §9's open
//! question ("the source uses distance for the ocean mask A* and fuel for
//! the grid A* — both are valid, pick one per planner variant"), this crate
//! keeps both: [`crate::oracle::ocean_mask::find_ocean_path`] for the
//! guaranteed-sea baseline behind `runSimple`, and this module for
//! `runAStar`.

use std::collections::{BinaryHeap, HashMap, HashSet};

use crate::error::{Result, RoutingError};
use crate::geo_math::{great_circle_distance, normalize_longitude, Coordinate};
use crate::genetic::WeatherField;
use crate::oracle::bathymetry::BathymetryOracle;
use crate::oracle::blocked_zone::BlockedZoneOracle;
use crate::oracle::land::LandOracle;
use crate::vessel::{segment_cost, Vessel};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct GridCell {
    row: i64,
    col: i64,
}

struct VirtualGrid {
    origin: Coordinate,
    resolution_deg: f64,
}

impl VirtualGrid {
    fn cell_of(&self, coord: Coordinate) -> GridCell {
        let lon = normalize_longitude(coord.lon);
        let row = ((self.origin.lat - coord.lat) / self.resolution_deg).round() as i64;
        let col = ((lon - self.origin.lon) / self.resolution_deg).round() as i64;
        GridCell { row, col }
    }

    fn center_of(&self, cell: GridCell) -> Coordinate {
        Coordinate::new(
            self.origin.lat - cell.row as f64 * self.resolution_deg,
            self.origin.lon + cell.col as f64 * self.resolution_deg,
        )
    }

    fn neighbors(&self, cell: GridCell) -> Vec<GridCell> {
        let mut out = Vec::with_capacity(8);
        for dy in -1..=1 {
            for dx in -1..=1 {
                if dx == 0 && dy == 0 {
                    continue;
                }
                out.push(GridCell { row: cell.row + dy, col: cell.col + dx });
            }
        }
        out
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct OpenEntry {
    f: f64,
    cell: GridCell,
}
impl Eq for OpenEntry {}
impl Ord for OpenEntry {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        other.f.total_cmp(&self.f)
    }
}
impl PartialOrd for OpenEntry {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

pub struct FuelAStarResult {
    pub path: Vec<Coordinate>,
    pub total_fuel_t: f64,
    pub total_co2_t: f64,
    pub total_distance_nm: f64,
    pub total_duration_h: f64,
    pub iterations: u64,
}

fn cell_is_navigable(
    cell_coord: Coordinate,
    land: &LandOracle,
    bathymetry: &BathymetryOracle,
    blocked_zones: &BlockedZoneOracle,
    vessel: &Vessel,
) -> bool {
    if land.is_land(cell_coord) {
        return false;
    }
    if blocked_zones.is_in_blocked_zone(cell_coord) {
        return false;
    }
    bathymetry.depth(cell_coord, land) >= vessel.draft_m * 1.5
}

fn edge_fuel_cost(p1: Coordinate, p2: Coordinate, vessel: &Vessel, weather: &WeatherField, weather_enabled: bool) -> f64 {
    let distance = great_circle_distance(p1, p2);
    let sample = if weather_enabled { weather.nearest(p1) } else { None };
    segment_cost(vessel, distance, vessel.service_speed_kn, sample).fuel_consumed_t
}

/// Fuel-per-nautical-mile at service speed under calm conditions, used to
/// convert the admissible distance-to-goal heuristic into an admissible
/// fuel estimate.
fn fuel_per_nm(vessel: &Vessel) -> f64 {
    segment_cost(vessel, 1.0, vessel.service_speed_kn, None).fuel_consumed_t
}

pub fn find_fuel_optimal_path(
    start: Coordinate,
    end: Coordinate,
    vessel: &Vessel,
    land: &LandOracle,
    bathymetry: &BathymetryOracle,
    blocked_zones: &BlockedZoneOracle,
    weather: &WeatherField,
    weather_enabled: bool,
    grid_resolution_deg: f64,
    max_iterations: u64,
) -> Result<FuelAStarResult> {
    let grid = VirtualGrid { origin: start, resolution_deg: grid_resolution_deg };
    let start_cell = grid.cell_of(start);
    let end_cell = grid.cell_of(end);
    let fuel_rate = fuel_per_nm(vessel);

    let h = |cell: GridCell| great_circle_distance(grid.center_of(cell), end) * fuel_rate;

    let mut open_heap: BinaryHeap<OpenEntry> = BinaryHeap::new();
    let mut open_set: HashSet<GridCell> = HashSet::new();
    let mut closed: HashSet<GridCell> = HashSet::new();
    let mut g_score: HashMap<GridCell, f64> = HashMap::new();
    let mut came_from: HashMap<GridCell, GridCell> = HashMap::new();

    g_score.insert(start_cell, 0.0);
    open_heap.push(OpenEntry { f: h(start_cell), cell: start_cell });
    open_set.insert(start_cell);

    let mut iterations = 0u64;

    while let Some(OpenEntry { cell: current, .. }) = open_heap.pop() {
        if !open_set.remove(&current) {
            continue;
        }
        iterations += 1;
        if iterations > max_iterations {
            return Err(RoutingError::SearchExhausted {
                iterations,
                message: "fuel-cost A* exceeded iteration cap before reaching the goal".into(),
            });
        }

        if current == end_cell {
            let mut cells = vec![current];
            let mut c = current;
            while let Some(&prev) = came_from.get(&c) {
                cells.push(prev);
                c = prev;
            }
            cells.reverse();

            let mut path: Vec<Coordinate> = cells.iter().map(|&c| grid.center_of(c)).collect();
            if let Some(first) = path.first_mut() {
                *first = start;
            }
            if let Some(last) = path.last_mut() {
                *last = end;
            }

            let mut total_fuel = 0.0;
            let mut total_co2 = 0.0;
            let mut total_distance = 0.0;
            let mut total_duration = 0.0;
            for pair in path.windows(2) {
                let distance = great_circle_distance(pair[0], pair[1]);
                let sample = if weather_enabled { weather.nearest(pair[0]) } else { None };
                let cost = segment_cost(vessel, distance, vessel.service_speed_kn, sample);
                total_fuel += cost.fuel_consumed_t;
                total_co2 += cost.co2_emitted_t;
                total_distance += distance;
                total_duration += cost.duration_h;
            }

            return Ok(FuelAStarResult {
                path,
                total_fuel_t: total_fuel,
                total_co2_t: total_co2,
                total_distance_nm: total_distance,
                total_duration_h: total_duration,
                iterations,
            });
        }

        closed.insert(current);
        let current_coord = grid.center_of(current);
        let current_g = g_score[&current];

        for neighbor in grid.neighbors(current) {
            if closed.contains(&neighbor) {
                continue;
            }
            let neighbor_coord = grid.center_of(neighbor);
            if !cell_is_navigable(neighbor_coord, land, bathymetry, blocked_zones, vessel) {
                continue;
            }
            let tentative_g = current_g + edge_fuel_cost(current_coord, neighbor_coord, vessel, weather, weather_enabled);
            if tentative_g < *g_score.get(&neighbor).unwrap_or(&f64::MAX) {
                came_from.insert(neighbor, current);
                g_score.insert(neighbor, tentative_g);
                open_heap.push(OpenEntry { f: tentative_g + h(neighbor), cell: neighbor });
                open_set.insert(neighbor);
            }
        }
    }

    Err(RoutingError::SearchExhausted {
        iterations,
        message: "no navigable path found between start and end".into(),
    })
}
