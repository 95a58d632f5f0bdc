//! Ocean mask + A* planner (C5): a binary sea grid, with an 8-connected
//! great-circle A* over it producing a guaranteed-sea polyline.
//!
//! Grounded on the teacher's `engine::mask::LandMask`, which held exactly
//! this kind of raster in a `roaring::RoaringTreemap` keyed by an affine
//! index; this module keeps that storage choice (right-sized to
//! `RoaringBitmap`, since a practical mask resolution fits in 32 bits of
//! cell index) and adds the A* search the spec requires on top of it. The
//! open-set priority queue and closed-set hash set follow the standard
//! textbook construction; the admissible heuristic and cell-wrap rule are
//! dictated by spec §4.5.

use std::collections::{BinaryHeap, HashMap, HashSet};

use roaring::RoaringBitmap;
use serde::Deserialize;

use crate::geo_math::{great_circle_distance, normalize_longitude, Coordinate};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Cell {
    pub row: u32,
    pub col: u32,
}

/// Binary sea grid: `mask` holds land cells (absence = sea), matching the
/// teacher's bitmap-of-land convention.
pub struct OceanMask {
    pub resolution: f64,
    pub origin_lat: f64,
    pub origin_lon: f64,
    pub width: u32,
    pub height: u32,
    land: RoaringBitmap,
}

#[derive(Debug, Deserialize)]
struct OceanMaskFile {
    #[serde(rename = "originLat")]
    origin_lat: f64,
    #[serde(rename = "originLon")]
    origin_lon: f64,
    resolution: f64,
    width: u32,
    height: u32,
    mask: Vec<Vec<u8>>,
}

impl OceanMask {
    pub fn from_json(data: &str) -> Result<Self, serde_json::Error> {
        let file: OceanMaskFile = serde_json::from_str(data)?;
        let mut land = RoaringBitmap::new();
        for (r, row) in file.mask.iter().enumerate() {
            for (c, &v) in row.iter().enumerate() {
                if v == 1 {
                    land.insert(r as u32 * file.width + c as u32);
                }
            }
        }
        Ok(Self {
            resolution: file.resolution,
            origin_lat: file.origin_lat,
            origin_lon: file.origin_lon,
            width: file.width,
            height: file.height,
            land,
        })
    }

    /// Falls back to all-water if loading the high-res mask failed.
    pub fn all_water(resolution: f64) -> Self {
        let width = (360.0 / resolution).round() as u32;
        let height = (180.0 / resolution).round() as u32;
        Self { resolution, origin_lat: 90.0, origin_lon: -180.0, width, height, land: RoaringBitmap::new() }
    }

    pub fn cell_of(&self, coord: Coordinate) -> Cell {
        let lon = normalize_longitude(coord.lon);
        let row = ((self.origin_lat - coord.lat) / self.resolution)
            .floor()
            .clamp(0.0, (self.height - 1) as f64) as u32;
        let col_raw = ((lon - self.origin_lon) / self.resolution).floor();
        let col = col_raw.rem_euclid(self.width as f64) as u32;
        Cell { row, col }
    }

    pub fn center_of(&self, cell: Cell) -> Coordinate {
        let lat = self.origin_lat - (cell.row as f64 + 0.5) * self.resolution;
        let lon = self.origin_lon + (cell.col as f64 + 0.5) * self.resolution;
        Coordinate::new(lat, lon)
    }

    fn index(&self, cell: Cell) -> u32 {
        cell.row * self.width + cell.col
    }

    pub fn is_sea_cell(&self, cell: Cell) -> bool {
        cell.row < self.height && cell.col < self.width && !self.land.contains(self.index(cell))
    }

    pub fn is_point_in_sea(&self, coord: Coordinate) -> bool {
        self.is_sea_cell(self.cell_of(coord))
    }

    /// Spiral search around `coord`'s cell for the nearest sea cell, up to
    /// `max_radius` cells out.
    pub fn nearest_sea_cell(&self, coord: Coordinate, max_radius: u32) -> Option<Cell> {
        let origin = self.cell_of(coord);
        if self.is_sea_cell(origin) {
            return Some(origin);
        }
        for radius in 1..=max_radius {
            let r = radius as i64;
            for dy in -r..=r {
                for dx in -r..=r {
                    if dx.abs() != r && dy.abs() != r {
                        continue; // only the ring boundary
                    }
                    let row = origin.row as i64 + dy;
                    if row < 0 || row >= self.height as i64 {
                        continue;
                    }
                    let col = (origin.col as i64 + dx).rem_euclid(self.width as i64);
                    let cell = Cell { row: row as u32, col: col as u32 };
                    if self.is_sea_cell(cell) {
                        return Some(cell);
                    }
                }
            }
        }
        None
    }

    /// 8-connected neighbors; wraps on the column axis across the ±180°
    /// seam, does not wrap on rows (poles terminate).
    fn neighbors(&self, cell: Cell) -> Vec<Cell> {
        let mut out = Vec::with_capacity(8);
        for dy in -1i64..=1 {
            for dx in -1i64..=1 {
                if dx == 0 && dy == 0 {
                    continue;
                }
                let row = cell.row as i64 + dy;
                if row < 0 || row >= self.height as i64 {
                    continue;
                }
                let col = (cell.col as i64 + dx).rem_euclid(self.width as i64);
                out.push(Cell { row: row as u32, col: col as u32 });
            }
        }
        out
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct OpenEntry {
    f: f64,
    cell: Cell,
}

impl Eq for OpenEntry {}
impl Ord for OpenEntry {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        // Min-heap on f via reversed total_cmp.
        other.f.total_cmp(&self.f)
    }
}
impl PartialOrd for OpenEntry {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

#[derive(Debug, Clone)]
pub struct AStarResult {
    pub path: Vec<Coordinate>,
    pub iterations: u64,
}

/// Finds a sea-only path between `start` and `end` using 8-connected A*
/// over the ocean mask's cell centers, with a great-circle-distance cost
/// and an admissible great-circle-distance-to-goal heuristic.
pub fn find_ocean_path(mask: &OceanMask, start: Coordinate, end: Coordinate, max_iterations: u64) -> Result<AStarResult, crate::error::RoutingError> {
    let start_cell = mask.nearest_sea_cell(start, 5).ok_or_else(|| {
        crate::error::RoutingError::InvariantViolation("no sea cell near start within search radius".into())
    })?;
    let end_cell = mask.nearest_sea_cell(end, 5).ok_or_else(|| {
        crate::error::RoutingError::InvariantViolation("no sea cell near end within search radius".into())
    })?;

    let end_center = mask.center_of(end_cell);
    let h = |c: Cell| great_circle_distance(mask.center_of(c), end_center);

    let mut open_heap: BinaryHeap<OpenEntry> = BinaryHeap::new();
    let mut open_set: HashSet<Cell> = HashSet::new();
    let mut closed: HashSet<Cell> = HashSet::new();
    let mut g_score: HashMap<Cell, f64> = HashMap::new();
    let mut came_from: HashMap<Cell, Cell> = HashMap::new();

    g_score.insert(start_cell, 0.0);
    open_heap.push(OpenEntry { f: h(start_cell), cell: start_cell });
    open_set.insert(start_cell);

    let mut iterations: u64 = 0;

    while let Some(OpenEntry { cell: current, .. }) = open_heap.pop() {
        if !open_set.remove(&current) {
            continue; // stale entry
        }
        iterations += 1;
        if iterations > max_iterations {
            return Err(crate::error::RoutingError::SearchExhausted {
                iterations,
                message: "A* exceeded iteration cap before reaching the goal".into(),
            });
        }

        if current == end_cell {
            let mut path_cells = vec![current];
            let mut c = current;
            while let Some(&prev) = came_from.get(&c) {
                path_cells.push(prev);
                c = prev;
            }
            path_cells.reverse();

            let mut path: Vec<Coordinate> = path_cells.iter().map(|&c| mask.center_of(c)).collect();
            if let Some(first) = path.first_mut() {
                *first = start;
            }
            if let Some(last) = path.last_mut() {
                *last = end;
            }
            return Ok(AStarResult { path, iterations });
        }

        closed.insert(current);
        let current_g = g_score[&current];

        for neighbor in mask.neighbors(current) {
            if closed.contains(&neighbor) || !mask.is_sea_cell(neighbor) {
                continue;
            }
            let tentative_g = current_g + great_circle_distance(mask.center_of(current), mask.center_of(neighbor));
            if tentative_g < *g_score.get(&neighbor).unwrap_or(&f64::MAX) {
                came_from.insert(neighbor, current);
                g_score.insert(neighbor, tentative_g);
                let f = tentative_g + h(neighbor);
                open_heap.push(OpenEntry { f, cell: neighbor });
                open_set.insert(neighbor);
            }
        }
    }

    Err(crate::error::RoutingError::SearchExhausted {
        iterations,
        message: "no sea-connected path found between start and end".into(),
    })
}

/// Validation report naming indices of land points and land-crossing
/// segments along an already-computed route.
#[derive(Debug, Default, Clone)]
pub struct SeaRouteValidation {
    pub valid: bool,
    pub land_point_indices: Vec<usize>,
    pub land_segment_indices: Vec<usize>,
}

pub fn validate_sea_route(mask: &OceanMask, waypoints: &[Coordinate]) -> SeaRouteValidation {
    let mut land_point_indices = Vec::new();
    for (i, &p) in waypoints.iter().enumerate() {
        if !mask.is_point_in_sea(p) {
            land_point_indices.push(i);
        }
    }
    let mut land_segment_indices = Vec::new();
    for i in 0..waypoints.len().saturating_sub(1) {
        let samples = crate::geo_math::sample_segment(waypoints[i], waypoints[i + 1], 2.0 / 1.852, 20);
        if samples.iter().any(|&s| !mask.is_point_in_sea(s)) {
            land_segment_indices.push(i);
        }
    }
    SeaRouteValidation {
        valid: land_point_indices.is_empty() && land_segment_indices.is_empty(),
        land_point_indices,
        land_segment_indices,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_water_mask_is_always_sea() {
        let mask = OceanMask::all_water(1.0);
        assert!(mask.is_point_in_sea(Coordinate::new(10.0, 10.0)));
    }

    #[test]
    fn astar_reaches_goal_on_open_water() {
        let mask = OceanMask::all_water(1.0);
        let start = Coordinate::new(10.0, 10.0);
        let end = Coordinate::new(12.0, 12.0);
        let result = find_ocean_path(&mask, start, end, 200_000).unwrap();
        assert_eq!(*result.path.first().unwrap(), start);
        assert_eq!(*result.path.last().unwrap(), end);
        for w in result.path.windows(2) {
            let c1 = mask.cell_of(w[0]);
            let c2 = mask.cell_of(w[1]);
            // consecutive cells should be within one step (8-neighborhood or identical due to endpoint override)
            let row_diff = (c1.row as i64 - c2.row as i64).abs();
            assert!(row_diff <= 1);
        }
    }

    #[test]
    fn astar_respects_iteration_cap() {
        let mask = OceanMask::all_water(0.05);
        let start = Coordinate::new(-80.0, -170.0);
        let end = Coordinate::new(80.0, 170.0);
        let result = find_ocean_path(&mask, start, end, 10);
        assert!(result.is_err());
    }

    #[test]
    fn column_wraps_across_antimeridian() {
        let mask = OceanMask::all_water(1.0);
        let near_seam = Cell { row: 90, col: mask.width - 1 };
        let neighbors = mask.neighbors(near_seam);
        assert!(neighbors.iter().any(|c| c.col == 0));
    }

    #[test]
    fn validate_sea_route_flags_land_points() {
        let json = r#"{
            "originLat": 90.0, "originLon": -180.0, "resolution": 1.0,
            "width": 360, "height": 180,
            "mask": []
        }"#;
        // build a mask with a tiny land blob manually instead of via JSON (empty mask rows above is a stub)
        let mut mask = OceanMask::all_water(1.0);
        let land_cell = mask.cell_of(Coordinate::new(41.9, 12.5));
        mask.land.insert(mask.index(land_cell));
        let _ = json;

        let waypoints = vec![Coordinate::new(41.9, 12.5), Coordinate::new(38.0, 25.0)];
        let report = validate_sea_route(&mask, &waypoints);
        assert!(!report.valid);
        assert_eq!(report.land_point_indices, vec![0]);
    }
}
