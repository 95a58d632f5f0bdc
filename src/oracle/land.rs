//! Land oracle (C2): point-in-land and segment-crosses-land queries.
//!
//! Grounded on the teacher's `engine::mask::LandMask`, which answered the
//! same question (`is_land`) from a single precomputed bitmap keyed by an
//! affine lat/lon transform. This module generalizes that idea into the
//! spec's two-stage design: an O(1)-indexed, RLE-encoded coarse grid first,
//! refined by a 5°-bucketed polygon index for the narrow islands the coarse
//! grid misses. Polygon ray-casting uses `geo`'s `LineString`/`Polygon`
//! types, a teacher dependency.

use std::collections::HashMap;

use geo::{Contains, LineString, Polygon};
use log::warn;
use serde::Deserialize;

use crate::geo_math::{normalize_longitude, sample_segment, Coordinate};

/// One row of a [`LandGrid`]: sorted, non-overlapping `(start_col, length)`
/// runs of land cells, per spec §6's RLE file contract.
#[derive(Debug, Clone, Default)]
struct LandRow {
    runs: Vec<(u32, u32)>,
}

impl LandRow {
    fn from_rle(pairs: &[u32]) -> Self {
        let mut runs = Vec::with_capacity(pairs.len() / 2);
        let mut i = 0;
        while i + 1 < pairs.len() {
            runs.push((pairs[i], pairs[i + 1]));
            i += 2;
        }
        Self { runs }
    }

    /// Binary search over sorted runs for column membership.
    fn contains_col(&self, col: u32) -> bool {
        let mut lo = 0usize;
        let mut hi = self.runs.len();
        while lo < hi {
            let mid = (lo + hi) / 2;
            let (start, len) = self.runs[mid];
            if col < start {
                hi = mid;
            } else if col >= start + len {
                lo = mid + 1;
            } else {
                return true;
            }
        }
        false
    }
}

/// Pre-computed raster: resolution (°/cell), origin (upper-left lat/lon),
/// width × height cells, RLE-encoded land bits per row.
pub struct LandGrid {
    pub resolution: f64,
    pub origin_lat: f64,
    pub origin_lon: f64,
    pub width: u32,
    pub height: u32,
    rows: Vec<LandRow>,
}

#[derive(Debug, Deserialize)]
struct LandGridFile {
    resolution: f64,
    width: u32,
    height: u32,
    #[serde(rename = "originLat")]
    origin_lat: f64,
    #[serde(rename = "originLon")]
    origin_lon: f64,
    rows: Vec<Vec<u32>>,
}

impl LandGrid {
    pub fn from_json(data: &str) -> Result<Self, serde_json::Error> {
        let file: LandGridFile = serde_json::from_str(data)?;
        debug_assert_eq!(file.width as f64, 360.0 / file.resolution);
        debug_assert_eq!(file.height as f64, 180.0 / file.resolution);
        let rows = file.rows.iter().map(|r| LandRow::from_rle(r)).collect();
        Ok(Self {
            resolution: file.resolution,
            origin_lat: file.origin_lat,
            origin_lon: file.origin_lon,
            width: file.width,
            height: file.height,
            rows,
        })
    }

    /// An all-water grid of the given resolution, used as a degraded-mode
    /// fallback when the dataset fails to load.
    pub fn all_water(resolution: f64) -> Self {
        let width = (360.0 / resolution).round() as u32;
        let height = (180.0 / resolution).round() as u32;
        Self {
            resolution,
            origin_lat: 90.0,
            origin_lon: -180.0,
            width,
            height,
            rows: vec![LandRow::default(); height as usize],
        }
    }

    fn cell_index(&self, lat: f64, lon: f64) -> Option<(u32, u32)> {
        let lon = normalize_longitude(lon);
        let row = ((self.origin_lat - lat) / self.resolution).floor();
        let col = ((lon - self.origin_lon) / self.resolution).floor();
        if row < 0.0 || col < 0.0 {
            return None;
        }
        let (row, col) = (row as u32, col as u32);
        if row >= self.height || col >= self.width {
            return None;
        }
        Some((row, col))
    }

    pub fn is_land(&self, lat: f64, lon: f64) -> bool {
        match self.cell_index(lat, lon) {
            Some((row, col)) => self.rows[row as usize].contains_col(col),
            None => false,
        }
    }
}

/// One ring-plus-bounding-box polygon entry.
struct PolygonEntry {
    bbox: (f64, f64, f64, f64), // (min_lon, min_lat, max_lon, max_lat)
    polygon: Polygon<f64>,
}

impl PolygonEntry {
    fn bbox_contains(&self, lon: f64, lat: f64) -> bool {
        let (min_lon, min_lat, max_lon, max_lat) = self.bbox;
        lon >= min_lon && lon <= max_lon && lat >= min_lat && lat <= max_lat
    }
}

const BUCKET_SIZE_DEG: f64 = 5.0;

/// A set of land polygons bucketed by a 5°×5° spatial index, used to refine
/// the coarse [`LandGrid`] for narrow islands it misses.
pub struct LandPolygons {
    buckets: HashMap<(i32, i32), Vec<PolygonEntry>>,
}

#[derive(Debug, Deserialize)]
struct GeoJsonFeatureCollection {
    features: Vec<GeoJsonFeature>,
}

#[derive(Debug, Deserialize)]
struct GeoJsonFeature {
    geometry: GeoJsonGeometry,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum GeoJsonGeometry {
    Polygon { coordinates: Vec<Vec<[f64; 2]>> },
    MultiPolygon { coordinates: Vec<Vec<Vec<[f64; 2]>>> },
    LineString { coordinates: Vec<[f64; 2]> },
}

impl LandPolygons {
    pub fn empty() -> Self {
        Self { buckets: HashMap::new() }
    }

    pub fn from_geojson(data: &str) -> Result<Self, serde_json::Error> {
        let fc: GeoJsonFeatureCollection = serde_json::from_str(data)?;
        let mut me = Self::empty();
        for feature in fc.features {
            match feature.geometry {
                GeoJsonGeometry::Polygon { coordinates } => {
                    if let Some(ring) = coordinates.into_iter().next() {
                        me.insert_ring(ring);
                    }
                }
                GeoJsonGeometry::MultiPolygon { coordinates } => {
                    for poly in coordinates {
                        if let Some(ring) = poly.into_iter().next() {
                            me.insert_ring(ring);
                        }
                    }
                }
                // A bare coastline LineString is closed into a ring; used
                // for narrow islands represented without polygon topology.
                GeoJsonGeometry::LineString { coordinates } => {
                    me.insert_ring(coordinates);
                }
            }
        }
        Ok(me)
    }

    fn insert_ring(&mut self, coords: Vec<[f64; 2]>) {
        if coords.len() < 3 {
            return;
        }
        let (mut min_lon, mut max_lon) = (f64::MAX, f64::MIN);
        let (mut min_lat, mut max_lat) = (f64::MAX, f64::MIN);
        let points: Vec<(f64, f64)> = coords
            .iter()
            .map(|&[lon, lat]| {
                min_lon = min_lon.min(lon);
                max_lon = max_lon.max(lon);
                min_lat = min_lat.min(lat);
                max_lat = max_lat.max(lat);
                (lon, lat)
            })
            .collect();

        let polygon = Polygon::new(LineString::from(points), vec![]);
        let entry = PolygonEntry { bbox: (min_lon, min_lat, max_lon, max_lat), polygon };

        let min_bx = (min_lon / BUCKET_SIZE_DEG).floor() as i32;
        let max_bx = (max_lon / BUCKET_SIZE_DEG).floor() as i32;
        let min_by = (min_lat / BUCKET_SIZE_DEG).floor() as i32;
        let max_by = (max_lat / BUCKET_SIZE_DEG).floor() as i32;

        for by in min_by..=max_by {
            for bx in min_bx..=max_bx {
                self.buckets.entry((bx, by)).or_default().push(PolygonEntry {
                    bbox: entry.bbox,
                    polygon: entry.polygon.clone(),
                });
            }
        }
    }

    pub fn is_land(&self, lat: f64, lon: f64) -> bool {
        let bucket = ((lon / BUCKET_SIZE_DEG).floor() as i32, (lat / BUCKET_SIZE_DEG).floor() as i32);
        let Some(candidates) = self.buckets.get(&bucket) else { return false };
        let point = geo::Point::new(lon, lat);
        candidates
            .iter()
            .filter(|c| c.bbox_contains(lon, lat))
            .any(|c| c.polygon.contains(&point))
    }
}

/// Combines [`LandGrid`] and [`LandPolygons`] behind the two-stage contract
/// of spec §4.2, degrading to an open-sea assumption if datasets failed to
/// load (logged once via `degraded`).
pub struct LandOracle {
    grid: LandGrid,
    polygons: LandPolygons,
    degraded: bool,
}

impl LandOracle {
    pub fn new(grid: LandGrid, polygons: LandPolygons) -> Self {
        Self { grid, polygons, degraded: false }
    }

    /// Builds a degraded-mode oracle (open-sea assumption) for when dataset
    /// loading fails. Logs the condition once.
    pub fn degraded() -> Self {
        warn!("land oracle degraded: datasets unavailable, assuming open sea");
        Self { grid: LandGrid::all_water(0.05), polygons: LandPolygons::empty(), degraded: true }
    }

    pub fn is_degraded(&self) -> bool {
        self.degraded
    }

    pub fn is_land(&self, coord: Coordinate) -> bool {
        if self.degraded {
            return false;
        }
        if self.grid.is_land(coord.lat, coord.lon) {
            return true;
        }
        self.polygons.is_land(coord.lat, coord.lon)
    }

    /// Samples the great-circle path between `p1` and `p2` at ≈2 km
    /// intervals (minimum 20 samples), plus both endpoints, and returns
    /// true on the first land hit. Endpoints are tested first.
    pub fn segment_crosses_land(&self, p1: Coordinate, p2: Coordinate) -> bool {
        if self.is_land(p1) || self.is_land(p2) {
            return true;
        }
        if self.degraded {
            return false;
        }
        const INTERVAL_NM: f64 = 2.0 / 1.852; // ~2 km in nautical miles
        for sample in sample_segment(p1, p2, INTERVAL_NM, 20) {
            if self.is_land(sample) {
                return true;
            }
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_grid() -> LandGrid {
        // 1-degree resolution, 3x3 toy grid: land strip at row 1 covering
        // columns 1..=2 ("Rome-ish" blob at lat in (88,89], lon in
        // (-179,-178]] after offsetting origin for test simplicity).
        let json = r#"{
            "resolution": 1.0,
            "width": 360,
            "height": 180,
            "originLat": 90.0,
            "originLon": -180.0,
            "rows": [[], [1, 2], []]
        }"#;
        LandGrid::from_json(json).unwrap()
    }

    #[test]
    fn grid_cell_lookup() {
        let grid = sample_grid();
        // row 1 spans lat in (88, 89]; col 1 spans lon in (-179, -178]
        assert!(grid.is_land(88.5, -178.5));
        assert!(!grid.is_land(89.5, -178.5));
    }

    #[test]
    fn degraded_oracle_assumes_open_sea() {
        let oracle = LandOracle::degraded();
        assert!(oracle.is_degraded());
        assert!(!oracle.is_land(Coordinate::new(41.9028, 12.4964)));
    }

    #[test]
    fn is_land_stable_across_repeated_calls() {
        let oracle = LandOracle::new(sample_grid(), LandPolygons::empty());
        let p = Coordinate::new(88.5, -178.5);
        let first = oracle.is_land(p);
        for _ in 0..10 {
            assert_eq!(oracle.is_land(p), first);
        }
    }

    #[test]
    fn segment_over_open_water_never_hits_land() {
        let oracle = LandOracle::new(LandGrid::all_water(0.05), LandPolygons::empty());
        let p1 = Coordinate::new(38.0, 25.0);
        let p2 = Coordinate::new(37.5, 24.0);
        assert!(!oracle.segment_crosses_land(p1, p2));
    }

    #[test]
    fn polygon_refinement_catches_narrow_island() {
        // A small island entirely missed by a coarse all-water grid.
        let geojson = r#"{
            "type": "FeatureCollection",
            "features": [{
                "type": "Feature",
                "geometry": {
                    "type": "Polygon",
                    "coordinates": [[[10.0, 10.0], [10.2, 10.0], [10.2, 10.2], [10.0, 10.2], [10.0, 10.0]]]
                },
                "properties": {}
            }]
        }"#;
        let polygons = LandPolygons::from_geojson(geojson).unwrap();
        let oracle = LandOracle::new(LandGrid::all_water(0.05), polygons);
        assert!(oracle.is_land(Coordinate::new(10.1, 10.1)));
        assert!(!oracle.is_land(Coordinate::new(20.0, 20.0)));
    }
}
