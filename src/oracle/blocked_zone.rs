//! Blocked-zone oracle (C4): exclusion-disc membership from a curated list.

use serde::Deserialize;

use crate::geo_math::{great_circle_distance, sample_segment, Coordinate};

#[derive(Debug, Clone, Deserialize)]
pub struct ZonePoint {
    pub lat: f64,
    pub lon: f64,
    /// Radius in km.
    pub radius: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Zone {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub points: Vec<ZonePoint>,
}

#[derive(Debug, Deserialize)]
struct BlockedZonesFile {
    zones: Vec<Zone>,
}

/// Flattened disc list for membership checks, grouped by zone name only
/// for diagnostics (the membership test itself is over the flat list).
pub struct BlockedZoneOracle {
    zones: Vec<Zone>,
}

const NM_PER_KM: f64 = 1.0 / 1.852;

impl BlockedZoneOracle {
    pub fn from_json(data: &str) -> Result<Self, serde_json::Error> {
        let file: BlockedZonesFile = serde_json::from_str(data)?;
        Ok(Self { zones: file.zones })
    }

    pub fn empty() -> Self {
        Self { zones: vec![] }
    }

    pub fn is_in_blocked_zone(&self, coord: Coordinate) -> bool {
        self.zones.iter().any(|zone| {
            zone.points.iter().any(|pt| {
                let dist_nm = great_circle_distance(coord, Coordinate::new(pt.lat, pt.lon));
                dist_nm <= pt.radius * NM_PER_KM
            })
        })
    }

    /// Returns the first blocked zone name containing `coord`, if any.
    pub fn zone_name_at(&self, coord: Coordinate) -> Option<&str> {
        self.zones.iter().find_map(|zone| {
            zone.points
                .iter()
                .any(|pt| great_circle_distance(coord, Coordinate::new(pt.lat, pt.lon)) <= pt.radius * NM_PER_KM)
                .then_some(zone.name.as_str())
        })
    }

    /// Tests both endpoints and samples along the segment every ≈10 km
    /// (minimum 5 samples), per spec §4.4.
    pub fn segment_crosses_blocked_zone(&self, p1: Coordinate, p2: Coordinate) -> bool {
        if self.is_in_blocked_zone(p1) || self.is_in_blocked_zone(p2) {
            return true;
        }
        const INTERVAL_NM: f64 = 10.0 / 1.852;
        sample_segment(p1, p2, INTERVAL_NM, 5).iter().any(|&p| self.is_in_blocked_zone(p))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn oracle() -> BlockedZoneOracle {
        BlockedZoneOracle {
            zones: vec![Zone {
                name: "test-strait".into(),
                description: "".into(),
                points: vec![ZonePoint { lat: 40.0, lon: 20.0, radius: 50.0 }],
            }],
        }
    }

    #[test]
    fn point_inside_radius_is_blocked() {
        let o = oracle();
        assert!(o.is_in_blocked_zone(Coordinate::new(40.0, 20.0)));
        assert!(!o.is_in_blocked_zone(Coordinate::new(10.0, 10.0)));
    }

    #[test]
    fn segment_through_zone_is_blocked() {
        let o = oracle();
        let p1 = Coordinate::new(39.0, 19.0);
        let p2 = Coordinate::new(41.0, 21.0);
        assert!(o.segment_crosses_blocked_zone(p1, p2));
    }

    #[test]
    fn segment_far_from_zone_is_clear() {
        let o = oracle();
        let p1 = Coordinate::new(0.0, 0.0);
        let p2 = Coordinate::new(1.0, 1.0);
        assert!(!o.segment_crosses_blocked_zone(p1, p2));
    }
}
