//! Evolutionary route optimizer (C8): population-based waypoint search
//! using the environment oracles as a hard feasibility filter (with
//! repair) and the vessel model as fitness.
//!
//! Grounded on the teacher's `engine::router::IsochroneRouter`: the
//! candidate-generation idiom (`calculate_destination` from a bearing +
//! jitter), the `rayon`-parallel per-candidate evaluation
//! (`current_front.par_iter().flat_map(...)`), and its land-collision gate
//! (`!land_mask.is_land(&new_position)`) are the same shapes reused here,
//! generalized from a per-step isochrone expansion into a generational GA
//! over whole-route chromosomes, per spec §4.8. Randomness is injected via
//! a seeded `rand_chacha` RNG per spec §9, so tests are reproducible.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;

use crate::geo_math::{bearing, destination, great_circle_distance, Coordinate};
use crate::oracle::bathymetry::BathymetryOracle;
use crate::oracle::blocked_zone::BlockedZoneOracle;
use crate::oracle::land::LandOracle;
use crate::vessel::{segment_cost, Vessel};
use crate::weather::WeatherSample;

#[derive(Debug, Clone)]
pub struct GaConfig {
    pub population_size: usize,
    pub generations: usize,
    pub mutation_rate: f64,
    pub crossover_rate: f64,
    pub elite_count: usize,
    pub num_waypoints: usize,
    pub weather_enabled: bool,
    pub avoid_shallow_water: bool,
    pub min_depth_m: f64,
    pub seed: u64,
}

impl Default for GaConfig {
    fn default() -> Self {
        Self {
            population_size: 20,
            generations: 15,
            mutation_rate: 0.1,
            crossover_rate: 0.7,
            elite_count: 2,
            num_waypoints: 5,
            weather_enabled: false,
            avoid_shallow_water: true,
            min_depth_m: 20.0,
            seed: 0xC0FFEE,
        }
    }
}

/// A lightweight, precomputed lookup for weather samples along a planned
/// leg, so GA fitness evaluation (CPU-bound, run under `rayon`) never
/// blocks on network I/O. Populated once via
/// `weather::WeatherProvider::fetch_along_route` before evolving.
pub struct WeatherField {
    samples: Vec<WeatherSample>,
}

impl WeatherField {
    pub fn new(samples: Vec<WeatherSample>) -> Self {
        Self { samples }
    }

    pub fn empty() -> Self {
        Self { samples: vec![] }
    }

    pub fn nearest(&self, coord: Coordinate) -> Option<&WeatherSample> {
        self.samples.iter().min_by(|a, b| {
            let da = (a.lat - coord.lat).hypot(a.lon - coord.lon);
            let db = (b.lat - coord.lat).hypot(b.lon - coord.lon);
            da.total_cmp(&db)
        })
    }
}

/// An ordered sequence of interior waypoints (endpoints excluded), plus
/// cached evaluation outputs. The best chromosome of a run is copied into
/// the result, never referenced, per spec §3.
#[derive(Debug, Clone)]
pub struct Chromosome {
    pub waypoints: Vec<Coordinate>,
    pub fitness: f64,
    pub total_fuel_t: f64,
    pub total_co2_t: f64,
    pub total_distance_nm: f64,
    pub total_duration_h: f64,
}

impl Chromosome {
    fn new(waypoints: Vec<Coordinate>) -> Self {
        Self { waypoints, fitness: 0.0, total_fuel_t: 0.0, total_co2_t: 0.0, total_distance_nm: 0.0, total_duration_h: 0.0 }
    }

    /// Decoded path: `[start, w_1, ..., w_N, end]`.
    fn decode(&self, start: Coordinate, end: Coordinate) -> Vec<Coordinate> {
        let mut path = Vec::with_capacity(self.waypoints.len() + 2);
        path.push(start);
        path.extend_from_slice(&self.waypoints);
        path.push(end);
        path
    }
}

const LAND_BUFFER_DEG: f64 = 0.03;
const SEGMENT_SAMPLE_COUNT: usize = 15;
const MAX_CANDIDATE_ATTEMPTS: u32 = 30;

pub struct GeneticOptimizer<'a> {
    land: &'a LandOracle,
    bathymetry: &'a BathymetryOracle,
    blocked_zones: &'a BlockedZoneOracle,
    config: GaConfig,
    rng: ChaCha8Rng,
}

#[derive(Debug, Clone)]
pub struct GeneticRunResult {
    pub path: Vec<Coordinate>,
    pub best_fitness: f64,
    pub total_fuel_t: f64,
    pub total_co2_t: f64,
    pub total_distance_nm: f64,
    pub total_duration_h: f64,
    pub generations_run: usize,
    pub repaired_segments: usize,
}

impl<'a> GeneticOptimizer<'a> {
    pub fn new(land: &'a LandOracle, bathymetry: &'a BathymetryOracle, blocked_zones: &'a BlockedZoneOracle, config: GaConfig) -> Self {
        let rng = ChaCha8Rng::seed_from_u64(config.seed);
        Self { land, bathymetry, blocked_zones, config, rng }
    }

    fn is_point_acceptable(&self, p: Coordinate) -> bool {
        // (a) land buffer check: sample a tiny ring to avoid clipping coastline.
        if self.land.is_land(p) {
            return false;
        }
        if self.blocked_zones.is_in_blocked_zone(p) {
            return false;
        }
        for bearing_deg in [0.0, 90.0, 180.0, 270.0] {
            let probe = destination(p, LAND_BUFFER_DEG * 60.0, bearing_deg); // buffer in deg -> nm via ~60nm/deg
            if self.land.is_land(probe) {
                return false;
            }
        }
        let depth = self.bathymetry.depth(p, self.land);
        if depth <= 0.0 {
            return false; // (b) depth = 0 => land backup
        }
        if self.config.avoid_shallow_water && depth < self.config.min_depth_m {
            return false; // (c)
        }
        true
    }

    fn segment_ok(&self, p1: Coordinate, p2: Coordinate) -> bool {
        !self.segment_crosses_land_sampled(p1, p2) && !self.blocked_zones.segment_crosses_blocked_zone(p1, p2)
    }

    fn segment_crosses_land_sampled(&self, p1: Coordinate, p2: Coordinate) -> bool {
        crate::geo_math::sample_segment(p1, p2, 0.0, SEGMENT_SAMPLE_COUNT)
            .iter()
            .any(|&s| self.land.is_land(s))
    }

    /// Proposes a candidate for interior index `i` (1-based among N),
    /// rejecting invalid candidates per spec §4.8(a)-(e), up to 30 attempts,
    /// falling back to the plain great-circle point at `f_i` on exhaustion.
    fn propose_waypoint(
        &mut self,
        start: Coordinate,
        end: Coordinate,
        i: usize,
        n: usize,
        previous: Coordinate,
        is_last: bool,
    ) -> Coordinate {
        let total_dist = great_circle_distance(start, end);
        let base_bearing = bearing(start, end);
        let f_i = i as f64 / (n as f64 + 1.0);

        for _ in 0..MAX_CANDIDATE_ATTEMPTS {
            let jitter_dist: f64 = self.rng.gen_range(0.7..=1.3);
            let jitter_bearing: f64 = self.rng.gen_range(-30.0..=30.0);
            let candidate = destination(start, total_dist * f_i * jitter_dist, base_bearing + jitter_bearing);

            if !self.is_point_acceptable(candidate) {
                continue;
            }
            if !self.segment_ok(previous, candidate) {
                continue;
            }
            if is_last && !self.segment_ok(candidate, end) {
                continue;
            }
            return candidate;
        }

        destination(start, total_dist * f_i, base_bearing)
    }

    fn init_chromosome(&mut self, start: Coordinate, end: Coordinate) -> Chromosome {
        let n = self.config.num_waypoints;
        let mut waypoints = Vec::with_capacity(n);
        let mut previous = start;
        for i in 1..=n {
            let is_last = i == n;
            let wp = self.propose_waypoint(start, end, i, n, previous, is_last);
            waypoints.push(wp);
            previous = wp;
        }
        Chromosome::new(waypoints)
    }

    fn init_population(&mut self, start: Coordinate, end: Coordinate) -> Vec<Chromosome> {
        (0..self.config.population_size).map(|_| self.init_chromosome(start, end)).collect()
    }

    /// Evaluates fitness for every chromosome. Between chromosomes,
    /// evaluation order is independent, so this runs under `rayon`; within
    /// a chromosome, segments are scored start→end (per spec §5, weather
    /// sampling may be stateful per source tag, even though our field
    /// lookup here is pure).
    fn evaluate_population(
        &self,
        population: &mut [Chromosome],
        start: Coordinate,
        end: Coordinate,
        vessel: &Vessel,
        weather: &WeatherField,
    ) {
        population.par_iter_mut().for_each(|chromosome| {
            self.evaluate(chromosome, start, end, vessel, weather);
        });
    }

    fn evaluate(&self, chromosome: &mut Chromosome, start: Coordinate, end: Coordinate, vessel: &Vessel, weather: &WeatherField) {
        let path = chromosome.decode(start, end);

        let mut total_fuel = 0.0;
        let mut total_co2 = 0.0;
        let mut total_distance = 0.0;
        let mut total_duration = 0.0;
        let mut land_penalty = 0.0;
        let mut shallow_penalty = 0.0;

        for pair in path.windows(2) {
            let (p1, p2) = (pair[0], pair[1]);
            let distance = great_circle_distance(p1, p2);
            let sample = if self.config.weather_enabled { weather.nearest(p1) } else { None };
            let cost = segment_cost(vessel, distance, vessel.service_speed_kn, sample);

            total_fuel += cost.fuel_consumed_t;
            total_co2 += cost.co2_emitted_t;
            total_distance += distance;
            total_duration += cost.duration_h;

            if self.segment_crosses_land_sampled(p1, p2) {
                land_penalty += 1000.0;
            }
            if self.blocked_zones.segment_crosses_blocked_zone(p1, p2) {
                land_penalty += 1000.0;
            }

            for s in crate::geo_math::sample_segment(p1, p2, 0.0, SEGMENT_SAMPLE_COUNT) {
                let depth = self.bathymetry.depth(s, self.land);
                if self.config.avoid_shallow_water {
                    if depth <= 0.0 {
                        land_penalty += 500.0;
                    } else if depth < self.config.min_depth_m {
                        shallow_penalty += 10.0 * (self.config.min_depth_m - depth);
                    }
                }
            }
        }

        let base_fitness = 1000.0 / (total_fuel + 1.0);
        let penalty_factor = (1.0 - (land_penalty + shallow_penalty) / 1000.0).max(0.001);

        chromosome.fitness = base_fitness * penalty_factor;
        chromosome.total_fuel_t = total_fuel;
        chromosome.total_co2_t = total_co2;
        chromosome.total_distance_nm = total_distance;
        chromosome.total_duration_h = total_duration;
    }

    /// Tournament selection of size 3.
    fn tournament_select<'p>(&mut self, population: &'p [Chromosome]) -> &'p Chromosome {
        let mut best: Option<&Chromosome> = None;
        for _ in 0..3 {
            let idx = self.rng.gen_range(0..population.len());
            let candidate = &population[idx];
            best = match best {
                Some(b) if b.fitness >= candidate.fitness => Some(b),
                _ => Some(candidate),
            };
        }
        best.expect("tournament always selects at least one candidate")
    }

    /// Single-point crossover over the interior sequence. The split is
    /// accepted only if neither straddling segment crosses land (10
    /// samples); up to 5 retries, else falls back to `parent1`.
    fn crossover(&mut self, parent1: &Chromosome, parent2: &Chromosome, start: Coordinate, end: Coordinate) -> Chromosome {
        if self.rng.gen::<f64>() > self.config.crossover_rate || parent1.waypoints.len() < 2 {
            return parent1.clone();
        }

        for _ in 0..5 {
            let n = parent1.waypoints.len();
            let split = self.rng.gen_range(1..n);

            let mut child_wps = parent1.waypoints[..split].to_vec();
            child_wps.extend_from_slice(&parent2.waypoints[split..]);

            let before = if split == 0 { start } else { child_wps[split - 1] };
            let after = child_wps[split];
            let left_ok = crate::geo_math::sample_segment(before, after, 0.0, 10).iter().all(|&s| !self.land.is_land(s));

            let tail_end = if split + 1 < child_wps.len() { child_wps[split + 1] } else { end };
            let right_ok = crate::geo_math::sample_segment(after, tail_end, 0.0, 10).iter().all(|&s| !self.land.is_land(s));

            if left_ok && right_ok {
                return Chromosome::new(child_wps);
            }
        }

        parent1.clone()
    }

    /// Picks one index, proposes a replacement validated against both
    /// neighbors; up to 30 retries, else keeps the original gene.
    fn mutate(&mut self, chromosome: &mut Chromosome, start: Coordinate, end: Coordinate) {
        if self.rng.gen::<f64>() > self.config.mutation_rate || chromosome.waypoints.is_empty() {
            return;
        }
        let n = chromosome.waypoints.len();
        let idx = self.rng.gen_range(0..n);
        let previous = if idx == 0 { start } else { chromosome.waypoints[idx - 1] };
        let next = if idx + 1 < n { chromosome.waypoints[idx + 1] } else { end };
        let is_last = idx + 1 == n;

        let replacement = self.propose_waypoint(start, end, idx + 1, n, previous, is_last);
        if self.segment_ok(previous, replacement) && self.segment_ok(replacement, next) {
            chromosome.waypoints[idx] = replacement;
        }
    }

    /// Runs the full Initialize → Evolve → FinalEvaluate → Repair → Return
    /// state machine. Never surfaces a hard failure: always returns a path
    /// with totals, even with a suboptimal repaired path.
    pub fn run(&mut self, start: Coordinate, end: Coordinate, vessel: &Vessel, weather: &WeatherField) -> GeneticRunResult {
        let mut population = self.init_population(start, end);
        self.evaluate_population(&mut population, start, end, vessel, weather);

        for _generation in 0..self.config.generations {
            population.sort_by(|a, b| b.fitness.total_cmp(&a.fitness));

            let elite: Vec<Chromosome> = population.iter().take(self.config.elite_count).cloned().collect();
            let mut next_generation = elite;

            while next_generation.len() < self.config.population_size {
                let parent1 = self.tournament_select(&population).clone();
                let parent2 = self.tournament_select(&population).clone();
                let mut child = self.crossover(&parent1, &parent2, start, end);
                self.mutate(&mut child, start, end);
                next_generation.push(child);
            }

            population = next_generation;
            self.evaluate_population(&mut population, start, end, vessel, weather);
        }

        population.sort_by(|a, b| b.fitness.total_cmp(&a.fitness));
        let mut best = population.into_iter().next().expect("population is never empty");
        self.evaluate(&mut best, start, end, vessel, weather);

        let (repaired_path, repaired_segments) = self.repair(best.decode(start, end));

        let mut final_fuel = 0.0;
        let mut final_co2 = 0.0;
        let mut final_distance = 0.0;
        let mut final_duration = 0.0;
        for pair in repaired_path.windows(2) {
            let distance = great_circle_distance(pair[0], pair[1]);
            let sample = if self.config.weather_enabled { weather.nearest(pair[0]) } else { None };
            let cost = segment_cost(vessel, distance, vessel.service_speed_kn, sample);
            final_fuel += cost.fuel_consumed_t;
            final_co2 += cost.co2_emitted_t;
            final_distance += distance;
            final_duration += cost.duration_h;
        }

        GeneticRunResult {
            path: repaired_path,
            best_fitness: best.fitness,
            total_fuel_t: final_fuel,
            total_co2_t: final_co2,
            total_distance_nm: final_distance,
            total_duration_h: final_duration,
            generations_run: self.config.generations,
            repaired_segments,
        }
    }

    /// Repair pass: for each invalid segment in the best decoded path,
    /// inserts sea-valid intermediate waypoints. Returns the repaired path
    /// and a count of segments that required repair.
    fn repair(&mut self, path: Vec<Coordinate>) -> (Vec<Coordinate>, usize) {
        let mut repaired = Vec::with_capacity(path.len());
        let mut repaired_count = 0;
        repaired.push(path[0]);

        for pair in path.windows(2) {
            let (p1, p2) = (pair[0], pair[1]);
            let inserted = self.find_sea_valid_path(p1, p2, 4);
            if !inserted.is_empty() {
                repaired_count += 1;
            }
            repaired.extend(inserted);
            repaired.push(p2);
        }
        (repaired, repaired_count)
    }

    fn segment_valid(&self, p1: Coordinate, p2: Coordinate) -> bool {
        if self.segment_crosses_land_sampled(p1, p2) {
            return false;
        }
        if self.blocked_zones.segment_crosses_blocked_zone(p1, p2) {
            return false;
        }
        if self.config.avoid_shallow_water {
            for s in crate::geo_math::sample_segment(p1, p2, 0.0, SEGMENT_SAMPLE_COUNT) {
                if self.bathymetry.depth(s, self.land) < self.config.min_depth_m {
                    return false;
                }
            }
        }
        true
    }

    /// Returns intermediate waypoints to insert between `p1` and `p2` so
    /// both resulting sub-segments are valid, or empty if `(p1,p2)` is
    /// already valid. Tries perpendicular midpoint offsets first, then a
    /// 7×7 grid search, then falls back to the raw midpoint, per spec
    /// §4.8's repair algorithm. Recurses with a decreasing depth budget.
    fn find_sea_valid_path(&mut self, p1: Coordinate, p2: Coordinate, max_depth: u32) -> Vec<Coordinate> {
        if self.segment_valid(p1, p2) {
            return vec![];
        }
        if max_depth == 0 {
            return vec![crate::geo_math::interpolate_gc(p1, p2, 0.5)];
        }

        let midpoint = crate::geo_math::interpolate_gc(p1, p2, 0.5);
        let segment_distance = great_circle_distance(p1, p2);
        let base_bearing = bearing(p1, p2);

        let offsets = [0.05, 0.1, 0.2, 0.3, 0.4, 0.5, 0.6, 0.7];
        let directions = [45.0, -45.0, 90.0, -90.0, 135.0, -135.0];

        for &offset_frac in &offsets {
            for &dir in &directions {
                let candidate = destination(midpoint, segment_distance * offset_frac, base_bearing + dir);
                if !self.is_point_acceptable(candidate) {
                    continue;
                }
                let left_valid_directly = self.segment_valid(p1, candidate);
                let right_valid_directly = self.segment_valid(candidate, p2);

                if left_valid_directly && right_valid_directly {
                    return vec![candidate];
                }

                let mut out = Vec::new();
                if !left_valid_directly {
                    out.extend(self.find_sea_valid_path(p1, candidate, max_depth - 1));
                }
                out.push(candidate);
                if !right_valid_directly {
                    out.extend(self.find_sea_valid_path(candidate, p2, max_depth - 1));
                }
                return out;
            }
        }

        // Fallback: 7x7 grid search at 1 degree steps around the midpoint.
        for dy in -3i32..=3 {
            for dx in -3i32..=3 {
                if dx == 0 && dy == 0 {
                    continue;
                }
                let candidate = Coordinate::new(midpoint.lat + dy as f64, midpoint.lon + dx as f64);
                if self.is_point_acceptable(candidate) && self.segment_valid(p1, candidate) && self.segment_valid(candidate, p2) {
                    return vec![candidate];
                }
            }
        }

        vec![midpoint]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oracle::bathymetry::BathymetryOracle;
    use crate::oracle::blocked_zone::BlockedZoneOracle;
    use crate::oracle::land::LandOracle;
    use crate::vessel::FuelType;

    fn open_ocean() -> (LandOracle, BathymetryOracle, BlockedZoneOracle) {
        (LandOracle::degraded(), BathymetryOracle::degraded(), BlockedZoneOracle::empty())
    }

    fn test_vessel() -> Vessel {
        Vessel {
            name: "GA Test Ship".into(),
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

    #[test]
    fn run_preserves_endpoints() {
        let (land, bathy, blocked) = open_ocean();
        let mut config = GaConfig::default();
        config.population_size = 6;
        config.generations = 3;
        let mut optimizer = GeneticOptimizer::new(&land, &bathy, &blocked, config);
        let start = Coordinate::new(41.0082, 28.9784);
        let end = Coordinate::new(40.8518, 14.2681);
        let result = optimizer.run(start, end, &test_vessel(), &WeatherField::empty());

        assert_eq!(*result.path.first().unwrap(), start);
        assert_eq!(*result.path.last().unwrap(), end);
        assert!(result.total_fuel_t >= 0.0);
        assert!(result.total_co2_t >= 0.0);
    }

    #[test]
    fn total_distance_matches_segment_sum() {
        let (land, bathy, blocked) = open_ocean();
        let mut config = GaConfig::default();
        config.population_size = 6;
        config.generations = 2;
        let mut optimizer = GeneticOptimizer::new(&land, &bathy, &blocked, config);
        let start = Coordinate::new(37.9416, 23.6470);
        let end = Coordinate::new(41.3851, 2.1734);
        let result = optimizer.run(start, end, &test_vessel(), &WeatherField::empty());

        let recomputed: f64 = result.path.windows(2).map(|w| great_circle_distance(w[0], w[1])).sum();
        assert!((recomputed - result.total_distance_nm).abs() < 1e-6);
    }

    #[test]
    fn deterministic_with_fixed_seed() {
        let (land1, bathy1, blocked1) = open_ocean();
        let (land2, bathy2, blocked2) = open_ocean();
        let config = GaConfig { population_size: 6, generations: 2, seed: 42, ..GaConfig::default() };
        let start = Coordinate::new(41.0082, 28.9784);
        let end = Coordinate::new(40.8518, 14.2681);

        let mut opt1 = GeneticOptimizer::new(&land1, &bathy1, &blocked1, config.clone());
        let r1 = opt1.run(start, end, &test_vessel(), &WeatherField::empty());
        let mut opt2 = GeneticOptimizer::new(&land2, &bathy2, &blocked2, config);
        let r2 = opt2.run(start, end, &test_vessel(), &WeatherField::empty());

        assert_eq!(r1.path.len(), r2.path.len());
        for (a, b) in r1.path.iter().zip(r2.path.iter()) {
            assert!((a.lat - b.lat).abs() < 1e-9);
            assert!((a.lon - b.lon).abs() < 1e-9);
        }
    }

    #[test]
    fn proposed_waypoints_avoid_a_blocked_zone_when_room_allows() {
        let (land, bathy, _) = open_ocean();
        // A small disc well off the direct Piraeus->Barcelona line, not
        // blanketing it, so candidates have room to route around it.
        let blocked = BlockedZoneOracle::from_json(
            r#"{"zones": [{"name": "test-exclusion", "description": "", "points": [{"lat": 39.5, "lon": 12.0, "radius": 40.0}]}]}"#,
        )
        .unwrap();
        let config = GaConfig { population_size: 6, generations: 1, seed: 7, ..GaConfig::default() };
        let mut optimizer = GeneticOptimizer::new(&land, &bathy, &blocked, config);
        let start = Coordinate::new(37.9416, 23.6470);
        let end = Coordinate::new(41.3851, 2.1734);

        let chromosome = optimizer.init_chromosome(start, end);
        for wp in &chromosome.waypoints {
            assert!(!blocked.is_in_blocked_zone(*wp));
        }
    }
}
