//! Vessel performance and cost model (C7): Holtrop-Mennen-style resistance
//! with ISO 15016 weather adjustments, mapping a segment to fuel, CO₂,
//! duration and effective speed. All formulas are deterministic, pure, and
//! independent of I/O.
//!
//! Grounded on the teacher's `engine::physics::PhysicsModel`: same shape
//! (a zero-state struct with pure associated functions, tested with
//! hand-computed expected values), adapted from the teacher's sailboat
//! polar-speed model to the spec's cargo-vessel resistance/fuel model.
//! Field naming on [`Vessel`] follows the documented-units convention of
//! `wavecore-rs`'s `resistance::types::HullParameters`.

use serde::{Deserialize, Serialize};

use crate::error::{Result, RoutingError};
use crate::weather::WeatherSample;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FuelType {
    Hfo,
    Lfo,
    Mgo,
    Mdo,
    Lng,
    Methanol,
}

impl FuelType {
    /// CF: tonnes CO₂ emitted per tonne of fuel burned.
    pub fn co2_conversion_factor(self) -> f64 {
        match self {
            FuelType::Hfo => 3.114,
            FuelType::Lfo => 3.151,
            FuelType::Mgo => 3.206,
            FuelType::Mdo => 3.206,
            FuelType::Lng => 2.750,
            FuelType::Methanol => 1.375,
        }
    }
}

/// Immutable vessel digital twin for a routing call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Vessel {
    pub name: String,
    pub vessel_type: String,
    /// Deadweight tonnage (t).
    pub dwt: f64,
    pub length_m: f64,
    pub beam_m: f64,
    pub draft_m: f64,
    pub service_speed_kn: f64,
    pub max_speed_kn: Option<f64>,
    pub fuel_type: FuelType,
    /// Fuel consumption rate at service speed (t/day).
    pub fuel_consumption_rate: f64,
    pub engine_power_kw: f64,
}

impl Vessel {
    /// Validates the invariants spec §3 requires: all positive, draft ≤
    /// length, and service speed ≤ max speed when present.
    pub fn validate(&self) -> Result<()> {
        let positive = [
            ("dwt", self.dwt),
            ("length_m", self.length_m),
            ("beam_m", self.beam_m),
            ("draft_m", self.draft_m),
            ("service_speed_kn", self.service_speed_kn),
            ("fuel_consumption_rate", self.fuel_consumption_rate),
            ("engine_power_kw", self.engine_power_kw),
        ];
        for (field, value) in positive {
            if value <= 0.0 {
                return Err(RoutingError::input(field, "must be positive"));
            }
        }
        if self.draft_m > self.length_m {
            return Err(RoutingError::input("draft_m", "must not exceed length_m"));
        }
        if let Some(max_speed) = self.max_speed_kn {
            if max_speed <= 0.0 {
                return Err(RoutingError::input("max_speed_kn", "must be positive"));
            }
            if self.service_speed_kn > max_speed {
                return Err(RoutingError::input("service_speed_kn", "must not exceed max_speed_kn"));
            }
        }
        Ok(())
    }

    fn froude_number(&self, speed_kn: f64) -> f64 {
        const G: f64 = 9.80665;
        let speed_ms = speed_kn * 0.514444;
        speed_ms / (G * self.length_m).sqrt()
    }

    /// Baseline Holtrop-style calm-water resistance proxy used only to
    /// scale the wind term's frontal-area contribution (spec §4.7: "scaled
    /// against a baseline Holtrop-style resistance computed from L, draft,
    /// Froude number").
    fn baseline_resistance(&self, speed_kn: f64) -> f64 {
        let fr = self.froude_number(speed_kn).max(1e-6);
        let wetted_area_proxy = self.length_m * self.draft_m;
        wetted_area_proxy * fr.powi(2) * 1000.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SegmentCost {
    pub fuel_consumed_t: f64,
    pub co2_emitted_t: f64,
    pub duration_h: f64,
    pub effective_speed_kn: f64,
}

const WEATHER_FACTOR_MIN: f64 = 0.5;
const WEATHER_FACTOR_MAX: f64 = 2.0;

/// Frontal-area × relative-wind-speed² contribution to the weather factor,
/// clipped against the baseline resistance scale.
fn wind_pct(vessel: &Vessel, speed_kn: f64, weather: &WeatherSample) -> f64 {
    let frontal_area = vessel.beam_m * (vessel.draft_m * 0.4 + 2.0); // freeboard proxy
    let relative_wind_speed = weather.wind_speed_ms;
    let wind_force_proxy = frontal_area * relative_wind_speed.powi(2);
    let baseline = vessel.baseline_resistance(speed_kn).max(1.0);
    (wind_force_proxy / baseline * 100.0).clamp(0.0, 50.0)
}

fn wave_pct(weather: &WeatherSample) -> f64 {
    let raw = weather.wave_height_m.powi(2) * weather.wave_direction_deg.to_radians().cos().abs() * 2.0;
    raw.clamp(0.0, 50.0)
}

fn current_pct(speed_kn: f64, weather: &WeatherSample) -> f64 {
    if speed_kn <= 0.0 {
        return 0.0;
    }
    let component_kn = weather.current_speed_ms * weather.current_direction_deg.to_radians().cos() * 1.944;
    (component_kn / speed_kn * 100.0).clamp(-50.0, 50.0)
}

fn weather_factor(vessel: &Vessel, speed_kn: f64, weather: Option<&WeatherSample>) -> f64 {
    let Some(weather) = weather else { return 1.0 };
    let wind = wind_pct(vessel, speed_kn, weather);
    let wave = wave_pct(weather);
    let current = current_pct(speed_kn, weather);
    (1.0 + (wind + wave - current) / 100.0).clamp(WEATHER_FACTOR_MIN, WEATHER_FACTOR_MAX)
}

/// Speed lost to weather, clipped to 30% of service speed.
fn speed_loss(vessel: &Vessel, weather: Option<&WeatherSample>) -> f64 {
    let Some(weather) = weather else { return 0.0 };
    let loss = 0.5 * weather.wave_height_m + 0.03 * weather.wind_speed_ms;
    loss.min(vessel.service_speed_kn * 0.3)
}

fn current_effect_pct(vessel: &Vessel, weather: Option<&WeatherSample>) -> f64 {
    let Some(weather) = weather else { return 0.0 };
    current_pct(vessel.service_speed_kn, weather) / 100.0
}

/// Computes the cost of traversing a single segment at `target_speed_kn`
/// under optional weather forcing, per spec §4.7.
pub fn segment_cost(vessel: &Vessel, distance_nm: f64, target_speed_kn: f64, weather: Option<&WeatherSample>) -> SegmentCost {
    let base_rate = vessel.fuel_consumption_rate / 24.0; // t/h
    let speed_factor = (target_speed_kn / vessel.service_speed_kn).powi(3);
    let w_factor = weather_factor(vessel, target_speed_kn, weather);
    let fuel_rate = base_rate * speed_factor * w_factor;

    let loss = speed_loss(vessel, weather);
    let current_effect = current_effect_pct(vessel, weather);
    let effective_speed = (target_speed_kn - loss + current_effect * target_speed_kn).max(1.0);

    let duration_h = distance_nm / effective_speed;
    let fuel_consumed_t = fuel_rate * duration_h;
    let co2_emitted_t = fuel_consumed_t * vessel.fuel_type.co2_conversion_factor();

    SegmentCost { fuel_consumed_t, co2_emitted_t, duration_h, effective_speed_kn: effective_speed }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CiiRating {
    A,
    B,
    C,
    D,
    E,
}

/// CII (gCO₂ / t·nm), documented as simplified in spec §4.7 — excludes the
/// IMO reference-line normalization a full CII calculation would apply.
pub fn carbon_intensity_indicator(total_co2_t: f64, dwt: f64, total_distance_nm: f64) -> f64 {
    if dwt <= 0.0 || total_distance_nm <= 0.0 {
        return 0.0;
    }
    total_co2_t * 1.0e6 / (dwt * total_distance_nm)
}

pub fn cii_rating(cii: f64) -> CiiRating {
    if cii <= 3.0 {
        CiiRating::A
    } else if cii <= 4.0 {
        CiiRating::B
    } else if cii <= 5.0 {
        CiiRating::C
    } else if cii <= 6.0 {
        CiiRating::D
    } else {
        CiiRating::E
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn container_ship() -> Vessel {
        Vessel {
            name: "Test Carrier".into(),
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
    fn validate_accepts_well_formed_vessel() {
        assert!(container_ship().validate().is_ok());
    }

    #[test]
    fn validate_rejects_draft_exceeding_length() {
        let mut v = container_ship();
        v.draft_m = v.length_m + 1.0;
        assert!(v.validate().is_err());
    }

    #[test]
    fn validate_rejects_service_speed_above_max() {
        let mut v = container_ship();
        v.max_speed_kn = Some(10.0);
        assert!(v.validate().is_err());
    }

    #[test]
    fn co2_equals_cf_times_fuel_without_weather() {
        let vessel = container_ship();
        let cost = segment_cost(&vessel, 500.0, vessel.service_speed_kn, None);
        let expected_co2 = cost.fuel_consumed_t * FuelType::Hfo.co2_conversion_factor();
        assert!((cost.co2_emitted_t - expected_co2).abs() < 1e-9);
    }

    #[test]
    fn fuel_matches_distance_over_service_speed_formula() {
        let vessel = container_ship();
        let distance = 500.0;
        let cost = segment_cost(&vessel, distance, vessel.service_speed_kn, None);
        let expected_fuel = distance / vessel.service_speed_kn * (vessel.fuel_consumption_rate / 24.0);
        assert!((cost.fuel_consumed_t - expected_fuel).abs() < 1e-6);
    }

    #[test]
    fn higher_speed_burns_more_fuel() {
        let vessel = container_ship();
        let slow = segment_cost(&vessel, 500.0, 14.0, None);
        let fast = segment_cost(&vessel, 500.0, 20.0, None);
        assert!(fast.fuel_consumed_t > slow.fuel_consumed_t);
    }

    #[test]
    fn weather_factor_stays_within_bounds() {
        let vessel = container_ship();
        let harsh = WeatherSample {
            lat: 0.0,
            lon: 0.0,
            timestamp: chrono::Utc::now(),
            wind_speed_ms: 40.0,
            wind_direction_deg: 0.0,
            wave_height_m: 10.0,
            wave_period_s: 8.0,
            wave_direction_deg: 0.0,
            current_speed_ms: 3.0,
            current_direction_deg: 180.0,
            sea_temp_c: 18.0,
            air_temp_c: 18.0,
            pressure_hpa: 1000.0,
            source: crate::weather::WeatherSource::Fallback,
        };
        let cost = segment_cost(&vessel, 500.0, vessel.service_speed_kn, Some(&harsh));
        assert!(cost.fuel_consumed_t.is_finite());
        assert!(cost.fuel_consumed_t > 0.0);
    }

    #[test]
    fn cii_rating_boundaries() {
        assert_eq!(cii_rating(2.9), CiiRating::A);
        assert_eq!(cii_rating(3.5), CiiRating::B);
        assert_eq!(cii_rating(4.5), CiiRating::C);
        assert_eq!(cii_rating(5.5), CiiRating::D);
        assert_eq!(cii_rating(7.0), CiiRating::E);
    }
}
