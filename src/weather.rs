//! Weather provider (C6): point/segment atmospheric + marine data with
//! best-effort fallback. Never surfaces a network error as a routing
//! failure, per spec §4.6/§7 (`ExternalTransient` is absorbed here).
//!
//! Grounded on the teacher's `engine::models::WindData`/`CurrentData`/
//! `SeaState` (component fields, units) and its `reqwest` dependency;
//! `tokio` is added so the two external calls run concurrently with
//! independent timeouts, per spec §5/§4.6 (the teacher's own `reqwest`
//! usage was blocking-only, which can't express that).

use std::time::Duration;

use chrono::{DateTime, Utc};
use log::warn;
use serde::{Deserialize, Serialize};

use crate::geo_math::{interpolate_gc, Coordinate};

const CALL_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum WeatherSource {
    Combined,
    Fallback,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeatherSample {
    pub lat: f64,
    pub lon: f64,
    pub timestamp: DateTime<Utc>,
    pub wind_speed_ms: f64,
    pub wind_direction_deg: f64,
    pub wave_height_m: f64,
    pub wave_period_s: f64,
    pub wave_direction_deg: f64,
    pub current_speed_ms: f64,
    pub current_direction_deg: f64,
    pub sea_temp_c: f64,
    pub air_temp_c: f64,
    pub pressure_hpa: f64,
    pub source: WeatherSource,
}

impl WeatherSample {
    /// The documented neutral fallback sample (spec §4.6), used when both
    /// external providers fail or when weather is disabled for a call.
    pub fn neutral(coord: Coordinate, at: DateTime<Utc>) -> Self {
        Self {
            lat: coord.lat,
            lon: coord.lon,
            timestamp: at,
            wind_speed_ms: 5.0,
            wind_direction_deg: 0.0,
            wave_height_m: 0.5,
            wave_period_s: 5.0,
            wave_direction_deg: 0.0,
            current_speed_ms: 0.3,
            current_direction_deg: 0.0,
            sea_temp_c: 18.0,
            air_temp_c: 18.0,
            pressure_hpa: 1013.0,
            source: WeatherSource::Fallback,
        }
    }
}

/// Raw atmospheric-provider response fields actually consumed (first
/// hourly sample only, per spec §6).
#[derive(Debug, Deserialize)]
struct AtmosphericResponse {
    wind_speed_ms: Option<f64>,
    wind_direction_deg: Option<f64>,
    pressure_hpa: Option<f64>,
    air_temp_c: Option<f64>,
}

/// Raw marine-provider response fields actually consumed.
#[derive(Debug, Deserialize)]
struct MarineResponse {
    wave_height_m: Option<f64>,
    wave_period_s: Option<f64>,
    wave_direction_deg: Option<f64>,
    current_speed_ms: Option<f64>,
    current_direction_deg: Option<f64>,
    sea_temp_c: Option<f64>,
}

pub struct WeatherProvider {
    client: reqwest::Client,
    atmospheric_base: String,
    marine_base: String,
}

impl WeatherProvider {
    pub fn new(atmospheric_base: impl Into<String>, marine_base: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            atmospheric_base: atmospheric_base.into(),
            marine_base: marine_base.into(),
        }
    }

    /// A provider with no reachable endpoints, for deterministic
    /// weather-disabled routing.
    pub fn disabled() -> Self {
        Self::new("", "")
    }

    async fn fetch_atmospheric(&self, coord: Coordinate, at: Option<DateTime<Utc>>) -> Option<AtmosphericResponse> {
        if self.atmospheric_base.is_empty() {
            return None;
        }
        let mut req = self.client.get(&self.atmospheric_base).query(&[("lat", coord.lat), ("lon", coord.lon)]);
        if let Some(t) = at {
            req = req.query(&[("time", t.timestamp())]);
        }
        let fut = req.send();
        match tokio::time::timeout(CALL_TIMEOUT, fut).await {
            Ok(Ok(resp)) => resp.json::<AtmosphericResponse>().await.ok(),
            Ok(Err(e)) => {
                warn!("atmospheric provider request failed: {e}");
                None
            }
            Err(_) => {
                warn!("atmospheric provider request timed out after {CALL_TIMEOUT:?}");
                None
            }
        }
    }

    async fn fetch_marine(&self, coord: Coordinate, at: Option<DateTime<Utc>>) -> Option<MarineResponse> {
        if self.marine_base.is_empty() {
            return None;
        }
        let mut req = self.client.get(&self.marine_base).query(&[("lat", coord.lat), ("lon", coord.lon)]);
        if let Some(t) = at {
            req = req.query(&[("time", t.timestamp())]);
        }
        let fut = req.send();
        match tokio::time::timeout(CALL_TIMEOUT, fut).await {
            Ok(Ok(resp)) => resp.json::<MarineResponse>().await.ok(),
            Ok(Err(e)) => {
                warn!("marine provider request failed: {e}");
                None
            }
            Err(_) => {
                warn!("marine provider request timed out after {CALL_TIMEOUT:?}");
                None
            }
        }
    }

    /// Concurrently requests the atmospheric and marine providers and
    /// merges them. If atmospheric succeeds, marine fields present are
    /// merged in, any missing marine fields fall back to neutral values
    /// and the sample is tagged `Fallback`. If both fail, the full neutral
    /// sample is returned. Never propagates a network error.
    pub async fn fetch_combined(&self, coord: Coordinate, at: Option<DateTime<Utc>>) -> WeatherSample {
        let now = at.unwrap_or_else(Utc::now);
        let (atmospheric, marine) = tokio::join!(self.fetch_atmospheric(coord, at), self.fetch_marine(coord, at));

        let Some(atm) = atmospheric else {
            return WeatherSample::neutral(coord, now);
        };

        let neutral = WeatherSample::neutral(coord, now);
        let marine_missing = marine.is_none();
        let m = marine.unwrap_or(MarineResponse {
            wave_height_m: None,
            wave_period_s: None,
            wave_direction_deg: None,
            current_speed_ms: None,
            current_direction_deg: None,
            sea_temp_c: None,
        });

        WeatherSample {
            lat: coord.lat,
            lon: coord.lon,
            timestamp: now,
            wind_speed_ms: atm.wind_speed_ms.unwrap_or(neutral.wind_speed_ms),
            wind_direction_deg: atm.wind_direction_deg.unwrap_or(neutral.wind_direction_deg),
            wave_height_m: m.wave_height_m.unwrap_or(neutral.wave_height_m),
            wave_period_s: m.wave_period_s.unwrap_or(neutral.wave_period_s),
            wave_direction_deg: m.wave_direction_deg.unwrap_or(neutral.wave_direction_deg),
            current_speed_ms: m.current_speed_ms.unwrap_or(neutral.current_speed_ms),
            current_direction_deg: m.current_direction_deg.unwrap_or(neutral.current_direction_deg),
            sea_temp_c: m.sea_temp_c.unwrap_or(neutral.sea_temp_c),
            air_temp_c: atm.air_temp_c.unwrap_or(neutral.air_temp_c),
            pressure_hpa: atm.pressure_hpa.unwrap_or(neutral.pressure_hpa),
            source: if marine_missing { WeatherSource::Fallback } else { WeatherSource::Combined },
        }
    }

    /// Samples grid points along a linear interpolation of `start`→`end`
    /// at roughly `resolution_deg` spacing, fetching each concurrently.
    pub async fn fetch_along_route(&self, start: Coordinate, end: Coordinate, resolution_deg: f64) -> Vec<WeatherSample> {
        let angular_span = (end.lat - start.lat).hypot(end.lon - start.lon);
        let steps = ((angular_span / resolution_deg).ceil() as usize).max(1);

        let futures = (0..=steps).map(|i| {
            let t = i as f64 / steps as f64;
            let point = interpolate_gc(start, end, t);
            self.fetch_combined(point, None)
        });

        futures_util::future::join_all(futures).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn disabled_provider_returns_neutral_fallback() {
        let provider = WeatherProvider::disabled();
        let sample = provider.fetch_combined(Coordinate::new(38.0, 25.0), None).await;
        assert_eq!(sample.source, WeatherSource::Fallback);
        assert_eq!(sample.wind_speed_ms, 5.0);
        assert_eq!(sample.wave_height_m, 0.5);
        assert_eq!(sample.current_speed_ms, 0.3);
    }

    #[tokio::test]
    async fn fetch_along_route_samples_every_point() {
        let provider = WeatherProvider::disabled();
        let samples = provider.fetch_along_route(Coordinate::new(40.0, 10.0), Coordinate::new(42.0, 14.0), 1.0).await;
        assert!(samples.len() >= 2);
        assert!(samples.iter().all(|s| s.source == WeatherSource::Fallback));
    }
}
