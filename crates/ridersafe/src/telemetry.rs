//! Synthetic ride telemetry.
//!
//! Stands in for the helmet hardware feed: one [`Reading`] per tick with
//! speed, elevation, link latency and a coordinate string. The last reading
//! before an alert is sent becomes the incident's black-box record.

use rand::rngs::ThreadRng;
use rand::Rng;
use serde::Serialize;

/// Elevation the random walk starts from, in meters.
pub const START_ELEVATION_M: f64 = 152.0;

/// Largest elevation change per reading, in meters.
const ELEVATION_STEP_M: f64 = 0.2;

/// Velocity recorded when no reading was taken.
pub const NO_VELOCITY: &str = "0 KM/H";

/// Elevation recorded when no reading was taken.
pub const NO_ELEVATION: &str = "0 M";

/// One telemetry sample.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Reading {
    /// Ground speed in km/h.
    pub speed_kmh: u32,
    /// Elevation in meters.
    pub elevation_m: f64,
    /// Link latency in milliseconds.
    pub latency_ms: u32,
    /// Display coordinates, e.g. `8.2241° N, 125.757° E`.
    pub coordinates: String,
}

impl Reading {
    /// Speed as shown on the dashboard.
    #[must_use]
    pub fn velocity_label(&self) -> String {
        format!("{} KM/H", self.speed_kmh)
    }

    /// Elevation rounded to whole meters.
    #[must_use]
    pub fn elevation_label(&self) -> String {
        format!("{:.0} M", self.elevation_m.round())
    }
}

/// Generates plausible readings for a rider cruising near Butuan.
#[derive(Debug)]
pub struct TelemetrySimulator<R = ThreadRng> {
    rng: R,
    elevation_m: f64,
}

impl TelemetrySimulator<ThreadRng> {
    /// Simulator backed by the thread-local generator.
    #[must_use]
    pub fn new() -> Self {
        Self::with_rng(rand::thread_rng())
    }
}

impl Default for TelemetrySimulator<ThreadRng> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Rng> TelemetrySimulator<R> {
    /// Simulator backed by the given generator.
    pub fn with_rng(rng: R) -> Self {
        Self {
            rng,
            elevation_m: START_ELEVATION_M,
        }
    }

    /// Current elevation of the random walk.
    #[must_use]
    pub fn elevation(&self) -> f64 {
        self.elevation_m
    }

    /// Produce the next reading.
    pub fn next_reading(&mut self) -> Reading {
        self.elevation_m += self.rng.gen_range(-ELEVATION_STEP_M..ELEVATION_STEP_M);

        let lat_suffix: u32 = self.rng.gen_range(0..99);
        let lon_suffix: u32 = self.rng.gen_range(0..99);

        Reading {
            speed_kmh: self.rng.gen_range(60..=64),
            elevation_m: self.elevation_m,
            latency_ms: self.rng.gen_range(30..=44),
            coordinates: format!("8.22{lat_suffix}° N, 125.75{lon_suffix}° E"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn seeded() -> TelemetrySimulator<StdRng> {
        TelemetrySimulator::with_rng(StdRng::seed_from_u64(7))
    }

    #[test]
    fn test_readings_stay_in_range() {
        let mut sim = seeded();
        for _ in 0..500 {
            let r = sim.next_reading();
            assert!((60..=64).contains(&r.speed_kmh));
            assert!((30..=44).contains(&r.latency_ms));
            assert!(r.coordinates.starts_with("8.22"));
            assert!(r.coordinates.contains("° N, 125.75"));
            assert!(r.coordinates.ends_with("° E"));
        }
    }

    #[test]
    fn test_elevation_walk_is_bounded_per_step() {
        let mut sim = seeded();
        let mut previous = sim.elevation();
        assert!((previous - START_ELEVATION_M).abs() < f64::EPSILON);

        for _ in 0..200 {
            let r = sim.next_reading();
            assert!((r.elevation_m - previous).abs() <= ELEVATION_STEP_M + 1e-9);
            previous = r.elevation_m;
        }
    }

    #[test]
    fn test_labels() {
        let reading = Reading {
            speed_kmh: 62,
            elevation_m: 151.6,
            latency_ms: 33,
            coordinates: "8.2241° N, 125.757° E".to_string(),
        };
        assert_eq!(reading.velocity_label(), "62 KM/H");
        assert_eq!(reading.elevation_label(), "152 M");
    }

    #[test]
    fn test_elevation_label_rounds_half_up() {
        let reading = Reading {
            speed_kmh: 60,
            elevation_m: 152.5,
            latency_ms: 30,
            coordinates: String::new(),
        };
        assert_eq!(reading.elevation_label(), "153 M");
    }
}
