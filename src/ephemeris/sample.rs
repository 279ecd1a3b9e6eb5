use chrono::{DateTime, Utc};
use strum_macros::Display;

/// Apparent position of the tracked body at one instant.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PositionSample {
    pub timestamp: DateTime<Utc>,
    pub altitude_deg: f64,
    pub azimuth_deg: f64,
    pub distance_km: f64,
    pub above_horizon: bool,
}

impl PositionSample {
    pub fn new(
        timestamp: DateTime<Utc>,
        altitude_deg: f64,
        azimuth_deg: f64,
        distance_km: f64,
    ) -> Self {
        Self {
            timestamp,
            altitude_deg,
            azimuth_deg,
            distance_km,
            // Exactly 0.0 counts as below.
            above_horizon: altitude_deg > 0.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum Crossing {
    Rise,
    Set,
}

/// A horizon crossing inside a rise/set query window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RiseSetEvent {
    pub timestamp: DateTime<Utc>,
    pub kind: Crossing,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn horizon_flag_is_strictly_positive() {
        let t = Utc::now();
        assert!(PositionSample::new(t, 0.01, 0.0, 1.0).above_horizon);
        assert!(!PositionSample::new(t, 0.0, 0.0, 1.0).above_horizon);
        assert!(!PositionSample::new(t, -0.01, 0.0, 1.0).above_horizon);
    }
}
