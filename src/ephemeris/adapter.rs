use anise::almanac::Almanac;
use anise::astro::Aberration;
use anise::constants::frames::{
    IAU_EARTH_FRAME, JUPITER_BARYCENTER_J2000, MARS_BARYCENTER_J2000, MOON_J2000,
    SATURN_BARYCENTER_J2000, SUN_J2000, VENUS_J2000,
};
use anise::constants::usual_planetary_constants::MEAN_EARTH_ANGULAR_VELOCITY_DEG_S;
use anise::prelude::{Frame, Orbit};
use chrono::{DateTime, Duration, Utc};
use hifitime::Epoch;

use super::body::Body;
use super::error::EphemerisError;
use super::sample::{Crossing, PositionSample, RiseSetEvent};
use super::site::ObserverSite;
use super::EphemerisSource;

const COARSE_STEP_SECONDS: i64 = 60; // initial horizon scan
const FINE_STEP_SECONDS: i64 = 1; // bisection refinement floor

/// Ephemeris adapter backed by a JPL SPK kernel (de440s covers 1849-2150)
/// plus a planetary constants kernel for the Earth body-fixed frame.
pub struct SpkAdapter {
    almanac: Almanac,
    earth_frame: Frame,
}

impl SpkAdapter {
    pub fn load(spk_path: &str, pck_path: &str) -> Result<Self, EphemerisError> {
        let almanac = Almanac::new(spk_path)
            .and_then(|a| a.load(pck_path))
            .map_err(|e| EphemerisError::Kernel(e.to_string()))?;
        let earth_frame = almanac
            .frame_from_uid(IAU_EARTH_FRAME)
            .map_err(|e| EphemerisError::Kernel(e.to_string()))?;
        Ok(Self {
            almanac,
            earth_frame,
        })
    }

    fn observer_orbit(&self, site: &ObserverSite, epoch: Epoch) -> Result<Orbit, EphemerisError> {
        Orbit::try_latlongalt(
            site.latitude_deg,
            site.longitude_deg,
            site.altitude_m / 1000.0,
            MEAN_EARTH_ANGULAR_VELOCITY_DEG_S,
            epoch,
            self.earth_frame,
        )
        .map_err(|e| EphemerisError::Computation(e.to_string()))
    }

    fn altitude_deg(
        &self,
        body: Body,
        site: &ObserverSite,
        at: DateTime<Utc>,
    ) -> Result<f64, EphemerisError> {
        Ok(self.observe(body, site, at)?.altitude_deg)
    }
}

impl EphemerisSource for SpkAdapter {
    fn observe(
        &self,
        body: Body,
        site: &ObserverSite,
        at: DateTime<Utc>,
    ) -> Result<PositionSample, EphemerisError> {
        let epoch = to_epoch(at);
        let observer = self.observer_orbit(site, epoch)?;
        let target = self
            .almanac
            .transform(target_frame(body), self.earth_frame, epoch, Aberration::LT)
            .map_err(|e| EphemerisError::Computation(e.to_string()))?;
        let azel = self
            .almanac
            .azimuth_elevation_range_sez(target, observer, None, None)
            .map_err(|e| EphemerisError::Computation(e.to_string()))?;

        Ok(PositionSample::new(
            at,
            azel.elevation_deg,
            azel.azimuth_deg,
            azel.range_km,
        ))
    }

    fn rise_set_window(
        &self,
        body: Body,
        site: &ObserverSite,
        start: DateTime<Utc>,
        window: Duration,
    ) -> Result<Vec<RiseSetEvent>, EphemerisError> {
        find_crossings(
            start,
            start + window,
            Duration::seconds(COARSE_STEP_SECONDS),
            &mut |t| self.altitude_deg(body, site, t),
        )
    }
}

fn target_frame(body: Body) -> Frame {
    match body {
        Body::Moon => MOON_J2000,
        Body::Sun => SUN_J2000,
        Body::Venus => VENUS_J2000,
        Body::Jupiter => JUPITER_BARYCENTER_J2000,
        Body::Mars => MARS_BARYCENTER_J2000,
        Body::Saturn => SATURN_BARYCENTER_J2000,
    }
}

fn to_epoch(at: DateTime<Utc>) -> Epoch {
    Epoch::from_unix_seconds(at.timestamp_millis() as f64 / 1000.0)
}

/// Scan the above-horizon predicate over `[start, end)` at `step`, then
/// bisect each polarity change down to one second. Every returned event
/// lies strictly inside the window.
pub fn find_crossings(
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    step: Duration,
    altitude: &mut dyn FnMut(DateTime<Utc>) -> Result<f64, EphemerisError>,
) -> Result<Vec<RiseSetEvent>, EphemerisError> {
    let mut events = Vec::new();
    let mut cursor = start;
    let mut prev_above = altitude(cursor)? > 0.0;

    while cursor < end {
        let next = (cursor + step).min(end);
        let above = altitude(next)? > 0.0;

        if above != prev_above {
            let timestamp = refine_crossing(cursor, next, above, altitude)?;
            if timestamp < end {
                let kind = if above { Crossing::Rise } else { Crossing::Set };
                events.push(RiseSetEvent { timestamp, kind });
            }
        }

        prev_above = above;
        cursor = next;
    }

    Ok(events)
}

/// Binary search for the crossing instant between `before` (opposite
/// polarity) and `after`.
fn refine_crossing(
    before: DateTime<Utc>,
    after: DateTime<Utc>,
    rising: bool,
    altitude: &mut dyn FnMut(DateTime<Utc>) -> Result<f64, EphemerisError>,
) -> Result<DateTime<Utc>, EphemerisError> {
    let mut low = before;
    let mut high = after;

    while (high - low).num_seconds() > FINE_STEP_SECONDS {
        let mid = low + (high - low) / 2;
        let above = altitude(mid)? > 0.0;
        if above == rising {
            high = mid;
        } else {
            low = mid;
        }
    }

    Ok(high)
}
