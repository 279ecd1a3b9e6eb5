mod adapter;
mod body;
mod error;
mod sample;
mod site;

pub use adapter::SpkAdapter;
pub use body::Body;
pub use error::EphemerisError;
pub use sample::{Crossing, PositionSample, RiseSetEvent};
pub use site::ObserverSite;

use chrono::{DateTime, Duration, Utc};

/// Apparent-position source for a fixed observer. One implementation wraps
/// the SPK kernels; tests substitute deterministic fakes.
pub trait EphemerisSource: Send + Sync {
    fn resolve(&self, name: &str) -> Result<Body, EphemerisError> {
        Body::resolve(name)
    }

    fn observe(
        &self,
        body: Body,
        site: &ObserverSite,
        at: DateTime<Utc>,
    ) -> Result<PositionSample, EphemerisError>;

    fn rise_set_window(
        &self,
        body: Body,
        site: &ObserverSite,
        start: DateTime<Utc>,
        window: Duration,
    ) -> Result<Vec<RiseSetEvent>, EphemerisError>;
}
