use serde::Deserialize;

/// Where the dish stands. Loaded once from the config file and never
/// mutated afterwards.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct ObserverSite {
    pub latitude_deg: f64,
    pub longitude_deg: f64,
    #[serde(default)]
    pub altitude_m: f64,
}
