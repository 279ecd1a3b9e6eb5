use strum_macros::Display;

use super::error::EphemerisError;

/// Catalog of bodies the mount can track. The gas giants resolve to their
/// barycenters, which is what the DE-series kernels carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum Body {
    Moon,
    Sun,
    Venus,
    Jupiter,
    Mars,
    Saturn,
}

impl Body {
    pub const ALL: [Body; 6] = [
        Body::Moon,
        Body::Sun,
        Body::Venus,
        Body::Jupiter,
        Body::Mars,
        Body::Saturn,
    ];

    pub fn resolve(name: &str) -> Result<Body, EphemerisError> {
        match name {
            "Moon" => Ok(Body::Moon),
            "Sun" => Ok(Body::Sun),
            "Venus" => Ok(Body::Venus),
            "Jupiter" => Ok(Body::Jupiter),
            "Mars" => Ok(Body::Mars),
            "Saturn" => Ok(Body::Saturn),
            other => Err(EphemerisError::UnknownBody(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_every_catalog_name() {
        for body in Body::ALL {
            assert_eq!(Body::resolve(&body.to_string()).unwrap(), body);
        }
    }

    #[test]
    fn rejects_unknown_names() {
        for name in ["Pluto", "moon", "", "MOON"] {
            assert!(matches!(
                Body::resolve(name),
                Err(EphemerisError::UnknownBody(_))
            ));
        }
    }
}
