use thiserror::Error;

#[derive(Debug, Error)]
pub enum EphemerisError {
    #[error("unknown body: {0}")]
    UnknownBody(String),
    #[error("ephemeris kernel error: {0}")]
    Kernel(String),
    #[error("ephemeris computation error: {0}")]
    Computation(String),
}
