use thiserror::Error;

#[derive(Debug, Error)]
pub enum LinkError {
    #[error("link session already running")]
    AlreadyRunning,
    #[error("unable to open serial port: {0}")]
    Open(String),
}
