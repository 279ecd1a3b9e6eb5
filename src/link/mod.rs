mod error;
mod framing;
mod protocol;
mod session;

pub use error::LinkError;
pub use framing::LineFramer;
pub use protocol::{OutboundCommand, RunState, TelemetryRecord};
pub use session::{LinkControl, LinkSession, LinkState, LinkStatus};
