use crate::ephemeris::PositionSample;
use crate::link::LinkStatus;

/// Everything the coordinator consumes rides one queue, so handling is
/// strictly serialized and no outbound command sequences interleave.
#[derive(Debug, Clone)]
pub enum Event {
    /// 1 Hz sample from the tracker loop.
    PositionTick(PositionSample),
    /// Raw LF-terminated telemetry line from the serial reader.
    LinkLine(String),
    /// Link state transition with its reason.
    Link(LinkStatus),
    /// Request forwarded by the presentation shell.
    User(UserCommand),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserCommand {
    Connect(String),
    Disconnect,
    Track,
    Stop,
    Align,
    SelectTarget(String),
    Quit,
}
