use strum_macros::Display;

/// Commands the coordinator sends to the mount controller. The wire format
/// is single-letter ASCII lines; setpoints carry two decimal places.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OutboundCommand {
    StartTracking,
    StopTracking,
    Align,
    SetAzimuth(f64),
    SetElevation(f64),
}

impl OutboundCommand {
    pub fn encode(&self) -> String {
        match self {
            OutboundCommand::StartTracking => "R\n".to_string(),
            OutboundCommand::StopTracking => "S\n".to_string(),
            OutboundCommand::Align => "Z\n".to_string(),
            OutboundCommand::SetAzimuth(deg) => format!("A{:.2}\n", deg),
            OutboundCommand::SetElevation(deg) => format!("E{:.2}\n", deg),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum RunState {
    Running,
    Stopped,
}

/// A parsed telemetry line from the mount. Lines that fit neither record
/// shape are discarded by the caller.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TelemetryRecord {
    Position { azimuth_deg: f64, elevation_deg: f64 },
    Status(RunState),
}

impl TelemetryRecord {
    pub fn parse(line: &str) -> Option<TelemetryRecord> {
        let mut fields = line.split(',').map(str::trim_end);
        match fields.next()? {
            "POS" => {
                let azimuth_deg: f64 = fields.next()?.parse().ok()?;
                let elevation_deg: f64 = fields.next()?.parse().ok()?;
                Some(TelemetryRecord::Position {
                    azimuth_deg,
                    elevation_deg,
                })
            }
            "STATUS" => match fields.next()? {
                "RUN" => Some(TelemetryRecord::Status(RunState::Running)),
                "STOP" => Some(TelemetryRecord::Status(RunState::Stopped)),
                _ => None,
            },
            _ => None,
        }
    }
}
