use chrono::{DateTime, Utc};

use crate::ephemeris::{Body, PositionSample};
use crate::link::{LinkStatus, RunState};

/// Which user affordances are currently meaningful. Track/Align/Stop
/// follow the mount's reported run state, not local guesses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Controls {
    pub connect: bool,
    pub disconnect: bool,
    pub track: bool,
    pub align: bool,
    pub stop: bool,
}

impl Default for Controls {
    fn default() -> Self {
        Self {
            connect: true,
            disconnect: false,
            track: false,
            align: false,
            stop: false,
        }
    }
}

/// Everything the presentation shell renders. Mutated only on the
/// coordinator thread.
#[derive(Debug, Clone)]
pub struct ViewState {
    pub target: Body,
    pub target_position: Option<PositionSample>,
    pub mount_azimuth_deg: Option<f64>,
    pub mount_elevation_deg: Option<f64>,
    pub link: LinkStatus,
    pub mount_state: Option<RunState>,
    pub next_rise: Option<DateTime<Utc>>,
    pub next_set: Option<DateTime<Utc>>,
    pub status_text: String,
    pub controls: Controls,
}

impl ViewState {
    pub fn new(target: Body) -> Self {
        Self {
            target,
            target_position: None,
            mount_azimuth_deg: None,
            mount_elevation_deg: None,
            link: LinkStatus::default(),
            mount_state: None,
            next_rise: None,
            next_set: None,
            status_text: String::new(),
            controls: Controls::default(),
        }
    }
}

/// Rendering seam for the presentation shell.
pub trait Presenter {
    fn render(&mut self, view: &ViewState);
}
