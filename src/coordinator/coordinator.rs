use std::sync::mpsc::Receiver;

use chrono::{DateTime, Utc};

use super::event::{Event, UserCommand};
use super::view::{Presenter, ViewState};
use crate::ephemeris::{Body, Crossing, PositionSample, RiseSetEvent};
use crate::link::{
    LinkControl, LinkError, LinkState, LinkStatus, OutboundCommand, RunState, TelemetryRecord,
};
use crate::tracker::Tracker;

/// Single-threaded consumer of the merged event stream. Sole issuer of
/// outbound serial commands.
pub struct Coordinator<L: LinkControl> {
    tracker: Tracker,
    link: L,
    events: Receiver<Event>,
    presenter: Box<dyn Presenter>,
    view: ViewState,
}

impl<L: LinkControl> Coordinator<L> {
    pub fn new(
        tracker: Tracker,
        link: L,
        events: Receiver<Event>,
        presenter: Box<dyn Presenter>,
    ) -> Self {
        let mut view = ViewState::new(tracker.target());
        // The polling thread may have ticked before the coordinator was
        // wired up; show that sample instead of a blank display.
        view.target_position = tracker.last_sample();
        Self {
            tracker,
            link,
            events,
            presenter,
            view,
        }
    }

    /// Consume events until the queue closes or the user quits. Blocks
    /// only while the queue is empty.
    pub fn run(mut self) {
        self.refresh_rise_set(Utc::now());
        self.presenter.render(&self.view);

        while let Ok(event) = self.events.recv() {
            if matches!(event, Event::User(UserCommand::Quit)) {
                self.link.stop();
                break;
            }
            self.handle(event);
            self.presenter.render(&self.view);
        }
    }

    pub fn handle(&mut self, event: Event) {
        match event {
            Event::PositionTick(sample) => self.on_tick(sample),
            Event::LinkLine(line) => self.on_line(&line),
            Event::Link(status) => self.on_link(status),
            Event::User(command) => self.on_user(command),
        }
    }

    fn on_tick(&mut self, sample: PositionSample) {
        self.view.target_position = Some(sample);
        self.refresh_countdowns(sample.timestamp, sample.above_horizon);

        if self.link.is_connected() {
            // Elevation first; the firmware expects a steady E/A pair.
            self.link
                .send(&OutboundCommand::SetElevation(sample.altitude_deg));
            self.link
                .send(&OutboundCommand::SetAzimuth(sample.azimuth_deg));
        }
    }

    fn on_line(&mut self, line: &str) {
        match TelemetryRecord::parse(line) {
            Some(TelemetryRecord::Position {
                azimuth_deg,
                elevation_deg,
            }) => {
                self.view.mount_azimuth_deg = Some(azimuth_deg);
                self.view.mount_elevation_deg = Some(elevation_deg);
            }
            Some(TelemetryRecord::Status(RunState::Running)) => {
                self.view.mount_state = Some(RunState::Running);
                self.view.controls.stop = true;
                self.view.controls.track = false;
                self.view.controls.align = false;
            }
            Some(TelemetryRecord::Status(RunState::Stopped)) => {
                self.view.mount_state = Some(RunState::Stopped);
                self.view.controls.stop = false;
                self.view.controls.track = true;
                self.view.controls.align = true;
            }
            None => log::debug!("ignoring telemetry line {line:?}"),
        }
    }

    fn on_link(&mut self, status: LinkStatus) {
        let connected = status.state == LinkState::Connected;
        self.view.link = status;
        self.view.controls.connect = !connected;
        self.view.controls.disconnect = connected;
        if !connected {
            self.view.controls.track = false;
            self.view.controls.align = false;
            self.view.controls.stop = false;
            self.view.mount_state = None;
        }
    }

    fn on_user(&mut self, command: UserCommand) {
        match command {
            UserCommand::Connect(port) => match self.link.connect(&port) {
                Ok(()) => log::info!("connecting to {port}"),
                Err(LinkError::AlreadyRunning) => log::info!("already connected"),
                Err(e) => log::warn!("connect failed: {e}"),
            },
            UserCommand::Disconnect => self.link.stop(),
            UserCommand::Track => self.link.send(&OutboundCommand::StartTracking),
            UserCommand::Stop => self.link.send(&OutboundCommand::StopTracking),
            UserCommand::Align => self.link.send(&OutboundCommand::Align),
            UserCommand::SelectTarget(name) => self.on_select(&name),
            UserCommand::Quit => {}
        }
    }

    fn on_select(&mut self, name: &str) {
        if self.link.is_connected() {
            // Halt motion toward the old target before retargeting.
            self.link.send(&OutboundCommand::StopTracking);
        }
        match self.tracker.select(name) {
            Ok(body) => {
                self.view.target = body;
                self.refresh_rise_set(Utc::now());
            }
            Err(e) => log::warn!("target selection failed: {e}"),
        }
    }

    fn refresh_rise_set(&mut self, now: DateTime<Utc>) {
        match self.tracker.rise_set(now) {
            Ok(events) => self.apply_rise_set(&events, now),
            Err(e) => log::warn!("rise/set computation failed: {e}"),
        }
    }

    fn refresh_countdowns(&mut self, now: DateTime<Utc>, above_horizon: bool) {
        let fresh = self
            .tracker
            .rise_set_valid_until()
            .is_some_and(|end| now < end);
        if fresh {
            // An empty cache inside a valid window means the body never
            // crosses the horizon today; nothing to recompute.
            let cached = self.tracker.cached_rise_set();
            self.apply_rise_set(&cached, now);
        } else {
            // Window exhausted (or never computed); roll it forward.
            self.refresh_rise_set(now);
        }
        self.view.status_text = status_text(
            self.view.target,
            above_horizon,
            now,
            self.view.next_rise,
            self.view.next_set,
        );
    }

    fn apply_rise_set(&mut self, events: &[RiseSetEvent], now: DateTime<Utc>) {
        self.view.next_rise = next_of(events, Crossing::Rise, now);
        self.view.next_set = next_of(events, Crossing::Set, now);
    }
}

fn next_of(events: &[RiseSetEvent], kind: Crossing, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    events
        .iter()
        .find(|ev| ev.kind == kind && ev.timestamp > now)
        .map(|ev| ev.timestamp)
}

fn status_text(
    target: Body,
    above_horizon: bool,
    now: DateTime<Utc>,
    next_rise: Option<DateTime<Utc>>,
    next_set: Option<DateTime<Utc>>,
) -> String {
    let (verb, countdown) = if above_horizon {
        ("above", next_set.map(|t| hours_minutes(t, now)))
    } else {
        ("below", next_rise.map(|t| hours_minutes(t, now)))
    };
    let action = if above_horizon { "sets" } else { "rises" };

    match countdown {
        Some((hours, minutes)) => format!(
            "{target} is {verb} the horizon and {action} in {hours} hours and {minutes} minutes"
        ),
        None => format!("{target} is {verb} the horizon"),
    }
}

fn hours_minutes(until: DateTime<Utc>, now: DateTime<Utc>) -> (i64, i64) {
    let minutes = (until - now).num_minutes();
    (minutes / 60, minutes % 60)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ephemeris::{EphemerisError, EphemerisSource, ObserverSite};
    use chrono::Duration;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::mpsc;
    use std::sync::Arc;

    /// Ephemeris fake with a fixed altitude and scripted crossings
    /// relative to the query start.
    struct ScriptedSky {
        altitude_deg: f64,
        rise_in_min: Option<i64>,
        set_in_min: Option<i64>,
    }

    impl EphemerisSource for ScriptedSky {
        fn observe(
            &self,
            _body: Body,
            _site: &ObserverSite,
            at: DateTime<Utc>,
        ) -> Result<PositionSample, EphemerisError> {
            Ok(PositionSample::new(at, self.altitude_deg, 180.0, 1.0))
        }

        fn rise_set_window(
            &self,
            _body: Body,
            _site: &ObserverSite,
            start: DateTime<Utc>,
            _window: Duration,
        ) -> Result<Vec<RiseSetEvent>, EphemerisError> {
            let mut events = Vec::new();
            if let Some(min) = self.rise_in_min {
                events.push(RiseSetEvent {
                    timestamp: start + Duration::minutes(min),
                    kind: Crossing::Rise,
                });
            }
            if let Some(min) = self.set_in_min {
                events.push(RiseSetEvent {
                    timestamp: start + Duration::minutes(min),
                    kind: Crossing::Set,
                });
            }
            events.sort_by_key(|ev| ev.timestamp);
            Ok(events)
        }
    }

    struct FakeLink {
        connected: bool,
        sent: Vec<String>,
    }

    impl LinkControl for FakeLink {
        fn connect(&mut self, _port: &str) -> Result<(), LinkError> {
            if self.connected {
                return Err(LinkError::AlreadyRunning);
            }
            self.connected = true;
            Ok(())
        }

        fn stop(&mut self) {
            self.connected = false;
        }

        fn send(&mut self, command: &OutboundCommand) {
            if self.connected {
                self.sent.push(command.encode());
            }
        }

        fn status(&self) -> LinkStatus {
            if self.connected {
                LinkStatus {
                    state: LinkState::Connected,
                    reason: "Connected".to_string(),
                }
            } else {
                LinkStatus::default()
            }
        }
    }

    struct NullPresenter;

    impl Presenter for NullPresenter {
        fn render(&mut self, _view: &ViewState) {}
    }

    fn site() -> ObserverSite {
        ObserverSite {
            latitude_deg: 52.388211,
            longitude_deg: -2.304344,
            altitude_m: 69.0,
        }
    }

    fn coordinator(sky: ScriptedSky, connected: bool) -> Coordinator<FakeLink> {
        let tracker = Tracker::new(Arc::new(sky), site(), Body::Moon);
        let (_tx, rx) = mpsc::channel();
        let link = FakeLink {
            connected,
            sent: Vec::new(),
        };
        Coordinator::new(tracker, link, rx, Box::new(NullPresenter))
    }

    fn above_sky() -> ScriptedSky {
        ScriptedSky {
            altitude_deg: 10.0,
            rise_in_min: None,
            set_in_min: Some(150),
        }
    }

    #[test]
    fn tick_while_connected_sends_elevation_then_azimuth() {
        let mut c = coordinator(above_sky(), true);
        let sample = PositionSample::new(Utc::now(), 10.0, 200.0, 1.0);
        c.handle(Event::PositionTick(sample));
        assert_eq!(c.link.sent, vec!["E10.00\n", "A200.00\n"]);
    }

    #[test]
    fn tick_while_disconnected_sends_nothing() {
        let mut c = coordinator(above_sky(), false);
        c.handle(Event::PositionTick(PositionSample::new(
            Utc::now(),
            10.0,
            200.0,
            1.0,
        )));
        assert!(c.link.sent.is_empty());
    }

    #[test]
    fn tick_builds_the_above_horizon_status_text() {
        let mut c = coordinator(above_sky(), false);
        c.handle(Event::PositionTick(PositionSample::new(
            Utc::now(),
            10.0,
            200.0,
            1.0,
        )));
        assert_eq!(
            c.view.status_text,
            "Moon is above the horizon and sets in 2 hours and 30 minutes"
        );
    }

    #[test]
    fn below_horizon_text_uses_the_rise_countdown() {
        let sky = ScriptedSky {
            altitude_deg: -3.0,
            rise_in_min: Some(75),
            set_in_min: Some(600),
        };
        let mut c = coordinator(sky, false);
        c.handle(Event::PositionTick(PositionSample::new(
            Utc::now(),
            -3.0,
            200.0,
            1.0,
        )));
        assert_eq!(
            c.view.status_text,
            "Moon is below the horizon and rises in 1 hours and 15 minutes"
        );
    }

    #[test]
    fn position_line_updates_the_mount_display() {
        let mut c = coordinator(above_sky(), true);
        c.handle(Event::LinkLine("POS,123.45,67.89\n".to_string()));
        assert_eq!(c.view.mount_azimuth_deg, Some(123.45));
        assert_eq!(c.view.mount_elevation_deg, Some(67.89));
    }

    #[test]
    fn status_run_enables_stop_and_disables_track_and_align() {
        let mut c = coordinator(above_sky(), true);
        c.handle(Event::LinkLine("STATUS,RUN\n".to_string()));
        assert!(c.view.controls.stop);
        assert!(!c.view.controls.track);
        assert!(!c.view.controls.align);
    }

    #[test]
    fn status_stop_inverts_the_availability() {
        let mut c = coordinator(above_sky(), true);
        c.handle(Event::LinkLine("STATUS,RUN\n".to_string()));
        c.handle(Event::LinkLine("STATUS,STOP\n".to_string()));
        assert!(!c.view.controls.stop);
        assert!(c.view.controls.track);
        assert!(c.view.controls.align);
    }

    #[test]
    fn malformed_line_changes_nothing() {
        let mut c = coordinator(above_sky(), true);
        let before = c.view.clone();
        c.handle(Event::LinkLine("NOISE,1,2\n".to_string()));
        assert_eq!(c.view.mount_azimuth_deg, before.mount_azimuth_deg);
        assert_eq!(c.view.mount_state, before.mount_state);
    }

    #[test]
    fn retarget_while_connected_sends_stop_before_setpoints() {
        let mut c = coordinator(above_sky(), true);
        c.handle(Event::User(UserCommand::SelectTarget("Venus".to_string())));
        assert_eq!(c.link.sent[0], "S\n");
        assert_eq!(c.view.target, Body::Venus);

        c.handle(Event::PositionTick(PositionSample::new(
            Utc::now(),
            10.0,
            200.0,
            1.0,
        )));
        assert_eq!(c.link.sent[1], "E10.00\n");
    }

    #[test]
    fn unknown_target_keeps_the_previous_selection() {
        let mut c = coordinator(above_sky(), false);
        c.handle(Event::User(UserCommand::SelectTarget("Pluto".to_string())));
        assert_eq!(c.view.target, Body::Moon);
    }

    /// Circumpolar stand-in: always up, never crosses the horizon.
    /// Counts how often the crossing scan runs.
    struct CircumpolarSky {
        scans: Arc<AtomicUsize>,
    }

    impl EphemerisSource for CircumpolarSky {
        fn observe(
            &self,
            _body: Body,
            _site: &ObserverSite,
            at: DateTime<Utc>,
        ) -> Result<PositionSample, EphemerisError> {
            Ok(PositionSample::new(at, 45.0, 180.0, 1.0))
        }

        fn rise_set_window(
            &self,
            _body: Body,
            _site: &ObserverSite,
            _start: DateTime<Utc>,
            _window: Duration,
        ) -> Result<Vec<RiseSetEvent>, EphemerisError> {
            self.scans.fetch_add(1, Ordering::SeqCst);
            Ok(Vec::new())
        }
    }

    #[test]
    fn empty_crossing_window_is_scanned_once_not_every_tick() {
        let scans = Arc::new(AtomicUsize::new(0));
        let sky = CircumpolarSky {
            scans: scans.clone(),
        };
        let tracker = Tracker::new(Arc::new(sky), site(), Body::Moon);
        let (_tx, rx) = mpsc::channel();
        let link = FakeLink {
            connected: false,
            sent: Vec::new(),
        };
        let mut c = Coordinator::new(tracker, link, rx, Box::new(NullPresenter));

        for _ in 0..10 {
            c.handle(Event::PositionTick(PositionSample::new(
                Utc::now(),
                45.0,
                180.0,
                1.0,
            )));
        }

        assert_eq!(scans.load(Ordering::SeqCst), 1);
        assert_eq!(c.view.next_rise, None);
        assert_eq!(c.view.next_set, None);
        assert_eq!(c.view.status_text, "Moon is above the horizon");
    }

    #[test]
    fn construction_picks_up_an_earlier_sample() {
        let tracker = Tracker::new(Arc::new(above_sky()), site(), Body::Moon);
        let sample = tracker.tick().unwrap();
        let (_tx, rx) = mpsc::channel();
        let link = FakeLink {
            connected: false,
            sent: Vec::new(),
        };
        let c = Coordinator::new(tracker, link, rx, Box::new(NullPresenter));
        assert_eq!(c.view.target_position, Some(sample));
    }

    #[test]
    fn disconnect_transition_resets_controller_state() {
        let mut c = coordinator(above_sky(), true);
        c.handle(Event::LinkLine("STATUS,RUN\n".to_string()));
        c.handle(Event::Link(LinkStatus::default()));
        assert_eq!(c.view.mount_state, None);
        assert!(!c.view.controls.stop);
        assert!(c.view.controls.connect);
    }
}
