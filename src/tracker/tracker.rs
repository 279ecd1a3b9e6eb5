use std::sync::mpsc::Sender;
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration, Utc};

use crate::coordinator::Event;
use crate::ephemeris::{
    Body, EphemerisError, EphemerisSource, ObserverSite, PositionSample, RiseSetEvent,
};

const TICK_INTERVAL: StdDuration = StdDuration::from_secs(1);
const RISE_SET_WINDOW_HOURS: i64 = 24;

#[derive(Debug)]
struct Shared {
    target: Body,
    last_sample: Option<PositionSample>,
    rise_set: Vec<RiseSetEvent>,
    /// End of the window the cached crossings cover; `None` until the
    /// first computation. An empty cache inside a valid window is a
    /// circumpolar or never-up body, not staleness.
    rise_set_valid_until: Option<DateTime<Utc>>,
}

/// Owns the selected target and polls the ephemeris once per second.
/// Cloned between the polling thread and the coordinator; all mutable
/// state sits behind one lock.
#[derive(Clone)]
pub struct Tracker {
    ephemeris: Arc<dyn EphemerisSource>,
    site: ObserverSite,
    shared: Arc<Mutex<Shared>>,
}

impl Tracker {
    pub fn new(ephemeris: Arc<dyn EphemerisSource>, site: ObserverSite, target: Body) -> Self {
        Self {
            ephemeris,
            site,
            shared: Arc::new(Mutex::new(Shared {
                target,
                last_sample: None,
                rise_set: Vec::new(),
                rise_set_valid_until: None,
            })),
        }
    }

    pub fn target(&self) -> Body {
        self.shared.lock().unwrap().target
    }

    /// Re-resolve and switch the target. On failure the current selection
    /// is left untouched. The rise/set cache is cleared on success; the
    /// caller recomputes it before relying on countdowns.
    pub fn select(&self, name: &str) -> Result<Body, EphemerisError> {
        let body = self.ephemeris.resolve(name)?;
        let mut shared = self.shared.lock().unwrap();
        shared.target = body;
        shared.rise_set.clear();
        shared.rise_set_valid_until = None;
        Ok(body)
    }

    /// Observe the current target now. Adapter failures propagate; a
    /// tracker that silently kept going would feed the mount stale data.
    pub fn tick(&self) -> Result<PositionSample, EphemerisError> {
        let target = self.target();
        let sample = self.ephemeris.observe(target, &self.site, Utc::now())?;
        self.shared.lock().unwrap().last_sample = Some(sample);
        Ok(sample)
    }

    pub fn last_sample(&self) -> Option<PositionSample> {
        self.shared.lock().unwrap().last_sample
    }

    /// Recompute horizon crossings over the next 24 hours and cache them.
    pub fn rise_set(&self, now: DateTime<Utc>) -> Result<Vec<RiseSetEvent>, EphemerisError> {
        let target = self.target();
        let events = self.ephemeris.rise_set_window(
            target,
            &self.site,
            now,
            Duration::hours(RISE_SET_WINDOW_HOURS),
        )?;
        let mut shared = self.shared.lock().unwrap();
        shared.rise_set = events.clone();
        shared.rise_set_valid_until = Some(now + Duration::hours(RISE_SET_WINDOW_HOURS));
        Ok(events)
    }

    pub fn cached_rise_set(&self) -> Vec<RiseSetEvent> {
        self.shared.lock().unwrap().rise_set.clone()
    }

    pub fn rise_set_valid_until(&self) -> Option<DateTime<Utc>> {
        self.shared.lock().unwrap().rise_set_valid_until
    }

    /// Start the 1 Hz polling loop. One sample per tick goes into the
    /// queue; the queue is unbounded so a slow consumer delays, never
    /// drops, samples. The loop ends when the consumer side is gone.
    pub fn spawn(&self, events: Sender<Event>) -> JoinHandle<()> {
        let tracker = self.clone();
        std::thread::spawn(move || loop {
            std::thread::sleep(TICK_INTERVAL);
            match tracker.tick() {
                Ok(sample) => {
                    if events.send(Event::PositionTick(sample)).is_err() {
                        break;
                    }
                }
                Err(e) => log::error!("tick failed: {e}"),
            }
        })
    }
}
