use std::time::Duration;

use bevy::prelude::*;

use crate::config::TrackerConfig;
use crate::satellites::{MarkerOp, Sgp4Model};
use crate::session::{ModeChange, Tracker, TrackingParams, ViewCommand};
use crate::systems::time::Clock;

/// Drives the tracking pipeline from the main loop.
pub struct TrackingPlugin;

impl Plugin for TrackingPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<TrackerConfig>()
            .init_resource::<Clock>()
            .init_resource::<GeofenceDiameter>();

        let config = app.world().resource::<TrackerConfig>().clone();

        app.insert_resource(TrackerState(Tracker::new(Box::new(Sgp4Model), TrackingParams::from(&config))))
            .insert_resource(TickTimer::new(Duration::from_millis(config.tick_period_ms)))
            .insert_resource(AudioCueAvailable(config.audio_cue.is_some()))
            .add_event::<ModeRequest>()
            .add_event::<MarkerEvent>()
            .add_event::<ViewEvent>()
            .add_event::<ProximityUpdated>()
            .add_systems(Update, (handle_mode_requests, run_scheduler).chain().in_set(TrackingSet));
    }
}

#[derive(SystemSet, Debug, Clone, PartialEq, Eq, Hash)]
pub struct TrackingSet;

#[derive(Resource, Deref, DerefMut)]
pub struct TrackerState(pub Tracker);

/// On-screen geofence diameter in logical pixels, kept current by the map host.
#[derive(Resource, Debug, Clone, Copy, PartialEq)]
pub struct GeofenceDiameter(pub f64);

impl Default for GeofenceDiameter {
    fn default() -> Self {
        Self(300.0)
    }
}

/// Whether new sessions play audio cues. Cleared when the cue cannot be loaded.
#[derive(Resource, Debug, Clone, Copy, PartialEq, Eq)]
pub struct AudioCueAvailable(pub bool);

#[derive(Resource)]
pub struct TickTimer {
    timer: Timer,
    // first pass runs as soon as there is something to propagate
    primed: bool,
}

impl TickTimer {
    pub fn new(period: Duration) -> Self {
        let mut timer = Timer::new(period, TimerMode::Repeating);
        timer.pause();
        Self { timer, primed: false }
    }

    fn start(&mut self) {
        self.timer.reset();
        self.timer.unpause();
        self.primed = false;
    }

    fn stop(&mut self) {
        self.timer.pause();
        self.timer.reset();
        self.primed = false;
    }

    pub fn is_running(&self) -> bool {
        !self.timer.paused()
    }
}

#[derive(Event, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModeRequest {
    Watch,
    Map,
}

#[derive(Event, Debug, Clone, PartialEq)]
pub struct MarkerEvent(pub MarkerOp);

#[derive(Event, Debug, Clone, Copy, PartialEq)]
pub struct ViewEvent(pub ViewCommand);

/// Fired after every pass and mode change so views can refresh.
#[derive(Event, Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProximityUpdated;

fn handle_mode_requests(
    mut requests: EventReader<ModeRequest>,
    mut tracker: ResMut<TrackerState>,
    mut timer: ResMut<TickTimer>,
    diameter: Res<GeofenceDiameter>,
    audio: Res<AudioCueAvailable>,
    mut markers: EventWriter<MarkerEvent>,
    mut views: EventWriter<ViewEvent>,
    mut updated: EventWriter<ProximityUpdated>,
) {
    for request in requests.read() {
        let ModeChange { ops, view } = match request {
            ModeRequest::Watch => {
                timer.start();
                tracker.enable(diameter.0, audio.0)
            }
            ModeRequest::Map => {
                // stop first so no pass can land after the reset
                timer.stop();
                tracker.disable()
            }
        };

        markers.write_batch(ops.into_iter().map(MarkerEvent));
        views.write(ViewEvent(view));
        updated.write(ProximityUpdated);
    }
}

fn run_scheduler(
    time: Res<Time>,
    clock: Res<Clock>,
    mut timer: ResMut<TickTimer>,
    mut tracker: ResMut<TrackerState>,
    mut markers: EventWriter<MarkerEvent>,
    mut updated: EventWriter<ProximityUpdated>,
) {
    if !tracker.is_active() || !tracker.has_element_sets() {
        return;
    }

    let first_pass = !timer.primed;
    let due = timer.timer.tick(time.delta()).just_finished();
    if !first_pass && !due {
        return;
    }
    if first_pass {
        timer.primed = true;
        timer.timer.reset();
    }

    if let Some(ops) = tracker.tick(clock.now()) {
        debug!(
            "Tick: {} propagated, {} nearby, {} marker ops",
            tracker.snapshots().len(),
            tracker.proximity().len(),
            ops.len()
        );
        markers.write_batch(ops.into_iter().map(MarkerEvent));
        updated.write(ProximityUpdated);
    }
}

#[cfg(test)]
mod tests {
    use bevy::time::TimeUpdateStrategy;
    use chrono::{DateTime, Utc};

    use super::*;
    use crate::geo::{self, Geodetic, LatLng};
    use crate::satellites::{ElementSetRecord, OrbitModel, PropagationOutcome};

    // every satellite sits at (0, lng) with lng taken from line1
    struct FixedNadir;

    impl OrbitModel for FixedNadir {
        fn propagate(&self, record: &ElementSetRecord, at: DateTime<Utc>) -> PropagationOutcome {
            let Ok(lng) = record.line1.parse::<f64>() else {
                return PropagationOutcome::Failure(crate::satellites::propagation::PropagationFailure::NonFinite);
            };
            let gmst = geo::sidereal_time(at);
            let position = geo::geodetic_to_eci(
                Geodetic { latitude: 0.0, longitude: lng.to_radians(), height: 550.0 },
                gmst,
            );
            PropagationOutcome::Success { position, velocity: [0.0, 7.6, 0.0] }
        }
    }

    fn app_with(satellites: &[(&str, &str)]) -> App {
        let mut app = App::new();
        app.add_plugins(MinimalPlugins)
            .insert_resource(TimeUpdateStrategy::ManualDuration(Duration::from_millis(1000)))
            .insert_resource(Clock::Fixed(
                DateTime::parse_from_rfc3339("2025-01-01T12:00:00Z").unwrap().with_timezone(&Utc),
            ))
            .add_plugins(TrackingPlugin);
        // one update == one second of virtual time
        app.world_mut()
            .resource_mut::<Time<Virtual>>()
            .set_max_delta(Duration::from_secs(10));

        let records: Vec<_> = satellites
            .iter()
            .map(|(name, lng)| ElementSetRecord::new(name, lng, ""))
            .collect();
        let mut tracker = Tracker::new(Box::new(FixedNadir), TrackingParams::default());
        tracker.set_element_sets(records.into());
        app.insert_resource(TrackerState(tracker));
        app
    }

    fn drain_markers(app: &mut App) -> Vec<MarkerOp> {
        app.world_mut()
            .resource_mut::<Events<MarkerEvent>>()
            .drain()
            .map(|event| event.0)
            .collect()
    }

    #[test]
    fn nothing_runs_before_watch_mode() {
        let mut app = app_with(&[("A", "0.5")]);
        for _ in 0..5 {
            app.update();
        }

        assert!(drain_markers(&mut app).is_empty());
        assert!(!app.world().resource::<TickTimer>().is_running());
    }

    #[test]
    fn watch_mode_runs_a_pass_immediately() {
        let mut app = app_with(&[("A", "0.5"), ("B", "40.0"), ("BROKEN", "x")]);
        app.world_mut().send_event(ModeRequest::Watch);
        app.update();

        let ops = drain_markers(&mut app);
        assert_eq!(ops.len(), 1);
        assert!(matches!(&ops[0], MarkerOp::Create { name, .. } if name == "A"));

        let tracker = app.world().resource::<TrackerState>();
        assert_eq!(tracker.snapshots().len(), 2);
        assert!(app.world().resource::<TickTimer>().is_running());
    }

    #[test]
    fn scheduler_follows_the_reference_point() {
        let mut app = app_with(&[("A", "0.5"), ("B", "40.0")]);
        app.world_mut().send_event(ModeRequest::Watch);
        app.update();
        drain_markers(&mut app);

        app.world_mut()
            .resource_mut::<TrackerState>()
            .observe_center(LatLng::new(0.0, 40.2));
        for _ in 0..4 {
            app.update();
        }

        let ops = drain_markers(&mut app);
        assert!(ops.contains(&MarkerOp::Remove { name: "A".into() }));
        assert!(ops.iter().any(|op| matches!(op, MarkerOp::Create { name, .. } if name == "B")));
    }

    #[test]
    fn map_mode_stops_and_clears() {
        let mut app = app_with(&[("A", "0.5")]);
        app.world_mut().send_event(ModeRequest::Watch);
        app.update();
        drain_markers(&mut app);

        app.world_mut().send_event(ModeRequest::Map);
        app.update();

        assert_eq!(drain_markers(&mut app), vec![MarkerOp::Remove { name: "A".into() }]);
        assert!(!app.world().resource::<TickTimer>().is_running());
        assert!(!app.world().resource::<TrackerState>().is_active());

        for _ in 0..5 {
            app.update();
        }
        assert!(drain_markers(&mut app).is_empty());
    }
}
