use bevy::asset::LoadState;
use bevy::prelude::*;

use crate::config::TrackerConfig;
use crate::satellites::MarkerOp;
use crate::systems::tracker::{AudioCueAvailable, MarkerEvent, TrackerState, TrackingSet};

/// Radar ping for satellites entering the geofence.
pub struct AudioCuePlugin;

impl Plugin for AudioCuePlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(Startup, load_cue)
            .add_systems(Update, (watch_cue, play_cues.after(TrackingSet)));
    }
}

#[derive(Resource)]
struct RadarPing(Handle<AudioSource>);

fn load_cue(mut commands: Commands, config: Res<TrackerConfig>, asset_server: Res<AssetServer>) {
    if let Some(path) = &config.audio_cue {
        commands.insert_resource(RadarPing(asset_server.load(path.clone())));
    }
}

// a cue that cannot load just means a silent tracker
fn watch_cue(
    mut commands: Commands,
    ping: Option<Res<RadarPing>>,
    asset_server: Res<AssetServer>,
    mut available: ResMut<AudioCueAvailable>,
    mut tracker: ResMut<TrackerState>,
) {
    let Some(ping) = ping else { return };

    if let LoadState::Failed(err) = asset_server.load_state(&ping.0) {
        warn!("Audio cue unavailable, continuing without sound: {err}");
        commands.remove_resource::<RadarPing>();
        available.0 = false;
        tracker.mute();
    }
}

#[derive(Component)]
struct PingPlayback;

// one ping per frame, restarted rather than layered
fn play_cues(
    mut commands: Commands,
    mut events: EventReader<MarkerEvent>,
    ping: Option<Res<RadarPing>>,
    playing: Query<Entity, With<PingPlayback>>,
) {
    let arrived = events
        .read()
        .any(|MarkerEvent(op)| matches!(op, MarkerOp::Create { audio_cue: true, .. }));

    let Some(ping) = ping else { return };
    if !arrived {
        return;
    }

    for entity in playing.iter() {
        commands.entity(entity).despawn();
    }
    commands.spawn((AudioPlayer::new(ping.0.clone()), PlaybackSettings::DESPAWN, PingPlayback));
}
