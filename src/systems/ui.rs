use bevy::prelude::*;
use chrono::{DateTime, Local};

use crate::config::TrackerConfig;
use crate::satellites::SatelliteSnapshot;
use crate::systems::catalog::CatalogStatus;
use crate::systems::map::MapView;
use crate::systems::tracker::{ModeRequest, ProximityUpdated, TrackerState, TrackingSet};

pub struct UiPlugin;

impl Plugin for UiPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(Startup, setup_ui).add_systems(
            Update,
            (
                (mode_buttons, mode_keys).before(TrackingSet),
                (update_position, update_last_fetch, update_status),
                rebuild_list.after(TrackingSet),
            ),
        );
    }
}

#[derive(Component)]
struct PositionText;

#[derive(Component)]
struct LastFetchText;

#[derive(Component)]
struct StatusText;

#[derive(Component)]
struct SatelliteList;

#[derive(Component, Clone, Copy)]
struct ModeButton(ModeRequest);

const TEXT_SIZE: f32 = 12.0;
const SMALL_TEXT_SIZE: f32 = 10.0;

fn setup_ui(mut commands: Commands) {
    commands
        .spawn((
            Node {
                position_type: PositionType::Absolute,
                right: Val::Px(0.0),
                width: Val::Px(300.0),
                height: Val::Percent(100.0),
                flex_direction: FlexDirection::Column,
                align_items: AlignItems::Start,
                padding: UiRect::all(Val::Px(16.0)),
                row_gap: Val::Px(6.0),
                overflow: Overflow::scroll_y(),
                ..default()
            },
            BackgroundColor(Color::srgba(0.0, 0.0, 0.0, 0.75)),
        ))
        .with_children(|parent| {
            parent.spawn((
                Text::new("Nearest Satellites"),
                TextFont { font_size: 20.0, ..default() },
                TextColor(Color::WHITE),
            ));
            parent.spawn((
                Text::new("Lat: 0.0000, Lng: 0.0000"),
                TextFont { font_size: TEXT_SIZE, ..default() },
                TextColor(Color::WHITE),
                PositionText,
            ));
            parent.spawn((
                Text::new("Last TLE fetch: Never"),
                TextFont { font_size: SMALL_TEXT_SIZE, ..default() },
                TextColor(Color::srgb(0.7, 0.7, 0.7)),
                LastFetchText,
            ));

            // mode buttons
            parent
                .spawn(Node { column_gap: Val::Px(8.0), ..default() })
                .with_children(|row| {
                    for (label, request) in [("Watch Mode", ModeRequest::Watch), ("Map Mode", ModeRequest::Map)] {
                        row.spawn((
                            Button,
                            ModeButton(request),
                            Node {
                                padding: UiRect::axes(Val::Px(10.0), Val::Px(5.0)),
                                ..default()
                            },
                            BackgroundColor(Color::srgb(0.2, 0.2, 0.25)),
                        ))
                        .with_child((
                            Text::new(label),
                            TextFont { font_size: TEXT_SIZE, ..default() },
                            TextColor(Color::WHITE),
                        ));
                    }
                });

            parent.spawn((
                Text::new(""),
                TextFont { font_size: 14.0, ..default() },
                TextColor(Color::WHITE),
                StatusText,
            ));
            parent.spawn((
                Node {
                    flex_direction: FlexDirection::Column,
                    row_gap: Val::Px(8.0),
                    ..default()
                },
                SatelliteList,
            ));
        });
}

fn mode_buttons(
    buttons: Query<(&Interaction, &ModeButton), Changed<Interaction>>,
    mut requests: EventWriter<ModeRequest>,
) {
    for (interaction, button) in buttons.iter() {
        if *interaction == Interaction::Pressed {
            requests.write(button.0);
        }
    }
}

fn mode_keys(keys: Res<ButtonInput<KeyCode>>, mut requests: EventWriter<ModeRequest>) {
    if keys.just_pressed(KeyCode::KeyW) {
        requests.write(ModeRequest::Watch);
    }
    if keys.just_pressed(KeyCode::KeyM) {
        requests.write(ModeRequest::Map);
    }
}

fn update_position(view: Res<MapView>, mut text: Query<&mut Text, With<PositionText>>) {
    if !view.is_changed() {
        return;
    }
    if let Ok(mut text) = text.single_mut() {
        text.0 = format!("Lat: {:.4}, Lng: {:.4}", view.center.lat, view.center.lng);
    }
}

// e.g. "19 October 2026 14:03:05", local time
fn format_fetch_time(ms: i64) -> Option<String> {
    let at = DateTime::from_timestamp_millis(ms)?.with_timezone(&Local);
    Some(at.format("%-d %B %Y %H:%M:%S").to_string())
}

fn update_last_fetch(status: Res<CatalogStatus>, mut text: Query<&mut Text, With<LastFetchText>>) {
    if !status.is_changed() {
        return;
    }
    if let Ok(mut text) = text.single_mut() {
        let when = status
            .last_fetch_ms
            .and_then(format_fetch_time)
            .unwrap_or_else(|| "Never".to_string());
        text.0 = format!("Last TLE fetch: {when}");
    }
}

fn status_line(tracking: bool, ready: bool, nearby: usize, threshold_km: f64) -> String {
    match (tracking, ready, nearby) {
        (false, _, _) => String::new(),
        (true, false, _) => "Loading satellites...".to_string(),
        (true, true, 0) => format!("No satellites within {threshold_km:.0} km."),
        (true, true, _) => format!("Satellites within {threshold_km:.0} km"),
    }
}

fn update_status(
    tracker: Res<TrackerState>,
    status: Res<CatalogStatus>,
    config: Res<TrackerConfig>,
    mut text: Query<&mut Text, With<StatusText>>,
) {
    let Ok(mut text) = text.single_mut() else { return };

    // an empty or failed catalog keeps the panel loading
    let ready = status.is_ready() && tracker.has_element_sets();
    let line = status_line(tracker.is_active(), ready, tracker.proximity().len(), config.proximity_threshold_km);
    if text.0 != line {
        text.0 = line;
    }
}

fn describe(snapshot: &SatelliteSnapshot) -> String {
    format!(
        "{}\nAltitude: {:.2} km\nSpeed: {:.2} km/h\nDistance: {:.2} km\nNadir: ({:.4}, {:.4})",
        snapshot.name,
        snapshot.altitude_km,
        snapshot.speed_kmh,
        snapshot.distance_km,
        snapshot.nadir_lat,
        snapshot.nadir_lon,
    )
}

fn rebuild_list(
    mut commands: Commands,
    mut updates: EventReader<ProximityUpdated>,
    tracker: Res<TrackerState>,
    list: Query<Entity, With<SatelliteList>>,
) {
    if updates.read().count() == 0 {
        return;
    }
    let Ok(list) = list.single() else { return };

    commands.entity(list).despawn_related::<Children>();
    commands.entity(list).with_children(|parent| {
        for snapshot in tracker.proximity().iter() {
            let dot = tracker
                .slot_of(&snapshot.name)
                .and_then(|slot| Srgba::hex(slot.hex()).ok())
                .map_or(Color::NONE, Color::from);

            parent
                .spawn(Node {
                    column_gap: Val::Px(8.0),
                    align_items: AlignItems::Start,
                    ..default()
                })
                .with_children(|row| {
                    row.spawn((
                        Node {
                            width: Val::Px(10.0),
                            height: Val::Px(10.0),
                            margin: UiRect::top(Val::Px(3.0)),
                            ..default()
                        },
                        BackgroundColor(dot),
                        BorderRadius::MAX,
                    ));
                    row.spawn((
                        Text::new(describe(snapshot)),
                        TextFont { font_size: SMALL_TEXT_SIZE, ..default() },
                        TextColor(Color::WHITE),
                    ));
                });
        }
    });
}
