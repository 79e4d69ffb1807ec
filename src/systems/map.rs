//! map.rs
//!
//! Flat Web-Mercator map host. The world is laid out in zoom-0 pixels
//! (256 units across), the camera looks at the view center and its
//! orthographic scale is 2^-zoom.

use std::collections::HashMap;
use std::f64::consts::PI;

use bevy::prelude::*;
use bevy::window::PrimaryWindow;

use crate::config::{MAX_MAP_LATITUDE, MAX_ZOOM, MIN_ZOOM, PALETTE, TILE_SIZE_PX};
use crate::geo::{LatLng, wrap_longitude};
use crate::satellites::MarkerOp;
use crate::session::ViewCommand;
use crate::systems::tracker::{GeofenceDiameter, MarkerEvent, TrackerState, TrackingSet, ViewEvent};

// marker radius on screen, in logical pixels
const MARKER_RADIUS_PX: f32 = 10.0;
// zoom change per wheel line
const WHEEL_ZOOM_STEP: f64 = 0.25;

pub struct MapPlugin;

impl Plugin for MapPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<MapView>()
            .init_resource::<MarkerIndex>()
            .add_systems(Startup, setup)
            .add_systems(
                Update,
                (
                    (pan_and_zoom, measure_geofence, publish_center)
                        .chain()
                        .before(TrackingSet),
                    (apply_view_commands, apply_marker_ops, sync_camera, scale_markers)
                        .chain()
                        .after(TrackingSet),
                    (draw_graticule, draw_geofence).after(sync_camera),
                ),
            );
    }
}

/// Authoritative view state; the camera follows it.
#[derive(Resource, Debug, Clone, Copy, PartialEq)]
pub struct MapView {
    pub center: LatLng,
    pub zoom: f64,
    pub interactive: bool,
    dragging: bool,
}

impl Default for MapView {
    fn default() -> Self {
        Self {
            center: LatLng::default(),
            zoom: MIN_ZOOM,
            interactive: true,
            dragging: false,
        }
    }
}

impl MapView {
    /// World units per screen pixel.
    pub fn scale(&self) -> f64 {
        2f64.powf(-self.zoom)
    }

    pub fn set_zoom(&mut self, zoom: f64) {
        self.zoom = zoom.clamp(MIN_ZOOM, MAX_ZOOM);
    }

    pub fn set_center(&mut self, center: LatLng) {
        self.center = LatLng::new(
            center.lat.clamp(-MAX_MAP_LATITUDE, MAX_MAP_LATITUDE),
            wrap_longitude(center.lng),
        );
    }

    // screen delta in pixels, y down
    pub fn pan_by(&mut self, delta_px: Vec2) {
        let scale = self.scale();
        let world = project(self.center);
        let moved = world - Vec2::new(delta_px.x, -delta_px.y) * scale as f32;
        self.set_center(unproject(moved));
    }
}

#[derive(Component, Debug)]
pub struct MapMarker;

/// Marker entities by satellite name.
#[derive(Resource, Debug, Default)]
pub struct MarkerIndex(HashMap<String, Entity>);

#[derive(Resource)]
struct MarkerStyle {
    mesh: Handle<Mesh>,
    materials: Vec<Handle<ColorMaterial>>,
}

// https://en.wikipedia.org/wiki/Web_Mercator_projection
pub fn project(point: LatLng) -> Vec2 {
    let lat = point.lat.clamp(-MAX_MAP_LATITUDE, MAX_MAP_LATITUDE).to_radians();
    let x = point.lng / 360.0 * TILE_SIZE_PX;
    let y = (PI / 4.0 + lat / 2.0).tan().ln() / (2.0 * PI) * TILE_SIZE_PX;
    Vec2::new(x as f32, y as f32)
}

pub fn unproject(world: Vec2) -> LatLng {
    let lng = world.x as f64 / TILE_SIZE_PX * 360.0;
    let lat = 2.0 * (world.y as f64 / TILE_SIZE_PX * 2.0 * PI).exp().atan() - PI / 2.0;
    LatLng::new(lat.to_degrees(), lng)
}

fn setup(
    mut commands: Commands,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<ColorMaterial>>,
) {
    commands.spawn(Camera2d);

    let mut palette = Vec::with_capacity(PALETTE.len());
    for (style, hex) in PALETTE {
        let color = Srgba::hex(hex).unwrap_or_else(|_| {
            warn!("Bad palette color {hex} for {style}");
            Srgba::WHITE
        });
        palette.push(materials.add(ColorMaterial::from_color(color)));
    }

    commands.insert_resource(MarkerStyle {
        mesh: meshes.add(Circle::new(1.0)),
        materials: palette,
    });
}

fn pan_and_zoom(
    mut view: ResMut<MapView>,
    mouse_buttons: Res<ButtonInput<MouseButton>>,
    mut cursor_moves: EventReader<CursorMoved>,
    mut scroll_events: EventReader<bevy::input::mouse::MouseWheel>,
) {
    if !view.interactive {
        view.dragging = false;
        cursor_moves.clear();
        scroll_events.clear();
        return;
    }

    if mouse_buttons.just_pressed(MouseButton::Left) {
        view.dragging = true;
    }
    if mouse_buttons.just_released(MouseButton::Left) {
        view.dragging = false;
    }

    for motion in cursor_moves.read() {
        if let (true, Some(delta)) = (view.dragging, motion.delta) {
            view.pan_by(delta);
        }
    }

    for scroll in scroll_events.read() {
        let zoom = view.zoom + scroll.y as f64 * WHEEL_ZOOM_STEP;
        view.set_zoom(zoom);
    }
}

// the geofence is the largest circle that fits the window
fn measure_geofence(window: Query<&Window, With<PrimaryWindow>>, mut diameter: ResMut<GeofenceDiameter>) {
    let Ok(window) = window.single() else { return };
    let size = window.width().min(window.height()) as f64;
    if size > 0.0 && diameter.0 != size {
        diameter.0 = size;
    }
}

fn publish_center(view: Res<MapView>, mut tracker: ResMut<TrackerState>) {
    if view.is_changed() {
        tracker.observe_center(view.center);
    }
}

fn apply_view_commands(mut commands: EventReader<ViewEvent>, mut view: ResMut<MapView>) {
    for ViewEvent(command) in commands.read() {
        match *command {
            ViewCommand::Lock { zoom } => {
                if let Some(zoom) = zoom {
                    view.set_zoom(zoom);
                }
                view.interactive = false;
            }
            ViewCommand::Release { center, zoom } => {
                view.set_center(center);
                view.set_zoom(zoom);
                view.interactive = true;
            }
        }
    }
}

fn apply_marker_ops(
    mut commands: Commands,
    mut events: EventReader<MarkerEvent>,
    mut index: ResMut<MarkerIndex>,
    style: Option<Res<MarkerStyle>>,
    view: Res<MapView>,
    mut markers: Query<&mut Transform, With<MapMarker>>,
) {
    let Some(style) = style else { return };

    for MarkerEvent(op) in events.read() {
        match op {
            MarkerOp::Create { name, position, slot, .. } => {
                let material = style.materials[slot.0 % style.materials.len()].clone();
                let entity = commands
                    .spawn((
                        Mesh2d(style.mesh.clone()),
                        MeshMaterial2d(material),
                        Transform::from_translation(project(*position).extend(1.0))
                            .with_scale(marker_scale(&view)),
                        MapMarker,
                    ))
                    .id();

                if let Some(stale) = index.0.insert(name.clone(), entity) {
                    commands.entity(stale).despawn();
                }
            }
            MarkerOp::Move { name, position } => {
                let Some(&entity) = index.0.get(name) else {
                    warn!("Move for unknown marker {name}");
                    continue;
                };
                if let Ok(mut transform) = markers.get_mut(entity) {
                    transform.translation = project(*position).extend(1.0);
                }
            }
            MarkerOp::Remove { name } => {
                if let Some(entity) = index.0.remove(name) {
                    commands.entity(entity).despawn();
                }
            }
        }
    }
}

fn sync_camera(view: Res<MapView>, mut camera: Query<(&mut Transform, &mut Projection), With<Camera2d>>) {
    if !view.is_changed() {
        return;
    }
    let Ok((mut transform, mut projection)) = camera.single_mut() else { return };

    let center = project(view.center);
    transform.translation.x = center.x;
    transform.translation.y = center.y;

    if let Projection::Orthographic(ortho) = projection.as_mut() {
        ortho.scale = view.scale() as f32;
    }
}

// keep markers the same size on screen whatever the zoom
fn marker_scale(view: &MapView) -> Vec3 {
    Vec3::splat(MARKER_RADIUS_PX * view.scale() as f32)
}

fn scale_markers(view: Res<MapView>, mut markers: Query<&mut Transform, With<MapMarker>>) {
    if !view.is_changed() {
        return;
    }
    let scale = marker_scale(&view);
    for mut transform in markers.iter_mut() {
        transform.scale = scale;
    }
}

fn draw_graticule(mut gizmos: Gizmos) {
    let color = Color::srgba(1.0, 1.0, 1.0, 0.08);

    for lng in (-180..=180).step_by(30) {
        let top = project(LatLng::new(MAX_MAP_LATITUDE, lng as f64));
        let bottom = project(LatLng::new(-MAX_MAP_LATITUDE, lng as f64));
        gizmos.line_2d(bottom, top, color);
    }
    for lat in (-60..=60).step_by(30) {
        let west = project(LatLng::new(lat as f64, -180.0));
        let east = project(LatLng::new(lat as f64, 180.0));
        gizmos.line_2d(west, east, color);
    }
}

fn draw_geofence(mut gizmos: Gizmos, view: Res<MapView>, tracker: Res<TrackerState>) {
    let center = project(view.center);
    let scale = view.scale() as f32;

    // crosshair at the search origin
    let arm = 8.0 * scale;
    let cross = Color::srgb(1.0, 0.3, 0.3);
    gizmos.line_2d(center - Vec2::X * arm, center + Vec2::X * arm, cross);
    gizmos.line_2d(center - Vec2::Y * arm, center + Vec2::Y * arm, cross);

    // the circle keeps the size it had when the session started
    if let Some(session) = tracker.session() {
        let radius = session.on_screen_radius_px() as f32 * scale;
        gizmos.circle_2d(Isometry2d::from_translation(center), radius, Color::srgb(0.2, 0.9, 0.4));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn projection_round_trip() {
        for point in [LatLng::new(0.0, 0.0), LatLng::new(51.5, -0.12), LatLng::new(-33.9, 151.2)] {
            let back = unproject(project(point));
            assert_relative_eq!(back.lat, point.lat, epsilon = 1e-3);
            assert_relative_eq!(back.lng, point.lng, epsilon = 1e-3);
        }
    }

    #[test]
    fn world_is_one_tile_wide() {
        let west = project(LatLng::new(0.0, -180.0));
        let east = project(LatLng::new(0.0, 180.0));
        assert_relative_eq!(east.x - west.x, TILE_SIZE_PX as f32);
    }

    #[test]
    fn view_clamps_to_map_bounds() {
        let mut view = MapView::default();
        view.set_center(LatLng::new(89.0, 200.0));
        assert_eq!(view.center, LatLng::new(MAX_MAP_LATITUDE, -160.0));

        view.set_zoom(0.5);
        assert_eq!(view.zoom, MIN_ZOOM);
    }

    #[test]
    fn dragging_right_moves_center_west() {
        let mut view = MapView::default();
        view.pan_by(Vec2::new(100.0, 0.0));
        assert!(view.center.lng < 0.0);
        assert_relative_eq!(view.center.lat, 0.0, epsilon = 1e-6);
    }
}
