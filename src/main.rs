use bevy::prelude::*;

use proxtrack::config::{CONFIG_FILE, TrackerConfig};
use proxtrack::systems::audio::AudioCuePlugin;
use proxtrack::systems::catalog::CatalogPlugin;
use proxtrack::systems::map::MapPlugin;
use proxtrack::systems::time::ClockPlugin;
use proxtrack::systems::tracker::TrackingPlugin;
use proxtrack::systems::ui::UiPlugin;

fn main() -> bevy::app::AppExit {
    let config = TrackerConfig::load_or_default(CONFIG_FILE);

    App::new()
        .add_plugins(DefaultPlugins.set(WindowPlugin {
            primary_window: Some(Window {
                title: "Nearest Satellites".into(),
                ..default()
            }),
            ..default()
        }))
        .insert_resource(ClearColor(Color::srgb(0.05, 0.07, 0.1)))
        .insert_resource(config)
        // tracking owns the shared state the others read
        .add_plugins((ClockPlugin, TrackingPlugin))
        .add_plugins((CatalogPlugin, MapPlugin, AudioCuePlugin, UiPlugin))
        .run()
}
