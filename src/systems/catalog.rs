use std::thread::JoinHandle;

use bevy::prelude::*;

use crate::config::{CACHE_TIME_KEY, TrackerConfig};
use crate::satellites::cache::{CatalogOrigin, LoadedCatalog};
use crate::satellites::{CatalogError, ElementSetCache, FileStore, HttpCatalog, KeyValueStore};
use crate::systems::time::Clock;
use crate::systems::tracker::TrackerState;

/// Loads element sets once at startup, off the main thread.
pub struct CatalogPlugin;

impl Plugin for CatalogPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<CatalogStatus>()
            .add_systems(Startup, start)
            .add_systems(Update, poll.run_if(resource_exists::<CatalogTask>));
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum CatalogState {
    Loading,
    Ready { count: usize, origin: CatalogOrigin },
    // the panel keeps showing the loading state, nothing retries
    Unavailable(String),
}

#[derive(Resource, Debug, Clone, PartialEq)]
pub struct CatalogStatus {
    pub state: CatalogState,
    pub last_fetch_ms: Option<i64>,
}

impl Default for CatalogStatus {
    fn default() -> Self {
        Self { state: CatalogState::Loading, last_fetch_ms: None }
    }
}

impl CatalogStatus {
    pub fn is_ready(&self) -> bool {
        matches!(self.state, CatalogState::Ready { .. })
    }
}

#[derive(Resource)]
struct CatalogTask(Option<JoinHandle<Result<LoadedCatalog, CatalogError>>>);

fn start(
    mut commands: Commands,
    config: Res<TrackerConfig>,
    clock: Res<Clock>,
    mut status: ResMut<CatalogStatus>,
) {
    let now_ms = clock.now_ms();

    let mut cache = ElementSetCache::new(
        FileStore::new(&config.cache_dir),
        HttpCatalog::from_config(&config),
        config.cache_ttl_ms,
    );
    status.last_fetch_ms = last_fetch_ms(cache.store());

    // reqwest needs a tokio runtime, so the fetch gets its own thread
    let task = std::thread::spawn(move || -> Result<LoadedCatalog, CatalogError> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;
        runtime.block_on(cache.load(now_ms))
    });

    commands.insert_resource(CatalogTask(Some(task)));
}

fn last_fetch_ms(store: &impl KeyValueStore) -> Option<i64> {
    store.get(CACHE_TIME_KEY).and_then(|ms| ms.trim().parse().ok())
}

fn poll(
    mut commands: Commands,
    mut task: ResMut<CatalogTask>,
    mut status: ResMut<CatalogStatus>,
    mut tracker: ResMut<TrackerState>,
) {
    if !task.0.as_ref().is_some_and(JoinHandle::is_finished) {
        return;
    }
    let Some(handle) = task.0.take() else {
        return;
    };
    commands.remove_resource::<CatalogTask>();

    match handle.join().unwrap_or(Err(CatalogError::Panicked)) {
        Ok(catalog) => {
            info!(
                "Loaded {} element sets from {:?}",
                catalog.records.len(),
                catalog.origin
            );
            status.state = CatalogState::Ready {
                count: catalog.records.len(),
                origin: catalog.origin,
            };
            status.last_fetch_ms = Some(catalog.fetched_at_ms);
            tracker.set_element_sets(catalog.records);
        }
        Err(err) => {
            error!("Failed to fetch TLE data: {err}");
            status.state = CatalogState::Unavailable(err.to_string());
        }
    }
}
