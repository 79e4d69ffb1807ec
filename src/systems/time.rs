//! time.rs
//!
//! Wall clock used for propagation and cache freshness.
//! Pinning it makes whole-app runs reproducible.

use bevy::prelude::*;
use chrono::{DateTime, Utc};

pub struct ClockPlugin;

impl Plugin for ClockPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<Clock>();
    }
}

#[derive(Resource, Debug, Clone, Copy, Default, PartialEq)]
pub enum Clock {
    #[default]
    System,
    Fixed(DateTime<Utc>),
}

impl Clock {
    pub fn now(&self) -> DateTime<Utc> {
        match self {
            Clock::System => Utc::now(),
            Clock::Fixed(at) => *at,
        }
    }

    pub fn now_ms(&self) -> i64 {
        self.now().timestamp_millis()
    }
}
