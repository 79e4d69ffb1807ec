pub mod audio;
pub mod catalog;
pub mod map;
pub mod time;
pub mod tracker;
pub mod ui;
