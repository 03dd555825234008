//! Keyboard piano practice core: a combo/multiplier streak engine driven by
//! note hits and a decay timer, and an exponential XP leveling curve.

pub mod app;
pub mod config;
pub mod core;
pub mod game;
pub mod ui;
