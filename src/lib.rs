//! Air-quality dashboard: load station measurements, filter them by station
//! and date, and describe the resulting charts.
//!
//! The [`data`] module is UI-free and usable on its own; [`views`] composes
//! it into the dashboard outputs, and [`app`] renders them with eframe.

pub mod app;
pub mod color;
pub mod config;
pub mod data;
pub mod state;
pub mod ui;
pub mod views;
