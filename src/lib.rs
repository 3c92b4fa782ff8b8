//! Bike-share dock alerts.
//!
//! Checks the TfL cycle hire live feed for one docking station and emails a
//! status update, flagged as a warning when empty docks are at or below a
//! threshold. Also lists and searches stations so the exact name to monitor
//! can be found.

pub mod config;
pub mod fetch;
pub mod lookup;
pub mod monitor;
pub mod notify;
pub mod output;
pub mod parser;
pub mod station;
