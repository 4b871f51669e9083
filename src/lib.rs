pub mod api;
pub mod chart;
pub mod config;
pub mod dashboard;
pub mod db;
pub mod interactive;
pub mod recommend;
pub mod report;
pub mod score;
pub mod select;
pub mod table;
pub mod views;

/// Application name for XDG paths
pub const APP_NAME: &str = "greenlight";

/// Movie statistics API used when neither flag nor config names one
pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8000";
