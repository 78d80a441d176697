pub mod app;
pub mod config;
pub mod core;
pub mod error;
pub mod fixture;
pub mod genres;
pub mod history;
pub mod model;
pub mod pipeline;
pub mod report;
pub mod spotify;
pub mod stats;
pub mod ui;
