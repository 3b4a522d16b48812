pub mod app;
pub mod config;
pub mod export;
pub mod files;
pub mod sheet;
pub mod state;
pub mod view;
