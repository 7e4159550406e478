#![forbid(unsafe_code)]

pub mod config;
pub mod engine;
pub mod errors;
pub mod models;
pub mod orchestrator;
pub mod persistence;
pub mod render;
pub mod runner;
pub mod stream;

pub use config::Settings;
pub use errors::{AppError, Result};
