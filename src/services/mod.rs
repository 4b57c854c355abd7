// src/services/mod.rs

pub mod tracker;

pub use tracker::{ProgressTracker, TrackerError};
