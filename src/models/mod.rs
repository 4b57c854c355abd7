// src/models/mod.rs

pub mod progress;
