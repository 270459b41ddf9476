// src/config/mod.rs
//! Runtime configuration for the attribution engine and spike detector.

pub mod engine;

pub use engine::EngineConfig;
