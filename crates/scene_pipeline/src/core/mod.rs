//! # Core Module
//!
//! Shared configuration for the scene pipeline.

pub mod config;

pub use config::{DebugChecks, PipelineConfig, MAX_FRAMES_IN_FLIGHT, MIN_FRAMES_IN_FLIGHT};
