//! Foundation module - Core utilities and types
//!
//! This module provides fundamental utilities used throughout the pipeline:
//! - Math types and matrix byte views
//! - Stable handle types
//! - Logging utilities

pub mod math;
pub mod collections;
pub mod logging;
