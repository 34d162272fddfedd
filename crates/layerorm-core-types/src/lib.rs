//! Core types shared across layerorm facilities
//!
//! This crate provides the canonical field keys and event names used by
//! both the error facility and the logging macros in `layerorm-core`.

pub mod schema;
