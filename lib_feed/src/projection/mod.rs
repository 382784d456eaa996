//! # Projection Module
//!
//! Rendering helpers outside the reconciliation core.
//!
//! - **`links`**: pure formatting of ids, links, fee rates and times.
//! - **`console`**: a terminal `ProjectionSink`.

#![forbid(unsafe_code)]

/// Link, fee-rate and time formatting.
pub mod links;
/// Terminal projection sink.
pub mod console;

pub use console::ConsoleSink;
