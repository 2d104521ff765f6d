//! Middleware components for the probe endpoint

pub mod logging;
