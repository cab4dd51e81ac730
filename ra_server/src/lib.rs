//! HTTP front end for the rotating session service.

pub mod alerts;
pub mod api;
pub mod config;
pub mod logging;
pub mod metrics;
