//! HTTP front end for the authgate session core.

pub mod api;
pub mod config;
pub mod logging;
pub mod metrics;
