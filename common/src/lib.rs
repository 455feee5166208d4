// Common library for the SFTP exporter: configuration, SFTP sessions and
// the Prometheus collector

pub mod collector;
pub mod config;
pub mod errors;
pub mod models;
pub mod sftp;
pub mod telemetry;
