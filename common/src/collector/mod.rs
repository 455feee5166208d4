// Stat collection and the Prometheus collector built on top of it

mod metrics;
mod service;

#[cfg(test)]
pub(crate) mod fake;

pub use metrics::{SftpCollector, NAMESPACE};
pub use service::{aggregate_objects, filesystem_stats, object_stats};
