// Prometheus collector: one SFTP session per scrape

use super::service::{filesystem_stats, object_stats};
use crate::sftp::{RemoteSession, SessionFactory};
use crate::telemetry;
use prometheus::core::{Collector, Desc};
use prometheus::proto::MetricFamily;
use prometheus::{Gauge, GaugeVec, Opts};
use std::collections::{HashMap, HashSet};
use std::ops::Deref;
use std::time::Instant;
use tracing::{error, info_span, warn};

pub const NAMESPACE: &str = "sftp";
const PATH_LABEL: &str = "path";

struct MetricSpec {
    name: &'static str,
    help: &'static str,
    by_path: bool,
}

const UP: MetricSpec = MetricSpec {
    name: "up",
    help: "Tells if exporter is able to connect to SFTP",
    by_path: false,
};

const FS_TOTAL_SPACE: MetricSpec = MetricSpec {
    name: "filesystem_total_space_bytes",
    help: "Total space in the filesystem containing the path",
    by_path: true,
};

const FS_FREE_SPACE: MetricSpec = MetricSpec {
    name: "filesystem_free_space_bytes",
    help: "Free space in the filesystem containing the path",
    by_path: true,
};

const OBJECT_COUNT: MetricSpec = MetricSpec {
    name: "objects_count_total",
    help: "Total number of objects in the path",
    by_path: true,
};

const OBJECT_SIZE: MetricSpec = MetricSpec {
    name: "objects_size_total_bytes",
    help: "Total size of all objects in the path",
    by_path: true,
};

const SPECS: [&MetricSpec; 5] = [
    &UP,
    &FS_TOTAL_SPACE,
    &FS_FREE_SPACE,
    &OBJECT_COUNT,
    &OBJECT_SIZE,
];

impl MetricSpec {
    fn opts(&self) -> Opts {
        Opts::new(self.name, self.help).namespace(NAMESPACE)
    }

    fn desc(&self) -> prometheus::Result<Desc> {
        let labels = if self.by_path {
            vec![PATH_LABEL.to_string()]
        } else {
            Vec::new()
        };
        Desc::new(
            format!("{}_{}", NAMESPACE, self.name),
            self.help.to_string(),
            labels,
            HashMap::new(),
        )
    }

    /// A single observation, rendered as its own metric family
    fn observe(&self, path: Option<&str>, value: f64) -> prometheus::Result<Vec<MetricFamily>> {
        match path {
            Some(path) => {
                let gauge = GaugeVec::new(self.opts(), &[PATH_LABEL])?;
                gauge.with_label_values(&[path]).set(value);
                Ok(gauge.collect())
            }
            None => {
                let gauge = Gauge::with_opts(self.opts())?;
                gauge.set(value);
                Ok(gauge.collect())
            }
        }
    }
}

/// Closes the session when the scrape ends, including on unwind
struct SessionGuard(Box<dyn RemoteSession>);

impl Deref for SessionGuard {
    type Target = dyn RemoteSession;

    fn deref(&self) -> &Self::Target {
        self.0.as_ref()
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        self.0.close();
    }
}

/// Collector exposing liveness, filesystem and object gauges for the
/// configured remote paths.
///
/// Observations are returned in a fixed order: `up`, then total/free per
/// path, then count/size per path.
pub struct SftpCollector {
    factory: Box<dyn SessionFactory>,
    paths: Vec<String>,
    descs: Vec<Desc>,
}

impl SftpCollector {
    /// Repeated paths are dropped, keeping the first occurrence, so that no
    /// series is exposed twice.
    pub fn new(factory: Box<dyn SessionFactory>, paths: Vec<String>) -> prometheus::Result<Self> {
        let mut seen = HashSet::with_capacity(paths.len());
        let paths: Vec<String> = paths
            .into_iter()
            .filter(|path| {
                let first = seen.insert(path.clone());
                if !first {
                    warn!(path = %path, "Ignoring repeated path");
                }
                first
            })
            .collect();

        let descs = SPECS
            .iter()
            .map(|spec| spec.desc())
            .collect::<prometheus::Result<Vec<_>>>()?;
        Ok(Self {
            factory,
            paths,
            descs,
        })
    }

    fn push(families: &mut Vec<MetricFamily>, spec: &MetricSpec, path: Option<&str>, value: f64) {
        match spec.observe(path, value) {
            Ok(observed) => families.extend(observed),
            Err(e) => error!(error = %e, metric = spec.name, "Failed to build gauge"),
        }
    }
}

impl Collector for SftpCollector {
    fn desc(&self) -> Vec<&Desc> {
        self.descs.iter().collect()
    }

    fn collect(&self) -> Vec<MetricFamily> {
        let _span = info_span!("sftp_collect", paths = self.paths.len()).entered();
        let started = Instant::now();
        let mut families = Vec::new();

        let session = match self.factory.open() {
            Ok(session) => SessionGuard(session),
            Err(e) => {
                error!(error = %e, "failed to create sftp connection");
                Self::push(&mut families, &UP, None, 0.0);
                telemetry::record_scrape(e.label(), started.elapsed().as_secs_f64());
                return families;
            }
        };
        Self::push(&mut families, &UP, None, 1.0);

        for stat in filesystem_stats(&*session, &self.paths) {
            Self::push(&mut families, &FS_TOTAL_SPACE, Some(&stat.path), stat.total_space_bytes);
            Self::push(&mut families, &FS_FREE_SPACE, Some(&stat.path), stat.free_space_bytes);
        }

        for stat in object_stats(&*session, &self.paths) {
            Self::push(&mut families, &OBJECT_COUNT, Some(&stat.path), stat.object_count);
            Self::push(&mut families, &OBJECT_SIZE, Some(&stat.path), stat.object_size_bytes);
        }

        drop(session);
        telemetry::record_scrape("success", started.elapsed().as_secs_f64());
        families
    }
}
