//! Standardized metrics collection and reporting for CI/CD integration.
//!
//! Worldtests export one report each as pretty JSON under `target/metrics/`
//! for regression detection.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use stratavox_core::WorldSeed;
use tracing::debug;

/// Top-level metrics report containing all subsystem metrics.
///
/// This is the standardized format for metrics.json files exported by tests.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsReport {
    /// Test/benchmark identifier
    pub test_name: String,

    /// Timestamp when metrics were collected (ISO 8601)
    pub timestamp: String,

    /// World seed the test ran with
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<WorldSeed>,

    /// Overall test result
    pub result: TestResult,

    /// Terrain generation metrics
    #[serde(skip_serializing_if = "Option::is_none")]
    pub terrain: Option<TerrainMetrics>,

    /// Chunk store metrics
    #[serde(skip_serializing_if = "Option::is_none")]
    pub store: Option<StoreMetrics>,

    /// Block picking metrics
    #[serde(skip_serializing_if = "Option::is_none")]
    pub picking: Option<PickMetrics>,

    /// Test execution metrics
    pub test_execution: TestExecutionMetrics,
}

/// Overall test result status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TestResult {
    /// Test passed all validations
    Pass,
    /// Test failed
    Fail,
    /// Test was skipped
    Skip,
}

impl TestResult {
    /// `Pass` when `ok`, otherwise `Fail`.
    pub fn from_bool(ok: bool) -> Self {
        if ok {
            TestResult::Pass
        } else {
            TestResult::Fail
        }
    }
}

/// Terrain generation performance and quality metrics
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TerrainMetrics {
    /// Total chunks generated
    pub chunks_generated: usize,

    /// Total blocks generated
    pub blocks_generated: usize,

    /// Average generation time per chunk (microseconds)
    pub avg_gen_time_us: f64,

    /// Min generation time (microseconds)
    pub min_gen_time_us: u128,

    /// Max generation time (microseconds)
    pub max_gen_time_us: u128,

    /// Chunks per second throughput
    pub chunks_per_second: f64,

    /// Number of unique biomes present
    pub unique_biomes: usize,

    /// Blocks compared against an independent regeneration
    pub blocks_compared: usize,

    /// Blocks that differed from the independent regeneration
    pub block_mismatches: usize,
}

impl TerrainMetrics {
    /// Fill the timing fields from per-chunk generation times.
    pub fn with_timings(mut self, times_us: &[u128]) -> Self {
        if times_us.is_empty() {
            return self;
        }
        let total: u128 = times_us.iter().sum();
        self.avg_gen_time_us = total as f64 / times_us.len() as f64;
        self.min_gen_time_us = times_us.iter().copied().min().unwrap_or_default();
        self.max_gen_time_us = times_us.iter().copied().max().unwrap_or_default();
        self.chunks_per_second = if total == 0 {
            0.0
        } else {
            times_us.len() as f64 / (total as f64 / 1_000_000.0)
        };
        self
    }
}

/// Chunk store lifecycle metrics
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreMetrics {
    /// Generation worker threads
    pub worker_threads: usize,

    /// Concurrent requesters in the test
    pub requesters: usize,

    /// Generator invocations
    pub generations: u64,

    /// Chunks evicted
    pub evictions: u64,

    /// Chunks resident at the end of the test
    pub resident: usize,

    /// Unloads deferred because the chunk was still generating
    pub deferred_unloads: usize,
}

/// Block picking metrics
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PickMetrics {
    /// Rays cast
    pub rays_cast: usize,

    /// Rays that struck a solid block
    pub hits: usize,

    /// Average pick time (microseconds)
    pub avg_pick_time_us: f64,
}

/// Test execution and infrastructure metrics
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TestExecutionMetrics {
    /// Total test duration (seconds)
    pub duration_seconds: f64,

    /// Number of assertions checked
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assertions_checked: Option<usize>,

    /// Number of validations passed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub validations_passed: Option<usize>,
}

/// Builder for constructing metrics reports
pub struct MetricsReportBuilder {
    report: MetricsReport,
}

impl MetricsReportBuilder {
    /// Create a new builder with test name
    pub fn new(test_name: impl Into<String>) -> Self {
        Self {
            report: MetricsReport {
                test_name: test_name.into(),
                timestamp: chrono::Utc::now().to_rfc3339(),
                seed: None,
                result: TestResult::Pass,
                terrain: None,
                store: None,
                picking: None,
                test_execution: TestExecutionMetrics::default(),
            },
        }
    }

    /// Set test result
    pub fn result(mut self, result: TestResult) -> Self {
        self.report.result = result;
        self
    }

    /// Set world seed
    pub fn seed(mut self, seed: WorldSeed) -> Self {
        self.report.seed = Some(seed);
        self
    }

    /// Set terrain metrics
    pub fn terrain(mut self, metrics: TerrainMetrics) -> Self {
        self.report.terrain = Some(metrics);
        self
    }

    /// Set store metrics
    pub fn store(mut self, metrics: StoreMetrics) -> Self {
        self.report.store = Some(metrics);
        self
    }

    /// Set picking metrics
    pub fn picking(mut self, metrics: PickMetrics) -> Self {
        self.report.picking = Some(metrics);
        self
    }

    /// Set test execution metrics
    pub fn execution(mut self, metrics: TestExecutionMetrics) -> Self {
        self.report.test_execution = metrics;
        self
    }

    /// Build the metrics report
    pub fn build(self) -> MetricsReport {
        self.report
    }
}

/// Sink for writing metrics reports to JSON files
pub struct MetricsSink {
    path: PathBuf,
}

impl MetricsSink {
    /// Create a new metrics sink at the specified path
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }

        Ok(Self { path })
    }

    /// Sink for `target/metrics/<name>.json` under the current directory.
    pub fn for_test(name: &str) -> Result<Self> {
        let dir = std::env::current_dir().context("resolving current directory")?;
        Self::create(dir.join("target/metrics").join(format!("{name}.json")))
    }

    /// Destination file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write metrics report to file
    pub fn write(&self, report: &MetricsReport) -> Result<()> {
        let json = serde_json::to_string_pretty(report)?;
        let mut file = File::create(&self.path)
            .with_context(|| format!("creating {}", self.path.display()))?;
        file.write_all(json.as_bytes())?;
        debug!(path = %self.path.display(), test = %report.test_name, "metrics written");
        Ok(())
    }
}
