use crate::error::{AnalysisError, AnalysisResult};
use crate::ml::{PipelineArtifact, SentimentAnalyzer};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Instant;
use sysinfo::System;
use tracing::{info, warn};
use tubesense_core::config::ModelConfig;
use tubesense_core::Sentiment;

/// Default file name of the model validation report.
pub const VALIDATION_REPORT_FILE: &str = "validation_report.json";

/// Default file name of the performance report.
pub const PERFORMANCE_REPORT_FILE: &str = "performance_report.json";

const SMOKE_TEXTS: [&str; 3] = [
    "I love this video! Amazing content!",
    "This is terrible, waste of time",
    "Great tutorial, very helpful",
];

const LATENCY_PROBE: &str = "This is a test comment for performance validation";

/// Labelled sentences alternating positive and negative.
const BENCHMARK_TEXTS: [(&str, Sentiment); 10] = [
    ("I love this video! Amazing content!", Sentiment::Positive),
    ("This is terrible, waste of time", Sentiment::Negative),
    ("Great tutorial, very helpful", Sentiment::Positive),
    ("I hate this, it's awful", Sentiment::Negative),
    ("Excellent work, very informative", Sentiment::Positive),
    ("Poor quality, not worth watching", Sentiment::Negative),
    ("Fantastic explanation, learned a lot", Sentiment::Positive),
    ("Disappointing content, expected more", Sentiment::Negative),
    ("Outstanding video, highly recommend", Sentiment::Positive),
    ("Bad tutorial, confusing explanations", Sentiment::Negative),
];

const BENCHMARK_REPEAT: usize = 10;

/// Outcome of a single validation check.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum CheckStatus {
    /// Check succeeded.
    Passed,
    /// Check failed; blocks deployment.
    Failed,
    /// Check raised a concern without failing.
    Warning,
}

/// One entry of a [`ValidationReport`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ValidationResult {
    /// Artifact file the check applies to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    /// Name of a non-file check.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub test: Option<String>,
    /// Outcome.
    pub status: CheckStatus,
    /// Failure or warning detail.
    pub error: Option<String>,
    /// Detected artifact type.
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub artifact_type: Option<String>,
    /// Measured latency for timing checks.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_time_ms: Option<f64>,
}

impl ValidationResult {
    fn for_file(file: &str, status: CheckStatus, error: Option<String>) -> Self {
        Self {
            file: Some(file.to_string()),
            test: None,
            status,
            error,
            artifact_type: None,
            response_time_ms: None,
        }
    }

    fn for_test(test: &str, status: CheckStatus, error: Option<String>) -> Self {
        Self {
            file: None,
            test: Some(test.to_string()),
            status,
            error,
            artifact_type: None,
            response_time_ms: None,
        }
    }

    /// File or test name.
    pub fn subject(&self) -> &str {
        self.file
            .as_deref()
            .or(self.test.as_deref())
            .unwrap_or("unknown")
    }
}

/// Collected results of [`ModelValidator::run`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ValidationReport {
    /// Every check in execution order.
    pub results: Vec<ValidationResult>,
    /// Number of passed checks.
    pub passed: usize,
    /// Number of failed checks.
    pub failed: usize,
    /// Number of warnings.
    pub warnings: usize,
}

impl ValidationReport {
    fn from_results(results: Vec<ValidationResult>) -> Self {
        let count = |status| results.iter().filter(|r| r.status == status).count();
        Self {
            passed: count(CheckStatus::Passed),
            failed: count(CheckStatus::Failed),
            warnings: count(CheckStatus::Warning),
            results,
        }
    }

    /// True when no check failed.
    pub fn success(&self) -> bool {
        self.failed == 0
    }
}

/// Pre-deployment checks on the model artifacts.
pub struct ModelValidator {
    config: ModelConfig,
    report_path: PathBuf,
}

impl ModelValidator {
    /// Validator over the artifacts named by `config`.
    pub fn new(config: ModelConfig) -> Self {
        Self {
            config,
            report_path: PathBuf::from(VALIDATION_REPORT_FILE),
        }
    }

    /// Write the report somewhere other than the working directory.
    pub fn with_report_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.report_path = path.into();
        self
    }

    /// Run every check and write the JSON report.
    pub fn run(&self) -> AnalysisResult<ValidationReport> {
        let mut results = Vec::new();
        self.check_required_files(&mut results);
        self.check_json_artifacts(&mut results);

        let analyzer = SentimentAnalyzer::load(&self.config)?;
        self.check_functionality(&analyzer, &mut results);
        self.check_latency(&analyzer, &mut results);

        let report = ValidationReport::from_results(results);
        write_json(&self.report_path, &report)?;
        info!(
            "Model validation: {} passed, {} failed, {} warnings",
            report.passed, report.failed, report.warnings
        );
        Ok(report)
    }

    fn check_required_files(&self, results: &mut Vec<ValidationResult>) {
        let name = &self.config.pipeline_file;
        if self.config.pipeline_path().is_file() {
            results.push(ValidationResult::for_file(name, CheckStatus::Passed, None));
        } else {
            warn!("Required artifact {} not found", name);
            results.push(ValidationResult::for_file(
                name,
                CheckStatus::Failed,
                Some("File not found".to_string()),
            ));
        }
    }

    fn check_json_artifacts(&self, results: &mut Vec<ValidationResult>) {
        for name in self.config.tracked_files() {
            if !name.ends_with(".json") {
                continue;
            }
            let path = self.config.artifact_dir.join(&name);
            if !path.is_file() {
                continue;
            }
            results.push(inspect_json_artifact(&name, &path));
        }
    }

    fn check_functionality(&self, analyzer: &SentimentAnalyzer, results: &mut Vec<ValidationResult>) {
        let outcome = SMOKE_TEXTS
            .iter()
            .map(|text| analyzer.analyze(text))
            .collect::<AnalysisResult<Vec<_>>>();
        match outcome {
            Ok(_) => results.push(ValidationResult::for_test(
                "functionality",
                CheckStatus::Passed,
                None,
            )),
            Err(e) => results.push(ValidationResult::for_test(
                "functionality",
                CheckStatus::Failed,
                Some(e.to_string()),
            )),
        }
    }

    fn check_latency(&self, analyzer: &SentimentAnalyzer, results: &mut Vec<ValidationResult>) {
        if !analyzer.is_loaded() {
            return;
        }
        let start = Instant::now();
        let outcome = analyzer.analyze(LATENCY_PROBE);
        let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;

        let mut result = match outcome {
            Err(e) => ValidationResult::for_test("performance", CheckStatus::Failed, Some(e.to_string())),
            Ok(_) if elapsed_ms < 1000.0 => {
                ValidationResult::for_test("performance", CheckStatus::Passed, None)
            }
            Ok(_) => ValidationResult::for_test(
                "performance",
                CheckStatus::Warning,
                Some("Slow response".to_string()),
            ),
        };
        result.response_time_ms = Some(elapsed_ms);
        results.push(result);
    }
}

fn inspect_json_artifact(name: &str, path: &Path) -> ValidationResult {
    if PipelineArtifact::load(path).is_ok() {
        let mut result = ValidationResult::for_file(name, CheckStatus::Passed, None);
        result.artifact_type = Some("Pipeline".to_string());
        return result;
    }
    let parsed = std::fs::read_to_string(path)
        .map_err(AnalysisError::from)
        .and_then(|raw| serde_json::from_str::<serde_json::Value>(&raw).map_err(AnalysisError::from));
    match parsed {
        Ok(value) => {
            let mut result = ValidationResult::for_file(
                name,
                CheckStatus::Warning,
                Some("Not a pipeline".to_string()),
            );
            result.artifact_type = Some(json_kind(&value).to_string());
            result
        }
        Err(e) => ValidationResult::for_file(name, CheckStatus::Failed, Some(e.to_string())),
    }
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Object(_) => "object",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::Bool(_) => "bool",
        serde_json::Value::Null => "null",
    }
}

/// Limits a model must meet to pass performance validation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerformanceThresholds {
    /// Minimum accuracy on the benchmark set.
    pub accuracy: f64,
    /// Maximum mean latency per comment.
    pub response_time_ms: f64,
    /// Minimum comments per second.
    pub throughput_per_second: f64,
    /// Maximum resident memory growth.
    pub memory_usage_mb: f64,
}

impl Default for PerformanceThresholds {
    fn default() -> Self {
        Self {
            accuracy: 0.80,
            response_time_ms: 1000.0,
            throughput_per_second: 10.0,
            memory_usage_mb: 500.0,
        }
    }
}

/// Measured value of one performance metric.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MetricResult {
    /// Measured value.
    pub value: f64,
    /// Limit the value is compared against.
    pub threshold: f64,
    /// Whether the limit was met.
    pub passed: bool,
    /// Whether the measurement could not be taken.
    #[serde(default)]
    pub skipped: bool,
    /// Error raised while measuring.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Smallest sample, for timing metrics.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    /// Largest sample, for timing metrics.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
}

impl MetricResult {
    fn measured(value: f64, threshold: f64, passed: bool) -> Self {
        Self {
            value,
            threshold,
            passed,
            skipped: false,
            error: None,
            min: None,
            max: None,
        }
    }

    fn failed(threshold: f64, error: &AnalysisError) -> Self {
        Self {
            value: 0.0,
            threshold,
            passed: false,
            skipped: false,
            error: Some(error.to_string()),
            min: None,
            max: None,
        }
    }

    fn skipped(threshold: f64) -> Self {
        Self {
            value: 0.0,
            threshold,
            passed: true,
            skipped: true,
            error: None,
            min: None,
            max: None,
        }
    }
}

/// Metrics produced by [`PerformanceValidator::run`], keyed by metric name.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct PerformanceReport {
    /// Metric results.
    pub metrics: BTreeMap<String, MetricResult>,
}

impl PerformanceReport {
    /// True when every metric passed.
    pub fn success(&self) -> bool {
        self.metrics.values().all(|m| m.passed)
    }
}

/// Benchmarks accuracy, latency, throughput and memory of the model.
pub struct PerformanceValidator {
    config: ModelConfig,
    thresholds: PerformanceThresholds,
    report_path: PathBuf,
}

impl PerformanceValidator {
    /// Validator over the model named by `config` with default thresholds.
    pub fn new(config: ModelConfig) -> Self {
        Self {
            config,
            thresholds: PerformanceThresholds::default(),
            report_path: PathBuf::from(PERFORMANCE_REPORT_FILE),
        }
    }

    /// Override the pass thresholds.
    pub fn with_thresholds(mut self, thresholds: PerformanceThresholds) -> Self {
        self.thresholds = thresholds;
        self
    }

    /// Write the report somewhere other than the working directory.
    pub fn with_report_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.report_path = path.into();
        self
    }

    /// Run all benchmarks and write the JSON report.
    pub fn run(&self) -> AnalysisResult<PerformanceReport> {
        let cases = benchmark_cases();
        let analyzer = SentimentAnalyzer::load(&self.config)?;

        let mut metrics = BTreeMap::new();
        metrics.insert("accuracy".to_string(), self.accuracy(&analyzer, &cases));
        metrics.insert(
            "response_time_ms".to_string(),
            self.response_time(&analyzer, &cases),
        );
        metrics.insert(
            "throughput_per_second".to_string(),
            self.throughput(&analyzer, &cases),
        );
        metrics.insert("memory_usage_mb".to_string(), self.memory_usage(&cases));

        let report = PerformanceReport { metrics };
        write_json(&self.report_path, &report)?;
        let passed = report.metrics.values().filter(|m| m.passed).count();
        info!(
            "Performance validation: {}/{} metrics passed",
            passed,
            report.metrics.len()
        );
        Ok(report)
    }

    fn accuracy(&self, analyzer: &SentimentAnalyzer, cases: &[(&str, Sentiment)]) -> MetricResult {
        let threshold = self.thresholds.accuracy;
        let mut correct = 0usize;
        for (text, expected) in cases {
            match analyzer.analyze(text) {
                Ok(predicted) if predicted == *expected => correct += 1,
                Ok(_) => {}
                Err(e) => return MetricResult::failed(threshold, &e),
            }
        }
        let accuracy = if cases.is_empty() {
            0.0
        } else {
            correct as f64 / cases.len() as f64
        };
        MetricResult::measured(accuracy, threshold, accuracy >= threshold)
    }

    fn response_time(&self, analyzer: &SentimentAnalyzer, cases: &[(&str, Sentiment)]) -> MetricResult {
        let threshold = self.thresholds.response_time_ms;
        let mut samples = Vec::with_capacity(50);
        for (text, _) in cases.iter().take(50) {
            let start = Instant::now();
            if let Err(e) = analyzer.analyze(text) {
                return MetricResult::failed(threshold, &e);
            }
            samples.push(start.elapsed().as_secs_f64() * 1000.0);
        }
        if samples.is_empty() {
            return MetricResult::skipped(threshold);
        }
        let mean = samples.iter().sum::<f64>() / samples.len() as f64;
        let mut result = MetricResult::measured(mean, threshold, mean <= threshold);
        result.min = samples.iter().copied().reduce(f64::min);
        result.max = samples.iter().copied().reduce(f64::max);
        result
    }

    fn throughput(&self, analyzer: &SentimentAnalyzer, cases: &[(&str, Sentiment)]) -> MetricResult {
        let threshold = self.thresholds.throughput_per_second;
        let texts: Vec<&str> = cases.iter().take(100).map(|(text, _)| *text).collect();
        let start = Instant::now();
        if let Err(e) = analyzer.analyze_batch(&texts) {
            return MetricResult::failed(threshold, &e);
        }
        let elapsed = start.elapsed().as_secs_f64().max(1e-9);
        let per_second = texts.len() as f64 / elapsed;
        MetricResult::measured(per_second, threshold, per_second >= threshold)
    }

    /// RSS growth across loading a fresh analyzer and scoring 50 comments.
    fn memory_usage(&self, cases: &[(&str, Sentiment)]) -> MetricResult {
        let threshold = self.thresholds.memory_usage_mb;
        let Some(before) = process_rss_mb() else {
            warn!("Process memory unavailable, skipping memory check");
            return MetricResult::skipped(threshold);
        };

        let analyzer = match SentimentAnalyzer::load(&self.config) {
            Ok(analyzer) => analyzer,
            Err(e) => return MetricResult::failed(threshold, &e),
        };
        for (text, _) in cases.iter().take(50) {
            if let Err(e) = analyzer.analyze(text) {
                return MetricResult::failed(threshold, &e);
            }
        }

        let Some(after) = process_rss_mb() else {
            return MetricResult::skipped(threshold);
        };
        let used = (after - before).max(0.0);
        MetricResult::measured(used, threshold, used <= threshold)
    }
}

fn benchmark_cases() -> Vec<(&'static str, Sentiment)> {
    std::iter::repeat(BENCHMARK_TEXTS)
        .take(BENCHMARK_REPEAT)
        .flatten()
        .collect()
}

fn process_rss_mb() -> Option<f64> {
    let pid = sysinfo::get_current_pid().ok()?;
    let mut system = System::new();
    if !system.refresh_process(pid) {
        return None;
    }
    system
        .process(pid)
        .map(|process| process.memory() as f64 / 1024.0 / 1024.0)
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> AnalysisResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, serde_json::to_string_pretty(value)?)?;
    Ok(())
}
