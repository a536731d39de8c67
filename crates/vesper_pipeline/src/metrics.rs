//! OpenTelemetry instruments for pipeline runs.
//!
//! Instruments are created against the global meter. Until a meter provider
//! is installed they record nothing.

use opentelemetry::{
    KeyValue, global,
    metrics::{Counter, Histogram, Meter},
};
use tracing::debug;

/// Run, refinement and translation metrics.
#[derive(Clone)]
pub struct PipelineMetrics {
    /// Meter handle kept alive for metric instruments
    _meter: Meter,
    /// Runs that created content
    pub runs: Counter<u64>,
    /// Runs that ended in error
    pub failures: Counter<u64>,
    /// Runs that found no eligible source
    pub noops: Counter<u64>,
    /// Run duration in seconds
    pub duration: Histogram<f64>,
    /// Refinements served by a fallback provider
    pub refinement_fallbacks: Counter<u64>,
    /// Per-language translation failures
    pub translation_failures: Counter<u64>,
}

impl PipelineMetrics {
    /// Create new pipeline metrics.
    pub fn new() -> Self {
        debug!("Getting global meter for vesper_pipeline");
        let meter = global::meter("vesper_pipeline");

        let runs = meter
            .u64_counter("pipeline.runs")
            .with_description("Pipeline runs that created content")
            .build();

        let failures = meter
            .u64_counter("pipeline.failures")
            .with_description("Pipeline runs that ended in error")
            .build();

        let noops = meter
            .u64_counter("pipeline.noops")
            .with_description("Pipeline runs with no eligible source")
            .build();

        let duration = meter
            .f64_histogram("pipeline.duration")
            .with_unit("seconds")
            .with_description("Pipeline run duration")
            .build();

        let refinement_fallbacks = meter
            .u64_counter("refinement.fallbacks")
            .with_description("Refinements served by a fallback provider")
            .build();

        let translation_failures = meter
            .u64_counter("translation.failures")
            .with_description("Failed per-language translations")
            .build();

        debug!("PipelineMetrics instruments created");
        Self {
            _meter: meter,
            runs,
            failures,
            noops,
            duration,
            refinement_fallbacks,
            translation_failures,
        }
    }

    /// Record a run that created content.
    pub fn record_success(&self, kind: &str, duration_secs: f64) {
        let labels = &[KeyValue::new("kind", kind.to_string())];
        self.runs.add(1, labels);
        self.duration.record(duration_secs, labels);
    }

    /// Record a failed run.
    pub fn record_failure(&self, kind: &str, stage: &str, duration_secs: f64) {
        let labels = &[
            KeyValue::new("kind", kind.to_string()),
            KeyValue::new("stage", stage.to_string()),
        ];
        self.failures.add(1, labels);
        self.duration.record(duration_secs, &labels[..1]);
    }

    /// Record a run with nothing to do.
    pub fn record_noop(&self, kind: &str) {
        self.noops.add(1, &[KeyValue::new("kind", kind.to_string())]);
    }

    /// Record a refinement served by a fallback provider.
    pub fn record_fallback(&self, provider: &str) {
        self.refinement_fallbacks
            .add(1, &[KeyValue::new("provider", provider.to_string())]);
    }

    /// Record a failed translation.
    pub fn record_translation_failure(&self, language: &str) {
        self.translation_failures
            .add(1, &[KeyValue::new("language", language.to_string())]);
    }
}

impl Default for PipelineMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for PipelineMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineMetrics").finish_non_exhaustive()
    }
}
