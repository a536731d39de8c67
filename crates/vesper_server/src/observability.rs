//! OpenTelemetry metrics initialization.

#[cfg(feature = "metrics")]
use opentelemetry::{KeyValue, global};
#[cfg(feature = "metrics")]
use opentelemetry_otlp::{MetricExporter as OtlpExporter, WithExportConfig};
#[cfg(feature = "metrics")]
use opentelemetry_sdk::{
    Resource,
    metrics::{PeriodicReader, SdkMeterProvider},
};
#[cfg(feature = "metrics")]
use opentelemetry_stdout::MetricExporter as StdoutExporter;
#[cfg(feature = "metrics")]
use std::time::Duration;
#[cfg(feature = "metrics")]
use tracing::debug;
use tracing::{info, instrument};
use vesper_error::ConfigError;

/// Installs a global meter provider so pipeline instruments export.
///
/// `OTEL_EXPORTER` picks the exporter:
/// - `otlp`: HTTP export to `OTEL_EXPORTER_OTLP_ENDPOINT`
///   (default `http://localhost:4318`)
/// - `stdout` or unset: periodic dump to stdout
///
/// Without the `metrics` feature this only logs and returns `Ok(())`.
///
/// # Errors
///
/// Returns a [`ConfigError`] if the OTLP exporter cannot be built.
#[instrument(skip_all, fields(service_name))]
pub fn init_observability(
    service_name: &'static str,
    export_interval_secs: u64,
) -> Result<(), ConfigError> {
    #[cfg(not(feature = "metrics"))]
    {
        info!(
            service_name,
            export_interval_secs, "Metrics feature disabled, instruments are no-ops"
        );
        Ok(())
    }

    #[cfg(feature = "metrics")]
    {
        let resource = Resource::builder_empty()
            .with_attributes([KeyValue::new("service.name", service_name)])
            .build();
        let interval = Duration::from_secs(export_interval_secs);

        let exporter_type = std::env::var("OTEL_EXPORTER").unwrap_or_else(|_| "stdout".to_string());
        info!(exporter_type = %exporter_type, export_interval_secs, "Initializing metrics");

        let meter_provider = match exporter_type.as_str() {
            "otlp" => {
                let endpoint = std::env::var("OTEL_EXPORTER_OTLP_ENDPOINT")
                    .unwrap_or_else(|_| "http://localhost:4318".to_string());
                let exporter = OtlpExporter::builder()
                    .with_http()
                    .with_endpoint(&endpoint)
                    .with_timeout(Duration::from_secs(10))
                    .build()
                    .map_err(|e| {
                        ConfigError::new(format!("Failed to create OTLP exporter: {}", e))
                    })?;
                debug!(endpoint = %endpoint, "OTLP metric exporter created");

                SdkMeterProvider::builder()
                    .with_resource(resource)
                    .with_reader(PeriodicReader::builder(exporter).with_interval(interval).build())
                    .build()
            }
            _ => SdkMeterProvider::builder()
                .with_resource(resource)
                .with_reader(
                    PeriodicReader::builder(StdoutExporter::default())
                        .with_interval(interval)
                        .build(),
                )
                .build(),
        };

        global::set_meter_provider(meter_provider);
        info!(service_name, "Meter provider registered globally");
        Ok(())
    }
}

/// Logs shutdown; the provider flushes when dropped.
#[instrument]
pub fn shutdown_observability() {
    info!("Shutting down metrics");
}
