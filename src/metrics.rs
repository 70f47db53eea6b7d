//! Observability: Prometheus metrics (feature `metrics`) and tracing spans
//! (feature `tracing`).

#[cfg(feature = "metrics")]
pub use prometheus_metrics::{PgUnionMetrics, METRICS};

#[cfg(feature = "metrics")]
mod prometheus_metrics {
    use once_cell::sync::Lazy;
    use opentelemetry::metrics::{Counter, Histogram, Meter, MeterProvider as _};
    use opentelemetry_sdk::metrics::SdkMeterProvider;
    use prometheus::{Encoder, Registry, TextEncoder};
    use std::time::Duration;

    pub static METRICS: Lazy<PgUnionMetrics> = Lazy::new(PgUnionMetrics::init);

    pub struct PgUnionMetrics {
        registry: Registry,
        // Keeps the exporter reader alive.
        _provider: Option<SdkMeterProvider>,
        pub queries_total: Counter<u64>,
        pub query_errors_total: Counter<u64>,
        pub query_duration: Histogram<f64>,
        pub connection_wait_duration: Histogram<f64>,
    }

    impl PgUnionMetrics {
        pub fn init() -> Self {
            let registry = Registry::new();
            let (meter, provider) = match opentelemetry_prometheus::exporter()
                .with_registry(registry.clone())
                .build()
            {
                Ok(exporter) => {
                    let provider = SdkMeterProvider::builder().with_reader(exporter).build();
                    (provider.meter("pgunion"), Some(provider))
                }
                Err(e) => {
                    log::error!("failed to build prometheus exporter, metrics disabled: {e}");
                    (opentelemetry::global::meter("pgunion"), None)
                }
            };
            Self::with_meter(registry, &meter, provider)
        }

        fn with_meter(registry: Registry, meter: &Meter, provider: Option<SdkMeterProvider>) -> Self {
            let queries_total = meter
                .u64_counter("pgunion_queries_total")
                .with_description("Total queries executed")
                .build();

            let query_errors_total = meter
                .u64_counter("pgunion_query_errors_total")
                .with_description("Queries that returned an error")
                .build();

            let query_duration = meter
                .f64_histogram("pgunion_query_duration_seconds")
                .with_description("Duration of queries, hooks included")
                .build();

            let connection_wait_duration = meter
                .f64_histogram("pgunion_connection_wait_seconds")
                .with_description("Time spent until a connection attempt succeeded")
                .build();

            Self {
                registry,
                _provider: provider,
                queries_total,
                query_errors_total,
                query_duration,
                connection_wait_duration,
            }
        }

        pub fn record_query_duration(&self, elapsed: Duration) {
            self.queries_total.add(1, &[]);
            self.query_duration.record(elapsed.as_secs_f64(), &[]);
        }

        pub fn record_query_error(&self) {
            self.query_errors_total.add(1, &[]);
        }

        pub fn record_connection_wait(&self, elapsed: Duration) {
            self.connection_wait_duration.record(elapsed.as_secs_f64(), &[]);
        }

        /// Current values in the Prometheus text format
        ///
        /// # Errors
        ///
        /// Returns the encoder error.
        pub fn render(&self) -> Result<String, prometheus::Error> {
            let mut buffer = Vec::new();
            TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
            Ok(String::from_utf8_lossy(&buffer).into_owned())
        }
    }

}

#[cfg(feature = "tracing")]
pub mod tracing_helpers {
    use tracing::Span;

    /// Span around one statement
    pub fn execute_query_span(query: &str) -> Span {
        tracing::info_span!("execute_query", db.system = "postgresql", db.statement = %query)
    }

    /// Span around connection establishment, retries included
    pub fn acquire_connection_span() -> Span {
        tracing::info_span!("acquire_connection", db.system = "postgresql")
    }
}
