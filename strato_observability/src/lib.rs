//! Logging and metrics initialization shared by strato services.
//!
//! Services call [`init_observability`] once at startup to configure the
//! tracing subscriber (stdout, plus an optional OTLP layer) and the global
//! meter provider. Libraries only use [`meter`] and the re-exported
//! instrument types.

use std::borrow::Cow;
use std::time::Duration;

use opentelemetry::trace::TracerProvider as _;
use opentelemetry::{InstrumentationScope, global};
use opentelemetry_otlp::{ExporterBuildError, MetricExporter, SpanExporter};
use opentelemetry_sdk::Resource;
use opentelemetry_sdk::metrics::{MeterProviderBuilder, PeriodicReader};
use opentelemetry_sdk::trace::SdkTracerProvider;
use snafu::{ResultExt, Snafu};
use tracing::Subscriber;
use tracing_opentelemetry::MetricsLayer;
use tracing_subscriber::{EnvFilter, Layer};
use tracing_subscriber::{prelude::*, registry::LookupSpan};

pub use opentelemetry::{
    KeyValue,
    metrics::{Counter, Gauge, Histogram, Meter, UpDownCounter},
};

pub use crate::metrics::MetricsExporter;

mod metrics;

const OTEL_SDK_DISABLED: &str = "OTEL_SDK_DISABLED";

pub type BoxedLayer<S> = Box<dyn Layer<S> + Send + Sync>;

#[derive(Debug, Snafu)]
pub enum ObservabilityError {
    #[snafu(display("failed to build otlp exporter"))]
    Exporter { source: ExporterBuildError },
}

/// Returns a meter from the globally configured meter provider.
pub fn meter(name: &'static str) -> Meter {
    global::meter(name)
}

/// Initialize logging and metrics for the calling service.
///
/// Returns the manual metrics reader registered with the global meter
/// provider, so the caller can take in-process metric snapshots.
pub fn init_observability(
    service_name: impl Into<Cow<'static, str>>,
    service_version: impl Into<Cow<'static, str>>,
) -> Result<MetricsExporter, ObservabilityError> {
    // The otel sdk doesn't follow the disabled env variable flag,
    // so we implement it ourselves. Exports are strictly opt-in:
    // unless the variable is set to "false" the sdk stays disabled.
    let sdk_enabled = std::env::var(OTEL_SDK_DISABLED)
        .map(|v| v == "false")
        .unwrap_or(false);

    if std::env::var("RUST_LOG").is_err() {
        unsafe {
            std::env::set_var("RUST_LOG", "info");
        }
    }

    let metrics_exporter = MetricsExporter::default();

    let otel_layer = otel(
        service_name,
        service_version,
        metrics_exporter.clone(),
        sdk_enabled,
    )?;

    tracing_subscriber::registry()
        .with(vec![stdout(), otel_layer])
        .init();

    Ok(metrics_exporter)
}

fn stdout<S>() -> BoxedLayer<S>
where
    S: Subscriber,
    for<'a> S: LookupSpan<'a>,
{
    let log_env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("INFO"));

    let json_fmt = std::env::var("RUST_LOG_FORMAT")
        .map(|val| val == "json")
        .unwrap_or(false);

    if json_fmt {
        tracing_subscriber::fmt::layer()
            .with_ansi(false)
            .with_target(true)
            .json()
            .with_filter(log_env_filter)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .with_target(true)
            .with_filter(log_env_filter)
            .boxed()
    }
}

fn otel<S>(
    service_name: impl Into<Cow<'static, str>>,
    version: impl Into<Cow<'static, str>>,
    additional_reader: MetricsExporter,
    sdk_enabled: bool,
) -> Result<BoxedLayer<S>, ObservabilityError>
where
    S: Subscriber + Send + Sync,
    for<'a> S: LookupSpan<'a>,
{
    let resource = Resource::builder().build();

    // filter traces by crate/level
    let otel_env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("INFO"));

    let instrumentation_lib = InstrumentationScope::builder(service_name.into())
        .with_version(version.into())
        .build();

    let mut trace_provider = SdkTracerProvider::builder().with_resource(resource.clone());

    if sdk_enabled {
        let span_exporter = SpanExporter::builder()
            .with_tonic()
            .build()
            .context(ExporterSnafu {})?;

        trace_provider = trace_provider.with_batch_exporter(span_exporter);
    }

    let tracer = trace_provider.build().tracer_with_scope(instrumentation_lib);

    let mut meter_provider = MeterProviderBuilder::default()
        .with_resource(resource)
        .with_reader(additional_reader);

    if sdk_enabled {
        let metrics_exporter = MetricExporter::builder()
            .with_tonic()
            .build()
            .context(ExporterSnafu {})?;

        let metrics_reader = PeriodicReader::builder(metrics_exporter)
            .with_interval(Duration::from_secs(10))
            .build();

        meter_provider = meter_provider.with_reader(metrics_reader);
    }

    let meter_provider = meter_provider.build();

    global::set_meter_provider(meter_provider.clone());

    let otel_trace_layer = tracing_opentelemetry::layer().with_tracer(tracer);
    let otel_metrics_layer = MetricsLayer::new(meter_provider);
    let otel_layer = otel_env_filter
        .and_then(otel_metrics_layer)
        .and_then(otel_trace_layer)
        .boxed();

    Ok(otel_layer)
}
