//! Log and trace subscriber setup shared by both binaries.

use opentelemetry::trace::TracerProvider;
use opentelemetry_otlp::{Protocol, WithExportConfig};
use opentelemetry_sdk::Resource;
use tracing_subscriber::{fmt::format::FmtSpan, layer::SubscriberExt, util::SubscriberInitExt};

use super::types::Void;

/// Installs the global subscriber.
///
/// Verbosity maps `0 => INFO`, `1 => DEBUG`, anything higher to `TRACE`.
/// When `otlp` is set, spans are also exported over OTLP/HTTP; the exporter
/// picks up the standard `OTEL_EXPORTER_OTLP_*` environment variables.
pub fn init(verbose: u8, service_name: &str, otlp: bool) -> Void {
    // Construct the level filter.

    let level = match verbose {
        0 => tracing::Level::INFO,
        1 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };

    let level_filter = tracing_subscriber::filter::LevelFilter::from_level(level);

    // Prepare the log layer.

    let stdout = tracing_subscriber::fmt::layer()
        .without_time()
        .with_ansi(true)
        .with_level(true)
        .with_file(false)
        .with_target(false)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_span_events(FmtSpan::NEW | FmtSpan::CLOSE);

    // Prepare the otlp layer.

    let otel = if otlp {
        let exporter = opentelemetry_otlp::SpanExporter::builder().with_http().with_protocol(Protocol::HttpBinary).build()?;
        let tracer = opentelemetry_sdk::trace::SdkTracerProvider::builder()
            .with_resource(resource(service_name))
            .with_simple_exporter(exporter)
            .build()
            .tracer(service_name.to_string());
        Some(tracing_opentelemetry::layer().with_tracer(tracer))
    } else {
        None
    };

    tracing_subscriber::registry().with(otel).with(level_filter).with(stdout).try_init()?;

    Ok(())
}

/// The resource attached to every exported span; `service_name` wins over `OTEL_SERVICE_NAME`.
fn resource(service_name: &str) -> Resource {
    Resource::builder().with_service_name(service_name.to_string()).build()
}

// Tests.

#[cfg(test)]
mod tests {
    use opentelemetry::Key;

    use super::*;

    #[test]
    fn test_resource_carries_service_name() {
        let resource = resource("chatrelay-bot");

        assert_eq!(resource.get(&Key::new("service.name")).map(|v| v.to_string()), Some("chatrelay-bot".to_string()));
    }
}
