use opentelemetry::trace::TracerProvider as TracerProviderTrait;
use opentelemetry::KeyValue;
use opentelemetry_otlp::{WithExportConfig, WithHttpConfig};
use opentelemetry_sdk::trace::TracerProvider;
use opentelemetry_sdk::Resource;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize tracing, optionally exporting spans over OTLP/HTTP.
///
/// - `service_name`: reported as `service.name` on exported spans
/// - `otlp_endpoint`: base URL of an OTLP/HTTP collector; the exporter appends `/v1/traces`
/// - `otlp_token`: bearer token sent with every export request
///
/// The returned provider must be passed to [`shutdown_tracing`] before exit so
/// buffered spans are flushed.
pub fn init_tracing(
    service_name: &str,
    otlp_endpoint: Option<&str>,
    otlp_token: Option<&str>,
) -> Option<TracerProvider> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let fmt_layer = tracing_subscriber::fmt::layer().with_target(false);

    let Some(endpoint) = otlp_endpoint.filter(|e| !e.is_empty()) else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer)
            .init();
        return None;
    };

    let mut headers = std::collections::HashMap::new();
    if let Some(token) = otlp_token.filter(|t| !t.is_empty()) {
        headers.insert("Authorization".to_string(), format!("Bearer {token}"));
    }

    let exporter = match opentelemetry_otlp::SpanExporter::builder()
        .with_http()
        .with_endpoint(endpoint)
        .with_headers(headers)
        .build()
    {
        Ok(e) => e,
        Err(err) => {
            eprintln!("failed to create OTLP exporter: {err}, falling back to stdout only");
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt_layer)
                .init();
            return None;
        }
    };

    let provider = TracerProvider::builder()
        .with_batch_exporter(exporter, opentelemetry_sdk::runtime::Tokio)
        .with_resource(Resource::new([KeyValue::new(
            "service.name",
            service_name.to_string(),
        )]))
        .build();

    let otel_layer =
        tracing_opentelemetry::layer().with_tracer(provider.tracer(service_name.to_string()));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .with(otel_layer)
        .init();

    tracing::info!(endpoint, service_name, "OTLP tracing enabled");
    Some(provider)
}

pub fn shutdown_tracing(provider: Option<TracerProvider>) {
    if let Some(provider) = provider {
        if let Err(err) = provider.shutdown() {
            eprintln!("failed to flush OTLP spans: {err}");
        }
    }
}
