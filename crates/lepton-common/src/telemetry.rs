use opentelemetry::trace::TracerProvider as TracerProviderTrait;
use opentelemetry::KeyValue;
use opentelemetry_otlp::{WithExportConfig, WithHttpConfig};
use opentelemetry_sdk::trace::TracerProvider;
use opentelemetry_sdk::Resource;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Where and as whom to report traces.
#[derive(Debug, Clone, Default)]
pub struct TelemetryConfig<'a> {
    /// Identifies this component, e.g. "lepton-apiserver".
    pub service_name: &'a str,
    /// Workspace the process serves; attached to every exported span.
    pub workspace: &'a str,
    /// OTLP/HTTP base URL. The exporter appends `/v1/traces`.
    pub otlp_endpoint: Option<&'a str>,
    /// Bearer token for the OTLP collector.
    pub otlp_token: Option<&'a str>,
}

/// Installs the global tracing subscriber.
///
/// Logs go to stdout filtered by `RUST_LOG` (default `info`). With an OTLP
/// endpoint, spans are exported as well; the returned provider must be
/// kept alive and shut down before exit.
pub fn init_tracing(cfg: &TelemetryConfig<'_>) -> Option<TracerProvider> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let fmt_layer = tracing_subscriber::fmt::layer();

    let Some(endpoint) = cfg.otlp_endpoint else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer)
            .init();
        return None;
    };

    let mut headers = std::collections::HashMap::new();
    if let Some(token) = cfg.otlp_token.filter(|t| !t.is_empty()) {
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
            eprintln!("failed to create OTLP exporter: {err}, logging to stdout only");
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt_layer)
                .init();
            return None;
        }
    };

    let provider = TracerProvider::builder()
        .with_batch_exporter(exporter, opentelemetry_sdk::runtime::Tokio)
        .with_resource(Resource::new([
            KeyValue::new("service.name", cfg.service_name.to_string()),
            KeyValue::new("lepton.workspace", cfg.workspace.to_string()),
        ]))
        .build();

    let otel_layer =
        tracing_opentelemetry::layer().with_tracer(provider.tracer(cfg.service_name.to_string()));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .with(otel_layer)
        .init();

    tracing::info!(endpoint, service_name = cfg.service_name, "OTLP tracing enabled");
    Some(provider)
}
