use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tokio_util::sync::CancellationToken;

use lepton_common::telemetry::{init_tracing, TelemetryConfig};
use lepton_meta::{BackupSchedule, BlobStore, EtcdMetaStore, FsBlobStore, MemoryMetaStore, MetaStore};

use lepton_apiserver::args::Args;
use lepton_apiserver::handlers::router;
use lepton_apiserver::lifecycle::LifecycleSchedule;
use lepton_apiserver::spawn_background_tasks;
use lepton_apiserver::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let provider = init_tracing(&TelemetryConfig {
        service_name: "lepton-apiserver",
        workspace: &args.workspace_name,
        otlp_endpoint: args.otlp_endpoint.as_deref(),
        otlp_token: args.otlp_token.as_deref(),
    });

    let config = args
        .workspace_config()
        .context("cannot start without a valid workspace state")?;
    tracing::info!(
        workspace = %config.workspace_name,
        namespace = %config.namespace,
        state = %config.state,
        "lepton-apiserver starting"
    );

    let meta: Arc<dyn MetaStore> = match &args.etcd_endpoint {
        Some(endpoint) => Arc::new(EtcdMetaStore::connect(std::slice::from_ref(endpoint)).await?),
        None => {
            tracing::warn!("no etcd endpoint configured, objects are kept in memory only");
            Arc::new(MemoryMetaStore::new())
        }
    };
    let blobs: Arc<dyn BlobStore> = Arc::new(FsBlobStore::new(&args.backup_dir));

    let st = AppState::new(config, meta, blobs);

    if args.restore_from_backup {
        let photons = st.photons.restore().await?;
        let deployments = st.deployments.restore().await?;
        let secrets = st.secrets.restore().await?;
        tracing::info!(photons, deployments, secrets, "restore finished");
    }

    let cancel = CancellationToken::new();
    let tasks = spawn_background_tasks(
        &st,
        BackupSchedule::default(),
        LifecycleSchedule::default(),
        &cancel,
    );

    let listener = tokio::net::TcpListener::bind(&args.listen_addr).await?;
    tracing::info!(addr = %args.listen_addr, "listening");

    let shutdown = cancel.clone();
    axum::serve(listener, router(st))
        .with_graceful_shutdown(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "failed to listen for ctrl-c");
            }
            shutdown.cancel();
        })
        .await?;

    cancel.cancel();
    for t in tasks {
        let _ = t.await;
    }
    if let Some(provider) = provider {
        if let Err(e) = provider.shutdown() {
            eprintln!("failed to shut down tracer provider: {e}");
        }
    }
    Ok(())
}
