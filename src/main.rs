use anyhow::{Context, Result};
use clap::Parser;
use kube_stress::cli::Cli;
use kube_stress::dispatch::Dispatcher;
use kube_stress::kube::{build_pool, KubeConfig};
use kube_stress::report::{print_summary, LatencyRecorder};
use kube_stress::signal::spawn_interrupt_listener;
use std::sync::Arc;
use tracing::info;

// =============================================================================
// Main
// =============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    // Everything below can fail; nothing is started until it has all succeeded.
    let config = cli.run_config().context("Invalid run parameters")?;

    let kubeconfig_path = cli.kubeconfig_path();
    let kubeconfig = KubeConfig::load(&kubeconfig_path)
        .with_context(|| format!("Failed to load kubeconfig {:?}", kubeconfig_path))?;

    let pool = build_pool(&kubeconfig, config.pool_size).context("Failed to create clients")?;

    let recorder = match &cli.latency_file {
        Some(path) => LatencyRecorder::with_csv_file(path)
            .with_context(|| format!("Failed to create latency file {:?}", path))?,
        None => LatencyRecorder::new()?,
    };
    let recorder = Arc::new(recorder);

    // Print banner
    info!("════════════════════════════════════════════════════════════");
    info!("                       KUBE STRESS");
    info!("════════════════════════════════════════════════════════════");
    info!("Server: {}", kubeconfig.server);
    info!("Action: {}", config.request);
    info!("Clients: {}", config.pool_size);
    info!("QPS: {}", config.rate);
    info!("Run: {}", config.stop);
    info!("Request timeout: {:?}", config.request_timeout);
    if let Some(path) = &cli.latency_file {
        info!("Latency file: {:?}", path);
    }
    info!("════════════════════════════════════════════════════════════");

    let dispatcher = Dispatcher::new(&config, pool, Arc::clone(&recorder));
    let listener = spawn_interrupt_listener(dispatcher.signal());

    let summary = dispatcher.run().await;

    listener.await.context("Interrupt listener panicked")?;
    recorder
        .flush()
        .await
        .context("Failed to flush latency file")?;

    print_summary(&summary, &recorder.snapshot().await);

    info!("════════════════════════════════════════════════════════════");
    info!("                      RUN COMPLETE");
    info!("════════════════════════════════════════════════════════════");

    Ok(())
}
