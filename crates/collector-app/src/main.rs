use std::env;
use std::io;
use std::net::SocketAddr;
use std::time::Duration;

use anyhow::{Context, Result};
use metrics::counter;
use metrics_exporter_prometheus::PrometheusBuilder;
use tokio::sync::{mpsc, watch};
use tokio::time::sleep;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use collector_app::output::{write_catalog, write_sample};
use collector_app::{CliArgs, CollectorConfig};
use discovery::discover_with;
use inverter::Inverter;
use poller_actor::{PollSample, PollerActor};
use udp_client::UdpClient;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();

    let args = CliArgs::parse(env::args().skip(1));
    let config = CollectorConfig::load_with_path(args.config).context("load config failed")?;
    config.validate().context("config validation failed")?;

    if args.sensors {
        if let Some(family) = config.family {
            let mut stdout = io::stdout().lock();
            return write_catalog(&mut stdout, family, &family.sensors());
        }
    }

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let client = UdpClient::new(config.client.clone()).with_cancellation(shutdown_rx.clone());

    let inverter = tokio::select! {
        connected = connect(&config, &client) => connected?,
        _ = tokio::signal::ctrl_c() => {
            info!("shutdown signal received before the inverter was identified");
            return Ok(());
        }
    };

    if args.sensors {
        let mut stdout = io::stdout().lock();
        return write_catalog(&mut stdout, inverter.family(), &inverter.sensors());
    }

    if let Some(ref listen) = config.metrics_listen {
        let addr: SocketAddr = listen.parse().context("metrics_listen")?;
        PrometheusBuilder::new()
            .with_http_listener(addr)
            .install()
            .context("prometheus exporter init failed")?;
        info!(%addr, "prometheus exporter listening");
    }

    let (tx, rx) = mpsc::channel(config.channel_capacity);
    let output_handle = tokio::spawn(output_task(rx));
    let actor = PollerActor::new(inverter, tx, shutdown_rx.clone(), config.poller.clone());
    let mut poller_handle = tokio::spawn(actor.run());

    notify_ready();
    let watchdog_handle = start_watchdog(shutdown_rx.clone());

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("shutdown signal received");
        }
        result = &mut poller_handle => {
            match result {
                Ok(Ok(())) => info!("poller exited cleanly"),
                Ok(Err(err)) => warn!(error = %err, "poller exited with error"),
                Err(err) => warn!(error = %err, "poller task failed"),
            }
        }
    }
    let _ = shutdown_tx.send(true);

    if !poller_handle.is_finished() {
        if let Err(err) = poller_handle.await {
            warn!(error = %err, "poller task join failed");
        }
    }
    let _ = output_handle.await;
    if let Some(handle) = watchdog_handle {
        let _ = handle.await;
    }
    Ok(())
}

/// Identifies the inverter with the pinned family, or discovers it.
async fn connect(config: &CollectorConfig, client: &UdpClient) -> Result<Box<dyn Inverter>> {
    match config.family {
        Some(family) => {
            let mut inverter = family.driver(client.clone());
            let identity = inverter.identify().await.with_context(|| {
                format!(
                    "identify {family} inverter at {}:{}",
                    client.host(),
                    client.port()
                )
            })?;
            info!(
                %family,
                model = %identity.model_name,
                serial = %identity.serial_number,
                firmware = %identity.firmware_version,
                "inverter identified"
            );
            Ok(inverter)
        }
        None => {
            let found = discover_with(client).await.context("inverter discovery failed")?;
            for failure in &found.failures {
                info!(family = %failure.family, error = %failure.error, "family probe failed");
            }
            info!(
                family = %found.inverter.family(),
                model = %found.identity.model_name,
                serial = %found.identity.serial_number,
                firmware = %found.identity.firmware_version,
                "inverter discovered"
            );
            Ok(found.inverter)
        }
    }
}

async fn output_task(mut rx: mpsc::Receiver<PollSample>) {
    while let Some(sample) = rx.recv().await {
        let mut stdout = io::stdout().lock();
        match write_sample(&mut stdout, &sample) {
            Ok(()) => counter!("goodwe_samples_written_total").increment(1),
            Err(err) => warn!(error = %err, "sample output failed"),
        }
    }
}

#[cfg(target_os = "linux")]
fn notify_ready() {
    if let Err(err) = sd_notify::notify(true, &[sd_notify::NotifyState::Ready]) {
        warn!(error = %err, "systemd ready notify failed");
    }
}

#[cfg(not(target_os = "linux"))]
fn notify_ready() {}

#[cfg(target_os = "linux")]
fn start_watchdog(
    mut shutdown: watch::Receiver<bool>,
) -> Option<tokio::task::JoinHandle<()>> {
    let interval = watchdog_interval()?;
    Some(tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = sleep(interval) => {
                    let state = [sd_notify::NotifyState::Watchdog];
                    if let Err(err) = sd_notify::notify(false, &state) {
                        warn!(error = %err, "systemd watchdog notify failed");
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }
    }))
}

#[cfg(not(target_os = "linux"))]
fn start_watchdog(_shutdown: watch::Receiver<bool>) -> Option<tokio::task::JoinHandle<()>> {
    None
}

#[cfg(target_os = "linux")]
fn watchdog_interval() -> Option<Duration> {
    let watchdog_usec = env::var("WATCHDOG_USEC").ok()?.parse::<u64>().ok()?;
    if let Some(pid) = env::var("WATCHDOG_PID")
        .ok()
        .and_then(|value| value.parse::<u32>().ok())
    {
        if pid != std::process::id() {
            return None;
        }
    }

    let interval = watchdog_usec.saturating_div(2).max(100_000);
    Some(Duration::from_micros(interval))
}
