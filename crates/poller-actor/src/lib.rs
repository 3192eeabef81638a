use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use metrics::{counter, histogram};
use serde::Serialize;
use thiserror::Error;
use tokio::sync::{mpsc, watch};
use tokio::time::sleep;
use tracing::{debug, info, warn};

use inverter::{Family, Inverter, InverterError};
use types::{DeviceIdentity, TelemetrySnapshot};

#[derive(Debug, Clone)]
pub struct ActorConfig {
    pub poll_interval: Duration,
    pub jitter_ms: u64,
}

impl Default for ActorConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(10),
            jitter_ms: 0,
        }
    }
}

#[derive(Debug, Error)]
pub enum PollerError {
    #[error("telemetry channel closed")]
    ChannelClosed,
}

#[derive(Debug, Clone, Serialize)]
pub struct PollSample {
    pub identity: Option<DeviceIdentity>,
    pub family: Family,
    pub snapshot: TelemetrySnapshot,
    pub collected_at_ms: u64,
}

/// Polls one inverter until shutdown, forwarding every decoded snapshot.
pub struct PollerActor {
    inverter: Box<dyn Inverter>,
    sender: mpsc::Sender<PollSample>,
    shutdown: watch::Receiver<bool>,
    config: ActorConfig,
}

impl PollerActor {
    pub fn new(
        inverter: Box<dyn Inverter>,
        sender: mpsc::Sender<PollSample>,
        shutdown: watch::Receiver<bool>,
        config: ActorConfig,
    ) -> Self {
        Self {
            inverter,
            sender,
            shutdown,
            config,
        }
    }

    pub async fn run(mut self) -> Result<(), PollerError> {
        let family = self.inverter.family();
        let host = self.inverter.host().to_string();
        let mut iteration = 0u64;

        loop {
            if *self.shutdown.borrow() {
                info!(%host, "poller shutdown requested");
                break;
            }

            let cycle_start = Instant::now();
            let fetched = tokio::select! {
                result = self.inverter.fetch_telemetry() => result,
                _ = wait_for_shutdown(&mut self.shutdown) => {
                    info!(%host, "poller shutdown requested, in-flight poll dropped");
                    break;
                }
            };
            let elapsed = cycle_start.elapsed();
            histogram!("goodwe_poll_duration_seconds", "family" => family.as_str())
                .record(elapsed.as_secs_f64());

            match fetched {
                Ok(snapshot) => {
                    counter!("goodwe_polls_total", "family" => family.as_str(), "outcome" => "ok")
                        .increment(1);
                    debug!(%host, sensors = snapshot.len(), "telemetry decoded");
                    let sample = PollSample {
                        identity: self.inverter.identity().cloned(),
                        family,
                        snapshot,
                        collected_at_ms: unix_ms(),
                    };
                    if self.sender.send(sample).await.is_err() {
                        warn!(%host, "telemetry channel closed, stopping poller");
                        return Err(PollerError::ChannelClosed);
                    }
                }
                Err(err) if err.is_cancelled() => {
                    info!(%host, "poll cancelled");
                    break;
                }
                Err(err) => {
                    counter!(
                        "goodwe_polls_total",
                        "family" => family.as_str(),
                        "outcome" => failure_kind(&err)
                    )
                    .increment(1);
                    warn!(%host, error = %err, "telemetry fetch failed");
                }
            }

            iteration = iteration.wrapping_add(1);
            let lag = elapsed.saturating_sub(self.config.poll_interval);
            let delay = jittered_delay(self.config.poll_interval, self.config.jitter_ms, iteration);
            info!(
                %host,
                elapsed_ms = elapsed.as_millis(),
                lag_ms = lag.as_millis(),
                delay_ms = delay.as_millis(),
                "poll cycle complete"
            );

            tokio::select! {
                _ = sleep(delay) => {},
                _ = wait_for_shutdown(&mut self.shutdown) => {
                    info!(%host, "poller shutdown requested");
                    break;
                }
            }
        }

        Ok(())
    }
}

fn failure_kind(err: &InverterError) -> &'static str {
    match err {
        InverterError::Transport { .. } if err.is_timeout() => "timeout",
        InverterError::Transport { .. } => "transport",
        InverterError::Decode(_) => "decode",
    }
}

/// Resolves once shutdown is signalled or the signal sender is gone.
async fn wait_for_shutdown(shutdown: &mut watch::Receiver<bool>) {
    loop {
        if *shutdown.borrow_and_update() {
            return;
        }
        if shutdown.changed().await.is_err() {
            return;
        }
    }
}

fn jittered_delay(base: Duration, jitter_ms: u64, iteration: u64) -> Duration {
    if jitter_ms == 0 {
        return base;
    }

    let seed = unix_ms().wrapping_add(iteration.wrapping_mul(1_664_525));
    base + Duration::from_millis(seed % jitter_ms)
}

fn unix_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
