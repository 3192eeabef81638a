use std::env;
use std::fs;
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

use inverter::Family;
use poller_actor::ActorConfig;
use udp_client::ClientConfig;

const DEFAULT_CHANNEL_CAPACITY: usize = 64;
/// Longest reply any family sends (ET running data).
const LARGEST_REPLY: usize = 257;

#[derive(Clone, Debug)]
pub struct CollectorConfig {
    pub client: ClientConfig,
    /// Skips discovery when set.
    pub family: Option<Family>,
    pub poller: ActorConfig,
    pub channel_capacity: usize,
    pub metrics_listen: Option<String>,
}

impl CollectorConfig {
    pub fn load() -> Result<Self> {
        Self::load_with_path(None)
    }

    pub fn load_with_path(config_path: Option<String>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(file_config) = load_file_config(config_path.as_deref())? {
            apply_file_config(&mut config, file_config)?;
        }

        apply_env_overrides(&mut config)?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.client.host.trim().is_empty() {
            anyhow::bail!("inverter.host must be non-empty");
        }
        if self.client.port == 0 {
            anyhow::bail!("inverter.port must be between 1 and 65535");
        }
        if self.client.timeout_ms == 0 {
            anyhow::bail!("client.timeout_ms must be >= 1");
        }
        if self.client.max_attempts == 0 {
            anyhow::bail!("client.max_attempts must be >= 1");
        }
        if self.client.recv_buffer < LARGEST_REPLY {
            anyhow::bail!("client.recv_buffer must be >= {LARGEST_REPLY}");
        }
        if self.poller.poll_interval.as_millis() == 0 {
            anyhow::bail!("poller.poll_interval_ms must be >= 1");
        }
        if self.channel_capacity == 0 {
            anyhow::bail!("channel_capacity must be >= 1");
        }
        if let Some(ref listen) = self.metrics_listen {
            listen.parse::<SocketAddr>().map_err(|_| {
                anyhow::anyhow!("metrics_listen must be a socket address (e.g. 0.0.0.0:9100)")
            })?;
        }

        Ok(())
    }
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            client: ClientConfig::default(),
            family: None,
            poller: ActorConfig::default(),
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
            metrics_listen: None,
        }
    }
}

fn apply_env_overrides(config: &mut CollectorConfig) -> Result<()> {
    if let Ok(value) = env::var("GOODWE_HOST") {
        config.client.host = value;
    }

    if let Some(port) = parse_env_u16("GOODWE_PORT") {
        config.client.port = port;
    }

    if let Ok(value) = env::var("GOODWE_FAMILY") {
        config.family = Some(parse_family(&value).context("GOODWE_FAMILY")?);
    }

    if let Some(timeout_ms) = parse_env_u64("GOODWE_TIMEOUT_MS") {
        config.client.timeout_ms = timeout_ms;
    }

    if let Some(attempts) = parse_env_u32("GOODWE_MAX_ATTEMPTS") {
        config.client.max_attempts = attempts;
    }

    if let Some(interval_ms) = parse_env_u64("GOODWE_POLL_INTERVAL_MS") {
        config.poller.poll_interval = Duration::from_millis(interval_ms);
    }

    if let Some(jitter_ms) = parse_env_u64("GOODWE_JITTER_MS") {
        config.poller.jitter_ms = jitter_ms;
    }

    config.channel_capacity =
        parse_env_usize("GOODWE_CHANNEL_CAPACITY").unwrap_or(config.channel_capacity);
    config.metrics_listen = env::var("GOODWE_METRICS_LISTEN")
        .ok()
        .or(config.metrics_listen.take());
    Ok(())
}

#[derive(Debug, Deserialize)]
struct FileConfig {
    inverter: Option<FileInverterConfig>,
    client: Option<FileClientConfig>,
    poller: Option<FilePollerConfig>,
    channel_capacity: Option<usize>,
    metrics_listen: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FileInverterConfig {
    host: Option<String>,
    port: Option<u16>,
    family: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FileClientConfig {
    timeout_ms: Option<u64>,
    max_attempts: Option<u32>,
    recv_buffer: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct FilePollerConfig {
    poll_interval_ms: Option<u64>,
    jitter_ms: Option<u64>,
}

fn load_file_config(config_path: Option<&str>) -> Result<Option<FileConfig>> {
    let path = match config_path {
        Some(path) => path.to_string(),
        None => match env::var("GOODWE_CONFIG") {
            Ok(value) => value,
            Err(_) => return Ok(None),
        },
    };

    let content = fs::read_to_string(&path)
        .with_context(|| format!("read config file {path}"))?;
    let ext = Path::new(&path).extension().and_then(|value| value.to_str());

    let config = match ext {
        Some("json") => serde_json::from_str(&content).context("parse json config")?,
        _ => toml::from_str(&content).context("parse toml config")?,
    };

    Ok(Some(config))
}

fn apply_file_config(config: &mut CollectorConfig, file: FileConfig) -> Result<()> {
    if let Some(inverter) = file.inverter {
        if let Some(host) = inverter.host {
            config.client.host = host;
        }
        if let Some(port) = inverter.port {
            config.client.port = port;
        }
        if let Some(family) = inverter.family {
            config.family = Some(parse_family(&family).context("inverter.family")?);
        }
    }

    if let Some(client) = file.client {
        if let Some(timeout_ms) = client.timeout_ms {
            config.client.timeout_ms = timeout_ms;
        }
        if let Some(attempts) = client.max_attempts {
            config.client.max_attempts = attempts;
        }
        if let Some(recv_buffer) = client.recv_buffer {
            config.client.recv_buffer = recv_buffer;
        }
    }

    if let Some(poller) = file.poller {
        if let Some(interval_ms) = poller.poll_interval_ms {
            config.poller.poll_interval = Duration::from_millis(interval_ms);
        }
        if let Some(jitter_ms) = poller.jitter_ms {
            config.poller.jitter_ms = jitter_ms;
        }
    }

    if let Some(capacity) = file.channel_capacity {
        config.channel_capacity = capacity;
    }
    if let Some(listen) = file.metrics_listen {
        config.metrics_listen = Some(listen);
    }
    Ok(())
}

fn parse_family(value: &str) -> Result<Family> {
    value.parse::<Family>().map_err(anyhow::Error::from)
}

fn parse_env_u16(key: &str) -> Option<u16> {
    env::var(key).ok().and_then(|value| value.parse().ok())
}

fn parse_env_u32(key: &str) -> Option<u32> {
    env::var(key).ok().and_then(|value| value.parse().ok())
}

fn parse_env_u64(key: &str) -> Option<u64> {
    env::var(key).ok().and_then(|value| value.parse().ok())
}

fn parse_env_usize(key: &str) -> Option<usize> {
    env::var(key).ok().and_then(|value| value.parse().ok())
}
