use crate::auth::AuthConfig;
use crate::errors::*;
use crate::ResetProtocol;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

pub const SCAN_INTERVAL: u64 = 15;
pub const LEASE_DURATION: i64 = 300;
pub const CANCEL_TIMEOUT: u64 = 180;
pub const CANCEL_POLL_INTERVAL: u64 = 5;
pub const CLEAN_TIMEOUT: i64 = 900;
pub const WORKER_TIMEOUT: u64 = 60;
pub const MAX_RETRIES: u32 = 3;
pub const BUILDER_FAILURE_THRESHOLD: u32 = 5;

pub const DEFAULT_RETRY_DELAY_BASE: i64 = 60;

pub fn load<P: AsRef<Path>>(path: Option<P>) -> Result<ConfigFile> {
    let mut config = ConfigFile::default();

    if let Some(c) = load_from("/etc/buildd-manager.conf")? {
        config.update(c);
    }

    if let Ok(path) = config_path() {
        if let Some(c) = load_from(path)? {
            config.update(c);
        }
    }

    if let Some(path) = path {
        let c = load_from(path)?.ok_or_else(|| format_err!("Failed to read config file"))?;
        config.update(c);
    }

    Ok(config)
}

fn config_path() -> Result<PathBuf> {
    let config_dir = dirs_next::config_dir().ok_or_else(|| format_err!("Failed to find config dir"))?;
    Ok(config_dir.join("buildd-manager.conf"))
}

fn load_from<P: AsRef<Path>>(path: P) -> Result<Option<ConfigFile>> {
    if let Ok(buf) = fs::read_to_string(path.as_ref()) {
        debug!("loading config file {:?}", path.as_ref());
        let config = toml::from_str(&buf).context("Failed to load config")?;
        Ok(Some(config))
    } else {
        Ok(None)
    }
}

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct ConfigFile {
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub endpoints: HashMap<String, EndpointConfig>,
    #[serde(default)]
    pub schedule: ScheduleConfig,
    #[serde(default)]
    pub builders: Vec<BuilderConfig>,
}

impl ConfigFile {
    pub fn update(&mut self, c: ConfigFile) {
        self.http.update(c.http);
        self.auth.update(c.auth);
        for (k, v) in c.endpoints {
            if let Some(o) = self.endpoints.get_mut(&k) {
                o.update(v);
            } else {
                self.endpoints.insert(k, v);
            }
        }
        self.schedule.update(c.schedule);
        if !c.builders.is_empty() {
            self.builders = c.builders;
        }
    }
}

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    pub bind_addr: Option<String>,
    pub endpoint: Option<String>,
}

impl HttpConfig {
    pub fn update(&mut self, c: HttpConfig) {
        if c.bind_addr.is_some() {
            self.bind_addr = c.bind_addr;
        }
        if c.endpoint.is_some() {
            self.endpoint = c.endpoint;
        }
    }
}

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct EndpointConfig {
    pub cookie: String,
}

impl EndpointConfig {
    pub fn update(&mut self, c: EndpointConfig) {
        self.cookie = c.cookie;
    }
}

/// Tunables of the scan loop. All durations are in seconds.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct ScheduleConfig {
    scan_interval: Option<u64>,
    lease_duration: Option<i64>,
    cancel_timeout: Option<u64>,
    cancel_poll_interval: Option<u64>,
    clean_timeout: Option<i64>,
    worker_timeout: Option<u64>,
    max_retries: Option<u32>,
    retry_delay_base: Option<i64>,
    builder_failure_threshold: Option<u32>,
    state_path: Option<PathBuf>,
}

impl ScheduleConfig {
    pub fn update(&mut self, c: ScheduleConfig) {
        if c.scan_interval.is_some() {
            self.scan_interval = c.scan_interval;
        }
        if c.lease_duration.is_some() {
            self.lease_duration = c.lease_duration;
        }
        if c.cancel_timeout.is_some() {
            self.cancel_timeout = c.cancel_timeout;
        }
        if c.cancel_poll_interval.is_some() {
            self.cancel_poll_interval = c.cancel_poll_interval;
        }
        if c.clean_timeout.is_some() {
            self.clean_timeout = c.clean_timeout;
        }
        if c.worker_timeout.is_some() {
            self.worker_timeout = c.worker_timeout;
        }
        if c.max_retries.is_some() {
            self.max_retries = c.max_retries;
        }
        if c.retry_delay_base.is_some() {
            self.retry_delay_base = c.retry_delay_base;
        }
        if c.builder_failure_threshold.is_some() {
            self.builder_failure_threshold = c.builder_failure_threshold;
        }
        if c.state_path.is_some() {
            self.state_path = c.state_path;
        }
    }

    pub fn scan_interval(&self) -> u64 {
        self.scan_interval.unwrap_or(SCAN_INTERVAL)
    }

    pub fn lease_duration(&self) -> i64 {
        self.lease_duration.unwrap_or(LEASE_DURATION)
    }

    pub fn cancel_timeout(&self) -> u64 {
        self.cancel_timeout.unwrap_or(CANCEL_TIMEOUT)
    }

    pub fn cancel_poll_interval(&self) -> u64 {
        self.cancel_poll_interval.unwrap_or(CANCEL_POLL_INTERVAL)
    }

    pub fn clean_timeout(&self) -> i64 {
        self.clean_timeout.unwrap_or(CLEAN_TIMEOUT)
    }

    pub fn worker_timeout(&self) -> u64 {
        self.worker_timeout.unwrap_or(WORKER_TIMEOUT)
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries.unwrap_or(MAX_RETRIES)
    }

    pub fn retry_delay_base(&self) -> i64 {
        self.retry_delay_base.unwrap_or(DEFAULT_RETRY_DELAY_BASE)
    }

    pub fn builder_failure_threshold(&self) -> u32 {
        self.builder_failure_threshold
            .unwrap_or(BUILDER_FAILURE_THRESHOLD)
    }

    pub fn state_path(&self) -> Option<&Path> {
        self.state_path.as_deref()
    }
}

/// A builder that is registered with the scheduler on startup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuilderConfig {
    pub name: String,
    pub url: String,
    pub processor: String,
    #[serde(default)]
    pub virtualized: bool,
    #[serde(default)]
    pub manual: bool,
    #[serde(default)]
    pub reset_protocol: ResetProtocol,
}
