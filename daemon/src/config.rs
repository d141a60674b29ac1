use crate::auth;
use buildfarm_common::config::{BuilderConfig, ConfigFile, ScheduleConfig};
use buildfarm_common::errors::*;
use std::env;
use std::path::Path;

const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8221";

#[derive(Debug, Clone)]
pub struct Config {
    pub auth_cookie: String,
    pub bind_addr: String,
    pub schedule: ScheduleConfig,
    pub builders: Vec<BuilderConfig>,
}

pub fn load(path: Option<&Path>) -> Result<Config> {
    let config = buildfarm_common::config::load(path)?;
    let auth_cookie = auth::setup_auth_cookie(config.auth.cookie.as_deref())
        .context("Failed to setup auth cookie")?;
    from_struct(config, auth_cookie)
}

pub fn from_struct(config: ConfigFile, auth_cookie: String) -> Result<Config> {
    let bind_addr = if let Ok(addr) = env::var("HTTP_ADDR") {
        addr
    } else if let Some(addr) = config.http.bind_addr {
        addr
    } else {
        DEFAULT_BIND_ADDR.to_string()
    };

    for (i, builder) in config.builders.iter().enumerate() {
        if builder.name.is_empty() {
            bail!("Builder #{} is missing a name", i + 1);
        }
        if config.builders[..i].iter().any(|b| b.name == builder.name) {
            bail!("Builder {:?} is configured twice", builder.name);
        }
    }

    Ok(Config {
        auth_cookie,
        bind_addr,
        schedule: config.schedule,
        builders: config.builders,
    })
}
