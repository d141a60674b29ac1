use crate::errors::*;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

pub const COOKIE_PATH_ENV: &str = "BUILDFARM_COOKIE_PATH";

#[derive(Debug, Default, Deserialize)]
struct CookieConfig {
    #[serde(default)]
    auth: AuthConfig,
}

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    pub cookie: Option<String>,
}

impl AuthConfig {
    pub fn update(&mut self, c: AuthConfig) {
        if c.cookie.is_some() {
            self.cookie = c.cookie;
        }
    }
}

fn read_cookie_from_config<P: AsRef<Path>>(path: P) -> Result<Option<String>> {
    debug!("Attempting reading cookie from config: {:?}", path.as_ref());
    if let Ok(buf) = fs::read_to_string(path.as_ref()) {
        let config = toml::from_str::<CookieConfig>(&buf)
            .with_context(|| anyhow!("Failed to parse config {:?}", path.as_ref()))?;
        debug!("Found cookie in config {:?}", path.as_ref());
        Ok(config.auth.cookie)
    } else {
        Ok(None)
    }
}

fn read_cookie_from_file<P: AsRef<Path>>(path: P) -> Result<String> {
    debug!("Attempting reading cookie from file: {:?}", path.as_ref());
    let cookie = fs::read_to_string(path.as_ref())?;
    debug!("Found cookie in file {:?}", path.as_ref());
    Ok(cookie.trim().to_string())
}

/// A place the admin cookie may be stored in.
#[derive(Debug, PartialEq)]
enum CookieSource {
    /// `[auth] cookie = ...` in a config file.
    Config(PathBuf),
    /// A file that holds nothing but the cookie, as written by the daemon.
    File(PathBuf),
}

impl CookieSource {
    fn read(&self) -> Result<Option<String>> {
        match self {
            CookieSource::Config(path) => read_cookie_from_config(path),
            CookieSource::File(path) => Ok(read_cookie_from_file(path).ok()),
        }
    }
}

fn cookie_sources(config_dir: Option<PathBuf>, data_dir: Option<PathBuf>) -> Vec<CookieSource> {
    let mut sources = Vec::new();
    if let Some(config_dir) = config_dir {
        sources.push(CookieSource::Config(config_dir.join("buildd-manager.conf")));
    }
    sources.push(CookieSource::Config(PathBuf::from("/etc/buildd-manager.conf")));
    sources.push(CookieSource::File(PathBuf::from(
        "/var/lib/buildd-manager/auth-cookie",
    )));
    if let Some(data_dir) = data_dir {
        sources.push(CookieSource::File(data_dir.join("buildd-manager-auth-cookie")));
    }
    sources
}

/// Locates the admin cookie shared between `buildd-manager` and `buildfarmctl`.
///
/// If `BUILDFARM_COOKIE_PATH` is set, only that file is read. Otherwise the
/// first cookie found wins, in this order:
///
/// 1. `$XDG_CONFIG_HOME/buildd-manager.conf` (`[auth] cookie`)
/// 2. `/etc/buildd-manager.conf` (`[auth] cookie`)
/// 3. `/var/lib/buildd-manager/auth-cookie`
/// 4. `$XDG_DATA_HOME/buildd-manager-auth-cookie`
pub fn find_auth_cookie() -> Result<String> {
    if let Ok(cookie_path) = env::var(COOKIE_PATH_ENV) {
        return read_cookie_from_file(&cookie_path)
            .with_context(|| anyhow!("Failed to read cookie from {:?}", cookie_path));
    }

    for source in cookie_sources(dirs_next::config_dir(), dirs_next::data_dir()) {
        if let Some(cookie) = source.read()? {
            return Ok(cookie);
        }
    }

    bail!("Failed to find auth cookie anywhere")
}
