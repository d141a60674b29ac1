use crate::api;
use crate::config::Config;
use actix_web::HttpRequest;
use buildfarm_common::api::AUTH_COOKIE_HEADER;
use buildfarm_common::auth::COOKIE_PATH_ENV;
use buildfarm_common::errors::*;
use rand::distr::{Alphanumeric, SampleString};
use std::env;
use std::fs::{self, OpenOptions};
use std::io::prelude::*;
use std::os::unix::fs::OpenOptionsExt;
use std::path::PathBuf;

pub fn admin(cfg: &Config, req: &HttpRequest) -> Result<()> {
    let auth_cookie = api::header(req, AUTH_COOKIE_HEADER).context("Failed to get auth cookie")?;

    if cfg.auth_cookie != auth_cookie {
        bail!("Wrong auth cookie")
    }

    Ok(())
}

/// Picks the cookie from the config, the filesystem or generates a new one,
/// and writes it to disk so the cli on the same host can pick it up.
pub fn setup_auth_cookie(configured: Option<&str>) -> Result<String> {
    let cookie = if let Some(cookie) = configured {
        debug!("Using cookie from config");
        cookie.to_string()
    } else if let Ok(cookie) = buildfarm_common::auth::find_auth_cookie() {
        debug!("Loaded cookie from filesystem");
        cookie
    } else {
        debug!("Generating random cookie");
        Alphanumeric.sample_string(&mut rand::rng(), 32)
    };

    let cookie_path = if let Ok(cookie_path) = env::var(COOKIE_PATH_ENV) {
        PathBuf::from(cookie_path)
    } else if let Some(data_dir) = dirs_next::data_dir() {
        data_dir.join("buildd-manager-auth-cookie")
    } else {
        PathBuf::from("./auth-cookie")
    };

    if let Some(parent) = cookie_path.parent() {
        debug!(
            "Ensuring parent directory for auth cookie exists: {:?}",
            parent
        );
        fs::create_dir_all(parent)?;
    }

    debug!("Writing auth cookie to {:?}", cookie_path);
    let mut file = OpenOptions::new()
        .mode(0o640)
        .write(true)
        .truncate(true)
        .create(true)
        .open(cookie_path)
        .context("Failed to open auth cookie file")?;
    file.write_all(format!("{}\n", cookie).as_bytes())?;

    Ok(cookie)
}
