use actix_web::HttpRequest;
use buildfarm_common::errors::{format_err, Context};

pub mod v1;

pub fn header<'a>(req: &'a HttpRequest, key: &str) -> buildfarm_common::errors::Result<&'a str> {
    let value = req
        .headers()
        .get(key)
        .ok_or_else(|| format_err!("Missing header"))?
        .to_str()
        .context("Failed to decode header value")?;

    Ok(value)
}
