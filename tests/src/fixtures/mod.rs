pub mod farm;

use crate::data::*;
use crate::fixtures::farm::Farm;
use crate::fixtures::server::{IsolatedServer, ServerHolder};
use buildd_manager::db;
use buildd_manager::scheduler::SchedulePolicy;
use buildfarm_common::api::Client;
use buildfarm_common::config::ConfigFile;
use buildfarm_common::errors::{info, Error};
use rand::distr::{Alphanumeric, SampleString};
use rstest::fixture;
use std::time::Duration;

#[fixture]
pub fn policy() -> SchedulePolicy {
    SchedulePolicy {
        lease_duration: chrono::Duration::seconds(300),
        cancel_timeout: Duration::from_millis(500),
        cancel_poll_interval: Duration::from_millis(10),
        clean_timeout: chrono::Duration::seconds(900),
        ..Default::default()
    }
}

#[fixture]
pub fn single_builder_farm(policy: SchedulePolicy) -> Farm {
    Farm::new(&[builder("lcy02-amd64-001", true)], policy)
}

#[fixture]
pub fn config_file() -> ConfigFile {
    let mut config = ConfigFile::default();

    let cookie = Alphanumeric.sample_string(&mut rand::rng(), 32);
    config.auth.cookie = Some(cookie);
    config.http.bind_addr = Some("127.0.0.1:0".to_string());
    config.builders = vec![builder("lcy02-amd64-001", true), builder("bos01-amd64-002", false)];

    config
}

/// Status code of a failed admin api call.
pub fn http_status(err: &Error) -> Option<u16> {
    err.downcast_ref::<reqwest::Error>()
        .and_then(|err| err.status())
        .map(|status| status.as_u16())
}

pub fn make_client(endpoint: &str, cookie: Option<&str>) -> Client {
    info!("Setting up client for {:?}", endpoint);
    let mut client = Client::new(ConfigFile::default(), Some(endpoint.to_string())).unwrap();
    if let Some(cookie) = cookie {
        client.auth_cookie(cookie);
    }
    client
}

#[fixture]
pub fn isolated_server(config_file: ConfigFile) -> IsolatedServer {
    let cookie = config_file.auth.cookie.clone().unwrap();
    let config = buildd_manager::config::from_struct(config_file, cookie.clone()).unwrap();

    let pool = db::setup_pool(None).unwrap();
    buildd_manager::register_builders(&pool, &config.builders).unwrap();

    let mut server = ServerHolder::new(pool.clone(), config).unwrap();
    server.start().unwrap();

    let endpoint = format!("http://{}", server.address);
    let client = make_client(&endpoint, Some(&cookie));

    IsolatedServer::new(server, pool, client)
}
