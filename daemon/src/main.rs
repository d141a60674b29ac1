mod args;

use crate::args::Args;
use buildd_manager::config;
use buildd_manager::db;
use buildfarm_common::errors::*;
use clap::Parser;
use env_logger::Env;

#[actix_web::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let logging = match args.verbose {
        0 => "actix_web=debug,info",
        1 => "actix_web=debug,buildd_manager=debug,buildfarm_common=debug,info",
        2 => "debug",
        3 => "buildd_manager=trace,buildfarm_common=trace,debug",
        _ => "trace",
    };

    env_logger::init_from_env(Env::default().default_filter_or(logging));

    dotenvy::dotenv().ok();
    let config = config::load(args.config.as_deref())?;
    if args.check_config {
        println!("{:#?}", config);
    } else {
        let pool = db::setup_pool(config.schedule.state_path())?;
        buildd_manager::run_config(pool, config).await?;
    }
    Ok(())
}
