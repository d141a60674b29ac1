use crate::args::*;
use crate::fancy::Fancy;
use buildfarm_common::api::*;
use buildfarm_common::errors::*;
use buildfarm_common::utils;
use chrono::prelude::*;
use clap::Parser;
use colored::*;
use env_logger::Env;
use serde::Serialize;
use std::borrow::Cow;
use std::io;
use std::io::prelude::*;

pub mod args;
pub mod fancy;

fn print_json<S: Serialize>(x: &S) -> Result<()> {
    let mut stdout = io::stdout();
    serde_json::to_writer_pretty(&mut stdout, &x)?;
    stdout.write_all(b"\n")?;
    Ok(())
}

fn print_builders(builders: &[BuilderInfo]) {
    let mut stdout = io::stdout();
    for builder in builders {
        let status = if builder.builder_ok {
            builder.clean_status.fancy()
        } else {
            format!("{:<8}", "DISABLED").red().to_string()
        };
        let job = match builder.current_job {
            Some(job) => format!("queue#{}", job).bold().to_string(),
            None if !builder.builder_ok => builder
                .fail_notes
                .as_deref()
                .unwrap_or_default()
                .dimmed()
                .to_string(),
            None => "idle".blue().to_string(),
        };
        let flavour = if builder.virtualized { "virt" } else { "bare" };

        if writeln!(
            stdout,
            "{:>4} {:-32} {:8} {} {:>3} {} {}",
            builder.id,
            builder.name.bold(),
            builder.processor,
            flavour,
            builder.failure_count,
            status,
            job,
        )
        .is_err()
        {
            break;
        }
    }
}

fn print_queue(entries: &[QueueEntry], now: DateTime<Utc>) {
    let mut stdout = io::stdout();
    for entry in entries {
        let processor = entry.processor.as_deref().unwrap_or("any");
        let build = format!("{} {}", entry.name.bold(), entry.version);

        let lease = if let Some(expires) = entry.lease_expires {
            Cow::Owned(utils::lease_to_human((expires - now).num_seconds()))
        } else if let Some(not_before) = entry.not_before.filter(|t| *t > now) {
            let wait = utils::secs_to_human((not_before - now).num_seconds());
            Cow::Owned(format!("retry in {}", wait.trim_start()))
        } else {
            Cow::Borrowed("")
        };

        if writeln!(
            stdout,
            "{:>6} {:>6} {} {:-28} {:-50} {:8} {}",
            entry.id,
            entry.last_score,
            entry.status.fancy(),
            entry.job_type.to_string(),
            build,
            processor,
            lease,
        )
        .is_err()
        {
            break;
        }
    }
}

fn print_build(build: &BuildInfo) -> Result<()> {
    let mut stdout = io::stdout();
    writeln!(
        stdout,
        "{} {} {} ({})",
        format!("build#{}", build.id).bold(),
        build.name.bold(),
        build.version,
        build.job_type,
    )?;
    writeln!(stdout, "  status:     {}", build.status.fancy())?;
    if let Some(reason) = &build.status_reason {
        writeln!(stdout, "  reason:     {}", reason)?;
    }
    writeln!(stdout, "  archive:    {}", build.archive)?;
    if let Some(processor) = &build.processor {
        writeln!(stdout, "  processor:  {}", processor)?;
    }
    if let Some(queue_id) = build.queue_id {
        writeln!(stdout, "  queue:      queue#{}", queue_id)?;
    }
    if let Some(builder_id) = build.builder_id {
        writeln!(stdout, "  builder:    {}", builder_id)?;
    }
    writeln!(stdout, "  failures:   {}", build.failure_count)?;
    writeln!(stdout, "  created:    {}", build.date_created.format("%Y-%m-%d %H:%M:%S"))?;
    if let Some(started) = build.date_started {
        writeln!(stdout, "  started:    {}", started.format("%Y-%m-%d %H:%M:%S"))?;
    }
    if let Some(finished) = build.date_finished {
        writeln!(stdout, "  finished:   {}", finished.format("%Y-%m-%d %H:%M:%S"))?;
    }
    if let Some(dependencies) = &build.dependencies {
        writeln!(stdout, "  missing:    {}", dependencies)?;
    }
    if let Some(log) = &build.log {
        writeln!(stdout, "  log:        {}", log)?;
    }
    Ok(())
}

fn build_request(args: BuildRequestArgs) -> BuildRequest {
    let mut archive = Archive::new(args.archive, args.purpose);
    archive.private = args.private;
    BuildRequest {
        job_type: args.job_type,
        name: args.name,
        version: args.version,
        processor: args.processor,
        virtualized: args.virtualized.then_some(true),
        archive,
        pocket: args.pocket,
        component: args.component,
        urgency: args.urgency,
        estimated_duration: args.estimated_duration,
        manual: args.manual,
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let logging = match args.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };

    env_logger::init_from_env(Env::default().default_filter_or(logging));

    if args.color {
        debug!("Bypass tty detection and always use colors");
        colored::control::set_override(true);
    }

    let config =
        buildfarm_common::config::load(args.config).context("Failed to load config file")?;
    let mut client = Client::new(config, args.endpoint)?;

    match args.subcommand {
        SubCommand::Builders(Builders::Ls(ls)) => {
            let builders = client.list_builders().await?;
            if ls.json {
                print_json(&builders)?;
            } else {
                print_builders(&builders);
            }
        }
        SubCommand::Builders(Builders::Reset(builder)) => {
            client.with_auth_cookie()?.reset_builder(builder.id).await?;
            info!("Builder {} is going to be reset", builder.id);
        }
        SubCommand::Builders(Builders::Enable(builder)) => {
            client.with_auth_cookie()?.enable_builder(builder.id).await?;
        }
        SubCommand::Builders(Builders::Disable(disable)) => {
            client
                .with_auth_cookie()?
                .disable_builder(disable.id, disable.reason)
                .await?;
        }
        SubCommand::Queue(Queue::Ls(ls)) => {
            let mut entries = client.list_queue().await?;
            if ls.head {
                entries.truncate(25);
            }
            if ls.json {
                print_json(&entries)?;
            } else {
                print_queue(&entries, Utc::now());
            }
        }
        SubCommand::Queue(Queue::Score(score)) => {
            client
                .with_auth_cookie()?
                .set_manual_score(score.id, score.score)
                .await?;
        }
        SubCommand::Queue(Queue::Suspend(entry)) => {
            client.with_auth_cookie()?.suspend_queue_entry(entry.id).await?;
        }
        SubCommand::Queue(Queue::Resume(entry)) => {
            client.with_auth_cookie()?.resume_queue_entry(entry.id).await?;
        }
        SubCommand::Build(Build::Show(show)) => {
            let build = client.get_build(show.id).await?;
            if show.json {
                print_json(&build)?;
            } else {
                print_build(&build)?;
            }
        }
        SubCommand::Build(Build::Request(request)) => {
            let queued = client
                .with_auth_cookie()?
                .request_build(&build_request(request))
                .await?;
            println!("build#{} queue#{}", queued.build_id, queued.queue_id);
        }
        SubCommand::Build(Build::Cancel(build)) => {
            let state = client.with_auth_cookie()?.cancel_build(build.id).await?;
            println!("build#{}: {}", build.id, state.fancy());
        }
        SubCommand::Build(Build::Retry(build)) => {
            let queued = client.with_auth_cookie()?.retry_build(build.id).await?;
            println!("build#{} queue#{}", queued.build_id, queued.queue_id);
        }
        SubCommand::Build(Build::Supersede(build)) => {
            client.with_auth_cookie()?.supersede_build(build.id).await?;
        }
        SubCommand::Build(Build::Upload(upload)) => {
            client
                .with_auth_cookie()?
                .complete_upload(upload.id, !upload.failed)
                .await?;
        }
        SubCommand::Completions(completions) => args::gen_completions(&completions)?,
    }

    Ok(())
}
