use buildfarm_common::api::{ArchivePurpose, Pocket, Urgency};
use buildfarm_common::errors::*;
use buildfarm_common::JobType;
use clap::{ArgAction, CommandFactory, Parser};
use clap_complete::Shell;
use std::io;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(version)]
pub struct Args {
    /// Verbose logging
    #[arg(short, long, global = true, action(ArgAction::Count))]
    pub verbose: u8,
    /// buildd-manager endpoint to talk to
    #[arg(short = 'H', long)]
    pub endpoint: Option<String>,
    /// Configuration file path
    #[arg(short, long)]
    pub config: Option<PathBuf>,
    /// Bypass tty detection and always use colors
    #[arg(short = 'C', long, global = true)]
    pub color: bool,
    #[command(subcommand)]
    pub subcommand: SubCommand,
}

#[derive(Debug, Parser)]
pub enum SubCommand {
    /// Builder related subcommands
    #[command(subcommand)]
    Builders(Builders),
    /// Queue related subcommands
    #[command(subcommand)]
    Queue(Queue),
    /// Build related subcommands
    #[command(subcommand)]
    Build(Build),
    /// Generate shell completions
    Completions(Completions),
}

#[derive(Debug, Parser)]
pub enum Builders {
    /// List all builders and what they are doing
    Ls(BuildersList),
    /// Mark an idle builder dirty so it gets reset
    Reset(BuilderId),
    /// Allow a builder to receive jobs again
    Enable(BuilderId),
    /// Stop dispatching jobs to a builder
    Disable(BuilderDisable),
}

#[derive(Debug, Parser)]
pub struct BuildersList {
    /// Print the raw json
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Parser)]
pub struct BuilderId {
    pub id: i32,
}

#[derive(Debug, Parser)]
pub struct BuilderDisable {
    pub id: i32,
    /// Shown to other operators next to the builder
    #[arg(long)]
    pub reason: String,
}

#[derive(Debug, Parser)]
pub enum Queue {
    /// List the queue, highest score first
    Ls(QueueList),
    /// Pin the score of a queue entry
    Score(QueueScore),
    /// Hold a waiting entry back from dispatch
    Suspend(QueueId),
    /// Release a suspended entry
    Resume(QueueId),
}

#[derive(Debug, Parser)]
pub struct QueueList {
    /// Only show the first 25 entries
    #[arg(long)]
    pub head: bool,
    /// Print the raw json
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Parser)]
pub struct QueueScore {
    pub id: i32,
    #[arg(allow_negative_numbers = true)]
    pub score: i32,
}

#[derive(Debug, Parser)]
pub struct QueueId {
    pub id: i32,
}

#[derive(Debug, Parser)]
pub enum Build {
    /// Show a build record
    Show(BuildShow),
    /// Create a build and queue it
    Request(BuildRequestArgs),
    /// Cancel the queue entry of a build
    Cancel(BuildId),
    /// Queue a build that ended in a retryable state again
    Retry(BuildId),
    /// Drop a pending build in favour of a newer one
    Supersede(BuildId),
    /// Report the result of processing the build's upload
    Upload(BuildUpload),
}

#[derive(Debug, Parser)]
pub struct BuildShow {
    pub id: i32,
    /// Print the raw json
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Parser)]
pub struct BuildId {
    pub id: i32,
}

#[derive(Debug, Parser)]
pub struct BuildUpload {
    pub id: i32,
    /// The upload was rejected
    #[arg(long)]
    pub failed: bool,
}

#[derive(Debug, Parser)]
pub struct BuildRequestArgs {
    /// One of package-build, recipe-build, translation-templates-build,
    /// live-filesystem-build, snap-build, oci-recipe-build, charm-recipe-build
    #[arg(long = "type")]
    pub job_type: JobType,
    pub name: String,
    pub version: String,
    /// Only dispatch to builders of this processor
    #[arg(long)]
    pub processor: Option<String>,
    /// Require a virtualized builder
    #[arg(long)]
    pub virtualized: bool,
    #[arg(long, default_value = "primary")]
    pub archive: String,
    #[arg(long, default_value = "primary")]
    pub purpose: ArchivePurpose,
    /// The archive is private
    #[arg(long)]
    pub private: bool,
    #[arg(long, default_value = "release")]
    pub pocket: Pocket,
    #[arg(long)]
    pub component: Option<String>,
    #[arg(long, default_value = "medium")]
    pub urgency: Urgency,
    /// Expected runtime in seconds
    #[arg(long)]
    pub estimated_duration: Option<i64>,
    /// Mark the build as requested by a person
    #[arg(long)]
    pub manual: bool,
}

#[derive(Debug, Parser)]
pub struct Completions {
    pub shell: Shell,
}

pub fn gen_completions(args: &Completions) -> Result<()> {
    clap_complete::generate(
        args.shell,
        &mut Args::command(),
        "buildfarmctl",
        &mut io::stdout(),
    );
    Ok(())
}
