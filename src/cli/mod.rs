//! CLI surface for gitreg.
//!
//! Thin handlers: each subcommand assembles the registry state, calls one
//! query or mutator operation, and renders. All policy lives in the core.

use std::ffi::OsString;
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use crate::Result;
use crate::config::{self, RegistryConfig};
use crate::core::{
    CancelToken, RegistryState, Scope, TagWrite, assemble, collect,
};
use crate::git::GitRepo;

mod commands;
mod render;

pub use commands::Commands;

#[derive(Parser, Debug)]
#[command(
    name = "gitreg",
    version,
    about = "Artifact registry on top of git tags",
    infer_subcommands = true,
    arg_required_else_help = true
)]
pub struct Cli {
    /// Machine-readable JSON output.
    #[arg(long, global = true, default_value_t = false)]
    pub json: bool,

    /// Repository path (default: discover from cwd).
    #[arg(long, global = true, value_name = "PATH")]
    pub repo: Option<PathBuf>,

    /// Abort after this many seconds.
    #[arg(long, global = true, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Debug output (repeat for more).
    #[arg(short = 'v', long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

pub fn parse_from<I, T>(args: I) -> Cli
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    Cli::parse_from(args)
}

/// Everything a handler needs.
pub struct Ctx {
    pub repo: GitRepo,
    pub config: RegistryConfig,
    pub json: bool,
    pub emojis: bool,
    pub cancel: CancelToken,
}

impl Ctx {
    fn new(cli: &Cli) -> Result<Self> {
        let repo = GitRepo::discover(cli.repo.as_deref())?;
        let config = config::load_for_repo(repo.workdir()?)?;
        let cancel = match cli.timeout {
            Some(secs) => CancelToken::with_timeout(Duration::from_secs(secs)),
            None => CancelToken::none(),
        };
        Ok(Self {
            json: cli.json,
            emojis: config.emojis && !cli.json,
            repo,
            config,
            cancel,
        })
    }

    /// Collect and assemble over the full history.
    pub(crate) fn registry(&self) -> Result<RegistryState> {
        let stream = collect(&self.repo, &self.config, &Scope::AllCommits, &self.cancel)?;
        Ok(assemble(&stream, &self.config))
    }

    /// Apply a tag-write plan, rolling back already-created tags of the
    /// same plan if a later write fails.
    pub(crate) fn apply_writes(&self, writes: &[TagWrite]) -> Result<()> {
        let mut created: Vec<&str> = Vec::new();
        for write in writes {
            let result = self
                .cancel
                .check()
                .and_then(|()| self.repo.create_tag(&write.tag, &write.target, &write.message));
            if let Err(e) = result {
                for tag in created.iter().rev() {
                    if let Err(rollback) = self.repo.delete_tag(tag) {
                        tracing::warn!(%tag, error = %rollback, "rollback failed");
                    }
                }
                return Err(e);
            }
            created.push(&write.tag);
        }
        Ok(())
    }

    pub(crate) fn apply_deletes(&self, tags: &[String]) -> Result<()> {
        for tag in tags {
            self.cancel.check()?;
            self.repo.delete_tag(tag)?;
        }
        Ok(())
    }
}

pub fn run(cli: Cli) -> Result<()> {
    let ctx = Ctx::new(&cli)?;
    commands::dispatch(&ctx, cli.command)
}
