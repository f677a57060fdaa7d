use clap::Subcommand;

use crate::Result;

use super::Ctx;

pub(super) fn print_json<T: serde::Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(rendered) => println!("{rendered}"),
        Err(e) => tracing::error!("failed to render JSON output: {e}"),
    }
}

pub(super) mod annotate;
pub(super) mod assign;
pub(super) mod check_ref;
pub(super) mod deprecate;
pub(super) mod deregister;
pub(super) mod describe;
pub(super) mod history;
pub(super) mod latest;
pub(super) mod register;
pub(super) mod show;
pub(super) mod stages;
pub(super) mod unassign;
pub(super) mod which;

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Register a new version of an artifact.
    #[command(alias = "reg")]
    Register(register::RegisterArgs),

    /// Deregister a version.
    Deregister(deregister::DeregisterArgs),

    /// Assign a stage to a version.
    #[command(alias = "promote")]
    Assign(assign::AssignArgs),

    /// Unassign a stage.
    #[command(alias = "demote")]
    Unassign(unassign::UnassignArgs),

    /// Deprecate an artifact as a whole.
    Deprecate(deprecate::DeprecateArgs),

    /// Add or update artifact metadata in the index.
    Annotate(annotate::AnnotateArgs),

    /// Remove artifact metadata from the index.
    Remove(annotate::RemoveArgs),

    /// Registry overview, or the versions of one artifact.
    Show(show::ShowArgs),

    /// Event history.
    #[command(alias = "log")]
    History(history::HistoryArgs),

    /// Greatest registered version of an artifact.
    Latest(latest::LatestArgs),

    /// Version currently holding a stage.
    Which(which::WhichArgs),

    /// Index metadata of an artifact at HEAD.
    Describe(describe::DescribeArgs),

    /// Stage names in use.
    Stages,

    /// Classify a tag name and show what it did.
    CheckRef(check_ref::CheckRefArgs),
}

pub(super) fn dispatch(ctx: &Ctx, command: Commands) -> Result<()> {
    match command {
        Commands::Register(args) => register::handle(ctx, args),
        Commands::Deregister(args) => deregister::handle(ctx, args),
        Commands::Assign(args) => assign::handle(ctx, args),
        Commands::Unassign(args) => unassign::handle(ctx, args),
        Commands::Deprecate(args) => deprecate::handle(ctx, args),
        Commands::Annotate(args) => annotate::handle(ctx, args),
        Commands::Remove(args) => annotate::handle_remove(ctx, args),
        Commands::Show(args) => show::handle(ctx, args),
        Commands::History(args) => history::handle(ctx, args),
        Commands::Latest(args) => latest::handle(ctx, args),
        Commands::Which(args) => which::handle(ctx, args),
        Commands::Describe(args) => describe::handle(ctx, args),
        Commands::Stages => stages::handle(ctx),
        Commands::CheckRef(args) => check_ref::handle(ctx, args),
    }
}
