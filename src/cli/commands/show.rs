use clap::Args;

use super::super::{Ctx, render};
use crate::Result;
use crate::core::{ArtifactName, query};

#[derive(Args, Debug)]
pub struct ShowArgs {
    /// Artifact to list versions for; omit for the registry overview.
    pub artifact: Option<String>,

    /// Include deregistered and discovered versions.
    #[arg(long)]
    pub all: bool,
}

pub(crate) fn handle(ctx: &Ctx, args: ShowArgs) -> Result<()> {
    let state = ctx.registry()?;
    match args.artifact {
        None => {
            let rows = query::show(&state);
            if ctx.json {
                super::print_json(&rows);
            } else {
                println!("{}", render::render_show_overview(&rows, ctx.emojis));
            }
        }
        Some(raw) => {
            let name = ArtifactName::parse(raw)?;
            let rows = query::show_artifact(&state, &name, args.all)?;
            if ctx.json {
                super::print_json(&rows);
            } else {
                println!("{}", render::render_versions(&rows));
            }
        }
    }
    Ok(())
}
