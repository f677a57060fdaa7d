use clap::Args;

use super::super::{Ctx, render};
use crate::Result;
use crate::core::{ArtifactName, query};

#[derive(Args, Debug)]
pub struct HistoryArgs {
    /// Artifact to show history for; omit for the whole registry.
    pub artifact: Option<String>,
}

pub(crate) fn handle(ctx: &Ctx, args: HistoryArgs) -> Result<()> {
    let state = ctx.registry()?;
    let name = match args.artifact {
        Some(raw) => Some(ArtifactName::parse(raw)?),
        None => None,
    };
    let rows = query::history(&state, name.as_ref())?;
    if ctx.json {
        super::print_json(&rows);
    } else {
        println!("{}", render::render_history(&rows));
    }
    Ok(())
}
