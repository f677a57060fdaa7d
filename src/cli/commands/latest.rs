use clap::Args;

use super::super::Ctx;
use crate::Result;
use crate::core::{ArtifactName, query};

#[derive(Args, Debug)]
pub struct LatestArgs {
    pub artifact: String,
}

pub(crate) fn handle(ctx: &Ctx, args: LatestArgs) -> Result<()> {
    let state = ctx.registry()?;
    let name = ArtifactName::parse(args.artifact)?;
    let latest = query::latest(&state, &name)?;
    if ctx.json {
        super::print_json(&latest);
    } else if let Some(row) = latest {
        println!("{}", row.version);
    }
    Ok(())
}
