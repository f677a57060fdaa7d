use clap::Args;

use super::super::Ctx;
use crate::Result;
use crate::core::{ArtifactName, Stage, query};

#[derive(Args, Debug)]
pub struct WhichArgs {
    pub artifact: String,
    pub stage: String,
}

pub(crate) fn handle(ctx: &Ctx, args: WhichArgs) -> Result<()> {
    let state = ctx.registry()?;
    let name = ArtifactName::parse(args.artifact)?;
    let stage = Stage::parse(args.stage)?;
    let versions = query::which(&state, &name, &stage)?;
    if ctx.json {
        super::print_json(&versions);
    } else {
        for version in &versions {
            println!("{version}");
        }
    }
    Ok(())
}
