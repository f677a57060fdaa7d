use clap::Args;

use super::super::{Ctx, render};
use crate::Result;
use crate::core::{ArtifactName, Mutator, Stage};

#[derive(Args, Debug)]
pub struct UnassignArgs {
    pub artifact: String,
    pub stage: String,

    /// Delete the stage's tags instead of writing an unassignment tag.
    #[arg(long)]
    pub delete: bool,
}

pub(crate) fn handle(ctx: &Ctx, args: UnassignArgs) -> Result<()> {
    let name = ArtifactName::parse(args.artifact)?;
    let stage = Stage::parse(args.stage)?;
    let state = ctx.registry()?;
    let mutator = Mutator::new(&state, &ctx.config);

    if args.delete {
        let tags = mutator.unassign_delete(&name, &stage)?;
        ctx.apply_deletes(&tags)?;
        if ctx.json {
            super::print_json(&tags);
        } else {
            for tag in &tags {
                println!("{}", render::ok(&format!("deleted tag {tag}"), ctx.emojis));
            }
        }
        return Ok(());
    }

    let plan = mutator.unassign(&name, &stage)?;
    ctx.apply_writes(&plan)?;
    if ctx.json {
        super::print_json(&plan);
    } else {
        for write in &plan {
            println!(
                "{}",
                render::ok(&format!("created tag {}", write.tag), ctx.emojis)
            );
        }
    }
    Ok(())
}
