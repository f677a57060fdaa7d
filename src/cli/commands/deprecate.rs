use clap::Args;

use super::super::{Ctx, render};
use crate::Result;
use crate::core::{ArtifactName, Mutator};

#[derive(Args, Debug)]
pub struct DeprecateArgs {
    pub artifact: String,

    /// Delete deprecation tags instead of writing one.
    #[arg(long)]
    pub delete: bool,
}

pub(crate) fn handle(ctx: &Ctx, args: DeprecateArgs) -> Result<()> {
    let name = ArtifactName::parse(args.artifact)?;
    let state = ctx.registry()?;
    let mutator = Mutator::new(&state, &ctx.config);

    if args.delete {
        let tags = mutator.deprecate_delete(&name)?;
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

    let head = ctx.repo.head_commit()?;
    let plan = mutator.deprecate(&name, &head)?;
    ctx.apply_writes(&plan)?;
    if ctx.json {
        super::print_json(&plan);
    } else if plan.is_empty() {
        println!("{name} is already deprecated");
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
