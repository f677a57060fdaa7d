use clap::Args;

use super::super::{Ctx, render};
use crate::Result;
use crate::core::{ArtifactName, Mutator};

#[derive(Args, Debug)]
pub struct DeregisterArgs {
    pub artifact: String,
    pub version: String,

    /// Delete the version's tags instead of writing a deregistration tag.
    #[arg(long)]
    pub delete: bool,
}

pub(crate) fn handle(ctx: &Ctx, args: DeregisterArgs) -> Result<()> {
    let name = ArtifactName::parse(args.artifact)?;
    let state = ctx.registry()?;
    let mutator = Mutator::new(&state, &ctx.config);

    if args.delete {
        let tags = mutator.deregister_delete(&name, &args.version)?;
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

    let plan = mutator.deregister(&name, &args.version)?;
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
