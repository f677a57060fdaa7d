use clap::Args;

use super::super::{Ctx, render};
use super::register::BumpArg;
use crate::Result;
use crate::core::{ArtifactName, Mutator, Stage};

#[derive(Args, Debug)]
pub struct AssignArgs {
    pub artifact: String,
    pub stage: String,

    /// Version to assign. Mutually exclusive with --at.
    #[arg(long, conflicts_with = "at")]
    pub version: Option<String>,

    /// Git ref to assign at; registers a new version there if needed.
    #[arg(long, value_name = "REF")]
    pub at: Option<String>,

    /// Which part to bump if a registration is needed.
    #[arg(long, value_enum)]
    pub bump: Option<BumpArg>,

    /// Override registration checks when a version is created.
    #[arg(long)]
    pub force: bool,
}

pub(crate) fn handle(ctx: &Ctx, args: AssignArgs) -> Result<()> {
    let name = ArtifactName::parse(args.artifact)?;
    let stage = Stage::parse(args.stage)?;
    let at_commit = match args.at.as_deref() {
        Some(reference) => Some(ctx.repo.resolve_commit(reference)?),
        None => None,
    };
    let state = ctx.registry()?;
    let plan = Mutator::new(&state, &ctx.config).assign(
        &name,
        &stage,
        args.version.as_deref(),
        at_commit.as_deref(),
        args.bump.map(Into::into),
        args.force,
    )?;
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
