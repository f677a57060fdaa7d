use clap::{Args, ValueEnum};

use super::super::{Ctx, render};
use crate::Result;
use crate::core::{ArtifactName, BumpPart, Mutator};

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum BumpArg {
    Major,
    Minor,
    Patch,
}

impl From<BumpArg> for BumpPart {
    fn from(arg: BumpArg) -> Self {
        match arg {
            BumpArg::Major => BumpPart::Major,
            BumpArg::Minor => BumpPart::Minor,
            BumpArg::Patch => BumpPart::Patch,
        }
    }
}

#[derive(Args, Debug)]
pub struct RegisterArgs {
    pub artifact: String,

    /// Explicit version; default is a bump of the latest.
    #[arg(long)]
    pub version: Option<String>,

    /// Git ref to register at.
    #[arg(long, default_value = "HEAD", value_name = "REF")]
    pub at: String,

    /// Which part to bump when computing the next semver version.
    #[arg(long, value_enum)]
    pub bump: Option<BumpArg>,

    /// Override deprecation and ordering checks.
    #[arg(long)]
    pub force: bool,
}

pub(crate) fn handle(ctx: &Ctx, args: RegisterArgs) -> Result<()> {
    let name = ArtifactName::parse(args.artifact)?;
    let target = ctx.repo.resolve_commit(&args.at)?;
    let state = ctx.registry()?;
    let plan = Mutator::new(&state, &ctx.config).register(
        &name,
        &target,
        args.version.as_deref(),
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
