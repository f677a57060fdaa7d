use clap::Args;

use super::super::{Ctx, render};
use crate::Result;
use crate::core::{ArtifactName, Mutator, index};

#[derive(Args, Debug)]
pub struct AnnotateArgs {
    pub artifact: String,

    /// Artifact type (checked against the configured allow-list).
    #[arg(long = "type")]
    pub artifact_type: Option<String>,

    /// Path of the artifact, repo-relative or a URI.
    #[arg(long)]
    pub path: Option<String>,

    /// Whether the artifact's bytes live outside the repository.
    #[arg(long = "virtual", value_name = "BOOL")]
    pub is_virtual: Option<bool>,

    /// Labels; repeat for several.
    #[arg(long = "label")]
    pub labels: Vec<String>,

    #[arg(long)]
    pub description: Option<String>,
}

#[derive(Args, Debug)]
pub struct RemoveArgs {
    pub artifact: String,
}

pub(crate) fn handle(ctx: &Ctx, args: AnnotateArgs) -> Result<()> {
    let name = ArtifactName::parse(args.artifact)?;
    let root = ctx.repo.workdir()?;
    let worktree = index::read_worktree(root, &ctx.config.index)?;
    let state = ctx.registry()?;
    let edit = Mutator::new(&state, &ctx.config).annotate(
        &worktree,
        &name,
        args.artifact_type,
        args.path,
        args.is_virtual,
        args.labels,
        args.description,
    )?;
    index::write_worktree(root, &ctx.config.index, &edit.index)?;
    if ctx.json {
        super::print_json(&edit.index);
    } else {
        println!(
            "{}",
            render::ok(
                &format!("annotated {name} in {}", ctx.config.index),
                ctx.emojis
            )
        );
    }
    Ok(())
}

pub(crate) fn handle_remove(ctx: &Ctx, args: RemoveArgs) -> Result<()> {
    let name = ArtifactName::parse(args.artifact)?;
    let root = ctx.repo.workdir()?;
    let worktree = index::read_worktree(root, &ctx.config.index)?;
    let state = ctx.registry()?;
    let edit = Mutator::new(&state, &ctx.config).remove(&worktree, &name)?;
    index::write_worktree(root, &ctx.config.index, &edit.index)?;
    if ctx.json {
        super::print_json(&edit.index);
    } else {
        println!(
            "{}",
            render::ok(
                &format!("removed {name} from {}", ctx.config.index),
                ctx.emojis
            )
        );
    }
    Ok(())
}
