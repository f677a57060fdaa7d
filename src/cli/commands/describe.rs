use clap::Args;

use super::super::{Ctx, render};
use crate::Result;
use crate::core::{ArtifactName, index, query};
use crate::error::{ConfigError, NotFoundError};

#[derive(Args, Debug)]
pub struct DescribeArgs {
    pub artifact: String,
}

pub(crate) fn handle(ctx: &Ctx, args: DescribeArgs) -> Result<()> {
    let name = ArtifactName::parse(args.artifact)?;

    // Metadata as of HEAD. A damaged index here is fatal, unlike during
    // historical scans.
    let head = ctx.repo.head_commit()?;
    let entry = match ctx.repo.blob_at(&head, &ctx.config.index)? {
        Some(bytes) => index::parse(&bytes)
            .map_err(|reason| ConfigError::MalformedIndex {
                path: ctx.config.index.clone(),
                reason,
            })?
            .get(&name)
            .cloned(),
        None => None,
    };

    let entry = match entry {
        Some(entry) => Some(entry),
        None => {
            // Fall back to the last metadata seen anywhere in history;
            // fail only if the registry has never heard of the artifact.
            let state = ctx.registry()?;
            query::describe(&state, &name)?
        }
    };

    match entry {
        Some(entry) => {
            if ctx.json {
                super::print_json(&entry);
            } else {
                println!("{}", render::render_describe(&entry));
            }
            Ok(())
        }
        None => Err(NotFoundError::Artifact {
            name: name.to_string(),
        }
        .into()),
    }
}
