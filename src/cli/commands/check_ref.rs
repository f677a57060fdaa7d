use clap::Args;

use super::super::Ctx;
use crate::Result;
use crate::core::query;

#[derive(Args, Debug)]
pub struct CheckRefArgs {
    /// A tag name to classify.
    pub reference: String,
}

pub(crate) fn handle(ctx: &Ctx, args: CheckRefArgs) -> Result<()> {
    let state = ctx.registry()?;
    let check = query::check_ref(&state, &args.reference, ctx.config.version_convention)?;
    if ctx.json {
        super::print_json(&check);
    } else {
        match &check.event {
            Some(event) => println!("{}", event.describe()),
            None => println!(
                "`{}` is a well-formed registry tag but the repository does not have it",
                args.reference
            ),
        }
    }
    Ok(())
}
