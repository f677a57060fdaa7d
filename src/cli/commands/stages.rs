use super::super::Ctx;
use crate::Result;
use crate::core::query;

pub(crate) fn handle(ctx: &Ctx) -> Result<()> {
    let state = ctx.registry()?;
    let stages = query::stages(&state, &ctx.config.stages);
    if ctx.json {
        super::print_json(&stages);
    } else {
        for stage in &stages {
            println!("{stage}");
        }
    }
    Ok(())
}
