//! `summary` command handler.

use crmdash_core::DashboardConfig;

use crate::cli::GlobalOpts;
use crate::error::CliError;
use crate::output;

pub async fn handle(
    config: DashboardConfig,
    profile: &str,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let state = super::fetch_once(config, profile, global).await?;
    let out = output::render_summaries(global.output, &state)?;
    output::print_output(&out, global.quiet);
    Ok(())
}
