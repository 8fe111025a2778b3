//! `charts` command handler.

use crmdash_core::DashboardConfig;

use crate::cli::{ChartSelect, ChartsArgs, GlobalOpts};
use crate::error::CliError;
use crate::output;

pub async fn handle(
    config: DashboardConfig,
    args: ChartsArgs,
    profile: &str,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let state = super::fetch_once(config, profile, global).await?;

    let (crm, content) = match args.chart {
        ChartSelect::All => (true, true),
        ChartSelect::Crm => (true, false),
        ChartSelect::Content => (false, true),
    };
    let out = output::render_charts(global.output, &state, crm, content)?;
    output::print_output(&out, global.quiet);
    Ok(())
}
