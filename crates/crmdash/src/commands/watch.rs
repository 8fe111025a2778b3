//! `watch` command: run the polling tasks and print every published update.
//!
//! Table output redraws a frame per update. `json-compact` emits one JSON
//! document per line, suitable for piping into `jq`.

use std::time::Duration;

use chrono::Local;
use futures_util::StreamExt;
use tracing::{debug, info};

use crmdash_core::{Dashboard, DashboardConfig, DashboardState, DashboardWatchStream};

use crate::cli::{GlobalOpts, OutputFormat, WatchArgs};
use crate::error::CliError;
use crate::output;

pub async fn handle(
    mut config: DashboardConfig,
    args: WatchArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    if let Some(fast) = args.fast {
        config.fast_interval = Duration::from_secs(fast);
    }
    if let Some(slow) = args.slow {
        config.slow_interval = Duration::from_secs(slow);
    }

    let dashboard = Dashboard::new(config)?;

    let spinner = output::spinner("Running initial pass...", global.quiet);
    let started = dashboard.start().await;
    if let Some(pb) = spinner {
        pb.finish_and_clear();
    }
    let outcome = started?;
    info!(seq = outcome.seq, "initial pass published");

    // Yields the state published by the initial pass first.
    let mut updates = dashboard.subscribe().into_stream();
    let result = render_updates(&mut updates, args.iterations, global).await;

    dashboard.stop().await;
    result
}

async fn render_updates(
    updates: &mut DashboardWatchStream,
    limit: Option<u64>,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    let mut rendered: u64 = 0;
    loop {
        tokio::select! {
            _ = &mut ctrl_c => {
                debug!("interrupted");
                return Ok(());
            }
            next = updates.next() => {
                let Some(state) = next else {
                    return Ok(());
                };
                print_frame(&state, global)?;
                rendered += 1;
                if limit.is_some_and(|n| rendered >= n) {
                    return Ok(());
                }
            }
        }
    }
}

fn print_frame(state: &DashboardState, global: &GlobalOpts) -> Result<(), CliError> {
    let out = if global.output == OutputFormat::Table {
        let summaries = output::render_summaries(OutputFormat::Table, state)?;
        let charts = output::render_charts(OutputFormat::Table, state, true, true)?;
        format!("{}\n{summaries}\n\n{charts}\n", frame_header(state))
    } else {
        output::render_structured(global.output, state)?
    };

    output::print_warnings(state, global.color, global.quiet);
    output::print_output(&out, global.quiet);
    Ok(())
}

fn frame_header(state: &DashboardState) -> String {
    let at = state
        .summaries_updated_at
        .max(state.charts_updated_at)
        .map_or_else(
            || "-".to_owned(),
            |t| t.with_timezone(&Local).format("%H:%M:%S").to_string(),
        );
    format!(
        "── {at}  summaries #{}  charts #{} ──",
        state.summaries_seq, state.charts_seq
    )
}
