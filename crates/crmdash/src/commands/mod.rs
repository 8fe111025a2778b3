//! Command dispatch: bridges CLI args -> core Dashboard -> output formatting.

pub mod charts;
pub mod config_cmd;
pub mod summary;
pub mod watch;

use std::sync::Arc;
use std::time::Duration;

use crmdash_core::{Dashboard, DashboardConfig, DashboardState};

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;
use crate::output;

/// Dispatch a backend-bound command to the appropriate handler.
pub async fn dispatch(
    cmd: Command,
    config: DashboardConfig,
    profile: &str,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match cmd {
        Command::Summary => summary::handle(config, profile, global).await,
        Command::Charts(args) => charts::handle(config, args, profile, global).await,
        Command::Watch(args) => watch::handle(config, args, global).await,
        // Config and Completions are handled before dispatch
        Command::Config(_) | Command::Completions(_) => unreachable!(),
    }
}

/// Run one aggregation pass, report warnings, and fail only when no
/// entity source could be loaded at all.
async fn fetch_once(
    config: DashboardConfig,
    profile: &str,
    global: &GlobalOpts,
) -> Result<Arc<DashboardState>, CliError> {
    let url = config.base_url.to_string();
    let timeout = config.timeout;

    let spinner = output::spinner("Aggregating dashboard metrics...", global.quiet);
    let result = Dashboard::oneshot(config).await;
    if let Some(pb) = spinner {
        pb.finish_and_clear();
    }
    let state = result?;

    output::print_warnings(&state, global.color, global.quiet);
    ensure_any_source(&state, &url, timeout, profile)?;
    Ok(state)
}

/// Partial failures are not errors; a dashboard with nothing loaded is.
fn ensure_any_source(
    state: &DashboardState,
    url: &str,
    timeout: Duration,
    profile: &str,
) -> Result<(), CliError> {
    if !state.all_sources_failed() {
        return Ok(());
    }
    if state.auth_rejected() {
        return Err(CliError::AuthFailed {
            profile: profile.to_owned(),
        });
    }
    if state.all_failures_timed_out() {
        return Err(CliError::Timeout {
            seconds: timeout.as_secs(),
        });
    }
    Err(CliError::AllSourcesFailed {
        url: url.to_owned(),
    })
}

#[cfg(test)]
mod tests {
    use crmdash_core::{SourceWarning, SummaryBasis, WarningKind};

    use super::*;
    use crate::error::exit_code;

    fn failed_pass(kind: &WarningKind) -> DashboardState {
        let mut state = DashboardState {
            summaries_seq: 1,
            ..DashboardState::default()
        };
        for (source, _) in state.summaries.entries() {
            state.summary_warnings.push(SourceWarning {
                source,
                kind: kind.clone(),
            });
        }
        state
    }

    fn exit_for(state: &DashboardState) -> Option<i32> {
        ensure_any_source(state, "http://localhost", Duration::from_secs(3), "default")
            .err()
            .map(|e| e.exit_code())
    }

    #[test]
    fn partial_failure_is_not_an_error() {
        let mut state = failed_pass(&WarningKind::TimedOut);
        state.summaries.leads.basis = SummaryBasis::Exact;
        assert_eq!(exit_for(&state), None);
    }

    #[test]
    fn total_failure_maps_to_the_cause() {
        let unauthorized = WarningKind::Unauthorized {
            reason: "HTTP 401".into(),
        };
        let unavailable = WarningKind::Unavailable {
            reason: "connection refused".into(),
        };

        assert_eq!(exit_for(&failed_pass(&unauthorized)), Some(exit_code::AUTH));
        assert_eq!(
            exit_for(&failed_pass(&WarningKind::TimedOut)),
            Some(exit_code::TIMEOUT)
        );
        assert_eq!(
            exit_for(&failed_pass(&unavailable)),
            Some(exit_code::CONNECTION)
        );
    }

    #[test]
    fn unpublished_state_is_not_a_failure() {
        assert_eq!(exit_for(&DashboardState::default()), None);
    }
}
