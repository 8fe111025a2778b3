//! Output formatting: table, JSON, YAML.
//!
//! Renders dashboard state in the format selected by `--output`. Tables use
//! `tabled`, structured formats use serde. The partial-failure banner and
//! per-source warnings go to stderr so stdout stays machine-readable.

use std::io::{self, IsTerminal, Write};
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use owo_colors::OwoColorize;
use serde::Serialize;
use tabled::builder::Builder;
use tabled::{Table, Tabled, settings::Style};

use crmdash_core::{ChartSeries, DashboardState, EntitySummary, SeriesSource, Source};

use crate::cli::{ColorMode, OutputFormat};
use crate::error::CliError;

// ── Color helpers ────────────────────────────────────────────────────

/// Determine whether color output should be enabled for `stream`.
pub fn should_color(mode: ColorMode, stream: &impl IsTerminal) -> bool {
    match mode {
        ColorMode::Always => true,
        ColorMode::Never => false,
        ColorMode::Auto => stream.is_terminal() && std::env::var_os("NO_COLOR").is_none(),
    }
}

// ── Spinner ──────────────────────────────────────────────────────────

/// A stderr spinner, only when stderr is interactive and not quiet.
pub fn spinner(message: &'static str, quiet: bool) -> Option<ProgressBar> {
    if quiet || !io::stderr().is_terminal() {
        return None;
    }
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner} {msg}") {
        pb.set_style(style);
    }
    pb.set_message(message);
    pb.enable_steady_tick(Duration::from_millis(80));
    Some(pb)
}

// ── Rows ─────────────────────────────────────────────────────────────

#[derive(Tabled)]
struct SummaryRow {
    #[tabled(rename = "Entity")]
    entity: String,
    #[tabled(rename = "Total")]
    total: u64,
    #[tabled(rename = "Breakdown")]
    breakdown: String,
    #[tabled(rename = "Basis")]
    basis: String,
}

impl SummaryRow {
    fn new(source: Source, summary: &EntitySummary) -> Self {
        let breakdown = summary
            .breakdown
            .iter()
            .map(|(category, count)| format!("{category} {count}"))
            .collect::<Vec<_>>()
            .join(", ");
        Self {
            entity: source.to_string(),
            total: summary.total,
            breakdown: if breakdown.is_empty() {
                "-".into()
            } else {
                breakdown
            },
            basis: summary.basis.to_string(),
        }
    }
}

// ── Structured payloads ──────────────────────────────────────────────

#[derive(Serialize)]
struct SummaryPayload<'a> {
    #[serde(flatten)]
    summaries: &'a crmdash_core::Summaries,
    warnings: Vec<&'a crmdash_core::SourceWarning>,
}

#[derive(Serialize)]
struct ChartsPayload<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    crm: Option<&'a ChartSeries>,
    #[serde(skip_serializing_if = "Option::is_none")]
    content: Option<&'a ChartSeries>,
    warnings: Vec<&'a crmdash_core::SourceWarning>,
}

// ── Render dispatchers ───────────────────────────────────────────────

/// Render the entity summaries of `state`.
pub fn render_summaries(format: OutputFormat, state: &DashboardState) -> Result<String, CliError> {
    match format {
        OutputFormat::Table => {
            let rows: Vec<SummaryRow> = state
                .summaries
                .entries()
                .iter()
                .map(|(source, summary)| SummaryRow::new(*source, summary))
                .collect();
            Ok(render_table(&rows))
        }
        _ => render_structured(
            format,
            &SummaryPayload {
                summaries: &state.summaries,
                warnings: state.summary_warnings.iter().collect(),
            },
        ),
    }
}

/// Render the selected chart series of `state`.
pub fn render_charts(
    format: OutputFormat,
    state: &DashboardState,
    crm: bool,
    content: bool,
) -> Result<String, CliError> {
    let payload = ChartsPayload {
        crm: crm.then_some(&state.charts.crm),
        content: content.then_some(&state.charts.content),
        warnings: state.chart_warnings.iter().collect(),
    };
    match format {
        OutputFormat::Table => {
            let sections: Vec<String> = [("CRM", payload.crm), ("Content", payload.content)]
                .into_iter()
                .filter_map(|(title, series)| series.map(|s| render_chart_table(title, s)))
                .collect();
            Ok(sections.join("\n\n"))
        }
        _ => render_structured(format, &payload),
    }
}

fn render_chart_table(title: &str, series: &ChartSeries) -> String {
    let provenance = match series.source {
        SeriesSource::History => "history",
        SeriesSource::Synthetic => "synthetic, derived from current totals",
    };

    let names = series.series_names();
    let mut builder = Builder::default();
    builder.push_record(
        std::iter::once("Month".to_owned()).chain(names.iter().map(|name| (*name).to_owned())),
    );
    for point in &series.points {
        builder.push_record(
            std::iter::once(point.month.clone())
                .chain(names.iter().map(|name| point.value(name).to_string())),
        );
    }

    let table = builder.build().with(Style::rounded()).to_string();
    format!("{title} ({provenance})\n{table}")
}

/// Print the rendered output to stdout, respecting quiet mode.
pub fn print_output(output: &str, quiet: bool) {
    if quiet || output.is_empty() {
        return;
    }
    let mut stdout = io::stdout().lock();
    let _ = writeln!(stdout, "{output}");
}

/// Print the partial-failure banner and per-source warnings to stderr.
///
/// The banner is shown even in quiet mode; the per-source lines are not.
pub fn print_warnings(state: &DashboardState, color: ColorMode, quiet: bool) {
    let mut stderr = io::stderr().lock();
    let color = should_color(color, &io::stderr());

    if let Some(banner) = state.banner() {
        if color {
            let _ = writeln!(stderr, "{}", banner.yellow().bold());
        } else {
            let _ = writeln!(stderr, "{banner}");
        }
    }
    if quiet {
        return;
    }
    for warning in state.warnings() {
        let line = format!("  ! {warning}");
        if !color {
            let _ = writeln!(stderr, "{line}");
        } else if warning.is_failure() {
            let _ = writeln!(stderr, "{}", line.red());
        } else {
            let _ = writeln!(stderr, "{}", line.dimmed());
        }
    }
}

// ── Format-specific renderers ────────────────────────────────────────

fn render_table<R: Tabled>(rows: &[R]) -> String {
    Table::new(rows).with(Style::rounded()).to_string()
}

/// Serialize `data` as JSON or YAML; `table` falls back to pretty JSON.
pub fn render_structured<T: Serialize + ?Sized>(
    format: OutputFormat,
    data: &T,
) -> Result<String, CliError> {
    Ok(match format {
        OutputFormat::JsonCompact => serde_json::to_string(data)?,
        OutputFormat::Yaml => serde_yaml::to_string(data)?,
        OutputFormat::Json | OutputFormat::Table => serde_json::to_string_pretty(data)?,
    })
}

#[cfg(test)]
mod tests {
    use crmdash_core::{SourceWarning, SummaryBasis};

    use super::*;

    fn state_with_leads() -> DashboardState {
        let mut state = DashboardState::default();
        state.summaries.leads = EntitySummary {
            total: 9,
            breakdown: [("new".to_owned(), 5), ("qualified".to_owned(), 5)]
                .into_iter()
                .collect(),
            basis: SummaryBasis::Estimated,
        };
        state
            .summary_warnings
            .push(SourceWarning::degraded_count(Source::Courses, 3));
        state
    }

    #[test]
    fn summary_table_lists_every_entity() {
        let out = render_summaries(OutputFormat::Table, &state_with_leads()).unwrap_or_default();
        for entity in ["leads", "users", "colleges", "trainers", "blogs", "videos", "courses"] {
            assert!(out.contains(entity), "missing {entity} in:\n{out}");
        }
        assert!(out.contains("new 5, qualified 5"));
        assert!(out.contains("estimated"));
    }

    #[test]
    fn summary_json_flattens_entities_and_keeps_warnings() {
        let out =
            render_summaries(OutputFormat::JsonCompact, &state_with_leads()).unwrap_or_default();
        let value: serde_json::Value = serde_json::from_str(&out).unwrap_or_default();

        assert_eq!(value["leads"]["total"], 9);
        assert_eq!(value["leads"]["breakdown"]["qualified"], 5);
        assert_eq!(value["warnings"][0]["source"], "courses");
        assert_eq!(value["warnings"][0]["kind"], "degraded_count");
    }

    #[test]
    fn chart_selection_omits_the_other_series() {
        let state = DashboardState::default();
        let out = render_charts(OutputFormat::JsonCompact, &state, true, false).unwrap_or_default();
        let value: serde_json::Value = serde_json::from_str(&out).unwrap_or_default();

        assert!(value.get("crm").is_some());
        assert!(value.get("content").is_none());
    }

    #[test]
    fn chart_table_labels_synthetic_series() {
        let state = DashboardState::default();
        let out = render_charts(OutputFormat::Table, &state, false, true).unwrap_or_default();
        assert!(out.starts_with("Content (synthetic"));
    }

    #[test]
    fn never_color_wins_over_terminal() {
        assert!(!should_color(ColorMode::Never, &io::stdout()));
        assert!(should_color(ColorMode::Always, &io::stdout()));
    }
}
