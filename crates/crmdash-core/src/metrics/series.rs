// ── Chart series derivation ──
//
// A chart is either real history from a backend endpoint, used verbatim, or
// a synthetic growth curve derived from current totals. The synthetic curve
// is always tagged as such so it can never be mistaken for history.

use chrono::{Datelike, Months, NaiveDate};
use crmdash_api::ChartHistory;
use indexmap::IndexMap;
use serde_json::Value;
use tracing::debug;

use crate::error::SourceError;
use crate::model::{ChartPoint, ChartSeries, SeriesSource, Source, SourceWarning, WarningKind};

/// Number of monthly points in a synthetic series.
pub const DEFAULT_SERIES_LEN: usize = 6;

const MONTH_LABEL_FORMAT: &str = "%b %Y";

/// Labels for the `len` calendar months ending with the month of `anchor`,
/// oldest first (`"Dec 2025"`, `"Jan 2026"`, ...).
pub fn month_labels(anchor: NaiveDate, len: usize) -> Vec<String> {
    let first_of_month = anchor.with_day(1).unwrap_or(anchor);
    (0..len)
        .rev()
        .filter_map(|back| {
            let back = u32::try_from(back).ok()?;
            first_of_month.checked_sub_months(Months::new(back))
        })
        .map(|month| month.format(MONTH_LABEL_FORMAT).to_string())
        .collect()
}

/// `floor(total * (index + 1) / len)`.
fn growth_value(total: u64, index: usize, len: usize) -> u64 {
    if len == 0 {
        return 0;
    }
    let step = u128::from(u64::try_from(index + 1).unwrap_or(u64::MAX));
    let len = u128::from(u64::try_from(len).unwrap_or(u64::MAX));
    u64::try_from(u128::from(total) * step / len).unwrap_or(u64::MAX)
}

/// Synthetic growth curve: point `i` of each metric is
/// `floor(total * (i + 1) / len)`, so the last point equals the current total.
pub fn synthesize_series(totals: &[(&str, u64)], len: usize, anchor: NaiveDate) -> ChartSeries {
    let points = month_labels(anchor, len)
        .into_iter()
        .enumerate()
        .map(|(index, month)| ChartPoint {
            month,
            metrics: totals
                .iter()
                .map(|&(name, total)| (name.to_owned(), growth_value(total, index, len)))
                .collect(),
        })
        .collect();

    ChartSeries {
        source: SeriesSource::Synthetic,
        points,
    }
}

/// Why a history payload was not used.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HistoryRejection {
    /// No points at all. Treated like a missing endpoint.
    Empty,
    /// A point or one of its fields has the wrong shape.
    Malformed { field: String },
}

/// Validate raw history points.
///
/// Every point must be an object with a string `month`. Every other field is
/// a series value: non-negative numbers are accepted (floats are floored),
/// anything else rejects the whole history. `prefix` names the array in the
/// rejection, e.g. `data.chartData[2].leads`.
pub fn parse_history(raw: &[Value], prefix: &str) -> Result<Vec<ChartPoint>, HistoryRejection> {
    if raw.is_empty() {
        return Err(HistoryRejection::Empty);
    }

    raw.iter()
        .enumerate()
        .map(|(index, point)| parse_point(point).map_err(|field| malformed(prefix, index, &field)))
        .collect()
}

fn malformed(prefix: &str, index: usize, field: &str) -> HistoryRejection {
    let field = if field.is_empty() {
        format!("{prefix}[{index}]")
    } else {
        format!("{prefix}[{index}].{field}")
    };
    HistoryRejection::Malformed { field }
}

/// Parse one point; on failure returns the offending field name (empty for
/// the point itself).
fn parse_point(point: &Value) -> Result<ChartPoint, String> {
    let Some(object) = point.as_object() else {
        return Err(String::new());
    };
    let month = object
        .get("month")
        .and_then(Value::as_str)
        .ok_or_else(|| "month".to_owned())?;

    let mut metrics = IndexMap::with_capacity(object.len().saturating_sub(1));
    for (key, value) in object {
        if key == "month" {
            continue;
        }
        let count = series_value(value).ok_or_else(|| key.clone())?;
        metrics.insert(key.clone(), count);
    }

    Ok(ChartPoint {
        month: month.to_owned(),
        metrics,
    })
}

#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::as_conversions
)]
fn series_value(value: &Value) -> Option<u64> {
    if let Some(n) = value.as_u64() {
        return Some(n);
    }
    // Floats saturate at u64::MAX on cast.
    let f = value.as_f64()?;
    (f.is_finite() && f >= 0.0).then(|| f.floor() as u64)
}

fn history_prefix(source: Source) -> &'static str {
    match source {
        Source::CrmChart => "data.chartData",
        _ => "data",
    }
}

/// Resolve one chart from its history fetch and the current totals.
///
/// `history` is `None` when the endpoint is disabled or absent (404); both
/// fall back silently. A failed fetch or a malformed payload also falls back
/// to the synthetic curve, and returns a warning for the state.
pub fn build_chart_series(
    source: Source,
    totals: &[(&str, u64)],
    history: Option<Result<ChartHistory, SourceError>>,
    len: usize,
    anchor: NaiveDate,
) -> (ChartSeries, Option<SourceWarning>) {
    let synthetic = || synthesize_series(totals, len, anchor);

    let raw = match history {
        None => return (synthetic(), None),
        Some(Err(err)) => return (synthetic(), Some(err.into_warning())),
        Some(Ok(raw)) => raw,
    };

    match parse_history(&raw, history_prefix(source)) {
        Ok(points) => (
            ChartSeries {
                source: SeriesSource::History,
                points,
            },
            None,
        ),
        Err(HistoryRejection::Empty) => {
            debug!(%source, "history endpoint returned no points, using synthetic series");
            (synthetic(), None)
        }
        Err(HistoryRejection::Malformed { field }) => (
            synthetic(),
            Some(SourceWarning {
                source,
                kind: WarningKind::Malformed { field },
            }),
        ),
    }
}
