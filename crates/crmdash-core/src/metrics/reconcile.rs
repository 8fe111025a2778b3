// ── Count reconciliation and breakdown estimation ──
//
// The declared pagination total is the ground truth for how many records
// exist; `data` is only the page we were handed. Breakdowns classified over
// a partial page are scaled up to the declared total.

use crmdash_api::ListResponse;

use super::classify::{StatusClassifier, StatusKey, classify};
use crate::model::{Breakdown, EntitySummary, SummaryBasis};

/// Result of [`reconcile_total`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconciledTotal {
    pub total: u64,
    /// `true` when no declared total was available and the page length was used.
    pub degraded: bool,
}

/// Authoritative record count for a list response.
///
/// Prefers `pagination.total`; falls back to the page length and flags the
/// count as degraded, since the page may be truncated.
pub fn reconcile_total<T>(response: &ListResponse<T>) -> ReconciledTotal {
    match response.declared_total() {
        Some(total) => ReconciledTotal {
            total,
            degraded: false,
        },
        None => ReconciledTotal {
            total: response.page_len(),
            degraded: true,
        },
    }
}

/// Scale a page breakdown up to the declared total.
///
/// When `total <= page_size` the page held the whole set and the counts are
/// returned unchanged. Otherwise each category becomes
/// `round(total * count / page_size)`, rounded independently, so the sum may
/// drift from `total` by a few units. A zero page size yields zeroes.
pub fn estimate_breakdown(total: u64, page: &Breakdown, page_size: u64) -> Breakdown {
    if total <= page_size {
        return page.clone();
    }
    page.iter()
        .map(|(category, &count)| (category.clone(), scale_rounded(total, count, page_size)))
        .collect()
}

/// `round(total * count / page_size)` with halves rounding up, in integers.
fn scale_rounded(total: u64, count: u64, page_size: u64) -> u64 {
    if page_size == 0 {
        return 0;
    }
    let numerator = u128::from(total) * u128::from(count);
    let denominator = u128::from(page_size);
    let rounded = (2 * numerator + denominator) / (2 * denominator);
    u64::try_from(rounded).unwrap_or(u64::MAX)
}

/// Build an [`EntitySummary`] from one page of a list endpoint.
pub fn summarize<T: StatusKey>(
    response: &ListResponse<T>,
    classifier: &StatusClassifier,
) -> EntitySummary {
    let reconciled = reconcile_total(response);
    let page_size = response.page_len();
    let page_breakdown = classify(&response.data, classifier);

    let basis = if reconciled.degraded {
        SummaryBasis::Degraded
    } else if reconciled.total <= page_size {
        SummaryBasis::Exact
    } else {
        SummaryBasis::Estimated
    };

    EntitySummary {
        total: reconciled.total,
        breakdown: estimate_breakdown(reconciled.total, &page_breakdown, page_size),
        basis,
    }
}
