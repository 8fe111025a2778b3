// ── Status classification ──
//
// Maps raw status strings onto a fixed set of named categories. Matching is
// case-insensitive and ignores surrounding whitespace; anything unmatched
// lands in an implicit "other" bucket that is never reported.

use std::borrow::Cow;

use crmdash_api::{College, Lead, Trainer, User};

use crate::model::Breakdown;

/// One named category and the raw statuses that select it.
#[derive(Debug, Clone, Copy)]
pub struct StatusBucket {
    pub category: &'static str,
    pub statuses: &'static [&'static str],
}

/// A fixed, ordered set of status buckets for one entity type.
#[derive(Debug, Clone, Copy)]
pub struct StatusClassifier {
    buckets: &'static [StatusBucket],
}

pub const LEADS: StatusClassifier = StatusClassifier::new(&[
    StatusBucket {
        category: "new",
        statuses: &["NEW", "START", ""],
    },
    StatusBucket {
        category: "qualified",
        statuses: &["QUALIFIED", "IN_PROGRESS", "IN_CONVERSATION"],
    },
    StatusBucket {
        category: "converted",
        statuses: &["CONVERTED", "CONVERT"],
    },
]);

pub const USERS: StatusClassifier = StatusClassifier::new(&[
    StatusBucket {
        category: "active",
        statuses: &["ACTIVE"],
    },
    StatusBucket {
        category: "inactive",
        statuses: &["INACTIVE", "SUSPENDED", "BLOCKED"],
    },
]);

pub const COLLEGES: StatusClassifier = StatusClassifier::new(&[
    StatusBucket {
        category: "active",
        statuses: &["ACTIVE"],
    },
    StatusBucket {
        category: "inactive",
        statuses: &["INACTIVE"],
    },
    StatusBucket {
        category: "pending",
        statuses: &["PENDING"],
    },
]);

pub const TRAINERS: StatusClassifier = StatusClassifier::new(&[
    StatusBucket {
        category: "available",
        statuses: &["AVAILABLE"],
    },
    StatusBucket {
        category: "busy",
        statuses: &["BUSY", "ENGAGED"],
    },
    StatusBucket {
        category: "unavailable",
        statuses: &["UNAVAILABLE", "ON_LEAVE"],
    },
]);

impl StatusClassifier {
    pub const fn new(buckets: &'static [StatusBucket]) -> Self {
        Self { buckets }
    }

    /// Category names in declaration order.
    pub fn categories(&self) -> impl Iterator<Item = &'static str> + use<> {
        let buckets: &'static [StatusBucket] = self.buckets;
        buckets.iter().map(|b| b.category)
    }

    /// The category a raw status falls into, or `None` for "other".
    pub fn category_of(&self, raw: &str) -> Option<&'static str> {
        let raw = raw.trim();
        self.buckets
            .iter()
            .find(|b| b.statuses.iter().any(|s| s.eq_ignore_ascii_case(raw)))
            .map(|b| b.category)
    }

    /// Every named category at 0.
    pub fn empty_breakdown(&self) -> Breakdown {
        self.categories().map(|c| (c.to_owned(), 0)).collect()
    }
}

/// The raw status string a record is classified by.
pub trait StatusKey {
    fn status_key(&self) -> Cow<'_, str>;
}

impl StatusKey for Lead {
    /// A missing status reads as `""`, which counts as "new".
    fn status_key(&self) -> Cow<'_, str> {
        Cow::Borrowed(self.status.as_deref().unwrap_or(""))
    }
}

impl StatusKey for User {
    /// `isActive` wins over `status` when the backend sends both.
    fn status_key(&self) -> Cow<'_, str> {
        match self.is_active {
            Some(true) => Cow::Borrowed("ACTIVE"),
            Some(false) => Cow::Borrowed("INACTIVE"),
            None => Cow::Borrowed(self.status.as_deref().unwrap_or("")),
        }
    }
}

impl StatusKey for College {
    fn status_key(&self) -> Cow<'_, str> {
        Cow::Borrowed(self.status.as_deref().unwrap_or(""))
    }
}

impl StatusKey for Trainer {
    fn status_key(&self) -> Cow<'_, str> {
        Cow::Borrowed(self.availability.as_deref().unwrap_or(""))
    }
}

/// Count the items on a page per named category.
///
/// Counts exactly the items given; unmatched statuses are dropped. Every
/// named category is present in the result, at 0 if nothing matched.
pub fn classify<T: StatusKey>(items: &[T], classifier: &StatusClassifier) -> Breakdown {
    let mut breakdown = classifier.empty_breakdown();
    for item in items {
        if let Some(category) = classifier.category_of(&item.status_key()) {
            if let Some(count) = breakdown.get_mut(category) {
                *count += 1;
            }
        }
    }
    breakdown
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn lead(status: Option<&str>) -> Lead {
        Lead {
            id: None,
            status: status.map(str::to_owned),
        }
    }

    #[test]
    fn lead_statuses_are_case_insensitive() {
        for raw in ["new", "NEW", "New", "", " start "] {
            assert_eq!(LEADS.category_of(raw), Some("new"), "status {raw:?}");
        }
        assert_eq!(LEADS.category_of("In_Conversation"), Some("qualified"));
        assert_eq!(LEADS.category_of("convert"), Some("converted"));
        assert_eq!(LEADS.category_of("LOST"), None);
    }

    #[test]
    fn classify_counts_named_buckets_and_drops_other() {
        let page = vec![
            lead(Some("NEW")),
            lead(None),
            lead(Some("qualified")),
            lead(Some("IN_PROGRESS")),
            lead(Some("Converted")),
            lead(Some("LOST")),
        ];

        let breakdown = classify(&page, &LEADS);

        let expected: Breakdown = [("new", 2), ("qualified", 2), ("converted", 1)]
            .into_iter()
            .map(|(k, v)| (k.to_owned(), v))
            .collect();
        assert_eq!(breakdown, expected);
    }

    #[test]
    fn classify_empty_page_yields_zeroes() {
        let breakdown = classify::<Lead>(&[], &LEADS);
        assert_eq!(breakdown.values().sum::<u64>(), 0);
        assert_eq!(breakdown.len(), 3);
    }

    #[test]
    fn user_is_active_flag_overrides_status() {
        let users = vec![
            User {
                id: None,
                is_active: Some(false),
                status: Some("ACTIVE".into()),
            },
            User {
                id: None,
                is_active: None,
                status: Some("suspended".into()),
            },
            User {
                id: None,
                is_active: Some(true),
                status: None,
            },
        ];

        let breakdown = classify(&users, &USERS);
        assert_eq!(breakdown["active"], 1);
        assert_eq!(breakdown["inactive"], 2);
    }

    #[test]
    fn trainers_classify_by_availability() {
        let trainers = vec![
            Trainer {
                id: None,
                availability: Some("available".into()),
            },
            Trainer {
                id: None,
                availability: Some("On_Leave".into()),
            },
            Trainer {
                id: None,
                availability: None,
            },
        ];

        let breakdown = classify(&trainers, &TRAINERS);
        assert_eq!(breakdown["available"], 1);
        assert_eq!(breakdown["busy"], 0);
        assert_eq!(breakdown["unavailable"], 1);
    }
}
