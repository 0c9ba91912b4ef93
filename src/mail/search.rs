use anyhow::{Context, Result};
use chrono::NaiveDate;

use crate::domain::email::EmailId;

/// Which messages of the inbox an operation looks at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchCriteria {
    All,
    Unseen,
    /// Substring of the `From` header.
    FromSender(String),
    DateRange {
        since: Option<NaiveDate>,
        before: Option<NaiveDate>,
    },
}

impl SearchCriteria {
    /// Render as an IMAP `SEARCH` key list.
    pub fn to_imap_query(&self) -> String {
        match self {
            SearchCriteria::All => "ALL".to_string(),
            SearchCriteria::Unseen => "UNSEEN".to_string(),
            SearchCriteria::FromSender(from) => format!("HEADER FROM {}", quote(from)),
            SearchCriteria::DateRange { since, before } => {
                let mut keys = Vec::new();
                if let Some(d) = since {
                    keys.push(format!("SINCE {}", imap_date(*d)));
                }
                if let Some(d) = before {
                    keys.push(format!("BEFORE {}", imap_date(*d)));
                }
                if keys.is_empty() {
                    "ALL".to_string()
                } else {
                    keys.join(" ")
                }
            }
        }
    }
}

/// Parse a `YYYY-MM-DD` date as given on the command line.
pub fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
        .with_context(|| format!("invalid date {s:?}, expected YYYY-MM-DD"))
}

/// The `limit` newest UIDs, oldest first.
pub fn newest(ids: impl IntoIterator<Item = EmailId>, limit: usize) -> Vec<EmailId> {
    let mut ids: Vec<EmailId> = ids.into_iter().collect();
    ids.sort_unstable();
    ids.dedup();
    let start = ids.len().saturating_sub(limit);
    ids.split_off(start)
}

fn imap_date(d: NaiveDate) -> String {
    d.format("%d-%b-%Y").to_string()
}

fn quote(s: &str) -> String {
    format!("\"{}\"", s.replace('\\', "\\\\").replace('"', "\\\""))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_queries() {
        assert_eq!(SearchCriteria::All.to_imap_query(), "ALL");
        assert_eq!(SearchCriteria::Unseen.to_imap_query(), "UNSEEN");
    }

    #[test]
    fn test_from_sender_is_quoted() {
        let q = SearchCriteria::FromSender("bob@x.io".into()).to_imap_query();
        assert_eq!(q, "HEADER FROM \"bob@x.io\"");
        let q = SearchCriteria::FromSender("a\"b".into()).to_imap_query();
        assert_eq!(q, "HEADER FROM \"a\\\"b\"");
    }

    #[test]
    fn test_date_range() {
        let since = parse_date("2025-12-04").unwrap();
        let before = parse_date("2026-01-15").unwrap();
        let q = SearchCriteria::DateRange {
            since: Some(since),
            before: Some(before),
        }
        .to_imap_query();
        assert_eq!(q, "SINCE 04-Dec-2025 BEFORE 15-Jan-2026");

        let q = SearchCriteria::DateRange {
            since: None,
            before: Some(before),
        }
        .to_imap_query();
        assert_eq!(q, "BEFORE 15-Jan-2026");
    }

    #[test]
    fn test_empty_date_range_is_all() {
        let q = SearchCriteria::DateRange {
            since: None,
            before: None,
        }
        .to_imap_query();
        assert_eq!(q, "ALL");
    }

    #[test]
    fn test_parse_date_rejects_other_formats() {
        assert!(parse_date("04.12.2025").is_err());
        assert!(parse_date("2025-13-01").is_err());
    }

    #[test]
    fn test_newest_keeps_highest_in_ascending_order() {
        assert_eq!(newest([9, 3, 7, 1, 5], 3), vec![5, 7, 9]);
        assert_eq!(newest([2, 1], 10), vec![1, 2]);
        assert!(newest(Vec::new(), 5).is_empty());
        assert!(newest([1, 2], 0).is_empty());
    }
}
