//! Email validation and deduplication.
//!
//! Every candidate gets exactly one status, decided by the first rule that
//! matches, in this order:
//!
//! 1. format check        → `invalid`   "Invalid email format"
//! 2. seen earlier in file → `duplicate` "Duplicate entry in file"
//! 3. already on roster    → `duplicate` "Already connected to your practice"
//! 4. otherwise            → `valid`     "Ready to import"
//!
//! A malformed line is always `invalid`, even when it repeats an earlier
//! line, because the format check short-circuits the others.
//!
//! # Example
//!
//! ```rust,ignore
//! use rosterload::{classify_candidates, parse_emails, Roster, RowStatus};
//!
//! let candidates = parse_emails("email\na@b.com\nnot-an-email\nA@B.com")?;
//! let rows = classify_candidates(&candidates, &Roster::default());
//!
//! assert_eq!(rows[0].status, RowStatus::Valid);
//! assert_eq!(rows[1].status, RowStatus::Invalid);
//! assert_eq!(rows[2].status, RowStatus::Duplicate);
//! ```

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;

use crate::models::{ImportRow, RowStatus};
use crate::parser::Candidate;

pub const MSG_INVALID_FORMAT: &str = "Invalid email format";
pub const MSG_DUPLICATE_IN_FILE: &str = "Duplicate entry in file";
pub const MSG_ALREADY_CONNECTED: &str = "Already connected to your practice";
pub const MSG_READY: &str = "Ready to import";

static EMAIL_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern compiles"));

/// `local@domain.tld` shape: no whitespace, one `@`, a dot after it.
pub fn is_valid_email(email: &str) -> bool {
    EMAIL_PATTERN.is_match(email)
}

/// Emails already linked to the practice, compared case-insensitively.
///
/// Captured once when a file is previewed; it is not refreshed while the
/// import runs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Roster {
    emails: HashSet<String>,
}

impl Roster {
    pub fn new<I, S>(emails: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            emails: emails
                .into_iter()
                .map(|e| e.as_ref().trim().to_lowercase())
                .filter(|e| !e.is_empty())
                .collect(),
        }
    }

    /// One email per line; blank lines and an `email` header are ignored.
    pub fn from_lines(text: &str) -> Self {
        Self::new(
            text.lines()
                .map(|line| line.split(',').next().unwrap_or("").trim().trim_matches('"'))
                .filter(|line| !line.eq_ignore_ascii_case("email")),
        )
    }

    pub fn contains(&self, email: &str) -> bool {
        self.emails.contains(&email.trim().to_lowercase())
    }

    pub fn len(&self) -> usize {
        self.emails.len()
    }

    pub fn is_empty(&self) -> bool {
        self.emails.is_empty()
    }
}

/// Classify candidates into import rows, keeping file order.
///
/// Pure: the same candidates and roster always give the same rows.
pub fn classify_candidates(candidates: &[Candidate], roster: &Roster) -> Vec<ImportRow> {
    let mut seen: HashSet<String> = HashSet::with_capacity(candidates.len());

    candidates
        .iter()
        .map(|candidate| {
            let mut row = ImportRow::new(&candidate.email, candidate.line_number);
            let (status, message) = classify(row.email(), &mut seen, roster);
            row.set_status(status, message);
            row
        })
        .collect()
}

fn classify(email: &str, seen: &mut HashSet<String>, roster: &Roster) -> (RowStatus, &'static str) {
    if !is_valid_email(email) {
        return (RowStatus::Invalid, MSG_INVALID_FORMAT);
    }

    // Recorded before the roster check: a roster duplicate still counts as seen.
    if !seen.insert(email.to_string()) {
        return (RowStatus::Duplicate, MSG_DUPLICATE_IN_FILE);
    }

    if roster.contains(email) {
        return (RowStatus::Duplicate, MSG_ALREADY_CONNECTED);
    }

    (RowStatus::Valid, MSG_READY)
}

/// Number of rows that would be sent to the client directory.
pub fn count_valid(rows: &[ImportRow]) -> usize {
    rows.iter().filter(|r| r.is_valid()).count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_emails;

    fn statuses(rows: &[ImportRow]) -> Vec<(&str, RowStatus)> {
        rows.iter().map(|r| (r.email(), r.status)).collect()
    }

    #[test]
    fn test_email_format() {
        assert!(is_valid_email("a@b.com"));
        assert!(is_valid_email("first.last+tag@sub.domain.co.uk"));
        assert!(!is_valid_email("not-an-email"));
        assert!(!is_valid_email("a@b"));
        assert!(!is_valid_email("a@@b.com"));
        assert!(!is_valid_email("a b@c.com"));
        assert!(!is_valid_email("@b.com"));
        assert!(!is_valid_email(""));
    }

    #[test]
    fn test_scenario_in_batch_duplicate() {
        let candidates = parse_emails("email\na@b.com\nnot-an-email\nA@B.com").unwrap();
        let rows = classify_candidates(&candidates, &Roster::default());

        assert_eq!(
            statuses(&rows),
            vec![
                ("a@b.com", RowStatus::Valid),
                ("not-an-email", RowStatus::Invalid),
                ("a@b.com", RowStatus::Duplicate),
            ]
        );
        assert_eq!(rows[0].message, MSG_READY);
        assert_eq!(rows[1].message, MSG_INVALID_FORMAT);
        assert_eq!(rows[2].message, MSG_DUPLICATE_IN_FILE);
        assert_eq!(rows[2].original_line_number, 4);
    }

    #[test]
    fn test_scenario_roster_duplicate_still_seen() {
        let candidates = parse_emails("email\na@b.com\nnot-an-email\nA@B.com").unwrap();
        let roster = Roster::new(["A@b.COM"]);
        let rows = classify_candidates(&candidates, &roster);

        assert_eq!(rows[0].status, RowStatus::Duplicate);
        assert_eq!(rows[0].message, MSG_ALREADY_CONNECTED);
        assert_eq!(rows[1].status, RowStatus::Invalid);
        assert_eq!(rows[2].status, RowStatus::Duplicate);
        assert_eq!(rows[2].message, MSG_DUPLICATE_IN_FILE);
    }

    #[test]
    fn test_malformed_repeat_is_invalid() {
        let candidates = parse_emails("bad-email\nbad-email\nbad-email").unwrap();
        let rows = classify_candidates(&candidates, &Roster::default());

        assert!(rows.iter().all(|r| r.status == RowStatus::Invalid));
    }

    #[test]
    fn test_invalid_does_not_enter_seen_set() {
        let candidates = parse_emails("a@b\na@b.com\na@b.com").unwrap();
        let rows = classify_candidates(&candidates, &Roster::default());

        assert_eq!(rows[0].status, RowStatus::Invalid);
        assert_eq!(rows[1].status, RowStatus::Valid);
        assert_eq!(rows[2].status, RowStatus::Duplicate);
    }

    #[test]
    fn test_deterministic() {
        let candidates = parse_emails("x@y.com\nX@Y.com\nnope\nz@y.com\nq@y.com").unwrap();
        let roster = Roster::new(["q@y.com"]);

        let first = classify_candidates(&candidates, &roster);
        let second = classify_candidates(&candidates, &roster);
        assert_eq!(first, second);
        assert_eq!(count_valid(&first), 2);
    }

    #[test]
    fn test_roster_from_lines() {
        let roster = Roster::from_lines("email\nAnn@Spa.com\n\n\"bo@spa.com\",Bo\n");

        assert_eq!(roster.len(), 2);
        assert!(roster.contains("ann@spa.com"));
        assert!(roster.contains("BO@SPA.COM"));
        assert!(!roster.contains("email"));
    }
}
