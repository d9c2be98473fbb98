//! Aggregate counts of a finished batch.

use crate::models::{ImportRow, ImportSummary, RowStatus};

/// Count final row states.
pub fn summarize(rows: &[ImportRow]) -> ImportSummary {
    rows.iter().fold(
        ImportSummary {
            total: rows.len(),
            ..ImportSummary::default()
        },
        |mut summary, row| {
            match row.status {
                RowStatus::Success => summary.successful += 1,
                RowStatus::Error => summary.failed += 1,
                RowStatus::Duplicate => summary.duplicates += 1,
                RowStatus::Invalid => summary.invalid += 1,
                RowStatus::Pending | RowStatus::Valid => {}
            }
            summary
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(email: &str, status: RowStatus) -> ImportRow {
        let mut row = ImportRow::new(email, 1);
        row.set_status(status, "");
        row
    }

    #[test]
    fn test_counts_by_status() {
        let rows = vec![
            row("a@b.com", RowStatus::Success),
            row("c@d.com", RowStatus::Error),
            row("c@d.com", RowStatus::Duplicate),
            row("nope", RowStatus::Invalid),
            row("e@f.com", RowStatus::Success),
        ];

        let summary = summarize(&rows);

        assert_eq!(
            summary,
            ImportSummary {
                total: 5,
                successful: 2,
                failed: 1,
                duplicates: 1,
                invalid: 1,
            }
        );
        assert_eq!(summary.attempted(), 3);
        assert_eq!(
            summary.total,
            summary.successful + summary.failed + summary.duplicates + summary.invalid
        );
    }

    #[test]
    fn test_empty_rows() {
        assert_eq!(summarize(&[]), ImportSummary::default());
    }
}
