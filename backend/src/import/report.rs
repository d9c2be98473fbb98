//! Per-row CSV report of a batch.

use serde::Serialize;
use std::io::Write;

use crate::models::{ImportRow, RowStatus};

#[derive(Serialize)]
struct ReportLine<'a> {
    line: usize,
    email: &'a str,
    status: RowStatus,
    message: &'a str,
    client_id: Option<&'a str>,
}

/// Write one CSV line per row, header first.
pub fn write_report<W: Write>(rows: &[ImportRow], writer: W) -> csv::Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);

    for row in rows {
        wtr.serialize(ReportLine {
            line: row.original_line_number,
            email: row.email(),
            status: row.status,
            message: &row.message,
            client_id: row.client.as_ref().map(|c| c.id.as_str()),
        })?;
    }

    wtr.flush()?;
    Ok(())
}

/// Report as a string, for download.
pub fn report_csv(rows: &[ImportRow]) -> csv::Result<String> {
    let mut buffer = Vec::new();
    write_report(rows, &mut buffer)?;
    Ok(String::from_utf8_lossy(&buffer).into_owned())
}

/// `client-import-report-<timestamp>.csv`
pub fn report_filename(completed_at: chrono::DateTime<chrono::Utc>) -> String {
    format!("client-import-report-{}.csv", completed_at.format("%Y%m%d-%H%M%S"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::LinkedClient;
    use chrono::TimeZone;

    #[test]
    fn test_report_lines() {
        let mut linked = ImportRow::new("a@b.com", 2);
        linked.set_status(RowStatus::Success, "Successfully added");
        linked.client = Some(LinkedClient {
            id: "c-9".into(),
            email: "a@b.com".into(),
            full_name: None,
        });
        let mut failed = ImportRow::new("c@d.com", 3);
        failed.set_status(RowStatus::Error, "No account, please invite first");

        let report = report_csv(&[linked, failed]).unwrap();
        let lines: Vec<&str> = report.lines().collect();

        assert_eq!(lines[0], "line,email,status,message,client_id");
        assert_eq!(lines[1], "2,a@b.com,success,Successfully added,c-9");
        assert_eq!(lines[2], "3,c@d.com,error,\"No account, please invite first\",");
    }

    #[test]
    fn test_report_filename() {
        let at = chrono::Utc.with_ymd_and_hms(2024, 5, 17, 9, 30, 0).unwrap();
        assert_eq!(report_filename(at), "client-import-report-20240517-093000.csv");
    }
}
