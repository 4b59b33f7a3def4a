//! Attendance report (CSV)

use geoclock_api::AttendanceEntry;
use geoclock_util::{format_clock_time, format_date, format_worked_duration};
use std::io;
use thiserror::Error;

/// Column headers, in order
pub const REPORT_HEADERS: [&str; 8] = [
    "Employee Name",
    "Email",
    "Date",
    "Job Site",
    "Clock In",
    "Clock Out",
    "Duration",
    "Status",
];

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// One report row as it appears in the file
pub fn report_row(entry: &AttendanceEntry) -> [String; 8] {
    let session = &entry.session;
    let (clock_out, duration) = match session.clock_out_time {
        Some(out) => (
            format_clock_time(&out),
            format_worked_duration(out.signed_duration_since(session.clock_in_time)),
        ),
        None => (String::new(), "Active".to_string()),
    };

    [
        entry.employee_name.clone().unwrap_or_else(|| "Unknown".into()),
        entry.employee_email.clone().unwrap_or_default(),
        format_date(&session.clock_in_time),
        entry.site_name.clone().unwrap_or_else(|| "Unassigned".into()),
        format_clock_time(&session.clock_in_time),
        clock_out,
        duration,
        session.status.label().to_string(),
    ]
}

/// Write the attendance log as CSV, header first
pub fn write_attendance_csv<W: io::Write>(
    writer: W,
    entries: &[AttendanceEntry],
) -> Result<(), ReportError> {
    let mut csv = csv::WriterBuilder::new()
        .quote_style(csv::QuoteStyle::Necessary)
        .from_writer(writer);

    csv.write_record(REPORT_HEADERS)?;
    for entry in entries {
        csv.write_record(report_row(entry))?;
    }
    csv.flush()?;
    Ok(())
}
