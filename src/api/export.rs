use chrono_tz::Tz;

use crate::{
    domain::{round2, AnalysisRecord},
    text::truncate_chars,
};

pub const CSV_FILENAME: &str = "spam_analysis_export.csv";
const CSV_HEADER: [&str; 6] = [
    "ID",
    "Prediction",
    "Confidence (%)",
    "Latency (ms)",
    "Date",
    "Preview",
];
const PREVIEW_CHARS: usize = 100;

/// Renders records as RFC 4180 CSV with CRLF line endings; dates are shown
/// in `tz`.
pub fn render_csv(records: &[AnalysisRecord], tz: Tz) -> String {
    let mut out = String::new();
    write_row(&mut out, CSV_HEADER.iter().map(|s| s.to_string()));

    for record in records {
        let preview = truncate_chars(&record.email_content, PREVIEW_CHARS).replace('\n', " ");
        write_row(
            &mut out,
            [
                record.id.to_string(),
                record.prediction.as_str().to_uppercase(),
                record.confidence_percentage().to_string(),
                round2(record.latency_ms).to_string(),
                record
                    .created_at
                    .with_timezone(&tz)
                    .format("%Y-%m-%d %H:%M:%S")
                    .to_string(),
                preview,
            ],
        );
    }
    out
}

fn write_row<I: IntoIterator<Item = String>>(out: &mut String, fields: I) {
    for (idx, field) in fields.into_iter().enumerate() {
        if idx > 0 {
            out.push(',');
        }
        if field.contains(|c: char| matches!(c, ',' | '"' | '\n' | '\r')) {
            out.push('"');
            out.push_str(&field.replace('"', "\"\""));
            out.push('"');
        } else {
            out.push_str(&field);
        }
    }
    out.push_str("\r\n");
}
