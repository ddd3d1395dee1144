//! JSON and CSV renderings of the submission collection.

use std::{
    borrow::Cow,
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};

use crate::{db::helpers::export_date, models::SubmissionRecord};

const FILE_STEM: &str = "contact_submissions";
const UTF8_BOM: &str = "\u{feff}";

pub const JSON_MIME: &str = "application/json";
pub const CSV_MIME: &str = "text/csv;charset=utf-8";

/// Column labels as they appear in spreadsheets opened by the site's staff.
pub const CSV_HEADERS: [&str; 10] = [
    "ID",
    "姓名",
    "邮箱",
    "电话",
    "公司",
    "服务类型",
    "预算",
    "留言",
    "提交时间",
    "状态",
];

/// A generated export file, not yet written anywhere.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportArtifact {
    pub file_name: String,
    pub mime_type: &'static str,
    pub bytes: Vec<u8>,
}

impl ExportArtifact {
    /// Write the artifact into `dir` under its file name, creating `dir` if needed.
    pub fn write_to(&self, dir: &Path) -> Result<PathBuf> {
        fs::create_dir_all(dir)
            .with_context(|| format!("failed to create export directory {}", dir.display()))?;
        let path = dir.join(&self.file_name);
        fs::write(&path, &self.bytes)
            .with_context(|| format!("failed to write export {}", path.display()))?;
        Ok(path)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CsvExport {
    Artifact(ExportArtifact),
    NothingToExport,
}

fn file_name(now: DateTime<Utc>, extension: &str) -> String {
    format!("{FILE_STEM}_{}.{extension}", export_date(now))
}

pub fn json_artifact(records: &[SubmissionRecord], now: DateTime<Utc>) -> Result<ExportArtifact> {
    let body = serde_json::to_string_pretty(records).context("failed to encode JSON export")?;
    Ok(ExportArtifact {
        file_name: file_name(now, "json"),
        mime_type: JSON_MIME,
        bytes: body.into_bytes(),
    })
}

pub fn csv_artifact(records: &[SubmissionRecord], now: DateTime<Utc>) -> CsvExport {
    if records.is_empty() {
        return CsvExport::NothingToExport;
    }

    let mut rows = Vec::with_capacity(records.len() + 1);
    rows.push(CSV_HEADERS.join(","));
    rows.extend(records.iter().map(csv_row));

    let mut body = String::from(UTF8_BOM);
    body.push_str(&rows.join("\n"));

    CsvExport::Artifact(ExportArtifact {
        file_name: file_name(now, "csv"),
        mime_type: CSV_MIME,
        bytes: body.into_bytes(),
    })
}

fn csv_row(record: &SubmissionRecord) -> String {
    let id = record.id.to_string();
    let fields = [
        escape_field(&id),
        escape_field(&record.name),
        escape_field(&record.email),
        escape_field(&record.phone),
        escape_field(&record.company),
        escape_field(&record.service),
        escape_field(&record.budget),
        Cow::Owned(quote(&record.message)),
        escape_field(&record.timestamp),
        escape_field(record.status.as_str()),
    ];
    fields.join(",")
}

/// Fields stay bare unless they would break the row.
fn escape_field(value: &str) -> Cow<'_, str> {
    if value.contains([',', '"', '\n', '\r']) {
        Cow::Owned(quote(value))
    } else {
        Cow::Borrowed(value)
    }
}

fn quote(value: &str) -> String {
    format!("\"{}\"", value.replace('"', "\"\""))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    use crate::models::{SubmissionInput, SubmissionStatus};

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 17, 9, 0, 0).unwrap()
    }

    fn record(id: i64, input: SubmissionInput) -> SubmissionRecord {
        SubmissionRecord::new(id, input, "2026-10-17T08:30:00.000Z".to_string())
    }

    fn csv_text(artifact: &ExportArtifact) -> String {
        String::from_utf8(artifact.bytes.clone()).unwrap()
    }

    #[test]
    fn json_export_round_trips() {
        let records = vec![
            record(1, SubmissionInput::new("Ada", "ada@x.com").with_message("Hello")),
            record(2, SubmissionInput::new("Lin", "lin@x.com")),
        ];
        let artifact = json_artifact(&records, at()).unwrap();

        assert_eq!(artifact.file_name, "contact_submissions_2026-10-17.json");
        assert_eq!(artifact.mime_type, JSON_MIME);

        let text = String::from_utf8(artifact.bytes).unwrap();
        assert!(text.contains("\n  {"), "expected two-space indentation:\n{text}");
        let parsed: Vec<SubmissionRecord> = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed, records);
    }

    #[test]
    fn json_export_of_empty_collection_is_empty_array() {
        let artifact = json_artifact(&[], at()).unwrap();
        assert_eq!(artifact.bytes, b"[]");
    }

    #[test]
    fn empty_csv_export_has_nothing_to_export() {
        assert_eq!(csv_artifact(&[], at()), CsvExport::NothingToExport);
    }

    #[test]
    fn csv_has_bom_header_and_plain_rows() {
        let mut input = SubmissionInput::new("Ada", "ada@x.com").with_message("Hello");
        input.phone = "555".into();
        input.company = "Acme".into();
        let records = vec![record(1760000000000, input)];

        let CsvExport::Artifact(artifact) = csv_artifact(&records, at()) else {
            panic!("expected an artifact");
        };
        assert_eq!(artifact.file_name, "contact_submissions_2026-10-17.csv");
        assert!(artifact.bytes.starts_with(&[0xEF, 0xBB, 0xBF]));

        let text = csv_text(&artifact);
        let mut lines = text.trim_start_matches(UTF8_BOM).split('\n');
        assert_eq!(
            lines.next().unwrap(),
            "ID,姓名,邮箱,电话,公司,服务类型,预算,留言,提交时间,状态"
        );

        let row = lines.next().unwrap();
        let fields: Vec<&str> = row.split(',').collect();
        assert_eq!(
            fields,
            vec![
                "1760000000000",
                "Ada",
                "ada@x.com",
                "555",
                "Acme",
                "",
                "",
                "\"Hello\"",
                "2026-10-17T08:30:00.000Z",
                "pending",
            ]
        );
        assert!(lines.next().is_none());
    }

    #[test]
    fn message_quotes_are_doubled() {
        let records = vec![record(
            1,
            SubmissionInput::new("Ada", "ada@x.com").with_message("He said \"hi\""),
        )];
        let CsvExport::Artifact(artifact) = csv_artifact(&records, at()) else {
            panic!("expected an artifact");
        };
        assert!(csv_text(&artifact).contains(",\"He said \"\"hi\"\"\","));
    }

    #[test]
    fn fields_with_commas_are_quoted() {
        let mut input = SubmissionInput::new("Lovelace, Ada", "ada@x.com");
        input.budget = "5,000".into();
        let records = vec![record(1, input)];

        let CsvExport::Artifact(artifact) = csv_artifact(&records, at()) else {
            panic!("expected an artifact");
        };
        let text = csv_text(&artifact);
        let row = text.split('\n').nth(1).unwrap();
        assert_eq!(
            row,
            "1,\"Lovelace, Ada\",ada@x.com,,,,\"5,000\",\"\",2026-10-17T08:30:00.000Z,pending"
        );
    }

    #[test]
    fn rows_follow_collection_order() {
        let mut processed = record(2, SubmissionInput::new("Lin", "lin@x.com"));
        processed.status = SubmissionStatus::Processed;
        let records = vec![record(1, SubmissionInput::new("Ada", "ada@x.com")), processed];

        let CsvExport::Artifact(artifact) = csv_artifact(&records, at()) else {
            panic!("expected an artifact");
        };
        let text = csv_text(&artifact);
        let rows: Vec<&str> = text.split('\n').skip(1).collect();
        assert_eq!(rows.len(), 2);
        assert!(rows[0].starts_with("1,Ada,"));
        assert!(rows[1].starts_with("2,Lin,"));
        assert!(rows[1].ends_with(",processed"));
    }

    #[test]
    fn artifact_is_written_under_its_file_name() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("exports");
        let artifact = json_artifact(&[], at()).unwrap();

        let path = artifact.write_to(&target).unwrap();
        assert_eq!(path, target.join("contact_submissions_2026-10-17.json"));
        assert_eq!(std::fs::read(&path).unwrap(), b"[]");
    }
}
