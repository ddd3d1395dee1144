use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};

use crate::{
    db::{
        helpers::{format_timestamp, parse_datetime},
        Database,
    },
    log_error, log_info, log_warn,
    models::{SubmissionInput, SubmissionRecord, SubmissionStats, SubmissionStatus},
    submissions::export::{self, CsvExport, ExportArtifact},
};

const ENABLE_LOGS: bool = true;

/// Slot holding the whole submission collection.
pub const STORAGE_KEY: &str = "ruoxi_contact_submissions";

pub const CLEAR_PROMPT: &str = "确定要清空所有提交记录吗？此操作不可恢复！";

/// Result of reading the persisted collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    Loaded(Vec<SubmissionRecord>),
    /// Nothing has been saved yet, or the collection was cleared.
    Missing,
    /// The slot exists but does not decode as a submission list.
    Corrupt { reason: String },
    /// The persistent area could not be read at all.
    Unavailable { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClearOutcome {
    Cleared,
    Declined,
    Failed { reason: String },
}

/// Yes/no gate consulted before destructive operations.
pub trait ConfirmGate {
    fn confirm(&self, prompt: &str) -> bool;
}

impl<F> ConfirmGate for F
where
    F: Fn(&str) -> bool,
{
    fn confirm(&self, prompt: &str) -> bool {
        self(prompt)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubmissionFilter {
    pub status: Option<SubmissionStatus>,
    /// Inclusive lower bound on the submission timestamp.
    pub since: Option<DateTime<Utc>>,
    /// Case-insensitive text matched against name, email, company and message.
    pub query: Option<String>,
}

impl SubmissionFilter {
    pub fn matches(&self, record: &SubmissionRecord) -> bool {
        if let Some(status) = self.status {
            if record.status != status {
                return false;
            }
        }

        if let Some(since) = self.since {
            match parse_datetime(&record.timestamp, "timestamp") {
                Ok(at) if at >= since => {}
                _ => return false,
            }
        }

        if let Some(query) = self.query.as_deref() {
            let needle = query.to_lowercase();
            let haystacks = [
                &record.name,
                &record.email,
                &record.company,
                &record.message,
            ];
            if !haystacks
                .iter()
                .any(|field| field.to_lowercase().contains(&needle))
            {
                return false;
            }
        }

        true
    }
}

/// Append-only log of contact-form submissions kept in one persistent slot.
///
/// Every mutation rewrites the whole collection. Read and persistence
/// failures are logged and degrade to an empty collection or a no-op.
#[derive(Clone)]
pub struct SubmissionStore {
    db: Database,
    key: String,
}

impl SubmissionStore {
    pub fn new(db: Database) -> Self {
        Self::with_key(db, STORAGE_KEY)
    }

    pub fn with_key(db: Database, key: impl Into<String>) -> Self {
        Self {
            db,
            key: key.into(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Append a submission and return the stored record.
    ///
    /// Read, append and write happen in one transaction on the database
    /// thread, so concurrent saves never drop each other's records.
    pub async fn try_save(&self, input: SubmissionInput) -> Result<SubmissionRecord> {
        let now = Utc::now();
        self.db
            .update_slot(&self.key, move |current| {
                let mut records = match decode_collection(current) {
                    LoadOutcome::Loaded(records) => records,
                    LoadOutcome::Corrupt { reason } => {
                        log_warn!("Discarding unreadable submission data: {reason}");
                        Vec::new()
                    }
                    _ => Vec::new(),
                };

                let id = next_id(&records, now.timestamp_millis())?;
                let record = SubmissionRecord::new(id, input, format_timestamp(now));
                records.push(record.clone());

                let encoded =
                    serde_json::to_string(&records).context("failed to encode submissions")?;
                Ok((encoded, record))
            })
            .await
    }

    /// Append a submission. Returns `false` (after logging) when it could not be persisted.
    pub async fn save(&self, input: SubmissionInput) -> bool {
        match self.try_save(input).await {
            Ok(record) => {
                log_info!("Saved submission {} ({})", record.id, record.email);
                true
            }
            Err(err) => {
                log_error!("Failed to save submission: {err:#}");
                false
            }
        }
    }

    pub async fn load(&self) -> LoadOutcome {
        match self.db.read_slot(&self.key).await {
            Ok(raw) => decode_collection(raw),
            Err(err) => LoadOutcome::Unavailable {
                reason: format!("{err:#}"),
            },
        }
    }

    /// All submissions in insertion order, empty when nothing readable is stored.
    pub async fn list(&self) -> Vec<SubmissionRecord> {
        match self.load().await {
            LoadOutcome::Loaded(records) => records,
            LoadOutcome::Missing => Vec::new(),
            LoadOutcome::Corrupt { reason } => {
                log_warn!("Stored submissions are unreadable: {reason}");
                Vec::new()
            }
            LoadOutcome::Unavailable { reason } => {
                log_error!("Failed to read submissions: {reason}");
                Vec::new()
            }
        }
    }

    pub async fn list_filtered(&self, filter: &SubmissionFilter) -> Vec<SubmissionRecord> {
        self.list()
            .await
            .into_iter()
            .filter(|record| filter.matches(record))
            .collect()
    }

    pub async fn find(&self, id: i64) -> Option<SubmissionRecord> {
        self.list().await.into_iter().find(|record| record.id == id)
    }

    pub async fn stats(&self) -> SubmissionStats {
        SubmissionStats::from_records(&self.list().await)
    }

    pub async fn export_json(&self, now: DateTime<Utc>) -> Result<ExportArtifact> {
        export::json_artifact(&self.list().await, now)
    }

    pub async fn export_csv(&self, now: DateTime<Utc>) -> CsvExport {
        export::csv_artifact(&self.list().await, now)
    }

    /// Delete the whole collection once `gate` confirms.
    pub async fn clear_all(&self, gate: &dyn ConfirmGate) -> ClearOutcome {
        if !gate.confirm(CLEAR_PROMPT) {
            return ClearOutcome::Declined;
        }

        match self.db.delete_slot(&self.key).await {
            Ok(existed) => {
                log_info!("Cleared submissions (slot present: {existed})");
                ClearOutcome::Cleared
            }
            Err(err) => {
                log_error!("Failed to clear submissions: {err:#}");
                ClearOutcome::Failed {
                    reason: format!("{err:#}"),
                }
            }
        }
    }
}

fn decode_collection(raw: Option<String>) -> LoadOutcome {
    let raw = match raw {
        Some(raw) if !raw.trim().is_empty() => raw,
        _ => return LoadOutcome::Missing,
    };

    match serde_json::from_str::<Vec<SubmissionRecord>>(&raw) {
        Ok(records) => LoadOutcome::Loaded(records),
        Err(err) => LoadOutcome::Corrupt {
            reason: err.to_string(),
        },
    }
}

/// Wall-clock millis, bumped past the newest stored id when the clock has not advanced.
fn next_id(records: &[SubmissionRecord], now_millis: i64) -> Result<i64> {
    match records.iter().map(|record| record.id).max() {
        Some(max) if now_millis <= max => max
            .checked_add(1)
            .ok_or_else(|| anyhow!("submission id space exhausted after {max}")),
        _ => Ok(now_millis),
    }
}
