//! Contact-form submission models.
//!
//! Records are persisted as one JSON array; field names match the documents
//! the site has always written (`name`, `email`, ..., `id`, `timestamp`,
//! `status`).

use std::{fmt, str::FromStr};

use anyhow::{anyhow, Error};
use serde::{Deserialize, Deserializer, Serialize};

/// Missing and `null` form values both decode as an empty string.
fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum SubmissionStatus {
    Pending,
    Processed,
}

impl SubmissionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubmissionStatus::Pending => "pending",
            SubmissionStatus::Processed => "processed",
        }
    }
}

impl fmt::Display for SubmissionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SubmissionStatus {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "pending" => Ok(SubmissionStatus::Pending),
            "processed" => Ok(SubmissionStatus::Processed),
            other => Err(anyhow!("unknown submission status '{other}'")),
        }
    }
}

/// Values collected from the contact form.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SubmissionInput {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub name: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub email: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub phone: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub company: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub service: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub budget: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub message: String,
}

impl SubmissionInput {
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
            ..Self::default()
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }
}

/// A stored submission.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SubmissionRecord {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub name: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub email: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub phone: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub company: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub service: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub budget: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub message: String,
    /// Creation time in epoch milliseconds, unique within the collection.
    pub id: i64,
    /// ISO-8601 creation time, e.g. `2026-10-17T08:30:00.123Z`.
    pub timestamp: String,
    pub status: SubmissionStatus,
}

impl SubmissionRecord {
    pub fn new(id: i64, input: SubmissionInput, timestamp: String) -> Self {
        let SubmissionInput {
            name,
            email,
            phone,
            company,
            service,
            budget,
            message,
        } = input;

        Self {
            name,
            email,
            phone,
            company,
            service,
            budget,
            message,
            id,
            timestamp,
            status: SubmissionStatus::Pending,
        }
    }

    /// The caller-supplied part of the record, as sent to the backend.
    pub fn input(&self) -> SubmissionInput {
        SubmissionInput {
            name: self.name.clone(),
            email: self.email.clone(),
            phone: self.phone.clone(),
            company: self.company.clone(),
            service: self.service.clone(),
            budget: self.budget.clone(),
            message: self.message.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SubmissionStats {
    pub total: usize,
    pub pending: usize,
    pub processed: usize,
}

impl SubmissionStats {
    pub fn from_records(records: &[SubmissionRecord]) -> Self {
        let count = |status: SubmissionStatus| records.iter().filter(|r| r.status == status).count();
        Self {
            total: records.len(),
            pending: count(SubmissionStatus::Pending),
            processed: count(SubmissionStatus::Processed),
        }
    }
}
