use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
    sync::{PoisonError, RwLock},
};

use crate::log_warn;

const ENABLE_LOGS: bool = true;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SyncSettings {
    /// Allows any traffic to the backend at all.
    pub enabled: bool,
    /// Forward every new submission from the submit flow.
    pub forward_on_submit: bool,
    pub base_url: String,
    pub timeout_secs: u64,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            forward_on_submit: false,
            base_url: "http://127.0.0.1:8080".into(),
            timeout_secs: 15,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LedgerSettings {
    pub sync: SyncSettings,
    pub export_dir: Option<PathBuf>,
    pub submit_delay_ms: u64,
}

impl Default for LedgerSettings {
    fn default() -> Self {
        Self {
            sync: SyncSettings::default(),
            export_dir: None,
            submit_delay_ms: 1500,
        }
    }
}

pub struct SettingsStore {
    path: PathBuf,
    data: RwLock<LedgerSettings>,
}

impl SettingsStore {
    pub fn new(path: PathBuf) -> Result<Self> {
        let data = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read settings from {}", path.display()))?;
            serde_json::from_str(&contents).unwrap_or_else(|err| {
                log_warn!(
                    "Ignoring unreadable settings in {}: {err}",
                    path.display()
                );
                LedgerSettings::default()
            })
        } else {
            LedgerSettings::default()
        };

        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn snapshot(&self) -> LedgerSettings {
        self.data
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn sync(&self) -> SyncSettings {
        self.snapshot().sync
    }

    pub fn update_sync(&self, settings: SyncSettings) -> Result<()> {
        let mut guard = self.data.write().unwrap_or_else(PoisonError::into_inner);
        guard.sync = settings;
        self.persist(&guard)
    }

    fn persist(&self, data: &LedgerSettings) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create settings directory {}", parent.display())
            })?;
        }
        let serialized = serde_json::to_string_pretty(data)?;
        fs::write(&self.path, serialized)
            .with_context(|| format!("Failed to write settings to {}", self.path.display()))
    }
}
