mod cli;
pub mod contact;
pub mod db;
pub mod models;
pub mod settings;
pub mod submissions;
pub mod sync;
mod utils;

use std::path::PathBuf;

use anyhow::{Context, Result};
use db::Database;
use settings::SettingsStore;
use submissions::SubmissionStore;

const DATA_DIR_ENV: &str = "CONTACT_LEDGER_DATA_DIR";
const DEFAULT_DATA_DIR: &str = "data";
const DB_FILE: &str = "contact-ledger.sqlite3";
const SETTINGS_FILE: &str = "settings.json";

pub(crate) struct AppState {
    pub(crate) store: SubmissionStore,
    pub(crate) settings: SettingsStore,
    data_dir: PathBuf,
}

impl AppState {
    pub(crate) fn open(data_dir: PathBuf) -> Result<Self> {
        std::fs::create_dir_all(&data_dir).with_context(|| {
            format!("failed to create data directory {}", data_dir.display())
        })?;

        let database = Database::new(data_dir.join(DB_FILE))?;
        let settings = SettingsStore::new(data_dir.join(SETTINGS_FILE))?;

        Ok(Self {
            store: SubmissionStore::new(database),
            settings,
            data_dir,
        })
    }

    pub(crate) fn export_dir(&self) -> PathBuf {
        self.settings
            .snapshot()
            .export_dir
            .unwrap_or_else(|| self.data_dir.join("exports"))
    }
}

fn data_dir() -> PathBuf {
    std::env::var_os(DATA_DIR_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR))
}

pub fn run() -> Result<()> {
    // Reads RUST_LOG; quiet by default so command output stays readable.
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let command = cli::parse_args(&args)?;
    if command == cli::Command::Help {
        println!("{}", cli::USAGE);
        return Ok(());
    }

    log::info!("contact-ledger starting up...");

    let state = AppState::open(data_dir())?;
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")?;

    let output = runtime.block_on(cli::execute(command, &state))?;
    if !output.is_empty() {
        println!("{output}");
    }

    Ok(())
}
