//! Command-line front end standing in for the contact page and its
//! maintenance helpers.

use std::{
    collections::{HashMap, HashSet},
    io::{self, BufRead, Write},
    path::PathBuf,
    time::Duration,
};

use anyhow::{anyhow, bail, Context, Result};
use chrono::Utc;

use crate::{
    contact::{SubmitFlow, SubmitOutcome},
    db::helpers::parse_datetime,
    models::{SubmissionInput, SubmissionStatus},
    submissions::{ClearOutcome, ConfirmGate, CsvExport, SubmissionFilter},
    sync::{HttpSubmissionSink, SubmissionSink},
    AppState,
};

pub(crate) const USAGE: &str = "usage: contact-ledger <command> [options]

commands:
  submit --name NAME --email EMAIL [--phone P] [--company C] [--service S] [--budget B] [--message M]
  list [--status pending|processed] [--since RFC3339] [--query TEXT]
  stats
  export <json|csv> [--out DIR]
  clear [--yes]
  send <id>
  settings [forward <on|off>]";

pub(crate) const NOTHING_TO_EXPORT: &str = "暂无数据可导出";
pub(crate) const CLEARED: &str = "数据已清空";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ExportFormat {
    Json,
    Csv,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Command {
    Help,
    Submit(SubmissionInput),
    List(SubmissionFilter),
    Stats,
    Export {
        format: ExportFormat,
        out: Option<PathBuf>,
    },
    Clear {
        assume_yes: bool,
    },
    Send {
        id: i64,
    },
    Settings {
        forward: Option<bool>,
    },
}

struct Flags {
    values: HashMap<String, String>,
    switches: HashSet<String>,
}

impl Flags {
    fn parse(args: &[String], value_flags: &[&str], switch_flags: &[&str]) -> Result<Self> {
        let mut values = HashMap::new();
        let mut switches = HashSet::new();

        let mut iter = args.iter();
        while let Some(arg) = iter.next() {
            let name = arg
                .strip_prefix("--")
                .ok_or_else(|| anyhow!("unexpected argument '{arg}'\n{USAGE}"))?;

            if switch_flags.contains(&name) {
                switches.insert(name.to_string());
            } else if value_flags.contains(&name) {
                let value = iter
                    .next()
                    .ok_or_else(|| anyhow!("--{name} needs a value"))?;
                values.insert(name.to_string(), value.clone());
            } else {
                bail!("unknown option --{name}\n{USAGE}");
            }
        }

        Ok(Self { values, switches })
    }

    fn take(&mut self, name: &str) -> Option<String> {
        self.values.remove(name)
    }

    fn has(&self, name: &str) -> bool {
        self.switches.contains(name)
    }
}

pub(crate) fn parse_args(args: &[String]) -> Result<Command> {
    let Some((command, rest)) = args.split_first() else {
        bail!(USAGE);
    };

    match command.as_str() {
        "help" | "--help" | "-h" => Ok(Command::Help),
        "submit" => {
            let mut flags = Flags::parse(
                rest,
                &["name", "email", "phone", "company", "service", "budget", "message"],
                &[],
            )?;
            let mut field = |name: &str| flags.take(name).unwrap_or_default();
            Ok(Command::Submit(SubmissionInput {
                name: field("name"),
                email: field("email"),
                phone: field("phone"),
                company: field("company"),
                service: field("service"),
                budget: field("budget"),
                message: field("message"),
            }))
        }
        "list" => {
            let mut flags = Flags::parse(rest, &["status", "since", "query"], &[])?;
            let status = flags
                .take("status")
                .map(|raw| raw.parse::<SubmissionStatus>())
                .transpose()?;
            let since = flags
                .take("since")
                .map(|raw| parse_datetime(&raw, "--since"))
                .transpose()?;
            Ok(Command::List(SubmissionFilter {
                status,
                since,
                query: flags.take("query"),
            }))
        }
        "stats" => {
            Flags::parse(rest, &[], &[])?;
            Ok(Command::Stats)
        }
        "export" => {
            let Some((format, rest)) = rest.split_first() else {
                bail!("usage: contact-ledger export <json|csv> [--out DIR]");
            };
            let format = match format.as_str() {
                "json" => ExportFormat::Json,
                "csv" => ExportFormat::Csv,
                other => bail!("unknown export format '{other}', expected json or csv"),
            };
            let mut flags = Flags::parse(rest, &["out"], &[])?;
            Ok(Command::Export {
                format,
                out: flags.take("out").map(PathBuf::from),
            })
        }
        "clear" => {
            let flags = Flags::parse(rest, &[], &["yes"])?;
            Ok(Command::Clear {
                assume_yes: flags.has("yes"),
            })
        }
        "send" => match rest {
            [id] => {
                let id = id
                    .parse::<i64>()
                    .with_context(|| format!("invalid submission id '{id}'"))?;
                Ok(Command::Send { id })
            }
            _ => bail!("usage: contact-ledger send <id>"),
        },
        "settings" => match rest {
            [] => Ok(Command::Settings { forward: None }),
            [key, value] if key == "forward" => {
                let forward = match value.as_str() {
                    "on" => true,
                    "off" => false,
                    other => bail!("expected on or off, got '{other}'"),
                };
                Ok(Command::Settings {
                    forward: Some(forward),
                })
            }
            _ => bail!("usage: contact-ledger settings [forward <on|off>]"),
        },
        other => bail!("unknown command '{other}'\n{USAGE}"),
    }
}

/// Asks on the terminal; anything but y/yes declines.
struct StdinConfirm;

impl ConfirmGate for StdinConfirm {
    fn confirm(&self, prompt: &str) -> bool {
        print!("{prompt} [y/N] ");
        if io::stdout().flush().is_err() {
            return false;
        }

        let mut answer = String::new();
        if io::stdin().lock().read_line(&mut answer).is_err() {
            return false;
        }
        is_affirmative(&answer)
    }
}

fn is_affirmative(answer: &str) -> bool {
    matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
}

/// Runs one command and returns the text to print.
pub(crate) async fn execute(command: Command, state: &AppState) -> Result<String> {
    match command {
        Command::Help => Ok(USAGE.to_string()),
        Command::Submit(input) => {
            let settings = state.settings.snapshot();
            let delay = Duration::from_millis(settings.submit_delay_ms);

            let outcome = if settings.sync.enabled && settings.sync.forward_on_submit {
                let sink = HttpSubmissionSink::from_settings(&settings.sync)?;
                SubmitFlow::new(state.store.clone(), delay)
                    .with_sink(sink)
                    .submit(input)
                    .await
            } else {
                SubmitFlow::<HttpSubmissionSink>::new(state.store.clone(), delay)
                    .submit(input)
                    .await
            };

            match outcome {
                SubmitOutcome::Accepted { message, .. } => Ok(message),
                SubmitOutcome::Rejected { reason } => bail!("提交无效：{reason}"),
                SubmitOutcome::Failed { message } => bail!(message),
            }
        }
        Command::List(filter) => {
            let records = state.store.list_filtered(&filter).await;
            Ok(serde_json::to_string_pretty(&records)?)
        }
        Command::Stats => {
            let stats = state.store.stats().await;
            Ok(format!(
                "total: {}\npending: {}\nprocessed: {}",
                stats.total, stats.pending, stats.processed
            ))
        }
        Command::Export { format, out } => {
            let dir = out.unwrap_or_else(|| state.export_dir());
            let now = Utc::now();
            let artifact = match format {
                ExportFormat::Json => state.store.export_json(now).await?,
                ExportFormat::Csv => match state.store.export_csv(now).await {
                    CsvExport::Artifact(artifact) => artifact,
                    CsvExport::NothingToExport => return Ok(NOTHING_TO_EXPORT.to_string()),
                },
            };
            let path = artifact.write_to(&dir)?;
            Ok(format!("已导出：{}", path.display()))
        }
        Command::Clear { assume_yes } => {
            let outcome = if assume_yes {
                state.store.clear_all(&|_: &str| true).await
            } else {
                state.store.clear_all(&StdinConfirm).await
            };
            match outcome {
                ClearOutcome::Cleared => Ok(CLEARED.to_string()),
                ClearOutcome::Declined => Ok(String::new()),
                ClearOutcome::Failed { reason } => bail!("failed to clear submissions: {reason}"),
            }
        }
        Command::Send { id } => {
            let sync = state.settings.sync();
            if !sync.enabled {
                bail!(
                    "sync is disabled; enable it in {}",
                    state.settings.path().display()
                );
            }
            let record = state
                .store
                .find(id)
                .await
                .ok_or_else(|| anyhow!("no submission with id {id}"))?;
            let sink = HttpSubmissionSink::from_settings(&sync)?;
            let response = sink
                .send_to_server(&record.input())
                .await
                .with_context(|| {
                    format!("failed to forward submission {id} to {}", sink.endpoint())
                })?;
            Ok(serde_json::to_string_pretty(&response)?)
        }
        Command::Settings { forward } => {
            if let Some(forward) = forward {
                let mut sync = state.settings.sync();
                sync.forward_on_submit = forward;
                if forward {
                    sync.enabled = true;
                }
                state.settings.update_sync(sync)?;
            }
            Ok(serde_json::to_string_pretty(&state.settings.snapshot())?)
        }
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    fn args(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| s.to_string()).collect()
    }

    fn state(dir: &tempfile::TempDir) -> AppState {
        fs::write(dir.path().join("settings.json"), r#"{ "submit_delay_ms": 0 }"#).unwrap();
        AppState::open(dir.path().to_path_buf()).unwrap()
    }

    async fn run(state: &AppState, raw: &[&str]) -> Result<String> {
        execute(parse_args(&args(raw))?, state).await
    }

    #[test]
    fn parses_submit_fields() {
        let command = parse_args(&args(&[
            "submit", "--name", "Ada", "--email", "ada@x.com", "--message", "Hi, there",
        ]))
        .unwrap();
        assert_eq!(
            command,
            Command::Submit(SubmissionInput::new("Ada", "ada@x.com").with_message("Hi, there"))
        );
    }

    #[test]
    fn parses_list_filters() {
        let command = parse_args(&args(&[
            "list",
            "--status",
            "processed",
            "--since",
            "2026-10-01T00:00:00Z",
            "--query",
            "acme",
        ]))
        .unwrap();
        let Command::List(filter) = command else {
            panic!("expected list");
        };
        assert_eq!(filter.status, Some(SubmissionStatus::Processed));
        assert!(filter.since.is_some());
        assert_eq!(filter.query.as_deref(), Some("acme"));
    }

    #[test]
    fn rejects_bad_arguments() {
        assert!(parse_args(&[]).is_err());
        assert!(parse_args(&args(&["frobnicate"])).is_err());
        assert!(parse_args(&args(&["submit", "--name"])).is_err());
        assert!(parse_args(&args(&["submit", "--colour", "red"])).is_err());
        assert!(parse_args(&args(&["list", "--status", "archived"])).is_err());
        assert!(parse_args(&args(&["export", "xml"])).is_err());
        assert!(parse_args(&args(&["send", "abc"])).is_err());
        assert!(parse_args(&args(&["settings", "forward", "maybe"])).is_err());
    }

    #[test]
    fn parses_clear_and_export() {
        assert_eq!(
            parse_args(&args(&["clear", "--yes"])).unwrap(),
            Command::Clear { assume_yes: true }
        );
        assert_eq!(
            parse_args(&args(&["export", "csv", "--out", "/tmp/x"])).unwrap(),
            Command::Export {
                format: ExportFormat::Csv,
                out: Some(PathBuf::from("/tmp/x")),
            }
        );
    }

    #[test]
    fn affirmative_answers() {
        assert!(is_affirmative("y\n"));
        assert!(is_affirmative(" YES "));
        assert!(!is_affirmative("\n"));
        assert!(!is_affirmative("nope"));
    }

    #[tokio::test]
    async fn submit_list_stats_and_clear() {
        let dir = tempfile::tempdir().unwrap();
        let state = state(&dir);

        let confirmation = run(&state, &["submit", "--name", "Ada", "--email", "ada@x.com"])
            .await
            .unwrap();
        assert!(confirmation.ends_with("已保存 1 条留言记录。"));

        let listed = run(&state, &["list", "--status", "pending"]).await.unwrap();
        let records: Vec<serde_json::Value> = serde_json::from_str(&listed).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0]["name"], "Ada");

        assert_eq!(
            run(&state, &["stats"]).await.unwrap(),
            "total: 1\npending: 1\nprocessed: 0"
        );

        assert_eq!(run(&state, &["clear", "--yes"]).await.unwrap(), CLEARED);
        assert_eq!(
            run(&state, &["stats"]).await.unwrap(),
            "total: 0\npending: 0\nprocessed: 0"
        );
    }

    #[tokio::test]
    async fn invalid_submission_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let state = state(&dir);

        let err = run(&state, &["submit", "--name", "Ada"]).await.unwrap_err();
        assert!(err.to_string().contains("请填写邮箱"));
    }

    #[tokio::test]
    async fn export_writes_files_or_reports_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let state = state(&dir);
        let out = dir.path().join("out");
        let out_arg = out.to_str().unwrap();

        assert_eq!(
            run(&state, &["export", "csv", "--out", out_arg]).await.unwrap(),
            NOTHING_TO_EXPORT
        );
        assert!(!out.exists());

        run(&state, &["submit", "--name", "Ada", "--email", "ada@x.com"])
            .await
            .unwrap();
        let message = run(&state, &["export", "csv", "--out", out_arg]).await.unwrap();
        assert!(message.starts_with("已导出："));

        let json_message = run(&state, &["export", "json"]).await.unwrap();
        assert!(json_message.contains("exports"));
        assert_eq!(fs::read_dir(&out).unwrap().count(), 1);
        assert_eq!(fs::read_dir(dir.path().join("exports")).unwrap().count(), 1);
    }

    #[tokio::test]
    async fn send_requires_sync_enabled() {
        let dir = tempfile::tempdir().unwrap();
        let state = state(&dir);

        let err = run(&state, &["send", "1"]).await.unwrap_err();
        assert!(err.to_string().contains("sync is disabled"));
    }

    #[tokio::test]
    async fn settings_forward_toggle_is_persisted() {
        let dir = tempfile::tempdir().unwrap();
        let state = state(&dir);

        let printed = run(&state, &["settings", "forward", "on"]).await.unwrap();
        let settings: serde_json::Value = serde_json::from_str(&printed).unwrap();
        assert_eq!(settings["sync"]["enabled"], true);
        assert_eq!(settings["sync"]["forward_on_submit"], true);

        let saved = fs::read_to_string(dir.path().join("settings.json")).unwrap();
        assert!(saved.contains("\"forward_on_submit\": true"));
    }
}
