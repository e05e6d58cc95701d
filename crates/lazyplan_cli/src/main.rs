//! CLI entry point.
//!
//! # Responsibility
//! - With no arguments, print a probe verifying `lazyplan_core` linkage.
//! - `demo <fixture.json> [config.json]` seeds the in-memory store from a JSON
//!   fixture, runs one refresh and prints the Today board.

use chrono::{Local, NaiveDate};
use futures::executor::block_on;
use lazyplan_core::{
    CatalogEntry, CatalogKind, EngineConfig, InMemoryStore, RemoteEntry, RemoteNote, Slot,
    TodayService,
};
use log::info;
use serde::Deserialize;
use std::fmt::{Display, Formatter};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

/// Remote data used to seed the demo board.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Fixture {
    /// Day to show; defaults to today.
    date: Option<NaiveDate>,
    entries: Vec<RemoteEntry>,
    notes: Vec<RemoteNote>,
    tasks: Vec<CatalogEntry>,
    habits: Vec<CatalogEntry>,
}

impl Fixture {
    fn into_store(self) -> (InMemoryStore, Option<NaiveDate>) {
        let store = InMemoryStore::new();
        for entry in self.entries {
            store.insert_entry(entry);
        }
        for note in self.notes {
            store.insert_note(note);
        }
        store.set_catalog(CatalogKind::Task, self.tasks);
        store.set_catalog(CatalogKind::Habit, self.habits);
        (store, self.date)
    }
}

#[derive(Debug)]
enum CliError {
    Usage,
    Read { path: PathBuf, message: String },
    Parse { path: PathBuf, message: String },
    Engine(String),
}

impl Display for CliError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Usage => write!(f, "usage: lazyplan_cli [demo <fixture.json> [config.json]]"),
            Self::Read { path, message } => {
                write!(f, "cannot read {}: {message}", path.display())
            }
            Self::Parse { path, message } => {
                write!(f, "invalid JSON in {}: {message}", path.display())
            }
            Self::Engine(message) => write!(f, "{message}"),
        }
    }
}

fn read_json<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<T, CliError> {
    let raw = fs::read_to_string(path).map_err(|err| CliError::Read {
        path: path.to_path_buf(),
        message: err.to_string(),
    })?;
    serde_json::from_str(&raw).map_err(|err| CliError::Parse {
        path: path.to_path_buf(),
        message: err.to_string(),
    })
}

fn run_demo(fixture_path: &Path, config_path: Option<&Path>) -> Result<(), CliError> {
    let config: EngineConfig = match config_path {
        Some(path) => read_json(path)?,
        None => EngineConfig::default(),
    };
    if let Some(dir) = &config.log_dir {
        let cwd = std::env::current_dir().map_err(|err| CliError::Read {
            path: dir.clone(),
            message: err.to_string(),
        })?;
        lazyplan_core::init_logging(&config.log_level, cwd.join(dir))
            .map_err(|err| CliError::Engine(err.to_string()))?;
    }

    let fixture: Fixture = read_json(fixture_path)?;
    let (store, date) = fixture.into_store();
    let date = date.unwrap_or_else(|| Local::now().date_naive());
    let service = TodayService::new(store, date, config)
        .map_err(|err| CliError::Engine(err.to_string()))?;
    let report = block_on(service.refresh()).map_err(|err| CliError::Engine(err.to_string()))?;
    info!(
        "event=cli_demo module=cli status=ok items_added={} notes_added={}",
        report.entries.added, report.notes.added
    );

    println!("Today {date}");
    service.with_state(|state| {
        for slot in Slot::ALL {
            println!("[{slot}]");
            for item in state.items_in(slot) {
                let mark = if item.completed { "x" } else { " " };
                match item.reward {
                    Some(reward) => println!("  [{mark}] {} (+{reward:.1})", item.title),
                    None => println!("  [{mark}] {}", item.title),
                }
            }
        }
        println!("[notes]");
        for note in state.notes().iter() {
            let pin = if note.pinned { "*" } else { "-" };
            println!("  {pin} {}", note.content);
        }
    });
    Ok(())
}

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let result = match args.as_slice() {
        [] => {
            println!("lazyplan_core ping={}", lazyplan_core::ping());
            println!("lazyplan_core version={}", lazyplan_core::core_version());
            Ok(())
        }
        [cmd, fixture] if cmd == "demo" => run_demo(Path::new(fixture), None),
        [cmd, fixture, config] if cmd == "demo" => {
            run_demo(Path::new(fixture), Some(Path::new(config)))
        }
        _ => Err(CliError::Usage),
    };
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{err}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Fixture;

    #[test]
    fn fixture_parses_with_missing_sections() {
        let fixture: Fixture = serde_json::from_str(
            r#"{
                "date": "2024-05-01",
                "notes": [{"id": 1, "content": "hi", "created_at": "2024-05-01 08:00", "updated_at": "2024-05-01 08:00"}]
            }"#,
        )
        .unwrap();
        assert!(fixture.entries.is_empty());
        assert_eq!(fixture.notes.len(), 1);
        assert!(!fixture.notes[0].pinned);

        let (store, date) = fixture.into_store();
        assert_eq!(store.note_count(), 1);
        assert_eq!(date.map(|d| d.to_string()).as_deref(), Some("2024-05-01"));
    }
}
