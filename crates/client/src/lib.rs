//! Command line composition root for interaction scenarios.
//!
//! Loads a scenario, builds a [`Session`] over the configured event log, runs
//! the script and writes the resulting records to the given output as JSON
//! lines.

use std::env;
use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};
use interaction_runtime::{
    EventRepository, FileEventLog, InMemoryEventLog, LogRecord, RunSummary, Scenario, Session,
    read_all,
};

/// Simulator configuration.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SimConfig {
    pub scenario: Option<PathBuf>,
    /// Directory for the JSON-lines event log. In memory when unset.
    pub log_dir: Option<PathBuf>,
    /// Suppress printing records to stdout.
    pub quiet: bool,
}

impl SimConfig {
    /// Construct configuration from process environment variables.
    ///
    /// Environment variables:
    /// - `INTERACTION_SCENARIO` - Scenario RON file
    /// - `INTERACTION_LOG_DIR` - Directory for the event log (default: in memory)
    /// - `INTERACTION_QUIET` - Skip printing records (default: false)
    pub fn from_env() -> Self {
        Self {
            scenario: env::var_os("INTERACTION_SCENARIO").map(PathBuf::from),
            log_dir: env::var_os("INTERACTION_LOG_DIR").map(PathBuf::from),
            quiet: read_env::<bool>("INTERACTION_QUIET").unwrap_or(false),
        }
    }

    /// Applies command line arguments: an optional scenario path, `--log-dir
    /// <dir>` and `--quiet`.
    pub fn with_args<I>(mut self, args: I) -> Result<Self>
    where
        I: IntoIterator<Item = String>,
    {
        let mut args = args.into_iter();
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--quiet" | "-q" => self.quiet = true,
                "--log-dir" => {
                    let dir = args.next().context("--log-dir needs a directory")?;
                    self.log_dir = Some(PathBuf::from(dir));
                }
                flag if flag.starts_with('-') => anyhow::bail!("unknown option {flag}"),
                path => self.scenario = Some(PathBuf::from(path)),
            }
        }
        Ok(self)
    }
}

fn read_env<T>(key: &str) -> Option<T>
where
    T: std::str::FromStr,
{
    env::var(key).ok()?.parse().ok()
}

/// Runs the configured scenario and writes every record to `out`.
pub fn run(config: &SimConfig, out: &mut dyn Write) -> Result<RunSummary> {
    let path = config
        .scenario
        .as_ref()
        .context("no scenario given: pass a path or set INTERACTION_SCENARIO")?;
    let scenario = Scenario::load_from_file(path)
        .with_context(|| format!("loading scenario {}", path.display()))?;

    let (summary, records) = match &config.log_dir {
        Some(dir) => {
            let filename = format!("{}.events.jsonl", file_stem(&scenario));
            let log = FileEventLog::create(dir, &filename)
                .with_context(|| format!("creating event log in {}", dir.display()))?;
            let log_path = log.path().to_path_buf();
            let summary = execute(&scenario, Box::new(log))?;
            tracing::info!(path = %log_path.display(), "event log written");
            (summary, read_all(&log_path)?)
        }
        None => {
            let log = InMemoryEventLog::new();
            let summary = execute(&scenario, Box::new(log.clone()))?;
            (summary, log.get_all()?)
        }
    };

    if !config.quiet {
        print_records(&records, out)?;
    }
    Ok(summary)
}

fn execute(scenario: &Scenario, log: Box<dyn EventRepository>) -> Result<RunSummary> {
    let mut session = Session::new(scenario, log)?;
    let summary = session.run(&scenario.script)?;
    Ok(summary)
}

fn print_records(records: &[LogRecord], out: &mut dyn Write) -> Result<()> {
    for record in records {
        serde_json::to_writer(&mut *out, record)?;
        writeln!(out)?;
    }
    Ok(())
}

fn file_stem(scenario: &Scenario) -> &str {
    if scenario.name.is_empty() {
        "scenario"
    } else {
        &scenario.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PRESS: &str = r#"
        Scenario(
            name: "button",
            actors: [
                (id: 1, location: (x: 0.0, y: 0.0, z: 0.0)),
                (id: 2, location: (x: 1.5, y: 0.0, z: 0.0)),
            ],
            interactables: [(key: "button", owner: 2, surfaces: [(id: 10, radius: 1.0)])],
            interactors: [(key: "hand", owner: 1, sensors: [(id: 20, radius: 1.0)])],
            script: [(at: Some(0.5), step: StartInteraction("hand"))],
        )
    "#;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|arg| arg.to_string()).collect()
    }

    #[test]
    fn parses_arguments() {
        let config = SimConfig::default()
            .with_args(args(&["--quiet", "--log-dir", "out", "vault.ron"]))
            .unwrap();

        assert_eq!(
            config,
            SimConfig {
                scenario: Some(PathBuf::from("vault.ron")),
                log_dir: Some(PathBuf::from("out")),
                quiet: true,
            }
        );
        assert!(SimConfig::default().with_args(args(&["--log-dir"])).is_err());
        assert!(SimConfig::default().with_args(args(&["--verbose"])).is_err());
    }

    #[test]
    fn prints_one_line_per_record() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("button.ron");
        std::fs::write(&path, PRESS).unwrap();
        let config = SimConfig {
            scenario: Some(path),
            ..SimConfig::default()
        };

        let mut out = Vec::new();
        let summary = run(&config, &mut out).unwrap();

        let text = String::from_utf8(out).unwrap();
        assert_eq!(text.lines().count() as u64, summary.records);
        assert!(text.contains("InteractionCompleted"));
    }

    #[test]
    fn writes_the_log_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("button.ron");
        std::fs::write(&path, PRESS).unwrap();
        let config = SimConfig {
            scenario: Some(path),
            log_dir: Some(dir.path().join("logs")),
            quiet: true,
        };

        let mut out = Vec::new();
        let summary = run(&config, &mut out).unwrap();

        assert!(out.is_empty());
        let records = read_all(dir.path().join("logs/button.events.jsonl")).unwrap();
        assert_eq!(records.len() as u64, summary.records);
        assert!(run(&config, &mut Vec::new()).is_err());
    }

    #[test]
    fn missing_scenario_is_an_error() {
        let error = run(&SimConfig::default(), &mut Vec::new()).unwrap_err();
        assert!(error.to_string().contains("no scenario given"));
    }
}
