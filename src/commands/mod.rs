pub mod diff;
pub mod render;
pub mod show;
pub mod watch;

use anyhow::{Context as AnyhowContext, Result, bail};
use indicatif::{ProgressBar, ProgressStyle};
use stacktree::{DecodeStats, DiffOptions, EngineUpdate, ProjectionOptions, RunKind, Session};
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::PathBuf;
use std::time::Duration;

use crate::Context;
use crate::cli::ViewArgs;
use crate::paths;
use crate::ui;

/// Where an event log is read from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogSource {
    Stdin,
    File(PathBuf),
}

impl LogSource {
    pub fn label(&self) -> String {
        match self {
            Self::Stdin => "stdin".to_string(),
            Self::File(path) => path.display().to_string(),
        }
    }

    pub fn open(&self) -> Result<Box<dyn BufRead + Send>> {
        match self {
            Self::Stdin => Ok(Box::new(BufReader::new(io::stdin()))),
            Self::File(path) => {
                let file = File::open(path)
                    .with_context(|| format!("Could not open event log {}", path.display()))?;
                Ok(Box::new(BufReader::new(file)))
            }
        }
    }
}

/// Pick the event log from the argument or the configured default
pub fn resolve_log(ctx: &Context, arg: Option<&str>) -> Result<LogSource> {
    match arg {
        Some("-") => Ok(LogSource::Stdin),
        Some(path) => Ok(LogSource::File(paths::expand(path))),
        None => match ctx.config.event_log_path() {
            Some(path) => {
                log::debug!("Using configured event log {}", path.display());
                Ok(LogSource::File(path))
            }
            None => bail!("No event log given and no display.event_log configured"),
        },
    }
}

/// Read and decode a whole log behind a spinner
pub fn read_log(ctx: &Context, source: &LogSource) -> Result<(Vec<EngineUpdate>, DecodeStats)> {
    let reader = source.open()?;

    let spinner = if ctx.quiet {
        ProgressBar::hidden()
    } else {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(ProgressStyle::default_spinner().template("{spinner:.green} {msg}")?);
        spinner.set_message(format!("Reading {}", source.label()));
        spinner.enable_steady_tick(Duration::from_millis(80));
        spinner
    };

    let result = stacktree::decode_log(reader)
        .with_context(|| format!("Failed to read event log {}", source.label()));
    spinner.finish_and_clear();

    let (updates, stats) = result?;
    report_stats(ctx, &stats);
    Ok((updates, stats))
}

/// Warn about lines the decoder had to skip
pub fn report_stats(ctx: &Context, stats: &DecodeStats) {
    log::info!(
        "Decoded {} events from {} lines ({} ignored)",
        stats.decoded,
        stats.lines,
        stats.ignored
    );
    if stats.malformed > 0 && !ctx.quiet {
        ui::warn(&format!(
            "Skipped {} malformed line{}",
            stats.malformed,
            if stats.malformed == 1 { "" } else { "s" }
        ));
    }
}

/// Build a session from view flags layered over the config
pub fn new_session(ctx: &Context, view: &ViewArgs) -> Result<Session> {
    let show_all = view.all || ctx.config.display.show_unchanged;
    let options = ProjectionOptions::new(show_all, view.filter.clone().unwrap_or_default());
    let diff_options = DiffOptions {
        reveal_secrets: view.reveal_secrets || ctx.config.reveal_secrets(),
    };

    let session = Session::new(options, diff_options);
    match view.kind.as_deref() {
        Some(kind) => match RunKind::parse(kind) {
            Some(kind) => Ok(session.with_run_kind(kind)),
            None => {
                bail!("Unknown run kind '{kind}' (expected preview, update, refresh or destroy)")
            }
        },
        None => Ok(session),
    }
}

/// Frame height from the flag or the config
pub fn viewport_height(ctx: &Context, view: &ViewArgs) -> usize {
    view.height
        .unwrap_or(ctx.config.display.viewport_height)
        .max(1)
}
