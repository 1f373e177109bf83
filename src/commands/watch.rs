//! `stackview watch` - follow a log while the engine writes it

use anyhow::{Context as AnyhowContext, Result};
use console::Term;
use stacktree::{CancelToken, ReaderOptions, RunState, StatusKind, spawn_reader};
use std::time::{Duration, Instant};

use super::render;
use crate::Context;
use crate::cli::WatchArgs;
use crate::ui;

const WAIT: Duration = Duration::from_millis(100);
const MAX_BATCH: usize = 512;

pub fn run(ctx: &Context, args: WatchArgs) -> Result<()> {
    let source = super::resolve_log(ctx, args.log.as_deref())?;
    let mut session = super::new_session(ctx, &args.view)?;
    let height = super::viewport_height(ctx, &args.view);

    let opts = ReaderOptions {
        follow: true,
        poll_interval: Duration::from_millis(args.poll.max(1)),
        ..Default::default()
    };
    let stream = spawn_reader(source.open()?, opts, CancelToken::new())
        .with_context(|| format!("Failed to start reading {}", source.label()))?;
    log::info!("Watching {}", source.label());

    let deadline = args.timeout.map(|secs| Instant::now() + Duration::from_secs(secs));
    let term = Term::stdout();
    let mut drawn = 0;
    let mut timed_out = false;

    loop {
        let drained = stream.wait(WAIT, MAX_BATCH);
        let changed = !drained.updates.is_empty();
        session.apply_all(drained.updates);

        if changed || drawn == 0 {
            if term.is_term() && drawn > 0 {
                term.clear_last_lines(drawn)?;
            }
            let lines = render::frame_lines(&session.frame(height));
            for line in &lines {
                term.write_line(line)?;
            }
            drawn = lines.len();
        }

        if drained.closed || session.is_done() {
            break;
        }
        if deadline.is_some_and(|d| Instant::now() >= d) {
            timed_out = true;
            break;
        }
    }

    let stats = stream
        .join()
        .with_context(|| format!("Failed to read event log {}", source.label()))?;
    super::report_stats(ctx, &stats);

    let failed = session
        .frame(height)
        .statuses
        .get(&StatusKind::Failed)
        .copied()
        .unwrap_or(0);
    if failed > 0 {
        ui::error(&format!(
            "{failed} resource{} failed",
            if failed == 1 { "" } else { "s" }
        ));
    }

    if timed_out {
        ui::warn("Timed out before the run finished");
        return Ok(());
    }

    match session.state() {
        RunState::Finished => match session.summary() {
            Some(summary) if summary.maybe_corrupt => {
                ui::warn("The engine reported that the stack may be corrupt");
            }
            Some(summary) => ui::success(&format!(
                "Run finished in {}s with {} changes",
                summary.duration_seconds,
                summary.total_changes()
            )),
            None => ui::success("Run finished"),
        },
        RunState::Cancelled => ui::warn("Run was cancelled"),
        RunState::Waiting | RunState::Running => {
            ui::info("Event log ended before the run finished");
        }
    }

    if !ctx.quiet {
        for line in render::diagnostic_lines(session.diagnostics()) {
            ui::dim(&line);
        }
    }
    Ok(())
}
