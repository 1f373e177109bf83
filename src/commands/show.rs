//! `stackview show` - one frame of a recorded run

use anyhow::Result;
use serde::Serialize;
use stacktree::{Diagnostic, Frame, ResourceDiff};

use super::render;
use crate::Context;
use crate::cli::ShowArgs;
use crate::ui;

#[derive(Serialize)]
struct ShowOutput<'a> {
    frame: Frame,
    diagnostics: &'a [Diagnostic],
    #[serde(skip_serializing_if = "Option::is_none")]
    diff: Option<ResourceDiff>,
}

pub fn run(ctx: &Context, args: ShowArgs) -> Result<()> {
    let source = super::resolve_log(ctx, args.log.as_deref())?;
    let (updates, _) = super::read_log(ctx, &source)?;

    let mut session = super::new_session(ctx, &args.view)?;
    session.apply_all(updates);

    if let Some(target) = args.select.as_deref()
        && !session.select(target)
    {
        ui::warn(&format!("No visible resource matches '{target}'"));
    }

    let height = super::viewport_height(ctx, &args.view);
    let frame = session.frame(height);
    let diff = if args.diff {
        session.selected_diff()
    } else {
        None
    };

    if args.json {
        let output = ShowOutput {
            frame,
            diagnostics: session.diagnostics(),
            diff,
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    for line in render::frame_lines(&frame) {
        println!("{line}");
    }

    if let Some(summary) = &frame.summary {
        ui::section("Summary");
        if let Some(started) = session.started_at() {
            let local = started.with_timezone(&chrono::Local);
            ui::kv("started", &local.format("%Y-%m-%d %H:%M:%S").to_string());
        }
        ui::kv("duration", &format!("{}s", summary.duration_seconds));
        ui::kv("changes", &summary.total_changes().to_string());
        if summary.maybe_corrupt {
            ui::warn("The engine reported that the stack may be corrupt");
        }
    }

    if !session.diagnostics().is_empty() {
        ui::section("Diagnostics");
        for line in render::diagnostic_lines(session.diagnostics()) {
            ui::dim(&line);
        }
    }

    if args.diff {
        let show_unchanged = args.view.all || ctx.config.display.show_unchanged;
        match diff {
            Some(diff) => {
                ui::section("Diff");
                for line in render::resource_diff_lines(&diff, show_unchanged) {
                    println!("{line}");
                }
            }
            None => ui::info("No resource selected"),
        }
    }

    Ok(())
}
