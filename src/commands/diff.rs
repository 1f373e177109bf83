//! `stackview diff` - structured property diffs

use anyhow::{Result, bail};
use stacktree::{DiffOptions, ProjectionOptions, ResourceDiff, Session};

use super::render;
use crate::Context;
use crate::cli::DiffArgs;
use crate::ui;

pub fn run(ctx: &Context, args: DiffArgs) -> Result<()> {
    let source = super::resolve_log(ctx, Some(&args.log))?;
    let (updates, _) = super::read_log(ctx, &source)?;

    let diff_options = DiffOptions {
        reveal_secrets: args.reveal_secrets || ctx.config.reveal_secrets(),
    };
    // every resource is a valid target, changed or not
    let mut session = Session::new(ProjectionOptions::new(true, ""), diff_options);
    session.apply_all(updates);

    let diffs = if args.all_resources {
        session.diff_changed()
    } else {
        let target = args.target.as_deref().unwrap_or_default();
        if !session.select(target) {
            bail!("No resource matches '{target}'");
        }
        session.selected_diff().into_iter().collect()
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&diffs)?);
        return Ok(());
    }

    print_diffs(&diffs, args.unchanged || ctx.verbose > 0);
    Ok(())
}

fn print_diffs(diffs: &[ResourceDiff], show_unchanged: bool) {
    if diffs.is_empty() {
        ui::success("No changes");
        return;
    }

    let many = diffs.len() > 1;
    for diff in diffs {
        if many {
            ui::header(&diff.urn);
        }
        for line in render::resource_diff_lines(diff, show_unchanged) {
            println!("{line}");
        }
    }

    if many {
        let changed = diffs.iter().filter(|d| d.summary.has_changes()).count();
        println!();
        ui::info(&format!(
            "{} resources, {changed} with property changes",
            diffs.len()
        ));
    }
}
