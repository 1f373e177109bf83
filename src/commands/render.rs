//! Terminal rendering of frames and diffs
//!
//! Everything here builds lines instead of printing so the watch loop can
//! count and redraw what it wrote.

use colored::{ColoredString, Colorize};
use stacktree::{
    Diagnostic, DiffDetail, DiffKind, Frame, FrameRow, LineTag, OpKind, PropertyDiff,
    ResourceDiff, RunState, Severity, StatusKind,
};

use crate::ui;

const MESSAGE_WIDTH: usize = 72;
const INDENT: &str = "    ";

fn paint_op(op: OpKind, text: &str) -> ColoredString {
    match op {
        OpKind::Create => text.green(),
        OpKind::Update => text.yellow(),
        OpKind::Delete => text.red(),
        OpKind::Replace | OpKind::CreateReplace | OpKind::DeleteReplace => text.magenta(),
        OpKind::Read | OpKind::Refresh => text.cyan(),
        OpKind::Same | OpKind::Unknown => text.normal(),
    }
}

fn status_marker(status: StatusKind) -> ColoredString {
    match status {
        StatusKind::None => "".normal(),
        StatusKind::Pending => "…".dimmed(),
        StatusKind::Running => "⟳".blue(),
        StatusKind::Success => "✓".green(),
        StatusKind::Failed => "✗".red().bold(),
    }
}

/// One tree row
pub fn row_line(row: &FrameRow) -> String {
    let pointer = if row.selected { "›".bold() } else { " ".normal() };
    let symbol = paint_op(row.op, &format!("{:<2}", row.symbol));
    let name = if row.placeholder {
        row.name.dimmed().italic()
    } else if row.op == OpKind::Same {
        row.name.normal()
    } else {
        paint_op(row.op, &row.name).bold()
    };

    let mut line = format!(
        "{pointer} {symbol} {}{} {}",
        row.guide.dimmed(),
        name,
        row.resource_type.dimmed()
    );

    // a replace shows which of its steps is running
    if row.op == OpKind::Replace && row.current_op != OpKind::Replace {
        line.push_str(&format!(" {}", format!("({})", row.current_op).dimmed()));
    }
    if row.status != StatusKind::None {
        line.push_str(&format!(" {}", status_marker(row.status)));
    }
    if let Some(message) = &row.message {
        let message = ui::truncate(ui::first_line(message), MESSAGE_WIDTH);
        if row.status == StatusKind::Failed {
            line.push_str(&format!("  {}", message.red()));
        } else {
            line.push_str(&format!("  {}", message.dimmed()));
        }
    }
    line
}

/// Counts line: "2 to create, 1 to update"
pub fn counts_line(frame: &Frame) -> String {
    if frame.ops.is_empty() {
        return "no changes".to_string();
    }
    let verb = match frame.state {
        RunState::Finished => "",
        _ => "to ",
    };
    frame
        .ops
        .iter()
        .map(|(op, count)| paint_op(*op, &format!("{count} {verb}{op}")).to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// The whole frame, header to footer
pub fn frame_lines(frame: &Frame) -> Vec<String> {
    let mut lines = Vec::with_capacity(frame.rows.len() + 4);

    let state = match frame.state {
        RunState::Waiting => "waiting".dimmed(),
        RunState::Running => "running".blue(),
        RunState::Finished => "finished".green(),
        RunState::Cancelled => "cancelled".yellow(),
    };
    let mut header = format!("{} {} {}", frame.run_kind.to_string().bold(), "·".dimmed(), state);
    if let Some(stack) = &frame.stack {
        header = format!("{} {} {header}", stack.cyan(), "·".dimmed());
    }
    lines.push(header);

    if frame.rows.is_empty() {
        lines.push(format!("  {}", "no resources to show".dimmed()));
    } else {
        lines.extend(frame.rows.iter().map(row_line));
    }

    let shown_to = frame.scroll_offset + frame.rows.len();
    let mut footer = format!(
        "{}-{} of {} shown, {} resources",
        frame.scroll_offset + usize::from(!frame.rows.is_empty()),
        shown_to,
        frame.visible,
        frame.total
    )
    .dimmed()
    .to_string();
    if let Some(failed) = frame.statuses.get(&StatusKind::Failed) {
        footer.push_str(&format!(", {}", format!("{failed} failed").red()));
    }
    if frame.diagnostics > 0 {
        footer.push_str(&format!(
            ", {}",
            format!("{} diagnostics", frame.diagnostics).yellow()
        ));
    }
    lines.push(footer);
    lines.push(counts_line(frame));
    lines
}

/// Run-level diagnostics
pub fn diagnostic_lines(diagnostics: &[Diagnostic]) -> Vec<String> {
    diagnostics
        .iter()
        .map(|d| {
            let severity = d.severity.as_str();
            let label = match d.severity {
                Severity::Error => severity.red(),
                Severity::Warning | Severity::InfoErr => severity.yellow(),
                _ => severity.dimmed(),
            };
            format!("{label}: {}", ui::first_line(&d.message))
        })
        .collect()
}

/// Property diff entries, nested entries indented under their parent
pub fn diff_lines(entries: &[PropertyDiff], show_unchanged: bool) -> Vec<String> {
    let mut lines = Vec::new();
    push_entries(&mut lines, entries, 1, show_unchanged);
    lines
}

fn push_entries(out: &mut Vec<String>, entries: &[PropertyDiff], depth: usize, all: bool) {
    for entry in entries {
        if entry.kind == DiffKind::Unchanged && !all {
            continue;
        }
        push_entry(out, entry, depth, all);
    }
}

fn push_entry(out: &mut Vec<String>, entry: &PropertyDiff, depth: usize, all: bool) {
    let indent = INDENT.repeat(depth);
    let symbol = entry.kind.symbol();
    let key = entry.key.to_string();
    let old = entry.old.as_deref().unwrap_or_default();
    let new = entry.new.as_deref().unwrap_or_default();

    match (&entry.detail, entry.kind) {
        (DiffDetail::Object(children) | DiffDetail::Array(children), DiffKind::Modified) => {
            out.push(format!("{indent}{} {key}:", symbol.yellow()));
            push_entries(out, children, depth + 1, all);
        }
        (DiffDetail::Text(text), _) => {
            out.push(format!("{indent}{} {key}:", symbol.yellow()));
            for change in text {
                let line = match change.tag {
                    LineTag::Equal => format!("{indent}{INDENT}  {}", change.line).dimmed(),
                    LineTag::Delete => format!("{indent}{INDENT}- {}", change.line).red(),
                    LineTag::Insert => format!("{indent}{INDENT}+ {}", change.line).green(),
                };
                out.push(line.to_string());
            }
        }
        (_, DiffKind::Added) => {
            out.push(format!("{indent}{}", format!("{symbol} {key}: {new}").green()));
        }
        (_, DiffKind::Removed) => {
            out.push(format!("{indent}{}", format!("{symbol} {key}: {old}").red()));
        }
        (_, DiffKind::Modified) => {
            let after = if entry.computed {
                new.dimmed().italic()
            } else {
                new.yellow()
            };
            out.push(format!(
                "{indent}{} {key}: {} => {after}",
                symbol.yellow(),
                old.red()
            ));
        }
        (_, DiffKind::Unchanged) => {
            out.push(format!("{indent}{}", format!("{symbol} {key}: {new}").dimmed()));
        }
    }
}

/// A resource diff with its header and both property sections
pub fn resource_diff_lines(diff: &ResourceDiff, show_unchanged: bool) -> Vec<String> {
    let mut lines = vec![format!(
        "{} {}",
        paint_op(diff.op, diff.op.symbol()),
        diff.urn.bold()
    )];

    for (title, entries) in [("inputs", &diff.inputs), ("outputs", &diff.outputs)] {
        let body = diff_lines(entries, show_unchanged);
        if body.is_empty() {
            continue;
        }
        lines.push(format!("  {}", title.cyan()));
        lines.extend(body);
    }

    if !diff.summary.has_changes() {
        lines.push(format!("  {}", "no property changes".dimmed()));
    }
    lines
}
