//! One dashboard session over an engine event stream
//!
//! A [`Session`] is the single owner of everything the consumer loop
//! mutates: the reconciler, run metadata, projection options and cursor.
//! The visible rows are derived state, rebuilt lazily when the node set or
//! the options changed since the last build.

use crate::cursor::Cursor;
use crate::diff::{DiffOptions, ResourceDiff, diff_all, diff_resource};
use crate::engine::{Diagnostic, EngineUpdate, Prelude, RunKind, RunSummary, Severity};
use crate::projection::{ProjectionOptions, project};
use crate::reconciler::{IngestOutcome, Reconciler};
use crate::tree::{guides, index_by_urn};
use crate::types::{OpKind, ResourceEvent, ResourceNode, StatusKind};
use crate::urn;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

/// How far a session's run has progressed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RunState {
    /// No prelude seen yet
    #[default]
    Waiting,
    Running,
    Finished,
    Cancelled,
}

/// Reconciled state and view options for one operation run
#[derive(Debug, Default)]
pub struct Session {
    reconciler: Reconciler,
    run_kind: RunKind,
    run_kind_pinned: bool,
    state: RunState,
    started_at: Option<DateTime<Utc>>,
    summary: Option<RunSummary>,
    diagnostics: Vec<Diagnostic>,
    dropped: usize,
    options: ProjectionOptions,
    diff_options: DiffOptions,
    cursor: Cursor,
    visible: Vec<usize>,
    /// (reconciler revision, options generation) the visible rows were built for
    built_for: Option<(u64, u64)>,
    options_generation: u64,
}

impl Session {
    pub fn new(options: ProjectionOptions, diff_options: DiffOptions) -> Self {
        Self {
            options,
            diff_options,
            ..Default::default()
        }
    }

    /// Fix the run kind instead of taking it from the prelude
    pub fn with_run_kind(mut self, kind: RunKind) -> Self {
        self.run_kind = kind;
        self.run_kind_pinned = true;
        self
    }

    /// Apply one decoded engine update
    pub fn apply(&mut self, update: EngineUpdate) {
        match update {
            EngineUpdate::Prelude(prelude) => self.start_run(&prelude),
            EngineUpdate::Resource(event) => self.ingest(event),
            EngineUpdate::Diagnostic(diagnostic) => self.diagnose(diagnostic),
            EngineUpdate::Summary(summary) => {
                log::info!(
                    "Run finished in {}s with {} changes",
                    summary.duration_seconds,
                    summary.total_changes()
                );
                self.summary = Some(summary);
                self.state = RunState::Finished;
            }
            EngineUpdate::Cancel => {
                log::info!("Run cancelled");
                self.state = RunState::Cancelled;
            }
        }
    }

    pub fn apply_all<I: IntoIterator<Item = EngineUpdate>>(&mut self, updates: I) {
        for update in updates {
            self.apply(update);
        }
    }

    fn start_run(&mut self, prelude: &Prelude) {
        self.reconciler.reset();
        self.summary = None;
        self.diagnostics.clear();
        self.dropped = 0;
        self.state = RunState::Running;
        self.started_at = prelude.started_at;
        if !self.run_kind_pinned
            && let Some(kind) = prelude.run_kind()
        {
            self.run_kind = kind;
        }
        log::debug!("Starting {} run", self.run_kind);
    }

    /// Feed a resource event straight into the reconciler
    pub fn ingest(&mut self, event: ResourceEvent) {
        if self.state == RunState::Waiting {
            self.state = RunState::Running;
        }
        if self.reconciler.ingest(event) == IngestOutcome::Dropped {
            self.dropped += 1;
        }
    }

    fn diagnose(&mut self, diagnostic: Diagnostic) {
        let failed = diagnostic.severity == Severity::Error;
        let attached = diagnostic
            .resource_urn()
            .is_some_and(|urn| self.reconciler.annotate(urn, &diagnostic.message, failed));
        if !attached {
            self.diagnostics.push(diagnostic);
        }
    }

    pub fn reconciler(&self) -> &Reconciler {
        &self.reconciler
    }

    pub fn run_kind(&self) -> RunKind {
        self.run_kind
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn is_done(&self) -> bool {
        matches!(self.state, RunState::Finished | RunState::Cancelled)
    }

    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    pub fn summary(&self) -> Option<&RunSummary> {
        self.summary.as_ref()
    }

    /// Diagnostics not tied to a known resource
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Resource events dropped for lacking a URN
    pub fn dropped_events(&self) -> usize {
        self.dropped
    }

    pub fn options(&self) -> &ProjectionOptions {
        &self.options
    }

    pub fn diff_options(&self) -> DiffOptions {
        self.diff_options
    }

    pub fn set_filter(&mut self, text: impl Into<String>) {
        self.options.filter_text = text.into();
        self.options_generation += 1;
    }

    pub fn set_show_all(&mut self, show_all: bool) {
        if self.options.show_all_ops != show_all {
            self.options.show_all_ops = show_all;
            self.options_generation += 1;
        }
    }

    pub fn toggle_show_all(&mut self) {
        self.set_show_all(!self.options.show_all_ops);
    }

    /// Rebuild the visible rows if the nodes or the options changed
    fn refresh(&mut self) {
        let key = (self.reconciler.revision(), self.options_generation);
        if self.built_for == Some(key) {
            return;
        }

        let ordered = self.reconciler.ordered();
        self.visible = project(ordered, &self.options);
        let rows: Vec<&str> = self.visible.iter().map(|&i| ordered[i].urn.as_str()).collect();
        self.cursor.resync(&rows);
        self.built_for = Some(key);
    }

    /// Run `f` with the cursor and the visible row URNs
    fn with_rows<T>(&mut self, f: impl FnOnce(&mut Cursor, &[&str]) -> T) -> T {
        self.refresh();
        let ordered = self.reconciler.ordered();
        let rows: Vec<&str> = self.visible.iter().map(|&i| ordered[i].urn.as_str()).collect();
        f(&mut self.cursor, &rows)
    }

    pub fn move_cursor(&mut self, delta: isize) -> bool {
        self.with_rows(|cursor, rows| cursor.move_cursor(delta, rows))
    }

    pub fn page(&mut self, pages: isize, viewport_height: usize) -> bool {
        self.with_rows(|cursor, rows| cursor.page(pages, viewport_height, rows))
    }

    pub fn home(&mut self) -> bool {
        self.with_rows(|cursor, rows| cursor.home(rows))
    }

    pub fn end(&mut self) -> bool {
        self.with_rows(|cursor, rows| cursor.end(rows))
    }

    /// Select a visible row by exact URN, or else by a name containing `query`
    pub fn select(&mut self, query: &str) -> bool {
        let query = query.trim();
        if query.is_empty() {
            return false;
        }
        let needle = query.to_lowercase();

        self.refresh();
        let ordered = self.reconciler.ordered();
        let target = self
            .visible
            .iter()
            .map(|&i| &ordered[i])
            .find(|n| n.urn == query)
            .or_else(|| {
                self.visible
                    .iter()
                    .map(|&i| &ordered[i])
                    .find(|n| n.name.to_lowercase().contains(&needle))
            })
            .map(|n| n.urn.clone());

        match target {
            Some(urn) => self.with_rows(|cursor, rows| cursor.select(&urn, rows)),
            None => false,
        }
    }

    /// The resource under the cursor
    pub fn selected(&mut self) -> Option<&ResourceNode> {
        self.refresh();
        let urn = self.cursor.selected_urn()?;
        self.reconciler.get(urn)
    }

    /// Input and output diff of the resource under the cursor
    pub fn selected_diff(&mut self) -> Option<ResourceDiff> {
        let opts = self.diff_options;
        self.selected().map(|node| diff_resource(node, opts))
    }

    /// Diff every changed resource on an owned snapshot
    pub fn diff_changed(&mut self) -> Vec<ResourceDiff> {
        let snapshot = self.reconciler.snapshot();
        diff_all(&snapshot, self.diff_options)
    }

    /// Render-ready window of the visible rows
    pub fn frame(&mut self, viewport_height: usize) -> Frame {
        self.refresh();
        let offset = self.cursor.ensure_visible(self.visible.len(), viewport_height);
        let position = self.cursor.position();
        let selected = self.cursor.selected_urn().map(str::to_string);

        let ordered = self.reconciler.ordered();
        let index = index_by_urn(ordered);

        let rows = self
            .visible
            .iter()
            .skip(offset)
            .take(viewport_height)
            .map(|&row| {
                let node = &ordered[row];
                FrameRow {
                    urn: node.urn.clone(),
                    guide: guides(ordered, &index, row),
                    depth: node.depth,
                    symbol: node.op.symbol(),
                    op: node.op,
                    current_op: node.current_op,
                    status: node.status,
                    resource_type: node.resource_type.clone(),
                    name: node.name.clone(),
                    message: node.message.clone(),
                    placeholder: node.placeholder,
                    selected: selected.as_deref() == Some(node.urn.as_str()),
                }
            })
            .collect();

        let mut ops = BTreeMap::new();
        let mut statuses = BTreeMap::new();
        for node in ordered {
            if node.is_changed() {
                *ops.entry(node.op).or_insert(0) += 1;
            }
            if node.status != StatusKind::None {
                *statuses.entry(node.status).or_insert(0) += 1;
            }
        }

        Frame {
            stack: ordered
                .iter()
                .find_map(|node| urn::stack(&node.urn))
                .map(str::to_string),
            run_kind: self.run_kind,
            state: self.state,
            rows,
            cursor: position,
            scroll_offset: offset,
            visible: self.visible.len(),
            total: ordered.len(),
            ops,
            statuses,
            diagnostics: self.diagnostics.len(),
            summary: self.summary.clone(),
        }
    }
}

/// One displayed row
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrameRow {
    pub urn: String,
    /// Tree connector prefix
    pub guide: String,
    pub depth: usize,
    pub symbol: &'static str,
    pub op: OpKind,
    pub current_op: OpKind,
    pub status: StatusKind,
    #[serde(rename = "type")]
    pub resource_type: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub placeholder: bool,
    pub selected: bool,
}

/// The visible window plus aggregate counts
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Frame {
    /// Stack named by the resource URNs
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stack: Option<String>,
    pub run_kind: RunKind,
    pub state: RunState,
    pub rows: Vec<FrameRow>,
    /// Cursor index into the visible rows
    pub cursor: usize,
    pub scroll_offset: usize,
    /// Number of visible rows
    pub visible: usize,
    /// Number of known resources
    pub total: usize,
    /// Changed resources per op
    pub ops: BTreeMap<OpKind, usize>,
    /// Resources per status, `none` excluded
    pub statuses: BTreeMap<StatusKind, usize>,
    /// Run-level diagnostics
    pub diagnostics: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<RunSummary>,
}

impl Frame {
    pub fn selected_row(&self) -> Option<&FrameRow> {
        self.rows.iter().find(|row| row.selected)
    }

    /// Number of changed resources
    pub fn changes(&self) -> usize {
        self.ops.values().sum()
    }
}
