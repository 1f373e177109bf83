//! # Stacktree
//!
//! Resource reconciliation and structural diffing for streamed
//! infrastructure change events.
//!
//! An infrastructure engine reports a run as a stream of per-resource step
//! events that arrive out of order, repeat, and describe replacements in
//! several steps. This crate folds that stream into a consistent model a
//! terminal dashboard can render.
//!
//! ## Core Concepts
//!
//! - **Reconciler**: the canonical URN-keyed node set for one run
//! - **Tree order**: depth-first, sequence-ordered rows with depth and
//!   last-sibling flags
//! - **Projection**: the visible subsequence of the tree, always closed
//!   over ancestors
//! - **Cursor**: selection and scroll state that survives projection rebuilds
//! - **Diff**: classified, nested property differences per resource
//!
//! ## Example
//!
//! ```
//! use stacktree::{OpKind, ProjectionOptions, Reconciler, ResourceEvent, project};
//!
//! let mut reconciler = Reconciler::new();
//! // the child arrives first; its parent is synthesized as a placeholder
//! reconciler.ingest(ResourceEvent::new("bucket", OpKind::Create).with_parent("stack"));
//! reconciler.ingest(ResourceEvent::new("stack", OpKind::Same));
//!
//! let ordered = reconciler.ordered();
//! assert_eq!(ordered[0].urn, "stack");
//! assert_eq!(ordered[1].depth, 1);
//!
//! let visible = project(ordered, &ProjectionOptions::default());
//! assert_eq!(visible, vec![0, 1]);
//! ```
//!
//! ## Event Streams
//!
//! [`engine`] decodes the engine's JSON event log, [`stream`] moves decoded
//! updates from a reader thread to the consumer over a bounded channel, and
//! [`Session`] applies them and produces render-ready [`Frame`]s.

pub mod cursor;
pub mod diff;
pub mod engine;
mod error;
pub mod projection;
pub mod reconciler;
pub mod session;
pub mod stream;
pub mod tree;
pub mod types;
pub mod urn;
pub mod value;

// Re-export main types at crate root
pub use cursor::{Cursor, ensure_visible};
pub use diff::{
    DiffDetail, DiffKey, DiffKind, DiffOptions, DiffState, DiffSummary, LineChange, LineTag,
    PropertyDiff, ResourceDiff, derive_diff_state, diff_all, diff_resource, render_diff,
    render_diff_with,
};
pub use engine::{
    DecodeStats, Diagnostic, EngineUpdate, EventDecoder, Prelude, RunKind, RunSummary, Severity,
    decode_line, decode_log,
};
pub use error::{Error, Result};
pub use projection::{ProjectionOptions, project};
pub use reconciler::{IngestOutcome, Reconciler};
pub use session::{Frame, FrameRow, RunState, Session};
pub use stream::{CancelToken, Drained, EventStream, ReaderOptions, spawn_reader};
pub use tree::{guides, index_by_urn, organize};
pub use types::{OpKind, ResourceEvent, ResourceNode, StatusKind};
pub use value::{PropertyMap, PropertyValue};
