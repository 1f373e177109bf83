//! Visible projection - which rows of the tree order are shown
//!
//! The projection is always a subsequence of tree order and is recomputed
//! from scratch on every call. Any row that survives filtering drags its
//! whole ancestor chain along, so a match is always reachable through its
//! tree path.

use crate::tree::index_by_urn;
use crate::types::ResourceNode;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Options controlling the visible projection
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectionOptions {
    /// Show resources whose op is `same`
    pub show_all_ops: bool,
    /// Case-insensitive substring matched against type, name and message
    pub filter_text: String,
}

impl ProjectionOptions {
    pub fn new(show_all_ops: bool, filter_text: impl Into<String>) -> Self {
        Self {
            show_all_ops,
            filter_text: filter_text.into(),
        }
    }
}

/// Indices into `ordered` of the rows that should be visible
pub fn project(ordered: &[ResourceNode], opts: &ProjectionOptions) -> Vec<usize> {
    let filter = opts.filter_text.trim().to_lowercase();
    if opts.show_all_ops && filter.is_empty() {
        return (0..ordered.len()).collect();
    }

    let index = index_by_urn(ordered);

    let candidates: Vec<usize> = if opts.show_all_ops {
        (0..ordered.len()).collect()
    } else {
        let changed: Vec<usize> = (0..ordered.len())
            .filter(|&i| ordered[i].is_changed())
            .collect();
        let closed = close_over_ancestors(ordered, &index, &changed);
        (0..ordered.len()).filter(|i| closed.contains(i)).collect()
    };

    if filter.is_empty() {
        return candidates;
    }

    let matches: Vec<usize> = candidates
        .into_iter()
        .filter(|&i| ordered[i].display_text().to_lowercase().contains(&filter))
        .collect();
    let closed = close_over_ancestors(ordered, &index, &matches);
    (0..ordered.len()).filter(|i| closed.contains(i)).collect()
}

/// The given rows plus every ancestor of each
fn close_over_ancestors(
    ordered: &[ResourceNode],
    index: &HashMap<&str, usize>,
    rows: &[usize],
) -> HashSet<usize> {
    let mut closed = HashSet::with_capacity(rows.len());
    for &row in rows {
        let mut current = row;
        // Stop on an already-closed row: its ancestors are closed too.
        while closed.insert(current) {
            let parent = ordered[current].parent.as_str();
            match index.get(parent) {
                Some(&p) if !parent.is_empty() => current = p,
                _ => break,
            }
        }
    }
    closed
}
