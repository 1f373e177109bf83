//! Reconciler - owns the canonical node set for one operation run
//!
//! Events are applied one at a time, in arrival order, by a single owner.
//! Tree order is not maintained eagerly: a mutation only marks the set
//! dirty and the next read of [`Reconciler::ordered`] rebuilds it, so a
//! burst of events costs one rebuild instead of one per event.

use crate::tree;
use crate::types::{OpKind, ResourceEvent, ResourceNode, StatusKind};
use crate::urn;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// What [`Reconciler::ingest`] did with an event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IngestOutcome {
    /// A node was created for a URN seen for the first time
    Created,
    /// The event was merged into an existing node
    Merged,
    /// The event had no URN and was ignored
    Dropped,
}

/// Canonical URN-keyed node set with pull-based tree ordering
#[derive(Debug, Default)]
pub struct Reconciler {
    nodes: HashMap<String, ResourceNode>,
    next_sequence: u64,
    revision: u64,
    dirty: bool,
    ordered: Vec<ResourceNode>,
}

impl Reconciler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clear all state for a new operation run
    pub fn reset(&mut self) {
        log::debug!("Resetting reconciler ({} nodes)", self.nodes.len());
        self.nodes.clear();
        self.ordered.clear();
        self.next_sequence = 0;
        self.dirty = false;
        self.revision += 1;
    }

    /// Apply one resource event
    ///
    /// Never fails: an event without a URN is dropped, and a parent that
    /// has not been seen yet is satisfied with a placeholder node.
    pub fn ingest(&mut self, event: ResourceEvent) -> IngestOutcome {
        if event.urn.is_empty() {
            log::debug!("Dropping {} event without a URN", event.op);
            return IngestOutcome::Dropped;
        }

        if let Some(parent) = event.parent_urn()
            && parent != event.urn
            && !self.nodes.contains_key(parent)
        {
            log::debug!("Synthesizing placeholder for parent {parent}");
            let placeholder = self.placeholder(parent);
            self.nodes.insert(parent.to_string(), placeholder);
        }

        let outcome = if let Some(node) = self.nodes.get_mut(&event.urn) {
            merge(node, event);
            IngestOutcome::Merged
        } else {
            let mut node = self.blank(&event.urn);
            merge(&mut node, event);
            self.nodes.insert(node.urn.clone(), node);
            IngestOutcome::Created
        };

        self.touch();
        outcome
    }

    /// Attach a diagnostic message to a known resource
    ///
    /// Returns `false` if the URN is unknown; the message is not kept then.
    pub fn annotate(&mut self, urn: &str, message: &str, failed: bool) -> bool {
        let Some(node) = self.nodes.get_mut(urn) else {
            return false;
        };
        node.message = Some(message.trim_end().to_string());
        if failed {
            node.status = StatusKind::Failed;
        }
        self.touch();
        true
    }

    /// Nodes in depth-first tree order, rebuilt if anything changed
    pub fn ordered(&mut self) -> &[ResourceNode] {
        if self.dirty {
            self.ordered = tree::organize(self.nodes.values());
            self.dirty = false;
        }
        &self.ordered
    }

    /// An owned copy of the current tree order
    ///
    /// Background work (such as diffing every resource) runs against this
    /// copy and never touches the live set.
    pub fn snapshot(&mut self) -> Vec<ResourceNode> {
        self.ordered().to_vec()
    }

    pub fn get(&self, urn: &str) -> Option<&ResourceNode> {
        self.nodes.get(urn)
    }

    pub fn contains(&self, urn: &str) -> bool {
        self.nodes.contains_key(urn)
    }

    /// Nodes in arbitrary order
    pub fn nodes(&self) -> impl Iterator<Item = &ResourceNode> {
        self.nodes.values()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Whether the tree order is stale
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Counter bumped by every mutation and reset
    ///
    /// Consumers caching anything derived from the node set compare this
    /// against the value they built from.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    fn touch(&mut self) {
        self.dirty = true;
        self.revision += 1;
    }

    fn next_sequence(&mut self) -> u64 {
        let sequence = self.next_sequence;
        self.next_sequence += 1;
        sequence
    }

    fn blank(&mut self, urn_str: &str) -> ResourceNode {
        let parts = urn::parse(urn_str);
        ResourceNode {
            urn: urn_str.to_string(),
            resource_type: parts.resource_type,
            name: parts.name,
            sequence: self.next_sequence(),
            ..Default::default()
        }
    }

    fn placeholder(&mut self, urn_str: &str) -> ResourceNode {
        let mut node = self.blank(urn_str);
        node.placeholder = true;
        node
    }
}

/// Merge an event into a node
fn merge(node: &mut ResourceNode, event: ResourceEvent) {
    let op = event.op;
    if op.is_replace_family() {
        node.op = OpKind::Replace;
        node.current_op = op;
    } else if op != OpKind::Same {
        if node.op != OpKind::Replace {
            node.op = op;
        }
        node.current_op = op;
    }

    if let Some(resource_type) = event.resource_type.filter(|t| !t.is_empty()) {
        node.resource_type = resource_type;
    }
    if let Some(parent) = event.parent.filter(|p| !p.is_empty() && *p != node.urn) {
        node.parent = parent;
    }
    if let Some(status) = event.status {
        node.status = status;
    }

    // A delete-replaced step carries the old object's properties; it must
    // not clobber what the create-replacement step already recorded.
    let keep_current = op == OpKind::DeleteReplace;
    if let Some(inputs) = event.inputs
        && !(keep_current && !node.inputs.is_empty())
    {
        node.inputs = inputs;
    }
    if let Some(outputs) = event.outputs
        && !(keep_current && !node.outputs.is_empty())
    {
        node.outputs = outputs;
    }

    if node.old_inputs.is_empty()
        && let Some(old_inputs) = event.old_inputs
    {
        node.old_inputs = old_inputs;
    }
    if node.old_outputs.is_empty()
        && let Some(old_outputs) = event.old_outputs
    {
        node.old_outputs = old_outputs;
    }

    if let Some(message) = event.message {
        node.message = Some(message);
    }
    node.placeholder = false;
}
