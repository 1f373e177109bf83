//! Tree builder - arranges a flat node set into depth-annotated tree order

use crate::types::ResourceNode;
use std::collections::{HashMap, HashSet};

const GUIDE_PIPE: &str = "│  ";
const GUIDE_BLANK: &str = "   ";
const GUIDE_TEE: &str = "├─ ";
const GUIDE_ELBOW: &str = "└─ ";

/// Arrange nodes into depth-first pre-order
///
/// Siblings (roots included) are ordered by sequence, so the result does
/// not depend on the iteration order of `nodes`. Each emitted copy carries
/// its `depth` and `is_last`.
///
/// A parent that is missing from the set, or a node naming itself as
/// parent, makes the node a root. Nodes caught in a parent cycle are never
/// reachable from a root; the earliest-registered node of each such cycle is
/// promoted to a root so every node is still emitted exactly once.
pub fn organize<'a, I>(nodes: I) -> Vec<ResourceNode>
where
    I: IntoIterator<Item = &'a ResourceNode>,
{
    let nodes: Vec<&ResourceNode> = nodes.into_iter().collect();
    let known: HashSet<&str> = nodes.iter().map(|n| n.urn.as_str()).collect();
    let mut promoted: HashSet<&str> = HashSet::new();

    let (roots, children) = loop {
        let (roots, children) = partition(&nodes, &known, &promoted);
        let reached = reachable(&roots, &children);
        if reached.len() == nodes.len() {
            break (roots, children);
        }

        let stranded = nodes
            .iter()
            .filter(|n| !reached.contains(n.urn.as_str()))
            .min_by_key(|n| (n.sequence, n.urn.as_str()));
        match stranded {
            Some(node) => {
                log::debug!("Breaking parent cycle at {}", node.urn);
                promoted.insert(node.urn.as_str());
            }
            None => break (roots, children),
        }
    };

    let mut ordered = Vec::with_capacity(nodes.len());
    let mut stack: Vec<(&ResourceNode, usize, bool)> = Vec::new();
    push_siblings(&mut stack, &roots, 0);

    while let Some((node, depth, is_last)) = stack.pop() {
        let mut copy = node.clone();
        copy.depth = depth;
        copy.is_last = is_last;
        ordered.push(copy);

        if let Some(kids) = children.get(node.urn.as_str()) {
            push_siblings(&mut stack, kids, depth + 1);
        }
    }

    ordered
}

type ChildIndex<'a> = HashMap<&'a str, Vec<&'a ResourceNode>>;

fn partition<'a>(
    nodes: &[&'a ResourceNode],
    known: &HashSet<&str>,
    promoted: &HashSet<&str>,
) -> (Vec<&'a ResourceNode>, ChildIndex<'a>) {
    let mut roots = Vec::new();
    let mut children: ChildIndex<'a> = HashMap::new();

    for node in nodes {
        let parent = node.parent.as_str();
        let is_root = parent.is_empty()
            || parent == node.urn
            || !known.contains(parent)
            || promoted.contains(node.urn.as_str());
        if is_root {
            roots.push(*node);
        } else {
            children.entry(parent).or_default().push(*node);
        }
    }

    roots.sort_by(|a, b| sibling_order(a, b));
    for group in children.values_mut() {
        group.sort_by(|a, b| sibling_order(a, b));
    }

    (roots, children)
}

fn sibling_order(a: &ResourceNode, b: &ResourceNode) -> std::cmp::Ordering {
    a.sequence.cmp(&b.sequence).then_with(|| a.urn.cmp(&b.urn))
}

fn reachable<'a>(roots: &[&'a ResourceNode], children: &ChildIndex<'a>) -> HashSet<&'a str> {
    let mut seen = HashSet::new();
    let mut pending: Vec<&ResourceNode> = roots.to_vec();
    while let Some(node) = pending.pop() {
        if !seen.insert(node.urn.as_str()) {
            continue;
        }
        if let Some(kids) = children.get(node.urn.as_str()) {
            pending.extend(kids.iter().copied());
        }
    }
    seen
}

/// Push a sorted sibling group so it pops in order
fn push_siblings<'a>(
    stack: &mut Vec<(&'a ResourceNode, usize, bool)>,
    group: &[&'a ResourceNode],
    depth: usize,
) {
    let last = group.len().saturating_sub(1);
    for (i, node) in group.iter().enumerate().rev() {
        stack.push((*node, depth, i == last));
    }
}

/// Map each URN to its row in an ordered sequence
pub fn index_by_urn(ordered: &[ResourceNode]) -> HashMap<&str, usize> {
    ordered
        .iter()
        .enumerate()
        .map(|(i, n)| (n.urn.as_str(), i))
        .collect()
}

/// Tree connector prefix for one row of an ordered sequence
///
/// Computed on demand from the row's own `is_last` and the `is_last` of
/// each ancestor on its path, found by walking `parent` links through
/// `index`. Roots get an empty prefix.
pub fn guides(ordered: &[ResourceNode], index: &HashMap<&str, usize>, row: usize) -> String {
    let Some(node) = ordered.get(row) else {
        return String::new();
    };
    if node.depth == 0 {
        return String::new();
    }

    // Ancestors strictly between the root and this node, deepest first.
    let mut trail = Vec::with_capacity(node.depth);
    let mut current = node;
    while current.depth > 1 {
        let Some(parent) = index.get(current.parent.as_str()).map(|&i| &ordered[i]) else {
            break;
        };
        trail.push(parent.is_last);
        current = parent;
    }

    let mut prefix = String::new();
    for ancestor_is_last in trail.iter().rev() {
        prefix.push_str(if *ancestor_is_last { GUIDE_BLANK } else { GUIDE_PIPE });
    }
    prefix.push_str(if node.is_last { GUIDE_ELBOW } else { GUIDE_TEE });
    prefix
}
