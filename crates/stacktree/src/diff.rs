//! Structural diff computation for resource properties
//!
//! The output is data, not text: every entry pairs a key with its
//! classification and the rendered before/after values, so a presentation
//! layer can style it without re-running the diff.

use crate::types::{OpKind, ResourceNode};
use crate::value::{PropertyMap, PropertyValue};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use similar::{ChangeTag, TextDiff};
use std::collections::BTreeSet;
use std::fmt;

/// Keys with this prefix are engine-internal and never diffed
pub const RESERVED_PREFIX: &str = "__";

/// Classification of one property
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiffKind {
    Added,
    Removed,
    Modified,
    Unchanged,
}

impl DiffKind {
    pub fn symbol(self) -> &'static str {
        match self {
            Self::Added => "+",
            Self::Removed => "-",
            Self::Modified => "~",
            Self::Unchanged => " ",
        }
    }
}

/// Map key or array position of a diff entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DiffKey {
    Name(String),
    Index(usize),
}

impl fmt::Display for DiffKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Name(name) => f.write_str(name),
            Self::Index(i) => write!(f, "[{i}]"),
        }
    }
}

/// Line classification in a multi-line string diff
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineTag {
    Equal,
    Insert,
    Delete,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineChange {
    pub tag: LineTag,
    pub line: String,
}

/// Nested structure under a diff entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "shape", content = "entries", rename_all = "lowercase")]
pub enum DiffDetail {
    /// Compared as a whole
    Scalar,
    /// Both sides were maps; entries per key
    Object(Vec<PropertyDiff>),
    /// Both sides were arrays; entries per position
    Array(Vec<PropertyDiff>),
    /// Both sides were strings spanning several lines
    Text(Vec<LineChange>),
}

/// One classified property
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyDiff {
    pub key: DiffKey,
    pub kind: DiffKind,
    /// Rendered value before the change, absent when added
    pub old: Option<String>,
    /// Rendered value after the change, absent when removed
    pub new: Option<String>,
    /// The new value is only known once the change is applied
    #[serde(default)]
    pub computed: bool,
    pub detail: DiffDetail,
}

impl PropertyDiff {
    pub fn is_changed(&self) -> bool {
        self.kind != DiffKind::Unchanged
    }
}

/// Rendering options for diffs
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffOptions {
    /// Render secret values instead of masking them
    pub reveal_secrets: bool,
}

/// Which stored property sets play the before/after roles for a resource
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DiffState<'a> {
    pub old_inputs: Option<&'a PropertyMap>,
    pub new_inputs: Option<&'a PropertyMap>,
    pub old_outputs: Option<&'a PropertyMap>,
    pub new_outputs: Option<&'a PropertyMap>,
}

fn present(map: &PropertyMap) -> Option<&PropertyMap> {
    (!map.is_empty()).then_some(map)
}

/// `preferred` unless it is empty, then `fallback`
fn either<'a>(preferred: &'a PropertyMap, fallback: &'a PropertyMap) -> Option<&'a PropertyMap> {
    present(preferred).or_else(|| present(fallback))
}

/// Select the before/after property sets for a resource based on its op
pub fn derive_diff_state(node: &ResourceNode) -> DiffState<'_> {
    match node.op {
        OpKind::Create => DiffState {
            old_inputs: None,
            new_inputs: present(&node.inputs),
            old_outputs: None,
            new_outputs: present(&node.outputs),
        },
        OpKind::Delete => DiffState {
            old_inputs: either(&node.old_inputs, &node.inputs),
            new_inputs: None,
            old_outputs: either(&node.old_outputs, &node.outputs),
            new_outputs: None,
        },
        OpKind::Update | OpKind::Replace | OpKind::CreateReplace | OpKind::DeleteReplace => {
            DiffState {
                old_inputs: present(&node.old_inputs),
                new_inputs: present(&node.inputs),
                old_outputs: present(&node.old_outputs),
                new_outputs: present(&node.outputs),
            }
        }
        OpKind::Same | OpKind::Refresh => {
            let inputs = either(&node.inputs, &node.old_inputs);
            let outputs = either(&node.old_outputs, &node.outputs);
            DiffState {
                old_inputs: inputs,
                new_inputs: inputs,
                old_outputs: outputs,
                new_outputs: outputs,
            }
        }
        OpKind::Read | OpKind::Unknown => DiffState {
            old_inputs: present(&node.inputs),
            new_inputs: present(&node.inputs),
            old_outputs: present(&node.outputs),
            new_outputs: present(&node.outputs),
        },
    }
}

/// Diff two property maps, masking secrets
pub fn render_diff(old: Option<&PropertyMap>, new: Option<&PropertyMap>) -> Vec<PropertyDiff> {
    render_diff_with(old, new, DiffOptions::default())
}

/// Diff two property maps
///
/// Entries come out in lexicographic key order. Reserved keys are skipped.
pub fn render_diff_with(
    old: Option<&PropertyMap>,
    new: Option<&PropertyMap>,
    opts: DiffOptions,
) -> Vec<PropertyDiff> {
    let keys: BTreeSet<&String> = old
        .into_iter()
        .chain(new)
        .flat_map(|map| map.keys())
        .filter(|key| !key.starts_with(RESERVED_PREFIX))
        .collect();

    keys.into_iter()
        .map(|key| {
            diff_value(
                DiffKey::Name(key.clone()),
                old.and_then(|m| m.get(key)),
                new.and_then(|m| m.get(key)),
                opts,
            )
        })
        .collect()
}

fn diff_arrays(
    old: &[PropertyValue],
    new: &[PropertyValue],
    opts: DiffOptions,
) -> Vec<PropertyDiff> {
    (0..old.len().max(new.len()))
        .map(|i| diff_value(DiffKey::Index(i), old.get(i), new.get(i), opts))
        .collect()
}

fn diff_value(
    key: DiffKey,
    old: Option<&PropertyValue>,
    new: Option<&PropertyValue>,
    opts: DiffOptions,
) -> PropertyDiff {
    let render = |value: &PropertyValue| value.render(opts.reveal_secrets);
    let computed = new.is_some_and(PropertyValue::is_computed);

    let (Some(before), Some(after)) = (old, new) else {
        let kind = match (old, new) {
            (None, Some(_)) => DiffKind::Added,
            (Some(_), None) => DiffKind::Removed,
            _ => DiffKind::Unchanged,
        };
        return PropertyDiff {
            key,
            kind,
            old: old.map(render),
            new: new.map(render),
            computed,
            detail: DiffDetail::Scalar,
        };
    };

    let detail = if let (Some(a), Some(b)) = (before.as_object(), after.as_object()) {
        DiffDetail::Object(render_diff_with(Some(a), Some(b), opts))
    } else if let (Some(a), Some(b)) = (before.as_array(), after.as_array()) {
        DiffDetail::Array(diff_arrays(a, b, opts))
    } else if before != after
        && let Some(lines) = text_diff(before, after)
    {
        DiffDetail::Text(lines)
    } else {
        DiffDetail::Scalar
    };

    let changed = match &detail {
        DiffDetail::Object(entries) | DiffDetail::Array(entries) => {
            entries.iter().any(PropertyDiff::is_changed)
        }
        DiffDetail::Text(_) | DiffDetail::Scalar => before != after,
    };

    PropertyDiff {
        key,
        kind: if changed {
            DiffKind::Modified
        } else {
            DiffKind::Unchanged
        },
        old: Some(render(before)),
        new: Some(render(after)),
        computed,
        detail,
    }
}

/// Line diff for two plain multi-line strings
fn text_diff(old: &PropertyValue, new: &PropertyValue) -> Option<Vec<LineChange>> {
    let (PropertyValue::String(a), PropertyValue::String(b)) = (old, new) else {
        return None;
    };
    if old.is_computed() || new.is_computed() || !(a.contains('\n') || b.contains('\n')) {
        return None;
    }

    let diff = TextDiff::from_lines(a.as_str(), b.as_str());
    let lines = diff
        .iter_all_changes()
        .map(|change| LineChange {
            tag: match change.tag() {
                ChangeTag::Equal => LineTag::Equal,
                ChangeTag::Insert => LineTag::Insert,
                ChangeTag::Delete => LineTag::Delete,
            },
            line: change.value().trim_end_matches('\n').to_string(),
        })
        .collect();
    Some(lines)
}

/// Diff counts over a set of entries, nested entries included
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffSummary {
    pub added: usize,
    pub removed: usize,
    pub modified: usize,
    pub unchanged: usize,
}

impl DiffSummary {
    /// Count leaf entries; a container counts through its children
    pub fn from_diffs(diffs: &[PropertyDiff]) -> Self {
        let mut summary = Self::default();
        summary.add_all(diffs);
        summary
    }

    fn add_all(&mut self, diffs: &[PropertyDiff]) {
        for diff in diffs {
            match &diff.detail {
                DiffDetail::Object(entries) | DiffDetail::Array(entries)
                    if !entries.is_empty() =>
                {
                    self.add_all(entries);
                }
                _ => match diff.kind {
                    DiffKind::Added => self.added += 1,
                    DiffKind::Removed => self.removed += 1,
                    DiffKind::Modified => self.modified += 1,
                    DiffKind::Unchanged => self.unchanged += 1,
                },
            }
        }
    }

    /// Total number of changed entries
    pub fn total_changes(&self) -> usize {
        self.added + self.removed + self.modified
    }

    pub fn has_changes(&self) -> bool {
        self.total_changes() > 0
    }

    pub fn merge(&mut self, other: &DiffSummary) {
        self.added += other.added;
        self.removed += other.removed;
        self.modified += other.modified;
        self.unchanged += other.unchanged;
    }
}

/// Input and output diffs for one resource
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceDiff {
    pub urn: String,
    pub op: OpKind,
    pub inputs: Vec<PropertyDiff>,
    pub outputs: Vec<PropertyDiff>,
    pub summary: DiffSummary,
}

/// Derive the diff state for a resource and diff both property sets
pub fn diff_resource(node: &ResourceNode, opts: DiffOptions) -> ResourceDiff {
    let state = derive_diff_state(node);
    let inputs = render_diff_with(state.old_inputs, state.new_inputs, opts);
    let outputs = render_diff_with(state.old_outputs, state.new_outputs, opts);

    let mut summary = DiffSummary::from_diffs(&inputs);
    summary.merge(&DiffSummary::from_diffs(&outputs));

    ResourceDiff {
        urn: node.urn.clone(),
        op: node.op,
        inputs,
        outputs,
        summary,
    }
}

/// Diff every changed resource of a snapshot in parallel
///
/// Results keep the snapshot's order.
pub fn diff_all(snapshot: &[ResourceNode], opts: DiffOptions) -> Vec<ResourceDiff> {
    snapshot
        .par_iter()
        .filter(|node| node.is_changed())
        .map(|node| diff_resource(node, opts))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::{SECRET_SIGNATURE, SECRET_SIGNATURE_KEY};
    use serde_json::json;

    fn map(value: serde_json::Value) -> PropertyMap {
        crate::value::property_map(value)
    }

    fn kinds(diffs: &[PropertyDiff]) -> Vec<(String, DiffKind)> {
        diffs
            .iter()
            .map(|d| (d.key.to_string(), d.kind))
            .collect()
    }

    #[test]
    fn test_classification() {
        let old = map(json!({"keep": 1, "change": "a", "drop": true}));
        let new = map(json!({"keep": 1, "change": "b", "add": null}));
        let diffs = render_diff(Some(&old), Some(&new));

        assert_eq!(
            kinds(&diffs),
            vec![
                ("add".to_string(), DiffKind::Added),
                ("change".to_string(), DiffKind::Modified),
                ("drop".to_string(), DiffKind::Removed),
                ("keep".to_string(), DiffKind::Unchanged),
            ]
        );
        let change = &diffs[1];
        assert_eq!(change.old.as_deref(), Some("\"a\""));
        assert_eq!(change.new.as_deref(), Some("\"b\""));
        assert_eq!(diffs[0].old, None);
        assert_eq!(diffs[2].new, None);
    }

    #[test]
    fn test_identical_maps_are_all_unchanged() {
        let props = map(json!({
            "name": "web",
            "tags": {"env": "prod", "team": "core"},
            "ports": [80, 443],
            "nested": {"deep": {"list": [{"a": 1}]}},
        }));
        let diffs = render_diff(Some(&props), Some(&props));
        assert_eq!(diffs.len(), 4);
        assert!(diffs.iter().all(|d| d.kind == DiffKind::Unchanged));
        assert!(!DiffSummary::from_diffs(&diffs).has_changes());
    }

    #[test]
    fn test_array_length_difference() {
        let old = map(json!({"ports": [80, 443]}));
        let new = map(json!({"ports": [80, 443, 8080]}));
        let diffs = render_diff(Some(&old), Some(&new));

        assert_eq!(diffs.len(), 1);
        assert_eq!(diffs[0].kind, DiffKind::Modified);
        let DiffDetail::Array(entries) = &diffs[0].detail else {
            panic!("expected array detail, got {:?}", diffs[0].detail);
        };
        assert_eq!(
            kinds(entries),
            vec![
                ("[0]".to_string(), DiffKind::Unchanged),
                ("[1]".to_string(), DiffKind::Unchanged),
                ("[2]".to_string(), DiffKind::Added),
            ]
        );
        assert_eq!(entries[2].key, DiffKey::Index(2));
        assert_eq!(entries[2].new.as_deref(), Some("8080"));
    }

    #[test]
    fn test_array_shrink_marks_removed_positions() {
        let old = map(json!({"ports": [80, 443, 8080]}));
        let new = map(json!({"ports": [80]}));
        let diffs = render_diff(Some(&old), Some(&new));
        let DiffDetail::Array(entries) = &diffs[0].detail else {
            panic!("expected array detail");
        };
        assert_eq!(entries[1].kind, DiffKind::Removed);
        assert_eq!(entries[2].kind, DiffKind::Removed);
        assert_eq!(entries[2].old.as_deref(), Some("8080"));
    }

    #[test]
    fn test_nested_maps_recurse() {
        let old = map(json!({"tags": {"env": "dev", "team": "core"}}));
        let new = map(json!({"tags": {"env": "prod", "team": "core", "owner": "ops"}}));
        let diffs = render_diff(Some(&old), Some(&new));

        assert_eq!(diffs[0].kind, DiffKind::Modified);
        let DiffDetail::Object(entries) = &diffs[0].detail else {
            panic!("expected object detail");
        };
        assert_eq!(
            kinds(entries),
            vec![
                ("env".to_string(), DiffKind::Modified),
                ("owner".to_string(), DiffKind::Added),
                ("team".to_string(), DiffKind::Unchanged),
            ]
        );
    }

    #[test]
    fn test_maps_inside_arrays_recurse() {
        let old = map(json!({"rules": [{"port": 80, "cidr": "0.0.0.0/0"}]}));
        let new = map(json!({"rules": [{"port": 443, "cidr": "0.0.0.0/0"}]}));
        let diffs = render_diff(Some(&old), Some(&new));

        let DiffDetail::Array(rules) = &diffs[0].detail else {
            panic!("expected array detail");
        };
        let DiffDetail::Object(fields) = &rules[0].detail else {
            panic!("expected object detail");
        };
        assert_eq!(
            kinds(fields),
            vec![
                ("cidr".to_string(), DiffKind::Unchanged),
                ("port".to_string(), DiffKind::Modified),
            ]
        );
    }

    #[test]
    fn test_type_mismatch_is_modified() {
        let old = map(json!({"size": "10"}));
        let new = map(json!({"size": 10}));
        let diffs = render_diff(Some(&old), Some(&new));
        assert_eq!(diffs[0].kind, DiffKind::Modified);
        assert_eq!(diffs[0].old.as_deref(), Some("\"10\""));
        assert_eq!(diffs[0].new.as_deref(), Some("10"));
        assert_eq!(diffs[0].detail, DiffDetail::Scalar);
    }

    #[test]
    fn test_map_vs_array_is_modified_scalar() {
        let old = map(json!({"x": {"a": 1}}));
        let new = map(json!({"x": [1]}));
        let diffs = render_diff(Some(&old), Some(&new));
        assert_eq!(diffs[0].kind, DiffKind::Modified);
        assert_eq!(diffs[0].detail, DiffDetail::Scalar);
    }

    #[test]
    fn test_int_float_normalization() {
        let old = map(json!({"count": 3}));
        let new = map(json!({"count": 3.0}));
        let diffs = render_diff(Some(&old), Some(&new));
        assert_eq!(diffs[0].kind, DiffKind::Unchanged);
        assert_eq!(diffs[0].new.as_deref(), Some("3"));
    }

    #[test]
    fn test_computed_placeholder() {
        let old = map(json!({"arn": "arn:aws:s3:::old"}));
        let new = map(json!({"arn": "04da6b54-80e4-46f7-96ec-b56ff0331ba9"}));
        let diffs = render_diff(Some(&old), Some(&new));
        assert_eq!(diffs[0].kind, DiffKind::Modified);
        assert!(diffs[0].computed);
        assert_eq!(diffs[0].new.as_deref(), Some("[unknown]"));
    }

    #[test]
    fn test_reserved_keys_are_skipped() {
        let old = map(json!({"__defaults": ["name"], "name": "a"}));
        let new = map(json!({"__meta": "x", "name": "a", "tags": {"__internal": 1, "k": "v"}}));
        let diffs = render_diff(Some(&old), Some(&new));
        assert_eq!(
            kinds(&diffs),
            vec![
                ("name".to_string(), DiffKind::Unchanged),
                ("tags".to_string(), DiffKind::Added),
            ]
        );
    }

    #[test]
    fn test_one_sided_diffs() {
        let props = map(json!({"b": 2, "a": 1}));
        let added = render_diff(None, Some(&props));
        assert_eq!(
            kinds(&added),
            vec![
                ("a".to_string(), DiffKind::Added),
                ("b".to_string(), DiffKind::Added),
            ]
        );
        let removed = render_diff(Some(&props), None);
        assert!(removed.iter().all(|d| d.kind == DiffKind::Removed));
        assert!(render_diff(None, None).is_empty());
    }

    #[test]
    fn test_secrets_masked_unless_revealed() {
        let wrap = |v: &str| {
            json!({
                SECRET_SIGNATURE_KEY: SECRET_SIGNATURE,
                "value": v,
            })
        };
        let old = map(json!({"password": wrap("old")}));
        let new = map(json!({"password": wrap("new")}));

        let masked = render_diff(Some(&old), Some(&new));
        assert_eq!(masked[0].kind, DiffKind::Modified);
        assert_eq!(masked[0].old.as_deref(), Some("[secret]"));
        assert_eq!(masked[0].new.as_deref(), Some("[secret]"));

        let revealed = render_diff_with(
            Some(&old),
            Some(&new),
            DiffOptions {
                reveal_secrets: true,
            },
        );
        assert_eq!(revealed[0].new.as_deref(), Some("\"new\""));
    }

    #[test]
    fn test_multiline_strings_get_line_diff() {
        let old = map(json!({"policy": "line one\nline two\n"}));
        let new = map(json!({"policy": "line one\nline 2\n"}));
        let diffs = render_diff(Some(&old), Some(&new));

        let DiffDetail::Text(lines) = &diffs[0].detail else {
            panic!("expected text detail");
        };
        assert_eq!(
            lines.iter().map(|l| l.tag).collect::<Vec<_>>(),
            vec![LineTag::Equal, LineTag::Delete, LineTag::Insert]
        );
        assert_eq!(lines[1].line, "line two");
        assert_eq!(lines[2].line, "line 2");
    }

    fn resource(op: OpKind) -> ResourceNode {
        ResourceNode {
            urn: "urn:pulumi:dev::app::test:index:Thing::r".to_string(),
            op,
            inputs: map(json!({"in": "new"})),
            outputs: map(json!({"out": "new"})),
            old_inputs: map(json!({"in": "old"})),
            old_outputs: map(json!({"out": "old"})),
            ..Default::default()
        }
    }

    #[test]
    fn test_diff_state_create() {
        let node = resource(OpKind::Create);
        let state = derive_diff_state(&node);
        assert_eq!(state.old_inputs, None);
        assert_eq!(state.new_inputs, Some(&node.inputs));
        assert_eq!(state.old_outputs, None);
        assert_eq!(state.new_outputs, Some(&node.outputs));
    }

    #[test]
    fn test_diff_state_delete_prefers_old() {
        let node = resource(OpKind::Delete);
        let state = derive_diff_state(&node);
        assert_eq!(state.old_inputs, Some(&node.old_inputs));
        assert_eq!(state.new_inputs, None);
        assert_eq!(state.old_outputs, Some(&node.old_outputs));
        assert_eq!(state.new_outputs, None);
    }

    #[test]
    fn test_diff_state_delete_falls_back_to_inputs() {
        let node = ResourceNode {
            op: OpKind::Delete,
            inputs: map(json!({"bucket": "logs"})),
            ..Default::default()
        };
        let state = derive_diff_state(&node);
        assert_eq!(state.old_inputs, Some(&node.inputs));
        assert_eq!(state.new_inputs, None);
        assert_eq!(state.old_outputs, None);
    }

    #[test]
    fn test_diff_state_update_family() {
        for op in [
            OpKind::Update,
            OpKind::Replace,
            OpKind::CreateReplace,
            OpKind::DeleteReplace,
        ] {
            let node = resource(op);
            let state = derive_diff_state(&node);
            assert_eq!(state.old_inputs, Some(&node.old_inputs), "{op}");
            assert_eq!(state.new_inputs, Some(&node.inputs), "{op}");
            assert_eq!(state.old_outputs, Some(&node.old_outputs), "{op}");
            assert_eq!(state.new_outputs, Some(&node.outputs), "{op}");
        }
    }

    #[test]
    fn test_diff_state_same_and_refresh() {
        for op in [OpKind::Same, OpKind::Refresh] {
            let node = resource(op);
            let state = derive_diff_state(&node);
            assert_eq!(state.old_inputs, Some(&node.inputs));
            assert_eq!(state.new_inputs, Some(&node.inputs));
            assert_eq!(state.old_outputs, Some(&node.old_outputs));
            assert_eq!(state.new_outputs, Some(&node.old_outputs));
        }

        let sparse = ResourceNode {
            op: OpKind::Same,
            old_inputs: map(json!({"in": "old"})),
            outputs: map(json!({"out": "new"})),
            ..Default::default()
        };
        let state = derive_diff_state(&sparse);
        assert_eq!(state.new_inputs, Some(&sparse.old_inputs));
        assert_eq!(state.old_outputs, Some(&sparse.outputs));
    }

    #[test]
    fn test_diff_state_other_ops() {
        let node = resource(OpKind::Read);
        let state = derive_diff_state(&node);
        assert_eq!(state.old_inputs, Some(&node.inputs));
        assert_eq!(state.new_inputs, Some(&node.inputs));
        assert_eq!(state.old_outputs, Some(&node.outputs));
        assert_eq!(state.new_outputs, Some(&node.outputs));
    }

    #[test]
    fn test_same_resource_diff_has_no_changes() {
        let diff = diff_resource(&resource(OpKind::Same), DiffOptions::default());
        assert!(!diff.summary.has_changes());
        assert_eq!(diff.summary.unchanged, 2);
    }

    #[test]
    fn test_summary_counts_leaves() {
        let old = map(json!({"tags": {"a": 1, "b": 2}, "x": 1}));
        let new = map(json!({"tags": {"a": 1, "b": 3, "c": 4}}));
        let summary = DiffSummary::from_diffs(&render_diff(Some(&old), Some(&new)));
        assert_eq!(summary.unchanged, 1);
        assert_eq!(summary.modified, 1);
        assert_eq!(summary.added, 1);
        assert_eq!(summary.removed, 1);
        assert_eq!(summary.total_changes(), 3);
    }

    #[test]
    fn test_diff_all_skips_unchanged_and_keeps_order() {
        let mut first = resource(OpKind::Update);
        first.urn = "first".to_string();
        let mut skipped = resource(OpKind::Same);
        skipped.urn = "skipped".to_string();
        let mut last = resource(OpKind::Delete);
        last.urn = "last".to_string();

        let diffs = diff_all(&[first, skipped, last], DiffOptions::default());
        let urns: Vec<&str> = diffs.iter().map(|d| d.urn.as_str()).collect();
        assert_eq!(urns, vec!["first", "last"]);
        assert!(diffs[0].summary.has_changes());
    }
}
