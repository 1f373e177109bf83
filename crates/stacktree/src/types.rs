//! Core types for resource reconciliation

use crate::value::PropertyMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Declared change kind of a resource step
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum OpKind {
    #[serde(alias = "import")]
    Create,
    Update,
    #[serde(alias = "discard")]
    Delete,
    #[default]
    Same,
    Replace,
    #[serde(alias = "create-replacement")]
    CreateReplace,
    #[serde(alias = "delete-replaced", alias = "discard-replaced")]
    DeleteReplace,
    #[serde(alias = "read-replacement")]
    Read,
    Refresh,
    /// Any op spelling this crate does not model
    #[serde(other)]
    Unknown,
}

impl OpKind {
    /// Whether this op belongs to the multi-step replace protocol
    pub fn is_replace_family(self) -> bool {
        matches!(self, Self::Replace | Self::CreateReplace | Self::DeleteReplace)
    }

    /// Parse an engine op spelling, mapping aliases onto modelled ops
    pub fn parse(op: &str) -> Self {
        match op {
            "create" | "import" => Self::Create,
            "update" => Self::Update,
            "delete" | "discard" => Self::Delete,
            "same" => Self::Same,
            "replace" => Self::Replace,
            "create-replace" | "create-replacement" => Self::CreateReplace,
            "delete-replace" | "delete-replaced" | "discard-replaced" => Self::DeleteReplace,
            "read" | "read-replacement" => Self::Read,
            "refresh" => Self::Refresh,
            _ => Self::Unknown,
        }
    }

    /// One-character marker used in tree rows
    pub fn symbol(self) -> &'static str {
        match self {
            Self::Create => "+",
            Self::Update => "~",
            Self::Delete => "-",
            Self::Same => " ",
            Self::Replace => "+-",
            Self::CreateReplace => "++",
            Self::DeleteReplace => "--",
            Self::Read => ">",
            Self::Refresh => "*",
            Self::Unknown => "?",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
            Self::Same => "same",
            Self::Replace => "replace",
            Self::CreateReplace => "create-replace",
            Self::DeleteReplace => "delete-replace",
            Self::Read => "read",
            Self::Refresh => "refresh",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for OpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Execution progress of a resource step, orthogonal to [`OpKind`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StatusKind {
    #[default]
    None,
    Pending,
    Running,
    Success,
    Failed,
}

impl StatusKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Success => "success",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for StatusKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One row per distinct resource instance observed in a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ResourceNode {
    /// Unique identity key
    pub urn: String,
    #[serde(rename = "type")]
    pub resource_type: String,
    pub name: String,
    /// URN of the parent resource, empty for roots
    pub parent: String,
    /// Registration order, the tie-break for sibling ordering
    pub sequence: u64,
    /// Consolidated change kind
    pub op: OpKind,
    /// Sub-step currently executing
    pub current_op: OpKind,
    pub status: StatusKind,
    pub inputs: PropertyMap,
    pub outputs: PropertyMap,
    pub old_inputs: PropertyMap,
    pub old_outputs: PropertyMap,
    /// Latest diagnostic attached to this resource
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Synthesized to satisfy a child's parent reference, not yet seen
    #[serde(default)]
    pub placeholder: bool,
    /// Tree depth, 0 for roots (set by the tree builder)
    #[serde(default)]
    pub depth: usize,
    /// Last among its siblings by sequence (set by the tree builder)
    #[serde(default)]
    pub is_last: bool,
}

impl ResourceNode {
    /// Whether this resource is part of the change set
    pub fn is_changed(&self) -> bool {
        self.op != OpKind::Same
    }

    /// Text matched by the dashboard filter
    pub fn display_text(&self) -> String {
        let mut text = format!("{} {}", self.resource_type, self.name);
        if let Some(message) = &self.message {
            text.push(' ');
            text.push_str(message);
        }
        text
    }
}

/// A discrete, read-only resource step event from the engine
///
/// Every field except the URN and op is optional; absent fields leave the
/// node untouched when merged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ResourceEvent {
    pub urn: String,
    pub op: OpKind,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub resource_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<StatusKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inputs: Option<PropertyMap>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outputs: Option<PropertyMap>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub old_inputs: Option<PropertyMap>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub old_outputs: Option<PropertyMap>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ResourceEvent {
    /// Create an event with just an identity and op
    pub fn new(urn: impl Into<String>, op: OpKind) -> Self {
        Self {
            urn: urn.into(),
            op,
            ..Default::default()
        }
    }

    pub fn with_parent(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    pub fn with_type(mut self, resource_type: impl Into<String>) -> Self {
        self.resource_type = Some(resource_type.into());
        self
    }

    pub fn with_status(mut self, status: StatusKind) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_inputs(mut self, inputs: PropertyMap) -> Self {
        self.inputs = Some(inputs);
        self
    }

    pub fn with_outputs(mut self, outputs: PropertyMap) -> Self {
        self.outputs = Some(outputs);
        self
    }

    pub fn with_old_inputs(mut self, old_inputs: PropertyMap) -> Self {
        self.old_inputs = Some(old_inputs);
        self
    }

    pub fn with_old_outputs(mut self, old_outputs: PropertyMap) -> Self {
        self.old_outputs = Some(old_outputs);
        self
    }

    /// The parent URN, if the event names a non-empty one
    pub fn parent_urn(&self) -> Option<&str> {
        self.parent.as_deref().filter(|p| !p.is_empty())
    }
}
