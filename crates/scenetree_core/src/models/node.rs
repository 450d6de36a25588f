//! Scene node model and node classes.

use crate::constants::{NEW_SCRIPT_SOURCE_PREFIX, ROOT_NAME};
use crate::error::SceneError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Node kind with its per-kind payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "class")]
pub enum NodeKind {
    DataModel,
    Workspace,
    ServerScriptService,
    ReplicatedStorage,
    Folder,
    Model,
    Part,
    Script { source: String },
    StringValue { value: String },
}

/// Payload-free class tag, used for listings and add-by-type intents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeClass {
    DataModel,
    Workspace,
    ServerScriptService,
    ReplicatedStorage,
    Folder,
    Model,
    Part,
    Script,
    StringValue,
}

impl NodeKind {
    pub fn class(&self) -> NodeClass {
        match self {
            Self::DataModel => NodeClass::DataModel,
            Self::Workspace => NodeClass::Workspace,
            Self::ServerScriptService => NodeClass::ServerScriptService,
            Self::ReplicatedStorage => NodeClass::ReplicatedStorage,
            Self::Folder => NodeClass::Folder,
            Self::Model => NodeClass::Model,
            Self::Part => NodeClass::Part,
            Self::Script { .. } => NodeClass::Script,
            Self::StringValue { .. } => NodeClass::StringValue,
        }
    }
}

impl NodeClass {
    /// Classes a user may create through add-by-type.
    pub const CREATABLE: [NodeClass; 5] = [
        NodeClass::Folder,
        NodeClass::Model,
        NodeClass::Part,
        NodeClass::Script,
        NodeClass::StringValue,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::DataModel => "DataModel",
            Self::Workspace => "Workspace",
            Self::ServerScriptService => "ServerScriptService",
            Self::ReplicatedStorage => "ReplicatedStorage",
            Self::Folder => "Folder",
            Self::Model => "Model",
            Self::Part => "Part",
            Self::Script => "Script",
            Self::StringValue => "StringValue",
        }
    }

    pub fn is_service(self) -> bool {
        matches!(
            self,
            Self::Workspace | Self::ServerScriptService | Self::ReplicatedStorage
        )
    }

    /// `true` when nodes of this class carry a children map.
    pub fn can_contain(self) -> bool {
        match self {
            Self::DataModel
            | Self::Workspace
            | Self::ServerScriptService
            | Self::ReplicatedStorage
            | Self::Folder
            | Self::Model
            | Self::Part => true,
            Self::Script | Self::StringValue => false,
        }
    }

    /// The root and services are fixed structure: never renamed or deleted.
    pub fn is_renameable(self) -> bool {
        !matches!(self, Self::DataModel) && !self.is_service()
    }

    pub fn is_deletable(self) -> bool {
        self.is_renameable()
    }

    pub fn is_creatable(self) -> bool {
        Self::CREATABLE.contains(&self)
    }

    /// Default payload for a freshly created node of this class.
    ///
    /// # Returns
    /// `None` for the fixed classes (root and services).
    pub fn new_kind(self, name: &str) -> Option<NodeKind> {
        let kind = match self {
            Self::Folder => NodeKind::Folder,
            Self::Model => NodeKind::Model,
            Self::Part => NodeKind::Part,
            Self::Script => NodeKind::Script {
                source: format!("{}{}", NEW_SCRIPT_SOURCE_PREFIX, name),
            },
            Self::StringValue => NodeKind::StringValue {
                value: String::new(),
            },
            Self::DataModel
            | Self::Workspace
            | Self::ServerScriptService
            | Self::ReplicatedStorage => return None,
        };
        Some(kind)
    }
}

impl fmt::Display for NodeClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NodeClass {
    type Err = SceneError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        [
            Self::DataModel,
            Self::Workspace,
            Self::ServerScriptService,
            Self::ReplicatedStorage,
            Self::Folder,
            Self::Model,
            Self::Part,
            Self::Script,
            Self::StringValue,
        ]
        .into_iter()
        .find(|class| class.as_str().eq_ignore_ascii_case(wanted))
        .ok_or_else(|| SceneError::InvalidOperation(format!("unknown class '{}'", wanted)))
    }
}

/// A named, typed scene node.
///
/// `children` is present exactly when the class can contain other nodes, and
/// every key in it equals the child's `name`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    pub name: String,
    pub kind: NodeKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    children: Option<BTreeMap<String, Node>>,
}

impl Node {
    pub fn new(name: impl Into<String>, kind: NodeKind) -> Self {
        let children = kind.class().can_contain().then(BTreeMap::new);
        Self {
            name: name.into(),
            kind,
            children,
        }
    }

    /// An empty `game` root.
    pub fn data_model() -> Self {
        Self::new(ROOT_NAME, NodeKind::DataModel)
    }

    pub fn script(name: impl Into<String>, source: impl Into<String>) -> Self {
        Self::new(
            name,
            NodeKind::Script {
                source: source.into(),
            },
        )
    }

    /// Builder form of [`Node::insert_child`].
    ///
    /// # Errors
    /// Same as [`Node::insert_child`].
    pub fn with_child(mut self, child: Node) -> Result<Self, SceneError> {
        self.insert_child(child)?;
        Ok(self)
    }

    pub fn class(&self) -> NodeClass {
        self.kind.class()
    }

    pub fn is_script(&self) -> bool {
        matches!(self.kind, NodeKind::Script { .. })
    }

    /// Script source, or `None` for other kinds.
    pub fn source(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::Script { source } => Some(source.as_str()),
            _ => None,
        }
    }

    pub fn children(&self) -> Option<&BTreeMap<String, Node>> {
        self.children.as_ref()
    }

    pub fn child(&self, name: &str) -> Option<&Node> {
        self.children.as_ref()?.get(name)
    }

    pub(crate) fn child_mut(&mut self, name: &str) -> Option<&mut Node> {
        self.children.as_mut()?.get_mut(name)
    }

    pub(crate) fn children_mut(&mut self) -> Option<&mut BTreeMap<String, Node>> {
        self.children.as_mut()
    }

    /// Insert `child` keyed by its name.
    ///
    /// # Errors
    /// Returns [`SceneError::InvalidOperation`] when this node cannot hold
    /// children or already has a child with the same name. Path-aware
    /// collision reporting happens in the tree store.
    pub fn insert_child(&mut self, child: Node) -> Result<(), SceneError> {
        let class = self.class();
        let Some(children) = self.children.as_mut() else {
            return Err(SceneError::InvalidOperation(format!(
                "{} '{}' cannot contain children",
                class, self.name
            )));
        };
        if children.contains_key(&child.name) {
            return Err(SceneError::InvalidOperation(format!(
                "'{}' already contains '{}'",
                self.name, child.name
            )));
        }
        children.insert(child.name.clone(), child);
        Ok(())
    }

    /// Count of nodes in this subtree, including `self`.
    pub fn subtree_len(&self) -> usize {
        1 + self
            .children
            .iter()
            .flat_map(|children| children.values())
            .map(Node::subtree_len)
            .sum::<usize>()
    }
}
