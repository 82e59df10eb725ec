//! Path-based node identifiers.
//!
//! Every operation, variable reference and conditional gets an identifier
//! built from the operator tags and branch labels on the way down from the
//! root, e.g. `root/and/0/>/0/var`. Literals and plain lists get none. The
//! result is a pure function of tree shape, so re-parsing the same text
//! yields the same identifiers and UI state keyed by them survives.

use crate::node::{Branch, Node};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

pub const DEFAULT_PREFIX: &str = "root";
pub const SEPARATOR: char = '/';

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(String);

impl NodeId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NodeId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Identifier of `node` when it sits at `path`, or `None` for literals/lists.
pub fn node_id(path: &str, node: &Node) -> Option<NodeId> {
    node.tag().map(|tag| NodeId(format!("{path}{SEPARATOR}{tag}")))
}

/// Path handed to a child reached through `branch` from `parent`.
pub fn child_path(parent: &str, branch: Branch) -> String {
    match branch.segment() {
        Some(segment) => format!("{parent}{SEPARATOR}{segment}"),
        None => parent.to_string(),
    }
}

/// Identifiers of one tree, in pre-order.
///
/// This is the universe of keys valid for expand/collapse state.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct IdentityMap {
    prefix: String,
    ids: Vec<NodeId>,
}

impl IdentityMap {
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn ids(&self) -> &[NodeId] {
        &self.ids
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn contains(&self, id: &NodeId) -> bool {
        self.ids.contains(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &NodeId> {
        self.ids.iter()
    }

    pub fn to_set(&self) -> HashSet<NodeId> {
        self.ids.iter().cloned().collect()
    }
}

/// Assign identifiers under `prefix` (`"root"` unless the caller scopes it,
/// e.g. `"dialog-root"` for a second view of the same tree).
pub fn assign(node: &Node, prefix: &str) -> IdentityMap {
    let mut ids = Vec::new();
    walk(node, prefix, &mut |id, _| ids.push(id.clone()));
    tracing::debug!(prefix, count = ids.len(), "assigned node identifiers");
    IdentityMap {
        prefix: prefix.to_string(),
        ids,
    }
}

/// Pre-order visit of every identified node with its identifier.
pub fn walk<'a, F>(node: &'a Node, path: &str, visit: &mut F)
where
    F: FnMut(&NodeId, &'a Node),
{
    let here = match node_id(path, node) {
        Some(id) => {
            visit(&id, node);
            id.0
        }
        None => path.to_string(),
    };
    for (branch, child) in node.children() {
        if child.is_literal() {
            continue;
        }
        walk(child, &child_path(&here, branch), visit);
    }
}
