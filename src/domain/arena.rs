//! Arena-backed page tree.
//!
//! The document owns every node; callers hold `NodeId` handles. Removing a
//! node invalidates its handle (generational index), so stale handles are
//! detected instead of silently aliasing a reused slot.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use generational_arena::{Arena, Index};
use tracing::instrument;

use crate::domain::entities::{MutationKind, MutationRecord, ObserveOptions, SubscriptionId};
use crate::domain::error::{DomainError, DomainResult};

/// Handle to a node in a [`Document`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(Index);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (slot, generation) = self.0.into_raw_parts();
        write!(f, "node#{slot}v{generation}")
    }
}

/// Data payload of a page node.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NodeData {
    /// Element name, lowercase (e.g. `div`)
    pub name: String,
    /// Class-like tags
    pub tags: BTreeSet<String>,
    /// Key/value attributes; `id` is the identifier attribute
    pub attributes: BTreeMap<String, String>,
    /// Text owned directly by this node
    pub text: Option<String>,
}

impl NodeData {
    pub fn element(name: impl Into<String>) -> Self {
        Self {
            name: name.into().to_ascii_lowercase(),
            ..Self::default()
        }
    }

    pub fn with_id(self, id: impl Into<String>) -> Self {
        self.with_attribute("id", id)
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.insert(tag.into());
        self
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn id(&self) -> Option<&str> {
        self.attributes.get("id").map(String::as_str)
    }
}

impl fmt::Display for NodeData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        if let Some(id) = self.id() {
            write!(f, "#{id}")?;
        }
        for tag in &self.tags {
            write!(f, ".{tag}")?;
        }
        Ok(())
    }
}

/// Tree node in the arena.
#[derive(Debug)]
pub struct TreeNode {
    pub data: NodeData,
    /// Parent handle, None for the root
    pub parent: Option<NodeId>,
    /// Children in document order
    pub children: Vec<NodeId>,
}

#[derive(Debug)]
struct Observer {
    id: SubscriptionId,
    root: NodeId,
    options: ObserveOptions,
}

/// Page tree with a built-in mutation journal.
///
/// Every structural or attribute change made through the document is checked
/// against the active subscriptions and, when observed, appended to the
/// journal. Hosts drain the journal with [`Document::take_records`].
#[derive(Debug)]
pub struct Document {
    arena: Arena<TreeNode>,
    root: Option<NodeId>,
    observers: Vec<Observer>,
    records: Vec<MutationRecord>,
    next_subscription: u64,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    pub fn new() -> Self {
        Self {
            arena: Arena::new(),
            root: None,
            observers: Vec::new(),
            records: Vec::new(),
            next_subscription: 1,
        }
    }

    /// Append a node under `parent`, or install it as root when `parent` is None.
    #[instrument(level = "trace", skip(self))]
    pub fn insert_node(&mut self, data: NodeData, parent: Option<NodeId>) -> DomainResult<NodeId> {
        match parent {
            Some(parent_id) => {
                if !self.contains(parent_id) {
                    return Err(DomainError::StaleNode(parent_id));
                }
                let node_id = NodeId(self.arena.insert(TreeNode {
                    data,
                    parent: Some(parent_id),
                    children: Vec::new(),
                }));
                if let Some(parent) = self.arena.get_mut(parent_id.0) {
                    parent.children.push(node_id);
                }
                self.record(
                    parent_id,
                    MutationKind::ChildList {
                        added: vec![node_id],
                        removed: Vec::new(),
                    },
                );
                Ok(node_id)
            }
            None => {
                if self.root.is_some() {
                    return Err(DomainError::InvalidTree {
                        message: "document already has a root".to_string(),
                    });
                }
                let node_id = NodeId(self.arena.insert(TreeNode {
                    data,
                    parent: None,
                    children: Vec::new(),
                }));
                self.root = Some(node_id);
                Ok(node_id)
            }
        }
    }

    /// Detach `node` and drop its whole subtree from the arena.
    #[instrument(level = "trace", skip(self))]
    pub fn remove_node(&mut self, node: NodeId) -> DomainResult<()> {
        let parent = self.get_node(node).ok_or(DomainError::StaleNode(node))?.parent;
        let subtree: Vec<NodeId> = self.iter_from(node).map(|(id, _)| id).collect();

        match parent {
            Some(parent_id) => {
                self.record(
                    parent_id,
                    MutationKind::ChildList {
                        added: Vec::new(),
                        removed: vec![node],
                    },
                );
                if let Some(parent) = self.arena.get_mut(parent_id.0) {
                    parent.children.retain(|&child| child != node);
                }
            }
            None => self.root = None,
        }

        for id in subtree {
            self.arena.remove(id.0);
        }
        self.observers.retain(|observer| self.arena.contains(observer.root.0));
        Ok(())
    }

    pub fn set_text(&mut self, node: NodeId, text: impl Into<String>) -> DomainResult<()> {
        let entry = self.get_node_mut(node)?;
        entry.data.text = Some(text.into());
        self.record(node, MutationKind::CharacterData);
        Ok(())
    }

    /// Add a tag; returns false when the node already carried it.
    pub fn add_tag(&mut self, node: NodeId, tag: &str) -> DomainResult<bool> {
        let added = self.get_node_mut(node)?.data.tags.insert(tag.to_string());
        if added {
            self.record(
                node,
                MutationKind::Attributes {
                    name: "class".to_string(),
                },
            );
        }
        Ok(added)
    }

    pub fn set_attribute(&mut self, node: NodeId, name: &str, value: &str) -> DomainResult<()> {
        let entry = self.get_node_mut(node)?;
        let previous = entry
            .data
            .attributes
            .insert(name.to_string(), value.to_string());
        if previous.as_deref() != Some(value) {
            self.record(
                node,
                MutationKind::Attributes {
                    name: name.to_string(),
                },
            );
        }
        Ok(())
    }

    pub fn get_node(&self, node: NodeId) -> Option<&TreeNode> {
        self.arena.get(node.0)
    }

    fn get_node_mut(&mut self, node: NodeId) -> DomainResult<&mut TreeNode> {
        self.arena
            .get_mut(node.0)
            .ok_or(DomainError::StaleNode(node))
    }

    pub fn contains(&self, node: NodeId) -> bool {
        self.arena.contains(node.0)
    }

    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    pub fn len(&self) -> usize {
        self.arena.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arena.is_empty()
    }

    /// Pre-order traversal of the whole document.
    pub fn iter(&self) -> TreeIterator<'_> {
        TreeIterator::new(self, self.root)
    }

    /// Pre-order traversal of the subtree rooted at `node` (inclusive).
    pub fn iter_from(&self, node: NodeId) -> TreeIterator<'_> {
        TreeIterator::new(self, Some(node))
    }

    pub fn depth(&self) -> usize {
        self.root.map_or(0, |root| self.calculate_depth(root))
    }

    fn calculate_depth(&self, node: NodeId) -> usize {
        self.get_node(node).map_or(0, |entry| {
            1 + entry
                .children
                .iter()
                .map(|&child| self.calculate_depth(child))
                .max()
                .unwrap_or(0)
        })
    }

    /// Concatenated text of `node` and all its descendants, in document order.
    pub fn text_content(&self, node: NodeId) -> Option<String> {
        if !self.contains(node) {
            return None;
        }
        Some(
            self.iter_from(node)
                .filter_map(|(_, entry)| entry.data.text.as_deref())
                .collect(),
        )
    }

    pub fn find_by_id(&self, id: &str) -> Option<NodeId> {
        self.iter()
            .find(|(_, entry)| entry.data.id() == Some(id))
            .map(|(node, _)| node)
    }

    /// True when `ancestor` lies on the parent chain of `node`.
    pub fn is_within(&self, node: NodeId, ancestor: NodeId) -> bool {
        let mut current = self.get_node(node).and_then(|entry| entry.parent);
        let mut steps = 0;
        while let Some(parent) = current {
            if parent == ancestor {
                return true;
            }
            steps += 1;
            if steps > self.arena.len() {
                return false;
            }
            current = self.get_node(parent).and_then(|entry| entry.parent);
        }
        false
    }

    /// Start journaling mutations at and (optionally) below `root`.
    pub fn subscribe(&mut self, root: NodeId, options: ObserveOptions) -> DomainResult<SubscriptionId> {
        if !self.contains(root) {
            return Err(DomainError::StaleNode(root));
        }
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        self.observers.push(Observer { id, root, options });
        Ok(id)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.observers.len();
        self.observers.retain(|observer| observer.id != id);
        before != self.observers.len()
    }

    /// Drain journaled mutation records.
    pub fn take_records(&mut self) -> Vec<MutationRecord> {
        std::mem::take(&mut self.records)
    }

    fn record(&mut self, target: NodeId, kind: MutationKind) {
        let observed = self.observers.iter().any(|observer| {
            observer.options.accepts(&kind)
                && (observer.root == target
                    || (observer.options.subtree && self.is_within(target, observer.root)))
        });
        if observed {
            self.records.push(MutationRecord { target, kind });
        }
    }
}

pub struct TreeIterator<'a> {
    document: &'a Document,
    stack: Vec<NodeId>,
}

impl<'a> TreeIterator<'a> {
    fn new(document: &'a Document, start: Option<NodeId>) -> Self {
        Self {
            document,
            stack: start.into_iter().collect(),
        }
    }
}

impl<'a> Iterator for TreeIterator<'a> {
    type Item = (NodeId, &'a TreeNode);

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(current) = self.stack.pop() {
            if let Some(entry) = self.document.get_node(current) {
                // Push children in reverse order for left-to-right traversal
                for &child in entry.children.iter().rev() {
                    self.stack.push(child);
                }
                return Some((current, entry));
            }
        }
        None
    }
}
