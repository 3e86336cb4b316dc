//! Collaborator boundary traits
//!
//! The engine never touches a concrete tree, timer or page environment. These
//! traits describe exactly what it consumes, so hosts can plug in their own
//! tree and event loop and tests can drive everything deterministically.

use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

use crate::domain::{
    Document, DomainError, DomainResult, MutationRecord, NodeId, ObserveOptions, Shape,
    SubscriptionId, TimerHandle,
};

/// Read access to the page tree plus the single write the engine performs.
pub trait DomTree {
    fn root(&self) -> Option<NodeId>;

    /// Number of live nodes; bounds every parent walk.
    fn node_count(&self) -> usize;

    /// First element (document order) whose `id` attribute equals `id`.
    fn find_by_id(&self, id: &str) -> Option<NodeId>;

    /// All nodes matching `predicate`, in document order. With a scope, only
    /// strict descendants of the scope are considered.
    fn query_all(&self, predicate: &Shape, scope: Option<NodeId>) -> DomainResult<Vec<NodeId>>;

    fn children(&self, node: NodeId) -> DomainResult<Vec<NodeId>>;

    fn text_content(&self, node: NodeId) -> DomainResult<String>;

    fn parent(&self, node: NodeId) -> DomainResult<Option<NodeId>>;

    fn tags(&self, node: NodeId) -> DomainResult<BTreeSet<String>>;

    fn has_tag(&self, node: NodeId, tag: &str) -> DomainResult<bool> {
        Ok(self.tags(node)?.contains(tag))
    }

    /// Add `tag`; returns true only when the node did not carry it yet.
    fn add_tag(&mut self, node: NodeId, tag: &str) -> DomainResult<bool>;

    fn attribute(&self, node: NodeId, name: &str) -> DomainResult<Option<String>>;

    fn set_attribute(&mut self, node: NodeId, name: &str, value: &str) -> DomainResult<()>;

    fn matches_shape(&self, node: NodeId, shape: &Shape) -> DomainResult<bool>;
}

/// Source of batched tree-mutation notifications.
pub trait MutationSource {
    fn subscribe(&mut self, root: NodeId, options: ObserveOptions) -> DomainResult<SubscriptionId>;

    fn unsubscribe(&mut self, subscription: SubscriptionId) -> bool;

    /// Drain the records observed since the last call (one batch).
    fn take_records(&mut self) -> Vec<MutationRecord>;
}

/// Cancelable one-shot timers.
pub trait Scheduler {
    fn schedule_after(&mut self, delay: Duration) -> TimerHandle;

    /// Returns false when the timer already fired or was canceled.
    fn cancel(&mut self, handle: TimerHandle) -> bool;
}

/// Page-level signals used to decide the page mode.
pub trait PageEnvironment {
    fn page_title(&self) -> String;

    fn current_path(&self) -> String;
}

// ============================================================
// REAL IMPLEMENTATIONS
// ============================================================

impl DomTree for Document {
    fn root(&self) -> Option<NodeId> {
        Document::root(self)
    }

    fn node_count(&self) -> usize {
        self.len()
    }

    fn find_by_id(&self, id: &str) -> Option<NodeId> {
        Document::find_by_id(self, id)
    }

    fn query_all(&self, predicate: &Shape, scope: Option<NodeId>) -> DomainResult<Vec<NodeId>> {
        let nodes: Vec<NodeId> = match scope {
            Some(scope) => {
                if !self.contains(scope) {
                    return Err(DomainError::StaleNode(scope));
                }
                self.iter_from(scope).skip(1).map(|(id, _)| id).collect()
            }
            None => self.iter().map(|(id, _)| id).collect(),
        };
        Ok(nodes
            .into_iter()
            .filter(|&node| predicate.matches(self, node))
            .collect())
    }

    fn children(&self, node: NodeId) -> DomainResult<Vec<NodeId>> {
        self.get_node(node)
            .map(|entry| entry.children.clone())
            .ok_or(DomainError::StaleNode(node))
    }

    fn text_content(&self, node: NodeId) -> DomainResult<String> {
        Document::text_content(self, node).ok_or(DomainError::StaleNode(node))
    }

    fn parent(&self, node: NodeId) -> DomainResult<Option<NodeId>> {
        self.get_node(node)
            .map(|entry| entry.parent)
            .ok_or(DomainError::StaleNode(node))
    }

    fn tags(&self, node: NodeId) -> DomainResult<BTreeSet<String>> {
        self.get_node(node)
            .map(|entry| entry.data.tags.clone())
            .ok_or(DomainError::StaleNode(node))
    }

    fn has_tag(&self, node: NodeId, tag: &str) -> DomainResult<bool> {
        self.get_node(node)
            .map(|entry| entry.data.tags.contains(tag))
            .ok_or(DomainError::StaleNode(node))
    }

    fn add_tag(&mut self, node: NodeId, tag: &str) -> DomainResult<bool> {
        Document::add_tag(self, node, tag)
    }

    fn attribute(&self, node: NodeId, name: &str) -> DomainResult<Option<String>> {
        self.get_node(node)
            .map(|entry| entry.data.attributes.get(name).cloned())
            .ok_or(DomainError::StaleNode(node))
    }

    fn set_attribute(&mut self, node: NodeId, name: &str, value: &str) -> DomainResult<()> {
        Document::set_attribute(self, node, name, value)
    }

    fn matches_shape(&self, node: NodeId, shape: &Shape) -> DomainResult<bool> {
        if !self.contains(node) {
            return Err(DomainError::StaleNode(node));
        }
        Ok(shape.matches(self, node))
    }
}

impl MutationSource for Document {
    fn subscribe(&mut self, root: NodeId, options: ObserveOptions) -> DomainResult<SubscriptionId> {
        Document::subscribe(self, root, options)
    }

    fn unsubscribe(&mut self, subscription: SubscriptionId) -> bool {
        Document::unsubscribe(self, subscription)
    }

    fn take_records(&mut self) -> Vec<MutationRecord> {
        Document::take_records(self)
    }
}

/// Virtual-clock scheduler.
///
/// Time only moves when the host calls [`ManualScheduler::advance`], which
/// returns the timers that became due, earliest deadline first.
#[derive(Debug, Default)]
pub struct ManualScheduler {
    now: Duration,
    next_handle: u64,
    timers: BTreeMap<TimerHandle, Duration>,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn now(&self) -> Duration {
        self.now
    }

    pub fn pending(&self) -> usize {
        self.timers.len()
    }

    pub fn deadline(&self, handle: TimerHandle) -> Option<Duration> {
        self.timers.get(&handle).copied()
    }

    pub fn next_deadline(&self) -> Option<Duration> {
        self.timers.values().min().copied()
    }

    /// Move the clock forward and collect every timer due by the new time.
    pub fn advance(&mut self, by: Duration) -> Vec<TimerHandle> {
        self.now += by;
        let mut due: Vec<(Duration, TimerHandle)> = self
            .timers
            .iter()
            .filter(|&(_, &deadline)| deadline <= self.now)
            .map(|(&handle, &deadline)| (deadline, handle))
            .collect();
        due.sort();
        for (_, handle) in &due {
            self.timers.remove(handle);
        }
        due.into_iter().map(|(_, handle)| handle).collect()
    }
}

impl Scheduler for ManualScheduler {
    fn schedule_after(&mut self, delay: Duration) -> TimerHandle {
        self.next_handle += 1;
        let handle = TimerHandle(self.next_handle);
        self.timers.insert(handle, self.now + delay);
        handle
    }

    fn cancel(&mut self, handle: TimerHandle) -> bool {
        self.timers.remove(&handle).is_some()
    }
}

/// Fixed page title and path.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StaticEnvironment {
    pub title: String,
    pub path: String,
}

impl StaticEnvironment {
    pub fn new(title: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            path: path.into(),
        }
    }
}

impl PageEnvironment for StaticEnvironment {
    fn page_title(&self) -> String {
        self.title.clone()
    }

    fn current_path(&self) -> String {
        self.path.clone()
    }
}
