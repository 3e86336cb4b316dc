//! Ancestor-chain navigation over any [`DomTree`].

use tracing::instrument;

use crate::domain::{DomainError, DomainResult, NodeId};
use crate::infrastructure::traits::DomTree;

/// Ancestors of `node`, nearest first, root last. The node itself is excluded,
/// so the chain length equals the node's depth.
///
/// The walk is bounded by the tree's node count; a parent relation that loops
/// reports [`DomainError::CycleDetected`] instead of spinning.
#[instrument(level = "trace", skip(tree))]
pub fn ancestor_chain<T: DomTree + ?Sized>(tree: &T, node: NodeId) -> DomainResult<Vec<NodeId>> {
    let bound = tree.node_count();
    let mut chain = Vec::new();
    let mut current = tree.parent(node)?;

    while let Some(parent) = current {
        if chain.len() >= bound {
            return Err(DomainError::CycleDetected(node));
        }
        chain.push(parent);
        current = tree.parent(parent)?;
    }

    Ok(chain)
}

/// True when `ancestor` is a strict ancestor of `node`.
pub fn is_ancestor<T: DomTree + ?Sized>(
    tree: &T,
    ancestor: NodeId,
    node: NodeId,
) -> DomainResult<bool> {
    Ok(ancestor_chain(tree, node)?.contains(&ancestor))
}

/// Nearest ancestor of `node` satisfying `predicate`.
pub fn find_ancestor<T, F>(tree: &T, node: NodeId, mut predicate: F) -> DomainResult<Option<NodeId>>
where
    T: DomTree + ?Sized,
    F: FnMut(NodeId) -> DomainResult<bool>,
{
    for ancestor in ancestor_chain(tree, node)? {
        if predicate(ancestor)? {
            return Ok(Some(ancestor));
        }
    }
    Ok(None)
}
