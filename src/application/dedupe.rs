//! Occurrence deduplication: keep only the most deeply nested matches.
//!
//! Phrase matching hits every ancestor whose text contains the phrase (an
//! outer wrapper and its inner label both contain "Related questions"). Only
//! the innermost node is a meaningful starting point for container lookup.

use itertools::Itertools;
use tracing::{instrument, trace};

use crate::application::navigator::ancestor_chain;
use crate::domain::{DomainResult, NodeId};
use crate::infrastructure::traits::DomTree;

/// Drop every node that is a strict ancestor of another node in the set.
///
/// Result is the maximal antichain in input order; repeated entries collapse
/// to their first occurrence. Pairwise O(n²) chain check.
#[instrument(level = "debug", skip(tree, nodes), fields(input = nodes.len()))]
pub fn dedupe<T: DomTree + ?Sized>(tree: &T, nodes: &[NodeId]) -> DomainResult<Vec<NodeId>> {
    let nodes: Vec<NodeId> = nodes.iter().copied().unique().collect();
    let chains = nodes
        .iter()
        .map(|&node| ancestor_chain(tree, node))
        .collect::<DomainResult<Vec<_>>>()?;

    let kept: Vec<NodeId> = nodes
        .iter()
        .enumerate()
        .filter(|&(i, node)| {
            !chains
                .iter()
                .enumerate()
                .any(|(j, chain)| j != i && chain.contains(node))
        })
        .map(|(_, &node)| node)
        .collect();

    trace!(kept = kept.len(), "deduplicated");
    Ok(kept)
}
