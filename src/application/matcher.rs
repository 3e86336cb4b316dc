//! Phrase matching: structural predicate AND every phrase as a substring.

use tracing::{debug, instrument};

use crate::domain::{DomainResult, NodeId, Shape};
use crate::infrastructure::traits::DomTree;

/// True when `text` contains every phrase. Plain, case-sensitive substring
/// test; a phrase inside a larger word still counts.
pub fn contains_all<P: AsRef<str>>(text: &str, phrases: &[P]) -> bool {
    phrases.iter().all(|phrase| text.contains(phrase.as_ref()))
}

/// Nodes matching `predicate` whose text content contains all `phrases`.
///
/// Returns `None` when nothing qualifies; callers treat `None` as "nothing to
/// do". With no phrases every predicate match qualifies.
#[instrument(level = "debug", skip(tree, predicate, phrases), fields(predicate = %predicate))]
pub fn find_matches<T, P>(
    tree: &T,
    scope: Option<NodeId>,
    predicate: &Shape,
    phrases: &[P],
) -> DomainResult<Option<Vec<NodeId>>>
where
    T: DomTree + ?Sized,
    P: AsRef<str>,
{
    let mut matches = Vec::new();
    for node in tree.query_all(predicate, scope)? {
        if phrases.is_empty() || contains_all(&tree.text_content(node)?, phrases) {
            matches.push(node);
        }
    }
    debug!(count = matches.len(), "phrase matches");
    Ok((!matches.is_empty()).then_some(matches))
}

/// Like [`find_matches`] but takes the predicate as selector text. A selector
/// that does not parse matches nothing.
pub fn find_matches_by_selector<T, P>(
    tree: &T,
    scope: Option<NodeId>,
    selector: &str,
    phrases: &[P],
) -> DomainResult<Option<Vec<NodeId>>>
where
    T: DomTree + ?Sized,
    P: AsRef<str>,
{
    match Shape::parse(selector) {
        Ok(shape) => find_matches(tree, scope, &shape, phrases),
        Err(e) => {
            debug!("ignoring predicate: {e}");
            Ok(None)
        }
    }
}
