//! Classification rules.
//!
//! Every rule runs the same pipeline: phrase match → dedupe → locate the node
//! to mark with the rule's [`Strategy`] → mark. Rules are stateless; the table
//! is rebuilt from [`Settings`] and never cached across sweeps.

use std::fmt;

use itertools::Itertools;
use tracing::{debug, instrument};

use crate::application::dedupe::dedupe;
use crate::application::matcher::find_matches;
use crate::application::navigator::{ancestor_chain, find_ancestor};
use crate::config::Settings;
use crate::domain::{DomainResult, NodeId, PageMode, Shape};
use crate::infrastructure::traits::DomTree;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RuleName {
    SponsorBoxes,
    UnrelatedQuestions,
    RelatedQuestions,
    OriginallyAnswered,
    FeedAdvertisements,
}

impl RuleName {
    pub fn as_str(&self) -> &'static str {
        match self {
            RuleName::SponsorBoxes => "sponsor-boxes",
            RuleName::UnrelatedQuestions => "unrelated-questions",
            RuleName::RelatedQuestions => "related-questions",
            RuleName::OriginallyAnswered => "originally-answered",
            RuleName::FeedAdvertisements => "feed-advertisements",
        }
    }
}

impl fmt::Display for RuleName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where the phrase matcher looks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    /// Whole document, root included
    Document,
    /// Strict descendants of the main content root
    MainContent,
}

/// How a surviving match is turned into the node to mark.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Strategy {
    /// The match set already holds the direct children of the main content
    /// root; mark each one unless it carries an exempt tag.
    DirectChildren { exempt_tags: Vec<String> },
    /// Mark the nearest ancestor carrying any of `tags`; skip when none does.
    NearestTagged { tags: Vec<String> },
    /// Mark `chain[i]` for every `i` where `chain[i + offset]` has
    /// `id == root_id`. Depends on the exact nesting depth below the root.
    FixedOffset { offset: usize, root_id: String },
    /// Mark the nearest ancestor matching `shape`.
    FirstMatchingShape { shape: Shape },
}

impl Strategy {
    /// Nodes to mark for one deduplicated match.
    pub fn locate<T: DomTree + ?Sized>(&self, tree: &T, node: NodeId) -> DomainResult<Vec<NodeId>> {
        match self {
            Strategy::DirectChildren { exempt_tags } => {
                if has_any_tag(tree, node, exempt_tags)? {
                    Ok(Vec::new())
                } else {
                    Ok(vec![node])
                }
            }
            Strategy::NearestTagged { tags } => {
                let found = find_ancestor(tree, node, |ancestor| has_any_tag(tree, ancestor, tags))?;
                Ok(found.into_iter().collect())
            }
            Strategy::FixedOffset { offset, root_id } => {
                let chain = ancestor_chain(tree, node)?;
                let mut located = Vec::new();
                for i in 0..chain.len().saturating_sub(*offset) {
                    if tree.attribute(chain[i + offset], "id")?.as_deref() == Some(root_id.as_str()) {
                        located.push(chain[i]);
                    }
                }
                Ok(located)
            }
            Strategy::FirstMatchingShape { shape } => {
                let found = find_ancestor(tree, node, |ancestor| tree.matches_shape(ancestor, shape))?;
                Ok(found.into_iter().collect())
            }
        }
    }

    pub fn describe(&self) -> String {
        match self {
            Strategy::DirectChildren { exempt_tags } if exempt_tags.is_empty() => {
                "direct children".to_string()
            }
            Strategy::DirectChildren { exempt_tags } => {
                format!("direct children, except .{}", exempt_tags.join(" ."))
            }
            Strategy::NearestTagged { tags } => {
                format!("nearest ancestor with .{}", tags.join(" | ."))
            }
            Strategy::FixedOffset { offset, root_id } => {
                format!("ancestor {offset} levels below #{root_id}")
            }
            Strategy::FirstMatchingShape { shape } => format!("nearest ancestor matching {shape}"),
        }
    }
}

fn has_any_tag<T: DomTree + ?Sized>(tree: &T, node: NodeId, tags: &[String]) -> DomainResult<bool> {
    for tag in tags {
        if tree.has_tag(node, tag)? {
            return Ok(true);
        }
    }
    Ok(false)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    pub name: RuleName,
    pub mode: PageMode,
    pub phrases: Vec<String>,
    pub predicate: Shape,
    pub scope: Scope,
    pub strategy: Strategy,
}

impl Rule {
    /// Nodes this rule would mark on the current tree.
    pub fn targets<T: DomTree + ?Sized>(&self, tree: &T, main: NodeId) -> DomainResult<Vec<NodeId>> {
        let scope = match self.scope {
            Scope::Document => None,
            Scope::MainContent => Some(main),
        };
        let Some(matches) = find_matches(tree, scope, &self.predicate, &self.phrases)? else {
            return Ok(Vec::new());
        };
        let matches = if matches.len() > 1 {
            dedupe(tree, &matches)?
        } else {
            matches
        };

        let mut targets = Vec::new();
        for node in matches {
            targets.extend(self.strategy.locate(tree, node)?);
        }
        Ok(targets.into_iter().unique().collect())
    }

    /// Mark every target; returns only the nodes that were not marked before.
    #[instrument(level = "debug", skip(self, tree), fields(rule = %self.name))]
    pub fn apply<T: DomTree + ?Sized>(
        &self,
        tree: &mut T,
        main: NodeId,
        mark_tag: &str,
    ) -> DomainResult<Vec<NodeId>> {
        let targets = self.targets(&*tree, main)?;
        let mut marked = Vec::new();
        for node in targets {
            if tree.add_tag(node, mark_tag)? {
                marked.push(node);
            }
        }
        debug!(marked = marked.len(), "rule applied");
        Ok(marked)
    }
}

/// The ordered rule table.
#[derive(Debug, Clone)]
pub struct RuleBook {
    rules: Vec<Rule>,
}

impl RuleBook {
    /// Build the table for the configured site structure. Fails only when a
    /// configured shape does not parse.
    pub fn from_settings(settings: &Settings) -> DomainResult<Self> {
        let main_id = &settings.main_content_id;
        let item_tags = settings.rules.item_tags.clone();
        let anything = Shape::universal();

        let rules = vec![
            Rule {
                name: RuleName::SponsorBoxes,
                mode: PageMode::Article,
                phrases: Vec::new(),
                predicate: Shape::parse(&format!(
                    "#{main_id} > *:not(.{})",
                    settings.rules.content_block_tag
                ))?,
                scope: Scope::MainContent,
                strategy: Strategy::DirectChildren {
                    exempt_tags: item_tags.clone(),
                },
            },
            Rule {
                name: RuleName::UnrelatedQuestions,
                mode: PageMode::Article,
                phrases: vec!["Related".into()],
                predicate: anything.clone(),
                scope: Scope::Document,
                strategy: Strategy::NearestTagged {
                    tags: item_tags.clone(),
                },
            },
            Rule {
                name: RuleName::RelatedQuestions,
                mode: PageMode::Article,
                phrases: vec!["Related questions".into()],
                predicate: anything.clone(),
                scope: Scope::Document,
                strategy: Strategy::FixedOffset {
                    offset: 2,
                    root_id: main_id.clone(),
                },
            },
            Rule {
                name: RuleName::OriginallyAnswered,
                mode: PageMode::Article,
                phrases: vec!["Originally Answered".into()],
                predicate: anything.clone(),
                scope: Scope::Document,
                strategy: Strategy::NearestTagged { tags: item_tags },
            },
            Rule {
                name: RuleName::FeedAdvertisements,
                mode: PageMode::Feed,
                phrases: vec!["Advertisement".into()],
                predicate: anything,
                scope: Scope::MainContent,
                strategy: Strategy::FirstMatchingShape {
                    shape: Shape::parse(&settings.rules.feed_shape)?,
                },
            },
        ];

        Ok(Self { rules })
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn get(&self, name: RuleName) -> Option<&Rule> {
        self.rules.iter().find(|rule| rule.name == name)
    }

    /// Rules applicable in `mode`, in table order.
    pub fn for_mode(&self, mode: PageMode) -> impl Iterator<Item = &Rule> {
        self.rules.iter().filter(move |rule| rule.mode == mode)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Document, NodeData};

    const ITEM: &str = "dom_annotate_question_answer_item";

    fn book() -> RuleBook {
        RuleBook::from_settings(&Settings::default()).unwrap()
    }

    fn add(doc: &mut Document, parent: NodeId, data: NodeData) -> NodeId {
        doc.insert_node(data, Some(parent)).unwrap()
    }

    #[test]
    fn given_default_settings_when_building_book_then_table_order_and_modes() {
        let book = book();
        let names: Vec<RuleName> = book.rules().iter().map(|r| r.name).collect();

        assert_eq!(
            names,
            vec![
                RuleName::SponsorBoxes,
                RuleName::UnrelatedQuestions,
                RuleName::RelatedQuestions,
                RuleName::OriginallyAnswered,
                RuleName::FeedAdvertisements,
            ]
        );
        assert_eq!(book.for_mode(PageMode::Article).count(), 4);
        assert_eq!(
            book.for_mode(PageMode::Feed).map(|r| r.name).collect::<Vec<_>>(),
            vec![RuleName::FeedAdvertisements]
        );
    }

    #[test]
    fn given_unparsable_feed_shape_when_building_book_then_fails() {
        let mut settings = Settings::default();
        settings.rules.feed_shape = "#mainContent >".into();
        assert!(RuleBook::from_settings(&settings).is_err());
    }

    #[test]
    fn given_originally_answered_scenario_when_applying_then_marks_content_item() {
        // root > contentItem[answer item] > body > text("Originally Answered by Jane")
        let mut doc = Document::new();
        let root = doc.insert_node(NodeData::element("body"), None).unwrap();
        let item = add(&mut doc, root, NodeData::element("div").with_tag(ITEM));
        let body = add(&mut doc, item, NodeData::element("div"));
        let text = add(
            &mut doc,
            body,
            NodeData::element("span").with_text("Originally Answered by Jane"),
        );

        let rule = book().get(RuleName::OriginallyAnswered).unwrap().clone();
        let marked = rule.apply(&mut doc, root, "hidden").unwrap();

        assert_eq!(marked, vec![item]);
        for other in [root, body, text] {
            assert!(doc.get_node(other).unwrap().data.tags.get("hidden").is_none());
        }
    }

    #[test]
    fn given_match_without_tagged_ancestor_when_applying_then_marks_nothing() {
        let mut doc = Document::new();
        let root = doc.insert_node(NodeData::element("body"), None).unwrap();
        let div = add(&mut doc, root, NodeData::element("div"));
        add(&mut doc, div, NodeData::element("span").with_text("Related Spaces"));

        let rule = book().get(RuleName::UnrelatedQuestions).unwrap().clone();
        let marked = rule.apply(&mut doc, root, "hidden").unwrap();

        assert!(marked.is_empty());
    }

    #[test]
    fn given_chain_with_main_two_levels_up_when_fixed_offset_then_marks_nearest() {
        // chain of `leaf` = [a, b, main, body]; chain[2] is #mainContent → mark a
        let mut doc = Document::new();
        let body = doc.insert_node(NodeData::element("body"), None).unwrap();
        let main = add(&mut doc, body, NodeData::element("div").with_id("mainContent"));
        let b = add(&mut doc, main, NodeData::element("div"));
        let a = add(&mut doc, b, NodeData::element("div"));
        let leaf = add(&mut doc, a, NodeData::element("span").with_text("Related questions"));

        let strategy = Strategy::FixedOffset {
            offset: 2,
            root_id: "mainContent".into(),
        };
        assert_eq!(ancestor_chain(&doc, leaf).unwrap(), vec![a, b, main, body]);
        assert_eq!(strategy.locate(&doc, leaf).unwrap(), vec![a]);

        let rule = book().get(RuleName::RelatedQuestions).unwrap().clone();
        assert_eq!(rule.apply(&mut doc, main, "hidden").unwrap(), vec![a]);
    }

    #[test]
    fn given_short_chain_when_fixed_offset_then_no_mark_and_no_panic() {
        let mut doc = Document::new();
        let body = doc.insert_node(NodeData::element("body"), None).unwrap();
        let span = add(&mut doc, body, NodeData::element("span"));

        let strategy = Strategy::FixedOffset {
            offset: 2,
            root_id: "mainContent".into(),
        };
        assert!(strategy.locate(&doc, span).unwrap().is_empty());
        assert!(strategy.locate(&doc, body).unwrap().is_empty());
    }

    #[test]
    fn given_main_children_when_sponsor_rule_then_marks_non_blocks_except_items() {
        let mut doc = Document::new();
        let body = doc.insert_node(NodeData::element("body"), None).unwrap();
        let main = add(&mut doc, body, NodeData::element("div").with_id("mainContent"));
        let block = add(&mut doc, main, NodeData::element("div").with_tag("q-box"));
        let sponsor = add(&mut doc, main, NodeData::element("div").with_tag("sponsor"));
        let answer = add(&mut doc, main, NodeData::element("div").with_tag(ITEM));
        let nested = add(&mut doc, sponsor, NodeData::element("div"));

        let rule = book().get(RuleName::SponsorBoxes).unwrap().clone();
        let marked = rule.apply(&mut doc, main, "hidden").unwrap();

        assert_eq!(marked, vec![sponsor]);
        for untouched in [block, answer, nested, main] {
            assert!(!doc.get_node(untouched).unwrap().data.tags.contains("hidden"));
        }
    }

    #[test]
    fn given_feed_ad_when_feed_rule_then_marks_post_at_grandchild_level() {
        let mut doc = Document::new();
        let body = doc.insert_node(NodeData::element("body"), None).unwrap();
        let main = add(&mut doc, body, NodeData::element("div").with_id("mainContent"));
        let column = add(&mut doc, main, NodeData::element("div"));
        let ad_post = add(&mut doc, column, NodeData::element("div"));
        let header = add(&mut doc, ad_post, NodeData::element("div"));
        add(&mut doc, header, NodeData::element("span").with_text("Advertisement"));
        let normal_post = add(&mut doc, column, NodeData::element("div"));
        add(&mut doc, normal_post, NodeData::element("span").with_text("An answer"));

        let rule = book().get(RuleName::FeedAdvertisements).unwrap().clone();
        let marked = rule.apply(&mut doc, main, "hidden").unwrap();

        assert_eq!(marked, vec![ad_post]);
    }

    #[test]
    fn given_two_matches_in_same_item_when_applying_then_item_marked_once() {
        let mut doc = Document::new();
        let root = doc.insert_node(NodeData::element("body"), None).unwrap();
        let item = add(&mut doc, root, NodeData::element("div").with_tag(ITEM));
        add(&mut doc, item, NodeData::element("span").with_text("Related"));
        add(&mut doc, item, NodeData::element("span").with_text("Related"));

        let rule = book().get(RuleName::UnrelatedQuestions).unwrap().clone();
        assert_eq!(rule.targets(&doc, root).unwrap(), vec![item]);
        assert_eq!(rule.apply(&mut doc, root, "hidden").unwrap(), vec![item]);
        assert!(rule.apply(&mut doc, root, "hidden").unwrap().is_empty());
    }

    #[test]
    fn given_strategies_when_described_then_readable() {
        let book = book();
        let text = book
            .rules()
            .iter()
            .map(|r| r.strategy.describe())
            .join("\n");
        assert!(text.contains("#mainContent"));
        assert!(text.contains(ITEM));
    }
}
