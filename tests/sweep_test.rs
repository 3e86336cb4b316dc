//! Integration tests for one-shot sweeps over recorded page trees.

use std::sync::Arc;

use rstest::{fixture, rstest};

use declutter::application::services::{SweepOutcome, SweepService};
use declutter::application::RuleName;
use declutter::config::Settings;
use declutter::domain::{Document, NodeData, NodeId, PageMode};
use declutter::infrastructure::traits::StaticEnvironment;
use declutter::util::testing::{fixture_document, init_test_setup};

#[ctor::ctor]
fn init() {
    init_test_setup();
}

const MARK: &str = "declutter-hidden";

#[fixture]
fn service() -> SweepService {
    SweepService::new(Arc::new(Settings::default())).expect("default rules")
}

fn article_env() -> StaticEnvironment {
    StaticEnvironment::new("Why is the sky blue? - Quora", "/Why-is-the-sky-blue")
}

fn by_id(doc: &Document, id: &str) -> NodeId {
    doc.find_by_id(id)
        .unwrap_or_else(|| panic!("no element #{id}"))
}

fn marked_ids(doc: &Document) -> Vec<String> {
    doc.iter()
        .filter(|(_, node)| node.data.tags.contains(MARK))
        .map(|(_, node)| node.data.id().unwrap_or(&node.data.name).to_string())
        .collect()
}

// ============================================================
// Article pages
// ============================================================

#[rstest]
fn given_article_fixture_when_sweeping_then_each_rule_marks_its_container(service: SweepService) {
    let mut doc = fixture_document("article.toml");

    let outcome = service.run(&mut doc, &article_env()).unwrap();

    let report = outcome.report().expect("completed sweep");
    assert_eq!(report.mode, PageMode::Article);
    assert_eq!(report.marked_by(RuleName::SponsorBoxes), &[by_id(&doc, "sponsor")]);
    assert_eq!(report.marked_by(RuleName::UnrelatedQuestions), &[by_id(&doc, "promoted")]);
    assert_eq!(report.marked_by(RuleName::RelatedQuestions), &[by_id(&doc, "related-box")]);
    assert_eq!(
        report.marked_by(RuleName::OriginallyAnswered),
        &[by_id(&doc, "answer-copied")]
    );
    assert!(report.marked_by(RuleName::FeedAdvertisements).is_empty());
    assert_eq!(report.total_marked(), 4);
}

#[rstest]
fn given_article_fixture_when_sweeping_then_regular_content_untouched(service: SweepService) {
    let mut doc = fixture_document("article.toml");

    service.run(&mut doc, &article_env()).unwrap();

    let mut marked = marked_ids(&doc);
    marked.sort();
    assert_eq!(marked, vec!["answer-copied", "promoted", "related-box", "sponsor"]);
}

#[rstest]
fn given_swept_article_when_sweeping_again_then_no_new_marks(service: SweepService) {
    let mut doc = fixture_document("article.toml");
    let env = article_env();

    let first = service.run(&mut doc, &env).unwrap();
    let second = service.run(&mut doc, &env).unwrap();

    assert_eq!(first.total_marked(), 4);
    assert_eq!(second.total_marked(), 0);
    assert_eq!(marked_ids(&doc).len(), 4);
}

#[rstest]
fn given_article_when_sweeping_then_column_widened(service: SweepService) {
    let mut doc = fixture_document("article.toml");

    service.run(&mut doc, &article_env()).unwrap();

    let main = doc.get_node(by_id(&doc, "mainContent")).unwrap();
    assert_eq!(
        main.data.attributes.get("style").map(String::as_str),
        Some("width: 100%; max-width: none")
    );
}

// ============================================================
// Feed and other pages
// ============================================================

#[rstest]
fn given_feed_fixture_when_sweeping_then_only_ad_post_marked(service: SweepService) {
    let mut doc = fixture_document("feed.toml");

    let outcome = service
        .run(&mut doc, &StaticEnvironment::new("Quora", "/"))
        .unwrap();

    let report = outcome.report().expect("completed sweep");
    assert_eq!(report.mode, PageMode::Feed);
    assert_eq!(report.marks.len(), 1);
    assert_eq!(marked_ids(&doc), vec!["post-ad"]);
    let main = doc.get_node(by_id(&doc, "mainContent")).unwrap();
    assert_eq!(main.data.attributes.get("style"), None);
}

#[rstest]
#[case("Settings", "/settings")]
#[case("Quora", "/answer")]
fn given_other_page_when_sweeping_then_idle(
    service: SweepService,
    #[case] title: &str,
    #[case] path: &str,
) {
    let mut doc = fixture_document("article.toml");

    let outcome = service
        .run(&mut doc, &StaticEnvironment::new(title, path))
        .unwrap();

    assert_eq!(outcome, SweepOutcome::Idle);
    assert!(marked_ids(&doc).is_empty());
}

#[rstest]
fn given_page_without_main_content_when_sweeping_then_not_rendered(service: SweepService) {
    let mut doc = Document::new();
    let body = doc.insert_node(NodeData::element("body"), None).unwrap();
    doc.insert_node(NodeData::element("span").with_text("Related questions"), Some(body))
        .unwrap();

    let outcome = service.run(&mut doc, &article_env()).unwrap();

    assert_eq!(outcome, SweepOutcome::NotRendered);
    assert!(marked_ids(&doc).is_empty());
}

// ============================================================
// Configured site structure
// ============================================================

#[test]
fn given_custom_mark_tag_when_sweeping_then_uses_it() {
    let settings = Settings {
        mark_tag: "gone".into(),
        ..Settings::default()
    };
    let service = SweepService::new(Arc::new(settings)).unwrap();
    let mut doc = fixture_document("article.toml");

    service.run(&mut doc, &article_env()).unwrap();

    let sponsor = doc.get_node(by_id(&doc, "sponsor")).unwrap();
    assert!(sponsor.data.tags.contains("gone"));
    assert!(!sponsor.data.tags.contains(MARK));
}

#[test]
fn given_no_item_tags_when_sweeping_then_nearest_tagged_rules_mark_nothing() {
    let mut settings = Settings::default();
    settings.rules.item_tags.clear();
    let service = SweepService::new(Arc::new(settings)).unwrap();
    let mut doc = fixture_document("article.toml");

    let outcome = service.run(&mut doc, &article_env()).unwrap();
    let report = outcome.report().unwrap();

    assert!(report.marked_by(RuleName::UnrelatedQuestions).is_empty());
    assert!(report.marked_by(RuleName::OriginallyAnswered).is_empty());
    // the question header is no longer exempt
    assert!(report
        .marked_by(RuleName::SponsorBoxes)
        .contains(&by_id(&doc, "question")));
}
