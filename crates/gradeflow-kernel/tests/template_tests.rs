use gradeflow_kernel::catalog;
use gradeflow_kernel::graph::GraphStore;
use gradeflow_kernel::templates::{self, UnknownTemplate, BLANK};
use gradeflow_kernel::types::NodeKind;
use pretty_assertions::assert_eq;

#[test]
fn test_every_template_instantiates_as_a_chain() {
    for template in templates::list() {
        let store = GraphStore::new();
        let made = templates::instantiate(template.id, &store).unwrap();
        assert_eq!(made.nodes.len(), template.node_count(), "{}", template.id);
        assert_eq!(made.edges.len(), template.node_count() - 1, "{}", template.id);
        for (pair, edge) in made.nodes.windows(2).zip(&made.edges) {
            assert_eq!((edge.source, edge.target), (pair[0].id, pair[1].id));
        }
        let topology = store.topology();
        assert!(topology.is_acyclic);
        assert_eq!(topology.entry_nodes, vec![made.nodes[0].id]);
    }
}

#[test]
fn test_preset_configured_flags() {
    let flags = |id: &str| {
        let store = GraphStore::new();
        templates::instantiate(id, &store).unwrap();
        store.nodes().iter().map(|n| n.configured).collect::<Vec<_>>()
    };
    assert_eq!(flags("homework-grading"), vec![true, true, false, true]);
    assert_eq!(flags("exam-analysis"), vec![true, true, true, false]);
    assert_eq!(flags("practice-feedback"), vec![true, false, true]);
    assert_eq!(flags("error-collection"), vec![true, false, true]);
}

#[test]
fn test_error_collection_starts_with_recognition() {
    let store = GraphStore::new();
    templates::instantiate("error-collection", &store).unwrap();
    let kinds: Vec<_> = store.nodes().iter().map(|n| n.kind).collect();
    assert_eq!(kinds, vec![NodeKind::Ocr, NodeKind::AiGrading, NodeKind::Export]);
    assert_eq!(store.nodes()[2].label, "Build mistake book");
}

#[test]
fn test_templates_listed_newest_first() {
    let dates: Vec<_> = templates::list().iter().map(|t| t.date).collect();
    let mut sorted = dates.clone();
    sorted.sort_unstable_by(|a, b| b.cmp(a));
    assert_eq!(dates, sorted);
    assert!(templates::list().iter().filter(|t| t.popular).count() >= 2);
}

#[test]
fn test_blank_and_unknown_templates() {
    let store = GraphStore::new();
    assert!(templates::instantiate(BLANK, &store).unwrap().nodes.is_empty());
    assert_eq!(
        templates::instantiate("lesson-plan", &store).unwrap_err(),
        UnknownTemplate("lesson-plan".to_string())
    );
    assert!(store.is_empty());
}

#[test]
fn test_recommendations_follow_grading_chain() {
    let next = |kind| {
        catalog::recommended_after(kind)
            .iter()
            .map(|e| e.kind)
            .collect::<Vec<_>>()
    };
    assert_eq!(next(None), vec![NodeKind::Upload]);
    assert_eq!(next(Some(NodeKind::Upload)), vec![NodeKind::Ocr]);
    assert_eq!(next(Some(NodeKind::Ocr)), vec![NodeKind::AiGrading]);
    assert_eq!(next(Some(NodeKind::AiGrading)), vec![NodeKind::Export]);
    assert_eq!(next(Some(NodeKind::RuleMatch)), NodeKind::ALL.to_vec());
    assert_eq!(next(Some(NodeKind::Export)).len(), NodeKind::ALL.len());
}
