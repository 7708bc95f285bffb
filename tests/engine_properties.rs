use std::sync::Arc;

use lazyscope::core_types::{
    ElementKind, ElementSnapshot, MutationBatch, NodeId, PageSnapshot, PaintEntry, RecordKey,
    Viewport,
};
use lazyscope::image_perceiver::{LazyLibrary, LoadingMode, ScoreTier, Strategy};
use lazyscope::{EngineConfig, ImageEngine};
use parking_lot::Mutex;

const PAGE_URL: &str = "https://shop.test/";

fn page(elements: Vec<ElementSnapshot>) -> PageSnapshot {
    let mut page = PageSnapshot::new(PAGE_URL, Viewport::default());
    page.elements = elements;
    page
}

fn sized(node: u64, top: f64) -> ElementSnapshot {
    ElementSnapshot::new(NodeId(node), ElementKind::Img)
        .with_src(format!("/img/{node}.jpg"))
        .with_attr("width", "640")
        .with_attr("height", "480")
        .with_natural(640.0, 480.0)
        .with_rect(0.0, top, 640.0, 480.0)
}

fn engine_with(elements: Vec<ElementSnapshot>) -> ImageEngine {
    let engine = ImageEngine::new(EngineConfig::default());
    engine.activate(page(elements));
    engine
}

#[test]
fn classify_is_idempotent() {
    let element = sized(1, 1800.0)
        .with_attr("loading", "lazy")
        .with_attr("decoding", "async");
    let engine = engine_with(vec![element.clone()]);

    let first = engine.classify(&element).unwrap();
    let second = engine.classify(&element).unwrap();
    assert_eq!(first, second);
    assert_eq!(
        serde_json::to_vec(&first).unwrap(),
        serde_json::to_vec(&second).unwrap()
    );
    assert_eq!(engine.aggregate_counters().total, 1);
    assert_eq!(
        engine.library_registry()[&LazyLibrary::Native].usage_count,
        1
    );
}

#[test]
fn at_most_one_record_is_lcp() {
    let engine = engine_with(vec![sized(1, 0.0), sized(2, 100.0), sized(3, 2000.0)]);
    let changes = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&changes);
    engine.on_lcp_change(move |change| sink.lock().push(change.clone()));

    for (node, value) in [(1, 400.0), (2, 900.0), (3, 1300.0)] {
        engine.observe_paint_entries(&[PaintEntry::for_node(NodeId(node), value)]);
        let records = engine.records();
        let flagged: Vec<_> = records.iter().filter(|r| r.is_lcp_candidate).collect();
        let lcp: Vec<_> = records
            .iter()
            .filter(|r| r.strategy == Strategy::Lcp)
            .collect();
        assert_eq!(flagged.len(), 1);
        assert_eq!(lcp.len(), 1);
        assert_eq!(lcp[0].key, RecordKey(NodeId(node)));
        assert_eq!(engine.aggregate_counters().lcp_candidates, 1);
    }

    let changes = changes.lock();
    assert_eq!(changes.len(), 3);
    assert_eq!(changes[1].previous, Some(RecordKey(NodeId(1))));
    assert_eq!(changes[2].previous, Some(RecordKey(NodeId(2))));
    assert_eq!(changes[2].state.value_ms, Some(1300.0));
}

#[test]
fn only_the_latest_entry_of_a_batch_counts() {
    let engine = engine_with(vec![sized(1, 0.0), sized(2, 100.0)]);
    let change = engine
        .observe_paint_entries(&[
            PaintEntry::for_node(NodeId(1), 2500.0),
            PaintEntry::for_node(NodeId(2), 800.0),
        ])
        .expect("transition");
    assert_eq!(change.state.candidate, Some(RecordKey(NodeId(2))));
    assert_eq!(change.state.value_ms, Some(800.0));
}

#[test]
fn bucket_counts_sum_to_total() {
    let engine = engine_with(vec![
        sized(1, 0.0),
        sized(2, 2000.0).with_attr("loading", "lazy"),
        ElementSnapshot::new(NodeId(3), ElementKind::Img)
            .with_src("/img/3.png")
            .with_rect(0.0, 3000.0, 300.0, 200.0),
        ElementSnapshot::new(NodeId(4), ElementKind::Background).with_rect(0.0, 0.0, 900.0, 300.0),
    ]);
    let check = |engine: &ImageEngine| {
        let counters = engine.aggregate_counters();
        assert_eq!(counters.bucket_sum(), counters.total);
        assert_eq!(counters.total as usize, engine.records().len());
    };
    check(&engine);

    engine
        .classify(&sized(1, 0.0).with_attr("loading", "lazy"))
        .unwrap();
    check(&engine);
    engine.classify(&sized(2, 2000.0)).unwrap();
    check(&engine);
    engine
        .classify(&sized(5, 4000.0).with_class("lazyload").with_attr("data-src", "/img/5.jpg"))
        .unwrap();
    check(&engine);
    engine.observe_paint_entries(&[PaintEntry::for_node(NodeId(1), 700.0)]);
    check(&engine);
    engine
        .apply_mutations(&MutationBatch {
            added: vec![sized(6, 100.0)],
            removed: vec![NodeId(1), NodeId(3)],
        })
        .unwrap();
    check(&engine);
    assert_eq!(engine.aggregate_counters().total, 4);
    assert_eq!(engine.aggregate_counters().lcp_candidates, 0);
}

#[test]
fn lazysizes_markers_outrank_generic_data_src() {
    let engine = engine_with(vec![]);
    let record = engine
        .classify(
            &ElementSnapshot::new(NodeId(1), ElementKind::Img)
                .with_attr("data-src", "/img/a.jpg")
                .with_class("lazyload")
                .with_class("lazy")
                .with_rect(0.0, 2000.0, 300.0, 200.0),
        )
        .unwrap();
    assert_eq!(record.library, LazyLibrary::Lazysizes);

    let record = engine
        .classify(
            &ElementSnapshot::new(NodeId(2), ElementKind::Img)
                .with_attr("data-src", "/img/b.jpg")
                .with_class("lazy")
                .with_rect(0.0, 2000.0, 300.0, 200.0),
        )
        .unwrap();
    assert_eq!(record.library, LazyLibrary::Lozad);

    let registry = engine.library_registry();
    assert_eq!(registry[&LazyLibrary::Lazysizes].usage_count, 1);
    assert!(registry[&LazyLibrary::Lazysizes].detected);
    assert!(!registry[&LazyLibrary::Lazysizes].recommendations.is_empty());
    assert!(!registry.contains_key(&LazyLibrary::Custom));
}

fn hero_candidate(node: u64, top: f64, high_priority: bool) -> ElementSnapshot {
    let element = ElementSnapshot::new(NodeId(node), ElementKind::Img)
        .with_src(format!("/img/hero-{node}.jpg"))
        .with_natural(1000.0, 800.0)
        .with_rect(0.0, top, 500.0, 400.0);
    if high_priority {
        element.with_attr("fetchpriority", "high")
    } else {
        element
    }
}

#[test]
fn hero_scores_follow_the_weights() {
    let engine = engine_with(vec![]);

    let above = engine.classify(&hero_candidate(1, 0.0, true)).unwrap();
    assert_eq!(above.optimization.hero.score, 8);
    assert!(above.optimization.hero.is_hero);

    let below = engine.classify(&hero_candidate(2, 2000.0, true)).unwrap();
    assert_eq!(below.optimization.hero.score, 5);
    assert!(below.optimization.hero.is_hero);

    let plain = engine.classify(&hero_candidate(3, 2000.0, false)).unwrap();
    assert_eq!(plain.optimization.hero.score, 4);
    assert!(!plain.optimization.hero.is_hero);

    let exported = engine.export_records();
    let scores: Vec<u8> = exported.iter().map(|r| r.hero_score).collect();
    assert_eq!(scores, vec![8, 5, 4]);
}

#[test]
fn eager_below_fold_without_dimensions_scores_65() {
    let engine = engine_with(vec![]);
    let record = engine
        .classify(
            &ElementSnapshot::new(NodeId(1), ElementKind::Img)
                .with_src("/img/late.jpg")
                .with_attr("decoding", "async")
                .with_rect(0.0, 2400.0, 300.0, 200.0),
        )
        .unwrap();
    assert!(!record.has_dimensions);
    assert_eq!(record.loading, LoadingMode::Eager);
    assert_eq!(record.score, 65);
    assert_eq!(record.score_tier, ScoreTier::NeedsWork);
}

#[test]
fn fully_optimized_lcp_clamps_to_100() {
    let element = ElementSnapshot::new(NodeId(1), ElementKind::Img)
        .with_src("/img/hero.avif")
        .with_attr("width", "1200")
        .with_attr("height", "600")
        .with_attr("fetchpriority", "high")
        .with_attr("decoding", "async")
        .with_natural(1200.0, 600.0)
        .with_rect(0.0, 0.0, 1200.0, 600.0);
    let mut snapshot = page(vec![element]);
    snapshot
        .preloaded_images
        .insert(format!("{PAGE_URL}img/hero.avif"));

    let engine = ImageEngine::new(EngineConfig::default());
    engine.activate(snapshot);
    engine.observe_paint_entries(&[PaintEntry::for_node(NodeId(1), 1100.0)]);

    let record = engine.record(RecordKey(NodeId(1))).unwrap();
    assert_eq!(record.strategy, Strategy::Lcp);
    assert!(record.is_preloaded);
    assert_eq!(record.score, 100);
    assert_eq!(record.score_tier, ScoreTier::Excellent);
}

#[test]
fn detached_elements_classify_with_unknown_position() {
    let engine = engine_with(vec![]);
    let record = engine
        .classify(&ElementSnapshot::new(NodeId(1), ElementKind::Img).with_src("/img/x.jpg"))
        .unwrap();
    assert!(!record.has_dimensions);
    assert_eq!(
        record.position,
        lazyscope::image_perceiver::Position::Unknown
    );
}

#[test]
fn moving_the_lcp_element_keeps_it_tracked() {
    let engine = engine_with(vec![sized(1, 0.0), sized(2, 900.0)]);
    engine.observe_paint_entries(&[PaintEntry::for_node(NodeId(1), 650.0)]);
    let changes = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&changes);
    engine.on_lcp_change(move |change| sink.lock().push(change.clone()));

    let outcome = engine
        .apply_mutations(&MutationBatch {
            added: vec![sized(1, 1600.0)],
            removed: vec![NodeId(1)],
        })
        .unwrap();
    assert!(outcome.removed.is_empty());

    let counters = engine.aggregate_counters();
    assert_eq!(counters.total, 2);
    assert_eq!(counters.lcp_candidates, 1);
    assert_eq!(counters.bucket_sum(), counters.total);
    assert_eq!(engine.lcp_state().candidate, Some(RecordKey(NodeId(1))));
    assert_eq!(
        engine.record(RecordKey(NodeId(1))).unwrap().strategy,
        Strategy::Lcp
    );
    assert!(changes.lock().is_empty());
}
