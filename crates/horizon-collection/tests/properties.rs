//! Seeded property checks over random trees, update sequences and layouts.

mod common;

use std::collections::HashSet;

use common::{item_counts, RecordingView, SectionedContent};
use horizon_collection::layout::{GridLayout, LayoutMeasurer, LayoutSnapshot, SectionSnapshot};
use horizon_collection::{
    DataSourceId, DataSourceKind, DataSourceTree, EdgeInsets, ElementKind, IndexPath, LayoutConfig,
    LoadState, Rect, RowHeight, Section, SectionMetrics, Size, StateMachine, SupplementaryItem,
};
use horizon_collection_core::NoDelegate;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

const SEEDS: u64 = 64;

/// Ids of a random tree, grouped by kind.
#[derive(Default)]
struct Shape {
    leaves: Vec<DataSourceId>,
    segmented: Vec<DataSourceId>,
    composed: Vec<DataSourceId>,
}

fn random_tree(rng: &mut StdRng) -> (DataSourceTree, DataSourceId, Shape) {
    let mut tree = DataSourceTree::default();
    let mut shape = Shape::default();
    let root = tree.add_composed();
    shape.composed.push(root);
    for _ in 0..rng.gen_range(1..4) {
        let child = random_node(&mut tree, &mut shape, rng, 1);
        tree.add_data_source(root, child).unwrap();
    }
    tree.set_root(root).unwrap();
    (tree, root, shape)
}

fn random_node(tree: &mut DataSourceTree, shape: &mut Shape, rng: &mut StdRng, depth: usize) -> DataSourceId {
    if depth >= 3 || rng.gen_bool(0.5) {
        let sections = (0..rng.gen_range(0..4)).map(|_| rng.gen_range(0..6)).collect();
        let leaf = tree.add_leaf(SectionedContent::new(sections));
        shape.leaves.push(leaf);
        return leaf;
    }
    let node = if rng.gen_bool(0.5) {
        let node = tree.add_composed();
        shape.composed.push(node);
        node
    } else {
        let node = tree.add_segmented();
        shape.segmented.push(node);
        node
    };
    for _ in 0..rng.gen_range(1..4) {
        let child = random_node(tree, shape, rng, depth + 1);
        tree.add_data_source(node, child).unwrap();
    }
    node
}

fn expected_sections(tree: &DataSourceTree, id: DataSourceId) -> usize {
    match tree.kind(id).unwrap() {
        DataSourceKind::Leaf => tree
            .leaf::<SectionedContent>(id)
            .map_or(0, |content| content.sections.len()),
        DataSourceKind::Composed => tree
            .data_sources(id)
            .into_iter()
            .map(|child| expected_sections(tree, child))
            .sum(),
        DataSourceKind::Segmented => tree
            .selected_data_source(id)
            .map_or(0, |child| expected_sections(tree, child)),
    }
}

/// Apply one random mutation, joining the open batch if there is one.
fn random_mutation(tree: &mut DataSourceTree, shape: &Shape, rng: &mut StdRng) {
    if !shape.segmented.is_empty() && rng.gen_bool(0.15) {
        let node = *shape.segmented.choose(rng).unwrap();
        let count = tree.data_sources(node).len();
        tree.select_data_source_at(node, rng.gen_range(0..count)).unwrap();
        return;
    }

    let leaf = *shape.leaves.choose(rng).unwrap();
    let sections = tree.leaf::<SectionedContent>(leaf).unwrap().sections.clone();
    let choice = rng.gen_range(0..5);
    let section = (!sections.is_empty()).then(|| rng.gen_range(0..sections.len()));
    let items = section.map_or(0, |section| sections[section]);
    let pick = |rng: &mut StdRng, bound: usize| rng.gen_range(0..bound.max(1));
    let (a, b, c) = (pick(rng, items + 1), pick(rng, items), pick(rng, items));
    let at = pick(rng, sections.len() + 1);
    let fresh = rng.gen_range(0..4);

    tree.update_leaf(leaf, |content: &mut SectionedContent, notifier| match (choice, section) {
        (0, Some(section)) => content.insert_item(section, a, notifier),
        (1, Some(section)) => content.remove_item_at(section, b, notifier),
        (2, Some(section)) => content.move_item_within(section, b, c, notifier),
        (3, Some(section)) => content.remove_section(section, notifier),
        _ => content.insert_section(at, fresh, notifier),
    })
    .unwrap();
}

#[test]
fn test_section_accounting() {
    for seed in 0..SEEDS {
        let mut rng = StdRng::seed_from_u64(seed);
        let (tree, root, _) = random_tree(&mut rng);
        assert_eq!(tree.number_of_sections(), expected_sections(&tree, root), "seed {seed}");
    }
}

#[test]
fn test_mapping_round_trip() {
    for seed in 0..SEEDS {
        let mut rng = StdRng::seed_from_u64(seed);
        let (tree, _, shape) = random_tree(&mut rng);
        for &parent in &shape.composed {
            for child in tree.data_sources(parent) {
                let mapping = tree.mapping_for(parent, child).unwrap();
                for local in 0..tree.number_of_sections_of(child) {
                    let global = tree.global_section_for(parent, child, local).unwrap();
                    assert_eq!(mapping.local_section(global), Some(local), "seed {seed}");
                    assert_eq!(
                        tree.local_index_path_for_global(parent, IndexPath::new(global, 3)),
                        Some((child, IndexPath::new(local, 3))),
                        "seed {seed}"
                    );
                    assert_eq!(
                        mapping.global_index_path(IndexPath::new(local, 3)),
                        Some(IndexPath::new(global, 3))
                    );
                }
            }
        }
    }
}

#[test]
fn test_notification_conservation() {
    common::init_tracing();
    for seed in 0..SEEDS {
        let mut rng = StdRng::seed_from_u64(seed);
        let (mut tree, _, shape) = random_tree(&mut rng);
        let log = RecordingView::attach(&mut tree);

        for round in 0..4 {
            let before = item_counts(&tree);
            log.lock().clear();

            let steps = rng.gen_range(1..6);
            tree.perform_update(
                |tree| {
                    for _ in 0..steps {
                        random_mutation(tree, &shape, &mut rng);
                    }
                },
                None,
            );

            let after = item_counts(&tree);
            let log = log.lock();
            assert!(log.batches.len() <= 1, "seed {seed} round {round}: one batch per update");
            assert_eq!(log.reloads, 0, "seed {seed} round {round}");
            let replayed = log
                .combined()
                .replay_item_counts(&before, |section| after.get(section).copied().unwrap_or(0));
            assert_eq!(replayed, after, "seed {seed} round {round}");
        }
    }
}

#[test]
fn test_state_machine_soundness() {
    let all = [
        LoadState::Initial,
        LoadState::Loading,
        LoadState::Refreshing,
        LoadState::Loaded,
        LoadState::NoContent,
        LoadState::Error,
    ];
    for seed in 0..SEEDS {
        let mut rng = StdRng::seed_from_u64(seed);
        let machine = StateMachine::new(LoadState::Initial, LoadState::transitions());
        let reachable: HashSet<LoadState> = machine.reachable_from(LoadState::Initial);
        for _ in 0..50 {
            let from = machine.current();
            let to = *all.choose(&mut rng).unwrap();
            match machine.apply(to, &mut NoDelegate) {
                Ok(true) => assert!(machine.is_valid_transition(from, to)),
                Ok(false) => assert_eq!(machine.current(), from),
                Err(_) => assert_eq!(machine.current(), from),
            }
            assert!(reachable.contains(&machine.current()), "seed {seed}");
        }
    }
}

/// Cell and supplement heights derived from the index path only.
struct PureMeasurer;

impl LayoutMeasurer for PureMeasurer {
    fn measure_cell(&mut self, path: IndexPath, fitting: Rect) -> Size {
        let section = path.section_index().unwrap_or(0);
        Size::new(fitting.width(), 20.0 + ((section * 31 + path.item * 17) % 50) as f32)
    }

    fn measure_supplement(&mut self, _kind: &ElementKind, path: IndexPath, fitting: Rect) -> Size {
        Size::new(fitting.width(), 24.0 + path.section_index().unwrap_or(0) as f32)
    }
}

fn random_header(rng: &mut StdRng) -> SupplementaryItem {
    let header = if rng.gen_bool(0.5) {
        SupplementaryItem::header().with_fixed_height(rng.gen_range(20.0..60.0))
    } else {
        SupplementaryItem::header().with_estimated_height(40.0)
    };
    header.pinned(rng.gen_bool(0.6))
}

fn random_snapshot(rng: &mut StdRng) -> LayoutSnapshot {
    let global = rng.gen_bool(0.5).then(|| {
        let mut metrics = SectionMetrics::new();
        for _ in 0..rng.gen_range(1..3) {
            metrics = metrics.with_header(random_header(rng));
        }
        metrics.resolve()
    });
    let sections = (0..rng.gen_range(1..6))
        .map(|_| {
            let row_height = match rng.gen_range(0..4) {
                0 => RowHeight::Variable,
                1 => RowHeight::Remainder,
                _ => RowHeight::Fixed(rng.gen_range(30.0..80.0)),
            };
            let mut metrics = SectionMetrics::new()
                .with_row_height(row_height)
                .with_columns(rng.gen_range(1..4))
                .with_padding(EdgeInsets::new(
                    rng.gen_range(0.0..10.0),
                    rng.gen_range(0.0..10.0),
                    rng.gen_range(0.0..10.0),
                    rng.gen_range(0.0..10.0),
                ));
            metrics.shows_row_separator = Some(rng.gen_bool(0.5));
            metrics.shows_column_separator = Some(rng.gen_bool(0.5));
            metrics.shows_section_separator = Some(rng.gen_bool(0.5));
            for _ in 0..rng.gen_range(0..3) {
                metrics = metrics.with_header(random_header(rng));
            }
            if rng.gen_bool(0.3) {
                metrics = metrics.with_footer(SupplementaryItem::footer().with_fixed_height(20.0));
            }
            SectionSnapshot {
                metrics: metrics.resolve(),
                number_of_items: rng.gen_range(0..12),
                placeholder: None,
            }
        })
        .collect();
    LayoutSnapshot { global, sections }
}

#[test]
fn test_layout_determinism() {
    for seed in 0..SEEDS {
        let mut rng = StdRng::seed_from_u64(seed);
        let snapshot = random_snapshot(&mut rng);
        let viewport = Size::new(rng.gen_range(200.0..400.0), rng.gen_range(300.0..600.0));

        let mut first = GridLayout::new(LayoutConfig::default());
        let mut second = GridLayout::new(LayoutConfig::default());
        first.prepare(&snapshot, viewport, &mut PureMeasurer);
        second.prepare(&snapshot, viewport, &mut PureMeasurer);
        assert_eq!(first.content_size(), second.content_size(), "seed {seed}");

        let everything = Rect::new(0.0, 0.0, viewport.width, first.content_size().height);
        assert_eq!(
            first.layout_attributes_in_rect(everything),
            second.layout_attributes_in_rect(everything),
            "seed {seed}"
        );

        let offset = rng.gen_range(0.0..first.content_size().height.max(1.0));
        first.set_content_offset(offset);
        second.set_content_offset(offset);
        assert_eq!(
            first.layout_attributes_in_rect(everything),
            second.layout_attributes_in_rect(everything),
            "seed {seed} offset {offset}"
        );
    }
}

#[test]
fn test_pinned_height_is_bounded() {
    for seed in 0..SEEDS {
        let mut rng = StdRng::seed_from_u64(seed);
        let snapshot = random_snapshot(&mut rng);
        let viewport = Size::new(320.0, rng.gen_range(300.0..600.0));
        let mut layout = GridLayout::new(LayoutConfig::default());
        layout.prepare(&snapshot, viewport, &mut PureMeasurer);

        let height = layout.content_size().height;
        for step in 0..20 {
            let offset = height * step as f32 / 20.0;
            layout.set_content_offset(offset);
            let info = layout.info();

            let pinnable_total = |section: Section| -> f32 {
                info.section(section)
                    .map_or(0.0, |s| s.pinnable_headers().map(|h| h.frame.height()).sum())
            };
            let pinned: Vec<_> = info
                .all_sections()
                .flat_map(|section| section.headers.iter().map(move |h| (section.section, h)))
                .filter(|(_, header)| header.is_pinned)
                .collect();
            let resident: HashSet<Section> = pinned
                .iter()
                .map(|(section, _)| *section)
                .filter(|section| *section != Section::Global)
                .collect();
            assert!(resident.len() <= 1, "seed {seed} offset {offset}: {resident:?}");

            let pinned_height: f32 = pinned.iter().map(|(_, header)| header.frame.height()).sum();
            let bound = pinnable_total(Section::Global)
                + resident.iter().map(|section| pinnable_total(*section)).sum::<f32>();
            assert!(
                pinned_height <= bound + 0.001,
                "seed {seed} offset {offset}: {pinned_height} > {bound}"
            );
        }
    }
}
