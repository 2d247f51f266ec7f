use std::path::PathBuf;
use vamsa_core::config::SizingMode;
use vamsa_core::{
    ExpansionState, FamilyDataset, Gender, Person, Relationship, VamsaConfig, build_tree,
};
use vamsa_render::model::TreeLayout;
use vamsa_render::{LayoutOptions, layout_tree};

fn workspace_root() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("..")
}

fn fixture(name: &str) -> FamilyDataset {
    let path = workspace_root().join("fixtures").join("family").join(name);
    FamilyDataset::from_path(&path).expect("fixture")
}

fn expanded_layout(ds: &FamilyDataset, options: &LayoutOptions) -> TreeLayout {
    let expansion = ExpansionState::expand_all(ds.member_ids());
    let tree = build_tree(&ds.members, &ds.relationships, &expansion).expect("tree");
    layout_tree(&tree, options)
}

fn x_of(layout: &TreeLayout, id: &str) -> f64 {
    layout.node(id).expect("node laid out").x
}

#[test]
fn basic_fixture_lays_out_visible_members_only() {
    let ds = fixture("basic.json");
    let layout = expanded_layout(&ds, &LayoutOptions::default());

    assert_eq!(layout.root, "1");
    assert_eq!(layout.nodes.len(), 8);
    assert_eq!(layout.edges.len(), 7);
    for edge in &layout.edges {
        let from = layout.node(&edge.from).expect("from");
        let to = layout.node(&edge.to).expect("to");
        assert_eq!(edge.start, from.bottom_anchor());
        assert_eq!(edge.end, to.top_anchor());
        assert_eq!(to.depth, from.depth + 1);
    }
    for n in &layout.nodes {
        assert!((n.y - n.depth as f64 * 140.0).abs() < 1e-9);
    }
}

#[test]
fn expansion_changes_layout_not_structure() {
    let ds = fixture("basic.json");
    let collapsed = build_tree(&ds.members, &ds.relationships, &ExpansionState::new()).expect("tree");
    let expanded = build_tree(
        &ds.members,
        &ds.relationships,
        &ExpansionState::expand_all(ds.member_ids()),
    )
    .expect("tree");

    assert_eq!(collapsed.shape(), expanded.shape());

    let layout = layout_tree(&collapsed, &LayoutOptions::default());
    assert_eq!(layout.nodes.len(), 1);
    assert!(layout.edges.is_empty());
    let root = layout.node("1").expect("root");
    assert!(root.has_children);
    assert!(!root.expanded);
    assert_eq!(root.hidden_children, 2);
}

#[test]
fn layout_is_deterministic() {
    let ds = fixture("basic.json");
    let a = expanded_layout(&ds, &LayoutOptions::default());
    let b = expanded_layout(&ds, &LayoutOptions::default());
    assert_eq!(a, b);
    assert_eq!(
        serde_json::to_string(&a).expect("json"),
        serde_json::to_string(&b).expect("json")
    );
}

#[test]
fn cousins_sit_further_apart_than_siblings() {
    let persons = vec![
        Person::new("g", "Gopal", "Iyer", Gender::Male),
        Person::new("x", "Hari", "Iyer", Gender::Male),
        Person::new("y", "Uma", "Iyer", Gender::Female),
        Person::new("x1", "Kiran", "Iyer", Gender::Other),
        Person::new("x2", "Kavya", "Iyer", Gender::Female),
        Person::new("y1", "Divya", "Iyer", Gender::Female),
    ];
    let rels = vec![
        Relationship::parent("e1", "g", "x"),
        Relationship::parent("e2", "g", "y"),
        Relationship::parent("e3", "x", "x1"),
        Relationship::parent("e4", "x", "x2"),
        Relationship::parent("e5", "y", "y1"),
    ];
    let expansion = ExpansionState::expand_all(["g", "x", "y"]);
    let tree = build_tree(&persons, &rels, &expansion).expect("tree");
    let layout = layout_tree(&tree, &LayoutOptions::default());

    let sibling_gap = x_of(&layout, "x2") - x_of(&layout, "x1");
    let cousin_gap = x_of(&layout, "y1") - x_of(&layout, "x2");
    assert!((sibling_gap - 120.0).abs() < 1e-9);
    assert!((cousin_gap - 240.0).abs() < 1e-9);
    assert!(cousin_gap > sibling_gap);
}

#[test]
fn cousin_fixture_keeps_generations_ordered() {
    let ds = fixture("cousins.yaml");
    let layout = expanded_layout(&ds, &LayoutOptions::default());
    assert!(x_of(&layout, "x") < x_of(&layout, "y"));
    assert!(x_of(&layout, "x1") < x_of(&layout, "y1"));
    let g = layout.node("g").expect("root");
    assert!((g.x - (x_of(&layout, "x") + x_of(&layout, "y")) / 2.0).abs() < 1e-9);
}

#[test]
fn wide_tree_keeps_nodes_apart_on_every_level() {
    // Complete ternary tree, five generations.
    let count = 1 + 3 + 9 + 27 + 81;
    let persons: Vec<Person> = (0..count)
        .map(|i| Person::new(format!("p{i}"), format!("P{i}"), "Rao", Gender::Other))
        .collect();
    let rels: Vec<Relationship> = (1..count)
        .map(|i| Relationship::parent(format!("r{i}"), format!("p{}", (i - 1) / 3), format!("p{i}")))
        .collect();
    let expansion = ExpansionState::expand_all(persons.iter().map(|p| p.id.as_str()));
    let tree = build_tree(&persons, &rels, &expansion).expect("tree");
    let layout = layout_tree(&tree, &LayoutOptions::default());
    assert_eq!(layout.nodes.len(), count);

    for depth in 0..5 {
        let mut xs: Vec<f64> = layout
            .nodes
            .iter()
            .filter(|n| n.depth == depth)
            .map(|n| n.x)
            .collect();
        xs.sort_by(f64::total_cmp);
        for pair in xs.windows(2) {
            assert!(pair[1] - pair[0] >= 120.0 - 1e-9, "depth {depth}: {pair:?}");
        }
    }
}

#[test]
fn fit_sizing_keeps_centres_inside_the_container() {
    let ds = fixture("basic.json");
    let mut cfg = VamsaConfig::default();
    cfg.layout.sizing = SizingMode::Fit;
    cfg.render.width = 600.0;
    cfg.render.height = 400.0;
    let options = LayoutOptions::from_config(&cfg.layout, &cfg.render).expect("options");
    let layout = expanded_layout(&ds, &options);

    // 600 x 400 minus 2 * (margin 20 + 40 of node room).
    for n in &layout.nodes {
        assert!(n.x >= -1e-9 && n.x <= 480.0 + 1e-9, "{} at x={}", n.id, n.x);
        assert!(n.y >= -1e-9 && n.y <= 280.0 + 1e-9, "{} at y={}", n.id, n.y);
    }
    let deepest = layout.nodes.iter().map(|n| n.y).fold(0.0, f64::max);
    assert!((deepest - 280.0).abs() < 1e-9);
}
