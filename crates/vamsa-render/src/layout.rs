//! Tidy tree layout (Reingold–Tilford with Buchheim–Walker's linear-time improvements).
//!
//! The walk mirrors d3-hierarchy's `tree()`: a post-order pass assigns preliminary x offsets and
//! modifiers while threading subtree contours, a pre-order pass accumulates modifiers into final
//! positions. Only expanded nodes contribute their children, so collapsed subtrees reserve no
//! space.

use vamsa_core::tree::{FamilyTree, NodeIdx};

use crate::model::{Curve, PositionedNode, TreeLayout, compute_bounds};
use crate::{LayoutOptions, LayoutSizing};

#[derive(Debug, Clone)]
struct WalkNode {
    /// `None` for the synthetic parent of the root.
    tree_idx: Option<NodeIdx>,
    parent: Option<usize>,
    children: Vec<usize>,
    /// Position among siblings.
    i: usize,
    depth: usize,
    /// Ancestor used when shifting subtrees apart.
    ancestor: usize,
    /// Default ancestor, tracked on the parent while its children are walked.
    default_ancestor: Option<usize>,
    prelim: f64,
    modifier: f64,
    change: f64,
    shift: f64,
    thread: Option<usize>,
    x: f64,
}

impl WalkNode {
    fn new(
        idx: usize,
        tree_idx: Option<NodeIdx>,
        parent: Option<usize>,
        i: usize,
        depth: usize,
    ) -> Self {
        Self {
            tree_idx,
            parent,
            children: Vec::new(),
            i,
            depth,
            ancestor: idx,
            default_ancestor: None,
            prelim: 0.0,
            modifier: 0.0,
            change: 0.0,
            shift: 0.0,
            thread: None,
            x: 0.0,
        }
    }
}

const VIRTUAL_ROOT: usize = 0;
const ROOT: usize = 1;

struct Walker<'a> {
    nodes: Vec<WalkNode>,
    options: &'a LayoutOptions,
}

impl<'a> Walker<'a> {
    /// Copies the visible part of `tree` into a walk arena (index 0 is a synthetic parent).
    fn new(tree: &FamilyTree, options: &'a LayoutOptions) -> Self {
        let mut nodes = vec![
            WalkNode::new(VIRTUAL_ROOT, None, None, 0, 0),
            WalkNode::new(ROOT, Some(FamilyTree::ROOT), Some(VIRTUAL_ROOT), 0, 0),
        ];
        nodes[VIRTUAL_ROOT].children.push(ROOT);

        let mut stack = vec![ROOT];
        while let Some(cur) = stack.pop() {
            let Some(tree_idx) = nodes[cur].tree_idx else {
                continue;
            };
            let Some(tree_node) = tree.node(tree_idx) else {
                continue;
            };
            if !tree_node.expanded {
                continue;
            }
            let depth = nodes[cur].depth + 1;
            for (i, &child) in tree_node.children.iter().enumerate() {
                let idx = nodes.len();
                nodes.push(WalkNode::new(idx, Some(child), Some(cur), i, depth));
                nodes[cur].children.push(idx);
                stack.push(idx);
            }
        }
        Self { nodes, options }
    }

    fn separation(&self, a: usize, b: usize) -> f64 {
        if self.nodes[a].parent == self.nodes[b].parent {
            self.options.sibling_separation
        } else {
            self.options.cousin_separation
        }
    }

    fn next_left(&self, v: usize) -> Option<usize> {
        self.nodes[v]
            .children
            .first()
            .copied()
            .or(self.nodes[v].thread)
    }

    fn next_right(&self, v: usize) -> Option<usize> {
        self.nodes[v]
            .children
            .last()
            .copied()
            .or(self.nodes[v].thread)
    }

    fn move_subtree(&mut self, wm: usize, wp: usize, shift: f64) {
        let span = self.nodes[wp].i as f64 - self.nodes[wm].i as f64;
        let change = if span > 0.0 { shift / span } else { 0.0 };
        self.nodes[wp].change -= change;
        self.nodes[wp].shift += shift;
        self.nodes[wm].change += change;
        self.nodes[wp].prelim += shift;
        self.nodes[wp].modifier += shift;
    }

    fn execute_shifts(&mut self, v: usize) {
        let mut shift = 0.0;
        let mut change = 0.0;
        let children = self.nodes[v].children.clone();
        for &w in children.iter().rev() {
            let node = &mut self.nodes[w];
            node.prelim += shift;
            node.modifier += shift;
            change += node.change;
            shift += node.shift + change;
        }
    }

    fn next_ancestor(&self, vim: usize, v: usize, ancestor: usize) -> usize {
        let a = self.nodes[vim].ancestor;
        if self.nodes[a].parent == self.nodes[v].parent {
            a
        } else {
            ancestor
        }
    }

    fn first_walk(&mut self, v: usize) {
        let Some(parent) = self.nodes[v].parent else {
            return;
        };
        let i = self.nodes[v].i;
        let left_sibling = if i > 0 {
            Some(self.nodes[parent].children[i - 1])
        } else {
            None
        };

        if let (Some(&first), Some(&last)) =
            (self.nodes[v].children.first(), self.nodes[v].children.last())
        {
            self.execute_shifts(v);
            let midpoint = (self.nodes[first].prelim + self.nodes[last].prelim) / 2.0;
            match left_sibling {
                Some(w) => {
                    let prelim = self.nodes[w].prelim + self.separation(v, w);
                    self.nodes[v].prelim = prelim;
                    self.nodes[v].modifier = prelim - midpoint;
                }
                None => self.nodes[v].prelim = midpoint,
            }
        } else if let Some(w) = left_sibling {
            self.nodes[v].prelim = self.nodes[w].prelim + self.separation(v, w);
        }

        let first_sibling = self.nodes[parent].children[0];
        let ancestor = self.nodes[parent].default_ancestor.unwrap_or(first_sibling);
        let ancestor = self.apportion(v, left_sibling, ancestor);
        self.nodes[parent].default_ancestor = Some(ancestor);
    }

    fn apportion(&mut self, v: usize, left_sibling: Option<usize>, mut ancestor: usize) -> usize {
        let Some(w) = left_sibling else {
            return ancestor;
        };
        let Some(parent) = self.nodes[v].parent else {
            return ancestor;
        };

        // i = inside, o = outside, p = right subtree (v), m = left subtrees.
        let mut vip = v;
        let mut vop = v;
        let mut vim = w;
        let mut vom = self.nodes[parent].children[0];
        let mut sip = self.nodes[vip].modifier;
        let mut sop = self.nodes[vop].modifier;
        let mut sim = self.nodes[vim].modifier;
        let mut som = self.nodes[vom].modifier;

        let mut next_im = self.next_right(vim);
        let mut next_ip = self.next_left(vip);
        while let (Some(nim), Some(nip)) = (next_im, next_ip) {
            vim = nim;
            vip = nip;
            let (Some(nom), Some(nop)) = (self.next_left(vom), self.next_right(vop)) else {
                break;
            };
            vom = nom;
            vop = nop;
            self.nodes[vop].ancestor = v;

            let shift = self.nodes[vim].prelim + sim - self.nodes[vip].prelim - sip
                + self.separation(vim, vip);
            if shift > 0.0 {
                let a = self.next_ancestor(vim, v, ancestor);
                self.move_subtree(a, v, shift);
                sip += shift;
                sop += shift;
            }
            sim += self.nodes[vim].modifier;
            sip += self.nodes[vip].modifier;
            som += self.nodes[vom].modifier;
            sop += self.nodes[vop].modifier;

            next_im = self.next_right(vim);
            next_ip = self.next_left(vip);
        }

        if let Some(nim) = next_im {
            if self.next_right(vop).is_none() {
                self.nodes[vop].thread = Some(nim);
                self.nodes[vop].modifier += sim - sop;
            }
        }
        if let Some(nip) = next_ip {
            if self.next_left(vom).is_none() {
                self.nodes[vom].thread = Some(nip);
                self.nodes[vom].modifier += sip - som;
                ancestor = v;
            }
        }
        ancestor
    }

    fn second_walk(&mut self, v: usize) {
        let Some(parent) = self.nodes[v].parent else {
            return;
        };
        let parent_mod = self.nodes[parent].modifier;
        let node = &mut self.nodes[v];
        node.x = node.prelim + parent_mod;
        node.modifier += parent_mod;
    }

    fn post_order(&self) -> Vec<usize> {
        let mut order = Vec::with_capacity(self.nodes.len());
        let mut stack = vec![ROOT];
        while let Some(cur) = stack.pop() {
            order.push(cur);
            stack.extend(self.nodes[cur].children.iter().copied());
        }
        // Reverse of a (node, right-to-left children) pre-order is a left-to-right post-order.
        order.reverse();
        order
    }

    fn pre_order(&self) -> Vec<usize> {
        let mut order = Vec::with_capacity(self.nodes.len());
        let mut stack = vec![ROOT];
        while let Some(cur) = stack.pop() {
            order.push(cur);
            stack.extend(self.nodes[cur].children.iter().rev().copied());
        }
        order
    }

    /// Runs both walks; returns nodes in pre-order with `x` in separation units.
    fn run(&mut self) -> Vec<usize> {
        for v in self.post_order() {
            self.first_walk(v);
        }
        self.nodes[VIRTUAL_ROOT].modifier = -self.nodes[ROOT].prelim;
        let pre = self.pre_order();
        for &v in &pre {
            self.second_walk(v);
        }
        tracing::trace!(nodes = pre.len(), "tidy tree walk finished");
        pre
    }
}

/// Lays out the visible part of `tree`.
pub fn layout_tree(tree: &FamilyTree, options: &LayoutOptions) -> TreeLayout {
    let mut walker = Walker::new(tree, options);
    let order = walker.run();

    let (scale_x, offset_x, scale_y) = match options.sizing {
        LayoutSizing::NodeSize => (options.node_spacing, 0.0, options.level_spacing),
        LayoutSizing::Fit { width, height } => {
            // Leftmost / rightmost / deepest, first occurrence in pre-order.
            let mut left = ROOT;
            let mut right = ROOT;
            let mut bottom = ROOT;
            for &v in &order {
                let n = &walker.nodes[v];
                if n.x < walker.nodes[left].x {
                    left = v;
                }
                if n.x > walker.nodes[right].x {
                    right = v;
                }
                if n.depth > walker.nodes[bottom].depth {
                    bottom = v;
                }
            }
            let s = if left == right {
                1.0
            } else {
                walker.separation(left, right) / 2.0
            };
            let tx = s - walker.nodes[left].x;
            let kx = width / (walker.nodes[right].x + s + tx);
            let depth = walker.nodes[bottom].depth.max(1) as f64;
            (kx, tx, height / depth)
        }
    };

    let diameter = options.node_radius * 2.0;
    let mut nodes: Vec<PositionedNode> = Vec::with_capacity(order.len());
    let mut positioned_at: Vec<Option<usize>> = vec![None; walker.nodes.len()];
    for &v in &order {
        let w = &walker.nodes[v];
        let Some(tree_node) = w.tree_idx.and_then(|idx| tree.node(idx)) else {
            continue;
        };
        let parent = w
            .parent
            .and_then(|p| walker.nodes[p].tree_idx)
            .and_then(|idx| tree.node(idx))
            .map(|n| n.id.clone());
        positioned_at[v] = Some(nodes.len());
        nodes.push(PositionedNode {
            id: tree_node.id.clone(),
            parent,
            x: (w.x + offset_x) * scale_x,
            y: w.depth as f64 * scale_y,
            depth: w.depth,
            width: diameter,
            height: diameter,
            has_children: !tree_node.children.is_empty(),
            expanded: tree_node.expanded,
            hidden_children: if tree_node.expanded {
                0
            } else {
                tree_node.children.len()
            },
        });
    }

    let mut edges: Vec<Curve> = Vec::new();
    for &v in &order {
        let Some(from) = positioned_at[v] else {
            continue;
        };
        for &child in &walker.nodes[v].children {
            if let Some(to) = positioned_at[child] {
                edges.push(Curve::vertical(&nodes[from], &nodes[to]));
            }
        }
    }

    let bounds = compute_bounds(&nodes, &edges);
    TreeLayout {
        root: tree.root().id.clone(),
        nodes,
        edges,
        bounds,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vamsa_core::{ExpansionState, Gender, Person, Relationship, build_tree};

    fn family(ids: &[&str], edges: &[(&str, &str)]) -> (Vec<Person>, Vec<Relationship>) {
        let persons = ids
            .iter()
            .map(|id| Person::new(*id, *id, "Rao", Gender::Other))
            .collect();
        let rels = edges
            .iter()
            .enumerate()
            .map(|(i, (a, b))| Relationship::parent(format!("r{i}"), *a, *b))
            .collect();
        (persons, rels)
    }

    fn units(layout: &TreeLayout, id: &str) -> f64 {
        layout.node(id).unwrap().x / LayoutOptions::default().node_spacing
    }

    #[test]
    fn single_node_sits_at_origin() {
        let (p, r) = family(&["a"], &[]);
        let tree = build_tree(&p, &r, &ExpansionState::new()).unwrap();
        let layout = layout_tree(&tree, &LayoutOptions::default());
        assert_eq!(layout.nodes.len(), 1);
        assert_eq!((layout.nodes[0].x, layout.nodes[0].y), (0.0, 0.0));
        assert!(layout.edges.is_empty());
    }

    #[test]
    fn parent_is_centred_over_children() {
        let (p, r) = family(&["a", "b", "c", "d"], &[("a", "b"), ("a", "c"), ("a", "d")]);
        let tree = build_tree(&p, &r, &ExpansionState::expand_all(["a"])).unwrap();
        let layout = layout_tree(&tree, &LayoutOptions::default());
        assert_eq!(units(&layout, "a"), 0.0);
        assert_eq!(units(&layout, "b"), -1.0);
        assert_eq!(units(&layout, "c"), 0.0);
        assert_eq!(units(&layout, "d"), 1.0);
        assert_eq!(layout.node("b").unwrap().y, 140.0);
        assert_eq!(layout.edges.len(), 3);
    }

    #[test]
    fn collapsed_children_are_not_laid_out() {
        let (p, r) = family(&["a", "b", "c"], &[("a", "b"), ("b", "c")]);
        let tree = build_tree(&p, &r, &ExpansionState::expand_all(["a"])).unwrap();
        let layout = layout_tree(&tree, &LayoutOptions::default());
        assert!(layout.contains("b"));
        assert!(!layout.contains("c"));
        let b = layout.node("b").unwrap();
        assert!(b.has_children);
        assert!(!b.expanded);
        assert_eq!(b.hidden_children, 1);
    }

    #[test]
    fn collapsing_reclaims_horizontal_space() {
        let (p, r) = family(
            &["a", "b", "c", "b1", "b2", "b3", "c1"],
            &[
                ("a", "b"),
                ("a", "c"),
                ("b", "b1"),
                ("b", "b2"),
                ("b", "b3"),
                ("c", "c1"),
            ],
        );
        let open = build_tree(&p, &r, &ExpansionState::expand_all(["a", "b", "c"])).unwrap();
        let shut = build_tree(&p, &r, &ExpansionState::expand_all(["a", "c"])).unwrap();
        let wide = layout_tree(&open, &LayoutOptions::default());
        let narrow = layout_tree(&shut, &LayoutOptions::default());
        let gap = |l: &TreeLayout| l.node("c").unwrap().x - l.node("b").unwrap().x;
        assert_eq!(gap(&narrow), 120.0);
        assert_eq!(gap(&wide), 360.0);
    }

    #[test]
    fn subtrees_never_overlap() {
        // A lopsided tree: the left subtree is deep and wide, the right one shallow.
        let (p, r) = family(
            &["r", "a", "b", "a1", "a2", "a11", "a12", "a21", "b1"],
            &[
                ("r", "a"),
                ("r", "b"),
                ("a", "a1"),
                ("a", "a2"),
                ("a1", "a11"),
                ("a1", "a12"),
                ("a2", "a21"),
                ("b", "b1"),
            ],
        );
        let all = ExpansionState::expand_all(p.iter().map(|x| x.id.clone()));
        let tree = build_tree(&p, &r, &all).unwrap();
        let layout = layout_tree(&tree, &LayoutOptions::default());
        assert_eq!(layout.nodes.len(), 9);

        for depth in 0..=3 {
            let mut xs: Vec<f64> = layout
                .nodes
                .iter()
                .filter(|n| n.depth == depth)
                .map(|n| n.x)
                .collect();
            xs.sort_by(f64::total_cmp);
            for pair in xs.windows(2) {
                assert!(pair[1] - pair[0] >= 120.0 - 1e-9, "depth {depth}: {xs:?}");
            }
        }
    }

    #[test]
    fn fit_sizing_stays_inside_container() {
        let (p, r) = family(
            &["a", "b", "c", "d", "e"],
            &[("a", "b"), ("a", "c"), ("b", "d"), ("c", "e")],
        );
        let all = ExpansionState::expand_all(["a", "b", "c"]);
        let tree = build_tree(&p, &r, &all).unwrap();
        let options = LayoutOptions {
            sizing: LayoutSizing::Fit {
                width: 600.0,
                height: 300.0,
            },
            ..LayoutOptions::default()
        };
        let layout = layout_tree(&tree, &options);
        for n in &layout.nodes {
            assert!(n.x > 0.0 && n.x < 600.0, "{} at {}", n.id, n.x);
            assert!(n.y >= 0.0 && n.y <= 300.0);
        }
        assert_eq!(layout.node("d").unwrap().y, 300.0);
        assert_eq!(layout.node("a").unwrap().x, 300.0);
    }
}
