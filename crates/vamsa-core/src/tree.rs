//! Builds a rooted family tree from flat member and relationship lists.
//!
//! Only active `PARENT` edges are followed. The tree is stored as an arena with the root at index
//! 0; parent links are plain indices and carry no ownership. A tree is a snapshot: any change to
//! the members, relationships or expansion state means building a new one.

use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};

use crate::expansion::ExpansionState;
use crate::model::{Person, PersonId, Relationship};

pub type NodeIdx = usize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TreeNode {
    pub id: PersonId,
    /// Index of the member in the slice the tree was built from.
    pub member: usize,
    pub parent: Option<NodeIdx>,
    pub children: Vec<NodeIdx>,
    pub depth: usize,
    pub expanded: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SkipReason {
    /// The edge names a member that is not in the member list.
    DanglingTarget,
    /// The target is already in the tree (cycle, or a second parent path).
    AlreadyPlaced,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkippedEdge {
    pub relationship_id: String,
    pub from: PersonId,
    pub to: PersonId,
    pub reason: SkipReason,
}

/// How the top of the hierarchy is chosen.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum RootPolicy {
    /// The first member in list order, whatever edges point at it.
    #[default]
    #[serde(rename = "first")]
    FirstListed,
    /// The first member (in list order) with no incoming active `PARENT` edge.
    #[serde(rename = "ancestral")]
    MostAncestral,
    /// A specific member.
    #[serde(rename = "member")]
    Member(PersonId),
}

#[derive(Debug, Clone, Default)]
pub struct BuildOptions {
    pub root_policy: RootPolicy,
}

impl BuildOptions {
    pub fn with_root_policy(mut self, root_policy: RootPolicy) -> Self {
        self.root_policy = root_policy;
        self
    }
}

/// One row of the flat, serializable view of a tree (used for JSON output).
///
/// Rows link by id instead of nesting, so arbitrarily deep trees serialize without recursion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TreeEntry {
    pub id: PersonId,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent: Option<PersonId>,
    pub depth: usize,
    pub expanded: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<PersonId>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FamilyTree {
    nodes: Vec<TreeNode>,
    by_id: FxHashMap<PersonId, NodeIdx>,
    skipped: Vec<SkippedEdge>,
}

impl FamilyTree {
    pub const ROOT: NodeIdx = 0;

    pub fn root(&self) -> &TreeNode {
        &self.nodes[Self::ROOT]
    }

    pub fn node(&self, idx: NodeIdx) -> Option<&TreeNode> {
        self.nodes.get(idx)
    }

    pub fn nodes(&self) -> &[TreeNode] {
        &self.nodes
    }

    pub fn get(&self, id: &str) -> Option<NodeIdx> {
        self.by_id.get(id).copied()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.by_id.contains_key(id)
    }

    pub fn children(&self, idx: NodeIdx) -> &[NodeIdx] {
        self.nodes
            .get(idx)
            .map(|n| n.children.as_slice())
            .unwrap_or(&[])
    }

    pub fn parent(&self, idx: NodeIdx) -> Option<NodeIdx> {
        self.nodes.get(idx).and_then(|n| n.parent)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.nodes.iter().map(|n| n.id.as_str())
    }

    pub fn depth_of(&self, id: &str) -> Option<usize> {
        self.get(id).map(|idx| self.nodes[idx].depth)
    }

    pub fn max_depth(&self) -> usize {
        self.nodes.iter().map(|n| n.depth).max().unwrap_or(0)
    }

    /// Edges dropped while building, in discovery order.
    pub fn skipped_edges(&self) -> &[SkippedEdge] {
        &self.skipped
    }

    /// All nodes below `idx` in pre-order, `idx` itself excluded.
    pub fn descendants(&self, idx: NodeIdx) -> Vec<NodeIdx> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeIdx> = self.children(idx).iter().rev().copied().collect();
        while let Some(cur) = stack.pop() {
            out.push(cur);
            stack.extend(self.children(cur).iter().rev().copied());
        }
        out
    }

    /// Ids reachable from the root through expanded nodes, in pre-order.
    pub fn visible_ids(&self) -> Vec<&str> {
        let mut out = Vec::new();
        let mut stack = vec![Self::ROOT];
        while let Some(cur) = stack.pop() {
            let node = &self.nodes[cur];
            out.push(node.id.as_str());
            if node.expanded {
                stack.extend(node.children.iter().rev().copied());
            }
        }
        out
    }

    /// Parent/child id pairs in pre-order; two trees with equal shapes have the same logical
    /// structure regardless of expansion.
    pub fn shape(&self) -> Vec<(&str, &str)> {
        let mut out = Vec::new();
        for idx in std::iter::once(Self::ROOT).chain(self.descendants(Self::ROOT)) {
            let node = &self.nodes[idx];
            for &child in &node.children {
                out.push((node.id.as_str(), self.nodes[child].id.as_str()));
            }
        }
        out
    }

    /// Every node as a [`TreeEntry`], root first, in pre-order.
    pub fn entries(&self, persons: &[Person]) -> Vec<TreeEntry> {
        std::iter::once(Self::ROOT)
            .chain(self.descendants(Self::ROOT))
            .map(|idx| {
                let node = &self.nodes[idx];
                TreeEntry {
                    id: node.id.clone(),
                    name: persons
                        .get(node.member)
                        .map(Person::full_name)
                        .unwrap_or_default(),
                    parent: node.parent.map(|p| self.nodes[p].id.clone()),
                    depth: node.depth,
                    expanded: node.expanded,
                    children: node
                        .children
                        .iter()
                        .map(|&c| self.nodes[c].id.clone())
                        .collect(),
                }
            })
            .collect()
    }
}

/// Picks the root member according to `policy`. `None` only for an empty member list.
pub fn find_root<'a>(
    persons: &'a [Person],
    relationships: &[Relationship],
    policy: &RootPolicy,
) -> Option<&'a Person> {
    let first = persons.first()?;
    match policy {
        RootPolicy::FirstListed => Some(first),
        RootPolicy::MostAncestral => {
            let known: FxHashSet<&str> = persons.iter().map(|p| p.id.as_str()).collect();
            let has_parent: FxHashSet<&str> = relationships
                .iter()
                .filter(|r| r.is_tree_edge())
                .filter(|r| r.from_member_id != r.to_member_id)
                .filter(|r| known.contains(r.from_member_id.as_str()))
                .map(|r| r.to_member_id.as_str())
                .collect();
            let root = persons
                .iter()
                .find(|p| !has_parent.contains(p.id.as_str()));
            if root.is_none() {
                tracing::warn!(
                    fallback = %first.id,
                    "every member has a parent edge; falling back to the first member"
                );
            }
            Some(root.unwrap_or(first))
        }
        RootPolicy::Member(id) => match persons.iter().find(|p| &p.id == id) {
            Some(p) => Some(p),
            None => {
                tracing::warn!(
                    member = %id,
                    fallback = %first.id,
                    "requested root member not found; falling back to the first member"
                );
                Some(first)
            }
        },
    }
}

/// Builds the tree rooted at the first member.
pub fn build_tree(
    persons: &[Person],
    relationships: &[Relationship],
    expansion: &ExpansionState,
) -> Option<FamilyTree> {
    build_tree_with(persons, relationships, expansion, &BuildOptions::default())
}

pub fn build_tree_with(
    persons: &[Person],
    relationships: &[Relationship],
    expansion: &ExpansionState,
    options: &BuildOptions,
) -> Option<FamilyTree> {
    let root = find_root(persons, relationships, &options.root_policy)?;

    // First occurrence wins for duplicated ids.
    let mut member_index: FxHashMap<&str, usize> = FxHashMap::default();
    for (i, p) in persons.iter().enumerate() {
        member_index.entry(p.id.as_str()).or_insert(i);
    }

    let mut child_edges: FxHashMap<&str, Vec<&Relationship>> = FxHashMap::default();
    for rel in relationships.iter().filter(|r| r.is_tree_edge()) {
        child_edges
            .entry(rel.from_member_id.as_str())
            .or_default()
            .push(rel);
    }

    let root_member = member_index
        .get(root.id.as_str())
        .copied()
        .unwrap_or_default();
    let mut tree = FamilyTree {
        nodes: vec![TreeNode {
            id: root.id.clone(),
            member: root_member,
            parent: None,
            children: Vec::new(),
            depth: 0,
            expanded: expansion.contains(&root.id),
        }],
        by_id: FxHashMap::default(),
        skipped: Vec::new(),
    };
    tree.by_id.insert(root.id.clone(), FamilyTree::ROOT);

    // Depth-first with an explicit frame stack: (node, next edge to look at).
    let mut stack: Vec<(NodeIdx, usize)> = vec![(FamilyTree::ROOT, 0)];
    while let Some(&(node_idx, cursor)) = stack.last() {
        let edges = child_edges
            .get(tree.nodes[node_idx].id.as_str())
            .map(Vec::as_slice)
            .unwrap_or(&[]);
        let Some(&rel) = edges.get(cursor) else {
            stack.pop();
            continue;
        };
        if let Some(top) = stack.last_mut() {
            top.1 += 1;
        }

        let Some(&member) = member_index.get(rel.to_member_id.as_str()) else {
            tracing::debug!(
                relationship = %rel.id,
                to = %rel.to_member_id,
                "skipping parent edge to unknown member"
            );
            tree.skipped.push(skipped(rel, SkipReason::DanglingTarget));
            continue;
        };
        if tree.by_id.contains_key(rel.to_member_id.as_str()) {
            tracing::warn!(
                relationship = %rel.id,
                from = %rel.from_member_id,
                to = %rel.to_member_id,
                "member already placed in tree; dropping parent edge"
            );
            tree.skipped.push(skipped(rel, SkipReason::AlreadyPlaced));
            continue;
        }

        let child_idx = tree.nodes.len();
        let depth = tree.nodes[node_idx].depth + 1;
        tree.nodes.push(TreeNode {
            id: rel.to_member_id.clone(),
            member,
            parent: Some(node_idx),
            children: Vec::new(),
            depth,
            expanded: expansion.contains(&rel.to_member_id),
        });
        tree.nodes[node_idx].children.push(child_idx);
        tree.by_id.insert(rel.to_member_id.clone(), child_idx);
        stack.push((child_idx, 0));
    }

    tracing::debug!(
        root = %tree.root().id,
        nodes = tree.len(),
        skipped = tree.skipped.len(),
        "built family tree"
    );
    Some(tree)
}

fn skipped(rel: &Relationship, reason: SkipReason) -> SkippedEdge {
    SkippedEdge {
        relationship_id: rel.id.clone(),
        from: rel.from_member_id.clone(),
        to: rel.to_member_id.clone(),
        reason,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Gender, RelationshipType};

    fn person(id: &str) -> Person {
        Person::new(id, id.to_uppercase(), "Rao", Gender::Other)
    }

    fn people(ids: &[&str]) -> Vec<Person> {
        ids.iter().map(|id| person(id)).collect()
    }

    fn child_ids<'a>(tree: &'a FamilyTree, id: &str) -> Vec<&'a str> {
        let idx = tree.get(id).unwrap();
        tree.children(idx)
            .iter()
            .map(|&c| tree.nodes()[c].id.as_str())
            .collect()
    }

    #[test]
    fn empty_members_build_nothing() {
        assert!(build_tree(&[], &[], &ExpansionState::new()).is_none());
        let rels = vec![Relationship::parent("r1", "a", "b")];
        let all = ExpansionState::expand_all(["a", "b"]);
        assert!(build_tree(&[], &rels, &all).is_none());
    }

    #[test]
    fn root_is_first_member_regardless_of_edges() {
        let persons = people(&["b", "a"]);
        let rels = vec![Relationship::parent("r1", "a", "b")];
        let tree = build_tree(&persons, &rels, &ExpansionState::new()).unwrap();
        assert_eq!(tree.root().id, "b");
        assert_eq!(tree.len(), 1);
    }

    #[test]
    fn inactive_edges_do_not_contribute_children() {
        let persons = people(&["a", "b", "c"]);
        let rels = vec![
            Relationship::parent("r1", "a", "b"),
            Relationship::parent("r2", "a", "c").inactive(),
        ];
        let tree = build_tree(&persons, &rels, &ExpansionState::new()).unwrap();
        assert_eq!(child_ids(&tree, "a"), vec!["b"]);
    }

    #[test]
    fn non_parent_edges_are_ignored() {
        let persons = people(&["a", "b", "c"]);
        let rels = vec![
            Relationship::new("r1", "a", "b", RelationshipType::Spouse),
            Relationship::new("r2", "a", "c", RelationshipType::Child),
        ];
        let tree = build_tree(&persons, &rels, &ExpansionState::new()).unwrap();
        assert!(tree.children(FamilyTree::ROOT).is_empty());
    }

    #[test]
    fn dangling_target_is_skipped() {
        let persons = people(&["a"]);
        let rels = vec![Relationship::parent("r1", "a", "ghost-id")];
        let tree = build_tree(&persons, &rels, &ExpansionState::new()).unwrap();
        assert_eq!(tree.len(), 1);
        assert_eq!(tree.skipped_edges().len(), 1);
        assert_eq!(tree.skipped_edges()[0].reason, SkipReason::DanglingTarget);
    }

    #[test]
    fn children_follow_relationship_order() {
        let persons = people(&["a", "b", "c", "d"]);
        let rels = vec![
            Relationship::parent("r1", "a", "d"),
            Relationship::parent("r2", "a", "b"),
            Relationship::parent("r3", "a", "c"),
        ];
        let tree = build_tree(&persons, &rels, &ExpansionState::new()).unwrap();
        assert_eq!(child_ids(&tree, "a"), vec!["d", "b", "c"]);
    }

    #[test]
    fn expanded_flag_comes_from_state() {
        let persons = people(&["a", "b"]);
        let rels = vec![Relationship::parent("r1", "a", "b")];
        let tree = build_tree(&persons, &rels, &ExpansionState::expand_all(["a"])).unwrap();
        assert!(tree.root().expanded);
        assert!(!tree.nodes()[tree.get("b").unwrap()].expanded);
    }

    #[test]
    fn cycles_terminate_and_are_reported() {
        let persons = people(&["a", "b", "c"]);
        let rels = vec![
            Relationship::parent("r1", "a", "b"),
            Relationship::parent("r2", "b", "c"),
            Relationship::parent("r3", "c", "a"),
            Relationship::parent("r4", "c", "c"),
        ];
        let tree = build_tree(&persons, &rels, &ExpansionState::new()).unwrap();
        assert_eq!(tree.len(), 3);
        assert_eq!(tree.max_depth(), 2);
        let reasons: Vec<_> = tree.skipped_edges().iter().map(|s| s.reason).collect();
        assert_eq!(reasons, vec![SkipReason::AlreadyPlaced, SkipReason::AlreadyPlaced]);
    }

    #[test]
    fn second_parent_path_keeps_first_placement() {
        // b and c both list d as a child; depth-first order places d under b.
        let persons = people(&["a", "b", "c", "d"]);
        let rels = vec![
            Relationship::parent("r1", "a", "b"),
            Relationship::parent("r2", "a", "c"),
            Relationship::parent("r3", "c", "d"),
            Relationship::parent("r4", "b", "d"),
        ];
        let tree = build_tree(&persons, &rels, &ExpansionState::new()).unwrap();
        assert_eq!(child_ids(&tree, "b"), vec!["d"]);
        assert!(child_ids(&tree, "c").is_empty());
        assert_eq!(tree.skipped_edges()[0].relationship_id, "r3");
    }

    #[test]
    fn long_chains_do_not_exhaust_the_stack() {
        let n = 50_000;
        let persons: Vec<Person> = (0..n).map(|i| person(&format!("p{i}"))).collect();
        let rels: Vec<Relationship> = (1..n)
            .map(|i| Relationship::parent(format!("r{i}"), format!("p{}", i - 1), format!("p{i}")))
            .collect();
        let tree = build_tree(&persons, &rels, &ExpansionState::new()).unwrap();
        assert_eq!(tree.len(), n);
        assert_eq!(tree.max_depth(), n - 1);
    }

    #[test]
    fn most_ancestral_skips_members_with_parents() {
        let persons = people(&["child", "grandpa", "dad"]);
        let rels = vec![
            Relationship::parent("r1", "grandpa", "dad"),
            Relationship::parent("r2", "dad", "child"),
        ];
        let root = find_root(&persons, &rels, &RootPolicy::MostAncestral).unwrap();
        assert_eq!(root.id, "grandpa");

        let opts = BuildOptions::default().with_root_policy(RootPolicy::MostAncestral);
        let tree = build_tree_with(&persons, &rels, &ExpansionState::new(), &opts).unwrap();
        assert_eq!(tree.len(), 3);
        assert_eq!(tree.depth_of("child"), Some(2));
    }

    #[test]
    fn most_ancestral_falls_back_on_full_cycle() {
        let persons = people(&["a", "b"]);
        let rels = vec![
            Relationship::parent("r1", "a", "b"),
            Relationship::parent("r2", "b", "a"),
        ];
        let root = find_root(&persons, &rels, &RootPolicy::MostAncestral).unwrap();
        assert_eq!(root.id, "a");
    }

    #[test]
    fn member_policy_falls_back_when_unknown() {
        let persons = people(&["a", "b"]);
        let pick = |id: &str| {
            find_root(&persons, &[], &RootPolicy::Member(id.to_string()))
                .unwrap()
                .id
                .clone()
        };
        assert_eq!(pick("b"), "b");
        assert_eq!(pick("nobody"), "a");
    }

    #[test]
    fn visible_ids_stop_at_collapsed_nodes() {
        let persons = people(&["a", "b", "c", "d"]);
        let rels = vec![
            Relationship::parent("r1", "a", "b"),
            Relationship::parent("r2", "b", "c"),
            Relationship::parent("r3", "a", "d"),
        ];
        let collapsed = build_tree(&persons, &rels, &ExpansionState::new()).unwrap();
        assert_eq!(collapsed.visible_ids(), vec!["a"]);
        let partly = build_tree(&persons, &rels, &ExpansionState::expand_all(["a"])).unwrap();
        assert_eq!(partly.visible_ids(), vec!["a", "b", "d"]);
        assert_eq!(collapsed.shape(), partly.shape());
        assert_eq!(collapsed.shape(), vec![("a", "b"), ("a", "d"), ("b", "c")]);
    }

    #[test]
    fn entries_link_rows_by_id() {
        let persons = people(&["a", "b"]);
        let rels = vec![Relationship::parent("r1", "a", "b")];
        let tree = build_tree(&persons, &rels, &ExpansionState::new()).unwrap();
        let entries = tree.entries(&persons);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].name, "A Rao");
        assert_eq!(entries[0].parent, None);
        assert_eq!(entries[0].children, vec!["b".to_string()]);
        assert_eq!(entries[1].parent.as_deref(), Some("a"));
        assert_eq!(entries[1].depth, 1);
    }

    #[test]
    fn entries_of_a_long_chain_serialize() {
        let n = 50_000;
        let persons: Vec<Person> = (0..n).map(|i| person(&format!("p{i}"))).collect();
        let rels: Vec<Relationship> = (1..n)
            .map(|i| Relationship::parent(format!("r{i}"), format!("p{}", i - 1), format!("p{i}")))
            .collect();
        let tree = build_tree(&persons, &rels, &ExpansionState::new()).unwrap();
        let entries = tree.entries(&persons);
        assert_eq!(entries.len(), n);
        assert_eq!(entries[n - 1].id, format!("p{}", n - 1));
        assert_eq!(entries[n - 1].depth, n - 1);
        let json = serde_json::to_string(&entries).unwrap();
        assert!(json.starts_with(r#"[{"id":"p0""#));
        drop(entries);
    }
}
