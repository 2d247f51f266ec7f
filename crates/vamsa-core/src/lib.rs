#![forbid(unsafe_code)]

//! Family tree model and builder (headless).
//!
//! Design goals:
//! - members and relationships are loaded as plain snapshots (JSON/YAML, web client wire shape)
//! - trees are rebuilt from scratch on every change and never mutated in place
//! - malformed relationship sets (dangling ids, cycles, second parents) degrade to a finite tree

pub mod config;
pub mod dataset;
pub mod error;
pub mod expansion;
pub mod model;
pub mod tree;

pub use config::VamsaConfig;
pub use dataset::{DatasetFormat, DatasetReport, FamilyDataset};
pub use error::{Error, Result};
pub use expansion::ExpansionState;
pub use model::{Gender, Person, PersonId, Relationship, RelationshipType};
pub use tree::{
    BuildOptions, FamilyTree, NodeIdx, RootPolicy, SkipReason, SkippedEdge, TreeEntry, TreeNode,
    build_tree, build_tree_with, find_root,
};
