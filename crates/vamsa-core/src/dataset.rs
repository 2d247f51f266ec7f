//! Member and relationship snapshots loaded from JSON or YAML documents.

use indexmap::IndexMap;
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;

use crate::model::{Person, PersonId, Relationship};
use crate::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DatasetFormat {
    #[default]
    Json,
    Yaml,
}

impl DatasetFormat {
    /// Guesses the format from a file extension; unknown extensions are treated as JSON.
    pub fn from_path(path: &Path) -> Self {
        match path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .as_deref()
        {
            Some("yaml") | Some("yml") => Self::Yaml,
            _ => Self::Json,
        }
    }
}

impl FromStr for DatasetFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "yaml" | "yml" => Ok(Self::Yaml),
            other => Err(Error::UnsupportedFormat {
                format: other.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FamilyDataset {
    #[serde(default, alias = "familyMembers")]
    pub members: Vec<Person>,
    #[serde(default)]
    pub relationships: Vec<Relationship>,
}

impl FamilyDataset {
    pub fn new(members: Vec<Person>, relationships: Vec<Relationship>) -> Self {
        Self {
            members,
            relationships,
        }
    }

    pub fn from_str_with_format(text: &str, format: DatasetFormat) -> Result<Self> {
        let dataset = match format {
            DatasetFormat::Json => serde_json::from_str(text)?,
            DatasetFormat::Yaml => serde_yaml::from_str(text)?,
        };
        Ok(dataset)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| Error::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_str_with_format(&text, DatasetFormat::from_path(path))
    }

    pub fn member(&self, id: &str) -> Option<&Person> {
        self.members.iter().find(|p| p.id == id)
    }

    pub fn member_ids(&self) -> impl Iterator<Item = &str> {
        self.members.iter().map(|p| p.id.as_str())
    }

    /// Collects data-quality problems. None of them stop a tree from being built.
    pub fn validate(&self) -> DatasetReport {
        let mut report = DatasetReport {
            members: self.members.len(),
            relationships: self.relationships.len(),
            ..DatasetReport::default()
        };

        let mut seen: FxHashSet<&str> = FxHashSet::default();
        for p in &self.members {
            if !seen.insert(p.id.as_str()) && !report.duplicate_member_ids.contains(&p.id) {
                report.duplicate_member_ids.push(p.id.clone());
            }
            if !p.is_valid() {
                report.invalid_members.push(p.id.clone());
            }
        }

        let mut by_type: IndexMap<String, usize> = IndexMap::new();
        for rel in &self.relationships {
            *by_type
                .entry(rel.relationship_type.as_str().to_string())
                .or_default() += 1;
            if !rel.is_active {
                report.inactive_relationships += 1;
            }
            if rel.from_member_id == rel.to_member_id {
                report.self_relationships.push(rel.id.clone());
            }
            for end in [&rel.from_member_id, &rel.to_member_id] {
                if !seen.contains(end.as_str()) {
                    report.dangling_references.push(DanglingReference {
                        relationship_id: rel.id.clone(),
                        member_id: end.clone(),
                    });
                }
            }
        }
        report.relationship_types = by_type;
        report
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DanglingReference {
    pub relationship_id: String,
    pub member_id: PersonId,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasetReport {
    pub members: usize,
    pub relationships: usize,
    pub inactive_relationships: usize,
    pub relationship_types: IndexMap<String, usize>,
    pub duplicate_member_ids: Vec<PersonId>,
    pub invalid_members: Vec<PersonId>,
    pub self_relationships: Vec<String>,
    pub dangling_references: Vec<DanglingReference>,
}

impl DatasetReport {
    pub fn is_clean(&self) -> bool {
        self.duplicate_member_ids.is_empty()
            && self.invalid_members.is_empty()
            && self.self_relationships.is_empty()
            && self.dangling_references.is_empty()
    }
}
