//! Family members and the typed relationship edges between them.
//!
//! Field names follow the web client's wire shape (`camelCase` keys, `SCREAMING_SNAKE_CASE`
//! enumerations) so exported member lists can be loaded as-is.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::Error;

pub type PersonId = String;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Gender {
    Male,
    Female,
    #[default]
    Other,
}

impl Gender {
    pub fn glyph(self) -> &'static str {
        match self {
            Gender::Male => "\u{2642}",
            Gender::Female => "\u{2640}",
            Gender::Other => "\u{26A5}",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub street: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zip_code: Option<String>,
}

/// A single family member record.
///
/// Only `id`, the name parts, `gender` and `is_alive` influence the tree view; everything else is
/// carried for display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Person {
    pub id: PersonId,
    pub first_name: String,
    pub last_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub middle_name: Option<String>,
    #[serde(default)]
    pub gender: Gender,
    #[serde(default = "default_true")]
    pub is_alive: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_of_birth: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_of_death: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_picture: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<Address>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub occupation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

fn default_true() -> bool {
    true
}

impl Person {
    /// Minimal living member with no biographical details.
    pub fn new(
        id: impl Into<PersonId>,
        first_name: impl Into<String>,
        last_name: impl Into<String>,
        gender: Gender,
    ) -> Self {
        Self {
            id: id.into(),
            first_name: first_name.into(),
            last_name: last_name.into(),
            middle_name: None,
            gender,
            is_alive: true,
            date_of_birth: None,
            date_of_death: None,
            profile_picture: None,
            phone: None,
            email: None,
            address: None,
            occupation: None,
            notes: None,
            created_at: None,
            updated_at: None,
        }
    }

    pub fn deceased(mut self) -> Self {
        self.is_alive = false;
        self
    }

    pub fn full_name(&self) -> String {
        match self.middle_name.as_deref().map(str::trim) {
            Some(middle) if !middle.is_empty() => {
                format!("{} {} {}", self.first_name, middle, self.last_name)
            }
            _ => format!("{} {}", self.first_name, self.last_name),
        }
    }

    /// Short label drawn under the node glyph.
    pub fn display_name(&self) -> &str {
        self.first_name.trim()
    }

    pub fn initials(&self) -> String {
        self.first_name
            .trim()
            .chars()
            .take(1)
            .chain(self.last_name.trim().chars().take(1))
            .flat_map(char::to_uppercase)
            .collect()
    }

    pub fn birth_year(&self) -> Option<i32> {
        self.date_of_birth.map(|d| d.year())
    }

    pub fn gender_glyph(&self) -> &'static str {
        self.gender.glyph()
    }

    pub fn is_valid(&self) -> bool {
        !self.id.trim().is_empty()
            && !self.first_name.trim().is_empty()
            && !self.last_name.trim().is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RelationshipType {
    Parent,
    Child,
    Spouse,
    Sibling,
    Grandparent,
    Grandchild,
    Uncle,
    Aunt,
    Nephew,
    Niece,
    Cousin,
    FatherInLaw,
    MotherInLaw,
    SonInLaw,
    DaughterInLaw,
    BrotherInLaw,
    SisterInLaw,
    MaternalUncle,
    PaternalUncle,
    MaternalAunt,
    PaternalAunt,
    MaternalGrandfather,
    PaternalGrandfather,
    MaternalGrandmother,
    PaternalGrandmother,
}

impl RelationshipType {
    pub const ALL: [RelationshipType; 25] = [
        RelationshipType::Parent,
        RelationshipType::Child,
        RelationshipType::Spouse,
        RelationshipType::Sibling,
        RelationshipType::Grandparent,
        RelationshipType::Grandchild,
        RelationshipType::Uncle,
        RelationshipType::Aunt,
        RelationshipType::Nephew,
        RelationshipType::Niece,
        RelationshipType::Cousin,
        RelationshipType::FatherInLaw,
        RelationshipType::MotherInLaw,
        RelationshipType::SonInLaw,
        RelationshipType::DaughterInLaw,
        RelationshipType::BrotherInLaw,
        RelationshipType::SisterInLaw,
        RelationshipType::MaternalUncle,
        RelationshipType::PaternalUncle,
        RelationshipType::MaternalAunt,
        RelationshipType::PaternalAunt,
        RelationshipType::MaternalGrandfather,
        RelationshipType::PaternalGrandfather,
        RelationshipType::MaternalGrandmother,
        RelationshipType::PaternalGrandmother,
    ];

    /// Wire spelling (`PARENT`, `FATHER_IN_LAW`, ...).
    pub fn as_str(self) -> &'static str {
        match self {
            RelationshipType::Parent => "PARENT",
            RelationshipType::Child => "CHILD",
            RelationshipType::Spouse => "SPOUSE",
            RelationshipType::Sibling => "SIBLING",
            RelationshipType::Grandparent => "GRANDPARENT",
            RelationshipType::Grandchild => "GRANDCHILD",
            RelationshipType::Uncle => "UNCLE",
            RelationshipType::Aunt => "AUNT",
            RelationshipType::Nephew => "NEPHEW",
            RelationshipType::Niece => "NIECE",
            RelationshipType::Cousin => "COUSIN",
            RelationshipType::FatherInLaw => "FATHER_IN_LAW",
            RelationshipType::MotherInLaw => "MOTHER_IN_LAW",
            RelationshipType::SonInLaw => "SON_IN_LAW",
            RelationshipType::DaughterInLaw => "DAUGHTER_IN_LAW",
            RelationshipType::BrotherInLaw => "BROTHER_IN_LAW",
            RelationshipType::SisterInLaw => "SISTER_IN_LAW",
            RelationshipType::MaternalUncle => "MATERNAL_UNCLE",
            RelationshipType::PaternalUncle => "PATERNAL_UNCLE",
            RelationshipType::MaternalAunt => "MATERNAL_AUNT",
            RelationshipType::PaternalAunt => "PATERNAL_AUNT",
            RelationshipType::MaternalGrandfather => "MATERNAL_GRANDFATHER",
            RelationshipType::PaternalGrandfather => "PATERNAL_GRANDFATHER",
            RelationshipType::MaternalGrandmother => "MATERNAL_GRANDMOTHER",
            RelationshipType::PaternalGrandmother => "PATERNAL_GRANDMOTHER",
        }
    }

    /// Human readable label used on relationship edges and hover cards.
    pub fn label(self) -> &'static str {
        match self {
            RelationshipType::Parent => "Parent",
            RelationshipType::Child => "Child",
            RelationshipType::Spouse => "Spouse",
            RelationshipType::Sibling => "Sibling",
            RelationshipType::Grandparent => "Grandparent",
            RelationshipType::Grandchild => "Grandchild",
            RelationshipType::Uncle => "Uncle",
            RelationshipType::Aunt => "Aunt",
            RelationshipType::Nephew => "Nephew",
            RelationshipType::Niece => "Niece",
            RelationshipType::Cousin => "Cousin",
            RelationshipType::FatherInLaw => "Father-in-law",
            RelationshipType::MotherInLaw => "Mother-in-law",
            RelationshipType::SonInLaw => "Son-in-law",
            RelationshipType::DaughterInLaw => "Daughter-in-law",
            RelationshipType::BrotherInLaw => "Brother-in-law",
            RelationshipType::SisterInLaw => "Sister-in-law",
            RelationshipType::MaternalUncle => "Maternal Uncle",
            RelationshipType::PaternalUncle => "Paternal Uncle",
            RelationshipType::MaternalAunt => "Maternal Aunt",
            RelationshipType::PaternalAunt => "Paternal Aunt",
            RelationshipType::MaternalGrandfather => "Maternal Grandfather",
            RelationshipType::PaternalGrandfather => "Paternal Grandfather",
            RelationshipType::MaternalGrandmother => "Maternal Grandmother",
            RelationshipType::PaternalGrandmother => "Paternal Grandmother",
        }
    }
}

impl fmt::Display for RelationshipType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RelationshipType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().replace(['-', ' '], "_").to_ascii_uppercase();
        RelationshipType::ALL
            .into_iter()
            .find(|t| t.as_str() == wanted)
            .ok_or_else(|| Error::UnknownRelationshipType {
                value: s.to_string(),
            })
    }
}

/// A typed, directed edge between two members.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Relationship {
    pub id: String,
    pub from_member_id: PersonId,
    pub to_member_id: PersonId,
    pub relationship_type: RelationshipType,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

impl Relationship {
    pub fn new(
        id: impl Into<String>,
        from: impl Into<PersonId>,
        to: impl Into<PersonId>,
        relationship_type: RelationshipType,
    ) -> Self {
        Self {
            id: id.into(),
            from_member_id: from.into(),
            to_member_id: to.into(),
            relationship_type,
            is_active: true,
            start_date: None,
            end_date: None,
            notes: None,
            created_at: None,
            updated_at: None,
        }
    }

    pub fn parent(id: impl Into<String>, from: impl Into<PersonId>, to: impl Into<PersonId>) -> Self {
        Self::new(id, from, to, RelationshipType::Parent)
    }

    pub fn inactive(mut self) -> Self {
        self.is_active = false;
        self
    }

    /// Active `PARENT` edges are the only ones that shape the tree.
    pub fn is_tree_edge(&self) -> bool {
        self.is_active && self.relationship_type == RelationshipType::Parent
    }
}
