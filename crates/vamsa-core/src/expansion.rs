//! Which tree nodes currently show their children.
//!
//! `ExpansionState` is a value: every operation returns a new state and leaves the receiver
//! untouched, so a view can detect changes with `==`.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::model::PersonId;

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExpansionState(BTreeSet<PersonId>);

impl ExpansionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Flips membership of `id`.
    pub fn toggle(&self, id: &str) -> Self {
        let mut ids = self.0.clone();
        if !ids.remove(id) {
            ids.insert(id.to_string());
        }
        Self(ids)
    }

    pub fn collapse_all() -> Self {
        Self::default()
    }

    /// State containing exactly `ids`.
    ///
    /// Ids are taken as given; they need not be reachable from the current root.
    pub fn expand_all<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<PersonId>,
    {
        Self(ids.into_iter().map(Into::into).collect())
    }

    pub fn with_expanded(&self, id: &str) -> Self {
        if self.contains(id) {
            return self.clone();
        }
        let mut ids = self.0.clone();
        ids.insert(id.to_string());
        Self(ids)
    }

    pub fn with_collapsed(&self, id: &str) -> Self {
        if !self.contains(id) {
            return self.clone();
        }
        let mut ids = self.0.clone();
        ids.remove(id);
        Self(ids)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.0.contains(id)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

impl<S: Into<PersonId>> FromIterator<S> for ExpansionState {
    fn from_iter<T: IntoIterator<Item = S>>(iter: T) -> Self {
        Self::expand_all(iter)
    }
}
