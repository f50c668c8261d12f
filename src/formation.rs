//! Formations and the formation catalog.
//!
//! A formation is nothing more than a name and an ordered list of slot keys.
//! Slot order matters: it is the iteration order of [`auto_assign`].
//!
//! [`auto_assign`]: crate::auto_assign

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::error::InvalidRequestKind;
use crate::{SlotKey, TouchlineResult};

/// Name of the default formation.
pub const DEFAULT_FORMATION: &str = "1-4-4-2";

const FOUR_FOUR_TWO: [&str; 11] = [
    "GK", "RB", "CB", "CB2", "LB", "RM", "CM", "CM2", "LM", "CF", "CF2",
];
const FOUR_THREE_THREE: [&str; 11] = [
    "GK", "RB", "CB", "CB2", "LB", "DM", "CM", "CM2", "RW", "CF", "LW",
];

/// A named, ordered set of slot keys.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Formation {
    name: String,
    slots: Vec<SlotKey>,
}

impl Formation {
    /// Creates a formation. Slot keys must be unique and there must be at least one.
    pub fn new<I, S>(name: impl Into<String>, slots: I) -> TouchlineResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<SlotKey>,
    {
        let name = name.into();
        let slots: Vec<SlotKey> = slots.into_iter().map(Into::into).collect();
        if slots.is_empty() {
            return Err(InvalidRequestKind::MalformedFormation {
                name,
                reason: "no slots",
            }
            .into());
        }
        let unique: BTreeSet<&SlotKey> = slots.iter().collect();
        if unique.len() != slots.len() {
            return Err(InvalidRequestKind::MalformedFormation {
                name,
                reason: "duplicate slot key",
            }
            .into());
        }
        Ok(Self { name, slots })
    }

    /// The formation's name, e.g. "1-4-3-3".
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Slot keys in formation order.
    #[must_use]
    pub fn slots(&self) -> &[SlotKey] {
        &self.slots
    }

    /// Number of slots.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Always false for a constructed formation.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// True if `slot` belongs to this formation.
    #[must_use]
    pub fn contains(&self, slot: &SlotKey) -> bool {
        self.slots.contains(slot)
    }
}

/// Named formations available to a match.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FormationCatalog {
    formations: BTreeMap<String, Formation>,
}

impl FormationCatalog {
    /// An empty catalog.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The two stock formations, "1-4-4-2" and "1-4-3-3".
    #[must_use]
    pub fn builtin() -> Self {
        let mut catalog = Self::new();
        for (name, slots) in [
            (DEFAULT_FORMATION, FOUR_FOUR_TWO),
            ("1-4-3-3", FOUR_THREE_THREE),
        ] {
            catalog.formations.insert(
                name.to_owned(),
                Formation {
                    name: name.to_owned(),
                    slots: slots.into_iter().map(SlotKey::from).collect(),
                },
            );
        }
        catalog
    }

    /// Adds or replaces a formation. Returns the replaced formation, if any.
    pub fn register(&mut self, formation: Formation) -> Option<Formation> {
        self.formations
            .insert(formation.name().to_owned(), formation)
    }

    /// Looks up a formation by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Formation> {
        self.formations.get(name)
    }

    /// Looks up a formation, failing with `UnknownFormation`.
    pub fn require(&self, name: &str) -> TouchlineResult<&Formation> {
        self.get(name).ok_or_else(|| {
            InvalidRequestKind::UnknownFormation {
                name: name.to_owned(),
            }
            .into()
        })
    }

    /// Formation names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.formations.keys().map(String::as_str)
    }
}

#[cfg(test)]
#[allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing
)]
mod tests {
    use super::*;

    #[test]
    fn builtin_has_both_stock_formations() {
        let catalog = FormationCatalog::builtin();
        let names: Vec<&str> = catalog.names().collect();
        assert_eq!(names, vec!["1-4-3-3", "1-4-4-2"]);
        assert_eq!(catalog.get("1-4-4-2").unwrap().len(), 11);
        assert_eq!(catalog.get("1-4-3-3").unwrap().slots()[10].as_str(), "LW");
    }

    #[test]
    fn formation_rejects_duplicates_and_empty() {
        assert!(Formation::new("bad", ["GK", "GK"]).is_err());
        assert!(Formation::new("empty", Vec::<&str>::new()).is_err());
    }

    #[test]
    fn register_replaces_by_name() {
        let mut catalog = FormationCatalog::builtin();
        let small = Formation::new("1-4-4-2", ["GK", "CB", "CF"]).unwrap();
        let replaced = catalog.register(small);
        assert_eq!(replaced.unwrap().len(), 11);
        assert_eq!(catalog.require("1-4-4-2").unwrap().len(), 3);
    }

    #[test]
    fn require_unknown_formation_fails() {
        let catalog = FormationCatalog::builtin();
        assert!(catalog.require("3-5-2").is_err());
    }
}
