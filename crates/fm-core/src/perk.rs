//! Perk definitions and bonus aggregation.
//!
//! Perks are static definitions keyed by id; the character sheet only
//! stores ranks. A perk declares the bonus keys it contributes to (for
//! example `"fire_damage"` or `"lifesteal"`) with a per-rank amount, and
//! [`PerkCatalog::bonus`] sums `amount × rank` over every perk the
//! character has unlocked.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::player::Character;

/// One bonus a perk contributes, scaled by its rank.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerkBonus {
    /// Bonus key this contributes to.
    pub key: String,
    /// Amount added per unlocked rank.
    ///
    /// Whether the sum is a flat addition or a percentage is a property
    /// of the key, decided where the key is read.
    pub amount: f64,
}

/// Static definition of a perk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Perk {
    /// Stable id, matched against the character's rank map.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Highest meaningful rank.
    pub max_rank: u32,
    /// Bonus keys this perk contributes to.
    pub bonuses: Vec<PerkBonus>,
}

impl Perk {
    /// Create a perk with no bonuses.
    pub fn new(id: impl Into<String>, name: impl Into<String>, max_rank: u32) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            max_rank,
            bonuses: Vec::new(),
        }
    }

    /// Declare a bonus key with its per-rank amount.
    pub fn with_bonus(mut self, key: impl Into<String>, amount: f64) -> Self {
        self.bonuses.push(PerkBonus {
            key: key.into(),
            amount,
        });
        self
    }
}

/// All perk definitions known to the engine.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PerkCatalog {
    perks: HashMap<String, Perk>,
}

impl PerkCatalog {
    /// Create an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a perk definition, replacing any previous one with the
    /// same id.
    pub fn register(&mut self, perk: Perk) {
        self.perks.insert(perk.id.clone(), perk);
    }

    /// Look up a perk definition.
    pub fn get(&self, id: &str) -> Option<&Perk> {
        self.perks.get(id)
    }

    /// Number of registered perks.
    pub fn len(&self) -> usize {
        self.perks.len()
    }

    /// Returns true when no perks are registered.
    pub fn is_empty(&self) -> bool {
        self.perks.is_empty()
    }

    /// Total bonus for a key: the sum of `amount × rank` over every perk
    /// the character has ranked that declares the key.
    ///
    /// Ranks are capped at the perk's `max_rank`.
    pub fn bonus(&self, character: &Character, key: &str) -> f64 {
        character
            .perks
            .iter()
            .filter_map(|(id, rank)| {
                let perk = self.perks.get(id)?;
                let rank = (*rank).min(perk.max_rank);
                if rank == 0 {
                    return None;
                }
                let declared: f64 = perk
                    .bonuses
                    .iter()
                    .filter(|b| b.key == key)
                    .map(|b| b.amount)
                    .sum();
                Some(declared * f64::from(rank))
            })
            .sum()
    }
}
