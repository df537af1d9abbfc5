//! Abilities: attacks, spells, shouts, and utility actions.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::effect::{Effect, SummonTemplate};

/// The delivery category of an ability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AbilityKind {
    /// Close-quarters weapon or claw strike.
    Melee,
    /// Bow, thrown, or spit attack.
    Ranged,
    /// Spellcasting, gated by magicka.
    Magic,
    /// Non-damaging tricks: wards, howls, stances.
    Utility,
    /// Hybrid attack that also fans out over a roster.
    AreaHybrid,
}

impl fmt::Display for AbilityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Melee => write!(f, "melee"),
            Self::Ranged => write!(f, "ranged"),
            Self::Magic => write!(f, "magic"),
            Self::Utility => write!(f, "utility"),
            Self::AreaHybrid => write!(f, "area"),
        }
    }
}

/// Spell element, keying elemental perk multipliers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Element {
    /// Burning damage.
    Fire,
    /// Chilling damage.
    Frost,
    /// Lightning damage.
    Shock,
}

impl Element {
    /// Perk bonus key for this element.
    pub fn perk_key(&self) -> &'static str {
        match self {
            Self::Fire => "fire_damage",
            Self::Frost => "frost_damage",
            Self::Shock => "shock_damage",
        }
    }
}

impl fmt::Display for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fire => write!(f, "fire"),
            Self::Frost => write!(f, "frost"),
            Self::Shock => write!(f, "shock"),
        }
    }
}

/// Resource price of an ability. Zero fields cost nothing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbilityCost {
    /// Magicka deducted up to availability.
    pub magicka: i32,
    /// Stamina demanded; shortfalls weaken the action instead of failing it.
    pub stamina: i32,
}

impl AbilityCost {
    /// A cost in magicka only.
    pub fn magicka(amount: i32) -> Self {
        Self {
            magicka: amount,
            stamina: 0,
        }
    }

    /// A cost in stamina only.
    pub fn stamina(amount: i32) -> Self {
        Self {
            magicka: 0,
            stamina: amount,
        }
    }

    /// Returns true when the ability costs nothing.
    pub fn is_free(&self) -> bool {
        self.magicka <= 0 && self.stamina <= 0
    }

    /// Combined price, used by cost-averse enemy selection.
    pub fn total(&self) -> i32 {
        self.magicka.max(0) + self.stamina.max(0)
    }
}

/// One usable ability: an attack, spell, shout, or trick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ability {
    /// Stable string id, also the cooldown key.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Delivery category.
    pub kind: AbilityKind,
    /// Base damage before level bonus and tier scaling. Zero for
    /// non-damaging abilities.
    pub damage: i32,
    /// Resource price.
    pub cost: AbilityCost,
    /// Rounds before this ability can be used again. Zero means no cooldown.
    pub cooldown: u32,
    /// Health restored to the target on use. Zero means no healing.
    pub heal: i32,
    /// Status effects attached on use.
    pub effects: Vec<Effect>,
    /// True for bare-fist attacks, which are gated by the unarmed unlock.
    pub unarmed: bool,
    /// Spell element, if any.
    pub element: Option<Element>,
}

impl Ability {
    /// Create an ability with no cost, cooldown, healing, or effects.
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        kind: AbilityKind,
        damage: i32,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            kind,
            damage,
            cost: AbilityCost::default(),
            cooldown: 0,
            heal: 0,
            effects: Vec::new(),
            unarmed: false,
            element: None,
        }
    }

    /// Set the resource price.
    pub fn with_cost(mut self, cost: AbilityCost) -> Self {
        self.cost = cost;
        self
    }

    /// Set the cooldown in rounds.
    pub fn with_cooldown(mut self, rounds: u32) -> Self {
        self.cooldown = rounds;
        self
    }

    /// Set the heal amount.
    pub fn with_heal(mut self, amount: i32) -> Self {
        self.heal = amount;
        self
    }

    /// Attach a status effect.
    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }

    /// Set the spell element.
    pub fn with_element(mut self, element: Element) -> Self {
        self.element = Some(element);
        self
    }

    /// Mark as a bare-fist attack.
    pub fn with_unarmed(mut self) -> Self {
        self.unarmed = true;
        self
    }

    /// Returns true for abilities that help rather than harm: they
    /// default-target the caster instead of an enemy.
    pub fn is_supportive(&self) -> bool {
        self.kind == AbilityKind::Utility
            || (self.damage <= 0 && self.heal > 0)
            || self.summons().is_some()
    }

    /// Returns true for abilities resolved against an enemy target.
    pub fn is_offensive(&self) -> bool {
        !self.is_supportive()
    }

    /// Returns true when any status effect rides on this ability.
    pub fn has_effects(&self) -> bool {
        !self.effects.is_empty()
    }

    /// The summon template carried by this ability, if it conjures one.
    pub fn summons(&self) -> Option<&SummonTemplate> {
        self.effects.iter().find_map(|e| match e {
            Effect::Summon { template } => Some(template),
            _ => None,
        })
    }
}
