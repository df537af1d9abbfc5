//! Actors: enemies, companions, and summoned minions.
//!
//! Every combatant other than the player is an [`Actor`]. The player is
//! represented in turn order by the fixed [`ActorId::PLAYER`] sentinel and
//! carries its numbers in `PlayerStats` instead.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::ability::Ability;
use crate::effect::ActiveEffect;

/// Unique identifier for every actor in an encounter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ActorId(pub Uuid);

impl ActorId {
    /// The fixed id that stands for the player in turn order.
    pub const PLAYER: ActorId = ActorId(Uuid::nil());

    /// Generate a new random actor id.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Mint an id from raw bits.
    ///
    /// The engine feeds this from its seeded RNG so that actors created
    /// mid-encounter (summons, scaled-up enemies) get reproducible ids.
    pub fn from_u128(bits: u128) -> Self {
        Self(Uuid::from_u128(bits))
    }

    /// Returns true if this id is the player sentinel.
    pub fn is_player(&self) -> bool {
        *self == Self::PLAYER
    }
}

impl Default for ActorId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", &self.0.to_string()[..8])
    }
}

/// The creature family of an actor. Drives minion selection for bosses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CreatureKind {
    /// People: bandits, cultists, soldiers.
    Humanoid,
    /// Wild animals and monsters.
    Beast,
    /// Skeletons, draugr, and other risen dead.
    Undead,
    /// Summoned or invading fiends.
    Demon,
    /// Animated constructs and machinery.
    Automaton,
    /// Dragons and their kin.
    Dragon,
}

impl fmt::Display for CreatureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Humanoid => write!(f, "humanoid"),
            Self::Beast => write!(f, "beast"),
            Self::Undead => write!(f, "undead"),
            Self::Demon => write!(f, "demon"),
            Self::Automaton => write!(f, "automaton"),
            Self::Dragon => write!(f, "dragon"),
        }
    }
}

/// AI archetype controlling how an enemy picks its abilities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Behavior {
    /// Always goes for the biggest hit.
    Aggressive,
    /// Prefers cheap, sustainable abilities.
    Defensive,
    /// Favors abilities that carry status effects.
    Tactical,
    /// Reckless damage, like aggressive.
    Berserker,
    /// No strong preference; picks uniformly.
    Support,
}

impl fmt::Display for Behavior {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Aggressive => write!(f, "aggressive"),
            Self::Defensive => write!(f, "defensive"),
            Self::Tactical => write!(f, "tactical"),
            Self::Berserker => write!(f, "berserker"),
            Self::Support => write!(f, "support"),
        }
    }
}

/// A clamped current/max resource pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pool {
    /// Current value, always in `[0, max]`.
    pub current: i32,
    /// Maximum value.
    pub max: i32,
}

impl Pool {
    /// Create a pool starting at its maximum.
    pub fn new(max: i32) -> Self {
        Self { current: max, max }
    }

    /// Adjust by a delta, clamping to `[0, max]`. Returns the new value.
    pub fn adjust(&mut self, delta: i32) -> i32 {
        self.current = (self.current + delta).clamp(0, self.max);
        self.current
    }

    /// Deduct up to `cost`, never going below zero. Returns what was paid.
    pub fn spend(&mut self, cost: i32) -> i32 {
        let paid = cost.clamp(0, self.current);
        self.current -= paid;
        paid
    }

    /// Returns true if the pool is drained.
    pub fn is_empty(&self) -> bool {
        self.current <= 0
    }

    /// Fraction of the pool that remains (0.0 to 1.0).
    pub fn fraction(&self) -> f64 {
        if self.max <= 0 {
            return 0.0;
        }
        f64::from(self.current.max(0)) / f64::from(self.max)
    }
}

/// Health plus the optional magicka and stamina pools of a combatant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vitals {
    /// Health pool. Reaching zero means the owner is down.
    pub health: Pool,
    /// Magicka pool, if the owner casts at all.
    pub magicka: Option<Pool>,
    /// Stamina pool, if the owner uses physical abilities.
    pub stamina: Option<Pool>,
}

impl Vitals {
    /// Create vitals with only a health pool.
    pub fn new(max_health: i32) -> Self {
        Self {
            health: Pool::new(max_health),
            magicka: None,
            stamina: None,
        }
    }

    /// Add a magicka pool starting at its maximum.
    pub fn with_magicka(mut self, max: i32) -> Self {
        self.magicka = Some(Pool::new(max));
        self
    }

    /// Add a stamina pool starting at its maximum.
    pub fn with_stamina(mut self, max: i32) -> Self {
        self.stamina = Some(Pool::new(max));
        self
    }

    /// Apply damage. Returns the health remaining.
    pub fn damage(&mut self, amount: i32) -> i32 {
        self.health.adjust(-amount.max(0))
    }

    /// Restore health. Returns the health after healing.
    pub fn heal(&mut self, amount: i32) -> i32 {
        self.health.adjust(amount.max(0))
    }

    /// Deduct magicka up to availability. Returns what was actually paid.
    pub fn spend_magicka(&mut self, cost: i32) -> i32 {
        self.magicka.as_mut().map_or(0, |p| p.spend(cost))
    }

    /// Deduct stamina up to availability. Returns what was actually paid.
    pub fn spend_stamina(&mut self, cost: i32) -> i32 {
        self.stamina.as_mut().map_or(0, |p| p.spend(cost))
    }

    /// Returns true while health is above zero.
    pub fn is_alive(&self) -> bool {
        !self.health.is_empty()
    }
}

/// Coarse health bucket derived from the health fraction, for narration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthState {
    /// Above three quarters health.
    Healthy,
    /// Above half health.
    Wounded,
    /// Above a quarter health.
    Bloodied,
    /// Barely standing.
    Critical,
    /// Out of the fight.
    Down,
}

impl HealthState {
    /// Bucket a health fraction (0.0 to 1.0).
    pub fn from_fraction(fraction: f64) -> Self {
        if fraction <= 0.0 {
            Self::Down
        } else if fraction <= 0.25 {
            Self::Critical
        } else if fraction <= 0.5 {
            Self::Bloodied
        } else if fraction <= 0.75 {
            Self::Wounded
        } else {
            Self::Healthy
        }
    }
}

impl fmt::Display for HealthState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Healthy => write!(f, "healthy"),
            Self::Wounded => write!(f, "wounded"),
            Self::Bloodied => write!(f, "bloodied"),
            Self::Critical => write!(f, "critical"),
            Self::Down => write!(f, "down"),
        }
    }
}

/// Whether an actor still counts toward the end-of-combat check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Hostility {
    /// Alive and fighting.
    Hostile,
    /// Dead or otherwise out of the encounter.
    Defeated,
}

impl fmt::Display for Hostility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Hostile => write!(f, "hostile"),
            Self::Defeated => write!(f, "defeated"),
        }
    }
}

/// Companion bookkeeping for allied actors.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompanionMeta {
    /// True for conjured minions with a bounded lifetime.
    pub is_summon: bool,
    /// Id of the ability that conjured this summon, if any.
    pub summon_ability: Option<String>,
    /// The companion travels with the player and joins fights.
    pub following: bool,
    /// The companion holds position but still defends the player.
    pub guarding: bool,
    /// Set when a summon's lifetime ran out; it now loses half its
    /// remaining health every player turn until it fades.
    pub decaying: bool,
}

impl CompanionMeta {
    /// Meta for a recruited follower.
    pub fn follower() -> Self {
        Self {
            following: true,
            ..Self::default()
        }
    }

    /// Meta for a fresh summon conjured by the given ability.
    pub fn summoned(ability_id: impl Into<String>) -> Self {
        Self {
            is_summon: true,
            summon_ability: Some(ability_id.into()),
            following: true,
            ..Self::default()
        }
    }
}

/// One entry in an actor's loot table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LootDrop {
    /// Item name handed to the reward bundle when the drop lands.
    pub item: String,
    /// Drop chance in `[0.0, 1.0]`.
    pub chance: f64,
}

impl LootDrop {
    /// Create a loot entry.
    pub fn new(item: impl Into<String>, chance: f64) -> Self {
        Self {
            item: item.into(),
            chance: chance.clamp(0.0, 1.0),
        }
    }
}

/// How many recently used ability ids an actor remembers.
const ABILITY_HISTORY: usize = 4;

/// A combatant: enemy, companion, or summoned minion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Actor {
    /// Unique identifier within the encounter.
    pub id: ActorId,
    /// Display name.
    pub name: String,
    /// Creature family.
    pub kind: CreatureKind,
    /// Level, feeding the damage level bonus.
    pub level: u32,
    /// Health and resource pools.
    pub vitals: Vitals,
    /// Armor rating used for damage mitigation.
    pub armor: i32,
    /// Damage of a plain strike when no ability applies.
    pub base_damage: i32,
    /// AI archetype for ability selection.
    pub behavior: Behavior,
    /// Abilities this actor can use.
    pub abilities: Vec<Ability>,
    /// Timed effects currently on this actor.
    pub active_effects: Vec<ActiveEffect>,
    /// Boss-tagged enemies get minions attached at encounter start.
    pub boss: bool,
    /// Items that may drop on defeat.
    pub loot: Vec<LootDrop>,
    /// Experience granted on defeat.
    pub xp_reward: u32,
    /// Gold granted on defeat.
    pub gold_reward: u32,
    /// Present for allied actors; absent for enemies.
    pub companion: Option<CompanionMeta>,
    /// Id of the actor that conjured this one, if it was summoned.
    pub summoned_by: Option<ActorId>,
    /// Ids of the last few abilities used, oldest first.
    pub recent_abilities: Vec<String>,
}

impl Actor {
    /// Create an actor with a random id and no abilities.
    pub fn new(
        name: impl Into<String>,
        kind: CreatureKind,
        level: u32,
        max_health: i32,
        armor: i32,
        base_damage: i32,
    ) -> Self {
        Self {
            id: ActorId::new(),
            name: name.into(),
            kind,
            level,
            vitals: Vitals::new(max_health),
            armor,
            base_damage,
            behavior: Behavior::Support,
            abilities: Vec::new(),
            active_effects: Vec::new(),
            boss: false,
            loot: Vec::new(),
            xp_reward: 0,
            gold_reward: 0,
            companion: None,
            summoned_by: None,
            recent_abilities: Vec::new(),
        }
    }

    /// Replace the id. The engine uses this to mint reproducible ids.
    pub fn with_id(mut self, id: ActorId) -> Self {
        self.id = id;
        self
    }

    /// Set the AI archetype.
    pub fn with_behavior(mut self, behavior: Behavior) -> Self {
        self.behavior = behavior;
        self
    }

    /// Add an ability to the loadout.
    pub fn with_ability(mut self, ability: Ability) -> Self {
        self.abilities.push(ability);
        self
    }

    /// Add a magicka pool.
    pub fn with_magicka(mut self, max: i32) -> Self {
        self.vitals = self.vitals.with_magicka(max);
        self
    }

    /// Add a stamina pool.
    pub fn with_stamina(mut self, max: i32) -> Self {
        self.vitals = self.vitals.with_stamina(max);
        self
    }

    /// Tag this actor as a boss.
    pub fn with_boss(mut self) -> Self {
        self.boss = true;
        self
    }

    /// Set the XP and gold granted on defeat.
    pub fn with_rewards(mut self, xp: u32, gold: u32) -> Self {
        self.xp_reward = xp;
        self.gold_reward = gold;
        self
    }

    /// Add a loot table entry.
    pub fn with_loot(mut self, item: impl Into<String>, chance: f64) -> Self {
        self.loot.push(LootDrop::new(item, chance));
        self
    }

    /// Attach companion bookkeeping, making this an allied actor.
    pub fn with_companion(mut self, meta: CompanionMeta) -> Self {
        self.companion = Some(meta);
        self
    }

    /// Returns true while health is above zero.
    pub fn is_alive(&self) -> bool {
        self.vitals.is_alive()
    }

    /// Derived health bucket for narration.
    pub fn health_state(&self) -> HealthState {
        HealthState::from_fraction(self.vitals.health.fraction())
    }

    /// Whether this actor still counts toward the end-of-combat check.
    pub fn hostility(&self) -> Hostility {
        if self.is_alive() {
            Hostility::Hostile
        } else {
            Hostility::Defeated
        }
    }

    /// Returns true for allied actors (followers and summons).
    pub fn is_companion(&self) -> bool {
        self.companion.is_some()
    }

    /// Returns true for conjured minions.
    pub fn is_summon(&self) -> bool {
        self.companion.as_ref().is_some_and(|c| c.is_summon)
    }

    /// Returns true once a summon's lifetime ran out.
    pub fn is_decaying(&self) -> bool {
        self.companion.as_ref().is_some_and(|c| c.decaying)
    }

    /// Look up an ability by id.
    pub fn ability(&self, id: &str) -> Option<&Ability> {
        self.abilities.iter().find(|a| a.id == id)
    }

    /// Record an ability use in the rolling history (last four).
    pub fn record_ability(&mut self, id: impl Into<String>) {
        self.recent_abilities.push(id.into());
        if self.recent_abilities.len() > ABILITY_HISTORY {
            self.recent_abilities.remove(0);
        }
    }

    /// Id of the most recently used ability.
    pub fn last_ability(&self) -> Option<&str> {
        self.recent_abilities.last().map(String::as_str)
    }

    /// How often an ability id appears in the recent history.
    pub fn recent_uses(&self, id: &str) -> usize {
        self.recent_abilities.iter().filter(|a| *a == id).count()
    }
}
