//! The combat state aggregate owned by the caller across an encounter.
//!
//! Executors never mutate a state in place: they take the previous state
//! by reference and hand back a fresh copy, so callers can diff old
//! against new.

use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::actor::{Actor, ActorId};
use crate::effect::ActiveEffect;
use crate::error::{CoreError, CoreResult};
use crate::log::CombatLog;
use crate::player::SurvivalDelta;

/// How the encounter ended, if it has.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CombatOutcome {
    /// Still fighting.
    #[default]
    Ongoing,
    /// Every enemy lost hostility.
    Victory,
    /// The player went down.
    Defeat,
    /// The player slipped away.
    Fled,
    /// The player gave up.
    Surrendered,
}

impl fmt::Display for CombatOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ongoing => write!(f, "ongoing"),
            Self::Victory => write!(f, "victory"),
            Self::Defeat => write!(f, "defeat"),
            Self::Fled => write!(f, "fled"),
            Self::Surrendered => write!(f, "surrendered"),
        }
    }
}

/// Rewards granted when the encounter ends in victory.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Rewards {
    /// Total experience from every defeated enemy.
    pub xp: u32,
    /// Total gold from every defeated enemy.
    pub gold: u32,
    /// Item names whose drop chance rolls landed.
    pub items: Vec<String>,
}

impl Rewards {
    /// Returns true when nothing was earned.
    pub fn is_empty(&self) -> bool {
        self.xp == 0 && self.gold == 0 && self.items.is_empty()
    }
}

/// Everything the engine knows about one running encounter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CombatState {
    /// False once the encounter has ended.
    pub active: bool,
    /// How the encounter ended.
    pub outcome: CombatOutcome,
    /// Round counter, starting at 1.
    pub turn: u32,
    /// Ids in acting order. The player appears as [`ActorId::PLAYER`].
    pub turn_order: Vec<ActorId>,
    /// Id of the actor whose turn it is.
    pub current: ActorId,
    /// Hostile actors.
    pub enemies: Vec<Actor>,
    /// Friendly actors: followers and summons.
    pub allies: Vec<Actor>,
    /// Deduplicated narration log.
    pub log: CombatLog,
    /// Timed effects on the player.
    pub player_effects: Vec<ActiveEffect>,
    /// Ability id to rounds remaining before reuse.
    pub cooldowns: HashMap<String, u32>,
    /// Summon id to player turns left before decay starts.
    pub pending_summons: HashMap<ActorId, u32>,
    /// The player is braced behind a guard stance.
    pub player_defending: bool,
    /// Rounds the guard stance has left.
    pub guard_rounds: u32,
    /// The guard stance was already spent this encounter.
    pub guard_used: bool,
    /// Victory loot is waiting to be collected.
    pub loot_pending: bool,
    /// Rewards granted at victory.
    pub pending_rewards: Rewards,
    /// Survival cost charged for the encounter.
    pub survival_delta: SurvivalDelta,
    /// Whether fleeing is possible here.
    pub flee_allowed: bool,
    /// Whether surrender is possible here.
    pub surrender_allowed: bool,
    /// Where the fight takes place, for narration.
    pub location: String,
    /// When the encounter started.
    pub started_at: DateTime<Utc>,
    /// When the encounter ended, once it has.
    pub ended_at: Option<DateTime<Utc>>,
}

impl CombatState {
    /// Create an empty, active state at the given location.
    pub fn new(location: impl Into<String>) -> Self {
        Self {
            active: true,
            outcome: CombatOutcome::Ongoing,
            turn: 1,
            turn_order: Vec::new(),
            current: ActorId::PLAYER,
            enemies: Vec::new(),
            allies: Vec::new(),
            log: CombatLog::new(),
            player_effects: Vec::new(),
            cooldowns: HashMap::new(),
            pending_summons: HashMap::new(),
            player_defending: false,
            guard_rounds: 0,
            guard_used: false,
            loot_pending: false,
            pending_rewards: Rewards::default(),
            survival_delta: SurvivalDelta::default(),
            flee_allowed: true,
            surrender_allowed: false,
            location: location.into(),
            started_at: Utc::now(),
            ended_at: None,
        }
    }

    /// Add a hostile actor, rejecting duplicate ids.
    pub fn add_enemy(&mut self, actor: Actor) -> CoreResult<()> {
        self.ensure_new_id(actor.id)?;
        self.enemies.push(actor);
        Ok(())
    }

    /// Add a friendly actor, rejecting duplicate ids.
    pub fn add_ally(&mut self, actor: Actor) -> CoreResult<()> {
        self.ensure_new_id(actor.id)?;
        self.allies.push(actor);
        Ok(())
    }

    fn ensure_new_id(&self, id: ActorId) -> CoreResult<()> {
        if id.is_player() || self.actor(id).is_some() {
            return Err(CoreError::DuplicateActor(id));
        }
        Ok(())
    }

    /// Find an actor on either side.
    pub fn actor(&self, id: ActorId) -> Option<&Actor> {
        self.enemies
            .iter()
            .chain(self.allies.iter())
            .find(|a| a.id == id)
    }

    /// Find an actor on either side, mutably.
    pub fn actor_mut(&mut self, id: ActorId) -> Option<&mut Actor> {
        self.enemies
            .iter_mut()
            .chain(self.allies.iter_mut())
            .find(|a| a.id == id)
    }

    /// Returns true if the id belongs to the hostile side.
    pub fn is_enemy(&self, id: ActorId) -> bool {
        self.enemies.iter().any(|a| a.id == id)
    }

    /// Returns true if the id belongs to the friendly side (the player
    /// counts).
    pub fn is_friendly(&self, id: ActorId) -> bool {
        id.is_player() || self.allies.iter().any(|a| a.id == id)
    }

    /// Living hostile actors.
    pub fn living_enemies(&self) -> impl Iterator<Item = &Actor> {
        self.enemies.iter().filter(|a| a.is_alive())
    }

    /// Living friendly actors.
    pub fn living_allies(&self) -> impl Iterator<Item = &Actor> {
        self.allies.iter().filter(|a| a.is_alive())
    }

    /// The default target for an offensive action.
    pub fn first_living_enemy(&self) -> Option<&Actor> {
        self.living_enemies().next()
    }

    /// Living summons on the friendly side.
    pub fn active_summons(&self) -> impl Iterator<Item = &Actor> {
        self.living_allies().filter(|a| a.is_summon())
    }

    /// Returns true while any enemy remains hostile.
    pub fn hostiles_remain(&self) -> bool {
        self.living_enemies().next().is_some()
    }

    /// Rounds remaining on an ability's cooldown.
    pub fn cooldown(&self, ability_id: &str) -> u32 {
        self.cooldowns.get(ability_id).copied().unwrap_or(0)
    }

    /// Start an ability's cooldown. Zero-round cooldowns are not tracked.
    pub fn record_cooldown(&mut self, ability_id: impl Into<String>, rounds: u32) {
        if rounds > 0 {
            self.cooldowns.insert(ability_id.into(), rounds);
        }
    }

    /// Count down every cooldown by one round, dropping finished ones.
    pub fn tick_cooldowns(&mut self) {
        self.cooldowns.retain(|_, rounds| {
            *rounds = rounds.saturating_sub(1);
            *rounds > 0
        });
    }

    /// Mark the encounter as finished with the given outcome.
    pub fn finish(&mut self, outcome: CombatOutcome) {
        self.active = false;
        self.outcome = outcome;
        self.ended_at = Some(Utc::now());
    }
}
