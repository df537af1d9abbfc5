//! Encounter lifecycle: building the opening state and settling the
//! aftermath.

use fm_core::actor::{Actor, ActorId, CreatureKind};
use fm_core::log::LogEntry;
use fm_core::player::{PlayerStats, SurvivalDelta};
use fm_core::state::{CombatOutcome, CombatState, Rewards};
use rand::Rng;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};

use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};
use crate::presets;

/// Everything needed to open an encounter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncounterSetup {
    /// Hostile roster; at least one enemy is required.
    pub enemies: Vec<Actor>,
    /// Allied actors offered for admission.
    pub companions: Vec<Actor>,
    /// Where the fight happens, for narration.
    pub location: String,
    /// Enemies act first when true.
    pub ambush: bool,
    /// Whether fleeing is possible here.
    pub flee_allowed: bool,
    /// Whether these foes accept surrender.
    pub surrender_allowed: bool,
    /// Player level, used for headcount scaling.
    pub player_level: u32,
}

impl EncounterSetup {
    /// Start a setup at the given location with default gates.
    pub fn new(location: impl Into<String>) -> Self {
        Self {
            enemies: Vec::new(),
            companions: Vec::new(),
            location: location.into(),
            ambush: false,
            flee_allowed: true,
            surrender_allowed: false,
            player_level: 1,
        }
    }

    /// Add a hostile actor.
    pub fn with_enemy(mut self, enemy: Actor) -> Self {
        self.enemies.push(enemy);
        self
    }

    /// Offer a companion for admission.
    pub fn with_companion(mut self, companion: Actor) -> Self {
        self.companions.push(companion);
        self
    }

    /// Enemies strike first.
    pub fn ambushed(mut self) -> Self {
        self.ambush = true;
        self
    }

    /// Close off escape.
    pub fn without_flee(mut self) -> Self {
        self.flee_allowed = false;
        self
    }

    /// These foes accept surrender.
    pub fn with_surrender(mut self) -> Self {
        self.surrender_allowed = true;
        self
    }

    /// Player level for headcount scaling.
    pub fn for_level(mut self, level: u32) -> Self {
        self.player_level = level;
        self
    }
}

/// Build the opening combat state.
///
/// Under-populated encounters are scaled up to a level-appropriate
/// headcount by cycling clones of the given enemies (never down), boss
/// enemies bring kind-appropriate minions along, and only companions
/// who are alive and actually with the player are admitted.
pub fn initialize_combat(
    setup: &EncounterSetup,
    config: &EngineConfig,
    rng: &mut StdRng,
) -> EngineResult<CombatState> {
    if setup.enemies.is_empty() {
        return Err(EngineError::EmptyRoster);
    }

    let mut state = CombatState::new(&setup.location);
    state.flee_allowed = setup.flee_allowed;
    state.surrender_allowed = setup.surrender_allowed;

    let mut roster = setup.enemies.clone();
    if config.scale_encounters {
        let target = headcount(setup.player_level);
        let mut cursor = 0;
        while roster.len() < target {
            let template = &setup.enemies[cursor % setup.enemies.len()];
            roster.push(template.clone().with_id(ActorId::from_u128(rng.random())));
            cursor += 1;
        }
    }

    if config.attach_boss_minions {
        let bosses: Vec<(CreatureKind, u32)> = roster
            .iter()
            .filter(|a| a.boss)
            .map(|a| (a.kind, a.level))
            .collect();
        for (kind, level) in bosses {
            let count = (2 + level / 8).min(4);
            let minion_level = (level / 2).max(1);
            for _ in 0..count {
                let minion = presets::minion_for(kind, minion_level)
                    .with_id(ActorId::from_u128(rng.random()));
                roster.push(minion);
            }
        }
    }

    for enemy in roster {
        state.add_enemy(enemy)?;
    }

    for companion in &setup.companions {
        let with_player = companion
            .companion
            .as_ref()
            .is_some_and(|m| m.following || m.guarding);
        if companion.is_alive() && with_player {
            state.add_ally(companion.clone())?;
        }
    }

    let enemy_ids: Vec<ActorId> = state.enemies.iter().map(|a| a.id).collect();
    let ally_ids: Vec<ActorId> = state.allies.iter().map(|a| a.id).collect();
    let mut order = Vec::with_capacity(enemy_ids.len() + ally_ids.len() + 1);
    if setup.ambush {
        order.extend(enemy_ids);
        order.push(ActorId::PLAYER);
    } else {
        order.push(ActorId::PLAYER);
        order.extend(enemy_ids);
    }
    order.extend(ally_ids);
    state.current = order[0];
    state.turn_order = order;

    let text = if setup.ambush {
        format!("You are ambushed at {}!", state.location)
    } else {
        format!("Combat begins at {}.", state.location)
    };
    state.log.push(LogEntry::new(state.turn, "", "begin", "", &text));

    Ok(state)
}

/// Settle the encounter if either side is finished.
///
/// Dead summons are swept out first so their slot frees up even when
/// the fight goes on. Victory rolls every fallen enemy's loot table and
/// aggregates XP and gold; both victory and defeat charge survival
/// costs proportional to the rounds fought.
pub fn check_combat_end(
    state: &CombatState,
    player: &PlayerStats,
    config: &EngineConfig,
    rng: &mut StdRng,
) -> CombatState {
    let mut state = state.clone();
    if !state.active {
        return state;
    }

    let dead_summons: Vec<(ActorId, String)> = state
        .allies
        .iter()
        .filter(|a| a.is_summon() && !a.is_alive())
        .map(|a| (a.id, a.name.clone()))
        .collect();
    for (id, name) in dead_summons {
        state.allies.retain(|a| a.id != id);
        state.turn_order.retain(|entry| *entry != id);
        state.pending_summons.remove(&id);
        if state.current == id {
            state.current = ActorId::PLAYER;
        }
        let text = format!("The {name} crumbles away.");
        state.log.push(LogEntry::new(state.turn, &name, "fade", "", &text));
    }

    if !player.is_alive() {
        state.survival_delta = duration_costs(state.turn, config);
        let text = "You have been defeated.";
        state.log.push(LogEntry::new(state.turn, "", "defeat", "", text));
        state.finish(CombatOutcome::Defeat);
        return state;
    }

    if !state.hostiles_remain() {
        let mut rewards = Rewards::default();
        for enemy in &state.enemies {
            rewards.xp += enemy.xp_reward;
            rewards.gold += enemy.gold_reward;
            for drop in &enemy.loot {
                if rng.random_range(0.0..1.0) < drop.chance {
                    rewards.items.push(drop.item.clone());
                }
            }
        }
        state.loot_pending = !rewards.is_empty();
        state.pending_rewards = rewards;
        state.survival_delta = duration_costs(state.turn, config);
        let text = "Victory! The field is yours.";
        state.log.push(LogEntry::new(state.turn, "", "victory", "", text));
        state.finish(CombatOutcome::Victory);
    }

    state
}

fn duration_costs(rounds: u32, config: &EngineConfig) -> SurvivalDelta {
    let rounds = f64::from(rounds);
    SurvivalDelta::new(
        rounds * config.hunger_per_round,
        rounds * config.thirst_per_round,
        rounds * config.fatigue_per_round,
    )
}

/// Level-appropriate enemy headcount for an unscaled encounter.
fn headcount(level: u32) -> usize {
    match level {
        0..=2 => 1,
        3..=5 => 2,
        6..=9 => 3,
        10..=14 => 4,
        _ => 5,
    }
}

#[cfg(test)]
mod tests {
    use fm_core::actor::CompanionMeta;
    use rand::SeedableRng;

    use super::*;

    fn rng() -> StdRng {
        StdRng::seed_from_u64(99)
    }

    #[test]
    fn empty_rosters_are_rejected() {
        let setup = EncounterSetup::new("Frostmarch Pass");
        let err = initialize_combat(&setup, &EngineConfig::default(), &mut rng()).unwrap_err();
        assert!(matches!(err, EngineError::EmptyRoster));
    }

    #[test]
    fn low_level_encounters_stay_small() {
        let setup = EncounterSetup::new("Frostmarch Pass")
            .with_enemy(presets::bandit(1))
            .for_level(1);
        let state = initialize_combat(&setup, &EngineConfig::default(), &mut rng()).unwrap();
        assert_eq!(state.enemies.len(), 1);
    }

    #[test]
    fn encounters_scale_with_player_level() {
        let setup = EncounterSetup::new("Frostmarch Pass")
            .with_enemy(presets::bandit(3))
            .for_level(15);
        let state = initialize_combat(&setup, &EngineConfig::default(), &mut rng()).unwrap();

        assert_eq!(state.enemies.len(), 5);
        // Clones carry fresh ids so the turn order stays unambiguous.
        let ids: std::collections::HashSet<ActorId> =
            state.enemies.iter().map(|a| a.id).collect();
        assert_eq!(ids.len(), 5);
        assert_eq!(state.turn_order.len(), 6);
    }

    #[test]
    fn scaling_never_removes_enemies() {
        let setup = EncounterSetup::new("Frostmarch Pass")
            .with_enemy(presets::bandit(1))
            .with_enemy(presets::bandit(1))
            .with_enemy(presets::bandit(1))
            .for_level(1);
        let state = initialize_combat(&setup, &EngineConfig::default(), &mut rng()).unwrap();
        assert_eq!(state.enemies.len(), 3);
    }

    #[test]
    fn scaling_can_be_disabled() {
        let setup = EncounterSetup::new("Frostmarch Pass")
            .with_enemy(presets::bandit(1))
            .for_level(15);
        let config = EngineConfig::default().without_scaling();
        let state = initialize_combat(&setup, &config, &mut rng()).unwrap();
        assert_eq!(state.enemies.len(), 1);
    }

    #[test]
    fn bosses_arrive_with_minions() {
        let setup = EncounterSetup::new("Barrow of the Forgotten")
            .with_enemy(presets::necromancer(8))
            .for_level(1);
        let state = initialize_combat(&setup, &EngineConfig::default(), &mut rng()).unwrap();

        // 2 + 8/8 minions, each at half the boss level.
        assert_eq!(state.enemies.len(), 4);
        let minions: Vec<&Actor> = state.enemies.iter().filter(|a| !a.boss).collect();
        assert_eq!(minions.len(), 3);
        for minion in minions {
            assert_eq!(minion.name, "skeleton");
            assert_eq!(minion.level, 4);
        }
    }

    #[test]
    fn minions_can_be_disabled() {
        let setup = EncounterSetup::new("Barrow of the Forgotten")
            .with_enemy(presets::necromancer(8))
            .for_level(1);
        let config = EngineConfig::default().without_boss_minions();
        let state = initialize_combat(&setup, &config, &mut rng()).unwrap();
        assert_eq!(state.enemies.len(), 1);
    }

    #[test]
    fn ambushes_let_enemies_strike_first() {
        let follower = Actor::new(
            "Brynja",
            CreatureKind::Humanoid,
            3,
            50,
            10,
            9,
        )
        .with_companion(CompanionMeta::follower());
        let setup = EncounterSetup::new("Frostmarch Pass")
            .with_enemy(presets::bandit(1))
            .with_companion(follower)
            .ambushed();
        let state = initialize_combat(&setup, &EngineConfig::default(), &mut rng()).unwrap();

        let enemy_id = state.enemies[0].id;
        let ally_id = state.allies[0].id;
        assert_eq!(state.turn_order, vec![enemy_id, ActorId::PLAYER, ally_id]);
        assert_eq!(state.current, enemy_id);
    }

    #[test]
    fn only_willing_companions_join() {
        let mut idle = CompanionMeta::follower();
        idle.following = false;
        let mut fallen = Actor::new("Ref", CreatureKind::Humanoid, 2, 40, 5, 7)
            .with_companion(CompanionMeta::follower());
        fallen.vitals.damage(40);

        let setup = EncounterSetup::new("Frostmarch Pass")
            .with_enemy(presets::bandit(1))
            .with_companion(
                Actor::new("Brynja", CreatureKind::Humanoid, 3, 50, 10, 9)
                    .with_companion(CompanionMeta::follower()),
            )
            .with_companion(
                Actor::new("Sigurd", CreatureKind::Humanoid, 2, 40, 5, 7).with_companion(idle),
            )
            .with_companion(fallen);
        let state = initialize_combat(&setup, &EngineConfig::default(), &mut rng()).unwrap();

        assert_eq!(state.allies.len(), 1);
        assert_eq!(state.allies[0].name, "Brynja");
    }

    #[test]
    fn victory_collects_spoils() {
        let mut state = CombatState::new("Frostmarch Pass");
        let mut first = presets::bandit(1).with_rewards(10, 5);
        first.loot = vec![fm_core::actor::LootDrop::new("wolf pelt", 1.0)];
        first.vitals.damage(999);
        let mut second = presets::bandit(1).with_rewards(10, 5);
        second.loot = vec![fm_core::actor::LootDrop::new("grand soul gem", 0.0)];
        second.vitals.damage(999);
        state.add_enemy(first).unwrap();
        state.add_enemy(second).unwrap();
        state.turn = 3;

        let player = fm_core::player::PlayerStats::new(1);
        let end = check_combat_end(&state, &player, &EngineConfig::default(), &mut rng());

        assert_eq!(end.outcome, CombatOutcome::Victory);
        assert!(!end.active);
        assert!(end.ended_at.is_some());
        assert_eq!(end.pending_rewards.xp, 20);
        assert_eq!(end.pending_rewards.gold, 10);
        assert_eq!(end.pending_rewards.items, vec!["wolf pelt".to_string()]);
        assert!(end.loot_pending);
        assert_eq!(end.survival_delta, SurvivalDelta::new(4.5, 3.0, 6.0));
    }

    #[test]
    fn defeat_still_charges_survival() {
        let mut state = CombatState::new("Frostmarch Pass");
        state.add_enemy(presets::bandit(1)).unwrap();
        state.turn = 2;
        let mut player = fm_core::player::PlayerStats::new(1);
        player.vitals.damage(999);

        let end = check_combat_end(&state, &player, &EngineConfig::default(), &mut rng());
        assert_eq!(end.outcome, CombatOutcome::Defeat);
        assert_eq!(end.survival_delta, SurvivalDelta::new(3.0, 2.0, 4.0));
    }

    #[test]
    fn dead_summons_free_their_slot() {
        let mut state = CombatState::new("Frostmarch Pass");
        state.add_enemy(presets::bandit(1)).unwrap();

        let mut spirit = Actor::new("spirit wolf", CreatureKind::Beast, 1, 40, 10, 9)
            .with_companion(CompanionMeta::summoned("bind_spirit"));
        spirit.vitals.damage(40);
        let spirit_id = spirit.id;
        let follower = Actor::new("Brynja", CreatureKind::Humanoid, 3, 50, 10, 9)
            .with_companion(CompanionMeta::follower());
        let follower_id = follower.id;
        state.add_ally(spirit).unwrap();
        state.add_ally(follower).unwrap();
        state.turn_order = vec![ActorId::PLAYER, spirit_id, follower_id];
        state.pending_summons.insert(spirit_id, 2);

        let player = fm_core::player::PlayerStats::new(1);
        let end = check_combat_end(&state, &player, &EngineConfig::default(), &mut rng());

        assert!(end.active);
        assert!(end.actor(spirit_id).is_none());
        assert!(!end.turn_order.contains(&spirit_id));
        assert!(end.pending_summons.is_empty());
        assert_eq!(end.active_summons().count(), 0);
        assert!(end.actor(follower_id).is_some());
    }

    #[test]
    fn ongoing_fights_stay_open() {
        let mut state = CombatState::new("Frostmarch Pass");
        state.add_enemy(presets::bandit(1)).unwrap();
        let player = fm_core::player::PlayerStats::new(1);

        let end = check_combat_end(&state, &player, &EngineConfig::default(), &mut rng());
        assert!(end.active);
        assert_eq!(end.outcome, CombatOutcome::Ongoing);
    }
}
