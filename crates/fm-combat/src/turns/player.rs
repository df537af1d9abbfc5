//! The player's turn: action dispatch, cost payment, targeting, perk
//! multipliers, and narration.

use std::fmt;

use fm_core::ability::{Ability, AbilityCost};
use fm_core::actor::{ActorId, CompanionMeta};
use fm_core::effect::{ActiveEffect, Effect};
use fm_core::item::{Inventory, ItemKind};
use fm_core::log::{LogEntry, RollDetail};
use fm_core::perk::PerkCatalog;
use fm_core::player::{Character, PlayerStats, SurvivalDelta, WeaponClass};
use fm_core::state::{CombatOutcome, CombatState};
use rand::Rng;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};

use crate::config::EngineConfig;
use crate::damage::{self, HitLocation};
use crate::effects;
use crate::error::{EngineError, EngineResult};
use crate::roll::{self, AttackRoll};
use crate::turns::{ActionOutcome, describe_hit, pay_costs, spawn_summon};

/// Weapon power multiplier of a power attack.
const POWER_ATTACK_MULTIPLIER: f64 = 1.5;
/// Flat stamina price of a power attack.
const POWER_ATTACK_STAMINA: i32 = 25;
/// Fraction of weapon power a botched roll turns back on the attacker.
const FUMBLE_FRACTION: f64 = 0.25;
/// Bleed wounds opened by axe perks last this many rounds.
const BLEED_ROUNDS: u32 = 2;

/// What the player chose to do this turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlayerActionKind {
    /// A plain weapon strike.
    Attack,
    /// A stamina-fueled heavy strike.
    PowerAttack,
    /// Cast a known spell.
    Magic,
    /// Use a known shout.
    Shout,
    /// Raise the once-per-encounter guard stance.
    Defend,
    /// Consume an item from the inventory.
    Item,
    /// Try to escape the encounter.
    Flee,
    /// Give up.
    Surrender,
    /// Do nothing this turn.
    Skip,
}

impl fmt::Display for PlayerActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Attack => write!(f, "attack"),
            Self::PowerAttack => write!(f, "power attack"),
            Self::Magic => write!(f, "magic"),
            Self::Shout => write!(f, "shout"),
            Self::Defend => write!(f, "defend"),
            Self::Item => write!(f, "item"),
            Self::Flee => write!(f, "flee"),
            Self::Surrender => write!(f, "surrender"),
            Self::Skip => write!(f, "skip"),
        }
    }
}

/// One player action, with optional ability, target, item, and a pinned
/// die value for tests.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerAction {
    /// What to do.
    pub kind: PlayerActionKind,
    /// Ability id for `Magic` and `Shout`.
    pub ability: Option<String>,
    /// Explicit target; offensive actions fall back to the first living
    /// enemy.
    pub target: Option<ActorId>,
    /// Item id for `Item`.
    pub item: Option<String>,
    /// Replaces the d20 for deterministic tests.
    pub roll: Option<u32>,
}

impl PlayerAction {
    fn bare(kind: PlayerActionKind) -> Self {
        Self {
            kind,
            ability: None,
            target: None,
            item: None,
            roll: None,
        }
    }

    /// A plain weapon strike.
    pub fn attack() -> Self {
        Self::bare(PlayerActionKind::Attack)
    }

    /// A stamina-fueled heavy strike.
    pub fn power_attack() -> Self {
        Self::bare(PlayerActionKind::PowerAttack)
    }

    /// Cast a known spell.
    pub fn magic(ability: impl Into<String>) -> Self {
        Self {
            ability: Some(ability.into()),
            ..Self::bare(PlayerActionKind::Magic)
        }
    }

    /// Use a known shout.
    pub fn shout(ability: impl Into<String>) -> Self {
        Self {
            ability: Some(ability.into()),
            ..Self::bare(PlayerActionKind::Shout)
        }
    }

    /// Raise the guard stance.
    pub fn defend() -> Self {
        Self::bare(PlayerActionKind::Defend)
    }

    /// Consume an item.
    pub fn use_item(item: impl Into<String>) -> Self {
        Self {
            item: Some(item.into()),
            ..Self::bare(PlayerActionKind::Item)
        }
    }

    /// Try to escape.
    pub fn flee() -> Self {
        Self::bare(PlayerActionKind::Flee)
    }

    /// Give up.
    pub fn surrender() -> Self {
        Self::bare(PlayerActionKind::Surrender)
    }

    /// Do nothing.
    pub fn skip() -> Self {
        Self::bare(PlayerActionKind::Skip)
    }

    /// Aim at a specific actor.
    pub fn with_target(mut self, target: ActorId) -> Self {
        self.target = Some(target);
        self
    }

    /// Pin the d20 to a value (for tests).
    pub fn with_roll(mut self, natural: u32) -> Self {
        self.roll = Some(natural);
        self
    }
}

/// Read-only player collaborators handed to the executor by the caller.
pub struct PlayerContext<'a> {
    /// Gear-derived combat numbers.
    pub stats: &'a PlayerStats,
    /// Perk ranks, skills, and known magic.
    pub character: &'a Character,
    /// Perk definitions for bonus aggregation.
    pub perks: &'a PerkCatalog,
    /// Inventory, if the caller permits item use this turn.
    pub inventory: Option<&'a mut Inventory>,
}

/// Execute one player action against the current state.
///
/// Gameplay failures (unknown spell, cooldown, nothing to fight) come
/// back as narration with the state otherwise untouched; only structural
/// misuse is an `Err`.
pub fn execute(
    state: &CombatState,
    ctx: PlayerContext<'_>,
    action: &PlayerAction,
    config: &EngineConfig,
    rng: &mut StdRng,
) -> EngineResult<ActionOutcome> {
    if !state.active {
        return Err(EngineError::CombatOver(state.outcome));
    }

    let mut state = state.clone();
    let mut player = ctx.stats.clone();

    // Effects tick before the player acts; a stun eats the whole turn.
    let report = effects::tick(&mut state.player_effects, &mut player.vitals);
    if report.stunned {
        let text = "You are stunned and cannot act.";
        state.log.push(LogEntry::new(state.turn, "You", "stunned", "", text));
        return Ok(ActionOutcome::new(state, player, text));
    }
    if !player.is_alive() {
        let text = "Your wounds overtake you and the world goes dark.";
        state.log.push(LogEntry::new(state.turn, "You", "collapse", "", text));
        return Ok(ActionOutcome::new(state, player, text));
    }
    let prefix = if report.dot_damage > 0 {
        format!("You take {} damage from your wounds. ", report.dot_damage)
    } else {
        String::new()
    };

    let outcome = match action.kind {
        PlayerActionKind::Attack => weapon_strike(state, player, &ctx, action, false, rng),
        PlayerActionKind::PowerAttack => weapon_strike(state, player, &ctx, action, true, rng),
        PlayerActionKind::Magic => cast_spell(state, player, &ctx, action, rng),
        PlayerActionKind::Shout => use_shout(state, player, &ctx, action, rng),
        PlayerActionKind::Defend => defend(state, player, config),
        PlayerActionKind::Item => use_item(state, player, ctx, action),
        PlayerActionKind::Flee => flee(state, player, config, rng),
        PlayerActionKind::Surrender => surrender(state, player),
        PlayerActionKind::Skip => skip(state, player),
    };

    Ok(prepend(outcome, prefix))
}

fn prepend(mut outcome: ActionOutcome, prefix: String) -> ActionOutcome {
    if !prefix.is_empty() {
        outcome.narrative = format!("{prefix}{}", outcome.narrative);
    }
    outcome
}

/// Pick the enemy an offensive action lands on. Ally and player targets
/// are rejected in favor of the first living enemy.
fn offensive_target(state: &CombatState, requested: Option<ActorId>) -> Option<ActorId> {
    match requested {
        Some(id) if state.is_enemy(id) && state.actor(id).is_some_and(|a| a.is_alive()) => {
            Some(id)
        }
        _ => state.first_living_enemy().map(|a| a.id),
    }
}

fn weapon_strike(
    mut state: CombatState,
    mut player: PlayerStats,
    ctx: &PlayerContext<'_>,
    action: &PlayerAction,
    power_attack: bool,
    rng: &mut StdRng,
) -> ActionOutcome {
    if player.weapon_class == WeaponClass::Unarmed && !ctx.character.unarmed_unlocked() {
        let text = "You have not learned to fight with your bare hands yet.";
        return ActionOutcome::new(state, player, text);
    }

    let Some(target_id) = offensive_target(&state, action.target) else {
        return ActionOutcome::new(state, player, "There is no one left to fight.");
    };

    let mut stamina_mult = 1.0;
    let label: &str = if power_attack { "power attack" } else { "attack" };
    if power_attack {
        stamina_mult = pay_costs(&mut player.vitals, &AbilityCost::stamina(POWER_ATTACK_STAMINA));
    }

    // Blade perks sharpen the crit chance before the die is cast.
    let mut crit_chance = player.crit_chance;
    if matches!(player.weapon_class, WeaponClass::Sword | WeaponClass::Greatsword) {
        crit_chance += ctx.perks.bonus(ctx.character, "sword_crit");
    }
    let roll = player_roll(rng, crit_chance, action.roll, ctx.character);

    let mut power = f64::from(effects::effective_damage(
        player.weapon_damage,
        &state.player_effects,
    ));
    if player.weapon_class == WeaponClass::Unarmed {
        power += ctx.perks.bonus(ctx.character, "unarmed_damage");
    }
    if power_attack {
        power *= POWER_ATTACK_MULTIPLIER;
    }
    power *= stamina_mult;
    let base = power.floor() as i32;

    if !roll.hit {
        return resolve_player_miss(state, player, &roll, base, target_id, label);
    }

    let raw = damage::raw_damage(base, player.level, &roll);

    // Blunt weapons punch through a slice of the target's armor.
    let mut armor_pen = 0.0;
    if matches!(player.weapon_class, WeaponClass::Mace | WeaponClass::Warhammer) {
        armor_pen = ctx.perks.bonus(ctx.character, "mace_armor_pen") / 100.0;
    }
    let bleed_chance = if matches!(player.weapon_class, WeaponClass::Axe | WeaponClass::Battleaxe) {
        ctx.perks.bonus(ctx.character, "axe_bleed")
    } else {
        0.0
    };
    let lifesteal = ctx.perks.bonus(ctx.character, "lifesteal");
    let weapon = player.weapon_class;

    let Some(target) = state.actor_mut(target_id) else {
        return ActionOutcome::new(state, player, "There is no one left to fight.");
    };

    let armor = effects::effective_armor(target.armor, &target.active_effects);
    let armor = (f64::from(armor) * (1.0 - armor_pen.clamp(0.0, 1.0))).floor() as i32;
    let dealt = damage::mitigated(raw, armor);
    target.vitals.damage(dealt);

    let mut extras = String::new();
    if bleed_chance > 0.0 && rng.random_range(0.0..100.0) < bleed_chance {
        let wound = (dealt / 4).max(1);
        target.active_effects.push(ActiveEffect::new(Effect::DamageOverTime {
            amount: wound,
            rounds: BLEED_ROUNDS,
        }));
        extras.push_str(" The wound keeps bleeding.");
    }
    let target_name = target.name.clone();
    let felled = !target.is_alive();

    let healed = (f64::from(dealt) * lifesteal / 100.0).floor() as i32;
    if healed > 0 {
        player.vitals.heal(healed);
        extras.push_str(&format!(" You drain {healed} health."));
    }
    if felled {
        extras.push_str(&format!(" The {target_name} collapses!"));
    }

    let location = HitLocation::from_natural(roll.natural);
    let crit_mark = if roll.crit { " Critical hit!" } else { "" };
    let text = format!(
        "Your {weapon} {} the {target_name}'s {location} for {dealt} damage.{crit_mark}{extras}",
        describe_hit(roll.tier),
    );

    state.log.push(
        LogEntry::new(state.turn, "You", label, &target_name, &text).with_roll(RollDetail {
            natural: roll.natural,
            tier: roll.tier.to_string(),
            crit: roll.crit,
            location: location.to_string(),
        }),
    );

    ActionOutcome::new(state, player, text)
}

/// Roll for the player, letting a ranked `steady_hand` perk silently
/// reroll one botch.
fn player_roll(
    rng: &mut StdRng,
    crit_chance: f64,
    natural: Option<u32>,
    character: &Character,
) -> AttackRoll {
    let roll = roll::resolve_attack(rng, crit_chance, 0.0, natural);
    if roll.natural == 1 && character.has_perk("steady_hand") {
        return roll::resolve_attack(rng, crit_chance, 0.0, None);
    }
    roll
}

fn resolve_player_miss(
    mut state: CombatState,
    mut player: PlayerStats,
    roll: &AttackRoll,
    base: i32,
    target_id: ActorId,
    label: &str,
) -> ActionOutcome {
    let target_name = state
        .actor(target_id)
        .map_or_else(|| "enemy".to_string(), |a| a.name.clone());

    let text = if roll.natural == 1 {
        let self_damage = (f64::from(base.max(0)) * FUMBLE_FRACTION).floor() as i32;
        player.vitals.damage(self_damage);
        format!(
            "You fumble the {label} and hurt yourself for {self_damage} damage."
        )
    } else {
        format!("Your {label} misses the {target_name}.")
    };

    state.log.push(
        LogEntry::new(state.turn, "You", label, &target_name, &text).with_roll(RollDetail {
            natural: roll.natural,
            tier: roll.tier.to_string(),
            crit: false,
            location: HitLocation::from_natural(roll.natural).to_string(),
        }),
    );
    ActionOutcome::new(state, player, text)
}

fn cast_spell(
    state: CombatState,
    player: PlayerStats,
    ctx: &PlayerContext<'_>,
    action: &PlayerAction,
    rng: &mut StdRng,
) -> ActionOutcome {
    let Some(id) = action.ability.as_deref() else {
        return ActionOutcome::new(state, player, "You have no spell prepared.");
    };
    let Some(ability) = ctx.character.spell(id) else {
        let text = format!("You don't know any spell called \"{id}\".");
        return ActionOutcome::new(state, player, text);
    };
    let ability = ability.clone();
    cast_ability(state, player, ctx, &ability, action, true, rng)
}

fn use_shout(
    state: CombatState,
    player: PlayerStats,
    ctx: &PlayerContext<'_>,
    action: &PlayerAction,
    rng: &mut StdRng,
) -> ActionOutcome {
    let Some(id) = action.ability.as_deref() else {
        return ActionOutcome::new(state, player, "Your voice needs a word of power.");
    };
    let Some(ability) = ctx.character.shout(id) else {
        let text = format!("You have not learned the shout \"{id}\".");
        return ActionOutcome::new(state, player, text);
    };
    // Shouts are paid in cooldown, never in magicka.
    let ability = ability.clone();
    cast_ability(state, player, ctx, &ability, action, false, rng)
}

fn cast_ability(
    mut state: CombatState,
    mut player: PlayerStats,
    ctx: &PlayerContext<'_>,
    ability: &Ability,
    action: &PlayerAction,
    pay: bool,
    rng: &mut StdRng,
) -> ActionOutcome {
    let remaining = state.cooldown(&ability.id);
    if remaining > 0 {
        let text = format!(
            "{} is not ready yet ({remaining} more {}).",
            ability.name,
            if remaining == 1 { "round" } else { "rounds" }
        );
        return ActionOutcome::new(state, player, text);
    }

    // The summon cap is checked before any resource changes hands, so a
    // fizzled cast costs nothing.
    if let Some(template) = ability.summons() {
        let cap = 1 + ctx.character.rank("twin_souls") as usize;
        if state.active_summons().count() >= cap {
            let text = format!(
                "You cannot bind another ally; the {} fizzles out.",
                template.name
            );
            return ActionOutcome::new(state, player, text);
        }
    }

    let stamina_mult = if pay {
        pay_costs(&mut player.vitals, &ability.cost)
    } else {
        1.0
    };
    state.record_cooldown(&ability.id, ability.cooldown);

    let mut area_hits = Vec::new();
    let mut text;

    if ability.is_offensive() {
        let Some(target_id) = offensive_target(&state, action.target) else {
            return ActionOutcome::new(state, player, "There is no one left to fight.");
        };

        let roll = player_roll(rng, player.crit_chance, action.roll, ctx.character);

        let mut power = f64::from(ability.damage);
        if let Some(element) = ability.element {
            power *= 1.0 + ctx.perks.bonus(ctx.character, element.perk_key()) / 100.0;
        }
        power *= stamina_mult;
        let base = power.floor() as i32;

        if !roll.hit {
            let miss = resolve_player_miss(state, player, &roll, base, target_id, &ability.name);
            return miss;
        }

        let raw = damage::raw_damage(base, player.level, &roll);
        let lifesteal = ctx.perks.bonus(ctx.character, "lifesteal");

        let Some(target) = state.actor_mut(target_id) else {
            return ActionOutcome::new(state, player, "There is no one left to fight.");
        };
        let armor = effects::effective_armor(target.armor, &target.active_effects);
        let dealt = damage::mitigated(raw, armor);
        target.vitals.damage(dealt);

        // Harmful riders land on the target; instants resolve at once.
        for effect in &ability.effects {
            match effect {
                Effect::DamageOverTime { .. }
                | Effect::Debuff { .. }
                | Effect::Slow { .. }
                | Effect::Stun { .. }
                | Effect::Drain { .. } => {
                    target.active_effects.push(ActiveEffect::new(effect.clone()));
                }
                _ => {}
            }
        }

        let target_name = target.name.clone();
        let felled = !target.is_alive();
        let location = HitLocation::from_natural(roll.natural);

        let mut extras = String::new();
        let healed = (f64::from(dealt) * lifesteal / 100.0).floor() as i32;
        if healed > 0 {
            player.vitals.heal(healed);
            extras.push_str(&format!(" You drain {healed} health."));
        }
        if ability.heal > 0 {
            player.vitals.heal(ability.heal);
            extras.push_str(&format!(" You recover {} health.", ability.heal));
        }
        if felled {
            extras.push_str(&format!(" The {target_name} collapses!"));
        }

        let crit_mark = if roll.crit { " Critical hit!" } else { "" };
        text = format!(
            "{} {} the {target_name}'s {location} for {dealt} damage.{crit_mark}{extras}",
            ability.name,
            describe_hit(roll.tier),
        );

        for effect in &ability.effects {
            if let Effect::AreaDamage { amount } = effect {
                let hits = effects::area_damage(&mut state.enemies, *amount);
                for hit in &hits {
                    text.push_str(&format!(" {} is caught for {}.", hit.name, hit.amount));
                }
                area_hits.extend(hits);
            }
        }

        state.log.push(
            LogEntry::new(state.turn, "You", &ability.name, &target_name, &text).with_roll(
                RollDetail {
                    natural: roll.natural,
                    tier: roll.tier.to_string(),
                    crit: roll.crit,
                    location: location.to_string(),
                },
            ),
        );
    } else {
        // Supportive cast: heal, buff, or summon. Defaults to the caster
        // unless a living ally is named.
        let ally_target = action
            .target
            .filter(|id| !id.is_player())
            .filter(|id| state.allies.iter().any(|a| a.id == *id && a.is_alive()));

        text = format!("You use {}.", ability.name);

        if ability.heal > 0 {
            match ally_target {
                Some(id) => {
                    if let Some(ally) = state.actor_mut(id) {
                        ally.vitals.heal(ability.heal);
                        text = format!(
                            "You mend {} for {} health with {}.",
                            ally.name, ability.heal, ability.name
                        );
                    }
                }
                None => {
                    player.vitals.heal(ability.heal);
                    text = format!(
                        "You restore {} health with {}.",
                        ability.heal, ability.name
                    );
                }
            }
        }

        for effect in &ability.effects {
            match effect {
                Effect::Heal { amount } => match ally_target {
                    Some(id) => {
                        if let Some(ally) = state.actor_mut(id) {
                            ally.vitals.heal(*amount);
                        }
                    }
                    None => {
                        player.vitals.heal(*amount);
                    }
                },
                Effect::Buff { .. } => match ally_target {
                    Some(id) => {
                        if let Some(ally) = state.actor_mut(id) {
                            ally.active_effects.push(ActiveEffect::new(effect.clone()));
                        }
                    }
                    None => state.player_effects.push(ActiveEffect::new(effect.clone())),
                },
                Effect::AreaHeal { amount } => {
                    player.vitals.heal(*amount);
                    let hits = effects::area_heal(&mut state.allies, *amount);
                    for hit in &hits {
                        text.push_str(&format!(" {} recovers {}.", hit.name, hit.amount));
                    }
                    area_hits.extend(hits);
                }
                Effect::Summon { template } => {
                    let mut summon =
                        spawn_summon(template, ActorId::PLAYER, player.level, rng);
                    summon.companion = Some(CompanionMeta::summoned(&ability.id));
                    let summon_id = summon.id;
                    let summon_name = summon.name.clone();

                    if state.add_ally(summon).is_ok() {
                        state.pending_summons.insert(summon_id, template.lifetime);
                        // Summons act right after the player.
                        let at = state
                            .turn_order
                            .iter()
                            .position(ActorId::is_player)
                            .map_or(state.turn_order.len(), |i| i + 1);
                        state.turn_order.insert(at, summon_id);
                        text = format!("The {summon_name} answers your call.");
                    }
                }
                _ => {}
            }
        }

        state.log.push(LogEntry::new(state.turn, "You", &ability.name, "", &text));
    }

    let mut outcome = ActionOutcome::new(state, player, text);
    outcome.area_hits = area_hits;
    outcome
}

fn defend(mut state: CombatState, player: PlayerStats, config: &EngineConfig) -> ActionOutcome {
    if state.guard_used {
        let text = "Your guard is already spent for this fight.";
        return ActionOutcome::new(state, player, text);
    }
    state.player_defending = true;
    state.guard_rounds = config.guard_duration;
    state.guard_used = true;
    let text = format!(
        "You brace into a guard stance, blunting blows for {} rounds.",
        config.guard_duration
    );
    state.log.push(LogEntry::new(state.turn, "You", "defend", "", &text));
    ActionOutcome::new(state, player, text)
}

fn use_item(
    mut state: CombatState,
    mut player: PlayerStats,
    ctx: PlayerContext<'_>,
    action: &PlayerAction,
) -> ActionOutcome {
    let Some(item_id) = action.item.as_deref() else {
        return ActionOutcome::new(state, player, "Use what?");
    };
    let Some(inventory) = ctx.inventory else {
        return ActionOutcome::new(state, player, "You are not carrying anything useful.");
    };
    let Some(item) = inventory.get(item_id) else {
        let text = format!("You don't have a \"{item_id}\".");
        return ActionOutcome::new(state, player, text);
    };
    if !item.usable_in_combat() {
        let text = format!("The {} is no use in a fight.", item.name);
        return ActionOutcome::new(state, player, text);
    }

    // Checked above, so the consume cannot miss.
    let Some(item) = inventory.consume(item_id) else {
        let text = format!("You don't have a \"{item_id}\".");
        return ActionOutcome::new(state, player, text);
    };

    let text = match item.kind {
        ItemKind::Potion {
            health,
            magicka,
            stamina,
        } => {
            player.vitals.heal(health);
            if let Some(pool) = player.vitals.magicka.as_mut() {
                pool.adjust(magicka);
            }
            if let Some(pool) = player.vitals.stamina.as_mut() {
                pool.adjust(stamina);
            }
            let mut parts = Vec::new();
            if health > 0 {
                parts.push(format!("{health} health"));
            }
            if magicka > 0 {
                parts.push(format!("{magicka} magicka"));
            }
            if stamina > 0 {
                parts.push(format!("{stamina} stamina"));
            }
            if parts.is_empty() {
                format!("You drink the {} to no effect.", item.name)
            } else {
                format!("You drink the {}, restoring {}.", item.name, parts.join(", "))
            }
        }
        ItemKind::Food {
            heal,
            hunger,
            thirst,
        } => {
            player.vitals.heal(heal);
            player
                .survival
                .apply(&SurvivalDelta::new(-hunger, -thirst, 0.0));
            format!("You wolf down the {} mid-fight.", item.name)
        }
        ItemKind::Other => format!("The {} is no use in a fight.", item.name),
    };

    state.log.push(LogEntry::new(state.turn, "You", "item", &item.name, &text));
    ActionOutcome::new(state, player, text)
}

fn flee(
    mut state: CombatState,
    player: PlayerStats,
    config: &EngineConfig,
    rng: &mut StdRng,
) -> ActionOutcome {
    if !state.flee_allowed {
        let text = "There is no way out of this fight.";
        return ActionOutcome::new(state, player, text);
    }

    let dodge = effects::effective_dodge(player.dodge, &state.player_effects);
    let chance = (config.flee_base_chance + dodge / 200.0).min(config.flee_chance_cap);

    let text = if rng.random_range(0.0..1.0) < chance {
        state.finish(CombatOutcome::Fled);
        "You break away and escape the fight!"
    } else {
        "You look for an opening but cannot get away!"
    };
    state.log.push(LogEntry::new(state.turn, "You", "flee", "", text));
    ActionOutcome::new(state, player, text)
}

fn surrender(mut state: CombatState, player: PlayerStats) -> ActionOutcome {
    if !state.surrender_allowed {
        let text = "These foes will accept no surrender.";
        return ActionOutcome::new(state, player, text);
    }
    state.finish(CombatOutcome::Surrendered);
    let text = "You lower your weapon and yield.";
    state.log.push(LogEntry::new(state.turn, "You", "surrender", "", text));
    ActionOutcome::new(state, player, text)
}

fn skip(mut state: CombatState, player: PlayerStats) -> ActionOutcome {
    let text = "You hold your ground and watch.";
    state.log.push(LogEntry::new(state.turn, "You", "skip", "", text));
    ActionOutcome::new(state, player, text)
}

#[cfg(test)]
mod tests {
    use fm_core::ability::{AbilityKind, Element};
    use fm_core::actor::{Actor, CreatureKind, Pool};
    use fm_core::effect::SummonTemplate;
    use fm_core::item::CombatItem;
    use fm_core::perk::Perk;
    use rand::SeedableRng;

    use super::*;

    fn wolf() -> Actor {
        Actor::new("wolf", CreatureKind::Beast, 1, 100, 0, 8)
    }

    fn arena() -> CombatState {
        let mut state = CombatState::new("Frostmarch Pass");
        state.add_enemy(wolf()).unwrap();
        let enemy = state.enemies[0].id;
        state.turn_order = vec![ActorId::PLAYER, enemy];
        state
    }

    fn fighter() -> PlayerStats {
        PlayerStats::new(1).with_crit_chance(0.0)
    }

    fn catalog(perk: Perk) -> PerkCatalog {
        let mut perks = PerkCatalog::new();
        perks.register(perk);
        perks
    }

    fn run(
        state: &CombatState,
        stats: &PlayerStats,
        character: &Character,
        perks: &PerkCatalog,
        inventory: Option<&mut Inventory>,
        action: &PlayerAction,
        seed: u64,
    ) -> ActionOutcome {
        let mut rng = StdRng::seed_from_u64(seed);
        let ctx = PlayerContext {
            stats,
            character,
            perks,
            inventory,
        };
        execute(state, ctx, action, &EngineConfig::default(), &mut rng).unwrap()
    }

    #[test]
    fn pinned_roll_lands_expected_damage() {
        let state = arena();
        let action = PlayerAction::attack().with_roll(15);
        let out = run(
            &state,
            &fighter(),
            &Character::new(),
            &PerkCatalog::new(),
            None,
            &action,
            7,
        );

        // 10 weapon damage at the 1.25 tier, no armor on the wolf.
        assert_eq!(out.state.enemies[0].vitals.health.current, 88);
        assert!(out.narrative.contains("12 damage"), "{}", out.narrative);
        let entry = out.state.log.last().unwrap();
        assert_eq!(entry.roll.as_ref().unwrap().natural, 15);
    }

    #[test]
    fn natural_one_hurts_the_attacker() {
        let state = arena();
        let action = PlayerAction::attack().with_roll(1);
        let out = run(
            &state,
            &fighter(),
            &Character::new(),
            &PerkCatalog::new(),
            None,
            &action,
            7,
        );

        assert!(out.narrative.contains("fumble"), "{}", out.narrative);
        assert_eq!(out.player.vitals.health.current, 98);
        assert_eq!(out.state.enemies[0].vitals.health.current, 100);
    }

    #[test]
    fn steady_hand_rerolls_most_botches() {
        let character = Character::new().with_perk("steady_hand", 1);
        let action = PlayerAction::attack().with_roll(1);
        let mut fumbles = 0;
        for seed in 0..200 {
            let state = arena();
            let out = run(
                &state,
                &fighter(),
                &character,
                &PerkCatalog::new(),
                None,
                &action,
                seed,
            );
            if out.narrative.contains("fumble") {
                fumbles += 1;
            }
        }
        // Only a rerolled 1 still fumbles, so roughly 1 in 20 trials.
        assert!(fumbles < 60, "fumbled {fumbles} of 200 rerolled botches");
    }

    #[test]
    fn power_attack_spends_stamina_and_hits_harder() {
        let state = arena();
        let action = PlayerAction::power_attack().with_roll(10);
        let out = run(
            &state,
            &fighter(),
            &Character::new(),
            &PerkCatalog::new(),
            None,
            &action,
            7,
        );

        assert_eq!(out.state.enemies[0].vitals.health.current, 85);
        assert_eq!(out.player.vitals.stamina.unwrap().current, 25);
    }

    #[test]
    fn empty_stamina_weakens_power_attacks() {
        let state = arena();
        let mut stats = fighter();
        stats.vitals.stamina = Some(Pool {
            current: 0,
            max: 50,
        });
        let action = PlayerAction::power_attack().with_roll(10);
        let out = run(
            &state,
            &stats,
            &Character::new(),
            &PerkCatalog::new(),
            None,
            &action,
            7,
        );

        // Floored at a quarter of full power: 15 becomes 3.
        assert_eq!(out.state.enemies[0].vitals.health.current, 97);
    }

    #[test]
    fn defend_is_single_use() {
        let state = arena();
        let action = PlayerAction::defend();
        let out = run(
            &state,
            &fighter(),
            &Character::new(),
            &PerkCatalog::new(),
            None,
            &action,
            7,
        );
        assert!(out.state.player_defending);
        assert_eq!(out.state.guard_rounds, EngineConfig::default().guard_duration);
        assert!(out.state.guard_used);

        let again = run(
            &out.state,
            &fighter(),
            &Character::new(),
            &PerkCatalog::new(),
            None,
            &action,
            7,
        );
        assert!(again.narrative.contains("already spent"), "{}", again.narrative);
    }

    #[test]
    fn potion_restores_health_and_is_consumed() {
        let state = arena();
        let mut stats = fighter();
        stats.vitals.damage(40);
        let mut inventory = Inventory::new();
        inventory.add(CombatItem::potion("healing_draught", "Healing Draught", 25, 0, 0), 1);

        let action = PlayerAction::use_item("healing_draught");
        let out = run(
            &state,
            &stats,
            &Character::new(),
            &PerkCatalog::new(),
            Some(&mut inventory),
            &action,
            7,
        );

        assert_eq!(out.player.vitals.health.current, 85);
        assert_eq!(inventory.count("healing_draught"), 0);
    }

    #[test]
    fn food_feeds_as_well_as_heals() {
        let state = arena();
        let mut stats = fighter();
        stats.vitals.damage(30);
        stats.survival.hunger = 50.0;
        let mut inventory = Inventory::new();
        inventory.add(CombatItem::food("dried_elk", "Dried Elk", 10, 15.0, 0.0), 2);

        let action = PlayerAction::use_item("dried_elk");
        let out = run(
            &state,
            &stats,
            &Character::new(),
            &PerkCatalog::new(),
            Some(&mut inventory),
            &action,
            7,
        );

        assert_eq!(out.player.vitals.health.current, 80);
        assert_eq!(out.player.survival.hunger, 35.0);
        assert_eq!(inventory.count("dried_elk"), 1);
    }

    #[test]
    fn missing_items_are_narrated() {
        let state = arena();
        let mut inventory = Inventory::new();
        let action = PlayerAction::use_item("healing_draught");
        let out = run(
            &state,
            &fighter(),
            &Character::new(),
            &PerkCatalog::new(),
            Some(&mut inventory),
            &action,
            7,
        );
        assert!(out.narrative.contains("don't have"), "{}", out.narrative);
    }

    #[test]
    fn unknown_spell_is_narrated() {
        let state = arena();
        let action = PlayerAction::magic("firebolt");
        let out = run(
            &state,
            &fighter(),
            &Character::new(),
            &PerkCatalog::new(),
            None,
            &action,
            7,
        );
        assert!(out.narrative.contains("don't know"), "{}", out.narrative);
        assert_eq!(out.state.enemies[0].vitals.health.current, 100);
    }

    fn firebolt() -> Ability {
        Ability::new("firebolt", "Firebolt", AbilityKind::Magic, 30)
            .with_cost(AbilityCost::magicka(20))
            .with_cooldown(2)
            .with_element(Element::Fire)
    }

    #[test]
    fn spells_pay_magicka_and_start_cooldowns() {
        let state = arena();
        let character = Character::new().with_spell(firebolt());
        let action = PlayerAction::magic("firebolt").with_roll(10);
        let out = run(
            &state,
            &fighter(),
            &character,
            &PerkCatalog::new(),
            None,
            &action,
            7,
        );

        assert_eq!(out.state.enemies[0].vitals.health.current, 70);
        assert_eq!(out.player.vitals.magicka.unwrap().current, 30);
        assert_eq!(out.state.cooldown("firebolt"), 2);
    }

    #[test]
    fn cooldowns_block_recasting() {
        let mut state = arena();
        state.record_cooldown("firebolt", 2);
        let character = Character::new().with_spell(firebolt());
        let action = PlayerAction::magic("firebolt").with_roll(10);
        let out = run(
            &state,
            &fighter(),
            &character,
            &PerkCatalog::new(),
            None,
            &action,
            7,
        );

        assert!(out.narrative.contains("not ready"), "{}", out.narrative);
        assert_eq!(out.state.enemies[0].vitals.health.current, 100);
        assert_eq!(out.player.vitals.magicka.unwrap().current, 50);
    }

    #[test]
    fn elemental_perks_scale_spell_damage() {
        let state = arena();
        let character = Character::new()
            .with_spell(firebolt())
            .with_perk("flames_adept", 1);
        let perks = catalog(Perk::new("flames_adept", "Flames Adept", 1).with_bonus(
            "fire_damage",
            25.0,
        ));
        let action = PlayerAction::magic("firebolt").with_roll(10);
        let out = run(&state, &fighter(), &character, &perks, None, &action, 7);

        // 30 base damage boosted a quarter and floored.
        assert_eq!(out.state.enemies[0].vitals.health.current, 63);
    }

    #[test]
    fn healing_defaults_to_the_caster() {
        let state = arena();
        let mut stats = fighter();
        stats.vitals.damage(40);
        let spell = Ability::new("close_wounds", "Close Wounds", AbilityKind::Utility, 0)
            .with_cost(AbilityCost::magicka(15))
            .with_heal(25);
        let character = Character::new().with_spell(spell);
        let action = PlayerAction::magic("close_wounds");
        let out = run(
            &state,
            &stats,
            &character,
            &PerkCatalog::new(),
            None,
            &action,
            7,
        );

        assert_eq!(out.player.vitals.health.current, 85);
        assert_eq!(out.player.vitals.magicka.unwrap().current, 35);
    }

    fn binding_spell() -> Ability {
        let template = SummonTemplate::new("Spirit Wolf", CreatureKind::Beast, 40, 10, 8, 3);
        Ability::new("bind_spirit", "Bind Spirit", AbilityKind::Magic, 0)
            .with_cost(AbilityCost::magicka(30))
            .with_effect(Effect::Summon { template })
    }

    #[test]
    fn summons_join_the_turn_order() {
        let state = arena();
        let character = Character::new().with_spell(binding_spell());
        let action = PlayerAction::magic("bind_spirit");
        let out = run(
            &state,
            &fighter(),
            &character,
            &PerkCatalog::new(),
            None,
            &action,
            7,
        );

        assert_eq!(out.state.allies.len(), 1);
        let summon = &out.state.allies[0];
        assert!(summon.is_summon());
        assert_eq!(out.state.turn_order[1], summon.id);
        assert_eq!(out.state.pending_summons.get(&summon.id), Some(&3));
        assert_eq!(out.player.vitals.magicka.unwrap().current, 20);
    }

    #[test]
    fn summon_cap_fizzles_before_any_cost() {
        let state = arena();
        let character = Character::new().with_spell(binding_spell());
        let action = PlayerAction::magic("bind_spirit");
        let first = run(
            &state,
            &fighter(),
            &character,
            &PerkCatalog::new(),
            None,
            &action,
            7,
        );

        let second = run(
            &first.state,
            &first.player,
            &character,
            &PerkCatalog::new(),
            None,
            &action,
            8,
        );

        assert!(second.narrative.contains("fizzles"), "{}", second.narrative);
        assert_eq!(second.state.allies.len(), 1);
        // A fizzled binding costs no magicka.
        assert_eq!(second.player.vitals.magicka.unwrap().current, 20);
    }

    #[test]
    fn twin_souls_raises_the_cap() {
        let state = arena();
        let character = Character::new()
            .with_spell(binding_spell())
            .with_perk("twin_souls", 1);
        let action = PlayerAction::magic("bind_spirit");
        let first = run(
            &state,
            &fighter(),
            &character,
            &PerkCatalog::new(),
            None,
            &action,
            7,
        );
        let second = run(
            &first.state,
            &first.player,
            &character,
            &PerkCatalog::new(),
            None,
            &action,
            8,
        );

        assert_eq!(second.state.allies.len(), 2);
    }

    #[test]
    fn flee_can_be_forbidden() {
        let mut state = arena();
        state.flee_allowed = false;
        let action = PlayerAction::flee();
        let out = run(
            &state,
            &fighter(),
            &Character::new(),
            &PerkCatalog::new(),
            None,
            &action,
            7,
        );

        assert!(out.state.active);
        assert!(out.narrative.contains("no way out"), "{}", out.narrative);
    }

    #[test]
    fn flee_rate_tracks_the_configured_chance() {
        let action = PlayerAction::flee();
        let mut escapes = 0;
        for seed in 0..300 {
            let state = arena();
            let out = run(
                &state,
                &fighter(),
                &Character::new(),
                &PerkCatalog::new(),
                None,
                &action,
                seed,
            );
            if out.state.outcome == CombatOutcome::Fled {
                escapes += 1;
            }
        }
        // Base 0.5 plus a sliver of dodge. Wide margins, no flakes.
        assert!((100..=215).contains(&escapes), "escaped {escapes} of 300");
    }

    #[test]
    fn surrender_needs_a_willing_foe() {
        let state = arena();
        let refused = run(
            &state,
            &fighter(),
            &Character::new(),
            &PerkCatalog::new(),
            None,
            &PlayerAction::surrender(),
            7,
        );
        assert!(refused.state.active);

        let mut state = arena();
        state.surrender_allowed = true;
        let accepted = run(
            &state,
            &fighter(),
            &Character::new(),
            &PerkCatalog::new(),
            None,
            &PlayerAction::surrender(),
            7,
        );
        assert_eq!(accepted.state.outcome, CombatOutcome::Surrendered);
        assert!(!accepted.state.active);
    }

    #[test]
    fn unarmed_strikes_need_training() {
        let state = arena();
        let stats = fighter().with_weapon(6, WeaponClass::Unarmed);
        let action = PlayerAction::attack().with_roll(10);

        let locked = run(
            &state,
            &stats,
            &Character::new(),
            &PerkCatalog::new(),
            None,
            &action,
            7,
        );
        assert!(locked.narrative.contains("bare hands"), "{}", locked.narrative);
        assert_eq!(locked.state.enemies[0].vitals.health.current, 100);

        let trained = Character::new().with_skill("unarmed", 5);
        let open = run(&state, &stats, &trained, &PerkCatalog::new(), None, &action, 7);
        assert_eq!(open.state.enemies[0].vitals.health.current, 94);
    }

    #[test]
    fn axe_perks_open_bleeding_wounds() {
        let state = arena();
        let stats = fighter().with_weapon(10, WeaponClass::Axe);
        let character = Character::new().with_perk("hack_and_slash", 1);
        let perks = catalog(Perk::new("hack_and_slash", "Hack and Slash", 1).with_bonus(
            "axe_bleed",
            100.0,
        ));
        let action = PlayerAction::attack().with_roll(10);
        let out = run(&state, &stats, &character, &perks, None, &action, 7);

        assert!(out.narrative.contains("bleeding"), "{}", out.narrative);
        let wolf = &out.state.enemies[0];
        assert_eq!(wolf.vitals.health.current, 90);
        assert!(matches!(
            wolf.active_effects[0].effect,
            Effect::DamageOverTime { amount: 2, rounds: 2 }
        ));
    }

    #[test]
    fn mace_perks_punch_through_armor() {
        let mut state = CombatState::new("Frostmarch Pass");
        state
            .add_enemy(Actor::new("guard", CreatureKind::Humanoid, 1, 100, 100, 8))
            .unwrap();
        let stats = fighter().with_weapon(40, WeaponClass::Mace);
        let action = PlayerAction::attack().with_roll(10);

        let plain = run(
            &state,
            &stats,
            &Character::new(),
            &PerkCatalog::new(),
            None,
            &action,
            7,
        );
        assert_eq!(plain.state.enemies[0].vitals.health.current, 80);

        let character = Character::new().with_perk("skull_crusher", 2);
        let perks = catalog(Perk::new("skull_crusher", "Skull Crusher", 2).with_bonus(
            "mace_armor_pen",
            15.0,
        ));
        let pierced = run(&state, &stats, &character, &perks, None, &action, 7);
        assert_eq!(pierced.state.enemies[0].vitals.health.current, 77);
    }

    #[test]
    fn lifesteal_returns_a_cut_of_damage() {
        let state = arena();
        let mut stats = fighter();
        stats.vitals.damage(20);
        let character = Character::new().with_perk("vampiric_strikes", 1);
        let perks = catalog(Perk::new("vampiric_strikes", "Vampiric Strikes", 1).with_bonus(
            "lifesteal",
            10.0,
        ));
        let action = PlayerAction::attack().with_roll(15);
        let out = run(&state, &stats, &character, &perks, None, &action, 7);

        // 12 dealt, a tenth drained back and floored.
        assert_eq!(out.player.vitals.health.current, 81);
    }

    #[test]
    fn stunned_players_lose_the_turn() {
        let mut state = arena();
        state
            .player_effects
            .push(ActiveEffect::new(Effect::Stun { rounds: 1 }));
        let action = PlayerAction::attack().with_roll(15);
        let out = run(
            &state,
            &fighter(),
            &Character::new(),
            &PerkCatalog::new(),
            None,
            &action,
            7,
        );

        assert!(out.narrative.contains("stunned"), "{}", out.narrative);
        assert_eq!(out.state.enemies[0].vitals.health.current, 100);
        assert!(out.state.player_effects.is_empty());
    }

    #[test]
    fn finished_combat_rejects_actions() {
        let mut state = arena();
        state.finish(CombatOutcome::Victory);
        let mut rng = StdRng::seed_from_u64(7);
        let stats = fighter();
        let character = Character::new();
        let perks = PerkCatalog::new();
        let ctx = PlayerContext {
            stats: &stats,
            character: &character,
            perks: &perks,
            inventory: None,
        };
        let err = execute(
            &state,
            ctx,
            &PlayerAction::attack(),
            &EngineConfig::default(),
            &mut rng,
        )
        .unwrap_err();
        assert!(matches!(err, EngineError::CombatOver(CombatOutcome::Victory)));
    }
}
