//! Stock content: minion templates, common abilities, sample enemies,
//! and the standard perk catalog the resolver keys against.

use fm_core::ability::{Ability, AbilityCost, AbilityKind, Element};
use fm_core::actor::{Actor, Behavior, CreatureKind};
use fm_core::effect::{BuffStat, Effect, SummonTemplate};
use fm_core::item::CombatItem;
use fm_core::perk::{Perk, PerkCatalog};

/// A level-appropriate minion for a boss of the given kind.
///
/// Stats grow linearly with level so attached minions stay a threat
/// without upstaging their boss.
pub fn minion_for(kind: CreatureKind, level: u32) -> Actor {
    let name = match kind {
        CreatureKind::Humanoid => "bandit",
        CreatureKind::Beast => "wolf",
        CreatureKind::Undead => "skeleton",
        CreatureKind::Demon => "imp",
        CreatureKind::Automaton => "clockwork spider",
        CreatureKind::Dragon => "drake",
    };
    let health = 20 + (level as i32) * 6;
    let armor = (level as i32) * 2;
    let damage = 4 + level as i32;
    Actor::new(name, kind, level, health, armor, damage)
        .with_ability(strike(damage))
        .with_rewards(5 + level * 3, level * 2)
}

fn strike(damage: i32) -> Ability {
    Ability::new("strike", "Strike", AbilityKind::Melee, damage)
}

/// A basic melee slash.
pub fn slash(damage: i32) -> Ability {
    Ability::new("slash", "Slash", AbilityKind::Melee, damage)
}

/// The classic opener: fire damage, moderate cost, short cooldown.
pub fn firebolt() -> Ability {
    Ability::new("firebolt", "Firebolt", AbilityKind::Magic, 25)
        .with_cost(AbilityCost::magicka(20))
        .with_cooldown(1)
        .with_element(Element::Fire)
}

/// Frost damage that chills the target's footwork.
pub fn frost_spike() -> Ability {
    Ability::new("frost_spike", "Frost Spike", AbilityKind::Magic, 18)
        .with_cost(AbilityCost::magicka(16))
        .with_element(Element::Frost)
        .with_effect(Effect::Slow {
            amount: 20,
            rounds: 2,
        })
}

/// Self-heal in the thick of it.
pub fn close_wounds() -> Ability {
    Ability::new("close_wounds", "Close Wounds", AbilityKind::Utility, 0)
        .with_cost(AbilityCost::magicka(18))
        .with_heal(25)
}

/// Bind a spirit wolf to fight alongside the caster for a few rounds.
pub fn bind_spirit() -> Ability {
    let template = SummonTemplate::new("spirit wolf", CreatureKind::Beast, 40, 10, 9, 3);
    Ability::new("bind_spirit", "Bind Spirit", AbilityKind::Magic, 0)
        .with_cost(AbilityCost::magicka(35))
        .with_cooldown(2)
        .with_effect(Effect::Summon { template })
}

/// A shout that staggers everything in front of the player.
pub fn unrelenting_howl() -> Ability {
    Ability::new("unrelenting_howl", "Unrelenting Howl", AbilityKind::AreaHybrid, 12)
        .with_cooldown(3)
        .with_effect(Effect::AreaDamage { amount: 8 })
}

/// A sample brigand scaled to the given level.
pub fn bandit(level: u32) -> Actor {
    let damage = 6 + level as i32;
    Actor::new(
        "bandit",
        CreatureKind::Humanoid,
        level,
        30 + (level as i32) * 8,
        5 + (level as i32) * 2,
        damage,
    )
    .with_ability(slash(damage))
    .with_behavior(Behavior::Aggressive)
    .with_rewards(10 + level * 5, 8 + level * 3)
    .with_loot("septims", 0.8)
    .with_loot("iron sword", 0.25)
}

/// A sample beast with a bleeding bite.
pub fn wolf(level: u32) -> Actor {
    let damage = 5 + level as i32;
    Actor::new(
        "wolf",
        CreatureKind::Beast,
        level,
        24 + (level as i32) * 6,
        2 + level as i32,
        damage,
    )
    .with_ability(
        Ability::new("bite", "Bite", AbilityKind::Melee, damage).with_effect(
            Effect::DamageOverTime {
                amount: 2,
                rounds: 2,
            },
        ),
    )
    .with_behavior(Behavior::Tactical)
    .with_rewards(8 + level * 4, 0)
    .with_loot("wolf pelt", 0.9)
}

/// A sample boss: an undead summoner who raises thralls when pressed.
pub fn necromancer(level: u32) -> Actor {
    let bolt = Ability::new("shadow_bolt", "Shadow Bolt", AbilityKind::Magic, 14 + level as i32)
        .with_cost(AbilityCost::magicka(15));
    let thrall = SummonTemplate::new(
        "risen thrall",
        CreatureKind::Undead,
        20 + (level as i32) * 4,
        4,
        5 + level as i32,
        0,
    );
    let raise = Ability::new("raise_dead", "Raise Dead", AbilityKind::Magic, 0)
        .with_cost(AbilityCost::magicka(25))
        .with_effect(Effect::Summon { template: thrall });
    let ward = Ability::new("bone_ward", "Bone Ward", AbilityKind::Utility, 0).with_effect(
        Effect::Buff {
            stat: BuffStat::Armor,
            amount: 10,
            rounds: 3,
        },
    );

    Actor::new(
        "necromancer",
        CreatureKind::Undead,
        level,
        60 + (level as i32) * 10,
        10 + (level as i32) * 2,
        8 + level as i32,
    )
    .with_magicka(80)
    .with_boss()
    .with_ability(bolt)
    .with_ability(raise)
    .with_ability(ward)
    .with_behavior(Behavior::Aggressive)
    .with_rewards(60 + level * 10, 40 + level * 5)
    .with_loot("grand soul gem", 0.5)
    .with_loot("ritual robes", 1.0)
}

/// The perks the combat resolver keys against.
pub fn standard_perks() -> PerkCatalog {
    let mut catalog = PerkCatalog::new();
    catalog.register(Perk::new("twin_souls", "Twin Souls", 2));
    catalog.register(Perk::new("steady_hand", "Steady Hand", 1));
    catalog.register(Perk::new("deep_wounds", "Deep Wounds", 3).with_bonus("sword_crit", 5.0));
    catalog.register(
        Perk::new("skull_crusher", "Skull Crusher", 2).with_bonus("mace_armor_pen", 15.0),
    );
    catalog.register(
        Perk::new("hack_and_slash", "Hack and Slash", 3).with_bonus("axe_bleed", 10.0),
    );
    catalog.register(
        Perk::new("unarmed_mastery", "Unarmed Mastery", 2).with_bonus("unarmed_damage", 8.0),
    );
    catalog.register(
        Perk::new("vampiric_strikes", "Vampiric Strikes", 2).with_bonus("lifesteal", 5.0),
    );
    catalog.register(Perk::new("flames_adept", "Flames Adept", 3).with_bonus("fire_damage", 10.0));
    catalog.register(
        Perk::new("winters_grasp", "Winter's Grasp", 3).with_bonus("frost_damage", 10.0),
    );
    catalog.register(Perk::new("storm_caller", "Storm Caller", 3).with_bonus("shock_damage", 10.0));
    catalog
}

/// A stock healing potion.
pub fn healing_draught() -> CombatItem {
    CombatItem::potion("healing_draught", "Healing Draught", 30, 0, 0)
}

/// A stock magicka potion.
pub fn spellwine() -> CombatItem {
    CombatItem::potion("spellwine", "Spellwine", 0, 35, 0)
}

/// Travel rations that take the edge off hunger mid-fight.
pub fn dried_elk() -> CombatItem {
    CombatItem::food("dried_elk", "Dried Elk", 8, 20.0, 0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minions_match_their_boss_kind() {
        assert_eq!(minion_for(CreatureKind::Undead, 4).name, "skeleton");
        assert_eq!(minion_for(CreatureKind::Dragon, 4).name, "drake");
        assert_eq!(minion_for(CreatureKind::Automaton, 4).name, "clockwork spider");
    }

    #[test]
    fn minions_scale_with_level() {
        let low = minion_for(CreatureKind::Beast, 1);
        let high = minion_for(CreatureKind::Beast, 10);
        assert!(high.vitals.health.max > low.vitals.health.max);
        assert!(high.base_damage > low.base_damage);
    }

    #[test]
    fn the_standard_catalog_carries_the_resolver_keys() {
        let catalog = standard_perks();
        let character = fm_core::player::Character::new()
            .with_perk("deep_wounds", 2)
            .with_perk("flames_adept", 1);
        assert_eq!(catalog.bonus(&character, "sword_crit"), 10.0);
        assert_eq!(catalog.bonus(&character, "fire_damage"), 10.0);
        assert_eq!(catalog.bonus(&character, "lifesteal"), 0.0);
    }

    #[test]
    fn the_necromancer_is_a_summoner_boss() {
        let boss = necromancer(8);
        assert!(boss.boss);
        assert!(boss.abilities.iter().any(|a| a.summons().is_some()));
    }
}
