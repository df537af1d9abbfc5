//! Turn executors for the player, enemies, and companions.
//!
//! Every executor takes the previous [`CombatState`] by reference and
//! returns a fresh copy plus narration. Shared plumbing (cost payment,
//! summon spawning, tier flavor) lives here.

/// The companion turn executor.
pub mod companion;
/// The enemy turn executor.
pub mod enemy;
/// The player turn executor.
pub mod player;

use fm_core::ability::{Ability, AbilityCost, AbilityKind};
use fm_core::actor::{Actor, ActorId, Vitals};
use fm_core::effect::SummonTemplate;
use fm_core::player::PlayerStats;
use fm_core::state::CombatState;
use rand::Rng;
use rand::rngs::StdRng;

use crate::effects::AreaHit;
use crate::roll::RollTier;

/// Weakest an action can get when stamina runs dry.
pub const STAMINA_FLOOR: f64 = 0.25;

/// What a player or enemy action produced.
#[derive(Debug, Clone)]
pub struct ActionOutcome {
    /// The new authoritative combat state.
    pub state: CombatState,
    /// The player's updated numbers.
    pub player: PlayerStats,
    /// Human-readable account of the action.
    pub narrative: String,
    /// Per-recipient summary when an area effect fired.
    pub area_hits: Vec<AreaHit>,
}

impl ActionOutcome {
    /// Bundle an outcome with no area hits.
    pub fn new(state: CombatState, player: PlayerStats, narrative: impl Into<String>) -> Self {
        Self {
            state,
            player,
            narrative: narrative.into(),
            area_hits: Vec::new(),
        }
    }
}

/// Pay an ability's costs out of the given vitals.
///
/// Magicka is deducted up to availability with no further penalty. A
/// stamina shortfall instead weakens the action: the returned multiplier
/// scales damage down to [`STAMINA_FLOOR`] at worst, so actions never
/// hard-fail for lack of resources.
pub fn pay_costs(vitals: &mut Vitals, cost: &AbilityCost) -> f64 {
    vitals.spend_magicka(cost.magicka);
    if cost.stamina <= 0 {
        return 1.0;
    }
    let available = vitals.stamina.map_or(0, |p| p.current.max(0));
    vitals.spend_stamina(cost.stamina);
    if available >= cost.stamina {
        1.0
    } else {
        (f64::from(available) / f64::from(cost.stamina)).max(STAMINA_FLOOR)
    }
}

/// Verb describing how a blow of this tier lands.
pub fn describe_hit(tier: RollTier) -> &'static str {
    match tier {
        RollTier::Fail => "fumbles against",
        RollTier::Miss => "misses",
        RollTier::Low => "grazes",
        RollTier::Mid => "strikes",
        RollTier::High => "slams into",
        RollTier::Crit => "devastates",
    }
}

/// Build a summoned actor from a template.
///
/// The id is minted from the engine RNG so seeded encounters reproduce
/// exactly. The summon carries a single strike matching its template
/// damage; companion bookkeeping is the caller's job.
pub fn spawn_summon(
    template: &SummonTemplate,
    owner: ActorId,
    level: u32,
    rng: &mut StdRng,
) -> Actor {
    let strike_id = format!(
        "{}_strike",
        template.name.to_lowercase().replace(' ', "_")
    );
    let strike = Ability::new(
        strike_id,
        format!("{} Strike", template.name),
        AbilityKind::Melee,
        template.damage,
    );
    let mut summon = Actor::new(
        &template.name,
        template.kind,
        level,
        template.health,
        template.armor,
        template.damage,
    )
    .with_id(ActorId::from_u128(rng.random()))
    .with_ability(strike);
    summon.summoned_by = Some(owner);
    summon
}
