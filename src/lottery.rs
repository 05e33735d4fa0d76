use crate::items::{
    ItemDefinition,
    ItemQuality,
    Rarity,
};
use color_eyre::eyre::{
    Result,
    eyre,
};
use itertools::Itertools;
use rand::Rng;
use std::collections::HashMap;

// Cumulative percentages over a [0, 100) draw, rarest first.
const ELITE_THRESHOLD: f64 = 0.8;
const ASSASSIN_THRESHOLD: f64 = ELITE_THRESHOLD + 3.2;
const COMMANDO_THRESHOLD: f64 = ASSASSIN_THRESHOLD + 16.0;

pub const STRANGE_CHANCE: f64 = 0.10;
pub const UNUSUAL_CHANCE: f64 = 0.0066;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct LotteryDraw {
    pub definition_index: u32,
    pub rarity: Rarity,
    pub quality: ItemQuality,
    pub is_strange: bool,
    pub is_unusual: bool,
}

/// Tier a `[0, 100)` roll lands in before pool availability is considered.
pub fn target_tier(roll: f64) -> Rarity {
    if roll < ELITE_THRESHOLD {
        Rarity::Elite
    } else if roll < ASSASSIN_THRESHOLD {
        Rarity::Assassin
    } else if roll < COMMANDO_THRESHOLD {
        Rarity::Commando
    } else {
        Rarity::Mercenary
    }
}

/// Picks the tier to draw from: the target if its pool has candidates,
/// otherwise the nearest more common non-empty tier, otherwise the nearest
/// rarer one.
pub fn resolve_tier(target: Rarity, pools: &HashMap<Rarity, Vec<u32>>) -> Option<Rarity> {
    let has_pool = |tier: &Rarity| pools.get(tier).is_some_and(|pool| !pool.is_empty());

    let mut tier = Some(target);
    while let Some(t) = tier {
        if has_pool(&t) {
            return Some(t);
        }
        tier = t.more_common();
    }

    let mut tier = target.rarer();
    while let Some(t) = tier {
        if has_pool(&t) {
            return Some(t);
        }
        tier = t.rarer();
    }
    None
}

pub fn draw<R: Rng>(candidates: &[ItemDefinition], rng: &mut R) -> Result<LotteryDraw> {
    let pools: HashMap<Rarity, Vec<u32>> = candidates
        .iter()
        .map(|def| (def.rarity, def.index))
        .into_group_map();

    let roll = rng.random_range(0.0..100.0);
    let target = target_tier(roll);
    let tier = resolve_tier(target, &pools)
        .ok_or_else(|| eyre!("no candidate definitions to draw from"))?;
    let pool = &pools[&tier];
    let definition_index = pool[rng.random_range(0..pool.len())];

    let is_strange = rng.random_bool(STRANGE_CHANCE);
    let is_unusual = !is_strange && rng.random_bool(UNUSUAL_CHANCE);
    let quality = if is_strange {
        ItemQuality::Strange
    } else if is_unusual {
        ItemQuality::Unusual
    } else {
        ItemQuality::Unique
    };

    tracing::debug!(roll, ?target, ?tier, definition_index, ?quality, "lottery draw");
    Ok(LotteryDraw {
        definition_index,
        rarity: tier,
        quality,
        is_strange,
        is_unusual,
    })
}
