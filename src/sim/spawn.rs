//! Spawn policy
//!
//! Decides when a new group enters, what it is (family, unit count, hit
//! points, speed) and where it enters without landing on top of another group.

use glam::Vec2;
use rand::Rng;
use std::f32::consts::TAU;

use super::formation::{full_spread_extents, world_unit_positions_at};
use super::state::{Arena, EnemyGroup, EnemyUnit, EntityIds, Family, Formation, GameState, SpawnSide};
use crate::consts::*;
use crate::tuning::{EngineConfig, EngineFeatures};

static NORMAL_COUNTS: [usize; 1] = [1];
static CLUSTER_COUNTS: [usize; 2] = [2, 3];
static CATERPILLAR_COUNTS: [usize; 3] = [3, 4, 5];
/// Vertical margin kept between a fresh group and the top/bottom edges
const SPAWN_EDGE_MARGIN: f32 = 8.0;

/// Frames between spawn checks; shortens as the score climbs
pub fn spawn_interval_frames(score: u64) -> u64 {
    if score > SPAWN_SCORE_HIGH {
        SPAWN_INTERVAL_HIGH
    } else if score > SPAWN_SCORE_MID {
        SPAWN_INTERVAL_MID
    } else {
        SPAWN_INTERVAL_BASE
    }
}

/// Roll a family and unit count that fits in `remaining` unit slots.
///
/// Returns `None` when the rolled family cannot fit; there is no fallback to a
/// smaller family.
pub fn roll_family<R: Rng + ?Sized>(
    rng: &mut R,
    remaining: usize,
    features: &EngineFeatures,
) -> Option<(Family, usize)> {
    let roll = rng.random::<f32>();
    let cluster_cut = if features.fused_groups { CLUSTER_SPAWN_CHANCE } else { 0.0 };
    let caterpillar_cut = if features.caterpillars {
        cluster_cut + CATERPILLAR_SPAWN_CHANCE
    } else {
        cluster_cut
    };

    let (family, options): (Family, &[usize]) = if roll < cluster_cut {
        (Family::Cluster, &CLUSTER_COUNTS[..])
    } else if roll < caterpillar_cut {
        (Family::Caterpillar, &CATERPILLAR_COUNTS[..])
    } else {
        (Family::Normal, &NORMAL_COUNTS[..])
    };

    let fitting: Vec<usize> = options.iter().copied().filter(|&n| n <= remaining).collect();
    if fitting.is_empty() {
        return None;
    }
    let count = fitting[rng.random_range(0..fitting.len())];
    Some((family, count))
}

/// Base hit points: 3 or 5 with 10% each, otherwise 4
pub fn roll_unit_hp<R: Rng + ?Sized>(rng: &mut R) -> u8 {
    let roll = rng.random::<f32>();
    if roll < 0.1 {
        3
    } else if roll < 0.2 {
        5
    } else {
        4
    }
}

fn random_sign<R: Rng + ?Sized>(rng: &mut R) -> f32 {
    if rng.random::<f32>() < 0.5 { 1.0 } else { -1.0 }
}

/// Build a group of `family` with `count` units, motion parameters rolled
pub fn build_group<R: Rng + ?Sized>(
    rng: &mut R,
    ids: &mut EntityIds,
    family: Family,
    count: usize,
    side: SpawnSide,
    config: &EngineConfig,
) -> EnemyGroup {
    let bonus = if count > 1 { FUSION_BONUS_HP } else { 0 };
    let units = (0..count)
        .map(|_| {
            let hp = roll_unit_hp(rng);
            EnemyUnit::new(ids.next_id(), hp, bonus, rng.random_range(0.0..TAU))
        })
        .collect();
    let mut group = EnemyGroup::new(ids.next_id(), family, side, units);

    match family {
        Family::Normal => {
            group.base_speed = rng.random_range(1.2..1.9);
            group.drift_amp = rng.random_range(0.2..0.5);
            group.drift_freq = rng.random_range(0.02..0.045);
            group.steer = 0.05;
            group.rotation_speed = random_sign(rng) * rng.random_range(0.01..0.03);
            group.is_speedster = rng.random::<f32>() < SPEEDSTER_CHANCE;
        }
        Family::Cluster => {
            group.base_speed = rng.random_range(0.9..1.35);
            group.drift_amp = rng.random_range(0.15..0.35);
            group.drift_freq = rng.random_range(0.015..0.035);
            group.steer = 0.04;
            group.rotation = rng.random_range(0.0..TAU);
            group.rotation_speed = random_sign(rng) * rng.random_range(0.004..0.012);
        }
        Family::Caterpillar => {
            group.base_speed = rng.random_range(0.8..1.15);
            group.drift_freq = rng.random_range(0.06..0.09);
            group.steer = 0.035;
            group.turn_angular_speed = rng.random_range(0.035..0.05);
        }
    }

    if group.is_speedster {
        group.base_speed *= SPEEDSTER_MULTIPLIER;
    }
    group.max_speed = group.base_speed * 1.9;
    let preset = &config.preset;
    group.restitution = rng.random_range(preset.restitution_min..=preset.restitution_max);
    group.phase = rng.random_range(0.0..TAU);
    group.vel = Vec2::new(group.dir * group.base_speed, rng.random_range(-0.3..0.3));
    group.spawn_progress = if group.formation() == Formation::Line { 0.0 } else { 1.0 };
    group
}

/// Whether `candidate` at full spread touches any unit of `groups` at full spread
pub fn overlaps_any(candidate: &EnemyGroup, groups: &[EnemyGroup], collision_ratio: f32) -> bool {
    let mine = world_unit_positions_at(candidate, 1.0);
    groups.iter().any(|other| {
        let reach = (candidate.radius + other.radius) * collision_ratio;
        world_unit_positions_at(other, 1.0)
            .iter()
            .any(|theirs| mine.iter().any(|m| m.pos.distance(theirs.pos) < reach))
    })
}

/// Roll and place one group. `None` means this attempt was dropped.
pub fn spawn_group<R: Rng + ?Sized>(
    rng: &mut R,
    ids: &mut EntityIds,
    groups: &[EnemyGroup],
    arena: Arena,
    config: &EngineConfig,
) -> Option<EnemyGroup> {
    let alive: usize = groups.iter().map(|g| g.units.len()).sum();
    let remaining = config.max_alive_units.checked_sub(alive).filter(|&r| r > 0)?;
    let (family, count) = roll_family(rng, remaining, &config.features)?;
    let side = if rng.random::<f32>() < 0.5 {
        SpawnSide::Left
    } else {
        SpawnSide::Right
    };
    let mut group = build_group(rng, ids, family, count, side, config);

    let extents = full_spread_extents(&group);
    let x = match side {
        SpawnSide::Left => -extents.x + SPAWN_INSET,
        SpawnSide::Right => arena.width + extents.x - SPAWN_INSET,
    };
    let y_min = extents.y + SPAWN_EDGE_MARGIN;
    let y_max = arena.height - extents.y - SPAWN_EDGE_MARGIN;

    let mut placed = false;
    for _ in 0..PLACEMENT_ATTEMPTS {
        let y = if y_max > y_min {
            rng.random_range(y_min..y_max)
        } else {
            arena.height * 0.5
        };
        group.pos = Vec2::new(x, y);
        if !overlaps_any(&group, groups, config.preset.collision_ratio) {
            placed = true;
            break;
        }
    }

    if !placed && alive > CROWDED_UNIT_COUNT {
        log::debug!("Spawn abandoned: arena crowded ({} units alive)", alive);
        return None;
    }
    Some(group)
}

/// Spawn check for this frame; pushes the new group when one is produced
pub fn try_spawn(state: &mut GameState) -> bool {
    if !state.frame_count.is_multiple_of(spawn_interval_frames(state.score)) {
        return false;
    }
    if state.alive_units() >= state.config.max_alive_units {
        return false;
    }
    let Some(group) = spawn_group(
        &mut state.rng,
        &mut state.ids,
        &state.groups,
        state.arena,
        &state.config,
    ) else {
        return false;
    };
    log::trace!(
        "Spawned {:?} group {} with {} units",
        group.family,
        group.id,
        group.units.len()
    );
    state.groups.push(group);
    true
}
