//! Group physics
//!
//! Rigid-body-ish motion for enemy groups: per-family steering, arena
//! containment, caterpillar turning, group-vs-group collision impulses,
//! knockback from bullet hits and the reshaping that follows a unit's death.
//!
//! Kinematics are per frame: velocities are pixels per frame and nothing here
//! is scaled by the frame delta.

use glam::Vec2;
use rand::Rng;
use std::f32::consts::{PI, TAU};

use super::formation::{WorldUnit, local_offsets, unit_centroid, world_unit_positions};
use super::state::{Arena, EnemyGroup, EntityIds, Family, Formation, SpawnSide};
use crate::consts::*;
use crate::tuning::PhysicsPreset;
use crate::{normalize_angle, shortest_angle_delta};

/// Which walls a boundary pass pushed the group off
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BoundaryHit {
    pub horizontal: bool,
    pub vertical: bool,
}

impl BoundaryHit {
    pub fn any(&self) -> bool {
        self.horizontal || self.vertical
    }
}

/// What a unit death did to its group
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SplitOutcome {
    /// Last unit died; the group is gone
    Removed,
    /// Group lost a unit and was re-formed in place
    Shrunk,
    /// Caterpillar cut in two; the tail half got a new id
    Bisected { tail_id: u32 },
}

fn random_unit_vector<R: Rng + ?Sized>(rng: &mut R) -> Vec2 {
    Vec2::from_angle(rng.random_range(0.0..TAU))
}

fn bounds(positions: &[WorldUnit]) -> Option<(Vec2, Vec2)> {
    let first = positions.first()?.pos;
    Some(
        positions
            .iter()
            .fold((first, first), |(lo, hi), w| (lo.min(w.pos), hi.max(w.pos))),
    )
}

/// Latch the arena entry flags. Both only ever go from false to true.
pub fn update_arena_entry(group: &mut EnemyGroup, arena: Arena) {
    if group.has_fully_entered_arena {
        return;
    }
    let Some((lo, hi)) = bounds(&world_unit_positions(group)) else {
        return;
    };
    let r = group.radius;

    // Leading edge past the spawn wall
    let leading_in = match group.spawn_side {
        SpawnSide::Left => hi.x + r > 0.0,
        SpawnSide::Right => lo.x - r < arena.width,
    };
    if leading_in {
        group.has_entered_arena = true;
    }

    // Trailing edge past the spawn wall
    let trailing_in = match group.spawn_side {
        SpawnSide::Left => lo.x - r >= 0.0,
        SpawnSide::Right => hi.x + r <= arena.width,
    };
    if group.has_entered_arena && trailing_in {
        group.has_fully_entered_arena = true;
        log::trace!("Group {} fully entered", group.id);
    }
}

/// Shift the group so every unit center lies within `radius * 0.5` of the
/// arena. Returns the applied shift.
fn contain(group: &mut EnemyGroup, arena: Arena) -> Vec2 {
    let Some((lo, hi)) = bounds(&world_unit_positions(group)) else {
        return Vec2::ZERO;
    };
    let slack = group.radius * 0.5;
    // The spawn wall stays open until the trailing edge is through
    let clamp_left = group.has_fully_entered_arena || group.spawn_side != SpawnSide::Left;
    let clamp_right = group.has_fully_entered_arena || group.spawn_side != SpawnSide::Right;

    let mut push = Vec2::ZERO;
    if clamp_left && lo.x < -slack {
        push.x = -slack - lo.x;
    } else if clamp_right && hi.x > arena.width + slack {
        push.x = arena.width + slack - hi.x;
    }
    if lo.y < -slack {
        push.y = -slack - lo.y;
    } else if hi.y > arena.height + slack {
        push.y = arena.height + slack - hi.y;
    }
    group.pos += push;
    push
}

/// Keep an entered group inside the arena, with the family's wall response
pub fn apply_boundary_constraints<R: Rng + ?Sized>(
    group: &mut EnemyGroup,
    arena: Arena,
    rng: &mut R,
) -> BoundaryHit {
    if !group.has_entered_arena {
        return BoundaryHit::default();
    }
    let push = contain(group, arena);
    let hit = BoundaryHit {
        horizontal: push.x != 0.0,
        vertical: push.y != 0.0,
    };
    if !hit.any() {
        return hit;
    }

    match group.family {
        Family::Normal | Family::Cluster => {
            let e = group.restitution.max(MIN_BOUNCE_RESTITUTION);
            if hit.horizontal {
                if group.vel.x * push.x < 0.0 {
                    group.vel.x = -group.vel.x * e;
                }
                group.dir = push.x.signum();
            }
            if hit.vertical && group.vel.y * push.y < 0.0 {
                group.vel.y = -group.vel.y * e;
            }
        }
        Family::Caterpillar => {
            group.vel *= CATERPILLAR_WALL_DAMPING;
            if begin_caterpillar_turn(group, arena, rng) {
                // The new bend reshapes the body; keep it inside
                contain(group, arena);
            }
        }
    }
    hit
}

/// Pick a new turn target for a caterpillar that hit a wall.
///
/// Ignored while a turn is in progress or the cooldown is running.
pub fn begin_caterpillar_turn<R: Rng + ?Sized>(
    group: &mut EnemyGroup,
    arena: Arena,
    rng: &mut R,
) -> bool {
    if group.turn_target_heading.is_some() || group.turn_cooldown > 0 {
        return false;
    }

    let magnitude = rng.random_range(TURN_MIN_FRACTION..TURN_MAX_FRACTION) * PI;
    let sign = if rng.random::<f32>() < 0.5 { 1.0 } else { -1.0 };
    let to_center = arena.center() - group.pos;
    let center_delta = if to_center.length_squared() > 1e-6 {
        shortest_angle_delta(group.heading, to_center.y.atan2(to_center.x))
    } else {
        0.0
    };

    let limit = TURN_MAX_FRACTION * PI;
    let delta = (sign * magnitude * (1.0 - TURN_CENTER_BIAS) + center_delta * TURN_CENTER_BIAS)
        .clamp(-limit, limit);
    group.turn_target_heading = Some(normalize_angle(group.heading + delta));
    group.turn_cooldown = rng.random_range(TURN_COOLDOWN_MIN..=TURN_COOLDOWN_MAX);
    log::trace!("Caterpillar {} turning by {:.2} rad", group.id, delta);
    true
}

/// Rotate the heading toward the turn target at the group's turn speed
pub fn step_caterpillar_turn(group: &mut EnemyGroup) {
    group.turn_cooldown = group.turn_cooldown.saturating_sub(1);
    let Some(target) = group.turn_target_heading else {
        return;
    };
    let delta = shortest_angle_delta(group.heading, target);
    if delta.abs() <= TURN_ARRIVAL_EPSILON {
        group.heading = target;
        group.turn_target_heading = None;
        return;
    }
    let step = group.turn_angular_speed;
    group.heading = normalize_angle(group.heading + delta.clamp(-step, step));
}

/// One frame of steering, damping and integration
pub fn integrate_motion(group: &mut EnemyGroup) {
    group.phase += group.drift_freq;

    let desired = match group.family {
        Family::Normal | Family::Cluster => {
            group.rotation =
                normalize_angle(group.rotation + group.rotation_speed + group.angular_velocity);
            Vec2::new(group.dir * group.base_speed, group.phase.sin() * group.drift_amp)
        }
        Family::Caterpillar => {
            step_caterpillar_turn(group);
            group.heading = normalize_angle(group.heading + group.angular_velocity);
            Vec2::from_angle(group.heading) * group.base_speed
        }
    };
    group.angular_velocity *= group.angular_damping;

    group.vel *= group.damping;
    group.vel += (desired - group.vel) * group.steer;
    let speed = group.vel.length();
    if speed > group.max_speed {
        group.vel *= group.max_speed / speed;
    }
    group.pos += group.vel;

    // Normal lines face where they go
    if group.family == Family::Normal && group.vel.length_squared() > 1e-6 {
        group.heading = group.vel.y.atan2(group.vel.x);
    }

    if group.has_entered_arena {
        group.spawn_progress = (group.spawn_progress + SPAWN_PROGRESS_RATE).min(1.0);
    }

    for unit in &mut group.units {
        unit.settle_offset *= SETTLE_DECAY;
        if unit.settle_offset.length_squared() < 1e-4 {
            unit.settle_offset = Vec2::ZERO;
        }
    }
}

/// Largest distance from the group center to a unit's outer edge
fn bounding_radius(group: &EnemyGroup, positions: &[WorldUnit]) -> f32 {
    positions
        .iter()
        .map(|w| w.pos.distance(group.pos))
        .fold(0.0, f32::max)
        + group.radius
}

/// Resolve contact between two groups. Returns true when they touched.
pub fn resolve_pair<R: Rng + ?Sized>(
    a: &mut EnemyGroup,
    b: &mut EnemyGroup,
    preset: &PhysicsPreset,
    rng: &mut R,
) -> bool {
    let pa = world_unit_positions(a);
    let pb = world_unit_positions(b);
    if a.pos.distance(b.pos) > bounding_radius(a, &pa) + bounding_radius(b, &pb) {
        return false;
    }

    let reach = (a.radius + b.radius) * preset.collision_ratio;
    let mut normal_sum = Vec2::ZERO;
    let mut depth: f32 = 0.0;
    for ua in &pa {
        for ub in &pb {
            let delta = ub.pos - ua.pos;
            let dist = delta.length();
            if dist >= reach {
                continue;
            }
            let n = if dist > 1e-4 {
                delta / dist
            } else {
                random_unit_vector(rng)
            };
            let overlap = reach - dist;
            normal_sum += n * overlap;
            depth = depth.max(overlap);
        }
    }
    if depth <= 0.0 {
        return false;
    }

    let n = if normal_sum.length_squared() > 1e-8 {
        normal_sum.normalize()
    } else {
        random_unit_vector(rng)
    };

    // Positional correction, split by mass
    let total = a.mass + b.mass;
    a.pos -= n * depth * (b.mass / total);
    b.pos += n * depth * (a.mass / total);

    let rel = b.vel - a.vel;
    let vn = rel.dot(n);
    if vn < 0.0 {
        let e = (a.restitution + b.restitution) * 0.5;
        let inv_mass_sum = 1.0 / a.mass + 1.0 / b.mass;
        let impulse = n * (-(1.0 + e) * vn / inv_mass_sum);
        a.vel -= impulse / a.mass;
        b.vel += impulse / b.mass;

        let tangential = rel - n * vn;
        let friction = tangential * (TANGENTIAL_FRICTION / inv_mass_sum);
        a.vel += friction / a.mass;
        b.vel -= friction / b.mass;
    }
    true
}

/// Pairwise collision pass over every entered group. Returns the contact count.
pub fn resolve_group_collisions<R: Rng + ?Sized>(
    groups: &mut [EnemyGroup],
    preset: &PhysicsPreset,
    rng: &mut R,
) -> usize {
    let mut contacts = 0;
    for j in 1..groups.len() {
        let (head, tail) = groups.split_at_mut(j);
        let b = &mut tail[0];
        if !b.has_entered_arena {
            continue;
        }
        for a in head.iter_mut().filter(|g| g.has_entered_arena) {
            if resolve_pair(a, b, preset, rng) {
                contacts += 1;
            }
        }
    }
    contacts
}

/// Push the whole group along `dir`, scaled down by its mass
pub fn apply_linear_knockback(group: &mut EnemyGroup, dir: Vec2, strength: f32) {
    group.vel += dir.normalize_or_zero() * strength / group.mass;
}

/// Knock the group from one unit: linear push plus a spin about the centroid
pub fn apply_unit_knockback(group: &mut EnemyGroup, unit_index: usize, dir: Vec2, strength: f32) {
    let positions = world_unit_positions(group);
    let Some(hit) = positions.get(unit_index) else {
        return;
    };
    let impulse = dir.normalize_or_zero() * strength;
    group.vel += impulse / group.mass;
    if positions.len() < 2 {
        return;
    }

    let centroid = unit_centroid(&positions);
    let torque = (hit.pos - centroid).perp_dot(impulse);
    let disk = 0.5 * group.unit_mass * group.radius * group.radius;
    let inertia: f32 = positions
        .iter()
        .map(|w| group.unit_mass * (w.pos - centroid).length_squared() + disk)
        .sum();

    let limit = match group.family {
        Family::Caterpillar => MAX_ANGULAR_VELOCITY_CATERPILLAR,
        Family::Normal | Family::Cluster => MAX_ANGULAR_VELOCITY,
    };
    group.angular_velocity =
        (group.angular_velocity + torque / inertia.max(1e-3)).clamp(-limit, limit);
}

/// Move the group center so its surviving units stay where they were.
///
/// `anchors` are world positions keyed by unit id, captured before the
/// mutation. Snaps the formation to full spread, so a second call with the
/// same anchors is a no-op.
pub fn reanchor(group: &mut EnemyGroup, anchors: &[(u32, Vec2)]) {
    group.spawn_progress = 1.0;
    let offsets = local_offsets(group);
    let mut sum = Vec2::ZERO;
    let mut matched = 0;
    for (unit, offset) in group.units.iter().zip(offsets) {
        if let Some((_, world)) = anchors.iter().find(|(id, _)| *id == unit.id) {
            sum += *world - offset - unit.settle_offset;
            matched += 1;
        }
    }
    if matched > 0 {
        group.pos = sum / matched as f32;
    }
}

/// Face the formation along its surviving units, tail to head
fn align_to_anchors(group: &mut EnemyGroup, anchors: &[(u32, Vec2)]) {
    let find = |id: u32| anchors.iter().find(|(a, _)| *a == id).map(|(_, p)| *p);
    let (Some(head_id), Some(tail_id)) = (
        group.units.first().map(|u| u.id),
        group.units.last().map(|u| u.id),
    ) else {
        return;
    };
    let (Some(head), Some(tail)) = (find(head_id), find(tail_id)) else {
        return;
    };
    let axis = head - tail;
    if axis.length_squared() < 1e-6 {
        return;
    }
    let angle = axis.y.atan2(axis.x);
    match (group.family, group.formation()) {
        (_, Formation::Single | Formation::Triangle) => {}
        (Family::Caterpillar, _) | (_, Formation::Line) => group.heading = angle,
        (Family::Normal | Family::Cluster, Formation::Peanut) => group.rotation = angle,
    }
}

/// Re-form a mutated group around `anchors` without moving any unit.
///
/// Whatever the new formation cannot match exactly is kept in the units'
/// settle offsets, which decay over the next frames.
pub fn settle_into(group: &mut EnemyGroup, anchors: &[(u32, Vec2)]) {
    align_to_anchors(group, anchors);
    for unit in &mut group.units {
        unit.settle_offset = Vec2::ZERO;
    }
    reanchor(group, anchors);
    let positions = world_unit_positions(group);
    for (unit, w) in group.units.iter_mut().zip(positions) {
        if let Some((_, anchor)) = anchors.iter().find(|(id, _)| *id == unit.id) {
            unit.settle_offset = *anchor - w.pos;
        }
    }
}

/// Remove a destroyed unit and re-form what is left.
///
/// A caterpillar losing an interior unit is cut in two: the head half keeps
/// the group id, the tail half is pushed as a new group. Returns `None` when
/// the indices do not name a unit.
pub fn split_on_death(
    groups: &mut Vec<EnemyGroup>,
    group_index: usize,
    unit_index: usize,
    ids: &mut EntityIds,
) -> Option<SplitOutcome> {
    let group = groups.get_mut(group_index)?;
    if unit_index >= group.units.len() {
        return None;
    }
    let anchors: Vec<(u32, Vec2)> = world_unit_positions(group)
        .iter()
        .map(|w| (w.unit_id, w.pos))
        .collect();
    let count_before = group.units.len();

    group.units.remove(unit_index);
    group.turn_target_heading = None;
    if group.units.is_empty() {
        groups.remove(group_index);
        return Some(SplitOutcome::Removed);
    }

    let interior = unit_index > 0 && unit_index + 1 < count_before;
    if group.family == Family::Caterpillar && interior {
        let mut tail = group.clone();
        tail.id = ids.next_id();
        tail.units = group.units.split_off(unit_index);

        let axis = Vec2::from_angle(group.heading);
        group.vel += axis * SPLIT_NUDGE;
        tail.vel -= axis * SPLIT_NUDGE;
        for half in [&mut *group, &mut tail] {
            half.refresh_invariants();
            settle_into(half, &anchors);
        }
        log::debug!(
            "Caterpillar {} bisected: {} + {} units",
            group.id,
            group.units.len(),
            tail.units.len()
        );
        let tail_id = tail.id;
        groups.push(tail);
        return Some(SplitOutcome::Bisected { tail_id });
    }

    group.refresh_invariants();
    settle_into(group, &anchors);
    Some(SplitOutcome::Shrunk)
}
