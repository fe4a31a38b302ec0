//! Render routines
//!
//! Pure geometry to draw commands. Fused units share a silhouette: each ring
//! is cut open where a bridge joins it, so neighbouring rings never draw over
//! each other, and a curved neck is drawn across the gap.

use glam::Vec2;
use std::f32::consts::{PI, TAU};

use super::command::{DrawCommand, Paint};
use crate::circular_complement;
use crate::sim::formation::{WorldUnit, group_connections, world_unit_positions};
use crate::sim::state::{EnemyGroup, GameState};

/// Dash and gap length along a ring, in pixels
const DASH_PX: f32 = 7.0;
const GAP_PX: f32 = 4.5;
const RING_WIDTH: f32 = 2.0;
/// Smallest half-angle cut out of a ring at a bridge
const MIN_CUTOUT: f32 = 0.32;
/// Bridge neck pinch as a fraction of the unit radius
const BRIDGE_WAIST: f32 = 0.45;
const SQUARE_SIZE: f32 = 0.32;
const BULLET_TRAIL: f32 = 9.0;

/// Half-angle removed from a ring of `radius` whose neighbour is `distance` away
pub fn cutout_half_angle(distance: f32, radius: f32) -> f32 {
    if radius <= 0.0 {
        return MIN_CUTOUT;
    }
    (distance * 0.5 / radius).clamp(-1.0, 1.0).acos().max(MIN_CUTOUT)
}

/// Angular intervals of unit `index`'s ring hidden by its bridges
pub fn ring_cutouts(
    units: &[WorldUnit],
    index: usize,
    connections: &[(usize, usize)],
    radius: f32,
) -> Vec<(f32, f32)> {
    let Some(me) = units.get(index) else {
        return Vec::new();
    };
    connections
        .iter()
        .filter_map(|&(a, b)| match (a == index, b == index) {
            (true, _) => units.get(b),
            (_, true) => units.get(a),
            _ => None,
        })
        .filter_map(|other| {
            let delta = other.pos - me.pos;
            let distance = delta.length();
            if distance < 1e-3 {
                return None;
            }
            let angle = delta.y.atan2(delta.x);
            let half = cutout_half_angle(distance, radius);
            Some((angle - half, angle + half))
        })
        .collect()
}

/// Dashed ring with `cutouts` left open. Dashes start at `dash_offset`.
pub fn dashed_ring(
    out: &mut Vec<DrawCommand>,
    center: Vec2,
    radius: f32,
    cutouts: &[(f32, f32)],
    dash_offset: f32,
    alpha: f32,
) {
    if radius <= 0.0 {
        return;
    }
    let dash = DASH_PX / radius;
    let period = dash + GAP_PX / radius;

    for (start, end) in circular_complement(cutouts) {
        let mut k = ((start - dash_offset) / period).floor();
        loop {
            let dash_start = dash_offset + k * period;
            if dash_start >= end {
                break;
            }
            let a = dash_start.max(start);
            let b = (dash_start + dash).min(end);
            if b - a > 1e-4 {
                out.push(DrawCommand::Arc {
                    center,
                    radius,
                    start: a,
                    end: b,
                    width: RING_WIDTH,
                    alpha,
                });
            }
            k += 1.0;
        }
    }
}

/// The two curves of the neck joining rings at `a` and `b`.
///
/// `None` when the centers coincide; the bridge is simply not drawn.
pub fn fusion_bridge(a: Vec2, b: Vec2, radius: f32, alpha: f32) -> Option<[DrawCommand; 2]> {
    let delta = b - a;
    let distance = delta.length();
    if !distance.is_finite() || distance < 1e-3 {
        return None;
    }
    let axis = delta / distance;
    let normal = axis.perp();
    let angle = axis.y.atan2(axis.x);
    let half = cutout_half_angle(distance, radius);
    let mid = (a + b) * 0.5;

    let side = |sign: f32| DrawCommand::Curve {
        from: a + Vec2::from_angle(angle + sign * half) * radius,
        control: mid + normal * (sign * radius * BRIDGE_WAIST),
        to: b + Vec2::from_angle(angle + PI - sign * half) * radius,
        width: RING_WIDTH,
        alpha,
    };
    Some([side(1.0), side(-1.0)])
}

/// Rings, bridges and core squares for one group
pub fn render_group(out: &mut Vec<DrawCommand>, group: &EnemyGroup) {
    let units = world_unit_positions(group);
    let connections = group_connections(group);
    let r = group.radius;
    let dash_offset = group.phase * 0.5;

    for w in &units {
        let cutouts = ring_cutouts(&units, w.index, &connections, r);
        dashed_ring(out, w.pos, r, &cutouts, dash_offset, 1.0);
        if group.is_speedster {
            out.push(DrawCommand::Arc {
                center: w.pos,
                radius: r * 0.62,
                start: 0.0,
                end: TAU,
                width: 1.0,
                alpha: 0.6,
            });
        }
    }

    for &(i, j) in &connections {
        if let (Some(a), Some(b)) = (units.get(i), units.get(j))
            && let Some(curves) = fusion_bridge(a.pos, b.pos, r, 1.0)
        {
            out.extend(curves);
        }
    }

    for w in &units {
        let Some(unit) = group.units.get(w.index) else {
            continue;
        };
        // Filled while the unit still carries fusion bonus HP
        let fill = if unit.fusion_bonus_remaining > 0 {
            Paint::Foreground
        } else {
            Paint::Background
        };
        out.push(DrawCommand::Square {
            center: w.pos,
            half_size: r * SQUARE_SIZE,
            rotation: group.phase * 1.3 * unit.square_spin_dir + unit.spin_phase_offset,
            fill,
            alpha: (0.4 + unit.hp as f32 * 0.12).min(1.0),
        });
    }
}

/// Full frame: background, shaken world layer, cosmetics
pub fn render_frame(state: &GameState) -> Vec<DrawCommand> {
    let mut out = Vec::with_capacity(
        state.groups.len() * 24 + state.bullets.len() + state.particles.len() + 8,
    );
    out.push(DrawCommand::Clear);
    out.push(DrawCommand::PushOffset(state.shake_offset));

    for group in &state.groups {
        render_group(&mut out, group);
    }

    for bullet in &state.bullets {
        let back = bullet.vel.normalize_or_zero() * BULLET_TRAIL;
        out.push(DrawCommand::Segment {
            from: bullet.pos - back,
            to: bullet.pos,
            width: 2.0,
            alpha: 1.0,
        });
    }

    for p in &state.particles {
        out.push(DrawCommand::Dot {
            center: p.pos,
            radius: p.size * p.life.max(0.0),
            alpha: p.life.clamp(0.0, 1.0),
        });
    }

    for f in &state.hit_flashes {
        out.push(DrawCommand::Arc {
            center: f.pos,
            radius: f.radius,
            start: 0.0,
            end: TAU,
            width: 2.5 * f.life.max(0.0),
            alpha: f.life.clamp(0.0, 1.0),
        });
    }

    for t in &state.floating_texts {
        out.push(DrawCommand::Text {
            pos: t.pos,
            text: t.text.clone(),
            size: 14.0,
            alpha: t.life.clamp(0.0, 1.0),
        });
    }

    out.push(DrawCommand::PopOffset);
    out
}
