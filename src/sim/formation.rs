//! Formation geometry
//!
//! Pure functions from a group's family, unit count and orientation to unit
//! offsets. [`world_unit_positions`] is the only place world-space unit
//! positions come from; collision, rendering and splitting all call it fresh.

use glam::Vec2;
use std::f32::consts::{FRAC_PI_2, TAU};

use super::state::{EnemyGroup, Family, Formation};
use crate::consts::{LINE_SPACING, PEANUT_SPACING, TRIANGLE_SIDE};
use crate::shortest_angle_delta;

/// How tightly a line is packed at spawn progress 0 (fraction of full spacing)
const COMPACT_SPACING: f32 = 0.35;

/// A unit's world position, tagged with its index in `group.units`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WorldUnit {
    pub index: usize,
    pub unit_id: u32,
    pub pos: Vec2,
}

/// Formation of a group (recomputed on every call)
#[inline]
pub fn formation(group: &EnemyGroup) -> Formation {
    Formation::of(group.family, group.units.len())
}

/// Unit index pairs joined by a fusion bridge
pub fn connections(formation: Formation, count: usize) -> Vec<(usize, usize)> {
    match formation {
        Formation::Single => Vec::new(),
        Formation::Peanut => vec![(0, 1)],
        Formation::Triangle => vec![(0, 1), (1, 2), (2, 0)],
        Formation::Line => (1..count).map(|i| (i - 1, i)).collect(),
    }
}

/// Connections for the group's current formation
pub fn group_connections(group: &EnemyGroup) -> Vec<(usize, usize)> {
    connections(formation(group), group.units.len())
}

/// Angle the formation is laid out along
pub fn orientation(group: &EnemyGroup, formation: Formation) -> f32 {
    match (group.family, formation) {
        (Family::Caterpillar, _) | (_, Formation::Line) => group.heading,
        _ => group.rotation,
    }
}

/// Offsets from the group center at the group's current spawn progress
pub fn local_offsets(group: &EnemyGroup) -> Vec<Vec2> {
    local_offsets_at(group, group.spawn_progress)
}

/// Offsets from the group center, with spawn progress overridden
pub fn local_offsets_at(group: &EnemyGroup, spawn_progress: f32) -> Vec<Vec2> {
    let formation = formation(group);
    let count = group.units.len();
    let r = group.radius;
    let facing = Vec2::from_angle(orientation(group, formation));

    match formation {
        Formation::Single => vec![Vec2::ZERO; count.min(1)],
        Formation::Peanut => {
            // Unit 0 leads, like the head of a line
            let half = r * PEANUT_SPACING * 0.5;
            vec![
                Vec2::new(half, 0.0).rotate(facing),
                Vec2::new(-half, 0.0).rotate(facing),
            ]
        }
        Formation::Triangle => {
            let circumradius = r * TRIANGLE_SIDE / 3.0_f32.sqrt();
            (0..3)
                .map(|k| {
                    let angle = -FRAC_PI_2 + k as f32 * TAU / 3.0;
                    (Vec2::from_angle(angle) * circumradius).rotate(facing)
                })
                .collect()
        }
        Formation::Line => line_offsets(group, count, spawn_progress.clamp(0.0, 1.0))
            .into_iter()
            .map(|v| v.rotate(facing))
            .collect(),
    }
}

/// Head-anchored line in the group's own frame (x = forward)
fn line_offsets(group: &EnemyGroup, count: usize, progress: f32) -> Vec<Vec2> {
    let r = group.radius;
    let spacing = r * LINE_SPACING;
    let center_index = (count as f32 - 1.0) * 0.5;
    let head_along = center_index * spacing;
    let last = (count.max(2) - 1) as f32;

    // Turn bend: the body lags behind a turning head
    let turn_bias = group
        .turn_target_heading
        .map(|target| shortest_angle_delta(group.heading, target).clamp(-1.0, 1.0))
        .unwrap_or(0.0)
        + group.angular_velocity * 6.0;

    (0..count)
        .map(|i| {
            let fi = i as f32;
            let full = (center_index - fi) * spacing;
            let compact = head_along - fi * spacing * COMPACT_SPACING;
            let mut along = compact + (full - compact) * progress;
            let mut lateral = 0.0;

            match group.family {
                Family::Caterpillar => {
                    let tail_ratio = fi / last;
                    let wave_amp = r * 0.32 * (0.25 + 0.75 * tail_ratio) * progress;
                    lateral += (group.phase - fi * 0.9).sin() * wave_amp;
                    lateral -= turn_bias * r * 0.9 * tail_ratio.powf(1.2) * progress;
                    along += (group.phase * 1.7 + fi * 1.1).sin() * r * 0.06 * progress;
                }
                Family::Normal | Family::Cluster => {
                    lateral += (group.phase + fi * 0.8).sin() * r * 0.18 * progress;
                }
            }

            Vec2::new(along, lateral)
        })
        .collect()
}

/// World-space unit positions at the current spawn progress
pub fn world_unit_positions(group: &EnemyGroup) -> Vec<WorldUnit> {
    world_unit_positions_at(group, group.spawn_progress)
}

/// World-space unit positions with spawn progress overridden
pub fn world_unit_positions_at(group: &EnemyGroup, spawn_progress: f32) -> Vec<WorldUnit> {
    local_offsets_at(group, spawn_progress)
        .into_iter()
        .zip(group.units.iter())
        .enumerate()
        .map(|(index, (offset, unit))| WorldUnit {
            index,
            unit_id: unit.id,
            pos: group.pos + offset + unit.settle_offset,
        })
        .collect()
}

/// Half extents of the group at full spread, unit radius included
pub fn full_spread_extents(group: &EnemyGroup) -> Vec2 {
    local_offsets_at(group, 1.0)
        .into_iter()
        .fold(Vec2::ZERO, |acc, o| acc.max(o.abs()))
        + Vec2::splat(group.radius)
}

/// Mean of the unit positions
pub fn unit_centroid(positions: &[WorldUnit]) -> Vec2 {
    if positions.is_empty() {
        return Vec2::ZERO;
    }
    positions.iter().map(|w| w.pos).sum::<Vec2>() / positions.len() as f32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::state::{EnemyUnit, SpawnSide};
    use proptest::prelude::*;

    fn group(family: Family, n: usize) -> EnemyGroup {
        let units = (0..n).map(|i| EnemyUnit::new(i as u32 + 1, 4, 0, 0.0)).collect();
        let mut g = EnemyGroup::new(100, family, SpawnSide::Left, units);
        g.pos = Vec2::new(300.0, 200.0);
        g
    }

    #[test]
    fn test_connections_table() {
        assert!(connections(Formation::Single, 1).is_empty());
        assert_eq!(connections(Formation::Peanut, 2), vec![(0, 1)]);
        assert_eq!(connections(Formation::Triangle, 3), vec![(0, 1), (1, 2), (2, 0)]);
        assert_eq!(connections(Formation::Line, 4), vec![(0, 1), (1, 2), (2, 3)]);
    }

    #[test]
    fn test_peanut_spacing_follows_rotation() {
        let mut g = group(Family::Cluster, 2);
        g.rotation = 0.7;
        let offsets = local_offsets(&g);
        let gap = offsets[0] - offsets[1];
        assert!((gap.length() - g.radius * PEANUT_SPACING).abs() < 1e-4);
        assert!((gap.y.atan2(gap.x) - 0.7).abs() < 1e-4);
    }

    #[test]
    fn test_triangle_is_equilateral_about_centroid() {
        let mut g = group(Family::Cluster, 3);
        g.rotation = 1.3;
        let o = local_offsets(&g);
        let side = g.radius * TRIANGLE_SIDE;
        for (a, b) in [(0, 1), (1, 2), (2, 0)] {
            assert!(((o[a] - o[b]).length() - side).abs() < 1e-3);
        }
        assert!((o[0] + o[1] + o[2]).length() < 1e-3);
    }

    #[test]
    fn test_line_compacts_toward_head_at_spawn() {
        let mut g = group(Family::Caterpillar, 5);
        g.spawn_progress = 0.0;
        let compact = local_offsets(&g);
        g.spawn_progress = 1.0;
        let full = local_offsets(&g);

        // Head sits at the same place in both silhouettes
        assert!((compact[0] - full[0]).length() < 1e-3);
        let compact_len = (compact[0] - compact[4]).length();
        let full_len = (full[0] - full[4]).length();
        assert!(compact_len < full_len * 0.5);
        // Head leads along the heading (heading 0 = +x for left spawns)
        assert!(full[0].x > full[4].x);
    }

    #[test]
    fn test_normal_line_spacing_along_heading() {
        let mut g = group(Family::Normal, 3);
        g.heading = 0.0;
        g.spawn_progress = 1.0;
        let o = local_offsets(&g);
        let spacing = g.radius * LINE_SPACING;
        assert!(((o[0].x - o[1].x) - spacing).abs() < 1e-3);
        assert!(((o[1].x - o[2].x) - spacing).abs() < 1e-3);
    }

    #[test]
    fn test_caterpillar_turn_bends_tail_more_than_neck() {
        let mut g = group(Family::Caterpillar, 5);
        g.spawn_progress = 1.0;
        let straight = local_offsets(&g);
        g.turn_target_heading = Some(1.0);
        let bent = local_offsets(&g);
        let neck = (bent[1] - straight[1]).length();
        let tail = (bent[4] - straight[4]).length();
        assert!(tail > neck);
        assert!((bent[0] - straight[0]).length() < 1e-4);
    }

    #[test]
    fn test_world_positions_follow_center() {
        let g = group(Family::Cluster, 3);
        let offsets = local_offsets(&g);
        let world = world_unit_positions(&g);
        assert_eq!(world.len(), 3);
        for (w, o) in world.iter().zip(offsets) {
            assert!((w.pos - (g.pos + o)).length() < 1e-4);
            assert_eq!(g.units[w.index].id, w.unit_id);
        }
    }

    #[test]
    fn test_full_spread_extents_single() {
        let g = group(Family::Normal, 1);
        let e = full_spread_extents(&g);
        assert!((e - Vec2::splat(g.radius)).length() < 1e-5);
    }

    proptest! {
        #[test]
        fn prop_formation_is_pure(
            family in prop_oneof![Just(Family::Normal), Just(Family::Cluster), Just(Family::Caterpillar)],
            n in 1usize..6,
        ) {
            let g = group(family, n);
            prop_assert_eq!(formation(&g), formation(&g));
            prop_assert_eq!(formation(&g), Formation::of(family, n));
        }

        #[test]
        fn prop_one_offset_per_unit(
            family in prop_oneof![Just(Family::Normal), Just(Family::Cluster), Just(Family::Caterpillar)],
            n in 1usize..6,
            phase in 0.0f32..10.0,
            progress in 0.0f32..1.0,
        ) {
            let mut g = group(family, n);
            if family == Family::Cluster {
                g.units.truncate(n.min(3));
            }
            g.phase = phase;
            g.spawn_progress = progress;
            prop_assert_eq!(local_offsets(&g).len(), g.units.len());
            prop_assert_eq!(group_connections(&g).len(), g.units.len().saturating_sub(1).max(
                if g.formation() == Formation::Triangle { 3 } else { 0 }
            ));
        }
    }
}
