//! Fusion Rings - a decorative canvas arcade mini-game
//!
//! Core modules:
//! - `sim`: Frame-driven simulation (formations, spawning, physics, heat)
//! - `renderer`: Backend-neutral draw commands plus the Canvas2D backend
//! - `game`: Host facade (input intake, per-frame advance, HUD snapshot)
//! - `audio`: Short synthesized cue tones
//! - `tuning`: Engine configuration and physics presets
//! - `settings`: Persisted user preferences

pub mod audio;
pub mod game;
pub mod renderer;
pub mod settings;
pub mod sim;
pub mod tuning;

pub use game::{ArcadeGame, HudSnapshot};
pub use settings::Settings;
pub use tuning::{EngineConfig, EngineFeatures, PhysicsPreset, SoundProfile, ThemeColors};

use std::f32::consts::{PI, TAU};

/// Game configuration constants
pub mod consts {
    /// Nominal frame length (60 Hz display refresh)
    pub const FRAME_MS: f32 = 1000.0 / 60.0;
    /// Longest frame delta the simulation will accept (tab backgrounding etc.)
    pub const MAX_FRAME_DT_MS: f32 = 50.0;

    /// Enemy units
    pub const UNIT_RADIUS: f32 = 18.0;
    pub const UNIT_MASS: f32 = 1.0;
    /// Maximum alive units across every group
    pub const MAX_ALIVE_UNITS: usize = 12;
    /// Extra hit points granted to each unit of a fused spawn
    pub const FUSION_BONUS_HP: u8 = 2;

    /// Spawn cadence (frames between spawn checks) by score bracket
    pub const SPAWN_INTERVAL_BASE: u64 = 35;
    pub const SPAWN_INTERVAL_MID: u64 = 33;
    pub const SPAWN_INTERVAL_HIGH: u64 = 31;
    pub const SPAWN_SCORE_MID: u64 = 50;
    pub const SPAWN_SCORE_HIGH: u64 = 150;

    /// Family roll thresholds (cumulative)
    pub const CLUSTER_SPAWN_CHANCE: f32 = 0.24;
    pub const CATERPILLAR_SPAWN_CHANCE: f32 = 0.16;
    pub const SPEEDSTER_CHANCE: f32 = 0.08;
    pub const SPEEDSTER_MULTIPLIER: f32 = 1.5;

    /// Placement
    pub const PLACEMENT_ATTEMPTS: usize = 14;
    /// Alive units above which a failed placement abandons the spawn
    pub const CROWDED_UNIT_COUNT: usize = 6;
    /// How far a fresh group pokes into the arena
    pub const SPAWN_INSET: f32 = 6.0;
    /// Spawn progress gained per frame once a group is entered
    pub const SPAWN_PROGRESS_RATE: f32 = 0.025;

    /// Formation spacing factors (multiples of unit radius)
    pub const PEANUT_SPACING: f32 = 1.7;
    pub const TRIANGLE_SIDE: f32 = 1.74;
    pub const LINE_SPACING: f32 = 1.66;

    /// Boundary response
    pub const MIN_BOUNCE_RESTITUTION: f32 = 0.2;
    pub const CATERPILLAR_WALL_DAMPING: f32 = 0.96;

    /// Caterpillar turning
    pub const TURN_MIN_FRACTION: f32 = 0.42;
    pub const TURN_MAX_FRACTION: f32 = 0.62;
    pub const TURN_CENTER_BIAS: f32 = 0.22;
    pub const TURN_COOLDOWN_MIN: u32 = 34;
    pub const TURN_COOLDOWN_MAX: u32 = 58;
    pub const TURN_ARRIVAL_EPSILON: f32 = 0.05;

    /// Collision
    pub const TANGENTIAL_FRICTION: f32 = 0.06;
    pub const MAX_ANGULAR_VELOCITY: f32 = 0.11;
    pub const MAX_ANGULAR_VELOCITY_CATERPILLAR: f32 = 0.095;
    /// Outward speed given to each half of a bisected caterpillar
    pub const SPLIT_NUDGE: f32 = 0.35;
    /// Per-frame decay of the post-split settle offsets
    pub const SETTLE_DECAY: f32 = 0.85;

    /// Weapon
    pub const FIRE_INTERVAL_MS: f32 = 40.0;
    pub const BULLET_SPEED: f32 = 13.0;
    pub const LANE_LEFT: f32 = 0.2;
    pub const LANE_RIGHT: f32 = 0.8;
    /// Horizontal gap between the two parallel barrels of one lane
    pub const LANE_GAP: f32 = 14.0;
    pub const DUAL_SPREAD: f32 = 0.06;
    pub const QUAD_SPREAD: f32 = 0.035;
    pub const SHOTS_TO_OVERHEAT: f32 = 180.0;
    pub const QUAD_HEAT_MULTIPLIER: f32 = 1.5;
    pub const HEAT_COOL_PER_MS: f32 = 0.00045;
    pub const OVERHEAT_RECOVERY: f32 = 0.1;
    pub const MODE_SWITCH_COOLDOWN_MS: f64 = 140.0;

    /// Cosmetics
    pub const MAX_PARTICLES: usize = 256;
    pub const SHAKE_PER_KILL: f32 = 3.0;
    pub const MAX_SHAKE: f32 = 8.0;
    pub const SHAKE_DECAY: f32 = 0.9;
    pub const SHAKE_EPSILON: f32 = 0.05;
}

/// Normalized angle to [-π, π)
#[inline]
pub fn normalize_angle(angle: f32) -> f32 {
    (angle + PI).rem_euclid(TAU) - PI
}

/// Signed shortest rotation taking `from` onto `to`, in [-π, π)
#[inline]
pub fn shortest_angle_delta(from: f32, to: f32) -> f32 {
    normalize_angle(to - from)
}

/// Clamp that tolerates an inverted range by collapsing to its midpoint
#[inline]
pub fn clamp_range(value: f32, min: f32, max: f32) -> f32 {
    if min > max {
        (min + max) * 0.5
    } else {
        value.clamp(min, max)
    }
}

/// Merge angular intervals on the circle.
///
/// Each input is `(start, end)` with `end >= start`; spans of a full turn or more
/// cover the whole circle. Output intervals are disjoint, sorted, and lie in
/// `[0, τ]`. An interval crossing zero is returned as two pieces.
pub fn merge_circular_intervals(intervals: &[(f32, f32)]) -> Vec<(f32, f32)> {
    let mut pieces: Vec<(f32, f32)> = Vec::with_capacity(intervals.len() * 2);
    for &(start, end) in intervals {
        let span = end - start;
        if span <= 0.0 {
            continue;
        }
        if span >= TAU {
            return vec![(0.0, TAU)];
        }
        let s = start.rem_euclid(TAU);
        let e = s + span;
        if e > TAU {
            pieces.push((s, TAU));
            pieces.push((0.0, e - TAU));
        } else {
            pieces.push((s, e));
        }
    }

    pieces.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));

    let mut merged: Vec<(f32, f32)> = Vec::with_capacity(pieces.len());
    for (s, e) in pieces {
        match merged.last_mut() {
            Some(last) if s <= last.1 => last.1 = last.1.max(e),
            _ => merged.push((s, e)),
        }
    }
    merged
}

/// Arcs of the circle not covered by `intervals`.
///
/// Returned as `(start, end)` with `end > start`; the arc crossing zero is
/// reported once with `end > τ`.
pub fn circular_complement(intervals: &[(f32, f32)]) -> Vec<(f32, f32)> {
    let merged = merge_circular_intervals(intervals);
    let (Some(first), Some(last)) = (merged.first(), merged.last()) else {
        return vec![(0.0, TAU)];
    };

    let mut gaps = Vec::with_capacity(merged.len());
    for pair in merged.windows(2) {
        if pair[1].0 > pair[0].1 {
            gaps.push((pair[0].1, pair[1].0));
        }
    }
    let wrap_start = last.1;
    let wrap_end = first.0 + TAU;
    if wrap_end - wrap_start > 1e-6 {
        gaps.push((wrap_start, wrap_end));
    }
    gaps
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_normalize_angle() {
        assert!((normalize_angle(3.0 * PI + 0.5) - (-PI + 0.5)).abs() < 1e-4);
        assert!((normalize_angle(-PI / 2.0) - -PI / 2.0).abs() < 1e-6);
        assert!((normalize_angle(TAU + 0.25) - 0.25).abs() < 1e-5);
    }

    #[test]
    fn test_shortest_angle_delta_wraps() {
        let d = shortest_angle_delta(PI - 0.1, -PI + 0.1);
        assert!((d - 0.2).abs() < 1e-5);
        let d = shortest_angle_delta(0.1, -0.1);
        assert!((d + 0.2).abs() < 1e-5);
    }

    #[test]
    fn test_clamp_range_inverted() {
        assert_eq!(clamp_range(5.0, 0.0, 2.0), 2.0);
        assert_eq!(clamp_range(5.0, 4.0, 2.0), 3.0);
    }

    #[test]
    fn test_merge_overlapping_and_wrapping() {
        let merged = merge_circular_intervals(&[(0.5, 1.0), (0.9, 1.5), (TAU - 0.2, TAU + 0.1)]);
        assert_eq!(merged.len(), 3);
        assert!((merged[0].0 - 0.0).abs() < 1e-6 && (merged[0].1 - 0.1).abs() < 1e-4);
        assert!((merged[1].0 - 0.5).abs() < 1e-6 && (merged[1].1 - 1.5).abs() < 1e-6);
        assert!((merged[2].1 - TAU).abs() < 1e-6);
    }

    #[test]
    fn test_complement_joins_wrap_gap() {
        let gaps = circular_complement(&[(1.0, 2.0), (4.0, 5.0)]);
        assert_eq!(gaps.len(), 2);
        assert!((gaps[0].0 - 2.0).abs() < 1e-6 && (gaps[0].1 - 4.0).abs() < 1e-6);
        assert!((gaps[1].0 - 5.0).abs() < 1e-6 && (gaps[1].1 - (1.0 + TAU)).abs() < 1e-5);
    }

    #[test]
    fn test_complement_empty_and_full() {
        assert_eq!(circular_complement(&[]), vec![(0.0, TAU)]);
        assert!(circular_complement(&[(0.0, TAU)]).is_empty());
    }

    proptest! {
        #[test]
        fn prop_merge_plus_complement_covers_circle(
            raw in prop::collection::vec((0.0f32..TAU, 0.01f32..2.0), 0..6)
        ) {
            let intervals: Vec<(f32, f32)> = raw.iter().map(|&(s, len)| (s, s + len)).collect();
            let covered: f32 = merge_circular_intervals(&intervals).iter().map(|(s, e)| e - s).sum();
            let free: f32 = circular_complement(&intervals).iter().map(|(s, e)| e - s).sum();
            prop_assert!((covered + free - TAU).abs() < 1e-3);
        }

        #[test]
        fn prop_normalize_angle_in_range(a in -100.0f32..100.0) {
            let n = normalize_angle(a);
            prop_assert!((-PI..PI + 1e-4).contains(&n));
        }
    }
}
