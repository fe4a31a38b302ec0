//! Game state and core simulation types
//!
//! The controller in [`super::tick`] is the only writer of [`GameState`]; every
//! other component borrows pieces of it for the duration of one call.

use glam::Vec2;
use rand::SeedableRng;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use crate::consts::*;
use crate::tuning::EngineConfig;

/// Behavioral archetype of an enemy group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Family {
    /// Lone ring drifting across the arena
    Normal,
    /// Rigid fused pair or triangle that spins when struck
    Cluster,
    /// Segmented line that steers by heading and bends instead of bouncing
    Caterpillar,
}

/// Geometric layout of a group, derived from family and unit count
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Formation {
    Single,
    Peanut,
    Triangle,
    Line,
}

impl Formation {
    /// Formation for a family with `count` units. Never cache the result.
    pub fn of(family: Family, count: usize) -> Self {
        if count <= 1 {
            return Formation::Single;
        }
        match (family, count) {
            (_, 2) => Formation::Peanut,
            (Family::Cluster, _) => Formation::Triangle,
            (Family::Caterpillar, _) | (Family::Normal, _) => Formation::Line,
        }
    }
}

/// Arena edge a group entered from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SpawnSide {
    Left,
    Right,
}

impl SpawnSide {
    /// Horizontal travel direction away from this side
    pub fn travel_dir(self) -> f32 {
        match self {
            SpawnSide::Left => 1.0,
            SpawnSide::Right => -1.0,
        }
    }
}

/// Play surface size in pixels
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Arena {
    pub width: f32,
    pub height: f32,
}

impl Arena {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    pub fn center(&self) -> Vec2 {
        Vec2::new(self.width * 0.5, self.height * 0.5)
    }
}

/// One destructible member of a group
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnemyUnit {
    pub id: u32,
    pub base_hp: u8,
    /// Current hit points, fusion bonus included
    pub hp: u8,
    /// Bonus hit points that only exist while fused with other units
    pub fusion_bonus_remaining: u8,
    /// ±1, flips on every hit
    pub square_spin_dir: f32,
    pub spin_phase_offset: f32,
    /// World-space correction left by a split, eased out as the group re-forms
    #[serde(default)]
    pub settle_offset: Vec2,
}

impl EnemyUnit {
    pub fn new(id: u32, base_hp: u8, fusion_bonus: u8, spin_phase_offset: f32) -> Self {
        Self {
            id,
            base_hp,
            hp: base_hp + fusion_bonus,
            fusion_bonus_remaining: fusion_bonus,
            square_spin_dir: 1.0,
            spin_phase_offset,
            settle_offset: Vec2::ZERO,
        }
    }

    /// Register one bullet hit. Returns true when the unit is destroyed.
    ///
    /// Both counters drop together; the bonus is not consumed first.
    pub fn take_hit(&mut self) -> bool {
        self.hp = self.hp.saturating_sub(1);
        if self.fusion_bonus_remaining > 0 {
            self.fusion_bonus_remaining -= 1;
        }
        self.square_spin_dir = -self.square_spin_dir;
        self.hp == 0
    }

    /// Remove any remaining fusion bonus from the hit points
    pub fn strip_fusion_bonus(&mut self) {
        if self.fusion_bonus_remaining > 0 {
            self.hp = self.hp.saturating_sub(self.fusion_bonus_remaining).max(1);
            self.fusion_bonus_remaining = 0;
        }
    }
}

/// A cluster of 1..N units sharing one physics body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnemyGroup {
    pub id: u32,
    pub family: Family,

    // Kinematics
    /// Logical center
    pub pos: Vec2,
    pub vel: Vec2,
    /// ±1 horizontal travel bias
    pub dir: f32,
    /// Per-unit radius
    pub radius: f32,
    pub unit_mass: f32,
    pub mass: f32,
    pub base_speed: f32,
    pub max_speed: f32,
    pub drift_amp: f32,
    pub drift_freq: f32,
    pub steer: f32,
    pub damping: f32,
    pub restitution: f32,

    // Orientation and turning
    pub phase: f32,
    pub rotation: f32,
    pub rotation_speed: f32,
    pub angular_velocity: f32,
    pub angular_damping: f32,
    pub heading: f32,
    pub turn_target_heading: Option<f32>,
    pub turn_angular_speed: f32,
    /// Frames before another turn may start
    pub turn_cooldown: u32,

    // Arena entry
    pub spawn_side: SpawnSide,
    pub has_entered_arena: bool,
    pub has_fully_entered_arena: bool,
    /// 0 = compact entry silhouette, 1 = full formation spread
    pub spawn_progress: f32,

    /// Ordered: index 0 is the head of a line
    pub units: Vec<EnemyUnit>,
    pub is_speedster: bool,
}

impl EnemyGroup {
    /// Bare group at rest; the spawn policy fills in the motion parameters
    pub fn new(id: u32, family: Family, spawn_side: SpawnSide, units: Vec<EnemyUnit>) -> Self {
        let dir = spawn_side.travel_dir();
        let mut group = Self {
            id,
            family,
            pos: Vec2::ZERO,
            vel: Vec2::ZERO,
            dir,
            radius: UNIT_RADIUS,
            unit_mass: UNIT_MASS,
            mass: UNIT_MASS,
            base_speed: 1.0,
            max_speed: 2.0,
            drift_amp: 0.0,
            drift_freq: 0.0,
            steer: 0.04,
            damping: 0.992,
            restitution: 0.6,
            phase: 0.0,
            rotation: 0.0,
            rotation_speed: 0.0,
            angular_velocity: 0.0,
            angular_damping: 0.94,
            heading: if dir > 0.0 { 0.0 } else { std::f32::consts::PI },
            turn_target_heading: None,
            turn_angular_speed: 0.04,
            turn_cooldown: 0,
            spawn_side,
            has_entered_arena: false,
            has_fully_entered_arena: false,
            spawn_progress: 1.0,
            units,
            is_speedster: false,
        };
        group.refresh_invariants();
        group
    }

    /// Current formation, always recomputed
    pub fn formation(&self) -> Formation {
        Formation::of(self.family, self.units.len())
    }

    /// Re-establish mass and fusion-bonus invariants after any mutation
    pub fn refresh_invariants(&mut self) {
        self.mass = (self.unit_mass * self.units.len() as f32).max(self.unit_mass);
        if self.units.len() == 1 {
            self.units[0].strip_fusion_bonus();
        }
    }

    pub fn is_turning(&self) -> bool {
        self.turn_target_heading.is_some()
    }
}

/// A player bullet
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bullet {
    pub id: u32,
    pub pos: Vec2,
    pub vel: Vec2,
    /// Kept at 1.0; bullets leave through the bounds check
    pub life: f32,
}

/// A particle for visual effects
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Particle {
    pub pos: Vec2,
    pub vel: Vec2,
    pub life: f32, // 0-1, decreases over time
    pub size: f32,
}

/// Rising score text
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FloatingText {
    pub pos: Vec2,
    pub vel: Vec2,
    pub life: f32,
    pub text: String,
}

/// Expanding flash at an impact point
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HitFlash {
    pub pos: Vec2,
    pub radius: f32,
    pub life: f32,
}

/// Cannon mode, toggled with the wheel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FireMode {
    /// One bullet per interval
    #[default]
    Dual,
    /// Two bullets per interval, more heat
    Quad,
}

impl FireMode {
    pub fn toggled(self) -> Self {
        match self {
            FireMode::Dual => FireMode::Quad,
            FireMode::Quad => FireMode::Dual,
        }
    }

    pub fn bullets_per_interval(self) -> usize {
        match self {
            FireMode::Dual => 1,
            FireMode::Quad => 2,
        }
    }

    pub fn heat_multiplier(self) -> f32 {
        match self {
            FireMode::Dual => 1.0,
            FireMode::Quad => QUAD_HEAT_MULTIPLIER,
        }
    }

    pub fn spread(self) -> f32 {
        match self {
            FireMode::Dual => DUAL_SPREAD,
            FireMode::Quad => QUAD_SPREAD,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FireMode::Dual => "dual",
            FireMode::Quad => "quad",
        }
    }
}

/// Twin cannon with heat and overheat lockout
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Weapon {
    pub mode: FireMode,
    /// 0-1
    pub heat: f32,
    pub overheated: bool,
    /// Milliseconds accumulated toward the next shot
    pub fire_timer_ms: f32,
    /// Shots fired since the trigger was last pressed
    pub shots_in_burst: u32,
    pub last_mode_switch_ms: Option<f64>,
}

impl Default for Weapon {
    fn default() -> Self {
        Self {
            mode: FireMode::Dual,
            heat: 0.0,
            overheated: false,
            fire_timer_ms: FIRE_INTERVAL_MS,
            shots_in_burst: 0,
            last_mode_switch_ms: None,
        }
    }
}

impl Weapon {
    pub const HEAT_PER_SHOT: f32 = 1.0 / SHOTS_TO_OVERHEAT;

    /// Add heat for one firing interval. Returns true when this shot overheated.
    pub fn add_shot_heat(&mut self) -> bool {
        self.heat = (self.heat + Self::HEAT_PER_SHOT * self.mode.heat_multiplier()).min(1.0);
        if self.heat >= 1.0 && !self.overheated {
            self.overheated = true;
            return true;
        }
        false
    }

    pub fn cool(&mut self, dt_ms: f32) {
        self.heat = (self.heat - HEAT_COOL_PER_MS * dt_ms).max(0.0);
    }

    /// Leave overheat once drained. Returns true on the transition.
    pub fn try_recover(&mut self) -> bool {
        if self.overheated && self.heat <= OVERHEAT_RECOVERY {
            self.overheated = false;
            return true;
        }
        false
    }

    /// Rate-limited mode toggle. Returns true when the mode changed.
    pub fn try_switch_mode(&mut self, now_ms: f64) -> bool {
        if let Some(last) = self.last_mode_switch_ms
            && now_ms - last < MODE_SWITCH_COOLDOWN_MS
        {
            return false;
        }
        self.last_mode_switch_ms = Some(now_ms);
        self.mode = self.mode.toggled();
        true
    }

    /// Reset the burst when the trigger is released
    pub fn release(&mut self) {
        self.fire_timer_ms = FIRE_INTERVAL_MS;
        self.shots_in_burst = 0;
    }
}

/// Things the host reacts to (sounds, HUD pops)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum GameEvent {
    Shoot,
    Hit,
    Kill { score: u64 },
    ModeSwitch(FireMode),
    Overheated,
    Recovered,
}

/// Monotonic entity id source
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityIds {
    next: u32,
}

impl Default for EntityIds {
    fn default() -> Self {
        Self { next: 1 }
    }
}

impl EntityIds {
    pub fn next_id(&mut self) -> u32 {
        let id = self.next;
        self.next += 1;
        id
    }
}

/// Complete simulation state, owned by the controller
#[derive(Debug, Clone)]
pub struct GameState {
    pub config: EngineConfig,
    pub rng: Pcg32,
    pub arena: Arena,
    /// Frames simulated
    pub frame_count: u64,
    /// Simulation clock (sum of clamped frame deltas)
    pub clock_ms: f64,
    pub score: u64,
    pub weapon: Weapon,
    pub bullets: Vec<Bullet>,
    /// Scan order matters for bullet tie-breaks (see `tick::find_hit`)
    pub groups: Vec<EnemyGroup>,
    pub particles: Vec<Particle>,
    pub floating_texts: Vec<FloatingText>,
    pub hit_flashes: Vec<HitFlash>,
    /// Current shake magnitude in pixels
    pub screen_shake: f32,
    /// Render offset for this frame
    pub shake_offset: Vec2,
    /// Drained by the host each frame
    pub events: Vec<GameEvent>,
    pub ids: EntityIds,
}

impl GameState {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            rng: Pcg32::seed_from_u64(config.seed),
            config,
            arena: Arena::new(800.0, 600.0),
            frame_count: 0,
            clock_ms: 0.0,
            score: 0,
            weapon: Weapon::default(),
            bullets: Vec::new(),
            groups: Vec::new(),
            particles: Vec::new(),
            floating_texts: Vec::new(),
            hit_flashes: Vec::new(),
            screen_shake: 0.0,
            shake_offset: Vec2::ZERO,
            events: Vec::new(),
            ids: EntityIds::default(),
        }
    }

    pub fn next_entity_id(&mut self) -> u32 {
        self.ids.next_id()
    }

    /// Units alive across every group
    pub fn alive_units(&self) -> usize {
        self.groups.iter().map(|g| g.units.len()).sum()
    }

    pub fn heat_ratio(&self) -> f32 {
        self.weapon.heat
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn units(n: usize, bonus: u8) -> Vec<EnemyUnit> {
        (0..n).map(|i| EnemyUnit::new(i as u32 + 1, 4, bonus, 0.0)).collect()
    }

    #[test]
    fn test_formation_table() {
        assert_eq!(Formation::of(Family::Normal, 1), Formation::Single);
        assert_eq!(Formation::of(Family::Cluster, 1), Formation::Single);
        assert_eq!(Formation::of(Family::Cluster, 2), Formation::Peanut);
        assert_eq!(Formation::of(Family::Cluster, 3), Formation::Triangle);
        assert_eq!(Formation::of(Family::Caterpillar, 2), Formation::Peanut);
        assert_eq!(Formation::of(Family::Caterpillar, 5), Formation::Line);
        assert_eq!(Formation::of(Family::Normal, 2), Formation::Peanut);
        assert_eq!(Formation::of(Family::Normal, 4), Formation::Line);
    }

    #[test]
    fn test_unit_hit_drops_hp_and_bonus_together() {
        let mut unit = EnemyUnit::new(1, 3, 2, 0.0);
        assert_eq!(unit.hp, 5);
        assert!(!unit.take_hit());
        assert_eq!((unit.hp, unit.fusion_bonus_remaining), (4, 1));
        assert_eq!(unit.square_spin_dir, -1.0);
        unit.take_hit();
        unit.take_hit();
        assert_eq!((unit.hp, unit.fusion_bonus_remaining), (2, 0));
        unit.take_hit();
        assert!(unit.take_hit());
    }

    #[test]
    fn test_lone_group_strips_fusion_bonus() {
        let group = EnemyGroup::new(9, Family::Cluster, SpawnSide::Left, units(1, 2));
        assert_eq!(group.units[0].fusion_bonus_remaining, 0);
        assert_eq!(group.units[0].hp, 4);
        assert_eq!(group.mass, UNIT_MASS);
    }

    #[test]
    fn test_group_mass_tracks_unit_count() {
        let mut group = EnemyGroup::new(9, Family::Caterpillar, SpawnSide::Right, units(4, 2));
        assert!((group.mass - 4.0 * UNIT_MASS).abs() < 1e-6);
        group.units.truncate(2);
        group.refresh_invariants();
        assert!((group.mass - 2.0 * UNIT_MASS).abs() < 1e-6);
        assert_eq!(group.units[0].fusion_bonus_remaining, 2);
    }

    #[test]
    fn test_weapon_overheat_and_recovery() {
        let mut weapon = Weapon::default();
        let mut overheated_at = None;
        for shot in 0..400 {
            if weapon.add_shot_heat() {
                overheated_at = Some(shot + 1);
                break;
            }
        }
        let shots = overheated_at.expect("weapon never overheated");
        assert!((179..=181).contains(&shots));
        assert!(!weapon.try_recover());
        weapon.cool(100_000.0);
        assert_eq!(weapon.heat, 0.0);
        assert!(weapon.try_recover());
        assert!(!weapon.overheated);
    }

    #[test]
    fn test_mode_switch_cooldown() {
        let mut weapon = Weapon::default();
        assert!(weapon.try_switch_mode(1000.0));
        assert!(!weapon.try_switch_mode(1050.0));
        assert_eq!(weapon.mode, FireMode::Quad);
        assert!(weapon.try_switch_mode(1200.0));
        assert_eq!(weapon.mode, FireMode::Dual);
    }
}
