//! Engine configuration
//!
//! Everything the engine needs from its host is passed in once, at
//! construction: theme colors, physics feel, sound profile and the feature set.
//! The older single-ring variant of the game is just [`EngineConfig::legacy`].

use serde::{Deserialize, Serialize};

use crate::consts::MAX_ALIVE_UNITS;

/// Overall impact "feel", chosen once per process
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhysicsPreset {
    pub name: &'static str,
    /// Fraction of the combined radii at which two units touch
    pub collision_ratio: f32,
    pub restitution_min: f32,
    pub restitution_max: f32,
    /// Velocity change applied to a group by one bullet hit
    pub knockback_base: f32,
}

impl PhysicsPreset {
    pub const SOFT: PhysicsPreset = PhysicsPreset {
        name: "soft",
        collision_ratio: 0.92,
        restitution_min: 0.35,
        restitution_max: 0.55,
        knockback_base: 0.9,
    };

    pub const CLASSIC: PhysicsPreset = PhysicsPreset {
        name: "classic",
        collision_ratio: 0.96,
        restitution_min: 0.55,
        restitution_max: 0.75,
        knockback_base: 1.4,
    };

    pub const BOUNCY: PhysicsPreset = PhysicsPreset {
        name: "bouncy",
        collision_ratio: 1.0,
        restitution_min: 0.75,
        restitution_max: 0.92,
        knockback_base: 2.0,
    };

    pub const ALL: [PhysicsPreset; 3] = [Self::SOFT, Self::CLASSIC, Self::BOUNCY];

    pub fn by_name(name: &str) -> Option<Self> {
        let name = name.trim().to_lowercase();
        Self::ALL.into_iter().find(|p| p.name == name)
    }
}

impl Default for PhysicsPreset {
    fn default() -> Self {
        Self::CLASSIC
    }
}

/// Foreground/background pair supplied by the host page theme
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThemeColors {
    pub foreground: String,
    pub background: String,
}

impl Default for ThemeColors {
    fn default() -> Self {
        Self {
            foreground: "#111111".to_string(),
            background: "#f5f5f0".to_string(),
        }
    }
}

/// Initial audio state for the cue tones
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SoundProfile {
    pub muted: bool,
    /// 0.0 - 1.0
    pub volume: f32,
}

impl Default for SoundProfile {
    fn default() -> Self {
        Self {
            muted: false,
            volume: 0.35,
        }
    }
}

/// Which enemy behaviors the engine runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineFeatures {
    /// Multi-unit cluster spawns with fusion bonus HP
    pub fused_groups: bool,
    /// Caterpillar spawns (turning, bisection)
    pub caterpillars: bool,
    /// Screen shake on kills
    pub screen_shake: bool,
}

impl Default for EngineFeatures {
    fn default() -> Self {
        Self {
            fused_groups: true,
            caterpillars: true,
            screen_shake: true,
        }
    }
}

/// Construction-time engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub seed: u64,
    pub theme: ThemeColors,
    #[serde(with = "preset_by_name")]
    pub preset: PhysicsPreset,
    pub sound: SoundProfile,
    pub features: EngineFeatures,
    /// Alive-unit cap across all groups
    pub max_alive_units: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            seed: 0x5EED_F00D,
            theme: ThemeColors::default(),
            preset: PhysicsPreset::default(),
            sound: SoundProfile::default(),
            features: EngineFeatures::default(),
            max_alive_units: MAX_ALIVE_UNITS,
        }
    }
}

impl EngineConfig {
    pub fn with_seed(seed: u64) -> Self {
        Self {
            seed,
            ..Self::default()
        }
    }

    /// Reduced feature set: lone rings only, no fusion, no caterpillars
    pub fn legacy() -> Self {
        Self {
            features: EngineFeatures {
                fused_groups: false,
                caterpillars: false,
                screen_shake: true,
            },
            ..Self::default()
        }
    }
}

/// Presets are stored by name in JSON
mod preset_by_name {
    use super::PhysicsPreset;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(preset: &PhysicsPreset, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(preset.name)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<PhysicsPreset, D::Error> {
        let name = String::deserialize(d)?;
        Ok(PhysicsPreset::by_name(&name).unwrap_or_else(|| {
            log::warn!("Unknown physics preset '{}', using classic", name);
            PhysicsPreset::default()
        }))
    }
}
