//! Player preferences
//!
//! Persisted in LocalStorage as JSON. The game state itself is never saved.

use serde::{Deserialize, Serialize};

use crate::tuning::{EngineConfig, PhysicsPreset, SoundProfile};

/// Game settings/preferences
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Physics preset name (soft, classic, bouncy)
    pub physics_preset: String,
    /// Lone rings only, no fused groups or caterpillars
    pub legacy_mode: bool,

    // === Visual Effects ===
    /// Screen shake on kills
    pub screen_shake: bool,

    // === Audio ===
    pub muted: bool,
    /// Cue volume (0.0 - 1.0)
    pub volume: f32,

    // === Accessibility ===
    /// Reduced motion (no shake)
    pub reduced_motion: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            physics_preset: PhysicsPreset::default().name.to_string(),
            legacy_mode: false,
            screen_shake: true,
            muted: false,
            volume: SoundProfile::default().volume,
            reduced_motion: false,
        }
    }
}

impl Settings {
    /// Effective screen shake (respects reduced_motion)
    pub fn effective_screen_shake(&self) -> bool {
        self.screen_shake && !self.reduced_motion
    }

    pub fn preset(&self) -> PhysicsPreset {
        PhysicsPreset::by_name(&self.physics_preset).unwrap_or_else(|| {
            log::warn!("Unknown physics preset '{}', using classic", self.physics_preset);
            PhysicsPreset::default()
        })
    }

    pub fn sound_profile(&self) -> SoundProfile {
        SoundProfile {
            muted: self.muted,
            volume: self.volume.clamp(0.0, 1.0),
        }
    }

    /// Engine configuration for a new session
    pub fn engine_config(&self, seed: u64) -> EngineConfig {
        let mut config = if self.legacy_mode {
            EngineConfig::legacy()
        } else {
            EngineConfig::default()
        };
        config.seed = seed;
        config.preset = self.preset();
        config.sound = self.sound_profile();
        config.features.screen_shake = self.effective_screen_shake();
        config
    }

    /// Parse stored JSON, falling back to defaults
    pub fn from_json(json: &str) -> Self {
        serde_json::from_str(json).unwrap_or_else(|e| {
            log::warn!("Ignoring stored settings: {}", e);
            Self::default()
        })
    }

    /// LocalStorage key
    const STORAGE_KEY: &'static str = "fusion_rings_settings";

    /// Load settings from LocalStorage (WASM only)
    #[cfg(target_arch = "wasm32")]
    pub fn load() -> Self {
        let storage = web_sys::window()
            .and_then(|w| w.local_storage().ok())
            .flatten();

        if let Some(storage) = storage
            && let Ok(Some(json)) = storage.get_item(Self::STORAGE_KEY)
        {
            log::info!("Loaded settings from LocalStorage");
            return Self::from_json(&json);
        }

        log::info!("Using default settings");
        Self::default()
    }

    /// Save settings to LocalStorage (WASM only)
    #[cfg(target_arch = "wasm32")]
    pub fn save(&self) {
        let storage = web_sys::window()
            .and_then(|w| w.local_storage().ok())
            .flatten();

        if let Some(storage) = storage
            && let Ok(json) = serde_json::to_string(self)
        {
            let _ = storage.set_item(Self::STORAGE_KEY, &json);
            log::debug!("Settings saved");
        }
    }

    /// Native stubs
    #[cfg(not(target_arch = "wasm32"))]
    pub fn load() -> Self {
        Self::default()
    }

    #[cfg(not(target_arch = "wasm32"))]
    pub fn save(&self) {
        // No-op for native
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reduced_motion_disables_shake() {
        let settings = Settings {
            reduced_motion: true,
            ..Settings::default()
        };
        assert!(!settings.effective_screen_shake());
        assert!(!settings.engine_config(1).features.screen_shake);
    }

    #[test]
    fn test_engine_config_from_settings() {
        let settings = Settings {
            physics_preset: "Bouncy".to_string(),
            muted: true,
            volume: 3.0,
            ..Settings::default()
        };
        let cfg = settings.engine_config(77);
        assert_eq!(cfg.seed, 77);
        assert_eq!(cfg.preset, PhysicsPreset::BOUNCY);
        assert!(cfg.sound.muted);
        assert_eq!(cfg.sound.volume, 1.0);
        assert!(cfg.features.caterpillars);
    }

    #[test]
    fn test_legacy_mode_uses_reduced_engine() {
        let settings = Settings {
            legacy_mode: true,
            ..Settings::default()
        };
        let cfg = settings.engine_config(1);
        assert!(!cfg.features.fused_groups);
        assert!(!cfg.features.caterpillars);
    }

    #[test]
    fn test_unknown_preset_falls_back() {
        let settings = Settings {
            physics_preset: "rubber".to_string(),
            ..Settings::default()
        };
        assert_eq!(settings.preset(), PhysicsPreset::CLASSIC);
    }

    #[test]
    fn test_from_json_partial_and_garbage() {
        let partial = Settings::from_json(r#"{"muted": true}"#);
        assert!(partial.muted);
        assert_eq!(partial.physics_preset, "classic");
        assert_eq!(Settings::from_json("not json"), Settings::default());
    }
}
