//! Host facade
//!
//! The page talks to the game only through [`ArcadeGame`]: input handlers latch
//! small flags, `advance` runs one frame and returns its draw list, and the HUD
//! reads a [`HudSnapshot`] published after each frame. Nothing on the
//! presentation side can write simulation state.

use glam::Vec2;
use serde::Serialize;

use crate::renderer::{DrawCommand, render_frame};
use crate::sim::{Arena, FireMode, GameEvent, GameState, TickInput, handle_wheel, tick};
use crate::tuning::{EngineConfig, ThemeColors};

/// Read-only view for the HUD layer
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct HudSnapshot {
    pub score: u64,
    pub fire_mode: FireMode,
    /// 0-1
    pub heat_ratio: f32,
    pub overheated: bool,
    pub muted: bool,
}

pub struct ArcadeGame {
    state: GameState,
    input: TickInput,
    theme: ThemeColors,
    muted: bool,
    visible: bool,
    hud: HudSnapshot,
}

impl ArcadeGame {
    pub fn new(config: EngineConfig) -> Self {
        log::info!(
            "Arcade started (seed {:#x}, preset {}, fused groups {}, caterpillars {})",
            config.seed,
            config.preset.name,
            config.features.fused_groups,
            config.features.caterpillars
        );
        let mut game = Self {
            theme: config.theme.clone(),
            muted: config.sound.muted,
            state: GameState::new(config),
            input: TickInput::default(),
            visible: true,
            hud: HudSnapshot::default(),
        };
        game.publish();
        game
    }

    // === Input intake ===

    /// Pointer position in surface-local pixels
    pub fn pointer_move(&mut self, x: f32, y: f32) {
        self.input.pointer = Some(Vec2::new(x, y));
    }

    pub fn pointer_down(&mut self) {
        self.input.trigger_held = true;
    }

    pub fn pointer_up(&mut self) {
        self.input.trigger_held = false;
    }

    pub fn pointer_enter(&mut self) {
        self.input.hovering = true;
    }

    /// Leaving the surface also lets go of the trigger
    pub fn pointer_leave(&mut self) {
        self.input.hovering = false;
        self.input.trigger_held = false;
    }

    /// Wheel over the surface. Returns true if the fire mode changed.
    pub fn wheel(&mut self, now_ms: f64) -> bool {
        let switched = handle_wheel(&mut self.state, &self.input, now_ms);
        if switched {
            self.publish();
        }
        switched
    }

    pub fn set_visible(&mut self, visible: bool) {
        if self.visible != visible {
            log::debug!("Arcade {}", if visible { "resumed" } else { "paused" });
        }
        self.visible = visible;
        if !visible {
            self.input.trigger_held = false;
        }
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn set_theme(&mut self, theme: ThemeColors) {
        self.theme = theme;
    }

    pub fn theme(&self) -> &ThemeColors {
        &self.theme
    }

    pub fn set_muted(&mut self, muted: bool) {
        self.muted = muted;
        self.publish();
    }

    /// Returns the new mute state
    pub fn toggle_mute(&mut self) -> bool {
        self.set_muted(!self.muted);
        self.muted
    }

    // === Frame ===

    /// Run one frame on a surface of `width` x `height` and return its draw list.
    ///
    /// While hidden nothing is simulated and the frame is empty.
    pub fn advance(&mut self, delta_ms: f32, width: f32, height: f32) -> Vec<DrawCommand> {
        if !self.visible {
            return Vec::new();
        }
        if width > 0.0 && height > 0.0 {
            self.state.arena = Arena::new(width, height);
        }
        tick(&mut self.state, &self.input, delta_ms);
        self.publish();
        render_frame(&self.state)
    }

    fn publish(&mut self) {
        self.hud = HudSnapshot {
            score: self.state.score,
            fire_mode: self.state.weapon.mode,
            heat_ratio: self.state.heat_ratio().clamp(0.0, 1.0),
            overheated: self.state.weapon.overheated,
            muted: self.muted,
        };
    }

    pub fn hud(&self) -> HudSnapshot {
        self.hud
    }

    /// Events since the last drain, oldest first
    pub fn drain_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.state.events)
    }

    /// Start a fresh session with the same configuration
    pub fn reset(&mut self) {
        let config = self.state.config.clone();
        let arena = self.state.arena;
        self.state = GameState::new(config);
        self.state.arena = arena;
        self.input.trigger_held = false;
        self.publish();
        log::info!("Arcade reset");
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::FRAME_MS;

    fn game() -> ArcadeGame {
        ArcadeGame::new(EngineConfig::with_seed(5))
    }

    #[test]
    fn test_hidden_surface_does_not_step() {
        let mut g = game();
        assert!(g.is_visible());
        g.set_visible(false);
        assert!(!g.is_visible());
        assert!(g.advance(FRAME_MS, 640.0, 480.0).is_empty());
        assert_eq!(g.state().frame_count, 0);
        g.set_visible(true);
        assert!(!g.advance(FRAME_MS, 640.0, 480.0).is_empty());
        assert_eq!(g.state().frame_count, 1);
    }

    #[test]
    fn test_advance_resizes_arena_and_publishes() {
        let mut g = game();
        g.pointer_enter();
        g.pointer_move(320.0, 100.0);
        g.pointer_down();
        g.advance(FRAME_MS, 640.0, 480.0);
        assert_eq!(g.state().arena, Arena::new(640.0, 480.0));
        let hud = g.hud();
        assert!(hud.heat_ratio > 0.0);
        assert!(!hud.overheated);
        assert_eq!(hud.fire_mode, FireMode::Dual);
        assert!(g.drain_events().contains(&GameEvent::Shoot));
        assert!(g.drain_events().is_empty());
    }

    #[test]
    fn test_pointer_leave_releases_trigger() {
        let mut g = game();
        g.pointer_enter();
        g.pointer_down();
        g.pointer_leave();
        g.advance(FRAME_MS, 640.0, 480.0);
        assert!(g.state().bullets.is_empty());
    }

    #[test]
    fn test_wheel_needs_hover_and_cooldown() {
        let mut g = game();
        assert!(!g.wheel(100.0));
        g.pointer_enter();
        assert!(g.wheel(1000.0));
        assert!(!g.wheel(1050.0));
        assert_eq!(g.hud().fire_mode, FireMode::Quad);
        let switches = g
            .drain_events()
            .into_iter()
            .filter(|e| matches!(e, GameEvent::ModeSwitch(_)))
            .count();
        assert_eq!(switches, 1);
    }

    #[test]
    fn test_mute_is_published() {
        let mut g = game();
        assert!(!g.hud().muted);
        assert!(g.toggle_mute());
        assert!(g.hud().muted);
        g.set_muted(false);
        assert!(!g.hud().muted);
    }

    #[test]
    fn test_theme_swap() {
        let mut g = game();
        let dark = ThemeColors {
            foreground: "#eeeeee".to_string(),
            background: "#0a0a0a".to_string(),
        };
        g.set_theme(dark.clone());
        assert_eq!(g.theme(), &dark);
    }

    #[test]
    fn test_reset_clears_session() {
        let mut g = game();
        g.pointer_enter();
        g.pointer_down();
        for _ in 0..200 {
            g.advance(FRAME_MS, 640.0, 480.0);
        }
        g.reset();
        assert_eq!(g.hud().score, 0);
        assert_eq!(g.hud().heat_ratio, 0.0);
        assert!(g.state().groups.is_empty());
        assert_eq!(g.state().arena, Arena::new(640.0, 480.0));
    }
}
