//! Audio cues using the Web Audio API
//!
//! Short synthesized tones, no sample files. The audio context is created on
//! the first cue (browsers only allow it after a user gesture) and a failure
//! disables sound for the session.

use crate::sim::GameEvent;
use crate::tuning::SoundProfile;

#[cfg(target_arch = "wasm32")]
use web_sys::{AudioContext, GainNode, OscillatorNode, OscillatorType};

/// Sound effect types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SoundEffect {
    /// Cannon fired
    Shoot,
    /// Bullet struck a unit
    Hit,
    /// Fire mode toggled
    ModeSwitch,
}

/// Oscillator waveform
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wave {
    Sine,
    Square,
    Triangle,
}

/// One tone: a pitch sweep under a decaying gain envelope
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tone {
    pub wave: Wave,
    pub start_hz: f32,
    pub end_hz: f32,
    /// Peak gain before volume scaling
    pub gain: f32,
    /// Seconds
    pub duration: f64,
}

impl SoundEffect {
    /// Sound for a simulation event, if it has one
    pub fn from_event(event: &GameEvent) -> Option<Self> {
        match event {
            GameEvent::Shoot => Some(SoundEffect::Shoot),
            GameEvent::Hit => Some(SoundEffect::Hit),
            GameEvent::ModeSwitch(_) => Some(SoundEffect::ModeSwitch),
            GameEvent::Kill { .. } | GameEvent::Overheated | GameEvent::Recovered => None,
        }
    }

    pub fn tones(self) -> &'static [Tone] {
        match self {
            // Quiet tick, it fires 25 times a second
            SoundEffect::Shoot => &[Tone {
                wave: Wave::Square,
                start_hz: 880.0,
                end_hz: 440.0,
                gain: 0.08,
                duration: 0.04,
            }],
            SoundEffect::Hit => &[
                Tone {
                    wave: Wave::Triangle,
                    start_hz: 320.0,
                    end_hz: 120.0,
                    gain: 0.3,
                    duration: 0.08,
                },
                Tone {
                    wave: Wave::Sine,
                    start_hz: 90.0,
                    end_hz: 50.0,
                    gain: 0.25,
                    duration: 0.1,
                },
            ],
            SoundEffect::ModeSwitch => &[Tone {
                wave: Wave::Sine,
                start_hz: 520.0,
                end_hz: 1040.0,
                gain: 0.25,
                duration: 0.12,
            }],
        }
    }
}

/// Audio manager for the game
pub struct AudioManager {
    #[cfg(target_arch = "wasm32")]
    ctx: Option<AudioContext>,
    /// Context creation already failed once
    #[cfg(target_arch = "wasm32")]
    unavailable: bool,
    volume: f32,
    muted: bool,
}

impl Default for AudioManager {
    fn default() -> Self {
        Self::new(SoundProfile::default())
    }
}

impl AudioManager {
    pub fn new(profile: SoundProfile) -> Self {
        Self {
            #[cfg(target_arch = "wasm32")]
            ctx: None,
            #[cfg(target_arch = "wasm32")]
            unavailable: false,
            volume: profile.volume.clamp(0.0, 1.0),
            muted: profile.muted,
        }
    }

    /// Set volume (0.0 - 1.0)
    pub fn set_volume(&mut self, vol: f32) {
        self.volume = vol.clamp(0.0, 1.0);
    }

    pub fn set_muted(&mut self, muted: bool) {
        self.muted = muted;
    }

    pub fn is_muted(&self) -> bool {
        self.muted
    }

    /// Get effective volume
    pub fn effective_volume(&self) -> f32 {
        if self.muted { 0.0 } else { self.volume }
    }

    /// Play the cue for each event that has one
    pub fn play_events(&mut self, events: &[GameEvent]) {
        for effect in events.iter().filter_map(SoundEffect::from_event) {
            self.play(effect);
        }
    }

    /// Play a sound effect
    #[cfg(target_arch = "wasm32")]
    pub fn play(&mut self, effect: SoundEffect) {
        let vol = self.effective_volume();
        if vol <= 0.0 {
            return;
        }
        let Some(ctx) = self.context() else { return };

        // Resume context if suspended (browsers require user gesture)
        if ctx.state() == web_sys::AudioContextState::Suspended {
            let _ = ctx.resume();
        }
        for tone in effect.tones() {
            play_tone(ctx, tone, vol);
        }
    }

    #[cfg(not(target_arch = "wasm32"))]
    pub fn play(&mut self, effect: SoundEffect) {
        if self.effective_volume() > 0.0 {
            log::trace!("Sound {:?} (no audio device)", effect);
        }
    }

    #[cfg(target_arch = "wasm32")]
    fn context(&mut self) -> Option<&AudioContext> {
        if self.ctx.is_none() && !self.unavailable {
            self.ctx = AudioContext::new().ok();
            if self.ctx.is_none() {
                log::warn!("Failed to create AudioContext - audio disabled");
                self.unavailable = true;
            }
        }
        self.ctx.as_ref()
    }

    /// Drop the audio device handle when the game loop stops
    pub fn release(&mut self) {
        #[cfg(target_arch = "wasm32")]
        {
            if let Some(ctx) = self.ctx.take() {
                let _ = ctx.close();
            }
        }
    }
}

#[cfg(target_arch = "wasm32")]
fn create_osc(ctx: &AudioContext, freq: f32, wave: Wave) -> Option<(OscillatorNode, GainNode)> {
    let osc = ctx.create_oscillator().ok()?;
    let gain = ctx.create_gain().ok()?;

    osc.set_type(match wave {
        Wave::Sine => OscillatorType::Sine,
        Wave::Square => OscillatorType::Square,
        Wave::Triangle => OscillatorType::Triangle,
    });
    osc.frequency().set_value(freq);
    osc.connect_with_audio_node(&gain).ok()?;
    gain.connect_with_audio_node(&ctx.destination()).ok()?;

    Some((osc, gain))
}

#[cfg(target_arch = "wasm32")]
fn play_tone(ctx: &AudioContext, tone: &Tone, vol: f32) {
    let Some((osc, gain)) = create_osc(ctx, tone.start_hz, tone.wave) else {
        return;
    };
    let t = ctx.current_time();

    gain.gain().set_value_at_time(vol * tone.gain, t).ok();
    gain.gain()
        .exponential_ramp_to_value_at_time(0.001, t + tone.duration)
        .ok();
    osc.frequency().set_value_at_time(tone.start_hz, t).ok();
    osc.frequency()
        .exponential_ramp_to_value_at_time(tone.end_hz, t + tone.duration)
        .ok();

    osc.start().ok();
    osc.stop_with_when(t + tone.duration + 0.02).ok();
}
