//! Frame-driven simulation module
//!
//! All gameplay logic lives here:
//! - Randomness only from the state's seeded generator (or an injected `Rng`)
//! - Stable iteration order over groups and units
//! - No rendering or platform dependencies

pub mod formation;
pub mod physics;
pub mod spawn;
pub mod state;
pub mod tick;

pub use formation::{WorldUnit, connections, local_offsets, world_unit_positions};
pub use physics::{
    BoundaryHit, SplitOutcome, apply_boundary_constraints, resolve_group_collisions, split_on_death,
};
pub use spawn::{spawn_group, spawn_interval_frames, try_spawn};
pub use state::{
    Arena, Bullet, EnemyGroup, EnemyUnit, Family, FireMode, FloatingText, Formation, GameEvent,
    GameState, HitFlash, Particle, SpawnSide, Weapon,
};
pub use tick::{TickInput, handle_wheel, tick};

#[cfg(test)]
pub(crate) mod test_support {
    use rand::RngCore;

    /// Generator that returns the same word forever
    pub struct ConstRng(pub u32);

    impl ConstRng {
        pub fn zero() -> Self {
            Self(0)
        }

        /// `random::<f32>()` yields exactly 0.5
        pub fn half() -> Self {
            Self(0x8000_0000)
        }

        pub fn from_fraction(f: f64) -> Self {
            Self((f * u32::MAX as f64) as u32)
        }
    }

    impl RngCore for ConstRng {
        fn next_u32(&mut self) -> u32 {
            self.0
        }

        fn next_u64(&mut self) -> u64 {
            ((self.0 as u64) << 32) | self.0 as u64
        }

        fn fill_bytes(&mut self, dst: &mut [u8]) {
            for chunk in dst.chunks_mut(4) {
                let bytes = self.0.to_le_bytes();
                chunk.copy_from_slice(&bytes[..chunk.len()]);
            }
        }
    }
}
