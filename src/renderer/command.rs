//! Backend-neutral draw list
//!
//! The simulation renders into a flat `Vec<DrawCommand>`; a backend (the
//! Canvas2D one on the web, or a test) replays it. Colors are theme slots, not
//! literal colors, so a theme change never touches the simulation.

use glam::Vec2;

/// Theme color slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Paint {
    Foreground,
    Background,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DrawCommand {
    /// Fill the whole surface with the background color
    Clear,
    /// Translate everything until the matching `PopOffset`
    PushOffset(Vec2),
    PopOffset,
    /// Stroked circular arc, angles in radians, clockwise in screen space
    Arc {
        center: Vec2,
        radius: f32,
        start: f32,
        end: f32,
        width: f32,
        alpha: f32,
    },
    /// Stroked quadratic curve
    Curve {
        from: Vec2,
        control: Vec2,
        to: Vec2,
        width: f32,
        alpha: f32,
    },
    /// Stroked line segment
    Segment {
        from: Vec2,
        to: Vec2,
        width: f32,
        alpha: f32,
    },
    /// Rotated square, filled with `fill` and outlined in the foreground
    Square {
        center: Vec2,
        half_size: f32,
        rotation: f32,
        fill: Paint,
        alpha: f32,
    },
    /// Filled disc
    Dot {
        center: Vec2,
        radius: f32,
        alpha: f32,
    },
    /// Centered text
    Text {
        pos: Vec2,
        text: String,
        size: f32,
        alpha: f32,
    },
}
