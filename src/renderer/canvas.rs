//! Canvas2D backend

use wasm_bindgen::JsCast;
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement};

use super::command::{DrawCommand, Paint};
use crate::tuning::ThemeColors;

pub struct CanvasRenderer {
    ctx: CanvasRenderingContext2d,
    theme: ThemeColors,
    width: f64,
    height: f64,
    /// Device pixels per CSS pixel
    scale: f64,
}

impl CanvasRenderer {
    pub fn new(canvas: &HtmlCanvasElement, theme: ThemeColors) -> Option<Self> {
        let ctx = canvas
            .get_context("2d")
            .ok()
            .flatten()?
            .dyn_into::<CanvasRenderingContext2d>()
            .ok()?;
        Some(Self {
            ctx,
            theme,
            width: canvas.width() as f64,
            height: canvas.height() as f64,
            scale: 1.0,
        })
    }

    pub fn set_theme(&mut self, theme: ThemeColors) {
        self.theme = theme;
    }

    /// Logical (CSS pixel) size and the device pixel ratio
    pub fn resize(&mut self, width: f64, height: f64, scale: f64) {
        self.width = width;
        self.height = height;
        self.scale = scale.max(1.0);
    }

    fn color(&self, paint: Paint) -> &str {
        match paint {
            Paint::Foreground => &self.theme.foreground,
            Paint::Background => &self.theme.background,
        }
    }

    pub fn draw(&self, commands: &[DrawCommand]) {
        let ctx = &self.ctx;
        ctx.set_transform(self.scale, 0.0, 0.0, self.scale, 0.0, 0.0).ok();
        ctx.set_line_cap("round");
        ctx.set_stroke_style_str(self.color(Paint::Foreground));

        for command in commands {
            match command {
                DrawCommand::Clear => {
                    ctx.set_global_alpha(1.0);
                    ctx.set_fill_style_str(self.color(Paint::Background));
                    ctx.fill_rect(0.0, 0.0, self.width, self.height);
                }
                DrawCommand::PushOffset(offset) => {
                    ctx.save();
                    ctx.translate(offset.x as f64, offset.y as f64).ok();
                }
                DrawCommand::PopOffset => ctx.restore(),
                DrawCommand::Arc {
                    center,
                    radius,
                    start,
                    end,
                    width,
                    alpha,
                } => {
                    ctx.set_global_alpha(*alpha as f64);
                    ctx.set_line_width(*width as f64);
                    ctx.begin_path();
                    ctx.arc(
                        center.x as f64,
                        center.y as f64,
                        *radius as f64,
                        *start as f64,
                        *end as f64,
                    )
                    .ok();
                    ctx.stroke();
                }
                DrawCommand::Curve {
                    from,
                    control,
                    to,
                    width,
                    alpha,
                } => {
                    ctx.set_global_alpha(*alpha as f64);
                    ctx.set_line_width(*width as f64);
                    ctx.begin_path();
                    ctx.move_to(from.x as f64, from.y as f64);
                    ctx.quadratic_curve_to(control.x as f64, control.y as f64, to.x as f64, to.y as f64);
                    ctx.stroke();
                }
                DrawCommand::Segment {
                    from,
                    to,
                    width,
                    alpha,
                } => {
                    ctx.set_global_alpha(*alpha as f64);
                    ctx.set_line_width(*width as f64);
                    ctx.begin_path();
                    ctx.move_to(from.x as f64, from.y as f64);
                    ctx.line_to(to.x as f64, to.y as f64);
                    ctx.stroke();
                }
                DrawCommand::Square {
                    center,
                    half_size,
                    rotation,
                    fill,
                    alpha,
                } => {
                    let h = *half_size as f64;
                    ctx.save();
                    ctx.set_global_alpha(*alpha as f64);
                    ctx.translate(center.x as f64, center.y as f64).ok();
                    ctx.rotate(*rotation as f64).ok();
                    ctx.set_fill_style_str(self.color(*fill));
                    ctx.fill_rect(-h, -h, h * 2.0, h * 2.0);
                    ctx.set_line_width(1.5);
                    ctx.stroke_rect(-h, -h, h * 2.0, h * 2.0);
                    ctx.restore();
                }
                DrawCommand::Dot {
                    center,
                    radius,
                    alpha,
                } => {
                    ctx.set_global_alpha(*alpha as f64);
                    ctx.set_fill_style_str(self.color(Paint::Foreground));
                    ctx.begin_path();
                    ctx.arc(
                        center.x as f64,
                        center.y as f64,
                        *radius as f64,
                        0.0,
                        std::f64::consts::TAU,
                    )
                    .ok();
                    ctx.fill();
                }
                DrawCommand::Text {
                    pos,
                    text,
                    size,
                    alpha,
                } => {
                    ctx.set_global_alpha(*alpha as f64);
                    ctx.set_fill_style_str(self.color(Paint::Foreground));
                    ctx.set_font(&format!("600 {}px monospace", size));
                    ctx.set_text_align("center");
                    ctx.fill_text(text, pos.x as f64, pos.y as f64).ok();
                }
            }
        }
        ctx.set_global_alpha(1.0);
    }
}
