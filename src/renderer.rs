// Renderer trait covering the handful of 2d-context calls the field makes,
// and the canvas-backed implementation. Keeping the trait this narrow lets
// the field logic run against a recording implementation in tests.

use crate::color::Color;
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement};

pub trait Renderer {
    /// Sets the drawing-surface resolution in device pixels. This is the
    /// canvas attribute size, not the CSS size; the two must match or the
    /// output blurs.
    fn resize_surface(&mut self, width: u32, height: u32);

    fn clear(&mut self, width: u32, height: u32);

    fn fill_circle(&mut self, center: [f64; 2], radius: f64, color: Color, alpha: f64);

    fn stroke_line(&mut self, from: [f64; 2], to: [f64; 2], color: Color, alpha: f64);
}

pub struct CanvasRenderer {
    canvas: HtmlCanvasElement,
    context: CanvasRenderingContext2d,
}

impl CanvasRenderer {
    // None when the canvas has no 2d context; callers treat that as "draw
    // nothing", never as an error.
    pub fn new(canvas: HtmlCanvasElement) -> Option<CanvasRenderer> {
        let context = canvas
            .get_context("2d")
            .ok()??
            .dyn_into::<CanvasRenderingContext2d>()
            .ok()?;
        Some(CanvasRenderer { canvas, context })
    }
}

impl Renderer for CanvasRenderer {
    fn resize_surface(&mut self, width: u32, height: u32) {
        self.canvas.set_width(width);
        self.canvas.set_height(height);
    }

    fn clear(&mut self, width: u32, height: u32) {
        self.context
            .clear_rect(0.0, 0.0, width as f64, height as f64);
    }

    fn fill_circle(&mut self, center: [f64; 2], radius: f64, color: Color, alpha: f64) {
        self.context.begin_path();
        let _ = self
            .context
            .arc(center[0], center[1], radius, 0.0, std::f64::consts::PI * 2.0);
        self.context
            .set_fill_style(&JsValue::from_str(&color.to_css(alpha)));
        self.context.fill();
    }

    fn stroke_line(&mut self, from: [f64; 2], to: [f64; 2], color: Color, alpha: f64) {
        self.context.begin_path();
        self.context.move_to(from[0], from[1]);
        self.context.line_to(to[0], to[1]);
        self.context
            .set_stroke_style(&JsValue::from_str(&color.to_css(alpha)));
        self.context.set_line_width(1.0);
        self.context.stroke();
    }
}
