//! Plain (uncompressed) viewport state shared with the rendering layer.

use crate::introns::TransformRequest;
use crate::introns::brush::midpoint;
use serde::Serialize;

/// Maximum number of pixels a single base pair may occupy.
pub const MAX_PIXEL_PER_BRUSH_BP: f64 = 20.0;

/// Inclusive absolute window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Window {
    pub start: i64,
    pub end: i64,
}

impl Window {
    pub fn new(start: i64, end: i64) -> Self {
        Self { start, end }
    }

    /// Brush size as the browser measures it (`end - start`).
    pub fn size(&self) -> i64 {
        self.end - self.start
    }

    pub fn midpoint(&self) -> i64 {
        midpoint(self.start, self.end)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Viewport {
    pub chromosome: Window,
    pub brush: Window,
    pub canvas_size: f64,
}

impl Viewport {
    /// Viewport over a chromosome of `chromosome_size` bases, showing all of it.
    pub fn new(chromosome_size: i64, canvas_size: f64) -> Self {
        let chromosome = Window::new(1, chromosome_size.max(1));
        Self {
            chromosome,
            brush: chromosome,
            canvas_size,
        }
    }

    pub fn with_brush(mut self, brush: Window) -> Self {
        self.brush = self.normalize(&TransformRequest::window(brush.start, brush.end));
        self
    }

    /// Pixels per base when the whole chromosome is on screen.
    pub fn chromosome_factor(&self) -> f64 {
        self.canvas_size / (self.chromosome.size() + 1) as f64
    }

    /// Pixels per base for the plain brush.
    pub fn factor(&self) -> f64 {
        self.canvas_size / self.brush.size().max(1) as f64
    }

    /// Clamp a requested window into the chromosome, honouring the minimum
    /// brush length imposed by the canvas width.
    pub fn normalize(&self, request: &TransformRequest) -> Window {
        if self.chromosome_factor() > MAX_PIXEL_PER_BRUSH_BP {
            return self.chromosome;
        }

        let chromosome_start = self.chromosome.start as f64;
        let chromosome_end = self.chromosome.end as f64;
        let start = request.start.unwrap_or(self.brush.start) as f64;
        let end = request.end.unwrap_or(self.brush.end) as f64;

        let min_length = self.canvas_size / MAX_PIXEL_PER_BRUSH_BP;
        let length = min_length.max(end - start);

        let start = if request.delta != 0 {
            let shifted = (start + request.delta as f64).max(chromosome_start);
            let end = chromosome_end.min(shifted + length);
            chromosome_start.max(end - length)
        } else {
            (start + end) / 2.0 - length / 2.0
        };

        let start = start.max(chromosome_start);
        let end = chromosome_end.min(start + length);
        let start = chromosome_start.max(end - length);

        let clamp = |value: f64| {
            (value.round() as i64).clamp(self.chromosome.start, self.chromosome.end)
        };
        Window::new(clamp(start), clamp(end))
    }
}

/// Notifications for the rendering layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum ViewportEvent {
    /// Mode toggled or compression settings changed; tracks should redraw.
    ShortenedIntronsChanged,
    #[serde(rename_all = "camelCase")]
    BrushChanged {
        start: i64,
        end: i64,
        /// Set once when leaving shortened-introns mode so the renderer
        /// skips interpolating from the compressed brush.
        awake_from_shortened_introns: bool,
    },
}
