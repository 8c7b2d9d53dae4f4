use crate::{Color, Theme};
use color_eyre::eyre::{eyre, Report, Result};
use raqote::{DrawOptions, DrawTarget, LineCap, LineJoin, PathBuilder, Source, StrokeStyle};
use rusttype::{point, Font, PositionedGlyph, Scale};
use std::fmt::Debug;
use std::path::Path;

/// Horizontal alignment of text relative to its anchor point.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Anchor {
    Start,
    Middle,
    End,
}

/// A rectangular area of a [`Canvas`], in pixels.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Region {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Region {
    /// The whole image described by a [`Theme`].
    pub fn full(theme: &Theme) -> Self {
        Region { x: 0.0, y: 0.0, width: theme.width as f32, height: theme.height as f32 }
    }

    /// The plotting area left after removing the theme margins.
    pub fn inner(&self, theme: &Theme) -> Self {
        let m = theme.margin;
        Region {
            x: self.x + m.left,
            y: self.y + m.top,
            width: (self.width - m.left - m.right).max(1.0),
            height: (self.height - m.top - m.bottom).max(1.0),
        }
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }
}

/// A drawing surface with optional text support.
pub struct Canvas {
    pub target: DrawTarget,
    font: Option<Font<'static>>,
    font_size: f32,
}

impl Canvas {
    /// Create a blank [`Canvas`] filled with the theme background.
    pub fn new(theme: &Theme) -> Result<Self, Report> {
        if theme.width == 0 || theme.height == 0 {
            return Err(eyre!("Image dimensions must be positive: {}x{}", theme.width, theme.height));
        }
        let mut target = DrawTarget::new(theme.width as i32, theme.height as i32);
        target.clear(theme.background.to_source());
        let font = theme.load_font()?;
        Ok(Canvas { target, font, font_size: theme.font_size })
    }

    pub fn has_font(&self) -> bool {
        self.font.is_some()
    }

    pub fn font_size(&self) -> f32 {
        self.font_size
    }

    pub fn fill_rect(&mut self, x: f32, y: f32, width: f32, height: f32, color: Color) {
        let mut pb = PathBuilder::new();
        pb.rect(x, y, width, height);
        let path = pb.finish();
        self.target.fill(&path, &Source::Solid(color.to_source()), &DrawOptions::new());
    }

    pub fn fill_circle(&mut self, x: f32, y: f32, radius: f32, color: Color) {
        let mut pb = PathBuilder::new();
        pb.arc(x, y, radius, 0.0, 2.0 * std::f32::consts::PI);
        pb.close();
        let path = pb.finish();
        self.target.fill(&path, &Source::Solid(color.to_source()), &DrawOptions::new());
    }

    /// Fill a closed polygon. Fewer than three points draws nothing.
    pub fn fill_polygon(&mut self, points: &[(f32, f32)], color: Color) {
        if points.len() < 3 {
            return;
        }
        let mut pb = PathBuilder::new();
        pb.move_to(points[0].0, points[0].1);
        points[1..].iter().for_each(|(x, y)| pb.line_to(*x, *y));
        pb.close();
        let path = pb.finish();
        self.target.fill(&path, &Source::Solid(color.to_source()), &DrawOptions::new());
    }

    /// Stroke connected line segments. Fewer than two points draws nothing.
    pub fn stroke_polyline(&mut self, points: &[(f32, f32)], color: Color, width: f32) {
        if points.len() < 2 {
            return;
        }
        let mut pb = PathBuilder::new();
        pb.move_to(points[0].0, points[0].1);
        points[1..].iter().for_each(|(x, y)| pb.line_to(*x, *y));
        let path = pb.finish();
        let style =
            StrokeStyle { width, cap: LineCap::Round, join: LineJoin::Round, ..Default::default() };
        self.target.stroke(&path, &Source::Solid(color.to_source()), &style, &DrawOptions::new());
    }

    pub fn line(&mut self, from: (f32, f32), to: (f32, f32), color: Color, width: f32) {
        self.stroke_polyline(&[from, to], color, width);
    }

    fn layout<'f>(font: &'f Font<'static>, text: &str, size: f32) -> Vec<PositionedGlyph<'f>> {
        let scale = Scale::uniform(size);
        let ascent = font.v_metrics(scale).ascent;
        font.layout(text, scale, point(0.0, ascent)).collect()
    }

    /// Width of `text` in pixels at a given size, 0 without a font.
    pub fn text_width(&self, text: &str, size: f32) -> f32 {
        let Some(font) = &self.font else { return 0.0 };
        Canvas::layout(font, text, size)
            .last()
            .map(|g| g.position().x + g.unpositioned().h_metrics().advance_width)
            .unwrap_or(0.0)
    }

    /// Draw `text` with its top edge at `y`, aligned around `x` by `anchor`.
    pub fn text(&mut self, text: &str, x: f32, y: f32, size: f32, anchor: Anchor, color: Color) {
        let width = self.text_width(text, size);
        let Some(font) = &self.font else { return };

        let x = match anchor {
            Anchor::Start => x,
            Anchor::Middle => x - width / 2.0,
            Anchor::End => x - width,
        };

        let (image_w, image_h) = (self.target.width(), self.target.height());
        let data = self.target.get_data_mut();

        for glyph in Canvas::layout(font, text, size) {
            let Some(bb) = glyph.pixel_bounding_box() else { continue };
            glyph.draw(|gx, gy, coverage| {
                let px = x.round() as i32 + bb.min.x + gx as i32;
                let py = y.round() as i32 + bb.min.y + gy as i32;
                if px < 0 || py < 0 || px >= image_w || py >= image_h {
                    return;
                }
                let i = (py * image_w + px) as usize;
                data[i] = blend(data[i], color, coverage);
            });
        }
    }

    /// Write the canvas to a PNG file.
    pub fn write_png<P>(&self, path: &P) -> Result<(), Report>
    where
        P: AsRef<Path> + Debug,
    {
        self.target
            .write_png(path)
            .map_err(|e| eyre!("Failed to write PNG: {path:?}: {e}"))?;
        Ok(())
    }
}

/// Blend a color over a premultiplied ARGB pixel with a coverage in [0, 1].
fn blend(dst: u32, color: Color, coverage: f32) -> u32 {
    let alpha = (coverage.clamp(0.0, 1.0) * color.a as f32 / 255.0).clamp(0.0, 1.0);
    let channel = |shift: u32, src: u8| {
        let d = ((dst >> shift) & 0xff) as f32;
        let s = src as f32;
        ((s * alpha + d * (1.0 - alpha)).round() as u32).min(255) << shift
    };
    channel(24, 255) | channel(16, color.r) | channel(8, color.g) | channel(0, color.b)
}
