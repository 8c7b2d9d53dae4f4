#![doc = include_str!("../README.md")]

mod bar;
mod canvas;
mod facet;
pub mod guide;
mod line;
mod scale;
mod theme;

#[doc(inline)]
pub use bar::BarChart;
#[doc(inline)]
pub use canvas::{Anchor, Canvas, Region};
#[doc(inline)]
pub use facet::FacetChart;
#[doc(inline)]
pub use line::{LineChart, Series};
#[doc(inline)]
pub use scale::{format_tick, nice_ticks, LinearScale};
#[doc(inline)]
pub use theme::{Color, Margin, Theme, FALLBACK_FONTS};

use color_eyre::eyre::{Report, Result};
use std::fmt::Debug;
use std::path::Path;

// ----------------------------------------------------------------------------
// Traits
// ----------------------------------------------------------------------------

/// A chart that can draw itself into a [`Region`] of a [`Canvas`].
pub trait Chart {
    /// Draw the chart into `region`, using the margins of `theme`.
    fn draw(&self, canvas: &mut Canvas, region: Region, theme: &Theme) -> Result<(), Report>;

    /// Returns a new [`Canvas`] with the chart drawn over the full image.
    fn render(&self, theme: &Theme) -> Result<Canvas, Report> {
        let mut canvas = Canvas::new(theme)?;
        self.draw(&mut canvas, Region::full(theme), theme)?;
        Ok(canvas)
    }

    /// Render the chart and write it as a PNG file.
    fn write_png<P>(&self, path: &P, theme: &Theme) -> Result<(), Report>
    where
        P: AsRef<Path> + Debug,
        Self: Sized,
    {
        self.render(theme)?.write_png(path)
    }
}
