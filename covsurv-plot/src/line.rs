use crate::guide::{draw_axes, draw_legend, draw_title, Tick};
use crate::{format_tick, nice_ticks, Canvas, Chart, LinearScale, Region, Theme};
use color_eyre::eyre::{Report, Result};
use itertools::Itertools;

/// A named sequence of `(x, y)` points, with an optional `(x, low, high)` band.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Series {
    pub label: String,
    pub points: Vec<(f32, f32)>,
    pub band: Option<Vec<(f32, f32, f32)>>,
}

/// Lines and/or points for one or more [`Series`], with optional ribbons and a
/// horizontal reference line.
///
/// ## Examples
///
/// ```rust
/// use covsurv_plot::{Chart, LineChart, Series, Theme};
///
/// let series = Series {
///     label: "R".to_string(),
///     points: vec![(0.0, 1.2), (1.0, 1.1), (2.0, 0.9)],
///     band: Some(vec![(0.0, 1.0, 1.4), (1.0, 0.9, 1.3), (2.0, 0.7, 1.1)]),
/// };
/// let chart = LineChart { series: vec![series], reference: Some(1.0), lines: true, ..Default::default() };
/// let output = tempfile::NamedTempFile::new()?;
/// chart.write_png(&output.path(), &Theme::default())?;
/// # Ok::<(), color_eyre::eyre::Report>(())
/// ```
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LineChart {
    pub title: String,
    pub x_title: String,
    pub y_title: String,
    pub series: Vec<Series>,
    /// Labelled x ticks (ex. dates), computed from the data when empty.
    pub x_ticks: Vec<Tick>,
    /// Fixed y range, computed from the data when [`None`].
    pub y_range: Option<(f32, f32)>,
    /// Draw a marker at every point.
    pub points: bool,
    /// Connect points with lines.
    pub lines: bool,
    /// Horizontal reference line (ex. R = 1).
    pub reference: Option<f32>,
    pub legend: bool,
    /// Palette offset of the first series, lets facet panels keep their category colors.
    pub color_offset: usize,
}

impl LineChart {
    /// Returns the (min, max) of all x values and all y values, bands included.
    pub fn extent(&self) -> Option<((f32, f32), (f32, f32))> {
        let xs = self
            .series
            .iter()
            .flat_map(|s| {
                let band = s.band.iter().flatten().map(|(x, _, _)| *x);
                s.points.iter().map(|(x, _)| *x).chain(band)
            })
            .filter(|v| v.is_finite())
            .collect_vec();
        let ys = self
            .series
            .iter()
            .flat_map(|s| {
                let band = s.band.iter().flatten().flat_map(|(_, lo, hi)| [*lo, *hi]);
                s.points.iter().map(|(_, y)| *y).chain(band)
            })
            .chain(self.reference)
            .filter(|v| v.is_finite())
            .collect_vec();

        let x = xs.into_iter().minmax_by(|a, b| a.total_cmp(b)).into_option()?;
        let y = ys.into_iter().minmax_by(|a, b| a.total_cmp(b)).into_option()?;
        Some((x, y))
    }
}

impl Chart for LineChart {
    fn draw(&self, canvas: &mut Canvas, region: Region, theme: &Theme) -> Result<(), Report> {
        draw_title(canvas, &region, &self.title, theme);
        let area = region.inner(theme);

        let ((x_min, x_max), (y_min, y_max)) = self.extent().unwrap_or(((0.0, 1.0), (0.0, 1.0)));
        let (y_min, y_max) = self.y_range.unwrap_or((y_min, y_max));
        let x = LinearScale::new((x_min, x_max), (area.x, area.right()));
        let y = LinearScale::new((y_min, y_max), (area.bottom(), area.y));

        let x_ticks = if self.x_ticks.is_empty() {
            nice_ticks(x.domain.0, x.domain.1, 6).into_iter().map(|v| (v, format_tick(v))).collect()
        } else {
            self.x_ticks.clone()
        };
        let y_ticks: Vec<Tick> = nice_ticks(y.domain.0, y.domain.1, 5)
            .into_iter()
            .map(|v| (v, format_tick(v)))
            .collect();
        draw_axes(canvas, &area, &x, &y, &x_ticks, &y_ticks, &self.x_title, &self.y_title, theme);

        let clamp = |(px, py): (f32, f32)| (px, py.clamp(area.y, area.bottom()));

        // ribbons first, so lines stay visible on top
        for (i, series) in self.series.iter().enumerate() {
            let Some(band) = &series.band else { continue };
            let color = theme.color(self.color_offset + i).with_alpha(theme.ribbon_alpha);
            let upper = band.iter().map(|(bx, _, hi)| clamp((x.map(*bx), y.map(*hi))));
            let lower = band.iter().rev().map(|(bx, lo, _)| clamp((x.map(*bx), y.map(*lo))));
            let polygon = upper.chain(lower).collect_vec();
            canvas.fill_polygon(&polygon, color);
        }

        if let Some(reference) = self.reference {
            let py = y.map(reference);
            if py >= area.y && py <= area.bottom() {
                canvas.line((area.x, py), (area.right(), py), theme.foreground.with_alpha(160), 1.0);
            }
        }

        for (i, series) in self.series.iter().enumerate() {
            let color = theme.color(self.color_offset + i);
            let pixels = series
                .points
                .iter()
                .filter(|(_, py)| py.is_finite())
                .map(|(px, py)| clamp((x.map(*px), y.map(*py))))
                .collect_vec();
            if self.lines {
                canvas.stroke_polyline(&pixels, color, theme.line_width);
            }
            if self.points {
                pixels.iter().for_each(|(px, py)| canvas.fill_circle(*px, *py, theme.point_radius, color));
            }
        }

        if self.legend {
            let entries = self
                .series
                .iter()
                .enumerate()
                .map(|(i, s)| (s.label.clone(), theme.color(self.color_offset + i)))
                .collect_vec();
            draw_legend(canvas, &area, &entries, theme);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extent_includes_band_and_reference() {
        let chart = LineChart {
            series: vec![Series {
                label: "a".to_string(),
                points: vec![(1.0, 2.0), (3.0, 4.0)],
                band: Some(vec![(0.0, 1.5, 5.0)]),
            }],
            reference: Some(0.5),
            ..Default::default()
        };
        assert_eq!(chart.extent(), Some(((0.0, 3.0), (0.5, 5.0))));
    }

    #[test]
    fn empty_chart_renders() {
        let chart = LineChart::default();
        let theme = Theme { width: 100, height: 100, ..Default::default() };
        assert!(chart.render(&theme).is_ok());
    }
}
