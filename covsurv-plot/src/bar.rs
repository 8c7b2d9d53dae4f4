use crate::guide::{draw_axes, draw_legend, draw_title, Tick};
use crate::{format_tick, nice_ticks, Canvas, Chart, LinearScale, Region, Theme};
use color_eyre::eyre::{eyre, Report, Result};
use itertools::Itertools;

/// Bars of category values at each x label, stacked or side by side.
///
/// ## Examples
///
/// ```rust
/// use covsurv_plot::{BarChart, Chart, Theme};
///
/// let chart = BarChart {
///     title: "Genomes per week".to_string(),
///     x_labels: vec!["2021-W01".to_string(), "2021-W02".to_string()],
///     categories: vec!["B.1".to_string(), "B.1.1.7".to_string()],
///     values: vec![vec![4.0, 1.0], vec![2.0, 5.0]],
///     stacked: true,
///     ..Default::default()
/// };
/// let output = tempfile::NamedTempFile::new()?;
/// chart.write_png(&output.path(), &Theme::default())?;
/// # Ok::<(), color_eyre::eyre::Report>(())
/// ```
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BarChart {
    pub title: String,
    pub x_title: String,
    pub y_title: String,
    /// One label per bar position.
    pub x_labels: Vec<String>,
    /// One name per colored category.
    pub categories: Vec<String>,
    /// Values indexed as `values[x][category]`.
    pub values: Vec<Vec<f32>>,
    pub stacked: bool,
}

impl BarChart {
    fn validate(&self) -> Result<(), Report> {
        if self.values.len() != self.x_labels.len() {
            return Err(eyre!(
                "Bar chart has {} x labels but {} value rows.",
                self.x_labels.len(),
                self.values.len()
            ));
        }
        if let Some(row) = self.values.iter().find(|row| row.len() != self.categories.len()) {
            return Err(eyre!(
                "Bar chart has {} categories but a value row of length {}.",
                self.categories.len(),
                row.len()
            ));
        }
        Ok(())
    }

    fn y_max(&self) -> f32 {
        let max = if self.stacked {
            self.values.iter().map(|row| row.iter().sum::<f32>()).fold(0.0, f32::max)
        } else {
            self.values.iter().flatten().copied().fold(0.0, f32::max)
        };
        if max > 0.0 {
            max
        } else {
            1.0
        }
    }
}

impl Chart for BarChart {
    fn draw(&self, canvas: &mut Canvas, region: Region, theme: &Theme) -> Result<(), Report> {
        self.validate()?;
        draw_title(canvas, &region, &self.title, theme);
        let area = region.inner(theme);

        let n = self.x_labels.len().max(1) as f32;
        let slot = area.width / n;
        // bar positions are slot centers, indexed from 0
        let x = LinearScale::new((-0.5, n - 0.5), (area.x, area.right()));
        let y_ticks = nice_ticks(0.0, self.y_max(), 5);
        let y_top = y_ticks.last().copied().unwrap_or(1.0).max(self.y_max());
        let y = LinearScale::new((0.0, y_top), (area.bottom(), area.y));

        let x_ticks: Vec<Tick> =
            self.x_labels.iter().enumerate().map(|(i, l)| (i as f32, l.clone())).collect();
        let y_ticks: Vec<Tick> = y_ticks.into_iter().map(|v| (v, format_tick(v))).collect();
        draw_axes(canvas, &area, &x, &y, &x_ticks, &y_ticks, &self.x_title, &self.y_title, theme);

        let bar_width = slot * 0.8;
        let n_categories = self.categories.len().max(1) as f32;
        for (i, row) in self.values.iter().enumerate() {
            let left = x.map(i as f32) - bar_width / 2.0;
            let mut base = 0.0;
            for (c, value) in row.iter().enumerate() {
                if *value <= 0.0 {
                    continue;
                }
                let color = theme.color(c);
                if self.stacked {
                    let (top, bottom) = (y.map(base + value), y.map(base));
                    canvas.fill_rect(left, top, bar_width, bottom - top, color);
                    base += value;
                } else {
                    let width = bar_width / n_categories;
                    let top = y.map(*value);
                    canvas.fill_rect(left + c as f32 * width, top, width, area.bottom() - top, color);
                }
            }
        }

        let entries = self
            .categories
            .iter()
            .enumerate()
            .map(|(c, name)| (name.clone(), theme.color(c)))
            .collect_vec();
        draw_legend(canvas, &area, &entries, theme);

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mismatched_rows_are_rejected() {
        let chart = BarChart {
            x_labels: vec!["a".to_string()],
            categories: vec!["x".to_string(), "y".to_string()],
            values: vec![vec![1.0]],
            ..Default::default()
        };
        assert!(chart.render(&Theme::default()).is_err());
    }

    #[test]
    fn stacked_max_is_row_sum() {
        let chart = BarChart {
            x_labels: vec!["a".to_string(), "b".to_string()],
            categories: vec!["x".to_string(), "y".to_string()],
            values: vec![vec![1.0, 2.0], vec![4.0, 0.0]],
            stacked: true,
            ..Default::default()
        };
        assert_eq!(chart.y_max(), 4.0);
        let dodged = BarChart { stacked: false, ..chart };
        assert_eq!(dodged.y_max(), 4.0);
    }
}
