use crate::guide::draw_title;
use crate::{Canvas, Chart, LineChart, Region, Theme};
use color_eyre::eyre::{eyre, Report, Result};

/// Small multiples: a grid of [`LineChart`] panels drawn with the same [`Theme`].
///
/// ## Examples
///
/// ```rust
/// use covsurv_plot::{Chart, FacetChart, LineChart, Series, Theme};
///
/// let panel = |label: &str| LineChart {
///     title: label.to_string(),
///     series: vec![Series { label: label.to_string(), points: vec![(0.0, 0.1), (1.0, 0.4)], band: None }],
///     lines: true,
///     points: true,
///     ..Default::default()
/// };
/// let chart = FacetChart { title: "Mutation frequency".to_string(), panels: vec![panel("S:N501Y"), panel("S:D614G")], columns: 2 };
/// let output = tempfile::NamedTempFile::new()?;
/// chart.write_png(&output.path(), &Theme::default())?;
/// # Ok::<(), color_eyre::eyre::Report>(())
/// ```
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FacetChart {
    pub title: String,
    pub panels: Vec<LineChart>,
    pub columns: usize,
}

impl FacetChart {
    /// Returns the panel grid dimensions as (rows, columns).
    pub fn grid(&self) -> (usize, usize) {
        let columns = self.columns.clamp(1, self.panels.len().max(1));
        let rows = self.panels.len().div_ceil(columns).max(1);
        (rows, columns)
    }
}

impl Chart for FacetChart {
    fn draw(&self, canvas: &mut Canvas, region: Region, theme: &Theme) -> Result<(), Report> {
        if self.columns == 0 {
            return Err(eyre!("Facet chart must have at least one column."));
        }
        draw_title(canvas, &region, &self.title, theme);

        let (rows, columns) = self.grid();
        // panels share the space below the overall title
        let top = region.y + theme.margin.top * 0.5;
        let width = region.width / columns as f32;
        let height = (region.bottom() - top) / rows as f32;

        for (i, panel) in self.panels.iter().enumerate() {
            let (row, column) = (i / columns, i % columns);
            let cell = Region {
                x: region.x + column as f32 * width,
                y: top + row as f32 * height,
                width,
                height,
            };
            panel.draw(canvas, cell, theme)?;
        }
        Ok(())
    }
}
