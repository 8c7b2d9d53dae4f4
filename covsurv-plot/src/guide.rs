//! Titles, axes and legends shared by the charts.

use crate::{Anchor, Canvas, Color, LinearScale, Region, Theme};

/// A labelled tick at a data position.
pub type Tick = (f32, String);

const TICK_LENGTH: f32 = 5.0;

pub fn draw_title(canvas: &mut Canvas, region: &Region, title: &str, theme: &Theme) {
    if title.is_empty() {
        return;
    }
    let size = canvas.font_size() * 1.25;
    let y = region.y + (theme.margin.top - size).max(0.0) / 2.0;
    canvas.text(title, region.x + region.width / 2.0, y, size, Anchor::Middle, theme.foreground);
}

/// Returns the stride between x tick labels so that neighbours do not overlap.
fn label_stride(canvas: &Canvas, ticks: &[Tick], x: &LinearScale, size: f32) -> usize {
    if ticks.len() < 2 {
        return 1;
    }
    let widest = ticks.iter().map(|(_, label)| canvas.text_width(label, size)).fold(0.0, f32::max);
    let spacing = (x.map(ticks[1].0) - x.map(ticks[0].0)).abs().max(1.0);
    ((widest + 8.0) / spacing).ceil().max(1.0) as usize
}

/// Draw grid lines, axis lines, tick labels and axis labels around a plotting area.
#[allow(clippy::too_many_arguments)]
pub fn draw_axes(
    canvas: &mut Canvas,
    area: &Region,
    x: &LinearScale,
    y: &LinearScale,
    x_ticks: &[Tick],
    y_ticks: &[Tick],
    x_label: &str,
    y_label: &str,
    theme: &Theme,
) {
    let size = canvas.font_size() * 0.85;

    // horizontal grid lines and y tick labels
    for (value, label) in y_ticks {
        let py = y.map(*value);
        if py < area.y - 0.5 || py > area.bottom() + 0.5 {
            continue;
        }
        canvas.line((area.x, py), (area.right(), py), theme.grid, 1.0);
        canvas.line((area.x - TICK_LENGTH, py), (area.x, py), theme.foreground, 1.0);
        canvas.text(
            label,
            area.x - TICK_LENGTH - 3.0,
            py - size / 2.0,
            size,
            Anchor::End,
            theme.foreground,
        );
    }

    // x tick marks, with thinned labels
    let stride = label_stride(canvas, x_ticks, x, size);
    for (i, (value, label)) in x_ticks.iter().enumerate() {
        let px = x.map(*value);
        if px < area.x - 0.5 || px > area.right() + 0.5 {
            continue;
        }
        canvas.line((px, area.bottom()), (px, area.bottom() + TICK_LENGTH), theme.foreground, 1.0);
        if i % stride == 0 {
            let label_y = area.bottom() + TICK_LENGTH + 2.0;
            canvas.text(label, px, label_y, size, Anchor::Middle, theme.foreground);
        }
    }

    // axis lines
    canvas.line((area.x, area.y), (area.x, area.bottom()), theme.foreground, 1.0);
    canvas.line((area.x, area.bottom()), (area.right(), area.bottom()), theme.foreground, 1.0);

    // axis labels: x centered below the ticks, y above the axis
    let label_size = canvas.font_size();
    if !x_label.is_empty() {
        let label_y = area.bottom() + TICK_LENGTH + size + 10.0;
        canvas.text(x_label, area.x + area.width / 2.0, label_y, label_size, Anchor::Middle, theme.foreground);
    }
    if !y_label.is_empty() {
        let label_y = area.y - label_size - 6.0;
        canvas.text(y_label, area.x, label_y, label_size, Anchor::Start, theme.foreground);
    }
}

/// Draw a legend box in the top-right corner of a plotting area.
pub fn draw_legend(canvas: &mut Canvas, area: &Region, entries: &[(String, Color)], theme: &Theme) {
    if entries.is_empty() || !canvas.has_font() {
        return;
    }
    let size = canvas.font_size() * 0.85;
    let swatch = size;
    let row_height = size + 6.0;
    let widest = entries.iter().map(|(label, _)| canvas.text_width(label, size)).fold(0.0, f32::max);
    let width = swatch + widest + 18.0;
    let height = row_height * entries.len() as f32 + 6.0;
    let x = area.right() - width - 4.0;
    let y = area.y + 4.0;

    canvas.fill_rect(x, y, width, height, theme.background.with_alpha(220));
    for (i, (label, color)) in entries.iter().enumerate() {
        let row_y = y + 4.0 + i as f32 * row_height;
        canvas.fill_rect(x + 4.0, row_y + 1.0, swatch, swatch, *color);
        canvas.text(label, x + swatch + 10.0, row_y, size, Anchor::Start, theme.foreground);
    }
}
