/// Linear mapping from data values (domain) to pixel positions (range).
///
/// ## Examples
///
/// ```rust
/// use covsurv_plot::LinearScale;
/// let scale = LinearScale::new((0.0, 10.0), (100.0, 200.0));
/// assert_eq!(scale.map(5.0), 150.0);
/// ```
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LinearScale {
    pub domain: (f32, f32),
    pub range: (f32, f32),
}

impl LinearScale {
    /// A degenerate domain (min == max) is widened by one unit on each side.
    pub fn new(domain: (f32, f32), range: (f32, f32)) -> Self {
        let domain = if (domain.1 - domain.0).abs() < f32::EPSILON {
            (domain.0 - 1.0, domain.1 + 1.0)
        } else {
            domain
        };
        LinearScale { domain, range }
    }

    pub fn map(&self, value: f32) -> f32 {
        let (d0, d1) = self.domain;
        let (r0, r1) = self.range;
        r0 + (value - d0) / (d1 - d0) * (r1 - r0)
    }
}

/// Returns the smallest "nice" step (1, 2 or 5 times a power of ten) >= `raw`.
fn nice_step(raw: f32) -> f32 {
    if !raw.is_finite() || raw <= 0.0 {
        return 1.0;
    }
    let magnitude = 10f32.powf(raw.log10().floor());
    let residual = raw / magnitude;
    let nice = if residual <= 1.0 {
        1.0
    } else if residual <= 2.0 {
        2.0
    } else if residual <= 5.0 {
        5.0
    } else {
        10.0
    };
    nice * magnitude
}

/// Returns roughly `count` evenly spaced round tick values covering `[min, max]`.
///
/// ## Examples
///
/// ```rust
/// use covsurv_plot::nice_ticks;
/// assert_eq!(nice_ticks(0.0, 10.0, 5), vec![0.0, 2.0, 4.0, 6.0, 8.0, 10.0]);
/// assert_eq!(nice_ticks(0.0, 1.0, 4), vec![0.0, 0.5, 1.0]);
/// ```
pub fn nice_ticks(min: f32, max: f32, count: usize) -> Vec<f32> {
    let (min, max) = if min <= max { (min, max) } else { (max, min) };
    let step = nice_step((max - min) / count.max(1) as f32);
    let first = (min / step).ceil() as i64;
    let last = (max / step).floor() as i64;
    (first..=last)
        .map(|i| {
            let tick = i as f32 * step;
            // snap float noise (ex. 0.30000001) to the step precision
            (tick / step).round() * step
        })
        .collect()
}

/// Format a tick value without trailing zeros.
///
/// ```rust
/// use covsurv_plot::format_tick;
/// assert_eq!(format_tick(2.0), "2");
/// assert_eq!(format_tick(0.25), "0.25");
/// ```
pub fn format_tick(value: f32) -> String {
    let text = format!("{value:.3}");
    let text = text.trim_end_matches('0').trim_end_matches('.');
    match text {
        "-0" => "0".to_string(),
        _ => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn degenerate_domain_is_widened() {
        let scale = LinearScale::new((3.0, 3.0), (0.0, 100.0));
        assert_eq!(scale.domain, (2.0, 4.0));
        assert_eq!(scale.map(3.0), 50.0);
    }

    #[test]
    fn ticks_within_bounds() {
        let ticks = nice_ticks(0.13, 0.87, 5);
        assert!(ticks.iter().all(|t| *t >= 0.13 && *t <= 0.87));
        assert_eq!(ticks.len(), 4);
    }

    #[test]
    fn inverted_range_reverses_pixels() {
        let scale = LinearScale::new((0.0, 1.0), (100.0, 0.0));
        assert_eq!(scale.map(1.0), 0.0);
    }
}
