use color_eyre::eyre::{eyre, Report, Result, WrapErr};
use color_eyre::Help;
use log::{debug, warn};
use raqote::SolidSource;
use rusttype::Font;
use serde::{Deserialize, Serialize};
use std::fmt::{Debug, Display, Formatter};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Fonts tried, in order, when a [`Theme`] does not name one.
pub const FALLBACK_FONTS: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
    "/Library/Fonts/Arial.ttf",
    "/System/Library/Fonts/Supplemental/Arial.ttf",
    "C:\\Windows\\Fonts\\arial.ttf",
];

// ----------------------------------------------------------------------------
// Color
// ----------------------------------------------------------------------------

/// An RGBA [`Color`], serialized as a hex string (`#rrggbb` or `#rrggbbaa`).
///
/// ## Examples
///
/// ```rust
/// use covsurv_plot::Color;
/// use std::str::FromStr;
///
/// let color = Color::from_str("#1f77b4")?;
/// assert_eq!(color, Color::rgb(31, 119, 180));
/// assert_eq!(color.to_string(), "#1f77b4ff");
/// # Ok::<(), color_eyre::eyre::Report>(())
/// ```
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Serialize)]
#[serde(try_from = "String", into = "String")]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    /// Returns an opaque [`Color`].
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Color { r, g, b, a: 255 }
    }

    /// Returns the same [`Color`] with a new alpha channel.
    pub const fn with_alpha(self, a: u8) -> Self {
        Color { a, ..self }
    }

    /// Converts to a premultiplied [`raqote`] source.
    pub fn to_source(self) -> SolidSource {
        SolidSource::from_unpremultiplied_argb(self.a, self.r, self.g, self.b)
    }
}

impl Display for Color {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}{:02x}", self.r, self.g, self.b, self.a)
    }
}

impl FromStr for Color {
    type Err = Report;

    fn from_str(hex: &str) -> Result<Self, Report> {
        let digits = hex.trim_start_matches('#');
        if !matches!(digits.len(), 6 | 8) || !digits.is_ascii() {
            return Err(eyre!("Invalid color: {hex:?}").suggestion("Use #rrggbb or #rrggbbaa."));
        }
        let channel = |i: usize| {
            u8::from_str_radix(&digits[i..i + 2], 16)
                .wrap_err_with(|| format!("Invalid color: {hex:?}"))
        };
        let a = if digits.len() == 8 { channel(6)? } else { 255 };
        Ok(Color { r: channel(0)?, g: channel(2)?, b: channel(4)?, a })
    }
}

impl TryFrom<String> for Color {
    type Error = Report;
    fn try_from(hex: String) -> Result<Self, Report> {
        Color::from_str(&hex)
    }
}

impl From<Color> for String {
    fn from(color: Color) -> String {
        color.to_string()
    }
}

// ----------------------------------------------------------------------------
// Margin
// ----------------------------------------------------------------------------

/// Space (in pixels) between a region's edge and its plotting area.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Serialize)]
pub struct Margin {
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
    pub left: f32,
}

impl Default for Margin {
    fn default() -> Self {
        Margin { top: 50.0, right: 30.0, bottom: 60.0, left: 70.0 }
    }
}

// ----------------------------------------------------------------------------
// Theme
// ----------------------------------------------------------------------------

/// Visual settings shared by every chart.
///
/// A [`Theme`] is passed explicitly to rendering, there is no global plotting state.
///
/// ## Examples
///
/// ```rust
/// use covsurv_plot::Theme;
///
/// let theme = Theme { width: 800, height: 400, ..Default::default() };
/// let file = tempfile::NamedTempFile::new()?;
/// theme.write(file.path())?;
/// assert_eq!(Theme::read(file.path())?, theme);
/// # Ok::<(), color_eyre::eyre::Report>(())
/// ```
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(default)]
pub struct Theme {
    /// Image width in pixels.
    pub width: u32,
    /// Image height in pixels.
    pub height: u32,
    pub margin: Margin,
    pub background: Color,
    /// Axis, tick and text color.
    pub foreground: Color,
    pub grid: Color,
    /// Category colors, recycled when there are more categories than colors.
    pub palette: Vec<Color>,
    /// TrueType font used for text. [`FALLBACK_FONTS`] are searched when unset.
    pub font: Option<PathBuf>,
    pub font_size: f32,
    pub line_width: f32,
    pub point_radius: f32,
    /// Alpha channel of confidence ribbons.
    pub ribbon_alpha: u8,
}

impl Default for Theme {
    fn default() -> Self {
        Theme {
            width: 1200,
            height: 700,
            margin: Margin::default(),
            background: Color::rgb(255, 255, 255),
            foreground: Color::rgb(40, 40, 40),
            grid: Color::rgb(225, 225, 225),
            palette: vec![
                Color::rgb(31, 119, 180),
                Color::rgb(255, 127, 14),
                Color::rgb(44, 160, 44),
                Color::rgb(214, 39, 40),
                Color::rgb(148, 103, 189),
                Color::rgb(140, 86, 75),
                Color::rgb(227, 119, 194),
                Color::rgb(127, 127, 127),
                Color::rgb(188, 189, 34),
                Color::rgb(23, 190, 207),
            ],
            font: None,
            font_size: 14.0,
            line_width: 2.0,
            point_radius: 3.0,
            ribbon_alpha: 64,
        }
    }
}

impl Theme {
    /// Returns the palette color for category `i`.
    ///
    /// ```rust
    /// use covsurv_plot::Theme;
    /// let theme = Theme::default();
    /// assert_eq!(theme.color(0), theme.color(theme.palette.len()));
    /// ```
    pub fn color(&self, i: usize) -> Color {
        if self.palette.is_empty() {
            self.foreground
        } else {
            self.palette[i % self.palette.len()]
        }
    }

    /// Read a [`Theme`] from a JSON file. Missing fields keep their defaults.
    pub fn read<P>(path: &P) -> Result<Theme, Report>
    where
        P: AsRef<Path> + Debug,
    {
        let file =
            std::fs::File::open(path).wrap_err(eyre!("Failed to open theme file: {path:?}."))?;
        let reader = std::io::BufReader::new(file);
        let theme = serde_json::from_reader(reader)
            .wrap_err(eyre!("Failed to deserialize theme file: {path:?}."))?;
        Ok(theme)
    }

    /// Write a [`Theme`] to a JSON file.
    pub fn write<P>(&self, path: &P) -> Result<(), Report>
    where
        P: AsRef<Path> + Debug,
    {
        let mut file = std::fs::File::create(path)
            .wrap_err(eyre!("Failed to create theme file: {path:?}"))?;
        let output = serde_json::to_string_pretty(self)
            .wrap_err(eyre!("Failed to serialize theme: {self:?}"))?;
        file.write_all(format!("{output}\n").as_bytes())
            .wrap_err(eyre!("Failed to write theme file: {path:?}"))?;
        Ok(())
    }

    /// Load the theme font, or the first available fallback font.
    ///
    /// An explicitly configured font that cannot be loaded is an error, a missing
    /// fallback font is not.
    pub fn load_font(&self) -> Result<Option<Font<'static>>, Report> {
        if let Some(path) = &self.font {
            let bytes =
                std::fs::read(path).wrap_err(eyre!("Failed to read font file: {path:?}"))?;
            let font = Font::try_from_vec(bytes)
                .ok_or_else(|| eyre!("Failed to parse font file: {path:?}"))
                .suggestion("Fonts must be TrueType (.ttf) or OpenType (.otf).")?;
            return Ok(Some(font));
        }

        for path in FALLBACK_FONTS {
            let Ok(bytes) = std::fs::read(path) else { continue };
            if let Some(font) = Font::try_from_vec(bytes) {
                debug!("Using fallback font: {path:?}");
                return Ok(Some(font));
            }
        }

        warn!("No font was found, charts will be drawn without text.");
        Ok(None)
    }
}
