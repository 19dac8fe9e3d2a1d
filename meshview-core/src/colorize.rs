/// Angular color bands around the Z axis
use std::f64::consts::PI;
use std::str::FromStr;

use nalgebra::Point3;

use crate::error::PaletteError;
use crate::geometry::{Color, Mesh};

/// A non-empty, ordered set of band colors
#[derive(Debug, Clone, PartialEq)]
pub struct Palette {
    colors: Vec<Color>,
}

impl Palette {
    pub fn new(colors: Vec<Color>) -> Result<Self, PaletteError> {
        if colors.is_empty() {
            return Err(PaletteError::Empty);
        }
        Ok(Self { colors })
    }

    /// Six saturated bands: red, orange, yellow, green, blue, pink
    pub fn neon() -> Self {
        Self {
            colors: vec![
                Color::new(1.0, 0.090, 0.267),
                Color::new(1.0, 0.584, 0.0),
                Color::new(1.0, 0.918, 0.0),
                Color::new(0.224, 1.0, 0.078),
                Color::new(0.0, 0.667, 1.0),
                Color::new(1.0, 0.0, 0.8),
            ],
        }
    }

    pub fn colors(&self) -> &[Color] {
        &self.colors
    }

    pub fn len(&self) -> usize {
        self.colors.len()
    }

    /// Never true for a constructed palette
    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }

    pub fn color_at(&self, position: &Point3<f32>) -> Color {
        self.colors[band_index(position, self.colors.len())]
    }
}

impl Default for Palette {
    fn default() -> Self {
        Self::neon()
    }
}

/// Comma-separated hex colors, e.g. `#ff0000,#00ff00`
impl FromStr for Palette {
    type Err = PaletteError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let colors = s
            .split(',')
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .map(Color::from_hex)
            .collect::<Result<Vec<_>, _>>()?;
        Palette::new(colors)
    }
}

/// Band of a position's XY angle among `bands` equal sectors.
///
/// The angle `atan2(y, x)` is mapped from [-π, π] onto [0, 1]; the final
/// modulo folds the closed upper end back onto band 0. `bands` must be > 0.
pub fn band_index(position: &Point3<f32>, bands: usize) -> usize {
    let angle = (position.y as f64).atan2(position.x as f64);
    let normalized = (angle + PI) / (2.0 * PI);
    (normalized * bands as f64).floor() as usize % bands
}

/// One palette color per vertex, in vertex order
pub fn colorize(mesh: &Mesh, palette: &Palette) -> Vec<Color> {
    mesh.positions()
        .iter()
        .map(|position| palette.color_at(position))
        .collect()
}

/// [`colorize`] over a raw color slice, which may be empty
pub fn colorize_with(mesh: &Mesh, colors: &[Color]) -> Result<Vec<Color>, PaletteError> {
    let palette = Palette::new(colors.to_vec())?;
    Ok(colorize(mesh, &palette))
}

/// Store the colorization on the mesh itself
pub fn apply_palette(mesh: &mut Mesh, palette: &Palette) {
    let colors = colorize(mesh, palette);
    debug_assert_eq!(colors.len(), mesh.vertex_count());
    // Cannot fail: colorize yields exactly one color per vertex
    let _ = mesh.set_colors(colors);
}
